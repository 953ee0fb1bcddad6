//! dify-probe binary entry point.

use std::sync::Arc;

use dify_probe::cli::Cli;
use dify_probe::client::DifyClient;
use dify_probe::config::ConfigStore;
use dify_probe::error::Result;
use dify_probe::session::{EditorSource, SessionController};
use dify_probe::telemetry::init_tracing;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv(); // load .env if present, ignore error
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = ConfigStore::load(&cli.config_paths())?;
    println!("✓ Loaded {} agent config(s): {}", store.len(), store.names().join(", "));

    let client = Arc::new(DifyClient::new()?);
    let mut session = SessionController::new(store, client, cli.session_settings());

    let mut stdout = std::io::stdout();
    session.greet(&mut stdout)?;

    let mut editor = EditorSource::new()?;
    session.run_with(&mut editor, &mut stdout).await
}
