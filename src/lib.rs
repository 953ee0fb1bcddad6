//! dify-probe — interactive harness for Dify-style chat agents.
//!
//! Loads one or more named agent configs, turns operator input into
//! `chat-messages` requests and carries each agent's conversation id
//! across turns.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use dify_probe::client::DifyClient;
//! use dify_probe::config::ConfigStore;
//! use dify_probe::session::{SessionController, SessionSettings};
//!
//! # async fn example() -> dify_probe::error::Result<()> {
//! let store = ConfigStore::load(&[])?;
//! let client = Arc::new(DifyClient::new()?);
//! let mut session = SessionController::new(store, client, SessionSettings::default());
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! session.run(stdin, &mut std::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod prelude;
pub mod session;
pub mod telemetry;
pub mod types;
pub mod util;
