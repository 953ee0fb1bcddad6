//! Command-line arguments for the dify-probe binary.

use std::path::PathBuf;

use clap::Parser;

use crate::session::{SessionMode, SessionSettings};

/// Interactive harness for Dify-style chat agents.
#[derive(Parser, Debug)]
#[command(name = "dify-probe", version, about = "Exercise chat-messages agents from the terminal")]
pub struct Cli {
    /// Agent config file; repeat to load several agents. Without it,
    /// config.json and config_*.json in the working directory are used.
    #[arg(short, long = "config", value_name = "PATH")]
    pub configs: Vec<PathBuf>,

    /// Second agent config, loaded after every --config
    #[arg(long, value_name = "PATH")]
    pub config2: Option<PathBuf>,

    /// Seconds to wait for each reply
    #[arg(short, long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Start in single-line input mode instead of multi-line
    #[arg(long)]
    pub single_line: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Explicit config paths in load order. Empty means discovery.
    pub fn config_paths(&self) -> Vec<PathBuf> {
        self.configs
            .iter()
            .cloned()
            .chain(self.config2.clone())
            .collect()
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            timeout: std::time::Duration::from_secs(self.timeout),
            initial_mode: if self.single_line {
                SessionMode::SingleLine
            } else {
                SessionMode::MultiLine
            },
        }
    }
}
