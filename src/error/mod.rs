//! Error types for dify-probe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use strum::Display;
use thiserror::Error;

/// Primary error type for all dify-probe operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Configuration error: {message}{}", path_suffix(.path))]
    Configuration {
        message: String,
        path: Option<PathBuf>,
    },

    #[error("Request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("HTTP error (status {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error("{0}")]
    Input(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" ({})", p.display()),
        None => String::new(),
    }
}

/// Broad error category used when rendering failures to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Timeout,
    Network,
    Server,
    Api,
    MalformedReply,
    Input,
    Io,
}

impl ProbeError {
    /// Configuration error not tied to a particular file.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            path: None,
        }
    }

    /// Configuration error raised while handling `path`.
    pub fn config_at(message: impl Into<String>, path: &Path) -> Self {
        Self::Configuration {
            message: message.into(),
            path: Some(path.to_path_buf()),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Http { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Transport(_) => ErrorCategory::Network,
            Self::MalformedReply(_) => ErrorCategory::MalformedReply,
            Self::Input(_) => ErrorCategory::Input,
            Self::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether the remote API rejected our credentials.
    pub fn is_auth(&self) -> bool {
        self.category() == ErrorCategory::Authentication
    }

    /// One-line message for the REPL transcript.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::Authentication => {
                format!("Authentication failed, check the api_key: {self}")
            }
            ErrorCategory::Server => format!("Remote server error: {self}"),
            ErrorCategory::Timeout => format!("Timeout: {self}"),
            _ => self.to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ProbeError>;
