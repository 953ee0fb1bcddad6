//! Convenience re-exports for common use.

pub use crate::client::{AgentClient, DifyClient};
pub use crate::config::{AgentConfig, ConfigStore};
pub use crate::error::{ProbeError, Result};
pub use crate::payload::build_payload;
pub use crate::session::{
    EditorSource, LineSource, SessionController, SessionMode, SessionSettings,
};
pub use crate::types::{AgentReply, RequestPayload};
