//! Request body for `POST {base_url}/chat-messages`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

/// How the remote API should deliver the answer. Replies are always awaited
/// in full.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Blocking,
}

/// Structured snapshot sent as the `query` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuerySnapshot {
    pub user_input: String,
    pub current_state: Map<String, Value>,
    pub user_memory: Map<String, Value>,
    pub behavioral_patterns: Map<String, Value>,
    pub insight: Map<String, Value>,
    pub candidate_items: Vec<Value>,
    pub context_info: Value,
}

/// Full request body. `conversation_id` is omitted entirely on the first
/// turn; the remote API treats its absence as "new conversation".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestPayload {
    pub inputs: Map<String, Value>,
    pub query: QuerySnapshot,
    pub response_mode: ResponseMode,
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}
