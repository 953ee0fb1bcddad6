//! Parsed reply from the chat-messages endpoint.

use serde_json::Value;

use crate::error::{ProbeError, Result};

/// The fields of a blocking reply this tool reads. Everything else in the
/// body is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReply {
    pub answer_text: String,
    pub conversation_token: String,
    pub token_usage: Option<u64>,
    pub model_name: Option<String>,
    pub message_id: Option<String>,
}

impl AgentReply {
    /// Extract a reply from a decoded JSON body.
    ///
    /// `answer` must be a string and `conversation_id` a non-empty string;
    /// usage, model and message id are optional.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = body
            .as_object()
            .ok_or_else(|| ProbeError::MalformedReply("reply is not a JSON object".into()))?;

        let answer_text = obj
            .get("answer")
            .and_then(Value::as_str)
            .ok_or_else(|| ProbeError::MalformedReply("missing `answer` field".into()))?
            .to_string();

        let conversation_token = obj
            .get("conversation_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProbeError::MalformedReply("missing `conversation_id` field".into()))?
            .to_string();

        let metadata = obj.get("metadata");
        let token_usage = metadata
            .and_then(|m| m.get("usage"))
            .and_then(|u| u.get("total_tokens"))
            .and_then(Value::as_u64);
        let model_name = metadata
            .and_then(|m| m.get("model"))
            .and_then(Value::as_str)
            .map(String::from);
        let message_id = obj
            .get("message_id")
            .and_then(Value::as_str)
            .map(String::from);

        Ok(Self {
            answer_text,
            conversation_token,
            token_usage,
            model_name,
            message_id,
        })
    }
}
