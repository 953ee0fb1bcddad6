//! Shared test helpers and a scripted agent client.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use dify_probe::client::AgentClient;
use dify_probe::error::{ProbeError, Result};
use dify_probe::types::{AgentReply, RequestPayload};

/// One request as seen by the client.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub base_url: String,
    pub api_key: String,
    pub payload: RequestPayload,
    pub timeout: Duration,
}

/// A client that records every call and answers from a queue.
#[derive(Default)]
pub struct ScriptedClient {
    outcomes: Mutex<Vec<Result<AgentReply>>>,
    calls: Mutex<Vec<CapturedCall>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn queue_reply(&self, answer: &str, conversation_id: &str) {
        self.queue(Ok(reply(answer, conversation_id)));
    }

    /// Queue a failure.
    pub fn queue_error(&self, err: ProbeError) {
        self.queue(Err(err));
    }

    fn queue(&self, outcome: Result<AgentReply>) {
        self.outcomes.lock().unwrap().insert(0, outcome);
    }

    pub fn calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentClient for ScriptedClient {
    async fn send(
        &self,
        base_url: &str,
        api_key: &str,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> Result<AgentReply> {
        self.calls.lock().unwrap().push(CapturedCall {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            payload: payload.clone(),
            timeout,
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Ok(reply("Mock response", "mock-conversation")))
    }
}

pub fn reply(answer: &str, conversation_id: &str) -> AgentReply {
    AgentReply {
        answer_text: answer.to_string(),
        conversation_token: conversation_id.to_string(),
        token_usage: Some(30),
        model_name: Some("mock-model".to_string()),
        message_id: None,
    }
}

/// Write `body` to `dir/name` and return the path.
pub fn write_config(dir: &Path, name: &str, body: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(body).unwrap()).unwrap();
    path
}
