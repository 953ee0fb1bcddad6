//! Agent clients: one blocking chat-messages call per turn.

pub mod http;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ProbeError, Result};
use crate::types::{AgentReply, RequestPayload};
use crate::util::timeout::with_timeout;

use self::http::{bearer_headers, build_client, chat_messages_url, transport_error};

/// Default bound on a single call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Sends one request and returns the parsed reply. No retries.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn send(
        &self,
        base_url: &str,
        api_key: &str,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> Result<AgentReply>;
}

/// reqwest-backed client for Dify-style `chat-messages` endpoints.
#[derive(Debug, Clone)]
pub struct DifyClient {
    http: reqwest::Client,
}

impl DifyClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: build_client(DEFAULT_TIMEOUT)?,
        })
    }

    async fn post(
        &self,
        url: &str,
        api_key: &str,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> Result<AgentReply> {
        let resp = self
            .http
            .post(url)
            .headers(bearer_headers(api_key)?)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "chat-messages call rejected");
            return Err(ProbeError::http(status.as_u16(), body));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProbeError::MalformedReply(format!("body is not valid JSON: {e}")))?;
        AgentReply::from_json(&value)
    }
}

#[async_trait]
impl AgentClient for DifyClient {
    async fn send(
        &self,
        base_url: &str,
        api_key: &str,
        payload: &RequestPayload,
        timeout: Duration,
    ) -> Result<AgentReply> {
        let url = chat_messages_url(base_url);
        debug!(
            url = %url,
            user = %payload.user,
            conversation_id = payload.conversation_id.as_deref().unwrap_or("<new>"),
            "POST chat-messages"
        );

        let started = Instant::now();
        let result = with_timeout(timeout, self.post(&url, api_key, payload, timeout)).await;
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "chat-messages call finished"
        );
        result
    }
}
