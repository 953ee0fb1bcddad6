//! HTTP plumbing shared by agent clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::{ProbeError, Result};

/// Build a client with no idle connection reuse; every turn is independent.
pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .pool_max_idle_per_host(0)
        .build()
        .map_err(|e| ProbeError::config(format!("failed to build HTTP client: {e}")))
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
        .map_err(|_| ProbeError::config("api_key contains characters not allowed in a header"))?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// `{base_url}/chat-messages`, tolerating a trailing slash on the base.
pub fn chat_messages_url(base_url: &str) -> String {
    format!("{}/chat-messages", base_url.trim_end_matches('/'))
}

/// Map a transport-level reqwest failure onto the error taxonomy.
pub fn transport_error(err: reqwest::Error, timeout: Duration) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout(timeout)
    } else {
        ProbeError::Transport(err.to_string())
    }
}
