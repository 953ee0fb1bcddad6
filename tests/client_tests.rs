//! Tests for the reqwest-backed client against a mock chat-messages server.

use std::time::Duration;

use dify_probe::client::{AgentClient, DifyClient};
use dify_probe::config::AgentConfig;
use dify_probe::error::{ErrorCategory, ProbeError};
use dify_probe::payload::build_payload;
use dify_probe::types::RequestPayload;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn payload(conversation_id: Option<&str>) -> RequestPayload {
    let config = AgentConfig::new("agent1", "k", "http://unused", "Asia/Shanghai", "u1");
    build_payload(&config, conversation_id, "hello")
}

async fn send(server: &MockServer, payload: &RequestPayload) -> dify_probe::error::Result<dify_probe::types::AgentReply> {
    DifyClient::new()
        .unwrap()
        .send(&server.uri(), "test-key", payload, TIMEOUT)
        .await
}

#[tokio::test]
async fn successful_call_parses_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "response_mode": "blocking",
            "user": "u1",
            "query": {"user_input": "hello"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "event": "message",
            "answer": "hi",
            "conversation_id": "c1",
            "message_id": "m1",
            "metadata": {"usage": {"total_tokens": 128, "prompt_tokens": 100}, "model": "gpt-4o-mini"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = send(&server, &payload(None)).await.expect("call should succeed");
    assert_eq!(reply.answer_text, "hi");
    assert_eq!(reply.conversation_token, "c1");
    assert_eq!(reply.token_usage, Some(128));
    assert_eq!(reply.model_name.as_deref(), Some("gpt-4o-mini"));
}

#[tokio::test]
async fn first_turn_body_has_no_conversation_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(|req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let answer = if body.get("conversation_id").is_some() {
                "continued"
            } else {
                "fresh"
            };
            ResponseTemplate::new(200).set_body_json(json!({
                "answer": answer,
                "conversation_id": "c1"
            }))
        })
        .expect(2)
        .mount(&server)
        .await;

    let first = send(&server, &payload(None)).await.unwrap();
    assert_eq!(first.answer_text, "fresh");
    let second = send(&server, &payload(Some("c1"))).await.unwrap();
    assert_eq!(second.answer_text, "continued");
}

#[tokio::test]
async fn trailing_slash_on_base_url_is_tolerated() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "ok",
            "conversation_id": "c9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let base = format!("{}/v1/", server.uri());
    let reply = DifyClient::new()
        .unwrap()
        .send(&base, "test-key", &payload(None), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply.conversation_token, "c9");
}

#[tokio::test]
async fn unauthorized_is_http_error_classified_as_auth() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"code":"unauthorized","message":"Access token is invalid"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = send(&server, &payload(None)).await.expect_err("401 should fail");
    assert!(
        matches!(&err, ProbeError::Http { status: 401, body } if body.contains("Access token is invalid"))
    );
    assert!(err.is_auth());
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let err = send(&server, &payload(None)).await.expect_err("503 should fail");
    assert!(matches!(err, ProbeError::Http { status: 503, .. }));
    assert_eq!(err.category(), ErrorCategory::Server);
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_bytes(b"{not-json".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = send(&server, &payload(None)).await.expect_err("bad body should fail");
    assert!(matches!(err, ProbeError::MalformedReply(_)));
}

#[tokio::test]
async fn reply_without_conversation_id_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "hi"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = send(&server, &payload(None)).await.expect_err("missing id should fail");
    assert!(matches!(err, ProbeError::MalformedReply(ref m) if m.contains("conversation_id")));
}

#[tokio::test]
async fn slow_reply_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat-messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"answer": "late", "conversation_id": "c1"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = DifyClient::new()
        .unwrap()
        .send(&server.uri(), "test-key", &payload(None), Duration::from_millis(200))
        .await
        .expect_err("should time out");
    assert!(matches!(err, ProbeError::Timeout(_)));
    assert_eq!(err.category(), ErrorCategory::Timeout);
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = DifyClient::new()
        .unwrap()
        .send(&uri, "test-key", &payload(None), TIMEOUT)
        .await
        .expect_err("no server should fail");
    assert!(matches!(err, ProbeError::Transport(_)), "{err:?}");
    assert_eq!(err.category(), ErrorCategory::Network);
}
