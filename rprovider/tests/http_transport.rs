#![cfg(feature = "http")]

use futures_util::StreamExt;
use rprovider::{
    HttpTransport, ProviderErrorKind, SecretString, SseEvent, Transport, TransportRequest,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer) -> HttpTransport {
    HttpTransport::new(reqwest::Client::new(), format!("{}/v1/", server.uri()))
}

#[tokio::test]
async fn send_posts_json_with_bearer_auth_and_extra_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header("openai-beta", "assistants=v2"))
        .and(body_json(json!({"model": "gpt-4o-mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport(&server)
        .send(
            TransportRequest::new("/chat/completions", json!({"model": "gpt-4o-mini"}))
                .with_auth(Some(SecretString::new("sk-test")))
                .with_header("OpenAI-Beta", "assistants=v2"),
        )
        .await
        .expect("request should succeed");

    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn unauthorized_status_maps_to_authentication_with_backend_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let error = transport(&server)
        .send(TransportRequest::new("chat/completions", json!({})))
        .await
        .expect_err("401 should fail");

    assert_eq!(error.kind, ProviderErrorKind::Authentication);
    assert_eq!(error.status, Some(401));
    assert_eq!(error.message, "Incorrect API key provided");
    assert!(!error.retryable);
}

#[tokio::test]
async fn rate_limit_and_server_statuses_keep_their_classification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/limited"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/broken"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "overloaded"})))
        .mount(&server)
        .await;

    let transport = transport(&server);
    let limited = transport
        .send(TransportRequest::new("limited", json!({})))
        .await
        .expect_err("429 should fail");
    assert_eq!(limited.kind, ProviderErrorKind::RateLimited);

    let broken = transport
        .send(TransportRequest::new("broken", json!({})))
        .await
        .expect_err("503 should fail");
    assert_eq!(broken.kind, ProviderErrorKind::Server);
    assert_eq!(broken.message, "overloaded");
}

#[tokio::test]
async fn stream_yields_named_server_sent_events() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: thread.run.created\n",
        "data: {\"id\":\"run_1\"}\n\n",
        "data: {\"choices\":[]}\n\n",
        "data: [DONE]\n\n",
    );

    Mock::given(method("POST"))
        .and(path("/v1/threads/runs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let events = transport(&server)
        .stream(TransportRequest::new("threads/runs", json!({"stream": true})))
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("events should parse");

    assert_eq!(
        events,
        vec![
            SseEvent::new("thread.run.created", "{\"id\":\"run_1\"}"),
            SseEvent::data("{\"choices\":[]}"),
            SseEvent::data("[DONE]"),
        ]
    );
}

#[tokio::test]
async fn connection_failure_maps_to_connection_error() {
    let transport = HttpTransport::new(reqwest::Client::new(), "http://127.0.0.1:9");

    let error = transport
        .send(TransportRequest::new("chat/completions", json!({})))
        .await
        .expect_err("closed port should fail");

    assert_eq!(error.kind, ProviderErrorKind::Connection);
}
