use std::net::TcpListener;
use std::time::Duration;

use cuefinder_engine::{
    CollaboratorErrorKind, ReqwestTranscriptClient, ServiceSettings, TranscriptLookup,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: String) -> ReqwestTranscriptClient {
    cuefinder_logging::initialize_for_tests();
    ReqwestTranscriptClient::new(ServiceSettings {
        transcript_base_url: base_url,
        request_timeout: Duration::from_millis(300),
        ..ServiceSettings::default()
    })
    .expect("client")
}

async fn serve_transcript(server: &MockServer, item_id: &str, transcript: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/transcript/{item_id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video_id": item_id,
            "transcript": transcript
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn matching_transcript_yields_highlighted_snippet() {
    let server = MockServer::start().await;
    serve_transcript(&server, "v1", "안녕하세요. 오늘도 화이팅 입니다. 감사합니다.").await;

    let result = client_for(server.uri())
        .check_transcript("v1", "화이팅", 1, &CancellationToken::new())
        .await
        .expect("lookup");
    assert!(result.matched);
    assert_eq!(result.item_id, "v1");
    assert_eq!(
        result.snippet.as_deref(),
        Some("오늘도 <mark>화이팅</mark> 입니다.")
    );
}

#[tokio::test]
async fn order_is_sent_for_diagnostics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript/v7"))
        .and(query_param("order", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video_id": "v7",
            "transcript": "nothing relevant"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(server.uri())
        .check_transcript("v7", "cue", 7, &CancellationToken::new())
        .await
        .expect("lookup");
    assert!(!result.matched);
    assert_eq!(result.snippet, None);
}

#[tokio::test]
async fn missing_transcript_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript/v2"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "Transcripts are disabled" })),
        )
        .mount(&server)
        .await;

    let err = client_for(server.uri())
        .check_transcript("v2", "cue", 2, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, CollaboratorErrorKind::Transient);
    assert!(err.message.contains("Transcripts are disabled"));
}

#[tokio::test]
async fn slow_item_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({ "video_id": "slow", "transcript": "x" })),
        )
        .mount(&server)
        .await;

    let err = client_for(server.uri())
        .check_transcript("slow", "cue", 1, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, CollaboratorErrorKind::Transient);
}

#[tokio::test]
async fn backend_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transcript/v3"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(server.uri())
        .check_transcript("v3", "cue", 3, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, CollaboratorErrorKind::Fatal);
}

#[tokio::test]
async fn unreachable_backend_is_fatal() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };

    let err = client_for(format!("http://127.0.0.1:{port}"))
        .check_transcript("v4", "cue", 1, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, CollaboratorErrorKind::Fatal);
}

#[tokio::test]
async fn cancelled_token_short_circuits() {
    let server = MockServer::start().await;
    serve_transcript(&server, "v5", "cue").await;

    let token = CancellationToken::new();
    token.cancel();
    let err = client_for(server.uri())
        .check_transcript("v5", "cue", 1, &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, CollaboratorErrorKind::Cancelled);
}
