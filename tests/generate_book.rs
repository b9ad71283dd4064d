//! `/generate-book` against a mocked DashScope endpoint.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use booksmith::book::{BookState, QwenClient, book_routes};
use serde_json::{Value as JsonValue, json};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";

fn app(server: &MockServer, default_key: Option<&str>) -> Router {
    let client = QwenClient::new().with_base_url(server.uri());
    book_routes(BookState::new(client, default_key.map(String::from)))
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::post("/generate-book")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn dune() -> JsonValue {
    json!({"title": "Dune", "description": "A desert planet", "chapters": 3})
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = MockServer::start().await;
    let (status, body) = send(app(&server, Some("sk")), post("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn wrongly_typed_field_is_rejected() {
    let server = MockServer::start().await;
    let request = post(json!({"title": "Dune", "description": "x", "chapters": "three"}).to_string());
    let (status, body) = send(app(&server, Some("sk")), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let server = MockServer::start().await;
    let cases = [
        json!({"description": "x", "chapters": 3}),
        json!({"title": "Dune", "description": "", "chapters": 3}),
        json!({"title": "Dune", "description": "x"}),
        json!({"title": "Dune", "description": "x", "chapters": -1}),
    ];

    for case in cases {
        let (status, body) = send(app(&server, Some("sk")), post(case.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
        assert_eq!(body["error"], "Title, description, and chapters are required");
    }
}

#[tokio::test]
async fn missing_api_key_is_rejected() {
    let server = MockServer::start().await;
    let (status, body) = send(app(&server, None), post(dune().to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "API key is required either in request or environment variable"
    );
}

#[tokio::test]
async fn validation_happens_before_any_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let request = post(json!({"title": "", "description": "x", "chapters": 1}).to_string());
    send(app(&server, Some("sk")), request).await;
}

#[tokio::test]
async fn generated_book_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATION_PATH))
        .and(header("authorization", "Bearer sk-server"))
        .and(body_string_contains("Number of chapters: 3"))
        .and(body_string_contains("titled 'Dune' with 3 chapters"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output": {"text": "# Dune\n\n## Chapter 1"},
            "request_id": "req-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = send(app(&server, Some("sk-server")), post(dune().to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"], "# Dune\n\n## Chapter 1");
}

#[tokio::test]
async fn request_key_overrides_configured_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer sk-client"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"output": {"text": "book"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut request = dune();
    request["api_key"] = json!("sk-client");
    let (status, body) = send(app(&server, Some("sk-server")), post(request.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["book"], "book");
}

#[tokio::test]
async fn upstream_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let (status, body) = send(app(&server, Some("sk")), post(dune().to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Failed to generate book: "), "{message}");
    assert!(message.contains("upstream exploded"), "{message}");
}

#[tokio::test]
async fn empty_generation_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"output": {"text": ""}})),
        )
        .mount(&server)
        .await;

    let (status, body) = send(app(&server, Some("sk")), post(dune().to_string())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to generate book: "));
}
