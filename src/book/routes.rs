use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};

use super::client::QwenClient;
use super::error::BookError;
use super::prompt::{BookRequest, build_messages};

/// Shared state of the book endpoint.
#[derive(Clone)]
pub struct BookState {
    pub client: Arc<QwenClient>,
    /// Server-side key used when a request carries none.
    pub default_api_key: Option<String>,
}

impl BookState {
    #[must_use]
    pub fn new(client: QwenClient, default_api_key: Option<String>) -> Self {
        Self {
            client: Arc::new(client),
            default_api_key: default_api_key.filter(|k| !k.is_empty()),
        }
    }

    /// Request key first, then the configured one.
    fn resolve_api_key<'a>(&'a self, request: &'a BookRequest) -> Result<&'a str, BookError> {
        request
            .api_key()
            .or(self.default_api_key.as_deref())
            .ok_or(BookError::MissingApiKey)
    }
}

/// `POST /generate-book`.
pub fn book_routes(state: BookState) -> Router {
    Router::new()
        .route("/generate-book", post(generate_book))
        .with_state(state)
}

async fn generate_book(
    State(state): State<BookState>,
    body: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, BookError> {
    let Json(request) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected book request body");
        BookError::InvalidBody
    })?;

    request.validate()?;
    let api_key = state.resolve_api_key(&request)?;

    tracing::info!(
        title = %request.title,
        chapters = request.chapters,
        "Generating book"
    );

    let messages = build_messages(&request);
    let book = state.client.generate(api_key, &messages).await?;

    Ok(Json(json!({ "book": book })))
}
