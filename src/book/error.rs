use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors of the book endpoint, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error("Invalid request body")]
    InvalidBody,

    #[error("Title, description, and chapters are required")]
    MissingFields,

    #[error("API key is required either in request or environment variable")]
    MissingApiKey,

    /// The LLM call failed or produced no text.
    #[error("Failed to generate book: {0}")]
    Generation(#[from] GenerationError),
}

/// Failure talking to the text-generation API.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid API endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("failed to parse JSON response: {0}")]
    Decode(String),

    #[error("API returned an empty or invalid response")]
    EmptyOutput,
}

impl BookError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBody | Self::MissingFields | Self::MissingApiKey => {
                StatusCode::BAD_REQUEST
            }
            Self::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BookError {
    fn into_response(self) -> Response {
        if let Self::Generation(ref e) = self {
            tracing::error!(error = %e, "Book generation failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
