use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors of the login flow, each mapped to a plain-text HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Callback `state` missing or different from the one stored at login.
    #[error("Invalid state parameter.")]
    InvalidState,

    /// Provider refused the authorization code, or none was sent.
    #[error("Failed to exchange an authorization code for a token.")]
    Exchange,

    /// ID token missing or failed verification.
    #[error("Failed to verify ID Token.")]
    Verification,

    /// Session store operation failed.
    #[error("Session store error: {0}")]
    Store(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else that is the server's fault (randomness, URL building, rendering).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::Exchange => StatusCode::UNAUTHORIZED,
            Self::Verification | Self::Store(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::InvalidState | Self::Exchange | Self::Verification => {
                (status, self.to_string()).into_response()
            }
            Self::Store(_) | Self::Config(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (status, "Internal error").into_response()
            }
        }
    }
}

impl From<crate::error::Error> for AuthError {
    fn from(e: crate::error::Error) -> Self {
        Self::Internal(e.to_string())
    }
}
