use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value as JsonValue, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::book::{BookState, book_routes};
use crate::middleware::{AuthConfig, AuthError, Authenticator, SessionStore, auth_routes};
use crate::views::Views;

/// Full application router: home page, health probe, login flow and book endpoint.
pub fn router<A, S>(
    auth: AuthConfig<A>,
    sessions: Arc<S>,
    views: Arc<Views>,
    book: BookState,
) -> Router
where
    A: Authenticator,
    S: SessionStore,
{
    let pages = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .with_state(Arc::clone(&views));

    Router::new()
        .merge(pages)
        .merge(book_routes(book))
        .merge(auth_routes(auth, sessions, views))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn home(State(views): State<Arc<Views>>) -> Result<Html<String>, AuthError> {
    Ok(Html(views.render_home()?))
}

async fn health() -> Json<JsonValue> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "healthy", "timestamp": timestamp }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_reports_rfc3339_timestamp() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
        let ts = body["timestamp"].as_str().unwrap();
        assert!(OffsetDateTime::parse(ts, &Rfc3339).is_ok());
    }

    #[tokio::test]
    async fn home_page_renders() {
        let views = Arc::new(Views::new().unwrap());
        let app = Router::new().route("/", get(home)).with_state(views);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
