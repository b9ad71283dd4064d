use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, Uri};
use axum::middleware::from_fn_with_state;
use axum::response::{Html, Redirect};
use axum::routing::get;
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;
use url::Url;

use super::config::AuthConfig;
use super::cookies;
use super::error::AuthError;
use super::extractor::{load_session, require_profile, save_session};
use super::session::{ACCESS_TOKEN_KEY, PROFILE_KEY, STATE_KEY};
use super::state::AuthState;
use super::traits::{Authenticator, SessionStore};
use crate::csrf;
use crate::types::SessionId;
use crate::views::Views;

/// Create the login router: `/login`, `/callback`, `/logout` and the gated user page.
///
/// `sessions` is the single process-wide store; every handler shares it.
pub fn auth_routes<A, S>(config: AuthConfig<A>, sessions: Arc<S>, views: Arc<Views>) -> Router
where
    A: Authenticator,
    S: SessionStore,
{
    let state = AuthState {
        authenticator: Arc::new(config.authenticator),
        sessions,
        views,
        settings: config.settings,
    };

    let protected = Router::new()
        .route(&state.settings.user_path, get(user::<A, S>))
        .route_layer(from_fn_with_state(state.clone(), require_profile::<A, S>));

    Router::new()
        .route("/login", get(login::<A, S>))
        .route("/callback", get(callback::<A, S>))
        .route("/logout", get(logout::<A, S>))
        .merge(protected)
        .with_state(state)
}

// ── Login ──────────────────────────────────────────────────────────

async fn login<A: Authenticator, S: SessionStore>(
    State(state): State<AuthState<A, S>>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let csrf_state = csrf::generate_state()?;
    let auth_url = state.authenticator.authorization_url(&csrf_state)?;

    let mut session = load_session(&state, &jar).await?;
    session
        .set(STATE_KEY, &csrf_state)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    let jar = save_session(&state, jar, &session).await?;

    Ok((jar, Redirect::temporary(auth_url.as_str())))
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback<A: Authenticator, S: SessionStore>(
    State(state): State<AuthState<A, S>>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let session = load_session(&state, &jar).await?;

    let expected_state = session.get::<String>(STATE_KEY);
    if !state_matches(params.state.as_deref(), expected_state.as_deref()) {
        tracing::warn!("OAuth state mismatch");
        return Err(AuthError::InvalidState);
    }

    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from provider");
        return Err(AuthError::Exchange);
    }

    let code = params.code.filter(|c| !c.is_empty()).ok_or_else(|| {
        tracing::warn!("Callback without authorization code");
        AuthError::Exchange
    })?;

    let tokens = state
        .authenticator
        .exchange_code(&code)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            AuthError::Exchange
        })?;

    let id_token = tokens.id_token.as_deref().ok_or_else(|| {
        tracing::error!("Token response carried no ID token");
        AuthError::Verification
    })?;

    let profile = state
        .authenticator
        .verify_id_token(id_token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "ID token verification failed");
            AuthError::Verification
        })?;

    // Authenticated sessions get a fresh id; the pre-login id is retired.
    let previous_id = session.id().clone();
    let mut session = session.renew(SessionId::from(csrf::generate_session_id()?));
    session.remove(STATE_KEY);
    session
        .set(ACCESS_TOKEN_KEY, &tokens.access_token)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    session
        .set(PROFILE_KEY, &profile)
        .map_err(|e| AuthError::Internal(e.to_string()))?;
    let jar = save_session(&state, jar, &session).await?;

    if let Err(e) = state.sessions.destroy(&previous_id).await {
        tracing::warn!(error = %e, "Failed to retire pre-login session");
    }

    tracing::info!(sub = %profile.subject, "OAuth2 login successful");

    Ok((jar, Redirect::temporary(&state.settings.user_path)))
}

/// Exact match; a missing or empty value on either side never matches.
fn state_matches(received: Option<&str>, expected: Option<&str>) -> bool {
    matches!((received, expected), (Some(r), Some(e)) if !e.is_empty() && r == e)
}

// ── User ───────────────────────────────────────────────────────────

async fn user<A: Authenticator, S: SessionStore>(
    State(state): State<AuthState<A, S>>,
    jar: PrivateCookieJar,
) -> Result<Html<String>, AuthError> {
    let session = load_session(&state, &jar).await?;
    // The gate guarantees a profile; render an empty one if mounted without it.
    let profile = session.profile().unwrap_or_default();
    Ok(Html(state.views.render_user(&profile)?))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout<A: Authenticator, S: SessionStore>(
    State(state): State<AuthState<A, S>>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    uri: Uri,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    if let Some(session_id) = cookies::get_session_id(&jar, &state.settings.session_cookie_name) {
        if let Err(e) = state.sessions.destroy(&session_id).await {
            tracing::warn!(error = %e, "Session deletion failed during logout");
        }
    }

    let return_to = request_origin(&headers, &uri)?;
    let logout_url = state.authenticator.logout_url(&return_to)?;

    tracing::info!(return_to = %return_to, "Logged out");

    let clear_cookie = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    Ok((jar.remove(clear_cookie), Redirect::temporary(logout_url.as_str())))
}

// ── Helpers ────────────────────────────────────────────────────────

/// `scheme://host` of the current request, as the browser addressed it.
fn request_origin(headers: &HeaderMap, uri: &Uri) -> Result<String, AuthError> {
    let forwarded_https = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("https"));

    let scheme = if forwarded_https || uri.scheme_str() == Some("https") {
        "https"
    } else {
        "http"
    };

    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AuthError::Internal("request carries no host".into()))?;

    let origin = format!("{scheme}://{host}");
    Url::parse(&origin)
        .map_err(|e| AuthError::Internal(format!("invalid return URL {origin}: {e}")))?;
    Ok(origin)
}
