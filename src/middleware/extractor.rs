use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::error::AuthError;
use super::session::Session;
use super::state::AuthState;
use super::traits::{Authenticator, SessionStore};
use crate::csrf;
use crate::types::SessionId;

/// Load the caller's session, or start an empty one if the cookie is
/// missing or names a session the store no longer knows.
pub(super) async fn load_session<A, S: SessionStore>(
    state: &AuthState<A, S>,
    jar: &PrivateCookieJar,
) -> Result<Session, AuthError> {
    if let Some(id) = cookies::get_session_id(jar, &state.settings.session_cookie_name) {
        let existing = state
            .sessions
            .load(&id)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        if let Some(session) = existing {
            return Ok(session);
        }
    }

    let id = csrf::generate_session_id()?;
    Ok(Session::new(SessionId::from(id)))
}

/// Persist `session` and (re)issue its cookie.
pub(super) async fn save_session<A, S: SessionStore>(
    state: &AuthState<A, S>,
    jar: PrivateCookieJar,
    session: &Session,
) -> Result<PrivateCookieJar, AuthError> {
    state
        .sessions
        .save(session)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

    let cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        session.id(),
        state.settings.session_ttl,
        state.settings.secure_cookies,
    );
    Ok(jar.add(cookie))
}

/// Auth gate for protected routes.
///
/// Lets the request through only when the session holds a profile; otherwise
/// answers `303 See Other` to the home page without running the handler.
/// A store failure counts as "not authenticated".
pub(super) async fn require_profile<A: Authenticator, S: SessionStore>(
    State(state): State<AuthState<A, S>>,
    jar: PrivateCookieJar,
    request: Request,
    next: Next,
) -> Response {
    let authenticated = match cookies::get_session_id(&jar, &state.settings.session_cookie_name) {
        Some(id) => match state.sessions.load(&id).await {
            Ok(session) => session.is_some_and(|s| s.profile().is_some()),
            Err(e) => {
                tracing::warn!(error = %e, "Session load failed in auth gate");
                false
            }
        },
        None => false,
    };

    if authenticated {
        next.run(request).await
    } else {
        Redirect::to(&state.settings.home_path).into_response()
    }
}
