use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::AuthSettings;
use super::traits::{Authenticator, SessionStore};
use crate::views::Views;

/// Shared state for auth route handlers.
pub(super) struct AuthState<A, S> {
    pub(super) authenticator: Arc<A>,
    pub(super) sessions: Arc<S>,
    pub(super) views: Arc<Views>,
    pub(super) settings: AuthSettings,
}

// Manual Clone: avoid derive adding `A: Clone, S: Clone` bounds.
impl<A, S> Clone for AuthState<A, S> {
    fn clone(&self) -> Self {
        Self {
            authenticator: self.authenticator.clone(),
            sessions: self.sessions.clone(),
            views: self.views.clone(),
            settings: self.settings.clone(),
        }
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl<A: Authenticator, S: SessionStore> FromRef<AuthState<A, S>> for Key {
    fn from_ref(state: &AuthState<A, S>) -> Self {
        state.settings.cookie_key.clone()
    }
}
