use std::future::Future;

use url::Url;

use super::session::Session;
use crate::error::Error;
use crate::oauth::{AuthClient, TokenSet};
use crate::types::{Profile, SessionId};

/// Boxed error returned by consumer-provided stores.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Identity provider operations used by the login routes.
///
/// [`AuthClient`] is the production implementation; tests substitute a stub.
pub trait Authenticator: Send + Sync + 'static {
    /// Authorization endpoint URL carrying `state`.
    fn authorization_url(&self, state: &str) -> Result<Url, Error>;

    /// Exchange an authorization code for tokens.
    fn exchange_code(&self, code: &str) -> impl Future<Output = Result<TokenSet, Error>> + Send;

    /// Verify an ID token and return its claims.
    fn verify_id_token(
        &self,
        id_token: &str,
    ) -> impl Future<Output = Result<Profile, Error>> + Send;

    /// Provider logout URL that sends the browser back to `return_to`.
    fn logout_url(&self, return_to: &str) -> Result<Url, Error>;
}

impl Authenticator for AuthClient {
    fn authorization_url(&self, state: &str) -> Result<Url, Error> {
        Ok(AuthClient::authorization_url(self, state))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error> {
        AuthClient::exchange_code(self, code).await
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<Profile, Error> {
        AuthClient::verify_id_token(self, id_token).await
    }

    fn logout_url(&self, return_to: &str) -> Result<Url, Error> {
        Ok(AuthClient::logout_url(self, return_to))
    }
}

/// Server-side session persistence.
///
/// One instance serves the whole process; implementations must be safe for
/// concurrent use by distinct sessions.
///
/// # Example
///
/// ```rust,ignore
/// impl SessionStore for RedisSessions {
///     async fn load(&self, id: &SessionId) -> Result<Option<Session>, BoxError> {
///         let raw: Option<String> = self.conn().get(id.as_str()).await?;
///         let Some(raw) = raw else { return Ok(None) };
///         Ok(Some(Session::from_values(id.clone(), serde_json::from_str(&raw)?)))
///     }
///     // ...
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Look up a session. `Ok(None)` means the id is unknown or expired.
    fn load(
        &self,
        id: &SessionId,
    ) -> impl Future<Output = Result<Option<Session>, BoxError>> + Send;

    /// Persist all keys of `session`, replacing what was stored under its id.
    fn save(&self, session: &Session) -> impl Future<Output = Result<(), BoxError>> + Send;

    /// Delete a session (logout).
    fn destroy(&self, id: &SessionId) -> impl Future<Output = Result<(), BoxError>> + Send;
}
