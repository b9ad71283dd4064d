use axum_extra::extract::cookie::Key;
use time::Duration;
use url::Url;

use super::error::AuthError;
use super::traits::Authenticator;
use crate::oauth::{AuthClient, OAuthConfig};

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl: Duration,
    pub(crate) secure_cookies: bool,
    pub(crate) home_path: String,
    pub(crate) user_path: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__booksmith_session".into(),
            session_ttl: Duration::days(1),
            secure_cookies: true,
            home_path: "/".into(),
            user_path: "/user".into(),
        }
    }
}

/// Login flow configuration.
///
/// Required field (`authenticator`) is a constructor parameter.
///
/// Use [`from_env()`](AuthConfig::from_env) for the Auth0 convention,
/// or [`new()`](AuthConfig::new) with `with_*` methods for full control
/// (tests pass a stub [`Authenticator`] here).
pub struct AuthConfig<A> {
    pub(super) authenticator: A,
    pub(super) settings: AuthSettings,
}

impl<A: Authenticator> AuthConfig<A> {
    /// Create config with the required authenticator.
    ///
    /// Optional fields use defaults: random cookie key, secure cookies,
    /// one-day session cookie, `/` as home and `/user` as the protected page.
    #[must_use]
    pub fn new(authenticator: A) -> Self {
        Self {
            authenticator,
            settings: AuthSettings::defaults(),
        }
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.settings.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Where unauthenticated visitors of protected pages are sent.
    #[must_use]
    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.settings.home_path = path.into();
        self
    }

    /// Where a successful callback redirects to.
    #[must_use]
    pub fn with_user_path(mut self, path: impl Into<String>) -> Self {
        self.settings.user_path = path.into();
        self
    }

    /// Lifetime of the session cookie; stores should keep sessions no longer.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.settings.session_ttl
    }
}

impl AuthConfig<AuthClient> {
    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `AUTH0_DOMAIN`: tenant domain, e.g. `tenant.eu.auth0.com`
    /// - `AUTH0_CLIENT_ID`: OAuth2 client ID
    /// - `AUTH0_CLIENT_SECRET`: OAuth2 client secret
    /// - `AUTH0_CALLBACK_URL`: OAuth2 redirect URI (must be a valid URL)
    ///
    /// # Optional env vars
    /// - `AUTH0_SCOPES`: Comma-separated OAuth2 scopes
    /// - `DEV_AUTH`: Set to `"1"` or `"true"` to allow cookies over plain HTTP
    /// - `COOKIE_KEY`: Cookie encryption key bytes
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required env vars are missing or URLs are invalid.
    pub fn from_env() -> Result<Self, AuthError> {
        let domain = required_env("AUTH0_DOMAIN")?;
        let client_id = required_env("AUTH0_CLIENT_ID")?;
        let client_secret = required_env("AUTH0_CLIENT_SECRET")?;
        let redirect_uri: Url = required_env("AUTH0_CALLBACK_URL")?
            .parse()
            .map_err(|e| AuthError::Config(format!("AUTH0_CALLBACK_URL: {e}")))?;

        let mut config = OAuthConfig::new(&domain, client_id, client_secret, redirect_uri)
            .map_err(|e| AuthError::Config(format!("AUTH0_DOMAIN: {e}")))?;

        if let Ok(scopes) = std::env::var("AUTH0_SCOPES") {
            config = config.with_scopes(
                scopes
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => {
                tracing::warn!("COOKIE_KEY not set; sessions will not survive a restart");
                Key::generate()
            }
        };

        Ok(Self::new(AuthClient::new(config))
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth))
    }
}

fn required_env(name: &str) -> Result<String, AuthError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::Config(format!("{name} is required")))
}
