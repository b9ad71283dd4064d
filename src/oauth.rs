use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::Error;
use crate::token::IdTokenVerifier;
use crate::types::Profile;

/// Identity provider `OAuth2`/OIDC configuration.
///
/// Endpoints are derived from the tenant domain the way Auth0 lays them out;
/// each can be overridden with a `with_*` method.
///
/// ```rust,ignore
/// use booksmith::OAuthConfig;
///
/// let config = OAuthConfig::new(
///     "tenant.eu.auth0.com",
///     "my-client-id",
///     "my-client-secret",
///     "https://my-app.com/callback".parse()?,
/// )?
/// .with_scopes(vec!["openid".into(), "profile".into()]);
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OAuthConfig {
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) issuer: Url,
    pub(crate) auth_url: Url,
    pub(crate) token_url: Url,
    pub(crate) jwks_url: Url,
    pub(crate) logout_url: Url,
    pub(crate) redirect_uri: Url,
    pub(crate) scopes: Vec<String>,
    pub(crate) timeout: Duration,
}

impl OAuthConfig {
    /// Create a configuration for the tenant at `https://{domain}/`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `domain` does not form a valid URL.
    pub fn new(
        domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        let issuer = Url::parse(&format!("https://{domain}/"))?;
        Self::from_issuer(issuer, client_id, client_secret, redirect_uri)
    }

    /// Create a configuration from an explicit issuer URL (trailing slash included).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if an endpoint cannot be joined onto `issuer`.
    pub fn from_issuer(
        issuer: Url,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Url,
    ) -> Result<Self, Error> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: issuer.join("authorize")?,
            token_url: issuer.join("oauth/token")?,
            jwks_url: issuer.join(".well-known/jwks.json")?,
            logout_url: issuer.join("v2/logout")?,
            issuer,
            redirect_uri,
            scopes: vec!["openid".into(), "profile".into(), "email".into()],
            timeout: Duration::from_secs(30),
        })
    }

    /// Override the `OAuth2` scopes (default: `["openid", "profile", "email"]`).
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Bound for the token exchange and JWKS requests (default: 30 seconds).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Expected `iss` claim of ID tokens.
    #[must_use]
    pub fn issuer(&self) -> &Url {
        &self.issuer
    }

    #[must_use]
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    #[must_use]
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    #[must_use]
    pub fn jwks_url(&self) -> &Url {
        &self.jwks_url
    }

    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Tokens returned by the provider's token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenSet {
    /// Create a token set with an access token and ID token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: Some("Bearer".into()),
            id_token: Some(id_token.into()),
            expires_in: None,
            refresh_token: None,
            scope: None,
        }
    }
}

/// `OAuth2`/OIDC client for the identity provider.
pub struct AuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
    verifier: IdTokenVerifier,
}

impl AuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let verifier = IdTokenVerifier::new(
            config.issuer.as_str(),
            config.client_id.as_str(),
            config.jwks_url.clone(),
            config.client_secret.as_str(),
        )
        .with_timeout(config.timeout);

        Self {
            config,
            http: reqwest::Client::new(),
            verifier,
        }
    }

    /// Build the authorization endpoint URL carrying `state`.
    #[must_use]
    pub fn authorization_url(&self, state: &str) -> Url {
        let scope = self.config.scopes.join(" ");

        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scope)
            .append_pair("state", state);
        url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure or timeout, or
    /// [`Error::OAuth`] if the token endpoint rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, Error> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .timeout(self.config.timeout)
            .form(&params)
            .send()
            .await?;

        let response = Self::ensure_success(response, "token exchange").await?;
        response.json::<TokenSet>().await.map_err(Into::into)
    }

    /// Verify an ID token and return its claims.
    ///
    /// # Errors
    ///
    /// See [`IdTokenVerifier::verify`].
    pub async fn verify_id_token(&self, id_token: &str) -> Result<Profile, Error> {
        self.verifier.verify(id_token).await
    }

    /// Build the provider logout URL that sends the browser back to `return_to`.
    #[must_use]
    pub fn logout_url(&self, return_to: &str) -> Url {
        let mut url = self.config.logout_url.clone();
        url.query_pairs_mut()
            .append_pair("returnTo", return_to)
            .append_pair("client_id", &self.config.client_id);
        url
    }

    /// Checks HTTP response status; returns the response on success or an error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Error::OAuth {
            operation,
            status: Some(status),
            detail: body,
        })
    }
}
