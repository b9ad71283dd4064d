use std::time::Duration;

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use tokio::sync::RwLock;
use url::Url;

use crate::error::Error;
use crate::types::Profile;

/// Verifies OIDC ID tokens issued by the identity provider.
///
/// Asymmetric tokens (RS*/ES*/PS*) are checked against the provider's JWKS,
/// fetched lazily and refetched once when a token names an unknown `kid`.
/// HS256 tokens are checked against the client secret, which is how
/// Auth0 signs ID tokens for applications configured with HS256.
pub struct IdTokenVerifier {
    issuer: String,
    audience: String,
    jwks_url: Url,
    client_secret: String,
    timeout: Duration,
    http: reqwest::Client,
    jwks: RwLock<Option<JwkSet>>,
}

impl IdTokenVerifier {
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        jwks_url: Url,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url,
            client_secret: client_secret.into(),
            timeout: Duration::from_secs(30),
            http: reqwest::Client::new(),
            jwks: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Verifies signature, issuer, audience and expiry, then returns the claims.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the token is malformed, expired, signed by an
    /// unknown key or issued for another client, and [`Error::Http`] if the JWKS
    /// endpoint cannot be reached.
    pub async fn verify(&self, id_token: &str) -> Result<Profile, Error> {
        let header = decode_header(id_token)?;

        let key = match header.alg {
            Algorithm::HS256 => DecodingKey::from_secret(self.client_secret.as_bytes()),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384 => self.decoding_key(header.kid.as_deref()).await?,
            other => {
                return Err(Error::Token(format!("unsupported algorithm: {other:?}")));
            }
        };

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        let data = decode::<Profile>(id_token, &key, &validation)?;
        Ok(data.claims)
    }

    async fn decoding_key(&self, kid: Option<&str>) -> Result<DecodingKey, Error> {
        if let Some(key) = self.cached_key(kid).await? {
            return Ok(key);
        }

        // Unknown kid: the provider may have rotated keys since the last fetch.
        self.refresh_jwks().await?;

        self.cached_key(kid)
            .await?
            .ok_or_else(|| Error::Token("no matching JWK for token kid".into()))
    }

    async fn cached_key(&self, kid: Option<&str>) -> Result<Option<DecodingKey>, Error> {
        let guard = self.jwks.read().await;
        let Some(set) = guard.as_ref() else {
            return Ok(None);
        };

        let jwk = match kid {
            Some(kid) => set.find(kid),
            None if set.keys.len() == 1 => set.keys.first(),
            None => None,
        };

        jwk.map(DecodingKey::from_jwk).transpose().map_err(Into::into)
    }

    async fn refresh_jwks(&self) -> Result<(), Error> {
        tracing::debug!(url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http
            .get(self.jwks_url.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::OAuth {
                operation: "jwks fetch",
                status: Some(status),
                detail: body,
            });
        }

        let set = response.json::<JwkSet>().await?;
        *self.jwks.write().await = Some(set);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ISSUER: &str = "https://tenant.example.com/";
    const CLIENT_ID: &str = "client-123";
    const SECRET: &str = "test-client-secret-with-enough-length";

    fn now() -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn valid_claims() -> serde_json::Value {
        json!({
            "iss": ISSUER,
            "aud": CLIENT_ID,
            "sub": "auth0|u1",
            "name": "Test",
            "iat": now(),
            "exp": now() + 600,
        })
    }

    fn verifier() -> IdTokenVerifier {
        IdTokenVerifier::new(
            ISSUER,
            CLIENT_ID,
            "https://tenant.example.com/.well-known/jwks.json".parse().unwrap(),
            SECRET,
        )
    }

    #[tokio::test]
    async fn test_verify_hs256_token() {
        let token = sign(&valid_claims(), SECRET);
        let profile = verifier().verify(&token).await.unwrap();

        assert_eq!(profile.subject, "auth0|u1");
        assert_eq!(profile.name.as_deref(), Some("Test"));
        assert_eq!(profile.extra["aud"], CLIENT_ID);
    }

    #[tokio::test]
    async fn test_rejects_wrong_secret() {
        let token = sign(&valid_claims(), "some-other-secret-entirely");
        assert!(matches!(verifier().verify(&token).await, Err(Error::Token(_))));
    }

    #[tokio::test]
    async fn test_rejects_wrong_audience() {
        let mut claims = valid_claims();
        claims["aud"] = json!("another-client");
        let token = sign(&claims, SECRET);
        assert!(verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_wrong_issuer() {
        let mut claims = valid_claims();
        claims["iss"] = json!("https://evil.example.com/");
        let token = sign(&claims, SECRET);
        assert!(verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_expired_token() {
        let mut claims = valid_claims();
        claims["exp"] = json!(now() - 3600);
        let token = sign(&claims, SECRET);
        assert!(verifier().verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_garbage() {
        assert!(verifier().verify("not-a-jwt").await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_kid_refetches_jwks_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": []})))
            .expect(1)
            .mount(&server)
            .await;

        let verifier = IdTokenVerifier::new(
            ISSUER,
            CLIENT_ID,
            format!("{}/.well-known/jwks.json", server.uri()).parse().unwrap(),
            SECRET,
        );

        // Header claims RS256 with a kid the (empty) JWKS does not know.
        let header = b64url(r#"{"alg":"RS256","kid":"missing"}"#);
        let payload = b64url(&valid_claims().to_string());
        let token = format!("{header}.{payload}.c2ln");

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(err.to_string().contains("no matching JWK"));
    }

    #[tokio::test]
    async fn test_jwks_endpoint_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let verifier = IdTokenVerifier::new(
            ISSUER,
            CLIENT_ID,
            format!("{}/.well-known/jwks.json", server.uri()).parse().unwrap(),
            SECRET,
        );

        let header = b64url(r#"{"alg":"RS256","kid":"k1"}"#);
        let payload = b64url(&valid_claims().to_string());
        let token = format!("{header}.{payload}.c2ln");

        assert!(matches!(
            verifier.verify(&token).await,
            Err(Error::OAuth { status: Some(503), .. })
        ));
    }

    fn b64url(input: &str) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(input)
    }
}
