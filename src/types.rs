use std::collections::BTreeMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Opaque session identifier carried in the session cookie.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// User profile taken from a verified ID token.
///
/// The standard OIDC profile claims are named fields; every other claim
/// (`iss`, `aud`, `exp`, provider extensions, ...) lands in [`Profile::extra`]
/// so the user page can still show it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Profile {
    /// Subject identifier (`sub` claim).
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl Profile {
    /// Create a profile with only the required subject.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    #[must_use]
    pub fn with_claim(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Name to greet the user with: `name`, then `nickname`, then the subject.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.nickname.as_deref())
            .unwrap_or(&self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_from_claims_keeps_unknown_claims() {
        let claims = json!({
            "sub": "auth0|123",
            "name": "Ada",
            "email": "ada@example.com",
            "email_verified": true,
            "iss": "https://tenant.example.com/",
            "locale": "en"
        });
        let profile: Profile = serde_json::from_value(claims).unwrap();

        assert_eq!(profile.subject, "auth0|123");
        assert_eq!(profile.name.as_deref(), Some("Ada"));
        assert_eq!(profile.email_verified, Some(true));
        assert_eq!(profile.extra["locale"], "en");
        assert_eq!(profile.extra["iss"], "https://tenant.example.com/");
        assert!(!profile.extra.contains_key("sub"));
    }

    #[test]
    fn profile_requires_subject() {
        let result: Result<Profile, _> = serde_json::from_value(json!({"name": "no sub"}));
        assert!(result.is_err());
    }

    #[test]
    fn profile_serializes_subject_as_sub() {
        let profile = Profile::new("u1").with_name("Test");
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value, json!({"sub": "u1", "name": "Test"}));
    }

    #[test]
    fn display_name_falls_back_to_subject() {
        assert_eq!(Profile::new("u1").display_name(), "u1");
        assert_eq!(Profile::new("u1").with_name("Test").display_name(), "Test");
    }

    #[test]
    fn session_id_from_string() {
        let id = SessionId::from("sess-abc".to_string());
        assert_eq!(id.to_string(), "sess-abc");
        assert_eq!(id.as_str(), "sess-abc");
    }
}
