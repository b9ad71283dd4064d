use std::collections::HashMap;
use std::time::Duration as StdDuration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::traits::{BoxError, SessionStore};
use crate::types::{Profile, SessionId};

/// Anti-forgery value written by `/login`, consumed by `/callback`.
pub const STATE_KEY: &str = "state";
/// Provider access token, written by a successful callback.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Verified [`Profile`]; its presence is what makes a session authenticated.
pub const PROFILE_KEY: &str = "profile";

/// Key/value state of one browser session.
///
/// Mutations are local until the session is handed to [`SessionStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    values: HashMap<String, JsonValue>,
    is_new: bool,
}

impl Session {
    /// Empty session that has never been persisted.
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            values: HashMap::new(),
            is_new: true,
        }
    }

    /// Session rebuilt from stored values.
    #[must_use]
    pub fn from_values(id: SessionId, values: HashMap<String, JsonValue>) -> Self {
        Self {
            id,
            values,
            is_new: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Whether this session was created for the current request.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    #[must_use]
    pub fn values(&self) -> &HashMap<String, JsonValue> {
        &self.values
    }

    /// Raw value under `key`.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Value under `key`, or `None` if absent, null, or of another shape.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.values.get(key) {
            None | Some(JsonValue::Null) => None,
            Some(value) => serde_json::from_value(value.clone()).ok(),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if `value` cannot be represented as JSON.
    pub fn set<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Same values under a fresh id, as a new unsaved session.
    #[must_use]
    pub fn renew(self, id: SessionId) -> Self {
        Self {
            id,
            values: self.values,
            is_new: true,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.values.remove(key)
    }

    /// The stored profile. An absent, null or malformed entry yields `None`.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.get(PROFILE_KEY)
    }
}

/// Process-wide in-memory [`SessionStore`].
///
/// Each save stamps the session with `now + ttl`; expired sessions are never
/// loaded and are swept from the map by later saves. Match the ttl to the
/// cookie `Max-Age` so an old cookie cannot outlive its session.
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: StdDuration,
    entries: RwLock<Entries>,
}

#[derive(Debug)]
struct Entries {
    sessions: HashMap<SessionId, Entry>,
    next_sweep: Instant,
}

#[derive(Debug)]
struct Entry {
    values: HashMap<String, JsonValue>,
    expires_at: Instant,
}

impl Entries {
    fn purge(&mut self, now: Instant) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.expires_at > now);
        self.next_sweep = now + SWEEP_INTERVAL;
        before - self.sessions.len()
    }
}

const DEFAULT_TTL: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            entries: RwLock::new(Entries {
                sessions: HashMap::new(),
                next_sweep: Instant::now() + SWEEP_INTERVAL,
            }),
        }
    }
}

impl MemorySessionStore {
    /// Empty store keeping sessions for one day after their last save.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a session lives after its last save. Negative values count as zero.
    #[must_use]
    pub fn with_ttl(mut self, ttl: time::Duration) -> Self {
        self.ttl = StdDuration::try_from(ttl).unwrap_or(StdDuration::ZERO);
        self
    }

    fn expiry(&self, now: Instant) -> Instant {
        now.checked_add(self.ttl).unwrap_or(now + DEFAULT_TTL)
    }

    /// Number of stored sessions, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.sessions.is_empty()
    }

    /// Ids of all live sessions.
    pub async fn ids(&self) -> Vec<SessionId> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .sessions
            .iter()
            .filter(|(_, entry)| entry.expires_at > now)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Drop every expired session now; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.entries.write().await.purge(Instant::now())
    }
}

impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, BoxError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .sessions
            .get(id)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| Session::from_values(id.clone(), entry.values.clone())))
    }

    async fn save(&self, session: &Session) -> Result<(), BoxError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if now >= entries.next_sweep {
            let evicted = entries.purge(now);
            if evicted > 0 {
                tracing::debug!(evicted, "Swept expired sessions");
            }
        }
        entries.sessions.insert(
            session.id().clone(),
            Entry {
                values: session.values().clone(),
                expires_at: self.expiry(now),
            },
        );
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), BoxError> {
        self.entries.write().await.sessions.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sid(s: &str) -> SessionId {
        SessionId::from(s.to_string())
    }

    #[test]
    fn set_get_remove() {
        let mut session = Session::new(sid("s1"));
        session.set(STATE_KEY, "xyz").unwrap();

        assert_eq!(session.get::<String>(STATE_KEY).as_deref(), Some("xyz"));
        assert!(session.remove(STATE_KEY).is_some());
        assert_eq!(session.get::<String>(STATE_KEY), None);
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut session = Session::new(sid("s1"));
        session.set(STATE_KEY, "first").unwrap();
        session.set(STATE_KEY, "second").unwrap();
        assert_eq!(session.get::<String>(STATE_KEY).as_deref(), Some("second"));
    }

    #[test]
    fn profile_absent_null_or_empty_is_none() {
        let mut session = Session::new(sid("s1"));
        assert!(session.profile().is_none());

        session.set(PROFILE_KEY, &JsonValue::Null).unwrap();
        assert!(session.profile().is_none());

        session.set(PROFILE_KEY, &json!({})).unwrap();
        assert!(session.profile().is_none());
    }

    #[test]
    fn profile_roundtrips_through_session() {
        let mut session = Session::new(sid("s1"));
        let profile = Profile::new("u1").with_name("Test");
        session.set(PROFILE_KEY, &profile).unwrap();
        assert_eq!(session.profile(), Some(profile));
    }

    #[tokio::test]
    async fn memory_store_save_load_destroy() {
        let store = MemorySessionStore::new();
        let mut session = Session::new(sid("s1"));
        session.set(ACCESS_TOKEN_KEY, "at").unwrap();

        assert!(store.load(&sid("s1")).await.unwrap().is_none());

        store.save(&session).await.unwrap();
        let loaded = store.load(&sid("s1")).await.unwrap().unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.get::<String>(ACCESS_TOKEN_KEY).as_deref(), Some("at"));
        assert_eq!(store.len().await, 1);

        store.destroy(&sid("s1")).await.unwrap();
        assert!(store.load(&sid("s1")).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[test]
    fn renew_keeps_values_under_new_id() {
        let mut session = Session::from_values(sid("old"), HashMap::new());
        session.set(ACCESS_TOKEN_KEY, "at").unwrap();

        let renewed = session.renew(sid("new"));
        assert_eq!(renewed.id(), &sid("new"));
        assert!(renewed.is_new());
        assert_eq!(renewed.get::<String>(ACCESS_TOKEN_KEY).as_deref(), Some("at"));
    }

    #[tokio::test(start_paused = true)]
    async fn memory_store_expires_sessions() {
        let store = MemorySessionStore::new().with_ttl(time::Duration::hours(1));
        store.save(&Session::new(sid("s1"))).await.unwrap();

        tokio::time::advance(StdDuration::from_secs(59 * 60)).await;
        assert!(store.load(&sid("s1")).await.unwrap().is_some());

        tokio::time::advance(StdDuration::from_secs(2 * 60)).await;
        assert!(store.load(&sid("s1")).await.unwrap().is_none());
        assert!(store.ids().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn memory_store_save_extends_lifetime() {
        let store = MemorySessionStore::new().with_ttl(time::Duration::hours(1));
        let session = Session::new(sid("s1"));
        store.save(&session).await.unwrap();

        tokio::time::advance(StdDuration::from_secs(50 * 60)).await;
        store.save(&session).await.unwrap();

        tokio::time::advance(StdDuration::from_secs(50 * 60)).await;
        assert!(store.load(&sid("s1")).await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn memory_store_sweeps_expired_sessions_on_save() {
        let store = MemorySessionStore::new().with_ttl(time::Duration::minutes(5));
        for i in 0..100 {
            store.save(&Session::new(sid(&format!("anon-{i}")))).await.unwrap();
        }
        assert_eq!(store.len().await, 100);

        tokio::time::advance(StdDuration::from_secs(6 * 60)).await;
        store.save(&Session::new(sid("fresh"))).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.ids().await, vec![sid("fresh")]);
    }

    #[tokio::test(start_paused = true)]
    async fn memory_store_purge_expired_reports_evictions() {
        let store = MemorySessionStore::new().with_ttl(time::Duration::minutes(5));
        store.save(&Session::new(sid("a"))).await.unwrap();
        tokio::time::advance(StdDuration::from_secs(3 * 60)).await;
        store.save(&Session::new(sid("b"))).await.unwrap();

        tokio::time::advance(StdDuration::from_secs(3 * 60)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.ids().await, vec![sid("b")]);
    }

    #[tokio::test]
    async fn memory_store_negative_ttl_expires_immediately() {
        let store = MemorySessionStore::new().with_ttl(time::Duration::seconds(-5));
        store.save(&Session::new(sid("s1"))).await.unwrap();
        assert!(store.load(&sid("s1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_keeps_sessions_apart() {
        let store = MemorySessionStore::new();
        let mut a = Session::new(sid("a"));
        a.set(STATE_KEY, "state-a").unwrap();
        let mut b = Session::new(sid("b"));
        b.set(STATE_KEY, "state-b").unwrap();

        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();

        let loaded = store.load(&sid("a")).await.unwrap().unwrap();
        assert_eq!(loaded.get::<String>(STATE_KEY).as_deref(), Some("state-a"));
        assert_eq!(store.len().await, 2);
    }
}
