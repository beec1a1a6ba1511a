//! In-memory session store.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;
use uuid::Uuid;

use sentra_auth::SecurityResult;
use sentra_auth::error::SecurityError;
use sentra_auth::session::Session;
use sentra_auth::storage::SessionStore;

/// Session rows keyed by session id.
///
/// Refresh-identifier lookups scan the map; fine for tests and small
/// deployments, a real backend indexes both.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    rows: DashMap<String, Session>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held, including terminal ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &Session) -> SecurityResult<()> {
        if self.rows.contains_key(&session.id) {
            return Err(SecurityError::internal(format!(
                "duplicate session id {}",
                session.id
            )));
        }
        self.rows.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> SecurityResult<Option<Session>> {
        Ok(self.rows.get(id).map(|row| row.value().clone()))
    }

    async fn find_by_refresh_id(&self, refresh_id: &str) -> SecurityResult<Option<Session>> {
        Ok(self
            .rows
            .iter()
            .find(|row| row.refresh_id == refresh_id)
            .map(|row| row.value().clone()))
    }

    async fn list_active_by_user(&self, user_id: Uuid) -> SecurityResult<Vec<Session>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| row.user_id == user_id && row.is_active())
            .map(|row| row.value().clone())
            .collect())
    }

    async fn update(&self, session: &Session) -> SecurityResult<()> {
        if !self.rows.contains_key(&session.id) {
            return Err(SecurityError::internal(format!(
                "unknown session id {}",
                session.id
            )));
        }
        self.rows.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: OffsetDateTime) -> SecurityResult<u64> {
        let before = self.rows.len();
        self.rows.retain(|_, session| {
            let terminal_at = session.revoked_at.unwrap_or(session.expires_at);
            terminal_at >= cutoff
        });
        Ok((before - self.rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentra_auth::fingerprint::{DeviceFingerprint, DeviceType};
    use time::Duration;

    fn session(id: &str, user_id: Uuid, expires_at: OffsetDateTime) -> Session {
        Session {
            id: id.to_string(),
            refresh_id: format!("r-{id}"),
            user_id,
            org_id: None,
            fingerprint: DeviceFingerprint {
                volatile_hash: "v".into(),
                stable_hash: "s".into(),
                browser: "Chrome".into(),
                os: "macOS".into(),
                device_type: DeviceType::Desktop,
            },
            ip: "203.0.113.7".into(),
            user_agent: String::new(),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            last_used_at: OffsetDateTime::now_utc(),
            revoked_at: None,
            revoked_reason: None,
            revoked_by: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicates() {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        let row = session("s1", user, OffsetDateTime::now_utc() + Duration::hours(1));

        store.insert(&row).await.unwrap();
        assert!(store.insert(&row).await.is_err());
    }

    #[tokio::test]
    async fn test_lookup_by_refresh_id() {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        store
            .insert(&session(
                "s1",
                user,
                OffsetDateTime::now_utc() + Duration::hours(1),
            ))
            .await
            .unwrap();

        let found = store.find_by_refresh_id("r-s1").await.unwrap();
        assert_eq!(found.unwrap().id, "s1");
        assert!(store.find_by_refresh_id("r-s2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_excludes_expired_and_revoked() {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        store
            .insert(&session("live", user, now + Duration::hours(1)))
            .await
            .unwrap();
        store
            .insert(&session("expired", user, now - Duration::hours(1)))
            .await
            .unwrap();
        let mut revoked = session("revoked", user, now + Duration::hours(1));
        revoked.revoked_at = Some(now);
        store.insert(&revoked).await.unwrap();

        let active = store.list_active_by_user(user).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "live");
    }

    #[tokio::test]
    async fn test_purge_respects_retention() {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        // Revoked long ago: purged. Revoked recently: kept. Active: kept.
        let mut old = session("old", user, now + Duration::hours(1));
        old.revoked_at = Some(now - Duration::days(10));
        store.insert(&old).await.unwrap();

        let mut recent = session("recent", user, now + Duration::hours(1));
        recent.revoked_at = Some(now - Duration::hours(1));
        store.insert(&recent).await.unwrap();

        store
            .insert(&session("live", user, now + Duration::hours(1)))
            .await
            .unwrap();

        let purged = store.purge_older_than(now - Duration::days(7)).await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.len(), 2);
        assert!(store.find_by_id("old").await.unwrap().is_none());
    }
}
