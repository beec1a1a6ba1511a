//! In-memory login history, geo resolution, and account control.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use sentra_auth::SecurityResult;
use sentra_auth::storage::{AccountControl, GeoPoint, GeoResolver, LoginHistoryStore, LoginRecord};

/// Login records per user, kept in insertion order.
#[derive(Debug, Default)]
pub struct MemoryLoginHistoryStore {
    records: Mutex<Vec<LoginRecord>>,
}

impl MemoryLoginHistoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoginHistoryStore for MemoryLoginHistoryStore {
    async fn append(&self, record: &LoginRecord) -> SecurityResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn recent_for_user(
        &self,
        user_id: Uuid,
        since: OffsetDateTime,
    ) -> SecurityResult<Vec<LoginRecord>> {
        let mut matching: Vec<LoginRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.at >= since)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.at.cmp(&a.at));
        Ok(matching)
    }

    async fn last_before(
        &self,
        user_id: Uuid,
        before: OffsetDateTime,
    ) -> SecurityResult<Option<LoginRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id && r.at < before)
            .max_by_key(|r| r.at)
            .cloned())
    }
}

/// Table-driven geo resolver for tests.
#[derive(Debug, Default)]
pub struct StaticGeoResolver {
    table: HashMap<String, GeoPoint>,
}

impl StaticGeoResolver {
    /// Creates a resolver that knows no locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a known IP location.
    #[must_use]
    pub fn with_location(mut self, ip: impl Into<String>, point: GeoPoint) -> Self {
        self.table.insert(ip.into(), point);
        self
    }
}

#[async_trait]
impl GeoResolver for StaticGeoResolver {
    async fn resolve(&self, ip: &str) -> Option<GeoPoint> {
        self.table.get(ip).copied()
    }
}

/// Records suspension calls for assertions.
#[derive(Debug, Default)]
pub struct RecordingAccountControl {
    suspensions: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingAccountControl {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The suspensions recorded so far.
    #[must_use]
    pub fn suspensions(&self) -> Vec<(Uuid, String)> {
        self.suspensions.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccountControl for RecordingAccountControl {
    async fn suspend_user(&self, user_id: Uuid, reason: &str) -> SecurityResult<()> {
        self.suspensions
            .lock()
            .unwrap()
            .push((user_id, reason.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentra_auth::fingerprint::{DeviceFingerprint, DeviceType};
    use time::Duration;

    fn record(user: Uuid, hours_ago: i64) -> LoginRecord {
        LoginRecord {
            id: Uuid::new_v4(),
            user_id: user,
            ip: "203.0.113.7".into(),
            fingerprint: DeviceFingerprint {
                volatile_hash: "v".into(),
                stable_hash: "s".into(),
                browser: "Chrome".into(),
                os: "macOS".into(),
                device_type: DeviceType::Desktop,
            },
            location: None,
            at: OffsetDateTime::now_utc() - Duration::hours(hours_ago),
        }
    }

    #[tokio::test]
    async fn test_recent_for_user_is_newest_first() {
        let store = MemoryLoginHistoryStore::new();
        let user = Uuid::new_v4();

        store.append(&record(user, 3)).await.unwrap();
        store.append(&record(user, 1)).await.unwrap();
        store.append(&record(user, 2)).await.unwrap();
        store.append(&record(Uuid::new_v4(), 1)).await.unwrap();

        let recent = store
            .recent_for_user(user, OffsetDateTime::now_utc() - Duration::days(1))
            .await
            .unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].at > recent[1].at);
        assert!(recent[1].at > recent[2].at);
    }

    #[tokio::test]
    async fn test_last_before() {
        let store = MemoryLoginHistoryStore::new();
        let user = Uuid::new_v4();
        let newest = record(user, 1);

        store.append(&record(user, 5)).await.unwrap();
        store.append(&newest).await.unwrap();

        let found = store
            .last_before(user, OffsetDateTime::now_utc())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newest.id);

        let none = store
            .last_before(user, OffsetDateTime::now_utc() - Duration::days(1))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_static_geo_resolver() {
        let resolver = StaticGeoResolver::new()
            .with_location("203.0.113.7", GeoPoint::new(37.7749, -122.4194));

        assert!(resolver.resolve("203.0.113.7").await.is_some());
        assert!(resolver.resolve("198.51.100.9").await.is_none());
    }
}
