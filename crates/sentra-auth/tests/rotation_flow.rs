//! End-to-end refresh rotation flows against the in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use sentra_auth::config::SecurityConfig;
use sentra_auth::fingerprint::{self, RequestMetadata};
use sentra_auth::session::NewSession;
use sentra_auth::{CoreDependencies, SecurityCore, SecurityError, VerifiedRefresh};
use sentra_store_memory::{
    CollectingEventSink, MemoryAuditStore, MemoryCache, MemoryLoginHistoryStore,
    MemorySessionStore, RecordingAccountControl, StaticGeoResolver,
};

const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn build_core(config: SecurityConfig) -> (SecurityCore, Arc<CollectingEventSink>) {
    let events = Arc::new(CollectingEventSink::new());
    let core = SecurityCore::new(
        config,
        CoreDependencies {
            cache: Arc::new(MemoryCache::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            history: Arc::new(MemoryLoginHistoryStore::new()),
            audit: Arc::new(MemoryAuditStore::new()),
            geo: Arc::new(StaticGeoResolver::new()),
            accounts: Arc::new(RecordingAccountControl::new()),
            events: events.clone(),
        },
    );
    (core, events)
}

async fn seed_session(core: &SecurityCore, user_id: Uuid) -> VerifiedRefresh {
    let fingerprint = fingerprint::generate(&RequestMetadata::new(
        Some(CHROME_MAC),
        Some("203.0.113.7"),
        Some("en-US"),
    ));
    let session = core
        .sessions()
        .create_session(NewSession {
            user_id,
            org_id: None,
            fingerprint,
            ip: "203.0.113.7".to_string(),
            user_agent: CHROME_MAC.to_string(),
            access_id: "access-1".to_string(),
            refresh_id: "refresh-1".to_string(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::hours(8),
        })
        .await
        .unwrap();

    VerifiedRefresh {
        user_id,
        session_id: session.id,
        refresh_id: session.refresh_id,
        expires_at: OffsetDateTime::now_utc() + time::Duration::hours(1),
    }
}

#[tokio::test]
async fn rotation_issues_new_pair_and_retires_old_identifier() {
    let (core, _) = build_core(SecurityConfig::default());
    let user = Uuid::new_v4();
    let presented = seed_session(&core, user).await;

    let pair = core.refresh(&presented).await.unwrap();
    assert_eq!(pair.session_id, "access-1");
    assert_ne!(pair.refresh_id, "refresh-1");
    assert!(pair.access_expires_at > OffsetDateTime::now_utc());

    // The session's refresh pointer moved.
    let session = core.verify_session_active("access-1").await.unwrap();
    assert_eq!(session.refresh_id, pair.refresh_id);

    // The superseded identifier is blacklisted as a belt over the family
    // check.
    let status = core.is_revoked("refresh-1").await;
    assert!(status.blacklisted);
    assert_eq!(status.reason.as_deref(), Some("superseded"));

    // The new identifier is clean.
    assert!(!core.is_revoked(&pair.refresh_id).await.blacklisted);
}

#[tokio::test]
async fn replaying_superseded_identifier_burns_the_family() {
    let (core, events) = build_core(SecurityConfig::default());
    let user = Uuid::new_v4();
    let presented = seed_session(&core, user).await;

    let pair = core.refresh(&presented).await.unwrap();

    // Wait out the rotation lock, then replay the original token.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let replayed = core.refresh(&presented).await;
    assert!(matches!(
        replayed,
        Err(SecurityError::TokenFamilyCompromised { .. })
    ));

    // Every member of the family is now revoked, old and new.
    assert!(core.is_revoked("refresh-1").await.blacklisted);
    assert!(core.is_revoked(&pair.refresh_id).await.blacklisted);

    // The session itself is gone.
    assert!(matches!(
        core.verify_session_active("access-1").await,
        Err(SecurityError::SessionInactive { .. })
    ));

    // And the new pair no longer rotates: its session is revoked.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let after = core
        .refresh(&VerifiedRefresh {
            user_id: user,
            session_id: "access-1".to_string(),
            refresh_id: pair.refresh_id.clone(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::hours(1),
        })
        .await;
    assert!(after.is_err());

    assert!(
        events
            .kinds()
            .contains(&"token_family.compromised".to_string())
    );
}

#[tokio::test]
async fn concurrent_rotations_produce_exactly_one_pair() {
    let (core, _) = build_core(SecurityConfig::default());
    let user = Uuid::new_v4();
    let presented = seed_session(&core, user).await;

    let (a, b) = tokio::join!(core.refresh(&presented), core.refresh(&presented));

    let outcomes = [a, b];
    let wins = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(SecurityError::ConcurrentRefreshConflict)))
        .count();
    assert_eq!(wins, 1, "exactly one rotation must win");
    assert_eq!(conflicts, 1, "the loser must see a conflict, not a new pair");
}

#[tokio::test]
async fn expired_token_within_grace_still_rotates() {
    let (core, _) = build_core(SecurityConfig::default());
    let user = Uuid::new_v4();
    let mut presented = seed_session(&core, user).await;

    presented.expires_at = OffsetDateTime::now_utc() - time::Duration::minutes(2);
    assert!(core.refresh(&presented).await.is_ok());
}

#[tokio::test]
async fn expired_token_beyond_grace_is_rejected() {
    let (core, _) = build_core(SecurityConfig::default());
    let user = Uuid::new_v4();
    let mut presented = seed_session(&core, user).await;

    presented.expires_at = OffsetDateTime::now_utc() - time::Duration::minutes(10);
    assert!(matches!(
        core.refresh(&presented).await,
        Err(SecurityError::InvalidToken { .. })
    ));
}

#[tokio::test]
async fn family_size_cap_stops_rotation() {
    let mut config = SecurityConfig::default();
    config.rotation.max_family_size = 3;
    config.rotation.refresh_lock_ttl = Duration::from_millis(10);
    let (core, _) = build_core(config);
    let user = Uuid::new_v4();
    let mut presented = seed_session(&core, user).await;

    // Two rotations grow the family to the cap of three members.
    for _ in 0..2 {
        let pair = core.refresh(&presented).await.unwrap();
        presented.refresh_id = pair.refresh_id;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let result = core.refresh(&presented).await;
    assert!(matches!(
        result,
        Err(SecurityError::TokenFamilyCompromised { .. })
    ));
}

#[tokio::test]
async fn unknown_refresh_identifier_is_invalid() {
    let (core, _) = build_core(SecurityConfig::default());
    let user = Uuid::new_v4();
    seed_session(&core, user).await;

    let result = core
        .refresh(&VerifiedRefresh {
            user_id: user,
            session_id: "access-1".to_string(),
            refresh_id: "never-issued".to_string(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::hours(1),
        })
        .await;
    assert!(matches!(result, Err(SecurityError::InvalidToken { .. })));
}

#[tokio::test]
async fn refresh_for_missing_session_is_not_found() {
    let (core, _) = build_core(SecurityConfig::default());

    let result = core
        .refresh(&VerifiedRefresh {
            user_id: Uuid::new_v4(),
            session_id: "ghost".to_string(),
            refresh_id: "ghost-refresh".to_string(),
            expires_at: OffsetDateTime::now_utc() + time::Duration::hours(1),
        })
        .await;
    assert!(matches!(result, Err(SecurityError::SessionNotFound)));
}
