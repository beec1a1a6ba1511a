//! Security core wiring.
//!
//! Constructs the registry, session manager, rotation engine and threat
//! detectors as explicit objects owning injected handles, wired once at
//! process start, never through module-global singletons, and exposes the
//! synchronous query surface used by the authentication request path.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::SecurityResult;
use crate::config::SecurityConfig;
use crate::events::EventSink;
use crate::fingerprint::{self, RequestMetadata};
use crate::housekeeping::Housekeeper;
use crate::revocation::{RevocationRegistry, RevocationStatus};
use crate::rotation::{RotatedPair, RotationEngine, VerifiedRefresh};
use crate::session::{Session, SessionManager};
use crate::storage::{
    AccountControl, AuditStore, Cache, GeoResolver, LoginHistoryStore, LoginRecord, SessionStore,
};
use crate::threat::{BruteForceDetector, RiskAssessment, TakeoverScorer};

/// External handles the core is wired with.
pub struct CoreDependencies {
    /// Shared expiring key-value cache.
    pub cache: Arc<dyn Cache>,
    /// Durable session row storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Login history source.
    pub history: Arc<dyn LoginHistoryStore>,
    /// Durable audit log.
    pub audit: Arc<dyn AuditStore>,
    /// Best-effort IP location resolution.
    pub geo: Arc<dyn GeoResolver>,
    /// Account status control.
    pub accounts: Arc<dyn AccountControl>,
    /// Security event consumer.
    pub events: Arc<dyn EventSink>,
}

/// The assembled session-and-token security core.
pub struct SecurityCore {
    registry: Arc<RevocationRegistry>,
    sessions: Arc<SessionManager>,
    rotation: Arc<RotationEngine>,
    brute_force: Arc<BruteForceDetector>,
    takeover: Arc<TakeoverScorer>,
    history: Arc<dyn LoginHistoryStore>,
    geo: Arc<dyn GeoResolver>,
    config: SecurityConfig,
}

impl SecurityCore {
    /// Wires all components with the given configuration and handles.
    #[must_use]
    pub fn new(config: SecurityConfig, deps: CoreDependencies) -> Self {
        let registry = Arc::new(RevocationRegistry::new(
            deps.cache.clone(),
            deps.audit,
            config.revocation.clone(),
        ));
        let sessions = Arc::new(SessionManager::new(
            deps.sessions,
            deps.events.clone(),
            config.session.clone(),
        ));
        let rotation = Arc::new(RotationEngine::new(
            deps.cache.clone(),
            registry.clone(),
            sessions.clone(),
            deps.events.clone(),
            config.rotation.clone(),
        ));
        let brute_force = Arc::new(BruteForceDetector::new(
            deps.cache,
            deps.events.clone(),
            config.brute_force.clone(),
        ));
        let takeover = Arc::new(TakeoverScorer::new(
            deps.history.clone(),
            sessions.clone(),
            deps.accounts,
            deps.events,
            config.travel.clone(),
            config.takeover.clone(),
        ));

        Self {
            registry,
            sessions,
            rotation,
            brute_force,
            takeover,
            history: deps.history,
            geo: deps.geo,
            config,
        }
    }

    /// The session lifecycle manager.
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// The revocation registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<RevocationRegistry> {
        &self.registry
    }

    /// The brute-force detector.
    #[must_use]
    pub fn brute_force(&self) -> &Arc<BruteForceDetector> {
        &self.brute_force
    }

    /// The account-takeover scorer.
    #[must_use]
    pub fn takeover(&self) -> &Arc<TakeoverScorer> {
        &self.takeover
    }

    /// Checks that an access identifier maps to an active session.
    pub async fn verify_session_active(&self, access_id: &str) -> SecurityResult<Session> {
        self.sessions.verify_session_active(access_id).await
    }

    /// Checks whether a token identifier is revoked. Fail-secure.
    pub async fn is_revoked(&self, identifier: &str) -> RevocationStatus {
        self.registry.is_blacklisted(identifier).await
    }

    /// Rotates a verified refresh token into a new pair.
    pub async fn refresh(&self, presented: &VerifiedRefresh) -> SecurityResult<RotatedPair> {
        self.rotation.refresh(presented).await
    }

    /// Records a login in the history source and scores it for takeover
    /// risk.
    ///
    /// Resolves the IP to a location best-effort; an unresolvable IP
    /// disables impossible-travel evaluation for this event.
    pub async fn record_login(
        &self,
        user_id: Uuid,
        metadata: &RequestMetadata,
    ) -> SecurityResult<(LoginRecord, RiskAssessment)> {
        let ip = metadata.ip.clone().unwrap_or_default();
        let record = LoginRecord {
            id: Uuid::new_v4(),
            user_id,
            location: self.geo.resolve(&ip).await,
            ip,
            fingerprint: fingerprint::generate(metadata),
            at: OffsetDateTime::now_utc(),
        };
        self.history.append(&record).await?;

        let assessment = self.takeover.assess(&record).await?;
        Ok((record, assessment))
    }

    /// Builds the housekeeping task over this core's components.
    #[must_use]
    pub fn housekeeper(&self) -> Housekeeper {
        Housekeeper::new(
            self.registry.clone(),
            self.sessions.clone(),
            self.brute_force.clone(),
            self.config.housekeeping.clone(),
        )
    }
}
