//! Periodic housekeeping task.
//!
//! Runs the revocation sweep, expired-session purge, and brute-force
//! window cleanup on a fixed interval. Modeled as an explicit cancellable
//! task with a shutdown hook rather than an unref'd timer: `spawn` returns
//! a handle whose `shutdown` stops the loop and joins it.
//!
//! Every sweep error is logged and absorbed; housekeeping must never fail
//! anything else.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::config::HousekeepingConfig;
use crate::revocation::RevocationRegistry;
use crate::session::SessionManager;
use crate::threat::BruteForceDetector;

/// Counts from one housekeeping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Lapsed revocation entries removed.
    pub revocations_removed: u64,
    /// Terminal session rows purged past retention.
    pub sessions_purged: u64,
    /// Stale brute-force windows removed.
    pub windows_removed: u64,
}

/// The housekeeping task.
pub struct Housekeeper {
    registry: Arc<RevocationRegistry>,
    sessions: Arc<SessionManager>,
    brute_force: Arc<BruteForceDetector>,
    config: HousekeepingConfig,
}

impl Housekeeper {
    /// Creates a new housekeeper.
    #[must_use]
    pub fn new(
        registry: Arc<RevocationRegistry>,
        sessions: Arc<SessionManager>,
        brute_force: Arc<BruteForceDetector>,
        config: HousekeepingConfig,
    ) -> Self {
        Self {
            registry,
            sessions,
            brute_force,
            config,
        }
    }

    /// Runs one sweep across all subsystems.
    pub async fn sweep_once(&self) -> SweepReport {
        let report = SweepReport {
            revocations_removed: self.registry.sweep().await,
            sessions_purged: self.sessions.purge_expired().await,
            windows_removed: self.brute_force.sweep().await,
        };
        if report != SweepReport::default() {
            debug!(?report, "housekeeping sweep");
        }
        report
    }

    /// Spawns the periodic loop, returning its shutdown handle.
    #[must_use]
    pub fn spawn(self) -> HousekeepingHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);
            // The first tick completes immediately; skip it so sweeps run
            // one interval after startup.
            ticker.tick().await;

            info!(interval_secs = self.config.interval.as_secs(), "housekeeping started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!("housekeeping stopped");
                        break;
                    }
                }
            }
        });

        HousekeepingHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running housekeeping loop.
pub struct HousekeepingHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl HousekeepingHandle {
    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
