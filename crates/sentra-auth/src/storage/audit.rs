//! Durable audit log storage trait.

use async_trait::async_trait;

use crate::SecurityResult;
use crate::audit::AuditRecord;

/// Append-only durable audit log.
///
/// The audit log is advisory, not the enforcement path: the revocation
/// registry writes its cache entry first and treats an audit append failure
/// as non-fatal. Callers needing permanent proof of a revocation consult
/// this log, not the expiring cache.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Appends an immutable audit record.
    ///
    /// # Errors
    ///
    /// Returns an error if the append fails; callers on bookkeeping paths
    /// log and absorb it.
    async fn append(&self, record: &AuditRecord) -> SecurityResult<()>;
}
