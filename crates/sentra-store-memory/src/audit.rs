//! In-memory append-only audit log.

use std::sync::Mutex;

use async_trait::async_trait;

use sentra_auth::SecurityResult;
use sentra_auth::audit::AuditRecord;
use sentra_auth::storage::AuditStore;

/// Append-only audit log held in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditStore {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditStore {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The records appended so far, in order.
    #[must_use]
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, record: &AuditRecord) -> SecurityResult<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
