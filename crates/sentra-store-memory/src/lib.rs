//! In-memory storage backends for the Sentra security core.
//!
//! This crate provides in-memory implementations of the storage traits
//! from `sentra-auth`, used for development and as the test backend:
//!
//! - [`MemoryCache`] - expiring key-value cache with atomic conditional set
//! - [`MemorySessionStore`] - session rows
//! - [`MemoryLoginHistoryStore`] - login history
//! - [`MemoryAuditStore`] - append-only audit log
//! - [`StaticGeoResolver`] - table-driven IP location resolution
//! - [`RecordingAccountControl`] - records suspension calls
//! - [`CollectingEventSink`] - collects emitted security events
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sentra_auth::{CoreDependencies, SecurityConfig, SecurityCore, TracingEventSink};
//! use sentra_store_memory::*;
//!
//! let core = SecurityCore::new(SecurityConfig::default(), CoreDependencies {
//!     cache: Arc::new(MemoryCache::new()),
//!     sessions: Arc::new(MemorySessionStore::new()),
//!     history: Arc::new(MemoryLoginHistoryStore::new()),
//!     audit: Arc::new(MemoryAuditStore::new()),
//!     geo: Arc::new(StaticGeoResolver::new()),
//!     accounts: Arc::new(RecordingAccountControl::new()),
//!     events: Arc::new(TracingEventSink),
//! });
//! ```

mod audit;
mod cache;
mod events;
mod history;
mod session;

pub use audit::MemoryAuditStore;
pub use cache::MemoryCache;
pub use events::CollectingEventSink;
pub use history::{MemoryLoginHistoryStore, RecordingAccountControl, StaticGeoResolver};
pub use session::MemorySessionStore;
