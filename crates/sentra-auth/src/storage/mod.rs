//! Storage traits for the security core.
//!
//! Each component receives only the narrow interface it needs, injected as
//! an `Arc<dyn T>` at construction. This keeps the session, revocation,
//! rotation and threat-detection services decoupled at the type level and
//! makes every seam replaceable with a test double.
//!
//! Implementations are provided in separate crates:
//! - `sentra-store-memory` - in-memory backends for development and tests

mod audit;
mod cache;
mod history;
mod session;

pub use audit::AuditStore;
pub use cache::Cache;
pub use history::{AccountControl, GeoPoint, GeoResolver, LoginHistoryStore, LoginRecord};
pub use session::SessionStore;
