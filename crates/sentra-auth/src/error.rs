//! Security core error types.
//!
//! This module defines all error types that can occur during session,
//! revocation, and rotation operations.
//!
//! # Propagation Policy
//!
//! Authentication-path errors (`InvalidToken`, `SessionInactive`,
//! `RateLimited`, `ConcurrentRefreshConflict`) are returned to callers as
//! typed failures and should be translated into a generic "reauthenticate"
//! response; never leak internal detail to clients. Bookkeeping failures
//! (eviction scoring, audit writes, cleanup sweeps) are logged and absorbed
//! by the components themselves and never surface through this type.

use std::fmt;

/// Errors that can occur in the session and token security core.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// The presented token is malformed, expired beyond grace, or otherwise
    /// unusable.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// No session exists for the given identifier.
    #[error("Session not found")]
    SessionNotFound,

    /// The session exists but is revoked, expired, or unverifiable.
    #[error("Session inactive: {message}")]
    SessionInactive {
        /// Description of why the session is inactive.
        message: String,
    },

    /// Another refresh for the same token is already in flight.
    ///
    /// This is a hard failure, not a retry-with-wait: waiting risks serving
    /// a stale pair after the winner has already rotated.
    #[error("Concurrent refresh conflict")]
    ConcurrentRefreshConflict,

    /// A superseded refresh identifier was replayed, or the token family
    /// exceeded its size cap. Replay triggers cascading revocation of the
    /// whole family before this error is returned.
    #[error("Token family compromised: {message}")]
    TokenFamilyCompromised {
        /// Description of the compromise.
        message: String,
    },

    /// The caller is locked out by the brute-force detector.
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the lockout lapses.
        retry_after_secs: u64,
    },

    /// The shared cache or durable store is unreachable.
    ///
    /// On the revocation check path this is never surfaced; the registry
    /// fails secure instead. On the session read path it is surfaced as
    /// `SessionInactive`.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable {
        /// Description of the storage failure.
        message: String,
    },

    /// The security configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl SecurityError {
    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `SessionInactive` error.
    #[must_use]
    pub fn session_inactive(message: impl Into<String>) -> Self {
        Self::SessionInactive {
            message: message.into(),
        }
    }

    /// Creates a new `TokenFamilyCompromised` error.
    #[must_use]
    pub fn family_compromised(message: impl Into<String>) -> Self {
        Self::TokenFamilyCompromised {
            message: message.into(),
        }
    }

    /// Creates a new `RateLimited` error.
    #[must_use]
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates a new `StorageUnavailable` error.
    #[must_use]
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this error should be translated into a generic
    /// "reauthenticate" response on the authentication path.
    #[must_use]
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. }
                | Self::SessionNotFound
                | Self::SessionInactive { .. }
                | Self::ConcurrentRefreshConflict
                | Self::RateLimited { .. }
        )
    }

    /// Returns `true` if this error indicates token theft or replay.
    #[must_use]
    pub fn is_compromise(&self) -> bool {
        matches!(self, Self::TokenFamilyCompromised { .. })
    }

    /// Returns `true` if this is an infrastructure failure rather than a
    /// client-caused one.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::SessionNotFound => ErrorCategory::Session,
            Self::SessionInactive { .. } => ErrorCategory::Session,
            Self::ConcurrentRefreshConflict => ErrorCategory::Rotation,
            Self::TokenFamilyCompromised { .. } => ErrorCategory::Compromise,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::StorageUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of security errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Token validation errors.
    Token,
    /// Session lifecycle errors.
    Session,
    /// Refresh rotation errors.
    Rotation,
    /// Token theft / replay detection.
    Compromise,
    /// Brute-force lockout.
    RateLimit,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "token"),
            Self::Session => write!(f, "session"),
            Self::Rotation => write!(f, "rotation"),
            Self::Compromise => write!(f, "compromise"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SecurityError::invalid_token("signature mismatch");
        assert_eq!(err.to_string(), "Invalid token: signature mismatch");

        let err = SecurityError::rate_limited(900);
        assert_eq!(err.to_string(), "Rate limited: retry after 900s");

        let err = SecurityError::ConcurrentRefreshConflict;
        assert_eq!(err.to_string(), "Concurrent refresh conflict");
    }

    #[test]
    fn test_error_predicates() {
        assert!(SecurityError::SessionNotFound.is_authentication_error());
        assert!(SecurityError::rate_limited(60).is_authentication_error());
        assert!(!SecurityError::family_compromised("replay").is_authentication_error());
        assert!(SecurityError::family_compromised("replay").is_compromise());
        assert!(SecurityError::storage_unavailable("cache down").is_server_error());
        assert!(!SecurityError::invalid_token("bad").is_server_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            SecurityError::invalid_token("x").category(),
            ErrorCategory::Token
        );
        assert_eq!(
            SecurityError::ConcurrentRefreshConflict.category(),
            ErrorCategory::Rotation
        );
        assert_eq!(
            SecurityError::family_compromised("x").category(),
            ErrorCategory::Compromise
        );
        assert_eq!(
            SecurityError::storage_unavailable("x").category(),
            ErrorCategory::Infrastructure
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Compromise.to_string(), "compromise");
        assert_eq!(ErrorCategory::RateLimit.to_string(), "rate_limit");
        assert_eq!(ErrorCategory::Session.to_string(), "session");
    }
}
