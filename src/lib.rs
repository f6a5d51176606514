//! # Claimstore - Tenant-aware claim metadata persistence
//!
//! Persists identity claim metadata in a relational store:
//! - Claim dialects (URI-identified namespaces of claims)
//! - Claims within a dialect, keyed by a store-generated id
//! - Arbitrary name/value properties attached to a claim
//!
//! Operations come in two flavours. Self-transacting operations acquire a
//! connection from a [`ConnectionProvider`] and commit or roll back on their
//! own. Participant operations take a caller-supplied `&rusqlite::Connection`
//! (a write [`ManagedConnection`] or a `rusqlite::Transaction`) and never
//! commit, so several of them can share one atomic transaction.

pub mod model;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{Claim, ClaimDialect, ClaimId, ClaimProperties, TenantId};
pub use storage::{ClaimStore, ConnectionProvider, DialectStore, ManagedConnection, SqliteProvider, StoreOptions};

/// Result type alias for claim metadata operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for claim metadata operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unclassified database failure, failed acquisition, or a constraint
    /// violation that is not a confirmed duplicate.
    #[error("{message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Claim {claim_uri} in dialect {dialect_uri} is already persisted")]
    DuplicateClaim {
        dialect_uri: String,
        claim_uri: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Mapped claim {claim_uri} does not exist in dialect {dialect_uri}")]
    InvalidClaimMapping {
        dialect_uri: String,
        claim_uri: String,
    },
}

impl Error {
    /// Persistence error wrapping a driver failure
    pub fn persistence(message: impl Into<String>, source: rusqlite::Error) -> Self {
        Error::Persistence {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Persistence error with no underlying driver failure
    pub fn persistence_msg(message: impl Into<String>) -> Self {
        Error::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// True for conditions the caller can correct (as opposed to system faults)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::DuplicateClaim { .. } | Error::InvalidClaimMapping { .. })
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::persistence("Database error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let missing = Error::InvalidClaimMapping {
            dialect_uri: "urn:test".into(),
            claim_uri: "urn:test#attr1".into(),
        };
        assert!(missing.is_client_error());
        assert_eq!(
            missing.to_string(),
            "Mapped claim urn:test#attr1 does not exist in dialect urn:test"
        );

        let fault = Error::persistence_msg("Error while adding claim dialect urn:test");
        assert!(!fault.is_client_error());

        let from_driver: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(from_driver, Error::Persistence { source: Some(_), .. }));
    }
}
