//! Federation error taxonomy.
//!
//! Lower layers keep their own error types; this enum only wraps them so
//! callers see one surface. The two messages with literal text are part of
//! the public contract and must not be reworded.

use sso_core::{ConfigError, StoreError};
use sso_directory::DirectoryError;
use thiserror::Error;

/// Errors raised by the federation layer.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The directory subsystem failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The local store or cache failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The user to synchronize does not exist in local storage.
    #[error("User with id {0} not found")]
    UserNotFound(String),

    /// Token enrichment failed while reading directory attributes.
    #[error("Error reading attributes: {0}")]
    Enrichment(String),
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_not_found_message_is_exact() {
        let err = FederationError::UserNotFound(
            "0191e4a0-5be2-7d10-a106-5f1e3c0b1a2d".to_string(),
        );
        assert_eq!(
            err.to_string(),
            "User with id 0191e4a0-5be2-7d10-a106-5f1e3c0b1a2d not found"
        );
    }

    #[test]
    fn wrapped_errors_keep_their_message() {
        let inner = DirectoryError::AmbiguousOrMissingEntry {
            count: 2,
            base_dn: "dc=example,dc=com".to_string(),
            filter: "(cn=smith)".to_string(),
        };
        let err = FederationError::from(inner);
        assert_eq!(
            err.to_string(),
            "Found 2 record(s) using baseDN dc=example,dc=com and filter (cn=smith). Expected 1"
        );
    }

    #[test]
    fn enrichment_prefixes_the_cause() {
        let err = FederationError::Enrichment("directory unavailable: boom".to_string());
        assert_eq!(
            err.to_string(),
            "Error reading attributes: directory unavailable: boom"
        );
    }
}
