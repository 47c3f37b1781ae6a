//! Directory error taxonomy.
//!
//! Communication failures (dropped connection, timeout) are the only class
//! the client retries, and only once. Everything else propagates unchanged:
//! a malformed filter or a rejected bind will not get better by retrying.

use thiserror::Error;

/// Errors raised by the directory subsystem.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Invalid client configuration (empty endpoint list and the like).
    #[error("directory configuration error: {0}")]
    Configuration(String),

    /// Every candidate endpoint failed, or the reconnect retry was
    /// exhausted. Carries the last underlying cause.
    #[error("directory unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Last underlying protocol error, if any.
        #[source]
        source: Option<ldap3::LdapError>,
    },

    /// Bind was rejected by the server.
    #[error("directory bind failed: {0}")]
    Bind(String),

    /// A search failed for a non-communication reason.
    #[error("directory search failed: {0}")]
    Search(String),

    /// The uniqueness constraint was violated: zero or more than one entry
    /// matched. The message text is part of the public contract.
    #[error("Found {count} record(s) using baseDN {base_dn} and filter {filter}. Expected 1")]
    AmbiguousOrMissingEntry {
        /// Number of entries found.
        count: usize,
        /// Base DN of the search.
        base_dn: String,
        /// Filter of the search.
        filter: String,
    },
}

impl DirectoryError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an unavailable error wrapping the last underlying cause.
    #[must_use]
    pub fn unavailable(message: impl Into<String>, source: ldap3::LdapError) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Whether this error means the directory could not be reached.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Classifies a raw protocol error as communication-class or not.
///
/// Communication-class errors mean the transport broke underneath us: the
/// connection is stale and a reconnect may succeed. A non-zero LDAP result
/// code (`LdapResult`), a filter parse error, and similar failures are not
/// communication errors and must never be retried.
#[must_use]
pub fn is_communication_error(err: &ldap3::LdapError) -> bool {
    matches!(
        err,
        ldap3::LdapError::Io { .. }
            | ldap3::LdapError::EndOfStream
            | ldap3::LdapError::OpSend { .. }
            | ldap3::LdapError::ResultRecv { .. }
            | ldap3::LdapError::IdScrubSend { .. }
            | ldap3::LdapError::Timeout { .. }
    )
}

/// Whether a raw protocol error raised during connection setup is a
/// rejected bind rather than an unreachable endpoint.
///
/// The only result-carrying error on the connect path is the bind
/// response; transport failures surface as the communication class.
#[must_use]
pub fn is_bind_rejection(err: &ldap3::LdapError) -> bool {
    matches!(err, ldap3::LdapError::LdapResult { .. })
}
