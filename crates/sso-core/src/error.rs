//! Core error types.
//!
//! Configuration errors are fatal at construction time: a provider with
//! missing settings never starts. Storage errors are reported by the
//! local-store and cache implementations supplied by the host.

use thiserror::Error;

/// Errors raised while loading provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    ///
    /// The message text is part of the public contract and must not change.
    #[error("The environment variable {0} is mandatory but is not present")]
    MissingVariable(&'static str),

    /// An environment variable is present but cannot be parsed.
    #[error("The environment variable {name} has an invalid value: {reason}")]
    InvalidVariable {
        /// Name of the offending variable.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors reported by local user storage and cache implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup against the local store failed.
    #[error("user lookup failed: {0}")]
    Lookup(String),

    /// Attribute write against the local store failed.
    #[error("attribute write failed: {0}")]
    Write(String),
}

impl StoreError {
    /// Creates a lookup error.
    #[must_use]
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Creates a write error.
    #[must_use]
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
