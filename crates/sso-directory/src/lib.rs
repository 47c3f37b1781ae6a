//! # sso-directory
//!
//! External LDAP directory client subsystem: failover connection
//! establishment over an ordered endpoint list, a keyed registry that
//! caches one client per credential set, and a uniqueness-constrained
//! attribute resolver that maps directory attributes onto local claim
//! names.
//!
//! Built on `ldap3` over tokio. Directory write operations, paging, and
//! referral chasing are out of scope.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod registry;
pub mod resolver;

pub use client::{
    BindCredential, ClientSettings, DirectoryClient, DirectoryEndpointSet, DirectoryEntry,
    SearchQuery,
};
pub use error::{is_bind_rejection, is_communication_error, DirectoryError, DirectoryResult};
pub use registry::{ConnectionKey, ConnectionRegistry};
pub use resolver::{AttributeMapping, AttributeResolver, ResolvedAttributes};
