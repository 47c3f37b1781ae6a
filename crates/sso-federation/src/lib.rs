//! # sso-federation
//!
//! Login-time federation of external directory attributes: a
//! synchronization service that copies mapped directory attributes onto
//! local user records, an event listener that triggers it on login and
//! impersonation, and a token claim mapper that adds the same attributes
//! to issued tokens.
//!
//! Both entry points are fail-open: a directory outage is logged and the
//! login or token issuance proceeds without directory data.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod listener;
pub mod mapper;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FederationError, FederationResult};
pub use listener::{LoginEventListener, LISTENER_ID};
pub use mapper::{LdapClaimMapper, MAPPER_DISPLAY_TYPE, MAPPER_PROVIDER_ID};
pub use service::{AttributeSource, DirectoryAttributeSource, DirectorySyncService};
