//! # sso-core
//!
//! Core types for external LDAP federation: configuration loaded from
//! environment variables, login events, the local user-record model, and
//! the storage/cache traits the synchronization layer writes through.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod store;

pub use config::{DirectorySettings, ProviderConfig};
pub use error::{ConfigError, StoreError};
pub use event::{EventType, LoginEvent};
pub use model::{RealmContext, UserRecord};
pub use store::{LocalUserStore, NoUserCache, UserCache};
