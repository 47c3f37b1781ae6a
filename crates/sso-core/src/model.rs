//! Local user-record model.
//!
//! Records live in the host's local storage; this crate only reads them
//! and overwrites single-valued attributes with directory data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The realm a synchronization call runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmContext {
    /// Realm identifier.
    pub id: Uuid,
    /// Realm name, for logging.
    pub name: String,
}

impl RealmContext {
    /// Creates a new realm context.
    #[must_use]
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A user record from local storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this user belongs to.
    pub realm_id: Uuid,
    /// Unique username within the realm.
    pub username: String,
    /// Email address.
    pub email: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Custom attributes; directory claims land here single-valued.
    pub attributes: HashMap<String, Vec<String>>,
}

impl UserRecord {
    /// Creates a new record with the given username.
    #[must_use]
    pub fn new(realm_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            username: username.into(),
            email: None,
            first_name: None,
            last_name: None,
            attributes: HashMap::new(),
        }
    }

    /// Overwrites an attribute with a single value. Last write wins; any
    /// existing multi-valued content is replaced.
    pub fn set_single_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), vec![value.into()]);
    }

    /// Gets the first value of an attribute.
    #[must_use]
    pub fn get_first_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }
}
