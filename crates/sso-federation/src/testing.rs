//! In-memory fakes shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use sso_core::error::StoreResult;
use sso_core::{LocalUserStore, ProviderConfig, RealmContext, UserCache, UserRecord};
use sso_directory::{AttributeMapping, DirectoryError, ResolvedAttributes};
use uuid::Uuid;

use crate::error::{FederationError, FederationResult};
use crate::service::AttributeSource;

pub(crate) fn realm() -> RealmContext {
    RealmContext::new(Uuid::now_v7(), "test-realm")
}

pub(crate) fn enabled_config() -> ProviderConfig {
    ProviderConfig::from_values(
        Some("true"),
        Some("true"),
        Some("ldap://localhost:3389,ldap://localhost:4389"),
        Some("cn=admin,dc=ldap,dc=example,dc=com"),
        Some("password"),
        Some("ou=users,dc=ldap,dc=example,dc=com"),
        Some("employeeNumber=numero,title=titolo"),
        Some("cn"),
        None,
        None,
        None,
    )
    .unwrap()
}

pub(crate) fn disabled_config() -> ProviderConfig {
    ProviderConfig::from_values(
        Some("false"),
        Some("false"),
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
        None,
    )
    .unwrap()
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn with_user(user: UserRecord) -> Self {
        let store = Self::default();
        store.users.lock().unwrap().insert(user.id, user);
        store
    }

    pub(crate) fn user(&self, id: Uuid) -> Option<UserRecord> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl LocalUserStore for MemoryStore {
    async fn find_user_by_id(
        &self,
        _realm_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn set_single_attribute(
        &self,
        _realm_id: Uuid,
        user_id: Uuid,
        name: &str,
        value: &str,
    ) -> StoreResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.set_single_attribute(name, value);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MemoryCache {
    users: Mutex<HashMap<Uuid, UserRecord>>,
    writes: AtomicUsize,
}

impl MemoryCache {
    pub(crate) fn with_user(user: UserRecord) -> Self {
        let cache = Self::default();
        cache.users.lock().unwrap().insert(user.id, user);
        cache
    }

    pub(crate) fn user(&self, id: Uuid) -> Option<UserRecord> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl UserCache for MemoryCache {
    async fn find_cached_user_by_id(
        &self,
        _realm_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<UserRecord>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn set_single_attribute(
        &self,
        _realm_id: Uuid,
        user_id: Uuid,
        name: &str,
        value: &str,
    ) -> StoreResult<()> {
        if let Some(user) = self.users.lock().unwrap().get_mut(&user_id) {
            user.set_single_attribute(name, value);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub(crate) struct StubSource {
    attrs: ResolvedAttributes,
    mapping: AttributeMapping,
    fail: bool,
    pub(crate) resolutions: AtomicUsize,
    pub(crate) closed: AtomicBool,
}

impl StubSource {
    pub(crate) fn with_attrs(pairs: &[(&str, &str)]) -> Self {
        Self {
            attrs: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            mapping: AttributeMapping::new(),
            fail: false,
            resolutions: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_attrs(&[])
        }
    }

    pub(crate) fn mapping_of(mut self, pairs: &[(&str, &str)]) -> Self {
        self.mapping = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self
    }
}

impl AttributeSource for StubSource {
    async fn resolve(&self, _username: &str) -> FederationResult<ResolvedAttributes> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FederationError::Directory(DirectoryError::Unavailable {
                message: "all 1 endpoint(s) failed to connect".to_string(),
                source: None,
            }));
        }
        Ok(self.attrs.clone())
    }

    fn mapping(&self) -> &AttributeMapping {
        &self.mapping
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
