//! Storage traits implemented by the host runtime.
//!
//! The synchronization layer reads records through [`LocalUserStore`] and
//! mirrors attribute writes into an optional read-through [`UserCache`]
//! so cached copies stay consistent without invalidation.

use uuid::Uuid;

use crate::error::StoreResult;
use crate::model::UserRecord;

/// Primary local user storage.
#[allow(async_fn_in_trait)]
pub trait LocalUserStore: Send + Sync {
    /// Looks up a user record by id within a realm.
    async fn find_user_by_id(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<UserRecord>>;

    /// Overwrites a single-valued attribute on the stored record.
    async fn set_single_attribute(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        name: &str,
        value: &str,
    ) -> StoreResult<()>;
}

/// Optional read-through user cache kept consistent with the primary store.
#[allow(async_fn_in_trait)]
pub trait UserCache: Send + Sync {
    /// Looks up a cached record by id; `None` means the user is simply not
    /// cached, which is never an error.
    async fn find_cached_user_by_id(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<UserRecord>>;

    /// Overwrites a single-valued attribute on the cached record.
    async fn set_single_attribute(
        &self,
        realm_id: Uuid,
        user_id: Uuid,
        name: &str,
        value: &str,
    ) -> StoreResult<()>;
}

/// Cache stand-in for deployments that run without one. Every lookup
/// misses and every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUserCache;

impl UserCache for NoUserCache {
    async fn find_cached_user_by_id(
        &self,
        _realm_id: Uuid,
        _user_id: Uuid,
    ) -> StoreResult<Option<UserRecord>> {
        Ok(None)
    }

    async fn set_single_attribute(
        &self,
        _realm_id: Uuid,
        _user_id: Uuid,
        _name: &str,
        _value: &str,
    ) -> StoreResult<()> {
        Ok(())
    }
}
