//! Directory synchronization service.
//!
//! Ties the pieces together: look up the local record, resolve its mapped
//! attributes from the external directory, overwrite them on the record,
//! and mirror the writes into the cache when the record is cached. The
//! attribute source sits behind a trait so the synchronization logic is
//! testable without a reachable directory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sso_core::config::{DirectorySettings, ProviderConfig};
use sso_core::model::RealmContext;
use sso_core::store::{LocalUserStore, UserCache};
use sso_directory::{
    AttributeMapping, AttributeResolver, BindCredential, ClientSettings, ConnectionKey,
    ConnectionRegistry, DirectoryEndpointSet, ResolvedAttributes,
};
use uuid::Uuid;

use crate::error::{FederationError, FederationResult};

/// Source of resolved directory attributes for a username.
#[allow(async_fn_in_trait)]
pub trait AttributeSource: Send + Sync {
    /// Resolves the mapped attributes for one username.
    async fn resolve(&self, username: &str) -> FederationResult<ResolvedAttributes>;

    /// The configured directory-attribute to claim mapping.
    fn mapping(&self) -> &AttributeMapping;

    /// Releases any underlying directory resources. Idempotent.
    async fn close(&self);
}

/// The production [`AttributeSource`]: searches the external directory
/// through a client cached in the shared registry.
pub struct DirectoryAttributeSource {
    registry: Arc<ConnectionRegistry>,
    settings: ClientSettings,
    resolver: AttributeResolver,
}

impl DirectoryAttributeSource {
    /// Builds a source from the directory settings block.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error when the endpoint list is empty.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        directory: &DirectorySettings,
    ) -> FederationResult<Self> {
        let endpoints = DirectoryEndpointSet::new(directory.provider_urls.clone())?;
        let credential = BindCredential::new(
            &directory.security_principal,
            &directory.security_credentials,
        );
        let settings = ClientSettings {
            endpoints,
            credential,
            connect_timeout: directory.connect_timeout,
            read_timeout: directory.read_timeout,
            pool_max_size: directory.pool_max_size,
        };
        let resolver = AttributeResolver::new(
            &directory.users_dn,
            &directory.username_filter,
            directory.attribute_map.clone(),
        );

        Ok(Self {
            registry,
            settings,
            resolver,
        })
    }

    fn key(&self) -> ConnectionKey {
        ConnectionKey::compute(&self.settings.endpoints, &self.settings.credential)
    }
}

impl AttributeSource for DirectoryAttributeSource {
    async fn resolve(&self, username: &str) -> FederationResult<ResolvedAttributes> {
        let client = self.registry.acquire(self.settings.clone()).await?;
        // Balance the reference whether or not the search succeeded.
        let result = self.resolver.resolve(&client, username).await;
        self.registry.release(&self.key()).await;
        Ok(result?)
    }

    fn mapping(&self) -> &AttributeMapping {
        self.resolver.mapping()
    }

    async fn close(&self) {
        self.registry.evict(&self.key()).await;
    }
}

/// Synchronizes directory attributes onto local user records.
pub struct DirectorySyncService<D, S, C> {
    source: Option<D>,
    store: S,
    cache: Option<C>,
    closed: AtomicBool,
}

impl<D: AttributeSource, S: LocalUserStore, C: UserCache> DirectorySyncService<D, S, C> {
    /// Creates a service. A `None` source means no directory is configured;
    /// every resolution then yields no attributes.
    pub fn new(source: Option<D>, store: S, cache: Option<C>) -> Self {
        Self {
            source,
            store,
            cache,
            closed: AtomicBool::new(false),
        }
    }

    /// The configured attribute mapping, when a directory is configured.
    pub fn attribute_mapping(&self) -> Option<&AttributeMapping> {
        self.source.as_ref().map(AttributeSource::mapping)
    }

    /// Resolves the mapped directory attributes for a username.
    ///
    /// A closed service or an absent directory configuration resolves to an
    /// empty map with a warning; neither is an error.
    ///
    /// ## Errors
    ///
    /// Directory failures propagate from the source.
    pub async fn resolve_for_username(
        &self,
        username: &str,
    ) -> FederationResult<ResolvedAttributes> {
        if self.closed.load(Ordering::SeqCst) {
            tracing::warn!(username, "synchronization service is closed");
            return Ok(ResolvedAttributes::new());
        }
        let Some(source) = &self.source else {
            tracing::warn!(username, "no directory configured, resolving no attributes");
            return Ok(ResolvedAttributes::new());
        };

        tracing::info!(username, "searching user on external directory");
        let resolved = source.resolve(username).await?;
        tracing::info!(
            username,
            attributes = resolved.len(),
            "directory attributes resolved"
        );
        Ok(resolved)
    }

    /// Looks up the user, resolves its directory attributes, and overwrites
    /// them on the stored record. When the record is also present in the
    /// cache the same writes are mirrored there.
    ///
    /// ## Errors
    ///
    /// [`FederationError::UserNotFound`] when the id does not exist locally;
    /// directory and store failures propagate.
    pub async fn update_user(&self, realm: &RealmContext, user_id: Uuid) -> FederationResult<()> {
        let record = self
            .store
            .find_user_by_id(realm.id, user_id)
            .await?
            .ok_or_else(|| FederationError::UserNotFound(user_id.to_string()))?;
        tracing::info!(
            user_id = %user_id,
            username = record.username.as_str(),
            realm = realm.name.as_str(),
            "found user on local storage"
        );

        let resolved = self.resolve_for_username(&record.username).await?;
        for (claim, value) in &resolved {
            self.store
                .set_single_attribute(realm.id, user_id, claim, value)
                .await?;
        }

        if let Some(cache) = &self.cache {
            if cache
                .find_cached_user_by_id(realm.id, user_id)
                .await?
                .is_some()
            {
                tracing::info!(user_id = %user_id, "mirroring attributes into the user cache");
                for (claim, value) in &resolved {
                    cache
                        .set_single_attribute(realm.id, user_id, claim, value)
                        .await?;
                }
            }
        }

        tracing::debug!(
            user_id = %user_id,
            attributes = ?resolved,
            "user synchronized"
        );
        Ok(())
    }

    /// Closes the service and releases the underlying directory client.
    /// Later resolutions yield no attributes. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(source) = &self.source {
            source.close().await;
        }
    }
}

#[cfg(test)]
impl<D, S, C> DirectorySyncService<D, S, C> {
    pub(crate) fn store_for_test(&self) -> &S {
        &self.store
    }

    pub(crate) fn source_for_test(&self) -> Option<&D> {
        self.source.as_ref()
    }
}

impl<S: LocalUserStore, C: UserCache> DirectorySyncService<DirectoryAttributeSource, S, C> {
    /// Builds a service backed by the directory named in `config`. With
    /// both feature toggles disabled no source is built and the service
    /// degrades to a no-op.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error when the settings block is invalid.
    pub fn from_config(
        config: &ProviderConfig,
        registry: Arc<ConnectionRegistry>,
        store: S,
        cache: Option<C>,
    ) -> FederationResult<Self> {
        let source = match config.directory() {
            Some(directory) => Some(DirectoryAttributeSource::new(registry, directory)?),
            None => None,
        };
        Ok(Self::new(source, store, cache))
    }
}
