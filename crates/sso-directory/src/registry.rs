//! Keyed cache of directory clients.
//!
//! Concurrent lookups that share a (server list, principal, secret) triple
//! must share one underlying client instead of each opening a fresh
//! connection. The registry enforces the at-most-one invariant: creation
//! runs under the cache mutex, so two callers racing on the same key can
//! never both connect.

use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::client::{BindCredential, ClientSettings, DirectoryClient, DirectoryEndpointSet};
use crate::error::DirectoryResult;

/// Deterministic fingerprint of a (endpoints, principal, secret) triple.
///
/// SHA-256 over the concatenated endpoint URLs, the principal, and the
/// secret, hex-encoded. A cache key only, never a security token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey(String);

impl ConnectionKey {
    /// Computes the fingerprint for a credential triple.
    #[must_use]
    pub fn compute(endpoints: &DirectoryEndpointSet, credential: &BindCredential) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(endpoints.joined().as_bytes());
        hasher.update(credential.principal().as_bytes());
        hasher.update(credential.secret().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex-encoded digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct CachedConnection {
    client: Arc<DirectoryClient>,
    refs: usize,
}

/// Explicitly-owned registry of cached directory clients.
///
/// Passed to constructors rather than held in a process-wide static, so
/// tests can run against isolated instances.
#[derive(Default)]
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<ConnectionKey, CachedConnection>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached client for the settings' credential triple,
    /// creating and connecting one on first use.
    ///
    /// Creation runs under the cache lock: at most one live client ever
    /// exists per key. If connection setup fails against every endpoint
    /// the error propagates and the key is not cached.
    pub async fn acquire(
        &self,
        settings: ClientSettings,
    ) -> DirectoryResult<Arc<DirectoryClient>> {
        let key = ConnectionKey::compute(&settings.endpoints, &settings.credential);
        self.acquire_with(key, move || async move {
            let client = Arc::new(DirectoryClient::new(settings));
            client.ensure_connected().await?;
            Ok(client)
        })
        .await
    }

    /// Cache-or-create with an injected constructor. Factored out so the
    /// caching discipline is testable without a reachable directory.
    async fn acquire_with<F, Fut>(
        &self,
        key: ConnectionKey,
        make: F,
    ) -> DirectoryResult<Arc<DirectoryClient>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = DirectoryResult<Arc<DirectoryClient>>>,
    {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(&key) {
            entry.refs += 1;
            return Ok(Arc::clone(&entry.client));
        }

        let client = make().await?;
        tracing::info!(key = key.as_str(), "directory client created and cached");
        entries.insert(
            key,
            CachedConnection {
                client: Arc::clone(&client),
                refs: 1,
            },
        );
        Ok(client)
    }

    /// Releases one reference to the keyed client. The entry stays cached:
    /// connections are long-lived and intentionally reused.
    pub async fn release(&self, key: &ConnectionKey) {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(key) {
            entry.refs = entry.refs.saturating_sub(1);
        }
    }

    /// Forcibly closes and removes the keyed client regardless of
    /// references. Idempotent; used for shutdown, not per-call cleanup.
    pub async fn evict(&self, key: &ConnectionKey) {
        let entry = self.entries.lock().await.remove(key);
        if let Some(entry) = entry {
            tracing::info!(key = key.as_str(), "evicting cached directory client");
            entry.client.close().await;
        }
    }

    /// Closes and removes every cached client.
    pub async fn shutdown(&self) {
        let entries: Vec<CachedConnection> = {
            let mut map = self.entries.lock().await;
            map.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            entry.client.close().await;
        }
    }

    /// Outstanding references to the keyed client, `None` when the key is
    /// not cached.
    pub async fn ref_count(&self, key: &ConnectionKey) -> Option<usize> {
        self.entries.lock().await.get(key).map(|entry| entry.refs)
    }

    /// Number of cached clients.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the registry holds no clients.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
