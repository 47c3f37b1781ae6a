//! Directory client: endpoint failover, bound connection ownership, and
//! mid-operation reconnect.
//!
//! One client owns at most one bound connection. Searches are serialized
//! behind the connection mutex, which is the conservative choice: the
//! underlying transport multiplexes, but a stale handle detected by one
//! caller must not be raced by another.

use std::fmt;

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};

use crate::error::{is_bind_rejection, is_communication_error, DirectoryError, DirectoryResult};

/// Ordered set of candidate directory URLs.
///
/// Order defines failover priority, not load balancing: the first endpoint
/// that accepts the bind wins. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEndpointSet(Vec<String>);

impl DirectoryEndpointSet {
    /// Creates an endpoint set from an ordered list of URLs.
    ///
    /// ## Errors
    ///
    /// Returns a configuration error when the list is empty.
    pub fn new(urls: Vec<String>) -> DirectoryResult<Self> {
        if urls.is_empty() {
            return Err(DirectoryError::config("endpoint list is empty"));
        }
        Ok(Self(urls))
    }

    /// Iterates the URLs in failover order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of candidate endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty. Always false for a constructed set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Concatenation of all URLs, used for fingerprinting.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.concat()
    }
}

/// Bind principal and secret. Held only in memory; the secret is never
/// logged or rendered.
#[derive(Clone, PartialEq, Eq)]
pub struct BindCredential {
    principal: String,
    secret: String,
}

impl BindCredential {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(principal: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            secret: secret.into(),
        }
    }

    /// The bind principal.
    #[must_use]
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// The bind secret. Callers must not log this.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for BindCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCredential")
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Connection settings for one client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Candidate endpoints in failover order.
    pub endpoints: DirectoryEndpointSet,
    /// Bind credential.
    pub credential: BindCredential,
    /// Per-endpoint connect timeout.
    pub connect_timeout: Duration,
    /// Per-operation read timeout.
    pub read_timeout: Duration,
    /// Maximum concurrent operations admitted by this client.
    pub pool_max_size: usize,
}

/// A uniqueness-constrained subtree search.
///
/// The filter is built by literal substitution: the match value is not
/// escaped for LDAP filter metacharacters. This mirrors the historical
/// behavior this module replaces and is a known limitation; match values
/// come from trusted local usernames, not request input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Base DN for the subtree search.
    pub base_dn: String,
    /// Attribute expected to uniquely identify the entry.
    pub unique_attribute: String,
    /// Value the unique attribute must equal.
    pub match_value: String,
}

impl SearchQuery {
    /// Creates a new query.
    #[must_use]
    pub fn new(
        base_dn: impl Into<String>,
        unique_attribute: impl Into<String>,
        match_value: impl Into<String>,
    ) -> Self {
        Self {
            base_dn: base_dn.into(),
            unique_attribute: unique_attribute.into(),
            match_value: match_value.into(),
        }
    }

    /// Renders the `(attribute=value)` filter.
    #[must_use]
    pub fn filter(&self) -> String {
        format!("({}={})", self.unique_attribute, self.match_value)
    }
}

/// A directory entry with decoded attributes.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    /// Distinguished name.
    pub dn: String,
    /// String attributes, multi-valued as presented by the server.
    pub attributes: HashMap<String, Vec<String>>,
    /// Attributes whose values could not be decoded as strings.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl DirectoryEntry {
    /// Builds an entry from a raw search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    /// First string value of an attribute, if present and readable.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Whether the attribute exists but only with undecodable values.
    #[must_use]
    pub fn has_unreadable_attr(&self, name: &str) -> bool {
        !self.attributes.contains_key(name) && self.binary_attributes.contains_key(name)
    }
}

/// Client for one external directory, bound with one credential set.
///
/// Connects lazily: the first search establishes the connection. A search
/// that fails with a communication-class error discards the stale
/// connection, reconnects against the same endpoint list, and retries
/// exactly once.
pub struct DirectoryClient {
    settings: ClientSettings,
    conn: Mutex<Option<Ldap>>,
    permits: Semaphore,
}

impl DirectoryClient {
    /// Creates a client. No connection is made until first use.
    #[must_use]
    pub fn new(settings: ClientSettings) -> Self {
        let permits = Semaphore::new(settings.pool_max_size);
        Self {
            settings,
            conn: Mutex::new(None),
            permits,
        }
    }

    /// The settings this client was built with.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Establishes the connection eagerly.
    ///
    /// ## Errors
    ///
    /// Returns [`DirectoryError::Unavailable`] when every endpoint fails,
    /// or [`DirectoryError::Bind`] when the last endpoint rejected the
    /// bind credentials.
    pub async fn ensure_connected(&self) -> DirectoryResult<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect_any().await?);
        }
        Ok(())
    }

    /// Attempts endpoints in order; the first accepted bind wins.
    async fn connect_any(&self) -> DirectoryResult<Ldap> {
        let mut last_error = None;

        for url in self.settings.endpoints.iter() {
            match self.connect_one(url).await {
                Ok(ldap) => {
                    tracing::info!(endpoint = url, "directory connection established");
                    return Ok(ldap);
                }
                Err(err) => {
                    tracing::warn!(endpoint = url, error = %err, "endpoint failed, trying next");
                    last_error = Some(err);
                }
            }
        }

        Err(connect_failure(self.settings.endpoints.len(), last_error))
    }

    async fn connect_one(&self, url: &str) -> Result<Ldap, ldap3::LdapError> {
        let settings = LdapConnSettings::new().set_conn_timeout(self.settings.connect_timeout);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, url).await?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "directory connection driver terminated");
            }
        });

        ldap.simple_bind(
            self.settings.credential.principal(),
            self.settings.credential.secret(),
        )
        .await?
        .success()?;

        Ok(ldap)
    }

    /// Runs a subtree search, returning all matching entries.
    ///
    /// `attrs` names the attributes to request. A communication failure is
    /// retried once after a reconnect; a second one surfaces as
    /// [`DirectoryError::Unavailable`]. Non-communication failures are
    /// never retried.
    pub async fn search(
        &self,
        query: &SearchQuery,
        attrs: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| DirectoryError::config("client admission queue closed"))?;
        let mut guard = self.conn.lock().await;
        search_with_reconnect(
            &mut *guard,
            || self.connect_any(),
            query,
            attrs,
            self.settings.read_timeout,
        )
        .await
    }

    /// Closes the connection if one is open. Idempotent; unbind failures
    /// are logged, never raised.
    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        if let Some(mut ldap) = guard.take() {
            if let Err(e) = ldap.unbind().await {
                tracing::warn!(error = %e, "error closing directory connection");
            }
        }
    }
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Maps the last per-endpoint failure to the taxonomy: a rejected bind
/// means the credentials are wrong, not that the directory is down.
fn connect_failure(endpoints: usize, last_error: Option<ldap3::LdapError>) -> DirectoryError {
    match last_error {
        Some(err) if is_bind_rejection(&err) => DirectoryError::Bind(err.to_string()),
        source => DirectoryError::Unavailable {
            message: format!("all {endpoints} endpoint(s) failed to connect"),
            source,
        },
    }
}

/// Transport face of a bound connection, factored out so the reconnect
/// policy can run against a scripted connection in tests.
trait SearchConn {
    async fn run(
        &mut self,
        query: &SearchQuery,
        attrs: &[&str],
        timeout: Duration,
    ) -> Result<Vec<DirectoryEntry>, ldap3::LdapError>;
}

impl SearchConn for Ldap {
    async fn run(
        &mut self,
        query: &SearchQuery,
        attrs: &[&str],
        timeout: Duration,
    ) -> Result<Vec<DirectoryEntry>, ldap3::LdapError> {
        let (rs, _result) = self
            .with_timeout(timeout)
            .search(&query.base_dn, Scope::Subtree, &query.filter(), attrs)
            .await?
            .success()?;

        Ok(rs
            .into_iter()
            .map(SearchEntry::construct)
            .map(DirectoryEntry::from_search_entry)
            .collect())
    }
}

/// The single-reconnect search policy.
///
/// A communication-class failure discards the stale connection, connects
/// again, and retries exactly once; a second communication failure is
/// [`DirectoryError::Unavailable`] with no third attempt. Other failures
/// are never retried.
async fn search_with_reconnect<C, F, Fut>(
    slot: &mut Option<C>,
    connect: F,
    query: &SearchQuery,
    attrs: &[&str],
    timeout: Duration,
) -> DirectoryResult<Vec<DirectoryEntry>>
where
    C: SearchConn,
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = DirectoryResult<C>>,
{
    let conn = match slot.as_mut() {
        Some(conn) => conn,
        None => slot.insert(connect().await?),
    };

    let err = match conn.run(query, attrs, timeout).await {
        Ok(entries) => return Ok(entries),
        Err(err) => err,
    };

    if !is_communication_error(&err) {
        return Err(DirectoryError::Search(err.to_string()));
    }

    tracing::warn!(
        error = %err,
        filter = %query.filter(),
        "connection dropped during search, reconnecting once"
    );
    *slot = None;
    let conn = slot.insert(connect().await?);

    match conn.run(query, attrs, timeout).await {
        Ok(entries) => Ok(entries),
        Err(err) if is_communication_error(&err) => {
            *slot = None;
            Err(DirectoryError::unavailable("search retry failed", err))
        }
        Err(err) => Err(DirectoryError::Search(err.to_string())),
    }
}
