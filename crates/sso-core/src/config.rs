//! Provider configuration loaded from environment variables.
//!
//! Two independent feature toggles gate the provider: one for the login
//! event listener, one for the token claim mapper. Both default to
//! enabled. The directory settings block is only required (and only
//! validated) when at least one toggle is enabled; with both disabled
//! every operation degrades to a no-op.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};

/// Toggle for synchronizing attributes on login/impersonation events.
pub const EXTERNAL_LDAP_FEDERATION_EVENT_LISTENER_ENABLED: &str =
    "EXTERNAL_LDAP_FEDERATION_EVENT_LISTENER_ENABLED";
/// Toggle for enriching issued tokens with directory attributes.
pub const EXTERNAL_LDAP_FEDERATION_MAPPER_ENABLED: &str =
    "EXTERNAL_LDAP_FEDERATION_MAPPER_ENABLED";
/// Comma-separated, ordered list of candidate directory URLs.
pub const EXTERNAL_LDAP_FEDERATION_PROVIDER_URLS: &str =
    "EXTERNAL_LDAP_FEDERATION_PROVIDER_URLS";
/// Bind principal (service account DN).
pub const EXTERNAL_LDAP_SECURITY_PRINCIPAL: &str = "EXTERNAL_LDAP_SECURITY_PRINCIPAL";
/// Bind secret.
pub const EXTERNAL_LDAP_SECURITY_CREDENTIALS: &str = "EXTERNAL_LDAP_SECURITY_CREDENTIALS";
/// Base DN for user searches.
pub const EXTERNAL_LDAP_USERS_DN: &str = "EXTERNAL_LDAP_USERS_DN";
/// Attribute mapping, serialized as `dirAttr1=claim1,dirAttr2=claim2,...`.
pub const EXTERNAL_LDAP_ATTRIBUTE_MAP: &str = "EXTERNAL_LDAP_ATTRIBUTE_MAP";
/// Directory attribute that uniquely identifies a user (usually `cn` or
/// `sAMAccountName`).
pub const EXTERNAL_LDAP_USERNAME_FILTER: &str = "EXTERNAL_LDAP_USERNAME_FILTER";
/// Per-endpoint connect timeout, in seconds. Optional.
pub const EXTERNAL_LDAP_CONNECT_TIMEOUT_SECS: &str = "EXTERNAL_LDAP_CONNECT_TIMEOUT_SECS";
/// Per-operation read timeout, in seconds. Optional.
pub const EXTERNAL_LDAP_READ_TIMEOUT_SECS: &str = "EXTERNAL_LDAP_READ_TIMEOUT_SECS";
/// Maximum pooled connections per credential set. Optional.
pub const EXTERNAL_LDAP_POOL_MAX_SIZE: &str = "EXTERNAL_LDAP_POOL_MAX_SIZE";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_POOL_MAX_SIZE: usize = 5;

/// Connection and search settings for the external directory.
#[derive(Clone, Serialize)]
pub struct DirectorySettings {
    /// Ordered candidate directory URLs; order defines failover priority.
    pub provider_urls: Vec<String>,

    /// Bind principal.
    pub security_principal: String,

    /// Bind secret. Never serialized, never logged.
    #[serde(skip_serializing)]
    pub security_credentials: String,

    /// Base DN for user searches.
    pub users_dn: String,

    /// Directory attribute name to local claim name.
    pub attribute_map: HashMap<String, String>,

    /// Unique-match attribute used in the search filter.
    pub username_filter: String,

    /// Per-endpoint connect timeout.
    pub connect_timeout: Duration,

    /// Per-operation read timeout.
    pub read_timeout: Duration,

    /// Maximum pooled connections per credential set.
    pub pool_max_size: usize,
}

impl fmt::Debug for DirectorySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectorySettings")
            .field("provider_urls", &self.provider_urls)
            .field("security_principal", &self.security_principal)
            .field("security_credentials", &"<redacted>")
            .field("users_dn", &self.users_dn)
            .field("attribute_map", &self.attribute_map)
            .field("username_filter", &self.username_filter)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("pool_max_size", &self.pool_max_size)
            .finish()
    }
}

/// Top-level provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    event_listener_enabled: bool,
    mapper_enabled: bool,
    directory: Option<DirectorySettings>,
}

impl ProviderConfig {
    /// Loads the configuration from process environment variables.
    ///
    /// ## Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] when a required variable is
    /// absent while at least one feature toggle is enabled, or
    /// [`ConfigError::InvalidVariable`] when a present value cannot be
    /// parsed.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_values(
            env::var(EXTERNAL_LDAP_FEDERATION_EVENT_LISTENER_ENABLED).ok().as_deref(),
            env::var(EXTERNAL_LDAP_FEDERATION_MAPPER_ENABLED).ok().as_deref(),
            env::var(EXTERNAL_LDAP_FEDERATION_PROVIDER_URLS).ok().as_deref(),
            env::var(EXTERNAL_LDAP_SECURITY_PRINCIPAL).ok().as_deref(),
            env::var(EXTERNAL_LDAP_SECURITY_CREDENTIALS).ok().as_deref(),
            env::var(EXTERNAL_LDAP_USERS_DN).ok().as_deref(),
            env::var(EXTERNAL_LDAP_ATTRIBUTE_MAP).ok().as_deref(),
            env::var(EXTERNAL_LDAP_USERNAME_FILTER).ok().as_deref(),
            env::var(EXTERNAL_LDAP_CONNECT_TIMEOUT_SECS).ok().as_deref(),
            env::var(EXTERNAL_LDAP_READ_TIMEOUT_SECS).ok().as_deref(),
            env::var(EXTERNAL_LDAP_POOL_MAX_SIZE).ok().as_deref(),
        )
    }

    /// Builds the configuration from raw values, bypassing the process
    /// environment. Each argument corresponds to one environment variable.
    #[allow(clippy::too_many_arguments)]
    pub fn from_values(
        event_listener_enabled: Option<&str>,
        mapper_enabled: Option<&str>,
        provider_urls: Option<&str>,
        security_principal: Option<&str>,
        security_credentials: Option<&str>,
        users_dn: Option<&str>,
        attribute_map: Option<&str>,
        username_filter: Option<&str>,
        connect_timeout_secs: Option<&str>,
        read_timeout_secs: Option<&str>,
        pool_max_size: Option<&str>,
    ) -> ConfigResult<Self> {
        let event_listener_enabled = parse_toggle(event_listener_enabled);
        let mapper_enabled = parse_toggle(mapper_enabled);

        // The directory block is only mandatory while some feature needs it.
        let directory = if event_listener_enabled || mapper_enabled {
            let urls = required(provider_urls, EXTERNAL_LDAP_FEDERATION_PROVIDER_URLS)?
                .split(',')
                .map(str::to_string)
                .collect();

            Some(DirectorySettings {
                provider_urls: urls,
                security_principal: required(
                    security_principal,
                    EXTERNAL_LDAP_SECURITY_PRINCIPAL,
                )?
                .to_string(),
                security_credentials: required(
                    security_credentials,
                    EXTERNAL_LDAP_SECURITY_CREDENTIALS,
                )?
                .to_string(),
                users_dn: required(users_dn, EXTERNAL_LDAP_USERS_DN)?.to_string(),
                attribute_map: parse_attribute_map(required(
                    attribute_map,
                    EXTERNAL_LDAP_ATTRIBUTE_MAP,
                )?)?,
                username_filter: required(username_filter, EXTERNAL_LDAP_USERNAME_FILTER)?
                    .to_string(),
                connect_timeout: parse_timeout(
                    connect_timeout_secs,
                    EXTERNAL_LDAP_CONNECT_TIMEOUT_SECS,
                    DEFAULT_CONNECT_TIMEOUT,
                )?,
                read_timeout: parse_timeout(
                    read_timeout_secs,
                    EXTERNAL_LDAP_READ_TIMEOUT_SECS,
                    DEFAULT_READ_TIMEOUT,
                )?,
                pool_max_size: parse_pool_size(pool_max_size)?,
            })
        } else {
            None
        };

        Ok(Self {
            event_listener_enabled,
            mapper_enabled,
            directory,
        })
    }

    /// Whether the login event listener is enabled.
    #[must_use]
    pub const fn event_listener_enabled(&self) -> bool {
        self.event_listener_enabled
    }

    /// Whether the token claim mapper is enabled.
    #[must_use]
    pub const fn mapper_enabled(&self) -> bool {
        self.mapper_enabled
    }

    /// The directory settings block, absent when both toggles are disabled.
    #[must_use]
    pub const fn directory(&self) -> Option<&DirectorySettings> {
        self.directory.as_ref()
    }
}

/// Unset toggles default to enabled; only a case-insensitive `"true"`
/// enables an explicitly set one.
fn parse_toggle(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.eq_ignore_ascii_case("true"))
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> ConfigResult<&'a str> {
    value.ok_or(ConfigError::MissingVariable(name))
}

/// Parses `key1=value1,key2=value2,...` into directory-attribute to claim
/// pairs. Later duplicates of a key overwrite earlier ones.
fn parse_attribute_map(raw: &str) -> ConfigResult<HashMap<String, String>> {
    let mut map = HashMap::new();
    for entry in raw.split(',') {
        let (key, value) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidVariable {
            name: EXTERNAL_LDAP_ATTRIBUTE_MAP,
            reason: format!("entry {entry:?} is not of the form key=value"),
        })?;
        if key.is_empty() {
            return Err(ConfigError::InvalidVariable {
                name: EXTERNAL_LDAP_ATTRIBUTE_MAP,
                reason: format!("entry {entry:?} has an empty attribute name"),
            });
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

fn parse_timeout(
    value: Option<&str>,
    name: &'static str,
    default: Duration,
) -> ConfigResult<Duration> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidVariable {
                name,
                reason: e.to_string(),
            }),
    }
}

fn parse_pool_size(value: Option<&str>) -> ConfigResult<usize> {
    match value {
        None => Ok(DEFAULT_POOL_MAX_SIZE),
        Some(raw) => raw.parse::<usize>().map_err(|e| ConfigError::InvalidVariable {
            name: EXTERNAL_LDAP_POOL_MAX_SIZE,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> ConfigResult<ProviderConfig> {
        ProviderConfig::from_values(
            None,
            None,
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
    }

    #[test]
    fn parses_full_configuration() {
        let config = full_config().unwrap();
        assert!(config.event_listener_enabled());
        assert!(config.mapper_enabled());

        let dir = config.directory().unwrap();
        assert_eq!(
            dir.provider_urls,
            vec!["ldap://localhost:3389", "ldap://localhost:4389"]
        );
        assert_eq!(dir.security_principal, "cn=admin,dc=ldap,dc=example,dc=com");
        assert_eq!(dir.security_credentials, "password");
        assert_eq!(dir.users_dn, "ou=users,dc=ldap,dc=example,dc=com");
        assert_eq!(dir.attribute_map.len(), 2);
        assert_eq!(dir.attribute_map["employeeNumber"], "numero");
        assert_eq!(dir.attribute_map["title"], "titolo");
        assert_eq!(dir.username_filter, "cn");
        assert_eq!(dir.connect_timeout, Duration::from_secs(5));
        assert_eq!(dir.read_timeout, Duration::from_secs(5));
        assert_eq!(dir.pool_max_size, 5);
    }

    #[test]
    fn missing_provider_urls_is_fatal() {
        let err = ProviderConfig::from_values(
            None,
            None,
            None,
            Some("cn=admin,dc=ldap,dc=example,dc=com"),
            Some("password"),
            Some("ou=users,dc=ldap,dc=example,dc=com"),
            Some("employeeNumber=numero,title=titolo"),
            Some("cn"),
            None,
            None,
            None,
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "The environment variable EXTERNAL_LDAP_FEDERATION_PROVIDER_URLS is mandatory but is not present"
        );
    }

    #[test]
    fn missing_principal_is_fatal() {
        let err = ProviderConfig::from_values(
            None,
            None,
            Some("ldap://localhost:3389"),
            None,
            Some("password"),
            Some("ou=users,dc=ldap,dc=example,dc=com"),
            Some("employeeNumber=numero"),
            Some("cn"),
            None,
            None,
            None,
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "The environment variable EXTERNAL_LDAP_SECURITY_PRINCIPAL is mandatory but is not present"
        );
    }

    #[test]
    fn toggles_parse_case_insensitively() {
        let config = ProviderConfig::from_values(
            Some("TRUE"),
            Some("False"),
            Some("ldap://localhost:3389"),
            Some("cn=admin"),
            Some("password"),
            Some("ou=users"),
            Some("title=titolo"),
            Some("cn"),
            None,
            None,
            None,
        )
        .unwrap();

        assert!(config.event_listener_enabled());
        assert!(!config.mapper_enabled());
    }

    #[test]
    fn both_disabled_skips_directory_validation() {
        let config = ProviderConfig::from_values(
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
        .unwrap();

        assert!(!config.event_listener_enabled());
        assert!(!config.mapper_enabled());
        assert!(config.directory().is_none());
    }

    #[test]
    fn malformed_attribute_map_entry_is_rejected() {
        let err = ProviderConfig::from_values(
            None,
            None,
            Some("ldap://localhost:3389"),
            Some("cn=admin"),
            Some("password"),
            Some("ou=users"),
            Some("titleWithoutValue"),
            Some("cn"),
            None,
            None,
            None,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidVariable { .. }));
    }

    #[test]
    fn timeout_overrides_are_honored() {
        let config = ProviderConfig::from_values(
            None,
            None,
            Some("ldap://localhost:3389"),
            Some("cn=admin"),
            Some("password"),
            Some("ou=users"),
            Some("title=titolo"),
            Some("cn"),
            Some("2"),
            Some("7"),
            Some("10"),
        )
        .unwrap();

        let dir = config.directory().unwrap();
        assert_eq!(dir.connect_timeout, Duration::from_secs(2));
        assert_eq!(dir.read_timeout, Duration::from_secs(7));
        assert_eq!(dir.pool_max_size, 10);
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let config = full_config().unwrap();
        let rendered = format!("{:?}", config.directory().unwrap());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("password"));
    }
}
