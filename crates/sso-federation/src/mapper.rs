//! Token claim mapper.
//!
//! Adds every mapped directory attribute to the claim set of an issued
//! token. Like the event listener, the token path is fail-open: when
//! resolution fails the token is issued without directory claims.

use std::sync::Arc;

use serde_json::{Map, Value};
use sso_core::config::ProviderConfig;
use sso_core::store::{LocalUserStore, UserCache};
use sso_directory::ResolvedAttributes;

use crate::error::{FederationError, FederationResult};
use crate::service::{AttributeSource, DirectorySyncService};

/// Identifier the mapper registers under.
pub const MAPPER_PROVIDER_ID: &str = "oidc-multipleldapclaimmapper";

/// Display name shown in administration consoles.
pub const MAPPER_DISPLAY_TYPE: &str = "Multiple LDAP Claim Mapper";

/// Enriches token claims with directory attributes.
pub struct LdapClaimMapper<D, S, C> {
    service: Arc<DirectorySyncService<D, S, C>>,
    enabled: bool,
}

impl<D: AttributeSource, S: LocalUserStore, C: UserCache> LdapClaimMapper<D, S, C> {
    /// Builds a mapper; the toggle state is captured at construction.
    #[must_use]
    pub fn from_config(
        config: &ProviderConfig,
        service: Arc<DirectorySyncService<D, S, C>>,
    ) -> Self {
        Self {
            service,
            enabled: config.mapper_enabled(),
        }
    }

    /// Help text describing the configured mapping.
    #[must_use]
    pub fn help_text(&self) -> String {
        let pairs = self.service.attribute_mapping().map_or_else(String::new, |mapping| {
            mapping
                .iter()
                .map(|(attr, claim)| format!("{attr} => {claim}"))
                .collect::<Vec<_>>()
                .join(",")
        });
        format!(
            "This mapper add all the claims defined in EXTERNAL_LDAP_ATTRIBUTE_MAP environment variable: {pairs}"
        )
    }

    /// Resolves the claims this mapper would add for `username`. A disabled
    /// mapper resolves to no claims.
    ///
    /// ## Errors
    ///
    /// Resolution failures surface as [`FederationError::Enrichment`].
    pub async fn claims_for(&self, username: &str) -> FederationResult<ResolvedAttributes> {
        if !self.enabled {
            tracing::warn!(username, "claim mapper disabled, issuing token without directory claims");
            return Ok(ResolvedAttributes::new());
        }
        self.service
            .resolve_for_username(username)
            .await
            .map_err(|err| FederationError::Enrichment(err.to_string()))
    }

    /// Adds the resolved claims to a token's claim set as string values.
    /// Failures are logged and the claim set is left untouched.
    pub async fn set_claims(&self, claims: &mut Map<String, Value>, username: &str) {
        match self.claims_for(username).await {
            Ok(resolved) => {
                for (claim, value) in resolved {
                    claims.insert(claim, Value::String(value));
                }
            }
            Err(err) => {
                tracing::error!(error = %err, username, "token enrichment failed");
            }
        }
    }
}
