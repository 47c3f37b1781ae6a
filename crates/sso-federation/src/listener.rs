//! Login event listener.
//!
//! Reacts to login and impersonation events by synchronizing the user's
//! directory attributes. The login path is fail-open: a directory outage
//! or a missing record is logged and the login proceeds untouched.

use std::sync::Arc;
use std::time::Instant;

use sso_core::config::ProviderConfig;
use sso_core::event::LoginEvent;
use sso_core::model::RealmContext;
use sso_core::store::{LocalUserStore, UserCache};

use crate::service::{AttributeSource, DirectorySyncService};

/// Identifier the listener registers under.
pub const LISTENER_ID: &str = "multiple-ldap-EventListener";

/// Listens for authentication events and triggers synchronization.
pub struct LoginEventListener<D, S, C> {
    service: Option<Arc<DirectorySyncService<D, S, C>>>,
}

impl<D: AttributeSource, S: LocalUserStore, C: UserCache> LoginEventListener<D, S, C> {
    /// Builds a listener. A disabled toggle yields a permanent no-op that
    /// ignores every event.
    #[must_use]
    pub fn from_config(
        config: &ProviderConfig,
        service: Arc<DirectorySyncService<D, S, C>>,
    ) -> Self {
        if config.event_listener_enabled() {
            Self {
                service: Some(service),
            }
        } else {
            tracing::warn!("event listener disabled, directory synchronization skipped");
            Self { service: None }
        }
    }

    /// Whether this listener reacts to events at all.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.service.is_some()
    }

    /// Handles one authentication event. Only login and impersonation
    /// trigger synchronization; failures are logged, never raised.
    pub async fn on_event(&self, realm: &RealmContext, event: &LoginEvent) {
        let Some(service) = &self.service else { return };
        if !event.event_type.triggers_sync() {
            return;
        }

        let start = Instant::now();
        tracing::info!(
            event_type = ?event.event_type,
            user_id = %event.user_id,
            realm = realm.name.as_str(),
            "handling authentication event"
        );

        if let Err(err) = service.update_user(realm, event.user_id).await {
            tracing::error!(
                error = %err,
                user_id = %event.user_id,
                "directory synchronization failed"
            );
        }

        tracing::info!("Ends in: {} ms.", start.elapsed().as_millis());
    }
}
