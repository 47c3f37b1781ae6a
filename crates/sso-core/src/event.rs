//! Login event model.
//!
//! A trimmed view of the host event stream: the synchronization layer only
//! cares about events that carry a freshly authenticated user.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event categories observed by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// User login.
    Login,
    /// Administrator impersonating a user.
    Impersonate,
    /// User logout.
    Logout,
    /// User self-registration.
    Register,
}

impl EventType {
    /// Whether this event type triggers directory synchronization.
    #[must_use]
    pub const fn triggers_sync(&self) -> bool {
        matches!(self, Self::Login | Self::Impersonate)
    }
}

/// An authentication event delivered by the host runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginEvent {
    /// Realm the event occurred in.
    pub realm_id: Uuid,
    /// User the event concerns.
    pub user_id: Uuid,
    /// Event category.
    pub event_type: EventType,
}

impl LoginEvent {
    /// Creates a new event.
    #[must_use]
    pub const fn new(realm_id: Uuid, user_id: Uuid, event_type: EventType) -> Self {
        Self {
            realm_id,
            user_id,
            event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_login_and_impersonate_trigger_sync() {
        assert!(EventType::Login.triggers_sync());
        assert!(EventType::Impersonate.triggers_sync());
        assert!(!EventType::Logout.triggers_sync());
        assert!(!EventType::Register.triggers_sync());
    }
}
