//! Actions: the one-way messages the subscription layer dispatches.
//!
//! A [`Store`] implementation is the single funnel for everything the
//! subscription layer produces — lifecycle transitions and raw event
//! envelopes alike. Dispatch never fails and never returns anything;
//! whatever goes wrong downstream is the reducer's problem to log.

use std::fmt;

use serde_json::Value;
use syncline_wire::{ServiceName, ServiceVersion};

// ---------------------------------------------------------------------------
// SubscriptionKind
// ---------------------------------------------------------------------------

/// Which subscription an action or connection belongs to.
///
/// A client holds one user-level subscription plus at most one
/// subscription per room. The kind is the cache key the factory hands out
/// subscriptions under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// The user-level subscription: rooms, read states, memberships.
    User,
    /// A per-room subscription.
    Room { room_identifier: String },
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Room { room_identifier } => {
                write!(f, "room/{room_identifier}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// The application-visible lifecycle state of one subscription.
///
/// Coarser than the internal state machine: the two staged subscribing
/// states collapse into [`ConnectionState::Subscribing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection, and none being established.
    #[default]
    NotSubscribed,
    /// A connection is being established.
    Subscribing,
    /// Established and receiving events.
    Subscribed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotSubscribed => "not_subscribed",
            Self::Subscribing => "subscribing",
            Self::Subscribed => "subscribed",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Action / Store
// ---------------------------------------------------------------------------

/// A message from the subscription layer to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A subscription's lifecycle state changed.
    SubscriptionStateUpdated {
        kind: SubscriptionKind,
        state: ConnectionState,
    },
    /// A raw event envelope arrived on a subscription.
    ///
    /// The envelope is undecoded; routing it to the right parser is the
    /// reducer's job, keyed by `(service, version)`.
    EventReceived {
        service: ServiceName,
        version: ServiceVersion,
        envelope: Value,
    },
}

/// Receives dispatched actions.
///
/// Implementations must be safe to call from any thread; dispatch for a
/// single subscription arrives sequentially.
pub trait Store: Send + Sync {
    /// Applies one action. Infallible by contract — reducers recover or
    /// log internally.
    fn dispatch(&self, action: Action);
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_subscription_kind_display() {
        assert_eq!(SubscriptionKind::User.to_string(), "user");
        assert_eq!(
            SubscriptionKind::Room { room_identifier: "r1".into() }
                .to_string(),
            "room/r1"
        );
    }

    #[test]
    fn test_subscription_kind_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(SubscriptionKind::User, 1);
        map.insert(
            SubscriptionKind::Room { room_identifier: "r1".into() },
            2,
        );
        assert_eq!(map[&SubscriptionKind::User], 1);
    }

    #[test]
    fn test_connection_state_default_is_not_subscribed() {
        assert_eq!(
            ConnectionState::default(),
            ConnectionState::NotSubscribed
        );
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(
            ConnectionState::Subscribing.to_string(),
            "subscribing"
        );
    }

    #[test]
    fn test_action_event_received_compares_by_envelope() {
        let a = Action::EventReceived {
            service: ServiceName::Chat,
            version: ServiceVersion(1),
            envelope: json!({ "event_name": "initial_state" }),
        };
        assert_eq!(a.clone(), a);
    }
}
