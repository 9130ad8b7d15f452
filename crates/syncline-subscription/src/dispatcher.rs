//! The delegate that turns raw payloads into store actions.

use std::sync::Arc;

use serde_json::Value;
use syncline_store::{Action, Store};
use syncline_wire::{ServiceName, ServiceVersion};

use crate::{SubscriptionDelegate, SubscriptionError};

/// Bridges a subscription to the store.
///
/// Parses each raw payload as JSON and dispatches it as an
/// [`Action::EventReceived`] tagged with the service identity this
/// dispatcher was built for. Never raises on malformed input: a payload
/// that is not even JSON is logged and dropped, because by the time it
/// gets here the subscription itself is healthy.
pub struct ActionDispatcher {
    store: Arc<dyn Store>,
    service: ServiceName,
    version: ServiceVersion,
}

impl ActionDispatcher {
    /// Creates a dispatcher tagging events with `(service, version)`.
    pub fn new(
        store: Arc<dyn Store>,
        service: ServiceName,
        version: ServiceVersion,
    ) -> Self {
        Self { store, service, version }
    }
}

impl SubscriptionDelegate for ActionDispatcher {
    fn did_receive_event(&self, raw: &str) {
        match serde_json::from_str::<Value>(raw) {
            Ok(envelope) => self.store.dispatch(Action::EventReceived {
                service: self.service,
                version: self.version,
                envelope,
            }),
            Err(error) => {
                tracing::warn!(%error, "dropping payload that is not JSON");
            }
        }
    }

    fn did_receive_error(&self, error: &SubscriptionError) {
        tracing::warn!(
            service = %self.service,
            version = %self.version,
            %error,
            "subscription reported an error"
        );
    }
}

// =========================================================================
// Tests
// =========================================================================
