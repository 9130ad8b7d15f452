//! Construction and caching of subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use syncline_store::{Store, SubscriptionKind};
use syncline_transport::ResumableTransport;

use crate::{Subscription, SubscriptionDelegate};

/// Supplies a transport for each subscription kind.
///
/// The user feed and each room feed connect to different endpoints, so
/// the provider gets the kind and decides what to dial.
pub trait TransportProvider: Send + Sync {
    fn transport(&self, kind: &SubscriptionKind) -> Arc<dyn ResumableTransport>;
}

/// Hands out at most one [`Subscription`] per [`SubscriptionKind`].
///
/// The cache is what makes "two subscribe calls share one underlying
/// connection" hold across the whole client, not just within a single
/// `Subscription` value: asking twice for the same room yields the same
/// instance. All subscriptions share the factory's delegate and store.
pub struct SubscriptionFactory {
    provider: Arc<dyn TransportProvider>,
    delegate: Arc<dyn SubscriptionDelegate>,
    store: Arc<dyn Store>,
    subscriptions: Mutex<HashMap<SubscriptionKind, Arc<Subscription>>>,
}

impl SubscriptionFactory {
    /// Creates a factory with an empty cache.
    pub fn new(
        provider: Arc<dyn TransportProvider>,
        delegate: Arc<dyn SubscriptionDelegate>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            provider,
            delegate,
            store,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// The user-level subscription.
    pub fn user_subscription(&self) -> Arc<Subscription> {
        self.subscription(SubscriptionKind::User)
    }

    /// The subscription for one room.
    pub fn room_subscription(&self, room_identifier: &str) -> Arc<Subscription> {
        self.subscription(SubscriptionKind::Room {
            room_identifier: room_identifier.to_owned(),
        })
    }

    /// Returns the cached subscription for `kind`, creating it on first
    /// request.
    pub fn subscription(&self, kind: SubscriptionKind) -> Arc<Subscription> {
        let mut cache = self
            .subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cache.entry(kind.clone()).or_insert_with(|| {
            tracing::debug!(%kind, "creating subscription");
            Subscription::new(
                kind.clone(),
                self.provider.transport(&kind),
                Arc::clone(&self.delegate),
                Arc::clone(&self.store),
            )
        }))
    }
}

// =========================================================================
// Tests
// =========================================================================
