//! `SyncEngine`: the wired-together synchronization pipeline.
//!
//! This is the assembly point for the whole client core: transport →
//! subscription state machine → action dispatch → event registry → chat
//! reconciliation → local store. Application code constructs one engine
//! from a [`TransportProvider`] and reads the [`LocalStore`] it keeps
//! up to date.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use syncline_parser::{ChatEventParser, ModularEventParser};
use syncline_store::{
    Action, ConnectionState, LocalStore, Store, SubscriptionKind,
};
use syncline_subscription::{
    ActionDispatcher, SubscriptionError, SubscriptionFactory,
    TransportProvider,
};

// ---------------------------------------------------------------------------
// SyncStore
// ---------------------------------------------------------------------------

/// The engine's action reducer.
///
/// Lifecycle actions land in a per-kind connection-state map; event
/// actions are routed through the registry. Dispatch is infallible by
/// contract, so a failed event application is logged here and goes no
/// further.
struct SyncStore {
    registry: ModularEventParser,
    connection_states: Mutex<HashMap<SubscriptionKind, ConnectionState>>,
}

impl SyncStore {
    fn connection_state(&self, kind: &SubscriptionKind) -> ConnectionState {
        self.connection_states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(kind)
            .copied()
            .unwrap_or_default()
    }
}

impl Store for SyncStore {
    fn dispatch(&self, action: Action) {
        match action {
            Action::SubscriptionStateUpdated { kind, state } => {
                tracing::info!(%kind, %state, "connection state updated");
                self.connection_states
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(kind, state);
            }
            Action::EventReceived { service, version, envelope } => {
                if let Err(error) =
                    self.registry.parse(&envelope, service, version)
                {
                    tracing::error!(
                        %service,
                        %version,
                        %error,
                        "failed to apply event"
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

/// The client synchronization engine.
///
/// Owns the [`LocalStore`] and keeps it reconciled with the remote chat
/// service through one user-level subscription and any number of
/// per-room subscriptions, all dialed through the injected
/// [`TransportProvider`].
pub struct SyncEngine {
    store: Arc<LocalStore>,
    sync_store: Arc<SyncStore>,
    factory: SubscriptionFactory,
}

impl SyncEngine {
    /// Builds an engine around `provider`.
    ///
    /// Registers the chat parser under its supported service version; the
    /// rest of the pipeline is service-agnostic.
    pub fn new(provider: Arc<dyn TransportProvider>) -> Self {
        let store = Arc::new(LocalStore::new());

        let mut registry = ModularEventParser::new();
        registry.register(
            Box::new(ChatEventParser::new(Arc::clone(&store))),
            ChatEventParser::SERVICE,
            ChatEventParser::VERSION,
        );

        let sync_store = Arc::new(SyncStore {
            registry,
            connection_states: Mutex::new(HashMap::new()),
        });
        let dispatcher = Arc::new(ActionDispatcher::new(
            Arc::clone(&sync_store) as Arc<dyn Store>,
            ChatEventParser::SERVICE,
            ChatEventParser::VERSION,
        ));
        let factory = SubscriptionFactory::new(
            provider,
            dispatcher,
            Arc::clone(&sync_store) as Arc<dyn Store>,
        );

        Self { store, sync_store, factory }
    }

    /// Establishes the user-level subscription.
    ///
    /// Resolves when the first event arrives; concurrent callers share
    /// the one underlying connection. A no-op resolve if already
    /// subscribed.
    pub async fn subscribe_to_user(&self) -> Result<(), SubscriptionError> {
        self.factory.user_subscription().subscribe_and_wait().await
    }

    /// Establishes the subscription for one room.
    pub async fn subscribe_to_room(
        &self,
        room_identifier: &str,
    ) -> Result<(), SubscriptionError> {
        self.factory
            .room_subscription(room_identifier)
            .subscribe_and_wait()
            .await
    }

    /// Stops the user-level subscription. No-op if not subscribed.
    pub fn unsubscribe_from_user(&self) {
        self.factory.user_subscription().unsubscribe();
    }

    /// Stops the subscription for one room. No-op if not subscribed.
    pub fn unsubscribe_from_room(&self, room_identifier: &str) {
        self.factory.room_subscription(room_identifier).unsubscribe();
    }

    /// The last published connection state for a subscription.
    pub fn connection_state(
        &self,
        kind: &SubscriptionKind,
    ) -> ConnectionState {
        self.sync_store.connection_state(kind)
    }

    /// The reconciled entity cache.
    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }
}
