//! The subscription lifecycle state machine.
//!
//! A [`Subscription`] owns one transport connection and walks it through
//! `NotSubscribed → SubscribingStageOne → SubscribingStageTwo →
//! Subscribed`. Stage one exists solely to close a race: a transport is
//! allowed to invoke its error callback synchronously, before `open`
//! returns, and the subscription must already count as in flight when
//! that happens. Stage two is "the connection exists, the first event has
//! not arrived"; the first event is what establishes the subscription and
//! resolves every queued completion.
//!
//! Transitions are computed under the state lock; delegate callbacks,
//! store dispatch, and completion resolution all run after the lock is
//! released, so a delegate may call back into the subscription without
//! deadlocking.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use syncline_store::{Action, ConnectionState, Store, SubscriptionKind};
use syncline_transport::{
    ResumableTransport, TransportError, TransportHandle, TransportListener,
};

use crate::SubscriptionError;

/// A queued waiter on subscription establishment.
///
/// Resolved exactly once: with `Ok` when the first event arrives, or with
/// the failure that tore the attempt down.
pub type SubscribeCompletion =
    Box<dyn FnOnce(Result<(), SubscriptionError>) + Send + 'static>;

/// Receives what a live subscription produces.
pub trait SubscriptionDelegate: Send + Sync {
    /// A raw event payload arrived. Also invoked to replay the most
    /// recent payload when `subscribe` is called on an established
    /// subscription.
    fn did_receive_event(&self, raw: &str);

    /// The subscription failed, or reported an informational error while
    /// established.
    fn did_receive_error(&self, error: &SubscriptionError);
}

/// The coarse, caller-visible lifecycle phase.
///
/// The two internal subscribing stages collapse into
/// [`SubscriptionPhase::Subscribing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPhase {
    NotSubscribed,
    Subscribing,
    Subscribed,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// The internal state machine.
///
/// Completions ride inside the subscribing states so that resolving them
/// and transitioning are one atomic step under the lock. The connection
/// handle rides along from stage two onward.
enum Lifecycle {
    NotSubscribed,
    /// `open` has been entered but has not returned. No handle yet; a
    /// synchronous error lands here.
    SubscribingStageOne {
        completions: Vec<SubscribeCompletion>,
    },
    /// The connection exists; waiting for the first event.
    SubscribingStageTwo {
        handle: Box<dyn TransportHandle>,
        completions: Vec<SubscribeCompletion>,
    },
    /// Established. `last_event` is replayed to the delegate when
    /// `subscribe` is called redundantly.
    Subscribed {
        handle: Box<dyn TransportHandle>,
        last_event: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// One resumable event subscription.
///
/// Callback delivery for a single connection is sequential by the
/// transport contract; the internal mutex extends that guarantee to
/// callers racing `subscribe`/`unsubscribe` against callbacks from
/// another thread.
pub struct Subscription {
    kind: SubscriptionKind,
    transport: Arc<dyn ResumableTransport>,
    delegate: Arc<dyn SubscriptionDelegate>,
    store: Arc<dyn Store>,
    state: Mutex<Lifecycle>,
    /// Back-reference to hand out as the transport listener.
    this: Weak<Subscription>,
}

impl Subscription {
    /// Creates a subscription in the `NotSubscribed` state.
    pub fn new(
        kind: SubscriptionKind,
        transport: Arc<dyn ResumableTransport>,
        delegate: Arc<dyn SubscriptionDelegate>,
        store: Arc<dyn Store>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            kind,
            transport,
            delegate,
            store,
            state: Mutex::new(Lifecycle::NotSubscribed),
            this: this.clone(),
        })
    }

    /// Which subscription this is.
    pub fn kind(&self) -> &SubscriptionKind {
        &self.kind
    }

    /// The current caller-visible phase.
    pub fn phase(&self) -> SubscriptionPhase {
        match *self.lock() {
            Lifecycle::NotSubscribed => SubscriptionPhase::NotSubscribed,
            Lifecycle::SubscribingStageOne { .. }
            | Lifecycle::SubscribingStageTwo { .. } => {
                SubscriptionPhase::Subscribing
            }
            Lifecycle::Subscribed { .. } => SubscriptionPhase::Subscribed,
        }
    }

    /// Starts or joins subscription establishment.
    ///
    /// Returns immediately; `completion` resolves later. While not
    /// subscribed this opens the one underlying connection; while
    /// subscribing it enqueues alongside earlier callers; while
    /// subscribed it replays the most recent payload to the delegate and
    /// completes with `Ok` at once.
    pub fn subscribe(
        &self,
        completion: impl FnOnce(Result<(), SubscriptionError>) + Send + 'static,
    ) {
        let completion: SubscribeCompletion = Box::new(completion);
        let mut guard = self.lock();
        match &mut *guard {
            Lifecycle::NotSubscribed => {
                *guard = Lifecycle::SubscribingStageOne {
                    completions: vec![completion],
                };
                drop(guard);
                self.open_connection();
            }
            Lifecycle::SubscribingStageOne { completions }
            | Lifecycle::SubscribingStageTwo { completions, .. } => {
                completions.push(completion);
            }
            Lifecycle::Subscribed { last_event, .. } => {
                let replay = last_event.clone();
                drop(guard);
                if let Some(raw) = replay {
                    self.delegate.did_receive_event(&raw);
                }
                completion(Ok(()));
            }
        }
    }

    /// Subscribes and waits for establishment.
    ///
    /// Async convenience over [`Subscription::subscribe`]; the completion
    /// result arrives over a oneshot channel.
    pub async fn subscribe_and_wait(&self) -> Result<(), SubscriptionError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.subscribe(move |result| {
            // The waiter may have gone away; that is their choice.
            let _ = tx.send(result);
        });
        // The sender is dropped unresolved only if the subscription is
        // torn down without running its completions, which behaves like a
        // cancellation.
        rx.await
            .unwrap_or(Err(SubscriptionError::UnsubscribeCalledWhileSubscribing))
    }

    /// Stops the subscription.
    ///
    /// A no-op while not subscribed. While subscribing, every queued
    /// completion fails with
    /// [`SubscriptionError::UnsubscribeCalledWhileSubscribing`] and the
    /// delegate is told. While subscribed this is a clean, caller-chosen
    /// stop: the connection closes with no delegate error.
    pub fn unsubscribe(&self) {
        let mut guard = self.lock();
        match mem::replace(&mut *guard, Lifecycle::NotSubscribed) {
            Lifecycle::NotSubscribed => {}
            Lifecycle::SubscribingStageOne { completions } => {
                drop(guard);
                self.fail_establishment(
                    None,
                    completions,
                    SubscriptionError::UnsubscribeCalledWhileSubscribing,
                );
            }
            Lifecycle::SubscribingStageTwo { handle, completions } => {
                drop(guard);
                self.fail_establishment(
                    Some(handle),
                    completions,
                    SubscriptionError::UnsubscribeCalledWhileSubscribing,
                );
            }
            Lifecycle::Subscribed { mut handle, .. } => {
                drop(guard);
                handle.terminate();
                self.dispatch_state(ConnectionState::NotSubscribed);
            }
        }
    }

    // -- Internals --------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens the transport connection for a fresh attempt.
    ///
    /// Entered with the state already at stage one and the lock released,
    /// because `open` may deliver callbacks synchronously. On return,
    /// either the attempt is still alive (advance to stage two) or a
    /// synchronous failure already tore it down (the returned handle is
    /// orphaned and gets terminated).
    fn open_connection(&self) {
        let listener: Arc<dyn TransportListener> = match self.this.upgrade() {
            Some(subscription) => subscription,
            // Mid-drop; there is nobody left to subscribe for.
            None => return,
        };
        let handle = self.transport.open(listener);

        let mut guard = self.lock();
        match mem::replace(&mut *guard, Lifecycle::NotSubscribed) {
            Lifecycle::SubscribingStageOne { completions } => {
                *guard = Lifecycle::SubscribingStageTwo { handle, completions };
                drop(guard);
                self.dispatch_state(ConnectionState::Subscribing);
            }
            other => {
                *guard = other;
                drop(guard);
                tracing::debug!(
                    kind = %self.kind,
                    "attempt torn down during open, discarding connection"
                );
                let mut handle = handle;
                handle.terminate();
            }
        }
    }

    /// Tears down a subscribing-phase attempt: close the connection if
    /// one exists, publish `NotSubscribed`, tell the delegate, and fail
    /// every queued completion with the same error.
    fn fail_establishment(
        &self,
        handle: Option<Box<dyn TransportHandle>>,
        completions: Vec<SubscribeCompletion>,
        error: SubscriptionError,
    ) {
        tracing::info!(kind = %self.kind, %error, "subscription attempt failed");
        if let Some(mut handle) = handle {
            handle.terminate();
        }
        self.dispatch_state(ConnectionState::NotSubscribed);
        self.delegate.did_receive_error(&error);
        for completion in completions {
            completion(Err(error.clone()));
        }
    }

    fn dispatch_state(&self, state: ConnectionState) {
        tracing::info!(kind = %self.kind, %state, "subscription state changed");
        self.store.dispatch(Action::SubscriptionStateUpdated {
            kind: self.kind.clone(),
            state,
        });
    }
}

// ---------------------------------------------------------------------------
// Transport callbacks
// ---------------------------------------------------------------------------

impl TransportListener for Subscription {
    fn on_event(&self, raw: &str) {
        let mut guard = self.lock();
        match mem::replace(&mut *guard, Lifecycle::NotSubscribed) {
            Lifecycle::SubscribingStageTwo { handle, completions } => {
                // The first event is what establishes the subscription.
                // Whether the payload parses is the delegate's concern;
                // the waiters get Ok regardless.
                *guard = Lifecycle::Subscribed {
                    handle,
                    last_event: Some(raw.to_owned()),
                };
                drop(guard);
                self.dispatch_state(ConnectionState::Subscribed);
                self.delegate.did_receive_event(raw);
                for completion in completions {
                    completion(Ok(()));
                }
            }
            Lifecycle::Subscribed { handle, .. } => {
                *guard = Lifecycle::Subscribed {
                    handle,
                    last_event: Some(raw.to_owned()),
                };
                drop(guard);
                self.delegate.did_receive_event(raw);
            }
            other => {
                *guard = other;
                drop(guard);
                tracing::warn!(
                    kind = %self.kind,
                    "dropping event delivered outside an active connection"
                );
            }
        }
    }

    fn on_error(&self, error: TransportError) {
        let error = SubscriptionError::Transport(error);
        let mut guard = self.lock();
        match mem::replace(&mut *guard, Lifecycle::NotSubscribed) {
            Lifecycle::SubscribingStageOne { completions } => {
                // Synchronous failure inside open: no handle yet, the
                // orphaned one is cleaned up when open returns.
                drop(guard);
                self.fail_establishment(None, completions, error);
            }
            Lifecycle::SubscribingStageTwo { handle, completions } => {
                drop(guard);
                self.fail_establishment(Some(handle), completions, error);
            }
            state @ Lifecycle::Subscribed { .. } => {
                // Errors on an established subscription are informational;
                // the transport manages its own retry underneath.
                *guard = state;
                drop(guard);
                self.delegate.did_receive_error(&error);
            }
            Lifecycle::NotSubscribed => {
                drop(guard);
                tracing::debug!(
                    kind = %self.kind,
                    %error,
                    "ignoring error without an active connection"
                );
            }
        }
    }

    fn on_end(&self) {
        let mut guard = self.lock();
        match mem::replace(&mut *guard, Lifecycle::NotSubscribed) {
            Lifecycle::SubscribingStageOne { completions } => {
                drop(guard);
                self.fail_establishment(
                    None,
                    completions,
                    SubscriptionError::OnEndReceivedWhileSubscribing,
                );
            }
            Lifecycle::SubscribingStageTwo { handle, completions } => {
                drop(guard);
                self.fail_establishment(
                    Some(handle),
                    completions,
                    SubscriptionError::OnEndReceivedWhileSubscribing,
                );
            }
            Lifecycle::Subscribed { mut handle, .. } => {
                drop(guard);
                handle.terminate();
                self.delegate.did_receive_error(
                    &SubscriptionError::OnEndReceivedWhileSubscribed,
                );
                self.dispatch_state(ConnectionState::NotSubscribed);
            }
            Lifecycle::NotSubscribed => {
                drop(guard);
                tracing::debug!(
                    kind = %self.kind,
                    "ignoring end without an active connection"
                );
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match mem::replace(state, Lifecycle::NotSubscribed) {
            Lifecycle::SubscribingStageTwo { mut handle, completions } => {
                handle.terminate();
                for completion in completions {
                    completion(Err(
                        SubscriptionError::UnsubscribeCalledWhileSubscribing,
                    ));
                }
            }
            Lifecycle::SubscribingStageOne { completions } => {
                for completion in completions {
                    completion(Err(
                        SubscriptionError::UnsubscribeCalledWhileSubscribing,
                    ));
                }
            }
            Lifecycle::Subscribed { mut handle, .. } => handle.terminate(),
            Lifecycle::NotSubscribed => {}
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
