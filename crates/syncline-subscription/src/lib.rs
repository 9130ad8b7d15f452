//! Subscription lifecycle for Syncline.
//!
//! This crate owns the client side of "stay connected to a feed":
//!
//! - [`Subscription`] — the per-connection state machine. Queues every
//!   `subscribe` caller until the first event arrives, survives the
//!   synchronous-error window around transport `open`, and maps
//!   cancellation, transport errors, and stream end onto named
//!   [`SubscriptionError`] variants.
//! - [`ActionDispatcher`] — the delegate that parses raw payloads and
//!   dispatches them into a [`Store`](syncline_store::Store).
//! - [`SubscriptionFactory`] — hands out one cached [`Subscription`] per
//!   [`SubscriptionKind`](syncline_store::SubscriptionKind), dialing
//!   transports through a [`TransportProvider`].

mod dispatcher;
mod error;
mod factory;
mod subscription;

pub use dispatcher::ActionDispatcher;
pub use error::SubscriptionError;
pub use factory::{SubscriptionFactory, TransportProvider};
pub use subscription::{
    SubscribeCompletion, Subscription, SubscriptionDelegate, SubscriptionPhase,
};
