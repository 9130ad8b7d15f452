//! # Syncline
//!
//! Client-side synchronization core for a chat SDK.
//!
//! Syncline maintains resumable, versioned event subscriptions to a
//! remote chat service and reconciles the incoming events into a locally
//! cached, consistent view of rooms, users, read states, and memberships.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use syncline::prelude::*;
//!
//! // Implement TransportProvider for your transport, then:
//! // let engine = SyncEngine::new(my_provider);
//! // engine.subscribe_to_user().await?;
//! // let rooms = engine.store().rooms();
//! ```

mod engine;

pub use engine::SyncEngine;

/// Installs a `tracing` subscriber reading its filter from `RUST_LOG`.
///
/// Convenience for binaries and tests; embedders with their own
/// subscriber should skip this. Safe to call more than once, later calls
/// are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub mod prelude {
    pub use syncline_store::{
        ConnectionState, LocalStore, SubscriptionKind,
    };
    pub use syncline_subscription::{
        SubscriptionError, TransportProvider,
    };
    pub use syncline_transport::{
        ResumableTransport, TransportError, TransportHandle,
        TransportListener,
    };
    pub use syncline_wire::{
        Cursor, CursorType, Membership, MessagePart, ReadState, Room, User,
    };

    pub use crate::SyncEngine;
}
