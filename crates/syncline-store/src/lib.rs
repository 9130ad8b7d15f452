//! Local entity cache and store dispatch contract for Syncline.
//!
//! Two halves:
//!
//! - [`LocalStore`] — the in-memory cache of chat entities, mutated only
//!   through transactional scopes with commit-or-discard semantics.
//! - [`Action`] / [`Store`] — the one-way message contract between the
//!   subscription layer and whatever reduces its output: subscription
//!   state changes and raw event envelopes flow as actions into a
//!   [`Store`] implementation.
//!
//! # Key types
//!
//! - [`LocalStore`] / [`StoreTx`] / [`StoreContents`] — the cache
//! - [`Action`] — what the subscription layer emits
//! - [`Store`] — the dispatch trait
//! - [`SubscriptionKind`] / [`ConnectionState`] — identity and lifecycle
//!   of one subscription as the application sees it

mod action;
mod local;

pub use action::{Action, ConnectionState, Store, SubscriptionKind};
pub use local::{LocalStore, StoreContents, StoreTx};
