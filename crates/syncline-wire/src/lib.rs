//! Wire schema and strict JSON decoders for Syncline.
//!
//! Everything the chat service puts on the wire is decoded here: entity
//! records (rooms, users, cursors, read states, memberships, message parts)
//! and the event envelopes that carry them. Decoding is deliberately manual,
//! routed over [`serde_json::Value`], because the error contract demands
//! more than serde derive gives us:
//!
//! - every failure carries the exact [`KeyPath`] of the offending field
//! - a present-but-`null` optional field is "absent", while a
//!   present-but-wrong-typed field is a [`DecodeError`]
//! - timestamps are ISO-8601 UTC, accepted with or without fractional
//!   seconds
//!
//! # Key types
//!
//! - [`DecodeError`] / [`KeyPath`] — field-level failure taxonomy
//! - [`ObjectDecoder`] — path-tracking accessor over a JSON object
//! - [`Room`], [`User`], [`Cursor`], [`ReadState`], [`Membership`],
//!   [`MessagePart`] — decoded entities
//! - [`Envelope`] / [`EventName`] — the outer event wrapper
//! - [`ServiceName`] / [`ServiceVersion`] — registry routing key parts

mod entities;
mod error;
mod events;
mod json;
mod service;
mod timestamp;

pub use entities::{
    Cursor, CursorType, CustomData, Membership, MessagePart, ReadState,
    Room, User,
};
pub use error::{DecodeError, KeyPath};
pub use events::{
    Envelope, EventName, RemovedFromRoomEvent, UserJoinedRoomEvent,
    UserLeftRoomEvent,
};
pub use json::ObjectDecoder;
pub use service::{ServiceName, ServiceVersion};
pub use timestamp::parse_timestamp;
