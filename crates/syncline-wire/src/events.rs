//! Event envelopes: the outer wrapper every subscription payload arrives
//! in, plus typed payloads for the scalar-only events.
//!
//! An envelope is `{ "event_name": ..., "data": ..., "timestamp": ... }`.
//! Envelope decoding is strict — an unparsable envelope fails the whole
//! event — while the entities *inside* `data` are decoded individually and
//! tolerantly by the parser layer.

use std::fmt;

use serde_json::Value;
use time::OffsetDateTime;

use crate::json::{tolerated, ObjectDecoder};
use crate::{DecodeError, KeyPath};

// ---------------------------------------------------------------------------
// EventName
// ---------------------------------------------------------------------------

/// The discriminator of a subscription event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// The full bootstrap snapshot delivered on subscription start.
    InitialState,
    /// The current user was added to a room.
    AddedToRoom,
    /// The current user was removed from a room.
    RemovedFromRoom,
    /// A room's fields changed.
    RoomUpdated,
    /// The current user's read state for a room changed.
    ReadStateUpdated,
    /// Another user joined a room the current user is in.
    UserJoinedRoom,
    /// Another user left a room the current user is in.
    UserLeftRoom,
}

impl EventName {
    /// Maps a wire discriminator to an event name.
    ///
    /// Returns `None` for discriminators this client does not know.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "initial_state" => Some(Self::InitialState),
            "added_to_room" => Some(Self::AddedToRoom),
            "removed_from_room" => Some(Self::RemovedFromRoom),
            "room_updated" => Some(Self::RoomUpdated),
            "read_state_updated" => Some(Self::ReadStateUpdated),
            "user_joined_room" => Some(Self::UserJoinedRoom),
            "user_left_room" => Some(Self::UserLeftRoom),
            _ => None,
        }
    }

    /// The wire discriminator for this event name.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::InitialState => "initial_state",
            Self::AddedToRoom => "added_to_room",
            Self::RemovedFromRoom => "removed_from_room",
            Self::RoomUpdated => "room_updated",
            Self::ReadStateUpdated => "read_state_updated",
            Self::UserJoinedRoom => "user_joined_room",
            Self::UserLeftRoom => "user_left_room",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A decoded event envelope.
///
/// `data` stays raw: which entities it holds, and how leniently they are
/// decoded, is the parser's business.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub event_name: EventName,
    pub data: Value,
    pub timestamp: Option<OffsetDateTime>,
}

impl Envelope {
    /// Decodes the outer envelope of a subscription payload.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if the payload is not an object, lacks
    /// `event_name` or `data`, or names an event this client does not
    /// recognize.
    pub fn decode(value: &Value) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, KeyPath::root())?;
        let raw_name = d.string("event_name")?;
        let event_name = EventName::from_wire(&raw_name).ok_or_else(|| {
            DecodeError::DataCorrupted {
                path: KeyPath::root().child("event_name"),
                message: format!("unknown event name {raw_name:?}"),
            }
        })?;
        Ok(Self {
            event_name,
            data: d.required("data")?.clone(),
            // The timestamp is envelope metadata, not entity state; a bad
            // one is dropped rather than failing the event.
            timestamp: tolerated(d.optional_timestamp("timestamp")),
        })
    }

    /// The path at which `data`'s fields live, for parser diagnostics.
    pub fn data_path() -> KeyPath {
        KeyPath::root().child("data")
    }
}

// ---------------------------------------------------------------------------
// Scalar event payloads
// ---------------------------------------------------------------------------

/// Payload of `removed_from_room`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedFromRoomEvent {
    pub room_identifier: String,
}

impl RemovedFromRoomEvent {
    /// Decodes the payload. `room_id` is mandatory.
    ///
    /// # Errors
    /// Returns [`DecodeError::KeyNotFound`] for a missing `room_id`, and
    /// the usual taxonomy for null or mistyped values.
    pub fn decode(data: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(data, path)?;
        Ok(Self {
            room_identifier: d.string("room_id")?,
        })
    }
}

/// Payload of `user_joined_room`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserJoinedRoomEvent {
    pub room_identifier: String,
    pub user_identifier: String,
}

impl UserJoinedRoomEvent {
    /// Decodes the payload. Both ids are mandatory.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] for a missing, null, or mistyped id.
    pub fn decode(data: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(data, path)?;
        Ok(Self {
            room_identifier: d.string("room_id")?,
            user_identifier: d.string("user_id")?,
        })
    }
}

/// Payload of `user_left_room`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLeftRoomEvent {
    pub room_identifier: String,
    pub user_identifier: String,
}

impl UserLeftRoomEvent {
    /// Decodes the payload. Both ids are mandatory.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] for a missing, null, or mistyped id.
    pub fn decode(data: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(data, path)?;
        Ok(Self {
            room_identifier: d.string("room_id")?,
            user_identifier: d.string("user_id")?,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
