//! Decoded chat entities and their wire decoders.
//!
//! Each entity decodes from a raw [`serde_json::Value`] at a known
//! [`KeyPath`]. Decoders are strict about mandatory fields — a missing or
//! mistyped identifier rejects the whole entity — but individually drop
//! optional fields that fail to decode (see [`tolerated`]), because a
//! corrupted custom-data blob must not take the room down with it.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use time::OffsetDateTime;

use crate::json::{tolerated, ObjectDecoder};
use crate::{DecodeError, KeyPath};

/// Opaque application-defined key/value payload attached to rooms and
/// users. Passed through to application code untouched.
pub type CustomData = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// A chat room.
///
/// `deleted_at` present means the room is soft-deleted: it stays in the
/// local cache so application code can render tombstones, but the server
/// considers it gone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub identifier: String,
    pub name: String,
    pub creator_id: String,
    pub is_private: bool,
    pub push_notification_title_override: Option<String>,
    pub custom_data: Option<CustomData>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Room {
    /// Decodes a room record.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if any mandatory field is missing, null,
    /// or mistyped. Optional fields that fail to decode are dropped.
    pub fn decode(value: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, path)?;
        Ok(Self {
            identifier: d.string("id")?,
            name: d.string("name")?,
            creator_id: d.string("created_by_id")?,
            is_private: d.boolean("private")?,
            push_notification_title_override: tolerated(
                d.optional_string("push_notification_title_override"),
            ),
            custom_data: tolerated(d.optional_map("custom_data")),
            last_message_at: tolerated(
                d.optional_timestamp("last_message_at"),
            ),
            created_at: d.timestamp("created_at")?,
            updated_at: d.timestamp("updated_at")?,
            deleted_at: tolerated(d.optional_timestamp("deleted_at")),
        })
    }

    /// Whether the room is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A chat user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub identifier: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub custom_data: Option<CustomData>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub deleted_at: Option<OffsetDateTime>,
}

impl User {
    /// Decodes a user record.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if any mandatory field is missing, null,
    /// or mistyped.
    pub fn decode(value: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, path)?;
        Ok(Self {
            identifier: d.string("id")?,
            name: d.string("name")?,
            avatar_url: tolerated(d.optional_string("avatar_url")),
            custom_data: tolerated(d.optional_map("custom_data")),
            created_at: d.timestamp("created_at")?,
            updated_at: d.timestamp("updated_at")?,
            deleted_at: tolerated(d.optional_timestamp("deleted_at")),
        })
    }
}

// ---------------------------------------------------------------------------
// Cursor / ReadState
// ---------------------------------------------------------------------------

/// The kind of a cursor. The wire encodes this as an integer; `0` (read
/// cursor) is the only value the service currently emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorType {
    Read,
}

impl CursorType {
    fn decode(raw: i64, path: &KeyPath) -> Result<Self, DecodeError> {
        match raw {
            0 => Ok(Self::Read),
            other => Err(DecodeError::DataCorrupted {
                path: path.clone(),
                message: format!("unknown cursor type {other}"),
            }),
        }
    }
}

/// A user's position within a room's message history.
///
/// `position` is a server-issued message sequence number and only ever
/// moves forward.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cursor {
    pub room_identifier: String,
    pub user_identifier: String,
    pub cursor_type: CursorType,
    pub position: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Cursor {
    /// Decodes a cursor record.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if any field is missing, null, mistyped,
    /// or carries an unknown cursor type.
    pub fn decode(value: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, path)?;
        let cursor_type = CursorType::decode(
            d.integer("cursor_type")?,
            &d.path().child("cursor_type"),
        )?;
        Ok(Self {
            room_identifier: d.string("room_id")?,
            user_identifier: d.string("user_id")?,
            cursor_type,
            position: d.integer("position")?,
            updated_at: d.timestamp("updated_at")?,
        })
    }
}

/// The unread summary for one room, with the user's read cursor embedded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadState {
    pub room_identifier: String,
    pub unread_count: u64,
    pub cursor: Cursor,
}

impl ReadState {
    /// Decodes a read-state record, including the nested cursor.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] for any missing or mistyped field; nested
    /// cursor failures carry the full path (e.g. `cursor.position`).
    pub fn decode(value: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, path)?;
        let cursor = Cursor::decode(
            d.required("cursor")?,
            d.path().child("cursor"),
        )?;
        Ok(Self {
            room_identifier: d.string("room_id")?,
            unread_count: d.unsigned("unread_count")?,
            cursor,
        })
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// The set of users currently in one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub room_identifier: String,
    pub user_identifiers: BTreeSet<String>,
}

impl Membership {
    /// Decodes a membership record.
    ///
    /// Duplicate user ids on the wire collapse into the set.
    ///
    /// # Errors
    /// Returns a [`DecodeError`] if `room_id` or `user_ids` is missing or
    /// mistyped, including any non-string element of `user_ids`.
    pub fn decode(value: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, path)?;
        let room_identifier = d.string("room_id")?;
        let (elements, array_path) = d.array("user_ids")?;
        let mut user_identifiers = BTreeSet::new();
        for (i, element) in elements.iter().enumerate() {
            let user_id = element.as_str().ok_or_else(|| {
                DecodeError::TypeMismatch {
                    path: array_path.index(i),
                    expected: "string",
                }
            })?;
            user_identifiers.insert(user_id.to_owned());
        }
        Ok(Self {
            room_identifier,
            user_identifiers,
        })
    }
}

// ---------------------------------------------------------------------------
// MessagePart
// ---------------------------------------------------------------------------

/// One part of a message: exactly one body variant, tagged with a MIME
/// type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePart {
    /// Content carried inline in the event.
    Inline { mime_type: String, content: String },
    /// A reference to an uploaded attachment.
    Attachment {
        mime_type: String,
        attachment_id: String,
    },
    /// A link to externally hosted content.
    Url { mime_type: String, url: String },
}

impl MessagePart {
    /// Decodes a message part.
    ///
    /// # Errors
    /// Returns [`DecodeError::DataCorrupted`] when the MIME type is empty
    /// or when the part does not carry exactly one of `content`,
    /// `attachment`, `url` — a corrupted-payload condition distinct from
    /// ordinary field validation.
    pub fn decode(value: &Value, path: KeyPath) -> Result<Self, DecodeError> {
        let d = ObjectDecoder::new(value, path)?;
        let mime_type = d.string("type")?;
        if mime_type.is_empty() {
            return Err(DecodeError::DataCorrupted {
                path: d.path().child("type"),
                message: "MIME type must not be empty".to_owned(),
            });
        }

        let content = d.optional("content");
        let attachment = d.optional("attachment");
        let url = d.optional("url");
        let present = [content, attachment, url]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if present != 1 {
            return Err(DecodeError::DataCorrupted {
                path: d.path().clone(),
                message: "Expected exactly one of content, attachment or url"
                    .to_owned(),
            });
        }

        if content.is_some() {
            Ok(Self::Inline {
                mime_type,
                content: d.string("content")?,
            })
        } else if url.is_some() {
            Ok(Self::Url {
                mime_type,
                url: d.string("url")?,
            })
        } else {
            let attachment = d.object("attachment")?;
            Ok(Self::Attachment {
                mime_type,
                attachment_id: attachment.string("id")?,
            })
        }
    }

    /// The MIME type tag of this part. Never empty for a decoded part.
    pub fn mime_type(&self) -> &str {
        match self {
            Self::Inline { mime_type, .. }
            | Self::Attachment { mime_type, .. }
            | Self::Url { mime_type, .. } => mime_type,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
