//! Decode failure taxonomy for the wire layer.
//!
//! Every error names the exact location of the offending field via a
//! [`KeyPath`], so a log line like `type mismatch at rooms[2].name` points
//! straight at the bad record in a large event payload.

use std::fmt;

// ---------------------------------------------------------------------------
// KeyPath
// ---------------------------------------------------------------------------

/// One step into a JSON document: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// The location of a field inside a JSON document.
///
/// Built up as decoders descend into the payload. Displays in the familiar
/// dotted form, e.g. `data.read_state.cursor.position` or `rooms[2].name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    /// The path of the document root itself.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns this path extended by an object key.
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_owned()));
        Self { segments }
    }

    /// Returns this path extended by an array index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// The final object key on this path, if the path ends in one.
    ///
    /// This is the key a `KeyNotFound` error complains about.
    pub fn last_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Key(key)) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{key}")?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// A field-level wire decode failure.
///
/// The four variants mirror the four ways a strict decoder can reject a
/// document: a required key is missing, a required value is `null`, a value
/// has the wrong JSON type, or the value is structurally present but
/// semantically corrupt (bad timestamp, unknown discriminator, a message
/// part with two bodies).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A required key was absent from the surrounding object.
    #[error("key not found: {path}")]
    KeyNotFound { path: KeyPath },

    /// A required key was present but its value was `null`.
    #[error("value not found: {path} is null")]
    ValueNotFound { path: KeyPath },

    /// The value had a different JSON type than the schema requires.
    #[error("type mismatch at {path}: expected {expected}")]
    TypeMismatch {
        path: KeyPath,
        expected: &'static str,
    },

    /// The value was well-typed but semantically invalid.
    #[error("data corrupted at {path}: {message}")]
    DataCorrupted { path: KeyPath, message: String },
}

impl DecodeError {
    /// The path of the offending field.
    pub fn path(&self) -> &KeyPath {
        match self {
            Self::KeyNotFound { path }
            | Self::ValueNotFound { path }
            | Self::TypeMismatch { path, .. }
            | Self::DataCorrupted { path, .. } => path,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_path_display_dotted_form() {
        let path = KeyPath::root().child("data").child("read_state");
        assert_eq!(path.to_string(), "data.read_state");
    }

    #[test]
    fn test_key_path_display_with_index() {
        let path = KeyPath::root().child("rooms").index(2).child("name");
        assert_eq!(path.to_string(), "rooms[2].name");
    }

    #[test]
    fn test_key_path_root_displays_placeholder() {
        assert_eq!(KeyPath::root().to_string(), "<root>");
    }

    #[test]
    fn test_key_path_last_key_returns_trailing_key() {
        let path = KeyPath::root().child("data").child("room_id");
        assert_eq!(path.last_key(), Some("room_id"));
    }

    #[test]
    fn test_key_path_last_key_none_after_index() {
        let path = KeyPath::root().child("rooms").index(0);
        assert_eq!(path.last_key(), None);
    }

    #[test]
    fn test_decode_error_display_carries_path() {
        let err = DecodeError::TypeMismatch {
            path: KeyPath::root().child("rooms").index(2).child("name"),
            expected: "string",
        };
        assert_eq!(
            err.to_string(),
            "type mismatch at rooms[2].name: expected string"
        );
    }

    #[test]
    fn test_decode_error_path_accessor() {
        let path = KeyPath::root().child("id");
        let err = DecodeError::KeyNotFound { path: path.clone() };
        assert_eq!(err.path(), &path);
    }
}
