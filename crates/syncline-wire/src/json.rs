//! Path-tracking accessors over dynamic JSON values.
//!
//! [`ObjectDecoder`] wraps a [`serde_json::Value`] that must be an object
//! and hands out typed field accessors. Every accessor knows where it is in
//! the document, so failures come back as [`DecodeError`]s with an exact
//! [`KeyPath`].
//!
//! The null-vs-missing rule lives here: a key that is absent and a key that
//! is present with value `null` both read as "no value" through the
//! `optional_*` accessors, while `required` distinguishes them
//! (`KeyNotFound` vs `ValueNotFound`) for better diagnostics.

use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::timestamp::parse_timestamp;
use crate::{DecodeError, KeyPath};

/// A typed view over one JSON object at a known path.
pub struct ObjectDecoder<'a> {
    object: &'a Map<String, Value>,
    path: KeyPath,
}

impl<'a> ObjectDecoder<'a> {
    /// Wraps `value`, which must be a JSON object.
    ///
    /// # Errors
    /// Returns [`DecodeError::TypeMismatch`] if `value` is anything else.
    pub fn new(
        value: &'a Value,
        path: KeyPath,
    ) -> Result<Self, DecodeError> {
        match value {
            Value::Object(object) => Ok(Self { object, path }),
            _ => Err(DecodeError::TypeMismatch {
                path,
                expected: "object",
            }),
        }
    }

    /// The path of this object within the enclosing document.
    pub fn path(&self) -> &KeyPath {
        &self.path
    }

    // -- Raw access -------------------------------------------------------

    /// Returns the value for a required key.
    ///
    /// # Errors
    /// [`DecodeError::KeyNotFound`] if the key is absent,
    /// [`DecodeError::ValueNotFound`] if it is present but `null`.
    pub fn required(&self, key: &str) -> Result<&'a Value, DecodeError> {
        match self.object.get(key) {
            None => Err(DecodeError::KeyNotFound {
                path: self.path.child(key),
            }),
            Some(Value::Null) => Err(DecodeError::ValueNotFound {
                path: self.path.child(key),
            }),
            Some(value) => Ok(value),
        }
    }

    /// Returns the value for an optional key.
    ///
    /// Absent and `null` both read as `None`.
    pub fn optional(&self, key: &str) -> Option<&'a Value> {
        match self.object.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    // -- Scalars ----------------------------------------------------------

    /// Decodes a required string field.
    pub fn string(&self, key: &str) -> Result<String, DecodeError> {
        let value = self.required(key)?;
        value.as_str().map(str::to_owned).ok_or_else(|| {
            DecodeError::TypeMismatch {
                path: self.path.child(key),
                expected: "string",
            }
        })
    }

    /// Decodes an optional string field. `null` and absence yield `None`.
    pub fn optional_string(
        &self,
        key: &str,
    ) -> Result<Option<String>, DecodeError> {
        match self.optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(|s| Some(s.to_owned()))
                .ok_or_else(|| DecodeError::TypeMismatch {
                    path: self.path.child(key),
                    expected: "string",
                }),
        }
    }

    /// Decodes a required boolean field.
    pub fn boolean(&self, key: &str) -> Result<bool, DecodeError> {
        let value = self.required(key)?;
        value.as_bool().ok_or_else(|| DecodeError::TypeMismatch {
            path: self.path.child(key),
            expected: "boolean",
        })
    }

    /// Decodes a required signed integer field.
    pub fn integer(&self, key: &str) -> Result<i64, DecodeError> {
        let value = self.required(key)?;
        value.as_i64().ok_or_else(|| DecodeError::TypeMismatch {
            path: self.path.child(key),
            expected: "integer",
        })
    }

    /// Decodes a required non-negative integer field.
    pub fn unsigned(&self, key: &str) -> Result<u64, DecodeError> {
        let value = self.required(key)?;
        value.as_u64().ok_or_else(|| DecodeError::TypeMismatch {
            path: self.path.child(key),
            expected: "non-negative integer",
        })
    }

    // -- Containers -------------------------------------------------------

    /// Decodes a required array field.
    ///
    /// Returns the elements plus the array's own path, so callers can
    /// build per-element paths with [`KeyPath::index`].
    pub fn array(
        &self,
        key: &str,
    ) -> Result<(&'a [Value], KeyPath), DecodeError> {
        let value = self.required(key)?;
        let path = self.path.child(key);
        match value.as_array() {
            Some(elements) => Ok((elements.as_slice(), path)),
            None => Err(DecodeError::TypeMismatch {
                path,
                expected: "array",
            }),
        }
    }

    /// Decodes a required nested object field.
    pub fn object(&self, key: &str) -> Result<ObjectDecoder<'a>, DecodeError> {
        let value = self.required(key)?;
        ObjectDecoder::new(value, self.path.child(key))
    }

    // -- Timestamps -------------------------------------------------------

    /// Decodes a required ISO-8601 timestamp field.
    pub fn timestamp(
        &self,
        key: &str,
    ) -> Result<OffsetDateTime, DecodeError> {
        let raw = self.string(key)?;
        parse_timestamp(&raw, &self.path.child(key))
    }

    /// Decodes an optional ISO-8601 timestamp field.
    pub fn optional_timestamp(
        &self,
        key: &str,
    ) -> Result<Option<OffsetDateTime>, DecodeError> {
        match self.optional_string(key)? {
            None => Ok(None),
            Some(raw) => {
                parse_timestamp(&raw, &self.path.child(key)).map(Some)
            }
        }
    }

    /// Decodes an optional opaque key/value map field.
    pub fn optional_map(
        &self,
        key: &str,
    ) -> Result<Option<Map<String, Value>>, DecodeError> {
        match self.optional(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(_) => Err(DecodeError::TypeMismatch {
                path: self.path.child(key),
                expected: "object",
            }),
        }
    }
}

/// Downgrades an optional-field decode failure to "no value", with a log.
///
/// Optional fields are individually disposable: a corrupted custom-data
/// blob must not discard the room that carries it. Mandatory fields never
/// pass through here.
pub(crate) fn tolerated<T>(
    result: Result<Option<T>, DecodeError>,
) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, "dropping undecodable optional field");
            None
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decoder(value: &Value) -> ObjectDecoder<'_> {
        ObjectDecoder::new(value, KeyPath::root()).expect("object")
    }

    #[test]
    fn test_new_rejects_non_object() {
        let value = json!([1, 2, 3]);
        let err = ObjectDecoder::new(&value, KeyPath::root())
            .err()
            .expect("should fail");
        assert!(matches!(
            err,
            DecodeError::TypeMismatch { expected: "object", .. }
        ));
    }

    #[test]
    fn test_required_missing_key_returns_key_not_found() {
        let value = json!({});
        let err = decoder(&value).required("room_id").unwrap_err();
        assert!(
            matches!(&err, DecodeError::KeyNotFound { path } if path.last_key() == Some("room_id"))
        );
    }

    #[test]
    fn test_required_null_returns_value_not_found() {
        // Present-but-null is distinguished from missing.
        let value = json!({ "room_id": null });
        let err = decoder(&value).required("room_id").unwrap_err();
        assert!(matches!(err, DecodeError::ValueNotFound { .. }));
    }

    #[test]
    fn test_optional_null_reads_as_none() {
        let value = json!({ "custom_data": null });
        assert!(decoder(&value).optional("custom_data").is_none());
    }

    #[test]
    fn test_string_wrong_type_returns_type_mismatch() {
        let value = json!({ "name": 42 });
        let err = decoder(&value).string("name").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch { expected: "string", .. }
        ));
    }

    #[test]
    fn test_optional_string_wrong_type_is_an_error() {
        // Optional means "may be absent", not "may be any type".
        let value = json!({ "avatar_url": 7 });
        let err = decoder(&value).optional_string("avatar_url").unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_optional_string_absent_is_none() {
        let value = json!({});
        let decoded = decoder(&value).optional_string("avatar_url").unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        let value = json!({ "unread_count": -3 });
        let err = decoder(&value).unsigned("unread_count").unwrap_err();
        assert!(matches!(err, DecodeError::TypeMismatch { .. }));
    }

    #[test]
    fn test_array_returns_elements_and_path() {
        let value = json!({ "user_ids": ["a", "b"] });
        let (elements, path) = decoder(&value).array("user_ids").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(path.to_string(), "user_ids");
        assert_eq!(path.index(1).to_string(), "user_ids[1]");
    }

    #[test]
    fn test_object_nested_path_accumulates() {
        let value = json!({ "cursor": { "position": "oops" } });
        let cursor = decoder(&value).object("cursor").unwrap();
        let err = cursor.integer("position").unwrap_err();
        assert_eq!(err.path().to_string(), "cursor.position");
    }

    #[test]
    fn test_timestamp_parses_wire_date() {
        let value = json!({ "created_at": "2017-03-23T11:36:42Z" });
        decoder(&value).timestamp("created_at").expect("should parse");
    }

    #[test]
    fn test_optional_map_wrong_type_is_an_error() {
        let value = json!({ "custom_data": "not a map" });
        let err = decoder(&value).optional_map("custom_data").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch { expected: "object", .. }
        ));
    }

    #[test]
    fn test_tolerated_drops_failures_to_none() {
        let failed: Result<Option<String>, DecodeError> =
            Err(DecodeError::ValueNotFound { path: KeyPath::root() });
        assert_eq!(tolerated(failed), None);
        assert_eq!(tolerated(Ok(Some(1))), Some(1));
    }
}
