//! ISO-8601 timestamp parsing for wire dates.
//!
//! The service emits UTC timestamps either with or without fractional
//! seconds (`2017-03-23T11:36:42Z`, `2017-03-23T11:36:42.123Z`). Both must
//! decode; anything else invalidates the entity carrying it.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::{DecodeError, KeyPath};

/// Parses a wire timestamp string at the given path.
///
/// # Errors
/// Returns [`DecodeError::DataCorrupted`] if the string is not a valid
/// ISO-8601 / RFC 3339 timestamp.
pub fn parse_timestamp(
    raw: &str,
    path: &KeyPath,
) -> Result<OffsetDateTime, DecodeError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| {
        DecodeError::DataCorrupted {
            path: path.clone(),
            message: format!("invalid ISO-8601 timestamp {raw:?}: {e}"),
        }
    })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_parse_timestamp_without_fractional_seconds() {
        let parsed =
            parse_timestamp("2017-03-23T11:36:42Z", &KeyPath::root())
                .expect("should parse");
        assert_eq!(parsed, datetime!(2017-03-23 11:36:42 UTC));
    }

    #[test]
    fn test_parse_timestamp_with_fractional_seconds() {
        let parsed =
            parse_timestamp("2017-03-23T11:36:42.123Z", &KeyPath::root())
                .expect("should parse");
        assert_eq!(parsed, datetime!(2017-03-23 11:36:42.123 UTC));
    }

    #[test]
    fn test_parse_timestamp_garbage_returns_data_corrupted() {
        let path = KeyPath::root().child("created_at");
        let err = parse_timestamp("next tuesday", &path)
            .expect_err("should fail");
        assert!(
            matches!(err, DecodeError::DataCorrupted { path: p, .. } if p == path)
        );
    }

    #[test]
    fn test_parse_timestamp_date_only_returns_data_corrupted() {
        // A bare date is not a full timestamp.
        let err = parse_timestamp("2017-03-23", &KeyPath::root())
            .expect_err("should fail");
        assert!(matches!(err, DecodeError::DataCorrupted { .. }));
    }
}
