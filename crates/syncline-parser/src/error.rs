//! Error types for the parser layer.

use syncline_wire::{DecodeError, ServiceName, ServiceVersion};

/// A hard event-parsing failure, surfaced to the registry caller.
///
/// Entity-level problems never show up here — the chat parser recovers
/// from those internally. What does: an envelope that cannot be decoded
/// at all, and an event handed to a parser for a `(service, version)`
/// pair it was never meant to handle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// The event envelope (or a mandatory event-level field) could not be
    /// decoded. Carries the offending key path.
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] DecodeError),

    /// The parser was asked to validate a service/version pair it does
    /// not support.
    #[error("invalid event: unsupported service {service} {version}")]
    UnsupportedService {
        service: ServiceName,
        version: ServiceVersion,
    },
}

#[cfg(test)]
mod tests {
    use syncline_wire::KeyPath;

    use super::*;

    #[test]
    fn test_parse_error_from_decode_error() {
        let decode = DecodeError::KeyNotFound {
            path: KeyPath::root().child("room_id"),
        };
        let err: ParseError = decode.clone().into();
        assert_eq!(err, ParseError::InvalidEvent(decode));
    }

    #[test]
    fn test_unsupported_service_display() {
        let err = ParseError::UnsupportedService {
            service: ServiceName::Chat,
            version: ServiceVersion(6),
        };
        assert_eq!(
            err.to_string(),
            "invalid event: unsupported service chat v6"
        );
    }
}
