//! The versioned event dispatch registry.

use std::collections::HashMap;

use serde_json::Value;
use syncline_wire::{ServiceName, ServiceVersion};

use crate::ParseError;

/// A parser for one service's events at one protocol version.
pub trait EventParser: Send + Sync {
    /// Parses a raw event. Errors propagate unchanged to whoever asked
    /// the registry to route the event.
    fn parse(
        &self,
        event: &Value,
        service: ServiceName,
        version: ServiceVersion,
    ) -> Result<(), ParseError>;
}

/// Routes raw events to the parser registered for their
/// `(service, version)` key.
///
/// A client typically monitors a handful of service feeds; events from
/// anything else are expected and dropped without error. That makes this
/// registry the place where "which protocol revisions do we understand"
/// is configured, while each parser stays single-version.
#[derive(Default)]
pub struct ModularEventParser {
    parsers: HashMap<(ServiceName, ServiceVersion), Box<dyn EventParser>>,
}

impl ModularEventParser {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parser under a `(service, version)` key.
    ///
    /// Re-registering an occupied key silently replaces the previous
    /// parser; the old one becomes unreachable.
    pub fn register(
        &mut self,
        parser: Box<dyn EventParser>,
        service: ServiceName,
        version: ServiceVersion,
    ) {
        if self
            .parsers
            .insert((service, version), parser)
            .is_some()
        {
            tracing::debug!(%service, %version, "replaced registered parser");
        } else {
            tracing::debug!(%service, %version, "registered parser");
        }
    }

    /// Removes the parser for a key. No-op if none is registered.
    pub fn unregister(
        &mut self,
        service: ServiceName,
        version: ServiceVersion,
    ) {
        if self.parsers.remove(&(service, version)).is_some() {
            tracing::debug!(%service, %version, "unregistered parser");
        }
    }

    /// Whether a parser is registered for the key.
    pub fn is_registered(
        &self,
        service: ServiceName,
        version: ServiceVersion,
    ) -> bool {
        self.parsers.contains_key(&(service, version))
    }

    /// Routes an event.
    ///
    /// An unregistered key succeeds silently — events from unmonitored
    /// services and versions are normal traffic, not errors.
    ///
    /// # Errors
    /// Propagates the registered parser's [`ParseError`] unchanged.
    pub fn parse(
        &self,
        event: &Value,
        service: ServiceName,
        version: ServiceVersion,
    ) -> Result<(), ParseError> {
        match self.parsers.get(&(service, version)) {
            Some(parser) => parser.parse(event, service, version),
            None => {
                tracing::debug!(
                    %service,
                    %version,
                    "ignoring event for unmonitored service"
                );
                Ok(())
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use syncline_wire::{DecodeError, KeyPath};

    use super::*;

    /// Counts how many events it was asked to parse.
    struct CountingParser {
        calls: Arc<AtomicUsize>,
    }

    impl EventParser for CountingParser {
        fn parse(
            &self,
            _event: &Value,
            _service: ServiceName,
            _version: ServiceVersion,
        ) -> Result<(), ParseError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Always fails, to verify error propagation.
    struct FailingParser;

    impl EventParser for FailingParser {
        fn parse(
            &self,
            _event: &Value,
            _service: ServiceName,
            _version: ServiceVersion,
        ) -> Result<(), ParseError> {
            Err(ParseError::InvalidEvent(DecodeError::KeyNotFound {
                path: KeyPath::root().child("event_name"),
            }))
        }
    }

    fn counting(
        registry: &mut ModularEventParser,
        service: ServiceName,
        version: ServiceVersion,
    ) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        registry.register(
            Box::new(CountingParser { calls: Arc::clone(&calls) }),
            service,
            version,
        );
        calls
    }

    #[test]
    fn test_parse_routes_to_matching_version_only() {
        let mut registry = ModularEventParser::new();
        let v1_calls =
            counting(&mut registry, ServiceName::Chat, ServiceVersion(1));
        let v2_calls =
            counting(&mut registry, ServiceName::Chat, ServiceVersion(2));

        registry
            .parse(&json!({}), ServiceName::Chat, ServiceVersion(1))
            .unwrap();

        assert_eq!(v1_calls.load(Ordering::SeqCst), 1);
        assert_eq!(v2_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_unmonitored_version_succeeds_silently() {
        let mut registry = ModularEventParser::new();
        let calls =
            counting(&mut registry, ServiceName::Chat, ServiceVersion(1));

        // v6 was never registered: no error, no parser invoked.
        registry
            .parse(&json!({}), ServiceName::Chat, ServiceVersion(6))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parse_unmonitored_service_succeeds_silently() {
        let registry = ModularEventParser::new();
        registry
            .parse(&json!({}), ServiceName::Presence, ServiceVersion(1))
            .unwrap();
    }

    #[test]
    fn test_register_overwrites_existing_key() {
        let mut registry = ModularEventParser::new();
        let first =
            counting(&mut registry, ServiceName::Chat, ServiceVersion(1));
        let second =
            counting(&mut registry, ServiceName::Chat, ServiceVersion(1));

        registry
            .parse(&json!({}), ServiceName::Chat, ServiceVersion(1))
            .unwrap();

        // The replacement is reachable; the original no longer is.
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregister_removes_parser() {
        let mut registry = ModularEventParser::new();
        let calls =
            counting(&mut registry, ServiceName::Chat, ServiceVersion(1));

        registry.unregister(ServiceName::Chat, ServiceVersion(1));
        assert!(!registry.is_registered(ServiceName::Chat, ServiceVersion(1)));

        registry
            .parse(&json!({}), ServiceName::Chat, ServiceVersion(1))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregister_missing_key_is_noop() {
        let mut registry = ModularEventParser::new();
        registry.unregister(ServiceName::Cursors, ServiceVersion(3));
    }

    #[test]
    fn test_parse_propagates_parser_error_unchanged() {
        let mut registry = ModularEventParser::new();
        registry.register(
            Box::new(FailingParser),
            ServiceName::Chat,
            ServiceVersion(1),
        );

        let err = registry
            .parse(&json!({}), ServiceName::Chat, ServiceVersion(1))
            .unwrap_err();

        assert_eq!(
            err,
            ParseError::InvalidEvent(DecodeError::KeyNotFound {
                path: KeyPath::root().child("event_name"),
            })
        );
    }
}
