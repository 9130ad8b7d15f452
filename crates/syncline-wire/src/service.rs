//! Service identity: which backend feed an event belongs to, and which
//! protocol revision it speaks.
//!
//! Together, `(ServiceName, ServiceVersion)` is the routing key of the
//! event registry: parsers register under a pair, events arrive tagged
//! with a pair.

use std::fmt;

/// A backend service that can feed events to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceName {
    /// The core chat service: rooms, users, memberships, read states.
    Chat,
    /// The cursor service: per-user read positions.
    Cursors,
    /// The presence service: online/offline signals.
    Presence,
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chat => "chat",
            Self::Cursors => "cursors",
            Self::Presence => "presence",
        };
        write!(f, "{name}")
    }
}

/// A protocol revision of a service.
///
/// Newtype over the raw revision number, so a version can't be confused
/// with any other integer floating through the dispatch path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceVersion(pub u16);

impl fmt::Display for ServiceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}
