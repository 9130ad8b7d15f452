//! Error type for the transport boundary.

/// An error reported by a transport implementation.
///
/// Transports differ wildly in what can go wrong, so this deliberately
/// carries only a message. It is `Clone` because a single transport
/// failure fans out to every waiter queued on the subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates a transport error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}
