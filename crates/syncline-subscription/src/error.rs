//! Error types for the subscription lifecycle.

use syncline_transport::TransportError;

/// A named subscription failure.
///
/// Every externally observable failure is one of these variants, so a
/// caller can tell "never got established" apart from "established and
/// then dropped" without string matching. `Clone` because one failure
/// fans out to every completion queued on the subscription.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// The caller cancelled before establishment completed.
    #[error("unsubscribe called while subscribing")]
    UnsubscribeCalledWhileSubscribing,

    /// The transport ended the stream before establishment completed.
    #[error("stream ended while subscribing")]
    OnEndReceivedWhileSubscribing,

    /// The transport ended the stream on an established subscription.
    #[error("stream ended while subscribed")]
    OnEndReceivedWhileSubscribed,

    /// The transport reported a connection failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_error_from_transport_error() {
        let transport = TransportError::new("connection refused");
        let err: SubscriptionError = transport.clone().into();
        assert_eq!(err, SubscriptionError::Transport(transport));
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn test_phase_distinguished_end_errors_are_unequal() {
        assert_ne!(
            SubscriptionError::OnEndReceivedWhileSubscribing,
            SubscriptionError::OnEndReceivedWhileSubscribed
        );
    }
}
