//! Transport abstraction for Syncline.
//!
//! Defines the contract between the subscription layer and whatever
//! mechanism actually moves bytes: anything that can open a resumable
//! streaming connection and deliver `{open, event, error, end}` signals
//! satisfies it. HTTP chunked streaming, WebSockets, and in-memory test
//! doubles all fit behind the same three traits.
//!
//! The subscription layer assumes nothing further — in particular,
//! reconnection and retry happen *inside* a transport implementation,
//! beneath this boundary.

mod error;

pub use error::TransportError;

use std::sync::Arc;

/// Opens resumable streaming connections.
///
/// `open` may invoke listener callbacks *synchronously*, before it
/// returns — a transport that fails fast (bad URL, no token) is allowed to
/// call [`TransportListener::on_error`] from inside `open`. Callers must
/// be in a state where that callback is already valid.
pub trait ResumableTransport: Send + Sync + 'static {
    /// Opens a connection, wiring `listener` to receive its signals.
    ///
    /// Returns a handle that terminates the connection when asked.
    fn open(
        &self,
        listener: Arc<dyn TransportListener>,
    ) -> Box<dyn TransportHandle>;
}

/// A live connection produced by [`ResumableTransport::open`].
pub trait TransportHandle: Send {
    /// Closes the connection. No further listener callbacks may be
    /// delivered for this handle after `terminate` returns.
    fn terminate(&mut self);
}

/// Receives the signals of one connection.
///
/// Exactly one callback fires per occurrence. Implementations must
/// tolerate delivery from any thread; a single connection delivers its
/// callbacks sequentially.
pub trait TransportListener: Send + Sync {
    /// The connection is established. Informational; the subscription
    /// layer keys its own state off the first event instead.
    fn on_open(&self) {}

    /// A raw JSON payload arrived.
    fn on_event(&self, raw: &str);

    /// The connection failed.
    fn on_error(&self, error: TransportError);

    /// The stream ended without an error.
    fn on_end(&self);
}
