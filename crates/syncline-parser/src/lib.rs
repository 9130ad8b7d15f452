//! Event parsing for Syncline: versioned dispatch plus chat
//! reconciliation.
//!
//! Two layers:
//!
//! - [`ModularEventParser`] — a registry mapping `(service, version)` to
//!   a parser. Events for unmonitored services are expected traffic and
//!   ignored; events for a registered key go to exactly that parser.
//! - [`ChatEventParser`] — the concrete parser for the chat service. It
//!   decodes event envelopes strictly, then reconciles the entities they
//!   carry into a [`LocalStore`](syncline_store::LocalStore) tolerantly:
//!   one malformed room in a batch is skipped, its siblings still land.
//!
//! The dividing line is the envelope boundary. Above it (the envelope
//! itself, mandatory event-level fields) failures are hard
//! [`ParseError`]s; below it (individual entities, optional fields)
//! failures are logged and recovered.

mod chat;
mod error;
mod registry;

pub use chat::ChatEventParser;
pub use error::ParseError;
pub use registry::{EventParser, ModularEventParser};
