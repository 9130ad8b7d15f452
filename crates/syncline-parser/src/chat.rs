//! The chat service event parser: strict envelopes, tolerant entities.
//!
//! Each event is applied inside one [`LocalStore`] transaction. A hard
//! failure (bad envelope, missing mandatory event field, unknown event
//! name) aborts the transaction, so a rejected event leaves the cache
//! untouched. A malformed entity inside an otherwise valid event is
//! logged and skipped; its siblings still commit. This is what lets old
//! clients survive server-side schema additions.

use std::sync::Arc;

use serde_json::Value;
use syncline_store::{LocalStore, StoreTx};
use syncline_wire::{
    DecodeError, Envelope, EventName, Membership, ObjectDecoder, ReadState,
    RemovedFromRoomEvent, Room, ServiceName, ServiceVersion, User,
    UserJoinedRoomEvent, UserLeftRoomEvent,
};

use crate::{EventParser, ParseError};

/// Reconciles chat-service events into a [`LocalStore`].
///
/// Intentionally single-version: it validates the `(service, version)`
/// pair itself and rejects everything but [`ChatEventParser::SERVICE`] at
/// [`ChatEventParser::VERSION`]. Multi-version routing belongs to the
/// registry, which can hold one parser per revision.
pub struct ChatEventParser {
    store: Arc<LocalStore>,
}

impl ChatEventParser {
    /// The service this parser understands.
    pub const SERVICE: ServiceName = ServiceName::Chat;
    /// The single protocol revision this parser understands.
    pub const VERSION: ServiceVersion = ServiceVersion(1);

    /// Creates a parser reconciling into `store`.
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }
}

impl EventParser for ChatEventParser {
    fn parse(
        &self,
        event: &Value,
        service: ServiceName,
        version: ServiceVersion,
    ) -> Result<(), ParseError> {
        if (service, version) != (Self::SERVICE, Self::VERSION) {
            return Err(ParseError::UnsupportedService { service, version });
        }

        let envelope = Envelope::decode(event)?;
        tracing::debug!(event = %envelope.event_name, "applying chat event");

        self.store.transaction(|tx| {
            let data = &envelope.data;
            match envelope.event_name {
                EventName::InitialState => apply_initial_state(data, tx),
                EventName::AddedToRoom => apply_added_to_room(data, tx),
                EventName::RemovedFromRoom => {
                    apply_removed_from_room(data, tx)
                }
                EventName::RoomUpdated => apply_room_updated(data, tx),
                EventName::ReadStateUpdated => {
                    apply_read_state_updated(data, tx)
                }
                EventName::UserJoinedRoom => {
                    apply_user_joined_room(data, tx)
                }
                EventName::UserLeftRoom => apply_user_left_room(data, tx),
            }
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event application
// ---------------------------------------------------------------------------
// Each function returns Err only for envelope-level problems; entity
// decode failures are consumed here via the skip_* helpers.

fn apply_initial_state(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let d = ObjectDecoder::new(data, Envelope::data_path())?;

    match User::decode(
        d.required("current_user")?,
        d.path().child("current_user"),
    ) {
        Ok(user) => tx.set_current_user(user),
        Err(error) => skip_entity("current_user", &error),
    }

    let (rooms, rooms_path) = d.array("rooms")?;
    for (i, value) in rooms.iter().enumerate() {
        match Room::decode(value, rooms_path.index(i)) {
            Ok(room) => tx.upsert_room(room),
            Err(error) => skip_entity("room", &error),
        }
    }

    let (read_states, read_states_path) = d.array("read_states")?;
    for (i, value) in read_states.iter().enumerate() {
        match ReadState::decode(value, read_states_path.index(i)) {
            Ok(read_state) => tx.upsert_read_state(read_state),
            Err(error) => skip_entity("read state", &error),
        }
    }

    let (memberships, memberships_path) = d.array("memberships")?;
    for (i, value) in memberships.iter().enumerate() {
        match Membership::decode(value, memberships_path.index(i)) {
            Ok(membership) => tx.upsert_membership(membership),
            Err(error) => skip_entity("membership", &error),
        }
    }

    Ok(())
}

fn apply_added_to_room(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let d = ObjectDecoder::new(data, Envelope::data_path())?;

    match Room::decode(d.required("room")?, d.path().child("room")) {
        Ok(room) => tx.upsert_room(room),
        Err(error) => skip_entity("room", &error),
    }
    match Membership::decode(
        d.required("membership")?,
        d.path().child("membership"),
    ) {
        Ok(membership) => tx.upsert_membership(membership),
        Err(error) => skip_entity("membership", &error),
    }
    match ReadState::decode(
        d.required("read_state")?,
        d.path().child("read_state"),
    ) {
        Ok(read_state) => tx.upsert_read_state(read_state),
        Err(error) => skip_entity("read state", &error),
    }

    Ok(())
}

fn apply_removed_from_room(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let event = RemovedFromRoomEvent::decode(data, Envelope::data_path())?;
    tx.remove_room(&event.room_identifier);
    Ok(())
}

fn apply_room_updated(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let d = ObjectDecoder::new(data, Envelope::data_path())?;
    match Room::decode(d.required("room")?, d.path().child("room")) {
        Ok(room) => tx.upsert_room(room),
        Err(error) => skip_entity("room", &error),
    }
    Ok(())
}

fn apply_read_state_updated(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let d = ObjectDecoder::new(data, Envelope::data_path())?;
    match ReadState::decode(
        d.required("read_state")?,
        d.path().child("read_state"),
    ) {
        Ok(read_state) => tx.upsert_read_state(read_state),
        Err(error) => skip_entity("read state", &error),
    }
    Ok(())
}

fn apply_user_joined_room(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let event = UserJoinedRoomEvent::decode(data, Envelope::data_path())?;
    tx.add_room_member(&event.room_identifier, &event.user_identifier);
    Ok(())
}

fn apply_user_left_room(
    data: &Value,
    tx: &mut StoreTx<'_>,
) -> Result<(), DecodeError> {
    let event = UserLeftRoomEvent::decode(data, Envelope::data_path())?;
    tx.remove_room_member(&event.room_identifier, &event.user_identifier);
    Ok(())
}

fn skip_entity(entity: &str, error: &DecodeError) {
    tracing::warn!(%entity, %error, "skipping malformed entity");
}

// =========================================================================
// Tests
// =========================================================================
