//! The local entity cache.
//!
//! [`LocalStore`] holds the client's reconciled view of the chat world:
//! the current user, rooms, users, read states, and memberships, each
//! keyed by its server-issued identifier.
//!
//! # Transactions
//!
//! All mutation happens through [`LocalStore::transaction`], which stages
//! a copy of the contents, runs the caller's closure against it, and
//! commits the copy only on `Ok`. An `Err` (or a panic) discards the
//! staged copy, so a half-applied event can never become visible. The
//! store lock is held for the whole transaction, which serializes writers
//! at event-batch granularity.
//!
//! # Upsert semantics
//!
//! An entity with a matching identifier is updated field by field in
//! place; one with no match is created. The wire schema always sends
//! whole objects, so the field-wise update degenerates to overwrite.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use syncline_wire::{Membership, ReadState, Room, User};

// ---------------------------------------------------------------------------
// StoreContents
// ---------------------------------------------------------------------------

/// A complete snapshot of the cache.
///
/// Cloneable and comparable, which is what reconciliation tests lean on:
/// applying the same event twice must yield equal snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoreContents {
    pub current_user: Option<User>,
    pub rooms: HashMap<String, Room>,
    pub users: HashMap<String, User>,
    pub read_states: HashMap<String, ReadState>,
    pub memberships: HashMap<String, Membership>,
}

// ---------------------------------------------------------------------------
// LocalStore
// ---------------------------------------------------------------------------

/// The in-memory entity cache.
///
/// Cheap to share: wrap it in an `Arc` and hand it to the parser and the
/// application layer. Reads clone out of the lock; writes go through
/// [`LocalStore::transaction`].
#[derive(Debug, Default)]
pub struct LocalStore {
    inner: Mutex<StoreContents>,
}

impl LocalStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreContents> {
        // A poisoned lock means a writer panicked before commit; the
        // committed contents are still consistent, so recover the guard.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` against a staged copy of the contents.
    ///
    /// Commits the copy if `f` returns `Ok`, discards it otherwise. The
    /// error type is the caller's; the store adds no failure modes of its
    /// own.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut StoreTx<'_>) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.lock();
        let mut staged = guard.clone();
        match f(&mut StoreTx { contents: &mut staged }) {
            Ok(value) => {
                *guard = staged;
                Ok(value)
            }
            Err(error) => Err(error),
        }
    }

    // -- Queries ----------------------------------------------------------

    /// The authenticated user, once an initial state has arrived.
    pub fn current_user(&self) -> Option<User> {
        self.lock().current_user.clone()
    }

    /// Looks up a room by identifier.
    pub fn room(&self, identifier: &str) -> Option<Room> {
        self.lock().rooms.get(identifier).cloned()
    }

    /// All cached rooms, in unspecified order.
    pub fn rooms(&self) -> Vec<Room> {
        self.lock().rooms.values().cloned().collect()
    }

    /// Looks up a user by identifier.
    pub fn user(&self, identifier: &str) -> Option<User> {
        self.lock().users.get(identifier).cloned()
    }

    /// Looks up the read state for a room.
    pub fn read_state(&self, room_identifier: &str) -> Option<ReadState> {
        self.lock().read_states.get(room_identifier).cloned()
    }

    /// Looks up the membership set for a room.
    pub fn membership(&self, room_identifier: &str) -> Option<Membership> {
        self.lock().memberships.get(room_identifier).cloned()
    }

    /// A full snapshot of the contents.
    pub fn snapshot(&self) -> StoreContents {
        self.lock().clone()
    }
}

// ---------------------------------------------------------------------------
// StoreTx
// ---------------------------------------------------------------------------

/// A transactional scope over the staged store contents.
///
/// Only ever handed out by [`LocalStore::transaction`]; every mutation
/// below lands in the staged copy.
pub struct StoreTx<'a> {
    contents: &'a mut StoreContents,
}

impl StoreTx<'_> {
    /// Records the authenticated user and upserts them into the user
    /// collection.
    pub fn set_current_user(&mut self, user: User) {
        self.upsert_user(user.clone());
        self.contents.current_user = Some(user);
    }

    /// Creates or updates a room, keyed by its identifier.
    pub fn upsert_room(&mut self, room: Room) {
        tracing::debug!(room = %room.identifier, "upserting room");
        match self.contents.rooms.get_mut(&room.identifier) {
            Some(existing) => update_room(existing, room),
            None => {
                self.contents.rooms.insert(room.identifier.clone(), room);
            }
        }
    }

    /// Creates or updates a user, keyed by their identifier.
    pub fn upsert_user(&mut self, user: User) {
        tracing::debug!(user = %user.identifier, "upserting user");
        match self.contents.users.get_mut(&user.identifier) {
            Some(existing) => update_user(existing, user),
            None => {
                self.contents.users.insert(user.identifier.clone(), user);
            }
        }
    }

    /// Creates or updates the read state for a room.
    pub fn upsert_read_state(&mut self, read_state: ReadState) {
        tracing::debug!(
            room = %read_state.room_identifier,
            unread = read_state.unread_count,
            "upserting read state"
        );
        match self
            .contents
            .read_states
            .get_mut(&read_state.room_identifier)
        {
            Some(existing) => update_read_state(existing, read_state),
            None => {
                self.contents
                    .read_states
                    .insert(read_state.room_identifier.clone(), read_state);
            }
        }
    }

    /// Creates or replaces the membership set for a room.
    pub fn upsert_membership(&mut self, membership: Membership) {
        tracing::debug!(
            room = %membership.room_identifier,
            members = membership.user_identifiers.len(),
            "upserting membership"
        );
        self.contents
            .memberships
            .insert(membership.room_identifier.clone(), membership);
    }

    /// Removes a room and its dependent read state and membership.
    ///
    /// No-op for an unknown identifier.
    pub fn remove_room(&mut self, room_identifier: &str) {
        tracing::debug!(room = %room_identifier, "removing room");
        self.contents.rooms.remove(room_identifier);
        self.contents.read_states.remove(room_identifier);
        self.contents.memberships.remove(room_identifier);
    }

    /// Adds a user to a room's membership set, creating the set on first
    /// mention of the room.
    pub fn add_room_member(
        &mut self,
        room_identifier: &str,
        user_identifier: &str,
    ) {
        let membership = self
            .contents
            .memberships
            .entry(room_identifier.to_owned())
            .or_insert_with(|| Membership {
                room_identifier: room_identifier.to_owned(),
                user_identifiers: Default::default(),
            });
        membership.user_identifiers.insert(user_identifier.to_owned());
    }

    /// Removes a user from a room's membership set. No-op if either the
    /// room or the user is unknown.
    pub fn remove_room_member(
        &mut self,
        room_identifier: &str,
        user_identifier: &str,
    ) {
        if let Some(membership) =
            self.contents.memberships.get_mut(room_identifier)
        {
            membership.user_identifiers.remove(user_identifier);
        }
    }

    /// Looks up a room in the staged contents.
    pub fn room(&self, identifier: &str) -> Option<&Room> {
        self.contents.rooms.get(identifier)
    }
}

// ---------------------------------------------------------------------------
// Field-wise updates
// ---------------------------------------------------------------------------
// The schema never sends partial objects, so these assign every field.
// They exist (rather than a map insert) to keep the updated entity the
// same object, per the upsert contract.

fn update_room(existing: &mut Room, incoming: Room) {
    existing.name = incoming.name;
    existing.creator_id = incoming.creator_id;
    existing.is_private = incoming.is_private;
    existing.push_notification_title_override =
        incoming.push_notification_title_override;
    existing.custom_data = incoming.custom_data;
    existing.last_message_at = incoming.last_message_at;
    existing.created_at = incoming.created_at;
    existing.updated_at = incoming.updated_at;
    existing.deleted_at = incoming.deleted_at;
}

fn update_user(existing: &mut User, incoming: User) {
    existing.name = incoming.name;
    existing.avatar_url = incoming.avatar_url;
    existing.custom_data = incoming.custom_data;
    existing.created_at = incoming.created_at;
    existing.updated_at = incoming.updated_at;
    existing.deleted_at = incoming.deleted_at;
}

fn update_read_state(existing: &mut ReadState, incoming: ReadState) {
    existing.unread_count = incoming.unread_count;
    existing.cursor = incoming.cursor;
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::macros::datetime;

    use super::*;

    fn room(id: &str, name: &str) -> Room {
        Room {
            identifier: id.to_owned(),
            name: name.to_owned(),
            creator_id: "creator".to_owned(),
            is_private: false,
            push_notification_title_override: None,
            custom_data: None,
            last_message_at: None,
            created_at: datetime!(2017-03-23 11:36:42 UTC),
            updated_at: datetime!(2017-03-23 11:36:42 UTC),
            deleted_at: None,
        }
    }

    fn user(id: &str, name: &str) -> User {
        User {
            identifier: id.to_owned(),
            name: name.to_owned(),
            avatar_url: None,
            custom_data: None,
            created_at: datetime!(2017-03-23 11:36:42 UTC),
            updated_at: datetime!(2017-03-23 11:36:42 UTC),
            deleted_at: None,
        }
    }

    fn membership(room_id: &str, users: &[&str]) -> Membership {
        Membership {
            room_identifier: room_id.to_owned(),
            user_identifiers: users
                .iter()
                .map(|u| (*u).to_owned())
                .collect::<BTreeSet<_>>(),
        }
    }

    // Infallible transactions in tests still need an error type.
    type NoError = std::convert::Infallible;

    fn apply(store: &LocalStore, f: impl FnOnce(&mut StoreTx<'_>)) {
        store
            .transaction(|tx| {
                f(tx);
                Ok::<(), NoError>(())
            })
            .unwrap();
    }

    // =====================================================================
    // transaction()
    // =====================================================================

    #[test]
    fn test_transaction_commits_on_ok() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.upsert_room(room("r1", "general")));
        assert_eq!(store.room("r1").unwrap().name, "general");
    }

    #[test]
    fn test_transaction_discards_on_err() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.upsert_room(room("r1", "general")));

        let result: Result<(), &str> = store.transaction(|tx| {
            tx.upsert_room(room("r2", "doomed"));
            tx.remove_room("r1");
            Err("abort")
        });

        assert_eq!(result, Err("abort"));
        // Neither mutation is visible.
        assert!(store.room("r2").is_none());
        assert!(store.room("r1").is_some());
    }

    #[test]
    fn test_transaction_returns_closure_value() {
        let store = LocalStore::new();
        let count = store
            .transaction(|tx| {
                tx.upsert_room(room("r1", "a"));
                Ok::<usize, NoError>(1)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    // =====================================================================
    // Upserts
    // =====================================================================

    #[test]
    fn test_upsert_room_creates_when_absent() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.upsert_room(room("r1", "general")));
        assert_eq!(store.rooms().len(), 1);
    }

    #[test]
    fn test_upsert_room_updates_in_place_when_present() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.upsert_room(room("r1", "general")));
        apply(&store, |tx| tx.upsert_room(room("r1", "renamed")));

        assert_eq!(store.rooms().len(), 1);
        assert_eq!(store.room("r1").unwrap().name, "renamed");
    }

    #[test]
    fn test_upsert_room_is_idempotent() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.upsert_room(room("r1", "general")));
        let first = store.snapshot();
        apply(&store, |tx| tx.upsert_room(room("r1", "general")));
        assert_eq!(store.snapshot(), first);
    }

    #[test]
    fn test_set_current_user_also_upserts_into_users() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.set_current_user(user("alice", "Alice")));
        assert_eq!(store.current_user().unwrap().identifier, "alice");
        assert_eq!(store.user("alice").unwrap().name, "Alice");
    }

    #[test]
    fn test_upsert_read_state_overwrites_unread_count() {
        use syncline_wire::{Cursor, CursorType};
        let cursor = Cursor {
            room_identifier: "r1".to_owned(),
            user_identifier: "alice".to_owned(),
            cursor_type: CursorType::Read,
            position: 10,
            updated_at: datetime!(2017-03-23 11:36:42 UTC),
        };
        let store = LocalStore::new();
        apply(&store, |tx| {
            tx.upsert_read_state(ReadState {
                room_identifier: "r1".to_owned(),
                unread_count: 5,
                cursor: cursor.clone(),
            });
        });
        apply(&store, |tx| {
            tx.upsert_read_state(ReadState {
                room_identifier: "r1".to_owned(),
                unread_count: 0,
                cursor,
            });
        });
        assert_eq!(store.read_state("r1").unwrap().unread_count, 0);
    }

    // =====================================================================
    // Removal
    // =====================================================================

    #[test]
    fn test_remove_room_drops_dependents() {
        let store = LocalStore::new();
        apply(&store, |tx| {
            tx.upsert_room(room("r1", "general"));
            tx.upsert_membership(membership("r1", &["alice"]));
        });

        apply(&store, |tx| tx.remove_room("r1"));

        assert!(store.room("r1").is_none());
        assert!(store.membership("r1").is_none());
        assert!(store.read_state("r1").is_none());
    }

    #[test]
    fn test_remove_room_unknown_is_noop() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.remove_room("ghost"));
        assert!(store.rooms().is_empty());
    }

    // =====================================================================
    // Membership edits
    // =====================================================================

    #[test]
    fn test_add_room_member_creates_membership_on_first_mention() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.add_room_member("r1", "alice"));
        let membership = store.membership("r1").unwrap();
        assert!(membership.user_identifiers.contains("alice"));
    }

    #[test]
    fn test_add_room_member_twice_is_idempotent() {
        let store = LocalStore::new();
        apply(&store, |tx| {
            tx.add_room_member("r1", "alice");
            tx.add_room_member("r1", "alice");
        });
        assert_eq!(
            store.membership("r1").unwrap().user_identifiers.len(),
            1
        );
    }

    #[test]
    fn test_remove_room_member_removes_only_that_user() {
        let store = LocalStore::new();
        apply(&store, |tx| {
            tx.upsert_membership(membership("r1", &["alice", "bob"]));
            tx.remove_room_member("r1", "alice");
        });
        let remaining = store.membership("r1").unwrap();
        assert!(!remaining.user_identifiers.contains("alice"));
        assert!(remaining.user_identifiers.contains("bob"));
    }

    #[test]
    fn test_remove_room_member_unknown_room_is_noop() {
        let store = LocalStore::new();
        apply(&store, |tx| tx.remove_room_member("ghost", "alice"));
        assert!(store.membership("ghost").is_none());
    }

    // =====================================================================
    // Snapshot equality
    // =====================================================================

    #[test]
    fn test_snapshot_equality_detects_difference() {
        let a = LocalStore::new();
        let b = LocalStore::new();
        apply(&a, |tx| tx.upsert_room(room("r1", "general")));
        assert_ne!(a.snapshot(), b.snapshot());
        apply(&b, |tx| tx.upsert_room(room("r1", "general")));
        assert_eq!(a.snapshot(), b.snapshot());
    }
}
