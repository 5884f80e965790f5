//! Connection bookkeeping for the room server
//!
//! This module tracks which (room, player) identity each live transport
//! connection currently speaks for. It is used to:
//! - Attribute inbound events to a player without trusting the payload
//! - Detect room switches when a bound connection joins again
//! - Tear down a player in O(1) when its connection drops
//!
//! The index never owns player data. Rooms own players; a binding is only a
//! back-reference that may outlive neither side.

use log::debug;
use shared::{PlayerId, RoomId};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier the network layer assigns to every accepted connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The identity a connection currently represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

impl Binding {
    pub fn new(room_id: impl Into<RoomId>, player_id: impl Into<PlayerId>) -> Self {
        Self {
            room_id: room_id.into(),
            player_id: player_id.into(),
        }
    }

    /// True if this binding points at the given room and player
    pub fn targets(&self, room_id: &str, player_id: &str) -> bool {
        self.room_id == room_id && self.player_id == player_id
    }
}

/// Maps live connections to the player identity they speak for
#[derive(Debug, Default)]
pub struct ConnectionIndex {
    bindings: HashMap<ConnectionId, Binding>,
}

impl ConnectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a connection to a (room, player) pair
    ///
    /// Returns the binding that was replaced, if the connection was already
    /// bound. Callers use this to clean up the previous room on a switch.
    pub fn bind(&mut self, conn: ConnectionId, binding: Binding) -> Option<Binding> {
        debug!(
            "Binding {} to player {} in room {}",
            conn, binding.player_id, binding.room_id
        );
        self.bindings.insert(conn, binding)
    }

    /// Looks up the identity behind a connection
    pub fn lookup(&self, conn: ConnectionId) -> Option<&Binding> {
        self.bindings.get(&conn)
    }

    /// Drops a connection's binding and returns it
    ///
    /// Unbinding an unknown connection is a no-op so that duplicate
    /// disconnect notifications stay harmless.
    pub fn unbind(&mut self, conn: ConnectionId) -> Option<Binding> {
        self.bindings.remove(&conn)
    }

    /// Returns the number of bound connections
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no connection is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
