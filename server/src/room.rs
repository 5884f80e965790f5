//! Room state and the registry that owns it
//!
//! A room exists exactly as long as it has at least one player. The registry
//! creates rooms lazily on the first join and deletes them synchronously when
//! the last player leaves, so an empty room is never observable.

use crate::connection_index::ConnectionId;
use log::info;
use shared::{JoinPlayer, PlayerId, PlayerInfo, RoomId, VoteValue};
use std::collections::{BTreeMap, HashMap};

/// A participant in a room, bound to the connection that currently speaks for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub vote: VoteValue,
    pub is_spectator: bool,
    pub connection_id: ConnectionId,
}

impl Player {
    /// Creates a player from a join request. Spectators never carry a vote.
    pub fn from_join(join: &JoinPlayer, vote: VoteValue, connection_id: ConnectionId) -> Self {
        Self {
            id: join.id.clone(),
            name: join.name.clone(),
            vote: if join.is_spectator {
                VoteValue::NoVote
            } else {
                vote
            },
            is_spectator: join.is_spectator,
            connection_id,
        }
    }

    /// Wire record of this player carrying the given (possibly masked) vote
    pub fn info_with_vote(&self, vote: VoteValue) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            vote,
            is_spectator: self.is_spectator,
        }
    }

    /// Sets the spectator flag. Becoming a spectator clears the vote.
    ///
    /// Returns true if a vote was cleared by this call.
    pub fn set_spectator(&mut self, is_spectator: bool) -> bool {
        self.is_spectator = is_spectator;
        if is_spectator && self.vote.has_voted() {
            self.vote = VoteValue::NoVote;
            return true;
        }
        false
    }
}

/// An isolated voting session
#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    players: BTreeMap<PlayerId, Player>,
    revealed: bool,
    host_id: PlayerId,
}

impl Room {
    fn new(id: RoomId, host_id: PlayerId) -> Self {
        Self {
            id,
            players: BTreeMap::new(),
            revealed: false,
            host_id,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host_id(&self) -> &str {
        &self.host_id
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn reveal(&mut self) {
        self.revealed = true;
    }

    /// Hides votes again and clears every player's vote. Membership, names,
    /// spectator flags and host are untouched.
    pub fn reset(&mut self) {
        self.revealed = false;
        for player in self.players.values_mut() {
            player.vote = VoteValue::NoVote;
        }
    }

    /// Players in stable key order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    /// Inserts or overwrites a player entry, returning the previous one
    pub fn insert_player(&mut self, player: Player) -> Option<Player> {
        self.players.insert(player.id.clone(), player)
    }

    /// The room's broadcast group: every connection bound to a member
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.players.values().map(|p| p.connection_id).collect()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// What happened to a room when a player was removed from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// Room or player did not exist
    NotPresent,
    /// Player removed, room and host unchanged
    Left,
    /// Player removed and host passed to the contained player
    HostChanged(PlayerId),
    /// Player removed and the now-empty room was deleted
    RoomClosed,
}

/// Owns every live room, indexed by room id
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// Returns the room, creating it with `host_id` as host if it does not exist
    ///
    /// The caller must insert the host player before handing control back to
    /// the event loop; a room is never left empty.
    pub fn get_or_create(&mut self, room_id: &str, host_id: &str) -> &mut Room {
        self.rooms.entry(room_id.to_string()).or_insert_with(|| {
            info!("Room {} created with host {}", room_id, host_id);
            Room::new(room_id.to_string(), host_id.to_string())
        })
    }

    /// Removes a player and keeps the room invariants intact
    ///
    /// Deletes the room when it becomes empty. If the departing player was the
    /// host, the first remaining player in key order becomes host.
    pub fn remove_player(&mut self, room_id: &str, player_id: &str) -> Departure {
        let Some(room) = self.rooms.get_mut(room_id) else {
            return Departure::NotPresent;
        };
        if room.players.remove(player_id).is_none() {
            return Departure::NotPresent;
        }
        info!("Player {} left room {}", player_id, room_id);

        if room.players.is_empty() {
            self.rooms.remove(room_id);
            info!("Room {} is empty, deleting", room_id);
            return Departure::RoomClosed;
        }

        if room.host_id == player_id {
            // Non-empty was checked above
            if let Some(successor) = room.players.keys().next().cloned() {
                info!("Host of room {} passed to {}", room_id, successor);
                room.host_id = successor.clone();
                return Departure::HostChanged(successor);
            }
        }

        Departure::Left
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Returns the number of live rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Total players across all rooms
    pub fn player_count(&self) -> usize {
        self.rooms.values().map(Room::len).sum()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }
}
