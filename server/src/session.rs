//! Event-driven session controller
//!
//! Every inbound client event and every transport disconnect passes through
//! [`SessionHandler`]. Each call runs its whole read-modify-broadcast sequence
//! before returning and hands back the messages to deliver, so the network
//! layer stays a dumb router and the logic can be exercised without sockets.
//!
//! Invariants kept after every call:
//! - each room has at least one player and its host is one of them
//! - every player is bound to exactly one connection, and that connection's
//!   binding points back at the player
//! - spectators never hold a vote
//! - before a reveal, no connection receives another player's literal vote

use crate::connection_index::{Binding, ConnectionId, ConnectionIndex};
use crate::room::{Departure, Player, Room, RoomRegistry};
use crate::utils::epoch_millis;
use crate::visibility::{mask_vote, room_snapshot};
use log::{debug, info};
use shared::{ClientEvent, JoinPlayer, ServerEvent, VoteValue};

/// A message addressed to one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: ConnectionId,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn new(to: ConnectionId, event: ServerEvent) -> Self {
        Self { to, event }
    }
}

/// Sends the same event to every member of the room, optionally skipping one connection
fn broadcast(room: &Room, event: &ServerEvent, exclude: Option<ConnectionId>) -> Vec<Outbound> {
    room.connections()
        .into_iter()
        .filter(|conn| Some(*conn) != exclude)
        .map(|conn| Outbound::new(conn, event.clone()))
        .collect()
}

/// Sends `owner`'s vote to every member, masked per recipient
fn broadcast_vote(room: &Room, owner: &str, vote: VoteValue) -> Vec<Outbound> {
    room.players()
        .map(|recipient| {
            Outbound::new(
                recipient.connection_id,
                ServerEvent::VoteUpdated {
                    player_id: owner.to_string(),
                    vote: mask_vote(vote, owner, &recipient.id, room.is_revealed()),
                },
            )
        })
        .collect()
}

/// Owns all room and connection state for the process lifetime
#[derive(Debug, Default)]
pub struct SessionHandler {
    rooms: RoomRegistry,
    connections: ConnectionIndex,
}

impl SessionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn connections(&self) -> &ConnectionIndex {
        &self.connections
    }

    /// Dispatches one inbound event from `conn`
    pub fn handle(&mut self, conn: ConnectionId, event: ClientEvent) -> Vec<Outbound> {
        match event {
            ClientEvent::Join { room_id, player } => self.join(conn, &room_id, player),
            ClientEvent::Vote { vote } => self.vote(conn, vote),
            ClientEvent::Reveal => self.reveal(conn, epoch_millis()),
            ClientEvent::Reset => self.reset(conn),
            ClientEvent::UpdateName { name } => self.update_name(conn, name),
            ClientEvent::ToggleSpectator { is_spectator } => {
                self.toggle_spectator(conn, is_spectator)
            }
        }
    }

    /// Returns the connection's binding only if the connection still owns that player
    ///
    /// A binding whose player has since been taken over by another connection,
    /// or whose room is gone, is treated as absent.
    fn owned_binding(&self, conn: ConnectionId) -> Option<Binding> {
        let binding = self.connections.lookup(conn)?;
        let player = self
            .rooms
            .get(&binding.room_id)?
            .player(&binding.player_id)?;
        (player.connection_id == conn).then(|| binding.clone())
    }

    /// Removes a player from its room and announces the consequences
    fn depart(&mut self, room_id: &str, player_id: &str) -> Vec<Outbound> {
        let departure = self.rooms.remove_player(room_id, player_id);
        let Some(room) = self.rooms.get(room_id) else {
            return Vec::new();
        };

        let mut out = broadcast(
            room,
            &ServerEvent::PlayerLeft {
                player_id: player_id.to_string(),
            },
            None,
        );
        if let Departure::HostChanged(host_id) = departure {
            out.extend(broadcast(room, &ServerEvent::HostChanged { host_id }, None));
        }
        out
    }

    /// Joins (or rejoins) a room
    ///
    /// A connection already bound elsewhere leaves its old room first. A
    /// player id already present under another connection is a reconnection:
    /// the old connection loses its binding, the vote carries over, and peers
    /// only hear about fields that actually changed.
    pub fn join(&mut self, conn: ConnectionId, room_id: &str, player: JoinPlayer) -> Vec<Outbound> {
        let mut out = Vec::new();

        if let Some(previous) = self.connections.lookup(conn).cloned() {
            if !previous.targets(room_id, &player.id) {
                if self.owned_binding(conn).is_some() {
                    info!(
                        "{} switching from room {} to {}",
                        conn, previous.room_id, room_id
                    );
                    out.extend(self.depart(&previous.room_id, &previous.player_id));
                }
                self.connections.unbind(conn);
            }
        }

        let room = self.rooms.get_or_create(room_id, &player.id);
        let existing = room.player(&player.id).cloned();

        if let Some(old) = existing.as_ref().filter(|old| old.connection_id != conn) {
            info!(
                "Player {} reconnecting on {}, dropping {}",
                player.id, conn, old.connection_id
            );
            self.connections.unbind(old.connection_id);
        }

        let carried_vote = existing.as_ref().map_or(VoteValue::NoVote, |old| old.vote);
        let joined = Player::from_join(&player, carried_vote, conn);
        room.insert_player(joined.clone());
        self.connections
            .bind(conn, Binding::new(room_id, player.id.as_str()));

        out.push(Outbound::new(conn, room_snapshot(room, &player.id)));

        match existing {
            None => {
                info!(
                    "Player {} ({}) joined room {}",
                    joined.name, joined.id, room_id
                );
                for member in room.players().filter(|member| member.id != joined.id) {
                    let vote = mask_vote(joined.vote, &joined.id, &member.id, room.is_revealed());
                    out.push(Outbound::new(
                        member.connection_id,
                        ServerEvent::PlayerJoined {
                            player: joined.info_with_vote(vote),
                        },
                    ));
                }
            }
            Some(old) => {
                if old.name != joined.name {
                    out.extend(broadcast(
                        room,
                        &ServerEvent::PlayerUpdated {
                            player_id: joined.id.clone(),
                            name: joined.name.clone(),
                        },
                        Some(conn),
                    ));
                }
                if old.is_spectator != joined.is_spectator {
                    out.extend(broadcast(
                        room,
                        &ServerEvent::SpectatorToggled {
                            player_id: joined.id.clone(),
                            is_spectator: joined.is_spectator,
                        },
                        Some(conn),
                    ));
                }
                if old.vote.has_voted() && !joined.vote.has_voted() {
                    out.extend(broadcast(
                        room,
                        &ServerEvent::VoteUpdated {
                            player_id: joined.id.clone(),
                            vote: VoteValue::NoVote,
                        },
                        Some(conn),
                    ));
                }
            }
        }

        out
    }

    /// Records a vote. Spectators and unbound connections are ignored.
    pub fn vote(&mut self, conn: ConnectionId, vote: Option<i32>) -> Vec<Outbound> {
        let Some(binding) = self.owned_binding(conn) else {
            debug!("Dropping vote from unbound {}", conn);
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            return Vec::new();
        };
        let Some(player) = room.player_mut(&binding.player_id) else {
            return Vec::new();
        };

        if player.is_spectator {
            debug!("Ignoring vote from spectator {}", player.id);
            return Vec::new();
        }
        player.vote = VoteValue::from_option(vote);
        let stored = player.vote;

        broadcast_vote(room, &binding.player_id, stored)
    }

    /// Reveals every vote in the sender's room
    ///
    /// Revealing twice re-sends the same unmasked state.
    pub fn reveal(&mut self, conn: ConnectionId, timestamp: u64) -> Vec<Outbound> {
        let Some(binding) = self.owned_binding(conn) else {
            debug!("Dropping reveal from unbound {}", conn);
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            return Vec::new();
        };

        room.reveal();
        info!("Room {} revealed", room.id());

        let mut out = broadcast(room, &ServerEvent::CardsRevealed { timestamp }, None);
        for player in room.players().filter(|p| p.vote.has_voted()) {
            out.extend(broadcast(
                room,
                &ServerEvent::VoteUpdated {
                    player_id: player.id.clone(),
                    vote: player.vote,
                },
                None,
            ));
        }
        out
    }

    /// Clears all votes in the sender's room and hides future ones
    pub fn reset(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        let Some(binding) = self.owned_binding(conn) else {
            debug!("Dropping reset from unbound {}", conn);
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            return Vec::new();
        };

        room.reset();
        info!("Room {} reset", room.id());
        broadcast(room, &ServerEvent::GameReset, None)
    }

    /// Renames the sender. The sender receives the update too.
    pub fn update_name(&mut self, conn: ConnectionId, name: String) -> Vec<Outbound> {
        let Some(binding) = self.owned_binding(conn) else {
            debug!("Dropping rename from unbound {}", conn);
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            return Vec::new();
        };
        let Some(player) = room.player_mut(&binding.player_id) else {
            return Vec::new();
        };

        player.name = name.clone();
        broadcast(
            room,
            &ServerEvent::PlayerUpdated {
                player_id: binding.player_id,
                name,
            },
            None,
        )
    }

    /// Switches the sender between voter and spectator
    ///
    /// Becoming a spectator clears the vote, announced as a `vote-updated`
    /// with no vote right after the toggle. Switching back restores nothing.
    pub fn toggle_spectator(&mut self, conn: ConnectionId, is_spectator: bool) -> Vec<Outbound> {
        let Some(binding) = self.owned_binding(conn) else {
            debug!("Dropping spectator toggle from unbound {}", conn);
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&binding.room_id) else {
            return Vec::new();
        };
        let Some(player) = room.player_mut(&binding.player_id) else {
            return Vec::new();
        };

        let cleared = player.set_spectator(is_spectator);
        let mut out = broadcast(
            room,
            &ServerEvent::SpectatorToggled {
                player_id: binding.player_id.clone(),
                is_spectator,
            },
            None,
        );
        if cleared {
            out.extend(broadcast(
                room,
                &ServerEvent::VoteUpdated {
                    player_id: binding.player_id,
                    vote: VoteValue::NoVote,
                },
                None,
            ));
        }
        out
    }

    /// Handles a transport-level disconnect
    ///
    /// The player is only removed if this connection still owns it; a late
    /// disconnect from a connection that was taken over changes nothing.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Vec<Outbound> {
        let owned = self.owned_binding(conn);
        let Some(binding) = self.connections.unbind(conn) else {
            return Vec::new();
        };

        match owned {
            Some(_) => self.depart(&binding.room_id, &binding.player_id),
            None => {
                debug!(
                    "Stale disconnect from {} for player {}",
                    conn, binding.player_id
                );
                Vec::new()
            }
        }
    }
}
