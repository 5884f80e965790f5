//! Client-side mirror of a room, rebuilt from server events
//!
//! The server is authoritative: a `room-state` snapshot replaces everything,
//! and each incremental event patches the mirror the same way every client
//! does, so all members converge on the same picture.

use shared::{PlayerId, PlayerInfo, ServerEvent, VoteStats, VoteValue};
use std::collections::BTreeMap;
use std::fmt::Write;

const REVEAL_MESSAGES: [&str; 6] = [
    "Moment of truth!",
    "Let's see the damage.",
    "Cards on the table.",
    "No take-backs now.",
    "The numbers are in.",
    "Time to argue about it.",
];

/// Flavour line for a reveal. Every member gets the same server timestamp, so
/// every terminal shows the same line.
pub fn reveal_message(timestamp: u64) -> &'static str {
    REVEAL_MESSAGES[(timestamp % REVEAL_MESSAGES.len() as u64) as usize]
}

#[derive(Debug, Clone, Default)]
pub struct RoomView {
    self_id: PlayerId,
    players: BTreeMap<PlayerId, PlayerInfo>,
    revealed: bool,
    host: PlayerId,
    /// Timestamp of the latest reveal, shared by every member
    reveal_timestamp: Option<u64>,
}

impl RoomView {
    pub fn new(self_id: impl Into<PlayerId>) -> Self {
        Self {
            self_id: self_id.into(),
            ..Self::default()
        }
    }

    /// Applies one server event to the mirror
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::RoomState {
                players,
                revealed,
                host,
            } => {
                self.players = players;
                self.revealed = revealed;
                self.host = host;
            }
            ServerEvent::PlayerJoined { player } => {
                self.players.insert(player.id.clone(), player);
            }
            ServerEvent::PlayerLeft { player_id } => {
                self.players.remove(&player_id);
            }
            ServerEvent::VoteUpdated { player_id, vote } => {
                if let Some(player) = self.players.get_mut(&player_id) {
                    player.vote = vote;
                }
            }
            ServerEvent::CardsRevealed { timestamp } => {
                self.revealed = true;
                self.reveal_timestamp = Some(timestamp);
            }
            ServerEvent::GameReset => {
                self.revealed = false;
                self.reveal_timestamp = None;
                for player in self.players.values_mut() {
                    player.vote = VoteValue::NoVote;
                }
            }
            ServerEvent::PlayerUpdated { player_id, name } => {
                if let Some(player) = self.players.get_mut(&player_id) {
                    player.name = name;
                }
            }
            ServerEvent::HostChanged { host_id } => {
                self.host = host_id;
            }
            ServerEvent::SpectatorToggled {
                player_id,
                is_spectator,
            } => {
                if let Some(player) = self.players.get_mut(&player_id) {
                    player.is_spectator = is_spectator;
                    if is_spectator {
                        player.vote = VoteValue::NoVote;
                    }
                }
            }
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerInfo> {
        self.players.values()
    }

    pub fn player(&self, player_id: &str) -> Option<&PlayerInfo> {
        self.players.get(player_id)
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_host(&self) -> bool {
        self.host == self.self_id
    }

    pub fn reveal_timestamp(&self) -> Option<u64> {
        self.reveal_timestamp
    }

    /// The local player's own literal vote, if any
    pub fn my_vote(&self) -> Option<i32> {
        self.players.get(&self.self_id).and_then(|p| p.vote.value())
    }

    /// Statistics over the visible votes; only meaningful once revealed
    pub fn stats(&self) -> Option<VoteStats> {
        if !self.revealed {
            return None;
        }
        VoteStats::from_votes(
            self.players
                .values()
                .filter(|p| !p.is_spectator)
                .map(|p| p.vote),
        )
    }

    /// Human-readable table of the room
    pub fn render(&self) -> String {
        let mut out = String::new();
        let state = if self.revealed { "revealed" } else { "voting" };
        let _ = writeln!(out, "{} players, {}", self.players.len(), state);
        if let Some(timestamp) = self.reveal_timestamp.filter(|_| self.revealed) {
            let _ = writeln!(out, "{}", reveal_message(timestamp));
        }

        for player in self.players.values() {
            let mut tags = Vec::new();
            if player.id == self.host {
                tags.push("host");
            }
            if player.id == self.self_id {
                tags.push("you");
            }
            if player.is_spectator {
                tags.push("spectator");
            }
            let tags = if tags.is_empty() {
                String::new()
            } else {
                format!(" ({})", tags.join(", "))
            };
            let _ = writeln!(out, "  {:>3}  {}{}", player.vote, player.name, tags);
        }

        if let Some(stats) = self.stats() {
            let _ = writeln!(
                out,
                "average {:.1}, lowest {}, highest {}{}",
                stats.average,
                stats.lowest,
                stats.highest,
                if stats.consensus { ", consensus!" } else { "" }
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn info(id: &str, vote: VoteValue) -> PlayerInfo {
        PlayerInfo {
            id: id.to_string(),
            name: id.to_uppercase(),
            vote,
            is_spectator: false,
        }
    }

    fn view_with(players: &[PlayerInfo]) -> RoomView {
        let mut view = RoomView::new("p1");
        view.apply(ServerEvent::RoomState {
            players: players
                .iter()
                .map(|p| (p.id.clone(), p.clone()))
                .collect(),
            revealed: false,
            host: "p1".to_string(),
        });
        view
    }

    #[test]
    fn test_room_state_replaces_everything() {
        let mut view = view_with(&[info("p1", VoteValue::Value(5)), info("p2", VoteValue::Hidden)]);
        assert!(view.is_host());
        assert_eq!(view.my_vote(), Some(5));

        view.apply(ServerEvent::RoomState {
            players: BTreeMap::new(),
            revealed: true,
            host: "p9".to_string(),
        });
        assert_eq!(view.players().count(), 0);
        assert!(view.is_revealed());
        assert!(!view.is_host());
    }

    #[test]
    fn test_membership_events() {
        let mut view = view_with(&[info("p1", VoteValue::NoVote)]);
        view.apply(ServerEvent::PlayerJoined {
            player: info("p2", VoteValue::NoVote),
        });
        assert!(view.player("p2").is_some());

        view.apply(ServerEvent::PlayerUpdated {
            player_id: "p2".to_string(),
            name: "Bobby".to_string(),
        });
        assert_eq!(view.player("p2").unwrap().name, "Bobby");

        view.apply(ServerEvent::PlayerLeft {
            player_id: "p1".to_string(),
        });
        view.apply(ServerEvent::HostChanged {
            host_id: "p2".to_string(),
        });
        assert!(view.player("p1").is_none());
        assert_eq!(view.host(), "p2");
    }

    #[test]
    fn test_vote_updates_for_unknown_players_are_ignored() {
        let mut view = view_with(&[info("p1", VoteValue::NoVote)]);
        view.apply(ServerEvent::VoteUpdated {
            player_id: "ghost".to_string(),
            vote: VoteValue::Value(3),
        });
        assert_eq!(view.players().count(), 1);
    }

    #[test]
    fn test_reveal_then_reset() {
        let mut view = view_with(&[info("p1", VoteValue::Value(3)), info("p2", VoteValue::Hidden)]);
        assert!(view.stats().is_none());

        view.apply(ServerEvent::CardsRevealed { timestamp: 99 });
        view.apply(ServerEvent::VoteUpdated {
            player_id: "p2".to_string(),
            vote: VoteValue::Value(8),
        });
        assert_eq!(view.reveal_timestamp(), Some(99));
        assert!(view.render().contains(reveal_message(99)));

        let stats = view.stats().unwrap();
        assert_approx_eq!(stats.average, 5.5, 1e-9);
        assert_eq!(stats.lowest, 3);
        assert_eq!(stats.highest, 8);
        assert!(view.render().contains("average 5.5"));

        view.apply(ServerEvent::GameReset);
        assert!(!view.is_revealed());
        assert_eq!(view.reveal_timestamp(), None);
        assert!(view.players().all(|p| p.vote == VoteValue::NoVote));
    }

    #[test]
    fn test_reveal_message_follows_timestamp() {
        assert_eq!(reveal_message(1_700_000_000_000), reveal_message(1_700_000_000_000));
        assert_eq!(reveal_message(0), "Moment of truth!");
        assert_eq!(reveal_message(7), "Let's see the damage.");
        assert_ne!(reveal_message(0), reveal_message(1));
    }

    #[test]
    fn test_becoming_spectator_clears_vote() {
        let mut view = view_with(&[info("p1", VoteValue::Value(2))]);
        view.apply(ServerEvent::SpectatorToggled {
            player_id: "p1".to_string(),
            is_spectator: true,
        });

        let me = view.player("p1").unwrap();
        assert!(me.is_spectator);
        assert_eq!(me.vote, VoteValue::NoVote);
        assert!(view.render().contains("spectator"));
    }

    #[test]
    fn test_render_marks_host_and_self() {
        let view = view_with(&[info("p1", VoteValue::Value(5)), info("p2", VoteValue::Hidden)]);
        let text = view.render();

        assert!(text.starts_with("2 players, voting"));
        assert!(text.contains("P1 (host, you)"));
        assert!(text.contains("  ?  P2"));
    }
}
