//! Wire protocol shared by the room server and its clients.
//!
//! Every frame on the socket is a JSON object `{"event": "<name>", "data": {...}}`.
//! Payload-less events (`reveal`, `reset`, `game-reset`) omit `data`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub type PlayerId = String;
pub type RoomId = String;

/// Estimation cards offered by clients. The server accepts any integer.
pub const DECK: [i32; 7] = [1, 2, 3, 5, 8, 13, 21];

/// Marker string used on the wire for a vote that exists but is withheld.
pub const HIDDEN_VOTE: &str = "hidden";

/// A player's vote as seen by a particular recipient
///
/// `NoVote` travels as `null`, `Hidden` as the string `"hidden"` and a real
/// estimate as a JSON integer, so clients can always tell the three apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VoteValue {
    #[default]
    NoVote,
    Hidden,
    Value(i32),
}

impl VoteValue {
    pub fn from_option(vote: Option<i32>) -> Self {
        match vote {
            Some(n) => VoteValue::Value(n),
            None => VoteValue::NoVote,
        }
    }

    /// True for both `Hidden` and `Value`
    pub fn has_voted(&self) -> bool {
        !matches!(self, VoteValue::NoVote)
    }

    pub fn value(&self) -> Option<i32> {
        match self {
            VoteValue::Value(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteValue::NoVote => f.pad("-"),
            VoteValue::Hidden => f.pad("?"),
            VoteValue::Value(n) => f.pad(&n.to_string()),
        }
    }
}

impl Serialize for VoteValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            VoteValue::NoVote => serializer.serialize_none(),
            VoteValue::Hidden => serializer.serialize_str(HIDDEN_VOTE),
            VoteValue::Value(n) => serializer.serialize_i32(*n),
        }
    }
}

struct VoteValueVisitor;

impl<'de> Visitor<'de> for VoteValueVisitor {
    type Value = VoteValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "null, \"{}\" or an integer vote", HIDDEN_VOTE)
    }

    fn visit_unit<E: de::Error>(self) -> Result<VoteValue, E> {
        Ok(VoteValue::NoVote)
    }

    fn visit_none<E: de::Error>(self) -> Result<VoteValue, E> {
        Ok(VoteValue::NoVote)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<VoteValue, D::Error> {
        deserializer.deserialize_any(VoteValueVisitor)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<VoteValue, E> {
        if value == HIDDEN_VOTE {
            Ok(VoteValue::Hidden)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<VoteValue, E> {
        i32::try_from(value)
            .map(VoteValue::Value)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(value), &self))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<VoteValue, E> {
        i32::try_from(value)
            .map(VoteValue::Value)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }
}

impl<'de> Deserialize<'de> for VoteValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(VoteValueVisitor)
    }
}

/// Player record as it appears in `room-state` and `player-joined`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub vote: VoteValue,
    #[serde(default)]
    pub is_spectator: bool,
}

/// Identity a client presents when joining a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPlayer {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub is_spectator: bool,
}

/// Events sent from a client to the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    Join { room_id: RoomId, player: JoinPlayer },
    Vote {
        #[serde(default)]
        vote: Option<i32>,
    },
    Reveal,
    Reset,
    UpdateName { name: String },
    #[serde(rename_all = "camelCase")]
    ToggleSpectator { is_spectator: bool },
}

/// Events sent from the server to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    RoomState {
        players: BTreeMap<PlayerId, PlayerInfo>,
        revealed: bool,
        host: PlayerId,
    },
    PlayerJoined { player: PlayerInfo },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    VoteUpdated {
        player_id: PlayerId,
        #[serde(default)]
        vote: VoteValue,
    },
    CardsRevealed { timestamp: u64 },
    GameReset,
    #[serde(rename_all = "camelCase")]
    PlayerUpdated { player_id: PlayerId, name: String },
    #[serde(rename_all = "camelCase")]
    HostChanged { host_id: PlayerId },
    #[serde(rename_all = "camelCase")]
    SpectatorToggled {
        player_id: PlayerId,
        is_spectator: bool,
    },
}

pub fn encode<T: Serialize>(event: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(event)
}

pub fn decode_client_event(text: &str) -> Result<ClientEvent, serde_json::Error> {
    serde_json::from_str(text)
}

pub fn decode_server_event(text: &str) -> Result<ServerEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Summary of a revealed round
#[derive(Debug, Clone, PartialEq)]
pub struct VoteStats {
    pub average: f64,
    pub lowest: i32,
    pub highest: i32,
    /// Everyone picked the same card, and there was more than one vote
    pub consensus: bool,
    pub count: usize,
}

impl VoteStats {
    /// Computes statistics over the literal votes; masked and missing votes are skipped.
    /// Returns None when nobody has a literal vote.
    pub fn from_votes<I>(votes: I) -> Option<Self>
    where
        I: IntoIterator<Item = VoteValue>,
    {
        let values: Vec<i32> = votes.into_iter().filter_map(|v| v.value()).collect();
        let lowest = *values.iter().min()?;
        let highest = *values.iter().max()?;
        let sum: i64 = values.iter().map(|&v| v as i64).sum();

        Some(Self {
            average: sum as f64 / values.len() as f64,
            lowest,
            highest,
            consensus: values.len() > 1 && lowest == highest,
            count: values.len(),
        })
    }
}
