//! Vote redaction applied to everything that leaves the server
//!
//! Before a reveal a viewer sees its own vote and only the *fact* that others
//! voted. `NoVote` always passes through so "not voted" and "voted but
//! secret" stay distinguishable.

use crate::room::Room;
use shared::{PlayerId, PlayerInfo, ServerEvent, VoteValue};
use std::collections::BTreeMap;

/// Masks one vote owned by `owner` for delivery to `viewer`
pub fn mask_vote(vote: VoteValue, owner: &str, viewer: &str, revealed: bool) -> VoteValue {
    if revealed || owner == viewer {
        return vote;
    }
    match vote {
        VoteValue::NoVote => VoteValue::NoVote,
        VoteValue::Hidden | VoteValue::Value(_) => VoteValue::Hidden,
    }
}

/// The room's player map as `viewer` is allowed to see it
pub fn masked_players(room: &Room, viewer: &str) -> BTreeMap<PlayerId, PlayerInfo> {
    room.players()
        .map(|player| {
            let vote = mask_vote(player.vote, &player.id, viewer, room.is_revealed());
            (player.id.clone(), player.info_with_vote(vote))
        })
        .collect()
}

/// Full `room-state` snapshot for one viewer
pub fn room_snapshot(room: &Room, viewer: &str) -> ServerEvent {
    ServerEvent::RoomState {
        players: masked_players(room, viewer),
        revealed: room.is_revealed(),
        host: room.host_id().to_string(),
    }
}
