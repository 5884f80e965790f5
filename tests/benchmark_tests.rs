//! Performance benchmarks for the session core and wire codec

use assert_approx_eq::assert_approx_eq;
use server::connection_index::ConnectionId;
use server::session::SessionHandler;
use shared::{decode_client_event, encode, ClientEvent, JoinPlayer, VoteStats, VoteValue, DECK};
use std::time::Instant;

fn join_event(room_id: &str, id: usize) -> ClientEvent {
    ClientEvent::Join {
        room_id: room_id.to_string(),
        player: JoinPlayer {
            id: format!("player-{}", id),
            name: format!("Player {}", id),
            is_spectator: false,
        },
    }
}

fn filled_room(players: usize) -> SessionHandler {
    let mut handler = SessionHandler::new();
    for i in 0..players {
        handler.handle(ConnectionId(i as u64), join_event("bench", i));
    }
    handler
}

/// Benchmarks joining a large room, which fans out one event per member
#[test]
fn benchmark_room_joins() {
    let players = 200;
    let start = Instant::now();

    let handler = filled_room(players);

    let duration = start.elapsed();
    println!(
        "Room joins: {} players in {:?} ({:.2} μs/join)",
        players,
        duration,
        duration.as_micros() as f64 / players as f64
    );

    assert_eq!(handler.rooms().player_count(), players);
    // Quadratic fan-out, but should stay well under a second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks vote handling with per-recipient masking
#[test]
fn benchmark_masked_votes() {
    let players = 50;
    let mut handler = filled_room(players);

    let iterations = 10_000;
    let start = Instant::now();
    let mut delivered = 0;

    for i in 0..iterations {
        let conn = ConnectionId((i % players) as u64);
        let vote = DECK[i % DECK.len()];
        delivered += handler.handle(conn, ClientEvent::Vote { vote: Some(vote) }).len();
    }

    let duration = start.elapsed();
    println!(
        "Masked votes: {} votes ({} messages) in {:?} ({:.2} μs/vote)",
        iterations,
        delivered,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert_eq!(delivered, iterations * players);
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks reveal/reset cycles on a room where everyone has voted
#[test]
fn benchmark_reveal_reset_cycles() {
    let players = 50;
    let mut handler = filled_room(players);

    let cycles = 200;
    let start = Instant::now();

    for _ in 0..cycles {
        for i in 0..players {
            handler.handle(ConnectionId(i as u64), ClientEvent::Vote { vote: Some(5) });
        }
        let revealed = handler.handle(ConnectionId(0), ClientEvent::Reveal);
        // One cards-revealed plus one vote per player, to every member
        assert_eq!(revealed.len(), players * (players + 1));
        handler.handle(ConnectionId(0), ClientEvent::Reset);
    }

    let duration = start.elapsed();
    println!(
        "Reveal/reset: {} cycles in {:?} ({:.2} μs/cycle)",
        cycles,
        duration,
        duration.as_micros() as f64 / cycles as f64
    );

    assert!(duration.as_millis() < 5000);
}

/// Benchmarks churn: players leaving and the room being collected
#[test]
fn benchmark_disconnect_churn() {
    let players = 200;
    let mut handler = filled_room(players);

    let start = Instant::now();
    for i in 0..players {
        handler.disconnect(ConnectionId(i as u64));
    }
    let duration = start.elapsed();

    println!("Disconnect churn: {} players in {:?}", players, duration);

    assert!(handler.rooms().is_empty());
    assert!(handler.connections().is_empty());
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks encoding and decoding of client frames
#[test]
fn benchmark_event_codec() {
    let event = join_event("abc123", 7);
    let iterations = 20_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let text = encode(&event).unwrap();
        let decoded = decode_client_event(&text).unwrap();
        assert_eq!(decoded, event);
    }

    let duration = start.elapsed();
    println!(
        "Event codec: {} round trips in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(duration.as_millis() < 2000);
}

/// Benchmarks vote statistics over a large room
#[test]
fn benchmark_vote_stats() {
    let votes: Vec<VoteValue> = (0..1000)
        .map(|i| VoteValue::Value(DECK[i % DECK.len()]))
        .collect();

    let iterations = 1_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let stats = VoteStats::from_votes(votes.iter().copied()).unwrap();
        assert_eq!(stats.count, votes.len());
        assert_eq!((stats.lowest, stats.highest), (1, 21));
    }

    let duration = start.elapsed();
    println!("Vote stats: {} iterations in {:?}", iterations, duration);

    // 142 full decks of 53 plus 1, 2, 3, 5, 8, 13 over the remaining 6 votes
    let expected = (142.0 * 53.0 + 32.0) / 1000.0;
    let stats = VoteStats::from_votes(votes.iter().copied()).unwrap();
    assert_approx_eq!(stats.average, expected, 1e-9);

    assert!(duration.as_millis() < 1000);
}
