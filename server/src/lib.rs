//! # Estimation Room Server Library
//!
//! This library provides the authoritative room-state broker for a real-time
//! group-estimation tool. Clients join a named room, each submits a private
//! vote, and the room reveals and resets votes in lockstep. The server owns all
//! room and player state and decides what every client is allowed to see.
//!
//! ## Core Responsibilities
//!
//! ### Vote Secrecy
//! Until a room is revealed, a client only ever receives its own literal vote.
//! Other players' votes arrive as a `hidden` marker, which is still
//! distinguishable from "has not voted".
//!
//! ### Connection Churn
//! A player keeps a stable, client-generated id across reconnects. When the
//! same id joins again from a new connection, the old connection is
//! superseded and the vote carries over. A late disconnect from the old
//! connection is recognised by comparing connection identity and ignored.
//!
//! ### Room Lifecycle
//! Rooms are created by the first join and deleted the moment their last
//! player leaves. When the host leaves, the first remaining player in id order
//! takes over.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! Connection tasks only read and write frames. Every decoded event is sent to
//! one main loop that exclusively owns the session state and processes events
//! strictly one at a time, so no handler is ever interleaved with another and
//! no locks are needed.
//!
//! ### Pure Session Core
//! [`session::SessionHandler`] maps `(state, event)` to a list of addressed
//! outbound messages. The network layer merely routes them, which keeps the
//! core testable without sockets.
//!
//! ## Module Organization
//!
//! - `connection_index`: connection to (room, player) bindings
//! - `room`: room and player state, the room registry
//! - `visibility`: per-viewer vote masking
//! - `session`: the event handlers and their invariants
//! - `network`: WebSocket transport and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::bind("127.0.0.1:3001", ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod connection_index;
pub mod network;
pub mod room;
pub mod session;
pub mod utils;
pub mod visibility;
