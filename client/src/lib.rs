//! # Estimation Room Client Library
//!
//! A terminal client for the estimation room server. It joins one room,
//! mirrors the room from the events the server pushes, and turns typed
//! commands into client events.
//!
//! ## Architecture Overview
//!
//! ### Server Authority
//! The client never predicts. Everything it shows comes from the latest
//! `room-state` snapshot patched by incremental events, so the local view is
//! exactly what the server decided this client may see.
//!
//! ### Stable Identity
//! The player id is generated once per run. After a dropped connection the
//! client reconnects and rejoins with the same id, and the server restores
//! its seat and vote.
//!
//! ## Module Organization
//!
//! - `commands`: parsing of prompt commands into client events
//! - `identity`: player id generation and default names
//! - `room_view`: the local mirror of the room and its rendering
//! - `network`: the WebSocket session, reconnect loop and prompt handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientConfig};
//! use shared::JoinPlayer;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new(ClientConfig {
//!         server_url: "ws://127.0.0.1:3001".to_string(),
//!         room_id: "abc123".to_string(),
//!         player: JoinPlayer {
//!             id: "k3x9ab".to_string(),
//!             name: "Alice".to_string(),
//!             is_spectator: false,
//!         },
//!         reconnect_attempts: 5,
//!         reconnect_delay: Duration::from_secs(1),
//!     });
//!     client.run().await
//! }
//! ```

pub mod commands;
pub mod identity;
pub mod network;
pub mod room_view;
