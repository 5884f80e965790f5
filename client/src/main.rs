use clap::Parser;
use client::commands::HELP;
use client::identity::{default_name, random_player_id};
use client::network::{Client, ClientConfig};
use log::info;
use shared::JoinPlayer;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:3001")]
    server: String,

    /// Room to join
    #[arg(short = 'r', long)]
    room: String,

    /// Display name (defaults to Player-<id prefix>)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Reuse a player id, e.g. to take over a seat from another terminal
    #[arg(long)]
    id: Option<String>,

    /// Join as a spectator
    #[arg(long)]
    spectator: bool,

    /// Reconnect attempts before giving up
    #[arg(long, default_value = "5")]
    reconnect_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let id = args
        .id
        .unwrap_or_else(|| random_player_id(&mut rand::thread_rng()));
    let name = args.name.unwrap_or_else(|| default_name(&id));

    info!("Starting client...");
    info!("Joining room {} as {} ({})", args.room, name, id);
    println!("{}", HELP);

    let mut client = Client::new(ClientConfig {
        server_url: args.server,
        room_id: args.room,
        player: JoinPlayer {
            id,
            name,
            is_spectator: args.spectator,
        },
        reconnect_attempts: args.reconnect_attempts,
        reconnect_delay: Duration::from_secs(1),
    });

    client.run().await?;

    Ok(())
}
