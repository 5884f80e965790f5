use clap::Parser;
use log::{error, info};
use server::network::{Server, ServerConfig};
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3001")]
    port: u16,
    /// Maximum number of simultaneous connections
    #[clap(short, long, default_value = "1024")]
    max_connections: usize,
    /// Seconds between status log lines (0 disables)
    #[clap(long, default_value = "60")]
    status_interval: u64,
}

/// Main-method of the application.
/// Parses command-line arguments, then runs the server loop until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let args = Args::parse();

    let config = ServerConfig {
        max_connections: args.max_connections,
        status_interval: (args.status_interval > 0)
            .then(|| Duration::from_secs(args.status_interval)),
    };

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, config).await?;
    let handle = server.handle();

    let server_task = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Server stopped with error: {}", e);
        }
    });

    tokio::select! {
        result = server_task => {
            if let Err(e) = result {
                error!("Server task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
        }
    }

    Ok(())
}
