//! Server network layer handling WebSocket connections and the session event loop

use crate::connection_index::ConnectionId;
use crate::session::{Outbound, SessionHandler};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_client_event, encode, ClientEvent};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

/// Messages sent from connection tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connected {
        conn: ConnectionId,
        addr: SocketAddr,
        sender: mpsc::UnboundedSender<Message>,
    },
    EventReceived {
        conn: ConnectionId,
        event: ClientEvent,
    },
    Disconnected {
        conn: ConnectionId,
    },
    Shutdown,
}

/// Runtime settings for the server loop
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Connections above this count are closed right after the handshake
    pub max_connections: usize,
    /// How often to log a status line; None disables it
    pub status_interval: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            status_interval: Some(Duration::from_secs(60)),
        }
    }
}

/// Cloneable handle for stopping a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server loop already stopped");
        }
    }
}

/// Main server coordinating connections and the session handler
///
/// The loop is the only owner of [`SessionHandler`], so every event is
/// applied to room state strictly one at a time without locks.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: ServerConfig,
    session: SessionHandler,
    routes: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn bind(addr: &str, config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            config,
            session: SessionHandler::new(),
            routes: HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    pub fn session(&self) -> &SessionHandler {
        &self.session
    }

    /// Spawns task that accepts TCP connections and hands each to its own task
    fn spawn_acceptor(&mut self) -> Result<(), ServerError> {
        let listener = self.listener.take().ok_or("server is already running")?;
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_id: u64 = 1;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let conn = ConnectionId(next_id);
                        next_id += 1;
                        tokio::spawn(handle_connection(stream, addr, conn, server_tx.clone()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }

                if server_tx.is_closed() {
                    break;
                }
            }
        });

        Ok(())
    }

    /// Encodes and queues outbound events on their connections' writer tasks
    fn deliver(&self, outbound: Vec<Outbound>) {
        for Outbound { to, event } in outbound {
            let Some(sender) = self.routes.get(&to) else {
                debug!("No route to {}, dropping {:?}", to, event);
                continue;
            };

            match encode(&event) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).is_err() {
                        debug!("Writer for {} is gone", to);
                    }
                }
                Err(e) => error!("Failed to encode event for {}: {}", to, e),
            }
        }
    }

    /// Applies one message to the server state. Returns false on shutdown.
    fn process(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::Connected { conn, addr, sender } => {
                if self.routes.len() >= self.config.max_connections {
                    warn!("Rejecting {} from {}: server full", conn, addr);
                    let frame = CloseFrame {
                        code: CloseCode::Again,
                        reason: "Server full".into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame)));
                    return true;
                }
                info!("Client {} connected from {}", conn, addr);
                self.routes.insert(conn, sender);
            }
            ServerMessage::EventReceived { conn, event } => {
                if !self.routes.contains_key(&conn) {
                    debug!("Dropping event from rejected {}", conn);
                    return true;
                }
                let outbound = self.session.handle(conn, event);
                self.deliver(outbound);
            }
            ServerMessage::Disconnected { conn } => {
                if self.routes.remove(&conn).is_some() {
                    info!("Client {} disconnected", conn);
                }
                let outbound = self.session.disconnect(conn);
                self.deliver(outbound);
            }
            ServerMessage::Shutdown => {
                info!("Server shutting down");
                return false;
            }
        }
        true
    }

    fn log_status(&self) {
        let rooms = self.session.rooms();
        debug!(
            "{} rooms, {} players, {} connections",
            rooms.len(),
            rooms.player_count(),
            self.routes.len()
        );
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), ServerError> {
        self.spawn_acceptor()?;

        let status_enabled = self.config.status_interval.is_some();
        let mut status_interval = interval(
            self.config
                .status_interval
                .unwrap_or(Duration::from_secs(60)),
        );

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    let keep_running = match message {
                        Some(message) => self.process(message),
                        None => false,
                    };
                    if !keep_running {
                        break;
                    }
                },

                _ = status_interval.tick(), if status_enabled => {
                    self.log_status();
                },
            }
        }

        Ok(())
    }
}

/// Drives one WebSocket connection until the peer goes away
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    conn: ConnectionId,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", addr, e);
            return;
        }
    };
    let (mut write, mut read) = ws.split();
    let (sender, mut outgoing) = mpsc::unbounded_channel::<Message>();

    if server_tx
        .send(ServerMessage::Connected { conn, addr, sender })
        .is_err()
    {
        return;
    }

    // Writer ends when the main loop drops this connection's route
    tokio::spawn(async move {
        while let Some(message) = outgoing.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(e) = write.send(message).await {
                debug!("Failed to send to {}: {}", conn, e);
                break;
            }
            if closing {
                break;
            }
        }
    });

    while let Some(frame) = read.next().await {
        match frame {
            Ok(Message::Text(text)) => match decode_client_event(&text) {
                Ok(event) => {
                    if server_tx
                        .send(ServerMessage::EventReceived { conn, event })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => warn!("Malformed frame from {}: {}", conn, e),
            },
            Ok(Message::Binary(_)) => warn!("Ignoring binary frame from {}", conn),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Read error on {}: {}", conn, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::Disconnected { conn });
}
