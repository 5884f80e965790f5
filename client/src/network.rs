use crate::commands::{Command, ParseError, HELP};
use crate::room_view::{reveal_message, RoomView};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_server_event, encode, ClientEvent, JoinPlayer, ServerEvent, VoteValue, DECK};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Quiet time after a reveal before the results table is printed
const RESULTS_SETTLE: Duration = Duration::from_millis(50);

/// Connection settings for one client run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub room_id: String,
    pub player: JoinPlayer,
    /// Consecutive failed connects or drops before giving up
    pub reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

/// How a single connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Quit,
    ConnectionLost,
}

fn display_name(view: &RoomView, player_id: &str) -> String {
    view.player(player_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| player_id.to_string())
}

/// Printed for votes the deck does not offer; the vote is still sent
pub fn off_deck_warning(vote: i32) -> Option<String> {
    if DECK.contains(&vote) {
        return None;
    }
    Some(format!("{} is not on the deck {:?}, sending anyway", vote, DECK))
}

/// One-line description of an event for the terminal, computed before it is applied
pub fn announce(view: &RoomView, self_id: &str, event: &ServerEvent) -> Option<String> {
    let name_of = |id: &str| display_name(view, id);

    match event {
        // Printed as a full table instead
        ServerEvent::RoomState { .. } => None,
        ServerEvent::PlayerJoined { player } => Some(format!("{} joined", player.name)),
        ServerEvent::PlayerLeft { player_id } => {
            Some(format!("{} left", name_of(player_id.as_str())))
        }
        ServerEvent::VoteUpdated { player_id, vote } => {
            let who = if player_id == self_id {
                "You".to_string()
            } else {
                name_of(player_id.as_str())
            };
            match vote {
                VoteValue::NoVote => Some(format!("{} withdrew", who)),
                VoteValue::Hidden => Some(format!("{} has voted", who)),
                VoteValue::Value(n) => Some(format!("{} voted {}", who, n)),
            }
        }
        ServerEvent::CardsRevealed { timestamp } => {
            Some(format!("Cards revealed. {}", reveal_message(*timestamp)))
        }
        ServerEvent::GameReset => Some("New round".to_string()),
        ServerEvent::PlayerUpdated { player_id, name } => {
            Some(format!("{} is now {}", name_of(player_id.as_str()), name))
        }
        ServerEvent::HostChanged { host_id } if host_id == self_id => {
            Some("You are now host".to_string())
        }
        ServerEvent::HostChanged { host_id } => {
            Some(format!("{} is now host", name_of(host_id.as_str())))
        }
        ServerEvent::SpectatorToggled {
            player_id,
            is_spectator,
        } => {
            let mode = if *is_spectator { "spectating" } else { "voting" };
            Some(format!("{} is {}", name_of(player_id.as_str()), mode))
        }
    }
}

pub struct Client {
    config: ClientConfig,
    view: RoomView,
    /// Set on reveal; the revealed votes arrive right after it
    results_pending: bool,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let view = RoomView::new(config.player.id.clone());
        Client {
            config,
            view,
            results_pending: false,
        }
    }

    pub fn view(&self) -> &RoomView {
        &self.view
    }

    async fn connect(&self) -> Result<WsStream, Box<dyn std::error::Error>> {
        info!("Connecting to {}...", self.config.server_url);
        let (ws, _response) =
            tokio_tungstenite::connect_async(self.config.server_url.as_str()).await?;
        Ok(ws)
    }

    async fn send_event(
        write: &mut WsWriter,
        event: &ClientEvent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let text = encode(event)?;
        debug!("Sending {}", text);
        write.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn join(&self, write: &mut WsWriter) -> Result<(), Box<dyn std::error::Error>> {
        let event = ClientEvent::Join {
            room_id: self.config.room_id.clone(),
            player: self.config.player.clone(),
        };
        Self::send_event(write, &event).await
    }

    fn handle_event(&mut self, event: ServerEvent) {
        if let Some(line) = announce(&self.view, &self.config.player.id, &event) {
            println!("{}", line);
        }
        let show_room = matches!(event, ServerEvent::RoomState { .. });
        if matches!(event, ServerEvent::CardsRevealed { .. }) {
            self.results_pending = true;
        }
        self.view.apply(event);
        if show_room {
            print!("{}", self.view.render());
        }
    }

    /// Handles one typed command. Returns false when the user wants to quit.
    async fn handle_command(
        &mut self,
        write: &mut WsWriter,
        line: &str,
    ) -> Result<bool, Box<dyn std::error::Error>> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(ParseError::Empty) => return Ok(true),
            Err(e) => {
                println!("{}", e);
                return Ok(true);
            }
        };

        match &command {
            Command::Quit => return Ok(false),
            Command::Help => println!("{}", HELP),
            Command::Show => print!("{}", self.view.render()),
            Command::Vote(n) => {
                if let Some(warning) = off_deck_warning(*n) {
                    println!("{}", warning);
                }
            }
            // Remember identity changes so a rejoin after reconnect keeps them
            Command::Name(name) => self.config.player.name = name.clone(),
            Command::Spectate => self.config.player.is_spectator = true,
            Command::Play => self.config.player.is_spectator = false,
            _ => {}
        }

        if let Some(event) = command.to_event(self.view.my_vote()) {
            Self::send_event(write, &event).await?;
        }
        Ok(true)
    }

    async fn run_connection(
        &mut self,
        write: &mut WsWriter,
        read: &mut WsReader,
        input: &mut mpsc::UnboundedReceiver<String>,
        attempts: &mut u32,
    ) -> Result<Outcome, Box<dyn std::error::Error>> {
        loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => match decode_server_event(&text) {
                        Ok(event) => {
                            if matches!(event, ServerEvent::RoomState { .. }) {
                                *attempts = 0;
                            }
                            self.handle_event(event);
                        }
                        Err(e) => warn!("Malformed frame from server: {}", e),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        warn!("Server closed the connection: {:?}", frame);
                        return Ok(Outcome::ConnectionLost);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("Error receiving frame: {}", e);
                        return Ok(Outcome::ConnectionLost);
                    }
                    None => return Ok(Outcome::ConnectionLost),
                },

                _ = sleep(RESULTS_SETTLE), if self.results_pending => {
                    self.results_pending = false;
                    if self.view.is_revealed() {
                        print!("{}", self.view.render());
                    }
                },

                line = input.recv() => match line {
                    Some(line) => match self.handle_command(write, &line).await {
                        Ok(true) => {}
                        Ok(false) => return Ok(Outcome::Quit),
                        Err(e) => {
                            error!("Error sending event: {}", e);
                            return Ok(Outcome::ConnectionLost);
                        }
                    },
                    None => return Ok(Outcome::Quit),
                },
            }
        }
    }

    /// Runs the client with commands typed on stdin
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if input_tx.send(line).is_err() {
                    break;
                }
            }
        });

        self.run_with_input(input_rx).await
    }

    /// Runs the client with command lines from `input` until the user quits,
    /// `input` closes, or reconnecting gives up
    pub async fn run_with_input(
        &mut self,
        mut input: mpsc::UnboundedReceiver<String>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut attempts: u32 = 0;

        loop {
            let outcome = match self.connect().await {
                Ok(ws) => {
                    let (mut write, mut read) = ws.split();
                    match self.join(&mut write).await {
                        Ok(()) => {
                            let outcome = self
                                .run_connection(&mut write, &mut read, &mut input, &mut attempts)
                                .await?;
                            if outcome == Outcome::Quit {
                                let _ = write.close().await;
                            }
                            outcome
                        }
                        Err(e) => {
                            error!("Failed to join room: {}", e);
                            Outcome::ConnectionLost
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to connect: {}", e);
                    Outcome::ConnectionLost
                }
            };

            if outcome == Outcome::Quit {
                return Ok(());
            }

            attempts += 1;
            if attempts > self.config.reconnect_attempts {
                return Err(format!("giving up after {} reconnect attempts", attempts - 1).into());
            }
            warn!(
                "Reconnecting in {:?} (attempt {}/{})",
                self.config.reconnect_delay, attempts, self.config.reconnect_attempts
            );
            sleep(self.config.reconnect_delay).await;
        }
    }
}
