//! Parsing of the commands typed at the client prompt

use shared::ClientEvent;
use std::fmt;

/// A user command read from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick a card; picking the current card again withdraws it
    Vote(i32),
    Clear,
    Reveal,
    Reset,
    Name(String),
    Spectate,
    Play,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidVote(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::Unknown(word) => write!(f, "unknown command '{}', try 'help'", word),
            ParseError::MissingArgument(command) => write!(f, "'{}' needs an argument", command),
            ParseError::InvalidVote(raw) => write!(f, "'{}' is not a whole number", raw),
        }
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
commands:
  vote <n>   pick a card (again to withdraw)
  clear      withdraw your vote
  reveal     show everyone's votes
  reset      start a new round
  name <new> change your display name
  spectate   watch without voting
  play       vote again after spectating
  show       print the room
  quit       leave";

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "vote" | "v" => {
                if rest.is_empty() {
                    return Err(ParseError::MissingArgument("vote"));
                }
                rest.parse()
                    .map(Command::Vote)
                    .map_err(|_| ParseError::InvalidVote(rest.to_string()))
            }
            "clear" => Ok(Command::Clear),
            "reveal" => Ok(Command::Reveal),
            "reset" => Ok(Command::Reset),
            "name" => {
                if rest.is_empty() {
                    Err(ParseError::MissingArgument("name"))
                } else {
                    Ok(Command::Name(rest.to_string()))
                }
            }
            "spectate" => Ok(Command::Spectate),
            "play" => Ok(Command::Play),
            "show" | "ls" => Ok(Command::Show),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            _ => Err(ParseError::Unknown(word.to_string())),
        }
    }

    /// The event to send for this command, given the caller's current vote.
    /// Local-only commands map to None.
    pub fn to_event(&self, current_vote: Option<i32>) -> Option<ClientEvent> {
        match self {
            Command::Vote(n) => Some(ClientEvent::Vote {
                vote: if current_vote == Some(*n) {
                    None
                } else {
                    Some(*n)
                },
            }),
            Command::Clear => Some(ClientEvent::Vote { vote: None }),
            Command::Reveal => Some(ClientEvent::Reveal),
            Command::Reset => Some(ClientEvent::Reset),
            Command::Name(name) => Some(ClientEvent::UpdateName { name: name.clone() }),
            Command::Spectate => Some(ClientEvent::ToggleSpectator { is_spectator: true }),
            Command::Play => Some(ClientEvent::ToggleSpectator {
                is_spectator: false,
            }),
            Command::Show | Command::Help | Command::Quit => None,
        }
    }
}
