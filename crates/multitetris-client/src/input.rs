use std::str::FromStr;

use multitetris_core::board::Board;
use multitetris_core::controller::MoveOutcome;
use multitetris_core::geometry::Direction;
use multitetris_core::lobby::LobbyId;

/// Gameplay input. The only way local input reaches a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Left,
    Right,
    Down,
    Rotate,
}

impl Command {
    /// Map a key name to a command. Unbound keys return `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "left" | "a" => Some(Self::Left),
            "right" | "d" => Some(Self::Right),
            "down" | "s" => Some(Self::Down),
            "r" | "rotate" | "up" | "w" => Some(Self::Rotate),
            _ => None,
        }
    }

    pub fn apply(self, board: &mut Board) -> MoveOutcome {
        match self {
            Self::Left => board.move_brick(Direction::Left),
            Self::Right => board.move_brick(Direction::Right),
            Self::Down => board.move_brick(Direction::Down),
            Self::Rotate => board.rotate_brick(),
        }
    }
}

/// One line typed at the client prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Play(Command),
    ListLobbies,
    Join(LobbyId),
    Leave,
    Create { name: String, public: bool },
    Start,
    Solo,
    Login { email: String, password: String },
    Register {
        email: String,
        password: String,
        display_name: String,
    },
    Show,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(pub String);

impl std::fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for ClientCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(ParseCommandError("empty command".to_string()));
        };
        if let Some(cmd) = Command::from_key(head) {
            return Ok(Self::Play(cmd));
        }

        let mut arg = |what: &str| {
            words
                .next()
                .map(str::to_string)
                .ok_or_else(|| ParseCommandError(format!("{head}: missing {what}")))
        };

        match head.to_ascii_lowercase().as_str() {
            "lobbies" | "ls" => Ok(Self::ListLobbies),
            "join" => {
                let raw = arg("lobby id")?;
                raw.parse()
                    .map(Self::Join)
                    .map_err(|_| ParseCommandError(format!("join: invalid lobby id {raw}")))
            },
            "leave" => Ok(Self::Leave),
            "create" | "private" => {
                let public = head.eq_ignore_ascii_case("create");
                let name: Vec<&str> = line.split_whitespace().skip(1).collect();
                if name.is_empty() {
                    return Err(ParseCommandError(format!("{head}: missing lobby name")));
                }
                Ok(Self::Create {
                    name: name.join(" "),
                    public,
                })
            },
            "start" => Ok(Self::Start),
            "solo" => Ok(Self::Solo),
            "login" => Ok(Self::Login {
                email: arg("email")?,
                password: arg("password")?,
            }),
            "register" => Ok(Self::Register {
                email: arg("email")?,
                password: arg("password")?,
                display_name: arg("display name")?,
            }),
            "show" | "board" => Ok(Self::Show),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(ParseCommandError(format!("unknown command: {other}"))),
        }
    }
}
