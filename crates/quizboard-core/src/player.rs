use serde::{Deserialize, Serialize};

/// Identity of one live client connection. A person who reconnects gets a
/// fresh id; seats are rebound to it (see `Session::join`).
pub type ConnectionId = u64;

/// Seat a connection occupies in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// Judge-only seat. Starts the game, judges, skips, manages the roster.
    Host,
    /// Judge seat that also takes turns and buzzes in.
    HostPlayer,
    Player,
    Observer,
}

impl PlayerRole {
    /// Whether this role occupies the room's judge seat.
    pub fn is_judge(self) -> bool {
        matches!(self, Self::Host | Self::HostPlayer)
    }

    /// Whether this role may take turns and buzz in.
    pub fn is_contestant(self) -> bool {
        matches!(self, Self::Player | Self::HostPlayer)
    }
}

impl std::fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Host => "host",
            Self::HostPlayer => "host_player",
            Self::Player => "player",
            Self::Observer => "observer",
        };
        f.write_str(name)
    }
}

/// A seat in a quiz room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ConnectionId,
    pub nickname: String,
    pub score: i64,
    pub role: PlayerRole,
    /// False while the seat's connection is gone during a running game.
    pub connected: bool,
}

impl Player {
    pub fn new(id: ConnectionId, nickname: String, role: PlayerRole) -> Self {
        Self {
            id,
            nickname,
            score: 0,
            role,
            connected: true,
        }
    }
}

/// Longest nickname accepted, in characters.
pub const MAX_NICKNAME_CHARS: usize = 32;

/// Trim and validate a requested nickname. Returns `None` when it is empty,
/// too long, or contains control characters.
pub fn normalize_nickname(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty()
        || name.chars().count() > MAX_NICKNAME_CHARS
        || name.chars().any(char::is_control)
    {
        return None;
    }
    Some(name.to_string())
}
