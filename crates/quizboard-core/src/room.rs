use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters a room code is drawn from.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of every room code.
pub const ROOM_CODE_LEN: usize = 6;

/// Generate a random 6-character uppercase alphanumeric room code.
/// Uniqueness is the registry's job.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Check that a string has the shape of a room code.
pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Lifecycle of a session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    InProgress,
    Completed,
}

/// Seat caps for contestants (`player` + `host_player`) while waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPolicy {
    pub max_seats_without_host_player: usize,
    pub max_seats_with_host_player: usize,
}

impl Default for SeatPolicy {
    fn default() -> Self {
        Self {
            max_seats_without_host_player: 6,
            max_seats_with_host_player: 5,
        }
    }
}

impl SeatPolicy {
    /// Contestant cap for a room that does or does not seat a host_player.
    pub fn cap(&self, has_host_player: bool) -> usize {
        if has_host_player {
            self.max_seats_with_host_player
        } else {
            self.max_seats_without_host_player
        }
    }
}
