use crate::player::{ConnectionId, Player, PlayerRole};
use crate::room::SessionStatus;

use super::Session;

/// How the session reacted to a closed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The connection held no seat.
    NotSeated,
    /// Waiting room: the seat was removed.
    Left {
        player: Player,
        /// Seat that inherited the judge role, if the leaver held it.
        promoted: Option<ConnectionId>,
        /// The roster is now empty and the session was retired.
        room_emptied: bool,
    },
    /// Running game: the seat was kept and marked disconnected.
    Disconnected { player_id: ConnectionId },
    /// Completed game: nothing changes.
    Ignored,
}

impl Session {
    pub fn disconnect(&mut self, connection: ConnectionId) -> DisconnectOutcome {
        let Some(index) = self.player_index(connection) else {
            return DisconnectOutcome::NotSeated;
        };

        match self.status {
            SessionStatus::Waiting => {
                let player = self.players.remove(index);
                if self.players.is_empty() {
                    self.retire();
                    return DisconnectOutcome::Left {
                        player,
                        promoted: None,
                        room_emptied: true,
                    };
                }
                let promoted = if player.role.is_judge() {
                    self.promote_first_seat()
                } else {
                    None
                };
                DisconnectOutcome::Left {
                    player,
                    promoted,
                    room_emptied: false,
                }
            },
            SessionStatus::InProgress => {
                self.players[index].connected = false;
                DisconnectOutcome::Disconnected {
                    player_id: connection,
                }
            },
            SessionStatus::Completed => DisconnectOutcome::Ignored,
        }
    }

    /// Hand the judge seat to the earliest remaining seat as `host_player`,
    /// or as `host` when another contestant would overflow the seat cap.
    fn promote_first_seat(&mut self) -> Option<ConnectionId> {
        let contestants_after = self.contestant_count()
            + usize::from(!self.players.first()?.role.is_contestant());
        let role = if contestants_after > self.seat_policy.cap(true) {
            PlayerRole::Host
        } else {
            PlayerRole::HostPlayer
        };
        let heir = self.players.first_mut()?;
        heir.role = role;
        Some(heir.id)
    }
}
