//! Seats, roles and the capacity/exclusivity invariants around them.

use crate::error::GameError;
use crate::player::{ConnectionId, Player, PlayerRole, normalize_nickname};
use crate::room::SessionStatus;

use super::Session;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new seat was appended with role `player`.
    Seated(Player),
    /// A disconnected seat with the same nickname was handed to the new
    /// connection. Turn and buzz-lock references moved with it.
    Rebound {
        previous_id: ConnectionId,
        player: Player,
    },
}

impl Session {
    /// Seat a connection. While waiting this appends a `player`; during a
    /// running game the only way in is reclaiming one's own disconnected seat.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        raw_nickname: &str,
    ) -> Result<JoinOutcome, GameError> {
        let nickname = normalize_nickname(raw_nickname).ok_or(GameError::InvalidNickname)?;
        if self.player(connection).is_some() {
            return Err(GameError::AlreadyInRoom);
        }

        match self.status {
            SessionStatus::Waiting => {
                if self.players.iter().any(|p| p.nickname == nickname) {
                    return Err(GameError::NicknameTaken);
                }
                if self.contestant_count() >= self.seat_policy.cap(self.has_host_player()) {
                    return Err(GameError::RoomFull);
                }
                let player = Player::new(connection, nickname, PlayerRole::Player);
                self.players.push(player.clone());
                Ok(JoinOutcome::Seated(player))
            },
            SessionStatus::InProgress => {
                let index = self
                    .players
                    .iter()
                    .position(|p| p.nickname == nickname)
                    .ok_or(GameError::GameAlreadyStarted)?;
                if self.players[index].connected {
                    return Err(GameError::NicknameTaken);
                }
                let previous_id = self.rebind(index, connection);
                Ok(JoinOutcome::Rebound {
                    previous_id,
                    player: self.players[index].clone(),
                })
            },
            SessionStatus::Completed => Err(GameError::GameAlreadyStarted),
        }
    }

    /// Change a seat's role. Only the judge may do this, and only while
    /// waiting. The judge seat stays single and is never left empty.
    pub fn update_role(
        &mut self,
        requester: ConnectionId,
        target: ConnectionId,
        role: PlayerRole,
    ) -> Result<(), GameError> {
        if self.status != SessionStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        self.require_judge(requester, "Only host can update roles")?;
        let index = self
            .player_index(target)
            .ok_or(GameError::PlayerNotFound(target))?;
        let current = self.players[index].role;

        if role.is_judge() {
            let holder = self
                .players
                .iter()
                .find(|p| p.id != target && p.role.is_judge());
            if let Some(holder) = holder {
                return Err(GameError::RoleConflict(match (holder.role, role) {
                    (PlayerRole::HostPlayer, PlayerRole::HostPlayer) => {
                        "There can only be one Host Player"
                    },
                    (PlayerRole::Host, PlayerRole::Host) => "There can only be one Host",
                    _ => "Cannot have both Host and Host Player",
                }));
            }
        } else if current.is_judge() {
            return Err(GameError::RoleConflict("The room must keep a host"));
        }

        let contestants_after = self.contestant_count() + usize::from(role.is_contestant())
            - usize::from(current.is_contestant());
        let has_host_player_after = role == PlayerRole::HostPlayer
            || (self.has_host_player() && current != PlayerRole::HostPlayer);
        if contestants_after > self.seat_policy.cap(has_host_player_after) {
            return Err(GameError::RoomFull);
        }

        self.players[index].role = role;
        Ok(())
    }

    /// Remove a seat on the judge's request. Does not reassign roles.
    pub fn remove_player(
        &mut self,
        requester: ConnectionId,
        target: ConnectionId,
    ) -> Result<Player, GameError> {
        if self.status != SessionStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        self.require_judge(requester, "Only host can remove players")?;
        if requester == target {
            return Err(GameError::Unauthorized("Cannot remove yourself"));
        }
        let index = self
            .player_index(target)
            .ok_or(GameError::PlayerNotFound(target))?;
        Ok(self.players.remove(index))
    }

    /// Seats that may take turns and buzz in.
    pub fn contestant_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| p.role.is_contestant())
            .count()
    }

    pub fn has_host_player(&self) -> bool {
        self.players.iter().any(|p| p.role == PlayerRole::HostPlayer)
    }

    fn rebind(&mut self, index: usize, connection: ConnectionId) -> ConnectionId {
        let seat = &mut self.players[index];
        let previous = seat.id;
        seat.id = connection;
        seat.connected = true;
        if self.current_player_turn == Some(previous) {
            self.current_player_turn = Some(connection);
        }
        if self.current_answering_player_id == Some(previous) {
            self.current_answering_player_id = Some(connection);
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_quiz, waiting_session};

    #[test]
    fn join_appends_player_in_order() {
        let mut session = waiting_session(&["Bob"]);
        let outcome = session.join(10, "Carol").unwrap();
        assert!(matches!(outcome, JoinOutcome::Seated(ref p) if p.role == PlayerRole::Player));
        let names: Vec<&str> = session.players.iter().map(|p| p.nickname.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[test]
    fn duplicate_nickname_leaves_roster_unchanged() {
        let mut session = waiting_session(&["Bob"]);
        let before = session.players.clone();
        assert_eq!(session.join(10, "Bob"), Err(GameError::NicknameTaken));
        assert_eq!(session.players, before);
    }

    #[test]
    fn join_after_start_is_rejected() {
        let quiz = make_quiz(1, 1);
        let mut session = waiting_session(&["Bob"]);
        session.start_game(&quiz, 1).unwrap();
        assert_eq!(session.join(10, "Carol"), Err(GameError::GameAlreadyStarted));
    }

    #[test]
    fn seat_cap_with_host_player() {
        // host_player + 4 players = 5 contestants
        let mut session = waiting_session(&["B", "C", "D", "E"]);
        assert_eq!(session.join(10, "F"), Err(GameError::RoomFull));
    }

    #[test]
    fn seat_cap_without_host_player() {
        let mut session = waiting_session(&["B", "C", "D", "E"]);
        session.update_role(1, 1, PlayerRole::Host).unwrap();
        session.join(10, "F").unwrap();
        session.join(11, "G").unwrap();
        assert_eq!(session.join(12, "H"), Err(GameError::RoomFull));
        assert_eq!(session.contestant_count(), 6);
    }

    #[test]
    fn observers_do_not_count_towards_cap() {
        let mut session = waiting_session(&["B", "C", "D", "E"]);
        session.update_role(1, 2, PlayerRole::Observer).unwrap();
        session.join(10, "F").unwrap();
        assert_eq!(session.contestant_count(), 5);
    }

    #[test]
    fn only_judge_updates_roles() {
        let mut session = waiting_session(&["Bob", "Carol"]);
        assert!(matches!(
            session.update_role(2, 3, PlayerRole::Observer),
            Err(GameError::Unauthorized(_))
        ));
    }

    #[test]
    fn second_judge_seat_is_a_conflict() {
        let mut session = waiting_session(&["Bob"]);
        assert_eq!(
            session.update_role(1, 2, PlayerRole::Host),
            Err(GameError::RoleConflict("Cannot have both Host and Host Player"))
        );
        assert_eq!(
            session.update_role(1, 2, PlayerRole::HostPlayer),
            Err(GameError::RoleConflict("There can only be one Host Player"))
        );
        session.update_role(1, 1, PlayerRole::Host).unwrap();
        assert_eq!(
            session.update_role(1, 2, PlayerRole::Host),
            Err(GameError::RoleConflict("There can only be one Host"))
        );
    }

    #[test]
    fn judge_can_switch_between_judge_roles() {
        let mut session = waiting_session(&["Bob"]);
        session.update_role(1, 1, PlayerRole::Host).unwrap();
        assert_eq!(session.player(1).unwrap().role, PlayerRole::Host);
        session.update_role(1, 1, PlayerRole::HostPlayer).unwrap();
        assert_eq!(session.player(1).unwrap().role, PlayerRole::HostPlayer);
    }

    #[test]
    fn last_judge_cannot_be_demoted() {
        let mut session = waiting_session(&["Bob"]);
        assert!(matches!(
            session.update_role(1, 1, PlayerRole::Player),
            Err(GameError::RoleConflict(_))
        ));
    }

    #[test]
    fn role_change_respects_seat_cap() {
        let mut session = waiting_session(&["B", "C", "D", "E"]);
        session.update_role(1, 5, PlayerRole::Observer).unwrap();
        session.join(10, "F").unwrap();
        assert_eq!(
            session.update_role(1, 5, PlayerRole::Player),
            Err(GameError::RoomFull)
        );
    }

    #[test]
    fn update_role_unknown_target() {
        let mut session = waiting_session(&["Bob"]);
        assert_eq!(
            session.update_role(1, 99, PlayerRole::Observer),
            Err(GameError::PlayerNotFound(99))
        );
    }

    #[test]
    fn remove_player_rules() {
        let mut session = waiting_session(&["Bob", "Carol"]);
        assert!(matches!(
            session.remove_player(2, 3),
            Err(GameError::Unauthorized(_))
        ));
        assert_eq!(
            session.remove_player(1, 1),
            Err(GameError::Unauthorized("Cannot remove yourself"))
        );
        assert_eq!(
            session.remove_player(1, 42),
            Err(GameError::PlayerNotFound(42))
        );
        let removed = session.remove_player(1, 2).unwrap();
        assert_eq!(removed.nickname, "Bob");
        assert_eq!(session.players.len(), 2);
    }

    #[test]
    fn rejoin_rebinds_disconnected_seat() {
        let quiz = make_quiz(1, 2);
        let mut session = waiting_session(&["Bob"]);
        session.start_game(&quiz, 1).unwrap();
        session.disconnect(1);
        assert!(!session.player(1).unwrap().connected);

        let outcome = session.join(50, "Alice").unwrap();
        assert!(matches!(outcome, JoinOutcome::Rebound { previous_id: 1, .. }));
        assert!(session.player(1).is_none());
        let seat = session.player(50).unwrap();
        assert!(seat.connected);
        assert_eq!(seat.role, PlayerRole::HostPlayer);
        assert_eq!(session.current_player_turn, Some(50));
    }

    #[test]
    fn rejoin_of_connected_seat_is_taken() {
        let quiz = make_quiz(1, 2);
        let mut session = waiting_session(&["Bob"]);
        session.start_game(&quiz, 1).unwrap();
        assert_eq!(session.join(50, "Bob"), Err(GameError::NicknameTaken));
    }
}
