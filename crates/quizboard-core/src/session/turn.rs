//! Who picks the next question.
//!
//! A correct answer hands control of the board to the answerer. A wrong answer
//! or a skip leaves it with whoever chose the question.

use crate::error::GameError;
use crate::player::ConnectionId;

use super::Session;

impl Session {
    /// The earliest-joined seat that may take turns.
    pub fn first_turn(&self) -> Result<ConnectionId, GameError> {
        self.players
            .iter()
            .find(|p| p.role.is_contestant())
            .map(|p| p.id)
            .ok_or(GameError::NotEnoughPlayers)
    }

    pub(crate) fn advance_after_judgement(
        &mut self,
        answering: ConnectionId,
        correct: bool,
    ) -> ConnectionId {
        let next = match self.current_player_turn {
            Some(chooser) if !correct => chooser,
            _ => answering,
        };
        self.current_player_turn = Some(next);
        next
    }

    pub(crate) fn advance_after_skip(&mut self) -> Result<ConnectionId, GameError> {
        let next = match self.current_player_turn {
            Some(chooser) => chooser,
            None => self.first_turn()?,
        };
        self.current_player_turn = Some(next);
        Ok(next)
    }
}
