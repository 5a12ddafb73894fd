//! The per-room session record and its state machine.
//!
//! A [`Session`] is plain data plus synchronous transition methods. Callers
//! are expected to serialize access (one writer per room) and to apply each
//! transition to a copy before committing it, so a rejected or unpersisted
//! action leaves the original untouched. The methods are grouped by concern:
//!
//! - [`roster`]: joining, role changes, removal.
//! - [`turn`]: who picks the next question.
//! - [`question_flow`]: select, buzz-in, judge, skip, score adjustments.
//! - [`disconnect`]: reacting to a dropped connection.

pub mod disconnect;
pub mod question_flow;
pub mod roster;
pub mod turn;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;
use crate::player::{ConnectionId, Player, PlayerRole, normalize_nickname};
use crate::quiz::{QuestionRef, Quiz, QuizId};
use crate::room::{SeatPolicy, SessionStatus};
use crate::time::unix_millis;

pub use disconnect::DisconnectOutcome;
pub use question_flow::{JudgeOutcome, OpenedQuestion, Resolution, SkipOutcome};
pub use roster::JoinOutcome;

/// Persistent record of one quiz room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub code: String,
    pub quiz_id: QuizId,
    pub status: SessionStatus,
    pub is_active: bool,
    /// Seats in join order.
    pub players: Vec<Player>,
    /// Closed questions, in the order they were closed. Never shrinks.
    pub answered_questions: Vec<QuestionRef>,
    /// The open question, if any.
    pub current_question: Option<QuestionRef>,
    pub current_answering_player_id: Option<ConnectionId>,
    pub current_player_turn: Option<ConnectionId>,
    /// Set once the buzz-in delay for the open question has elapsed.
    pub answering_open: bool,
    /// Bumped on every selection; stamps buzz-in timers.
    pub question_seq: u64,
    pub seat_policy: SeatPolicy,
    pub start_time: u64,
    pub end_time: Option<u64>,
}

impl Session {
    /// Create a waiting session with the creator seated as `host_player`.
    pub fn new(
        code: String,
        quiz_id: QuizId,
        creator_id: ConnectionId,
        creator_nickname: &str,
        seat_policy: SeatPolicy,
    ) -> Result<Self, GameError> {
        let nickname = normalize_nickname(creator_nickname).ok_or(GameError::InvalidNickname)?;
        Ok(Self {
            id: Uuid::new_v4(),
            code,
            quiz_id,
            status: SessionStatus::Waiting,
            is_active: true,
            players: vec![Player::new(creator_id, nickname, PlayerRole::HostPlayer)],
            answered_questions: Vec::new(),
            current_question: None,
            current_answering_player_id: None,
            current_player_turn: None,
            answering_open: false,
            question_seq: 0,
            seat_policy,
            start_time: unix_millis(),
            end_time: None,
        })
    }

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn player_index(&self, id: ConnectionId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// The connection currently occupying the judge seat.
    pub fn judge_seat(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.role.is_judge())
    }

    pub fn is_answered(&self, at: QuestionRef) -> bool {
        self.answered_questions.contains(&at)
    }

    /// Players ordered by descending score. Ties keep join order.
    pub fn leaderboard(&self) -> Vec<Player> {
        let mut ranked = self.players.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Move the session from waiting to in progress and hand the first turn
    /// to the earliest-joined contestant.
    pub fn start_game(
        &mut self,
        quiz: &Quiz,
        requester: ConnectionId,
    ) -> Result<ConnectionId, GameError> {
        if self.status != SessionStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        self.require_judge(requester, "Only host can start the game")?;
        if quiz.total_questions() == 0 {
            return Err(GameError::Internal(format!(
                "quiz {} has no questions",
                quiz.id
            )));
        }
        let first = self.first_turn()?;
        self.status = SessionStatus::InProgress;
        self.current_player_turn = Some(first);
        Ok(first)
    }

    /// Mark the session inactive. Inactive sessions accept no joins.
    pub fn retire(&mut self) {
        self.is_active = false;
    }

    pub(crate) fn require_in_progress(&self) -> Result<(), GameError> {
        if self.status != SessionStatus::InProgress {
            return Err(GameError::GameNotInProgress);
        }
        Ok(())
    }

    pub(crate) fn require_judge(
        &self,
        requester: ConnectionId,
        denial: &'static str,
    ) -> Result<(), GameError> {
        match self.player(requester) {
            Some(p) if p.role.is_judge() => Ok(()),
            _ => Err(GameError::Unauthorized(denial)),
        }
    }

    fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.end_time = Some(unix_millis());
    }
}
