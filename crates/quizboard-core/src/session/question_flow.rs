//! Per-question sub-state machine: selection, buzz-in window, answer lock,
//! judging or skipping, and completion.

use crate::error::GameError;
use crate::player::{ConnectionId, Player};
use crate::quiz::{Question, QuestionRef, Quiz};

use super::Session;

/// A freshly opened question. `seq` stamps the buzz-in timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedQuestion {
    pub at: QuestionRef,
    pub seq: u64,
    pub question: Question,
}

/// What the board looks like after a question closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// More questions remain.
    Grid,
    /// Every question is closed. Carries the final leaderboard.
    Completed(Vec<Player>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeOutcome {
    pub at: QuestionRef,
    pub player_id: ConnectionId,
    pub correct: bool,
    /// Signed score delta that was applied.
    pub points: i64,
    pub answer: String,
    pub next_turn: ConnectionId,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipOutcome {
    pub at: QuestionRef,
    pub answer: String,
    pub turn: ConnectionId,
    pub resolution: Resolution,
}

impl Session {
    pub fn select_question(
        &mut self,
        quiz: &Quiz,
        requester: ConnectionId,
        at: QuestionRef,
    ) -> Result<OpenedQuestion, GameError> {
        self.require_in_progress()?;
        if self.current_question.is_some() {
            return Err(GameError::QuestionOpen);
        }
        if self.current_player_turn != Some(requester) {
            return Err(GameError::NotYourTurn);
        }
        if self.is_answered(at) {
            return Err(GameError::AlreadyAnswered);
        }
        let question = quiz.question(at).ok_or(GameError::InvalidQuestion)?;

        self.current_question = Some(at);
        self.current_answering_player_id = None;
        self.answering_open = false;
        self.question_seq += 1;
        Ok(OpenedQuestion {
            at,
            seq: self.question_seq,
            question: question.clone(),
        })
    }

    /// Open the buzz-in window for the question stamped `seq`. Returns false
    /// when that question has already closed or been superseded.
    pub fn open_answering(&mut self, seq: u64) -> bool {
        if self.current_question.is_none() || seq != self.question_seq || self.answering_open {
            return false;
        }
        self.answering_open = true;
        true
    }

    /// Take the answer lock. Only the first caller after the window opens wins.
    pub fn attempt_answer(&mut self, requester: ConnectionId) -> Result<(), GameError> {
        self.require_in_progress()?;
        if self.current_question.is_none() {
            return Err(GameError::NoQuestionOpen);
        }
        match self.player(requester) {
            Some(p) if p.role.is_contestant() => {},
            _ => return Err(GameError::Unauthorized("Only players can answer questions")),
        }
        if self.current_answering_player_id.is_some() {
            return Err(GameError::AlreadyAnswering);
        }
        if !self.answering_open {
            return Err(GameError::AnsweringNotAllowed);
        }
        self.current_answering_player_id = Some(requester);
        Ok(())
    }

    pub fn judge(
        &mut self,
        quiz: &Quiz,
        requester: ConnectionId,
        correct: bool,
    ) -> Result<JudgeOutcome, GameError> {
        self.require_in_progress()?;
        self.require_judge(requester, "Only host can judge answers")?;
        let at = self.current_question.ok_or(GameError::NoQuestionOpen)?;
        let answering = self
            .current_answering_player_id
            .ok_or(GameError::NoAnswerInProgress)?;
        let question = open_question(quiz, at)?;
        let index = self
            .player_index(answering)
            .ok_or(GameError::PlayerNotFound(answering))?;

        let points = if correct {
            question.points
        } else {
            -question.points
        };
        let seat = &mut self.players[index];
        seat.score = seat.score.saturating_add(points);

        self.close_question(at);
        let next_turn = self.advance_after_judgement(answering, correct);
        Ok(JudgeOutcome {
            at,
            player_id: answering,
            correct,
            points,
            answer: question.answer.clone(),
            next_turn,
            resolution: self.resolve(quiz),
        })
    }

    /// Close the open question without scoring it.
    pub fn skip(&mut self, quiz: &Quiz, requester: ConnectionId) -> Result<SkipOutcome, GameError> {
        self.require_in_progress()?;
        self.require_judge(requester, "Only host can skip questions")?;
        let at = self.current_question.ok_or(GameError::NoQuestionOpen)?;
        let question = open_question(quiz, at)?;

        self.close_question(at);
        let turn = self.advance_after_skip()?;
        Ok(SkipOutcome {
            at,
            answer: question.answer.clone(),
            turn,
            resolution: self.resolve(quiz),
        })
    }

    /// Apply a manual score correction. Returns the target's new score.
    pub fn adjust_score(
        &mut self,
        requester: ConnectionId,
        target: ConnectionId,
        points: i64,
    ) -> Result<i64, GameError> {
        if self.status == crate::room::SessionStatus::Completed {
            return Err(GameError::GameNotInProgress);
        }
        self.require_judge(requester, "Only host can adjust scores")?;
        let index = self
            .player_index(target)
            .ok_or(GameError::PlayerNotFound(target))?;
        let seat = &mut self.players[index];
        seat.score = seat.score.saturating_add(points);
        Ok(seat.score)
    }

    fn close_question(&mut self, at: QuestionRef) {
        self.answered_questions.push(at);
        self.current_question = None;
        self.current_answering_player_id = None;
        self.answering_open = false;
    }

    fn resolve(&mut self, quiz: &Quiz) -> Resolution {
        if self.answered_questions.len() >= quiz.total_questions() {
            self.complete();
            Resolution::Completed(self.leaderboard())
        } else {
            Resolution::Grid
        }
    }
}

fn open_question(quiz: &Quiz, at: QuestionRef) -> Result<&Question, GameError> {
    quiz.question(at).ok_or_else(|| {
        GameError::Internal(format!(
            "open question {}/{} missing from quiz {}",
            at.category_index, at.question_index, quiz.id
        ))
    })
}
