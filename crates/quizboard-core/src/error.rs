//! Error taxonomy for room actions.
//!
//! Every rejected action produces exactly one [`GameError`], which is reported
//! to the requesting connection only. [`ErrorCode`] is its wire form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::player::ConnectionId;

/// Why an action against a room was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    // Not found
    #[error("room not found or inactive")]
    RoomNotFound,
    #[error("quiz not found")]
    QuizNotFound,
    #[error("player {0} not found")]
    PlayerNotFound(ConnectionId),
    #[error("invalid question")]
    InvalidQuestion,

    // Authorization / invariant violations
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("not your turn to select a question")]
    NotYourTurn,
    #[error("{0}")]
    RoleConflict(&'static str),

    // State conflicts: the request was valid but arrived too late
    #[error("question already answered")]
    AlreadyAnswered,
    #[error("someone is already answering")]
    AlreadyAnswering,
    #[error("game has already started")]
    GameAlreadyStarted,
    #[error("game is not in progress")]
    GameNotInProgress,
    #[error("a question is already open")]
    QuestionOpen,
    #[error("no question is open")]
    NoQuestionOpen,
    #[error("answering is not allowed yet")]
    AnsweringNotAllowed,
    #[error("no player is answering")]
    NoAnswerInProgress,

    // Capacity / preconditions
    #[error("room is full")]
    RoomFull,
    #[error("nickname already taken")]
    NicknameTaken,
    #[error("invalid nickname")]
    InvalidNickname,
    #[error("not enough players to start the game")]
    NotEnoughPlayers,
    #[error("connection is already in a room")]
    AlreadyInRoom,
    #[error("connection is not in a room")]
    NotInRoom,
    #[error("protocol version mismatch: client={client}, server={server}")]
    ProtocolMismatch { client: u8, server: u8 },

    // Internal
    #[error("could not generate a unique room code")]
    CodeGenerationFailed,
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Wire code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::RoomNotFound => ErrorCode::RoomNotFound,
            Self::QuizNotFound => ErrorCode::QuizNotFound,
            Self::PlayerNotFound(_) => ErrorCode::PlayerNotFound,
            Self::InvalidQuestion => ErrorCode::InvalidQuestion,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::NotYourTurn => ErrorCode::NotYourTurn,
            Self::RoleConflict(_) => ErrorCode::RoleConflict,
            Self::AlreadyAnswered => ErrorCode::AlreadyAnswered,
            Self::AlreadyAnswering => ErrorCode::AlreadyAnswering,
            Self::GameAlreadyStarted => ErrorCode::GameAlreadyStarted,
            Self::GameNotInProgress => ErrorCode::GameNotInProgress,
            Self::QuestionOpen => ErrorCode::QuestionOpen,
            Self::NoQuestionOpen => ErrorCode::NoQuestionOpen,
            Self::AnsweringNotAllowed => ErrorCode::AnsweringNotAllowed,
            Self::NoAnswerInProgress => ErrorCode::NoAnswerInProgress,
            Self::RoomFull => ErrorCode::RoomFull,
            Self::NicknameTaken => ErrorCode::NicknameTaken,
            Self::InvalidNickname => ErrorCode::InvalidNickname,
            Self::NotEnoughPlayers => ErrorCode::NotEnoughPlayers,
            Self::AlreadyInRoom => ErrorCode::AlreadyInRoom,
            Self::NotInRoom => ErrorCode::NotInRoom,
            Self::ProtocolMismatch { .. } => ErrorCode::ProtocolMismatch,
            Self::CodeGenerationFailed | Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Structured error codes sent to clients in `Error` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomNotFound,
    QuizNotFound,
    PlayerNotFound,
    InvalidQuestion,
    Unauthorized,
    NotYourTurn,
    RoleConflict,
    AlreadyAnswered,
    AlreadyAnswering,
    GameAlreadyStarted,
    GameNotInProgress,
    QuestionOpen,
    NoQuestionOpen,
    AnsweringNotAllowed,
    NoAnswerInProgress,
    RoomFull,
    NicknameTaken,
    InvalidNickname,
    NotEnoughPlayers,
    AlreadyInRoom,
    NotInRoom,
    ProtocolMismatch,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_share_one_code() {
        assert_eq!(GameError::CodeGenerationFailed.code(), ErrorCode::Internal);
        assert_eq!(
            GameError::Internal("disk".to_string()).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(GameError::NicknameTaken.to_string(), "nickname already taken");
        assert_eq!(
            GameError::Unauthorized("Only host can judge answers").to_string(),
            "Only host can judge answers"
        );
        assert_eq!(
            GameError::ProtocolMismatch {
                client: 1,
                server: 2
            }
            .to_string(),
            "protocol version mismatch: client=1, server=2"
        );
    }
}
