use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, GameError};
use crate::player::{ConnectionId, Player, PlayerRole};
use crate::quiz::{QuestionRef, QuizBoard, QuizId};
use crate::room::SessionStatus;

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    CreateRoom = 0x01,
    JoinRoom = 0x02,
    UpdateRole = 0x03,
    RemovePlayer = 0x04,
    StartGame = 0x05,
    SelectQuestion = 0x06,
    AttemptAnswer = 0x07,
    JudgeAnswer = 0x08,
    SkipQuestion = 0x09,
    AdjustScore = 0x0A,

    // Server -> Client (roster)
    RoomCreated = 0x10,
    RoomJoined = 0x11,
    PlayerJoined = 0x12,
    PlayerRemoved = 0x13,
    RemovedFromRoom = 0x14,
    PlayerLeft = 0x15,
    PlayerDisconnected = 0x16,
    PlayerReconnected = 0x17,
    RolesUpdated = 0x18,
    RoomClosed = 0x19,

    // Server -> Client (game flow)
    GameStarted = 0x20,
    QuestionSelected = 0x21,
    QuestionAnswer = 0x22,
    AnsweringAllowed = 0x23,
    PlayerAnswering = 0x24,
    AnswerJudged = 0x25,
    QuestionSkipped = 0x26,
    NextTurn = 0x27,
    ScoreAdjusted = 0x28,
    GameCompleted = 0x29,

    Error = 0x3F,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        let ty = match b {
            0x01 => Self::CreateRoom,
            0x02 => Self::JoinRoom,
            0x03 => Self::UpdateRole,
            0x04 => Self::RemovePlayer,
            0x05 => Self::StartGame,
            0x06 => Self::SelectQuestion,
            0x07 => Self::AttemptAnswer,
            0x08 => Self::JudgeAnswer,
            0x09 => Self::SkipQuestion,
            0x0A => Self::AdjustScore,
            0x10 => Self::RoomCreated,
            0x11 => Self::RoomJoined,
            0x12 => Self::PlayerJoined,
            0x13 => Self::PlayerRemoved,
            0x14 => Self::RemovedFromRoom,
            0x15 => Self::PlayerLeft,
            0x16 => Self::PlayerDisconnected,
            0x17 => Self::PlayerReconnected,
            0x18 => Self::RolesUpdated,
            0x19 => Self::RoomClosed,
            0x20 => Self::GameStarted,
            0x21 => Self::QuestionSelected,
            0x22 => Self::QuestionAnswer,
            0x23 => Self::AnsweringAllowed,
            0x24 => Self::PlayerAnswering,
            0x25 => Self::AnswerJudged,
            0x26 => Self::QuestionSkipped,
            0x27 => Self::NextTurn,
            0x28 => Self::ScoreAdjusted,
            0x29 => Self::GameCompleted,
            0x3F => Self::Error,
            _ => return None,
        };
        Some(ty)
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Actions a client can request. Variants without a payload ignore any bytes
/// after the type prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    CreateRoom(CreateRoomMsg),
    JoinRoom(JoinRoomMsg),
    UpdateRole(UpdateRoleMsg),
    RemovePlayer(RemovePlayerMsg),
    StartGame,
    SelectQuestion(SelectQuestionMsg),
    AttemptAnswer,
    JudgeAnswer(JudgeAnswerMsg),
    SkipQuestion,
    AdjustScore(AdjustScoreMsg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomMsg {
    pub quiz_id: QuizId,
    pub nickname: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRoomMsg {
    pub code: String,
    pub nickname: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoleMsg {
    pub player_id: ConnectionId,
    pub role: PlayerRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePlayerMsg {
    pub player_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectQuestionMsg {
    pub category_index: usize,
    pub question_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeAnswerMsg {
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustScoreMsg {
    pub player_id: ConnectionId,
    pub points: i64,
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Notifications sent to clients. Every state-bearing message carries the
/// full `players` roster so a client can resync from any one of them.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    RoomCreated(RoomCreatedMsg),
    RoomJoined(Box<RoomJoinedMsg>),
    PlayerJoined(PlayerJoinedMsg),
    PlayerRemoved(PlayerRemovedMsg),
    RemovedFromRoom(RemovedFromRoomMsg),
    PlayerLeft(PlayerLeftMsg),
    PlayerDisconnected(PlayerDisconnectedMsg),
    PlayerReconnected(PlayerReconnectedMsg),
    RolesUpdated(RolesUpdatedMsg),
    RoomClosed(RoomClosedMsg),
    GameStarted(GameStartedMsg),
    QuestionSelected(QuestionSelectedMsg),
    QuestionAnswer(QuestionAnswerMsg),
    AnsweringAllowed(AnsweringAllowedMsg),
    PlayerAnswering(PlayerAnsweringMsg),
    AnswerJudged(AnswerJudgedMsg),
    QuestionSkipped(QuestionSkippedMsg),
    NextTurn(NextTurnMsg),
    ScoreAdjusted(ScoreAdjustedMsg),
    GameCompleted(GameCompletedMsg),
    Error(ErrorMsg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCreatedMsg {
    pub code: String,
    /// The creator's own connection id.
    pub player_id: ConnectionId,
    pub quiz: QuizBoard,
    pub players: Vec<Player>,
}

/// Sent to a joining connection only. Carries everything needed to rebuild
/// the board mid-game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomJoinedMsg {
    pub code: String,
    pub player_id: ConnectionId,
    pub quiz: QuizBoard,
    pub status: SessionStatus,
    pub players: Vec<Player>,
    pub answered_questions: Vec<QuestionRef>,
    pub current_question: Option<QuestionRef>,
    pub current_player_turn: Option<ConnectionId>,
    pub current_answering_player_id: Option<ConnectionId>,
    pub answering_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub player: Player,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRemovedMsg {
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedFromRoomMsg {
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLeftMsg {
    pub player_id: ConnectionId,
    /// Seat that took over the judge role, if any.
    pub promoted: Option<ConnectionId>,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDisconnectedMsg {
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerReconnectedMsg {
    pub previous_id: ConnectionId,
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolesUpdatedMsg {
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomClosedMsg {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartedMsg {
    pub current_player_turn: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSelectedMsg {
    pub question: QuestionRef,
    pub text: String,
    pub points: i64,
    pub selected_by: ConnectionId,
    /// Reading time before buzzing opens. Display only.
    pub answer_delay_ms: u64,
    pub players: Vec<Player>,
}

/// Sent to the judge seat only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswerMsg {
    pub question: QuestionRef,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweringAllowedMsg {
    pub question: QuestionRef,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAnsweringMsg {
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerJudgedMsg {
    pub question: QuestionRef,
    pub player_id: ConnectionId,
    pub correct: bool,
    /// Signed delta applied to the answerer.
    pub points: i64,
    pub answer: String,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSkippedMsg {
    pub question: QuestionRef,
    pub answer: String,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextTurnMsg {
    pub player_id: ConnectionId,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreAdjustedMsg {
    pub player_id: ConnectionId,
    pub points: i64,
    pub score: i64,
    pub players: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCompletedMsg {
    /// Players by descending score, ties in join order.
    pub leaderboard: Vec<Player>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&GameError> for ErrorMsg {
    fn from(err: &GameError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}
