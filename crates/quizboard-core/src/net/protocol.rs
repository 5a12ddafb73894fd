use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages::{
    AdjustScoreMsg, AnswerJudgedMsg, AnsweringAllowedMsg, ClientMessage, CreateRoomMsg, ErrorMsg,
    GameCompletedMsg, GameStartedMsg, JoinRoomMsg, JudgeAnswerMsg, MessageType, NextTurnMsg,
    PlayerAnsweringMsg, PlayerDisconnectedMsg, PlayerJoinedMsg, PlayerLeftMsg,
    PlayerReconnectedMsg, PlayerRemovedMsg, QuestionAnswerMsg, QuestionSelectedMsg,
    QuestionSkippedMsg, RemovePlayerMsg, RemovedFromRoomMsg, RolesUpdatedMsg, RoomClosedMsg,
    RoomCreatedMsg, RoomJoinedMsg, ScoreAdjustedMsg, SelectQuestionMsg, ServerMessage,
    UpdateRoleMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message size in bytes, type prefix included.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    EmptyMessage,
    #[error("unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),
    #[error("payload too large: {0} bytes (max {max})", max = MAX_MESSAGE_SIZE)]
    PayloadTooLarge(usize),
    #[error("serialize error: {0}")]
    SerializeError(String),
    #[error("deserialize error: {0}")]
    DeserializeError(String),
}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::CreateRoom(m) => encode_message(MessageType::CreateRoom, m),
        ClientMessage::JoinRoom(m) => encode_message(MessageType::JoinRoom, m),
        ClientMessage::UpdateRole(m) => encode_message(MessageType::UpdateRole, m),
        ClientMessage::RemovePlayer(m) => encode_message(MessageType::RemovePlayer, m),
        ClientMessage::StartGame => encode_message(MessageType::StartGame, &()),
        ClientMessage::SelectQuestion(m) => encode_message(MessageType::SelectQuestion, m),
        ClientMessage::AttemptAnswer => encode_message(MessageType::AttemptAnswer, &()),
        ClientMessage::JudgeAnswer(m) => encode_message(MessageType::JudgeAnswer, m),
        ClientMessage::SkipQuestion => encode_message(MessageType::SkipQuestion, &()),
        ClientMessage::AdjustScore(m) => encode_message(MessageType::AdjustScore, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::RoomCreated(m) => encode_message(MessageType::RoomCreated, m),
        ServerMessage::RoomJoined(m) => encode_message(MessageType::RoomJoined, m),
        ServerMessage::PlayerJoined(m) => encode_message(MessageType::PlayerJoined, m),
        ServerMessage::PlayerRemoved(m) => encode_message(MessageType::PlayerRemoved, m),
        ServerMessage::RemovedFromRoom(m) => encode_message(MessageType::RemovedFromRoom, m),
        ServerMessage::PlayerLeft(m) => encode_message(MessageType::PlayerLeft, m),
        ServerMessage::PlayerDisconnected(m) => {
            encode_message(MessageType::PlayerDisconnected, m)
        },
        ServerMessage::PlayerReconnected(m) => encode_message(MessageType::PlayerReconnected, m),
        ServerMessage::RolesUpdated(m) => encode_message(MessageType::RolesUpdated, m),
        ServerMessage::RoomClosed(m) => encode_message(MessageType::RoomClosed, m),
        ServerMessage::GameStarted(m) => encode_message(MessageType::GameStarted, m),
        ServerMessage::QuestionSelected(m) => encode_message(MessageType::QuestionSelected, m),
        ServerMessage::QuestionAnswer(m) => encode_message(MessageType::QuestionAnswer, m),
        ServerMessage::AnsweringAllowed(m) => encode_message(MessageType::AnsweringAllowed, m),
        ServerMessage::PlayerAnswering(m) => encode_message(MessageType::PlayerAnswering, m),
        ServerMessage::AnswerJudged(m) => encode_message(MessageType::AnswerJudged, m),
        ServerMessage::QuestionSkipped(m) => encode_message(MessageType::QuestionSkipped, m),
        ServerMessage::NextTurn(m) => encode_message(MessageType::NextTurn, m),
        ServerMessage::ScoreAdjusted(m) => encode_message(MessageType::ScoreAdjusted, m),
        ServerMessage::GameCompleted(m) => encode_message(MessageType::GameCompleted, m),
        ServerMessage::Error(m) => encode_message(MessageType::Error, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let first = *data.first().ok_or(ProtocolError::EmptyMessage)?;
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    let msg = match decode_message_type(data)? {
        MessageType::CreateRoom => {
            ClientMessage::CreateRoom(decode_payload::<CreateRoomMsg>(data)?)
        },
        MessageType::JoinRoom => ClientMessage::JoinRoom(decode_payload::<JoinRoomMsg>(data)?),
        MessageType::UpdateRole => {
            ClientMessage::UpdateRole(decode_payload::<UpdateRoleMsg>(data)?)
        },
        MessageType::RemovePlayer => {
            ClientMessage::RemovePlayer(decode_payload::<RemovePlayerMsg>(data)?)
        },
        MessageType::StartGame => ClientMessage::StartGame,
        MessageType::SelectQuestion => {
            ClientMessage::SelectQuestion(decode_payload::<SelectQuestionMsg>(data)?)
        },
        MessageType::AttemptAnswer => ClientMessage::AttemptAnswer,
        MessageType::JudgeAnswer => {
            ClientMessage::JudgeAnswer(decode_payload::<JudgeAnswerMsg>(data)?)
        },
        MessageType::SkipQuestion => ClientMessage::SkipQuestion,
        MessageType::AdjustScore => {
            ClientMessage::AdjustScore(decode_payload::<AdjustScoreMsg>(data)?)
        },
        _ => return Err(ProtocolError::UnknownMessageType(data[0])),
    };
    Ok(msg)
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg = match decode_message_type(data)? {
        MessageType::RoomCreated => {
            ServerMessage::RoomCreated(decode_payload::<RoomCreatedMsg>(data)?)
        },
        MessageType::RoomJoined => {
            ServerMessage::RoomJoined(Box::new(decode_payload::<RoomJoinedMsg>(data)?))
        },
        MessageType::PlayerJoined => {
            ServerMessage::PlayerJoined(decode_payload::<PlayerJoinedMsg>(data)?)
        },
        MessageType::PlayerRemoved => {
            ServerMessage::PlayerRemoved(decode_payload::<PlayerRemovedMsg>(data)?)
        },
        MessageType::RemovedFromRoom => {
            ServerMessage::RemovedFromRoom(decode_payload::<RemovedFromRoomMsg>(data)?)
        },
        MessageType::PlayerLeft => {
            ServerMessage::PlayerLeft(decode_payload::<PlayerLeftMsg>(data)?)
        },
        MessageType::PlayerDisconnected => {
            ServerMessage::PlayerDisconnected(decode_payload::<PlayerDisconnectedMsg>(data)?)
        },
        MessageType::PlayerReconnected => {
            ServerMessage::PlayerReconnected(decode_payload::<PlayerReconnectedMsg>(data)?)
        },
        MessageType::RolesUpdated => {
            ServerMessage::RolesUpdated(decode_payload::<RolesUpdatedMsg>(data)?)
        },
        MessageType::RoomClosed => {
            ServerMessage::RoomClosed(decode_payload::<RoomClosedMsg>(data)?)
        },
        MessageType::GameStarted => {
            ServerMessage::GameStarted(decode_payload::<GameStartedMsg>(data)?)
        },
        MessageType::QuestionSelected => {
            ServerMessage::QuestionSelected(decode_payload::<QuestionSelectedMsg>(data)?)
        },
        MessageType::QuestionAnswer => {
            ServerMessage::QuestionAnswer(decode_payload::<QuestionAnswerMsg>(data)?)
        },
        MessageType::AnsweringAllowed => {
            ServerMessage::AnsweringAllowed(decode_payload::<AnsweringAllowedMsg>(data)?)
        },
        MessageType::PlayerAnswering => {
            ServerMessage::PlayerAnswering(decode_payload::<PlayerAnsweringMsg>(data)?)
        },
        MessageType::AnswerJudged => {
            ServerMessage::AnswerJudged(decode_payload::<AnswerJudgedMsg>(data)?)
        },
        MessageType::QuestionSkipped => {
            ServerMessage::QuestionSkipped(decode_payload::<QuestionSkippedMsg>(data)?)
        },
        MessageType::NextTurn => ServerMessage::NextTurn(decode_payload::<NextTurnMsg>(data)?),
        MessageType::ScoreAdjusted => {
            ServerMessage::ScoreAdjusted(decode_payload::<ScoreAdjustedMsg>(data)?)
        },
        MessageType::GameCompleted => {
            ServerMessage::GameCompleted(decode_payload::<GameCompletedMsg>(data)?)
        },
        MessageType::Error => ServerMessage::Error(decode_payload::<ErrorMsg>(data)?),
        _ => return Err(ProtocolError::UnknownMessageType(data[0])),
    };
    Ok(msg)
}
