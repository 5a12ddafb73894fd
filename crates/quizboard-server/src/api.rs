use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use quizboard_core::player::Player;
use quizboard_core::quiz::{QuizBoard, QuizId};
use quizboard_core::room::{SessionStatus, is_valid_room_code};

use crate::catalog::QuizSummary;
use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/quizzes
pub async fn list_quizzes(State(state): State<AppState>) -> Json<Vec<QuizSummary>> {
    Json(state.catalog.list())
}

/// GET /api/v1/quizzes/{id}: the board only, never question text or answers.
pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuizBoard>, AppError> {
    state
        .catalog
        .get(&id)
        .map(|quiz| Json(quiz.board()))
        .ok_or_else(|| AppError::NotFound(format!("quiz {id:?} not found")))
}

#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub code: String,
    pub quiz_id: QuizId,
    pub status: SessionStatus,
    pub players: Vec<Player>,
}

/// GET /api/v1/rooms/{code}
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, AppError> {
    let code = code.trim().to_ascii_uppercase();
    if !is_valid_room_code(&code) {
        return Err(AppError::BadRequest(format!("invalid room code {code:?}")));
    }
    let handle = state
        .rooms
        .read()
        .await
        .get(&code)
        .ok_or_else(|| AppError::NotFound(format!("room {code} not found")))?;

    let session = state
        .store
        .load(handle.id)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .filter(|s| s.is_active)
        .ok_or_else(|| AppError::NotFound(format!("room {code} not found")))?;

    Ok(Json(RoomSummary {
        code: session.code,
        quiz_id: session.quiz_id,
        status: session.status,
        players: session.players,
    }))
}
