use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub connections: ConnectionInfo,
    pub rooms: RoomInfo,
}

#[derive(Serialize)]
pub struct ConnectionInfo {
    pub websocket: usize,
}

#[derive(Serialize)]
pub struct RoomInfo {
    pub active: usize,
    /// Session records held by the store, including retired ones.
    pub stored_sessions: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let websocket = state.ws_connection_count.load(Ordering::Relaxed);
    let active = state.rooms.read().await.len();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        connections: ConnectionInfo { websocket },
        rooms: RoomInfo {
            active,
            stored_sessions: state.store.len(),
        },
    })
}

/// Readiness: the catalog must have something to play.
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.catalog.list().is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, "not ready: quiz catalog is empty");
    }
    (StatusCode::OK, "ready")
}
