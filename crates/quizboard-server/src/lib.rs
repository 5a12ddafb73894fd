pub mod api;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod error;
pub mod health;
pub mod registry;
pub mod room;
pub mod state;
pub mod store;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use catalog::QuizCatalog;
use config::ServerConfig;
use state::AppState;
use store::{MemorySessionStore, SessionStore};

/// Build the Axum router and application state with an in-memory session store.
pub fn build_app(config: ServerConfig, catalog: Arc<dyn QuizCatalog>) -> (Router<()>, AppState) {
    let store = MemorySessionStore::with_retired_capacity(config.rooms.retained_retired_sessions);
    build_app_with_store(config, catalog, Arc::new(store))
}

/// Build the Axum router around an explicit session store.
pub fn build_app_with_store(
    config: ServerConfig,
    catalog: Arc<dyn QuizCatalog>,
    store: Arc<dyn SessionStore>,
) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config, catalog, store);

    // Read-only JSON API, open to any origin
    let api_routes = Router::new()
        .route("/quizzes", get(api::list_quizzes))
        .route("/quizzes/{id}", get(api::get_quiz))
        .route("/rooms/{code}", get(api::get_room))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        );

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .fallback_service(ServeDir::new(&web_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    (app, state)
}
