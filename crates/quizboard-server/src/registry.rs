use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use quizboard_core::error::GameError;
use quizboard_core::quiz::Quiz;
use quizboard_core::room::generate_room_code;
use quizboard_core::session::Session;

use crate::config::GameConfig;
use crate::room::{Creator, RoomCommand, RoomSettings, spawn_room};

pub type SharedRegistry = Arc<RwLock<RoomRegistry>>;

/// Address of a running room actor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    /// Session id of the record the actor owns.
    pub id: Uuid,
    pub code: String,
    pub tx: mpsc::Sender<RoomCommand>,
}

/// Active rooms by code. Entries exist exactly as long as their actor runs.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomHandle>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Remove `code` only if it still belongs to session `id`; a code may
    /// have been reissued to a newer room.
    fn remove_if(&mut self, code: &str, id: Uuid) -> bool {
        if self.rooms.get(code).is_some_and(|h| h.id == id) {
            self.rooms.remove(code);
            true
        } else {
            false
        }
    }

    fn unique_code(&self, attempts: usize) -> Result<String, GameError> {
        (0..attempts)
            .map(|_| generate_room_code())
            .find(|code| !self.rooms.contains_key(code))
            .ok_or(GameError::CodeGenerationFailed)
    }
}

/// Create a room for `quiz` with the creator seated as `host_player`, persist
/// it and start its actor. The registry entry is dropped when the actor exits.
pub async fn create_room(
    registry: &SharedRegistry,
    quiz: Arc<Quiz>,
    nickname: &str,
    creator: Creator,
    game: &GameConfig,
    settings: RoomSettings,
) -> Result<RoomHandle, GameError> {
    let mut rooms = registry.write().await;
    let code = rooms.unique_code(game.code_generation_attempts)?;
    let session = Session::new(
        code.clone(),
        quiz.id.clone(),
        creator.connection,
        nickname,
        game.seat_policy(),
    )?;
    settings.store.save(&session)?;

    let id = session.id;
    let (tx, task) = spawn_room(session, quiz, creator, settings);
    let handle = RoomHandle {
        id,
        code: code.clone(),
        tx,
    };
    rooms.rooms.insert(code.clone(), handle.clone());
    drop(rooms);

    let registry = Arc::clone(registry);
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::error!(room = %code, error = %e, "Room actor panicked");
        }
        if registry.write().await.remove_if(&code, id) {
            tracing::debug!(room = %code, "Room unregistered");
        }
    });

    Ok(handle)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::store::{MemorySessionStore, SessionStore};
    use quizboard_core::test_helpers::make_quiz;

    fn settings(store: Arc<dyn SessionStore>) -> RoomSettings {
        RoomSettings {
            answer_delay: Duration::from_millis(10),
            idle_timeout: Duration::from_secs(60),
            command_buffer: 8,
            store,
        }
    }

    fn creator(connection: u64) -> Creator {
        let (sender, _rx) = mpsc::channel(8);
        let (evict, _evicted) = oneshot::channel();
        Creator {
            connection,
            sender,
            evict,
        }
    }

    #[tokio::test]
    async fn create_registers_and_persists() {
        let registry: SharedRegistry = Arc::new(RwLock::new(RoomRegistry::new()));
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let quiz = Arc::new(make_quiz(1, 1));

        let handle = create_room(
            &registry,
            quiz,
            "Alice",
            creator(1),
            &GameConfig::default(),
            settings(Arc::clone(&store)),
        )
        .await
        .unwrap();

        assert!(quizboard_core::room::is_valid_room_code(&handle.code));
        assert_eq!(registry.read().await.get(&handle.code).unwrap().id, handle.id);
        let stored = store.load(handle.id).unwrap().unwrap();
        assert_eq!(stored.code, handle.code);
        assert_eq!(stored.quiz_id, "quiz-1x1");
    }

    #[tokio::test]
    async fn invalid_nickname_creates_nothing() {
        let registry: SharedRegistry = Arc::new(RwLock::new(RoomRegistry::new()));
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

        let err = create_room(
            &registry,
            Arc::new(make_quiz(1, 1)),
            "   ",
            creator(1),
            &GameConfig::default(),
            settings(Arc::clone(&store)),
        )
        .await
        .unwrap_err();
        assert_eq!(err, GameError::InvalidNickname);
        assert!(registry.read().await.is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn exhausted_code_attempts_fail() {
        let registry: SharedRegistry = Arc::new(RwLock::new(RoomRegistry::new()));
        let game = GameConfig {
            code_generation_attempts: 0,
            ..GameConfig::default()
        };
        let err = create_room(
            &registry,
            Arc::new(make_quiz(1, 1)),
            "Alice",
            creator(1),
            &game,
            settings(Arc::new(MemorySessionStore::new())),
        )
        .await
        .unwrap_err();
        assert_eq!(err, GameError::CodeGenerationFailed);
    }

    #[tokio::test]
    async fn actor_exit_unregisters_room() {
        let registry: SharedRegistry = Arc::new(RwLock::new(RoomRegistry::new()));
        let handle = create_room(
            &registry,
            Arc::new(make_quiz(1, 1)),
            "Alice",
            creator(1),
            &GameConfig::default(),
            settings(Arc::new(MemorySessionStore::new())),
        )
        .await
        .unwrap();

        handle
            .tx
            .send(RoomCommand::Disconnect { connection: 1 })
            .await
            .unwrap();

        for _ in 0..50 {
            if registry.read().await.get(&handle.code).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("room {} was never unregistered", handle.code);
    }

    #[test]
    fn remove_if_checks_session_id() {
        let mut registry = RoomRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let id = Uuid::new_v4();
        registry.rooms.insert(
            "ABC123".to_string(),
            RoomHandle {
                id,
                code: "ABC123".to_string(),
                tx,
            },
        );
        assert!(!registry.remove_if("ABC123", Uuid::new_v4()));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove_if("ABC123", id));
        assert!(registry.is_empty());
    }
}
