//! Session persistence behind a trait so rooms don't care where records live.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use quizboard_core::error::GameError;
use quizboard_core::session::Session;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session store lock poisoned")]
    Poisoned,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        GameError::Internal(err.to_string())
    }
}

/// Durable home of [`Session`] records, keyed by session id.
///
/// A room actor only commits an action after `save` succeeds, so a failed
/// write leaves both the store and the live room on the previous state.
/// Disconnects are the exception: they apply regardless and reach the store
/// with the next successful write.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> Result<(), StoreError>;
    fn load(&self, id: Uuid) -> Result<Option<Session>, StoreError>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process store. Active records live until their room retires; retired
/// ones are kept for lookups up to a fixed count, oldest dropped first.
#[derive(Debug)]
pub struct MemorySessionStore {
    records: RwLock<Records>,
    retired_capacity: usize,
}

#[derive(Debug, Default)]
struct Records {
    sessions: HashMap<Uuid, Session>,
    /// Retired ids in retirement order.
    retired: VecDeque<Uuid>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::with_retired_capacity(1024)
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retired_capacity(retired_capacity: usize) -> Self {
        Self {
            records: RwLock::new(Records::default()),
            retired_capacity,
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.sessions.insert(session.id, session.clone());
        if !session.is_active && !records.retired.contains(&session.id) {
            records.retired.push_back(session.id);
            while records.retired.len() > self.retired_capacity {
                if let Some(oldest) = records.retired.pop_front() {
                    records.sessions.remove(&oldest);
                }
            }
        }
        Ok(())
    }

    fn load(&self, id: Uuid) -> Result<Option<Session>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.sessions.get(&id).cloned())
    }

    fn len(&self) -> usize {
        self.records
            .read()
            .map(|r| r.sessions.len())
            .unwrap_or_default()
    }
}
