use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::RwLock;

use quizboard_core::player::ConnectionId;

use crate::catalog::QuizCatalog;
use crate::config::ServerConfig;
use crate::registry::{RoomRegistry, SharedRegistry};
use crate::room::RoomSettings;
use crate::store::SessionStore;

pub type IpConnectionCounts = Arc<Mutex<HashMap<IpAddr, usize>>>;

#[derive(Clone)]
pub struct AppState {
    pub rooms: SharedRegistry,
    pub catalog: Arc<dyn QuizCatalog>,
    pub store: Arc<dyn SessionStore>,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub ws_per_ip: IpConnectionCounts,
    next_connection_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        catalog: Arc<dyn QuizCatalog>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(RoomRegistry::new())),
            catalog,
            store,
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            ws_per_ip: Arc::new(Mutex::new(HashMap::new())),
            next_connection_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Fresh id for a new WebSocket connection. Never reused in-process.
    pub fn alloc_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            answer_delay: self.config.game.answer_delay(),
            idle_timeout: self.config.rooms.idle_timeout(),
            command_buffer: self.config.limits.room_command_buffer,
            store: Arc::clone(&self.store),
        }
    }
}

/// Counts a live WebSocket connection for as long as it is held.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Holds one of an IP's connection slots; released on drop.
pub struct IpConnectionGuard {
    ip: IpAddr,
    counts: IpConnectionCounts,
}

impl IpConnectionGuard {
    /// Take a slot for `ip` unless it already holds `max` connections.
    pub fn try_acquire(ip: IpAddr, counts: IpConnectionCounts, max: usize) -> Option<Self> {
        {
            let mut map = counts.lock().ok()?;
            let current = map.entry(ip).or_insert(0);
            if *current >= max {
                return None;
            }
            *current += 1;
        }
        Some(Self { ip, counts })
    }
}

impl Drop for IpConnectionGuard {
    fn drop(&mut self) {
        let Ok(mut map) = self.counts.lock() else {
            return;
        };
        if let Some(current) = map.get_mut(&self.ip) {
            *current = current.saturating_sub(1);
            if *current == 0 {
                map.remove(&self.ip);
            }
        }
    }
}
