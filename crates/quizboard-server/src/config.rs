use std::time::Duration;

use serde::Deserialize;

use quizboard_core::room::SeatPolicy;

/// Top-level server configuration, loaded from `quizboard.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub catalog: CatalogConfig,
    pub limits: LimitsConfig,
    pub game: GameConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            catalog: CatalogConfig::default(),
            limits: LimitsConfig::default(),
            game: GameConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Where quizzes come from. Without a path the built-in sample catalog is used.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: Option<String>,
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    /// Maximum concurrent WebSocket connections per IP address.
    pub max_ws_per_ip: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
    /// Queue depth of each room's command channel.
    pub room_command_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            max_ws_per_ip: 10,
            ws_rate_limit_per_sec: 20.0,
            player_message_buffer: 256,
            room_command_buffer: 64,
        }
    }
}

/// Game rules that are policy rather than protocol.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Reading time between selecting a question and opening buzz-in.
    pub answer_delay_ms: u64,
    pub max_seats_without_host_player: usize,
    pub max_seats_with_host_player: usize,
    /// Random draws attempted before room creation gives up.
    pub code_generation_attempts: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            answer_delay_ms: 3000,
            max_seats_without_host_player: 6,
            max_seats_with_host_player: 5,
            code_generation_attempts: 32,
        }
    }
}

impl GameConfig {
    pub fn answer_delay(&self) -> Duration {
        Duration::from_millis(self.answer_delay_ms)
    }

    pub fn seat_policy(&self) -> SeatPolicy {
        SeatPolicy {
            max_seats_without_host_player: self.max_seats_without_host_player,
            max_seats_with_host_player: self.max_seats_with_host_player,
        }
    }
}

/// Room lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub idle_timeout_secs: u64,
    /// Retired session records kept in memory before the oldest are dropped.
    pub retained_retired_sessions: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            retained_retired_sessions: 1024,
        }
    }
}

impl RoomsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl ServerConfig {
    /// Describe the first fatal problem with this config, if any.
    pub fn problems(&self) -> Option<String> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Some(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        let checks = [
            (self.limits.max_ws_connections == 0, "limits.max_ws_connections must be > 0"),
            (self.limits.max_ws_per_ip == 0, "limits.max_ws_per_ip must be > 0"),
            (self.limits.ws_rate_limit_per_sec <= 0.0, "limits.ws_rate_limit_per_sec must be > 0"),
            (self.limits.player_message_buffer == 0, "limits.player_message_buffer must be > 0"),
            (self.limits.room_command_buffer == 0, "limits.room_command_buffer must be > 0"),
            (
                self.game.max_seats_with_host_player == 0,
                "game.max_seats_with_host_player must be > 0",
            ),
            (
                self.game.max_seats_with_host_player > self.game.max_seats_without_host_player,
                "game.max_seats_with_host_player must not exceed game.max_seats_without_host_player",
            ),
            (
                self.game.code_generation_attempts == 0,
                "game.code_generation_attempts must be > 0",
            ),
            (self.rooms.idle_timeout_secs == 0, "rooms.idle_timeout_secs must be > 0"),
        ];
        checks
            .into_iter()
            .find(|(failed, _)| *failed)
            .map(|(_, msg)| msg.to_string())
    }

    /// Validate configuration, exiting the process on fatal values.
    pub fn validate(&self) {
        if let Some(problem) = self.problems() {
            tracing::error!("{problem}");
            std::process::exit(1);
        }
        if self.game.answer_delay_ms == 0 {
            tracing::warn!("game.answer_delay_ms is 0: buzz-in opens immediately on selection");
        }
    }

    /// Load config from `quizboard.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let path =
            std::env::var("QUIZBOARD_CONFIG").unwrap_or_else(|_| "quizboard.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(%path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(%path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(%path, "No config file found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `QUIZBOARD_*` overrides. `lookup` abstracts the environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = get("QUIZBOARD_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(root) = get("QUIZBOARD_WEB_ROOT") {
            self.web_root = root;
        }
        if let Some(path) = get("QUIZBOARD_CATALOG_PATH") {
            self.catalog.path = Some(path);
        }
        if let Some(n) = get("QUIZBOARD_MAX_WS_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.limits.max_ws_connections = n;
        }
        if let Some(n) = get("QUIZBOARD_WS_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.limits.ws_rate_limit_per_sec = n;
        }
        if let Some(n) = get("QUIZBOARD_ANSWER_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.game.answer_delay_ms = n;
        }
        if let Some(n) = get("QUIZBOARD_IDLE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.rooms.idle_timeout_secs = n;
        }
    }
}
