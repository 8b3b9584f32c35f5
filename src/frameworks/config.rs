use std::{env, time::Duration};

// Runtime/server configuration (not gameplay tuning).

pub fn bind_host() -> String {
    env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

pub fn matchmaker_port() -> u16 {
    env_or("MATCHMAKER_PORT", 9437)
}

pub fn game_port() -> u16 {
    env_or("GAME_PORT", 9438)
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

// Settings shared by handlers and watchdogs; integration tests construct
// these directly instead of going through the environment.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    // Players required to form one game session.
    pub lobby_size: usize,
    // Maximum silence between heartbeats before a queued player is evicted.
    pub heartbeat_timeout: Duration,
    // Board size for new sessions.
    pub num_tiles: u32,
    // How long a session participant may wait before picking a colour.
    pub colour_selection_timeout: Duration,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            lobby_size: env_or("LOBBY_SIZE", 3),
            heartbeat_timeout: Duration::from_secs(env_or("HEARTBEAT_TIMEOUT_SECS", 30)),
            num_tiles: env_or("NUM_TILES", 64),
            colour_selection_timeout: Duration::from_secs(env_or(
                "COLOUR_SELECTION_TIMEOUT_SECS",
                60,
            )),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            lobby_size: 3,
            heartbeat_timeout: Duration::from_secs(30),
            num_tiles: 64,
            colour_selection_timeout: Duration::from_secs(60),
        }
    }
}
