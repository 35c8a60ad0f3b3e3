//! Runtime configuration parsed from environment variables.
//!
//! Every knob has a default so the server starts with no environment at all.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ACTIVATION_DELAY_MS: i64 = 10_000;
pub const DEFAULT_FALLBACK_STATEMENT_ID: i64 = 1;
pub const DEFAULT_GHOST_COUNT: usize = 12;
pub const DEFAULT_GHOST_TICK_MS: u64 = 100;
pub const DEFAULT_GHOST_SETTLE_MS: i64 = 2000;
pub const DEFAULT_GHOST_MIN_APPROACH_MS: i64 = 1000;
pub const DEFAULT_SESSION_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_STATEMENTS_BASE_URL: &str = "https://pol.is/api/v3";
pub const DEFAULT_STATEMENTS_FETCH_TIMEOUT_SECS: u64 = 10;

/// Per-room tuning shared by every room the process hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomConfig {
    /// Delay before a queued statement becomes active.
    pub activation_delay_ms: i64,
    /// Statement shown when nothing in the queue has activated yet.
    pub fallback_statement_id: i64,
    /// Ghost cursors spawned when simulation is enabled.
    pub ghost_count: usize,
    /// Simulator tick period.
    pub tick_ms: u64,
    /// Length of the settle blend between approach and idle wander.
    pub settle_ms: i64,
    /// Lower bound for a retargeted approach.
    pub min_approach_ms: i64,
    /// Outbound buffer per websocket connection.
    pub session_channel_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            activation_delay_ms: DEFAULT_ACTIVATION_DELAY_MS,
            fallback_statement_id: DEFAULT_FALLBACK_STATEMENT_ID,
            ghost_count: DEFAULT_GHOST_COUNT,
            tick_ms: DEFAULT_GHOST_TICK_MS,
            settle_ms: DEFAULT_GHOST_SETTLE_MS,
            min_approach_ms: DEFAULT_GHOST_MIN_APPROACH_MS,
            session_channel_capacity: DEFAULT_SESSION_CHANNEL_CAPACITY,
        }
    }
}

impl RoomConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            activation_delay_ms: env_parse("ACTIVATION_DELAY_MS", defaults.activation_delay_ms),
            fallback_statement_id: env_parse("FALLBACK_STATEMENT_ID", defaults.fallback_statement_id),
            ghost_count: env_parse("GHOST_COUNT", defaults.ghost_count),
            tick_ms: env_parse("GHOST_TICK_MS", defaults.tick_ms).max(1),
            settle_ms: env_parse("GHOST_SETTLE_MS", defaults.settle_ms).max(1),
            min_approach_ms: env_parse("GHOST_MIN_APPROACH_MS", defaults.min_approach_ms).max(1),
            session_channel_capacity: env_parse("SESSION_CHANNEL_CAPACITY", defaults.session_channel_capacity).max(1),
        }
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Where and how the external statements listing is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_STATEMENTS_BASE_URL.to_string(),
            timeout_secs: DEFAULT_STATEMENTS_FETCH_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("STATEMENTS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_STATEMENTS_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            base_url,
            timeout_secs: env_parse("STATEMENTS_FETCH_TIMEOUT_SECS", DEFAULT_STATEMENTS_FETCH_TIMEOUT_SECS),
        }
    }
}

/// Top-level process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub room: RoomConfig,
    pub pool: PoolConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, room: RoomConfig::default(), pool: PoolConfig::default() }
    }
}

impl Config {
    /// Build typed config from environment variables.
    ///
    /// - `PORT`: default 3000
    /// - `ACTIVATION_DELAY_MS`: default 10000
    /// - `FALLBACK_STATEMENT_ID`: default 1
    /// - `GHOST_COUNT`, `GHOST_TICK_MS`, `GHOST_SETTLE_MS`, `GHOST_MIN_APPROACH_MS`
    /// - `SESSION_CHANNEL_CAPACITY`: default 256
    /// - `STATEMENTS_BASE_URL`, `STATEMENTS_FETCH_TIMEOUT_SECS`
    #[must_use]
    pub fn from_env() -> Self {
        Self { port: env_parse("PORT", DEFAULT_PORT), room: RoomConfig::from_env(), pool: PoolConfig::from_env() }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
