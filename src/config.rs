//! Application-level configuration loading: gameplay delays, identity and leaderboard limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::state::state_machine::{DEFAULT_ADVANCE_DELAY, DEFAULT_RESOLVE_DELAY, Timings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MEMORY_MATCH_CONFIG_PATH";

const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_GUEST_PREFIX: &str = "guest-";
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;
const DEFAULT_SESSION_QUEUE_CAPACITY: usize = 32;
const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Delays handed to every new game state machine.
    pub timings: Timings,
    /// Upper bound for a single score persistence call.
    pub persist_timeout: Duration,
    /// User ids starting with this prefix are local guests and never persisted.
    pub guest_prefix: String,
    /// Leaderboard size when the caller does not ask for one.
    pub leaderboard_default_limit: usize,
    /// Largest leaderboard a caller may request.
    pub leaderboard_max_limit: usize,
    /// Pending commands a session accepts before callers wait.
    pub session_queue_capacity: usize,
    /// Sessions without player activity for this long are closed.
    pub session_idle_ttl: Duration,
    /// Period of the idle session sweep.
    pub session_sweep_interval: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        resolve_delay_ms = app_config.timings.resolve_delay.as_millis(),
                        advance_delay_ms = app_config.timings.advance_delay.as_millis(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; missing keys keep their default value.
    pub fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Clamp a requested leaderboard size into `1..=leaderboard_max_limit`.
    pub fn leaderboard_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.leaderboard_default_limit)
            .clamp(1, self.leaderboard_max_limit.max(1))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    resolve_delay_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    advance_delay_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    persist_timeout_ms: Duration,
    guest_prefix: String,
    leaderboard_default_limit: usize,
    leaderboard_max_limit: usize,
    session_queue_capacity: usize,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    session_idle_ttl_ms: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    session_sweep_interval_ms: Duration,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            resolve_delay_ms: DEFAULT_RESOLVE_DELAY,
            advance_delay_ms: DEFAULT_ADVANCE_DELAY,
            persist_timeout_ms: DEFAULT_PERSIST_TIMEOUT,
            guest_prefix: DEFAULT_GUEST_PREFIX.to_string(),
            leaderboard_default_limit: DEFAULT_LEADERBOARD_LIMIT,
            leaderboard_max_limit: MAX_LEADERBOARD_LIMIT,
            session_queue_capacity: DEFAULT_SESSION_QUEUE_CAPACITY,
            session_idle_ttl_ms: DEFAULT_SESSION_IDLE_TTL,
            session_sweep_interval_ms: DEFAULT_SESSION_SWEEP_INTERVAL,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            timings: Timings {
                resolve_delay: value.resolve_delay_ms,
                advance_delay: value.advance_delay_ms,
            },
            persist_timeout: value.persist_timeout_ms,
            guest_prefix: value.guest_prefix,
            leaderboard_default_limit: value.leaderboard_default_limit,
            leaderboard_max_limit: value.leaderboard_max_limit,
            session_queue_capacity: value.session_queue_capacity.max(1),
            session_idle_ttl: value.session_idle_ttl_ms,
            session_sweep_interval: value
                .session_sweep_interval_ms
                .max(Duration::from_millis(1)),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
