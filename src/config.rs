//! Engine and backend configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::api::ErrorCode;
use crate::consts::{DEFAULT_AUTOSAVE_MS, DEFAULT_MAX_HISTORY, DEFAULT_PLACEMENT_ATTEMPTS, DEFAULT_PLACEMENT_STEP};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {key}")]
    Missing { key: &'static str },
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::Invalid { .. } => "E_CONFIG_INVALID",
        }
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Tunables for one board session.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_history: usize,
    pub autosave_delay: Duration,
    pub placement_step: f64,
    pub placement_attempts: usize,
    /// Demo or sandboxed session: nothing is persisted.
    pub read_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            autosave_delay: Duration::from_millis(DEFAULT_AUTOSAVE_MS),
            placement_step: DEFAULT_PLACEMENT_STEP,
            placement_attempts: DEFAULT_PLACEMENT_ATTEMPTS,
            read_only: false,
        }
    }
}

impl EngineConfig {
    /// Build from environment variables. Unparseable values fall back to defaults.
    ///
    /// - `COSTBOARD_MAX_HISTORY`: default 50
    /// - `COSTBOARD_AUTOSAVE_MS`: default 3000
    /// - `COSTBOARD_PLACEMENT_STEP`: default 20.0
    /// - `COSTBOARD_PLACEMENT_ATTEMPTS`: default 50
    /// - `COSTBOARD_READ_ONLY`: `1`/`true`/`yes` enables, default off
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            max_history: parse_or(&lookup, "COSTBOARD_MAX_HISTORY", DEFAULT_MAX_HISTORY),
            autosave_delay: Duration::from_millis(parse_or(&lookup, "COSTBOARD_AUTOSAVE_MS", DEFAULT_AUTOSAVE_MS)),
            placement_step: parse_or(&lookup, "COSTBOARD_PLACEMENT_STEP", DEFAULT_PLACEMENT_STEP),
            placement_attempts: parse_or(&lookup, "COSTBOARD_PLACEMENT_ATTEMPTS", DEFAULT_PLACEMENT_ATTEMPTS),
            read_only: lookup("COSTBOARD_READ_ONLY").is_some_and(|v| parse_flag(&v)),
        }
    }
}

// =============================================================================
// BACKEND
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Where and as whom to reach the board backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    pub session_token: Option<String>,
    pub timeouts: ApiTimeouts,
}

impl ApiConfig {
    /// Build from environment variables.
    ///
    /// Required:
    /// - `COSTBOARD_API_URL`
    ///
    /// Optional:
    /// - `COSTBOARD_SESSION_TOKEN`: bearer token
    /// - `COSTBOARD_REQUEST_TIMEOUT_SECS`: default 30
    /// - `COSTBOARD_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the URL is missing or not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_var)
    }

    /// Build from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key = "COSTBOARD_API_URL";
        let raw = lookup(key).ok_or(ConfigError::Missing { key })?;
        let base_url = raw.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid { key, value: raw });
        }

        let session_token = lookup("COSTBOARD_SESSION_TOKEN").filter(|t| !t.trim().is_empty());
        let timeouts = ApiTimeouts {
            request_secs: parse_or(&lookup, "COSTBOARD_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "COSTBOARD_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { base_url, session_token, timeouts })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn env_var(key: &str) -> Option<String> {
    // Unset and non-UTF-8 both mean "use the default".
    std::env::var(key).ok()
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match lookup(key).map(|v| v.trim().parse::<T>()) {
        Some(Ok(value)) => value,
        _ => default,
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
