use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::kernel::gate::CooldownPolicy;

pub const DEFAULT_MIN_INTERVAL_MS: u64 = 120_000;
pub const DEFAULT_MAX_PER_SESSION: u32 = 6;
pub const DEFAULT_WINDOW_SECS: u64 = 90;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_EXCERPT_CHARS: usize = 600;
pub const DEFAULT_TELEMETRY_EVENTS: usize = 10_000;

pub const API_KEY_VAR: &str = "NUDGE_LLM_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub cooldown: CooldownPolicy,
    pub max_per_session: u32,
    /// Horizon of the attention sample buffer.
    pub window_secs: u64,
    /// Hard bound on one reasoning-service call.
    pub call_timeout_ms: u64,
    pub cycle_interval_secs: u64,
    pub excerpt_chars: usize,
    /// Bound on the in-memory diagnostic event buffer.
    pub telemetry_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown: CooldownPolicy::default(),
            max_per_session: DEFAULT_MAX_PER_SESSION,
            window_secs: DEFAULT_WINDOW_SECS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            cycle_interval_secs: DEFAULT_CYCLE_INTERVAL_SECS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            telemetry_events: DEFAULT_TELEMETRY_EVENTS,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but reads through `lookup`, so tests need not touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            cooldown: CooldownPolicy {
                min_interval_ms: parse_or(&lookup, "NUDGE_MIN_INTERVAL_MS", defaults.cooldown.min_interval_ms)?,
                critical_bypass: parse_bool_or(&lookup, "NUDGE_CRITICAL_BYPASS", defaults.cooldown.critical_bypass)?,
            },
            max_per_session: parse_or(&lookup, "NUDGE_MAX_PER_SESSION", defaults.max_per_session)?,
            window_secs: parse_or(&lookup, "NUDGE_WINDOW_SECS", defaults.window_secs)?,
            call_timeout_ms: parse_or(&lookup, "NUDGE_CALL_TIMEOUT_MS", defaults.call_timeout_ms)?,
            cycle_interval_secs: parse_or(&lookup, "NUDGE_CYCLE_INTERVAL_SECS", defaults.cycle_interval_secs)?,
            excerpt_chars: parse_or(&lookup, "NUDGE_EXCERPT_CHARS", defaults.excerpt_chars)?,
            telemetry_events: parse_or(&lookup, "NUDGE_TELEMETRY_EVENTS", defaults.telemetry_events)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_secs == 0 {
            return Err(ConfigError::Zero("NUDGE_WINDOW_SECS"));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Zero("NUDGE_CALL_TIMEOUT_MS"));
        }
        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::Zero("NUDGE_CYCLE_INTERVAL_SECS"));
        }
        if self.excerpt_chars == 0 {
            return Err(ConfigError::Zero("NUDGE_EXCERPT_CHARS"));
        }
        if self.telemetry_events == 0 {
            return Err(ConfigError::Zero("NUDGE_TELEMETRY_EVENTS"));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn window_ms(&self) -> u64 {
        self.window_secs.saturating_mul(1000)
    }
}

/// Settings for the HTTP reasoning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            max_tokens: 256,
            temperature: 0.4,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            base_url: lookup("NUDGE_LLM_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key: lookup(API_KEY_VAR).filter(|key| !key.trim().is_empty()),
            max_tokens: parse_or(&lookup, "NUDGE_LLM_MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse_or(&lookup, "NUDGE_LLM_TEMPERATURE", defaults.temperature)?,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { key, value: raw }),
        },
        None => Ok(default),
    }
}
