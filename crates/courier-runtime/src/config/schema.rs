//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourierConfig {
    /// Bot identity and credentials.
    #[serde(default)]
    pub bot: BotConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-module config sections, keyed by unit name. Passed verbatim to
    /// each module's build function during discovery.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

impl CourierConfig {
    /// Checks the invariants the runtime cannot start without.
    ///
    /// Called before module discovery; a failure here is fatal, unlike the
    /// per-module failures discovery itself tolerates.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.bot.token.trim().is_empty() {
            return Err(ConfigError::missing_field("bot.token"));
        }
        if let Some(username) = &self.bot.username
            && username.trim().is_empty()
        {
            return Err(ConfigError::validation("bot.username must not be empty"));
        }
        Ok(())
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BotConfig {
    /// Platform API token. Required.
    #[serde(default)]
    pub token: String,

    /// The bot's own username, used to resolve `/command@botname`
    /// invocations in group chats.
    #[serde(default)]
    pub username: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Per-target level overrides, e.g. `courier_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            filters: HashMap::new(),
        }
    }
}

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level (default).
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the lowercase name of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Converts to the `tracing` level type.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line compact output (default).
    #[default]
    Compact,
    /// The standard multi-field format.
    Full,
    /// Multi-line human-oriented output.
    Pretty,
}
