/// Configuration system for logmill
///
/// Supports loading from multiple sources with priority:
/// CLI args > Environment variables > Config file > Defaults
use crate::error::{ConfigError, LogmillError};
use crate::filters::Filters;
use crate::timing::TimingHook;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// User and file filters
    #[serde(default)]
    pub filters: FilterConfig,

    /// Source and merge behaviour
    #[serde(default)]
    pub sources: SourceConfig,

    /// Timing instrumentation
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Regex allow/deny lists for usernames and file paths
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilterConfig {
    /// Commits by matching users are dropped
    #[serde(default)]
    pub user_deny: Vec<String>,

    /// If non-empty, only commits by matching users are kept
    #[serde(default)]
    pub user_allow: Vec<String>,

    /// Matching files are never added to a commit
    #[serde(default)]
    pub file_deny: Vec<String>,

    /// If non-empty, only matching files are added to a commit
    #[serde(default)]
    pub file_allow: Vec<String>,
}

/// Source and merge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Capacity of each live repository channel (0 = unbounded)
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Pause between walks once a live repository has caught up, in milliseconds
    #[serde(default = "default_idle_pause_ms")]
    pub idle_pause_ms: u64,

    /// Keep tailing live repositories after the first complete walk
    #[serde(default = "default_follow")]
    pub follow: bool,

    /// Walk repositories in-process; when off, `git log` output is read instead
    #[serde(default = "default_live")]
    pub live: bool,

    /// Parse attempts when looking for a commit at a seek position
    #[serde(default = "default_find_attempts")]
    pub find_attempts: usize,

    /// Demote a silent source to best-effort after this many seconds
    #[serde(default)]
    pub stale_timeout_secs: Option<u64>,
}

/// Timing instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimingConfig {
    /// Report hot-path durations as trace events
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_channel_capacity() -> usize {
    4
}

fn default_idle_pause_ms() -> u64 {
    250
}

fn default_follow() -> bool {
    true
}

fn default_live() -> bool {
    true
}

fn default_find_attempts() -> usize {
    500
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            idle_pause_ms: default_idle_pause_ms(),
            follow: default_follow(),
            live: default_live(),
            find_attempts: default_find_attempts(),
            stale_timeout_secs: None,
        }
    }
}

impl SourceConfig {
    pub fn idle_pause(&self) -> Duration {
        Duration::from_millis(self.idle_pause_ms)
    }

    pub fn stale_timeout(&self) -> Option<Duration> {
        self.stale_timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, LogmillError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()).into());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, LogmillError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::info!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), LogmillError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), LogmillError> {
        if self.sources.idle_pause_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sources.idle_pause_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.sources.find_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "sources.find_attempts".to_string(),
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        if self.sources.stale_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "sources.stale_timeout_secs".to_string(),
                reason: "must be greater than 0 when set".to_string(),
            }
            .into());
        }

        // Every pattern must compile
        self.compile_filters()?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(capacity) = std::env::var("LOGMILL_CHANNEL_CAPACITY")
            && let Ok(capacity) = capacity.parse()
        {
            self.sources.channel_capacity = capacity;
        }

        if let Ok(pause) = std::env::var("LOGMILL_IDLE_PAUSE_MS")
            && let Ok(pause) = pause.parse()
        {
            self.sources.idle_pause_ms = pause;
        }

        if let Ok(follow) = std::env::var("LOGMILL_FOLLOW")
            && let Some(follow) = parse_bool(&follow)
        {
            self.sources.follow = follow;
        }

        if let Ok(live) = std::env::var("LOGMILL_LIVE")
            && let Some(live) = parse_bool(&live)
        {
            self.sources.live = live;
        }

        if let Ok(timeout) = std::env::var("LOGMILL_STALE_TIMEOUT_SECS")
            && let Ok(timeout) = timeout.parse()
        {
            self.sources.stale_timeout_secs = Some(timeout);
        }

        if let Ok(timing) = std::env::var("LOGMILL_TIMING")
            && let Some(enabled) = parse_bool(&timing)
        {
            self.timing.enabled = enabled;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, LogmillError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Compile the filter lists into the predicate object sources use
    pub fn compile_filters(&self) -> Result<Filters, ConfigError> {
        Filters::new(
            &self.filters.user_deny,
            &self.filters.user_allow,
            &self.filters.file_deny,
            &self.filters.file_allow,
        )
    }

    /// Timing hook, if instrumentation is enabled
    pub fn timing_hook(&self) -> Option<TimingHook> {
        self.timing.enabled.then(TimingHook::tracing)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
