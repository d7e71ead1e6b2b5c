//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file resolved in priority order:
//! 1. Explicit path (command-line argument)
//! 2. `STORY_PLAYER_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/story-player/config.toml`)
//! 4. Compiled defaults
//!
//! A missing file is never fatal: a warning is logged and defaults apply.
//! A file that exists but fails to parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "STORY_PLAYER_CONFIG";

/// Top-level configuration file contents
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Playback tuning (optional)
    #[serde(default)]
    pub playback: PlaybackSettings,

    /// Buffered events per EventBus subscriber
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            playback: PlaybackSettings::default(),
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Playback timing constants
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlaybackSettings {
    /// Display time of an image story, in seconds
    #[serde(default = "default_image_duration")]
    pub image_duration_secs: f64,

    /// Video duration used when neither player nor metadata report one
    #[serde(default = "default_video_fallback_duration")]
    pub video_fallback_duration_secs: f64,

    /// Floor applied to every video duration
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: f64,

    /// Delay after which a story is reported ready even if its media is not local
    #[serde(default = "default_ready_fallback_ms")]
    pub ready_fallback_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            image_duration_secs: default_image_duration(),
            video_fallback_duration_secs: default_video_fallback_duration(),
            min_duration_secs: default_min_duration(),
            ready_fallback_ms: default_ready_fallback_ms(),
        }
    }
}

/// Upper bound for every configured duration
pub const MAX_DURATION_SECS: f64 = 86_400.0;

impl TomlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_bus_capacity == 0 {
            return Err(Error::Config(
                "event_bus_capacity must be at least 1".to_string(),
            ));
        }
        self.playback.validate()
    }
}

impl PlaybackSettings {
    /// Reject values that would produce zero, negative or unrepresentable
    /// timer intervals
    pub fn validate(&self) -> Result<()> {
        check_duration("min_duration_secs", self.min_duration_secs)?;
        check_duration("image_duration_secs", self.image_duration_secs)?;
        check_duration(
            "video_fallback_duration_secs",
            self.video_fallback_duration_secs,
        )?;
        if self.ready_fallback_ms as f64 > MAX_DURATION_SECS * 1000.0 {
            return Err(Error::Config(format!(
                "ready_fallback_ms must not exceed {} ms, got {}",
                MAX_DURATION_SECS * 1000.0,
                self.ready_fallback_ms
            )));
        }
        Ok(())
    }
}

fn check_duration(name: &str, secs: f64) -> Result<()> {
    if !(secs.is_finite() && secs > 0.0 && secs <= MAX_DURATION_SECS) {
        return Err(Error::Config(format!(
            "{} must be in (0, {}], got {}",
            name, MAX_DURATION_SECS, secs
        )));
    }
    Ok(())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_image_duration() -> f64 {
    7.0
}

fn default_video_fallback_duration() -> f64 {
    5.0
}

fn default_min_duration() -> f64 {
    1.0
}

fn default_ready_fallback_ms() -> u64 {
    200
}

/// Resolve which config file to read, if any
///
/// Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("story-player").join("config.toml"))
        .filter(|p| p.exists())
}

/// Parse configuration from TOML text
pub fn parse_config(toml_content: &str) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(toml_content)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration following the resolution priority
///
/// Missing files degrade to defaults with a warning.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        info!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            info!("Loading config from {}", path.display());
            parse_config(&content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(TomlConfig::default())
        }
        Err(e) => Err(Error::Io(e)),
    }
}
