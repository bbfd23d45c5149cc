/// Service configuration
use crate::error::{Result, ServiceError};
use pony_playback::{PlayMode, PlaybackConfig, MAX_PROGRESS_INTERVAL, MIN_PROGRESS_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "pony.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,

    #[serde(default = "default_notification")]
    pub notification: NotificationSettings,

    #[serde(default = "default_logging")]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    #[serde(default)]
    pub play_mode: PlayMode,

    /// Applied to both channels
    #[serde(default = "default_volume")]
    pub volume: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Render the compact custom layout instead of the system template
    #[serde(default)]
    pub custom_layout: bool,

    #[serde(default = "default_enabled")]
    pub load_covers: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directives, overridden by `RUST_LOG`
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl ServiceConfig {
    /// Load configuration from `pony.toml` (if present) and environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from `path` (or `pony.toml`) and environment
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        Self::build(path, None)
    }

    /// Like [`ServiceConfig::load_from`], with environment variables taken
    /// from `env` instead of the process
    pub fn load_with_env(path: Option<&Path>, env: config::Map<String, String>) -> Result<Self> {
        Self::build(path, Some(env))
    }

    fn build(path: Option<&Path>, env: Option<config::Map<String, String>>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ServiceError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (PONY_PLAYBACK__PLAY_MODE=shuffle)
        settings = settings.add_source(
            config::Environment::with_prefix("PONY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let interval = Duration::from_millis(self.playback.progress_interval_ms);
        if interval < MIN_PROGRESS_INTERVAL || interval > MAX_PROGRESS_INTERVAL {
            return Err(ServiceError::Config(format!(
                "playback.progress_interval_ms must be between {} and {} (got {})",
                MIN_PROGRESS_INTERVAL.as_millis(),
                MAX_PROGRESS_INTERVAL.as_millis(),
                self.playback.progress_interval_ms
            )));
        }

        if !(0.0..=1.0).contains(&self.playback.volume) {
            return Err(ServiceError::Config(format!(
                "playback.volume must be between 0.0 and 1.0 (got {})",
                self.playback.volume
            )));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ServiceError::Config(
                "logging.filter must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Engine configuration derived from the playback section
    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            progress_interval: Duration::from_millis(self.playback.progress_interval_ms),
            play_mode: self.playback.play_mode,
            volume: (self.playback.volume, self.playback.volume),
            ..PlaybackConfig::default()
        }
    }
}

// Default values
fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        progress_interval_ms: default_progress_interval_ms(),
        play_mode: PlayMode::default(),
        volume: default_volume(),
    }
}

fn default_progress_interval_ms() -> u64 {
    300
}

fn default_volume() -> f32 {
    1.0
}

fn default_notification() -> NotificationSettings {
    NotificationSettings {
        enabled: default_enabled(),
        custom_layout: false,
        load_covers: default_enabled(),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_logging() -> LoggingSettings {
    LoggingSettings {
        filter: default_filter(),
    }
}

fn default_filter() -> String {
    "pony_service=info,pony_playback=info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            playback: default_playback(),
            notification: default_notification(),
            logging: default_logging(),
        }
    }
}
