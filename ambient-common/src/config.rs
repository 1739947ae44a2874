//! Bootstrap configuration loading
//!
//! The TOML file is optional. Resolution order for its location:
//! 1. Command-line argument (highest priority)
//! 2. `AMBIENT_CONFIG` environment variable
//! 3. Platform config directory (`<config dir>/ambient/config.toml`)
//!
//! A missing file is not an error: the engine logs a warning and starts with
//! compiled defaults. A file that exists but does not parse is a
//! [`Error::Config`], since silently ignoring it would hide a typo.

use crate::context::{Genre, SeasonMode, WeatherMode};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "AMBIENT_CONFIG";

const APP_DIR: &str = "ambient";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Where user preferences are persisted (optional)
    ///
    /// Default: `<config dir>/ambient/preferences.toml`
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,

    /// Fade and retry timing
    #[serde(default)]
    pub timing: TimingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Track catalog. Empty means "use the built-in library".
    #[serde(default)]
    pub tracks: Vec<CatalogEntry>,
}

/// Fade windows and retry bound
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimingConfig {
    /// Fade-out window before a source swap
    #[serde(default = "default_fade_out_ms")]
    pub fade_out_ms: u64,

    /// Fade-in window after a new track starts
    #[serde(default = "default_fade_in_ms")]
    pub fade_in_ms: u64,

    /// Fade-out window for `stop_all`
    #[serde(default = "default_stop_fade_ms")]
    pub stop_fade_ms: u64,

    /// Ramp used when a preference change retargets the live gain
    #[serde(default = "default_volume_ramp_ms")]
    pub volume_ramp_ms: u64,

    /// Ramp used for filter cutoff changes
    #[serde(default = "default_filter_ramp_ms")]
    pub filter_ramp_ms: u64,

    /// Extra load attempts after a failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl TimingConfig {
    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn stop_fade(&self) -> Duration {
        Duration::from_millis(self.stop_fade_ms)
    }

    pub fn volume_ramp(&self) -> Duration {
        Duration::from_millis(self.volume_ramp_ms)
    }

    pub fn filter_ramp(&self) -> Duration {
        Duration::from_millis(self.filter_ramp_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fade_out_ms: default_fade_out_ms(),
            fade_in_ms: default_fade_in_ms(),
            stop_fade_ms: default_stop_fade_ms(),
            volume_ramp_ms: default_volume_ramp_ms(),
            filter_ramp_ms: default_filter_ramp_ms(),
            max_retries: default_max_retries(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// One track in a configured catalog
///
/// Exactly one of `weather` or `genre` must be set. `season` only applies to
/// weather tracks and narrows the track to that season.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub path: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub weather: Option<WeatherMode>,

    #[serde(default)]
    pub season: Option<SeasonMode>,

    #[serde(default)]
    pub genre: Option<Genre>,
}

fn default_fade_out_ms() -> u64 {
    300
}

fn default_fade_in_ms() -> u64 {
    500
}

fn default_stop_fade_ms() -> u64 {
    400
}

fn default_volume_ramp_ms() -> u64 {
    250
}

fn default_filter_ramp_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    1
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Load the config file if it exists, otherwise compiled defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {}", path.display());
                Self::load(path)
            }
            Some(path) => {
                warn!(
                    "Config file {} not found, using compiled defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file location available, using compiled defaults");
                Ok(Self::default())
            }
        }
    }

    /// Preferences file location (configured or platform default)
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(default_preferences_path)
    }
}

/// Resolve the config file location
///
/// Returns `None` only if no CLI path, no env var, and no platform config
/// directory are available.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Platform default for the preferences file
pub fn default_preferences_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("preferences.toml"))
        .unwrap_or_else(|| PathBuf::from("./ambient_preferences.toml"))
}
