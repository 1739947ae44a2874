//! User preferences and their persistence
//!
//! Sound and music are mutually exclusive, so instead of two booleans the
//! preferences carry a single [`ForegroundStream`]. `sound_enabled` and
//! `music_enabled` are derived from it and can never both be true.
//!
//! Persistence is synchronous key-value storage behind [`PreferenceStore`].
//! Saving happens on every mutation; a failed save is logged by the caller
//! and never interrupts playback.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Which stream the user wants in the foreground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForegroundStream {
    /// User silenced both sound and music
    None,
    #[default]
    Weather,
    Music,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Master volume (0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,

    #[serde(default)]
    pub foreground: ForegroundStream,

    #[serde(default = "default_shuffle")]
    pub shuffle_enabled: bool,
}

fn default_volume() -> f32 {
    0.75
}

fn default_shuffle() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            foreground: ForegroundStream::default(),
            shuffle_enabled: default_shuffle(),
        }
    }
}

impl Preferences {
    pub fn sound_enabled(&self) -> bool {
        self.foreground == ForegroundStream::Weather
    }

    pub fn music_enabled(&self) -> bool {
        self.foreground == ForegroundStream::Music
    }

    /// Clamp out-of-range values read from storage
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
        self
    }
}

/// Synchronous preference persistence
pub trait PreferenceStore: Send + Sync {
    /// Stored preferences, or defaults if nothing usable is stored
    fn load(&self) -> Preferences;

    fn save(&self, preferences: &Preferences) -> Result<()>;
}

/// Preferences in a TOML file
///
/// Writes go to a sibling temp file that is then renamed over the target,
/// so a crash mid-write leaves the previous file intact.
pub struct TomlPreferenceStore {
    path: PathBuf,
}

impl TomlPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for TomlPreferenceStore {
    fn load(&self) -> Preferences {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}, using defaults", self.path.display());
                return Preferences::default();
            }
            Err(e) => {
                warn!(
                    "Failed to read preferences {}: {}. Using defaults.",
                    self.path.display(),
                    e
                );
                return Preferences::default();
            }
        };

        match toml::from_str::<Preferences>(&content) {
            Ok(preferences) => preferences.sanitized(),
            Err(e) => {
                warn!(
                    "Corrupt preferences file {}: {}. Using defaults.",
                    self.path.display(),
                    e
                );
                Preferences::default()
            }
        }
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string(preferences)
            .map_err(|e| Error::Preferences(format!("Failed to serialize preferences: {}", e)))?;

        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store for tests and hosts without storage
#[derive(Default)]
pub struct MemoryPreferenceStore {
    stored: Mutex<Option<Preferences>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `preferences`
    pub fn with(preferences: Preferences) -> Self {
        Self {
            stored: Mutex::new(Some(preferences)),
        }
    }

    /// Last saved value
    pub fn stored(&self) -> Option<Preferences> {
        *self.stored.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> Preferences {
        self.stored().unwrap_or_default()
    }

    fn save(&self, preferences: &Preferences) -> Result<()> {
        *self.stored.lock().unwrap_or_else(|e| e.into_inner()) = Some(*preferences);
        Ok(())
    }
}
