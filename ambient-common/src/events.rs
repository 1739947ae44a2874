//! Event types for the ambient engine event stream

use crate::context::{Genre, SeasonMode, WeatherMode};
use serde::{Deserialize, Serialize};

/// Which foreground stream (if any) is audible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AudioState {
    #[default]
    Idle,
    PlayingWeather,
    PlayingMusic,
}

impl AudioState {
    /// True for either playing state
    pub fn is_playing(&self) -> bool {
        !matches!(self, AudioState::Idle)
    }
}

impl std::fmt::Display for AudioState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioState::Idle => write!(f, "idle"),
            AudioState::PlayingWeather => write!(f, "playing_weather"),
            AudioState::PlayingMusic => write!(f, "playing_music"),
        }
    }
}

/// Context that produced a track pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PoolContext {
    Weather {
        weather: WeatherMode,
        season: SeasonMode,
    },
    Music {
        genre: Genre,
    },
}

/// Ambient engine events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AmbientEvent {
    /// Audio state changed
    AudioStateChanged {
        old_state: AudioState,
        new_state: AudioState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track started playing (after its fade-in was scheduled)
    TrackStarted {
        session_id: u64,
        path: String,
        display_name: String,
        context: PoolContext,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track reached its natural end of stream
    TrackEnded {
        session_id: u64,
        path: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track failed to load or play
    PlaybackFailed {
        session_id: u64,
        path: String,
        reason: String,
        /// True if the engine is trying another track
        retrying: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Master volume changed
    VolumeChanged {
        volume: f32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A user preference changed (sound/music/shuffle toggles)
    PreferencesChanged {
        sound_enabled: bool,
        music_enabled: bool,
        shuffle_enabled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The audio subsystem is unavailable; the engine runs as a silent no-op
    EngineDegraded {
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl AmbientEvent {
    /// Short event name, used for logging
    pub fn name(&self) -> &'static str {
        match self {
            AmbientEvent::AudioStateChanged { .. } => "AudioStateChanged",
            AmbientEvent::TrackStarted { .. } => "TrackStarted",
            AmbientEvent::TrackEnded { .. } => "TrackEnded",
            AmbientEvent::PlaybackFailed { .. } => "PlaybackFailed",
            AmbientEvent::VolumeChanged { .. } => "VolumeChanged",
            AmbientEvent::PreferencesChanged { .. } => "PreferencesChanged",
            AmbientEvent::EngineDegraded { .. } => "EngineDegraded",
        }
    }
}
