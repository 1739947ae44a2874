//! Playback session
//!
//! The session describes what the controller believes is loaded and audible.
//! Its id is bumped on every transition; anything tagged with an older id
//! (end-of-stream notifications, load results, ramps) is stale.

use crate::library::Track;
use ambient_common::events::{AudioState, PoolContext};
use std::sync::Arc;

/// Monotonic transition identifier
pub type SessionId = u64;

#[derive(Debug, Clone, Default)]
pub struct PlaybackSession {
    pub id: SessionId,

    /// Track whose source is currently in the graph (possibly fading out)
    pub current_track: Option<Arc<Track>>,

    pub state: AudioState,

    /// Weather loudness of the active pool (1.0 for music)
    pub volume_modifier: f32,

    /// Pool the controller is dealing from; `None` once stopped
    pub active_context: Option<PoolContext>,
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self {
            volume_modifier: 1.0,
            ..Default::default()
        }
    }

    /// Start a new transition and return its id
    pub fn advance(&mut self) -> SessionId {
        self.id += 1;
        self.id
    }

    /// True if `id` belongs to the current transition
    pub fn is_current(&self, id: SessionId) -> bool {
        id == self.id
    }

    /// A source is in the graph and may be audible
    pub fn is_audible(&self) -> bool {
        self.current_track.is_some()
    }

    /// Path of the loaded track
    pub fn current_track_path(&self) -> Option<&str> {
        self.current_track.as_ref().map(|t| t.path.as_str())
    }
}
