//! Shared engine state
//!
//! Written by the transition controller, read by the facade for snapshots.
//! Uses RwLock for concurrent read access with rare writes; the two flags
//! are atomics so the snapshot never waits on a transition.

use ambient_common::events::{AmbientEvent, AudioState, PoolContext};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};

/// Buffered events per subscriber before the oldest are dropped
const EVENT_CAPACITY: usize = 100;

/// Track that is currently loaded
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentTrack {
    pub path: String,
    pub display_name: String,
    pub context: PoolContext,
}

pub struct SharedState {
    /// Which foreground stream is audible
    pub audio_state: RwLock<AudioState>,

    /// Currently loaded track (None while idle or between tracks)
    pub current_track: RwLock<Option<CurrentTrack>>,

    /// A transition is in progress (busy flag)
    transitioning: AtomicBool,

    /// Graph construction failed; operations are silent no-ops
    degraded: AtomicBool,

    pub event_tx: broadcast::Sender<AmbientEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            audio_state: RwLock::new(AudioState::Idle),
            current_track: RwLock::new(None),
            transitioning: AtomicBool::new(false),
            degraded: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: AmbientEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AmbientEvent> {
        self.event_tx.subscribe()
    }

    pub async fn get_audio_state(&self) -> AudioState {
        *self.audio_state.read().await
    }

    /// Set the audio state, broadcasting `AudioStateChanged` if it changed
    pub async fn set_audio_state(&self, new_state: AudioState) {
        let old_state = {
            let mut state = self.audio_state.write().await;
            std::mem::replace(&mut *state, new_state)
        };
        if old_state != new_state {
            self.broadcast_event(AmbientEvent::AudioStateChanged {
                old_state,
                new_state,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    pub async fn get_current_track(&self) -> Option<CurrentTrack> {
        self.current_track.read().await.clone()
    }

    pub async fn set_current_track(&self, track: Option<CurrentTrack>) {
        *self.current_track.write().await = track;
    }

    pub fn is_transitioning(&self) -> bool {
        self.transitioning.load(Ordering::Acquire)
    }

    pub fn set_transitioning(&self, busy: bool) {
        self.transitioning.store(busy, Ordering::Release);
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Returns the previous value
    pub fn set_degraded(&self, degraded: bool) -> bool {
        self.degraded.swap(degraded, Ordering::AcqRel)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
