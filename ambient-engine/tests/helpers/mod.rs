//! Test helpers for ambient-engine integration tests
//!
//! Provides:
//! - TestEngine: an engine wired to a SimulatedBackend with a fixed seed
//! - settle / drain_events: drive the paused clock and collect events

#![allow(dead_code)]

use ambient_common::events::AmbientEvent;
use ambient_common::Ramp;
use ambient_engine::audio::simulated::SimulatedBackend;
use ambient_engine::audio::GraphParam;
use ambient_engine::preferences::{MemoryPreferenceStore, PreferenceStore, Preferences};
use ambient_engine::{AmbientEngine, EngineBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const SEED: u64 = 0x5eed;

/// Longer than any fade window with default timing
pub const SETTLE: Duration = Duration::from_millis(1_000);

pub const JAZZ_BLUE_ROOM: &str = "sounds/music/jazz-blue-room.mp3";
pub const JAZZ_LATE_SET: &str = "sounds/music/jazz-late-set.mp3";
pub const JAZZ_BRUSHES: &str = "sounds/music/jazz-brushes.mp3";

pub struct TestEngine {
    pub engine: AmbientEngine,
    pub backend: SimulatedBackend,
}

impl TestEngine {
    /// Default preferences, builtin library, shuffle on
    pub fn start() -> Self {
        Self::start_with(|builder| builder)
    }

    /// Shuffle off so deck order equals catalog order
    pub fn start_unshuffled() -> Self {
        Self::with_preferences(Preferences {
            shuffle_enabled: false,
            ..Default::default()
        })
    }

    pub fn with_preferences(preferences: Preferences) -> Self {
        Self::with_store(Box::new(MemoryPreferenceStore::with(preferences)))
    }

    pub fn with_store(store: Box<dyn PreferenceStore>) -> Self {
        Self::start_with(|builder| builder.preference_store(store))
    }

    /// Backend set up before the engine exists
    pub fn with_backend(backend: SimulatedBackend) -> Self {
        let engine = AmbientEngine::builder()
            .backend(Arc::new(backend.clone()))
            .seed(SEED)
            .build();
        Self { engine, backend }
    }

    /// Prepared backend and shuffle off
    pub fn start_with_backend_unshuffled(backend: SimulatedBackend) -> Self {
        let store = MemoryPreferenceStore::with(Preferences {
            shuffle_enabled: false,
            ..Default::default()
        });
        let engine = AmbientEngine::builder()
            .backend(Arc::new(backend.clone()))
            .preference_store(Box::new(store))
            .seed(SEED)
            .build();
        Self { engine, backend }
    }

    pub fn start_with(configure: impl FnOnce(EngineBuilder) -> EngineBuilder) -> Self {
        let backend = SimulatedBackend::new();
        let builder = AmbientEngine::builder()
            .backend(Arc::new(backend.clone()))
            .seed(SEED);
        let engine = configure(builder).build();
        Self { engine, backend }
    }

    /// Gain ramps scheduled so far
    pub fn gain_ramps(&self) -> Vec<Ramp> {
        self.backend.ramps(GraphParam::Gain)
    }

    /// Gain ramps that make a track audible
    pub fn fade_ins(&self) -> Vec<Ramp> {
        self.gain_ramps().into_iter().filter(|r| r.to > 0.0).collect()
    }
}

/// Let the controller run until every pending fade and load has finished
pub async fn settle() {
    tokio::time::sleep(SETTLE).await;
}

/// Let the controller handle queued commands without letting fades finish
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

pub fn drain_events(rx: &mut broadcast::Receiver<AmbientEvent>) -> Vec<AmbientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn event_names(events: &[AmbientEvent]) -> Vec<&'static str> {
    events.iter().map(|e| e.name()).collect()
}

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
