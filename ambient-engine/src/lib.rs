//! # Ambient Engine Library (ambient-engine)
//!
//! Orchestrates a single foreground ambient audio stream whose content is
//! chosen by context signals (weather, season, music genre).
//!
//! **Purpose:** Select pools from the track library, deal tracks from a
//! non-repeating deck, crossfade between them on a persistent
//! filter/gain graph, and recover from load failures, all behind the
//! [`AmbientEngine`] facade.
//!
//! **Architecture:** One controller task owns the audio graph; the facade
//! talks to it over a channel. Audio I/O sits behind [`audio::AudioBackend`].

pub mod audio;
pub mod engine;
pub mod eq;
pub mod error;
pub mod library;
pub mod playback;
pub mod preferences;
pub mod state;

pub use engine::{AmbientEngine, EngineBuilder, EngineSnapshot};
pub use error::{Error, Result};
pub use state::SharedState;
