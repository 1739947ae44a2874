//! Error types for ambient-engine
//!
//! None of these cross the public facade: [`crate::AmbientEngine`] absorbs
//! every failure and reports it only through `AudioState::Idle` and the
//! event stream. They exist so the internals can use `?` and so tests and
//! backends can name failures precisely.

use thiserror::Error;

/// Failure of one `load_and_play` attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Asset could not be fetched or decoded
    #[error("Failed to load {path}: {reason}")]
    LoadFailed { path: String, reason: String },

    /// Runtime refused to start playback (e.g. no user gesture yet)
    #[error("Playback of {path} rejected: {reason}")]
    PlayRejected { path: String, reason: String },
}

impl PlaybackError {
    /// Path of the asset that failed
    pub fn path(&self) -> &str {
        match self {
            PlaybackError::LoadFailed { path, .. } => path,
            PlaybackError::PlayRejected { path, .. } => path,
        }
    }
}

/// Audio graph lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Underlying audio subsystem unavailable
    #[error("Audio graph construction failed: {0}")]
    ConstructionFailed(String),

    /// Graph was released by shutdown
    #[error("Audio graph has been closed")]
    Closed,
}

/// Main error type for ambient-engine
#[derive(Error, Debug)]
pub enum Error {
    /// Shared configuration / parsing errors
    #[error(transparent)]
    Common(#[from] ambient_common::Error),

    /// Preference persistence errors
    #[error("Preference store error: {0}")]
    Preferences(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using ambient-engine Error
pub type Result<T> = std::result::Result<T, Error>;
