//! Load failure recovery
//!
//! Decides what happens after a failed `load_and_play` (or a stream that
//! breaks after starting). Retries are bounded so a systemically broken
//! asset set cannot turn into an endless load loop:
//! - `LoadFailed`: advance the deck and try again, at most `max_retries`
//!   extra attempts, and only if the pool has another track to offer
//! - `PlayRejected`: never retried; the runtime, not the track, is refusing

use crate::error::PlaybackError;
use tracing::debug;

/// Outcome of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Draw the next deck track and load it
    Retry,
    /// Settle at Idle
    GiveUp,
}

#[derive(Debug, Clone, Copy)]
pub struct ErrorRecovery {
    max_retries: u32,
}

impl ErrorRecovery {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Decide after attempt number `attempt` (0 = first try) failed
    pub fn decide(&self, error: &PlaybackError, attempt: u32, pool_len: usize) -> RecoveryAction {
        let action = match error {
            PlaybackError::PlayRejected { .. } => RecoveryAction::GiveUp,
            PlaybackError::LoadFailed { .. } if pool_len < 2 => RecoveryAction::GiveUp,
            PlaybackError::LoadFailed { .. } if attempt >= self.max_retries => RecoveryAction::GiveUp,
            PlaybackError::LoadFailed { .. } => RecoveryAction::Retry,
        };
        debug!(
            "Recovery for {} (attempt {}, pool {}): {:?}",
            error.path(),
            attempt,
            pool_len,
            action
        );
        action
    }
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new(1)
    }
}
