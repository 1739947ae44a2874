//! Audio graph
//!
//! Owns the single persistent processing chain on top of an [`AudioBackend`].
//! The filter and gain nodes are built once (lazily, on first use) and reused
//! for every track; only the source is swapped. That keeps ramp automation
//! continuous across track boundaries.
//!
//! **Ramp ownership:** every ramp is tagged with the session that scheduled
//! it. The graph remembers the newest session that claimed it and drops
//! ramps from older ones, so a superseded transition can never write to the
//! gain or filter node after a newer transition has started.

use super::backend::{AudioBackend, ContextStatus, GraphParam, PlaybackStream};
use crate::eq::NEUTRAL_FILTER_HZ;
use crate::error::{GraphError, PlaybackError};
use crate::playback::session::SessionId;
use ambient_common::Ramp;
use futures::future::{self, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Proof that the chain exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphHandle {
    pub status: ContextStatus,
}

/// Last ramp scheduled on one parameter
#[derive(Debug, Clone, Copy)]
struct ParamState {
    ramp: Ramp,
    started: Instant,
}

impl ParamState {
    fn hold(value: f32) -> Self {
        Self {
            ramp: Ramp::hold(value),
            started: Instant::now(),
        }
    }

    fn value_now(&self) -> f32 {
        self.ramp.value_at(self.started.elapsed())
    }
}

/// The persistent source → filter → gain → output chain
pub struct AudioGraph {
    backend: Arc<dyn AudioBackend>,
    handle: Option<GraphHandle>,
    gain: ParamState,
    filter: ParamState,
    owner: SessionId,
    closed: bool,
}

impl AudioGraph {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            handle: None,
            gain: ParamState::hold(0.0),
            filter: ParamState::hold(NEUTRAL_FILTER_HZ),
            owner: 0,
            closed: false,
        }
    }

    /// Build the chain on first use; idempotent
    ///
    /// A suspended context is accepted. It is resumed opportunistically here
    /// and again before every load.
    pub fn ensure_graph(&mut self) -> Result<GraphHandle, GraphError> {
        if self.closed {
            return Err(GraphError::Closed);
        }

        if let Some(handle) = self.handle.as_mut() {
            if handle.status == ContextStatus::Suspended {
                handle.status = self.backend.resume();
            }
            return Ok(*handle);
        }

        let status = self.backend.open()?;
        let status = match status {
            ContextStatus::Suspended => {
                debug!("Audio context created suspended, attempting resume");
                self.backend.resume()
            }
            running => running,
        };
        info!("Audio graph constructed (context {:?})", status);

        self.gain = ParamState::hold(0.0);
        self.filter = ParamState::hold(NEUTRAL_FILTER_HZ);
        let handle = GraphHandle { status };
        self.handle = Some(handle);
        Ok(handle)
    }

    /// True once the chain exists
    #[cfg(test)]
    pub fn is_constructed(&self) -> bool {
        self.handle.is_some()
    }

    /// Make `session` the only session allowed to schedule ramps
    pub fn claim(&mut self, session: SessionId) {
        if session > self.owner {
            self.owner = session;
        }
    }

    /// Ramp the gain to `value` over `ramp`
    ///
    /// Returns false if the ramp was dropped (stale session or no graph).
    pub fn set_gain(&mut self, session: SessionId, value: f32, ramp: Duration) -> bool {
        if !self.accepts(session, GraphParam::Gain) {
            return false;
        }
        let value = value.clamp(0.0, 1.0);
        self.gain = Self::schedule(&*self.backend, GraphParam::Gain, self.gain, value, ramp);
        true
    }

    /// Ramp the low-pass cutoff to `hz` over `ramp`
    pub fn set_filter_frequency(&mut self, session: SessionId, hz: f32, ramp: Duration) -> bool {
        if !self.accepts(session, GraphParam::FilterFrequency) {
            return false;
        }
        let hz = hz.max(10.0);
        self.filter = Self::schedule(
            &*self.backend,
            GraphParam::FilterFrequency,
            self.filter,
            hz,
            ramp,
        );
        true
    }

    /// Start loading `path` into the source slot
    ///
    /// The returned future does not borrow the graph. Dropping it cancels the
    /// load.
    pub fn load_and_play(&mut self, path: &str) -> BoxFuture<'static, Result<PlaybackStream, PlaybackError>> {
        let status = match self.handle.as_mut() {
            Some(handle) => {
                if handle.status == ContextStatus::Suspended {
                    handle.status = self.backend.resume();
                }
                handle.status
            }
            None => {
                return future::ready(Err(PlaybackError::LoadFailed {
                    path: path.to_string(),
                    reason: "audio graph not constructed".to_string(),
                }))
                .boxed();
            }
        };

        if status == ContextStatus::Suspended {
            return future::ready(Err(PlaybackError::PlayRejected {
                path: path.to_string(),
                reason: "audio context is suspended".to_string(),
            }))
            .boxed();
        }

        debug!("Loading {}", path);
        self.backend.load_and_play(path)
    }

    /// Stop and discard the current source, leaving the nodes in place
    pub fn stop_source(&mut self) {
        if self.handle.is_some() {
            self.backend.stop_source();
        }
    }

    /// Stop playback and rewind (used by stop_all)
    pub fn pause_and_reset(&mut self) {
        if self.handle.is_some() {
            self.backend.pause_and_reset();
        }
    }

    /// Release the context; the graph cannot be rebuilt afterwards
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        if self.handle.take().is_some() {
            self.backend.pause_and_reset();
            self.backend.close();
        }
        self.closed = true;
        info!("Audio graph released");
    }

    /// Current (interpolated) gain
    #[cfg(test)]
    pub fn gain(&self) -> f32 {
        self.gain.value_now()
    }

    /// Gain the current ramp is heading to
    #[cfg(test)]
    pub fn gain_target(&self) -> f32 {
        self.gain.ramp.to
    }

    fn accepts(&self, session: SessionId, param: GraphParam) -> bool {
        if self.handle.is_none() {
            return false;
        }
        if session < self.owner {
            warn!(
                "Dropping {:?} ramp from superseded session {} (owner is {})",
                param, session, self.owner
            );
            return false;
        }
        true
    }

    fn schedule(
        backend: &dyn AudioBackend,
        param: GraphParam,
        current: ParamState,
        target: f32,
        duration: Duration,
    ) -> ParamState {
        let ramp = Ramp::new(current.value_now(), target, duration);
        backend.schedule_ramp(param, ramp);
        ParamState {
            ramp,
            started: Instant::now(),
        }
    }
}
