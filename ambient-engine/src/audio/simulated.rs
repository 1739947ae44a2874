//! In-process simulated backend
//!
//! Produces no sound. Every call is recorded as a [`GraphAction`] so tests
//! (and the demo host) can observe exactly what the engine asked the audio
//! subsystem to do. Failures can be injected per path, and tracks can be
//! given a length after which they end naturally.

use super::backend::{AudioBackend, ContextStatus, GraphParam, PlaybackStream, StreamEnd};
use crate::error::{GraphError, PlaybackError};
use ambient_common::Ramp;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GraphAction {
    Opened,
    Resumed,
    /// Load requested (may still fail or be cancelled)
    Load { path: String },
    /// Load finished and the source is playing
    Started { path: String },
    Ramp { param: GraphParam, ramp: Ramp },
    StopSource,
    PauseAndReset,
    Closed,
}

/// Injected failure for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// `load_and_play` resolves to `LoadFailed`
    Load,
    /// `load_and_play` resolves to `PlayRejected`
    Reject,
    /// Starts, then reports a playback error after the given delay
    MidStream(Duration),
}

struct ActiveSource {
    id: u64,
    path: String,
    end_tx: Option<oneshot::Sender<StreamEnd>>,
}

#[derive(Default)]
struct SimState {
    actions: Vec<GraphAction>,
    failures: HashMap<String, FailureMode>,
    fail_all_loads: bool,
    open_error: Option<String>,
    start_suspended: bool,
    resumable: bool,
    suspended: bool,
    load_latency: Duration,
    track_length: Option<Duration>,
    active: Option<ActiveSource>,
    next_source_id: u64,
}

/// Recording backend used by tests and the demo host
#[derive(Clone, Default)]
pub struct SimulatedBackend {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between a load request and playback start
    pub fn set_load_latency(&self, latency: Duration) {
        self.state().load_latency = latency;
    }

    /// Make every started track end naturally after `length`
    pub fn set_track_length(&self, length: Option<Duration>) {
        self.state().track_length = length;
    }

    pub fn fail_path(&self, path: &str, mode: FailureMode) {
        self.state().failures.insert(path.to_string(), mode);
    }

    /// Every load fails with `LoadFailed`
    pub fn fail_all_loads(&self, fail: bool) {
        self.state().fail_all_loads = fail;
    }

    /// `open` fails with `ConstructionFailed(reason)`
    pub fn fail_open(&self, reason: &str) {
        self.state().open_error = Some(reason.to_string());
    }

    /// Create the context suspended; `resumable` decides whether resume works
    pub fn start_suspended(&self, resumable: bool) {
        let mut state = self.state();
        state.start_suspended = true;
        state.resumable = resumable;
    }

    /// Allow a suspended context to resume (simulates a user gesture)
    pub fn allow_resume(&self) {
        self.state().resumable = true;
    }

    /// End the current source naturally. Returns false if nothing plays.
    pub fn finish_current(&self) -> bool {
        self.send_end(StreamEnd::Finished)
    }

    /// Fail the current source mid-stream. Returns false if nothing plays.
    pub fn fail_current(&self, reason: &str) -> bool {
        let path = match self.active_path() {
            Some(path) => path,
            None => return false,
        };
        self.send_end(StreamEnd::Failed(PlaybackError::LoadFailed {
            path,
            reason: reason.to_string(),
        }))
    }

    pub fn actions(&self) -> Vec<GraphAction> {
        self.state().actions.clone()
    }

    pub fn clear_actions(&self) {
        self.state().actions.clear();
    }

    /// Paths passed to `load_and_play`, in order
    pub fn loads(&self) -> Vec<String> {
        self.state()
            .actions
            .iter()
            .filter_map(|a| match a {
                GraphAction::Load { path } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Paths that actually started playing, in order
    pub fn started(&self) -> Vec<String> {
        self.state()
            .actions
            .iter()
            .filter_map(|a| match a {
                GraphAction::Started { path } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ramps scheduled on `param`, in order
    pub fn ramps(&self, param: GraphParam) -> Vec<Ramp> {
        self.state()
            .actions
            .iter()
            .filter_map(|a| match a {
                GraphAction::Ramp { param: p, ramp } if *p == param => Some(*ramp),
                _ => None,
            })
            .collect()
    }

    /// Path of the playing source
    pub fn active_path(&self) -> Option<String> {
        self.state().active.as_ref().map(|a| a.path.clone())
    }

    fn send_end(&self, end: StreamEnd) -> bool {
        let mut state = self.state();
        match state.active.as_mut().and_then(|a| a.end_tx.take()) {
            Some(tx) => {
                state.active = None;
                tx.send(end).is_ok()
            }
            None => false,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        lock(&self.inner)
    }
}

fn lock(inner: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AudioBackend for SimulatedBackend {
    fn open(&self) -> Result<ContextStatus, GraphError> {
        let mut state = self.state();
        if let Some(reason) = state.open_error.clone() {
            return Err(GraphError::ConstructionFailed(reason));
        }
        state.actions.push(GraphAction::Opened);
        state.suspended = state.start_suspended;
        Ok(if state.suspended {
            ContextStatus::Suspended
        } else {
            ContextStatus::Running
        })
    }

    fn resume(&self) -> ContextStatus {
        let mut state = self.state();
        if state.suspended && state.resumable {
            state.suspended = false;
            state.actions.push(GraphAction::Resumed);
        }
        if state.suspended {
            ContextStatus::Suspended
        } else {
            ContextStatus::Running
        }
    }

    fn load_and_play(&self, path: &str) -> BoxFuture<'static, Result<PlaybackStream, PlaybackError>> {
        let inner = Arc::clone(&self.inner);
        let path = path.to_string();
        let latency = {
            let mut state = self.state();
            state.actions.push(GraphAction::Load { path: path.clone() });
            state.load_latency
        };

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let (id, failure, track_length) = {
                let mut state = lock(&inner);
                let failure = if state.fail_all_loads {
                    Some(FailureMode::Load)
                } else {
                    state.failures.get(&path).copied()
                };
                match failure {
                    Some(FailureMode::Load) => {
                        return Err(PlaybackError::LoadFailed {
                            path,
                            reason: "simulated decode failure".to_string(),
                        })
                    }
                    Some(FailureMode::Reject) => {
                        return Err(PlaybackError::PlayRejected {
                            path,
                            reason: "simulated autoplay policy".to_string(),
                        })
                    }
                    _ => {}
                }
                state.next_source_id += 1;
                (state.next_source_id, failure, state.track_length)
            };

            let (end_tx, end_rx) = oneshot::channel();
            {
                let mut state = lock(&inner);
                // Replacing the active source drops its sender
                state.active = Some(ActiveSource {
                    id,
                    path: path.clone(),
                    end_tx: Some(end_tx),
                });
                state.actions.push(GraphAction::Started { path: path.clone() });
            }
            debug!("Simulated source {} started: {}", id, path);

            let scheduled_end = match failure {
                Some(FailureMode::MidStream(after)) => Some((
                    after,
                    StreamEnd::Failed(PlaybackError::LoadFailed {
                        path: path.clone(),
                        reason: "simulated stream error".to_string(),
                    }),
                )),
                _ => track_length.map(|length| (length, StreamEnd::Finished)),
            };

            if let Some((after, end)) = scheduled_end {
                let inner = Arc::clone(&inner);
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let mut state = lock(&inner);
                    let still_active = state.active.as_ref().is_some_and(|a| a.id == id);
                    if still_active {
                        if let Some(tx) = state.active.take().and_then(|mut a| a.end_tx.take()) {
                            let _ = tx.send(end);
                        }
                    }
                });
            }

            Ok(PlaybackStream { path, end: end_rx })
        }
        .boxed()
    }

    fn schedule_ramp(&self, param: GraphParam, ramp: Ramp) {
        self.state().actions.push(GraphAction::Ramp { param, ramp });
    }

    fn stop_source(&self) {
        let mut state = self.state();
        state.active = None;
        state.actions.push(GraphAction::StopSource);
    }

    fn pause_and_reset(&self) {
        let mut state = self.state();
        state.active = None;
        state.actions.push(GraphAction::PauseAndReset);
    }

    fn close(&self) {
        let mut state = self.state();
        state.active = None;
        state.actions.push(GraphAction::Closed);
    }
}
