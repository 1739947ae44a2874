//! Platform audio backend seam
//!
//! The engine never decodes audio itself. A backend owns the platform audio
//! context and the persistent node chain (source → low-pass filter → gain →
//! output) and exposes just enough to drive it:
//! - construct / resume the context
//! - swap the source (`load_and_play`) and learn when it ends
//! - schedule linear ramps on the two persistent parameters
//!
//! Backends are shared as `Arc<dyn AudioBackend>`; `load_and_play` returns a
//! `'static` boxed future so it can be polled without borrowing the graph.
//! Dropping that future before it resolves must leave no source playing.

use crate::error::{GraphError, PlaybackError};
use ambient_common::Ramp;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

/// State of the platform audio context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    Running,
    /// Created but not allowed to produce sound yet (e.g. waiting for a
    /// user gesture)
    Suspended,
}

/// Persistent graph parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphParam {
    Gain,
    FilterFrequency,
}

/// Terminal event of a playing source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEnd {
    /// Natural end of stream
    Finished,
    /// Playback broke after it had started
    Failed(PlaybackError),
}

/// A source that has started playing
#[derive(Debug)]
pub struct PlaybackStream {
    pub path: String,

    /// Resolves once with the source's terminal event. The sender is dropped
    /// without a value if the source is stopped or replaced.
    pub end: oneshot::Receiver<StreamEnd>,
}

/// Platform audio subsystem
pub trait AudioBackend: Send + Sync + 'static {
    /// Build the context and the filter/gain chain
    fn open(&self) -> Result<ContextStatus, GraphError>;

    /// Try to resume a suspended context
    fn resume(&self) -> ContextStatus;

    /// Replace the source with `path` and start it
    ///
    /// Resolves once the asset is decodable and playback has started.
    fn load_and_play(&self, path: &str) -> BoxFuture<'static, Result<PlaybackStream, PlaybackError>>;

    /// Schedule a linear ramp on a persistent parameter, starting now
    ///
    /// Replaces any ramp still pending on that parameter.
    fn schedule_ramp(&self, param: GraphParam, ramp: Ramp);

    /// Stop and discard the current source (nodes stay)
    fn stop_source(&self);

    /// Stop playback and rewind
    fn pause_and_reset(&self);

    /// Release the context and all nodes
    fn close(&self);
}
