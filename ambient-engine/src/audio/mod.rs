//! Audio graph and the backend seam it drives

pub mod backend;
pub mod chain;
#[cfg(feature = "device")]
pub mod device;
pub mod graph;
pub mod simulated;

use std::sync::Arc;

pub use backend::{AudioBackend, ContextStatus, GraphParam, PlaybackStream, StreamEnd};
#[cfg(feature = "device")]
pub use device::DeviceBackend;
pub use graph::{AudioGraph, GraphHandle};
pub use simulated::SimulatedBackend;

/// Backend used when the host does not pass one: the sound card
#[cfg(feature = "device")]
pub fn default_backend() -> Arc<dyn AudioBackend> {
    Arc::new(DeviceBackend::new())
}

/// Backend used when the host does not pass one
///
/// Without the `device` feature there is no real output, so this is the
/// silent simulated backend.
#[cfg(not(feature = "device"))]
pub fn default_backend() -> Arc<dyn AudioBackend> {
    tracing::warn!("Built without the `device` feature: audio output is simulated and silent");
    Arc::new(SimulatedBackend::new())
}
