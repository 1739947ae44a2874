//! Sound-card backend on rodio
//!
//! The output stream lives on its own thread (it is not `Send` on every
//! platform); everything else talks to it through its `OutputStreamHandle`.
//! Each track gets a fresh [`Sink`] holding one [`ChainSource`]: the decoded
//! file run through the low-pass and gain stages of [`ChainStage`]. Ramps
//! land in a single [`Automation`] shared by every source, so the filter and
//! gain settings carry over from one track to the next.
//!
//! Decoding is left to rodio's `Decoder` and runs on the blocking pool.

use super::backend::{AudioBackend, ContextStatus, GraphParam, PlaybackStream, StreamEnd};
use super::chain::{Automation, ChainStage, SharedAutomation};
use crate::error::{GraphError, PlaybackError};
use ambient_common::Ramp;
use futures::future::{BoxFuture, FutureExt};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type FileDecoder = Decoder<BufReader<File>>;

/// The output stream thread and a handle to its mixer
struct Output {
    handle: OutputStreamHandle,
    release: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

struct Inner {
    automation: SharedAutomation,
    output: Mutex<Option<Output>>,
    sink: Mutex<Option<Sink>>,
}

/// Plays through the default output device
#[derive(Clone)]
pub struct DeviceBackend {
    inner: Arc<Inner>,
}

impl DeviceBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                automation: Automation::shared(),
                output: Mutex::new(None),
                sink: Mutex::new(None),
            }),
        }
    }
}

impl Default for DeviceBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    /// Put `decoder` on a new sink, replacing whatever played before
    fn start(&self, path: &str, decoder: FileDecoder) -> Result<PlaybackStream, PlaybackError> {
        let output = lock(&self.output);
        let handle = match output.as_ref() {
            Some(output) => &output.handle,
            None => {
                return Err(PlaybackError::PlayRejected {
                    path: path.to_string(),
                    reason: "output device is closed".to_string(),
                })
            }
        };

        let sink = Sink::try_new(handle).map_err(|e| PlaybackError::PlayRejected {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        let (end_tx, end_rx) = oneshot::channel();
        sink.append(ChainSource::new(
            decoder.convert_samples::<f32>(),
            Arc::clone(&self.automation),
            end_tx,
        ));
        sink.play();

        if let Some(previous) = lock(&self.sink).replace(sink) {
            previous.stop();
        }
        debug!("Device source started: {}", path);

        Ok(PlaybackStream {
            path: path.to_string(),
            end: end_rx,
        })
    }

    fn stop_sink(&self) {
        if let Some(sink) = lock(&self.sink).take() {
            sink.stop();
        }
    }
}

impl AudioBackend for DeviceBackend {
    fn open(&self) -> Result<ContextStatus, GraphError> {
        let mut output = lock(&self.inner.output);
        if output.is_some() {
            return Ok(ContextStatus::Running);
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("ambient-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Holding `_stream` keeps the device open until close()
                    let _ = release_rx.recv();
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| {
                GraphError::ConstructionFailed(format!("Failed to spawn output thread: {}", e))
            })?;

        let handle = match ready_rx.recv() {
            Ok(Ok(handle)) => handle,
            Ok(Err(reason)) => {
                let _ = thread.join();
                return Err(GraphError::ConstructionFailed(reason));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(GraphError::ConstructionFailed(
                    "output thread exited before opening the device".to_string(),
                ));
            }
        };

        info!("Audio output device opened");
        *output = Some(Output {
            handle,
            release: release_tx,
            thread,
        });
        Ok(ContextStatus::Running)
    }

    fn resume(&self) -> ContextStatus {
        ContextStatus::Running
    }

    fn load_and_play(&self, path: &str) -> BoxFuture<'static, Result<PlaybackStream, PlaybackError>> {
        let inner = Arc::clone(&self.inner);
        let path = path.to_string();

        async move {
            let file_path = path.clone();
            let decoded = tokio::task::spawn_blocking(move || open_decoder(&file_path))
                .await
                .map_err(|e| PlaybackError::LoadFailed {
                    path: path.clone(),
                    reason: format!("decoder task failed: {}", e),
                })?;

            let decoder = decoded.map_err(|reason| PlaybackError::LoadFailed {
                path: path.clone(),
                reason,
            })?;

            inner.start(&path, decoder)
        }
        .boxed()
    }

    fn schedule_ramp(&self, param: GraphParam, ramp: Ramp) {
        lock(&self.inner.automation).schedule(param, ramp, Instant::now());
    }

    fn stop_source(&self) {
        self.inner.stop_sink();
    }

    fn pause_and_reset(&self) {
        // The next load starts a new sink from the top of its file
        self.inner.stop_sink();
    }

    fn close(&self) {
        self.inner.stop_sink();
        let output = lock(&self.inner.output).take();
        if let Some(output) = output {
            let _ = output.release.send(());
            if output.thread.join().is_err() {
                warn!("Audio output thread panicked");
            }
            info!("Audio output device closed");
        }
    }
}

fn open_decoder(path: &str) -> Result<FileDecoder, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    Decoder::new(BufReader::new(file)).map_err(|e| e.to_string())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A decoded file run through the filter and gain stages
///
/// Reports [`StreamEnd::Finished`] when the file runs out. Dropping it early
/// (sink stopped or replaced) drops the sender instead.
struct ChainSource<S> {
    inner: S,
    stage: ChainStage,
    end: Option<oneshot::Sender<StreamEnd>>,
}

impl<S> ChainSource<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, automation: SharedAutomation, end: oneshot::Sender<StreamEnd>) -> Self {
        let stage = ChainStage::new(automation, inner.sample_rate(), inner.channels());
        Self {
            inner,
            stage,
            end: Some(end),
        }
    }
}

impl<S> Iterator for ChainSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.stage.at_block_start() {
            self.stage
                .reconfigure(self.inner.sample_rate(), self.inner.channels());
        }
        match self.inner.next() {
            Some(sample) => Some(self.stage.process(sample)),
            None => {
                if let Some(end) = self.end.take() {
                    let _ = end.send(StreamEnd::Finished);
                }
                None
            }
        }
    }
}

impl<S> Source for ChainSource<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}
