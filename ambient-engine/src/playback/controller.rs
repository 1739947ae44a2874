//! Transition controller
//!
//! Single actor task that owns the [`AudioGraph`], the [`DeckShuffler`] and
//! the [`PlaybackSession`]. The facade sends [`ControlCommand`]s over an
//! unbounded channel; because only this task ever touches the graph, two
//! transitions can never schedule ramps on the same node at once.
//!
//! **Transition sequence** (play / skip / natural end):
//! 1. Bump the session id. This cancels any pending fade timer, drops any
//!    in-flight load and stops the end-of-stream watcher of the old track.
//! 2. If a source is audible, ramp gain to 0 over the fade-out window and
//!    arm a timer; the source is stopped when it fires.
//! 3. Draw the next track from the deck and start loading it.
//! 4. On success: filter ramp plus gain ramp up to the pool's target,
//!    state becomes PlayingWeather / PlayingMusic, busy flag clears.
//! 5. On natural end: drop the gain to silence, then repeat 3-4 for the
//!    same pool.
//!
//! A newer command always wins: it is handled before any pending load
//! result or timer (the select loop is biased towards commands).

use super::deck::DeckShuffler;
use super::recovery::{ErrorRecovery, RecoveryAction};
use super::session::{PlaybackSession, SessionId};
use crate::audio::backend::{PlaybackStream, StreamEnd};
use crate::audio::graph::AudioGraph;
use crate::eq;
use crate::error::{GraphError, PlaybackError};
use crate::library::{Pool, Track};
use crate::preferences::Preferences;
use crate::state::{CurrentTrack, SharedState};
use ambient_common::config::TimingConfig;
use ambient_common::events::{AmbientEvent, AudioState, PoolContext};
use futures::future::BoxFuture;
use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Requests from the facade
#[derive(Debug)]
pub enum ControlCommand {
    /// Play from `pool`, resetting the deck if `context` differs from the
    /// active one
    Play {
        context: PoolContext,
        pool: Pool,
        volume: f32,
    },
    Skip,
    Stop,
    /// Master volume changed
    SetVolume(f32),
    SetShuffle(bool),
    /// Release the graph and exit; replies once done
    Shutdown(oneshot::Sender<()>),
}

/// What happens when a fade-out completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterFade {
    NextTrack,
    Reset,
}

struct PendingFade {
    deadline: Instant,
    then: AfterFade,
}

struct InFlightLoad {
    session: SessionId,
    track: Arc<Track>,
    attempt: u32,
    future: BoxFuture<'static, Result<PlaybackStream, PlaybackError>>,
}

/// Terminal event forwarded by a stream watcher
#[derive(Debug)]
struct StreamNotice {
    session: SessionId,
    path: String,
    end: StreamEnd,
}

pub struct TransitionController {
    graph: AudioGraph,
    deck: DeckShuffler,
    session: PlaybackSession,
    recovery: ErrorRecovery,
    timing: TimingConfig,
    volume: f32,
    shuffle_enabled: bool,
    shared: Arc<SharedState>,
    commands: mpsc::UnboundedReceiver<ControlCommand>,
    notices_tx: mpsc::UnboundedSender<StreamNotice>,
    notices_rx: mpsc::UnboundedReceiver<StreamNotice>,
    fade: Option<PendingFade>,
    load: Option<InFlightLoad>,
    watcher: Option<CancellationToken>,
}

impl TransitionController {
    pub fn new(
        graph: AudioGraph,
        deck: DeckShuffler,
        timing: TimingConfig,
        preferences: &Preferences,
        shared: Arc<SharedState>,
        commands: mpsc::UnboundedReceiver<ControlCommand>,
    ) -> Self {
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        Self {
            graph,
            deck,
            session: PlaybackSession::new(),
            recovery: ErrorRecovery::new(timing.max_retries),
            timing,
            volume: preferences.volume,
            shuffle_enabled: preferences.shuffle_enabled,
            shared,
            commands,
            notices_tx,
            notices_rx,
            fade: None,
            load: None,
            watcher: None,
        }
    }

    pub async fn run(mut self) {
        info!("Transition controller started");

        loop {
            let deadline = self.fade.as_ref().map(|f| f.deadline);

            tokio::select! {
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => {
                        if !self.handle_command(command).await {
                            break;
                        }
                    }
                    None => {
                        debug!("Command channel closed, shutting down");
                        self.shutdown().await;
                        break;
                    }
                },
                Some(notice) = self.notices_rx.recv() => {
                    self.handle_stream_end(notice).await;
                }
                result = poll_load(&mut self.load) => {
                    self.handle_load_result(result).await;
                }
                _ = fade_elapsed(deadline) => {
                    self.handle_fade_elapsed().await;
                }
            }
        }

        info!("Transition controller stopped");
    }

    /// Returns false once the controller should exit
    async fn handle_command(&mut self, command: ControlCommand) -> bool {
        match command {
            ControlCommand::Play {
                context,
                pool,
                volume,
            } => self.play(context, pool, volume).await,
            ControlCommand::Skip => self.skip().await,
            ControlCommand::Stop => self.stop().await,
            ControlCommand::SetVolume(volume) => {
                self.volume = volume.clamp(0.0, 1.0);
                self.retarget_gain();
            }
            ControlCommand::SetShuffle(enabled) => {
                self.shuffle_enabled = enabled;
                self.deck.set_shuffle_enabled(enabled);
            }
            ControlCommand::Shutdown(reply) => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn play(&mut self, context: PoolContext, pool: Pool, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);

        if self.is_steady_on(context) {
            debug!("Already on {:?}, retargeting gain only", context);
            self.retarget_gain();
            return;
        }

        if pool.is_empty() {
            debug!("No tracks for {:?}, stopping", context);
            self.stop().await;
            return;
        }

        let id = self.begin_transition();
        self.shared.set_transitioning(true);

        if let Err(e) = self.graph.ensure_graph() {
            self.degrade(e).await;
            return;
        }
        if self.shared.set_degraded(false) {
            info!("Audio graph available again");
        }

        if self.deck.ensure_pool(context, pool, self.shuffle_enabled) {
            debug!(session = id, "New deck for {:?}", context);
        }
        self.session.active_context = Some(context);
        self.session.volume_modifier = eq::profile_for(&context).volume_mod;

        info!(session = id, "Transition to {:?}", context);
        self.fade_out_then(AfterFade::NextTrack, self.timing.fade_out())
            .await;
    }

    async fn skip(&mut self) {
        if self.session.active_context.is_none() {
            debug!("Skip ignored: nothing is playing");
            return;
        }

        let id = self.begin_transition();
        self.shared.set_transitioning(true);
        info!(session = id, "Skipping track");
        self.fade_out_then(AfterFade::NextTrack, self.timing.fade_out())
            .await;
    }

    async fn stop(&mut self) {
        let id = self.begin_transition();
        self.session.active_context = None;
        self.session.state = AudioState::Idle;
        self.shared.set_current_track(None).await;
        self.shared.set_audio_state(AudioState::Idle).await;
        self.shared.set_transitioning(false);

        debug!(session = id, "Stopping playback");
        self.fade_out_then(AfterFade::Reset, self.timing.stop_fade())
            .await;
    }

    async fn shutdown(&mut self) {
        let id = self.begin_transition();
        self.session.active_context = None;
        self.session.current_track = None;
        self.session.state = AudioState::Idle;
        self.graph.shutdown();

        self.shared.set_current_track(None).await;
        self.shared.set_audio_state(AudioState::Idle).await;
        self.shared.set_transitioning(false);
        info!(session = id, "Playback shut down");
    }

    /// Invalidate everything tagged with the previous session
    fn begin_transition(&mut self) -> SessionId {
        let id = self.session.advance();
        self.graph.claim(id);
        self.fade = None;
        if self.load.take().is_some() {
            debug!(session = id, "Cancelled in-flight load");
        }
        if let Some(token) = self.watcher.take() {
            token.cancel();
        }
        id
    }

    /// Ramp the audible source down, then run `then`
    ///
    /// With nothing audible `then` runs immediately.
    async fn fade_out_then(&mut self, then: AfterFade, window: Duration) {
        if self.session.is_audible() {
            self.graph.set_gain(self.session.id, 0.0, window);
            self.fade = Some(PendingFade {
                deadline: Instant::now() + window,
                then,
            });
        } else {
            self.complete_fade(then).await;
        }
    }

    async fn handle_fade_elapsed(&mut self) {
        if let Some(fade) = self.fade.take() {
            self.complete_fade(fade.then).await;
        }
    }

    async fn complete_fade(&mut self, then: AfterFade) {
        match then {
            AfterFade::NextTrack => {
                if self.session.current_track.take().is_some() {
                    self.graph.stop_source();
                    self.shared.set_current_track(None).await;
                }
                self.start_next(0).await;
            }
            AfterFade::Reset => {
                self.session.current_track = None;
                self.graph.pause_and_reset();
            }
        }
    }

    /// Draw from the deck and start loading
    async fn start_next(&mut self, attempt: u32) {
        let session = self.session.id;
        let track = match self.deck.next() {
            Some(track) => track,
            None => {
                warn!(session, "Deck has no tracks");
                self.settle_idle().await;
                return;
            }
        };

        debug!(session, attempt, "Loading {}", track.path);
        let future = self.graph.load_and_play(&track.path);
        self.load = Some(InFlightLoad {
            session,
            track,
            attempt,
            future,
        });
    }

    async fn handle_load_result(&mut self, result: Result<PlaybackStream, PlaybackError>) {
        let load = match self.load.take() {
            Some(load) => load,
            None => return,
        };

        if !self.session.is_current(load.session) {
            debug!(
                session = load.session,
                "Discarding load result from superseded session"
            );
            return;
        }

        match result {
            Ok(stream) => self.on_started(load.session, load.track, stream).await,
            Err(e) => self.on_failure(load.session, e, load.attempt).await,
        }
    }

    async fn on_started(&mut self, id: SessionId, track: Arc<Track>, stream: PlaybackStream) {
        let context = match self.session.active_context {
            Some(context) => context,
            None => {
                self.graph.stop_source();
                return;
            }
        };

        let profile = eq::profile_for(&context);
        self.graph
            .set_filter_frequency(id, profile.filter_freq_hz, self.timing.filter_ramp());
        self.graph
            .set_gain(id, profile.target_gain(self.volume), self.timing.fade_in());

        let state = kind_for(&context);
        self.session.current_track = Some(Arc::clone(&track));
        self.session.state = state;

        self.shared
            .set_current_track(Some(CurrentTrack {
                path: track.path.clone(),
                display_name: track.display_name.clone(),
                context,
            }))
            .await;
        self.shared.set_audio_state(state).await;
        self.shared.set_transitioning(false);

        info!(session = id, "Playing {} ({})", track.display_name, track.path);
        self.shared.broadcast_event(AmbientEvent::TrackStarted {
            session_id: id,
            path: track.path.clone(),
            display_name: track.display_name.clone(),
            context,
            timestamp: chrono::Utc::now(),
        });

        self.watch_stream(id, stream);
    }

    async fn on_failure(&mut self, id: SessionId, error: PlaybackError, attempt: u32) {
        let action = self.recovery.decide(&error, attempt, self.deck.pool_len());
        let retrying = action == RecoveryAction::Retry;

        warn!(session = id, retrying, "Playback failed: {}", error);
        self.shared.broadcast_event(AmbientEvent::PlaybackFailed {
            session_id: id,
            path: error.path().to_string(),
            reason: error.to_string(),
            retrying,
            timestamp: chrono::Utc::now(),
        });

        match action {
            RecoveryAction::Retry => self.start_next(attempt + 1).await,
            RecoveryAction::GiveUp => self.settle_idle().await,
        }
    }

    /// Forward the stream's terminal event, unless the session moves on
    fn watch_stream(&mut self, id: SessionId, stream: PlaybackStream) {
        let token = CancellationToken::new();
        if let Some(previous) = self.watcher.replace(token.clone()) {
            previous.cancel();
        }

        let notices = self.notices_tx.clone();
        let PlaybackStream { path, end } = stream;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = end => match result {
                    Ok(end) => {
                        let _ = notices.send(StreamNotice { session: id, path, end });
                    }
                    Err(_) => debug!("Source {} released without end event", path),
                },
            }
        });
    }

    async fn handle_stream_end(&mut self, notice: StreamNotice) {
        if !self.session.is_current(notice.session) {
            debug!(
                session = notice.session,
                current = self.session.id,
                "Ignoring end of superseded track {}",
                notice.path
            );
            return;
        }

        match notice.end {
            StreamEnd::Finished => {
                debug!(session = notice.session, "Track ended: {}", notice.path);
                self.shared.broadcast_event(AmbientEvent::TrackEnded {
                    session_id: notice.session,
                    path: notice.path,
                    timestamp: chrono::Utc::now(),
                });
                self.session.current_track = None;
                self.shared.set_current_track(None).await;

                let id = self.begin_transition();
                self.silence(id);
                self.shared.set_transitioning(true);
                self.start_next(0).await;
            }
            StreamEnd::Failed(error) => {
                self.session.current_track = None;
                self.graph.stop_source();
                self.shared.set_current_track(None).await;

                let id = self.begin_transition();
                self.silence(id);
                self.shared.set_transitioning(true);
                self.on_failure(id, error, 0).await;
            }
        }
    }

    /// Drop the gain to 0 at once so the next track fades in from silence
    ///
    /// Only used after the source is gone, so the jump is inaudible.
    fn silence(&mut self, id: SessionId) {
        self.graph.set_gain(id, 0.0, Duration::ZERO);
    }

    /// Re-apply the gain target for the current volume without a transition
    fn retarget_gain(&mut self) {
        if !self.session.state.is_playing() || self.fade.is_some() || self.load.is_some() {
            return;
        }
        if let Some(context) = self.session.active_context {
            let target = eq::profile_for(&context).target_gain(self.volume);
            debug!(session = self.session.id, "Retargeting gain to {:.3}", target);
            self.graph
                .set_gain(self.session.id, target, self.timing.volume_ramp());
        }
    }

    async fn degrade(&mut self, error: GraphError) {
        match error {
            GraphError::ConstructionFailed(reason) => {
                if !self.shared.set_degraded(true) {
                    error!("Audio unavailable, running silent: {}", reason);
                    self.shared.broadcast_event(AmbientEvent::EngineDegraded {
                        reason,
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
            GraphError::Closed => debug!("Audio graph closed, ignoring play request"),
        }
        self.settle_idle().await;
    }

    /// Give up on the active pool and report Idle
    async fn settle_idle(&mut self) {
        self.session.active_context = None;
        self.session.state = AudioState::Idle;
        if !self.session.is_audible() {
            self.shared.set_current_track(None).await;
        }
        self.shared.set_audio_state(AudioState::Idle).await;
        self.shared.set_transitioning(false);
    }

    /// True if `context` is playing or already on its way in
    ///
    /// A pending load or fade for the active context will deliver the next
    /// card of its deck; restarting it would throw that card away.
    fn is_steady_on(&self, context: PoolContext) -> bool {
        self.session.active_context == Some(context)
            && (self.session.state.is_playing() || self.load.is_some() || self.fade.is_some())
    }
}

fn kind_for(context: &PoolContext) -> AudioState {
    match context {
        PoolContext::Weather { .. } => AudioState::PlayingWeather,
        PoolContext::Music { .. } => AudioState::PlayingMusic,
    }
}

async fn poll_load(load: &mut Option<InFlightLoad>) -> Result<PlaybackStream, PlaybackError> {
    match load {
        Some(load) => (&mut load.future).await,
        None => future::pending().await,
    }
}

async fn fade_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}
