//! Orchestration facade
//!
//! [`AmbientEngine`] is the only type a host needs. It is created once at
//! startup, shared by reference, and torn down with [`AmbientEngine::shutdown`].
//!
//! Every public operation is total: failures are logged, absorbed, and
//! show up only as `AudioState::Idle` in the snapshot and on the event
//! stream. Operations resolve pools and update preferences here, then hand
//! the actual transition to the [`TransitionController`] task.

use crate::audio;
use crate::audio::backend::AudioBackend;
use crate::audio::graph::AudioGraph;
use crate::library::TrackLibrary;
use crate::playback::controller::{ControlCommand, TransitionController};
use crate::playback::deck::DeckShuffler;
use crate::preferences::{ForegroundStream, MemoryPreferenceStore, PreferenceStore, Preferences, TomlPreferenceStore};
use crate::state::SharedState;
use ambient_common::config::{TimingConfig, TomlConfig};
use ambient_common::events::{AmbientEvent, AudioState, PoolContext};
use ambient_common::{Genre, SeasonMode, WeatherMode};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use std::thread;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Read-only view for UI display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub audio_state: AudioState,
    pub current_weather: Option<WeatherMode>,
    pub current_season: Option<SeasonMode>,
    pub current_music: Option<Genre>,
    pub current_track_name: Option<String>,
    pub volume: f32,
    pub sound_enabled: bool,
    pub music_enabled: bool,
    pub shuffle_enabled: bool,
    /// A transition is in progress
    pub transitioning: bool,
    /// Audio is unavailable; the engine is a silent no-op
    pub degraded: bool,
}

/// Last context each stream was asked to play
#[derive(Debug, Clone, Copy, Default)]
struct ContextMemory {
    weather: Option<(WeatherMode, SeasonMode)>,
    genre: Option<Genre>,
}

struct FacadeState {
    preferences: Preferences,
    memory: ContextMemory,
}

/// Builder for [`AmbientEngine`]
pub struct EngineBuilder {
    timing: TimingConfig,
    library: TrackLibrary,
    backend: Option<Arc<dyn AudioBackend>>,
    store: Option<Box<dyn PreferenceStore>>,
    seed: Option<u64>,
}

impl EngineBuilder {
    pub fn timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    pub fn library(mut self, library: TrackLibrary) -> Self {
        self.library = library;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn preference_store(mut self, store: Box<dyn PreferenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Seed the shuffle for a reproducible track order
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start the engine
    ///
    /// The controller runs as a task on the current Tokio runtime. Called
    /// outside a runtime, it gets a thread with its own runtime instead.
    /// Without a backend the engine uses [`audio::default_backend`]; without
    /// a store, preferences live in memory only.
    pub fn build(self) -> AmbientEngine {
        let backend = self.backend.unwrap_or_else(audio::default_backend);
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryPreferenceStore::new()));
        let deck = match self.seed {
            Some(seed) => DeckShuffler::seeded(seed),
            None => DeckShuffler::from_entropy(),
        };

        let preferences = store.load();
        info!(
            "Starting ambient engine: {} tracks, volume {:.2}, foreground {:?}, shuffle {}",
            self.library.len(),
            preferences.volume,
            preferences.foreground,
            preferences.shuffle_enabled
        );

        let shared = Arc::new(SharedState::new());
        let (commands, rx) = mpsc::unbounded_channel();
        let controller = TransitionController::new(
            AudioGraph::new(backend),
            deck,
            self.timing,
            &preferences,
            Arc::clone(&shared),
            rx,
        );
        let task = match Handle::try_current() {
            Ok(handle) => Some(ControllerTask::Task(handle.spawn(controller.run()))),
            Err(_) => {
                warn!("No Tokio runtime, running the controller on its own thread");
                spawn_controller_thread(controller, Arc::clone(&shared))
            }
        };

        AmbientEngine {
            library: self.library,
            shared,
            commands,
            store,
            state: Mutex::new(FacadeState {
                preferences,
                memory: ContextMemory::default(),
            }),
            task: Mutex::new(task),
        }
    }
}

/// Where the controller runs
enum ControllerTask {
    Task(JoinHandle<()>),
    Thread(thread::JoinHandle<()>),
}

impl ControllerTask {
    async fn join(self) {
        match self {
            ControllerTask::Task(task) => {
                if let Err(e) = task.await {
                    warn!("Controller task failed: {}", e);
                }
            }
            ControllerTask::Thread(thread) => {
                let joined = tokio::task::spawn_blocking(move || thread.join()).await;
                if !matches!(joined, Ok(Ok(()))) {
                    warn!("Controller thread failed");
                }
            }
        }
    }
}

/// Run the controller on a dedicated thread with a current-thread runtime
///
/// If that is impossible the engine stays up as a degraded no-op.
fn spawn_controller_thread(
    controller: TransitionController,
    shared: Arc<SharedState>,
) -> Option<ControllerTask> {
    let thread_shared = Arc::clone(&shared);
    let spawned = thread::Builder::new()
        .name("ambient-controller".to_string())
        .spawn(move || {
            match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime.block_on(controller.run()),
                Err(e) => {
                    error!("Failed to build controller runtime: {}", e);
                    thread_shared.set_degraded(true);
                }
            }
        });

    match spawned {
        Ok(thread) => Some(ControllerTask::Thread(thread)),
        Err(e) => {
            error!("Failed to spawn controller thread: {}", e);
            shared.set_degraded(true);
            None
        }
    }
}

/// The ambient audio engine
pub struct AmbientEngine {
    library: TrackLibrary,
    shared: Arc<SharedState>,
    commands: mpsc::UnboundedSender<ControlCommand>,
    store: Box<dyn PreferenceStore>,
    /// Serializes facade operations so commands reach the controller in
    /// call order
    state: Mutex<FacadeState>,
    task: Mutex<Option<ControllerTask>>,
}

impl AmbientEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder {
            timing: TimingConfig::default(),
            library: TrackLibrary::builtin(),
            backend: None,
            store: None,
            seed: None,
        }
    }

    /// Engine configured from a bootstrap config file
    ///
    /// Fails only if the configured track catalog is invalid.
    pub fn from_config(config: &TomlConfig, backend: Arc<dyn AudioBackend>) -> crate::Result<Self> {
        let library = if config.tracks.is_empty() {
            TrackLibrary::builtin()
        } else {
            TrackLibrary::from_entries(&config.tracks)?
        };

        let preferences_path = config.preferences_path();
        info!("Preferences file: {}", preferences_path.display());

        Ok(Self::builder()
            .timing(config.timing.clone())
            .library(library)
            .backend(backend)
            .preference_store(Box::new(TomlPreferenceStore::new(preferences_path)))
            .build())
    }

    /// Play ambient sound for a weather/season context
    ///
    /// Makes weather the foreground stream (turning music off). Routes to
    /// `stop_all` if the user silenced the engine or the context has no
    /// tracks (e.g. clear weather).
    pub async fn play_weather_sound(&self, weather: WeatherMode, season: SeasonMode) {
        let mut state = self.state.lock().await;
        state.memory.weather = Some((weather, season));

        if state.preferences.foreground == ForegroundStream::None {
            debug!("Sound and music disabled, not playing {}", weather);
            self.send(ControlCommand::Stop);
            return;
        }

        self.set_foreground(&mut state, ForegroundStream::Weather);
        self.play_weather_locked(&state, weather, season);
    }

    /// Play a music genre
    ///
    /// Makes music the foreground stream (turning sound off). Routes to
    /// `stop_all` for `Genre::None` (which also forgets the remembered
    /// genre), if the user silenced the engine, or if the genre has no tracks.
    pub async fn play_music(&self, genre: Genre) {
        let mut state = self.state.lock().await;

        if genre == Genre::None {
            debug!("No genre selected, stopping");
            state.memory.genre = None;
            self.send(ControlCommand::Stop);
            return;
        }
        state.memory.genre = Some(genre);

        if state.preferences.foreground == ForegroundStream::None {
            debug!("Sound and music disabled, not playing {}", genre);
            self.send(ControlCommand::Stop);
            return;
        }

        self.set_foreground(&mut state, ForegroundStream::Music);
        self.play_music_locked(&state, genre);
    }

    /// Fade out and go Idle
    pub async fn stop_all(&self) {
        let _state = self.state.lock().await;
        self.send(ControlCommand::Stop);
    }

    /// Advance to the next track of the active pool
    pub async fn skip_track(&self) {
        let _state = self.state.lock().await;
        self.send(ControlCommand::Skip);
    }

    /// Set master volume; the live gain follows with a short ramp
    pub async fn set_volume(&self, volume: f32) {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            warn!("Ignoring non-finite volume {}", volume);
            return;
        };

        let mut state = self.state.lock().await;
        if state.preferences.volume == volume {
            return;
        }
        state.preferences.volume = volume;
        self.persist(&state.preferences);
        self.shared.broadcast_event(AmbientEvent::VolumeChanged {
            volume,
            timestamp: chrono::Utc::now(),
        });
        self.send(ControlCommand::SetVolume(volume));
    }

    /// Enable or disable weather sound
    ///
    /// Enabling switches the foreground to weather and resumes the last
    /// weather context, if any. Disabling while weather is the foreground
    /// silences the engine.
    pub async fn set_sound_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        let current = state.preferences.foreground;

        if enabled {
            if current == ForegroundStream::Weather {
                return;
            }
            self.set_foreground(&mut state, ForegroundStream::Weather);
            match state.memory.weather {
                Some((weather, season)) => self.play_weather_locked(&state, weather, season),
                None => self.send(ControlCommand::Stop),
            }
        } else if current == ForegroundStream::Weather {
            self.set_foreground(&mut state, ForegroundStream::None);
            self.send(ControlCommand::Stop);
        }
    }

    /// Enable or disable music
    ///
    /// Mirror image of [`Self::set_sound_enabled`], resuming the last genre.
    pub async fn set_music_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        let current = state.preferences.foreground;

        if enabled {
            if current == ForegroundStream::Music {
                return;
            }
            self.set_foreground(&mut state, ForegroundStream::Music);
            match state.memory.genre {
                Some(genre) => self.play_music_locked(&state, genre),
                None => self.send(ControlCommand::Stop),
            }
        } else if current == ForegroundStream::Music {
            self.set_foreground(&mut state, ForegroundStream::None);
            self.send(ControlCommand::Stop);
        }
    }

    /// Shuffle on/off; applies from the next reshuffle of the deck
    pub async fn set_shuffle_enabled(&self, enabled: bool) {
        let mut state = self.state.lock().await;
        if state.preferences.shuffle_enabled == enabled {
            return;
        }
        state.preferences.shuffle_enabled = enabled;
        self.persist(&state.preferences);
        self.broadcast_preferences(&state.preferences);
        self.send(ControlCommand::SetShuffle(enabled));
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let (preferences, memory) = {
            let state = self.state.lock().await;
            (state.preferences, state.memory)
        };
        let audio_state = self.shared.get_audio_state().await;
        let current_track = self.shared.get_current_track().await;

        EngineSnapshot {
            audio_state,
            current_weather: memory.weather.map(|(weather, _)| weather),
            current_season: memory.weather.map(|(_, season)| season),
            current_music: memory.genre,
            current_track_name: current_track.map(|t| t.display_name),
            volume: preferences.volume,
            sound_enabled: preferences.sound_enabled(),
            music_enabled: preferences.music_enabled(),
            shuffle_enabled: preferences.shuffle_enabled,
            transitioning: self.shared.is_transitioning(),
            degraded: self.shared.is_degraded(),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AmbientEvent> {
        self.shared.subscribe_events()
    }

    /// Stop playback, release the audio graph and join the controller
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn shutdown(&self) {
        let _state = self.state.lock().await;
        let task = match self.task.lock().await.take() {
            Some(task) => task,
            None => return,
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(ControlCommand::Shutdown(reply_tx));
        if reply_rx.await.is_err() {
            warn!("Controller exited before acknowledging shutdown");
        }
        task.join().await;
        info!("Ambient engine shut down");
    }

    fn play_weather_locked(&self, state: &FacadeState, weather: WeatherMode, season: SeasonMode) {
        let pool = self.library.tracks_for_weather_season(weather, season);
        if pool.is_empty() {
            debug!("No tracks for {} / {}, stopping", weather, season);
            self.send(ControlCommand::Stop);
            return;
        }
        self.send(ControlCommand::Play {
            context: PoolContext::Weather { weather, season },
            pool,
            volume: state.preferences.volume,
        });
    }

    fn play_music_locked(&self, state: &FacadeState, genre: Genre) {
        let pool = self.library.tracks_for_genre(genre);
        if pool.is_empty() {
            debug!("No tracks for genre {}, stopping", genre);
            self.send(ControlCommand::Stop);
            return;
        }
        self.send(ControlCommand::Play {
            context: PoolContext::Music { genre },
            pool,
            volume: state.preferences.volume,
        });
    }

    fn set_foreground(&self, state: &mut FacadeState, foreground: ForegroundStream) {
        if state.preferences.foreground == foreground {
            return;
        }
        debug!(
            "Foreground stream {:?} -> {:?}",
            state.preferences.foreground, foreground
        );
        state.preferences.foreground = foreground;
        self.persist(&state.preferences);
        self.broadcast_preferences(&state.preferences);
    }

    fn persist(&self, preferences: &Preferences) {
        if let Err(e) = self.store.save(preferences) {
            warn!("Failed to persist preferences: {}", e);
        }
    }

    fn broadcast_preferences(&self, preferences: &Preferences) {
        self.shared.broadcast_event(AmbientEvent::PreferencesChanged {
            sound_enabled: preferences.sound_enabled(),
            music_enabled: preferences.music_enabled(),
            shuffle_enabled: preferences.shuffle_enabled,
            timestamp: chrono::Utc::now(),
        });
    }

    fn send(&self, command: ControlCommand) {
        if self.commands.send(command).is_err() {
            debug!("Engine is shut down, ignoring command");
        }
    }
}
