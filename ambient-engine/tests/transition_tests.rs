//! Transition controller integration tests
//!
//! Drives the full engine (facade → controller → graph → simulated backend)
//! on a paused Tokio clock and checks the observable behaviour:
//! - mutual exclusion of weather and music
//! - preemption: a newer request cancels an older transition
//! - bounded retry on load failures
//! - live volume changes without restarting the track
//! - natural end, skip and stop sequencing

mod helpers;

use ambient_common::events::{AmbientEvent, AudioState};
use ambient_common::{Genre, SeasonMode, WeatherMode};
use ambient_engine::audio::simulated::{FailureMode, GraphAction, SimulatedBackend};
use helpers::*;
use std::time::Duration;

/// **Given:** weather sound is playing
/// **When:** music is requested, then weather again
/// **Then:** the foreground flips each time and the booleans follow
#[tokio::test(start_paused = true)]
async fn test_weather_and_music_are_mutually_exclusive() {
    let t = TestEngine::start();

    t.engine
        .play_weather_sound(WeatherMode::Rain, SeasonMode::Fall)
        .await;
    settle().await;
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::PlayingWeather);
    assert!(snapshot.sound_enabled);
    assert!(!snapshot.music_enabled);

    t.engine.play_music(Genre::Jazz).await;
    settle().await;
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::PlayingMusic);
    assert!(!snapshot.sound_enabled);
    assert!(snapshot.music_enabled);
    assert_eq!(snapshot.current_music, Some(Genre::Jazz));

    t.engine
        .play_weather_sound(WeatherMode::Rain, SeasonMode::Fall)
        .await;
    settle().await;
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::PlayingWeather);
    assert!(snapshot.sound_enabled);
    assert!(!snapshot.music_enabled);
}

/// **Given:** any prior state
/// **When:** clear weather is requested
/// **Then:** the engine ends up Idle (clear has no tracks)
#[tokio::test(start_paused = true)]
async fn test_clear_weather_always_idles() {
    let t = TestEngine::start();

    t.engine
        .play_weather_sound(WeatherMode::Clear, SeasonMode::Summer)
        .await;
    settle().await;
    assert_eq!(t.engine.snapshot().await.audio_state, AudioState::Idle);
    assert!(t.backend.loads().is_empty());

    t.engine.play_music(Genre::Lofi).await;
    settle().await;
    assert_eq!(t.engine.snapshot().await.audio_state, AudioState::PlayingMusic);

    t.engine
        .play_weather_sound(WeatherMode::Clear, SeasonMode::Summer)
        .await;
    settle().await;
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::Idle);
    assert!(snapshot.current_track_name.is_none());
    assert!(t.backend.actions().contains(&GraphAction::PauseAndReset));
}

/// **Given:** loads take 100ms
/// **When:** jazz is requested and lofi follows before jazz has loaded
/// **Then:** lofi wins and the jazz fade-in never happens
#[tokio::test(start_paused = true)]
async fn test_newer_request_preempts_pending_transition() {
    let backend = SimulatedBackend::new();
    backend.set_load_latency(Duration::from_millis(100));
    let t = TestEngine::with_backend(backend);

    t.engine.play_music(Genre::Jazz).await;
    t.engine.play_music(Genre::Lofi).await;
    settle().await;

    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.current_music, Some(Genre::Lofi));
    assert_eq!(snapshot.audio_state, AudioState::PlayingMusic);

    let loads = t.backend.loads();
    assert_eq!(loads.len(), 2);
    assert!(loads[0].contains("jazz"));

    let started = t.backend.started();
    assert_eq!(started.len(), 1, "Only one track may become audible");
    assert!(started[0].contains("lofi"));
    assert_eq!(t.fade_ins().len(), 1);
}

/// **Given:** jazz is audible
/// **When:** lofi is requested and then jazz again during the fade-out
/// **Then:** only the last request produces a new track
#[tokio::test(start_paused = true)]
async fn test_request_during_fade_out_cancels_pending_swap() {
    let t = TestEngine::start_unshuffled();
    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    t.engine.play_music(Genre::Lofi).await;
    tick().await;
    t.engine.play_music(Genre::Ambient).await;
    settle().await;

    let started = t.backend.started();
    assert_eq!(started.len(), 2);
    assert!(started[1].contains("ambient"));
    assert!(!t.backend.loads().iter().any(|p| p.contains("lofi")));
    assert_eq!(
        t.engine.snapshot().await.current_music,
        Some(Genre::Ambient)
    );
}

/// **Given:** every load fails and the pool has 3 tracks
/// **When:** music is requested
/// **Then:** exactly 2 tracks are attempted and the engine settles Idle
#[tokio::test(start_paused = true)]
async fn test_retry_is_bounded() {
    let backend = SimulatedBackend::new();
    backend.fail_all_loads(true);
    let t = TestEngine::with_backend(backend);
    let mut rx = t.engine.subscribe_events();

    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    assert_eq!(t.backend.loads().len(), 2);
    assert!(t.backend.started().is_empty());
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::Idle);
    assert!(!snapshot.transitioning);

    let retries: Vec<bool> = drain_events(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            AmbientEvent::PlaybackFailed { retrying, .. } => Some(retrying),
            _ => None,
        })
        .collect();
    assert_eq!(retries, vec![true, false]);
}

/// **Given:** the first jazz track is broken
/// **When:** jazz is requested
/// **Then:** the next deck track plays instead
#[tokio::test(start_paused = true)]
async fn test_single_failure_recovers_with_next_track() {
    let t = TestEngine::start_unshuffled();
    t.backend.fail_path(JAZZ_BLUE_ROOM, FailureMode::Load);

    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    assert_eq!(t.backend.loads(), vec![JAZZ_BLUE_ROOM, JAZZ_LATE_SET]);
    assert_eq!(t.backend.started(), vec![JAZZ_LATE_SET]);
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::PlayingMusic);
    assert_eq!(snapshot.current_track_name.as_deref(), Some("Late Set"));
}

/// **Given:** the runtime refuses playback (suspended context)
/// **When:** music is requested
/// **Then:** no retry, Idle; a later request succeeds once resume is allowed
#[tokio::test(start_paused = true)]
async fn test_play_rejected_is_not_retried() {
    let backend = SimulatedBackend::new();
    backend.start_suspended(false);
    let t = TestEngine::with_backend(backend);
    let mut rx = t.engine.subscribe_events();

    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    assert_eq!(t.engine.snapshot().await.audio_state, AudioState::Idle);
    let failures: Vec<AmbientEvent> = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, AmbientEvent::PlaybackFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        AmbientEvent::PlaybackFailed {
            retrying: false,
            ..
        }
    ));

    t.backend.allow_resume();
    t.engine.play_music(Genre::Jazz).await;
    settle().await;
    assert_eq!(
        t.engine.snapshot().await.audio_state,
        AudioState::PlayingMusic
    );
}

/// **Given:** rain in winter is playing
/// **When:** volume is set to 0.8
/// **Then:** the gain target becomes 0.8 × rain × winter, same track
#[tokio::test(start_paused = true)]
async fn test_volume_change_retargets_live_gain() {
    let t = TestEngine::start();
    t.engine
        .play_weather_sound(WeatherMode::Rain, SeasonMode::Winter)
        .await;
    settle().await;
    let playing = t.backend.active_path();
    assert!(playing.is_some());

    t.engine.set_volume(0.8).await;
    settle().await;

    let last = *t.gain_ramps().last().unwrap();
    assert!(approx_eq(last.to, 0.8 * 0.7 * 0.9), "gain target {}", last.to);
    assert_eq!(last.duration, Duration::from_millis(250));
    assert_eq!(t.backend.active_path(), playing);
    assert_eq!(t.backend.started().len(), 1, "Track must not restart");
    assert_eq!(t.engine.snapshot().await.volume, 0.8);
}

/// **Given:** unshuffled jazz is playing
/// **When:** the track ends naturally
/// **Then:** the next track of the same pool starts
#[tokio::test(start_paused = true)]
async fn test_natural_end_advances_same_pool() {
    let t = TestEngine::start_unshuffled();
    let mut rx = t.engine.subscribe_events();

    t.engine.play_music(Genre::Jazz).await;
    settle().await;
    assert!(t.backend.finish_current());
    settle().await;

    assert_eq!(t.backend.started(), vec![JAZZ_BLUE_ROOM, JAZZ_LATE_SET]);
    assert_eq!(
        t.engine.snapshot().await.audio_state,
        AudioState::PlayingMusic
    );
    let names = event_names(&drain_events(&mut rx));
    assert!(names.contains(&"TrackEnded"));
    assert_eq!(names.iter().filter(|n| **n == "TrackStarted").count(), 2);
}

/// **Given:** jazz is playing at volume 0.75
/// **When:** the track ends naturally
/// **Then:** the next track fades in from silence, not from the old level
#[tokio::test(start_paused = true)]
async fn test_natural_end_fades_next_track_in() {
    let t = TestEngine::start_unshuffled();
    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    assert!(t.backend.finish_current());
    settle().await;

    let fade_ins = t.fade_ins();
    assert_eq!(fade_ins.len(), 2);
    let second = fade_ins[1];
    assert_eq!(second.from, 0.0);
    assert!(approx_eq(second.to, 0.75));
    assert_eq!(second.duration, Duration::from_millis(500));
}

/// **Given:** tracks last 30s
/// **When:** two minutes pass
/// **Then:** the deck loops through the pool in order, indefinitely
#[tokio::test(start_paused = true)]
async fn test_continuous_playback_loop() {
    let t = TestEngine::start_unshuffled();
    t.backend.set_track_length(Some(Duration::from_secs(30)));

    t.engine.play_music(Genre::Jazz).await;
    tokio::time::sleep(Duration::from_secs(125)).await;

    assert_eq!(
        t.backend.started(),
        vec![
            JAZZ_BLUE_ROOM,
            JAZZ_LATE_SET,
            JAZZ_BRUSHES,
            JAZZ_BLUE_ROOM,
            JAZZ_LATE_SET
        ]
    );
}

/// **Given:** a track fails after it started
/// **When:** the error is reported
/// **Then:** it is handled like a load failure (next track, one retry)
#[tokio::test(start_paused = true)]
async fn test_mid_stream_error_skips_to_next_track() {
    let t = TestEngine::start_unshuffled();
    t.backend
        .fail_path(JAZZ_BLUE_ROOM, FailureMode::MidStream(Duration::from_secs(5)));

    t.engine.play_music(Genre::Jazz).await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(t.backend.started(), vec![JAZZ_BLUE_ROOM, JAZZ_LATE_SET]);
    assert_eq!(
        t.engine.snapshot().await.audio_state,
        AudioState::PlayingMusic
    );
}

/// **Given:** unshuffled jazz is playing
/// **When:** skip is called
/// **Then:** the current track fades out before the next one starts
#[tokio::test(start_paused = true)]
async fn test_skip_fades_out_then_plays_next() {
    let t = TestEngine::start_unshuffled();
    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    t.engine.skip_track().await;
    tick().await;
    assert_eq!(t.backend.started().len(), 1, "Swap waits for the fade-out");
    assert!(t.engine.snapshot().await.transitioning);

    settle().await;
    assert_eq!(t.backend.started(), vec![JAZZ_BLUE_ROOM, JAZZ_LATE_SET]);

    let ramps = t.gain_ramps();
    assert_eq!(ramps.len(), 3);
    assert_eq!(ramps[1].to, 0.0);
    assert_eq!(ramps[1].duration, Duration::from_millis(300));
    assert!(!t.engine.snapshot().await.transitioning);
}

#[tokio::test(start_paused = true)]
async fn test_skip_while_idle_does_nothing() {
    let t = TestEngine::start();
    t.engine.skip_track().await;
    settle().await;
    assert!(t.backend.actions().is_empty());
}

/// **Given:** music is playing
/// **When:** stop_all is called
/// **Then:** Idle is reported at once, the 400ms fade and reset follow
#[tokio::test(start_paused = true)]
async fn test_stop_all_fades_then_resets() {
    let t = TestEngine::start();
    t.engine.play_music(Genre::Lofi).await;
    settle().await;

    t.engine.stop_all().await;
    tick().await;
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.audio_state, AudioState::Idle);
    assert!(!t.backend.actions().contains(&GraphAction::PauseAndReset));

    settle().await;
    assert!(t.backend.actions().contains(&GraphAction::PauseAndReset));
    let last = *t.gain_ramps().last().unwrap();
    assert_eq!(last.to, 0.0);
    assert_eq!(last.duration, Duration::from_millis(400));
    assert!(t.backend.active_path().is_none());
}

/// **Given:** a load is in flight
/// **When:** stop_all is called before it resolves
/// **Then:** the load result is discarded and nothing becomes audible
#[tokio::test(start_paused = true)]
async fn test_stop_cancels_in_flight_load() {
    let backend = SimulatedBackend::new();
    backend.set_load_latency(Duration::from_millis(200));
    let t = TestEngine::with_backend(backend);

    t.engine.play_music(Genre::Jazz).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    t.engine.stop_all().await;
    settle().await;

    assert_eq!(t.backend.loads().len(), 1);
    assert!(t.backend.started().is_empty());
    assert!(t.fade_ins().is_empty());
    assert_eq!(t.engine.snapshot().await.audio_state, AudioState::Idle);
}

/// **Given:** jazz is fading out because lofi was requested
/// **When:** the old jazz track reports its natural end mid-fade
/// **Then:** the stale end is ignored; lofi plays and nothing extra loads
#[tokio::test(start_paused = true)]
async fn test_end_of_superseded_track_is_ignored() {
    let t = TestEngine::start_unshuffled();
    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    t.engine.play_music(Genre::Lofi).await;
    tick().await;
    t.backend.finish_current();
    settle().await;

    let loads = t.backend.loads();
    assert_eq!(loads.len(), 2);
    assert!(loads[1].contains("lofi"));
    assert_eq!(t.engine.snapshot().await.current_music, Some(Genre::Lofi));
}

/// **Given:** jazz is playing
/// **When:** jazz is requested again
/// **Then:** the track keeps playing (no transition)
#[tokio::test(start_paused = true)]
async fn test_same_context_is_not_restarted() {
    let t = TestEngine::start();
    t.engine.play_music(Genre::Jazz).await;
    settle().await;
    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    assert_eq!(t.backend.started().len(), 1);
    assert!(t.gain_ramps().iter().all(|r| r.to > 0.0));
}

/// **Given:** loads take 100ms
/// **When:** the same genre is requested again while its first track loads
/// **Then:** the load in flight is kept and no card of the deck is skipped
#[tokio::test(start_paused = true)]
async fn test_repeat_request_during_load_keeps_track() {
    let backend = SimulatedBackend::new();
    backend.set_load_latency(Duration::from_millis(100));
    let t = TestEngine::start_with_backend_unshuffled(backend);

    t.engine.play_music(Genre::Jazz).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    t.engine.play_music(Genre::Jazz).await;
    settle().await;

    assert_eq!(t.backend.loads(), vec![JAZZ_BLUE_ROOM]);
    assert_eq!(t.backend.started(), vec![JAZZ_BLUE_ROOM]);
    assert_eq!(t.fade_ins().len(), 1);
}

/// **Given:** rain in fall is playing
/// **When:** the season changes to winter (same kind, new pool)
/// **Then:** a full fade-out / fade-in transition runs with winter EQ
#[tokio::test(start_paused = true)]
async fn test_new_pool_same_kind_is_full_transition() {
    let t = TestEngine::start();
    t.engine
        .play_weather_sound(WeatherMode::Rain, SeasonMode::Fall)
        .await;
    settle().await;
    t.engine
        .play_weather_sound(WeatherMode::Rain, SeasonMode::Winter)
        .await;
    settle().await;

    assert_eq!(t.backend.started().len(), 2);
    assert_eq!(t.fade_ins().len(), 2);
    assert!(t.gain_ramps().iter().any(|r| r.to == 0.0));

    let filters = t
        .backend
        .ramps(ambient_engine::audio::GraphParam::FilterFrequency);
    assert_eq!(filters.last().map(|r| r.to), Some(3_500.0));
    let snapshot = t.engine.snapshot().await;
    assert_eq!(snapshot.current_season, Some(SeasonMode::Winter));
}

/// **Given:** the audio subsystem cannot be opened
/// **When:** any operation is called
/// **Then:** everything is a silent no-op; degraded is reported once
#[tokio::test(start_paused = true)]
async fn test_graph_failure_degrades_to_noop() {
    let backend = SimulatedBackend::new();
    backend.fail_open("no output device");
    let t = TestEngine::with_backend(backend);
    let mut rx = t.engine.subscribe_events();

    t.engine.play_music(Genre::Jazz).await;
    t.engine.skip_track().await;
    t.engine.set_volume(0.3).await;
    t.engine
        .play_weather_sound(WeatherMode::Snow, SeasonMode::Winter)
        .await;
    t.engine.stop_all().await;
    settle().await;

    let snapshot = t.engine.snapshot().await;
    assert!(snapshot.degraded);
    assert_eq!(snapshot.audio_state, AudioState::Idle);
    assert!(t.backend.loads().is_empty());

    let degraded = drain_events(&mut rx)
        .iter()
        .filter(|e| matches!(e, AmbientEvent::EngineDegraded { .. }))
        .count();
    assert_eq!(degraded, 1);
}
