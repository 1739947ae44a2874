//! Ambient Engine (ambient-engine) - demo host
//!
//! Drives the engine from the command line and prints every engine event as
//! a JSON line. Built with the `device` feature it plays through the sound
//! card; otherwise (or with `--simulate`) it uses the simulated backend,
//! which is handy for watching transitions and recovery without audio.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ambient_common::config::{resolve_config_path, LoggingConfig, TomlConfig};
use ambient_common::{Genre, SeasonMode, WeatherMode};
use ambient_engine::audio::{AudioBackend, SimulatedBackend};
use ambient_engine::AmbientEngine;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for ambient-engine
#[derive(Parser, Debug)]
#[command(name = "ambient-engine")]
#[command(about = "Ambient audio orchestration engine")]
#[command(version)]
struct Args {
    /// Bootstrap config file
    #[arg(short, long, env = "AMBIENT_CONFIG")]
    config: Option<PathBuf>,

    /// Weather context to play
    #[arg(short, long)]
    weather: Option<WeatherMode>,

    /// Season for the weather context
    #[arg(short, long, default_value = "none")]
    season: SeasonMode,

    /// Music genre to play (takes precedence over --weather)
    #[arg(short, long)]
    genre: Option<Genre>,

    /// Master volume (0.0-1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Use the silent simulated backend even if a sound card is available
    #[arg(long)]
    simulate: bool,

    /// Simulated length of every track, in seconds
    #[arg(long, default_value = "20")]
    track_secs: u64,

    /// How long to run before shutting down, in seconds
    #[arg(long, default_value = "60")]
    run_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    init_tracing(&config.logging)?;

    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => warn!("No configuration location, using compiled defaults"),
    }

    let backend = device_backend(&args).unwrap_or_else(|| {
        info!("Using the simulated audio backend");
        let backend = SimulatedBackend::new();
        backend.set_load_latency(Duration::from_millis(40));
        backend.set_track_length(Some(Duration::from_secs(args.track_secs.max(1))));
        Arc::new(backend)
    });

    let engine = AmbientEngine::from_config(&config, backend)
        .context("Failed to initialize ambient engine")?;
    info!("Ambient engine initialized");

    let mut events = engine.subscribe_events();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize {} event: {}", event.name(), e),
            }
        }
    });

    if let Some(volume) = args.volume {
        engine.set_volume(volume).await;
    }

    match (args.genre, args.weather) {
        (Some(genre), _) => engine.play_music(genre).await,
        (None, Some(weather)) => engine.play_weather_sound(weather, args.season).await,
        (None, None) => info!("No --weather or --genre given, idling"),
    }

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(args.run_secs)) => {
            info!("Run time elapsed");
        }
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down");
        }
    }

    let snapshot = engine.snapshot().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?
    );

    engine.shutdown().await;
    printer.abort();
    info!("Shutdown complete");
    Ok(())
}

#[cfg(feature = "device")]
fn device_backend(args: &Args) -> Option<Arc<dyn AudioBackend>> {
    if args.simulate {
        return None;
    }
    info!("Playing through the default output device");
    Some(Arc::new(ambient_engine::audio::DeviceBackend::new()))
}

#[cfg(not(feature = "device"))]
fn device_backend(_args: &Args) -> Option<Arc<dyn AudioBackend>> {
    None
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins. Otherwise `[logging] level` applies to the engine
/// (debug if unset) while ambient_common stays at info. A configured log
/// file gets a second, non-ANSI layer.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ambient_engine={},ambient_common=info",
            logging.level
        ))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}
