//! # Ambient Common Library
//!
//! Shared code for the ambient audio engine and its hosts:
//! - Context signal enums (weather, season, music genre)
//! - Event types (AmbientEvent enum)
//! - Linear ramp model used for every live parameter change
//! - TOML bootstrap configuration loading
//! - Common error type

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod ramp;

pub use context::{Genre, SeasonMode, WeatherMode};
pub use error::{Error, Result};
pub use ramp::Ramp;
