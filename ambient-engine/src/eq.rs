//! EQ / loudness modulation
//!
//! Pure mappings from context to the parameters applied on the live graph:
//! - season → low-pass cutoff and gain multiplier (winter is muffled and a
//!   little quieter, summer is open and bright)
//! - weather → loudness scaling (storms louder than light rain)
//!
//! Music pools use the neutral profile: open filter, unit multipliers.

use ambient_common::events::PoolContext;
use ambient_common::{SeasonMode, WeatherMode};

/// Filter cutoff used when no seasonal colouring applies
pub const NEUTRAL_FILTER_HZ: f32 = 20_000.0;

/// Per-season filter and gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonModifiers {
    pub filter_freq_hz: f32,
    pub gain_mod: f32,
}

/// Per-weather loudness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherModifiers {
    pub volume_mod: f32,
}

/// Everything a transition applies for one pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProfile {
    pub filter_freq_hz: f32,
    pub gain_mod: f32,
    pub volume_mod: f32,
}

impl ToneProfile {
    /// Gain target for a master volume: `volume × volume_mod × gain_mod`,
    /// clamped to [0, 1]
    pub fn target_gain(&self, volume: f32) -> f32 {
        (volume * self.volume_mod * self.gain_mod).clamp(0.0, 1.0)
    }
}

impl Default for ToneProfile {
    fn default() -> Self {
        Self {
            filter_freq_hz: NEUTRAL_FILTER_HZ,
            gain_mod: 1.0,
            volume_mod: 1.0,
        }
    }
}

pub fn season_modifiers(season: SeasonMode) -> SeasonModifiers {
    let (filter_freq_hz, gain_mod) = match season {
        SeasonMode::Spring => (14_000.0, 1.0),
        SeasonMode::Summer => (18_000.0, 1.05),
        SeasonMode::Fall => (7_500.0, 0.95),
        SeasonMode::Winter => (3_500.0, 0.9),
        SeasonMode::None => (NEUTRAL_FILTER_HZ, 1.0),
    };
    SeasonModifiers {
        filter_freq_hz,
        gain_mod,
    }
}

pub fn weather_modifiers(weather: WeatherMode) -> WeatherModifiers {
    let volume_mod = match weather {
        WeatherMode::Clear => 0.0,
        WeatherMode::Rain => 0.7,
        WeatherMode::Snow => 0.5,
        WeatherMode::Sunshine => 0.6,
        WeatherMode::Cloudy => 0.6,
        WeatherMode::Bloomy => 0.65,
        WeatherMode::Blizzard => 0.9,
        WeatherMode::Hurricane => 1.0,
        WeatherMode::Tornado => 0.95,
    };
    WeatherModifiers { volume_mod }
}

/// Combined profile for a pool context
pub fn profile_for(context: &PoolContext) -> ToneProfile {
    match *context {
        PoolContext::Weather { weather, season } => {
            let s = season_modifiers(season);
            ToneProfile {
                filter_freq_hz: s.filter_freq_hz,
                gain_mod: s.gain_mod,
                volume_mod: weather_modifiers(weather).volume_mod,
            }
        }
        PoolContext::Music { .. } => ToneProfile::default(),
    }
}
