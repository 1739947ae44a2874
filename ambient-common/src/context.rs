//! Context signals supplied by the host's environment provider
//!
//! The engine treats these as opaque keys: they select a track pool and the
//! EQ/loudness modifiers applied to it. Each enum parses from and renders to
//! the lowercase names used in configuration files and preference storage.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current weather mode reported by the context provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherMode {
    /// Clear sky. Has no ambient pool, so it always means silence.
    Clear,
    Rain,
    Snow,
    Sunshine,
    Cloudy,
    Bloomy,
    Blizzard,
    Hurricane,
    Tornado,
}

impl WeatherMode {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherMode::Clear => "clear",
            WeatherMode::Rain => "rain",
            WeatherMode::Snow => "snow",
            WeatherMode::Sunshine => "sunshine",
            WeatherMode::Cloudy => "cloudy",
            WeatherMode::Bloomy => "bloomy",
            WeatherMode::Blizzard => "blizzard",
            WeatherMode::Hurricane => "hurricane",
            WeatherMode::Tornado => "tornado",
        }
    }

    /// Get all weather variants
    pub fn all_variants() -> &'static [WeatherMode] {
        &[
            WeatherMode::Clear,
            WeatherMode::Rain,
            WeatherMode::Snow,
            WeatherMode::Sunshine,
            WeatherMode::Cloudy,
            WeatherMode::Bloomy,
            WeatherMode::Blizzard,
            WeatherMode::Hurricane,
            WeatherMode::Tornado,
        ]
    }
}

/// Current season. `None` means the host has no seasonal context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeasonMode {
    Spring,
    Summer,
    Fall,
    Winter,
    #[default]
    None,
}

impl SeasonMode {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonMode::Spring => "spring",
            SeasonMode::Summer => "summer",
            SeasonMode::Fall => "fall",
            SeasonMode::Winter => "winter",
            SeasonMode::None => "none",
        }
    }

    /// Get all season variants
    pub fn all_variants() -> &'static [SeasonMode] {
        &[
            SeasonMode::Spring,
            SeasonMode::Summer,
            SeasonMode::Fall,
            SeasonMode::Winter,
            SeasonMode::None,
        ]
    }
}

/// Explicit music genre selection. `None` means no music selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Lofi,
    Jazz,
    Rnb,
    Ambient,
    Rap,
    Smooth,
    #[default]
    None,
}

impl Genre {
    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Lofi => "lofi",
            Genre::Jazz => "jazz",
            Genre::Rnb => "rnb",
            Genre::Ambient => "ambient",
            Genre::Rap => "rap",
            Genre::Smooth => "smooth",
            Genre::None => "none",
        }
    }

    /// Get all genre variants
    pub fn all_variants() -> &'static [Genre] {
        &[
            Genre::Lofi,
            Genre::Jazz,
            Genre::Rnb,
            Genre::Ambient,
            Genre::Rap,
            Genre::Smooth,
            Genre::None,
        ]
    }
}

impl FromStr for WeatherMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        WeatherMode::all_variants()
            .iter()
            .copied()
            .find(|w| w.as_str() == lowered)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown weather mode: {}", s)))
    }
}

impl FromStr for SeasonMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            // "autumn" is accepted as an alias
            "autumn" => Ok(SeasonMode::Fall),
            "" => Ok(SeasonMode::None),
            lowered => SeasonMode::all_variants()
                .iter()
                .copied()
                .find(|season| season.as_str() == lowered)
                .ok_or_else(|| Error::InvalidInput(format!("Unknown season: {}", s))),
        }
    }
}

impl FromStr for Genre {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "r&b" | "r-and-b" => Ok(Genre::Rnb),
            "lo-fi" => Ok(Genre::Lofi),
            "" => Ok(Genre::None),
            lowered => Genre::all_variants()
                .iter()
                .copied()
                .find(|g| g.as_str() == lowered)
                .ok_or_else(|| Error::InvalidInput(format!("Unknown genre: {}", s))),
        }
    }
}

impl fmt::Display for WeatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SeasonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
