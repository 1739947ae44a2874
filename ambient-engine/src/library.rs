//! Track library
//!
//! Static catalog of audio assets tagged by context. Lookups are pure: a
//! context key maps to a pool (possibly empty, which means "no ambient audio
//! for this context"). Tracks are created once when the library is built and
//! shared as `Arc<Track>` for the life of the process.

use ambient_common::config::CatalogEntry;
use ambient_common::{Error, Genre, Result, SeasonMode, WeatherMode};
use std::path::Path;
use std::sync::Arc;

/// What a track is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackCategory {
    Weather(WeatherMode),
    Music(Genre),
}

/// One playable asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track {
    /// Opaque asset path, resolved by the audio backend
    pub path: String,

    pub category: TrackCategory,

    pub display_name: String,

    /// Weather tracks only: restrict to one season
    pub season: Option<SeasonMode>,
}

impl Track {
    pub fn new(path: impl Into<String>, display_name: impl Into<String>, category: TrackCategory) -> Self {
        Self {
            path: path.into(),
            category,
            display_name: display_name.into(),
            season: None,
        }
    }

    pub fn with_season(mut self, season: SeasonMode) -> Self {
        self.season = Some(season);
        self
    }
}

/// An ordered pool of tracks for one context
pub type Pool = Vec<Arc<Track>>;

struct BuiltinTrack {
    path: &'static str,
    name: &'static str,
    category: TrackCategory,
    season: Option<SeasonMode>,
}

const fn weather(
    path: &'static str,
    name: &'static str,
    mode: WeatherMode,
    season: Option<SeasonMode>,
) -> BuiltinTrack {
    BuiltinTrack {
        path,
        name,
        category: TrackCategory::Weather(mode),
        season,
    }
}

const fn music(path: &'static str, name: &'static str, genre: Genre) -> BuiltinTrack {
    BuiltinTrack {
        path,
        name,
        category: TrackCategory::Music(genre),
        season: None,
    }
}

// Clear weather and Genre::None intentionally have no entries.
const BUILTIN_TRACKS: &[BuiltinTrack] = &[
    weather("sounds/weather/rain-light.mp3", "Light Rain", WeatherMode::Rain, None),
    weather("sounds/weather/rain-roof.mp3", "Rain on the Roof", WeatherMode::Rain, None),
    weather("sounds/weather/rain-window.mp3", "Rain at the Window", WeatherMode::Rain, None),
    weather("sounds/weather/rain-autumn-leaves.mp3", "Rain on Autumn Leaves", WeatherMode::Rain, Some(SeasonMode::Fall)),
    weather("sounds/weather/snow-hush.mp3", "Snowfall Hush", WeatherMode::Snow, None),
    weather("sounds/weather/snow-footsteps.mp3", "Footsteps in Snow", WeatherMode::Snow, None),
    weather("sounds/weather/snow-fireplace.mp3", "Fireplace and Snow", WeatherMode::Snow, Some(SeasonMode::Winter)),
    weather("sounds/weather/sunshine-meadow.mp3", "Sunny Meadow", WeatherMode::Sunshine, None),
    weather("sounds/weather/sunshine-cicadas.mp3", "Cicadas", WeatherMode::Sunshine, Some(SeasonMode::Summer)),
    weather("sounds/weather/sunshine-breeze.mp3", "Warm Breeze", WeatherMode::Sunshine, None),
    weather("sounds/weather/cloudy-wind.mp3", "Grey Wind", WeatherMode::Cloudy, None),
    weather("sounds/weather/cloudy-distant-thunder.mp3", "Distant Thunder", WeatherMode::Cloudy, None),
    weather("sounds/weather/bloomy-birds.mp3", "Morning Birds", WeatherMode::Bloomy, None),
    weather("sounds/weather/bloomy-bees.mp3", "Bees in Blossom", WeatherMode::Bloomy, Some(SeasonMode::Spring)),
    weather("sounds/weather/blizzard-gale.mp3", "Blizzard Gale", WeatherMode::Blizzard, None),
    weather("sounds/weather/blizzard-whiteout.mp3", "Whiteout", WeatherMode::Blizzard, None),
    weather("sounds/weather/hurricane-surge.mp3", "Storm Surge", WeatherMode::Hurricane, None),
    weather("sounds/weather/hurricane-howl.mp3", "Howling Wind", WeatherMode::Hurricane, None),
    weather("sounds/weather/tornado-rumble.mp3", "Tornado Rumble", WeatherMode::Tornado, None),
    music("sounds/music/lofi-rainy-desk.mp3", "Rainy Desk", Genre::Lofi),
    music("sounds/music/lofi-tape-loop.mp3", "Tape Loop", Genre::Lofi),
    music("sounds/music/lofi-night-bus.mp3", "Night Bus", Genre::Lofi),
    music("sounds/music/lofi-cat-nap.mp3", "Cat Nap", Genre::Lofi),
    music("sounds/music/jazz-blue-room.mp3", "Blue Room", Genre::Jazz),
    music("sounds/music/jazz-late-set.mp3", "Late Set", Genre::Jazz),
    music("sounds/music/jazz-brushes.mp3", "Brushes", Genre::Jazz),
    music("sounds/music/rnb-slow-jam.mp3", "Slow Jam", Genre::Rnb),
    music("sounds/music/rnb-velvet.mp3", "Velvet", Genre::Rnb),
    music("sounds/music/rnb-after-hours.mp3", "After Hours", Genre::Rnb),
    music("sounds/music/ambient-drift.mp3", "Drift", Genre::Ambient),
    music("sounds/music/ambient-tidal.mp3", "Tidal", Genre::Ambient),
    music("sounds/music/ambient-glacier.mp3", "Glacier", Genre::Ambient),
    music("sounds/music/rap-boom-bap.mp3", "Boom Bap", Genre::Rap),
    music("sounds/music/rap-cipher.mp3", "Cipher", Genre::Rap),
    music("sounds/music/rap-block-party.mp3", "Block Party", Genre::Rap),
    music("sounds/music/smooth-sax.mp3", "Sunday Sax", Genre::Smooth),
    music("sounds/music/smooth-keys.mp3", "Soft Keys", Genre::Smooth),
    music("sounds/music/smooth-coastline.mp3", "Coastline", Genre::Smooth),
];

/// Static catalog of tracks
#[derive(Debug, Clone)]
pub struct TrackLibrary {
    tracks: Vec<Arc<Track>>,
}

impl TrackLibrary {
    /// Library built from the compiled-in table
    pub fn builtin() -> Self {
        let tracks = BUILTIN_TRACKS
            .iter()
            .map(|entry| {
                Arc::new(Track {
                    path: entry.path.to_string(),
                    category: entry.category,
                    display_name: entry.name.to_string(),
                    season: entry.season,
                })
            })
            .collect();
        Self { tracks }
    }

    /// Library from explicit tracks (order is preserved)
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        Self {
            tracks: tracks.into_iter().map(Arc::new).collect(),
        }
    }

    /// Library from `[[tracks]]` config entries
    ///
    /// Each entry needs exactly one of `weather` / `genre`. Entries for
    /// `clear` weather or `genre = "none"` are rejected: those contexts
    /// mean silence.
    pub fn from_entries(entries: &[CatalogEntry]) -> Result<Self> {
        let mut tracks = Vec::with_capacity(entries.len());

        for entry in entries {
            if entry.path.trim().is_empty() {
                return Err(Error::InvalidInput("Catalog entry with empty path".to_string()));
            }

            let category = match (entry.weather, entry.genre) {
                (Some(WeatherMode::Clear), None) => {
                    return Err(Error::InvalidInput(format!(
                        "{}: clear weather cannot have tracks",
                        entry.path
                    )))
                }
                (Some(w), None) => TrackCategory::Weather(w),
                (None, Some(Genre::None)) => {
                    return Err(Error::InvalidInput(format!(
                        "{}: genre 'none' cannot have tracks",
                        entry.path
                    )))
                }
                (None, Some(g)) => TrackCategory::Music(g),
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "{}: exactly one of weather or genre is required",
                        entry.path
                    )))
                }
            };

            if entry.season.is_some() && matches!(category, TrackCategory::Music(_)) {
                return Err(Error::InvalidInput(format!(
                    "{}: season only applies to weather tracks",
                    entry.path
                )));
            }

            let display_name = entry
                .name
                .clone()
                .unwrap_or_else(|| name_from_path(&entry.path));

            tracks.push(Track {
                path: entry.path.clone(),
                category,
                display_name,
                season: entry.season.filter(|s| *s != SeasonMode::None),
            });
        }

        Ok(Self::from_tracks(tracks))
    }

    /// Pool for a weather/season context
    ///
    /// Contains every season-less track for `weather` plus the tracks
    /// tagged with exactly `season`.
    pub fn tracks_for_weather_season(&self, weather: WeatherMode, season: SeasonMode) -> Pool {
        self.tracks
            .iter()
            .filter(|t| t.category == TrackCategory::Weather(weather))
            .filter(|t| match t.season {
                None => true,
                Some(s) => s == season,
            })
            .cloned()
            .collect()
    }

    /// Pool for a music genre
    pub fn tracks_for_genre(&self, genre: Genre) -> Pool {
        self.tracks
            .iter()
            .filter(|t| t.category == TrackCategory::Music(genre))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for TrackLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

fn name_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace(['-', '_'], " "))
        .unwrap_or_else(|| path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_has_no_tracks() {
        let library = TrackLibrary::builtin();
        for season in SeasonMode::all_variants() {
            assert!(library
                .tracks_for_weather_season(WeatherMode::Clear, *season)
                .is_empty());
        }
    }

    #[test]
    fn test_every_other_weather_has_tracks() {
        let library = TrackLibrary::builtin();
        for weather in WeatherMode::all_variants() {
            if *weather == WeatherMode::Clear {
                continue;
            }
            assert!(
                !library
                    .tracks_for_weather_season(*weather, SeasonMode::None)
                    .is_empty(),
                "{} should have a pool",
                weather
            );
        }
    }

    #[test]
    fn test_season_specific_tracks_only_in_their_season() {
        let library = TrackLibrary::builtin();
        let fall = library.tracks_for_weather_season(WeatherMode::Rain, SeasonMode::Fall);
        let spring = library.tracks_for_weather_season(WeatherMode::Rain, SeasonMode::Spring);

        assert_eq!(fall.len(), spring.len() + 1);
        assert!(fall.iter().any(|t| t.path.contains("autumn-leaves")));
        assert!(!spring.iter().any(|t| t.path.contains("autumn-leaves")));
    }

    #[test]
    fn test_genre_pools() {
        let library = TrackLibrary::builtin();
        assert!(library.tracks_for_genre(Genre::None).is_empty());
        assert_eq!(library.tracks_for_genre(Genre::Lofi).len(), 4);
        assert!(library
            .tracks_for_genre(Genre::Jazz)
            .iter()
            .all(|t| t.category == TrackCategory::Music(Genre::Jazz)));
    }

    #[test]
    fn test_pool_preserves_catalog_order() {
        let library = TrackLibrary::builtin();
        let pool = library.tracks_for_genre(Genre::Jazz);
        let names: Vec<&str> = pool.iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(names, vec!["Blue Room", "Late Set", "Brushes"]);
    }

    #[test]
    fn test_from_entries() {
        let entries = vec![
            CatalogEntry {
                path: "custom/heavy_rain.ogg".to_string(),
                name: None,
                weather: Some(WeatherMode::Rain),
                season: None,
                genre: None,
            },
            CatalogEntry {
                path: "custom/swing.ogg".to_string(),
                name: Some("Swing".to_string()),
                weather: None,
                season: None,
                genre: Some(Genre::Jazz),
            },
        ];

        let library = TrackLibrary::from_entries(&entries).unwrap();

        assert_eq!(library.len(), 2);
        let rain = library.tracks_for_weather_season(WeatherMode::Rain, SeasonMode::Summer);
        assert_eq!(rain[0].display_name, "heavy rain");
        assert_eq!(library.tracks_for_genre(Genre::Jazz)[0].display_name, "Swing");
    }

    #[test]
    fn test_from_entries_rejects_ambiguous_entry() {
        let entries = vec![CatalogEntry {
            path: "x.ogg".to_string(),
            name: None,
            weather: Some(WeatherMode::Rain),
            season: None,
            genre: Some(Genre::Jazz),
        }];
        assert!(TrackLibrary::from_entries(&entries).is_err());
    }

    #[test]
    fn test_from_entries_rejects_silent_contexts() {
        let clear = vec![CatalogEntry {
            path: "x.ogg".to_string(),
            name: None,
            weather: Some(WeatherMode::Clear),
            season: None,
            genre: None,
        }];
        assert!(TrackLibrary::from_entries(&clear).is_err());

        let no_genre = vec![CatalogEntry {
            path: "y.ogg".to_string(),
            name: None,
            weather: None,
            season: None,
            genre: Some(Genre::None),
        }];
        assert!(TrackLibrary::from_entries(&no_genre).is_err());
    }
}
