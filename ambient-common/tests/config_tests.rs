//! Configuration loading and graceful degradation tests
//!
//! Covers:
//! - Missing TOML files do not prevent startup (defaults are used)
//! - Malformed TOML files are reported
//! - Config path resolution priority (CLI > env var > platform dir)
//!
//! Note: Uses serial_test to prevent environment variable races.
//! Tests that manipulate AMBIENT_CONFIG are marked with #[serial].

use ambient_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = TomlConfig::load_or_default(Some(&missing)).unwrap();

    assert_eq!(config.timing.fade_out_ms, 300);
    assert!(config.tracks.is_empty());
    assert!(config.preferences_path.is_none());
}

#[test]
fn test_no_location_uses_defaults() {
    let config = TomlConfig::load_or_default(None).unwrap();
    assert_eq!(config.timing.fade_in_ms, 500);
}

#[test]
fn test_valid_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        preferences_path = "/var/tmp/ambient-prefs.toml"

        [timing]
        fade_out_ms = 150
        max_retries = 2

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = TomlConfig::load_or_default(Some(&path)).unwrap();

    assert_eq!(config.timing.fade_out_ms, 150);
    assert_eq!(config.timing.max_retries, 2);
    assert_eq!(config.timing.stop_fade_ms, 400);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.preferences_path(),
        PathBuf::from("/var/tmp/ambient-prefs.toml")
    );
}

#[test]
fn test_malformed_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[timing\nfade_out_ms = ").unwrap();

    let result = TomlConfig::load_or_default(Some(&path));

    assert!(result.is_err(), "Malformed TOML should be reported");
}

#[test]
fn test_unknown_weather_in_catalog_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [[tracks]]
        path = "x.ogg"
        weather = "drizzle"
        "#,
    )
    .unwrap();

    assert!(TomlConfig::load(&path).is_err());
}

#[test]
#[serial]
fn test_cli_path_takes_precedence() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_platform_default_without_overrides() {
    env::remove_var(CONFIG_ENV_VAR);

    if let Some(path) = resolve_config_path(None) {
        assert!(path.ends_with("ambient/config.toml"));
    }
}
