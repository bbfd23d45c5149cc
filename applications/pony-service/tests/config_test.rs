/// Service configuration tests
/// Tests file loading, environment overrides and validation
use pony_playback::PlayMode;
use pony_service::{ServiceConfig, ServiceError};
use std::time::Duration;
use tempfile::TempDir;

fn no_env() -> config::Map<String, String> {
    config::Map::new()
}

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("pony.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

/// Test defaults apply when nothing is configured
#[test]
fn test_defaults() {
    let config = ServiceConfig::load_with_env(None, no_env()).unwrap();

    assert_eq!(config.playback.progress_interval_ms, 300);
    assert_eq!(config.playback.play_mode, PlayMode::LoopAll);
    assert_eq!(config.playback.volume, 1.0);
    assert!(config.notification.enabled);
    assert!(!config.notification.custom_layout);
    assert!(config.notification.load_covers);
    assert!(config.validate().is_ok());
}

/// Test values are read from a TOML file
#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[playback]
progress_interval_ms = 250
play_mode = "shuffle"

[notification]
custom_layout = true
"#,
    );

    let config = ServiceConfig::load_with_env(Some(&path), no_env()).unwrap();
    assert_eq!(config.playback.progress_interval_ms, 250);
    assert_eq!(config.playback.play_mode, PlayMode::Shuffle);
    // Unset keys keep their defaults
    assert_eq!(config.playback.volume, 1.0);
    assert!(config.notification.custom_layout);
    assert!(config.notification.enabled);
}

/// Test environment variables override the file
#[test]
fn test_env_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[playback]\nplay_mode = \"sequential\"\nvolume = 0.8\n");

    let mut env = no_env();
    env.insert("PONY_PLAYBACK__PLAY_MODE".to_string(), "loop_one".to_string());
    env.insert("PONY_NOTIFICATION__LOAD_COVERS".to_string(), "false".to_string());

    let config = ServiceConfig::load_with_env(Some(&path), env).unwrap();
    assert_eq!(config.playback.play_mode, PlayMode::LoopOne);
    assert_eq!(config.playback.volume, 0.8);
    assert!(!config.notification.load_covers);
}

/// Test an explicit path must exist
#[test]
fn test_missing_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    let result = ServiceConfig::load_with_env(Some(&path), no_env());
    assert!(matches!(result, Err(ServiceError::Config(_))));
}

/// Test malformed files are reported
#[test]
fn test_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[playback]\nplay_mode = \"backwards\"\n");

    let result = ServiceConfig::load_with_env(Some(&path), no_env());
    assert!(matches!(result, Err(ServiceError::Config(_))));
}

/// Test validation of the progress interval bounds
#[test]
fn test_validate_progress_interval() {
    let mut config = ServiceConfig::default();

    for ms in [200, 300, 500] {
        config.playback.progress_interval_ms = ms;
        assert!(config.validate().is_ok(), "{}ms should be accepted", ms);
    }
    for ms in [0, 199, 501, 10_000] {
        config.playback.progress_interval_ms = ms;
        assert!(config.validate().is_err(), "{}ms should be rejected", ms);
    }
}

/// Test validation of volume and log filter
#[test]
fn test_validate_volume_and_filter() {
    let mut config = ServiceConfig::default();
    config.playback.volume = 1.5;
    assert!(config.validate().is_err());

    config.playback.volume = 0.0;
    assert!(config.validate().is_ok());

    config.logging.filter = "  ".to_string();
    assert!(config.validate().is_err());
}

/// Test the engine configuration derived from the playback section
#[test]
fn test_playback_config() {
    let mut config = ServiceConfig::default();
    config.playback.progress_interval_ms = 400;
    config.playback.play_mode = PlayMode::Shuffle;
    config.playback.volume = 0.25;

    let playback = config.playback_config();
    assert_eq!(playback.progress_interval, Duration::from_millis(400));
    assert_eq!(playback.play_mode, PlayMode::Shuffle);
    assert_eq!(playback.volume, (0.25, 0.25));
}

/// Test the printed configuration loads back unchanged
#[test]
fn test_printed_config_reloads() {
    let mut original = ServiceConfig::default();
    original.playback.play_mode = PlayMode::Sequential;
    original.notification.custom_layout = true;

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &toml::to_string_pretty(&original).unwrap());

    let loaded = ServiceConfig::load_with_env(Some(&path), no_env()).unwrap();
    assert_eq!(loaded.playback.play_mode, PlayMode::Sequential);
    assert_eq!(loaded.playback.progress_interval_ms, 300);
    assert!(loaded.notification.custom_layout);
    assert_eq!(loaded.logging.filter, original.logging.filter);
}
