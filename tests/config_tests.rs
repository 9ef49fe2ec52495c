mod common;

use parley::config::Config;
use tempfile::tempdir;

#[test]
fn test_config_round_trip_on_disk() {
    common::setup_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    assert!(Config::load_from(&path).unwrap().is_none());

    let mut config = Config::new("http://localhost:3000", "ws://localhost:3001", "u1", "me@example.com");
    config.set_secret("s3cret");
    config.notification_sound = "ding.mp3".into();
    config.save_to(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"hubUrl\""));
    assert!(!raw.contains("s3cret"));

    let loaded = Config::load_from(&path).unwrap().unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.secret().unwrap(), b"s3cret");
    assert_eq!(loaded.identity().notification_sound, "ding.mp3");
}

#[test]
fn test_partial_file_reports_missing_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"apiUrl": "http://localhost:3000", "email": "me@example.com"}"#).unwrap();

    let loaded = Config::load_from(&path).unwrap().unwrap();
    assert_eq!(loaded.missing_fields(), vec!["hubUrl", "userId", "tokenSecret"]);
    assert!(loaded.secret().is_err());
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load_from(&path).is_err());
}
