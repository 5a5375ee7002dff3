use sandtable_settings::{Config, ConfigError, SettingsError};
use tempfile::tempdir;

#[test]
fn test_toml_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::new();
    config.connection.port = "/dev/ttyACM0".to_string();
    config.transport.backoff_ms = 250;
    config.worker.default_accuracy = 0.5;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::new();
    config.machine.radius_limit_mm = 200.0;
    config.save_to_file(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"radius_limit_mm\": 200.0"));
    assert_eq!(Config::load_from_file(&path).unwrap(), config);
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.yaml");

    let err = Config::new().save_to_file(&path).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Config(ConfigError::UnsupportedFormat(ref ext)) if ext == "yaml"
    ));
    assert!(!path.exists());
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[transport]\nmotion_queue_capacity = 0\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::Config(ConfigError::ValueOutOfRange { .. })));

    std::fs::write(&path, "[transport\n").unwrap();
    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::TomlError(_))
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempdir().unwrap();
    let err = Config::load_from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::LoadError { .. }));
}
