use std::io::Write as _;

use tempfile::Builder;

use super::*;

#[test]
fn defaults_apply_when_nothing_is_set() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert_eq!(settings.cache.capacity.get(), DEFAULT_CAPACITY);
    assert_eq!(settings.cache.scope, DEFAULT_SCOPE);
    assert_eq!(settings.storage.backend, StorageBackend::Memory);
    assert_eq!(settings.storage.directory, PathBuf::from(DEFAULT_STORAGE_DIR));
}

#[test]
fn json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    raw.logging.json = Some(true);
    raw.logging.level = Some("debug".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.logging.format, LogFormat::Json);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn zero_capacity_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.capacity = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero capacity");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.capacity",
            ..
        }
    ));
}

#[test]
fn blank_scope_is_rejected_and_scope_is_trimmed() {
    let mut raw = RawSettings::default();
    raw.cache.scope = Some("   ".to_string());
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.cache.scope = Some(" user-7 ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.scope, "user-7");
}

#[test]
fn storage_backend_parses_case_insensitively() {
    assert_eq!(StorageBackend::from_str("File"), Ok(StorageBackend::File));
    assert_eq!(StorageBackend::from_str(" memory "), Ok(StorageBackend::Memory));

    let mut raw = RawSettings::default();
    raw.storage.backend = Some("sqlite".to_string());
    let err = Settings::from_raw(raw).expect_err("unknown backend");
    assert!(err.to_string().contains("storage.backend"));
}

#[test]
fn explicit_config_file_is_loaded() {
    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "[cache]\ncapacity = 5\nscope = \"session-a\"\n\n[storage]\nbackend = \"file\"\ndirectory = \"/tmp/annotations\"\n\n[logging]\nlevel = \"warn\""
    )
    .expect("write config");

    let settings = load(Some(file.path())).expect("settings");
    assert_eq!(settings.cache.capacity.get(), 5);
    assert_eq!(settings.cache.scope, "session-a");
    assert_eq!(settings.storage.backend, StorageBackend::File);
    assert_eq!(settings.storage.directory, PathBuf::from("/tmp/annotations"));
    assert_eq!(settings.logging.level, LevelFilter::WARN);
}

#[test]
fn missing_explicit_config_file_fails() {
    let err = load(Some(Path::new("/nonexistent/annotations-config.toml")))
        .expect_err("missing file");
    assert!(matches!(err, LoadError::Build(_)));
}

#[test]
fn cache_config_follows_settings() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
    let config = crate::cache::CacheConfig::from(&settings.cache);
    assert_eq!(config.capacity, DEFAULT_CAPACITY);
}
