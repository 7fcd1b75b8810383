use super::*;
use tempfile::tempdir;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.sources.channel_capacity, 4);
    assert_eq!(config.sources.idle_pause_ms, 250);
    assert!(config.sources.follow);
    assert!(config.sources.live);
    assert_eq!(config.sources.find_attempts, 500);
    assert_eq!(config.sources.stale_timeout(), None);
    assert!(!config.timing.enabled);
    assert!(config.timing_hook().is_none());
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config: Config = toml::from_str(
        r#"
        [filters]
        file_deny = ['\.lock$']

        [sources]
        follow = false
        "#,
    )
    .unwrap();

    assert_eq!(config.filters.file_deny, vec![r"\.lock$".to_string()]);
    assert!(!config.sources.follow);
    assert_eq!(config.sources.channel_capacity, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_zero_idle_pause() {
    let mut config = Config::default();
    config.sources.idle_pause_ms = 0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("sources.idle_pause_ms"));
}

#[test]
fn test_validate_rejects_zero_find_attempts() {
    let mut config = Config::default();
    config.sources.find_attempts = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_stale_timeout() {
    let mut config = Config::default();
    config.sources.stale_timeout_secs = Some(0);
    assert!(config.validate().is_err());

    config.sources.stale_timeout_secs = Some(30);
    assert!(config.validate().is_ok());
    assert_eq!(config.sources.stale_timeout(), Some(Duration::from_secs(30)));
}

#[test]
fn test_validate_rejects_bad_regex() {
    let mut config = Config::default();
    config.filters.user_allow = vec!["[unterminated".to_string()];
    let err = config.validate().unwrap_err();
    assert!(matches!(
        err,
        LogmillError::Config(ConfigError::InvalidPattern { .. })
    ));
}

#[test]
fn test_compile_filters() {
    let mut config = Config::default();
    config.filters.file_deny = vec!["^/vendor/".to_string()];
    config.filters.user_allow = vec!["^alice$".to_string()];

    let filters = config.compile_filters().unwrap();
    assert!(!filters.allows_file("/vendor/lib.c"));
    assert!(filters.allows_file("/src/lib.c"));
    assert!(filters.allows_user("alice"));
    assert!(!filters.allows_user("bob"));
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.filters.file_allow = vec![r"\.rs$".to_string()];
    config.sources.channel_capacity = 1;
    config.sources.stale_timeout_secs = Some(10);
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.filters.file_allow, config.filters.file_allow);
    assert_eq!(loaded.sources.channel_capacity, 1);
    assert_eq!(loaded.sources.stale_timeout_secs, Some(10));
}

#[test]
fn test_from_file_missing() {
    let dir = tempdir().unwrap();
    let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(
        err,
        LogmillError::Config(ConfigError::FileNotFound(_))
    ));
}

#[test]
fn test_from_file_invalid_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[sources\nfollow = ").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(
        err,
        LogmillError::Config(ConfigError::ParseFailed(_))
    ));
}

#[test]
fn test_parse_bool() {
    assert_eq!(parse_bool("TRUE"), Some(true));
    assert_eq!(parse_bool(" off "), Some(false));
    assert_eq!(parse_bool("maybe"), None);
}

#[test]
fn test_env_overrides() {
    // Only this test touches these variables
    unsafe {
        std::env::set_var("LOGMILL_CHANNEL_CAPACITY", "9");
        std::env::set_var("LOGMILL_FOLLOW", "no");
        std::env::set_var("LOGMILL_LIVE", "off");
        std::env::set_var("LOGMILL_TIMING", "1");
    }

    let mut config = Config::default();
    config.apply_env_overrides();

    unsafe {
        std::env::remove_var("LOGMILL_CHANNEL_CAPACITY");
        std::env::remove_var("LOGMILL_FOLLOW");
        std::env::remove_var("LOGMILL_LIVE");
        std::env::remove_var("LOGMILL_TIMING");
    }

    assert_eq!(config.sources.channel_capacity, 9);
    assert!(!config.sources.follow);
    assert!(!config.sources.live);
    assert!(config.timing.enabled);
    assert!(config.timing_hook().is_some());
}
