// Integration tests for configuration loading

use std::fs;
use std::time::Duration;

use anyhow::Result;
use stagecall::Config;
use tempfile::TempDir;

#[test]
fn test_load_reads_the_checked_in_config() -> Result<()> {
    let cfg = Config::load("config/stagecall")?;

    assert_eq!(cfg.service.name, "stagecall");
    assert_eq!(cfg.store.collection, "sessions");
    assert_eq!(cfg.store.library_limit, 20);
    assert!(cfg.capture.video);
    assert!(cfg.capture.audio);
    assert_eq!(cfg.retry.attempts, 3);
    assert_eq!(cfg.retry.base_delay(), Duration::from_millis(1000));

    Ok(())
}

#[test]
fn test_load_reads_a_custom_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[service]
name = "stagecall-test"

[store]
collection = "test-sessions"
library_limit = 5

[capture]
video = true
audio = false

[retry]
attempts = 2
base_delay_ms = 10
"#,
    )?;

    let cfg = Config::load(path.to_str().expect("utf-8 temp path"))?;

    assert_eq!(cfg.service.name, "stagecall-test");
    assert_eq!(cfg.store.collection, "test-sessions");
    assert_eq!(cfg.store.library_limit, 5);
    assert!(!cfg.capture.audio);
    assert_eq!(cfg.retry.attempts, 2);

    Ok(())
}

#[test]
fn test_missing_config_fails_to_load() {
    assert!(Config::load("config/does-not-exist").is_err());
}

#[test]
fn test_defaults_match_the_checked_in_config() -> Result<()> {
    let defaults = Config::default();
    let loaded = Config::load("config/stagecall")?;

    assert_eq!(defaults.service.name, loaded.service.name);
    assert_eq!(defaults.store.collection, loaded.store.collection);
    assert_eq!(defaults.store.library_limit, loaded.store.library_limit);
    assert_eq!(defaults.retry.attempts, loaded.retry.attempts);

    Ok(())
}
