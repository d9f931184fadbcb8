//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use message_dispatch::config::{
    DispatchConfig, LoggingConfig, PoolConfig, SchedulerConfig, DEFAULT_FLUSH_INTERVAL,
};
use message_dispatch::error::DispatchError;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = DispatchConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.scheduler.flush_interval, DEFAULT_FLUSH_INTERVAL);
}

#[test]
fn test_zero_free_list_capacity() {
    let mut config = DispatchConfig::default();
    config.pool.free_list_capacity = 0;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Free list capacity must be greater than 0")));
}

#[test]
fn test_excessive_free_list_capacity() {
    let mut config = DispatchConfig::default();
    config.pool.free_list_capacity = 2_000_000;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Free list capacity too large")));
}

#[test]
fn test_preallocate_exceeds_capacity() {
    let config = DispatchConfig::default_with_overrides(|c| {
        c.pool = PoolConfig {
            free_list_capacity: 4,
            preallocate: 8,
        };
    });

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot exceed free list capacity")));
}

#[test]
fn test_flush_interval_bounds() {
    let mut config = DispatchConfig::default();

    config.scheduler.flush_interval = Duration::from_micros(200);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Flush interval too short")));

    config.scheduler.flush_interval = Duration::from_millis(1500);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Flush interval too long")));

    config.scheduler.flush_interval = Duration::from_secs(1);
    assert!(config.validate().is_empty());
}

#[test]
fn test_empty_app_name() {
    let mut config = DispatchConfig::default();
    config.logging.app_name = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_long_app_name() {
    let mut config = DispatchConfig::default();
    config.logging.app_name = "x".repeat(65);

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Application name too long")));
}

#[test]
fn test_validate_strict_collects_all_errors() {
    let config = DispatchConfig {
        pool: PoolConfig {
            free_list_capacity: 0,
            preallocate: 1,
        },
        scheduler: SchedulerConfig {
            flush_interval: Duration::ZERO,
            flush_on_shutdown: true,
        },
        logging: LoggingConfig::default(),
    };

    match config.validate_strict() {
        Err(DispatchError::ConfigError(msg)) => {
            assert!(msg.contains("Free list capacity"));
            assert!(msg.contains("Preallocate"));
            assert!(msg.contains("Flush interval"));
        }
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_from_toml() {
    let config = DispatchConfig::from_toml(
        r#"
        [pool]
        free_list_capacity = 512
        preallocate = 32

        [scheduler]
        flush_interval = 25
        flush_on_shutdown = false

        [logging]
        app_name = "gameworld"
        log_level = "debug"
        json_format = true
        "#,
    )
    .expect("Config should parse");

    assert_eq!(config.pool.free_list_capacity, 512);
    assert_eq!(config.pool.preallocate, 32);
    assert_eq!(config.scheduler.flush_interval, Duration::from_millis(25));
    assert!(!config.scheduler.flush_on_shutdown);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
    assert!(config.validate().is_empty());
}

#[test]
fn test_partial_toml_uses_defaults() {
    let config = DispatchConfig::from_toml(
        r#"
        [pool]
        free_list_capacity = 64
        "#,
    )
    .unwrap();

    assert_eq!(config.pool.preallocate, 0);
    assert_eq!(config.scheduler.flush_interval, DEFAULT_FLUSH_INTERVAL);
}

#[test]
fn test_invalid_log_level_rejected() {
    let result = DispatchConfig::from_toml(
        r#"
        [logging]
        app_name = "x"
        log_level = "loud"
        json_format = false
        "#,
    );
    assert!(matches!(result, Err(DispatchError::ConfigError(_))));
}

#[test]
fn test_example_config_roundtrips() {
    let text = DispatchConfig::example_config();
    let parsed = DispatchConfig::from_toml(&text).expect("Example config should parse");
    assert_eq!(parsed.pool.free_list_capacity, PoolConfig::default().free_list_capacity);
    assert_eq!(parsed.scheduler.flush_interval, DEFAULT_FLUSH_INTERVAL);
}

#[test]
fn test_save_and_load_file() {
    let path = std::env::temp_dir().join(format!("dispatch-config-{}.toml", std::process::id()));
    let config = DispatchConfig::default_with_overrides(|c| c.pool.free_list_capacity = 99);

    config.save_to_file(&path).unwrap();
    let loaded = DispatchConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.pool.free_list_capacity, 99);
}

#[test]
fn test_missing_file() {
    let result = DispatchConfig::from_file("/nonexistent/dispatch.toml");
    assert!(matches!(result, Err(DispatchError::ConfigError(_))));
}
