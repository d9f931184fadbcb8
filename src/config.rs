//! # Configuration Management
//!
//! Centralized configuration for buffer pooling, flush scheduling and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults
//!
//! ## Defaults
//! - Free list capacity 2048 buffers, nothing preallocated
//! - Flush interval 10ms, final flush on shutdown

use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default soft cap on idle pooled buffers
pub const DEFAULT_FREE_LIST_CAPACITY: usize = 2048;

/// Default delay between flush cycles
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DispatchConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DispatchConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| DispatchError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| DispatchError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| DispatchError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("DISPATCH_FLUSH_INTERVAL_MS") {
            let millis = interval.parse::<u64>().map_err(|e| {
                DispatchError::ConfigError(format!("Invalid DISPATCH_FLUSH_INTERVAL_MS: {e}"))
            })?;
            config.scheduler.flush_interval = Duration::from_millis(millis);
        }

        if let Ok(capacity) = std::env::var("DISPATCH_FREE_LIST_CAPACITY") {
            config.pool.free_list_capacity = capacity.parse::<usize>().map_err(|e| {
                DispatchError::ConfigError(format!("Invalid DISPATCH_FREE_LIST_CAPACITY: {e}"))
            })?;
        }

        if let Ok(preallocate) = std::env::var("DISPATCH_PREALLOCATE") {
            config.pool.preallocate = preallocate.parse::<usize>().map_err(|e| {
                DispatchError::ConfigError(format!("Invalid DISPATCH_PREALLOCATE: {e}"))
            })?;
        }

        if let Ok(level) = std::env::var("DISPATCH_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                DispatchError::ConfigError(format!("Invalid DISPATCH_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DispatchError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| DispatchError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.pool.validate());
        errors.extend(self.scheduler.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Buffer pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Idle buffers kept for reuse; releases beyond this are freed
    pub free_list_capacity: usize,

    /// Buffers constructed up front when the pool is created
    #[serde(default)]
    pub preallocate: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            free_list_capacity: DEFAULT_FREE_LIST_CAPACITY,
            preallocate: 0,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.free_list_capacity == 0 {
            errors.push("Free list capacity must be greater than 0".to_string());
        } else if self.free_list_capacity > 1_000_000 {
            errors.push(format!(
                "Free list capacity too large: {} (maximum: 1000000)",
                self.free_list_capacity
            ));
        }

        if self.preallocate > self.free_list_capacity {
            errors.push(format!(
                "Preallocate ({}) cannot exceed free list capacity ({})",
                self.preallocate, self.free_list_capacity
            ));
        }

        errors
    }
}

/// Flush scheduler configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Delay between flush cycles
    #[serde(with = "duration_serde")]
    pub flush_interval: Duration,

    /// Run one last flush when the scheduler shuts down
    pub flush_on_shutdown: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            flush_on_shutdown: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.flush_interval.as_millis() < 1 {
            errors.push("Flush interval too short (minimum: 1ms)".to_string());
        } else if self.flush_interval > Duration::from_secs(1) {
            errors.push("Flush interval too long (maximum: 1s)".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("message-dispatch"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        level.as_str().to_lowercase().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
