use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub capture: CaptureConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Collection path holding finalized session records.
    pub collection: String,

    /// Cap on records per library subscription.
    pub library_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    pub video: bool,
    pub audio: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Attempts before a transient failure becomes terminal.
    pub attempts: u32,

    /// First retry delay; doubles on each subsequent attempt.
    pub base_delay_ms: u64,
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize::<Config>()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "stagecall".to_string(),
            },
            store: StoreConfig {
                collection: "sessions".to_string(),
                library_limit: 20,
            },
            capture: CaptureConfig {
                video: true,
                audio: true,
            },
            retry: RetryConfig {
                attempts: 3,
                base_delay_ms: 1000,
            },
        }
    }
}
