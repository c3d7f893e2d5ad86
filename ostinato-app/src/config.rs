//! Simple configuration for the Ostinato host
//!
//! Reads `key=value` lines from the user's config directory. Anything missing
//! or unreadable falls back to the defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ostinato_engine::{ContentionPolicy, ControlConfig, EngineConfig};
use tracing::warn;

/// Host configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Port handed to the control front end
    pub port: u16,
    /// Controller to announce ourselves to at startup
    pub ping_url: Option<String>,
    pub default_channels: u32,
    pub default_loop_secs: f32,
    pub queue_capacity: usize,
    pub worker_wake_secs: u64,
    pub contention_policy: ContentionPolicy,
    /// Loops created at startup
    pub initial_loops: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            port: 9951,
            ping_url: None,
            default_channels: engine.default_channel_count,
            default_loop_secs: engine.default_loop_secs,
            queue_capacity: engine.queue_capacity,
            worker_wake_secs: engine.worker_wake_interval.as_secs(),
            contention_policy: engine.contention_policy,
            initial_loops: 1,
        }
    }
}

impl AppConfig {
    /// Load config from the default location
    ///
    /// Returns default config if file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ostinato")
            .join("config.txt")
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_channel_count: self.default_channels,
            default_loop_secs: self.default_loop_secs,
            queue_capacity: self.queue_capacity,
            worker_wake_interval: Duration::from_secs(self.worker_wake_secs),
            contention_policy: self.contention_policy,
        }
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            port: self.port,
            ping_url: self.ping_url.clone(),
        }
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            let parsed = match key {
                "port" => value.parse().map(|v| config.port = v).is_ok(),
                "ping_url" => {
                    config.ping_url = (!value.is_empty()).then(|| value.to_string());
                    true
                }
                "default_channels" => value
                    .parse()
                    .ok()
                    .filter(|&v| v > 0)
                    .map(|v| config.default_channels = v)
                    .is_some(),
                "default_loop_secs" => value
                    .parse()
                    .ok()
                    .filter(|&v: &f32| v > 0.0)
                    .map(|v| config.default_loop_secs = v)
                    .is_some(),
                "queue_capacity" => value
                    .parse()
                    .ok()
                    .filter(|&v| v > 0)
                    .map(|v| config.queue_capacity = v)
                    .is_some(),
                "worker_wake_secs" => value
                    .parse()
                    .ok()
                    .filter(|&v| v > 0)
                    .map(|v| config.worker_wake_secs = v)
                    .is_some(),
                "contention_policy" => ContentionPolicy::parse(value)
                    .map(|v| config.contention_policy = v)
                    .is_some(),
                "initial_loops" => value.parse().map(|v| config.initial_loops = v).is_ok(),
                _ => true, // Ignore unknown keys
            };

            if !parsed {
                warn!(key, value, "ignoring invalid config value");
            }
        }

        config
    }
}
