//! Block shipper settings.
//!
//! The codec itself takes no configuration; these knobs belong to the layer
//! that moves blocks between object storage and the local working directory,
//! and live here so that layer and the CLI share one definition.

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_WORKING_DIRECTORY: &str = "bloom-shipper";
pub const DEFAULT_WORKERS_COUNT: usize = 100;
pub const DEFAULT_MAX_TASKS_PER_TENANT: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("working directory must be specified")]
    EmptyWorkingDirectory,
    #[error("workers count must be greater than zero")]
    ZeroWorkers,
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Settings for the queue that downloads blocks from object storage.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DownloadingQueueConfig {
    /// Parallel workers downloading blocks.
    pub workers_count: usize,
    /// Per-tenant queue depth; enqueuing above this limit fails.
    pub max_tasks_enqueued_per_tenant: usize,
}

impl Default for DownloadingQueueConfig {
    fn default() -> Self {
        Self {
            workers_count: DEFAULT_WORKERS_COUNT,
            max_tasks_enqueued_per_tenant: DEFAULT_MAX_TASKS_PER_TENANT,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Where downloaded blocks are stored.
    pub working_directory: String,
    pub blocks_downloading_queue: DownloadingQueueConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            working_directory: DEFAULT_WORKING_DIRECTORY.to_string(),
            blocks_downloading_queue: DownloadingQueueConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_slice(bytes)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_directory.trim().is_empty() {
            return Err(ConfigError::EmptyWorkingDirectory);
        }
        if self.blocks_downloading_queue.workers_count == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.working_directory, "bloom-shipper");
        assert_eq!(cfg.blocks_downloading_queue.workers_count, 100);
        assert_eq!(
            cfg.blocks_downloading_queue.max_tasks_enqueued_per_tenant,
            10_000
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg = Config::from_json(br#"{"working_directory": "/tmp/blooms"}"#).unwrap();
        assert_eq!(cfg.working_directory, "/tmp/blooms");
        assert_eq!(cfg.blocks_downloading_queue.workers_count, 100);
    }

    #[test]
    fn blank_working_directory_is_rejected() {
        let err = Config::from_json(br#"{"working_directory": "  "}"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyWorkingDirectory));
    }
}
