//! Configuration System
//!
//! Republish timings, chunking, storage location and logging. Values come
//! from built-in defaults, a global file, a workspace file and environment
//! variables, in increasing order of precedence.

use crate::dag::{Chunker, DEFAULT_CHUNK_SIZE};
use crate::fs::RootOptions;
use crate::logging::LoggingConfig;
use crate::republisher::RepublishTimeouts;
use crate::telemetry::PublishObserver;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::environment::ENV_PREFIX;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagfsConfig {
    #[serde(default)]
    pub republish: RepublishConfig,

    #[serde(default)]
    pub chunker: ChunkerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Republisher debounce timings, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepublishConfig {
    #[serde(default = "default_short_timeout_ms")]
    pub short_timeout_ms: u64,

    #[serde(default = "default_long_timeout_ms")]
    pub long_timeout_ms: u64,

    /// Bound on the final publish when a root closes
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

fn default_short_timeout_ms() -> u64 {
    crate::republisher::DEFAULT_SHORT_TIMEOUT.as_millis() as u64
}

fn default_long_timeout_ms() -> u64 {
    crate::republisher::DEFAULT_LONG_TIMEOUT.as_millis() as u64
}

fn default_close_timeout_ms() -> u64 {
    crate::fs::DEFAULT_CLOSE_TIMEOUT.as_millis() as u64
}

impl Default for RepublishConfig {
    fn default() -> Self {
        Self {
            short_timeout_ms: default_short_timeout_ms(),
            long_timeout_ms: default_long_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

impl RepublishConfig {
    pub fn timeouts(&self) -> RepublishTimeouts {
        RepublishTimeouts {
            short: Duration::from_millis(self.short_timeout_ms),
            long: Duration::from_millis(self.long_timeout_ms),
        }
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_true")]
    pub raw_leaves: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            raw_leaves: default_true(),
        }
    }
}

impl ChunkerConfig {
    pub fn chunker(&self) -> Chunker {
        Chunker::new(self.chunk_size, self.raw_leaves)
    }
}

/// Where the block store lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Store directory; the user data directory when unset
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_store_path(&self) -> PathBuf {
        self.store_path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("", "", "dagfs")
                .map(|dirs| dirs.data_dir().join("store"))
                .unwrap_or_else(|| PathBuf::from(".dagfs/store"))
        })
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Republish(String),
    Chunker(String),
    Storage(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Republish(msg) => write!(f, "Republish: {}", msg),
            ValidationError::Chunker(msg) => write!(f, "Chunker: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl DagfsConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let republish = &self.republish;

        if republish.short_timeout_ms == 0 {
            errors.push(ValidationError::Republish(
                "short_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if republish.long_timeout_ms == 0 {
            errors.push(ValidationError::Republish(
                "long_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if republish.close_timeout_ms == 0 {
            errors.push(ValidationError::Republish(
                "close_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if republish.short_timeout_ms > republish.long_timeout_ms {
            errors.push(ValidationError::Republish(format!(
                "short_timeout_ms ({}) exceeds long_timeout_ms ({})",
                republish.short_timeout_ms, republish.long_timeout_ms
            )));
        }

        if self.chunker.chunk_size == 0 {
            errors.push(ValidationError::Chunker(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        if let Some(path) = &self.storage.store_path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::Storage(
                    "store_path cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Options for opening a root with these settings
    pub fn root_options(&self, observer: Arc<dyn PublishObserver>) -> RootOptions {
        RootOptions {
            chunker: self.chunker.chunker(),
            timeouts: self.republish.timeouts(),
            close_timeout: self.republish.close_timeout(),
            observer,
        }
    }
}
