//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

use crate::dag::DEFAULT_CHUNK_SIZE;
use crate::fs::DEFAULT_CLOSE_TIMEOUT;
use crate::republisher::{DEFAULT_LONG_TIMEOUT, DEFAULT_SHORT_TIMEOUT};

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default(
            "republish.short_timeout_ms",
            DEFAULT_SHORT_TIMEOUT.as_millis() as u64,
        )?
        .set_default(
            "republish.long_timeout_ms",
            DEFAULT_LONG_TIMEOUT.as_millis() as u64,
        )?
        .set_default(
            "republish.close_timeout_ms",
            DEFAULT_CLOSE_TIMEOUT.as_millis() as u64,
        )?
        .set_default("chunker.chunk_size", DEFAULT_CHUNK_SIZE as u64)?
        .set_default("chunker.raw_leaves", true)
}
