//! Configuration for kvsnap
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Error, Result};

/// Default per-field ceiling for keys and values (1 TiB)
pub const DEFAULT_MAX_FIELD_SIZE: u64 = 1 << 40;

/// Default number of entries between backup progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Configuration shared by backup and restore
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Envelope Limits
    // -------------------------------------------------------------------------
    /// Largest key or value accepted, in bytes.
    ///
    /// Enforced when encoding (the entry is rejected before any of its bytes
    /// reach the sink) and when decoding (the length prefix is rejected before
    /// the payload is read).
    pub max_field_size: u64,

    // -------------------------------------------------------------------------
    // Logging
    // -------------------------------------------------------------------------
    /// Emit a progress line every N entries (0 disables)
    pub progress_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_field_size == 0 {
            return Err(Error::Config(
                "max_field_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the per-field size ceiling (in bytes)
    pub fn max_field_size(mut self, bytes: u64) -> Self {
        self.config.max_field_size = bytes;
        self
    }

    /// Set the number of entries between progress log lines
    pub fn progress_interval(mut self, entries: u64) -> Self {
        self.config.progress_interval = entries;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
