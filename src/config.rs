//! Configuration for authstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StoreError};

/// Main configuration for an authstore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Path of the snapshot document. The backup lives next to it:
    ///   {dump_file}        (current snapshot)
    ///   {dump_file}.bak    (only while a write is in progress, or after a failed one)
    pub dump_file: PathBuf,

    /// How often the checkpoint loop persists the store
    pub checkpoint_interval: Duration,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max in-flight client connections (0 disables admission control)
    pub max_connections: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dump_file: PathBuf::new(),
            checkpoint_interval: Duration::from_secs(60),
            listen_addr: "127.0.0.1:9080".to_string(),
            max_connections: 0,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the settings the server cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.dump_file.as_os_str().is_empty() {
            return Err(StoreError::Config("dump file not specified".to_string()));
        }
        if self.checkpoint_interval.is_zero() {
            return Err(StoreError::Config(
                "checkpoint interval must be greater than zero".to_string(),
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
    /// Set the snapshot document path
    pub fn dump_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dump_file = path.into();
        self
    }

    /// Set the checkpoint interval
    pub fn checkpoint_interval(mut self, interval: Duration) -> Self {
        self.config.checkpoint_interval = interval;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of in-flight connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
