//! Configuration management for warren
//!
//! The config file is optional. Anything it sets (and any environment
//! override) must match between `generate` and `decrypt`, since the Argon2id
//! costs feed directly into the derived keypair.

use crate::container::DEFAULT_BUFFER_SIZE;
use crate::crypto::KdfParams;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on the streaming buffer (64 MiB)
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamConfig {
    /// Read/write buffer size in bytes
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Argon2id costs for password → keypair derivation
    #[serde(default)]
    pub kdf: KdfParams,

    /// Streaming settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Default config file location (`~/.config/warren/config.json` on Linux)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("warren")
            .join("config.json")
    }

    /// Load configuration from a file, with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("Failed to read config file: {}", e))
        })?;

        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise defaults plus environment
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::load(path);
        }

        debug!(path = %path.as_ref().display(), "No config file, using defaults");
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u32 = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u32>().ok());

        if let Some(memory) = parse_u32("WARREN_ARGON2_MEMORY_KIB") {
            self.kdf.memory_kib = memory;
        }

        if let Some(iterations) = parse_u32("WARREN_ARGON2_ITERATIONS") {
            self.kdf.iterations = iterations;
        }

        if let Some(parallelism) = parse_u32("WARREN_ARGON2_PARALLELISM") {
            self.kdf.parallelism = parallelism;
        }

        if let Some(size) = lookup("WARREN_BUFFER_SIZE").and_then(|v| v.trim().parse::<usize>().ok()) {
            self.stream.buffer_size = size;
        }

        if let Some(level) = lookup("WARREN_LOG_LEVEL") {
            let level = level.trim().to_string();
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path.as_ref(), content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.kdf.iterations == 0 {
            return Err(Error::InvalidConfig(
                "Argon2 iterations must be greater than 0".to_string(),
            ));
        }

        if self.kdf.parallelism == 0 {
            return Err(Error::InvalidConfig(
                "Argon2 parallelism must be greater than 0".to_string(),
            ));
        }

        let min_memory_kib = 8 * u64::from(self.kdf.parallelism);
        if u64::from(self.kdf.memory_kib) < min_memory_kib {
            return Err(Error::InvalidConfig(format!(
                "Argon2 memory must be at least {} KiB for parallelism {}",
                min_memory_kib, self.kdf.parallelism
            )));
        }

        if self.stream.buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "Buffer size must be greater than 0".to_string(),
            ));
        }

        if self.stream.buffer_size > MAX_BUFFER_SIZE {
            return Err(Error::InvalidConfig(format!(
                "Buffer size exceeds the {} byte limit",
                MAX_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}
