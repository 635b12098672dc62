//! Run configuration
//!
//! Deserializable from JSON; every field has a default so partial
//! documents are accepted.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use super::error::{ConfigError, DataSourceError};

/// Bounded retry for data-source calls
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or the attempts are used up
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, DataSourceError>,
    ) -> Result<T, DataSourceError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("[QA] {} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Tile edge length; `None` or infinite disables tiling
    pub tile_size: Option<f64>,
    /// Concurrent tile workers (1 = sequential, in tile order)
    pub workers: usize,
    /// Abort the whole run on the first engine fault
    pub strict: bool,
    pub retry: RetryPolicy,
    /// Rows fetched between two cancellation checks inside a tile
    pub cancel_check_interval: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tile_size: None,
            workers: 1,
            strict: false,
            retry: RetryPolicy::default(),
            cancel_check_interval: 256,
        }
    }
}

impl RunConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: RunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.as_ref().display(), e))?;
        Self::from_json_str(&text)
    }

    pub fn with_tile_size(mut self, tile_size: f64) -> Self {
        self.tile_size = Some(tile_size);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(size) = self.tile_size {
            validate_tile_size(size)?;
        }
        self.validate_execution()
    }

    /// Everything but the tile size, which a run may override
    pub(crate) fn validate_execution(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount);
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidRetryPolicy);
        }
        Ok(())
    }
}

pub(crate) fn validate_tile_size(size: f64) -> Result<(), ConfigError> {
    if size.is_nan() || size <= 0.0 {
        return Err(ConfigError::InvalidTileSize(size));
    }
    Ok(())
}
