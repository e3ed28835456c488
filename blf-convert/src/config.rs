//! Conversion configuration
//!
//! The pipeline only needs a handful of knobs; everything else (which file,
//! which signals) is passed explicitly to [`crate::pipeline::BlfConverter`].

use crate::types::{ConvertError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Number of frames to process per chunk. The default is tuned for the
    /// usual trade-off between worker utilisation and per-chunk overhead;
    /// adjust it to the system configuration and data volume.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Decode chunks on the rayon thread pool instead of sequentially.
    /// Merge order is by chunk position either way.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Replace an existing output container. When false an existing
    /// destination is never touched and a numbered sibling is written.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_chunk_size() -> usize {
    150_000
}

fn default_true() -> bool {
    true
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            parallel: true,
            overwrite: false,
        }
    }
}

impl ConvertConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Builder method: enable or disable parallel chunk decoding
    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Builder method: enable or disable overwriting the output container
    pub fn with_overwrite(mut self, enabled: bool) -> Self {
        self.overwrite = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ConvertError::Config(
                "chunk_size must be a positive number of frames".to_string(),
            ));
        }
        Ok(())
    }
}
