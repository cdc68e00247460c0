//! Block-layer configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::format::BatchFormat;

/// Rows per batch when a caller asks for the "default" batch size.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Blocks larger than this are candidates for splitting.
pub const DEFAULT_TARGET_MAX_BLOCK_SIZE: u64 = 128 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Resolution of `BatchSize::Default`.
    pub default_batch_size: usize,

    /// Resolution of the `"default"` batch format at UDF boundaries.
    pub default_batch_format: BatchFormat,

    /// Upper bound on a produced block's `size_bytes` before it should be split.
    pub target_max_block_size: u64,

    /// Identifier of the executing node; generated per process when unset.
    pub node_id: Option<String>,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            default_batch_size: DEFAULT_BATCH_SIZE,
            default_batch_format: BatchFormat::Numpy,
            target_max_block_size: DEFAULT_TARGET_MAX_BLOCK_SIZE,
            node_id: None,
        }
    }
}

impl BlockConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `STRATA_DEFAULT_BATCH_SIZE`: rows per default batch
    /// - `STRATA_DEFAULT_BATCH_FORMAT`: one of the batch format tags
    /// - `STRATA_TARGET_MAX_BLOCK_SIZE`: target block size in bytes
    /// - `STRATA_NODE_ID`: node identifier reported in execution stats
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("STRATA_DEFAULT_BATCH_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                if v > 0 {
                    cfg.default_batch_size = v;
                }
            }
        }

        if let Ok(s) = std::env::var("STRATA_DEFAULT_BATCH_FORMAT") {
            if let Ok(v) = s.parse::<BatchFormat>() {
                cfg.default_batch_format = v;
            }
        }

        if let Ok(s) = std::env::var("STRATA_TARGET_MAX_BLOCK_SIZE") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.target_max_block_size = v;
            }
        }

        if let Ok(s) = std::env::var("STRATA_NODE_ID") {
            if !s.trim().is_empty() {
                cfg.node_id = Some(s);
            }
        }

        cfg
    }
}
