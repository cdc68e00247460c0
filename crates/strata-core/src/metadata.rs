//! Block metadata: the descriptor schedulers and operators branch on.
//!
//! Every optional field means *unknown*, not *empty*: metadata is routinely
//! built before the block it describes is materialized.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::config::BlockConfig;
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::stats::ExecStats;

/// Metadata about the block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockMetadata {
    /// The number of rows contained in this block, or None.
    pub num_rows: Option<u64>,
    /// The approximate size in bytes of this block, or None.
    pub size_bytes: Option<u64>,
    /// The schema of the block elements, or None.
    pub schema: Option<Schema>,
    /// File paths used to generate this block; empty if indeterminate.
    pub input_files: Vec<String>,
    /// Execution stats for this block.
    pub exec_stats: Option<ExecStats>,
}

impl BlockMetadata {
    pub fn new(
        num_rows: Option<u64>,
        size_bytes: Option<u64>,
        schema: Option<Schema>,
        input_files: Option<Vec<String>>,
        exec_stats: Option<ExecStats>,
    ) -> Self {
        Self {
            num_rows,
            size_bytes,
            schema,
            input_files: input_files.unwrap_or_default(),
            exec_stats,
        }
    }

    /// Metadata of a block that has not been materialized yet.
    pub fn unknown(input_files: Option<Vec<String>>) -> Self {
        Self::new(None, None, None, input_files, None)
    }

    /// Set the size from any integer type, rejecting values that do not fit
    /// an unsigned 64-bit count (negative sizes, for instance).
    pub fn with_size_bytes<N>(mut self, size_bytes: N) -> Result<Self>
    where
        N: TryInto<u64> + Display + Copy,
    {
        let size = size_bytes.try_into().map_err(|_| {
            Error::InvalidArgument(format!(
                "size_bytes must be a non-negative integer, got {size_bytes}"
            ))
        })?;
        self.size_bytes = Some(size);
        Ok(self)
    }

    /// Whether the block is known to be larger than the configured target.
    /// Unknown sizes never count as oversized.
    pub fn exceeds_target_size(&self, cfg: &BlockConfig) -> bool {
        self.size_bytes
            .map(|s| s > cfg.target_max_block_size)
            .unwrap_or(false)
    }
}
