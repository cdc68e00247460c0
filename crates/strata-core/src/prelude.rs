//! Convenient re-exports for downstream crates.

pub use crate::config::BlockConfig;
pub use crate::error::{Error, Result};
pub use crate::format::{BatchFormat, BatchSize, BlockType};
pub use crate::metadata::BlockMetadata;
pub use crate::schema::{DataType, Field, Schema};
pub use crate::stats::{ExecStats, ExecStatsBuilder};
pub use crate::types::{Column, ColumnMap, RowBatch, Scalar};
