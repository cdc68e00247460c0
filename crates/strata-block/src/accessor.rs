//! The polymorphic block interface.
//!
//! Every representation implements the whole trait; a representation missing
//! an operation does not compile. Operations are pure: they read the wrapped
//! block and return new blocks.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use strata_core::error::Result;
use strata_core::format::{BatchFormat, BlockType};
use strata_core::metadata::BlockMetadata;
use strata_core::schema::Schema;
use strata_core::stats::ExecStats;
use strata_core::types::{RowBatch, Scalar};

use crate::aggregate::AggregateFn;
use crate::block::{Block, ColumnSelection, DataBatch, NumpyBatch};
use crate::builder::{builder_for, BlockBuilder};
use crate::row::RowIter;
use crate::sort::SortKey;

pub trait BlockAccessor: Send + Sync {
    /// Number of rows in the block. O(1).
    fn num_rows(&self) -> usize;

    /// Approximate in-memory size. A slice or take of this block never reports
    /// more than the block itself.
    fn size_bytes(&self) -> u64;

    fn schema(&self) -> Schema;

    /// Iterate over the rows. With `public_row_format`, rows are owned
    /// name→value maps (a copy); otherwise they are views into the block.
    /// Each call starts a fresh iterator.
    fn iter_rows(&self, public_row_format: bool) -> RowIter<'_>;

    /// All values of one column, in row order.
    fn column_values(&self, column: &str) -> Result<Vec<Scalar>>;

    /// Rows `[start, end)`. With `copy == false` the result may share storage
    /// with this block.
    fn slice(&self, start: usize, end: usize, copy: bool) -> Result<Block>;

    /// Rows at `indices`, in the given order.
    fn take(&self, indices: &[usize]) -> Result<Block>;

    /// Only the named columns, in the given order.
    fn select(&self, columns: &[&str]) -> Result<Block>;

    /// A permutation of the rows; deterministic for a fixed seed.
    fn random_shuffle(&self, random_seed: Option<u64>) -> Result<Block>;

    fn to_pandas(&self) -> Result<RowBatch>;

    /// One array for a single named column, otherwise a column map (all
    /// columns when `columns` is `None`).
    fn to_numpy(&self, columns: Option<&ColumnSelection>) -> Result<NumpyBatch>;

    fn to_arrow(&self) -> Result<RecordBatch>;

    /// The block this accessor wraps.
    fn to_block(&self) -> Block;

    /// The default batch representation for this accessor.
    fn to_default(&self) -> Block {
        self.to_block()
    }

    /// Convert to a batch format tag: unset is the native block, `"default"`
    /// and `"native"` the default representation, then `"pandas"`,
    /// `"pyarrow"` and `"numpy"`.
    fn to_batch_format(&self, batch_format: Option<&str>) -> Result<DataBatch> {
        let Some(tag) = batch_format else {
            return Ok(self.to_block().into());
        };
        let batch = match tag.parse::<BatchFormat>()? {
            BatchFormat::Default => self.to_default().into(),
            BatchFormat::Pandas => DataBatch::Pandas(self.to_pandas()?),
            BatchFormat::PyArrow => DataBatch::Arrow(self.to_arrow()?),
            BatchFormat::Numpy => self.to_numpy(None)?.into(),
        };
        Ok(batch)
    }

    fn get_metadata(
        &self,
        input_files: Option<Vec<String>>,
        exec_stats: Option<ExecStats>,
    ) -> BlockMetadata {
        BlockMetadata::new(
            Some(self.num_rows() as u64),
            Some(self.size_bytes()),
            Some(self.schema()),
            input_files,
            exec_stats,
        )
    }

    /// Column-wise concatenation with a block of the same representation and
    /// row count. Clashing column names on the right get `_1`, `_2`, ...
    fn zip(&self, other: &Block) -> Result<Block>;

    /// Up to `n` uniformly sampled rows, projected to the key columns.
    fn sample(&self, n: usize, sort_key: &SortKey) -> Result<Block>;

    /// Sort by `sort_key` and split into `boundaries.len() + 1` blocks.
    fn sort_and_partition(&self, boundaries: &[Vec<Scalar>], sort_key: &SortKey)
        -> Result<Vec<Block>>;

    /// Fold rows with equal keys into one accumulator row per group. The
    /// block must already be sorted by `sort_key`.
    fn combine(&self, sort_key: &SortKey, aggs: &[Arc<dyn AggregateFn>]) -> Result<Block>;

    fn block_type(&self) -> BlockType;

    /// A builder producing blocks of this representation.
    fn builder(&self) -> Box<dyn BlockBuilder> {
        builder_for(self.block_type())
    }
}
