//! Accessor for dataframe-style `RowBatch` blocks.
//!
//! Columns own their values, so every slice is a copy regardless of the
//! `copy` flag.

use std::borrow::Cow;
use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use strata_core::error::{Error, Result};
use strata_core::format::BlockType;
use strata_core::schema::Schema;
use strata_core::types::{ColumnMap, RowBatch, Scalar};

use crate::accessor::BlockAccessor;
use crate::aggregate::AggregateFn;
use crate::block::{Block, ColumnSelection, NumpyBatch};
use crate::convert::row_batch_to_arrow;
use crate::row::{PandasRow, Row, RowIter};
use crate::sort::SortKey;
use crate::table;

#[derive(Debug, Clone)]
pub struct PandasBlockAccessor<'a> {
    batch: Cow<'a, RowBatch>,
}

impl<'a> PandasBlockAccessor<'a> {
    pub fn new(batch: &'a RowBatch) -> Self {
        Self {
            batch: Cow::Borrowed(batch),
        }
    }

    pub fn from_owned(batch: RowBatch) -> PandasBlockAccessor<'static> {
        PandasBlockAccessor {
            batch: Cow::Owned(batch),
        }
    }

    /// Build a block from named arrays. Columns must all have the same length.
    pub fn numpy_to_block(columns: ColumnMap) -> Result<RowBatch> {
        RowBatch::from_columns(columns)
    }

    pub fn batch(&self) -> &RowBatch {
        &self.batch
    }
}

impl BlockAccessor for PandasBlockAccessor<'_> {
    fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn size_bytes(&self) -> u64 {
        self.batch.size_bytes()
    }

    fn schema(&self) -> Schema {
        self.batch.schema()
    }

    fn iter_rows(&self, public_row_format: bool) -> RowIter<'_> {
        let batch: &RowBatch = &self.batch;
        Box::new((0..batch.num_rows()).map(move |idx| {
            let row = PandasRow::new(batch, idx);
            Ok(if public_row_format {
                Row::Public(row.to_public())
            } else {
                Row::Pandas(row)
            })
        }))
    }

    fn column_values(&self, column: &str) -> Result<Vec<Scalar>> {
        self.batch
            .column(column)
            .map(|c| c.values.clone())
            .ok_or_else(|| {
                Error::Schema(format!(
                    "column '{column}' not found, available columns: {:?}",
                    self.batch.column_names()
                ))
            })
    }

    fn slice(&self, start: usize, end: usize, _copy: bool) -> Result<Block> {
        table::check_slice_bounds(start, end, self.num_rows())?;
        Ok(Block::Pandas(self.batch.slice(start, end)))
    }

    fn take(&self, indices: &[usize]) -> Result<Block> {
        Ok(Block::Pandas(self.batch.take(indices)?))
    }

    fn select(&self, columns: &[&str]) -> Result<Block> {
        Ok(Block::Pandas(self.batch.select(columns)?))
    }

    fn random_shuffle(&self, random_seed: Option<u64>) -> Result<Block> {
        let order = table::shuffled_indices(self.num_rows(), random_seed);
        self.take(&order)
    }

    fn to_pandas(&self) -> Result<RowBatch> {
        Ok(RowBatch::clone(&self.batch))
    }

    fn to_numpy(&self, columns: Option<&ColumnSelection>) -> Result<NumpyBatch> {
        table::to_numpy(self, columns)
    }

    fn to_arrow(&self) -> Result<RecordBatch> {
        row_batch_to_arrow(&self.batch)
    }

    fn to_block(&self) -> Block {
        Block::Pandas(RowBatch::clone(&self.batch))
    }

    fn zip(&self, other: &Block) -> Result<Block> {
        let Block::Pandas(right) = other else {
            return Err(Error::Shape(format!(
                "cannot zip a pandas block with a {} block",
                other.block_type()
            )));
        };
        Ok(Block::Pandas(RowBatch::zip(&self.batch, right)?))
    }

    fn sample(&self, n: usize, sort_key: &SortKey) -> Result<Block> {
        table::sample(self, n, sort_key)
    }

    fn sort_and_partition(
        &self,
        boundaries: &[Vec<Scalar>],
        sort_key: &SortKey,
    ) -> Result<Vec<Block>> {
        table::sort_and_partition(self, boundaries, sort_key)
    }

    fn combine(&self, sort_key: &SortKey, aggs: &[Arc<dyn AggregateFn>]) -> Result<Block> {
        table::combine(self, sort_key, aggs)
    }

    fn block_type(&self) -> BlockType {
        BlockType::Pandas
    }
}
