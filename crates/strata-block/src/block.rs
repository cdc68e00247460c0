//! Block and user-facing batch values.

use std::sync::Arc;

use arrow::datatypes::Schema as ArrowSchema;
use arrow::record_batch::RecordBatch;
use strata_core::format::BlockType;
use strata_core::types::{ColumnMap, RowBatch, Scalar};

use crate::accessor::BlockAccessor;
use crate::arrow_block::ArrowBlockAccessor;
use crate::pandas_block::PandasBlockAccessor;

/// A block of tabular data in one of the two supported representations.
///
/// The variant never changes: operations hand back new blocks of the same
/// variant unless they convert explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Arrow(RecordBatch),
    Pandas(RowBatch),
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Arrow(_) => BlockType::Arrow,
            Block::Pandas(_) => BlockType::Pandas,
        }
    }

    /// Accessor borrowing this block.
    pub fn accessor(&self) -> Box<dyn BlockAccessor + '_> {
        match self {
            Block::Arrow(batch) => Box::new(ArrowBlockAccessor::new(batch)),
            Block::Pandas(batch) => Box::new(PandasBlockAccessor::new(batch)),
        }
    }

    pub fn num_rows(&self) -> usize {
        match self {
            Block::Arrow(batch) => batch.num_rows(),
            Block::Pandas(batch) => batch.num_rows(),
        }
    }

    /// An empty block of the given representation.
    pub fn empty(block_type: BlockType) -> Block {
        match block_type {
            BlockType::Arrow => Block::Arrow(RecordBatch::new_empty(Arc::new(ArrowSchema::empty()))),
            BlockType::Pandas => Block::Pandas(RowBatch::empty()),
        }
    }
}

impl From<RecordBatch> for Block {
    fn from(batch: RecordBatch) -> Self {
        Block::Arrow(batch)
    }
}

impl From<RowBatch> for Block {
    fn from(batch: RowBatch) -> Self {
        Block::Pandas(batch)
    }
}

/// Batch handed to or returned by user functions.
#[derive(Debug, Clone, PartialEq)]
pub enum DataBatch {
    Arrow(RecordBatch),
    Pandas(RowBatch),
    /// Column name to a one-dimensional array.
    Columns(ColumnMap),
    /// A bare array. Produced by `to_numpy` of a single column; never accepted
    /// as input.
    Array(Vec<Scalar>),
}

impl From<Block> for DataBatch {
    fn from(block: Block) -> Self {
        match block {
            Block::Arrow(batch) => DataBatch::Arrow(batch),
            Block::Pandas(batch) => DataBatch::Pandas(batch),
        }
    }
}

impl From<ColumnMap> for DataBatch {
    fn from(columns: ColumnMap) -> Self {
        DataBatch::Columns(columns)
    }
}

/// Result of `to_numpy`.
#[derive(Debug, Clone, PartialEq)]
pub enum NumpyBatch {
    /// A single requested column.
    Array(Vec<Scalar>),
    Columns(ColumnMap),
}

impl From<NumpyBatch> for DataBatch {
    fn from(batch: NumpyBatch) -> Self {
        match batch {
            NumpyBatch::Array(values) => DataBatch::Array(values),
            NumpyBatch::Columns(columns) => DataBatch::Columns(columns),
        }
    }
}

/// Which columns `to_numpy` converts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    Single(String),
    Multiple(Vec<String>),
}

impl From<&str> for ColumnSelection {
    fn from(name: &str) -> Self {
        ColumnSelection::Single(name.to_string())
    }
}

impl From<Vec<String>> for ColumnSelection {
    fn from(names: Vec<String>) -> Self {
        ColumnSelection::Multiple(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::types::Column;

    #[test]
    fn test_block_type_follows_variant() {
        let pandas = Block::from(
            RowBatch::new(vec![Column::new("a", vec![Scalar::I64(1)])]).unwrap(),
        );
        assert_eq!(pandas.block_type(), BlockType::Pandas);
        assert_eq!(pandas.accessor().block_type(), BlockType::Pandas);
        assert_eq!(pandas.num_rows(), 1);

        let arrow = Block::empty(BlockType::Arrow);
        assert_eq!(arrow.block_type(), BlockType::Arrow);
        assert_eq!(arrow.accessor().num_rows(), 0);
    }
}
