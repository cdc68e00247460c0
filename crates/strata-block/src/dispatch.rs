//! Accessor resolution and conversion of user batches into blocks.

use arrow::record_batch::RecordBatch;
use strata_core::error::{Error, Result};
use strata_core::format::BlockType;
use strata_core::repr::truncated_repr;
use strata_core::runtime::log_once;
use strata_core::types::{ColumnMap, RowBatch, Scalar};

use crate::accessor::BlockAccessor;
use crate::arrow_block::ArrowBlockAccessor;
use crate::block::{Block, DataBatch};
use crate::convert::column_map_to_arrow;
use crate::pandas_block::PandasBlockAccessor;

const FALLBACK_WARNING_KEY: &str = "fallback_to_pandas_block_warning";

/// A value that may or may not be a block.
#[derive(Debug, Clone, Copy)]
pub enum RawBlock<'a> {
    Arrow(&'a RecordBatch),
    Pandas(&'a RowBatch),
    /// An Arrow IPC stream.
    Bytes(&'a [u8]),
    /// A bare list of values.
    List(&'a [Scalar]),
    /// Anything else.
    Scalar(&'a Scalar),
}

impl<'a> From<&'a RecordBatch> for RawBlock<'a> {
    fn from(batch: &'a RecordBatch) -> Self {
        RawBlock::Arrow(batch)
    }
}

impl<'a> From<&'a RowBatch> for RawBlock<'a> {
    fn from(batch: &'a RowBatch) -> Self {
        RawBlock::Pandas(batch)
    }
}

impl<'a> From<&'a Block> for RawBlock<'a> {
    fn from(block: &'a Block) -> Self {
        match block {
            Block::Arrow(batch) => RawBlock::Arrow(batch),
            Block::Pandas(batch) => RawBlock::Pandas(batch),
        }
    }
}

impl<'a> From<&'a [u8]> for RawBlock<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        RawBlock::Bytes(bytes)
    }
}

impl<'a> From<&'a [Scalar]> for RawBlock<'a> {
    fn from(values: &'a [Scalar]) -> Self {
        RawBlock::List(values)
    }
}

impl<'a> From<&'a Scalar> for RawBlock<'a> {
    fn from(value: &'a Scalar) -> Self {
        RawBlock::Scalar(value)
    }
}

/// Accessor for a block value.
pub fn for_block<'a>(raw: impl Into<RawBlock<'a>>) -> Result<Box<dyn BlockAccessor + 'a>> {
    match raw.into() {
        RawBlock::Arrow(batch) => Ok(Box::new(ArrowBlockAccessor::new(batch))),
        RawBlock::Pandas(batch) => Ok(Box::new(PandasBlockAccessor::new(batch))),
        RawBlock::Bytes(bytes) => Ok(Box::new(ArrowBlockAccessor::from_bytes(bytes)?)),
        RawBlock::List(values) => Err(Error::InvalidFormat(format!(
            "Error validating {}: standalone lists of values are not allowed. To use \
             arbitrary values in a dataset, wrap them in a map of named columns, e.g. \
             return {{\"item\": batch}} instead of just batch.",
            truncated_repr(values)
        ))),
        RawBlock::Scalar(value) => Err(Error::TypeMismatch(format!(
            "Not a block type: {} ({})",
            truncated_repr(value),
            value.data_type()
        ))),
    }
}

/// Convert a user batch into a block.
///
/// Column maps become Arrow blocks unless `block_type` asks for Pandas. When
/// no type was requested and the columns cannot be expressed in Arrow, the
/// batch falls back to a Pandas block and a warning is logged once per
/// process. Arrow and Pandas batches pass through unchanged.
pub fn batch_to_block(batch: DataBatch, block_type: Option<BlockType>) -> Result<Block> {
    match batch {
        DataBatch::Array(values) => Err(Error::InvalidFormat(format!(
            "Error validating {}: standalone arrays are not allowed. Return a map of \
             field -> array, e.g. {{\"data\": array}} instead of array.",
            truncated_repr(&values)
        ))),
        DataBatch::Columns(columns) => match block_type {
            None | Some(BlockType::Arrow) => match column_map_to_arrow(&columns)? {
                Ok(batch) => Ok(Block::Arrow(batch)),
                Err(e) if block_type.is_none() => {
                    if log_once(FALLBACK_WARNING_KEY) {
                        tracing::warn!(
                            error = %e,
                            "Failed to convert batch to Arrow; falling back to Pandas block"
                        );
                    }
                    batch_to_pandas_block(columns)
                }
                Err(e) => Err(e.into()),
            },
            Some(BlockType::Pandas) => batch_to_pandas_block(columns),
        },
        DataBatch::Arrow(batch) => Ok(Block::Arrow(batch)),
        DataBatch::Pandas(batch) => Ok(Block::Pandas(batch)),
    }
}

/// Arrow block from named arrays; mixed-type columns fail with a conversion
/// error.
pub fn batch_to_arrow_block(columns: &ColumnMap) -> Result<Block> {
    Ok(Block::Arrow(column_map_to_arrow(columns)??))
}

pub fn batch_to_pandas_block(columns: ColumnMap) -> Result<Block> {
    Ok(Block::Pandas(PandasBlockAccessor::numpy_to_block(columns)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    fn mixed() -> ColumnMap {
        indexmap! {
            "a".to_string() => vec![Scalar::I64(1), Scalar::from("two")],
        }
    }

    #[test]
    fn test_for_block_resolves_representations() {
        let rows = RowBatch::empty();
        assert_eq!(for_block(&rows).unwrap().block_type(), BlockType::Pandas);

        let list = vec![Scalar::I64(1)];
        assert!(matches!(for_block(list.as_slice()), Err(Error::InvalidFormat(_))));

        let err = for_block(&Scalar::I64(3)).err().unwrap();
        assert!(matches!(err, Error::TypeMismatch(_)));
        assert!(err.to_string().contains("int64"));
    }

    #[test]
    fn test_batch_to_block_fallback_and_explicit() {
        let block = batch_to_block(DataBatch::Columns(mixed()), None).unwrap();
        assert_eq!(block.block_type(), BlockType::Pandas);

        let err = batch_to_block(DataBatch::Columns(mixed()), Some(BlockType::Arrow)).unwrap_err();
        assert!(err.is_conversion());

        let ok = indexmap! { "a".to_string() => vec![Scalar::I64(1), Scalar::I64(2)] };
        let block = batch_to_block(DataBatch::Columns(ok.clone()), None).unwrap();
        assert_eq!(block.block_type(), BlockType::Arrow);
        let block = batch_to_block(DataBatch::Columns(ok), Some(BlockType::Pandas)).unwrap();
        assert_eq!(block.block_type(), BlockType::Pandas);
    }

    #[test]
    fn test_ragged_columns_never_fall_back() {
        let ragged = indexmap! {
            "a".to_string() => vec![Scalar::I64(1), Scalar::from("x")],
            "b".to_string() => vec![Scalar::I64(1)],
        };
        for preferred in [None, Some(BlockType::Arrow), Some(BlockType::Pandas)] {
            let err = batch_to_block(DataBatch::Columns(ragged.clone()), preferred).unwrap_err();
            assert!(matches!(err, Error::Shape(_)), "{preferred:?}: {err}");
        }
    }

    #[test]
    fn test_bare_array_is_invalid_format() {
        let err = batch_to_block(DataBatch::Array(vec![Scalar::I64(1)]), None).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert!(err.to_string().contains("\"data\""));
    }
}
