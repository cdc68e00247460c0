#![forbid(unsafe_code)]
//! strata-block: the block abstraction over Arrow and dataframe-style tables.
//!
//! Design intent:
//! - `Block` is a closed enum of the two representations; callers work
//!   through the `BlockAccessor` trait returned by `Block::accessor`.
//! - Accessors borrow the block they wrap and return new blocks; nothing here
//!   mutates shared state apart from the warn-once registry in `strata-core`.
//! - Conversions into Arrow report structural failures as a distinct error so
//!   the dispatcher can fall back to the dataframe representation.

pub mod accessor;
pub mod aggregate;
pub mod arrow_block;
pub mod block;
pub mod builder;
pub mod convert;
pub mod dispatch;
pub mod merge;
pub mod pandas_block;
pub mod row;
pub mod sort;

mod table;

pub use accessor::BlockAccessor;
pub use aggregate::{AggState, AggregateFn, Count, Max, Mean, Min, Std, Sum};
pub use arrow_block::ArrowBlockAccessor;
pub use block::{Block, ColumnSelection, DataBatch, NumpyBatch};
pub use builder::{builder_for, BlockBuilder};
pub use convert::ArrowConversionError;
pub use dispatch::{batch_to_arrow_block, batch_to_block, batch_to_pandas_block, for_block, RawBlock};
pub use merge::{aggregate_combined_blocks, merge_sorted_blocks};
pub use pandas_block::PandasBlockAccessor;
pub use row::{PublicRow, Row, RowIter};
pub use sort::SortKey;
