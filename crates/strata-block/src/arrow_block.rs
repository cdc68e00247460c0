//! Accessor for Arrow record batches.
//!
//! Slices without copy are zero-copy views; gathers go through Arrow's `take`
//! kernel. The byte form is a single Arrow IPC stream.

use std::borrow::Cow;
use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, UInt64Array};
use arrow::compute::{concat_batches, take};
use arrow::datatypes::{FieldRef, Schema as ArrowSchema};
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use strata_core::error::{Error, Result};
use strata_core::format::BlockType;
use strata_core::schema::Schema;
use strata_core::types::{unique_column_name, RowBatch, Scalar};

use crate::accessor::BlockAccessor;
use crate::aggregate::AggregateFn;
use crate::block::{Block, ColumnSelection, NumpyBatch};
use crate::convert::{array_to_scalars, arrow_to_row_batch};
use crate::row::{ArrowRow, Row, RowIter};
use crate::sort::SortKey;
use crate::table;

#[derive(Debug, Clone)]
pub struct ArrowBlockAccessor<'a> {
    batch: Cow<'a, RecordBatch>,
}

impl<'a> ArrowBlockAccessor<'a> {
    pub fn new(batch: &'a RecordBatch) -> Self {
        Self {
            batch: Cow::Borrowed(batch),
        }
    }

    pub fn from_owned(batch: RecordBatch) -> ArrowBlockAccessor<'static> {
        ArrowBlockAccessor {
            batch: Cow::Owned(batch),
        }
    }

    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Serialize as an Arrow IPC stream.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buf, self.batch.schema().as_ref())?;
            writer.write(&self.batch)?;
            writer.finish()?;
        }
        Ok(buf)
    }

    /// Deserialize an Arrow IPC stream. Multiple batches in the stream are
    /// concatenated into one block.
    pub fn from_bytes(bytes: &[u8]) -> Result<ArrowBlockAccessor<'static>> {
        let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
        let schema = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let batch = concat_batches(&schema, &batches)?;
        tracing::trace!(
            rows = batch.num_rows(),
            batches = batches.len(),
            "decoded arrow ipc stream"
        );
        Ok(ArrowBlockAccessor::from_owned(batch))
    }

    fn gather(&self, indices: impl Iterator<Item = usize>) -> Result<RecordBatch> {
        let indices = UInt64Array::from_iter_values(indices.map(|i| i as u64));
        let columns = self
            .batch
            .columns()
            .iter()
            .map(|column| take(column.as_ref(), &indices, None))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        // Zero-column batches carry their row count in the options.
        let options = RecordBatchOptions::new().with_row_count(Some(indices.len()));
        Ok(RecordBatch::try_new_with_options(
            self.batch.schema(),
            columns,
            &options,
        )?)
    }
}

impl BlockAccessor for ArrowBlockAccessor<'_> {
    fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    fn size_bytes(&self) -> u64 {
        self.batch
            .columns()
            .iter()
            .map(|array| {
                array
                    .to_data()
                    .get_slice_memory_size()
                    .unwrap_or_else(|_| array.get_array_memory_size()) as u64
            })
            .sum()
    }

    fn schema(&self) -> Schema {
        Schema::from_arrow(self.batch.schema().as_ref())
    }

    fn iter_rows(&self, public_row_format: bool) -> RowIter<'_> {
        let batch: &RecordBatch = &self.batch;
        Box::new((0..batch.num_rows()).map(move |idx| {
            let row = ArrowRow::new(batch, idx);
            if public_row_format {
                row.to_public().map(Row::Public)
            } else {
                Ok(Row::Arrow(row))
            }
        }))
    }

    fn column_values(&self, column: &str) -> Result<Vec<Scalar>> {
        let array = self.batch.column_by_name(column).ok_or_else(|| {
            Error::Schema(format!(
                "column '{column}' not found, available columns: {:?}",
                self.schema().names()
            ))
        })?;
        array_to_scalars(array.as_ref())
    }

    fn slice(&self, start: usize, end: usize, copy: bool) -> Result<Block> {
        table::check_slice_bounds(start, end, self.num_rows())?;
        let sliced = if copy {
            self.gather(start..end)?
        } else {
            self.batch.slice(start, end - start)
        };
        Ok(Block::Arrow(sliced))
    }

    fn take(&self, indices: &[usize]) -> Result<Block> {
        table::check_indices(indices, self.num_rows())?;
        Ok(Block::Arrow(self.gather(indices.iter().copied())?))
    }

    fn select(&self, columns: &[&str]) -> Result<Block> {
        let arrow_schema = self.batch.schema();
        let indices = columns
            .iter()
            .map(|name| {
                arrow_schema.index_of(name).map_err(|_| {
                    Error::Schema(format!(
                        "column '{name}' not found, available columns: {:?}",
                        self.schema().names()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Block::Arrow(self.batch.project(&indices)?))
    }

    fn random_shuffle(&self, random_seed: Option<u64>) -> Result<Block> {
        let order = table::shuffled_indices(self.num_rows(), random_seed);
        self.take(&order)
    }

    fn to_pandas(&self) -> Result<RowBatch> {
        arrow_to_row_batch(&self.batch)
    }

    fn to_numpy(&self, columns: Option<&ColumnSelection>) -> Result<NumpyBatch> {
        table::to_numpy(self, columns)
    }

    fn to_arrow(&self) -> Result<RecordBatch> {
        Ok(RecordBatch::clone(&self.batch))
    }

    fn to_block(&self) -> Block {
        Block::Arrow(RecordBatch::clone(&self.batch))
    }

    fn zip(&self, other: &Block) -> Result<Block> {
        let Block::Arrow(right) = other else {
            return Err(Error::Shape(format!(
                "cannot zip an arrow block with a {} block",
                other.block_type()
            )));
        };
        let num_rows = self.num_rows();
        if right.num_rows() != num_rows {
            return Err(Error::Shape(format!(
                "cannot zip blocks with different row counts: {} vs {}",
                num_rows,
                right.num_rows()
            )));
        }

        let mut fields: Vec<FieldRef> = self.batch.schema().fields().iter().cloned().collect();
        let mut columns = self.batch.columns().to_vec();
        let right_schema = right.schema();
        for (field, column) in right_schema.fields().iter().zip(right.columns()) {
            let existing: Vec<&str> = fields.iter().map(|f| f.name().as_str()).collect();
            let name = unique_column_name(field.name(), &existing);
            fields.push(Arc::new(field.as_ref().clone().with_name(name)));
            columns.push(Arc::clone(column));
        }

        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        let zipped =
            RecordBatch::try_new_with_options(Arc::new(ArrowSchema::new(fields)), columns, &options)?;
        Ok(Block::Arrow(zipped))
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
        BlockType::Arrow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType as ArrowType, Field as ArrowField};

    fn batch(n: i64) -> RecordBatch {
        let schema = Arc::new(ArrowSchema::new(vec![
            ArrowField::new("id", ArrowType::Int64, false),
            ArrowField::new("name", ArrowType::Utf8, true),
        ]));
        let ids = Int64Array::from_iter_values(0..n);
        let names = StringArray::from_iter((0..n).map(|i| Some(format!("row-{i}"))));
        RecordBatch::try_new(schema, vec![Arc::new(ids), Arc::new(names)]).unwrap()
    }

    fn ids(block: &Block) -> Vec<Scalar> {
        block.accessor().column_values("id").unwrap()
    }

    #[test]
    fn test_slice_zero_copy_and_copy_agree() {
        let rb = batch(10);
        let acc = ArrowBlockAccessor::new(&rb);
        let view = acc.slice(2, 5, false).unwrap();
        let copied = acc.slice(2, 5, true).unwrap();
        assert_eq!(view.num_rows(), 3);
        assert_eq!(ids(&view), ids(&copied));
        assert_eq!(ids(&view)[0], Scalar::I64(2));
        assert!(view.accessor().size_bytes() <= acc.size_bytes());
        assert!(copied.accessor().size_bytes() <= acc.size_bytes());
        assert!(matches!(acc.slice(5, 11, false), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_take_and_select() {
        let rb = batch(5);
        let acc = ArrowBlockAccessor::new(&rb);
        let taken = acc.take(&[4, 0, 2]).unwrap();
        assert_eq!(ids(&taken), vec![Scalar::I64(4), Scalar::I64(0), Scalar::I64(2)]);
        assert!(matches!(acc.take(&[5]), Err(Error::InvalidArgument(_))));

        let selected = acc.select(&["name"]).unwrap();
        assert_eq!(selected.accessor().schema().names(), vec!["name"]);
        assert!(matches!(acc.select(&["nope"]), Err(Error::Schema(_))));
    }

    #[test]
    fn test_iter_rows_native_and_public() {
        let rb = batch(3);
        let acc = ArrowBlockAccessor::new(&rb);
        let native: Vec<Row<'_>> = acc.iter_rows(false).collect::<Result<_>>().unwrap();
        assert!(matches!(native[0], Row::Arrow(_)));
        assert_eq!(native[2].get("id").unwrap(), Some(Scalar::I64(2)));

        let public: Vec<Row<'_>> = acc.iter_rows(true).collect::<Result<_>>().unwrap();
        let Row::Public(first) = &public[0] else {
            panic!("expected a public row");
        };
        assert_eq!(first["name"], Scalar::from("row-0"));
        assert_eq!(acc.iter_rows(false).count(), 3);
    }

    #[test]
    fn test_zip_renames_clashing_columns() {
        let left = batch(3);
        let right = batch(3);
        let zipped = ArrowBlockAccessor::new(&left)
            .zip(&Block::Arrow(right))
            .unwrap();
        assert_eq!(
            zipped.accessor().schema().names(),
            vec!["id", "name", "id_1", "name_1"]
        );

        let short = Block::Arrow(batch(2));
        assert!(matches!(
            ArrowBlockAccessor::new(&left).zip(&short),
            Err(Error::Shape(_))
        ));
        let pandas = Block::Pandas(RowBatch::empty());
        assert!(matches!(
            ArrowBlockAccessor::new(&left).zip(&pandas),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn test_ipc_bytes_round_trip() {
        let rb = batch(4);
        let bytes = ArrowBlockAccessor::new(&rb).to_bytes().unwrap();
        let decoded = ArrowBlockAccessor::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.batch(), &rb);
        assert!(ArrowBlockAccessor::from_bytes(b"not arrow").is_err());
    }

    #[test]
    fn test_random_shuffle_is_seeded_permutation() {
        let rb = batch(20);
        let acc = ArrowBlockAccessor::new(&rb);
        let a = acc.random_shuffle(Some(3)).unwrap();
        let b = acc.random_shuffle(Some(3)).unwrap();
        assert_eq!(a, b);
        let mut values = ids(&a);
        values.sort_by(strata_core::types::scalar_cmp);
        assert_eq!(values, ids(&Block::Arrow(rb.clone())));
    }
}
