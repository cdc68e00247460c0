//! Incremental block construction.
//!
//! Rows and whole blocks can be mixed; insertion order is kept. The first row
//! added fixes the column set and later rows must match it by name.

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use strata_core::error::{Error, Result};
use strata_core::format::BlockType;
use strata_core::types::{Column, ColumnMap, RowBatch};

use crate::block::Block;
use crate::convert::{arrow_to_row_batch, columns_to_arrow, row_batch_to_arrow};
use crate::row::PublicRow;

pub trait BlockBuilder: Send {
    fn add_row(&mut self, row: PublicRow) -> Result<()>;

    fn add_block(&mut self, block: &Block) -> Result<()>;

    fn num_rows(&self) -> usize;

    /// Rough size of the data buffered so far.
    fn estimated_size_bytes(&self) -> u64;

    fn block_type(&self) -> BlockType;

    fn build(self: Box<Self>) -> Result<Block>;
}

/// Builder for the given representation.
pub fn builder_for(block_type: BlockType) -> Box<dyn BlockBuilder> {
    match block_type {
        BlockType::Arrow => Box::new(ArrowBlockBuilder::default()),
        BlockType::Pandas => Box::new(PandasBlockBuilder::default()),
    }
}

/// Row buffer shared by both builders.
#[derive(Debug, Default)]
struct RowBuffer {
    columns: ColumnMap,
    num_rows: usize,
}

impl RowBuffer {
    fn push(&mut self, row: PublicRow) -> Result<()> {
        if self.num_rows == 0 && self.columns.is_empty() {
            self.columns = row.keys().map(|k| (k.clone(), Vec::new())).collect();
        }
        if row.len() != self.columns.len() || row.keys().any(|k| !self.columns.contains_key(k)) {
            return Err(Error::Schema(format!(
                "row columns {:?} do not match builder columns {:?}",
                row.keys().collect::<Vec<_>>(),
                self.columns.keys().collect::<Vec<_>>()
            )));
        }
        for (name, value) in row {
            if let Some(values) = self.columns.get_mut(&name) {
                values.push(value);
            }
        }
        self.num_rows += 1;
        Ok(())
    }

    fn size_bytes(&self) -> u64 {
        self.columns
            .values()
            .flat_map(|values| values.iter().map(|v| v.size_bytes()))
            .sum()
    }

    /// Buffered columns and their row count. Rows without columns still
    /// count.
    fn take(&mut self) -> Option<(ColumnMap, usize)> {
        if self.num_rows == 0 {
            return None;
        }
        let num_rows = std::mem::take(&mut self.num_rows);
        let fresh = self.columns.keys().map(|k| (k.clone(), Vec::new())).collect();
        Some((std::mem::replace(&mut self.columns, fresh), num_rows))
    }
}

#[derive(Debug, Default)]
pub struct ArrowBlockBuilder {
    pending: RowBuffer,
    batches: Vec<RecordBatch>,
}

impl ArrowBlockBuilder {
    fn flush(&mut self) -> Result<()> {
        if let Some((columns, num_rows)) = self.pending.take() {
            let batch = columns_to_arrow(
                columns.iter().map(|(name, values)| (name.as_str(), values.as_slice())),
                num_rows,
            )??;
            self.batches.push(batch);
        }
        Ok(())
    }
}

impl BlockBuilder for ArrowBlockBuilder {
    fn add_row(&mut self, row: PublicRow) -> Result<()> {
        self.pending.push(row)
    }

    fn add_block(&mut self, block: &Block) -> Result<()> {
        self.flush()?;
        let batch = match block {
            Block::Arrow(batch) => batch.clone(),
            Block::Pandas(_) => block.accessor().to_arrow()?,
        };
        self.batches.push(batch);
        Ok(())
    }

    fn num_rows(&self) -> usize {
        self.pending.num_rows + self.batches.iter().map(RecordBatch::num_rows).sum::<usize>()
    }

    fn estimated_size_bytes(&self) -> u64 {
        self.pending.size_bytes()
            + self
                .batches
                .iter()
                .map(|b| b.get_array_memory_size() as u64)
                .sum::<u64>()
    }

    fn block_type(&self) -> BlockType {
        BlockType::Arrow
    }

    fn build(mut self: Box<Self>) -> Result<Block> {
        self.flush()?;
        match self.batches.len() {
            0 => Ok(Block::empty(BlockType::Arrow)),
            1 => Ok(Block::Arrow(self.batches.remove(0))),
            _ => {
                let schema = self.batches[0].schema();
                if self.batches.iter().all(|b| b.schema() == schema) {
                    return Ok(Block::Arrow(concat_batches(&schema, &self.batches)?));
                }
                // Inferred types differ between batches: re-infer over all rows.
                let mut rows = RowBatch::empty();
                for batch in &self.batches {
                    rows.append(&arrow_to_row_batch(batch)?)?;
                }
                Ok(Block::Arrow(row_batch_to_arrow(&rows)?))
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct PandasBlockBuilder {
    pending: RowBuffer,
    batch: RowBatch,
}

impl PandasBlockBuilder {
    fn flush(&mut self) -> Result<()> {
        if let Some((columns, num_rows)) = self.pending.take() {
            let columns = columns
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect();
            self.batch.append(&RowBatch::with_num_rows(columns, num_rows)?)?;
        }
        Ok(())
    }
}

impl BlockBuilder for PandasBlockBuilder {
    fn add_row(&mut self, row: PublicRow) -> Result<()> {
        self.pending.push(row)
    }

    fn add_block(&mut self, block: &Block) -> Result<()> {
        self.flush()?;
        match block {
            Block::Pandas(batch) => self.batch.append(batch),
            Block::Arrow(_) => self.batch.append(&block.accessor().to_pandas()?),
        }
    }

    fn num_rows(&self) -> usize {
        self.pending.num_rows + self.batch.num_rows()
    }

    fn estimated_size_bytes(&self) -> u64 {
        self.pending.size_bytes() + self.batch.size_bytes()
    }

    fn block_type(&self) -> BlockType {
        BlockType::Pandas
    }

    fn build(mut self: Box<Self>) -> Result<Block> {
        self.flush()?;
        Ok(Block::Pandas(self.batch))
    }
}
