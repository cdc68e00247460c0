//! Row views produced by `BlockAccessor::iter_rows`.

use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use strata_core::error::Result;
use strata_core::types::{RowBatch, Scalar};

use crate::convert::scalar_at;

/// Owned column name → value mapping; the public row format.
pub type PublicRow = IndexMap<String, Scalar>;

/// Lazy row iterator. Items are fallible because reading an Arrow value can
/// hit a type with no `Scalar` counterpart.
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<Row<'a>>> + 'a>;

/// One row of a block: a borrowed native view, or an owned public row.
#[derive(Debug, Clone)]
pub enum Row<'a> {
    Arrow(ArrowRow<'a>),
    Pandas(PandasRow<'a>),
    Public(PublicRow),
}

impl Row<'_> {
    /// Value of `column`, or `None` if the row has no such column.
    pub fn get(&self, column: &str) -> Result<Option<Scalar>> {
        match self {
            Row::Arrow(row) => row.get(column),
            Row::Pandas(row) => Ok(row.get(column).cloned()),
            Row::Public(row) => Ok(row.get(column).cloned()),
        }
    }

    pub fn num_columns(&self) -> usize {
        match self {
            Row::Arrow(row) => row.batch.num_columns(),
            Row::Pandas(row) => row.batch.num_columns(),
            Row::Public(row) => row.len(),
        }
    }

    pub fn to_public(&self) -> Result<PublicRow> {
        match self {
            Row::Arrow(row) => row.to_public(),
            Row::Pandas(row) => Ok(row.to_public()),
            Row::Public(row) => Ok(row.clone()),
        }
    }
}

/// Borrowed view of row `idx` of a record batch.
#[derive(Debug, Clone, Copy)]
pub struct ArrowRow<'a> {
    batch: &'a RecordBatch,
    idx: usize,
}

impl<'a> ArrowRow<'a> {
    pub fn new(batch: &'a RecordBatch, idx: usize) -> Self {
        Self { batch, idx }
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn get(&self, column: &str) -> Result<Option<Scalar>> {
        match self.batch.column_by_name(column) {
            Some(array) => scalar_at(array.as_ref(), self.idx).map(Some),
            None => Ok(None),
        }
    }

    pub fn to_public(&self) -> Result<PublicRow> {
        let schema = self.batch.schema();
        schema
            .fields()
            .iter()
            .zip(self.batch.columns())
            .map(|(field, array)| Ok((field.name().clone(), scalar_at(array.as_ref(), self.idx)?)))
            .collect()
    }
}

/// Borrowed view of row `idx` of a dataframe-style batch.
#[derive(Debug, Clone, Copy)]
pub struct PandasRow<'a> {
    batch: &'a RowBatch,
    idx: usize,
}

impl<'a> PandasRow<'a> {
    pub fn new(batch: &'a RowBatch, idx: usize) -> Self {
        Self { batch, idx }
    }

    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn get(&self, column: &str) -> Option<&'a Scalar> {
        self.batch.column(column).map(|c| &c.values[self.idx])
    }

    pub fn to_public(&self) -> PublicRow {
        self.batch
            .columns()
            .iter()
            .map(|c| (c.name.clone(), c.values[self.idx].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::types::Column;

    #[test]
    fn test_pandas_row_views() {
        let batch = RowBatch::new(vec![
            Column::new("a", vec![Scalar::I64(1), Scalar::I64(2)]),
            Column::new("b", vec!["x".into(), "y".into()]),
        ])
        .unwrap();
        let row = Row::Pandas(PandasRow::new(&batch, 1));
        assert_eq!(row.get("b").unwrap(), Some(Scalar::from("y")));
        assert_eq!(row.get("missing").unwrap(), None);
        assert_eq!(row.num_columns(), 2);

        let public = row.to_public().unwrap();
        assert_eq!(public.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(public["a"], Scalar::I64(2));
    }
}
