//! Dynamically typed value model shared by both block representations.
//!
//! `RowBatch` is the dataframe-style ("pandas") block: named columns of
//! `Scalar`s that may mix types within a column. The Arrow representation
//! converts to and from these values at its boundary.

use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::{DataType, Field, Schema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::Null => DataType::Null,
            Scalar::Bool(_) => DataType::Boolean,
            Scalar::I32(_) => DataType::Int32,
            Scalar::I64(_) => DataType::Int64,
            Scalar::F32(_) => DataType::Float32,
            Scalar::F64(_) => DataType::Float64,
            Scalar::Str(_) => DataType::Utf8,
            Scalar::Bin(_) => DataType::Binary,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::I32(v) => Some(*v as f64),
            Scalar::I64(v) => Some(*v as f64),
            Scalar::F32(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::I32(v) => Some(*v as i64),
            Scalar::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Approximate in-memory footprint: the enum itself plus owned heap bytes.
    pub fn size_bytes(&self) -> u64 {
        let heap = match self {
            Scalar::Str(s) => s.len(),
            Scalar::Bin(b) => b.len(),
            _ => 0,
        };
        (std::mem::size_of::<Scalar>() + heap) as u64
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::I32(v) => write!(f, "{v}"),
            Scalar::I64(v) => write!(f, "{v}"),
            Scalar::F32(v) => write!(f, "{v}"),
            Scalar::F64(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v:?}"),
            Scalar::Bin(v) => write!(f, "b{:?}", String::from_utf8_lossy(v)),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::I32(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Scalar::Null)
    }
}

/// Ordered mapping of column name to a one-dimensional array of values.
///
/// This is the user-facing "numpy" batch shape.
pub type ColumnMap = IndexMap<String, Vec<Scalar>>;

/// Infer the common type of a column's values. Mixed, non-numeric content
/// yields `DataType::Object`.
pub fn infer_data_type(values: &[Scalar]) -> DataType {
    values
        .iter()
        .fold(DataType::Null, |acc, v| acc.unify(v.data_type()))
}

/// Named column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn field(&self) -> Field {
        Field::new(
            self.name.clone(),
            infer_data_type(&self.values),
            self.values.iter().any(Scalar::is_null),
        )
    }
}

/// Dataframe-style table of `Scalar` columns.
///
/// The row count is stored next to the columns so a batch without columns
/// still knows how many rows it has.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RowBatch {
    columns: Vec<Column>,
    num_rows: usize,
}

impl RowBatch {
    /// Build a batch, checking that every column has the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        Self::with_num_rows(columns, num_rows)
    }

    /// Build a batch of `num_rows` rows; every column must have that length.
    pub fn with_num_rows(columns: Vec<Column>, num_rows: usize) -> Result<Self> {
        if let Some(bad) = columns.iter().find(|c| c.len() != num_rows) {
            return Err(Error::Shape(format!(
                "all columns must be the same length: expected {num_rows} rows, column '{}' has {}",
                bad.name,
                bad.len()
            )));
        }
        Ok(Self { columns, num_rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from a name→array mapping, preserving column order.
    pub fn from_columns(columns: ColumnMap) -> Result<Self> {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| Column { name, values })
                .collect(),
        )
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.iter().map(Column::field).collect())
    }

    /// Approximate footprint: value sizes plus column names.
    pub fn size_bytes(&self) -> u64 {
        self.columns
            .iter()
            .map(|c| c.name.len() as u64 + c.values.iter().map(Scalar::size_bytes).sum::<u64>())
            .sum()
    }

    /// Rows `[start, end)`. Caller checks the bounds.
    pub fn slice(&self, start: usize, end: usize) -> RowBatch {
        RowBatch {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[start..end].to_vec(),
                })
                .collect(),
            num_rows: end - start,
        }
    }

    /// Gather rows by index, in the given order.
    pub fn take(&self, indices: &[usize]) -> Result<RowBatch> {
        let num_rows = self.num_rows;
        if let Some(bad) = indices.iter().find(|&&i| i >= num_rows) {
            return Err(Error::InvalidArgument(format!(
                "row index {bad} out of bounds for block of {num_rows} rows"
            )));
        }
        Ok(RowBatch {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: indices.iter().map(|&i| c.values[i].clone()).collect(),
                })
                .collect(),
            num_rows: indices.len(),
        })
    }

    /// Project to the named columns, in the given order. The row count is
    /// kept even when no columns are selected.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<RowBatch> {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column(name).cloned().ok_or_else(|| {
                    Error::Schema(format!(
                        "column '{}' not found, available columns: {:?}",
                        name,
                        self.column_names()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(RowBatch {
            columns,
            num_rows: self.num_rows,
        })
    }

    /// Append the rows of `other`, matching columns by name.
    pub fn append(&mut self, other: &RowBatch) -> Result<()> {
        if self.columns.is_empty() && self.num_rows == 0 {
            *self = other.clone();
            return Ok(());
        }
        if other.columns.is_empty() && other.num_rows == 0 {
            return Ok(());
        }
        if self.num_columns() != other.num_columns() {
            return Err(Error::Schema(format!(
                "cannot append batch with columns {:?} to batch with columns {:?}",
                other.column_names(),
                self.column_names()
            )));
        }
        for col in &mut self.columns {
            let src = other.column(&col.name).ok_or_else(|| {
                Error::Schema(format!("column '{}' missing from appended batch", col.name))
            })?;
            col.values.extend(src.values.iter().cloned());
        }
        self.num_rows += other.num_rows;
        Ok(())
    }

    /// Concatenate two RowBatches side-by-side.
    ///
    /// Both sides must have the same row count. Right columns whose names clash
    /// with an existing column get a `_1`, `_2`, ... suffix.
    pub fn zip(left: &RowBatch, right: &RowBatch) -> Result<RowBatch> {
        if left.num_rows != right.num_rows {
            return Err(Error::Shape(format!(
                "cannot zip blocks with different row counts: {} vs {}",
                left.num_rows, right.num_rows
            )));
        }

        let mut columns = left.columns.clone();
        for col in &right.columns {
            let existing: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            let name = unique_column_name(&col.name, &existing);
            columns.push(Column {
                name,
                values: col.values.clone(),
            });
        }

        Ok(RowBatch {
            columns,
            num_rows: left.num_rows,
        })
    }
}

/// First of `name`, `name_1`, `name_2`, ... not present in `existing`.
pub fn unique_column_name(name: &str, existing: &[&str]) -> String {
    let mut candidate = name.to_string();
    let mut i = 1;
    while existing.contains(&candidate.as_str()) {
        candidate = format!("{name}_{i}");
        i += 1;
    }
    candidate
}

/// Total order over scalars.
///
/// Nulls sort first, numbers compare by value across widths, NaN sorts after
/// every other number, and unrelated types order by variant.
pub fn scalar_cmp(a: &Scalar, b: &Scalar) -> Ordering {
    use Scalar::*;

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(x), Bool(y)) => x.cmp(y),
        (I32(x), I32(y)) => x.cmp(y),
        (I64(x), I64(y)) => x.cmp(y),
        (I32(x), I64(y)) => (*x as i64).cmp(y),
        (I64(x), I32(y)) => x.cmp(&(*y as i64)),
        (Str(x), Str(y)) => x.cmp(y),
        (Bin(x), Bin(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => float_cmp(x, y),
            _ => scalar_type_order(a).cmp(&scalar_type_order(b)),
        },
    }
}

fn float_cmp(x: f64, y: f64) -> Ordering {
    if x.is_nan() && y.is_nan() {
        Ordering::Equal
    } else if x.is_nan() {
        Ordering::Greater
    } else if y.is_nan() {
        Ordering::Less
    } else {
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
}

/// Assign a numeric order to scalar types for mixed-type comparisons.
fn scalar_type_order(s: &Scalar) -> u8 {
    use Scalar::*;
    match s {
        Null => 0,
        Bool(_) => 1,
        I32(_) | I64(_) | F32(_) | F64(_) => 2,
        Str(_) => 3,
        Bin(_) => 4,
    }
}
