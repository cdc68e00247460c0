//! Conversions between Arrow arrays and `Scalar` columns.
//!
//! Building Arrow data from scalars can fail structurally (a column mixing
//! strings and numbers has no Arrow type). Those failures come back as
//! [`ArrowConversionError`] so callers can decide whether to fall back;
//! ragged columns are a shape error and never fall back.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float32Array, Float64Array, Int32Array,
    Int64Array, NullArray, StringArray,
};
use arrow::datatypes::{
    DataType as ArrowType, Field as ArrowField, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Int8Type, Schema as ArrowSchema, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use thiserror::Error;

use strata_core::error::{Error, Result};
use strata_core::repr::truncated_repr;
use strata_core::schema::DataType;
use strata_core::types::{infer_data_type, Column, ColumnMap, RowBatch, Scalar};

/// Values could not be expressed as an Arrow array.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ArrowConversionError(pub String);

impl From<ArrowConversionError> for Error {
    fn from(e: ArrowConversionError) -> Self {
        Error::Conversion(e.0)
    }
}

/// Build an Arrow array from scalars, inferring the narrowest common type.
pub fn scalars_to_array(values: &[Scalar]) -> std::result::Result<ArrayRef, ArrowConversionError> {
    let array: ArrayRef = match infer_data_type(values) {
        DataType::Null => Arc::new(NullArray::new(values.len())),
        DataType::Boolean => Arc::new(BooleanArray::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Int32 => Arc::new(Int32Array::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::I32(x) => Some(*x),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Int64 => Arc::new(Int64Array::from(
            values.iter().map(Scalar::as_i64).collect::<Vec<_>>(),
        )),
        DataType::Float32 => Arc::new(Float32Array::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::F32(x) => Some(*x),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Float64 => Arc::new(Float64Array::from(
            values.iter().map(Scalar::as_f64).collect::<Vec<_>>(),
        )),
        DataType::Utf8 => Arc::new(StringArray::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Str(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Binary => Arc::new(BinaryArray::from(
            values
                .iter()
                .map(|v| match v {
                    Scalar::Bin(b) => Some(b.as_slice()),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )),
        DataType::Object => {
            return Err(ArrowConversionError(format!(
                "could not infer a common arrow type for values {}",
                truncated_repr(values)
            )))
        }
    };
    Ok(array)
}

/// Read one value out of an Arrow array.
pub fn scalar_at(array: &dyn Array, idx: usize) -> Result<Scalar> {
    if array.is_null(idx) {
        return Ok(Scalar::Null);
    }
    let value = match array.data_type() {
        ArrowType::Null => Scalar::Null,
        ArrowType::Boolean => Scalar::Bool(array.as_boolean().value(idx)),
        ArrowType::Int8 => Scalar::I32(array.as_primitive::<Int8Type>().value(idx) as i32),
        ArrowType::Int16 => Scalar::I32(array.as_primitive::<Int16Type>().value(idx) as i32),
        ArrowType::Int32 => Scalar::I32(array.as_primitive::<Int32Type>().value(idx)),
        ArrowType::UInt8 => Scalar::I32(array.as_primitive::<UInt8Type>().value(idx) as i32),
        ArrowType::UInt16 => Scalar::I32(array.as_primitive::<UInt16Type>().value(idx) as i32),
        ArrowType::Int64 => Scalar::I64(array.as_primitive::<Int64Type>().value(idx)),
        ArrowType::UInt32 => Scalar::I64(array.as_primitive::<UInt32Type>().value(idx) as i64),
        ArrowType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(idx);
            Scalar::I64(i64::try_from(v).map_err(|_| {
                Error::Conversion(format!("uint64 value {v} does not fit a signed 64-bit integer"))
            })?)
        }
        ArrowType::Float32 => Scalar::F32(array.as_primitive::<Float32Type>().value(idx)),
        ArrowType::Float64 => Scalar::F64(array.as_primitive::<Float64Type>().value(idx)),
        ArrowType::Utf8 => Scalar::Str(array.as_string::<i32>().value(idx).to_string()),
        ArrowType::LargeUtf8 => Scalar::Str(array.as_string::<i64>().value(idx).to_string()),
        ArrowType::Binary => Scalar::Bin(array.as_binary::<i32>().value(idx).to_vec()),
        ArrowType::LargeBinary => Scalar::Bin(array.as_binary::<i64>().value(idx).to_vec()),
        other => {
            return Err(Error::NotImplemented(format!(
                "reading values of arrow type {other}"
            )))
        }
    };
    Ok(value)
}

pub fn array_to_scalars(array: &dyn Array) -> Result<Vec<Scalar>> {
    (0..array.len()).map(|i| scalar_at(array, i)).collect()
}

/// Build a record batch from named scalar columns of equal length.
///
/// The outer result carries shape errors, the inner one structural
/// conversion failures.
pub fn columns_to_arrow<'a, I>(
    columns: I,
    num_rows: usize,
) -> Result<std::result::Result<RecordBatch, ArrowConversionError>>
where
    I: IntoIterator<Item = (&'a str, &'a [Scalar])>,
{
    let columns: Vec<(&str, &[Scalar])> = columns.into_iter().collect();
    if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != num_rows) {
        return Err(Error::Shape(format!(
            "all columns must be the same length: expected {num_rows} rows, column '{name}' has {}",
            values.len()
        )));
    }

    let mut fields = Vec::with_capacity(columns.len());
    let mut arrays = Vec::with_capacity(columns.len());
    for (name, values) in columns {
        let array = match scalars_to_array(values) {
            Ok(array) => array,
            Err(e) => {
                return Ok(Err(ArrowConversionError(format!("column '{name}': {}", e.0))));
            }
        };
        let nullable = array.data_type() == &ArrowType::Null || values.iter().any(Scalar::is_null);
        fields.push(ArrowField::new(name, array.data_type().clone(), nullable));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    let batch =
        RecordBatch::try_new_with_options(Arc::new(ArrowSchema::new(fields)), arrays, &options)
            .map_err(|e| ArrowConversionError(e.to_string()));
    Ok(batch)
}

/// Convert a name→array mapping. Every column must have the same length.
pub fn column_map_to_arrow(
    columns: &ColumnMap,
) -> Result<std::result::Result<RecordBatch, ArrowConversionError>> {
    let num_rows = columns.values().next().map(Vec::len).unwrap_or(0);
    columns_to_arrow(
        columns.iter().map(|(name, values)| (name.as_str(), values.as_slice())),
        num_rows,
    )
}

/// Convert a dataframe-style batch, reporting conversion failures as errors.
pub fn row_batch_to_arrow(batch: &RowBatch) -> Result<RecordBatch> {
    let converted = columns_to_arrow(
        batch
            .columns()
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice())),
        batch.num_rows(),
    )?;
    Ok(converted?)
}

pub fn arrow_to_row_batch(batch: &RecordBatch) -> Result<RowBatch> {
    let schema = batch.schema();
    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| Ok(Column::new(field.name().clone(), array_to_scalars(array.as_ref())?)))
        .collect::<Result<Vec<_>>>()?;
    RowBatch::with_num_rows(columns, batch.num_rows())
}
