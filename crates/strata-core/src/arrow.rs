//! Arrow schema interop (feature `arrow`).
//!
//! Arrow types without a `Scalar` counterpart map to `DataType::Object`; the
//! block crate reports `Error::NotImplemented` if their values are read.

use arrow_schema::{DataType as ArrowType, Schema as ArrowSchema};

use crate::schema::{DataType, Field, Schema};

impl DataType {
    pub fn from_arrow(dt: &ArrowType) -> DataType {
        match dt {
            ArrowType::Null => DataType::Null,
            ArrowType::Boolean => DataType::Boolean,
            ArrowType::Int8 | ArrowType::Int16 | ArrowType::Int32 => DataType::Int32,
            ArrowType::UInt8 | ArrowType::UInt16 => DataType::Int32,
            ArrowType::Int64 | ArrowType::UInt32 | ArrowType::UInt64 => DataType::Int64,
            ArrowType::Float32 => DataType::Float32,
            ArrowType::Float64 => DataType::Float64,
            ArrowType::Utf8 | ArrowType::LargeUtf8 => DataType::Utf8,
            ArrowType::Binary | ArrowType::LargeBinary => DataType::Binary,
            _ => DataType::Object,
        }
    }
}

impl Schema {
    pub fn from_arrow(schema: &ArrowSchema) -> Schema {
        Schema::new(
            schema
                .fields()
                .iter()
                .map(|f| Field::new(f.name(), DataType::from_arrow(f.data_type()), f.is_nullable()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::Field as ArrowField;

    #[test]
    fn test_from_arrow_widens_small_ints() {
        let arrow = ArrowSchema::new(vec![
            ArrowField::new("a", ArrowType::Int16, false),
            ArrowField::new("b", ArrowType::UInt32, true),
            ArrowField::new("c", ArrowType::LargeUtf8, true),
            ArrowField::new("d", ArrowType::Date32, true),
        ]);
        let schema = Schema::from_arrow(&arrow);
        let types: Vec<DataType> = schema.fields.iter().map(|f| f.data_type).collect();
        assert_eq!(
            types,
            vec![DataType::Int32, DataType::Int64, DataType::Utf8, DataType::Object]
        );
        assert!(!schema.fields[0].nullable);
    }
}
