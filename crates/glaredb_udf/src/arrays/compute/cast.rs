use glaredb_error::{DbError, Result};

use crate::arrays::array_data::ArrayData;
use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;

/// Cast a column to a different data type.
///
/// Supported casts:
/// - Any type to itself.
/// - `Null` to any type (producing typed nulls).
/// - Any numeric type to `Float32` or `Float64`.
/// - `Int32` to `Int64`.
pub fn cast(column: &Column, to: DataType) -> Result<Column> {
    let from = column.datatype();
    if from == to {
        return Ok(column.clone());
    }

    if from == DataType::Null {
        return Ok(Column::new_typed_null(column.name(), to, column.len()));
    }

    let column = column.materialize()?;
    let data = match (column.array_data(), to) {
        (ArrayData::Int32(v), DataType::Int64) => {
            ArrayData::Int64(v.iter().map(|&v| v as i64).collect())
        }
        (data, DataType::Float64) if from.is_numeric() => {
            ArrayData::Float64(float_values(data).collect())
        }
        (data, DataType::Float32) if from.is_numeric() => {
            ArrayData::Float32(float_values(data).map(|v| v as f32).collect())
        }
        _ => {
            return Err(DbError::dtype_mismatch(format!(
                "Cannot cast column '{}' from {from} to {to}",
                column.name()
            )));
        }
    };

    Column::from_parts(column.name().to_string(), data, column.validity().cloned())
}

/// Iterate physical values of numeric array data as f64.
fn float_values(data: &ArrayData) -> Box<dyn Iterator<Item = f64> + '_> {
    match data {
        ArrayData::Int32(v) => Box::new(v.iter().map(|&v| v as f64)),
        ArrayData::Int64(v) => Box::new(v.iter().map(|&v| v as f64)),
        ArrayData::UInt64(v) => Box::new(v.iter().map(|&v| v as f64)),
        ArrayData::Float32(v) => Box::new(v.iter().map(|&v| v as f64)),
        ArrayData::Float64(v) => Box::new(v.iter().copied()),
        _ => Box::new(std::iter::empty()),
    }
}
