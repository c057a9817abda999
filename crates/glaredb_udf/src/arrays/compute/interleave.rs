use glaredb_error::{DbError, Result};

use crate::arrays::array_data::ArrayData;
use crate::arrays::bitmap::Bitmap;
use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;

macro_rules! interleave_variant {
    ($columns:expr, $indices:expr, $variant:ident) => {{
        let mut values = Vec::with_capacity($indices.len());
        for &(col_idx, row_idx) in $indices {
            let col = $columns
                .get(col_idx)
                .ok_or_else(|| DbError::new(format!("Missing column at index {col_idx}")))?;
            let phys = col
                .physical_index(row_idx)
                .ok_or_else(|| out_of_bounds(col, row_idx))?;
            match col.array_data() {
                ArrayData::$variant(v) => values.push(v[phys].clone()),
                other => {
                    return Err(DbError::new(format!(
                        "Unexpected array data for {}: {}",
                        stringify!($variant),
                        other.datatype()
                    )));
                }
            }
        }
        ArrayData::$variant(values)
    }};
}

/// Interleave multiple columns into a single column.
///
/// The provided indices should be (column, row) pairs which are used to build
/// the final column. Rows are logical row indices. (column, row) pairs may be
/// provided more than once.
///
/// Errors if no columns are provided, or if not all columns are of the same
/// type. The output takes the name of the first column.
pub fn interleave(columns: &[&Column], indices: &[(usize, usize)]) -> Result<Column> {
    let first = match columns.first() {
        Some(col) => *col,
        None => return Err(DbError::new("Cannot interleave zero columns")),
    };
    let datatype = first.datatype();

    if let Some(col) = columns.iter().find(|col| col.datatype() != datatype) {
        return Err(DbError::dtype_mismatch(format!(
            "Cannot interleave columns with different data types: {datatype} and {}",
            col.datatype()
        )));
    }

    let data = match datatype {
        DataType::Null => ArrayData::Null(indices.len()),
        DataType::Boolean => interleave_variant!(columns, indices, Boolean),
        DataType::Int32 => interleave_variant!(columns, indices, Int32),
        DataType::Int64 => interleave_variant!(columns, indices, Int64),
        DataType::UInt64 => interleave_variant!(columns, indices, UInt64),
        DataType::Float32 => interleave_variant!(columns, indices, Float32),
        DataType::Float64 => interleave_variant!(columns, indices, Float64),
        DataType::Utf8 => interleave_variant!(columns, indices, Utf8),
    };

    let validity = if datatype != DataType::Null
        && columns.iter().any(|col| col.validity().is_some())
    {
        let mut validity = Bitmap::with_capacity(indices.len());
        for &(col_idx, row_idx) in indices {
            let valid = columns[col_idx]
                .is_valid(row_idx)
                .ok_or_else(|| out_of_bounds(columns[col_idx], row_idx))?;
            validity.push(valid);
        }
        Some(validity)
    } else {
        None
    };

    Column::from_parts(first.name().to_string(), data, validity)
}

/// Take the first `len` logical rows of a column into a new column without a
/// selection.
pub(crate) fn take(column: &Column, len: usize) -> Result<Column> {
    let indices: Vec<_> = (0..len).map(|row| (0, row)).collect();
    interleave(&[column], &indices)
}

fn out_of_bounds(column: &Column, row: usize) -> DbError {
    DbError::new(format!(
        "Row {row} out of bounds for column '{}' of length {}",
        column.name(),
        column.len()
    ))
}
