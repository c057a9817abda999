//! Test utilities.
//!
//! Not behind `#[cfg(test)]` so integration tests can use these too.
//!
//! Should not be used outside of tests.

use super::column::Column;
use super::frame::Frame;

/// Asserts that two columns are logically equal, ignoring names.
pub fn assert_columns_eq(a: &Column, b: &Column) {
    assert_eq!(a.datatype(), b.datatype(), "data types differ");
    assert_eq!(a.len(), b.len(), "lengths differ");

    for row_idx in 0..a.len() {
        let a_val = a.value(row_idx).unwrap();
        let b_val = b.value(row_idx).unwrap();

        assert_eq!(a_val, b_val, "values differ at row {row_idx}");
    }
}

/// Asserts that two frames are logically equal, including column names.
pub fn assert_frames_eq(a: &Frame, b: &Frame) {
    assert_eq!(a.num_rows(), b.num_rows(), "num rows differ");
    assert_eq!(
        a.column_names().collect::<Vec<_>>(),
        b.column_names().collect::<Vec<_>>(),
        "column names differ"
    );

    for (a_col, b_col) in a.columns().iter().zip(b.columns()) {
        assert_columns_eq(a_col, b_col);
    }
}
