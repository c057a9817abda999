use glaredb_error::{DbError, Result};

use super::interleave::interleave;
use crate::arrays::column::Column;

/// Concat multiple columns into a single column.
///
/// All columns must be of the same type. The output takes the name of the
/// first column.
pub fn concat(columns: &[&Column]) -> Result<Column> {
    if columns.is_empty() {
        return Err(DbError::new("Cannot concat zero columns"));
    }

    let indices: Vec<_> = columns
        .iter()
        .enumerate()
        .flat_map(|(col_idx, col)| (0..col.len()).map(move |row| (col_idx, row)))
        .collect();

    interleave(columns, &indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_in_order() {
        let a = Column::new("a", vec![1_i64, 2]);
        let b = Column::from_options("b", [None, Some(4_i64)]);

        let out = concat(&[&a, &b]).unwrap();
        assert_eq!(
            Column::from_options("a", [Some(1_i64), Some(2), None, Some(4)]),
            out
        );
    }

    #[test]
    fn concat_zero() {
        assert!(concat(&[]).is_err());
    }
}
