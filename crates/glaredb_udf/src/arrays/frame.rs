use glaredb_error::{DbError, Result};

use super::column::Column;
use super::selection::SelectionVector;

/// An ordered collection of uniquely named columns all sharing the same
/// length.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Frame {
    pub const fn empty() -> Self {
        Frame {
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    /// Create a new frame, checking that all columns have the same length and
    /// unique names.
    pub fn try_new(columns: impl IntoIterator<Item = Column>) -> Result<Self> {
        let columns: Vec<_> = columns.into_iter().collect();
        let num_rows = match columns.first() {
            Some(col) => col.len(),
            None => return Ok(Self::empty()),
        };

        for (idx, col) in columns.iter().enumerate() {
            if col.len() != num_rows {
                return Err(DbError::invalid_input(format!(
                    "Column '{}' has length {}, expected length {num_rows}",
                    col.name(),
                    col.len()
                )));
            }
            if columns[..idx].iter().any(|other| other.name() == col.name()) {
                return Err(DbError::invalid_input(format!(
                    "Duplicate column name '{}'",
                    col.name()
                )));
            }
        }

        Ok(Frame { columns, num_rows })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name())
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|col| col.name() == name)
            .ok_or_else(|| DbError::invalid_input(format!("Missing column '{name}'")))
    }

    /// Get multiple columns by name, in the order given.
    pub fn columns_by_name(&self, names: &[&str]) -> Result<Vec<Column>> {
        names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect()
    }

    /// Select rows from every column, producing a frame of views over the
    /// same data.
    pub fn select_rows(&self, selection: &SelectionVector) -> Result<Self> {
        let columns = self
            .columns
            .iter()
            .map(|col| col.select(selection))
            .collect::<Result<Vec<_>>>()?;

        Ok(Frame {
            columns,
            num_rows: selection.num_rows(),
        })
    }
}
