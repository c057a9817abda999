use std::sync::Arc;

use glaredb_error::{DbError, Result};

use super::array_data::{ArrayData, NativeType, ScalarBuilder};
use super::bitmap::Bitmap;
use super::datatype::DataType;
use super::scalar::ScalarValue;
use super::selection::SelectionVector;

/// A named, typed, fixed-length sequence of values.
///
/// Physical data, validity and selection are reference counted. Cloning a
/// column or selecting rows from it never copies the underlying values, the
/// resulting column is a view over the same storage.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    /// The physical data.
    data: Arc<ArrayData>,
    /// Optional validity mask.
    ///
    /// Maps directly to the physical data, does not take into account the
    /// selection.
    validity: Option<Arc<Bitmap>>,
    /// Selection of rows for the column.
    ///
    /// If set, this provides logical row mapping on top of the underlying
    /// data. If not set, then there's a one-to-one mapping between the logical
    /// row and the row in the underlying data.
    selection: Option<Arc<SelectionVector>>,
}

impl Column {
    pub fn new(name: impl Into<String>, data: impl Into<ArrayData>) -> Self {
        Column {
            name: name.into(),
            data: Arc::new(data.into()),
            validity: None,
            selection: None,
        }
    }

    /// Create a column from values where `None` represents a null.
    pub fn from_options<T: NativeType>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<T>>,
    ) -> Self {
        let mut validity = Bitmap::default();
        let values: Vec<T> = values
            .into_iter()
            .map(|v| {
                validity.push(v.is_some());
                v.unwrap_or_default()
            })
            .collect();

        let validity = if validity.is_all_true() {
            None
        } else {
            Some(Arc::new(validity))
        };

        Column {
            name: name.into(),
            data: Arc::new(T::into_array_data(values)),
            validity,
            selection: None,
        }
    }

    /// Create a column from scalars.
    ///
    /// If `datatype` is None, the type is inferred from the first non-null
    /// value. A column containing only nulls with no provided type will have
    /// the `Null` data type.
    pub fn try_from_scalars(
        name: impl Into<String>,
        datatype: Option<DataType>,
        values: &[ScalarValue],
    ) -> Result<Self> {
        let datatype = match datatype {
            Some(datatype) => datatype,
            None => values
                .iter()
                .find(|v| !v.is_null())
                .map(|v| v.datatype())
                .unwrap_or(DataType::Null),
        };

        let mut builder = ScalarBuilder::with_capacity(datatype, values.len());
        let mut validity = Bitmap::with_capacity(values.len());
        for value in values {
            let valid = builder.push(value)?;
            validity.push(valid);
        }

        let validity = if datatype == DataType::Null || validity.is_all_true() {
            None
        } else {
            Some(Arc::new(validity))
        };

        Ok(Column {
            name: name.into(),
            data: Arc::new(builder.finish()),
            validity,
            selection: None,
        })
    }

    /// Create a column with a single value.
    pub fn from_scalar(name: impl Into<String>, value: ScalarValue) -> Result<Self> {
        Self::try_from_scalars(name, None, &[value])
    }

    /// Creates a new typed column with all values being null.
    pub fn new_typed_null(name: impl Into<String>, datatype: DataType, len: usize) -> Self {
        if datatype == DataType::Null {
            return Column::new(name, ArrayData::Null(len));
        }

        // Physical data of length 1, extended out by the selection.
        Column {
            name: name.into(),
            data: Arc::new(ArrayData::zeroed(datatype, 1)),
            validity: Some(Arc::new(Bitmap::new_with_all_false(1))),
            selection: Some(Arc::new(SelectionVector::repeated(len, 0))),
        }
    }

    pub(crate) fn from_parts(
        name: String,
        data: ArrayData,
        validity: Option<Bitmap>,
    ) -> Result<Self> {
        if let Some(validity) = &validity {
            if validity.len() != data.len() {
                return Err(DbError::new(format!(
                    "Validity length {} does not match data length {}",
                    validity.len(),
                    data.len()
                )));
            }
        }

        Ok(Column {
            name,
            data: Arc::new(data),
            validity: validity.map(Arc::new),
            selection: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the same column with a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn datatype(&self) -> DataType {
        self.data.datatype()
    }

    pub fn array_data(&self) -> &ArrayData {
        &self.data
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_deref()
    }

    pub fn selection_vector(&self) -> Option<&SelectionVector> {
        self.selection.as_deref()
    }

    /// Number of logical rows.
    pub fn len(&self) -> usize {
        match self.selection_vector() {
            Some(v) => v.num_rows(),
            None => self.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Map a logical index to the index in the physical data.
    #[inline]
    pub fn physical_index(&self, idx: usize) -> Option<usize> {
        match self.selection_vector() {
            Some(v) => v.get(idx),
            None if idx < self.data.len() => Some(idx),
            None => None,
        }
    }

    /// Check validity of a value at a logical index.
    ///
    /// Returns None if the index is out of bounds.
    pub fn is_valid(&self, idx: usize) -> Option<bool> {
        let idx = self.physical_index(idx)?;
        if matches!(self.data.as_ref(), ArrayData::Null(_)) {
            return Some(false);
        }
        match &self.validity {
            Some(validity) => Some(validity.value(idx)),
            None => Some(true),
        }
    }

    pub fn null_count(&self) -> usize {
        (0..self.len())
            .filter(|&idx| self.is_valid(idx) == Some(false))
            .count()
    }

    /// Get the value at a logical index.
    ///
    /// Takes into account the validity and selection vector.
    pub fn value(&self, idx: usize) -> Result<ScalarValue> {
        let phys = self.physical_index(idx).ok_or_else(|| {
            DbError::new(format!(
                "Logical index {idx} out of bounds for column '{}' of length {}",
                self.name,
                self.len()
            ))
        })?;

        if let Some(validity) = &self.validity {
            if !validity.value(phys) {
                return Ok(ScalarValue::Null);
            }
        }

        self.data.physical_scalar(phys)
    }

    /// Iterate over all logical values.
    pub fn iter_values(&self) -> impl Iterator<Item = Result<ScalarValue>> + '_ {
        (0..self.len()).map(|idx| self.value(idx))
    }

    /// Collect all logical values.
    pub fn values(&self) -> Result<Vec<ScalarValue>> {
        self.iter_values().collect()
    }

    /// Select rows from this column, producing a view over the same data.
    ///
    /// Takes into account any existing selection.
    pub fn select(&self, selection: &SelectionVector) -> Result<Self> {
        let len = self.len();
        if let Some(loc) = selection.iter_locations().find(|&loc| loc >= len) {
            return Err(DbError::new(format!(
                "Selection index {loc} out of bounds for column '{}' of length {len}",
                self.name
            )));
        }

        let selection = match self.selection_vector() {
            Some(existing) => existing.select(selection),
            None => selection.clone(),
        };

        Ok(Column {
            name: self.name.clone(),
            data: self.data.clone(),
            validity: self.validity.clone(),
            selection: Some(Arc::new(selection)),
        })
    }

    /// Repeat a single row column `len` times.
    pub fn broadcast(&self, len: usize) -> Result<Self> {
        if self.len() != 1 {
            return Err(DbError::new(format!(
                "Cannot broadcast column '{}' of length {}, expected length 1",
                self.name,
                self.len()
            )));
        }
        self.select(&SelectionVector::repeated(len, 0))
    }

    /// Fully materializes the selection.
    ///
    /// The resulting column's logical and physical indices will be the same.
    /// This is used before handing a column to code outside the engine.
    pub fn materialize(&self) -> Result<Self> {
        if self.selection.is_none() {
            return Ok(self.clone());
        }
        super::compute::interleave::take(self, self.len())
    }
}

/// Logical equality, ignoring physical layout.
impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name || self.datatype() != other.datatype() || self.len() != other.len()
        {
            return false;
        }
        (0..self.len()).all(|idx| match (self.value(idx), other.value(idx)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        })
    }
}
