use glaredb_error::{DbError, Result};

use super::datatype::DataType;
use super::scalar::ScalarValue;

/// Physical storage for a column.
///
/// Values at positions marked invalid by the column's validity bitmap are
/// placeholders and must never be read as data.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Null(usize),
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Utf8(Vec<String>),
}

impl ArrayData {
    /// Create array data of some length with every value set to the type's
    /// default.
    pub fn zeroed(datatype: DataType, len: usize) -> Self {
        match datatype {
            DataType::Null => ArrayData::Null(len),
            DataType::Boolean => ArrayData::Boolean(vec![false; len]),
            DataType::Int32 => ArrayData::Int32(vec![0; len]),
            DataType::Int64 => ArrayData::Int64(vec![0; len]),
            DataType::UInt64 => ArrayData::UInt64(vec![0; len]),
            DataType::Float32 => ArrayData::Float32(vec![0.0; len]),
            DataType::Float64 => ArrayData::Float64(vec![0.0; len]),
            DataType::Utf8 => ArrayData::Utf8(vec![String::new(); len]),
        }
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Self::Null(_) => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::UInt64(_) => DataType::UInt64,
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Null(len) => *len,
            Self::Boolean(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::UInt64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the value at a physical index ignoring validity.
    pub fn physical_scalar(&self, idx: usize) -> Result<ScalarValue> {
        if idx >= self.len() {
            return Err(DbError::new(format!(
                "Physical index {idx} out of bounds for array data of length {}",
                self.len()
            )));
        }

        Ok(match self {
            Self::Null(_) => ScalarValue::Null,
            Self::Boolean(v) => ScalarValue::Boolean(v[idx]),
            Self::Int32(v) => ScalarValue::Int32(v[idx]),
            Self::Int64(v) => ScalarValue::Int64(v[idx]),
            Self::UInt64(v) => ScalarValue::UInt64(v[idx]),
            Self::Float32(v) => ScalarValue::Float32(v[idx]),
            Self::Float64(v) => ScalarValue::Float64(v[idx]),
            Self::Utf8(v) => ScalarValue::Utf8(v[idx].clone()),
        })
    }
}

/// Rust types that map directly onto a variant of `ArrayData`.
pub trait NativeType: Sized + Clone + Default + Send + Sync + 'static {
    const DATATYPE: DataType;

    fn into_array_data(values: Vec<Self>) -> ArrayData;
}

macro_rules! impl_native_type {
    ($native:ty, $variant:ident) => {
        impl NativeType for $native {
            const DATATYPE: DataType = DataType::$variant;

            fn into_array_data(values: Vec<Self>) -> ArrayData {
                ArrayData::$variant(values)
            }
        }

        impl From<Vec<$native>> for ArrayData {
            fn from(values: Vec<$native>) -> Self {
                ArrayData::$variant(values)
            }
        }
    };
}

impl_native_type!(bool, Boolean);
impl_native_type!(i32, Int32);
impl_native_type!(i64, Int64);
impl_native_type!(u64, UInt64);
impl_native_type!(f32, Float32);
impl_native_type!(f64, Float64);
impl_native_type!(String, Utf8);

/// Builds array data of a single type from scalars.
#[derive(Debug)]
pub(crate) struct ScalarBuilder {
    datatype: DataType,
    data: ArrayData,
}

impl ScalarBuilder {
    pub fn with_capacity(datatype: DataType, cap: usize) -> Self {
        let data = match datatype {
            DataType::Null => ArrayData::Null(0),
            DataType::Boolean => ArrayData::Boolean(Vec::with_capacity(cap)),
            DataType::Int32 => ArrayData::Int32(Vec::with_capacity(cap)),
            DataType::Int64 => ArrayData::Int64(Vec::with_capacity(cap)),
            DataType::UInt64 => ArrayData::UInt64(Vec::with_capacity(cap)),
            DataType::Float32 => ArrayData::Float32(Vec::with_capacity(cap)),
            DataType::Float64 => ArrayData::Float64(Vec::with_capacity(cap)),
            DataType::Utf8 => ArrayData::Utf8(Vec::with_capacity(cap)),
        };
        ScalarBuilder { datatype, data }
    }

    /// Push a value, returning whether it was valid.
    ///
    /// Nulls push a placeholder.
    pub fn push(&mut self, value: &ScalarValue) -> Result<bool> {
        match (&mut self.data, value) {
            (ArrayData::Null(len), _) if value.is_null() => {
                *len += 1;
                return Ok(false);
            }
            (ArrayData::Boolean(v), ScalarValue::Boolean(x)) => v.push(*x),
            (ArrayData::Int32(v), ScalarValue::Int32(x)) => v.push(*x),
            (ArrayData::Int64(v), ScalarValue::Int64(x)) => v.push(*x),
            (ArrayData::UInt64(v), ScalarValue::UInt64(x)) => v.push(*x),
            (ArrayData::Float32(v), ScalarValue::Float32(x)) => v.push(*x),
            (ArrayData::Float64(v), ScalarValue::Float64(x)) => v.push(*x),
            (ArrayData::Utf8(v), ScalarValue::Utf8(x)) => v.push(x.clone()),
            (ArrayData::Boolean(v), ScalarValue::Null) => v.push(false),
            (ArrayData::Int32(v), ScalarValue::Null) => v.push(0),
            (ArrayData::Int64(v), ScalarValue::Null) => v.push(0),
            (ArrayData::UInt64(v), ScalarValue::Null) => v.push(0),
            (ArrayData::Float32(v), ScalarValue::Null) => v.push(0.0),
            (ArrayData::Float64(v), ScalarValue::Null) => v.push(0.0),
            (ArrayData::Utf8(v), ScalarValue::Null) => v.push(String::new()),
            (_, other) => {
                return Err(DbError::dtype_mismatch(format!(
                    "Cannot push value '{other}' of type {} into array of type {}",
                    other.datatype(),
                    self.datatype,
                )));
            }
        }
        Ok(!value.is_null())
    }

    pub fn finish(self) -> ArrayData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_mixed_types() {
        let mut builder = ScalarBuilder::with_capacity(DataType::Int64, 2);
        assert!(builder.push(&ScalarValue::Int64(1)).unwrap());
        assert!(!builder.push(&ScalarValue::Null).unwrap());

        let err = builder.push(&ScalarValue::Utf8("a".into())).unwrap_err();
        assert_eq!(glaredb_error::ErrorKind::DtypeMismatch, err.kind());

        assert_eq!(ArrayData::Int64(vec![1, 0]), builder.finish());
    }

    #[test]
    fn physical_scalar_out_of_bounds() {
        let data = ArrayData::from(vec![1.5_f64]);
        assert_eq!(ScalarValue::Float64(1.5), data.physical_scalar(0).unwrap());
        assert!(data.physical_scalar(1).is_err());
    }
}
