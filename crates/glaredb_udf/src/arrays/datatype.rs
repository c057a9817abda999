use std::fmt;

/// Supported data types.
///
/// `Null` is the type of a column whose values are all absent and which has
/// not been given a concrete type. It can be cast to any other type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Constant null columns.
    Null,
    Boolean,
    Int32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Utf8,
}

impl DataType {
    pub const fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::UInt64)
    }

    pub const fn is_numeric(&self) -> bool {
        self.is_float() || self.is_integer()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::UInt64 => write!(f, "UInt64"),
            Self::Float32 => write!(f, "Float32"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
        }
    }
}
