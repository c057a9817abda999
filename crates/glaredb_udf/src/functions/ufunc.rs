//! Recognition and native execution of vectorized numeric primitives.
use std::fmt;

use glaredb_error::{DbError, Result};

use super::UdfFunction;
use crate::arrays::array_data::ArrayData;
use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;
use crate::arrays::executor::UnaryExecutor;
use crate::arrays::scalar::ScalarValue;

/// A vectorized primitive with a native implementation in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ufunc {
    Exp,
    Expm1,
    Log,
    Log1p,
    Log2,
    Log10,
    Sqrt,
    Cbrt,
    Sin,
    Cos,
    Tan,
    Tanh,
}

impl Ufunc {
    pub const ALL: &'static [Ufunc] = &[
        Ufunc::Exp,
        Ufunc::Expm1,
        Ufunc::Log,
        Ufunc::Log1p,
        Ufunc::Log2,
        Ufunc::Log10,
        Ufunc::Sqrt,
        Ufunc::Cbrt,
        Ufunc::Sin,
        Ufunc::Cos,
        Ufunc::Tan,
        Ufunc::Tanh,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Exp => "exp",
            Self::Expm1 => "expm1",
            Self::Log => "log",
            Self::Log1p => "log1p",
            Self::Log2 => "log2",
            Self::Log10 => "log10",
            Self::Sqrt => "sqrt",
            Self::Cbrt => "cbrt",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Tanh => "tanh",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::Exp => "Compute `e ^ val`",
            Self::Expm1 => "Compute `e ^ val - 1`",
            Self::Log => "Compute the natural logarithm",
            Self::Log1p => "Compute `ln(1 + val)`",
            Self::Log2 => "Compute the base 2 logarithm",
            Self::Log10 => "Compute the base 10 logarithm",
            Self::Sqrt => "Compute the square root",
            Self::Cbrt => "Compute the cube root",
            Self::Sin => "Compute the sine",
            Self::Cos => "Compute the cosine",
            Self::Tan => "Compute the tangent",
            Self::Tanh => "Compute the hyperbolic tangent",
        }
    }

    /// Resolve a primitive from a well-known function name.
    ///
    /// Accepts bare names ("exp") as well as names qualified with the numpy
    /// module ("np.exp", "numpy.exp").
    pub fn from_name(name: &str) -> Option<Ufunc> {
        let name = name
            .strip_prefix("numpy.")
            .or_else(|| name.strip_prefix("np."))
            .unwrap_or(name);
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn apply_f64(&self, v: f64) -> f64 {
        match self {
            Self::Exp => v.exp(),
            Self::Expm1 => v.exp_m1(),
            Self::Log => v.ln(),
            Self::Log1p => v.ln_1p(),
            Self::Log2 => v.log2(),
            Self::Log10 => v.log10(),
            Self::Sqrt => v.sqrt(),
            Self::Cbrt => v.cbrt(),
            Self::Sin => v.sin(),
            Self::Cos => v.cos(),
            Self::Tan => v.tan(),
            Self::Tanh => v.tanh(),
        }
    }

    pub fn apply_f32(&self, v: f32) -> f32 {
        match self {
            Self::Exp => v.exp(),
            Self::Expm1 => v.exp_m1(),
            Self::Log => v.ln(),
            Self::Log1p => v.ln_1p(),
            Self::Log2 => v.log2(),
            Self::Log10 => v.log10(),
            Self::Sqrt => v.sqrt(),
            Self::Cbrt => v.cbrt(),
            Self::Sin => v.sin(),
            Self::Cos => v.cos(),
            Self::Tan => v.tan(),
            Self::Tanh => v.tanh(),
        }
    }

    /// Apply the primitive to a single value.
    ///
    /// Nulls produce nulls. Integers produce 64-bit floats.
    pub fn apply_scalar(&self, value: &ScalarValue) -> Result<ScalarValue> {
        match value {
            ScalarValue::Null => Ok(ScalarValue::Null),
            ScalarValue::Float32(v) => Ok(ScalarValue::Float32(self.apply_f32(*v))),
            other => match other.try_as_f64() {
                Some(v) => Ok(ScalarValue::Float64(self.apply_f64(v))),
                None => Err(self.invalid_input_type(other.datatype())),
            },
        }
    }

    /// Data type produced when applying this primitive to the given input
    /// type.
    pub fn return_type(&self, input: DataType) -> Result<DataType> {
        match input {
            DataType::Float32 => Ok(DataType::Float32),
            DataType::Null | DataType::Int32 | DataType::Int64 | DataType::UInt64 => {
                Ok(DataType::Float64)
            }
            DataType::Float64 => Ok(DataType::Float64),
            other => Err(self.invalid_input_type(other)),
        }
    }

    /// Execute the primitive over a whole column using the native kernels.
    ///
    /// Reads directly through the column's selection and validity, null rows
    /// stay null and are never computed on.
    pub fn execute(&self, input: &Column) -> Result<Column> {
        match input.array_data() {
            ArrayData::Null(_) => Ok(Column::new_typed_null(
                input.name(),
                DataType::Float64,
                input.len(),
            )),
            ArrayData::Int32(v) => {
                UnaryExecutor::execute(input, v, |v: i32| self.apply_f64(v as f64))
            }
            ArrayData::Int64(v) => {
                UnaryExecutor::execute(input, v, |v: i64| self.apply_f64(v as f64))
            }
            ArrayData::UInt64(v) => {
                UnaryExecutor::execute(input, v, |v: u64| self.apply_f64(v as f64))
            }
            ArrayData::Float32(v) => UnaryExecutor::execute(input, v, |v: f32| self.apply_f32(v)),
            ArrayData::Float64(v) => UnaryExecutor::execute(input, v, |v: f64| self.apply_f64(v)),
            other => Err(self.invalid_input_type(other.datatype())),
        }
    }

    fn invalid_input_type(&self, datatype: DataType) -> DbError {
        DbError::invalid_input(format!(
            "'{}' expects a numeric input, got {datatype}",
            self.name()
        ))
    }
}

impl fmt::Display for Ufunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detects callables that are known vectorized primitives.
///
/// Recognition only looks at metadata the callable exposes, the callable is
/// never invoked.
#[derive(Debug, Clone, Copy, Default)]
pub struct UfuncRecognizer;

impl UfuncRecognizer {
    pub fn recognize(function: &dyn UdfFunction) -> Option<Ufunc> {
        function.ufunc()
    }
}

/// A primitive wrapped as an opaque function.
///
/// When invoked through the generic path, the primitive is applied one value
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UfuncFunction {
    ufunc: Ufunc,
}

impl UfuncFunction {
    pub const fn new(ufunc: Ufunc) -> Self {
        UfuncFunction { ufunc }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ufunc::from_name(name)
            .map(Self::new)
            .ok_or_else(|| DbError::invalid_input(format!("Unknown vectorized function '{name}'")))
    }
}

impl UdfFunction for UfuncFunction {
    fn name(&self) -> &str {
        self.ufunc.name()
    }

    fn invoke(&self, inputs: &[Column]) -> Result<Column> {
        let input = match inputs {
            [input] => input,
            other => {
                return Err(DbError::invalid_input(format!(
                    "'{}' expects exactly one input, got {}",
                    self.ufunc,
                    other.len()
                )));
            }
        };

        let return_type = self.ufunc.return_type(input.datatype())?;
        let values = input
            .iter_values()
            .map(|v| self.ufunc.apply_scalar(&v?))
            .collect::<Result<Vec<_>>>()?;

        Column::try_from_scalars(input.name(), Some(return_type), &values)
    }

    fn ufunc(&self) -> Option<Ufunc> {
        Some(self.ufunc)
    }
}
