use std::fmt;

use glaredb_error::{DbError, Result};

use super::UdfFunction;
use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;

/// A function operating on one value at a time.
///
/// By default nulls are skipped: the function is not called for them and the
/// output is null.
pub struct ElementFunction<F> {
    name: String,
    f: F,
    skip_nulls: bool,
    return_dtype: Option<DataType>,
}

impl<F> ElementFunction<F>
where
    F: Fn(&ScalarValue) -> Result<ScalarValue> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        ElementFunction {
            name: name.into(),
            f,
            skip_nulls: true,
            return_dtype: None,
        }
    }

    pub fn with_skip_nulls(mut self, skip_nulls: bool) -> Self {
        self.skip_nulls = skip_nulls;
        self
    }

    /// Type of the produced values.
    ///
    /// Required to produce a typed column when every output is null.
    pub fn with_return_dtype(mut self, datatype: DataType) -> Self {
        self.return_dtype = Some(datatype);
        self
    }

    pub fn return_dtype(&self) -> Option<DataType> {
        self.return_dtype
    }
}

impl<F> fmt::Debug for ElementFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementFunction")
            .field("name", &self.name)
            .field("skip_nulls", &self.skip_nulls)
            .field("return_dtype", &self.return_dtype)
            .finish_non_exhaustive()
    }
}

impl<F> UdfFunction for ElementFunction<F>
where
    F: Fn(&ScalarValue) -> Result<ScalarValue> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, inputs: &[Column]) -> Result<Column> {
        let input = match inputs {
            [input] => input,
            other => {
                return Err(DbError::invalid_input(format!(
                    "Element function '{}' expects exactly one input, got {}",
                    self.name,
                    other.len()
                )));
            }
        };

        let values = input
            .iter_values()
            .map(|value| {
                let value = value?;
                if self.skip_nulls && value.is_null() {
                    return Ok(ScalarValue::Null);
                }
                (self.f)(&value)
            })
            .collect::<Result<Vec<_>>>()?;

        Column::try_from_scalars(input.name(), self.return_dtype, &values)
    }
}
