use std::fmt;

use glaredb_error::Result;

use super::UdfFunction;
use crate::arrays::column::Column;

/// A function operating on whole columns at a time.
pub struct BatchFunction<F> {
    name: String,
    f: F,
}

impl<F> BatchFunction<F>
where
    F: Fn(&[Column]) -> Result<Column> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        BatchFunction {
            name: name.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for BatchFunction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F> UdfFunction for BatchFunction<F>
where
    F: Fn(&[Column]) -> Result<Column> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, inputs: &[Column]) -> Result<Column> {
        (self.f)(inputs)
    }
}
