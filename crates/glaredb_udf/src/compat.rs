//! Deprecated entry points kept for compatibility.
//!
//! Each alias forwards to a current entry point and returns the result along
//! with a warning the caller may surface.
#![allow(deprecated)]

use std::fmt;

use glaredb_error::Result;
use tracing::warn;

use crate::api;
use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::functions::FunctionDescriptor;
use crate::functions::element::ElementFunction;
use crate::partition::GroupContext;

/// Signals use of a deprecated alias. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeprecationWarning {
    pub alias: &'static str,
    pub replacement: &'static str,
}

impl fmt::Display for DeprecationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}` is deprecated, use `{}` instead",
            self.alias, self.replacement
        )
    }
}

/// A value produced through a deprecated alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Deprecated<T> {
    pub value: T,
    pub warning: DeprecationWarning,
}

impl<T> Deprecated<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Warn about use of an alias, then run the forwarded call.
///
/// The warning is returned whether or not the call succeeds. Errors also
/// carry the alias as a field.
fn forward<T>(
    alias: &'static str,
    replacement: &'static str,
    call: impl FnOnce() -> Result<T>,
) -> Deprecated<Result<T>> {
    let warning = DeprecationWarning { alias, replacement };
    warn!(%warning, "deprecated alias used");

    let value = call().map_err(|e| e.with_field("deprecated_alias", alias));
    Deprecated { value, warning }
}

/// Apply a batch function to a single column.
#[deprecated(note = "use `map_batches` instead")]
pub fn map(
    evaluator: &Evaluator,
    descriptor: &FunctionDescriptor,
    input: &Column,
    context: Option<&GroupContext>,
) -> Deprecated<Result<EvaluationResult>> {
    forward("map", "map_batches", || {
        api::map_batches(evaluator, descriptor, std::slice::from_ref(input), context)
    })
}

/// Apply a batch function to several columns.
#[deprecated(note = "use `map_batches` instead")]
pub fn map_many(
    evaluator: &Evaluator,
    descriptor: &FunctionDescriptor,
    inputs: &[Column],
    context: Option<&GroupContext>,
) -> Deprecated<Result<EvaluationResult>> {
    forward("map_many", "map_batches", || {
        api::map_batches(evaluator, descriptor, inputs, context)
    })
}

/// Apply a function to each value of a column.
#[deprecated(note = "use `map_elements` instead")]
pub fn apply<F>(
    evaluator: &Evaluator,
    function: ElementFunction<F>,
    input: &Column,
    context: Option<&GroupContext>,
    return_dtype: Option<DataType>,
) -> Deprecated<Result<EvaluationResult>>
where
    F: Fn(&ScalarValue) -> Result<ScalarValue> + Send + Sync + 'static,
{
    forward("apply", "map_elements", || {
        api::map_elements(evaluator, function, input, context, return_dtype)
    })
}
