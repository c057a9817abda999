//! Entry points for applying functions to columns.
use glaredb_error::Result;
use tracing::trace;

use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;
use crate::arrays::frame::Frame;
use crate::arrays::scalar::ScalarValue;
use crate::evaluator::{EvaluationResult, Evaluator};
use crate::functions::FunctionDescriptor;
use crate::functions::element::ElementFunction;
use crate::partition::GroupContext;

/// Apply a function to whole columns at a time.
pub fn map_batches(
    evaluator: &Evaluator,
    descriptor: &FunctionDescriptor,
    inputs: &[Column],
    context: Option<&GroupContext>,
) -> Result<EvaluationResult> {
    evaluator.evaluate(descriptor, inputs, context)
}

/// Apply a function to each value of a column.
///
/// `return_dtype` takes precedence over a return type set on the function.
pub fn map_elements<F>(
    evaluator: &Evaluator,
    function: ElementFunction<F>,
    input: &Column,
    context: Option<&GroupContext>,
    return_dtype: Option<DataType>,
) -> Result<EvaluationResult>
where
    F: Fn(&ScalarValue) -> Result<ScalarValue> + Send + Sync + 'static,
{
    let function = match return_dtype {
        Some(datatype) => function.with_return_dtype(datatype),
        None => function,
    };

    let mut descriptor = FunctionDescriptor::new(function).with_elementwise(true);
    if let Some(datatype) = return_dtype {
        descriptor = descriptor.with_return_dtype(datatype);
    }

    evaluator.evaluate(&descriptor, std::slice::from_ref(input), context)
}

/// Apply a function to every column of a frame independently.
///
/// All outputs must have the same length.
pub fn map_columns(
    evaluator: &Evaluator,
    descriptor: &FunctionDescriptor,
    frame: &Frame,
) -> Result<Frame> {
    trace!(num_columns = frame.num_columns(), "mapping frame columns");

    let columns = frame
        .columns()
        .iter()
        .map(|col| {
            evaluator
                .evaluate(descriptor, std::slice::from_ref(col), None)
                .map(EvaluationResult::into_column)
        })
        .collect::<Result<Vec<_>>>()?;

    Frame::try_new(columns)
}
