//! Applying functions to columns, optionally scoped to groups.
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glaredb_error::{DbError, Result, ResultExt};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, error, trace};

use crate::arrays::column::Column;
use crate::arrays::compute::cast::cast;
use crate::arrays::compute::concat::concat;
use crate::arrays::compute::interleave::interleave;
use crate::arrays::datatype::DataType;
use crate::arrays::frame::Frame;
use crate::config::UdfExecutionConfig;
use crate::functions::FunctionDescriptor;
use crate::partition::{GroupContext, GroupMode, GroupPartition, Partitioner};
use crate::validate::{ApplySemantics, LengthValidator};

/// Output of a single evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    /// One value per input row.
    Column(Column),
    /// One value per group, paired with the group keys.
    Aggregated { keys: Frame, column: Column },
}

impl EvaluationResult {
    pub fn column(&self) -> &Column {
        match self {
            Self::Column(column) => column,
            Self::Aggregated { column, .. } => column,
        }
    }

    pub fn into_column(self) -> Column {
        match self {
            Self::Column(column) => column,
            Self::Aggregated { column, .. } => column,
        }
    }

    /// Group keys for aggregated results.
    pub fn keys(&self) -> Option<&Frame> {
        match self {
            Self::Column(_) => None,
            Self::Aggregated { keys, .. } => Some(keys),
        }
    }

    pub fn num_rows(&self) -> usize {
        self.column().len()
    }
}

/// Applies function descriptors to input columns.
///
/// Cheaply cloneable, clones share the worker pool.
#[derive(Clone)]
pub struct Evaluator {
    config: UdfExecutionConfig,
    /// Pool for concurrent group invocation. None if groups are always
    /// evaluated on the calling thread.
    pool: Option<Arc<ThreadPool>>,
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .field(
                "num_threads",
                &self.pool.as_ref().map(|p| p.current_num_threads()),
            )
            .finish()
    }
}

impl Evaluator {
    pub fn try_new(config: UdfExecutionConfig) -> Result<Self> {
        let pool = if config.parallel_groups {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.worker_threads())
                .thread_name(|idx| format!("glaredb-udf-{idx}"))
                .build()
                .context("Failed to build thread pool")?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Evaluator { config, pool })
    }

    pub fn config(&self) -> &UdfExecutionConfig {
        &self.config
    }

    /// Partition a frame into a group context using this evaluator's
    /// configured group ordering.
    pub fn group_context(
        &self,
        frame: &Frame,
        group_by: &[&str],
        mode: GroupMode,
    ) -> Result<GroupContext> {
        let partitioner = Partitioner::new(self.config.sort_groups);
        GroupContext::try_new(frame, group_by, mode, &partitioner)
    }

    /// Evaluate a function against some input columns.
    ///
    /// Without a group context the function is invoked once over the full
    /// columns. With a group context the function is invoked once per
    /// partition and the outputs are assembled according to the context's
    /// mode.
    ///
    /// Any failure aborts the whole evaluation, no partial output is
    /// returned.
    pub fn evaluate(
        &self,
        descriptor: &FunctionDescriptor,
        inputs: &[Column],
        context: Option<&GroupContext>,
    ) -> Result<EvaluationResult> {
        let result = self.evaluate_inner(descriptor, inputs, context);
        if let Err(e) = &result {
            error!(
                function = descriptor.name(),
                kind = %e.kind(),
                partition_idx = ?e.partition_idx(),
                error = %e.get_msg(),
                "function evaluation failed"
            );
        }
        result
    }

    fn evaluate_inner(
        &self,
        descriptor: &FunctionDescriptor,
        inputs: &[Column],
        context: Option<&GroupContext>,
    ) -> Result<EvaluationResult> {
        let input_len = check_input_lengths(inputs)?;
        let name = inputs[0].name().to_string();
        let semantics = resolve_semantics(descriptor, context);

        debug!(
            function = descriptor.name(),
            %semantics,
            input_len,
            num_groups = ?context.map(|c| c.num_partitions()),
            "evaluating function"
        );

        match context {
            None => {
                let output = self.invoke(descriptor, inputs)?;
                let output = LengthValidator::validate(output, semantics, input_len)?;
                let output = conform_datatype(output, descriptor.declared_return_dtype())?;
                Ok(EvaluationResult::Column(output.with_name(name)))
            }
            Some(context) => {
                if context.num_rows() != input_len {
                    return Err(DbError::invalid_input(format!(
                        "Input length {input_len} does not match the length of the grouped frame {}",
                        context.num_rows()
                    )));
                }
                self.grouped_apply(descriptor, inputs, context, semantics, name)
            }
        }
    }

    fn grouped_apply(
        &self,
        descriptor: &FunctionDescriptor,
        inputs: &[Column],
        context: &GroupContext,
        semantics: ApplySemantics,
        name: String,
    ) -> Result<EvaluationResult> {
        // Native primitives declared elementwise don't depend on grouping, a
        // single pass over the full column gives the same result.
        if context.mode() == GroupMode::Window
            && semantics == ApplySemantics::Elementwise
            && descriptor.is_elementwise()
            && self.native_dispatch(descriptor, inputs)
        {
            trace!("applying native primitive over ungrouped column");
            let output = self.invoke(descriptor, inputs)?;
            let output = LengthValidator::validate(output, semantics, context.num_rows())?;
            let output = conform_datatype(output, descriptor.declared_return_dtype())?;
            return Ok(EvaluationResult::Column(output.with_name(name)));
        }

        let partitions = context.partitions();
        let apply = |idx: usize| {
            self.apply_partition(descriptor, inputs, &partitions[idx], semantics)
                .map_err(|e| e.with_partition_idx(idx))
        };

        let outputs = match &self.pool {
            Some(pool)
                if descriptor.thread_safe()
                    && partitions.len() >= self.config.min_groups_for_parallel =>
            {
                run_parallel(pool, partitions.len(), apply)?
            }
            _ => (0..partitions.len())
                .map(apply)
                .collect::<Result<Vec<_>>>()?,
        };

        let (outputs, datatype) =
            conform_group_datatypes(outputs, descriptor.declared_return_dtype())?;

        match context.mode() {
            GroupMode::Aggregate => {
                let column = if outputs.is_empty() {
                    Column::new_typed_null(name, datatype, 0)
                } else {
                    let refs: Vec<_> = outputs.iter().collect();
                    concat(&refs)?.with_name(name)
                };
                Ok(EvaluationResult::Aggregated {
                    keys: context.key_frame()?,
                    column,
                })
            }
            GroupMode::Window => {
                let column = assemble_rows(&outputs, partitions, context.num_rows(), datatype)?;
                Ok(EvaluationResult::Column(column.with_name(name)))
            }
        }
    }

    /// Invoke the function for a single partition and validate the output.
    fn apply_partition(
        &self,
        descriptor: &FunctionDescriptor,
        inputs: &[Column],
        partition: &GroupPartition,
        semantics: ApplySemantics,
    ) -> Result<Column> {
        let group_inputs = inputs
            .iter()
            .map(|col| col.select(partition.rows()))
            .collect::<Result<Vec<_>>>()?;

        let output = self.invoke(descriptor, &group_inputs)?;
        LengthValidator::validate(output, semantics, partition.row_count())
    }

    /// Check if the descriptor can be dispatched to a native kernel for these
    /// inputs.
    fn native_dispatch(&self, descriptor: &FunctionDescriptor, inputs: &[Column]) -> bool {
        self.config.ufunc_fast_path && descriptor.ufunc().is_some() && inputs.len() == 1
    }

    /// Invoke a function, either through a native kernel or by calling the
    /// function itself.
    ///
    /// Primitives declared with a float return type produce that type on both
    /// paths.
    fn invoke(&self, descriptor: &FunctionDescriptor, inputs: &[Column]) -> Result<Column> {
        let output = self.invoke_function(descriptor, inputs)?;

        match (descriptor.ufunc(), descriptor.declared_return_dtype()) {
            (Some(_), Some(declared))
                if declared.is_float() && output.datatype() != declared =>
            {
                cast(&output, declared)
            }
            _ => Ok(output),
        }
    }

    fn invoke_function(&self, descriptor: &FunctionDescriptor, inputs: &[Column]) -> Result<Column> {
        if self.native_dispatch(descriptor, inputs) {
            if let Some(ufunc) = descriptor.ufunc() {
                trace!(%ufunc, "dispatching to native kernel");
                return ufunc.execute(&inputs[0]);
            }
        }

        // Function is outside of the engine's control, hand it owned columns.
        let inputs = inputs
            .iter()
            .map(|col| col.materialize())
            .collect::<Result<Vec<_>>>()?;

        let function = descriptor.function();
        match panic::catch_unwind(AssertUnwindSafe(|| function.invoke(&inputs))) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DbError::invocation(format!(
                "Function '{}' failed: {}",
                function.name(),
                e.get_msg()
            ))
            .with_source_error(e)),
            Err(panic) => Err(DbError::invocation(format!(
                "Function '{}' panicked: {}",
                function.name(),
                format_panic(panic.as_ref())
            ))),
        }
    }
}

/// Determine the length rule for an evaluation.
pub fn resolve_semantics(
    descriptor: &FunctionDescriptor,
    context: Option<&GroupContext>,
) -> ApplySemantics {
    match context.map(|c| c.mode()) {
        Some(GroupMode::Aggregate) => ApplySemantics::Reducing,
        Some(GroupMode::Window) if descriptor.broadcast() => ApplySemantics::Broadcast,
        Some(GroupMode::Window) => ApplySemantics::Elementwise,
        None if descriptor.returns_scalar() => ApplySemantics::Reducing,
        None if descriptor.broadcast() => ApplySemantics::Broadcast,
        None => ApplySemantics::Elementwise,
    }
}

/// Check that there's at least one input and that all inputs have the same
/// length, returning that length.
fn check_input_lengths(inputs: &[Column]) -> Result<usize> {
    let len = match inputs.first() {
        Some(col) => col.len(),
        None => {
            return Err(DbError::invalid_input(
                "At least one input column is required",
            ));
        }
    };

    if let Some(col) = inputs.iter().find(|col| col.len() != len) {
        return Err(DbError::invalid_input(format!(
            "Input column '{}' has length {}, expected length {len}",
            col.name(),
            col.len()
        )));
    }

    Ok(len)
}

/// Check the output type against the declared type.
///
/// Untyped null outputs are cast to the declared type.
fn conform_datatype(output: Column, declared: Option<DataType>) -> Result<Column> {
    match declared {
        None => Ok(output),
        Some(declared) if output.datatype() == declared => Ok(output),
        Some(declared) if output.datatype() == DataType::Null => cast(&output, declared),
        Some(declared) => Err(DbError::dtype_mismatch(format!(
            "Function returned {} but the declared return type is {declared}",
            output.datatype()
        ))),
    }
}

/// Ensure every group produced the same type.
///
/// The target type is the declared type if given, otherwise the type of the
/// first group with a typed output.
fn conform_group_datatypes(
    outputs: Vec<Column>,
    declared: Option<DataType>,
) -> Result<(Vec<Column>, DataType)> {
    let target = declared.unwrap_or_else(|| {
        outputs
            .iter()
            .map(|col| col.datatype())
            .find(|datatype| *datatype != DataType::Null)
            .unwrap_or(DataType::Null)
    });

    let outputs = outputs
        .into_iter()
        .enumerate()
        .map(|(idx, col)| match col.datatype() {
            datatype if datatype == target => Ok(col),
            DataType::Null => cast(&col, target),
            datatype => {
                let expected = if declared.is_some() {
                    format!("the declared return type {target}")
                } else {
                    format!("{target} returned by earlier groups")
                };
                Err(DbError::dtype_mismatch(format!(
                    "Function returned {datatype} for group {idx}, expected {expected}"
                ))
                .with_partition_idx(idx))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((outputs, target))
}

/// Scatter per-group outputs back to the original row positions.
fn assemble_rows(
    outputs: &[Column],
    partitions: &[GroupPartition],
    num_rows: usize,
    datatype: DataType,
) -> Result<Column> {
    if outputs.is_empty() {
        return Ok(Column::new_typed_null("", datatype, num_rows));
    }

    let mut indices = vec![(0, 0); num_rows];
    for (partition_idx, partition) in partitions.iter().enumerate() {
        for (offset, row) in partition.rows().iter_locations().enumerate() {
            indices[row] = (partition_idx, offset);
        }
    }

    let refs: Vec<_> = outputs.iter().collect();
    interleave(&refs, &indices)
}

/// Run `f` for every index in [0, n) on the pool.
///
/// Results are stored by index so the output order doesn't depend on
/// completion order. Once an index fails, higher indices that haven't started
/// are skipped. The error returned is the one with the lowest index.
fn run_parallel<F>(pool: &ThreadPool, n: usize, f: F) -> Result<Vec<Column>>
where
    F: Fn(usize) -> Result<Column> + Sync,
{
    let slots: Vec<Mutex<Option<Result<Column>>>> = (0..n).map(|_| Mutex::new(None)).collect();
    let first_failure = AtomicUsize::new(usize::MAX);

    pool.install(|| {
        (0..n).into_par_iter().for_each(|idx| {
            if idx > first_failure.load(Ordering::Acquire) {
                return;
            }
            let result = f(idx);
            if result.is_err() {
                first_failure.fetch_min(idx, Ordering::AcqRel);
            }
            *slots[idx].lock() = Some(result);
        })
    });

    let mut outputs = Vec::with_capacity(n);
    for (idx, slot) in slots.into_iter().enumerate() {
        match slot.into_inner() {
            Some(Ok(output)) => outputs.push(output),
            Some(Err(e)) => return Err(e),
            // Skipped slots always come after a failed slot.
            None => {
                return Err(DbError::new(format!(
                    "Missing output for partition {idx}"
                )));
            }
        }
    }

    Ok(outputs)
}

/// Formats a panic payload from a function invocation.
fn format_panic(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "UNKNOWN".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use glaredb_error::ErrorKind;

    use super::*;
    use crate::arrays::scalar::ScalarValue;
    use crate::functions::batch::BatchFunction;
    use crate::functions::ufunc::{Ufunc, UfuncFunction};

    fn sum_i64(inputs: &[Column]) -> Result<Column> {
        let mut sum = 0;
        for v in inputs[0].iter_values() {
            if let Some(v) = v?.try_as_i64() {
                sum += v;
            }
        }
        Ok(Column::new(inputs[0].name(), vec![sum]))
    }

    fn double_i64(inputs: &[Column]) -> Result<Column> {
        let values = inputs[0]
            .iter_values()
            .map(|v| Ok(v?.try_as_i64().map(|v| v * 2)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Column::from_options(inputs[0].name(), values))
    }

    fn frame() -> Frame {
        Frame::try_new([
            Column::new("id", vec![0_i64, 0, 0, 1, 1, 1]),
            Column::new("t", vec![2_i64, 4, 5, 10, 11, 14]),
            Column::new("y", vec![0_i64, 1, 1, 2, 3, 4]),
        ])
        .unwrap()
    }

    fn evaluators() -> Vec<Evaluator> {
        vec![
            Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap(),
            Evaluator::try_new(UdfExecutionConfig {
                num_threads: Some(4),
                ..Default::default()
            })
            .unwrap(),
        ]
    }

    #[test]
    fn ungrouped_elementwise() {
        for evaluator in evaluators() {
            let desc = FunctionDescriptor::new(BatchFunction::new("double", double_i64))
                .with_elementwise(true);
            let out = evaluator
                .evaluate(&desc, &[Column::new("a", vec![1_i64, 2, 3])], None)
                .unwrap();
            assert_eq!(
                EvaluationResult::Column(Column::new("a", vec![2_i64, 4, 6])),
                out
            );
        }
    }

    #[test]
    fn ungrouped_reduction_rejected() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("sum", sum_i64));
        let input = frame().column("t").unwrap().clone();

        let err = evaluator.evaluate(&desc, &[input], None).unwrap_err();
        assert_eq!(ErrorKind::LengthMismatch, err.kind());
        assert_eq!(None, err.partition_idx());
    }

    #[test]
    fn ungrouped_returns_scalar() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc =
            FunctionDescriptor::new(BatchFunction::new("sum", sum_i64)).with_returns_scalar(true);
        let input = frame().column("t").unwrap().clone();

        let out = evaluator.evaluate(&desc, &[input], None).unwrap();
        assert_eq!(Column::new("t", vec![46_i64]), out.into_column());
    }

    #[test]
    fn ungrouped_broadcast() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("sum", sum_i64)).with_broadcast(true);
        let input = Column::new("a", vec![1_i64, 2, 3]);

        let out = evaluator.evaluate(&desc, &[input], None).unwrap();
        assert_eq!(Column::new("a", vec![6_i64, 6, 6]), out.into_column());
    }

    #[test]
    fn grouped_aggregate() {
        for evaluator in evaluators() {
            let frame = frame();
            let ctx = evaluator
                .group_context(&frame, &["id"], GroupMode::Aggregate)
                .unwrap();
            let desc = FunctionDescriptor::new(BatchFunction::new("sum", sum_i64));

            let out = evaluator
                .evaluate(&desc, &[frame.column("y").unwrap().clone()], Some(&ctx))
                .unwrap();

            assert_eq!(Column::new("y", vec![2_i64, 9]), *out.column());
            assert_eq!(
                &Column::new("id", vec![0_i64, 1]),
                out.keys().unwrap().column("id").unwrap()
            );
        }
    }

    #[test]
    fn grouped_aggregate_multi_row_output_rejected() {
        for evaluator in evaluators() {
            let frame = frame();
            let ctx = evaluator
                .group_context(&frame, &["id"], GroupMode::Aggregate)
                .unwrap();
            let desc = FunctionDescriptor::new(BatchFunction::new("double", double_i64));

            let err = evaluator
                .evaluate(&desc, &[frame.column("t").unwrap().clone()], Some(&ctx))
                .unwrap_err();
            assert_eq!(ErrorKind::LengthMismatch, err.kind());
            assert_eq!(Some(0), err.partition_idx());
            assert!(err.get_msg().contains("(3)"));
        }
    }

    #[test]
    fn grouped_window_restores_row_order() {
        for evaluator in evaluators() {
            let frame = Frame::try_new([
                Column::new("g", vec![1_i64, 2, 1, 2]),
                Column::new("x", vec![1_i64, 2, 3, 4]),
            ])
            .unwrap();
            let ctx = evaluator
                .group_context(&frame, &["g"], GroupMode::Window)
                .unwrap();

            let desc = FunctionDescriptor::new(BatchFunction::new("double", double_i64))
                .with_elementwise(true);
            let out = evaluator
                .evaluate(&desc, &[frame.column("x").unwrap().clone()], Some(&ctx))
                .unwrap();
            assert_eq!(
                EvaluationResult::Column(Column::new("x", vec![2_i64, 4, 6, 8])),
                out
            );
        }
    }

    #[test]
    fn grouped_window_singleton_rejected() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let frame = Frame::try_new([
            Column::new("x", vec![1_i64, 2, 3, 4]),
            Column::new("group", vec![1_i64, 2, 1, 2]),
        ])
        .unwrap();
        let ctx = evaluator
            .group_context(&frame, &["group"], GroupMode::Window)
            .unwrap();

        let desc =
            FunctionDescriptor::new(BatchFunction::new("sum", sum_i64)).with_elementwise(true);
        let err = evaluator
            .evaluate(&desc, &[frame.column("x").unwrap().clone()], Some(&ctx))
            .unwrap_err();
        assert_eq!(ErrorKind::LengthMismatch, err.kind());
        assert_eq!(
            "output length of `map` (1) must be equal to the input length (2); consider using `apply` instead",
            err.get_msg()
        );
    }

    #[test]
    fn grouped_window_broadcast() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::default()).unwrap();
        let frame = Frame::try_new([
            Column::new("g", vec!["a".to_string(), "b".into(), "a".into()]),
            Column::new("x", vec![1_i64, 2, 3]),
        ])
        .unwrap();
        let ctx = evaluator
            .group_context(&frame, &["g"], GroupMode::Window)
            .unwrap();

        let desc = FunctionDescriptor::new(BatchFunction::new("sum", sum_i64)).with_broadcast(true);
        let out = evaluator
            .evaluate(&desc, &[frame.column("x").unwrap().clone()], Some(&ctx))
            .unwrap();
        assert_eq!(Column::new("x", vec![4_i64, 2, 4]), out.into_column());
    }

    #[test]
    fn first_failure_by_partition_index() {
        for evaluator in evaluators() {
            let frame = Frame::try_new([Column::new("g", (0..32_i64).collect::<Vec<_>>())]).unwrap();
            let ctx = evaluator
                .group_context(&frame, &["g"], GroupMode::Aggregate)
                .unwrap();

            // Groups 5 and 20 fail, 5 must always be reported.
            let desc = FunctionDescriptor::new(BatchFunction::new("fail", |inputs: &[Column]| {
                let v = inputs[0].value(0)?;
                if v == ScalarValue::Int64(5) || v == ScalarValue::Int64(20) {
                    return Err(DbError::new(format!("bad value {v}")));
                }
                Ok(inputs[0].clone())
            }));

            for _ in 0..10 {
                let err = evaluator
                    .evaluate(&desc, &[frame.column("g").unwrap().clone()], Some(&ctx))
                    .unwrap_err();
                assert_eq!(ErrorKind::InvocationError, err.kind());
                assert_eq!(Some(5), err.partition_idx());
                assert!(err.get_msg().contains("bad value 5"));
            }
        }
    }

    #[test]
    fn panics_become_invocation_errors() {
        for evaluator in evaluators() {
            let desc = FunctionDescriptor::new(BatchFunction::new(
                "panics",
                |_: &[Column]| -> Result<Column> { panic!("oh no") },
            ));
            let err = evaluator
                .evaluate(&desc, &[Column::new("a", vec![1_i64])], None)
                .unwrap_err();
            assert_eq!(ErrorKind::InvocationError, err.kind());
            assert!(err.get_msg().contains("oh no"));
        }
    }

    #[test]
    fn thread_unsafe_functions_run_on_caller() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig {
            num_threads: Some(4),
            ..Default::default()
        })
        .unwrap();
        let frame = Frame::try_new([Column::new("g", (0..16_i64).collect::<Vec<_>>())]).unwrap();
        let ctx = evaluator
            .group_context(&frame, &["g"], GroupMode::Aggregate)
            .unwrap();

        let caller = std::thread::current().id();
        let off_thread = Arc::new(AtomicBool::new(false));
        let off_thread_clone = off_thread.clone();
        let desc = FunctionDescriptor::new(BatchFunction::new("check", move |inputs: &[Column]| {
            if std::thread::current().id() != caller {
                off_thread_clone.store(true, Ordering::SeqCst);
            }
            Ok(inputs[0].clone())
        }))
        .with_thread_safe(false);

        evaluator
            .evaluate(&desc, &[frame.column("g").unwrap().clone()], Some(&ctx))
            .unwrap();
        assert!(!off_thread.load(Ordering::SeqCst));
    }

    #[test]
    fn declared_dtype_mismatch() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("double", double_i64))
            .with_return_dtype(DataType::Float64);
        let err = evaluator
            .evaluate(&desc, &[Column::new("a", vec![1_i64])], None)
            .unwrap_err();
        assert_eq!(ErrorKind::DtypeMismatch, err.kind());
    }

    #[test]
    fn declared_dtype_types_null_output() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("nulls", |inputs: &[Column]| {
            Ok(Column::new_typed_null("out", DataType::Null, inputs[0].len()))
        }))
        .with_return_dtype(DataType::Utf8);

        let out = evaluator
            .evaluate(&desc, &[Column::new("a", vec![1_i64, 2])], None)
            .unwrap()
            .into_column();
        assert_eq!(DataType::Utf8, out.datatype());
        assert_eq!(2, out.null_count());
        assert_eq!("a", out.name());
    }

    #[test]
    fn inconsistent_group_dtypes() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let frame = frame();
        let ctx = evaluator
            .group_context(&frame, &["id"], GroupMode::Aggregate)
            .unwrap();

        let desc = FunctionDescriptor::new(BatchFunction::new("drift", |inputs: &[Column]| {
            match inputs[0].value(0)? {
                ScalarValue::Int64(0) => Ok(Column::new("out", vec![1_i64])),
                _ => Ok(Column::new("out", vec![1.0_f64])),
            }
        }));
        let err = evaluator
            .evaluate(&desc, &[frame.column("id").unwrap().clone()], Some(&ctx))
            .unwrap_err();
        assert_eq!(ErrorKind::DtypeMismatch, err.kind());
        assert_eq!(Some(1), err.partition_idx());
    }

    #[test]
    fn null_group_outputs_promoted() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let frame = frame();
        let ctx = evaluator
            .group_context(&frame, &["id"], GroupMode::Aggregate)
            .unwrap();

        let desc = FunctionDescriptor::new(BatchFunction::new("maybe", |inputs: &[Column]| {
            match inputs[0].value(0)? {
                ScalarValue::Int64(0) => Column::from_scalar("out", ScalarValue::Null),
                _ => Ok(Column::new("out", vec![7_i64])),
            }
        }));
        let out = evaluator
            .evaluate(&desc, &[frame.column("id").unwrap().clone()], Some(&ctx))
            .unwrap()
            .into_column();
        assert_eq!(Column::from_options("id", [None, Some(7_i64)]), out);
    }

    #[test]
    fn ragged_inputs_rejected() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("double", double_i64));
        let err = evaluator
            .evaluate(
                &desc,
                &[
                    Column::new("a", vec![1_i64, 2]),
                    Column::new("b", vec![1_i64]),
                ],
                None,
            )
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());

        let err = evaluator.evaluate(&desc, &[], None).unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
    }

    #[test]
    fn duplicate_group_keys_rejected_before_invocation() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let err = evaluator
            .group_context(&frame(), &["id", "id"], GroupMode::Aggregate)
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
    }

    #[test]
    fn context_length_must_match() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let frame = frame();
        let ctx = evaluator
            .group_context(&frame, &["id"], GroupMode::Aggregate)
            .unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("sum", sum_i64));

        let err = evaluator
            .evaluate(&desc, &[Column::new("a", vec![1_i64])], Some(&ctx))
            .unwrap_err();
        assert_eq!(ErrorKind::InvalidInput, err.kind());
    }

    #[test]
    fn empty_groups() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let frame = Frame::try_new([
            Column::new("g", Vec::<i64>::new()),
            Column::new("x", Vec::<i64>::new()),
        ])
        .unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("sum", sum_i64));

        for mode in [GroupMode::Aggregate, GroupMode::Window] {
            let ctx = evaluator.group_context(&frame, &["g"], mode).unwrap();
            let out = evaluator
                .evaluate(&desc, &[frame.column("x").unwrap().clone()], Some(&ctx))
                .unwrap();
            assert_eq!(0, out.num_rows());
        }
    }

    #[test]
    fn grouped_native_primitive_matches_generic() {
        let frame = Frame::try_new([
            Column::new("id", vec!["a".to_string(), "a".into(), "b".into(), "b".into()]),
            Column::from_options("values", [Some(0.1_f64), None, Some(-0.1), Some(-0.1)]),
        ])
        .unwrap();
        let desc = FunctionDescriptor::new(UfuncFunction::new(Ufunc::Log1p)).with_elementwise(true);

        let native = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let generic = Evaluator::try_new(UdfExecutionConfig {
            ufunc_fast_path: false,
            ..UdfExecutionConfig::sequential()
        })
        .unwrap();

        let ctx = native.group_context(&frame, &["id"], GroupMode::Window).unwrap();
        let input = [frame.column("values").unwrap().clone()];

        let a = native.evaluate(&desc, &input, Some(&ctx)).unwrap();
        let b = generic.evaluate(&desc, &input, Some(&ctx)).unwrap();
        assert_eq!(a, b);
        assert_eq!(ScalarValue::Null, a.column().value(1).unwrap());
    }

    #[test]
    fn declared_float_overrides_primitive_output() {
        let native = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let generic = Evaluator::try_new(UdfExecutionConfig {
            ufunc_fast_path: false,
            ..UdfExecutionConfig::sequential()
        })
        .unwrap();
        let desc = FunctionDescriptor::new(UfuncFunction::new(Ufunc::Exp))
            .with_elementwise(true)
            .with_return_dtype(DataType::Float32);
        let input = [Column::from_options("v", [Some(1.1_f64), None, Some(2.2)])];

        let a = native.evaluate(&desc, &input, None).unwrap().into_column();
        let b = generic.evaluate(&desc, &input, None).unwrap().into_column();
        assert_eq!(DataType::Float32, a.datatype());
        assert_eq!(a, b);
        assert_eq!(
            ScalarValue::Float32(1.1_f64.exp() as f32),
            a.value(0).unwrap()
        );
        assert_eq!(ScalarValue::Null, a.value(1).unwrap());

        let frame = Frame::try_new([
            Column::new("g", vec![1_i64, 2, 1]),
            Column::new("v", vec![1_i64, 2, 3]),
        ])
        .unwrap();
        let ctx = native.group_context(&frame, &["g"], GroupMode::Window).unwrap();
        let input = [frame.column("v").unwrap().clone()];
        let a = native.evaluate(&desc, &input, Some(&ctx)).unwrap();
        let b = generic.evaluate(&desc, &input, Some(&ctx)).unwrap();
        assert_eq!(DataType::Float32, a.column().datatype());
        assert_eq!(a, b);
    }

    #[test]
    fn declared_float_ignored_for_user_functions() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let desc = FunctionDescriptor::new(BatchFunction::new("double", double_i64))
            .with_return_dtype(DataType::Float32);
        let err = evaluator
            .evaluate(&desc, &[Column::new("a", vec![1_i64])], None)
            .unwrap_err();
        assert_eq!(ErrorKind::DtypeMismatch, err.kind());
    }

    #[test]
    fn primitive_applied_per_group_without_elementwise_flag() {
        let evaluator = Evaluator::try_new(UdfExecutionConfig::sequential()).unwrap();
        let frame = Frame::try_new([
            Column::new("g", vec![1_i64, 2]),
            Column::new("s", vec!["a".to_string(), "b".into()]),
        ])
        .unwrap();
        let ctx = evaluator
            .group_context(&frame, &["g"], GroupMode::Window)
            .unwrap();
        let input = [frame.column("s").unwrap().clone()];

        // Whole column dispatch fails before any grouping is involved.
        let desc = FunctionDescriptor::new(UfuncFunction::new(Ufunc::Sqrt)).with_elementwise(true);
        let err = evaluator.evaluate(&desc, &input, Some(&ctx)).unwrap_err();
        assert_eq!(None, err.partition_idx());

        let desc = FunctionDescriptor::new(UfuncFunction::new(Ufunc::Sqrt));
        let err = evaluator.evaluate(&desc, &input, Some(&ctx)).unwrap_err();
        assert_eq!(Some(0), err.partition_idx());
    }
}
