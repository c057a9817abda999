pub mod batch;
pub mod element;
pub mod ufunc;

use std::fmt::Debug;
use std::sync::Arc;

use glaredb_error::Result;
use ufunc::{Ufunc, UfuncRecognizer};

use crate::arrays::column::Column;
use crate::arrays::datatype::DataType;

/// An opaque, caller supplied function.
///
/// The engine never inspects the function beyond the metadata exposed here.
/// Output shape and type are checked after invocation.
pub trait UdfFunction: Debug + Sync + Send {
    /// Name of the function, used in errors and logs.
    fn name(&self) -> &str;

    /// Invoke the function on some number of input columns.
    ///
    /// All inputs have the same length. Inputs never carry a selection.
    fn invoke(&self, inputs: &[Column]) -> Result<Column>;

    /// Metadata identifying this function as a vectorized primitive with a
    /// native implementation.
    fn ufunc(&self) -> Option<Ufunc> {
        None
    }
}

/// How a descriptor's function gets dispatched.
///
/// Resolved once when the descriptor is constructed.
#[derive(Debug, Clone)]
pub enum FunctionKind {
    /// Arbitrary function, always invoked through the generic path.
    UserFunction(Arc<dyn UdfFunction>),
    /// A known primitive. The function is kept for when native dispatch is
    /// disabled.
    RecognizedPrimitive {
        ufunc: Ufunc,
        function: Arc<dyn UdfFunction>,
    },
}

/// A function along with the behavior the caller declared for it.
///
/// Constructed once per expression node and reused for every evaluation of
/// that node.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    kind: FunctionKind,
    /// Caller's contract that output length equals input length.
    ///
    /// Output lengths are always validated regardless. Only allows a
    /// recognized primitive under a window context to be applied once over
    /// the whole column instead of per group.
    is_elementwise: bool,
    /// Caller's contract that the function reduces its input to a single
    /// value outside of a grouped context.
    returns_scalar: bool,
    /// Allow single value outputs to be broadcast to the input length.
    broadcast: bool,
    declared_return_dtype: Option<DataType>,
    /// If the function may be invoked concurrently from multiple threads.
    thread_safe: bool,
}

impl FunctionDescriptor {
    pub fn new(function: impl UdfFunction + 'static) -> Self {
        Self::from_arc(Arc::new(function))
    }

    pub fn from_arc(function: Arc<dyn UdfFunction>) -> Self {
        let kind = match UfuncRecognizer::recognize(function.as_ref()) {
            Some(ufunc) => FunctionKind::RecognizedPrimitive { ufunc, function },
            None => FunctionKind::UserFunction(function),
        };

        FunctionDescriptor {
            kind,
            is_elementwise: false,
            returns_scalar: false,
            broadcast: false,
            declared_return_dtype: None,
            thread_safe: true,
        }
    }

    pub fn with_elementwise(mut self, is_elementwise: bool) -> Self {
        self.is_elementwise = is_elementwise;
        self
    }

    pub fn with_returns_scalar(mut self, returns_scalar: bool) -> Self {
        self.returns_scalar = returns_scalar;
        self
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    pub fn with_return_dtype(mut self, datatype: DataType) -> Self {
        self.declared_return_dtype = Some(datatype);
        self
    }

    pub fn with_thread_safe(mut self, thread_safe: bool) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    pub fn kind(&self) -> &FunctionKind {
        &self.kind
    }

    pub fn function(&self) -> &Arc<dyn UdfFunction> {
        match &self.kind {
            FunctionKind::UserFunction(function) => function,
            FunctionKind::RecognizedPrimitive { function, .. } => function,
        }
    }

    pub fn name(&self) -> &str {
        self.function().name()
    }

    /// The recognized primitive, if any.
    pub fn ufunc(&self) -> Option<Ufunc> {
        match &self.kind {
            FunctionKind::RecognizedPrimitive { ufunc, .. } => Some(*ufunc),
            FunctionKind::UserFunction(_) => None,
        }
    }

    pub fn is_elementwise(&self) -> bool {
        self.is_elementwise
    }

    pub fn returns_scalar(&self) -> bool {
        self.returns_scalar
    }

    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    pub fn declared_return_dtype(&self) -> Option<DataType> {
        self.declared_return_dtype
    }

    pub fn thread_safe(&self) -> bool {
        self.thread_safe
    }
}
