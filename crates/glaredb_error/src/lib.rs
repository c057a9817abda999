//! Error type shared across the engine.
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Coarse classification of an error.
///
/// Callers match on this to decide how to react to a failure. The message
/// carries the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Output length of a function did not satisfy the length rule for the
    /// active application semantics.
    LengthMismatch,
    /// An external function failed (returned an error or panicked).
    InvocationError,
    /// Produced data type disagrees with the declared or previously observed
    /// data type.
    DtypeMismatch,
    /// Caller provided inputs that violate a precondition.
    InvalidInput,
    /// Bug in the engine.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LengthMismatch => write!(f, "LengthMismatch"),
            Self::InvocationError => write!(f, "InvocationError"),
            Self::DtypeMismatch => write!(f, "DtypeMismatch"),
            Self::InvalidInput => write!(f, "InvalidInput"),
            Self::Internal => write!(f, "Internal"),
        }
    }
}

#[derive(Debug)]
pub struct DbError {
    inner: Box<DbErrorInner>,
}

#[derive(Debug)]
struct DbErrorInner {
    kind: ErrorKind,
    /// Message for the error.
    msg: String,
    /// Source of the error.
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Optional captured backtrace. Only captured when `RUST_BACKTRACE` is
    /// set.
    backtrace: Backtrace,
    /// Extra fields to display alongside the message.
    fields: Vec<(&'static str, String)>,
}

impl DbError {
    /// Create a new error with the `Internal` kind.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                kind,
                msg: msg.into(),
                source: None,
                backtrace: Backtrace::capture(),
                fields: Vec::new(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    pub fn length_mismatch(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::LengthMismatch, msg)
    }

    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvocationError, msg)
    }

    pub fn dtype_mismatch(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::DtypeMismatch, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidInput, msg)
    }

    /// Set the source of this error, replacing any existing source.
    pub fn with_source_error(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.inner.source = Some(Box::new(source));
        self
    }

    /// Attach an additional key/value field to the error.
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.inner.fields.push((key, value.to_string()));
        self
    }

    /// Attach the index of the group partition that produced this error.
    ///
    /// Only the innermost partition index is kept.
    pub fn with_partition_idx(self, idx: usize) -> Self {
        if self.partition_idx().is_some() {
            return self;
        }
        self.with_field(PARTITION_IDX_FIELD, idx)
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    /// Index of the group partition that failed, if the error happened while
    /// evaluating a single partition.
    pub fn partition_idx(&self) -> Option<usize> {
        self.inner
            .fields
            .iter()
            .find(|(key, _)| *key == PARTITION_IDX_FIELD)
            .and_then(|(_, v)| v.parse().ok())
    }

    pub fn get_backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

const PARTITION_IDX_FIELD: &str = "partition_idx";

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        for (key, value) in &self.inner.fields {
            write!(f, "\n  {key}: {value}")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }

        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

/// Extension trait for wrapping foreign errors with a message.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(f(), Box::new(e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_fields() {
        let err = DbError::length_mismatch("bad length").with_partition_idx(3);
        let s = err.to_string();
        assert!(s.starts_with("bad length"));
        assert!(s.contains("partition_idx: 3"));
        assert_eq!(Some(3), err.partition_idx());
        assert_eq!(ErrorKind::LengthMismatch, err.kind());
    }

    #[test]
    fn innermost_partition_idx_kept() {
        let err = DbError::invocation("boom")
            .with_partition_idx(1)
            .with_partition_idx(4);
        assert_eq!(Some(1), err.partition_idx());
    }

    #[test]
    fn kind_kept_with_source() {
        let inner = DbError::new("inner failure");
        let err = DbError::invocation("outer").with_source_error(inner);
        assert_eq!(ErrorKind::InvocationError, err.kind());
        assert!(err.to_string().contains("Error source: inner failure"));
    }

    #[test]
    fn context_wraps_source() {
        let res: std::result::Result<(), std::fmt::Error> = Err(std::fmt::Error);
        let err = res.context("formatting failed").unwrap_err();
        assert_eq!(ErrorKind::Internal, err.kind());
        assert!(err.source().is_some());
    }
}
