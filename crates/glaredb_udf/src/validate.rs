use std::fmt;

use glaredb_error::{DbError, Result};

use crate::arrays::column::Column;

/// Length contract a function output must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplySemantics {
    /// Output of length 1 is repeated to the input length. Output with the
    /// input length is accepted as-is.
    Broadcast,
    /// Output length must equal the input length.
    Elementwise,
    /// Output length must be 1.
    Reducing,
}

impl fmt::Display for ApplySemantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Broadcast => write!(f, "broadcast"),
            Self::Elementwise => write!(f, "elementwise"),
            Self::Reducing => write!(f, "reducing"),
        }
    }
}

/// Checks function output lengths against input lengths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthValidator;

impl LengthValidator {
    /// Validate the output of a single invocation.
    ///
    /// A single value output over a larger input is never broadcast unless
    /// the semantics are `Broadcast`.
    pub fn validate(output: Column, semantics: ApplySemantics, input_len: usize) -> Result<Column> {
        let output_len = output.len();
        match semantics {
            ApplySemantics::Elementwise if output_len == input_len => Ok(output),
            ApplySemantics::Reducing if output_len == 1 => Ok(output),
            ApplySemantics::Broadcast if output_len == input_len => Ok(output),
            ApplySemantics::Broadcast if output_len == 1 => output.broadcast(input_len),
            ApplySemantics::Elementwise | ApplySemantics::Broadcast => Err(
                DbError::length_mismatch(format!(
                    "output length of `map` ({output_len}) must be equal to the input length ({input_len}); consider using `apply` instead"
                ))
                .with_field("semantics", semantics),
            ),
            ApplySemantics::Reducing => Err(DbError::length_mismatch(format!(
                "output length of `map` ({output_len}) must be equal to 1 when aggregating over the input length ({input_len}); consider using `apply` instead"
            ))
            .with_field("semantics", semantics)),
        }
    }
}
