use std::time::Duration;

use thiserror::Error;

/// Faults raised while interpreting a snippet.
///
/// These never escape the sandbox facade: [`crate::Sandbox::run`] folds them
/// into a [`crate::Refusal`] so callers deal with one reporting surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("syntax error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0}")]
    Runtime(String),

    #[error("type error: expected {expected}, got {got}")]
    Type { expected: String, got: String },

    #[error("name '{0}' is not defined")]
    NameError(String),

    #[error("not supported in the sandbox: {0}")]
    Unsupported(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("step budget of {0} exhausted")]
    StepLimitExceeded(u64),

    #[error("time limit of {0:?} exceeded")]
    TimeLimitExceeded(Duration),

    #[error("recursion deeper than {0} frames")]
    RecursionLimitExceeded(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
