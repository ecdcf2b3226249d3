//! Error types for expression construction.

use thiserror::Error;

/// Result type alias for expression construction
pub type ExpressionResult<T> = Result<T, ExpressionError>;

/// Errors raised while building expression nodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// A literal failed its format validation.
    ///
    /// `kind` names the literal family (`identifier`, `date/time`), `value` is the
    /// rejected input as it was given.
    #[error("Malformed {kind} literal: `{value}`")]
    MalformedLiteral { kind: &'static str, value: String },
}

impl ExpressionError {
    pub(crate) fn malformed(kind: &'static str, value: impl Into<String>) -> Self {
        ExpressionError::MalformedLiteral {
            kind,
            value: value.into(),
        }
    }
}
