//! Error taxonomy for column resolution and expression evaluation.
//!
//! Every variant is fatal to the invocation. Command handlers wrap these in
//! `anyhow` with the file or descriptor they were working on, so callers that
//! care about the exact failure can still `downcast_ref::<ThreshError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThreshError {
    #[error("Invalid alias '{0}': aliases must be a single ASCII letter")]
    InvalidAlias(String),

    #[error("Alias '{alias}' conflicts with {with}")]
    AliasConflict { alias: char, with: String },

    #[error("Ambiguous column '{name}': {detail}")]
    AmbiguousColumn { name: String, detail: String },

    #[error("Alias/column not found: '{0}'")]
    UnresolvedColumn(String),

    #[error("Unknown identifier '{name}' in expression '{expression}'")]
    UnknownIdentifier { name: String, expression: String },

    #[error("Error while evaluating '{expression}': {message}")]
    EvaluationError { expression: String, message: String },

    #[error("Column '{name}' has {actual} row(s) but the output table has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error(
        "Column '{name}' from {source_label} has {actual} row(s) but the output table has {expected}"
    )]
    RowCountMismatch {
        name: String,
        source_label: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid descriptor '{descriptor}': {reason}")]
    InvalidDescriptor { descriptor: String, reason: String },

    #[error("Failed to remove '{0}': not found in the output")]
    RemoveMissing(String),

    #[error("Non-unique header '{0}'")]
    DuplicateHeader(String),

    #[error("Column '{name}' has {actual} row(s) while the table has {expected}")]
    RaggedColumns {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Burst output '{0}' would be written more than once")]
    BurstCollision(String),

    #[error("Column '{0}' cannot name a burst file: it contains a path separator or '..'")]
    BurstFileName(String),
}

impl ThreshError {
    pub(crate) fn evaluation(expression: &str, message: impl Into<String>) -> Self {
        ThreshError::EvaluationError {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}
