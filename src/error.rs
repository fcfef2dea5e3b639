use thiserror::Error;

/// Failures that callers are expected to tell apart from plain I/O trouble.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PivotError {
    #[error("Missing required columns in {sheet}: {}", .columns.join(", "))]
    MissingColumns { sheet: String, columns: Vec<String> },
}
