//! Per-file error taxonomy.
//!
//! Every variant is scoped to one input file: the runner records it and moves
//! on to the next file.

use thiserror::Error;

/// Reasons a single device file contributes nothing to the run.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("missing mandatory fields {missing:?} (found fields: {found:?})")]
    MissingField {
        missing: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("all '{field}' values are missing")]
    AllValuesMissing { field: &'static str },

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error("could not identify busiest bin: {reason}")]
    Selection { reason: String },
}

/// Unexpected failures while reading or normalizing a file.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid number {value:?} in column '{column}' at row {row}")]
    InvalidNumber {
        column: &'static str,
        row: usize,
        value: String,
    },
}

impl FileError {
    /// Short machine-friendly label used in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FileError::MissingField { .. } => "missing_field",
            FileError::AllValuesMissing { .. } => "all_values_missing",
            FileError::Processing(_) => "processing",
            FileError::Selection { .. } => "selection",
        }
    }
}
