//! Where per-file skips and run notices are reported.
//!
//! The runner never logs skip decisions directly; it hands them to a
//! [`DiagnosticSink`] so callers can collect them (tests, embedding tools)
//! or forward them to `tracing` with [`TracingSink`].

use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, warn};

use crate::error::FileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The file failed to normalize, aggregate or select and contributes nothing.
    FileSkipped {
        path: PathBuf,
        kind: &'static str,
        message: String,
    },
    /// The file processed fine but its busiest bin lacks core measurements.
    FileDiscarded { path: PathBuf, reason: String },
    /// Run-level message meant for the operator.
    Notice(String),
}

impl Diagnostic {
    pub fn skipped(path: PathBuf, err: &FileError) -> Self {
        Diagnostic::FileSkipped {
            path,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to the active `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::FileSkipped {
                path,
                kind,
                message,
            } => error!(path = %path.display(), kind, error = %message, "Skipped file"),
            Diagnostic::FileDiscarded { path, reason } => {
                warn!(path = %path.display(), reason = %reason, "Discarded file results")
            }
            Diagnostic::Notice(message) => warn!("{message}"),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what has been reported so far.
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, diagnostic: Diagnostic) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
