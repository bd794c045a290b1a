//! Structured outcome of a processed batch.
//!
//! The processor reports everything through a [`ProcessingResults`] value:
//! an overall success flag, per-operation error records attributed by their
//! 1-based queue position, counters, and the ordered batch log. Results are
//! read-only after construction.

use std::fmt;

use log::{Level, LevelFilter};
use serde::Serialize;

use crate::Result;

/// Lifecycle phase an error record was produced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationPhase {
    /// Precondition checking before any mutation
    Validation,
    /// The mutation itself
    Execution,
    /// Reverse-order undo after a failure
    Rollback,
}

impl OperationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationPhase::Validation => "validation",
            OperationPhase::Execution => "execution",
            OperationPhase::Rollback => "rollback",
        }
    }
}

impl fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// The operation failed
    Error,
    /// Advisory only; the operation still counts as successful
    Warning,
}

/// One failure (or advisory warning) attributed to an operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationError {
    /// 1-based position in the input queue, 0 when not attributable
    pub operation_index: usize,
    /// Stable kind tag of the operation (`"CopyFile"`, ...)
    pub operation_type: String,
    /// Lifecycle phase the failure occurred in
    pub phase: OperationPhase,
    /// Human-readable cause
    pub message: String,
    /// Error or advisory warning
    pub severity: ErrorSeverity,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] operation {} ({}): {}",
            self.phase, self.operation_index, self.operation_type, self.message
        )
    }
}

/// Ordered, level-gated message log for one `process` call.
///
/// Messages are mirrored to the `log` facade and retained in memory so
/// callers can read the batch's story off the results object.
#[derive(Debug)]
pub(crate) struct BatchLog {
    level: LevelFilter,
    entries: Vec<String>,
}

impl BatchLog {
    pub(crate) fn new(level: LevelFilter) -> Self {
        Self {
            level,
            entries: Vec::new(),
        }
    }

    /// Record a message at the given level; retained only when the batch
    /// log level admits it.
    pub(crate) fn record(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: "fsynth::processor", level, "{}", message);
        if level <= self.level {
            self.entries.push(message);
        }
    }

    pub(crate) fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

/// Read-only outcome of one batch run.
#[derive(Debug, Serialize)]
pub struct ProcessingResults {
    success: bool,
    errors: Vec<OperationError>,
    executed_count: usize,
    skipped_count: usize,
    rollback_count: usize,
    log: Vec<String>,
}

impl ProcessingResults {
    pub(crate) fn new(
        success: bool,
        errors: Vec<OperationError>,
        executed_count: usize,
        skipped_count: usize,
        rollback_count: usize,
        log: Vec<String>,
    ) -> Self {
        Self {
            success,
            errors,
            executed_count,
            skipped_count,
            rollback_count,
            log,
        }
    }

    /// Whether the batch completed without recorded errors.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The error records, in the order they were produced.
    pub fn get_errors(&self) -> &[OperationError] {
        &self.errors
    }

    /// The retained batch log messages, in order.
    pub fn get_log(&self) -> &[String] {
        &self.log
    }

    /// Number of operations whose `execute` returned success (or, on a dry
    /// run, whose `validate` passed).
    pub fn executed_count(&self) -> usize {
        self.executed_count
    }

    /// Number of queued operations never reached because the batch stopped.
    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    /// Number of operations successfully undone by rollback.
    pub fn rollback_count(&self) -> usize {
        self.rollback_count
    }

    /// Serialize the results to a JSON report.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
