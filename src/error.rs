//! Comprehensive error types for fsynth batch filesystem operations.
//!
//! This module defines the `FsynthError` enum covering all error conditions
//! that can occur while validating, executing, or undoing filesystem
//! mutations, along with helper constructors that keep call sites terse.
//!
//! Every failure in fsynth is a returned value; nothing in the operation
//! lifecycle unwinds. The processor translates these errors into the
//! per-operation error records surfaced on [`ProcessingResults`].
//!
//! [`ProcessingResults`]: crate::core::results::ProcessingResults
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents all possible errors in fsynth.
///
/// Each variant carries the operation kind and the affected path so that
/// error records can be attributed without extra context.
///
/// # Examples
///
/// ```rust
/// use fsynth::error::{FsynthError, FsynthResult};
///
/// fn example() -> FsynthResult<()> {
///     Err(FsynthError::validation(
///         "CreateFile",
///         "/tmp/out.txt",
///         "parent directory does not exist",
///     ))
/// }
/// ```
#[derive(Error, Debug)]
pub enum FsynthError {
    /// I/O operation failed during file system access.
    ///
    /// This variant wraps `std::io::Error` for failures that occur outside
    /// an operation's own precondition checks (opening handles, reading
    /// directory listings, metadata queries).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error due to invalid or missing settings.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// A precondition check failed before any mutation was attempted.
    ///
    /// Raised by `validate` (missing source, invalid options, target
    /// conflicts) and reported with `phase = "validation"`.
    #[error("{operation} validation failed for {path}: {message}")]
    Validation {
        /// Kind tag of the operation that failed (e.g. `"CopyFile"`)
        operation: &'static str,
        /// The path the precondition concerns
        path: PathBuf,
        /// Human-readable cause
        message: String,
    },

    /// The permission probe refused the operation before mutation.
    #[error("{operation} permission denied for {path}: {message}")]
    PermissionDenied {
        /// Kind tag of the operation
        operation: &'static str,
        /// The path that is not readable/writable
        path: PathBuf,
        /// Human-readable cause
        message: String,
    },

    /// A host I/O primitive returned failure during the mutation step.
    #[error("{operation} execution failed for {path}: {message}")]
    Execution {
        /// Kind tag of the operation
        operation: &'static str,
        /// The path being mutated
        path: PathBuf,
        /// Human-readable cause
        message: String,
    },

    /// A content digest computed after a copy or move does not match the
    /// digest captured before it. Never silently suppressed.
    #[error("{operation} checksum mismatch for {path}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        /// Kind tag of the operation
        operation: &'static str,
        /// The file whose digest drifted
        path: PathBuf,
        /// Digest captured before the mutation
        expected: String,
        /// Digest observed after the mutation
        actual: String,
    },

    /// A rollback step cannot restore prior state (missing snapshot, or the
    /// required path is now occupied). Reported with `phase = "rollback"`;
    /// rollback continues with the next operation.
    #[error("{operation} undo precluded for {path}: {message}")]
    UndoPrecluded {
        /// Kind tag of the operation
        operation: &'static str,
        /// The path that cannot be restored
        path: PathBuf,
        /// Human-readable cause
        message: String,
    },

    /// Catch-all error variant wrapping any other failure.
    #[error("Unknown error: {0}")]
    Other(#[from] anyhow::Error),
}

// Convert TOML parse errors to configuration errors
impl From<toml::de::Error> for FsynthError {
    fn from(err: toml::de::Error) -> Self {
        FsynthError::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}

impl From<serde_json::Error> for FsynthError {
    fn from(err: serde_json::Error) -> Self {
        FsynthError::Config {
            message: format!("JSON serialization/deserialization error: {}", err),
        }
    }
}

/// Specialized `Result` type for fsynth operations.
pub type FsynthResult<T> = Result<T, FsynthError>;

impl FsynthError {
    /// Create a configuration error with the given message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fsynth::error::FsynthError;
    /// let err = FsynthError::config("unknown execution model");
    /// assert_eq!(err.to_string(), "Configuration error: unknown execution model");
    /// ```
    pub fn config<S: Into<String>>(message: S) -> Self {
        FsynthError::Config {
            message: message.into(),
        }
    }

    /// Create a validation-precondition error for the given operation and path.
    pub fn validation<P, S>(operation: &'static str, path: P, message: S) -> Self
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        FsynthError::Validation {
            operation,
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a permission-denied error for the given operation and path.
    pub fn permission_denied<P, S>(operation: &'static str, path: P, message: S) -> Self
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        FsynthError::PermissionDenied {
            operation,
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create an execution error for the given operation and path.
    pub fn execution<P, S>(operation: &'static str, path: P, message: S) -> Self
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        FsynthError::Execution {
            operation,
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a checksum-mismatch error for the given operation and path.
    pub fn checksum_mismatch<P>(
        operation: &'static str,
        path: P,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self
    where
        P: AsRef<Path>,
    {
        FsynthError::ChecksumMismatch {
            operation,
            path: path.as_ref().to_path_buf(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an undo-precluded error for the given operation and path.
    pub fn undo_precluded<P, S>(operation: &'static str, path: P, message: S) -> Self
    where
        P: AsRef<Path>,
        S: Into<String>,
    {
        FsynthError::UndoPrecluded {
            operation,
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

}
