//! fsynth library root.
//!
//! Plan batches of filesystem mutations as first-class values and execute
//! them with validation, checksum verification, and best-effort rollback.

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod core;
pub mod error;
pub type Result<T> = error::FsynthResult<T>;

pub mod planner;

pub use crate::config::{BatchConfig, ExecutionModel};
pub use crate::core::operations::Operation;
pub use crate::core::processor::BatchProcessor;
pub use crate::core::queue::OperationQueue;
pub use crate::core::results::ProcessingResults;
pub use crate::planner::BatchPlanner;
