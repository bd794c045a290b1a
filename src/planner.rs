//! High-level façade for planning and running a batch of filesystem
//! mutations.
//!
//! [`BatchPlanner`] wraps an [`OperationQueue`] and a [`BatchProcessor`]
//! behind ergonomic factory methods: plan operations in order, inspect or
//! prune the plan, then run it under a chosen execution model — or dry-run
//! it to see what would happen without touching the filesystem.
//!
//! # Examples
//!
//! ```rust,no_run
//! use fsynth::config::{BatchConfig, ExecutionModel};
//! use fsynth::core::operations::{CreateDirectoryOptions, CreateFileOptions};
//! use fsynth::planner::BatchPlanner;
//!
//! let mut planner = BatchPlanner::new();
//! planner
//!     .create_directory("/tmp/work", CreateDirectoryOptions::default())
//!     .create_file(
//!         "/tmp/work/out.txt",
//!         CreateFileOptions {
//!             content: "hello".into(),
//!             ..Default::default()
//!         },
//!     );
//!
//! let results = planner.execute(&BatchConfig {
//!     model: ExecutionModel::Transactional,
//!     ..Default::default()
//! });
//! assert!(results.is_success());
//! ```

use std::path::PathBuf;

use log::debug;

use crate::config::BatchConfig;
use crate::core::operations::{
    CopyFileOptions, CreateDirectoryOptions, CreateFileOptions, DeleteOptions, FsOperation,
    MoveOptions, Operation, OperationKind, SymlinkOptions,
};
use crate::core::processor::BatchProcessor;
use crate::core::queue::OperationQueue;
use crate::core::results::ProcessingResults;

/// Plans an ordered batch of filesystem mutations and runs it.
///
/// Operations execute in exactly the order they were planned. The planner
/// keeps a parallel ordered list of operation kinds so that the 1-based
/// `operation_index` in every error record can be mapped back to what was
/// planned, even after the processor has drained the queue.
#[derive(Debug, Default)]
pub struct BatchPlanner {
    queue: OperationQueue,
    processor: BatchProcessor,
    planned: Vec<OperationKind>,
}

impl BatchPlanner {
    /// Create a planner with an empty queue.
    pub fn new() -> Self {
        Self {
            queue: OperationQueue::new(),
            processor: BatchProcessor::new(),
            planned: Vec::new(),
        }
    }

    /// Plan an already-built operation.
    pub fn plan(&mut self, operation: Operation) -> &mut Self {
        debug!("planned {}", operation);
        self.planned.push(operation.kind());
        self.queue.enqueue(operation);
        self
    }

    /// Plan the creation of a file at `target`.
    pub fn create_file(
        &mut self,
        target: impl Into<PathBuf>,
        options: CreateFileOptions,
    ) -> &mut Self {
        self.plan(Operation::create_file(target, options))
    }

    /// Plan the creation of a directory at `target`.
    pub fn create_directory(
        &mut self,
        target: impl Into<PathBuf>,
        options: CreateDirectoryOptions,
    ) -> &mut Self {
        self.plan(Operation::create_directory(target, options))
    }

    /// Plan a copy of the regular file at `source` to `target`.
    pub fn copy_file(
        &mut self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: CopyFileOptions,
    ) -> &mut Self {
        self.plan(Operation::copy_file(source, target, options))
    }

    /// Plan a move of `source` to `target`.
    pub fn move_item(
        &mut self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: MoveOptions,
    ) -> &mut Self {
        self.plan(Operation::move_item(source, target, options))
    }

    /// Plan a symbolic link at `target` whose link text is `source`.
    pub fn symlink(
        &mut self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: SymlinkOptions,
    ) -> &mut Self {
        self.plan(Operation::symlink(source, target, options))
    }

    /// Plan the removal of `source`.
    pub fn delete(&mut self, source: impl Into<PathBuf>, options: DeleteOptions) -> &mut Self {
        self.plan(Operation::delete(source, options))
    }

    /// Number of operations currently planned.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Ordered view of the planned operations.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.queue.operations()
    }

    /// The kind planned at a 1-based position, usable to interpret the
    /// `operation_index` of an error record after a run.
    pub fn kind_at(&self, index: usize) -> Option<OperationKind> {
        if index == 0 {
            return None;
        }
        self.planned.get(index - 1).copied()
    }

    /// Remove the operation at a 1-based position from the plan.
    pub fn remove_operation(&mut self, index: usize) -> Option<Operation> {
        let removed = self.queue.remove(index)?;
        self.planned.remove(index - 1);
        Some(removed)
    }

    /// Drop every planned operation.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.planned.clear();
    }

    /// Run the planned batch under the given configuration.
    ///
    /// Executed operations leave the plan; operations never reached (after
    /// an abort) stay planned, renumbered from 1, and can be inspected or
    /// retried.
    pub fn execute(&mut self, config: &BatchConfig) -> ProcessingResults {
        let results = self.processor.execute(&mut self.queue, config);
        if !config.dry_run {
            // Renumber whatever the processor left behind.
            self.planned = self.queue.operations().map(|op| op.kind()).collect();
        }
        results
    }

    /// Validate the planned batch without executing anything. The plan is
    /// left intact.
    pub fn dry_run(&mut self) -> ProcessingResults {
        let config = BatchConfig {
            dry_run: true,
            ..Default::default()
        };
        self.processor.execute(&mut self.queue, &config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutionModel;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plan_preserves_order_and_kinds() {
        let mut planner = BatchPlanner::new();
        planner
            .create_directory("/tmp/x", CreateDirectoryOptions::default())
            .create_file("/tmp/x/a", CreateFileOptions::default())
            .delete("/tmp/y", DeleteOptions::default());
        assert_eq!(planner.len(), 3);
        assert_eq!(planner.kind_at(1), Some(OperationKind::CreateDirectory));
        assert_eq!(planner.kind_at(3), Some(OperationKind::Delete));
        assert_eq!(planner.kind_at(0), None);
        assert_eq!(planner.kind_at(4), None);
    }

    #[test]
    fn test_remove_operation_keeps_lookup_in_sync() {
        let mut planner = BatchPlanner::new();
        planner
            .create_file("/a", CreateFileOptions::default())
            .create_directory("/b", CreateDirectoryOptions::default())
            .create_file("/c", CreateFileOptions::default());
        let removed = planner.remove_operation(2).unwrap();
        assert_eq!(removed.kind(), OperationKind::CreateDirectory);
        assert_eq!(planner.len(), 2);
        assert_eq!(planner.kind_at(2), Some(OperationKind::CreateFile));
    }

    #[test]
    fn test_execute_and_inspect_results() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("made");
        let file = dir.join("note.txt");
        let mut planner = BatchPlanner::new();
        planner
            .create_directory(&dir, CreateDirectoryOptions::default())
            .create_file(
                &file,
                CreateFileOptions {
                    content: "written by the planner".into(),
                    ..Default::default()
                },
            );
        let results = planner.execute(&BatchConfig::default());
        assert!(results.is_success());
        assert_eq!(results.executed_count(), 2);
        assert_eq!(fs::read(&file).unwrap(), b"written by the planner");
        assert!(planner.is_empty());
    }

    #[test]
    fn test_dry_run_leaves_plan_intact() {
        let temp = TempDir::new().unwrap();
        let mut planner = BatchPlanner::new();
        planner.create_file(temp.path().join("virtual"), CreateFileOptions::default());
        let results = planner.dry_run();
        assert!(results.is_success());
        assert_eq!(results.executed_count(), 1);
        assert!(!temp.path().join("virtual").exists());
        assert_eq!(planner.len(), 1);
    }

    #[test]
    fn test_failed_batch_renumbers_leftovers() {
        let temp = TempDir::new().unwrap();
        let taken = temp.path().join("taken");
        fs::write(&taken, b"x").unwrap();
        let mut planner = BatchPlanner::new();
        planner
            .create_file(&taken, CreateFileOptions::default())
            .create_directory(temp.path().join("after"), CreateDirectoryOptions::default());
        let results = planner.execute(&BatchConfig {
            model: ExecutionModel::Standard,
            ..Default::default()
        });
        assert!(!results.is_success());
        assert_eq!(results.get_errors()[0].operation_index, 1);
        // The unreached CreateDirectory is now first in the plan.
        assert_eq!(planner.len(), 1);
        assert_eq!(planner.kind_at(1), Some(OperationKind::CreateDirectory));
    }
}
