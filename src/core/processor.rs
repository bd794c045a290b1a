//! Batch processor: drains an operation queue under one of four execution
//! models and rolls back on failure when asked to.
//!
//! Operations execute strictly in queue order. The processor keeps the
//! operations it has executed in a local list that exists only for the
//! duration of one `process` call; under the transactional model that list
//! is walked in reverse to undo the batch after the first execution
//! failure. Failures during rollback are recorded and never abort the
//! remaining rollback attempts.

use log::{Level, LevelFilter};

use crate::config::{BatchConfig, ExecutionModel};
use crate::core::operations::{FsOperation, Operation};
use crate::core::queue::OperationQueue;
use crate::core::results::{
    BatchLog, ErrorSeverity, OperationError, OperationPhase, ProcessingResults,
};

/// Low-level switch set controlling error routing in one `process` call.
///
/// The caller-facing [`ExecutionModel`] maps onto these switches; they can
/// also be combined directly when driving the processor without the façade.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessorOptions {
    /// Validate every queued operation before executing any of them
    pub validate_first: bool,
    /// Run each operation's checksum-consistency hook before `execute`
    pub verify_checksums: bool,
    /// Continue past per-operation failures; never roll back
    pub best_effort: bool,
    /// Undo executed operations in reverse order after an execution failure
    pub transactional: bool,
    /// With `validate_first`, proceed to execution despite validation
    /// failures
    pub force: bool,
}

impl From<&BatchConfig> for ProcessorOptions {
    fn from(config: &BatchConfig) -> Self {
        Self {
            validate_first: config.model == ExecutionModel::ValidateFirst,
            best_effort: config.model == ExecutionModel::BestEffort,
            transactional: config.model == ExecutionModel::Transactional,
            verify_checksums: config.verify_checksums,
            force: config.force,
        }
    }
}

/// Drains an [`OperationQueue`] and reports a [`ProcessingResults`].
///
/// # Examples
///
/// ```rust,no_run
/// use fsynth::config::BatchConfig;
/// use fsynth::core::operations::{CreateFileOptions, Operation};
/// use fsynth::core::processor::BatchProcessor;
/// use fsynth::core::queue::OperationQueue;
///
/// let mut queue = OperationQueue::new();
/// queue.enqueue(Operation::create_file("/tmp/a", CreateFileOptions::default()));
/// let results = BatchProcessor::new().execute(&mut queue, &BatchConfig::default());
/// assert!(results.is_success());
/// ```
#[derive(Debug, Default)]
pub struct BatchProcessor;

impl BatchProcessor {
    /// Create a processor.
    pub fn new() -> Self {
        Self
    }

    /// Run the queued operations under the given configuration.
    ///
    /// The queue is drained as operations are processed; operations never
    /// reached (after an abort) remain queued and are counted as skipped.
    /// A dry run validates without executing and leaves the queue intact.
    pub fn execute(
        &mut self,
        queue: &mut OperationQueue,
        config: &BatchConfig,
    ) -> ProcessingResults {
        let mut log = BatchLog::new(config.log_level_filter());
        if let Err(err) = config.validate() {
            log.record(Level::Error, format!("configuration rejected: {}", err));
            let record = OperationError {
                operation_index: 0,
                operation_type: "Config".to_string(),
                phase: OperationPhase::Validation,
                message: err.to_string(),
                severity: ErrorSeverity::Error,
            };
            return ProcessingResults::new(
                false,
                vec![record],
                0,
                queue.len(),
                0,
                log.into_entries(),
            );
        }
        if config.dry_run {
            log.record(
                Level::Info,
                format!("dry run: validating {} operations", queue.len()),
            );
            return self.dry_run(queue, &mut log);
        }
        log.record(
            Level::Info,
            format!(
                "processing {} operations ({} model)",
                queue.len(),
                config.model.as_str()
            ),
        );
        self.run(queue, &ProcessorOptions::from(config), &mut log)
    }

    /// Run the queued operations under an explicit switch set, bypassing
    /// the execution-model mapping of [`BatchConfig`].
    pub fn process(
        &mut self,
        queue: &mut OperationQueue,
        options: &ProcessorOptions,
        log_level: LevelFilter,
    ) -> ProcessingResults {
        let mut log = BatchLog::new(log_level);
        self.run(queue, options, &mut log)
    }

    /// Validate every queued operation without executing anything. The
    /// queue is restored to its original order afterwards.
    fn dry_run(&mut self, queue: &mut OperationQueue, log: &mut BatchLog) -> ProcessingResults {
        let mut errors = Vec::new();
        let mut passed = 0;
        let mut checked = Vec::new();
        let mut index = 0;
        while let Some(mut operation) = queue.dequeue() {
            index += 1;
            match operation.validate() {
                Ok(()) => {
                    passed += 1;
                    log.record(Level::Debug, format!("validated {}", operation));
                }
                Err(err) => {
                    record_failure(&mut errors, log, index, &operation, OperationPhase::Validation, &err);
                }
            }
            checked.push(operation);
        }
        for operation in checked {
            queue.enqueue(operation);
        }
        let success = errors.is_empty();
        ProcessingResults::new(success, errors, passed, 0, 0, take_log(log))
    }

    /// Drain the queue under the given switch set.
    fn run(
        &mut self,
        queue: &mut OperationQueue,
        options: &ProcessorOptions,
        log: &mut BatchLog,
    ) -> ProcessingResults {
        let mut errors: Vec<OperationError> = Vec::new();

        if options.validate_first {
            if options.force {
                // Diagnostic pass only: the main loop records whatever
                // still fails, so keeping these records would double-count
                // an operation that fails both validation and execution.
                let mut scratch = Vec::new();
                if self.validate_all(queue, &mut scratch, log) {
                    log.record(
                        Level::Warn,
                        format!(
                            "{} validation failures ignored, executing anyway (force)",
                            scratch.len()
                        ),
                    );
                }
            } else if self.validate_all(queue, &mut errors, log) {
                log.record(
                    Level::Error,
                    "validation failed, nothing will be executed".to_string(),
                );
                let skipped = queue.len();
                return ProcessingResults::new(false, errors, 0, skipped, 0, take_log(log));
            }
        }

        let mut executed: Vec<(usize, Operation)> = Vec::new();
        let mut rollback_count = 0;
        let mut index = 0;

        while let Some(mut operation) = queue.dequeue() {
            index += 1;
            if !options.validate_first {
                if let Err(err) = operation.validate() {
                    record_failure(&mut errors, log, index, &operation, OperationPhase::Validation, &err);
                    if options.best_effort {
                        continue;
                    }
                    if options.transactional {
                        rollback_count = self.rollback(&mut executed, &mut errors, log);
                    }
                    break;
                }
                log.record(Level::Debug, format!("validated {}", operation));
            }
            if options.verify_checksums
                && let Err(err) = operation.verify_checksums()
            {
                record_failure(&mut errors, log, index, &operation, OperationPhase::Validation, &err);
                if options.best_effort {
                    continue;
                }
                if options.transactional {
                    rollback_count = self.rollback(&mut executed, &mut errors, log);
                }
                break;
            }
            match operation.execute() {
                Ok(()) => {
                    log.record(Level::Info, format!("executed {}", operation));
                    executed.push((index, operation));
                }
                Err(err) => {
                    record_failure(&mut errors, log, index, &operation, OperationPhase::Execution, &err);
                    if options.best_effort {
                        continue;
                    }
                    if options.transactional {
                        rollback_count = self.rollback(&mut executed, &mut errors, log);
                    }
                    break;
                }
            }
        }

        let skipped = queue.len();
        let executed_count = executed.len();
        let success = errors.is_empty();
        log.record(
            Level::Info,
            format!(
                "batch finished: {} executed, {} skipped, {} errors",
                executed_count,
                skipped,
                errors.len()
            ),
        );
        ProcessingResults::new(
            success,
            errors,
            executed_count,
            skipped,
            rollback_count,
            take_log(log),
        )
    }

    /// Validate every queued operation, restoring the queue afterwards.
    /// Returns true when at least one validation failed.
    fn validate_all(
        &mut self,
        queue: &mut OperationQueue,
        errors: &mut Vec<OperationError>,
        log: &mut BatchLog,
    ) -> bool {
        let mut checked = Vec::new();
        let mut failed = false;
        let mut index = 0;
        while let Some(mut operation) = queue.dequeue() {
            index += 1;
            if let Err(err) = operation.validate() {
                record_failure(errors, log, index, &operation, OperationPhase::Validation, &err);
                failed = true;
            } else {
                log.record(Level::Debug, format!("validated {}", operation));
            }
            checked.push(operation);
        }
        for operation in checked {
            queue.enqueue(operation);
        }
        failed
    }

    /// Undo executed operations in reverse order. Failures are recorded and
    /// the remaining undos still run. Returns the number of successful
    /// undos.
    fn rollback(
        &mut self,
        executed: &mut Vec<(usize, Operation)>,
        errors: &mut Vec<OperationError>,
        log: &mut BatchLog,
    ) -> usize {
        log.record(
            Level::Warn,
            format!("rolling back {} executed operations", executed.len()),
        );
        let mut undone = 0;
        for (index, operation) in executed.iter_mut().rev() {
            match operation.undo() {
                Ok(()) => {
                    undone += 1;
                    log.record(Level::Info, format!("rolled back {}", operation));
                }
                Err(err) => {
                    record_failure(errors, log, *index, operation, OperationPhase::Rollback, &err);
                }
            }
        }
        undone
    }
}

fn record_failure(
    errors: &mut Vec<OperationError>,
    log: &mut BatchLog,
    index: usize,
    operation: &Operation,
    phase: OperationPhase,
    err: &crate::error::FsynthError,
) {
    log.record(
        Level::Error,
        format!("operation {} failed during {}: {}", index, phase, err),
    );
    errors.push(OperationError {
        operation_index: index,
        operation_type: operation.kind().as_str().to_string(),
        phase,
        message: err.to_string(),
        severity: ErrorSeverity::Error,
    });
}

// The log collector is consumed at every return site; swapping an empty one
// in keeps the helper signatures borrow-friendly.
fn take_log(log: &mut BatchLog) -> Vec<String> {
    std::mem::replace(log, BatchLog::new(log::LevelFilter::Off)).into_entries()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::operations::{CreateDirectoryOptions, CreateFileOptions, DeleteOptions};
    use std::fs;
    use tempfile::TempDir;

    fn config(model: ExecutionModel) -> BatchConfig {
        BatchConfig {
            model,
            ..Default::default()
        }
    }

    #[test]
    fn test_standard_stops_on_first_error_without_rollback() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(&a, CreateFileOptions::default()));
        queue.enqueue(Operation::create_file(&a, CreateFileOptions::default()));
        queue.enqueue(Operation::create_file(
            temp.path().join("never"),
            CreateFileOptions::default(),
        ));
        let results = BatchProcessor::new().execute(&mut queue, &config(ExecutionModel::Standard));
        assert!(!results.is_success());
        assert_eq!(results.executed_count(), 1);
        assert_eq!(results.skipped_count(), 1);
        assert_eq!(results.rollback_count(), 0);
        // The first creation is not rolled back.
        assert!(a.exists());
        assert!(!temp.path().join("never").exists());
        // The unreached operation stays queued.
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_transactional_rolls_back_in_reverse() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("t");
        let file = dir.join("f");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_directory(
            &dir,
            CreateDirectoryOptions::default(),
        ));
        queue.enqueue(Operation::create_file(
            &file,
            CreateFileOptions {
                content: "hello".into(),
                ..Default::default()
            },
        ));
        queue.enqueue(Operation::create_file(
            &file,
            CreateFileOptions {
                content: "world".into(),
                ..Default::default()
            },
        ));
        let results =
            BatchProcessor::new().execute(&mut queue, &config(ExecutionModel::Transactional));
        assert!(!results.is_success());
        assert_eq!(results.executed_count(), 2);
        assert_eq!(results.rollback_count(), 2);
        assert_eq!(results.get_errors()[0].operation_index, 3);
        assert!(results.get_errors()[0].message.contains("already exists"));
        // Both executed operations were undone, directory included.
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_best_effort_drains_everything() {
        let temp = TempDir::new().unwrap();
        let ok = temp.path().join("ok");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::delete(
            temp.path().join("does-not-exist"),
            DeleteOptions::default(),
        ));
        queue.enqueue(Operation::create_file(
            &ok,
            CreateFileOptions {
                content: "x".into(),
                ..Default::default()
            },
        ));
        queue.enqueue(Operation::create_file(
            &ok,
            CreateFileOptions {
                content: "y".into(),
                ..Default::default()
            },
        ));
        let results = BatchProcessor::new().execute(&mut queue, &config(ExecutionModel::BestEffort));
        assert!(!results.is_success());
        assert_eq!(results.executed_count(), 2);
        assert_eq!(results.rollback_count(), 0);
        assert_eq!(results.get_errors().len(), 1);
        assert_eq!(results.get_errors()[0].operation_index, 3);
        assert!(results.get_errors()[0].message.contains("already exists"));
        assert!(queue.is_empty());
        assert_eq!(fs::read(&ok).unwrap(), b"x");
    }

    #[test]
    fn test_validate_first_refuses_to_execute() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(&good, CreateFileOptions::default()));
        // Parent directory missing and create_parent_dirs off: fails validation.
        queue.enqueue(Operation::create_file(
            temp.path().join("missing/child"),
            CreateFileOptions::default(),
        ));
        let results =
            BatchProcessor::new().execute(&mut queue, &config(ExecutionModel::ValidateFirst));
        assert!(!results.is_success());
        assert_eq!(results.executed_count(), 0);
        assert_eq!(results.skipped_count(), 2);
        assert_eq!(results.get_errors()[0].operation_index, 2);
        assert!(!good.exists());
        // The queue is restored for inspection.
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_validate_first_with_force_executes_anyway() {
        let temp = TempDir::new().unwrap();
        let good = temp.path().join("good");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(&good, CreateFileOptions::default()));
        queue.enqueue(Operation::create_file(
            temp.path().join("missing/child"),
            CreateFileOptions::default(),
        ));
        let mut forced = config(ExecutionModel::ValidateFirst);
        forced.force = true;
        let results = BatchProcessor::new().execute(&mut queue, &forced);
        assert!(!results.is_success());
        // The good operation still executed.
        assert!(good.exists());
        assert_eq!(results.executed_count(), 1);
        // The operation that failed both validation and execution is
        // reported once, from the phase that actually stopped it.
        assert_eq!(results.get_errors().len(), 1);
        assert_eq!(results.get_errors()[0].operation_index, 2);
        assert_eq!(results.get_errors()[0].phase, OperationPhase::Execution);
    }

    #[test]
    fn test_dry_run_validates_without_executing() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("planned");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(&target, CreateFileOptions::default()));
        queue.enqueue(Operation::create_file(
            temp.path().join("missing/child"),
            CreateFileOptions::default(),
        ));
        let mut dry = config(ExecutionModel::Standard);
        dry.dry_run = true;
        let results = BatchProcessor::new().execute(&mut queue, &dry);
        assert!(!results.is_success());
        assert_eq!(results.executed_count(), 1);
        assert!(!target.exists());
        // Nothing was consumed.
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_rejected_config_is_reported_not_executed() {
        let temp = TempDir::new().unwrap();
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(
            temp.path().join("a"),
            CreateFileOptions::default(),
        ));
        let bad = BatchConfig {
            parallel: true,
            ..Default::default()
        };
        let results = BatchProcessor::new().execute(&mut queue, &bad);
        assert!(!results.is_success());
        assert_eq!(results.get_errors()[0].operation_index, 0);
        assert_eq!(results.skipped_count(), 1);
        assert!(!temp.path().join("a").exists());
    }

    #[test]
    fn test_verify_checksums_blocks_drifted_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s");
        fs::write(&source, b"v1").unwrap();
        let mut copy = Operation::copy_file(
            &source,
            temp.path().join("d"),
            crate::core::operations::CopyFileOptions::default(),
        );
        // Plan (validate) now, then drift the source before processing.
        copy.validate().unwrap();
        fs::write(&source, b"v2").unwrap();
        let mut queue = OperationQueue::new();
        queue.enqueue(copy);
        let mut checked = config(ExecutionModel::Standard);
        checked.verify_checksums = true;
        let results = BatchProcessor::new().execute(&mut queue, &checked);
        assert!(!results.is_success());
        assert!(!temp.path().join("d").exists());
    }

    #[test]
    fn test_raw_switch_set_combines_models() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("raw");
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(&target, CreateFileOptions::default()));
        queue.enqueue(Operation::create_file(&target, CreateFileOptions::default()));
        let options = ProcessorOptions {
            validate_first: true,
            transactional: true,
            ..Default::default()
        };
        let results =
            BatchProcessor::new().process(&mut queue, &options, log::LevelFilter::Info);
        // Both validations pass (the conflict only appears at execution),
        // then the second execute fails and the first is rolled back.
        assert!(!results.is_success());
        assert_eq!(results.executed_count(), 1);
        assert_eq!(results.rollback_count(), 1);
        assert!(!target.exists());
    }

    #[test]
    fn test_log_collects_batch_story() {
        let temp = TempDir::new().unwrap();
        let mut queue = OperationQueue::new();
        queue.enqueue(Operation::create_file(
            temp.path().join("logged"),
            CreateFileOptions::default(),
        ));
        let results = BatchProcessor::new().execute(&mut queue, &config(ExecutionModel::Standard));
        assert!(results.is_success());
        assert!(results.get_log().iter().any(|m| m.contains("processing 1")));
        assert!(results.get_log().iter().any(|m| m.contains("executed")));
    }
}
