//! Planned, reversible filesystem mutations.
//!
//! Every mutation fsynth performs is modeled as an [`Operation`]: a value
//! that carries its inputs, its per-variant options, and — after `validate`
//! and `execute` have run — everything its `undo` needs to restore prior
//! state (content snapshots, link targets, checksums, "did I actually change
//! anything" flags). The operation instance is the transaction record for
//! that step; there is no separate journal.
//!
//! The three-phase contract:
//!
//! - `validate` never mutates the filesystem. It may read (hashing a source,
//!   snapshotting content) and populates the state later phases rely on.
//! - `execute` performs the mutation only after re-verifying its own
//!   preconditions, and records the "actually changed" outcome.
//! - `undo` restores pre-execution state from the snapshots, and is a no-op
//!   success when the operation never changed anything.

mod copy_file;
mod create_directory;
mod create_file;
mod delete;
mod move_item;
mod symlink;

pub use copy_file::{CopyFileOp, CopyFileOptions};
pub use create_directory::{CreateDirectoryOp, CreateDirectoryOptions};
pub use create_file::{CreateFileOp, CreateFileOptions};
pub use delete::{DeleteOp, DeleteOptions};
pub use move_item::{MoveOp, MoveOptions};
pub use symlink::{SymlinkOp, SymlinkOptions};

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Stable kind tag for an operation variant, surfaced in error records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Exclusive creation of a file with given content
    CreateFile,
    /// Creation of a directory (idempotent unless exclusive)
    CreateDirectory,
    /// Checksum-verified copy of a regular file
    CopyFile,
    /// Move of a file, directory, or symlink
    Move,
    /// Creation of a symbolic link
    Symlink,
    /// Removal of a file, empty directory, or symlink
    Delete,
}

impl OperationKind {
    /// The stable string tag for this variant.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateFile => "CreateFile",
            OperationKind::CreateDirectory => "CreateDirectory",
            OperationKind::CopyFile => "CopyFile",
            OperationKind::Move => "Move",
            OperationKind::Symlink => "Symlink",
            OperationKind::Delete => "Delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a filesystem item, captured during `validate` so that
/// `undo` can recreate the right kind of thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemType {
    /// A regular file
    File,
    /// A directory
    Directory,
    /// A symbolic link (never followed)
    Symlink,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::File => "file",
            ItemType::Directory => "directory",
            ItemType::Symlink => "symlink",
        }
    }
}

/// Classify a path without following a trailing symlink.
///
/// Returns `None` when nothing exists at the path.
pub(crate) fn classify(path: &Path) -> Option<ItemType> {
    let meta = std::fs::symlink_metadata(path).ok()?;
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        Some(ItemType::Symlink)
    } else if file_type.is_dir() {
        Some(ItemType::Directory)
    } else {
        Some(ItemType::File)
    }
}

/// Content digests captured across an operation's lifecycle.
///
/// Only the fields relevant to a variant are ever populated: copy and move
/// record the source digest up front and the landed digest after the
/// mutation, create records the written file's digest, delete records the
/// digest of the snapshot it may have to restore.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChecksumData {
    /// Source digest captured when the operation was first validated
    pub initial_source_checksum: Option<String>,
    /// Source digest from the most recent re-validation
    pub source_checksum: Option<String>,
    /// Digest of the file written by `execute`
    pub target_checksum: Option<String>,
    /// Digest of a snapshot taken for restoration
    pub original_checksum: Option<String>,
    /// Digest of the moved file at its destination
    pub final_target_checksum: Option<String>,
}

/// Uniform three-phase contract every operation variant implements.
///
/// The processor drives operations exclusively through this view.
pub trait FsOperation {
    /// Check preconditions and capture undo state. Never mutates the
    /// filesystem; always callable before `execute`.
    fn validate(&mut self) -> Result<()>;

    /// Perform the mutation. Only called after a successful `validate`
    /// within the same batch.
    fn execute(&mut self) -> Result<()>;

    /// Restore pre-execution state from the captured snapshots. A no-op
    /// success when this operation never changed anything.
    fn undo(&mut self) -> Result<()>;

    /// Re-check checksum consistency between planning and execution.
    ///
    /// Invoked by the processor before `execute` when checksum verification
    /// is enabled. Variants without a source digest accept by default.
    fn verify_checksums(&mut self) -> Result<()> {
        Ok(())
    }

    /// The stable kind tag of this variant.
    fn kind(&self) -> OperationKind;

    /// Primary input path, when the variant has one.
    fn source(&self) -> Option<&Path>;

    /// Primary output path, when the variant has one.
    fn target(&self) -> Option<&Path>;

    /// The digests captured so far.
    fn checksum_data(&self) -> &ChecksumData;
}

/// A planned filesystem mutation, one of six kinds.
///
/// Constructed through the factory methods (or directly from the concrete
/// op structs), enqueued on an
/// [`OperationQueue`](crate::core::queue::OperationQueue), and driven
/// through its lifecycle by the
/// [`BatchProcessor`](crate::core::processor::BatchProcessor).
#[derive(Debug)]
pub enum Operation {
    /// Create a file with given content
    CreateFile(CreateFileOp),
    /// Create a directory
    CreateDirectory(CreateDirectoryOp),
    /// Copy a regular file
    CopyFile(CopyFileOp),
    /// Move a file, directory, or symlink
    Move(MoveOp),
    /// Create a symbolic link
    Symlink(SymlinkOp),
    /// Delete a file, empty directory, or symlink
    Delete(DeleteOp),
}

impl Operation {
    /// Plan the creation of a file at `target`.
    pub fn create_file(target: impl Into<PathBuf>, options: CreateFileOptions) -> Self {
        Operation::CreateFile(CreateFileOp::new(target, options))
    }

    /// Plan the creation of a directory at `target`.
    pub fn create_directory(target: impl Into<PathBuf>, options: CreateDirectoryOptions) -> Self {
        Operation::CreateDirectory(CreateDirectoryOp::new(target, options))
    }

    /// Plan a copy of the regular file at `source` to `target`.
    pub fn copy_file(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: CopyFileOptions,
    ) -> Self {
        Operation::CopyFile(CopyFileOp::new(source, target, options))
    }

    /// Plan a move of `source` to `target`.
    pub fn move_item(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: MoveOptions,
    ) -> Self {
        Operation::Move(MoveOp::new(source, target, options))
    }

    /// Plan a symbolic link at `target` whose link text is `source`.
    pub fn symlink(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: SymlinkOptions,
    ) -> Self {
        Operation::Symlink(SymlinkOp::new(source, target, options))
    }

    /// Plan the removal of `source`.
    pub fn delete(source: impl Into<PathBuf>, options: DeleteOptions) -> Self {
        Operation::Delete(DeleteOp::new(source, options))
    }

    fn inner(&self) -> &dyn FsOperation {
        match self {
            Operation::CreateFile(op) => op,
            Operation::CreateDirectory(op) => op,
            Operation::CopyFile(op) => op,
            Operation::Move(op) => op,
            Operation::Symlink(op) => op,
            Operation::Delete(op) => op,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FsOperation {
        match self {
            Operation::CreateFile(op) => op,
            Operation::CreateDirectory(op) => op,
            Operation::CopyFile(op) => op,
            Operation::Move(op) => op,
            Operation::Symlink(op) => op,
            Operation::Delete(op) => op,
        }
    }
}

impl FsOperation for Operation {
    fn validate(&mut self) -> Result<()> {
        self.inner_mut().validate()
    }

    fn execute(&mut self) -> Result<()> {
        self.inner_mut().execute()
    }

    fn undo(&mut self) -> Result<()> {
        self.inner_mut().undo()
    }

    fn verify_checksums(&mut self) -> Result<()> {
        self.inner_mut().verify_checksums()
    }

    fn kind(&self) -> OperationKind {
        self.inner().kind()
    }

    fn source(&self) -> Option<&Path> {
        self.inner().source()
    }

    fn target(&self) -> Option<&Path> {
        self.inner().target()
    }

    fn checksum_data(&self) -> &ChecksumData {
        self.inner().checksum_data()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.source(), self.target()) {
            (Some(source), Some(target)) => {
                write!(f, "{} {} -> {}", self.kind(), source.display(), target.display())
            }
            (Some(source), None) => write!(f, "{} {}", self.kind(), source.display()),
            (None, Some(target)) => write!(f, "{} {}", self.kind(), target.display()),
            (None, None) => write!(f, "{}", self.kind()),
        }
    }
}
