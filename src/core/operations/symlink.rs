//! Symbolic link creation with overwritten-target restoration.
//!
//! The link text is written exactly as given; the caller chooses absolute vs
//! relative. This is the only variant that snapshots an item it overwrites:
//! a regular file's bytes or an existing link's target text are captured
//! during validation and written back by `undo`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::operations::{ChecksumData, FsOperation, OperationKind};
use crate::core::fs_util;
use crate::{Result, error::FsynthError};

const KIND: &str = "Symlink";

/// Configuration for a [`SymlinkOp`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymlinkOptions {
    /// Replace an existing non-directory item at the link path (default false)
    pub overwrite: bool,
    /// Create missing parent directories (default false)
    pub create_parent_dirs: bool,
}

/// Snapshot of the item that stood at the link path before `overwrite`.
#[derive(Debug, Clone)]
pub enum OverwrittenTarget {
    /// A regular file's bytes
    File(Vec<u8>),
    /// A prior symlink's target text
    Symlink(String),
}

/// Creates a symbolic link at `target` whose link text is `source`.
#[derive(Debug)]
pub struct SymlinkOp {
    source: PathBuf,
    target: PathBuf,
    options: SymlinkOptions,
    checksums: ChecksumData,
    original_target: Option<OverwrittenTarget>,
    link_actually_created: bool,
}

impl SymlinkOp {
    /// Plan a symbolic link at `target` pointing at `source`.
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: SymlinkOptions,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            options,
            checksums: ChecksumData::default(),
            original_target: None,
            link_actually_created: false,
        }
    }

    /// Whether an existing item at the link path was snapshotted during
    /// validation.
    pub fn original_target_was_file(&self) -> bool {
        matches!(self.original_target, Some(OverwrittenTarget::File(_)))
    }

    /// Whether the snapshotted item was itself a symlink.
    pub fn original_target_was_symlink(&self) -> bool {
        matches!(self.original_target, Some(OverwrittenTarget::Symlink(_)))
    }
}

impl FsOperation for SymlinkOp {
    fn validate(&mut self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(FsynthError::validation(KIND, &self.target, "link target text is empty"));
        }
        if self.target.as_os_str().is_empty() {
            return Err(FsynthError::validation(KIND, &self.target, "link path is empty"));
        }
        if fs_util::exists_no_follow(&self.target) {
            if fs_util::is_dir(&self.target) && !fs_util::is_symlink(&self.target) {
                return Err(FsynthError::validation(
                    KIND,
                    &self.target,
                    "link path is a directory",
                ));
            }
            if !self.options.overwrite {
                return Err(FsynthError::validation(
                    KIND,
                    &self.target,
                    "link path already exists",
                ));
            }
            if fs_util::is_symlink(&self.target) {
                let text = fs_util::read_link_text(&self.target).map_err(|err| {
                    FsynthError::validation(
                        KIND,
                        &self.target,
                        format!("could not read existing link: {}", err),
                    )
                })?;
                self.original_target = Some(OverwrittenTarget::Symlink(text));
            } else if fs_util::is_file(&self.target) {
                let bytes = fs_util::read_entire_file(&self.target).map_err(|err| {
                    FsynthError::validation(
                        KIND,
                        &self.target,
                        format!("could not snapshot existing file: {}", err),
                    )
                })?;
                self.original_target = Some(OverwrittenTarget::File(bytes));
            }
        } else if !self.options.create_parent_dirs
            && let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty())
            && !fs_util::is_dir(parent)
        {
            return Err(FsynthError::validation(
                KIND,
                &self.target,
                format!("parent directory {} does not exist", parent.display()),
            ));
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        if self.options.create_parent_dirs
            && let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty())
            && !fs_util::exists_no_follow(parent)
        {
            fs_util::mkpath(parent).map_err(|err| {
                FsynthError::execution(
                    KIND,
                    parent,
                    format!("could not create parent directories: {}", err),
                )
            })?;
        }
        if fs_util::exists_no_follow(&self.target) {
            if fs_util::is_dir(&self.target) && !fs_util::is_symlink(&self.target) {
                return Err(FsynthError::execution(KIND, &self.target, "link path is a directory"));
            }
            if !self.options.overwrite {
                return Err(FsynthError::execution(
                    KIND,
                    &self.target,
                    "link path already exists",
                ));
            }
            // Targets the existing link or file itself, never a referent.
            fs::remove_file(&self.target).map_err(|err| {
                FsynthError::execution(
                    KIND,
                    &self.target,
                    format!("could not remove existing item: {}", err),
                )
            })?;
        }
        fs_util::create_symlink(&self.source, &self.target).map_err(|err| {
            FsynthError::execution(KIND, &self.target, format!("could not create link: {}", err))
        })?;
        self.link_actually_created = true;
        debug!(
            "created link {} -> {}",
            self.target.display(),
            self.source.display()
        );
        Ok(())
    }

    fn undo(&mut self) -> Result<()> {
        if !self.link_actually_created {
            return Ok(());
        }
        if fs_util::exists_no_follow(&self.target) {
            if !fs_util::is_symlink(&self.target) {
                return Err(FsynthError::undo_precluded(
                    KIND,
                    &self.target,
                    "link was replaced by a non-symlink",
                ));
            }
            fs::remove_file(&self.target).map_err(|err| {
                FsynthError::execution(
                    KIND,
                    &self.target,
                    format!("could not remove link: {}", err),
                )
            })?;
        } else {
            warn!(
                "link {} already removed, restoring snapshot only",
                self.target.display()
            );
        }
        match &self.original_target {
            Some(OverwrittenTarget::File(bytes)) => {
                fs_util::write_entire_file(&self.target, bytes).map_err(|err| {
                    FsynthError::undo_precluded(
                        KIND,
                        &self.target,
                        format!("could not restore overwritten file: {}", err),
                    )
                })?;
                debug!("restored overwritten file {}", self.target.display());
            }
            Some(OverwrittenTarget::Symlink(text)) => {
                fs_util::create_symlink(text, &self.target).map_err(|err| {
                    FsynthError::undo_precluded(
                        KIND,
                        &self.target,
                        format!("could not restore overwritten link: {}", err),
                    )
                })?;
                debug!("restored overwritten link {}", self.target.display());
            }
            None => {}
        }
        self.link_actually_created = false;
        Ok(())
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Symlink
    }

    fn source(&self) -> Option<&Path> {
        Some(&self.source)
    }

    fn target(&self) -> Option<&Path> {
        Some(&self.target)
    }

    fn checksum_data(&self) -> &ChecksumData {
        &self.checksums
    }
}
