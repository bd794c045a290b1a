//! Directory creation, idempotent by default.
//!
//! An already-existing directory is accepted unless `exclusive` is set; the
//! `dir_actually_created_by_this_op` flag records whether this operation was
//! the one that created it, and `undo` only ever removes a directory this
//! operation created and only while it is empty.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::operations::{ChecksumData, FsOperation, OperationKind};
use crate::core::{fs_util, permissions};
use crate::{Result, error::FsynthError};

const KIND: &str = "CreateDirectory";

/// Configuration for a [`CreateDirectoryOp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectoryOptions {
    /// Create missing parent directories (default true)
    pub create_parent_dirs: bool,
    /// Fail when the directory already exists (default false)
    pub exclusive: bool,
    /// Permission mode to apply after creation, three octal digits
    pub mode: Option<String>,
}

impl Default for CreateDirectoryOptions {
    fn default() -> Self {
        Self {
            create_parent_dirs: true,
            exclusive: false,
            mode: None,
        }
    }
}

/// Creates a directory at `target`.
#[derive(Debug)]
pub struct CreateDirectoryOp {
    target: PathBuf,
    options: CreateDirectoryOptions,
    checksums: ChecksumData,
    dir_actually_created: bool,
}

impl CreateDirectoryOp {
    /// Plan the creation of a directory at `target`.
    pub fn new(target: impl Into<PathBuf>, options: CreateDirectoryOptions) -> Self {
        Self {
            target: target.into(),
            options,
            checksums: ChecksumData::default(),
            dir_actually_created: false,
        }
    }

    /// Whether `execute` was the call that created the directory.
    pub fn dir_actually_created_by_this_op(&self) -> bool {
        self.dir_actually_created
    }

    fn parent(&self) -> Option<&Path> {
        self.target.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

impl FsOperation for CreateDirectoryOp {
    fn validate(&mut self) -> Result<()> {
        if self.target.as_os_str().is_empty() {
            return Err(FsynthError::validation(KIND, &self.target, "target path is empty"));
        }
        if fs_util::exists_no_follow(&self.target) {
            if !fs_util::is_dir(&self.target) || fs_util::is_symlink(&self.target) {
                return Err(FsynthError::validation(
                    KIND,
                    &self.target,
                    "path exists and is not a directory",
                ));
            }
            if self.options.exclusive {
                return Err(FsynthError::validation(
                    KIND,
                    &self.target,
                    "directory already exists",
                ));
            }
        } else if !self.options.create_parent_dirs
            && let Some(parent) = self.parent()
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
        if fs_util::is_dir(&self.target) && !fs_util::is_symlink(&self.target) {
            if self.options.exclusive {
                return Err(FsynthError::execution(
                    KIND,
                    &self.target,
                    "directory already exists",
                ));
            }
            self.dir_actually_created = false;
            debug!("{} already exists, nothing to create", self.target.display());
            return Ok(());
        }
        if fs_util::exists_no_follow(&self.target) {
            return Err(FsynthError::execution(
                KIND,
                &self.target,
                "path exists and is not a directory",
            ));
        }
        let created = if self.options.create_parent_dirs {
            fs_util::mkpath(&self.target)
        } else {
            fs::create_dir(&self.target)
        };
        created.map_err(|err| {
            FsynthError::execution(
                KIND,
                &self.target,
                format!("could not create directory: {}", err),
            )
        })?;
        self.dir_actually_created = true;
        debug!("created directory {}", self.target.display());
        if let Some(mode) = &self.options.mode
            && let Err(err) = permissions::set_mode(&self.target, mode)
        {
            warn!(
                "could not set mode {} on {}: {}",
                mode,
                self.target.display(),
                err
            );
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<()> {
        if !self.dir_actually_created {
            return Ok(());
        }
        if !fs_util::exists_no_follow(&self.target) {
            debug!(
                "{} already removed, nothing to undo",
                self.target.display()
            );
            self.dir_actually_created = false;
            return Ok(());
        }
        if !fs_util::is_dir(&self.target) {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                "path is no longer a directory",
            ));
        }
        let entries = fs::read_dir(&self.target)
            .map_err(|err| {
                FsynthError::undo_precluded(
                    KIND,
                    &self.target,
                    format!("could not list directory: {}", err),
                )
            })?
            .count();
        if entries > 0 {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                format!("directory is not empty ({} entries remain)", entries),
            ));
        }
        fs::remove_dir(&self.target).map_err(|err| {
            FsynthError::execution(
                KIND,
                &self.target,
                format!("could not remove directory: {}", err),
            )
        })?;
        debug!("removed created directory {}", self.target.display());
        self.dir_actually_created = false;
        Ok(())
    }

    fn kind(&self) -> OperationKind {
        OperationKind::CreateDirectory
    }

    fn source(&self) -> Option<&Path> {
        None
    }

    fn target(&self) -> Option<&Path> {
        Some(&self.target)
    }

    fn checksum_data(&self) -> &ChecksumData {
        &self.checksums
    }
}
