//! Exclusive file creation.
//!
//! Writes a new file with caller-supplied content, failing when anything
//! already exists at the target. The digest of the written file is recorded
//! so `undo` only removes the file it created, never content someone else
//! changed afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::operations::{ChecksumData, FsOperation, OperationKind};
use crate::core::{checksum, fs_util, permissions};
use crate::{Result, error::FsynthError};

const KIND: &str = "CreateFile";

/// Configuration for a [`CreateFileOp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileOptions {
    /// Content to write, exactly these bytes (default empty)
    pub content: String,
    /// Create missing parent directories (default false)
    pub create_parent_dirs: bool,
    /// Permission mode to apply after creation, three octal digits
    pub mode: Option<String>,
}

impl Default for CreateFileOptions {
    fn default() -> Self {
        Self {
            content: String::new(),
            create_parent_dirs: false,
            mode: None,
        }
    }
}

/// Creates a file at `target` exclusively.
#[derive(Debug)]
pub struct CreateFileOp {
    target: PathBuf,
    options: CreateFileOptions,
    checksums: ChecksumData,
}

impl CreateFileOp {
    /// Plan the creation of a file at `target`.
    pub fn new(target: impl Into<PathBuf>, options: CreateFileOptions) -> Self {
        Self {
            target: target.into(),
            options,
            checksums: ChecksumData::default(),
        }
    }

    fn parent(&self) -> Option<&Path> {
        self.target.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

impl FsOperation for CreateFileOp {
    fn validate(&mut self) -> Result<()> {
        if self.target.as_os_str().is_empty() {
            return Err(FsynthError::validation(KIND, &self.target, "target path is empty"));
        }
        if !self.options.create_parent_dirs
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
        if let Some(parent) = self.parent() {
            // The immediate parent may not exist yet when parents are being
            // created, so probe the closest ancestor that does.
            let probe = if fs_util::exists_no_follow(parent) {
                parent.to_path_buf()
            } else {
                fs_util::nearest_existing_ancestor(parent).unwrap_or_else(|| parent.to_path_buf())
            };
            if !permissions::is_writable(&probe) {
                return Err(FsynthError::permission_denied(
                    KIND,
                    &probe,
                    "parent directory is not writable",
                ));
            }
        }
        if fs_util::exists_no_follow(&self.target) {
            return Err(FsynthError::execution(KIND, &self.target, "target already exists"));
        }
        if self.options.create_parent_dirs
            && let Some(parent) = self.parent()
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
        fs_util::write_entire_file(&self.target, self.options.content.as_bytes()).map_err(
            |err| FsynthError::execution(KIND, &self.target, format!("could not write file: {}", err)),
        )?;
        match checksum::checksum_file(&self.target) {
            Ok(digest) => self.checksums.target_checksum = Some(digest),
            Err(err) => {
                let _ = fs::remove_file(&self.target);
                return Err(FsynthError::execution(
                    KIND,
                    &self.target,
                    format!("could not checksum created file: {}", err),
                ));
            }
        }
        debug!("created file {}", self.target.display());
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
        let Some(expected) = self.checksums.target_checksum.clone() else {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                "no creation checksum recorded",
            ));
        };
        if !fs_util::exists_no_follow(&self.target) {
            debug!(
                "{} already removed, nothing to undo",
                self.target.display()
            );
            return Ok(());
        }
        let actual = checksum::checksum_file(&self.target).map_err(|err| {
            FsynthError::undo_precluded(
                KIND,
                &self.target,
                format!("could not checksum file: {}", err),
            )
        })?;
        if actual != expected {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                format!(
                    "content changed since creation (expected {}, found {})",
                    expected, actual
                ),
            ));
        }
        fs::remove_file(&self.target).map_err(|err| {
            FsynthError::execution(KIND, &self.target, format!("could not remove file: {}", err))
        })?;
        debug!("removed created file {}", self.target.display());
        Ok(())
    }

    fn kind(&self) -> OperationKind {
        OperationKind::CreateFile
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn op(target: &Path, options: CreateFileOptions) -> CreateFileOp {
        CreateFileOp::new(target, options)
    }

    #[test]
    fn test_create_execute_undo_round_trip() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("new.txt");
        let mut create = op(
            &target,
            CreateFileOptions {
                content: "hello".into(),
                ..Default::default()
            },
        );
        create.validate().unwrap();
        create.execute().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"hello");
        assert!(create.checksum_data().target_checksum.is_some());
        create.undo().unwrap();
        assert!(!target.exists());
        // A second undo after the file is gone stays a success.
        create.undo().unwrap();
    }

    #[test]
    fn test_validate_requires_existing_parent() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("missing/new.txt");
        let mut create = op(&target, CreateFileOptions::default());
        assert!(create.validate().is_err());

        let mut with_parents = op(
            &target,
            CreateFileOptions {
                create_parent_dirs: true,
                ..Default::default()
            },
        );
        with_parents.validate().unwrap();
        with_parents.execute().unwrap();
        assert!(target.exists());
    }

    #[test]
    fn test_execute_fails_when_target_exists() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("taken");
        fs::write(&target, b"occupied").unwrap();
        let mut create = op(&target, CreateFileOptions::default());
        create.validate().unwrap();
        let err = create.execute().unwrap_err();
        assert!(err.to_string().contains("already exists"));
        // The occupant is untouched.
        assert_eq!(fs::read(&target).unwrap(), b"occupied");
    }

    #[test]
    fn test_undo_refuses_drifted_content() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("drift.txt");
        let mut create = op(
            &target,
            CreateFileOptions {
                content: "original".into(),
                ..Default::default()
            },
        );
        create.validate().unwrap();
        create.execute().unwrap();
        fs::write(&target, b"tampered").unwrap();
        let err = create.undo().unwrap_err();
        assert!(err.to_string().contains("content changed since creation"));
        assert!(target.exists());
    }

    #[test]
    fn test_undo_without_execute_is_precluded() {
        let temp = TempDir::new().unwrap();
        let mut create = op(&temp.path().join("never.txt"), CreateFileOptions::default());
        assert!(matches!(
            create.undo(),
            Err(FsynthError::UndoPrecluded { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_is_applied() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("mode.txt");
        let mut create = op(
            &target,
            CreateFileOptions {
                mode: Some("600".into()),
                ..Default::default()
            },
        );
        create.validate().unwrap();
        create.execute().unwrap();
        assert_eq!(permissions::get_mode(&target).unwrap(), "600");
    }
}
