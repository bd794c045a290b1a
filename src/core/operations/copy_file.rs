//! Checksum-verified copy of a regular file.
//!
//! The source digest is captured when the copy is planned; re-validation
//! detects a source that drifted between planning and execution, and the
//! digest of the landed file must match before the copy counts as done. A
//! target that already existed and was overwritten is NOT snapshotted, so
//! `undo` removes the copy without restoring what it replaced.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::operations::{ChecksumData, FsOperation, OperationKind};
use crate::core::{checksum, fs_util, permissions};
use crate::{Result, error::FsynthError};

const KIND: &str = "CopyFile";

/// Configuration for a [`CopyFileOp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFileOptions {
    /// Replace an existing file at the destination (default false)
    pub overwrite: bool,
    /// Create missing parent directories (default false)
    pub create_parent_dirs: bool,
    /// Carry permission bits along with the contents (default true)
    pub preserve_attributes: bool,
    /// Permission mode to apply after the copy, three octal digits
    pub mode: Option<String>,
}

impl Default for CopyFileOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            create_parent_dirs: false,
            preserve_attributes: true,
            mode: None,
        }
    }
}

/// Copies a regular file from `source` to `target`.
///
/// A `target` that exists as a directory resolves to
/// `target/basename(source)` (copy-into).
#[derive(Debug)]
pub struct CopyFileOp {
    source: PathBuf,
    target: PathBuf,
    options: CopyFileOptions,
    checksums: ChecksumData,
    effective_target: Option<PathBuf>,
}

impl CopyFileOp {
    /// Plan a copy of `source` to `target`.
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: CopyFileOptions,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            options,
            checksums: ChecksumData::default(),
            effective_target: None,
        }
    }

    /// The destination the copy actually lands at, after copy-into
    /// resolution.
    pub fn effective_target(&self) -> Option<&Path> {
        self.effective_target.as_deref()
    }

    fn resolve_effective_target(&self) -> PathBuf {
        if fs_util::is_dir(&self.target)
            && let Some(name) = self.source.file_name()
        {
            return self.target.join(name);
        }
        self.target.clone()
    }
}

impl FsOperation for CopyFileOp {
    fn validate(&mut self) -> Result<()> {
        if !fs_util::exists_no_follow(&self.source) {
            return Err(FsynthError::validation(KIND, &self.source, "source file not found"));
        }
        if !fs_util::is_file(&self.source) {
            return Err(FsynthError::validation(
                KIND,
                &self.source,
                "source is not a regular file",
            ));
        }
        if !permissions::is_readable(&self.source) {
            return Err(FsynthError::permission_denied(
                KIND,
                &self.source,
                "source is not readable",
            ));
        }
        let current = checksum::checksum_file(&self.source).map_err(|err| {
            FsynthError::validation(
                KIND,
                &self.source,
                format!("could not checksum source: {}", err),
            )
        })?;
        self.checksums.source_checksum = Some(current.clone());
        match &self.checksums.initial_source_checksum {
            None => self.checksums.initial_source_checksum = Some(current),
            Some(initial) if *initial != current => {
                return Err(FsynthError::checksum_mismatch(
                    KIND,
                    &self.source,
                    initial.clone(),
                    current,
                ));
            }
            Some(_) => {}
        }
        let effective = self.resolve_effective_target();
        if fs_util::exists_no_follow(&effective) {
            if fs_util::is_dir(&effective) {
                return Err(FsynthError::validation(
                    KIND,
                    &effective,
                    "target is a directory",
                ));
            }
            if !self.options.overwrite {
                return Err(FsynthError::validation(KIND, &effective, "target already exists"));
            }
        } else if !self.options.create_parent_dirs
            && let Some(parent) = effective.parent().filter(|p| !p.as_os_str().is_empty())
            && !fs_util::is_dir(parent)
        {
            return Err(FsynthError::validation(
                KIND,
                &effective,
                format!("parent directory {} does not exist", parent.display()),
            ));
        }
        self.effective_target = Some(effective);
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let effective = self.resolve_effective_target();
        self.effective_target = Some(effective.clone());
        if fs_util::exists_no_follow(&effective) {
            if fs_util::is_dir(&effective) {
                return Err(FsynthError::execution(KIND, &effective, "target is a directory"));
            }
            if !self.options.overwrite {
                return Err(FsynthError::execution(KIND, &effective, "target already exists"));
            }
        }
        if self.options.create_parent_dirs
            && let Some(parent) = effective.parent().filter(|p| !p.as_os_str().is_empty())
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
        fs_util::copy_file(&self.source, &effective, self.options.preserve_attributes).map_err(
            |err| FsynthError::execution(KIND, &effective, format!("copy failed: {}", err)),
        )?;
        let digest = match checksum::checksum_file(&effective) {
            Ok(digest) => digest,
            Err(err) => {
                let _ = fs::remove_file(&effective);
                return Err(FsynthError::execution(
                    KIND,
                    &effective,
                    format!("could not checksum copied file: {}", err),
                ));
            }
        };
        if let Some(initial) = &self.checksums.initial_source_checksum
            && *initial != digest
        {
            let _ = fs::remove_file(&effective);
            return Err(FsynthError::checksum_mismatch(
                KIND,
                &effective,
                initial.clone(),
                digest,
            ));
        }
        self.checksums.target_checksum = Some(digest);
        debug!("copied {} -> {}", self.source.display(), effective.display());
        if let Some(mode) = &self.options.mode
            && let Err(err) = permissions::set_mode(&effective, mode)
        {
            warn!("could not set mode {} on {}: {}", mode, effective.display(), err);
        }
        Ok(())
    }

    fn undo(&mut self) -> Result<()> {
        let Some(expected) = self.checksums.target_checksum.clone() else {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                "no copy checksum recorded",
            ));
        };
        let Some(effective) = self.effective_target.clone() else {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                "copy destination was never resolved",
            ));
        };
        if !fs_util::exists_no_follow(&effective) {
            debug!("{} already removed, nothing to undo", effective.display());
            return Ok(());
        }
        let actual = checksum::checksum_file(&effective).map_err(|err| {
            FsynthError::undo_precluded(
                KIND,
                &effective,
                format!("could not checksum file: {}", err),
            )
        })?;
        if actual != expected {
            return Err(FsynthError::undo_precluded(
                KIND,
                &effective,
                format!(
                    "copied file changed since operation (expected {}, found {})",
                    expected, actual
                ),
            ));
        }
        fs::remove_file(&effective).map_err(|err| {
            FsynthError::execution(KIND, &effective, format!("could not remove file: {}", err))
        })?;
        debug!("removed copied file {}", effective.display());
        Ok(())
    }

    fn verify_checksums(&mut self) -> Result<()> {
        let Some(initial) = self.checksums.initial_source_checksum.clone() else {
            return Ok(());
        };
        let current = checksum::checksum_file(&self.source).map_err(|err| {
            FsynthError::validation(
                KIND,
                &self.source,
                format!("could not checksum source: {}", err),
            )
        })?;
        if current != initial {
            return Err(FsynthError::checksum_mismatch(KIND, &self.source, initial, current));
        }
        Ok(())
    }

    fn kind(&self) -> OperationKind {
        OperationKind::CopyFile
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

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_records_matching_checksums() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s");
        let target = temp.path().join("d");
        fs::write(&source, b"ABCDE").unwrap();
        let mut copy = CopyFileOp::new(&source, &target, CopyFileOptions::default());
        copy.validate().unwrap();
        copy.execute().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"ABCDE");
        let data = copy.checksum_data();
        assert_eq!(data.target_checksum, data.initial_source_checksum);
        copy.undo().unwrap();
        assert!(!target.exists());
        assert_eq!(fs::read(&source).unwrap(), b"ABCDE");
    }

    #[test]
    fn test_revalidation_detects_source_drift() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s");
        fs::write(&source, b"before").unwrap();
        let mut copy = CopyFileOp::new(&source, temp.path().join("d"), CopyFileOptions::default());
        copy.validate().unwrap();
        // Stable when the source is unchanged.
        copy.validate().unwrap();
        fs::write(&source, b"after").unwrap();
        assert!(matches!(
            copy.validate(),
            Err(FsynthError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_copy_into_directory_resolves_basename() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s.txt");
        let dest_dir = temp.path().join("dest");
        fs::write(&source, b"X").unwrap();
        fs::create_dir(&dest_dir).unwrap();
        let mut copy = CopyFileOp::new(&source, &dest_dir, CopyFileOptions::default());
        copy.validate().unwrap();
        copy.execute().unwrap();
        assert_eq!(copy.effective_target().unwrap(), dest_dir.join("s.txt"));
        assert_eq!(fs::read(dest_dir.join("s.txt")).unwrap(), b"X");
    }

    #[test]
    fn test_existing_target_requires_overwrite() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s");
        let target = temp.path().join("d");
        fs::write(&source, b"new").unwrap();
        fs::write(&target, b"old").unwrap();
        let mut copy = CopyFileOp::new(&source, &target, CopyFileOptions::default());
        assert!(copy.validate().is_err());

        let mut forced = CopyFileOp::new(
            &source,
            &target,
            CopyFileOptions {
                overwrite: true,
                ..Default::default()
            },
        );
        forced.validate().unwrap();
        forced.execute().unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        // Undo removes the copy; the overwritten original is not restored.
        forced.undo().unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn test_missing_source_fails_validation() {
        let temp = TempDir::new().unwrap();
        let mut copy = CopyFileOp::new(
            temp.path().join("absent"),
            temp.path().join("d"),
            CopyFileOptions::default(),
        );
        assert!(copy.validate().is_err());
    }

    #[test]
    fn test_undo_refuses_drifted_copy() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s");
        let target = temp.path().join("d");
        fs::write(&source, b"data").unwrap();
        let mut copy = CopyFileOp::new(&source, &target, CopyFileOptions::default());
        copy.validate().unwrap();
        copy.execute().unwrap();
        fs::write(&target, b"edited afterwards").unwrap();
        let err = copy.undo().unwrap_err();
        assert!(err.to_string().contains("changed since operation"));
        assert!(target.exists());
    }

    #[test]
    fn test_verify_checksums_hook() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("s");
        fs::write(&source, b"v1").unwrap();
        let mut copy = CopyFileOp::new(&source, temp.path().join("d"), CopyFileOptions::default());
        copy.validate().unwrap();
        copy.verify_checksums().unwrap();
        fs::write(&source, b"v2").unwrap();
        assert!(copy.verify_checksums().is_err());
    }
}
