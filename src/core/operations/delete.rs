//! Snapshot-backed removal of a file, empty directory, or symbolic link.
//!
//! Validation classifies the path and captures whatever `undo` will need:
//! file bytes and their digest, or a link's target text. Only empty
//! directories are removed; `is_recursive` relaxes the emptiness check at
//! validation but never empties a directory. A path that is already gone at
//! execute time is a tolerant success.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::operations::{ChecksumData, FsOperation, ItemType, OperationKind, classify};
use crate::core::{checksum, fs_util};
use crate::{Result, error::FsynthError};

const KIND: &str = "Delete";

/// Configuration for a [`DeleteOp`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Skip the directory-emptiness check at validation (default false).
    /// Directory contents are never deleted by this operation.
    pub is_recursive: bool,
}

/// Removes the item at `source`.
#[derive(Debug)]
pub struct DeleteOp {
    source: PathBuf,
    options: DeleteOptions,
    checksums: ChecksumData,
    item_type: Option<ItemType>,
    original_content: Option<Vec<u8>>,
    original_link_target: Option<String>,
    item_actually_deleted: bool,
}

impl DeleteOp {
    /// Plan the removal of `source`.
    pub fn new(source: impl Into<PathBuf>, options: DeleteOptions) -> Self {
        Self {
            source: source.into(),
            options,
            checksums: ChecksumData::default(),
            item_type: None,
            original_content: None,
            original_link_target: None,
            item_actually_deleted: false,
        }
    }

    /// Whether `execute` removed anything.
    pub fn item_actually_deleted(&self) -> bool {
        self.item_actually_deleted
    }

    /// The classification captured during validation.
    pub fn item_type(&self) -> Option<ItemType> {
        self.item_type
    }
}

impl FsOperation for DeleteOp {
    fn validate(&mut self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(FsynthError::validation(KIND, &self.source, "source path is empty"));
        }
        // A missing path is tolerated: execute reports a no-op success.
        let Some(item) = classify(&self.source) else {
            self.item_type = None;
            return Ok(());
        };
        self.item_type = Some(item);
        match item {
            ItemType::File => match fs_util::read_entire_file(&self.source) {
                Ok(bytes) => {
                    self.checksums.original_checksum = Some(checksum::checksum_bytes(&bytes));
                    self.original_content = Some(bytes);
                }
                Err(err) => {
                    warn!(
                        "could not snapshot {} before delete: {}",
                        self.source.display(),
                        err
                    );
                    self.original_content = Some(Vec::new());
                    self.checksums.original_checksum = None;
                }
            },
            ItemType::Directory => {
                if !self.options.is_recursive {
                    let entries = fs::read_dir(&self.source)
                        .map_err(|err| {
                            FsynthError::validation(
                                KIND,
                                &self.source,
                                format!("could not list directory: {}", err),
                            )
                        })?
                        .count();
                    if entries > 0 {
                        return Err(FsynthError::validation(
                            KIND,
                            &self.source,
                            format!("directory is not empty ({} entries)", entries),
                        ));
                    }
                }
            }
            ItemType::Symlink => {
                // None for a link whose text cannot be read; strict undo
                // will refuse to fabricate one.
                self.original_link_target = fs_util::read_link_text(&self.source).ok();
            }
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let Ok(meta) = fs::symlink_metadata(&self.source) else {
            self.item_actually_deleted = false;
            debug!("{} already gone, nothing to delete", self.source.display());
            return Ok(());
        };
        let removed = if meta.file_type().is_dir() && !meta.file_type().is_symlink() {
            fs::remove_dir(&self.source)
        } else {
            // Targets the link itself for symlinks, never the referent.
            fs::remove_file(&self.source)
        };
        removed.map_err(|err| {
            FsynthError::execution(KIND, &self.source, format!("could not remove: {}", err))
        })?;
        self.item_actually_deleted = true;
        debug!("deleted {}", self.source.display());
        Ok(())
    }

    fn undo(&mut self) -> Result<()> {
        if !self.item_actually_deleted {
            return Ok(());
        }
        if fs_util::exists_no_follow(&self.source) {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.source,
                "path is occupied",
            ));
        }
        match self.item_type {
            Some(ItemType::Directory) => {
                fs::create_dir(&self.source).map_err(|err| {
                    FsynthError::execution(
                        KIND,
                        &self.source,
                        format!("could not recreate directory: {}", err),
                    )
                })?;
            }
            Some(ItemType::Symlink) => {
                let Some(text) = self.original_link_target.clone() else {
                    return Err(FsynthError::undo_precluded(
                        KIND,
                        &self.source,
                        "link target was not captured",
                    ));
                };
                fs_util::create_symlink(&text, &self.source).map_err(|err| {
                    FsynthError::execution(
                        KIND,
                        &self.source,
                        format!("could not recreate link: {}", err),
                    )
                })?;
            }
            Some(ItemType::File) => {
                let Some(bytes) = self.original_content.as_deref() else {
                    return Err(FsynthError::undo_precluded(
                        KIND,
                        &self.source,
                        "content snapshot missing",
                    ));
                };
                fs_util::write_entire_file(&self.source, bytes).map_err(|err| {
                    FsynthError::execution(
                        KIND,
                        &self.source,
                        format!("could not rewrite file: {}", err),
                    )
                })?;
                if let Some(expected) = &self.checksums.original_checksum
                    && let Ok(restored) = checksum::checksum_file(&self.source)
                    && restored != *expected
                {
                    warn!(
                        "restored {} has checksum {} (expected {})",
                        self.source.display(),
                        restored,
                        expected
                    );
                }
            }
            None => {
                return Err(FsynthError::undo_precluded(
                    KIND,
                    &self.source,
                    "no snapshot captured before deletion",
                ));
            }
        }
        debug!("restored deleted {}", self.source.display());
        self.item_actually_deleted = false;
        Ok(())
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Delete
    }

    fn source(&self) -> Option<&Path> {
        Some(&self.source)
    }

    fn target(&self) -> Option<&Path> {
        None
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
    fn test_delete_file_and_restore() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f.txt");
        fs::write(&path, b"snapshot me").unwrap();
        let mut delete = DeleteOp::new(&path, DeleteOptions::default());
        delete.validate().unwrap();
        assert_eq!(delete.item_type(), Some(ItemType::File));
        assert!(delete.checksum_data().original_checksum.is_some());
        delete.execute().unwrap();
        assert!(!path.exists());
        assert!(delete.item_actually_deleted());
        delete.undo().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"snapshot me");
        // Flag cleared, second undo is harmless.
        delete.undo().unwrap();
    }

    #[test]
    fn test_delete_empty_directory_and_restore() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("d");
        fs::create_dir(&dir).unwrap();
        let mut delete = DeleteOp::new(&dir, DeleteOptions::default());
        delete.validate().unwrap();
        delete.execute().unwrap();
        assert!(!dir.exists());
        delete.undo().unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn test_non_empty_directory_fails_validation() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("full");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("kid"), b"x").unwrap();
        let mut delete = DeleteOp::new(&dir, DeleteOptions::default());
        assert!(delete.validate().is_err());

        // is_recursive relaxes validation but never empties the directory,
        // so execution still fails on the OS primitive.
        let mut relaxed = DeleteOp::new(&dir, DeleteOptions { is_recursive: true });
        relaxed.validate().unwrap();
        assert!(relaxed.execute().is_err());
        assert!(dir.join("kid").exists());
    }

    #[test]
    fn test_missing_path_is_tolerant_success() {
        let temp = TempDir::new().unwrap();
        let mut delete = DeleteOp::new(temp.path().join("ghost"), DeleteOptions::default());
        delete.validate().unwrap();
        delete.execute().unwrap();
        assert!(!delete.item_actually_deleted());
        delete.undo().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_symlink_and_restore() {
        let temp = TempDir::new().unwrap();
        let referent = temp.path().join("real");
        let link = temp.path().join("link");
        fs::write(&referent, b"kept").unwrap();
        std::os::unix::fs::symlink(&referent, &link).unwrap();
        let mut delete = DeleteOp::new(&link, DeleteOptions::default());
        delete.validate().unwrap();
        assert_eq!(delete.item_type(), Some(ItemType::Symlink));
        delete.execute().unwrap();
        assert!(!fs_util::exists_no_follow(&link));
        // The referent is never followed.
        assert_eq!(fs::read(&referent).unwrap(), b"kept");
        delete.undo().unwrap();
        assert!(fs_util::is_symlink(&link));
        assert_eq!(fs::read_link(&link).unwrap(), referent);
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_broken_symlink() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("broken");
        std::os::unix::fs::symlink("/nonexistent/referent", &link).unwrap();
        let mut delete = DeleteOp::new(&link, DeleteOptions::default());
        delete.validate().unwrap();
        delete.execute().unwrap();
        assert!(!fs_util::exists_no_follow(&link));
        delete.undo().unwrap();
        assert_eq!(
            fs_util::read_link_text(&link).unwrap(),
            "/nonexistent/referent"
        );
    }

    #[test]
    fn test_undo_refuses_occupied_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("f");
        fs::write(&path, b"first").unwrap();
        let mut delete = DeleteOp::new(&path, DeleteOptions::default());
        delete.validate().unwrap();
        delete.execute().unwrap();
        fs::write(&path, b"squatter").unwrap();
        assert!(matches!(
            delete.undo(),
            Err(FsynthError::UndoPrecluded { .. })
        ));
    }
}
