//! Move of a file, directory, or symbolic link.
//!
//! The source is classified up front: symlinks are moved as links (never
//! their referent), files are digest-verified at the destination and the
//! physical move is reverted when the digest does not survive, directories
//! ride on the OS rename. A file or link moved onto an existing directory
//! resolves to `target/basename(source)` (move-into). The prior occupant of
//! an `overwrite` move is not snapshotted and is not restored by `undo`.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::operations::{ChecksumData, FsOperation, ItemType, OperationKind, classify};
use crate::core::{checksum, fs_util};
use crate::{Result, error::FsynthError};

const KIND: &str = "Move";

/// Configuration for a [`MoveOp`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveOptions {
    /// Replace an existing item at the destination (default false)
    pub overwrite: bool,
    /// Create missing parent directories (default false)
    pub create_parent_dirs: bool,
}

/// Moves `source` to `target`.
#[derive(Debug)]
pub struct MoveOp {
    source: PathBuf,
    target: PathBuf,
    options: MoveOptions,
    checksums: ChecksumData,
    item_type: Option<ItemType>,
    original_link_target: Option<String>,
    actual_target_path: Option<PathBuf>,
    item_actually_moved: bool,
}

impl MoveOp {
    /// Plan a move of `source` to `target`.
    pub fn new(
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        options: MoveOptions,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            options,
            checksums: ChecksumData::default(),
            item_type: None,
            original_link_target: None,
            actual_target_path: None,
            item_actually_moved: false,
        }
    }

    /// The destination the item actually landed at, after move-into
    /// resolution.
    pub fn actual_target_path(&self) -> Option<&Path> {
        self.actual_target_path.as_deref()
    }

    /// The link text recorded for a symlink source.
    pub fn original_link_target(&self) -> Option<&str> {
        self.original_link_target.as_deref()
    }

    fn resolve_actual_target(&self, item: ItemType) -> PathBuf {
        // Move-into applies to files and links landing in an existing
        // directory; a directory source always lands at `target` itself.
        if item != ItemType::Directory
            && fs_util::is_dir(&self.target)
            && let Some(name) = self.source.file_name()
        {
            return self.target.join(name);
        }
        self.target.clone()
    }

    fn check_destination_conflict(
        &self,
        item: ItemType,
        actual: &Path,
        validation: bool,
    ) -> Result<()> {
        if !fs_util::exists_no_follow(actual) {
            return Ok(());
        }
        let error = |path: &Path, message: String| {
            if validation {
                FsynthError::validation(KIND, path, message)
            } else {
                FsynthError::execution(KIND, path, message)
            }
        };
        if item == ItemType::Directory && fs_util::is_file(actual) {
            return Err(error(actual, "cannot move a directory onto a file".into()));
        }
        if item != ItemType::Directory && fs_util::is_dir(actual) && !fs_util::is_symlink(actual) {
            return Err(error(actual, "target is a directory".into()));
        }
        if !self.options.overwrite {
            return Err(error(actual, "target already exists".into()));
        }
        Ok(())
    }
}

impl FsOperation for MoveOp {
    fn validate(&mut self) -> Result<()> {
        if self.source == self.target {
            return Err(FsynthError::validation(
                KIND,
                &self.source,
                "cannot move a path onto itself",
            ));
        }
        let Some(item) = classify(&self.source) else {
            return Err(FsynthError::validation(KIND, &self.source, "source not found"));
        };
        self.item_type = Some(item);
        match item {
            ItemType::Symlink => {
                // The link itself is what moves, so record its text rather
                // than hashing whatever it points at.
                self.original_link_target = fs_util::read_link_text(&self.source).ok();
            }
            ItemType::File => {
                let digest = checksum::checksum_file(&self.source).map_err(|err| {
                    FsynthError::validation(
                        KIND,
                        &self.source,
                        format!("could not checksum source: {}", err),
                    )
                })?;
                self.checksums.source_checksum = Some(digest.clone());
                if self.checksums.initial_source_checksum.is_none() {
                    self.checksums.initial_source_checksum = Some(digest);
                }
            }
            ItemType::Directory => {}
        }
        let actual = self.resolve_actual_target(item);
        if fs_util::exists_no_follow(&actual) {
            self.check_destination_conflict(item, &actual, true)?;
        } else if !self.options.create_parent_dirs
            && let Some(parent) = actual.parent().filter(|p| !p.as_os_str().is_empty())
            && !fs_util::is_dir(parent)
        {
            return Err(FsynthError::validation(
                KIND,
                &actual,
                format!("parent directory {} does not exist", parent.display()),
            ));
        }
        Ok(())
    }

    fn execute(&mut self) -> Result<()> {
        let Some(item) = self.item_type else {
            return Err(FsynthError::execution(
                KIND,
                &self.source,
                "operation was not validated",
            ));
        };
        if !fs_util::exists_no_follow(&self.source) {
            return Err(FsynthError::execution(KIND, &self.source, "source disappeared"));
        }
        let actual = self.resolve_actual_target(item);
        self.actual_target_path = Some(actual.clone());
        self.check_destination_conflict(item, &actual, false)?;
        if self.options.create_parent_dirs
            && let Some(parent) = actual.parent().filter(|p| !p.as_os_str().is_empty())
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
        fs_util::move_item(&self.source, &actual).map_err(|err| {
            FsynthError::execution(KIND, &actual, format!("move failed: {}", err))
        })?;
        match item {
            ItemType::File => {
                let digest = match checksum::checksum_file(&actual) {
                    Ok(digest) => digest,
                    Err(err) => {
                        let _ = fs_util::move_item(&actual, &self.source);
                        return Err(FsynthError::execution(
                            KIND,
                            &actual,
                            format!("could not checksum moved file: {}", err),
                        ));
                    }
                };
                self.checksums.final_target_checksum = Some(digest.clone());
                if let Some(initial) = &self.checksums.initial_source_checksum
                    && *initial != digest
                {
                    if let Err(err) = fs_util::move_item(&actual, &self.source) {
                        warn!(
                            "could not move {} back to {} after checksum mismatch: {}",
                            actual.display(),
                            self.source.display(),
                            err
                        );
                    }
                    return Err(FsynthError::checksum_mismatch(
                        KIND,
                        &actual,
                        initial.clone(),
                        digest,
                    ));
                }
            }
            ItemType::Symlink => {
                if !fs_util::is_symlink(&actual) {
                    let _ = fs_util::move_item(&actual, &self.source);
                    return Err(FsynthError::execution(
                        KIND,
                        &actual,
                        "link did not survive the move",
                    ));
                }
            }
            ItemType::Directory => {}
        }
        self.item_actually_moved = true;
        debug!("moved {} -> {}", self.source.display(), actual.display());
        Ok(())
    }

    fn undo(&mut self) -> Result<()> {
        if !self.item_actually_moved {
            return Ok(());
        }
        let Some(actual) = self.actual_target_path.clone() else {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.target,
                "moved location was never resolved",
            ));
        };
        if !fs_util::exists_no_follow(&actual) {
            if fs_util::exists_no_follow(&self.source) {
                debug!(
                    "{} already back at {}, nothing to undo",
                    actual.display(),
                    self.source.display()
                );
                self.item_actually_moved = false;
                return Ok(());
            }
            return Err(FsynthError::undo_precluded(
                KIND,
                &actual,
                "moved item is missing",
            ));
        }
        if fs_util::exists_no_follow(&self.source) {
            return Err(FsynthError::undo_precluded(
                KIND,
                &self.source,
                "original source path is occupied",
            ));
        }
        fs_util::move_item(&actual, &self.source).map_err(|err| {
            FsynthError::execution(KIND, &self.source, format!("move back failed: {}", err))
        })?;
        if self.item_type == Some(ItemType::File)
            && let Some(initial) = &self.checksums.initial_source_checksum
            && let Ok(restored) = checksum::checksum_file(&self.source)
            && restored != *initial
        {
            warn!(
                "restored {} has checksum {} (expected {})",
                self.source.display(),
                restored,
                initial
            );
        }
        debug!("moved {} back to {}", actual.display(), self.source.display());
        self.item_actually_moved = false;
        Ok(())
    }

    fn verify_checksums(&mut self) -> Result<()> {
        if self.item_type != Some(ItemType::File) {
            return Ok(());
        }
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
        OperationKind::Move
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
