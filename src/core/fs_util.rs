//! Filesystem primitives shared by all operation variants.
//!
//! Thin wrappers over `std::fs` that give the operations a single seam for
//! whole-file I/O, symlink handling, and moves. The copy helper can skip
//! POSIX metadata copy for compatibility with CIFS (SMB) filesystems where
//! metadata operations may fail.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

/// Returns true when something exists at the path, without following a
/// trailing symlink. A broken symlink therefore still "exists".
pub fn exists_no_follow<P: AsRef<Path>>(path: P) -> bool {
    fs::symlink_metadata(path.as_ref()).is_ok()
}

/// Returns true when the path resolves to a regular file.
pub fn is_file<P: AsRef<Path>>(path: P) -> bool {
    fs::metadata(path.as_ref()).map(|m| m.is_file()).unwrap_or(false)
}

/// Returns true when the path resolves to a directory.
pub fn is_dir<P: AsRef<Path>>(path: P) -> bool {
    fs::metadata(path.as_ref()).map(|m| m.is_dir()).unwrap_or(false)
}

/// Returns true when the path itself is a symlink (never resolved).
pub fn is_symlink<P: AsRef<Path>>(path: P) -> bool {
    fs::symlink_metadata(path.as_ref())
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Read a file's entire contents into memory.
pub fn read_entire_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    fs::read(path.as_ref())
}

/// Write exactly the given bytes to a file, creating or truncating it.
pub fn write_entire_file<P: AsRef<Path>>(path: P, data: &[u8]) -> io::Result<()> {
    fs::write(path.as_ref(), data)
}

/// Create the full directory chain up to and including `path`.
pub fn mkpath<P: AsRef<Path>>(path: P) -> io::Result<()> {
    fs::create_dir_all(path.as_ref())
}

/// Copies a file from `source` to `destination`.
///
/// With `preserve_attributes` the platform copy primitive is used, which
/// carries permission bits along with the contents. Without it only the data
/// stream is copied, avoiding POSIX metadata copy that CIFS mounts may
/// reject.
///
/// # Errors
///
/// Returns an `io::Error` if reading from source or writing to destination fails.
pub fn copy_file(source: &Path, destination: &Path, preserve_attributes: bool) -> io::Result<()> {
    if preserve_attributes {
        fs::copy(source, destination)?;
        return Ok(());
    }
    let mut src = File::open(source)?;
    let mut dst = File::create(destination)?;
    io::copy(&mut src, &mut dst)?;
    Ok(())
}

/// Read a symlink's textual target without following it.
pub fn read_link_text<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let target = fs::read_link(path.as_ref())?;
    Ok(target.to_string_lossy().into_owned())
}

/// Create a symbolic link at `link` whose link text is `text`, exactly as
/// given. The caller chooses absolute vs relative by what they pass in.
#[cfg(unix)]
pub fn create_symlink<P: AsRef<Path>>(text: P, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(text.as_ref(), link)
}

/// Create a symbolic link at `link` whose link text is `text`.
#[cfg(windows)]
pub fn create_symlink<P: AsRef<Path>>(text: P, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(text.as_ref(), link)
}

/// Move `source` to `destination` with a single rename where the OS permits
/// it, falling back to copy-and-remove for files and link re-creation for
/// symlinks when the rename crosses filesystems. Directory moves across
/// filesystems propagate the rename error.
pub fn move_item(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(err) if crosses_devices(&err) => {
            debug!(
                "rename {} -> {} crossed filesystems, falling back",
                source.display(),
                destination.display()
            );
            if is_symlink(source) {
                let text = read_link_text(source)?;
                create_symlink(&text, destination)?;
                fs::remove_file(source)
            } else if is_file(source) {
                copy_file(source, destination, true)?;
                fs::remove_file(source)
            } else {
                Err(err)
            }
        }
        Err(err) => Err(err),
    }
}

#[cfg(unix)]
fn crosses_devices(err: &io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn crosses_devices(_err: &io::Error) -> bool {
    false
}

/// Walk up from `path` to the closest ancestor that exists on disk.
///
/// Used by the permission probe when the immediate parent of a target is
/// going to be created by the operation itself.
pub fn nearest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find(|candidate| exists_no_follow(candidate))
        .map(Path::to_path_buf)
}
