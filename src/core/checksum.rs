//! Content digest service for integrity verification.
//!
//! Produces a fixed-length eight-hex-digit digest of a byte sequence or a
//! file's contents. Digests are used only to verify that file content did
//! not drift between the phases of an operation (validate, execute, undo);
//! they are never exposed to callers and never used for security decisions.

use std::fs::File;
use std::hash::Hasher;
use std::io::Read;
use std::path::Path;

use twox_hash::XxHash32;

use crate::Result;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Compute the digest of an in-memory byte sequence.
pub fn checksum_bytes(data: &[u8]) -> String {
    format!("{:08x}", XxHash32::oneshot(0, data))
}

/// Compute the digest of a file's contents, streaming in fixed-size chunks.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub fn checksum_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path.as_ref())?;
    let mut hasher = XxHash32::with_seed(0);
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.write(&buf[..read]);
    }
    Ok(format!("{:08x}", hasher.finish_32()))
}
