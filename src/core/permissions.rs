//! Permission probe for pre-mutation checks and simplified mode handling.
//!
//! Reports whether a path is readable or writable by the current process and
//! gets/sets a simplified permission mode expressed as three octal digits
//! (`rwxrwxrwx` collapsed to `"755"`-style strings). On systems without
//! POSIX modes the abstraction collapses to a binary read-only/writable view
//! exposed as `"444"` / `"666"`.

use std::fs;
use std::path::Path;

use crate::{Result, error::FsynthError};

/// Returns true when the current process can read the given path.
///
/// Uses `access(2)` on Unix so that effective UID/GID and ACLs are honored,
/// instead of re-deriving the answer from the mode bits.
#[cfg(unix)]
pub fn is_readable<P: AsRef<Path>>(path: P) -> bool {
    access(path.as_ref(), libc::R_OK)
}

/// Returns true when the current process can write the given path.
#[cfg(unix)]
pub fn is_writable<P: AsRef<Path>>(path: P) -> bool {
    access(path.as_ref(), libc::W_OK)
}

#[cfg(unix)]
fn access(path: &Path, amode: libc::c_int) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    // SAFETY: cpath is a valid NUL-terminated C string for the call duration.
    unsafe { libc::access(cpath.as_ptr(), amode) == 0 }
}

/// Returns true when the current process can read the given path.
#[cfg(not(unix))]
pub fn is_readable<P: AsRef<Path>>(path: P) -> bool {
    fs::symlink_metadata(path.as_ref()).is_ok()
}

/// Returns true when the current process can write the given path.
#[cfg(not(unix))]
pub fn is_writable<P: AsRef<Path>>(path: P) -> bool {
    match fs::symlink_metadata(path.as_ref()) {
        Ok(meta) => !meta.permissions().readonly(),
        Err(_) => false,
    }
}

/// Read the simplified permission mode of a path as three octal digits.
///
/// On Unix this is the lower nine mode bits (`"644"`, `"755"`, ...). On
/// systems without POSIX modes this collapses to `"444"` for read-only
/// items and `"666"` for writable ones.
///
/// # Errors
///
/// Returns [`FsynthError::Io`] if the path's metadata cannot be read.
pub fn get_mode<P: AsRef<Path>>(path: P) -> Result<String> {
    let meta = fs::metadata(path.as_ref())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Ok(format!("{:03o}", meta.permissions().mode() & 0o777))
    }
    #[cfg(not(unix))]
    {
        if meta.permissions().readonly() {
            Ok("444".to_string())
        } else {
            Ok("666".to_string())
        }
    }
}

/// Set the simplified permission mode of a path from three octal digits.
///
/// On systems without POSIX modes any value whose owner digit is 4 or less
/// toggles the read-only attribute on; anything else toggles it off.
///
/// # Errors
///
/// Returns a configuration error for a malformed mode string, or
/// [`FsynthError::Io`] if the permissions cannot be applied.
pub fn set_mode<P: AsRef<Path>>(path: P, mode: &str) -> Result<()> {
    let bits = parse_mode(mode)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path.as_ref(), fs::Permissions::from_mode(bits))?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let mut perms = fs::metadata(path.as_ref())?.permissions();
        let owner = (bits >> 6) & 0o7;
        perms.set_readonly(owner <= 4);
        fs::set_permissions(path.as_ref(), perms)?;
        Ok(())
    }
}

/// Parse a `"ddd"` mode string into its nine permission bits.
fn parse_mode(mode: &str) -> Result<u32> {
    if mode.len() == 3
        && mode.bytes().all(|b| (b'0'..=b'7').contains(&b))
        && let Ok(bits) = u32::from_str_radix(mode, 8)
    {
        return Ok(bits);
    }
    Err(FsynthError::config(format!(
        "invalid permission mode '{}': expected three octal digits",
        mode
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_mode_accepts_octal_triplets() {
        assert_eq!(parse_mode("644").unwrap(), 0o644);
        assert_eq!(parse_mode("000").unwrap(), 0);
        assert_eq!(parse_mode("777").unwrap(), 0o777);
    }

    #[test]
    fn test_parse_mode_rejects_garbage() {
        assert!(parse_mode("64").is_err());
        assert!(parse_mode("6444").is_err());
        assert!(parse_mode("68a").is_err());
        assert!(parse_mode("rw-").is_err());
    }

    #[test]
    fn test_readable_writable_on_fresh_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("probe.txt");
        fs::write(&path, b"x").unwrap();
        assert!(is_readable(&path));
        assert!(is_writable(&path));
        assert!(!is_readable(temp.path().join("missing")));
        assert!(!is_writable(temp.path().join("missing")));
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mode.txt");
        fs::write(&path, b"x").unwrap();
        set_mode(&path, "600").unwrap();
        assert_eq!(get_mode(&path).unwrap(), "600");
        set_mode(&path, "644").unwrap();
        assert_eq!(get_mode(&path).unwrap(), "644");
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_mode_blocks_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ro.txt");
        fs::write(&path, b"x").unwrap();
        set_mode(&path, "444").unwrap();
        // Root bypasses mode bits, so only assert when the probe agrees.
        if !is_writable(&path) {
            assert!(fs::write(&path, b"y").is_err());
        }
        set_mode(&path, "644").unwrap();
    }
}
