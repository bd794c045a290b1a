use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Sandbox generator for filesystem-mutation tests
#[allow(dead_code)]
pub struct TestFsGenerator {
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestFsGenerator {
    /// Create a new temporary directory as test workspace
    pub fn new() -> Self {
        init_logging();
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Get the temporary directory path
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a (possibly not yet existing) entry in the sandbox
    pub fn entry(&self, name: &str) -> PathBuf {
        self.path().join(name)
    }

    /// Create a text file with the given content
    pub fn create_text_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.entry(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Create a directory (and its parents)
    pub fn create_dir(&self, name: &str) -> PathBuf {
        let path = self.entry(name);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Create a symlink with the given link text
    #[cfg(unix)]
    pub fn create_symlink(&self, name: &str, text: &str) -> PathBuf {
        let path = self.entry(name);
        std::os::unix::fs::symlink(text, &path).unwrap();
        path
    }
}

/// Initialize env_logger once for the whole test binary
#[allow(dead_code)]
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
