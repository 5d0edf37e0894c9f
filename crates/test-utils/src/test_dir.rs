//! Temporary directory management for tests.
//!
//! [`TestDir`] wraps [`tempfile::TempDir`] and knows the keyword file naming
//! conventions, so tests can ask for "the formatted unified restart file"
//! instead of spelling out extensions.

// Test utilities are expected to panic on failure - that's their purpose
#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use eclfile_store::{FileKind, filename};
use tempfile::TempDir;

/// Base name used by [`TestDir::case_file`].
pub const CASE: &str = "CASE";

/// A managed temporary directory for tests.
///
/// The directory is automatically cleaned up when this struct is dropped.
///
/// # Example
///
/// ```
/// use eclfile_store::FileKind;
/// use eclfile_test_utils::TestDir;
///
/// let dir = TestDir::new();
/// let unrst = dir.case_file(FileKind::UnifiedRestart, false, 0);
/// assert!(unrst.ends_with("CASE.UNRST"));
/// ```
pub struct TestDir {
    inner: TempDir,
}

impl TestDir {
    /// Create a new temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let inner = TempDir::new().expect("failed to create temp directory");
        Self { inner }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Join a relative path to the temporary directory.
    #[must_use]
    pub fn join<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        self.inner.path().join(path)
    }

    /// Conventional path of a [`CASE`] file of `kind` in this directory.
    #[must_use]
    pub fn case_file(&self, kind: FileKind, formatted: bool, report_step: u32) -> PathBuf {
        filename(self.path(), CASE, kind, formatted, report_step)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
