//! File backed streams.
//!
//! The backend stores only the path. Every stream is a freshly opened,
//! buffered file handle, so dropping a stream releases the descriptor.
//! In-place rewrites use position-based I/O on a separate write handle and
//! never disturb open read streams' cursors.

#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(windows)]
use std::os::windows::fs::FileExt;
use std::{
    fs::{File, OpenOptions},
    io::BufReader,
    path::{Path, PathBuf},
};

use super::StreamBackend;
use crate::error::{Error, Result};

/// Stream backend over a file on disk.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    writable: bool,
}

impl FileBackend {
    /// Creates a read-only backend for `path`.
    ///
    /// The file is not touched until the first stream is opened.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), writable: false }
    }

    /// Creates a backend that also permits [`write_at`](StreamBackend::write_at).
    pub fn writable(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), writable: true }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if in-place writes are permitted.
    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

impl StreamBackend for FileBackend {
    type Stream = BufReader<File>;

    fn open_stream(&self) -> Result<Self::Stream> {
        Ok(BufReader::new(File::open(&self.path)?))
    }

    fn len(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        let file = OpenOptions::new().write(true).open(&self.path)?;
        write_all_at_offset(&file, data, offset)?;
        file.sync_data()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Platform-specific position-based I/O helpers
// ---------------------------------------------------------------------------

/// Writes all of `data` to `file` at the given byte `offset`.
#[cfg(unix)]
fn write_all_at_offset(file: &File, data: &[u8], offset: u64) -> Result<()> {
    file.write_all_at(data, offset)?;
    Ok(())
}

/// `seek_write` may write less than asked, so loop until done.
#[cfg(windows)]
fn write_all_at_offset(file: &File, data: &[u8], offset: u64) -> Result<()> {
    let mut pos = 0;
    while pos < data.len() {
        let n = file.seek_write(&data[pos..], offset + pos as u64)?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::WriteZero,
                "seek_write made no progress",
            )
            .into());
        }
        pos += n;
    }
    Ok(())
}
