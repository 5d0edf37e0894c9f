//! Byte sources for keyword stores.
//!
//! A [`KeywordStore`](crate::store::KeywordStore) never holds a file handle
//! directly. It asks its backend for a fresh seekable stream whenever it
//! needs one, which lets a store close its stream between payload loads and
//! lets tests run the whole engine over an in-memory buffer.

mod file;
mod memory;

use std::io::{BufRead, Read, Seek};

pub use file::FileBackend;
pub use memory::InMemoryBackend;

use crate::error::{Error, Result};

/// Number of bytes inspected by format detection.
pub const SAMPLE_SIZE: usize = 64 * 1024;

/// Source of seekable byte streams over one keyword file.
pub trait StreamBackend {
    /// Stream type handed out by [`open_stream`](Self::open_stream).
    type Stream: BufRead + Seek;

    /// Opens a new stream positioned at offset zero.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the underlying source cannot be opened.
    fn open_stream(&self) -> Result<Self::Stream>;

    /// Total size of the source in bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the size cannot be determined.
    fn len(&self) -> Result<u64>;

    /// Human readable name used in log output.
    fn describe(&self) -> String;

    /// Overwrites `data.len()` bytes starting at `offset`.
    ///
    /// Backends are read-only unless they override this.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadOnly` by default and `Error::Io` if the write fails.
    fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let _ = (offset, data);
        Err(Error::ReadOnly)
    }

    /// Reads up to [`SAMPLE_SIZE`] bytes from the start of the source.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the stream cannot be read.
    fn sample(&self) -> Result<Vec<u8>> {
        let mut sample = Vec::new();
        self.open_stream()?.take(SAMPLE_SIZE as u64).read_to_end(&mut sample)?;
        Ok(sample)
    }
}
