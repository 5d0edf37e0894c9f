//! In-memory streams for tests and for keyword files already held in RAM.

use std::{io::Cursor, sync::Arc};

use super::StreamBackend;
use crate::error::Result;

/// Read-only backend over a shared byte buffer.
///
/// Cloning is cheap; every stream shares the same buffer.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    bytes: Arc<[u8]>,
}

impl InMemoryBackend {
    /// Wraps `bytes`.
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// The complete buffer.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl StreamBackend for InMemoryBackend {
    type Stream = Cursor<Arc<[u8]>>;

    fn open_stream(&self) -> Result<Self::Stream> {
        Ok(Cursor::new(Arc::clone(&self.bytes)))
    }

    fn len(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}
