//! The keyword store: one scan, then lazy loads.
//!
//! ```text
//!  backend ──open_stream──► FortIo ──scan──► [descriptor 0][descriptor 1]...
//!                              ▲                    │
//!                              └──── seek(offset) ◄─┘ get_or_load(position)
//! ```
//!
//! Opening a store walks the file once, reading every header and skipping
//! every payload. The descriptor arena built by that walk is never resized
//! afterwards, which is what lets loaded keywords be handed out as plain
//! `&Keyword` borrows of the store.

use std::cell::RefCell;

use crate::{
    backend::StreamBackend,
    descriptor::{InverseMap, KeywordDescriptor},
    error::{Error, Result},
    fortio::{Endian, FortIo},
    keyword::{Keyword, KeywordHeader},
};

/// Descriptors produced by a scan together with the error that stopped it.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Every keyword read completely before the scan stopped.
    pub descriptors: Vec<KeywordDescriptor>,
    /// Offset just past the last complete keyword.
    pub end: u64,
    /// Set when the scan ended on an error rather than at end of file.
    pub error: Option<Error>,
}

/// Walks `io` from its current position to the end, recording descriptors.
///
/// A failure stops the walk. Keywords read before the failure are kept and
/// the error is returned alongside them.
pub fn scan<R: std::io::BufRead + std::io::Seek>(io: &mut FortIo<R>) -> ScanOutcome {
    let mut descriptors = Vec::new();
    let mut end = 0;
    loop {
        match scan_one(io) {
            Ok(Some((descriptor, next))) => {
                descriptors.push(descriptor);
                end = next;
            },
            Ok(None) => return ScanOutcome { descriptors, end, error: None },
            Err(err) => {
                tracing::warn!(
                    keywords = descriptors.len(),
                    error = %err,
                    "Keyword scan stopped early"
                );
                return ScanOutcome { descriptors, end, error: Some(err) };
            },
        }
    }
}

// Offsets are taken before the end-of-file check skips whitespace, so a
// formatted keyword spans exactly from its offset to the next one.
fn scan_one<R: std::io::BufRead + std::io::Seek>(
    io: &mut FortIo<R>,
) -> Result<Option<(KeywordDescriptor, u64)>> {
    let offset = io.tell()?;
    if io.at_eof()? {
        return Ok(None);
    }
    let Some(header) = KeywordHeader::read_from(io)? else {
        return Ok(None);
    };
    Keyword::skip_data(&header, io)?;
    let end = io.tell()?;
    Ok(Some((KeywordDescriptor::from_header(header, offset), end)))
}

/// Arena of keyword descriptors over one backend.
pub struct KeywordStore<B: StreamBackend> {
    backend: B,
    formatted: bool,
    endian: Endian,
    close_stream_between_accesses: bool,
    descriptors: Vec<KeywordDescriptor>,
    scan_end: u64,
    io: RefCell<Option<FortIo<B::Stream>>>,
    inverse: RefCell<InverseMap>,
    scan_error: Option<Error>,
}

impl<B: StreamBackend> std::fmt::Debug for KeywordStore<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordStore")
            .field("source", &self.backend.describe())
            .field("formatted", &self.formatted)
            .field("endian", &self.endian)
            .field("keywords", &self.descriptors.len())
            .field("scan_error", &self.scan_error)
            .finish_non_exhaustive()
    }
}

impl<B: StreamBackend> KeywordStore<B> {
    /// Scans `backend` and builds the descriptor arena.
    ///
    /// A scan that stops on a damaged record still produces a store; see
    /// [`scan_error`](Self::scan_error).
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` only if the backend cannot open a stream at all.
    pub fn open(
        backend: B,
        formatted: bool,
        endian: Endian,
        close_stream_between_accesses: bool,
    ) -> Result<Self> {
        let mut io = FortIo::new(backend.open_stream()?, formatted, endian);
        let ScanOutcome { descriptors, end, error } = scan(&mut io);
        tracing::debug!(
            source = %backend.describe(),
            keywords = descriptors.len(),
            formatted,
            complete = error.is_none(),
            "Scanned keyword file"
        );
        let io = if close_stream_between_accesses { None } else { Some(io) };
        Ok(Self {
            backend,
            formatted,
            endian,
            close_stream_between_accesses,
            descriptors,
            scan_end: end,
            io: RefCell::new(io),
            inverse: RefCell::new(InverseMap::new()),
            scan_error: error,
        })
    }

    /// The backend the store reads from.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// True for formatted (text) files.
    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    /// Byte order of an unformatted file.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Number of keywords found by the scan.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// True if the scan found no keywords.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The error that stopped the scan, if any.
    pub fn scan_error(&self) -> Option<&Error> {
        self.scan_error.as_ref()
    }

    /// All descriptors in file order.
    pub fn descriptors(&self) -> &[KeywordDescriptor] {
        &self.descriptors
    }

    /// Descriptor at global `position`.
    pub fn descriptor(&self, position: usize) -> Option<&KeywordDescriptor> {
        self.descriptors.get(position)
    }

    /// Header of the keyword at global `position`.
    pub fn header(&self, position: usize) -> Option<&KeywordHeader> {
        self.descriptor(position).map(KeywordDescriptor::header)
    }

    /// Number of descriptors whose payload is in memory.
    pub fn loaded_count(&self) -> usize {
        self.descriptors.iter().filter(|d| d.is_loaded()).count()
    }

    /// True while a stream is held open between loads.
    pub fn has_open_stream(&self) -> bool {
        self.io.borrow().is_some()
    }

    /// Returns the keyword at global `position`, loading it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] for a position past the arena, and any
    /// error from opening the stream or reading the payload.
    pub fn get_or_load(&self, position: usize) -> Result<&Keyword> {
        let descriptor = self.descriptors.get(position).ok_or_else(|| Error::OutOfBounds {
            name: "<store>".to_string(),
            index: position,
            len: self.descriptors.len(),
        })?;
        if let Some(keyword) = descriptor.cached() {
            return Ok(keyword);
        }

        let mut slot = self.io.borrow_mut();
        let io = match slot.take() {
            Some(io) => io,
            None => FortIo::new(self.backend.open_stream()?, self.formatted, self.endian),
        };
        let io = slot.insert(io);
        let loaded = descriptor.get_or_load(io, &mut self.inverse.borrow_mut(), position);
        if self.close_stream_between_accesses {
            *slot = None;
        }
        loaded
    }

    /// Evicts the payload at `position`. Does nothing for unloaded keywords.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] for a position past the arena.
    pub fn drop_cache(&mut self, position: usize) -> Result<()> {
        let len = self.descriptors.len();
        let descriptor = self.descriptors.get_mut(position).ok_or_else(|| Error::OutOfBounds {
            name: "<store>".to_string(),
            index: position,
            len,
        })?;
        descriptor.drop_cache(self.inverse.get_mut());
        Ok(())
    }

    /// Global position of a keyword previously returned by this store.
    pub fn position_of(&self, keyword: &Keyword) -> Option<usize> {
        self.inverse.borrow().position_of(keyword)
    }

    /// Replaces the payload of the keyword at `position` on disk.
    ///
    /// The new keyword must carry exactly the recorded header and encode to
    /// exactly the bytes the old one occupies. Formatted values can change
    /// width, so equal headers alone are not enough. Any cached copy is
    /// evicted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderMismatch`] if the headers differ,
    /// [`Error::EncodedSizeMismatch`] if the encoding would spill into the
    /// next keyword or leave a gap, and [`Error::ReadOnly`] if the backend
    /// does not permit writes.
    pub fn rewrite(&mut self, position: usize, keyword: &Keyword) -> Result<()> {
        let len = self.descriptors.len();
        let descriptor = self.descriptors.get(position).ok_or_else(|| Error::OutOfBounds {
            name: keyword.name().to_string(),
            index: position,
            len,
        })?;
        if keyword.header() != descriptor.header() {
            return Err(Error::HeaderMismatch {
                offset: descriptor.offset(),
                expected: descriptor.header().to_string(),
                found: keyword.header().to_string(),
            });
        }

        let offset = descriptor.offset();
        let span = self.descriptors.get(position + 1).map_or(self.scan_end, KeywordDescriptor::offset) - offset;
        let mut encoded = FortIo::new(std::io::Cursor::new(Vec::new()), self.formatted, self.endian);
        keyword.write_to(&mut encoded)?;
        let bytes = encoded.into_inner().into_inner();
        if bytes.len() as u64 != span {
            return Err(Error::EncodedSizeMismatch { offset, expected: span, found: bytes.len() as u64 });
        }
        self.backend.write_at(offset, &bytes)?;
        tracing::debug!(keyword = %keyword.header(), offset, "Rewrote keyword in place");

        self.drop_cache(position)?;
        // Buffered read streams may hold stale bytes.
        *self.io.get_mut() = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::backend::{FileBackend, InMemoryBackend};

    fn encode(keywords: &[Keyword], formatted: bool) -> Vec<u8> {
        let mut io = FortIo::new(Cursor::new(Vec::new()), formatted, Endian::Big);
        for kw in keywords {
            kw.write_to(&mut io).unwrap();
        }
        io.into_inner().into_inner()
    }

    fn sample() -> Vec<Keyword> {
        vec![
            Keyword::from_values("SEQNUM", &[1i32]).unwrap(),
            Keyword::from_values("PRESSURE", &[200.0f32, 210.5, 220.25]).unwrap(),
            Keyword::from_values("SWAT", &[0.25f32, 0.5, 0.75]).unwrap(),
        ]
    }

    #[test]
    fn test_scan_records_headers_and_offsets() {
        let store = KeywordStore::open(InMemoryBackend::new(encode(&sample(), false)), false, Endian::Big, false)
            .unwrap();
        assert_eq!(store.len(), 3);
        assert!(store.scan_error().is_none());
        assert_eq!(store.descriptor(0).unwrap().offset(), 0);
        assert_eq!(store.header(1).unwrap().name(), "PRESSURE");
        assert_eq!(store.loaded_count(), 0, "scan must not load payloads");
    }

    #[test]
    fn test_lazy_load_is_coherent() {
        let store = KeywordStore::open(InMemoryBackend::new(encode(&sample(), false)), false, Endian::Big, false)
            .unwrap();
        let first = store.get_or_load(2).unwrap();
        let second = store.get_or_load(2).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(store.descriptor(2).unwrap().ref_count(), 2);
        assert_eq!(store.position_of(first), Some(2));
        assert_eq!(store.loaded_count(), 1);
    }

    #[test]
    fn test_formatted_scan() {
        let store = KeywordStore::open(InMemoryBackend::new(encode(&sample(), true)), true, Endian::Big, false)
            .unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get_or_load(1).unwrap().to_vec::<f32>().unwrap(), vec![200.0, 210.5, 220.25]);
    }

    #[test]
    fn test_truncated_file_keeps_complete_prefix() {
        let mut bytes = encode(&sample(), false);
        bytes.truncate(bytes.len() - 3);
        let store = KeywordStore::open(InMemoryBackend::new(bytes), false, Endian::Big, false).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.scan_error().unwrap().is_truncation());
    }

    #[test]
    fn test_close_stream_between_accesses() {
        let store = KeywordStore::open(InMemoryBackend::new(encode(&sample(), false)), false, Endian::Big, true)
            .unwrap();
        assert!(!store.has_open_stream());
        assert_eq!(store.get_or_load(0).unwrap().get::<i32>(0).unwrap(), 1);
        assert!(!store.has_open_stream());

        let kept = KeywordStore::open(InMemoryBackend::new(encode(&sample(), false)), false, Endian::Big, false)
            .unwrap();
        kept.get_or_load(0).unwrap();
        assert!(kept.has_open_stream());
    }

    #[test]
    fn test_drop_cache_and_reload() {
        let mut store = KeywordStore::open(InMemoryBackend::new(encode(&sample(), false)), false, Endian::Big, false)
            .unwrap();
        store.get_or_load(1).unwrap();
        store.drop_cache(1).unwrap();
        assert_eq!(store.loaded_count(), 0);
        assert_eq!(store.descriptor(1).unwrap().ref_count(), 0);
        assert_eq!(store.get_or_load(1).unwrap().len(), 3);
        assert!(matches!(store.drop_cache(9), Err(Error::OutOfBounds { index: 9, .. })));
    }

    #[test]
    fn test_out_of_bounds_load() {
        let store = KeywordStore::open(InMemoryBackend::new(Vec::new()), false, Endian::Big, false).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.get_or_load(0), Err(Error::OutOfBounds { index: 0, len: 0, .. })));
    }

    #[test]
    fn test_formatted_offsets_start_at_header_line() {
        let keywords = sample();
        let store =
            KeywordStore::open(InMemoryBackend::new(encode(&keywords, true)), true, Endian::Big, false).unwrap();
        let mut expected = 0;
        for (position, kw) in keywords.iter().enumerate() {
            assert_eq!(store.descriptor(position).unwrap().offset(), expected, "{}", kw.header());
            expected += encode(std::slice::from_ref(kw), true).len() as u64;
        }
    }

    #[test]
    fn test_formatted_rewrite_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CASE.FUNRST");
        let seqnum = Keyword::from_values("SEQNUM", &[7i32]).unwrap();
        let before = [Keyword::from_values("DVALS", &[1.0f64]).unwrap(), seqnum.clone()];
        std::fs::write(&path, encode(&before, true)).unwrap();

        let mut store = KeywordStore::open(FileBackend::writable(&path), true, Endian::Big, false).unwrap();
        store.get_or_load(0).unwrap();
        let after = [Keyword::from_values("DVALS", &[2.0f64]).unwrap(), seqnum.clone()];
        store.rewrite(0, &after[0]).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), encode(&after, true));
        assert_eq!(store.get_or_load(0).unwrap().get::<f64>(0).unwrap(), 2.0);
        assert_eq!(store.get_or_load(1).unwrap(), &seqnum);
    }

    #[test]
    fn test_rewrite_rejects_wider_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CASE.FUNRST");
        let original = encode(
            &[Keyword::from_values("DVALS", &[1.0f64]).unwrap(), Keyword::from_values("SEQNUM", &[7i32]).unwrap()],
            true,
        );
        std::fs::write(&path, &original).unwrap();

        let mut store = KeywordStore::open(FileBackend::writable(&path), true, Endian::Big, false).unwrap();
        let wide = Keyword::from_values("DVALS", &[1e100f64]).unwrap();
        let err = store.rewrite(0, &wide).unwrap_err();
        assert!(matches!(err, Error::EncodedSizeMismatch { offset: 0, .. }), "{err}");
        assert_eq!(std::fs::read(&path).unwrap(), original);
        assert_eq!(store.get_or_load(1).unwrap().get::<i32>(0).unwrap(), 7);
    }

    #[test]
    fn test_rewrite_on_read_only_backend() {
        let mut store = KeywordStore::open(InMemoryBackend::new(encode(&sample(), false)), false, Endian::Big, false)
            .unwrap();
        let replacement = Keyword::from_values("SEQNUM", &[7i32]).unwrap();
        assert!(matches!(store.rewrite(0, &replacement), Err(Error::ReadOnly)));

        let wrong = Keyword::from_values("SEQNUM", &[7i32, 8]).unwrap();
        assert!(matches!(store.rewrite(0, &wrong), Err(Error::HeaderMismatch { .. })));
    }
}
