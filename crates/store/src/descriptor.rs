//! Lazy keyword handles.
//!
//! A scan records, for every keyword in a file, only its header and the
//! offset where the header starts. The payload is read the first time
//! somebody asks for it and then kept, so peak memory stays bounded by what
//! callers actually touch while repeated lookups cost nothing.

use std::{
    cell::{Cell, OnceCell},
    collections::HashMap,
    io::{BufRead, Seek},
};

use crate::{
    error::{Error, Result},
    fortio::FortIo,
    keyword::{Keyword, KeywordHeader},
};

/// Maps a loaded keyword back to the descriptor that owns it.
///
/// Keys are the addresses of cached keywords. Descriptors live in an arena
/// that never grows after the scan, so an address stays valid until the
/// owning descriptor drops its cache, which also removes the entry.
#[derive(Debug, Default)]
pub struct InverseMap {
    positions: HashMap<usize, usize>,
}

impl InverseMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(keyword: &Keyword) -> usize {
        std::ptr::from_ref(keyword) as usize
    }

    /// Registers `keyword` as owned by the descriptor at `position`.
    pub fn insert(&mut self, keyword: &Keyword, position: usize) {
        self.positions.insert(Self::key(keyword), position);
    }

    /// Forgets `keyword`.
    pub fn remove(&mut self, keyword: &Keyword) -> Option<usize> {
        self.positions.remove(&Self::key(keyword))
    }

    /// Descriptor position owning `keyword`, if it is a cached instance.
    pub fn position_of(&self, keyword: &Keyword) -> Option<usize> {
        self.positions.get(&Self::key(keyword)).copied()
    }

    /// Number of registered keywords.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Header, file offset and lazily loaded payload of one keyword.
///
/// Invariant: a payload is cached exactly when `ref_count() > 0`.
#[derive(Debug)]
pub struct KeywordDescriptor {
    header: KeywordHeader,
    offset: u64,
    ref_count: Cell<usize>,
    cached: OnceCell<Keyword>,
}

impl KeywordDescriptor {
    /// Creates an unloaded descriptor for a header found at `offset`.
    pub fn from_header(header: KeywordHeader, offset: u64) -> Self {
        Self { header, offset, ref_count: Cell::new(0), cached: OnceCell::new() }
    }

    /// The header recorded during the scan.
    pub fn header(&self) -> &KeywordHeader {
        &self.header
    }

    /// Offset of the keyword header in the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of times the payload was handed out since it was loaded.
    pub fn ref_count(&self) -> usize {
        self.ref_count.get()
    }

    /// True if the payload is in memory.
    pub fn is_loaded(&self) -> bool {
        self.cached.get().is_some()
    }

    /// Returns the payload if it is already in memory, counting the hit.
    pub fn cached(&self) -> Option<&Keyword> {
        let keyword = self.cached.get()?;
        self.ref_count.set(self.ref_count.get() + 1);
        Some(keyword)
    }

    /// Returns the payload, reading it from `io` on first use.
    ///
    /// The freshly read header must equal the recorded one. A failed load
    /// leaves the descriptor unloaded with `ref_count() == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderMismatch`] if the file changed under the scan,
    /// and any codec error from reading the keyword.
    pub fn get_or_load<R: BufRead + Seek>(
        &self,
        io: &mut FortIo<R>,
        inverse: &mut InverseMap,
        position: usize,
    ) -> Result<&Keyword> {
        if let Some(keyword) = self.cached() {
            return Ok(keyword);
        }

        io.seek(self.offset)?;
        let keyword = Keyword::read_from(io)?;
        if keyword.header() != &self.header {
            return Err(Error::HeaderMismatch {
                offset: self.offset,
                expected: self.header.to_string(),
                found: keyword.header().to_string(),
            });
        }
        tracing::trace!(keyword = %self.header, offset = self.offset, "Loaded keyword payload");

        let keyword = self.cached.get_or_init(|| keyword);
        inverse.insert(keyword, position);
        self.ref_count.set(1);
        Ok(keyword)
    }

    /// Frees the payload and resets the reference count.
    ///
    /// Takes `&mut self`, so no reference obtained from
    /// [`get_or_load`](Self::get_or_load) can outlive the eviction.
    pub fn drop_cache(&mut self, inverse: &mut InverseMap) {
        if let Some(keyword) = self.cached.get() {
            inverse.remove(keyword);
        }
        self.cached.take();
        self.ref_count.set(0);
    }
}
