//! Read side file handle.
//!
//! [`EclFile`] ties a scanned [`KeywordStore`] to the views callers query
//! through. Lookups by name go through the *active* view, which is the
//! global view until a report step (or any other view) is selected.

use std::{io, path::Path, sync::Arc};

use crate::{
    backend::{FileBackend, InMemoryBackend, StreamBackend},
    error::{Error, Result},
    fortio::Endian,
    keyword::{Element, Keyword},
    naming::{FileKind, classify, looks_formatted},
    restart::{DOUBHEAD, INTEHEAD, LOGIHEAD, RestartHeader, SEQNUM},
    store::KeywordStore,
    view::{StepSelector, View},
};

/// Options for opening and creating keyword files.
#[derive(Debug, Clone, bon::Builder)]
pub struct FileConfig {
    /// Byte order of unformatted files (default big endian).
    #[builder(default)]
    pub endian: Endian,
    /// Force formatted or unformatted access. Inferred from the file name,
    /// then from content, when unset.
    pub formatted: Option<bool>,
    /// Drop the read stream after every payload load and reopen on demand.
    #[builder(default)]
    pub close_stream_between_accesses: bool,
    /// Allow [`EclFile::rewrite_keyword`].
    #[builder(default)]
    pub writable: bool,
    /// Force writing (or not writing) `SEQNUM` markers. Inferred from the
    /// file name when unset.
    pub unified: Option<bool>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            endian: Endian::Big,
            formatted: None,
            close_stream_between_accesses: false,
            writable: false,
            unified: None,
        }
    }
}

/// An open keyword file.
///
/// Not `Sync`: the payload cache uses unsynchronized interior mutability.
#[derive(Debug)]
pub struct EclFile<B: StreamBackend = FileBackend> {
    store: KeywordStore<B>,
    global: View,
    active: Option<View>,
    kind: FileKind,
    report_step: Option<u32>,
}

impl EclFile<FileBackend> {
    /// Opens `path` with default options.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file exists but cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Option<Self>> {
        Self::open_with_config(path, &FileConfig::default())
    }

    /// Opens `path`.
    ///
    /// A damaged file still opens: everything before the damage is
    /// available and [`scan_error`](EclFile::scan_error) reports the cause.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file exists but cannot be read.
    pub fn open_with_config(path: impl AsRef<Path>, config: &FileConfig) -> Result<Option<Self>> {
        let path = path.as_ref();
        match std::fs::metadata(path) {
            Ok(_) => {},
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Keyword file does not exist");
                return Ok(None);
            },
            Err(err) => return Err(err.into()),
        }

        let info = classify(path);
        let backend =
            if config.writable { FileBackend::writable(path) } else { FileBackend::new(path) };
        let formatted = match config.formatted.or(info.map(|i| i.formatted)) {
            Some(formatted) => formatted,
            None => looks_formatted(&backend.sample()?),
        };
        let kind = info.map_or(FileKind::Other, |i| i.kind);
        let mut file = EclFile::with_backend(backend, formatted, config)?;
        file.kind = kind;
        file.report_step = info.and_then(|i| i.report_step);
        Ok(Some(file))
    }
}

impl EclFile<InMemoryBackend> {
    /// Scans a keyword file already held in memory.
    ///
    /// # Errors
    ///
    /// Never fails for in-memory data; scan problems are reported through
    /// [`scan_error`](EclFile::scan_error).
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, config: &FileConfig) -> Result<Self> {
        let backend = InMemoryBackend::new(bytes);
        let formatted = config.formatted.unwrap_or_else(|| looks_formatted(backend.bytes()));
        EclFile::with_backend(backend, formatted, config)
    }
}

impl<B: StreamBackend> EclFile<B> {
    /// Scans a file served by an arbitrary backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the backend cannot open a stream.
    pub fn with_backend(backend: B, formatted: bool, config: &FileConfig) -> Result<Self> {
        let store = KeywordStore::open(
            backend,
            formatted,
            config.endian,
            config.close_stream_between_accesses,
        )?;
        let global = View::global(&store);
        Ok(Self { store, global, active: None, kind: FileKind::Other, report_step: None })
    }

    /// The underlying keyword store.
    pub fn store(&self) -> &KeywordStore<B> {
        &self.store
    }

    /// Kind derived from the file name.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Report step encoded in a per-step file name.
    pub fn report_step(&self) -> Option<u32> {
        self.report_step
    }

    /// True for formatted files.
    pub fn is_formatted(&self) -> bool {
        self.store.is_formatted()
    }

    /// The error that cut the scan short, if any.
    pub fn scan_error(&self) -> Option<&Error> {
        self.store.scan_error()
    }

    /// True if the scan reached the end of the file.
    pub fn is_complete(&self) -> bool {
        self.store.scan_error().is_none()
    }

    /// Number of keywords in the file.
    pub fn len(&self) -> usize {
        self.global.len()
    }

    /// True if the file holds no keywords.
    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    /// View over every keyword.
    pub fn global_view(&self) -> &View {
        &self.global
    }

    /// View that name lookups currently go through.
    pub fn active_view(&self) -> &View {
        self.active.as_ref().unwrap_or(&self.global)
    }

    /// Routes lookups through `view`.
    pub fn select_view(&mut self, view: View) {
        self.active = Some(view);
    }

    /// Routes lookups through the global view again.
    pub fn select_global(&mut self) {
        self.active = None;
    }

    /// Number of report steps in the file.
    pub fn step_count(&self) -> usize {
        self.global.step_count()
    }

    /// Child view of the global view for one report step.
    ///
    /// Per-step files carry no `SEQNUM`; their report step comes from the
    /// file name.
    ///
    /// # Errors
    ///
    /// Returns load errors from the store.
    pub fn restart_view(&self, selector: StepSelector) -> Result<Option<View>> {
        if let (StepSelector::ReportStep(step), Some(file_step)) = (selector, self.report_step) {
            if !self.global.contains(SEQNUM) {
                let matches = u32::try_from(step).is_ok_and(|step| step == file_step);
                let first = StepSelector::Index(0);
                return if matches { self.global.restart_view(&self.store, first) } else { Ok(None) };
            }
        }
        self.global.restart_view(&self.store, selector)
    }

    /// Makes the report step addressed by `selector` the active view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StepNotFound`] if no step matches, and load errors
    /// from the store.
    pub fn select_restart_step(&mut self, selector: StepSelector) -> Result<()> {
        let view = self
            .restart_view(selector)?
            .ok_or_else(|| Error::StepNotFound { selector: selector.to_string() })?;
        tracing::debug!(%selector, keywords = view.len(), "Selected restart step");
        self.active = Some(view);
        Ok(())
    }

    /// Loads the `occurrence`-th `name` in the active view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeywordNotFound`] and load errors.
    pub fn get(&self, name: &str, occurrence: usize) -> Result<&Keyword> {
        self.active_view().get(&self.store, name, occurrence)
    }

    /// Loads entry `index` of the active view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] and load errors.
    pub fn iget(&self, index: usize) -> Result<&Keyword> {
        self.active_view().iget(&self.store, index)
    }

    /// Copies the values of the `occurrence`-th `name` in the active view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeywordNotFound`], [`Error::TypeMismatch`] and load
    /// errors.
    pub fn read<T: Element>(&self, name: &str, occurrence: usize) -> Result<Vec<T>> {
        self.get(name, occurrence)?.to_vec()
    }

    /// Copies the trimmed strings of a character keyword.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub fn read_strings(&self, name: &str, occurrence: usize) -> Result<Vec<String>> {
        self.get(name, occurrence)?.strings()
    }

    /// True if `name` occurs in the active view.
    pub fn contains(&self, name: &str) -> bool {
        self.active_view().contains(name)
    }

    /// Occurrences of `name` in the active view.
    pub fn count(&self, name: &str) -> usize {
        self.active_view().count(name)
    }

    /// Frees the cached payload of the keyword at global `position`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] for an unknown position.
    pub fn drop_keyword(&mut self, position: usize) -> Result<()> {
        self.store.drop_cache(position)
    }

    /// Global position of a keyword returned by this file.
    pub fn position_of(&self, keyword: &Keyword) -> Option<usize> {
        self.store.position_of(keyword)
    }

    /// Overwrites the keyword at global `position` on disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReadOnly`] unless the file was opened writable and
    /// [`Error::HeaderMismatch`] if `keyword` has a different header.
    pub fn rewrite_keyword<S: AsRef<[u8]>>(&mut self, position: usize, keyword: &Keyword<S>) -> Result<()> {
        self.store.rewrite(position, &keyword.to_owned_keyword())
    }

    /// Decodes the step header arrays inside `view`.
    ///
    /// The report step is read from `SEQNUM` when the view has one, else
    /// taken from the file name, else zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeywordNotFound`] without `INTEHEAD`, and decoding
    /// errors from [`RestartHeader::from_keywords`].
    pub fn restart_header(&self, view: &View) -> Result<RestartHeader> {
        let report_step = if view.contains(SEQNUM) {
            view.get(&self.store, SEQNUM, 0)?.get::<i32>(0)?
        } else {
            self.report_step.and_then(|step| i32::try_from(step).ok()).unwrap_or(0)
        };
        RestartHeader::from_keywords(
            report_step,
            view.get(&self.store, INTEHEAD, 0)?,
            self.first_in(view, LOGIHEAD)?,
            self.first_in(view, DOUBHEAD)?,
        )
    }

    fn first_in(&self, view: &View, name: &str) -> Result<Option<&Keyword>> {
        if view.contains(name) { view.get(&self.store, name, 0).map(Some) } else { Ok(None) }
    }
}
