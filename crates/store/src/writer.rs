//! Write side file handle.
//!
//! Keyword files are append-only streams. [`EclWriter`] opens one in one of
//! three ways:
//!
//! - `create`: start a fresh file, discarding any old content.
//! - `append`: continue after the last byte.
//! - `create_at_step`: keep a unified restart file up to, but excluding,
//!   the first report step at or after a given step, then continue there.
//!   Rerunning a simulation from step N therefore replaces steps N.. in
//!   place.

use std::{
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use crate::{
    backend::{FileBackend, StreamBackend},
    data_type::DataType,
    error::Result,
    file::FileConfig,
    fortio::{Endian, FortIo},
    keyword::{Element, Keyword, KeywordHeader},
    naming::{FileKind, classify, looks_formatted},
    restart::{ENDSOL, RestartHeader, SEQNUM, STARTSOL},
};

/// Buffered, append-only keyword file writer.
#[derive(Debug)]
pub struct EclWriter {
    io: FortIo<BufWriter<File>>,
    path: PathBuf,
    kind: FileKind,
    unified: bool,
}

struct Layout {
    kind: FileKind,
    formatted: bool,
    unified: bool,
    endian: Endian,
}

impl Layout {
    fn resolve(path: &Path, config: &FileConfig, existing: bool) -> Result<Self> {
        let info = classify(path);
        let formatted = match config.formatted.or(info.map(|i| i.formatted)) {
            Some(formatted) => formatted,
            None if existing => looks_formatted(&FileBackend::new(path).sample()?),
            None => false,
        };
        let kind = info.map_or(FileKind::Other, |i| i.kind);
        let unified = config.unified.unwrap_or(kind.is_unified());
        Ok(Self { kind, formatted, unified, endian: config.endian })
    }
}

impl EclWriter {
    fn from_file(file: File, path: &Path, layout: Layout) -> Self {
        Self {
            io: FortIo::new(BufWriter::new(file), layout.formatted, layout.endian),
            path: path.to_path_buf(),
            kind: layout.kind,
            unified: layout.unified,
        }
    }

    /// Creates (or truncates) `path` with default options.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be created.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with_config(path, &FileConfig::default())
    }

    /// Creates (or truncates) `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be created.
    pub fn create_with_config(path: impl AsRef<Path>, config: &FileConfig) -> Result<Self> {
        let path = path.as_ref();
        let layout = Layout::resolve(path, config, false)?;
        let file = File::create(path)?;
        tracing::debug!(path = %path.display(), formatted = layout.formatted, "Created keyword file");
        Ok(Self::from_file(file, path, layout))
    }

    /// Opens `path` for appending with default options, creating it if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be opened.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        Self::append_with_config(path, &FileConfig::default())
    }

    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be opened.
    pub fn append_with_config(path: impl AsRef<Path>, config: &FileConfig) -> Result<Self> {
        let path = path.as_ref();
        let layout = Layout::resolve(path, config, path.exists())?;
        let mut file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
        file.seek(SeekFrom::End(0))?;
        Ok(Self::from_file(file, path, layout))
    }

    /// Opens `path` to write from `report_step` on with default options.
    ///
    /// # Errors
    ///
    /// See [`create_at_step_with_config`](Self::create_at_step_with_config).
    pub fn create_at_step(path: impl AsRef<Path>, report_step: i32) -> Result<Self> {
        Self::create_at_step_with_config(path, report_step, &FileConfig::default())
    }

    /// Opens `path` to write from `report_step` on.
    ///
    /// The file is cut at the header of the first `SEQNUM` whose value is at
    /// least `report_step`; without such a marker writing continues at the
    /// end. A missing file is created.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be opened or resized, and any
    /// codec error met while scanning the existing markers.
    pub fn create_at_step_with_config(
        path: impl AsRef<Path>,
        report_step: i32,
        config: &FileConfig,
    ) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Self::create_with_config(path, config);
        }

        let layout = Layout::resolve(path, config, true)?;
        let cut = {
            let reader = BufReader::new(File::open(path)?);
            let mut io = FortIo::new(reader, layout.formatted, layout.endian);
            find_step_offset(&mut io, report_step)?
        };

        let mut file = OpenOptions::new().write(true).open(path)?;
        if let Some(offset) = cut {
            file.set_len(offset)?;
            tracing::debug!(path = %path.display(), report_step, offset, "Truncated file at report step");
        }
        file.seek(SeekFrom::End(0))?;
        Ok(Self::from_file(file, path, layout))
    }

    /// Path being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind derived from the file name.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// True when writing text.
    pub fn is_formatted(&self) -> bool {
        self.io.is_formatted()
    }

    /// True when restart steps are preceded by `SEQNUM`.
    pub fn is_unified(&self) -> bool {
        self.unified
    }

    /// Byte offset of the next write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if buffered data cannot be flushed.
    pub fn position(&mut self) -> Result<u64> {
        self.io.tell()
    }

    /// Appends one keyword.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on write failure.
    pub fn write_keyword<S: AsRef<[u8]>>(&mut self, keyword: &Keyword<S>) -> Result<()> {
        keyword.write_to(&mut self.io)
    }

    /// Appends a keyword built from `values`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`](crate::Error::InvalidName) and write
    /// errors.
    pub fn write_values<T: Element>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.write_keyword(&Keyword::from_values(name, values)?)
    }

    /// Appends a character keyword.
    ///
    /// # Errors
    ///
    /// Returns construction errors from [`Keyword::from_strings`] and write
    /// errors.
    pub fn write_strings(&mut self, name: &str, data_type: DataType, values: &[&str]) -> Result<()> {
        self.write_keyword(&Keyword::from_strings(name, data_type, values)?)
    }

    /// Appends a zero-length message marker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`](crate::Error::InvalidName) and write
    /// errors.
    pub fn write_message(&mut self, name: &str) -> Result<()> {
        self.write_keyword(&Keyword::message(name)?)
    }

    /// Appends one complete report step.
    ///
    /// Emission order is fixed: `SEQNUM` (unified files only), `INTEHEAD`,
    /// `LOGIHEAD`, `DOUBHEAD`, `STARTSOL`, the fields, `ENDSOL`.
    ///
    /// # Errors
    ///
    /// Returns write errors.
    pub fn write_restart_step<'a, S, I>(&mut self, header: &RestartHeader, fields: I) -> Result<()>
    where
        S: AsRef<[u8]> + 'a,
        I: IntoIterator<Item = &'a Keyword<S>>,
    {
        if self.unified {
            self.write_values(SEQNUM, &[header.report_step])?;
        }
        self.write_keyword(&header.to_intehead()?)?;
        self.write_keyword(&header.to_logihead()?)?;
        self.write_keyword(&header.to_doubhead()?)?;
        self.write_message(STARTSOL)?;
        let mut count = 0usize;
        for field in fields {
            self.write_keyword(field)?;
            count += 1;
        }
        self.write_message(ENDSOL)?;
        tracing::debug!(report_step = header.report_step, fields = count, "Wrote restart step");
        Ok(())
    }

    /// Flushes buffered output to the operating system.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on failure.
    pub fn flush(&mut self) -> Result<()> {
        self.io.flush()
    }

    /// Flushes and waits until the data is on disk.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on failure.
    pub fn sync(&mut self) -> Result<()> {
        self.io.flush()?;
        self.io.get_ref().get_ref().sync_data()?;
        Ok(())
    }
}

/// Offset of the first `SEQNUM` header whose value is at least `report_step`.
fn find_step_offset<R: std::io::BufRead + Seek>(
    io: &mut FortIo<R>,
    report_step: i32,
) -> Result<Option<u64>> {
    loop {
        // Before the end-of-file check, which skips the blank that precedes
        // a formatted header.
        let offset = io.tell()?;
        if io.at_eof()? {
            break;
        }
        let Some(header) = KeywordHeader::read_from(io)? else { break };
        if header.name() == SEQNUM {
            let seqnum = Keyword::read_data(header, io)?;
            if seqnum.get::<i32>(0)? >= report_step {
                return Ok(Some(offset));
            }
        } else {
            Keyword::skip_data(&header, io)?;
        }
    }
    Ok(None)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::{error::Error, file::EclFile};

    fn header(step: i32) -> RestartHeader {
        let sim_time = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
            + chrono::Duration::days(i64::from(step) * 30);
        RestartHeader::builder().report_step(step).sim_time(sim_time).sim_days(f64::from(step) * 30.0).build()
    }

    #[test]
    fn test_step_emission_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CASE.UNRST");
        let pressure = Keyword::from_values("PRESSURE", &[100.0f32, 101.0]).unwrap();
        {
            let mut writer = EclWriter::create(&path).unwrap();
            assert!(writer.is_unified());
            writer.write_restart_step(&header(1), [&pressure]).unwrap();
            writer.flush().unwrap();
        }

        let file = EclFile::open(&path).unwrap().unwrap();
        let names: Vec<&str> = (0..file.len()).map(|i| file.global_view().name_at(i).unwrap()).collect();
        assert_eq!(names, vec!["SEQNUM", "INTEHEAD", "LOGIHEAD", "DOUBHEAD", "STARTSOL", "PRESSURE", "ENDSOL"]);
    }

    #[test]
    fn test_non_unified_step_has_no_seqnum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CASE.X0004");
        {
            let mut writer = EclWriter::create(&path).unwrap();
            assert!(!writer.is_unified());
            writer.write_restart_step::<Vec<u8>, _>(&header(4), []).unwrap();
        }
        let file = EclFile::open(&path).unwrap().unwrap();
        assert!(!file.contains("SEQNUM"));
        assert_eq!(file.iget(0).unwrap().name(), "INTEHEAD");
        assert_eq!(file.report_step(), Some(4));
    }

    #[test]
    fn test_append_continues_after_existing_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CASE.INIT");
        {
            let mut writer = EclWriter::create(&path).unwrap();
            writer.write_values("PORO", &[0.25f32]).unwrap();
        }
        {
            let mut writer = EclWriter::append(&path).unwrap();
            assert!(writer.position().unwrap() > 0);
            writer.write_values("PERMX", &[100.0f32]).unwrap();
            writer.sync().unwrap();
        }
        let file = EclFile::open(&path).unwrap().unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.read::<f32>("PERMX", 0).unwrap(), vec![100.0]);
    }

    #[test]
    fn test_create_at_step_on_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("NEW.UNRST");
        let mut writer = EclWriter::create_at_step(&path, 3).unwrap();
        assert_eq!(writer.position().unwrap(), 0);
    }

    #[test]
    fn test_create_at_step_without_match_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CASE.UNRST");
        {
            let mut writer = EclWriter::create(&path).unwrap();
            writer.write_restart_step::<Vec<u8>, _>(&header(1), []).unwrap();
        }
        let len = std::fs::metadata(&path).unwrap().len();
        let mut writer = EclWriter::create_at_step(&path, 9).unwrap();
        assert_eq!(writer.position().unwrap(), len);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = EclWriter::create(dir.path().join("CASE.INIT")).unwrap();
        assert!(matches!(writer.write_values("WAYTOOLONGNAME", &[1i32]), Err(Error::InvalidName { .. })));
    }

    #[test]
    fn test_formatted_writer_from_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CASE.FUNRST");
        {
            let mut writer = EclWriter::create(&path).unwrap();
            assert!(writer.is_formatted());
            writer.write_restart_step::<Vec<u8>, _>(&header(2), []).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(" 'SEQNUM  '           1 'INTE'\n"));
    }
}
