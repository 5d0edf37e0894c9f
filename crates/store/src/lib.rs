//! eclfile-store: a keyword container engine for reservoir simulation output.
//!
//! Restart, summary, grid and init files share one container format: a flat
//! sequence of *keywords*, each a named, typed, fixed-length array stored as
//! Fortran sequential records (or as fixed-width text in formatted files).
//! This crate reads and writes that format bit-exactly:
//!
//! - **Lazy loading**: opening a file reads only headers; payloads are read on
//!   first access and cached
//! - **Indexed views**: name and occurrence lookup, report step blocks
//!   addressed by index, step number, date or elapsed days
//! - **Failure containment**: a damaged record ends the scan but keeps
//!   everything before it
//! - **Step rewrite**: truncate a unified restart file at a report step and
//!   continue writing there
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        EclFile (read) / EclWriter (write)   │
//! │   (open, select step, get/read, rewrite)    │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │                View Layer                   │
//! │  (name index, block views, step lookup)     │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │               Keyword Store                 │
//! │  (scan, descriptors, lazy cache, inverse)   │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │           Keyword / Record Codec            │
//! │   (typed arrays, blocks, Fortran records)   │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │              Stream Backend                 │
//! │      (FileBackend / InMemoryBackend)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use eclfile_store::{EclFile, EclWriter, StepSelector};
//!
//! let mut writer = EclWriter::create("CASE.INIT")?;
//! writer.write_values("PORO", &[0.25f32, 0.30, 0.28])?;
//! writer.flush()?;
//! drop(writer);
//!
//! if let Some(mut file) = EclFile::open("CASE.UNRST")? {
//!     file.select_restart_step(StepSelector::ReportStep(10))?;
//!     let pressure: Vec<f32> = file.read("PRESSURE", 0)?;
//!     println!("{} cells", pressure.len());
//! }
//! # Ok::<(), eclfile_store::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
// Offsets and counts cross between i32 (on disk), u64 (seek) and usize (memory).
#![allow(clippy::cast_possible_truncation)]

pub mod backend;
pub mod data_type;
pub mod descriptor;
pub mod error;
pub mod file;
pub mod fortio;
pub mod index;
pub mod keyword;
pub mod naming;
pub mod restart;
pub mod store;
pub mod view;
pub mod writer;

// Re-export commonly used types
pub use backend::{FileBackend, InMemoryBackend, StreamBackend};
pub use data_type::DataType;
pub use descriptor::{InverseMap, KeywordDescriptor};
pub use error::{Error, ErrorKind, Result};
pub use file::{EclFile, FileConfig};
pub use fortio::{Endian, FortIo};
pub use index::NameIndex;
pub use keyword::{Element, Keyword, KeywordHeader};
pub use naming::{FileInfo, FileKind, classify, filename, looks_formatted};
pub use restart::{RestartHeader, UnitSystem};
pub use store::{KeywordStore, ScanOutcome};
pub use view::{StepSelector, View};
pub use writer::EclWriter;
