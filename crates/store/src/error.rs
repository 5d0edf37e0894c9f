//! Error types for the keyword file engine.

use std::io;

use snafu::Snafu;

use crate::data_type::DataType;

/// Result type alias for keyword file operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// Callers that only care about the category (for example, "is this file
/// damaged or did I ask for something that does not exist?") can match on
/// the kind instead of individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes on disk do not follow the container grammar.
    Format,
    /// A keyword, occurrence, time or report step does not resolve.
    NotFound,
    /// The underlying stream failed, including truncated files.
    Io,
    /// A programming error: bad index, wrong element type, bad buffer size.
    Invariant,
}

/// Errors that can occur while reading or writing keyword files.
#[derive(Debug, Snafu)]
pub enum Error {
    /// I/O error from the underlying stream.
    #[snafu(display("I/O error: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Leading and trailing record markers disagree.
    #[snafu(display("Record marker mismatch at offset {offset}: head {head}, tail {tail}"))]
    RecordMismatch {
        /// Offset of the record's leading marker.
        offset: u64,
        /// Length announced by the leading marker.
        head: i32,
        /// Length announced by the trailing marker.
        tail: i32,
    },

    /// A keyword header or formatted value could not be parsed.
    #[snafu(display("Malformed keyword data at offset {offset}: {reason}"))]
    MalformedHeader {
        /// Offset where parsing started.
        offset: u64,
        /// Description of what was wrong.
        reason: String,
    },

    /// The four character type code is not one of the known codes.
    #[snafu(display("Unknown element type code: {code:?}"))]
    UnknownType {
        /// The raw code as read from the file.
        code: String,
    },

    /// A freshly read header differs from the header recorded during the scan.
    #[snafu(display(
        "Keyword header at offset {offset} changed: expected {expected}, found {found}"
    ))]
    HeaderMismatch {
        /// Offset of the descriptor.
        offset: u64,
        /// Header recorded when the file was scanned.
        expected: String,
        /// Header found on the re-read.
        found: String,
    },

    /// A header keyword encodes a calendar date or time that does not exist.
    #[snafu(display("Invalid date in {keyword}: {reason}"))]
    InvalidDate {
        /// Keyword holding the date fields.
        keyword: String,
        /// Description of the bad field.
        reason: String,
    },

    /// No keyword with the given name and occurrence.
    #[snafu(display("Keyword {name} occurrence {occurrence} not found"))]
    KeywordNotFound {
        /// Keyword name.
        name: String,
        /// Requested occurrence.
        occurrence: usize,
    },

    /// A report step, simulation time or block index did not resolve.
    #[snafu(display("No report step matching {selector}"))]
    StepNotFound {
        /// Display form of the selector that failed.
        selector: String,
    },

    /// Element index past the end of a keyword.
    #[snafu(display("Index {index} out of bounds for keyword {name} of length {len}"))]
    OutOfBounds {
        /// Keyword name.
        name: String,
        /// Requested index.
        index: usize,
        /// Keyword length.
        len: usize,
    },

    /// Typed access with an element type the keyword does not hold.
    #[snafu(display("Keyword {name} holds {found} elements, not {expected}"))]
    TypeMismatch {
        /// Keyword name.
        name: String,
        /// The element type the caller asked for.
        expected: DataType,
        /// The element type the keyword holds.
        found: DataType,
    },

    /// External storage length does not match `count * width`.
    #[snafu(display("Buffer of {actual} bytes does not hold {count} {data_type} elements"))]
    BufferSize {
        /// Element type.
        data_type: DataType,
        /// Element count.
        count: usize,
        /// Buffer length in bytes.
        actual: usize,
    },

    /// Keyword names are at most eight ASCII characters.
    #[snafu(display("Invalid keyword name {name:?}"))]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A string does not fit the element width.
    #[snafu(display("String {value:?} longer than element width {width}"))]
    StringTooLong {
        /// The rejected string.
        value: String,
        /// Element width in bytes.
        width: usize,
    },

    /// An in-place rewrite would not fill exactly the bytes the keyword
    /// occupies on disk.
    #[snafu(display(
        "Keyword at offset {offset} occupies {expected} bytes, replacement encodes to {found}"
    ))]
    EncodedSizeMismatch {
        /// Offset of the descriptor.
        offset: u64,
        /// Bytes between this keyword and the next.
        expected: u64,
        /// Length of the replacement encoding.
        found: u64,
    },

    /// Mutation attempted on a file opened read-only.
    #[snafu(display("File is read-only"))]
    ReadOnly,
}

impl Error {
    /// Returns the broad category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::RecordMismatch { .. }
            | Self::MalformedHeader { .. }
            | Self::UnknownType { .. }
            | Self::HeaderMismatch { .. }
            | Self::InvalidDate { .. } => ErrorKind::Format,
            Self::KeywordNotFound { .. } | Self::StepNotFound { .. } => ErrorKind::NotFound,
            Self::OutOfBounds { .. }
            | Self::TypeMismatch { .. }
            | Self::BufferSize { .. }
            | Self::InvalidName { .. }
            | Self::StringTooLong { .. }
            | Self::EncodedSizeMismatch { .. }
            | Self::ReadOnly => ErrorKind::Invariant,
        }
    }

    /// Returns true if the stream ended before a complete record was read.
    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::UnexpectedEof)
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io { source }
    }
}
