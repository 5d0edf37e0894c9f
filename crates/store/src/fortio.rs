//! Fortran sequential record codec.
//!
//! Unformatted files are a sequence of records, each framed by a four byte
//! length marker before and after the payload:
//!
//! ```text
//! ┌──────────┬─────────────────────┬──────────┐
//! │ len: i32 │ payload (len bytes) │ len: i32 │
//! └──────────┴─────────────────────┴──────────┘
//! ```
//!
//! Formatted files carry no framing at all. Values are written as fixed
//! width text columns, and reading them back means tokenizing the text.
//! [`FortIo`] offers both: record primitives for unformatted streams, and
//! token/quoted-string primitives plus the value formatters for formatted
//! streams. It knows nothing about keywords.

use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

/// Size of a record length marker in bytes.
pub const MARKER_SIZE: u64 = 4;

/// Byte order of an unformatted file.
///
/// Simulator output is big endian; little endian files exist but are rare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Most significant byte first.
    #[default]
    Big,
    /// Least significant byte first.
    Little,
}

impl Endian {
    /// Byte order of the running host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") { Self::Big } else { Self::Little }
    }

    /// True if payloads must be byte-swapped between host and file order.
    pub const fn needs_swap(self) -> bool {
        !matches!(
            (self, Self::native()),
            (Self::Big, Self::Big) | (Self::Little, Self::Little)
        )
    }

    /// Decodes an `i32` stored in this byte order.
    pub fn read_i32(self, buf: &[u8]) -> i32 {
        match self {
            Self::Big => BigEndian::read_i32(buf),
            Self::Little => LittleEndian::read_i32(buf),
        }
    }

    /// Encodes an `i32` in this byte order.
    pub fn write_i32(self, buf: &mut [u8], value: i32) {
        match self {
            Self::Big => BigEndian::write_i32(buf, value),
            Self::Little => LittleEndian::write_i32(buf, value),
        }
    }
}

/// Reverses the byte order of every `width`-byte element in `bytes`.
///
/// Applied to numeric payloads only; character data is never swapped.
pub fn swap_elements(bytes: &mut [u8], width: usize) {
    if width < 2 {
        return;
    }
    for element in bytes.chunks_exact_mut(width) {
        element.reverse();
    }
}

/// Record codec over a byte stream.
#[derive(Debug)]
pub struct FortIo<S> {
    stream: S,
    formatted: bool,
    endian: Endian,
}

impl<S> FortIo<S> {
    /// Wraps a stream.
    pub fn new(stream: S, formatted: bool, endian: Endian) -> Self {
        Self { stream, formatted, endian }
    }

    /// True for text (formatted) streams.
    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    /// Byte order used for record markers and numeric payloads.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Borrows the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrows the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Unwraps the codec, returning the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Seek> FortIo<S> {
    /// Current byte offset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the position cannot be queried.
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.stream.stream_position()?)
    }

    /// Moves to an absolute byte offset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the seek fails.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.stream.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unformatted reading
// ---------------------------------------------------------------------------

impl<S: BufRead + Seek> FortIo<S> {
    /// True when no further record or token follows.
    ///
    /// For formatted streams trailing whitespace is consumed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stream cannot be read.
    pub fn at_eof(&mut self) -> Result<bool> {
        if self.formatted {
            self.skip_whitespace()?;
        }
        Ok(self.stream.fill_buf()?.is_empty())
    }

    fn read_marker(&mut self) -> Result<i32> {
        let marker = match self.endian {
            Endian::Big => self.stream.read_i32::<BigEndian>()?,
            Endian::Little => self.stream.read_i32::<LittleEndian>()?,
        };
        Ok(marker)
    }

    fn read_head(&mut self, offset: u64) -> Result<usize> {
        let head = self.read_marker()?;
        usize::try_from(head).map_err(|_| Error::MalformedHeader {
            offset,
            reason: format!("negative record length {head}"),
        })
    }

    fn check_tail(&mut self, offset: u64, head: usize) -> Result<()> {
        let tail = self.read_marker()?;
        if usize::try_from(tail).ok() != Some(head) {
            return Err(Error::RecordMismatch { offset, head: head as i32, tail });
        }
        Ok(())
    }

    /// Reads one complete record and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordMismatch`] if the trailing marker disagrees
    /// with the leading one, [`Error::MalformedHeader`] for a negative
    /// length, and [`Error::Io`] (`UnexpectedEof`) for a truncated record.
    pub fn read_record(&mut self) -> Result<Vec<u8>> {
        let offset = self.tell()?;
        let head = self.read_head(offset)?;

        // Grow as bytes arrive so a corrupt marker cannot force a huge allocation.
        let mut payload = Vec::new();
        (&mut self.stream).take(head as u64).read_to_end(&mut payload)?;
        if payload.len() != head {
            return Err(unexpected_eof("record payload"));
        }

        self.check_tail(offset, head)?;
        Ok(payload)
    }

    /// Reads one record whose payload length is known in advance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the record length differs from
    /// `expected`, plus everything [`read_record`](Self::read_record) returns.
    pub fn read_record_exact(&mut self, expected: usize) -> Result<Vec<u8>> {
        let offset = self.tell()?;
        let head = self.read_head(offset)?;
        if head != expected {
            return Err(Error::MalformedHeader {
                offset,
                reason: format!("record holds {head} bytes, expected {expected}"),
            });
        }

        let mut payload = vec![0u8; head];
        self.stream.read_exact(&mut payload)?;
        self.check_tail(offset, head)?;
        Ok(payload)
    }

    /// Skips one record without reading its payload.
    ///
    /// Returns the payload length.
    ///
    /// # Errors
    ///
    /// Same as [`read_record`](Self::read_record).
    pub fn skip_record(&mut self) -> Result<usize> {
        let offset = self.tell()?;
        let head = self.read_head(offset)?;
        self.stream.seek(SeekFrom::Current(head as i64))?;
        self.check_tail(offset, head)?;
        Ok(head)
    }
}

// ---------------------------------------------------------------------------
// Formatted reading
// ---------------------------------------------------------------------------

impl<S: BufRead + Seek> FortIo<S> {
    fn skip_whitespace(&mut self) -> Result<()> {
        loop {
            let buf = self.stream.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let skipped = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let exhausted = skipped == buf.len();
            self.stream.consume(skipped);
            if !exhausted {
                return Ok(());
            }
        }
    }

    /// Consumes the rest of the current line, including its `\n`, as long
    /// as it holds only blanks. Stops before anything else.
    ///
    /// Keeps every keyword of a formatted file starting on a fresh line, so
    /// recorded offsets point at the start of the header line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stream cannot be read.
    pub fn finish_line(&mut self) -> Result<()> {
        loop {
            let buf = self.stream.fill_buf()?;
            let Some(&byte) = buf.first() else {
                return Ok(());
            };
            match byte {
                b' ' | b'\t' | b'\r' => self.stream.consume(1),
                b'\n' => {
                    self.stream.consume(1);
                    return Ok(());
                },
                _ => return Ok(()),
            }
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.stream.read_u8()?)
    }

    /// Reads the next whitespace delimited token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] (`UnexpectedEof`) if the stream ends first.
    pub fn read_token(&mut self) -> Result<String> {
        self.skip_whitespace()?;
        let mut token = Vec::new();
        loop {
            let buf = self.stream.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let taken = buf.iter().take_while(|b| !b.is_ascii_whitespace()).count();
            token.extend_from_slice(&buf[..taken]);
            let done = taken < buf.len();
            self.stream.consume(taken);
            if done {
                break;
            }
        }
        if token.is_empty() {
            return Err(unexpected_eof("formatted token"));
        }
        String::from_utf8(token).map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, format!("non UTF-8 token: {err}")).into()
        })
    }

    /// Reads a single quoted field of exactly `width` bytes.
    ///
    /// Leading whitespace up to the opening quote is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the quotes are missing.
    pub fn read_quoted(&mut self, width: usize) -> Result<Vec<u8>> {
        self.skip_whitespace()?;
        let offset = self.tell()?;
        if self.read_byte()? != b'\'' {
            return Err(Error::MalformedHeader {
                offset,
                reason: "expected opening quote".to_string(),
            });
        }
        let mut value = vec![0u8; width];
        self.stream.read_exact(&mut value)?;
        if self.read_byte()? != b'\'' {
            return Err(Error::MalformedHeader {
                offset,
                reason: format!("expected closing quote after {width} characters"),
            });
        }
        Ok(value)
    }

    /// Reads a formatted integer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the token is not an integer.
    pub fn read_int(&mut self) -> Result<i32> {
        let offset = self.tell()?;
        let token = self.read_token()?;
        token.parse().map_err(|_| malformed_value(offset, "integer", &token))
    }

    /// Reads a formatted single precision value (`0.ddddddddE+xx`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the token is not a number.
    pub fn read_float(&mut self) -> Result<f32> {
        let offset = self.tell()?;
        let token = self.read_token()?;
        parse_scientific::<f32>(&token).ok_or_else(|| malformed_value(offset, "float", &token))
    }

    /// Reads a formatted double precision value (`0.ddddddddddddddD+xx`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the token is not a number.
    pub fn read_double(&mut self) -> Result<f64> {
        let offset = self.tell()?;
        let token = self.read_token()?;
        parse_scientific::<f64>(&token).ok_or_else(|| malformed_value(offset, "double", &token))
    }

    /// Reads a formatted logical (`T` or `F`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] for any other glyph.
    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.tell()?;
        let token = self.read_token()?;
        match token.as_str() {
            "T" => Ok(true),
            "F" => Ok(false),
            _ => Err(malformed_value(offset, "logical", &token)),
        }
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

impl<S: Write> FortIo<S> {
    /// Writes one framed record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails, or if the payload is larger
    /// than a record marker can describe.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<()> {
        let len = i32::try_from(payload.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "record exceeds i32::MAX bytes")
        })?;
        match self.endian {
            Endian::Big => self.stream.write_i32::<BigEndian>(len)?,
            Endian::Little => self.stream.write_i32::<LittleEndian>(len)?,
        }
        self.stream.write_all(payload)?;
        match self.endian {
            Endian::Big => self.stream.write_i32::<BigEndian>(len)?,
            Endian::Little => self.stream.write_i32::<LittleEndian>(len)?,
        }
        Ok(())
    }

    /// Writes raw text to a formatted stream.
    ///
    /// Character data is written byte for byte, so non UTF-8 payloads keep
    /// their width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub fn write_text(&mut self, text: impl AsRef<[u8]>) -> Result<()> {
        self.stream.write_all(text.as_ref())?;
        Ok(())
    }

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Value formatting
// ---------------------------------------------------------------------------

/// Splits `x` into a mantissa in `[0.1, 1)` and a decimal exponent.
///
/// This is not the `%e` convention: the leading digit sits after the
/// decimal point, so `1234.5` becomes `(0.12345, 4)`. Zero maps to `(0, 0)`.
pub fn scientific_split(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (if x.is_finite() { 0.0 } else { x }, 0);
    }
    let mut exponent = x.abs().log10().ceil();
    let mut mantissa = x / 10f64.powf(exponent);
    if mantissa.abs() >= 1.0 {
        mantissa *= 0.1;
        exponent += 1.0;
    }
    (mantissa, exponent as i32)
}

/// Formats an integer value.
pub fn format_int(value: i32) -> String {
    format!(" {value:11}")
}

/// Width of one formatted single precision value.
const FLOAT_FIELD: usize = 17;

/// Width of one formatted double precision value.
const DOUBLE_FIELD: usize = 23;

/// Token for a non-finite value, or `None` for finite ones.
fn non_finite_token(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NAN")
    } else if value.is_infinite() {
        Some(if value > 0.0 { "INF" } else { "-INF" })
    } else {
        None
    }
}

/// Formats a single precision value.
///
/// NaN and infinities are written as `NAN`, `INF` and `-INF`, right
/// aligned in the same field width.
pub fn format_float(value: f32) -> String {
    if let Some(token) = non_finite_token(f64::from(value)) {
        return format!("{token:>FLOAT_FIELD$}");
    }
    let (mantissa, exponent) = scientific_split(f64::from(value));
    format!("  {mantissa:11.8}E{exponent:+03}")
}

/// Formats a double precision value.
///
/// Non-finite values use the same tokens as [`format_float`].
pub fn format_double(value: f64) -> String {
    if let Some(token) = non_finite_token(value) {
        return format!("{token:>DOUBLE_FIELD$}");
    }
    let (mantissa, exponent) = scientific_split(value);
    format!("  {mantissa:17.14}D{exponent:+03}")
}

/// Formats a logical value.
pub fn format_bool(value: bool) -> &'static str {
    if value { "  T" } else { "  F" }
}

/// Formats a quoted character field; `value` is already padded to width.
///
/// The bytes are copied unchanged, whatever their encoding.
pub fn format_quoted(value: &[u8]) -> Vec<u8> {
    let mut field = Vec::with_capacity(value.len() + 3);
    field.extend_from_slice(b" '");
    field.extend_from_slice(value);
    field.push(b'\'');
    field
}

fn parse_scientific<T: std::str::FromStr + From<f32>>(token: &str) -> Option<T> {
    match token.to_ascii_uppercase().as_str() {
        "NAN" | "+NAN" | "-NAN" => return Some(T::from(f32::NAN)),
        "INF" | "+INF" => return Some(T::from(f32::INFINITY)),
        "-INF" => return Some(T::from(f32::NEG_INFINITY)),
        _ => {},
    }
    if let Ok(value) = token.parse() {
        return Some(value);
    }
    token.replace(['D', 'd'], "E").parse().ok()
}

fn malformed_value(offset: u64, what: &str, token: &str) -> Error {
    Error::MalformedHeader { offset, reason: format!("expected {what}, found {token:?}") }
}

fn unexpected_eof(what: &str) -> Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, format!("stream ended inside {what}")).into()
}
