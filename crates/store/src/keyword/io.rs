//! Reading, writing and skipping keywords through a [`FortIo`] codec.
//!
//! # Unformatted layout
//!
//! ```text
//! record: name[8] | count: i32 | type[4]          (16 byte header)
//! record: block 0 (≤ blocksize elements)
//! record: block 1
//! ...
//! ```
//!
//! # Formatted layout
//!
//! ```text
//!  'PRESSURE'        1200 'REAL'
//!    0.25000000E+03   0.25100000E+03   0.25200000E+03   0.25300000E+03
//!   ...
//! ```
//!
//! A line holds at most `columns` values and every block ends its last line.

use std::io::{BufRead, Seek, Write};

use byteorder::{ByteOrder, NativeEndian};

use super::{BOOL_FALSE, BOOL_TRUE, Keyword, KeywordHeader, NAME_LEN};
use crate::{
    data_type::DataType,
    error::{Error, Result},
    fortio::{self, FortIo, swap_elements},
};

/// Size of an unformatted header record payload.
pub const HEADER_RECORD_SIZE: usize = 16;

const TYPE_CODE_LEN: usize = 4;

/// Upper bound on the bytes reserved before any data has been read.
const PREALLOC_LIMIT: usize = 1 << 20;

impl KeywordHeader {
    /// Reads the next header, or `None` at a clean end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] or [`Error::UnknownType`] if the
    /// header does not parse, and [`Error::Io`] on stream failure.
    pub fn read_from<R: BufRead + Seek>(io: &mut FortIo<R>) -> Result<Option<Self>> {
        if io.at_eof()? {
            return Ok(None);
        }
        let offset = io.tell()?;
        let (name, count, code) = if io.is_formatted() {
            let name = io.read_quoted(NAME_LEN)?;
            let count = io.read_int()?;
            let code = io.read_quoted(TYPE_CODE_LEN)?;
            io.finish_line()?;
            (name, count, code)
        } else {
            let record = io.read_record_exact(HEADER_RECORD_SIZE)?;
            let count = io.endian().read_i32(&record[NAME_LEN..NAME_LEN + 4]);
            (record[..NAME_LEN].to_vec(), count, record[NAME_LEN + 4..].to_vec())
        };

        let malformed = |reason: String| Error::MalformedHeader { offset, reason };
        let name = String::from_utf8(name)
            .map_err(|_| malformed("keyword name is not text".to_string()))?;
        let count = usize::try_from(count)
            .map_err(|_| malformed(format!("negative element count {count}")))?;
        let code = String::from_utf8(code)
            .map_err(|_| malformed("type code is not text".to_string()))?;
        let data_type = DataType::from_code(&code)?;

        let header = Self::new(&name, data_type, count)
            .map_err(|_| malformed(format!("invalid keyword name {name:?}")))?;
        Ok(Some(header))
    }

    /// Writes this header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails or the count exceeds `i32`.
    pub fn write_to<W: Write>(&self, io: &mut FortIo<W>) -> Result<()> {
        let count = i32::try_from(self.count).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "element count exceeds i32::MAX")
        })?;
        let code = self.data_type.code();
        if io.is_formatted() {
            io.write_text(&format!(" '{}' {:11} '{}'\n", self.padded_name(), count, code))
        } else {
            let mut record = [0u8; HEADER_RECORD_SIZE];
            record[..NAME_LEN].copy_from_slice(self.padded_name().as_bytes());
            io.endian().write_i32(&mut record[NAME_LEN..NAME_LEN + 4], count);
            record[NAME_LEN + 4..].copy_from_slice(code.as_bytes());
            io.write_record(&record)
        }
    }

    /// Iterates `(first_element, element_count)` for each data block.
    fn blocks(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let count = self.count;
        let blocksize = self.data_type.blocksize();
        (0..count).step_by(blocksize).map(move |start| (start, blocksize.min(count - start)))
    }
}

impl Keyword {
    /// Reads a complete keyword: header followed by its data blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] (`UnexpectedEof`) if the stream is already at
    /// its end, and any error from [`KeywordHeader::read_from`] or
    /// [`read_data`](Self::read_data).
    pub fn read_from<R: BufRead + Seek>(io: &mut FortIo<R>) -> Result<Self> {
        let header = KeywordHeader::read_from(io)?.ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no keyword at end of stream")
        })?;
        Self::read_data(header, io)
    }

    /// Reads the data blocks belonging to `header`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if a block record has the wrong
    /// size or a formatted value does not parse, [`Error::RecordMismatch`]
    /// for bad framing, and [`Error::Io`] on stream failure.
    pub fn read_data<R: BufRead + Seek>(header: KeywordHeader, io: &mut FortIo<R>) -> Result<Self> {
        let data_type = header.data_type;
        let width = data_type.width();
        // The count comes from the file; grow as values arrive instead of
        // trusting it up front.
        let mut data = Vec::with_capacity(header.byte_len().min(PREALLOC_LIMIT));

        if io.is_formatted() {
            if data_type != DataType::Message && header.count > 0 {
                let mut element = vec![0u8; width];
                for _ in 0..header.count {
                    read_formatted_element(io, data_type, &mut element)?;
                    data.extend_from_slice(&element);
                }
                io.finish_line()?;
            }
        } else {
            let swap = data_type.is_numeric() && io.endian().needs_swap();
            for (_, elements) in header.blocks() {
                let mut block = io.read_record_exact(elements * width)?;
                if swap {
                    swap_elements(&mut block, width);
                }
                data.extend_from_slice(&block);
            }
        }

        Ok(Self { header, data })
    }

    /// Consumes the data blocks of `header` without keeping them.
    ///
    /// Unformatted blocks are skipped by seeking. Formatted files have no
    /// framing, so every value is still parsed.
    ///
    /// # Errors
    ///
    /// Same as [`read_data`](Self::read_data).
    pub fn skip_data<R: BufRead + Seek>(header: &KeywordHeader, io: &mut FortIo<R>) -> Result<()> {
        let data_type = header.data_type;
        let width = data_type.width();

        if io.is_formatted() {
            if data_type != DataType::Message && header.count > 0 {
                let mut scratch = vec![0u8; width];
                for _ in 0..header.count {
                    read_formatted_element(io, data_type, &mut scratch)?;
                }
                io.finish_line()?;
            }
            return Ok(());
        }

        for (_, elements) in header.blocks() {
            let offset = io.tell()?;
            let len = io.skip_record()?;
            if len != elements * width {
                return Err(Error::MalformedHeader {
                    offset,
                    reason: format!(
                        "{} block holds {len} bytes, expected {}",
                        header.name,
                        elements * width
                    ),
                });
            }
        }
        Ok(())
    }
}

impl<S: AsRef<[u8]>> Keyword<S> {
    /// Writes the header and data blocks.
    ///
    /// Numeric payloads are converted to file byte order on a scratch copy;
    /// the keyword itself is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the write fails.
    pub fn write_to<W: Write>(&self, io: &mut FortIo<W>) -> Result<()> {
        self.header.write_to(io)?;

        let data_type = self.header.data_type;
        let width = data_type.width();
        let bytes = self.as_bytes();

        if io.is_formatted() {
            if data_type == DataType::Message {
                return Ok(());
            }
            let columns = data_type.columns();
            let mut line = Vec::new();
            for (start, elements) in self.header.blocks() {
                for offset in 0..elements {
                    let index = start + offset;
                    format_element(data_type, &bytes[index * width..(index + 1) * width], &mut line);
                    if (offset + 1) % columns == 0 || offset + 1 == elements {
                        line.push(b'\n');
                        io.write_text(&line)?;
                        line.clear();
                    }
                }
            }
            return Ok(());
        }

        let swap = data_type.is_numeric() && io.endian().needs_swap();
        let mut scratch = Vec::new();
        for (start, elements) in self.header.blocks() {
            let block = &bytes[start * width..(start + elements) * width];
            if swap {
                scratch.clear();
                scratch.extend_from_slice(block);
                swap_elements(&mut scratch, width);
                io.write_record(&scratch)?;
            } else {
                io.write_record(block)?;
            }
        }
        Ok(())
    }
}

fn read_formatted_element<R: BufRead + Seek>(
    io: &mut FortIo<R>,
    data_type: DataType,
    out: &mut [u8],
) -> Result<()> {
    match data_type {
        DataType::Int => NativeEndian::write_i32(out, io.read_int()?),
        DataType::Float => NativeEndian::write_f32(out, io.read_float()?),
        DataType::Double => NativeEndian::write_f64(out, io.read_double()?),
        DataType::Bool => {
            let value = if io.read_bool()? { BOOL_TRUE } else { BOOL_FALSE };
            NativeEndian::write_i32(out, value);
        },
        DataType::Char | DataType::String(_) => {
            out.copy_from_slice(&io.read_quoted(data_type.width())?);
        },
        DataType::Message => {},
    }
    Ok(())
}

fn format_element(data_type: DataType, element: &[u8], line: &mut Vec<u8>) {
    match data_type {
        DataType::Int => {
            line.extend_from_slice(fortio::format_int(NativeEndian::read_i32(element)).as_bytes());
        },
        DataType::Float => {
            line.extend_from_slice(fortio::format_float(NativeEndian::read_f32(element)).as_bytes());
        },
        DataType::Double => {
            line.extend_from_slice(fortio::format_double(NativeEndian::read_f64(element)).as_bytes());
        },
        DataType::Bool => {
            let value = NativeEndian::read_i32(element) != BOOL_FALSE;
            line.extend_from_slice(fortio::format_bool(value).as_bytes());
        },
        DataType::Char | DataType::String(_) => {
            line.extend_from_slice(&fortio::format_quoted(element));
        },
        DataType::Message => {},
    }
}
