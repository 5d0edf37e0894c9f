//! Element types and their on-disk descriptors.
//!
//! Every keyword holds a homogeneous array of one [`DataType`]. The type fixes
//! the element width, the four character code written in the keyword header,
//! the number of elements per on-disk block, and the column layout used by
//! formatted files.

use std::fmt;

use crate::error::{Error, Result};

/// Elements per block for numeric and logical keywords.
pub const BLOCKSIZE_NUMERIC: usize = 1000;

/// Elements per block for character, string and message keywords.
pub const BLOCKSIZE_CHAR: usize = 105;

/// Width of a `CHAR` element in bytes.
pub const CHAR_WIDTH: usize = 8;

/// Longest supported `Cnnn` string element.
pub const MAX_STRING_WIDTH: usize = 999;

/// Element type of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 32-bit signed integer (`INTE`).
    Int,
    /// 32-bit IEEE float (`REAL`).
    Float,
    /// 64-bit IEEE float (`DOUB`).
    Double,
    /// Logical stored as a 32-bit integer (`LOGI`).
    Bool,
    /// Eight character, space padded string (`CHAR`).
    Char,
    /// Space padded string of the given width (`Cnnn`).
    String(usize),
    /// Zero width message marker (`MESS`).
    Message,
}

impl DataType {
    /// Element width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::Int | Self::Float | Self::Bool => 4,
            Self::Double => 8,
            Self::Char => CHAR_WIDTH,
            Self::String(width) => width,
            Self::Message => 0,
        }
    }

    /// Number of elements stored per on-disk block.
    ///
    /// This is part of the file layout and must not be changed.
    pub const fn blocksize(self) -> usize {
        if self.is_textual() { BLOCKSIZE_CHAR } else { BLOCKSIZE_NUMERIC }
    }

    /// Number of values per line in formatted files.
    pub const fn columns(self) -> usize {
        match self {
            Self::Int => 6,
            Self::Float => 4,
            Self::Double => 3,
            Self::Bool => 25,
            Self::Char | Self::String(_) => 7,
            Self::Message => 1,
        }
    }

    /// True for character, string and message types.
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Char | Self::String(_) | Self::Message)
    }

    /// True for types whose payload is byte-swapped on unformatted I/O.
    pub const fn is_numeric(self) -> bool {
        !self.is_textual()
    }

    /// The four character type code written in keyword headers.
    pub fn code(self) -> String {
        match self {
            Self::Int => "INTE".to_string(),
            Self::Float => "REAL".to_string(),
            Self::Double => "DOUB".to_string(),
            Self::Bool => "LOGI".to_string(),
            Self::Char => "CHAR".to_string(),
            Self::String(width) => format!("C{width:03}"),
            Self::Message => "MESS".to_string(),
        }
    }

    /// Parses a four character type code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if the code is not recognized.
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "INTE" => Ok(Self::Int),
            "REAL" => Ok(Self::Float),
            "DOUB" => Ok(Self::Double),
            "LOGI" => Ok(Self::Bool),
            "CHAR" => Ok(Self::Char),
            "MESS" => Ok(Self::Message),
            _ => parse_string_code(code).ok_or_else(|| Error::UnknownType { code: code.to_string() }),
        }
    }
}

fn parse_string_code(code: &str) -> Option<DataType> {
    let digits = code.strip_prefix('C')?;
    if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<usize>().ok()? {
        0 => None,
        width => Some(DataType::String(width)),
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}
