//! Typed keywords: named, homogeneous arrays.
//!
//! A [`Keyword`] pairs a [`KeywordHeader`] (name, element type, element
//! count) with a byte buffer of exactly `count * width` bytes. Elements are
//! held in host byte order; conversion to file order happens in the codec
//! layer ([`io`]).
//!
//! Storage is a type parameter. `Keyword<Vec<u8>>` (the default) owns its
//! buffer and can be resized; `Keyword<&[u8]>` and `Keyword<&mut [u8]>` wrap
//! memory owned elsewhere and have no `resize` at all.

mod io;

use std::{borrow::Cow, fmt};

use byteorder::{ByteOrder, NativeEndian};

use crate::{
    data_type::{DataType, MAX_STRING_WIDTH},
    error::{Error, Result},
};

/// Maximum keyword name length.
pub const NAME_LEN: usize = 8;

/// In-memory value of a true `LOGI` element.
pub const BOOL_TRUE: i32 = -1;

/// In-memory value of a false `LOGI` element.
pub const BOOL_FALSE: i32 = 0;

/// Name, element type and element count of a keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordHeader {
    name: String,
    data_type: DataType,
    count: usize,
}

impl KeywordHeader {
    /// Creates a header, validating the name.
    ///
    /// Trailing spaces are stripped; names are padded again on write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is longer than eight
    /// characters, contains a quote, or has non-printable characters.
    /// Returns [`Error::UnknownType`] for a `Cnnn` width outside 1..=999.
    pub fn new(name: &str, data_type: DataType, count: usize) -> Result<Self> {
        let trimmed = name.trim_end();
        let valid = trimmed.len() <= NAME_LEN
            && trimmed.bytes().all(|b| (b.is_ascii_graphic() || b == b' ') && b != b'\'');
        if !valid {
            return Err(Error::InvalidName { name: name.to_string() });
        }
        if let DataType::String(width) = data_type {
            if width == 0 || width > MAX_STRING_WIDTH {
                return Err(Error::UnknownType { code: format!("C{width}") });
            }
        }
        Ok(Self { name: trimmed.to_string(), data_type, count })
    }

    /// Keyword name without padding.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name padded with spaces to eight characters.
    pub fn padded_name(&self) -> String {
        format!("{:<width$}", self.name, width = NAME_LEN)
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of elements.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.count * self.data_type.width()
    }

    /// Number of on-disk data blocks.
    pub fn block_count(&self) -> usize {
        self.count.div_ceil(self.data_type.blocksize())
    }
}

impl fmt::Display for KeywordHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{} x {}]", self.name, self.count, self.data_type)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for i32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for bool {}
}

/// A fixed-width element type that can be read from and written to a
/// keyword buffer.
pub trait Element: Copy + sealed::Sealed {
    /// The keyword type holding elements of this Rust type.
    const DATA_TYPE: DataType;

    /// Decodes one element from host-order bytes.
    fn decode(bytes: &[u8]) -> Self;

    /// Encodes one element into host-order bytes.
    fn encode(self, bytes: &mut [u8]);
}

impl Element for i32 {
    const DATA_TYPE: DataType = DataType::Int;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_i32(bytes)
    }

    fn encode(self, bytes: &mut [u8]) {
        NativeEndian::write_i32(bytes, self);
    }
}

impl Element for f32 {
    const DATA_TYPE: DataType = DataType::Float;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_f32(bytes)
    }

    fn encode(self, bytes: &mut [u8]) {
        NativeEndian::write_f32(bytes, self);
    }
}

impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_f64(bytes)
    }

    fn encode(self, bytes: &mut [u8]) {
        NativeEndian::write_f64(bytes, self);
    }
}

impl Element for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    // Some writers use 1 instead of -1 for true, so anything non-zero reads as true.
    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_i32(bytes) != BOOL_FALSE
    }

    fn encode(self, bytes: &mut [u8]) {
        NativeEndian::write_i32(bytes, if self { BOOL_TRUE } else { BOOL_FALSE });
    }
}

/// A named, typed, fixed-length array.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword<S = Vec<u8>> {
    header: KeywordHeader,
    data: S,
}

/// Byte used to fill fresh elements of the given type.
fn fill_byte(data_type: DataType) -> u8 {
    if data_type.is_textual() { b' ' } else { 0 }
}

impl Keyword {
    /// Allocates an owned keyword with every element zeroed.
    ///
    /// Character elements are filled with spaces rather than NUL bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an invalid name.
    pub fn alloc(name: &str, data_type: DataType, count: usize) -> Result<Self> {
        let header = KeywordHeader::new(name, data_type, count)?;
        let data = vec![fill_byte(data_type); header.byte_len()];
        Ok(Self { header, data })
    }

    /// Builds an owned keyword from a slice of values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an invalid name.
    pub fn from_values<T: Element>(name: &str, values: &[T]) -> Result<Self> {
        let mut keyword = Self::alloc(name, T::DATA_TYPE, values.len())?;
        let width = T::DATA_TYPE.width();
        for (chunk, value) in keyword.data.chunks_exact_mut(width).zip(values) {
            value.encode(chunk);
        }
        Ok(keyword)
    }

    /// Builds an owned character or string keyword.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `data_type` is not `Char` or
    /// `String`, and [`Error::StringTooLong`] if a value does not fit.
    pub fn from_strings(name: &str, data_type: DataType, values: &[&str]) -> Result<Self> {
        if !matches!(data_type, DataType::Char | DataType::String(_)) {
            return Err(Error::TypeMismatch {
                name: name.to_string(),
                expected: DataType::Char,
                found: data_type,
            });
        }
        let mut keyword = Self::alloc(name, data_type, values.len())?;
        for (index, value) in values.iter().enumerate() {
            keyword.set_str(index, value)?;
        }
        Ok(keyword)
    }

    /// Builds a zero-length message marker such as `STARTSOL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] for an invalid name.
    pub fn message(name: &str) -> Result<Self> {
        Self::alloc(name, DataType::Message, 0)
    }

    /// Changes the element count.
    ///
    /// Shrinking truncates; growing zero-fills (space-fills for character
    /// types) the new tail.
    pub fn resize(&mut self, count: usize) {
        let fill = fill_byte(self.header.data_type);
        self.header.count = count;
        self.data.resize(self.header.byte_len(), fill);
    }

    /// Consumes the keyword and returns its host-order payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl<S: AsRef<[u8]>> Keyword<S> {
    /// Wraps storage owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferSize`] if `storage` is not exactly
    /// `count * width` bytes, or [`Error::InvalidName`] for an invalid name.
    pub fn wrap(name: &str, data_type: DataType, count: usize, storage: S) -> Result<Self> {
        let header = KeywordHeader::new(name, data_type, count)?;
        let actual = storage.as_ref().len();
        if actual != header.byte_len() {
            return Err(Error::BufferSize { data_type, count, actual });
        }
        Ok(Self { header, data: storage })
    }

    /// The keyword header.
    pub fn header(&self) -> &KeywordHeader {
        &self.header
    }

    /// Keyword name without padding.
    pub fn name(&self) -> &str {
        self.header.name()
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.header.count
    }

    /// True if the keyword holds no elements.
    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Host-order payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// True if the payload equals `raw` byte for byte.
    pub fn equal_data(&self, raw: &[u8]) -> bool {
        self.as_bytes() == raw
    }

    /// Copies the keyword into owned storage.
    pub fn to_owned_keyword(&self) -> Keyword {
        Keyword { header: self.header.clone(), data: self.as_bytes().to_vec() }
    }

    pub(crate) fn check_type(&self, expected: DataType) -> Result<()> {
        let found = self.header.data_type;
        let compatible = match expected {
            DataType::Char | DataType::String(_) => {
                matches!(found, DataType::Char | DataType::String(_))
            },
            _ => found == expected,
        };
        if !compatible {
            return Err(Error::TypeMismatch { name: self.header.name.clone(), expected, found });
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.header.count {
            return Err(Error::OutOfBounds {
                name: self.header.name.clone(),
                index,
                len: self.header.count,
            });
        }
        Ok(())
    }

    fn element(&self, index: usize) -> &[u8] {
        let width = self.header.data_type.width();
        &self.as_bytes()[index * width..(index + 1) * width]
    }

    /// Returns element `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `T` does not match the keyword type
    /// and [`Error::OutOfBounds`] if `index >= len()`.
    pub fn get<T: Element>(&self, index: usize) -> Result<T> {
        self.check_type(T::DATA_TYPE)?;
        self.check_index(index)?;
        Ok(T::decode(self.element(index)))
    }

    /// Returns character element `index` with trailing padding removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for non-character keywords and
    /// [`Error::OutOfBounds`] if `index >= len()`.
    pub fn get_str(&self, index: usize) -> Result<Cow<'_, str>> {
        self.check_type(DataType::Char)?;
        self.check_index(index)?;
        Ok(trim_text(self.element(index)))
    }

    /// Copies all elements into a vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `T` does not match the keyword type.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.check_type(T::DATA_TYPE)?;
        let width = T::DATA_TYPE.width();
        Ok(self.as_bytes().chunks_exact(width).map(T::decode).collect())
    }

    /// Iterates over all elements without copying the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `T` does not match the keyword type.
    pub fn iter<'a, T: Element + 'a>(&'a self) -> Result<impl Iterator<Item = T> + 'a> {
        self.check_type(T::DATA_TYPE)?;
        Ok(self.as_bytes().chunks_exact(T::DATA_TYPE.width()).map(T::decode))
    }

    /// Copies all character elements, trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for non-character keywords.
    pub fn strings(&self) -> Result<Vec<String>> {
        self.check_type(DataType::Char)?;
        let width = self.header.data_type.width();
        Ok(self.as_bytes().chunks_exact(width).map(|e| trim_text(e).into_owned()).collect())
    }
}

impl<S: AsRef<[u8]> + AsMut<[u8]>> Keyword<S> {
    fn element_mut(&mut self, index: usize) -> &mut [u8] {
        let width = self.header.data_type.width();
        &mut self.data.as_mut()[index * width..(index + 1) * width]
    }

    /// Overwrites element `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if `T` does not match the keyword type
    /// and [`Error::OutOfBounds`] if `index >= len()`.
    pub fn set<T: Element>(&mut self, index: usize, value: T) -> Result<()> {
        self.check_type(T::DATA_TYPE)?;
        self.check_index(index)?;
        value.encode(self.element_mut(index));
        Ok(())
    }

    /// Overwrites character element `index`, padding with spaces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for non-character keywords,
    /// [`Error::OutOfBounds`] if `index >= len()`, and
    /// [`Error::StringTooLong`] if `value` does not fit the element width.
    pub fn set_str(&mut self, index: usize, value: &str) -> Result<()> {
        self.check_type(DataType::Char)?;
        self.check_index(index)?;
        let width = self.header.data_type.width();
        if value.len() > width {
            return Err(Error::StringTooLong { value: value.to_string(), width });
        }
        let element = self.element_mut(index);
        element.fill(b' ');
        element[..value.len()].copy_from_slice(value.as_bytes());
        Ok(())
    }

    /// Mutable host-order payload bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut()
    }
}

fn trim_text(bytes: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(text) => Cow::Borrowed(text.trim_end()),
        Cow::Owned(text) => Cow::Owned(text.trim_end().to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_zero_filled() {
        let kw = Keyword::alloc("PRESSURE", DataType::Float, 10).unwrap();
        assert_eq!(kw.len(), 10);
        assert_eq!(kw.as_bytes().len(), 40);
        assert!(kw.to_vec::<f32>().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_iter_matches_to_vec() {
        let kw = Keyword::from_values("NNC1", &[4i32, 8, 15]).unwrap();
        let summed: i32 = kw.iter::<i32>().unwrap().sum();
        assert_eq!(summed, 27);
        assert!(kw.iter::<f64>().is_err());
    }

    fn values_of<'a, T: Element + 'a>(kw: &'a Keyword) -> impl Iterator<Item = T> + 'a {
        kw.iter::<T>().unwrap()
    }

    #[test]
    fn test_iter_outlives_call_site() {
        let pressure = Keyword::from_values("PRESSURE", &[1.5f32, 2.5]).unwrap();
        let seqnum = Keyword::from_values("SEQNUM", &[3i32]).unwrap();
        let mut floats = values_of::<f32>(&pressure);
        let ints: Vec<i32> = values_of(&seqnum).collect();
        assert_eq!(floats.next(), Some(1.5));
        assert_eq!(ints, vec![3]);
        assert_eq!(floats.next(), Some(2.5));
    }

    #[test]
    fn test_alloc_char_is_blank() {
        let kw = Keyword::alloc("WELLS", DataType::Char, 3).unwrap();
        assert_eq!(kw.strings().unwrap(), vec!["", "", ""]);
        assert!(kw.as_bytes().iter().all(|&b| b == b' '));
    }

    #[test]
    fn test_name_validation() {
        assert!(Keyword::alloc("TOOLONGNAME", DataType::Int, 1).is_err());
        assert!(Keyword::alloc("BAD'Q", DataType::Int, 1).is_err());
        assert!(Keyword::alloc("TAB\tX", DataType::Int, 1).is_err());
        let kw = Keyword::alloc("SWAT    ", DataType::Int, 1).unwrap();
        assert_eq!(kw.name(), "SWAT");
        assert_eq!(kw.header().padded_name(), "SWAT    ");
    }

    #[test]
    fn test_string_width_validation() {
        assert!(KeywordHeader::new("ZWEL", DataType::String(0), 1).is_err());
        assert!(KeywordHeader::new("ZWEL", DataType::String(1000), 1).is_err());
        assert!(KeywordHeader::new("ZWEL", DataType::String(999), 1).is_ok());
    }

    #[test]
    fn test_get_set_typed() {
        let mut kw = Keyword::alloc("ACTNUM", DataType::Int, 4).unwrap();
        kw.set(2, 17i32).unwrap();
        assert_eq!(kw.get::<i32>(2).unwrap(), 17);
        assert_eq!(kw.to_vec::<i32>().unwrap(), vec![0, 0, 17, 0]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut kw = Keyword::alloc("ACTNUM", DataType::Int, 4).unwrap();
        assert!(matches!(kw.get::<i32>(4).unwrap_err(), Error::OutOfBounds { index: 4, len: 4, .. }));
        assert!(matches!(kw.set(9, 1i32).unwrap_err(), Error::OutOfBounds { .. }));
    }

    #[test]
    fn test_type_mismatch() {
        let kw = Keyword::from_values("PORO", &[0.25f32, 0.5]).unwrap();
        assert!(matches!(kw.get::<f64>(0).unwrap_err(), Error::TypeMismatch { .. }));
        assert!(matches!(kw.get_str(0).unwrap_err(), Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_bool_storage() {
        let kw = Keyword::from_values("LOGIHEAD", &[true, false, true]).unwrap();
        assert_eq!(kw.to_vec::<bool>().unwrap(), vec![true, false, true]);
        assert_eq!(NativeEndian::read_i32(&kw.as_bytes()[0..4]), BOOL_TRUE);
        assert_eq!(NativeEndian::read_i32(&kw.as_bytes()[4..8]), BOOL_FALSE);
    }

    #[test]
    fn test_strings() {
        let mut kw = Keyword::from_strings("KEYWORDS", DataType::Char, &["SWAT", "PRESSURE"]).unwrap();
        assert_eq!(kw.get_str(0).unwrap(), "SWAT");
        assert_eq!(kw.get_str(1).unwrap(), "PRESSURE");
        assert!(matches!(kw.set_str(0, "NINECHARS").unwrap_err(), Error::StringTooLong { .. }));

        let long = Keyword::from_strings("ZLONG", DataType::String(12), &["TWELVE CHARS"]).unwrap();
        assert_eq!(long.strings().unwrap(), vec!["TWELVE CHARS"]);
        assert!(Keyword::from_strings("X", DataType::Int, &["1"]).is_err());
    }

    #[test]
    fn test_resize_grow_and_shrink() {
        let mut kw = Keyword::from_values("TIME", &[1.0f64, 2.0]).unwrap();
        kw.resize(4);
        assert_eq!(kw.to_vec::<f64>().unwrap(), vec![1.0, 2.0, 0.0, 0.0]);
        kw.resize(1);
        assert_eq!(kw.to_vec::<f64>().unwrap(), vec![1.0]);
        assert_eq!(kw.header().count(), 1);
    }

    #[test]
    fn test_wrap_shared_storage() {
        let values = [1i32, 2, 3];
        let mut raw = vec![0u8; 12];
        for (chunk, v) in raw.chunks_exact_mut(4).zip(values) {
            v.encode(chunk);
        }
        let shared = Keyword::wrap("NUMS", DataType::Int, 3, raw.as_slice()).unwrap();
        assert_eq!(shared.to_vec::<i32>().unwrap(), values);
        assert_eq!(shared.to_owned_keyword().as_bytes(), raw.as_slice());

        let mut writable = Keyword::wrap("NUMS", DataType::Int, 3, raw.as_mut_slice()).unwrap();
        writable.set(0, 99i32).unwrap();
        assert_eq!(i32::decode(&raw[0..4]), 99);
    }

    #[test]
    fn test_wrap_rejects_wrong_length() {
        let raw = [0u8; 10];
        let err = Keyword::wrap("NUMS", DataType::Int, 3, &raw[..]).unwrap_err();
        assert!(matches!(err, Error::BufferSize { actual: 10, count: 3, .. }));
    }

    #[test]
    fn test_equal_data() {
        let kw = Keyword::from_values("SEQNUM", &[5i32]).unwrap();
        assert!(kw.equal_data(&5i32.to_ne_bytes()));
        assert!(!kw.equal_data(&6i32.to_ne_bytes()));
    }

    #[test]
    fn test_block_count() {
        for (count, blocks) in [(0, 0), (1, 1), (999, 1), (1000, 1), (1001, 2), (2500, 3)] {
            let header = KeywordHeader::new("X", DataType::Float, count).unwrap();
            assert_eq!(header.block_count(), blocks, "count {count}");
        }
        let header = KeywordHeader::new("X", DataType::Char, 106).unwrap();
        assert_eq!(header.block_count(), 2);
    }
}
