//! Fuzz target for single keyword decoding.
//!
//! Tests that `Keyword::read_from` never panics on arbitrary input, and that
//! any successfully decoded keyword survives an encode/decode roundtrip in
//! both encodings' byte orders.

#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;

use eclfile_store::{Endian, FortIo, Keyword};

fuzz_target!(|data: &[u8]| {
    // The formatted decoder must survive the same bytes.
    let mut text = FortIo::new(Cursor::new(data), true, Endian::Big);
    let _ = Keyword::read_from(&mut text);

    let mut reader = FortIo::new(Cursor::new(data), false, Endian::Big);
    let Ok(keyword) = Keyword::read_from(&mut reader) else {
        return;
    };

    for endian in [Endian::Big, Endian::Little] {
        let mut writer = FortIo::new(Cursor::new(Vec::new()), false, endian);
        keyword.write_to(&mut writer).expect("re-encode");
        let encoded = writer.into_inner().into_inner();

        let mut reader = FortIo::new(Cursor::new(encoded.as_slice()), false, endian);
        let decoded = Keyword::read_from(&mut reader).expect("decode re-encoded keyword");
        assert_eq!(decoded, keyword, "roundtrip mismatch");
    }
});
