//! Proptest strategies for keyword file types.
//!
//! Reusable generators for property-based testing across crates. Two families
//! are provided: [`arb_keyword`] explores every bit pattern and is meant for
//! unformatted round trips, while [`arb_text_safe_keyword`] only produces
//! values that survive the fixed-precision text encoding of formatted files.
//!
//! # Usage
//!
//! ```no_run
//! use eclfile_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(kw in strategies::arb_keyword()) {
//!         // test invariant with a randomly generated keyword
//!     }
//! }
//! ```

// Generated values are valid by construction; a failure here is a bug in the strategy.
#![allow(clippy::expect_used)]

use eclfile_store::{DataType, Keyword};
use proptest::prelude::*;

/// Generates a keyword name of 1-8 characters matching `[A-Z][A-Z0-9_]{0,7}`.
pub fn arb_name() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,7}"
}

/// Generates an element count, biased towards the block boundaries at 1000
/// (numeric) and 105 (character) elements.
pub fn arb_count() -> impl Strategy<Value = usize> {
    prop_oneof![
        3 => 0usize..16,
        1 => 100usize..110,
        1 => 995usize..1006,
    ]
}

/// Generates a character element of at most `width` printable characters.
pub fn arb_text(width: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[A-Z0-9_ ]{{0,{width}}}"))
        .expect("valid regex")
        .prop_map(|s| s.trim_end().to_string())
}

fn owned(keyword: eclfile_store::Result<Keyword>) -> Keyword {
    keyword.expect("generated keyword is valid")
}

/// Generates an arbitrary keyword of any element type with arbitrary bits.
pub fn arb_keyword() -> impl Strategy<Value = Keyword> {
    (arb_name(), arb_count()).prop_flat_map(|(name, count)| {
        let n1 = name.clone();
        let n2 = name.clone();
        let n3 = name.clone();
        let n4 = name.clone();
        let n5 = name.clone();
        prop_oneof![
            proptest::collection::vec(any::<i32>(), count)
                .prop_map(move |v| owned(Keyword::from_values(&n1, &v))),
            proptest::collection::vec(any::<f32>(), count)
                .prop_map(move |v| owned(Keyword::from_values(&n2, &v))),
            proptest::collection::vec(any::<f64>(), count)
                .prop_map(move |v| owned(Keyword::from_values(&n3, &v))),
            proptest::collection::vec(any::<bool>(), count)
                .prop_map(move |v| owned(Keyword::from_values(&n4, &v))),
            proptest::collection::vec(arb_text(8), count).prop_map(move |v| {
                let refs: Vec<&str> = v.iter().map(String::as_str).collect();
                owned(Keyword::from_strings(&n5, DataType::Char, &refs))
            }),
            Just(owned(Keyword::message(&name))),
        ]
    })
}

/// Generates keywords whose values are exactly representable in formatted
/// files: quarter-integer floats and eighth-integer doubles.
pub fn arb_text_safe_keyword() -> impl Strategy<Value = Keyword> {
    (arb_name(), arb_count()).prop_flat_map(|(name, count)| {
        let n1 = name.clone();
        let n2 = name.clone();
        let n3 = name.clone();
        let n4 = name.clone();
        let n5 = name.clone();
        prop_oneof![
            proptest::collection::vec(any::<i32>(), count)
                .prop_map(move |v| owned(Keyword::from_values(&n1, &v))),
            proptest::collection::vec(-1_000_000i32..1_000_000, count).prop_map(move |v| {
                let values: Vec<f32> = v.iter().map(|&i| i as f32 / 4.0).collect();
                owned(Keyword::from_values(&n2, &values))
            }),
            proptest::collection::vec(-1_000_000_000i64..1_000_000_000, count).prop_map(move |v| {
                let values: Vec<f64> = v.iter().map(|&i| i as f64 / 8.0).collect();
                owned(Keyword::from_values(&n3, &values))
            }),
            proptest::collection::vec(any::<bool>(), count)
                .prop_map(move |v| owned(Keyword::from_values(&n4, &v))),
            (1usize..=24).prop_flat_map(move |width| {
                let name = n5.clone();
                proptest::collection::vec(arb_text(width), count).prop_map(move |v| {
                    let refs: Vec<&str> = v.iter().map(String::as_str).collect();
                    owned(Keyword::from_strings(&name, DataType::String(width), &refs))
                })
            }),
            Just(owned(Keyword::message(&name))),
        ]
    })
}

/// Generates a short sequence of keywords.
pub fn arb_keyword_sequence() -> impl Strategy<Value = Vec<Keyword>> {
    proptest::collection::vec(arb_keyword(), 0..6)
}
