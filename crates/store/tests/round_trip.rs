//! Write-then-read fidelity across encodings, plus cache behaviour of
//! file handles.

// Test code is allowed to use unwrap for simplicity
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use eclfile_store::{
    DataType, EclFile, EclWriter, Endian, FileConfig, FileKind, Keyword, View,
};
use eclfile_test_utils::{TestDir, fixtures, strategies};
use proptest::prelude::*;

fn mixed_keywords() -> Vec<Keyword> {
    vec![
        Keyword::from_strings("FILEHEAD", DataType::Char, &["ECLIPSE", "100"]).unwrap(),
        Keyword::from_values("PORO", &[0.25f32, 0.5, -1.75]).unwrap(),
        Keyword::from_values("TRANX", &[1.125f64, 0.0, 1e6]).unwrap(),
        Keyword::from_values("ACTIVE", &[true, false, true]).unwrap(),
        Keyword::from_strings("WELLS", DataType::String(12), &["PROD-1", "INJECTOR-22"]).unwrap(),
        Keyword::message("ENDGRID").unwrap(),
        Keyword::from_values("BIG", &(0..2_501i32).collect::<Vec<_>>()).unwrap(),
    ]
}

fn write_all(path: &std::path::Path, keywords: &[Keyword], config: &FileConfig) {
    let mut writer = EclWriter::create_with_config(path, config).unwrap();
    for keyword in keywords {
        writer.write_keyword(keyword).unwrap();
    }
    writer.flush().unwrap();
}

fn read_all(path: &std::path::Path, config: &FileConfig) -> Vec<Keyword> {
    let file = EclFile::open_with_config(path, config).unwrap().expect("file exists");
    assert!(file.is_complete(), "{:?}", file.scan_error());
    (0..file.len()).map(|i| file.iget(i).unwrap().clone()).collect()
}

// ============================================
// Encodings
// ============================================

#[test]
fn test_unformatted_round_trip() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::Init, false, 0);
    let config = FileConfig::default();
    write_all(&path, &mixed_keywords(), &config);
    assert_eq!(read_all(&path, &config), mixed_keywords());
}

#[test]
fn test_formatted_round_trip() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::Init, true, 0);
    let config = FileConfig::default();
    write_all(&path, &mixed_keywords(), &config);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(" 'FILEHEAD'           2 'CHAR'\n"));
    assert_eq!(read_all(&path, &config), mixed_keywords());
}

#[test]
fn test_little_endian_round_trip() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::Init, false, 0);
    let config = FileConfig::builder().endian(Endian::Little).build();
    write_all(&path, &mixed_keywords(), &config);

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes[..4], 16i32.to_le_bytes());
    assert_eq!(read_all(&path, &config), mixed_keywords());
}

#[test]
fn test_forced_format_overrides_extension() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::Init, false, 0);
    let config = FileConfig::builder().formatted(true).build();
    write_all(&path, &mixed_keywords(), &config);

    let file = EclFile::open_with_config(&path, &config).unwrap().unwrap();
    assert!(file.is_formatted());
    assert_eq!(file.read::<f64>("TRANX", 0).unwrap(), vec![1.125, 0.0, 1e6]);
}

#[test]
fn test_append_extends_file() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::UnifiedSummary, false, 0);
    {
        let mut writer = EclWriter::create(&path).unwrap();
        writer.write_values("PARAMS", &[1.0f32]).unwrap();
        writer.flush().unwrap();
    }
    {
        let mut writer = EclWriter::append(&path).unwrap();
        writer.write_values("PARAMS", &[2.0f32]).unwrap();
        writer.flush().unwrap();
    }

    let file = EclFile::open(&path).unwrap().unwrap();
    assert_eq!(file.count("PARAMS"), 2);
    assert_eq!(file.read::<f32>("PARAMS", 1).unwrap(), vec![2.0]);
}

// ============================================
// Cache behaviour
// ============================================

#[test]
fn test_repeated_access_shares_one_copy() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::UnifiedRestart, false, 0);
    fixtures::write_unified_restart(&path, &[1, 2]).unwrap();
    let file = EclFile::open(&path).unwrap().unwrap();

    let by_name = file.get("PRESSURE", 1).unwrap();
    let position = file.global_view().nth("PRESSURE", 1).unwrap();
    let by_index = file.iget(position).unwrap();
    assert!(std::ptr::eq(by_name, by_index));
    assert_eq!(file.position_of(by_name), Some(position));
    assert_eq!(file.store().descriptor(position).unwrap().ref_count(), 2);
    assert_eq!(file.store().loaded_count(), 1);
}

#[test]
fn test_child_views_share_the_cache() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::UnifiedRestart, false, 0);
    fixtures::write_unified_restart(&path, &[1, 2]).unwrap();
    let file = EclFile::open(&path).unwrap().unwrap();

    let step: View = file.restart_view(eclfile_store::StepSelector::Index(1)).unwrap().unwrap();
    let from_step = step.get(file.store(), "SWAT", 0).unwrap();
    let from_global = file.get("SWAT", 1).unwrap();
    assert!(std::ptr::eq(from_step, from_global));
}

#[test]
fn test_drop_keyword_reloads_equal_data() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::UnifiedRestart, false, 0);
    fixtures::write_unified_restart(&path, &[1]).unwrap();
    let mut file = EclFile::open(&path).unwrap().unwrap();

    let position = file.global_view().nth("PRESSURE", 0).unwrap();
    let before = file.iget(position).unwrap().clone();
    file.drop_keyword(position).unwrap();
    assert!(!file.store().descriptor(position).unwrap().is_loaded());
    assert_eq!(file.iget(position).unwrap(), &before);
}

#[test]
fn test_close_stream_between_accesses() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::UnifiedRestart, false, 0);
    fixtures::write_unified_restart(&path, &[1, 2]).unwrap();
    let config = FileConfig::builder().close_stream_between_accesses(true).build();

    let file = EclFile::open_with_config(&path, &config).unwrap().unwrap();
    assert!(!file.store().has_open_stream());
    assert_eq!(file.read::<f32>("PRESSURE", 1).unwrap()[0], 200.0);
    assert!(!file.store().has_open_stream());

    let kept = EclFile::open(&path).unwrap().unwrap();
    assert!(kept.store().has_open_stream());
    assert_eq!(kept.read::<f32>("PRESSURE", 1).unwrap()[0], 200.0);
}

#[test]
fn test_rewrite_keyword_persists() {
    let dir = TestDir::new();
    let path = dir.case_file(FileKind::UnifiedRestart, false, 0);
    fixtures::write_unified_restart(&path, &[1]).unwrap();

    {
        let config = FileConfig::builder().writable(true).build();
        let mut file = EclFile::open_with_config(&path, &config).unwrap().unwrap();
        let position = file.global_view().nth("SWAT", 0).unwrap();
        let mut swat = file.iget(position).unwrap().clone();
        swat.set(0, 0.5f32).unwrap();
        file.rewrite_keyword(position, &swat).unwrap();
        assert_eq!(file.read::<f32>("SWAT", 0).unwrap()[0], 0.5);
    }

    let file = EclFile::open(&path).unwrap().unwrap();
    let swat: Vec<f32> = file.read("SWAT", 0).unwrap();
    assert_eq!(swat[0], 0.5);
    assert_eq!(swat[1], 0.125);
}

// ============================================
// Properties
// ============================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any keyword sequence survives an unformatted file round trip bit for bit.
    #[test]
    fn prop_unformatted_files_round_trip(keywords in strategies::arb_keyword_sequence()) {
        let bytes = fixtures::encode(&keywords, false, Endian::Big).unwrap();
        let file = EclFile::from_bytes(bytes, &FileConfig::builder().formatted(false).build()).unwrap();
        prop_assert!(file.is_complete());
        prop_assert_eq!(file.len(), keywords.len());
        for (i, expected) in keywords.iter().enumerate() {
            prop_assert_eq!(file.iget(i).unwrap(), expected);
        }
    }

    /// Text-safe keywords survive a formatted round trip unchanged.
    #[test]
    fn prop_formatted_files_round_trip(
        keywords in proptest::collection::vec(strategies::arb_text_safe_keyword(), 0..4)
    ) {
        let bytes = fixtures::encode(&keywords, true, Endian::Big).unwrap();
        let file = EclFile::from_bytes(bytes, &FileConfig::builder().formatted(true).build()).unwrap();
        prop_assert!(file.is_complete(), "{:?}", file.scan_error());
        prop_assert_eq!(file.len(), keywords.len());
        for (i, expected) in keywords.iter().enumerate() {
            prop_assert_eq!(file.iget(i).unwrap(), expected);
        }
    }
}
