//! Fuzz target for keyword file scanning and payload loads.
//!
//! Feeds arbitrary bytes through the scanner in both encodings. Scanning
//! must never panic, and every keyword the scan accepted must either load
//! with the recorded header or fail with an error.

#![no_main]

use libfuzzer_sys::fuzz_target;

use eclfile_store::{EclFile, Endian, FileConfig, StepSelector};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let formatted = data[0] & 1 == 1;
    let endian = if data[0] & 2 == 2 { Endian::Little } else { Endian::Big };
    let config = FileConfig::builder().formatted(formatted).endian(endian).build();
    let Ok(file) = EclFile::from_bytes(data[1..].to_vec(), &config) else {
        return;
    };

    for position in 0..file.len() {
        let header = file.store().header(position).cloned();
        if let Ok(keyword) = file.iget(position) {
            assert_eq!(Some(keyword.header()), header.as_ref(), "loaded header differs from scan");
            assert_eq!(file.position_of(keyword), Some(position), "inverse map out of sync");
        }
    }

    // Step lookups decode marker payloads and must tolerate any content.
    let _ = file.restart_view(StepSelector::ReportStep(1));
    let _ = file.restart_view(StepSelector::SimDays(0.0));
});
