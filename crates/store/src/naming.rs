//! File naming conventions and format detection.
//!
//! The extension of a keyword file encodes what it holds, whether it is
//! formatted, and for per-step files which report step it belongs to:
//!
//! | Kind              | Unformatted | Formatted  |
//! |-------------------|-------------|------------|
//! | restart, step n   | `.Xnnnn`    | `.Fnnnn`   |
//! | unified restart   | `.UNRST`    | `.FUNRST`  |
//! | summary, step n   | `.Snnnn`    | `.Annnn`   |
//! | unified summary   | `.UNSMRY`   | `.FUNSMRY` |
//! | summary header    | `.SMSPEC`   | `.FSMSPEC` |
//! | restart header    | `.RSSPEC`   | `.FRSSPEC` |
//! | grid              | `.GRID`     | `.FGRID`   |
//! | extended grid     | `.EGRID`    | `.FEGRID`  |
//! | init              | `.INIT`     | `.FINIT`   |
//! | RFT               | `.RFT`      | `.FRFT`    |
//! | input deck        | `.DATA`     | `.DATA`    |

use std::path::{Path, PathBuf};

/// Fraction of non-text bytes below which a sample counts as formatted.
pub const FORMATTED_THRESHOLD: f64 = 1e-5;

/// What a keyword file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// One report step of restart data.
    Restart,
    /// All report steps of restart data.
    UnifiedRestart,
    /// One report step of summary vectors.
    Summary,
    /// All report steps of summary vectors.
    UnifiedSummary,
    /// Summary vector definitions.
    SummaryHeader,
    /// Restart step index.
    RestartHeader,
    /// Corner point grid.
    Grid,
    /// Extended grid.
    EGrid,
    /// Static cell properties.
    Init,
    /// Repeat formation tester data.
    Rft,
    /// Simulator input deck.
    Data,
    /// Anything else.
    Other,
}

impl FileKind {
    /// True for kinds whose extension carries a report step number.
    pub const fn is_per_step(self) -> bool {
        matches!(self, Self::Restart | Self::Summary)
    }

    /// True for kinds that hold several report steps in one file.
    pub const fn is_unified(self) -> bool {
        matches!(self, Self::UnifiedRestart | Self::UnifiedSummary)
    }
}

/// What [`classify`] learned from a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Content kind.
    pub kind: FileKind,
    /// True for formatted files.
    pub formatted: bool,
    /// Step number of per-step files.
    pub report_step: Option<u32>,
}

fn extension(kind: FileKind, formatted: bool, report_step: u32) -> String {
    let fixed = |unformatted: &str, formatted_ext: &str| {
        if formatted { formatted_ext.to_string() } else { unformatted.to_string() }
    };
    match kind {
        FileKind::Restart => format!("{}{report_step:04}", if formatted { 'F' } else { 'X' }),
        FileKind::Summary => format!("{}{report_step:04}", if formatted { 'A' } else { 'S' }),
        FileKind::UnifiedRestart => fixed("UNRST", "FUNRST"),
        FileKind::UnifiedSummary => fixed("UNSMRY", "FUNSMRY"),
        FileKind::SummaryHeader => fixed("SMSPEC", "FSMSPEC"),
        FileKind::RestartHeader => fixed("RSSPEC", "FRSSPEC"),
        FileKind::Grid => fixed("GRID", "FGRID"),
        FileKind::EGrid => fixed("EGRID", "FEGRID"),
        FileKind::Init => fixed("INIT", "FINIT"),
        FileKind::Rft => fixed("RFT", "FRFT"),
        FileKind::Data => "DATA".to_string(),
        FileKind::Other => String::new(),
    }
}

/// Builds the conventional path for a file of `kind`.
///
/// `report_step` is used by per-step kinds only. A base name written
/// entirely in lower case gets a lower case extension.
pub fn filename(
    dir: impl AsRef<Path>,
    base: &str,
    kind: FileKind,
    formatted: bool,
    report_step: u32,
) -> PathBuf {
    let mut ext = extension(kind, formatted, report_step);
    let lower = base.bytes().any(|b| b.is_ascii_lowercase())
        && !base.bytes().any(|b| b.is_ascii_uppercase());
    if lower {
        ext.make_ascii_lowercase();
    }
    if ext.is_empty() {
        dir.as_ref().join(base)
    } else {
        dir.as_ref().join(format!("{base}.{ext}"))
    }
}

fn step_suffix(ext: &str, prefix: u8) -> Option<u32> {
    let bytes = ext.as_bytes();
    if bytes.len() != 5 || bytes[0] != prefix || !bytes[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    ext[1..].parse().ok()
}

/// Derives kind, formatting and report step from a file name.
///
/// Returns `None` when the extension is not a known keyword file extension.
pub fn classify(path: impl AsRef<Path>) -> Option<FileInfo> {
    let ext = path.as_ref().extension()?.to_str()?.to_ascii_uppercase();
    let info = |kind, formatted| Some(FileInfo { kind, formatted, report_step: None });

    for (prefix, kind, formatted) in [
        (b'X', FileKind::Restart, false),
        (b'F', FileKind::Restart, true),
        (b'S', FileKind::Summary, false),
        (b'A', FileKind::Summary, true),
    ] {
        if let Some(step) = step_suffix(&ext, prefix) {
            return Some(FileInfo { kind, formatted, report_step: Some(step) });
        }
    }

    match ext.as_str() {
        "UNRST" => info(FileKind::UnifiedRestart, false),
        "FUNRST" => info(FileKind::UnifiedRestart, true),
        "UNSMRY" => info(FileKind::UnifiedSummary, false),
        "FUNSMRY" => info(FileKind::UnifiedSummary, true),
        "SMSPEC" => info(FileKind::SummaryHeader, false),
        "FSMSPEC" => info(FileKind::SummaryHeader, true),
        "RSSPEC" => info(FileKind::RestartHeader, false),
        "FRSSPEC" => info(FileKind::RestartHeader, true),
        "GRID" => info(FileKind::Grid, false),
        "FGRID" => info(FileKind::Grid, true),
        "EGRID" => info(FileKind::EGrid, false),
        "FEGRID" => info(FileKind::EGrid, true),
        "INIT" => info(FileKind::Init, false),
        "FINIT" => info(FileKind::Init, true),
        "RFT" => info(FileKind::Rft, false),
        "FRFT" => info(FileKind::Rft, true),
        "DATA" => info(FileKind::Data, true),
        _ => None,
    }
}

/// Guesses whether a sample of file content is formatted text.
///
/// Unformatted files are full of record markers and binary numbers, so
/// even a short sample contains bytes outside printable ASCII. An empty
/// sample is treated as unformatted.
pub fn looks_formatted(sample: &[u8]) -> bool {
    if sample.is_empty() {
        return false;
    }
    let binary = sample
        .iter()
        .filter(|&&b| b >= 0x7f || (b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t')))
        .count();
    (binary as f64 / sample.len() as f64) < FORMATTED_THRESHOLD
}
