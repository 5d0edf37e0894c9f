//! Synthetic keyword files.
//!
//! Builders for small but structurally complete restart files, used by
//! integration tests and benches. Every step gets a header whose date is
//! [`START`] plus `step * DAYS_PER_STEP` days and two field arrays whose
//! values encode the step number.

#![allow(clippy::expect_used)]

use std::{io::Cursor, path::Path};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use eclfile_store::{
    EclWriter, Endian, FileConfig, FortIo, Keyword, RestartHeader, Result, restart::SEQNUM,
};

/// Days between consecutive report steps.
pub const DAYS_PER_STEP: i64 = 30;

/// Cells in every field array.
pub const CELLS: usize = 12;

/// Simulation start date of every fixture.
pub const START: (i32, u32, u32) = (2020, 1, 1);

/// Calendar time of `step`.
#[must_use]
pub fn step_time(step: i32) -> NaiveDateTime {
    let (year, month, day) = START;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid start date")
        + Duration::days(i64::from(step) * DAYS_PER_STEP)
}

/// Elapsed days of `step`.
#[must_use]
pub fn step_days(step: i32) -> f64 {
    (i64::from(step) * DAYS_PER_STEP) as f64
}

/// Header for `step` on a 2 x 3 x 2 grid.
#[must_use]
pub fn restart_header(step: i32) -> RestartHeader {
    RestartHeader::builder()
        .report_step(step)
        .sim_time(step_time(step))
        .sim_days(step_days(step))
        .nx(2)
        .ny(3)
        .nz(2)
        .nactive(CELLS as i32)
        .build()
}

/// Solution arrays of `step`: `PRESSURE = 100 * step + cell`, `SWAT = step / 8`.
#[must_use]
pub fn step_fields(step: i32) -> Vec<Keyword> {
    let pressure: Vec<f32> = (0..CELLS).map(|cell| (100 * step) as f32 + cell as f32).collect();
    let swat = vec![step as f32 / 8.0; CELLS];
    vec![
        Keyword::from_values("PRESSURE", &pressure).expect("valid keyword"),
        Keyword::from_values("SWAT", &swat).expect("valid keyword"),
    ]
}

/// Writes a unified restart file holding `steps`, in order.
///
/// # Errors
///
/// Returns any error from [`EclWriter`].
pub fn write_unified_restart(path: impl AsRef<Path>, steps: &[i32]) -> Result<()> {
    write_unified_restart_with_config(path, steps, &FileConfig::default())
}

/// Writes a unified restart file holding `steps` with explicit options.
///
/// # Errors
///
/// Returns any error from [`EclWriter`].
pub fn write_unified_restart_with_config(
    path: impl AsRef<Path>,
    steps: &[i32],
    config: &FileConfig,
) -> Result<()> {
    let config = FileConfig { unified: Some(true), ..config.clone() };
    let mut writer = EclWriter::create_with_config(path, &config)?;
    for &step in steps {
        writer.write_restart_step(&restart_header(step), &step_fields(step))?;
    }
    writer.flush()
}

/// Minimal unified restart bytes: per step `SEQNUM`, `INTEHEAD`, `DOUBHEAD`.
///
/// # Errors
///
/// Returns any codec error.
pub fn minimal_restart_bytes(steps: &[i32], formatted: bool) -> Result<Vec<u8>> {
    let mut io = FortIo::new(Cursor::new(Vec::new()), formatted, Endian::Big);
    for &step in steps {
        let header = restart_header(step);
        Keyword::from_values(SEQNUM, &[step])?.write_to(&mut io)?;
        header.to_intehead()?.write_to(&mut io)?;
        header.to_doubhead()?.write_to(&mut io)?;
    }
    Ok(io.into_inner().into_inner())
}

/// Encodes `keywords` back to back.
///
/// # Errors
///
/// Returns any codec error.
pub fn encode(keywords: &[Keyword], formatted: bool, endian: Endian) -> Result<Vec<u8>> {
    let mut io = FortIo::new(Cursor::new(Vec::new()), formatted, endian);
    for keyword in keywords {
        keyword.write_to(&mut io)?;
    }
    Ok(io.into_inner().into_inner())
}
