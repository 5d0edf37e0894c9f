//! Restart step headers.
//!
//! Every report step in a restart file opens with three fixed-layout header
//! arrays. Only a handful of their slots carry information this crate
//! reads or writes; the rest are written as zeros.
//!
//! ```text
//! [SEQNUM]  INTEHEAD(411 x INTE)  LOGIHEAD(121 x LOGI)  DOUBHEAD(229 x DOUB)
//!           STARTSOL  <field keywords...>  ENDSOL
//! ```

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::{
    error::{Error, Result},
    keyword::Keyword,
};

/// Report step marker in unified files.
pub const SEQNUM: &str = "SEQNUM";
/// Integer header array.
pub const INTEHEAD: &str = "INTEHEAD";
/// Logical header array.
pub const LOGIHEAD: &str = "LOGIHEAD";
/// Double header array.
pub const DOUBHEAD: &str = "DOUBHEAD";
/// Opens the solution section of a step.
pub const STARTSOL: &str = "STARTSOL";
/// Closes the solution section of a step.
pub const ENDSOL: &str = "ENDSOL";

/// Slot indices in `INTEHEAD`.
pub mod intehead {
    /// Number of elements.
    pub const SIZE: usize = 411;
    /// Unit system code.
    pub const UNIT: usize = 2;
    /// Grid dimension in x.
    pub const NX: usize = 8;
    /// Grid dimension in y.
    pub const NY: usize = 9;
    /// Grid dimension in z.
    pub const NZ: usize = 10;
    /// Number of active cells.
    pub const NACTIVE: usize = 11;
    /// Phase bitmask.
    pub const PHASE: usize = 14;
    /// Day of month.
    pub const DAY: usize = 64;
    /// Month, 1 based.
    pub const MONTH: usize = 65;
    /// Four digit year.
    pub const YEAR: usize = 66;
    /// Simulator identification.
    pub const IPROG: usize = 94;
    /// Hour of day.
    pub const HOUR: usize = 206;
    /// Minute of hour.
    pub const MINUTE: usize = 207;
    /// Seconds into the minute, in microseconds.
    pub const MICROSECOND: usize = 410;
}

/// Slot indices in `LOGIHEAD`.
pub mod logihead {
    /// Number of elements.
    pub const SIZE: usize = 121;
    /// Radial grid flag, first simulator family.
    pub const RADIAL_100: usize = 3;
    /// Radial grid flag, second simulator family.
    pub const RADIAL_300: usize = 4;
    /// Dual porosity flag.
    pub const DUALP: usize = 14;
}

/// Slot indices in `DOUBHEAD`.
pub mod doubhead {
    /// Number of elements.
    pub const SIZE: usize = 229;
    /// Elapsed simulation time in days.
    pub const DAYS: usize = 0;
}

/// Oil phase bit in the phase mask.
pub const PHASE_OIL: i32 = 1;
/// Water phase bit in the phase mask.
pub const PHASE_WATER: i32 = 2;
/// Gas phase bit in the phase mask.
pub const PHASE_GAS: i32 = 4;

/// Simulator id written to `INTEHEAD[IPROG]` by default.
pub const SIMULATOR_DEFAULT: i32 = 100;

/// Unit system recorded in `INTEHEAD[UNIT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    /// SI based metric units.
    #[default]
    Metric,
    /// Oil field units.
    Field,
    /// Laboratory units.
    Lab,
    /// Metric with pressure in atmospheres.
    PvtM,
}

impl UnitSystem {
    /// On-disk code.
    pub const fn code(self) -> i32 {
        match self {
            Self::Metric => 1,
            Self::Field => 2,
            Self::Lab => 3,
            Self::PvtM => 4,
        }
    }

    /// Parses an on-disk code.
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Metric),
            2 => Some(Self::Field),
            3 => Some(Self::Lab),
            4 => Some(Self::PvtM),
            _ => None,
        }
    }
}

/// Decoded contents of one step's header arrays.
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct RestartHeader {
    /// Report step number, also written as `SEQNUM` in unified files.
    pub report_step: i32,
    /// Calendar time of the step.
    pub sim_time: NaiveDateTime,
    /// Elapsed days since simulation start.
    #[builder(default)]
    pub sim_days: f64,
    /// Grid dimension in x.
    #[builder(default)]
    pub nx: i32,
    /// Grid dimension in y.
    #[builder(default)]
    pub ny: i32,
    /// Grid dimension in z.
    #[builder(default)]
    pub nz: i32,
    /// Number of active cells.
    #[builder(default)]
    pub nactive: i32,
    /// Phase bitmask built from `PHASE_*`.
    #[builder(default = PHASE_OIL | PHASE_WATER | PHASE_GAS)]
    pub phases: i32,
    /// Unit system.
    #[builder(default)]
    pub unit_system: UnitSystem,
    /// Simulator id.
    #[builder(default = SIMULATOR_DEFAULT)]
    pub simulator: i32,
    /// Dual porosity run.
    #[builder(default)]
    pub dual_porosity: bool,
    /// Radial grid.
    #[builder(default)]
    pub radial: bool,
}

impl RestartHeader {
    /// Encodes the `INTEHEAD` array.
    ///
    /// # Errors
    ///
    /// Never fails for valid headers; the `Result` comes from keyword
    /// construction.
    pub fn to_intehead(&self) -> Result<Keyword> {
        let mut values = vec![0i32; intehead::SIZE];
        values[intehead::UNIT] = self.unit_system.code();
        values[intehead::NX] = self.nx;
        values[intehead::NY] = self.ny;
        values[intehead::NZ] = self.nz;
        values[intehead::NACTIVE] = self.nactive;
        values[intehead::PHASE] = self.phases;
        values[intehead::DAY] = self.sim_time.day() as i32;
        values[intehead::MONTH] = self.sim_time.month() as i32;
        values[intehead::YEAR] = self.sim_time.year();
        values[intehead::IPROG] = self.simulator;
        values[intehead::HOUR] = self.sim_time.hour() as i32;
        values[intehead::MINUTE] = self.sim_time.minute() as i32;
        values[intehead::MICROSECOND] =
            (self.sim_time.second() * 1_000_000 + self.sim_time.nanosecond() / 1_000) as i32;
        Keyword::from_values(INTEHEAD, &values)
    }

    /// Encodes the `LOGIHEAD` array.
    ///
    /// # Errors
    ///
    /// See [`to_intehead`](Self::to_intehead).
    pub fn to_logihead(&self) -> Result<Keyword> {
        let mut values = vec![false; logihead::SIZE];
        values[logihead::RADIAL_100] = self.radial;
        values[logihead::RADIAL_300] = self.radial;
        values[logihead::DUALP] = self.dual_porosity;
        Keyword::from_values(LOGIHEAD, &values)
    }

    /// Encodes the `DOUBHEAD` array.
    ///
    /// # Errors
    ///
    /// See [`to_intehead`](Self::to_intehead).
    pub fn to_doubhead(&self) -> Result<Keyword> {
        let mut values = vec![0.0f64; doubhead::SIZE];
        values[doubhead::DAYS] = self.sim_days;
        Keyword::from_values(DOUBHEAD, &values)
    }

    /// Decodes a header from the arrays of one step.
    ///
    /// `LOGIHEAD` and `DOUBHEAD` are optional; missing flags read as false
    /// and missing elapsed days as zero. Slots past the end of a short
    /// `INTEHEAD` read as zero, except the date which must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] for arrays of the wrong element type,
    /// [`Error::OutOfBounds`] if `INTEHEAD` is too short to hold a date and
    /// [`Error::InvalidDate`] for impossible dates.
    pub fn from_keywords<S: AsRef<[u8]>>(
        report_step: i32,
        inte: &Keyword<S>,
        logi: Option<&Keyword<S>>,
        doub: Option<&Keyword<S>>,
    ) -> Result<Self> {
        let sim_time = sim_time_of(inte)?;
        let int = |slot: usize| -> Result<i32> { optional_slot(inte, slot, 0) };
        let flag = |slot: usize| -> Result<bool> {
            logi.map_or(Ok(false), |kw| optional_slot(kw, slot, false))
        };

        Ok(Self {
            report_step,
            sim_time,
            sim_days: doub.map_or(Ok(0.0), sim_days_of)?,
            nx: int(intehead::NX)?,
            ny: int(intehead::NY)?,
            nz: int(intehead::NZ)?,
            nactive: int(intehead::NACTIVE)?,
            phases: int(intehead::PHASE)?,
            unit_system: UnitSystem::from_code(int(intehead::UNIT)?).unwrap_or_default(),
            simulator: int(intehead::IPROG)?,
            dual_porosity: flag(logihead::DUALP)?,
            radial: flag(logihead::RADIAL_100)? || flag(logihead::RADIAL_300)?,
        })
    }
}

fn optional_slot<S: AsRef<[u8]>, T: crate::keyword::Element>(
    keyword: &Keyword<S>,
    slot: usize,
    missing: T,
) -> Result<T> {
    if slot >= keyword.len() {
        // Type errors must still surface on short arrays.
        keyword.check_type(T::DATA_TYPE)?;
        return Ok(missing);
    }
    keyword.get(slot)
}

/// Calendar time encoded in an `INTEHEAD` array.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if the fields do not form a valid date and
/// time, and the access errors described on
/// [`RestartHeader::from_keywords`].
pub fn sim_time_of<S: AsRef<[u8]>>(inte: &Keyword<S>) -> Result<NaiveDateTime> {
    let day = inte.get::<i32>(intehead::DAY)?;
    let month = inte.get::<i32>(intehead::MONTH)?;
    let year = inte.get::<i32>(intehead::YEAR)?;
    let hour = optional_slot(inte, intehead::HOUR, 0i32)?;
    let minute = optional_slot(inte, intehead::MINUTE, 0i32)?;
    let micros = optional_slot(inte, intehead::MICROSECOND, 0i32)?;

    let invalid = |reason: String| Error::InvalidDate { keyword: inte.name().to_string(), reason };
    let date = u32::try_from(month)
        .ok()
        .zip(u32::try_from(day).ok())
        .and_then(|(m, d)| NaiveDate::from_ymd_opt(year, m, d))
        .ok_or_else(|| invalid(format!("{year:04}-{month:02}-{day:02} is not a calendar date")))?;
    let time = u32::try_from(micros)
        .ok()
        .zip(u32::try_from(hour).ok())
        .zip(u32::try_from(minute).ok())
        .and_then(|((us, h), m)| NaiveTime::from_hms_micro_opt(h, m, us / 1_000_000, us % 1_000_000))
        .ok_or_else(|| invalid(format!("{hour:02}:{minute:02} +{micros}us is not a time of day")))?;
    Ok(date.and_time(time))
}

/// Elapsed days stored in a `DOUBHEAD` array.
///
/// # Errors
///
/// Returns [`Error::TypeMismatch`] or [`Error::OutOfBounds`] for arrays that
/// are not `DOUBHEAD` shaped.
pub fn sim_days_of<S: AsRef<[u8]>>(doub: &Keyword<S>) -> Result<f64> {
    doub.get::<f64>(doubhead::DAYS)
}
