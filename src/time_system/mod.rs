//! # Time systems
//!
//! Vocabulary shared by every time conversion in the crate, plus the leap-second table,
//! the Earth orientation table, calendar helpers and the converter that ties them together.
//!
//! ## Structure
//!
//! ```text
//! time_system
//! ├── leap_seconds       LeapSecondTable (tai-utc.dat)
//! ├── earth_orientation  EarthOrientationTable (EOP C04 / finals)
//! ├── gregorian          calendar string and packed date helpers
//! └── converter          TimeConverter, pivoting through TAI
//! ```
//!
//! All epochs are real-valued modified julian dates. The origin of the modified julian date is
//! a caller-supplied reference julian date (`ref_jd`); the standard origin
//! [`JD_NOV_17_1858`](crate::constants::JD_NOV_17_1858) is used throughout the crate unless stated
//! otherwise.
//!
//! ## See also
//! ------------
//! * [`converter::TimeConverter`] – Conversions between the systems listed in [`TimeSystem`].
//! * [`gregorian`] – Text renderings of a modified julian date.
pub mod converter;
pub mod earth_orientation;
pub mod gregorian;
pub mod leap_seconds;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{constants::MJD, timecore_errors::TimeCoreError};

/// The six time scales handled by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSystem {
    A1,
    TAI,
    UTC,
    UT1,
    TDB,
    TT,
}

impl TimeSystem {
    pub const ALL: [TimeSystem; 6] = [
        TimeSystem::A1,
        TimeSystem::TAI,
        TimeSystem::UTC,
        TimeSystem::UT1,
        TimeSystem::TDB,
        TimeSystem::TT,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSystem::A1 => "A1",
            TimeSystem::TAI => "TAI",
            TimeSystem::UTC => "UTC",
            TimeSystem::UT1 => "UT1",
            TimeSystem::TDB => "TDB",
            TimeSystem::TT => "TT",
        }
    }

    /// Check whether a name designates one of the supported time systems.
    pub fn is_valid_time_system(name: &str) -> bool {
        name.parse::<TimeSystem>().is_ok()
    }
}

impl FromStr for TimeSystem {
    type Err = TimeCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(TimeSystem::A1),
            "TAI" => Ok(TimeSystem::TAI),
            "UTC" => Ok(TimeSystem::UTC),
            "UT1" => Ok(TimeSystem::UT1),
            "TDB" => Ok(TimeSystem::TDB),
            "TT" => Ok(TimeSystem::TT),
            _ => Err(TimeCoreError::UnknownTimeSystem(s.to_string())),
        }
    }
}

impl fmt::Display for TimeSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an epoch is represented: a numeric modified julian date or a Gregorian string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    ModJulian,
    Gregorian,
}

impl TimeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFormat::ModJulian => "ModJulian",
            TimeFormat::Gregorian => "Gregorian",
        }
    }
}

/// A full time representation name, such as `"UTCGregorian"` or `"A1ModJulian"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeType {
    pub system: TimeSystem,
    pub format: TimeFormat,
}

impl TimeType {
    pub fn new(system: TimeSystem, format: TimeFormat) -> Self {
        TimeType { system, format }
    }
}

impl FromStr for TimeType {
    type Err = TimeCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        get_time_system_and_format(s)
    }
}

impl fmt::Display for TimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.system, self.format.as_str())
    }
}

/// Split a time representation name into its system and format parts.
///
/// Arguments
/// -----------------
/// * `type_name`: A name such as `"TAIModJulian"` or `"UTCGregorian"`.
///
/// Return
/// ----------
/// * The parsed [`TimeType`], or [`TimeCoreError::InvalidTimeType`] if the name does not end with
///   `ModJulian`/`Gregorian` or does not start with a supported system.
pub fn get_time_system_and_format(type_name: &str) -> Result<TimeType, TimeCoreError> {
    let trimmed = type_name.trim();
    let (system, format) = if let Some(sys) = trimmed.strip_suffix("ModJulian") {
        (sys, TimeFormat::ModJulian)
    } else if let Some(sys) = trimmed.strip_suffix("Gregorian") {
        (sys, TimeFormat::Gregorian)
    } else {
        return Err(TimeCoreError::InvalidTimeType(type_name.to_string()));
    };

    let system = system
        .parse::<TimeSystem>()
        .map_err(|_| TimeCoreError::InvalidTimeType(type_name.to_string()))?;

    Ok(TimeType::new(system, format))
}

/// Every representation that may be used as a conversion endpoint, in `ALL` order with the
/// modified julian form first.
pub fn valid_time_representations() -> Vec<TimeType> {
    TimeSystem::ALL
        .iter()
        .flat_map(|sys| {
            [
                TimeType::new(*sys, TimeFormat::ModJulian),
                TimeType::new(*sys, TimeFormat::Gregorian),
            ]
        })
        .collect()
}

/// An immutable epoch: a modified julian date tagged with its time system and origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    pub mjd: MJD,
    pub system: TimeSystem,
    pub ref_jd: f64,
}

impl Epoch {
    pub fn new(mjd: MJD, system: TimeSystem) -> Self {
        Epoch {
            mjd,
            system,
            ref_jd: crate::constants::JD_NOV_17_1858,
        }
    }

    pub fn with_ref_jd(mjd: MJD, system: TimeSystem, ref_jd: f64) -> Self {
        Epoch {
            mjd,
            system,
            ref_jd,
        }
    }

    /// Express this epoch in another time system, keeping the same origin.
    ///
    /// Arguments
    /// -----------------
    /// * `converter`: The converter providing leap second and EOP data.
    /// * `target`: The time system of the returned epoch.
    ///
    /// Return
    /// ----------
    /// * A new [`Epoch`] in `target`, or the converter error.
    pub fn to_system(
        &self,
        converter: &converter::TimeConverter,
        target: TimeSystem,
    ) -> Result<Epoch, TimeCoreError> {
        let mjd = converter.convert(self.mjd, self.system, target, self.ref_jd)?;
        Ok(Epoch::with_ref_jd(mjd, target, self.ref_jd))
    }
}
