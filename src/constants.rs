//! # Constants and type definitions for ephem_timecore
//!
//! This module centralizes the **time-scale offsets**, **calendar reference epochs**,
//! **analytic TDB coefficients** and the **common type aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Fixed offsets between atomic time scales (A1, TAI, TT)
//! - Julian date anchors (MJD origin, 1941 origin, J2000)
//! - Coefficients of the low-precision TDB model
//! - Supported calendar span for string conversions
//! - Type aliases shared by the time, codec and segment modules

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Modified Julian Date, in days from the configured reference Julian date
pub type MJD = f64;

/// Julian Date in days
pub type JulianDate = f64;

/// Duration in seconds
pub type Seconds = f64;

/// Duration in days
pub type Days = f64;

/// Angle in radians
pub type Radian = f64;

/// Angle in degrees
pub type Degree = f64;

/// Distance in kilometers
pub type Kilometer = f64;

// -------------------------------------------------------------------------------------------------
// Time scale offsets
// -------------------------------------------------------------------------------------------------

/// Number of seconds in a day
pub const SECS_PER_DAY: f64 = 86_400.0;

/// Number of days in a Julian century
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;

/// A.1 minus TAI, in seconds (historical USNO constant)
pub const A1_TAI_OFFSET: Seconds = 0.0343817;

/// TT minus TAI, in seconds
pub const TT_TAI_OFFSET: Seconds = 32.184;

// -------------------------------------------------------------------------------------------------
// Julian date anchors
// -------------------------------------------------------------------------------------------------

/// Julian date of 17 Nov 1858 00:00, the standard MJD origin
pub const JD_NOV_17_1858: JulianDate = 2_400_000.5;

/// Julian date of 5 Jan 1941 12:00, origin of the 1941-based MJD convention
pub const JD_JAN_5_1941: JulianDate = 2_430_000.0;

/// Julian date of J2000.0 (1 Jan 2000 12:00)
pub const JD_OF_J2000: JulianDate = 2_451_545.0;

/// MJD of J2000.0 with the standard origin
pub const MJD_OF_J2000: MJD = JD_OF_J2000 - JD_NOV_17_1858;

// -------------------------------------------------------------------------------------------------
// TDB model
// -------------------------------------------------------------------------------------------------

/// Amplitude of the annual term of TDB - TT, in seconds
pub const TDB_COEFF1: Seconds = 0.001_658;

/// Amplitude of the semi-annual term of TDB - TT, in seconds
pub const TDB_COEFF2: Seconds = 0.000_013_85;

/// Mean anomaly of the Earth at J2000, in degrees
pub const M_E_OFFSET: Degree = 357.527_723_3;

/// Rate of the mean anomaly of the Earth, in degrees per Julian century
pub const M_E_COEFF1: Degree = 35_999.050_34;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

// -------------------------------------------------------------------------------------------------
// Supported calendar span
// -------------------------------------------------------------------------------------------------

/// Earliest Gregorian epoch accepted by the string conversions
pub const EARLIEST_VALID_GREGORIAN: &str = "04 Oct 1957 12:00:00.000";

/// Latest Gregorian epoch accepted by the string conversions
pub const LATEST_VALID_GREGORIAN: &str = "28 Feb 2100 00:00:00.000";

/// Earliest accepted epoch as a standard MJD (04 Oct 1957 12:00)
pub const EARLIEST_VALID_MJD: MJD = 36_115.5;

/// Latest accepted epoch as a standard MJD (28 Feb 2100 00:00)
pub const LATEST_VALID_MJD: MJD = 88_127.0;

/// Tolerance, in days, used when comparing epochs against the calendar span
pub const CALENDAR_SPAN_TOLERANCE: Days = 1.0e-10;
