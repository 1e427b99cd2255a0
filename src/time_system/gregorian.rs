//! Calendar conversions between modified julian dates and Gregorian text.
//!
//! Two text layouts are supported:
//!
//! | format | example                      |
//! |--------|------------------------------|
//! | 1      | `01 Jan 2000 11:59:28.000`   |
//! | 2      | `2000-01-01T11:59:28.000`    |
//!
//! Calendar arithmetic is delegated to [`hifitime`] in the TAI scale, which has no leap
//! seconds, so a modified julian date always maps to exactly 86400 calendar seconds per day.
//! Leap seconds are only visible through the `in_leap_second` rendering flag (seconds shown as
//! `60.xxx`) and through `:60` inputs, which parse as the following instant.
//!
//! Values are rounded to the nearest millisecond, with carry across minutes, hours and days.
use std::{fmt, sync::LazyLock};

use hifitime::{Epoch as HifiEpoch, TimeScale};
use regex::Regex;

use crate::{
    constants::{
        EARLIEST_VALID_GREGORIAN, EARLIEST_VALID_MJD, JD_NOV_17_1858, LATEST_VALID_GREGORIAN,
        LATEST_VALID_MJD, MJD, SECS_PER_DAY,
    },
    timecore_errors::TimeCoreError,
};

const MS_PER_DAY: i64 = 86_400_000;
const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_MINUTE: i64 = 60_000;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

static FORMAT1: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<day>\d{1,2})\s+(?P<month>[A-Za-z]{3})\s+(?P<year>\d{4})\s+(?P<hour>\d{1,2}):(?P<minute>\d{2}):(?P<second>\d{2}(?:\.\d*)?)\s*$",
    )
});

static FORMAT2: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})T(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2}(?:\.\d*)?)\s*$",
    )
});

/// Text layout of a Gregorian epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GregorianFormat {
    /// `01 Jan 2000 11:59:28.000`
    #[default]
    DayMonthYear,
    /// `2000-01-01T11:59:28.000`
    Iso,
}

impl GregorianFormat {
    /// Map the historical numeric format selector (1 or 2) to a layout.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(GregorianFormat::DayMonthYear),
            2 => Some(GregorianFormat::Iso),
            _ => None,
        }
    }
}

/// Broken-down calendar fields with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// Milliseconds within the minute, `0..60_000` (up to `61_000` inside a leap second).
    pub millis: u32,
}

impl CalendarDate {
    pub fn second(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    pub fn seconds_of_day(&self) -> f64 {
        self.hour as f64 * 3600.0 + self.minute as f64 * 60.0 + self.second()
    }

    /// Render with the requested layout.
    pub fn format(&self, format: GregorianFormat) -> String {
        let whole = self.millis / 1000;
        let frac = self.millis % 1000;
        match format {
            GregorianFormat::DayMonthYear => format!(
                "{:02} {} {:04} {:02}:{:02}:{:02}.{:03}",
                self.day,
                MONTH_NAMES[(self.month - 1) as usize],
                self.year,
                self.hour,
                self.minute,
                whole,
                frac
            ),
            GregorianFormat::Iso => format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}",
                self.year, self.month, self.day, self.hour, self.minute, whole, frac
            ),
        }
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(GregorianFormat::DayMonthYear))
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Integer modified julian day (standard origin) of a calendar date at 00:00.
///
/// The fields must already be valid; see [`days_in_month`].
fn day_number(year: i32, month: u8, day: u8) -> i64 {
    HifiEpoch::from_gregorian(year, month, day, 0, 0, 0, 0, TimeScale::TAI)
        .to_mjd_tai_days()
        .round() as i64
}

/// Calendar date of an integer modified julian day (standard origin).
fn date_of_day_number(days: i64) -> (i32, u8, u8) {
    let (year, month, day, _, _, _, _) =
        HifiEpoch::from_mjd_in_time_scale(days as f64, TimeScale::TAI).to_gregorian_tai();
    (year, month, day)
}

/// Convert a modified julian date into calendar fields, rounded to the millisecond.
///
/// Arguments
/// -----------------
/// * `mjd`: The modified julian date.
/// * `ref_jd`: The julian date used as origin of `mjd`.
///
/// Return
/// ----------
/// * The broken-down [`CalendarDate`], or [`TimeCoreError::MjdOutOfRange`] for a non-finite
///   value or one too large to count in milliseconds.
pub fn mjd_to_calendar(mjd: MJD, ref_jd: f64) -> Result<CalendarDate, TimeCoreError> {
    let std_mjd = mjd + (ref_jd - JD_NOV_17_1858);
    let scaled = (std_mjd * MS_PER_DAY as f64).round();
    if !scaled.is_finite() || scaled.abs() >= i64::MAX as f64 {
        return Err(TimeCoreError::MjdOutOfRange {
            value: std_mjd,
            min: EARLIEST_VALID_MJD,
            max: LATEST_VALID_MJD,
        });
    }
    let total_ms = scaled as i64;
    let days = total_ms.div_euclid(MS_PER_DAY);
    let ms_of_day = total_ms.rem_euclid(MS_PER_DAY);

    let (year, month, day) = date_of_day_number(days);

    Ok(CalendarDate {
        year,
        month,
        day,
        hour: (ms_of_day / MS_PER_HOUR) as u8,
        minute: ((ms_of_day % MS_PER_HOUR) / MS_PER_MINUTE) as u8,
        millis: (ms_of_day % MS_PER_MINUTE) as u32,
    })
}

/// Convert validated calendar fields into a modified julian date with the given origin.
///
/// A seconds value of 60 (leap second) rolls over into the next minute.
pub fn calendar_to_mjd(date: &CalendarDate, ref_jd: f64) -> MJD {
    let days = day_number(date.year, date.month, date.day);
    let ms_of_day = date.hour as i64 * MS_PER_HOUR
        + date.minute as i64 * MS_PER_MINUTE
        + date.millis as i64;
    let std_mjd = days as f64 + ms_of_day as f64 / MS_PER_DAY as f64;
    std_mjd - (ref_jd - JD_NOV_17_1858)
}

/// Render a modified julian date as Gregorian text.
///
/// Arguments
/// -----------------
/// * `mjd`: The modified julian date.
/// * `ref_jd`: Origin of `mjd`.
/// * `format`: Output layout.
/// * `in_leap_second`: When `true` the epoch is inside an inserted leap second. The UTC value
///   then already points into the following day, so the instant one second earlier is rendered
///   with its seconds field shown as `60.xxx`.
///
/// Return
/// ----------
/// * The formatted text, or [`TimeCoreError::MjdOutOfRange`] for a non-finite `mjd`.
pub fn mjd_to_gregorian(
    mjd: MJD,
    ref_jd: f64,
    format: GregorianFormat,
    in_leap_second: bool,
) -> Result<String, TimeCoreError> {
    if in_leap_second {
        let mut date = mjd_to_calendar(mjd - 1.0 / SECS_PER_DAY, ref_jd)?;
        if date.millis >= 59_000 {
            date.millis += 1000;
        }
        return Ok(date.format(format));
    }
    Ok(mjd_to_calendar(mjd, ref_jd)?.format(format))
}

fn parse_captures(text: &str) -> Result<CalendarDate, TimeCoreError> {
    let invalid = || TimeCoreError::InvalidGregorian(text.to_string());

    let (caps, named_month) = if let Some(caps) = FORMAT1
        .as_ref()
        .map_err(|_| invalid())?
        .captures(text)
    {
        (caps, true)
    } else if let Some(caps) = FORMAT2
        .as_ref()
        .map_err(|_| invalid())?
        .captures(text)
    {
        (caps, false)
    } else {
        return Err(invalid());
    };

    let get = |name: &str| caps.name(name).map(|m| m.as_str()).ok_or_else(invalid);

    let year: i32 = get("year")?.parse().map_err(|_| invalid())?;
    let month: u8 = if named_month {
        let name = get("month")?;
        MONTH_NAMES
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .map(|idx| idx as u8 + 1)
            .ok_or_else(invalid)?
    } else {
        get("month")?.parse().map_err(|_| invalid())?
    };
    let day: u8 = get("day")?.parse().map_err(|_| invalid())?;
    let hour: u8 = get("hour")?.parse().map_err(|_| invalid())?;
    let minute: u8 = get("minute")?.parse().map_err(|_| invalid())?;
    let second: f64 = get("second")?.parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&month)
        || day == 0
        || day > days_in_month(year, month)
        || hour > 23
        || minute > 59
        || !(0.0..61.0).contains(&second)
    {
        return Err(invalid());
    }

    Ok(CalendarDate {
        year,
        month,
        day,
        hour,
        minute,
        millis: (second * 1000.0).round() as u32,
    })
}

/// Parse Gregorian text in either supported layout, without range checks.
pub fn parse_gregorian(text: &str) -> Result<CalendarDate, TimeCoreError> {
    parse_captures(text)
}

/// Check that a text parses as a Gregorian date and lies within the supported span.
pub fn is_valid_gregorian(text: &str) -> bool {
    gregorian_to_mjd(text, JD_NOV_17_1858).is_ok()
}

/// Check a standard-origin modified julian date against the supported calendar span.
pub fn check_mjd_in_span(std_mjd: MJD) -> Result<(), TimeCoreError> {
    if std_mjd < EARLIEST_VALID_MJD - crate::constants::CALENDAR_SPAN_TOLERANCE
        || std_mjd > LATEST_VALID_MJD + crate::constants::CALENDAR_SPAN_TOLERANCE
    {
        return Err(TimeCoreError::MjdOutOfRange {
            value: std_mjd,
            min: EARLIEST_VALID_MJD,
            max: LATEST_VALID_MJD,
        });
    }
    Ok(())
}

/// Parse Gregorian text into a modified julian date.
///
/// Arguments
/// -----------------
/// * `text`: Either `"01 Jan 2000 11:59:28.000"` or `"2000-01-01T11:59:28.000"`.
/// * `ref_jd`: Origin of the returned modified julian date.
///
/// Return
/// ----------
/// * The modified julian date, [`TimeCoreError::InvalidGregorian`] for malformed text, or
///   [`TimeCoreError::GregorianOutOfRange`] outside the supported calendar span.
pub fn gregorian_to_mjd(text: &str, ref_jd: f64) -> Result<MJD, TimeCoreError> {
    let date = parse_captures(text)?;
    let mjd = calendar_to_mjd(&date, ref_jd);
    let std_mjd = mjd + (ref_jd - JD_NOV_17_1858);
    if check_mjd_in_span(std_mjd).is_err() {
        return Err(TimeCoreError::GregorianOutOfRange {
            value: text.to_string(),
            min: EARLIEST_VALID_GREGORIAN.to_string(),
            max: LATEST_VALID_GREGORIAN.to_string(),
        });
    }
    Ok(mjd)
}

/// Day of year (1-based) of a standard-origin modified julian date.
pub fn day_of_year(std_mjd: MJD) -> Result<u16, TimeCoreError> {
    let date = mjd_to_calendar(std_mjd, JD_NOV_17_1858)?;
    Ok(ymd_to_day_of_year(date.year, date.month, date.day))
}

/// Day of year (1-based) of a calendar date.
pub fn ymd_to_day_of_year(year: i32, month: u8, day: u8) -> u16 {
    (day_number(year, month, day) - day_number(year, 1, 1) + 1) as u16
}

/// Month and day of a 1-based day of year.
///
/// Return
/// ----------
/// * `Some((month, day))`, or `None` if the day does not exist in that year
///   (for example day 366 of a non-leap year).
pub fn day_of_year_to_month_day(year: i32, doy: u16) -> Option<(u8, u8)> {
    let max = if is_leap_year(year) { 366 } else { 365 };
    if doy == 0 || doy > max {
        return None;
    }
    let (y, month, day) = date_of_day_number(day_number(year, 1, 1) + doy as i64 - 1);
    (y == year).then_some((month, day))
}

/// Seconds elapsed since 00:00 of the day, millisecond rounded.
pub fn seconds_of_day(std_mjd: MJD) -> Result<f64, TimeCoreError> {
    Ok(mjd_to_calendar(std_mjd, JD_NOV_17_1858)?.seconds_of_day())
}

/// Packed `YYYMMDD` date: `YYYYMMDD - 19000000` (so 2000-01-01 packs as `1000101`).
pub fn to_packed_yyymmdd(std_mjd: MJD) -> Result<f64, TimeCoreError> {
    let date = mjd_to_calendar(std_mjd, JD_NOV_17_1858)?;
    Ok((date.year as f64 * 10_000.0 + date.month as f64 * 100.0 + date.day as f64) - 19_000_000.0)
}

/// Packed `HHMMSS` time of day, whole seconds.
pub fn to_packed_hhmmss(std_mjd: MJD) -> Result<f64, TimeCoreError> {
    let date = mjd_to_calendar(std_mjd, JD_NOV_17_1858)?;
    Ok(date.hour as f64 * 10_000.0 + date.minute as f64 * 100.0 + (date.millis / 1000) as f64)
}

/// Split a packed `YYYMMDD` value into `(year, month, day)`.
pub fn unpack_yyymmdd(yyymmdd: f64) -> (i32, u8, u8) {
    let full = (yyymmdd + 19_000_000.0).round() as i64;
    let year = (full / 10_000) as i32;
    let month = ((full / 100) % 100) as u8;
    let day = (full % 100) as u8;
    (year, month, day)
}

/// Standard-origin modified julian date from a calendar day and a seconds-of-day value.
pub fn mjd_from_day_and_seconds(year: i32, month: u8, day: u8, seconds_of_day: f64) -> MJD {
    day_number(year, month, day) as f64 + seconds_of_day / SECS_PER_DAY
}
