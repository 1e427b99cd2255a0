//! Leap-second table loaded from a `tai-utc.dat` style file.
//!
//! Each line of the file has the fixed layout:
//!
//! ```text
//!  2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S
//! ```
//!
//! where the TAI-UTC offset in effect from the given julian date is
//! `offset1 + (MJD - offset2) × offset3` seconds. The table is loaded once and is
//! read-only afterwards; it can be shared between threads behind an `Arc`.
//!
//! # See also
//! ------------
//! * [`crate::time_system::converter::TimeConverter`] – Consumes this table for UTC ↔ TAI.
use std::{fmt, fs, sync::LazyLock};

use camino::Utf8Path;
use itertools::Itertools;
use regex::Regex;
use tracing::{debug, info};

use crate::{
    constants::{JulianDate, Seconds, JD_NOV_17_1858, MJD, SECS_PER_DAY},
    timecore_errors::TimeCoreError,
};

/// Width, in days, of an inserted leap second.
const ONE_SECOND_IN_DAYS: f64 = 1.0 / SECS_PER_DAY;

static LEAP_LINE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<year>\d{4})\s+(?P<month>[A-Za-z]{3})\s+(?P<day>\d{1,2})\s*=JD\s*(?P<jd>[-+0-9.eE]+)\s+TAI-UTC=\s*(?P<off1>[-+0-9.eE]+)\s*S\s*\+\s*\(MJD\s*-\s*(?P<off2>[-+0-9.eE]+)\s*\)\s*X\s*(?P<off3>[-+0-9.eE]+)\s*S",
    )
});

/// One row of the leap-second table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeapSecondEntry {
    /// Julian date (UTC) from which this entry applies.
    pub julian_date: JulianDate,
    /// Same threshold expressed as a TAI modified julian date (standard origin).
    pub tai_mjd: MJD,
    pub offset1: Seconds,
    pub offset2: MJD,
    pub offset3: Seconds,
}

impl LeapSecondEntry {
    /// TAI-UTC, in seconds, for a UTC modified julian date (standard origin).
    pub fn leap_seconds_at(&self, utc_mjd: MJD) -> Seconds {
        self.offset1 + (utc_mjd - self.offset2) * self.offset3
    }

    /// Threshold as a UTC modified julian date (standard origin).
    pub fn utc_mjd(&self) -> MJD {
        self.julian_date - JD_NOV_17_1858
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeapSecondTable {
    entries: Vec<LeapSecondEntry>,
}

/// Parse one `tai-utc.dat` line.
///
/// Arguments
/// -----------------
/// * `line`: The raw text line.
/// * `line_number`: One-based line number, used for error messages.
///
/// Return
/// ----------
/// * The parsed [`LeapSecondEntry`] or [`TimeCoreError::InvalidLeapSecondLine`].
fn parse_leap_second_line(line: &str, line_number: usize) -> Result<LeapSecondEntry, TimeCoreError> {
    let invalid = || TimeCoreError::InvalidLeapSecondLine {
        line: line_number,
        content: line.to_string(),
    };

    let regex = LEAP_LINE.as_ref().map_err(|_| invalid())?;
    let caps = regex.captures(line).ok_or_else(invalid)?;

    let field = |name: &str| -> Result<f64, TimeCoreError> {
        caps.name(name)
            .ok_or_else(invalid)?
            .as_str()
            .parse::<f64>()
            .map_err(|_| invalid())
    };

    let julian_date = field("jd")?;
    let offset1 = field("off1")?;
    let offset2 = field("off2")?;
    let offset3 = field("off3")?;

    let utc_mjd = julian_date - JD_NOV_17_1858;
    let tai_mjd = utc_mjd + (offset1 + (utc_mjd - offset2) * offset3) / SECS_PER_DAY;

    Ok(LeapSecondEntry {
        julian_date,
        tai_mjd,
        offset1,
        offset2,
        offset3,
    })
}

impl LeapSecondTable {
    /// Build a table from already parsed entries.
    ///
    /// Return
    /// ----------
    /// * The table, or [`TimeCoreError::NonIncreasingTable`] if the thresholds are not strictly
    ///   increasing.
    pub fn from_entries(entries: Vec<LeapSecondEntry>) -> Result<Self, TimeCoreError> {
        if let Some((a, b)) = entries
            .iter()
            .tuple_windows()
            .find(|(a, b)| b.julian_date <= a.julian_date)
        {
            return Err(TimeCoreError::NonIncreasingTable(format!(
                "leap second threshold JD {} follows JD {}",
                b.julian_date, a.julian_date
            )));
        }
        Ok(LeapSecondTable { entries })
    }

    /// Parse the full text of a leap-second file.
    ///
    /// Blank lines are skipped; any other line must contain every field.
    pub fn from_str_content(content: &str) -> Result<Self, TimeCoreError> {
        let entries = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| parse_leap_second_line(line, idx + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_entries(entries)
    }

    /// Load a leap-second file from disk.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: Path to a `tai-utc.dat` style file.
    ///
    /// Return
    /// ----------
    /// * The loaded table, an I/O error, or a format error naming the offending line.
    pub fn from_file(path: &Utf8Path) -> Result<Self, TimeCoreError> {
        let content = fs::read_to_string(path)?;
        let table = Self::from_str_content(&content)?;
        info!(
            path = %path,
            entries = table.len(),
            "loaded leap second table"
        );
        Ok(table)
    }

    pub fn entries(&self) -> &[LeapSecondEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leap seconds (TAI-UTC) in effect at a UTC epoch.
    ///
    /// Arguments
    /// -----------------
    /// * `utc_mjd`: UTC modified julian date, standard origin.
    ///
    /// Return
    /// ----------
    /// * TAI-UTC in seconds; `0.0` for an empty table or an epoch before the first entry.
    pub fn number_of_leap_seconds_from(&self, utc_mjd: MJD) -> Seconds {
        let jd = utc_mjd + JD_NOV_17_1858;
        self.entries
            .iter()
            .rev()
            .find(|entry| jd >= entry.julian_date)
            .map(|entry| entry.leap_seconds_at(utc_mjd))
            .unwrap_or(0.0)
    }

    /// Check whether a TAI epoch falls inside an inserted leap second.
    ///
    /// The nearest table boundary (by absolute distance, clamped to the first and last entries)
    /// is located, and the epoch is inside the leap second if it lies in the one-second interval
    /// immediately preceding that boundary.
    ///
    /// Arguments
    /// -----------------
    /// * `tai_mjd`: TAI modified julian date, standard origin.
    ///
    /// Return
    /// ----------
    /// * `true` if `tai_mjd ∈ [boundary − 1 s, boundary)`.
    pub fn is_in_leap_second(&self, tai_mjd: MJD) -> bool {
        let Some(first) = self.entries.first() else {
            return false;
        };

        let nearest = self
            .entries
            .iter()
            .min_by(|a, b| {
                (a.tai_mjd - tai_mjd)
                    .abs()
                    .total_cmp(&(b.tai_mjd - tai_mjd).abs())
            })
            .unwrap_or(first);

        let boundary = nearest.tai_mjd;
        tai_mjd >= boundary - ONE_SECOND_IN_DAYS && tai_mjd < boundary
    }

    /// Modified julian date of the first table entry, in scan order from the most recent, whose
    /// threshold falls inside `[from_utc_mjd, to_utc_mjd]`.
    ///
    /// Return
    /// ----------
    /// * `Some(mjd)` of the matching threshold, `None` if no entry matches or the range is inverted.
    pub fn first_leap_second_mjd(&self, from_utc_mjd: MJD, to_utc_mjd: MJD) -> Option<MJD> {
        if from_utc_mjd > to_utc_mjd {
            debug!(from_utc_mjd, to_utc_mjd, "inverted leap second search range");
            return None;
        }
        self.entries
            .iter()
            .rev()
            .map(LeapSecondEntry::utc_mjd)
            .find(|mjd| *mjd >= from_utc_mjd && *mjd <= to_utc_mjd)
    }

    /// Same as [`Self::first_leap_second_mjd`] with the `-1` sentinel for "none".
    pub fn get_first_leap_second_mjd(&self, from_utc_mjd: MJD, to_utc_mjd: MJD) -> MJD {
        self.first_leap_second_mjd(from_utc_mjd, to_utc_mjd)
            .unwrap_or(-1.0)
    }
}

impl fmt::Display for LeapSecondTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = format!("+{:-<16}+{:-<16}+{:-<14}+{:-<12}+{:-<12}+", "", "", "", "", "");
        writeln!(f, "{border}")?;
        writeln!(
            f,
            "| {:<14} | {:<14} | {:<12} | {:<10} | {:<10} |",
            "JD", "TAI MJD", "TAI-UTC (s)", "MJD ref", "Rate (s/d)"
        )?;
        writeln!(f, "{border}")?;
        for e in &self.entries {
            writeln!(
                f,
                "| {:<14.1} | {:<14.6} | {:<12.7} | {:<10.1} | {:<10.7} |",
                e.julian_date, e.tai_mjd, e.offset1, e.offset2, e.offset3
            )?;
        }
        write!(f, "{border}")
    }
}

#[cfg(test)]
mod test_leap_seconds {
    use super::*;
    use approx::assert_relative_eq;

    pub(crate) const SAMPLE: &str = "\
 1961 JAN  1 =JD 2437300.5  TAI-UTC=   1.4228180 S + (MJD - 37300.) X 0.001296 S
 1972 JAN  1 =JD 2441317.5  TAI-UTC=  10.0       S + (MJD - 41317.) X 0.0      S
 1972 JUL  1 =JD 2441499.5  TAI-UTC=  11.0       S + (MJD - 41317.) X 0.0      S
 2006 JAN  1 =JD 2453736.5  TAI-UTC=  33.0       S + (MJD - 41317.) X 0.0      S
 2009 JAN  1 =JD 2454832.5  TAI-UTC=  34.0       S + (MJD - 41317.) X 0.0      S
 2012 JUL  1 =JD 2456109.5  TAI-UTC=  35.0       S + (MJD - 41317.) X 0.0      S
 2015 JUL  1 =JD 2457204.5  TAI-UTC=  36.0       S + (MJD - 41317.) X 0.0      S
 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S
";

    #[test]
    fn test_parse_line() {
        let entry = parse_leap_second_line(
            " 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S",
            1,
        )
        .unwrap();
        assert_eq!(entry.julian_date, 2457754.5);
        assert_eq!(entry.offset1, 37.0);
        assert_eq!(entry.offset2, 41317.0);
        assert_eq!(entry.offset3, 0.0);
        assert_relative_eq!(entry.tai_mjd, 57754.0 + 37.0 / 86400.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_line() {
        let err = LeapSecondTable::from_str_content(" 2017 JAN  1 =JD 2457754.5  TAI-UTC=").unwrap_err();
        assert!(matches!(
            err,
            TimeCoreError::InvalidLeapSecondLine { line: 1, .. }
        ));
    }

    #[test]
    fn test_non_increasing() {
        let content = "\
 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S
 2015 JUL  1 =JD 2457204.5  TAI-UTC=  36.0       S + (MJD - 41317.) X 0.0      S
";
        let err = LeapSecondTable::from_str_content(content).unwrap_err();
        assert_eq!(err.kind(), crate::timecore_errors::ErrorKind::Sequencing);
    }

    #[test]
    fn test_number_of_leap_seconds() {
        let table = LeapSecondTable::from_str_content(SAMPLE).unwrap();
        assert_eq!(table.len(), 8);

        // 2020-01-01
        assert_eq!(table.number_of_leap_seconds_from(58849.0), 37.0);
        // 2016-12-31 23:59:59
        assert_eq!(table.number_of_leap_seconds_from(57753.99999), 36.0);
        // 2017-01-01 00:00:00
        assert_eq!(table.number_of_leap_seconds_from(57754.0), 37.0);
        // before the table
        assert_eq!(table.number_of_leap_seconds_from(30000.0), 0.0);
        // drifting 1960s formula
        assert_relative_eq!(
            table.number_of_leap_seconds_from(37300.0),
            1.422818,
            epsilon = 1e-12
        );

        let empty = LeapSecondTable::default();
        assert_eq!(empty.number_of_leap_seconds_from(58849.0), 0.0);
    }

    #[test]
    fn test_monotonic() {
        let table = LeapSecondTable::from_str_content(SAMPLE).unwrap();
        let mut previous = f64::MIN;
        let mut mjd = 37000.0;
        while mjd < 60000.0 {
            let leaps = table.number_of_leap_seconds_from(mjd);
            assert!(leaps >= previous);
            previous = leaps;
            mjd += 3.7;
        }
    }

    #[test]
    fn test_is_in_leap_second() {
        let table = LeapSecondTable::from_str_content(SAMPLE).unwrap();
        let boundary = 57754.0 + 37.0 / 86400.0;

        assert!(table.is_in_leap_second(boundary - 0.5 / 86400.0));
        assert!(table.is_in_leap_second(boundary - 1.0 / 86400.0));
        assert!(!table.is_in_leap_second(boundary));
        assert!(!table.is_in_leap_second(boundary - 1.5 / 86400.0));
        assert!(!table.is_in_leap_second(58000.0));
        // clamped to the first entry
        assert!(!table.is_in_leap_second(20000.0));
    }

    #[test]
    fn test_first_leap_second_mjd() {
        let table = LeapSecondTable::from_str_content(SAMPLE).unwrap();
        assert_eq!(table.get_first_leap_second_mjd(57000.0, 58000.0), 57754.0);
        assert_eq!(table.get_first_leap_second_mjd(57800.0, 58000.0), -1.0);
        assert_eq!(table.get_first_leap_second_mjd(58000.0, 57000.0), -1.0);
        assert_eq!(table.first_leap_second_mjd(57204.0, 57204.0), Some(57204.0));
    }

    #[test]
    fn test_display() {
        let table = LeapSecondTable::from_str_content(SAMPLE).unwrap();
        let rendered = format!("{table}");
        assert!(rendered.contains("2457754.5"));
        assert_eq!(rendered.lines().count(), 8 + 4);
    }
}
