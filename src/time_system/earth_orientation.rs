//! Earth orientation parameters (polar motion, UT1-UTC, length of day).
//!
//! Two text layouts are understood:
//!
//! * **C04** (IERS `eopc04`): a free-form header terminated by the line whose first word is
//!   `(0h`, then one row per day:
//!
//!   ```text
//!   year month day MJD  x(")  y(")  UT1-UTC(s)  LOD(s) ...
//!   ```
//!
//! * **Finals** (IERS `finals.data`): six leading characters are skipped, then
//!
//!   ```text
//!   MJD flag x dx y dy flag UT1-UTC dUT1-UTC LOD(ms) ...
//!   ```
//!
//!   Reading stops at the first row whose first flag is neither `I` (IERS) nor `P` (predicted).
//!
//! Each row is stored with its UTC modified julian date and a TAI index computed once at load
//! time through a leap-second-only [`TimeConverter`]. Lookups interpolate linearly between
//! neighbouring rows, with a one-second correction across days that contain a leap second.
//!
//! Lookups keep a cursor on the last bracket used. The cursor lives in atomics so a table shared
//! behind an `Arc` can be queried from several threads; the cursor is only a search hint and
//! never changes a returned value.
use std::{
    fmt, fs,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use camino::Utf8Path;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    constants::{Seconds, JD_NOV_17_1858, MJD, SECS_PER_DAY},
    time_system::{converter::TimeConverter, TimeSystem},
    timecore_errors::TimeCoreError,
};

/// Text layout of an Earth orientation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EopFileFormat {
    #[default]
    C04,
    Finals,
}

/// One day of Earth orientation data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EopRecord {
    /// UTC modified julian date (standard origin).
    pub utc_mjd: MJD,
    /// The same instant expressed in TAI.
    pub tai_mjd: MJD,
    /// Polar motion x, arcseconds.
    pub x: f64,
    /// Polar motion y, arcseconds.
    pub y: f64,
    /// UT1 - UTC, seconds.
    pub ut1_utc: Seconds,
    /// Excess length of day, seconds.
    pub lod: Seconds,
}

/// Polar motion and length of day at a UTC epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarMotion {
    pub x: f64,
    pub y: f64,
    pub lod: Seconds,
}

/// Raw row before the TAI index is attached.
struct RawRow {
    utc_mjd: MJD,
    x: f64,
    y: f64,
    ut1_utc: f64,
    lod: f64,
}

#[derive(Debug)]
pub struct EarthOrientationTable {
    records: Vec<EopRecord>,
    format: EopFileFormat,
    /// Bracket used by the last UT1-UTC lookup.
    ut1_cursor: AtomicUsize,
    /// Bits of the TAI epoch of the last UT1-UTC lookup.
    ut1_last_query: AtomicU64,
    /// Bracket used by the last polar motion lookup.
    polar_cursor: AtomicUsize,
}

impl Clone for EarthOrientationTable {
    fn clone(&self) -> Self {
        EarthOrientationTable {
            records: self.records.clone(),
            format: self.format,
            ut1_cursor: AtomicUsize::new(self.ut1_cursor.load(Ordering::Relaxed)),
            ut1_last_query: AtomicU64::new(self.ut1_last_query.load(Ordering::Relaxed)),
            polar_cursor: AtomicUsize::new(self.polar_cursor.load(Ordering::Relaxed)),
        }
    }
}

impl PartialEq for EarthOrientationTable {
    fn eq(&self, other: &Self) -> bool {
        self.format == other.format && self.records == other.records
    }
}

fn parse_field(token: Option<&str>, line: &str, line_number: usize) -> Result<f64, TimeCoreError> {
    token
        .and_then(|t| t.parse::<f64>().ok())
        .ok_or_else(|| TimeCoreError::InvalidEopLine {
            line: line_number,
            content: line.to_string(),
        })
}

/// Parse the rows of a C04 file.
///
/// Rows before the `(0h` marker line are header text and are ignored.
fn parse_c04(content: &str) -> Result<Vec<RawRow>, TimeCoreError> {
    let mut lines = content.lines().enumerate();

    if !lines
        .by_ref()
        .any(|(_, line)| line.split_whitespace().next() == Some("(0h"))
    {
        return Err(TimeCoreError::EmptyEopFile(
            "no '(0h' header marker found".into(),
        ));
    }

    let mut rows = Vec::new();
    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_whitespace();
        // year, month, day
        let _ = tokens.by_ref().take(3).count();

        let utc_mjd = parse_field(tokens.next(), line, idx + 1)?;
        let x = parse_field(tokens.next(), line, idx + 1)?;
        let y = parse_field(tokens.next(), line, idx + 1)?;
        let ut1_utc = parse_field(tokens.next(), line, idx + 1)?;
        let lod = parse_field(tokens.next(), line, idx + 1)?;

        rows.push(RawRow {
            utc_mjd,
            x,
            y,
            ut1_utc,
            lod,
        });
    }
    Ok(rows)
}

/// Whitespace tokens of a finals row, where a one-character flag may be glued to the value
/// that follows it (`I-0.1771554`).
struct FinalsTokens<'a> {
    tokens: std::str::SplitWhitespace<'a>,
    pending: Option<&'a str>,
}

impl<'a> FinalsTokens<'a> {
    fn new(body: &'a str) -> Self {
        FinalsTokens {
            tokens: body.split_whitespace(),
            pending: None,
        }
    }

    fn value(&mut self) -> Option<&'a str> {
        self.pending.take().or_else(|| self.tokens.next())
    }

    fn flag(&mut self) -> Option<char> {
        let token = self.value()?;
        let mut chars = token.char_indices();
        let (_, flag) = chars.next()?;
        if let Some((rest, _)) = chars.next() {
            self.pending = Some(&token[rest..]);
        }
        Some(flag)
    }
}

/// Parse the rows of a finals file.
///
/// The length of day is given in milliseconds and stored in seconds. A missing length of day
/// (some predicted rows omit it) is stored as zero.
fn parse_finals(content: &str) -> Result<Vec<RawRow>, TimeCoreError> {
    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut tokens = FinalsTokens::new(line.get(6..).unwrap_or(""));

        let utc_mjd = parse_field(tokens.value(), line, idx + 1)?;
        let flag = tokens.flag();
        if flag != Some('I') && flag != Some('P') {
            debug!(line = idx + 1, ?flag, "end of finals data");
            break;
        }
        let x = parse_field(tokens.value(), line, idx + 1)?;
        let _dx = tokens.value();
        let y = parse_field(tokens.value(), line, idx + 1)?;
        let _dy = tokens.value();
        let _flag2 = tokens.flag();
        let ut1_utc = parse_field(tokens.value(), line, idx + 1)?;
        let _dut1 = tokens.value();
        let lod = tokens
            .value()
            .and_then(|t| t.parse::<f64>().ok())
            .unwrap_or(0.0)
            * 1.0e-3;

        rows.push(RawRow {
            utc_mjd,
            x,
            y,
            ut1_utc,
            lod,
        });
    }
    Ok(rows)
}

impl EarthOrientationTable {
    /// Build a table from the text of an EOP file.
    ///
    /// Arguments
    /// -----------------
    /// * `content`: Full text of the file.
    /// * `format`: Layout of the file.
    /// * `leap_converter`: A converter with (at least) a leap-second table, used to attach the
    ///   TAI index of each row.
    ///
    /// Return
    /// ----------
    /// * The table, [`TimeCoreError::EmptyEopFile`] if no row was read,
    ///   [`TimeCoreError::InvalidEopLine`] for a malformed row, or
    ///   [`TimeCoreError::NonIncreasingTable`] if the rows are not in increasing date order.
    ///
    /// See also
    /// ------------
    /// * [`Self::from_file`] – Same, reading the text from disk.
    pub fn from_str_content(
        content: &str,
        format: EopFileFormat,
        leap_converter: &TimeConverter,
    ) -> Result<Self, TimeCoreError> {
        let rows = match format {
            EopFileFormat::C04 => parse_c04(content)?,
            EopFileFormat::Finals => parse_finals(content)?,
        };

        if rows.is_empty() {
            return Err(TimeCoreError::EmptyEopFile(format!("{format:?} content")));
        }

        if let Some((a, b)) = rows
            .iter()
            .tuple_windows()
            .find(|(a, b)| b.utc_mjd <= a.utc_mjd)
        {
            return Err(TimeCoreError::NonIncreasingTable(format!(
                "EOP row MJD {} follows MJD {}",
                b.utc_mjd, a.utc_mjd
            )));
        }

        let records = rows
            .into_iter()
            .map(|row| {
                let tai_mjd = leap_converter.convert(
                    row.utc_mjd,
                    TimeSystem::UTC,
                    TimeSystem::TAI,
                    JD_NOV_17_1858,
                )?;
                Ok(EopRecord {
                    utc_mjd: row.utc_mjd,
                    tai_mjd,
                    x: row.x,
                    y: row.y,
                    ut1_utc: row.ut1_utc,
                    lod: row.lod,
                })
            })
            .collect::<Result<Vec<_>, TimeCoreError>>()?;

        Ok(EarthOrientationTable {
            records,
            format,
            ut1_cursor: AtomicUsize::new(0),
            ut1_last_query: AtomicU64::new(0.0_f64.to_bits()),
            polar_cursor: AtomicUsize::new(0),
        })
    }

    /// Load an EOP file from disk.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: Path to the file.
    /// * `format`: Layout of the file.
    /// * `leap_converter`: A converter holding the leap-second table.
    ///
    /// Return
    /// ----------
    /// * The loaded table, or the I/O or format error.
    pub fn from_file(
        path: &Utf8Path,
        format: EopFileFormat,
        leap_converter: &TimeConverter,
    ) -> Result<Self, TimeCoreError> {
        let content = fs::read_to_string(path)?;
        let table = Self::from_str_content(&content, format, leap_converter)?;
        let (first, last) = table.span();
        info!(
            path = %path,
            ?format,
            rows = table.len(),
            first_mjd = first,
            last_mjd = last,
            "loaded Earth orientation table"
        );
        Ok(table)
    }

    pub fn records(&self) -> &[EopRecord] {
        &self.records
    }

    pub fn format(&self) -> EopFileFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last UTC modified julian dates covered by the table.
    pub fn span(&self) -> (MJD, MJD) {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => (first.utc_mjd, last.utc_mjd),
            _ => (0.0, 0.0),
        }
    }

    /// Interpolated UT1 - UTC at a TAI epoch.
    ///
    /// Outside the table the nearest end value is returned. Inside, the value is interpolated
    /// linearly between the two rows bracketing the epoch in TAI. When the TAI spacing of the
    /// bracket differs from one day by more than 0.6 s, a leap second was inserted in between
    /// and the rounded excess is removed from the UT1 - UTC difference before interpolating.
    ///
    /// Arguments
    /// -----------------
    /// * `tai_mjd`: TAI modified julian date, standard origin.
    ///
    /// Return
    /// ----------
    /// * UT1 - UTC in seconds.
    pub fn ut1_utc_offset(&self, tai_mjd: MJD) -> Seconds {
        let n = self.records.len();
        let (Some(first), Some(last)) = (self.records.first(), self.records.last()) else {
            return 0.0;
        };

        if tai_mjd >= last.tai_mjd {
            self.ut1_cursor.store(n - 1, Ordering::Relaxed);
            self.ut1_last_query
                .store(tai_mjd.to_bits(), Ordering::Relaxed);
            return last.ut1_utc;
        }
        if tai_mjd <= first.tai_mjd {
            self.ut1_cursor.store(0, Ordering::Relaxed);
            self.ut1_last_query
                .store(tai_mjd.to_bits(), Ordering::Relaxed);
            return first.ut1_utc;
        }

        // n >= 2 from here
        let cursor = self.ut1_cursor.load(Ordering::Relaxed);
        let last_query = f64::from_bits(self.ut1_last_query.load(Ordering::Relaxed));

        let scanned = if tai_mjd < last_query {
            (0..=cursor.min(n - 2))
                .rev()
                .find(|&i| tai_mjd >= self.records[i].tai_mjd)
        } else {
            (cursor.min(n - 2)..n - 1).find(|&i| {
                self.records[i].tai_mjd <= tai_mjd && tai_mjd < self.records[i + 1].tai_mjd
            })
        };
        let i = scanned.unwrap_or_else(|| {
            self.records
                .partition_point(|r| r.tai_mjd <= tai_mjd)
                .saturating_sub(1)
                .min(n - 2)
        });

        let left = &self.records[i];
        let right = &self.records[i + 1];

        let diff_jd = right.tai_mjd - left.tai_mjd;
        let ratio = (tai_mjd - left.tai_mjd) / diff_jd;
        let mut diff_offset = right.ut1_utc - left.ut1_utc;
        let error_in_sec = (diff_jd - 1.0) * SECS_PER_DAY;
        if error_in_sec.abs() > 0.6 {
            diff_offset -= error_in_sec.round();
        }

        self.ut1_cursor.store(i, Ordering::Relaxed);
        self.ut1_last_query
            .store(tai_mjd.to_bits(), Ordering::Relaxed);

        left.ut1_utc + ratio * diff_offset
    }

    /// Interpolated polar motion and length of day at a UTC epoch.
    ///
    /// Before the first row the first row is returned; at or after the last row the last row is
    /// returned. Inside the table, x and y are interpolated linearly and the length of day of the
    /// left row is returned unchanged.
    ///
    /// Arguments
    /// -----------------
    /// * `utc_mjd`: UTC modified julian date, standard origin.
    ///
    /// Return
    /// ----------
    /// * The [`PolarMotion`] at `utc_mjd`.
    pub fn polar_motion_and_lod(&self, utc_mjd: MJD) -> PolarMotion {
        let n = self.records.len();
        let Some(first) = self.records.first() else {
            return PolarMotion {
                x: 0.0,
                y: 0.0,
                lod: 0.0,
            };
        };

        if utc_mjd < first.utc_mjd {
            return PolarMotion {
                x: first.x,
                y: first.y,
                lod: first.lod,
            };
        }

        let cursor = self.polar_cursor.load(Ordering::Relaxed);
        if cursor + 1 < n
            && utc_mjd >= self.records[cursor].utc_mjd
            && utc_mjd <= self.records[cursor + 1].utc_mjd
        {
            return self.interpolate_polar(cursor, utc_mjd);
        }

        let i = (0..n)
            .rev()
            .find(|&i| utc_mjd >= self.records[i].utc_mjd)
            .unwrap_or(0);
        self.polar_cursor.store(i, Ordering::Relaxed);

        if i == n - 1 {
            let last = &self.records[i];
            return PolarMotion {
                x: last.x,
                y: last.y,
                lod: last.lod,
            };
        }
        self.interpolate_polar(i, utc_mjd)
    }

    fn interpolate_polar(&self, i: usize, utc_mjd: MJD) -> PolarMotion {
        let left = &self.records[i];
        let right = &self.records[i + 1];
        let ratio = (utc_mjd - left.utc_mjd) / (right.utc_mjd - left.utc_mjd);
        PolarMotion {
            x: left.x + ratio * (right.x - left.x),
            y: left.y + ratio * (right.y - left.y),
            lod: left.lod,
        }
    }
}

impl fmt::Display for EarthOrientationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (first, last) = self.span();
        writeln!(
            f,
            "Earth orientation table ({:?}, {} rows, MJD {:.1} .. {:.1})",
            self.format,
            self.len(),
            first,
            last
        )?;
        let border = format!("+{:-<12}+{:-<14}+{:-<12}+{:-<12}+{:-<13}+{:-<12}+", "", "", "", "", "", "");
        writeln!(f, "{border}")?;
        writeln!(
            f,
            "| {:<10} | {:<12} | {:<10} | {:<10} | {:<11} | {:<10} |",
            "UTC MJD", "TAI MJD", "x (\")", "y (\")", "UT1-UTC (s)", "LOD (s)"
        )?;
        writeln!(f, "{border}")?;
        for r in &self.records {
            writeln!(
                f,
                "| {:<10.1} | {:<12.6} | {:<10.6} | {:<10.6} | {:<11.7} | {:<10.7} |",
                r.utc_mjd, r.tai_mjd, r.x, r.y, r.ut1_utc, r.lod
            )?;
        }
        write!(f, "{border}")
    }
}
