//! The two 2800-byte header records of a Code500 file.
//!
//! # Header 1 layout
//!
//! | offset | width | field                                         | type      |
//! |--------|-------|-----------------------------------------------|-----------|
//! | 0      | 8     | product id                                    | ASCII     |
//! | 8      | 8     | satellite id                                  | f64       |
//! | 16     | 8     | time system indicator (1 = A1, 2 = UTC)       | f64       |
//! | 24     | 24    | start date `YYYMMDD`, day of year, seconds    | 3 × f64   |
//! | 48     | 24    | end date `YYYMMDD`, day of year, seconds      | 3 × f64   |
//! | 72     | 8     | step size, seconds                            | f64       |
//! | 80     | 8     | tape id                                       | EBCDIC    |
//! | 88     | 8     | source id                                     | EBCDIC    |
//! | 96     | 56    | header title                                  | ASCII     |
//! | 152    | 8     | central body indicator                        | f64       |
//! | 160    | 8     | reference date of DUT times `YYMMDD`          | f64       |
//! | 168    | 4     | coordinate system label (`"2000"`)            | ASCII     |
//! | 172    | 4     | coordinate system indicator                   | i32       |
//! | 176    | 8     | orbit theory (`"COWELL  "`)                   | ASCII     |
//! | 184    | 16    | spares                                        | blanks    |
//! | 200    | 8     | time interval between points, DUT             | f64       |
//! | 208    | 4     | output interval indicator (1 fixed, 2 var.)   | i32       |
//! | 212    | 4     | spare                                         | blanks    |
//! | 216    | 8     | epoch of elements, DUT                        | f64       |
//! | 224    | 48    | epoch year-1900, month, day, hour, min, ms    | 6 × f64   |
//! | 272    | 48    | Keplerian elements at epoch, rad              | 6 × f64   |
//! | 320    | 48    | Cartesian elements at epoch, DUL and DUL/DUT  | 6 × f64   |
//! | 368    | 16    | start and end time of ephemeris, DUT          | 2 × f64   |
//! | 384    | 16    | initiation date `YYYMMDD` and time `HHMMSS`   | 2 × f64   |
//! | 400    | 8     | atmospheric density model                     | ASCII     |
//! | 408    | 1936  | spares                                        | blanks    |
//! | 2344   | 456   | harmonics with titles                         | ASCII     |
//!
//! Header 2 carries harmonics text only and is written as 2800 blanks.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    code500::{
        byte_order::{
            read_bytes, read_f64, read_f64_array, read_i32, write_f64, write_f64_array,
            write_i32, write_text, FileByteOrder,
        },
        ebcdic::{ascii_to_ebcdic, ebcdic_to_ascii},
        RECORD_SIZE,
    },
    constants::MJD,
    time_system::gregorian::{days_in_month, mjd_from_day_and_seconds, unpack_yyymmdd},
    timecore_errors::TimeCoreError,
};

pub(crate) const OFF_PRODUCT_ID: usize = 0;
pub(crate) const OFF_SAT_ID: usize = 8;
pub(crate) const OFF_TIME_SYSTEM: usize = 16;
const OFF_START_DATE: usize = 24;
const OFF_END_DATE: usize = 48;
const OFF_STEP_SIZE: usize = 72;
const OFF_TAPE_ID: usize = 80;
const OFF_SOURCE_ID: usize = 88;
const OFF_TITLE: usize = 96;
const OFF_CENTRAL_BODY: usize = 152;
const OFF_REF_TIME_DUT: usize = 160;
const OFF_COORD_LABEL: usize = 168;
const OFF_COORD_INDICATOR: usize = 172;
const OFF_ORBIT_THEORY: usize = 176;
const OFF_INTERVAL_DUT: usize = 200;
const OFF_OUTPUT_INTERVAL: usize = 208;
const OFF_EPOCH_DUT: usize = 216;
const OFF_EPOCH_FIELDS: usize = 224;
const OFF_KEPLER: usize = 272;
const OFF_CARTESIAN: usize = 320;
const OFF_START_DUT: usize = 368;
const OFF_END_DUT: usize = 376;
const OFF_INITIATION_DATE: usize = 384;
const OFF_INITIATION_TIME: usize = 392;
const OFF_DENSITY_MODEL: usize = 400;
const OFF_HARMONICS: usize = 2344;
const HARMONICS_WIDTH: usize = 456;

/// Time system indicator stored for A1 files.
pub const A1_TIME_SYSTEM_INDICATOR: f64 = 1.0;

/// Time system indicator stored for UTC files.
pub const UTC_TIME_SYSTEM_INDICATOR: f64 = 2.0;

/// Reference date of DUT times, `YYMMDD` (18 Sep 1957).
pub const REF_TIME_FOR_DUT_YYMMDD: f64 = 570918.0;

/// Central body of the ephemeris.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CentralBody {
    Earth,
    Moon,
    Sun,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
    Mercury,
    Venus,
}

impl CentralBody {
    pub fn indicator(&self) -> f64 {
        match self {
            CentralBody::Earth => 1.0,
            CentralBody::Moon => 2.0,
            CentralBody::Sun => 3.0,
            CentralBody::Mars => 4.0,
            CentralBody::Jupiter => 5.0,
            CentralBody::Saturn => 6.0,
            CentralBody::Uranus => 7.0,
            CentralBody::Neptune => 8.0,
            CentralBody::Pluto => 9.0,
            CentralBody::Mercury => 10.0,
            CentralBody::Venus => 11.0,
        }
    }

    pub fn from_indicator(indicator: f64) -> Option<Self> {
        match indicator.round() as i64 {
            1 => Some(CentralBody::Earth),
            2 => Some(CentralBody::Moon),
            3 => Some(CentralBody::Sun),
            4 => Some(CentralBody::Mars),
            5 => Some(CentralBody::Jupiter),
            6 => Some(CentralBody::Saturn),
            7 => Some(CentralBody::Uranus),
            8 => Some(CentralBody::Neptune),
            9 => Some(CentralBody::Pluto),
            10 => Some(CentralBody::Mercury),
            11 => Some(CentralBody::Venus),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "earth" => Some(CentralBody::Earth),
            "moon" | "luna" => Some(CentralBody::Moon),
            "sun" => Some(CentralBody::Sun),
            "mars" => Some(CentralBody::Mars),
            "jupiter" => Some(CentralBody::Jupiter),
            "saturn" => Some(CentralBody::Saturn),
            "uranus" => Some(CentralBody::Uranus),
            "neptune" => Some(CentralBody::Neptune),
            "pluto" => Some(CentralBody::Pluto),
            "mercury" => Some(CentralBody::Mercury),
            "venus" => Some(CentralBody::Venus),
            _ => None,
        }
    }
}

/// Reference frame of the states stored in a Code500 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordSystemIndicator {
    /// Mean equator and equinox of 1950.
    MeanOf1950,
    /// True equator and equinox of date.
    TrueOfDate,
    /// Mean equator and equinox of J2000.
    J2000,
    /// Body fixed.
    BodyFixed,
}

impl CoordSystemIndicator {
    pub fn code(&self) -> i32 {
        match self {
            CoordSystemIndicator::MeanOf1950 => 2,
            CoordSystemIndicator::TrueOfDate => 3,
            CoordSystemIndicator::J2000 => 4,
            CoordSystemIndicator::BodyFixed => 5,
        }
    }

    /// Decode the on-disk indicator.
    ///
    /// Return
    /// ----------
    /// * The indicator, or [`TimeCoreError::UnknownCoordSystemIndicator`].
    pub fn from_code(code: i32) -> Result<Self, TimeCoreError> {
        match code {
            2 => Ok(CoordSystemIndicator::MeanOf1950),
            3 => Ok(CoordSystemIndicator::TrueOfDate),
            4 => Ok(CoordSystemIndicator::J2000),
            5 => Ok(CoordSystemIndicator::BodyFixed),
            other => Err(TimeCoreError::UnknownCoordSystemIndicator(other)),
        }
    }
}

/// Decoded first header record.
///
/// Dates are kept in the packed on-disk form (`YYYMMDD`, day of year, seconds of day);
/// DUT times are relative to 00:00 of `ref_time_for_dut_yymmdd` (18 Sep 1957 by default).
#[derive(Debug, Clone, PartialEq)]
pub struct Code500Header1 {
    pub product_id: String,
    pub sat_id: f64,
    pub time_system_indicator: f64,
    pub start_date_yyymmdd: f64,
    pub start_day_of_year: f64,
    pub start_seconds_of_day: f64,
    pub end_date_yyymmdd: f64,
    pub end_day_of_year: f64,
    pub end_seconds_of_day: f64,
    pub step_size_secs: f64,
    /// Decoded from EBCDIC.
    pub tape_id: String,
    /// Decoded from EBCDIC.
    pub source_id: String,
    pub header_title: String,
    pub central_body_indicator: f64,
    pub ref_time_for_dut_yymmdd: f64,
    pub coord_system_label: String,
    pub coord_system_indicator: i32,
    pub orbit_theory: String,
    pub interval_dut: f64,
    pub output_interval_indicator: i32,
    pub epoch_time_of_elements_dut: f64,
    /// year - 1900, month, day, hour, minute, milliseconds of minute
    pub epoch_fields: [f64; 6],
    pub keplerian_elements_rad: [f64; 6],
    pub cartesian_elements_dult: [f64; 6],
    pub start_time_dut: f64,
    pub end_time_dut: f64,
    pub date_of_initiation_yyymmdd: f64,
    pub time_of_initiation_hhmmss: f64,
    pub atmospheric_density_model: String,
    pub harmonics_with_titles: String,
}

impl Default for Code500Header1 {
    fn default() -> Self {
        Code500Header1 {
            product_id: String::new(),
            sat_id: 0.0,
            time_system_indicator: A1_TIME_SYSTEM_INDICATOR,
            start_date_yyymmdd: 0.0,
            start_day_of_year: 0.0,
            start_seconds_of_day: 0.0,
            end_date_yyymmdd: 0.0,
            end_day_of_year: 0.0,
            end_seconds_of_day: 0.0,
            step_size_secs: 0.0,
            tape_id: String::new(),
            source_id: String::new(),
            header_title: String::new(),
            central_body_indicator: CentralBody::Earth.indicator(),
            ref_time_for_dut_yymmdd: REF_TIME_FOR_DUT_YYMMDD,
            coord_system_label: "2000".into(),
            coord_system_indicator: CoordSystemIndicator::J2000.code(),
            orbit_theory: "COWELL".into(),
            interval_dut: 0.0,
            output_interval_indicator: 1,
            epoch_time_of_elements_dut: 0.0,
            epoch_fields: [0.0; 6],
            keplerian_elements_rad: [0.0; 6],
            cartesian_elements_dult: [0.0; 6],
            start_time_dut: 0.0,
            end_time_dut: 0.0,
            date_of_initiation_yyymmdd: 0.0,
            time_of_initiation_hhmmss: 0.0,
            atmospheric_density_model: String::new(),
            harmonics_with_titles: String::new(),
        }
    }
}

fn ascii_field(bytes: &[u8], offset: usize, width: usize) -> Result<String, TimeCoreError> {
    let raw = read_bytes(bytes, offset, width)?;
    Ok(String::from_utf8_lossy(raw).trim_end().to_string())
}

fn array6(values: Vec<f64>) -> [f64; 6] {
    let mut out = [0.0; 6];
    for (dst, v) in out.iter_mut().zip(values) {
        *dst = v;
    }
    out
}

impl Code500Header1 {
    /// Decode the first header record.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: The raw 2800-byte record.
    /// * `order`: Byte order of the file.
    ///
    /// Return
    /// ----------
    /// * The decoded header, or [`TimeCoreError::TruncatedRecord`] for a short buffer.
    pub fn parse(bytes: &[u8], order: FileByteOrder) -> Result<Self, TimeCoreError> {
        if bytes.len() < RECORD_SIZE {
            return Err(TimeCoreError::TruncatedRecord {
                record: 1,
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        let f = |offset| read_f64(bytes, offset, order);

        Ok(Code500Header1 {
            product_id: ascii_field(bytes, OFF_PRODUCT_ID, 8)?,
            sat_id: f(OFF_SAT_ID)?,
            time_system_indicator: f(OFF_TIME_SYSTEM)?,
            start_date_yyymmdd: f(OFF_START_DATE)?,
            start_day_of_year: f(OFF_START_DATE + 8)?,
            start_seconds_of_day: f(OFF_START_DATE + 16)?,
            end_date_yyymmdd: f(OFF_END_DATE)?,
            end_day_of_year: f(OFF_END_DATE + 8)?,
            end_seconds_of_day: f(OFF_END_DATE + 16)?,
            step_size_secs: f(OFF_STEP_SIZE)?,
            tape_id: ebcdic_to_ascii(read_bytes(bytes, OFF_TAPE_ID, 8)?)
                .trim_end()
                .to_string(),
            source_id: ebcdic_to_ascii(read_bytes(bytes, OFF_SOURCE_ID, 8)?)
                .trim_end()
                .to_string(),
            header_title: ascii_field(bytes, OFF_TITLE, 56)?,
            central_body_indicator: f(OFF_CENTRAL_BODY)?,
            ref_time_for_dut_yymmdd: f(OFF_REF_TIME_DUT)?,
            coord_system_label: ascii_field(bytes, OFF_COORD_LABEL, 4)?,
            coord_system_indicator: read_i32(bytes, OFF_COORD_INDICATOR, order)?,
            orbit_theory: ascii_field(bytes, OFF_ORBIT_THEORY, 8)?,
            interval_dut: f(OFF_INTERVAL_DUT)?,
            output_interval_indicator: read_i32(bytes, OFF_OUTPUT_INTERVAL, order)?,
            epoch_time_of_elements_dut: f(OFF_EPOCH_DUT)?,
            epoch_fields: array6(read_f64_array(bytes, OFF_EPOCH_FIELDS, 6, order)?),
            keplerian_elements_rad: array6(read_f64_array(bytes, OFF_KEPLER, 6, order)?),
            cartesian_elements_dult: array6(read_f64_array(bytes, OFF_CARTESIAN, 6, order)?),
            start_time_dut: f(OFF_START_DUT)?,
            end_time_dut: f(OFF_END_DUT)?,
            date_of_initiation_yyymmdd: f(OFF_INITIATION_DATE)?,
            time_of_initiation_hhmmss: f(OFF_INITIATION_TIME)?,
            atmospheric_density_model: ascii_field(bytes, OFF_DENSITY_MODEL, 8)?,
            harmonics_with_titles: ascii_field(bytes, OFF_HARMONICS, HARMONICS_WIDTH)?,
        })
    }

    /// Encode the header into a blank-filled 2800-byte record.
    pub fn pack(&self, order: FileByteOrder) -> Vec<u8> {
        let mut buf = vec![b' '; RECORD_SIZE];

        write_text(&mut buf, OFF_PRODUCT_ID, 8, self.product_id.as_bytes());
        write_f64(&mut buf, OFF_SAT_ID, self.sat_id, order);
        write_f64(&mut buf, OFF_TIME_SYSTEM, self.time_system_indicator, order);
        write_f64_array(
            &mut buf,
            OFF_START_DATE,
            &[
                self.start_date_yyymmdd,
                self.start_day_of_year,
                self.start_seconds_of_day,
            ],
            order,
        );
        write_f64_array(
            &mut buf,
            OFF_END_DATE,
            &[
                self.end_date_yyymmdd,
                self.end_day_of_year,
                self.end_seconds_of_day,
            ],
            order,
        );
        write_f64(&mut buf, OFF_STEP_SIZE, self.step_size_secs, order);
        write_text(&mut buf, OFF_TAPE_ID, 8, &ascii_to_ebcdic(&self.tape_id, 8));
        write_text(&mut buf, OFF_SOURCE_ID, 8, &ascii_to_ebcdic(&self.source_id, 8));
        write_text(&mut buf, OFF_TITLE, 56, self.header_title.as_bytes());
        write_f64(&mut buf, OFF_CENTRAL_BODY, self.central_body_indicator, order);
        write_f64(&mut buf, OFF_REF_TIME_DUT, self.ref_time_for_dut_yymmdd, order);
        write_text(&mut buf, OFF_COORD_LABEL, 4, self.coord_system_label.as_bytes());
        write_i32(&mut buf, OFF_COORD_INDICATOR, self.coord_system_indicator, order);
        write_text(&mut buf, OFF_ORBIT_THEORY, 8, self.orbit_theory.as_bytes());
        write_f64(&mut buf, OFF_INTERVAL_DUT, self.interval_dut, order);
        write_i32(&mut buf, OFF_OUTPUT_INTERVAL, self.output_interval_indicator, order);
        write_f64(&mut buf, OFF_EPOCH_DUT, self.epoch_time_of_elements_dut, order);
        write_f64_array(&mut buf, OFF_EPOCH_FIELDS, &self.epoch_fields, order);
        write_f64_array(&mut buf, OFF_KEPLER, &self.keplerian_elements_rad, order);
        write_f64_array(&mut buf, OFF_CARTESIAN, &self.cartesian_elements_dult, order);
        write_f64(&mut buf, OFF_START_DUT, self.start_time_dut, order);
        write_f64(&mut buf, OFF_END_DUT, self.end_time_dut, order);
        write_f64(&mut buf, OFF_INITIATION_DATE, self.date_of_initiation_yyymmdd, order);
        write_f64(&mut buf, OFF_INITIATION_TIME, self.time_of_initiation_hhmmss, order);
        write_text(
            &mut buf,
            OFF_DENSITY_MODEL,
            8,
            self.atmospheric_density_model.as_bytes(),
        );
        write_text(
            &mut buf,
            OFF_HARMONICS,
            HARMONICS_WIDTH,
            self.harmonics_with_titles.as_bytes(),
        );
        buf
    }

    pub fn central_body(&self) -> Option<CentralBody> {
        CentralBody::from_indicator(self.central_body_indicator)
    }

    pub fn coord_system(&self) -> Result<CoordSystemIndicator, TimeCoreError> {
        CoordSystemIndicator::from_code(self.coord_system_indicator)
    }

    /// Modified julian date (standard origin) of 00:00 on the DUT reference date.
    ///
    /// Return
    /// ----------
    /// * The reference epoch, or [`TimeCoreError::InvalidDutReference`] when the packed
    ///   `YYMMDD` value is not a calendar date.
    pub fn dut_reference_mjd(&self) -> Result<MJD, TimeCoreError> {
        let packed = self.ref_time_for_dut_yymmdd;
        if !packed.is_finite() || !(0.0..10_000_000.0).contains(&packed) || packed.fract() != 0.0 {
            return Err(TimeCoreError::InvalidDutReference(packed));
        }
        let (year, month, day) = unpack_yyymmdd(packed);
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return Err(TimeCoreError::InvalidDutReference(packed));
        }
        Ok(mjd_from_day_and_seconds(year, month, day, 0.0))
    }
}

impl fmt::Display for Code500Header1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------------------------------+------------------------------+")?;
        writeln!(f, "| {:<28} | {:<28} |", "Code500 header 1", "")?;
        writeln!(f, "+------------------------------+------------------------------+")?;
        let rows: [(&str, String); 12] = [
            ("product id", self.product_id.clone()),
            ("satellite id", format!("{}", self.sat_id)),
            ("time system indicator", format!("{}", self.time_system_indicator)),
            (
                "start (YYYMMDD doy sec)",
                format!(
                    "{} {} {}",
                    self.start_date_yyymmdd, self.start_day_of_year, self.start_seconds_of_day
                ),
            ),
            (
                "end (YYYMMDD doy sec)",
                format!(
                    "{} {} {}",
                    self.end_date_yyymmdd, self.end_day_of_year, self.end_seconds_of_day
                ),
            ),
            ("step size (s)", format!("{}", self.step_size_secs)),
            ("tape id", self.tape_id.clone()),
            ("source id", self.source_id.clone()),
            ("central body", format!("{}", self.central_body_indicator)),
            ("coordinate system", format!("{}", self.coord_system_indicator)),
            ("orbit theory", self.orbit_theory.clone()),
            (
                "start/end (DUT)",
                format!("{:.6} / {:.6}", self.start_time_dut, self.end_time_dut),
            ),
        ];
        for (name, value) in rows {
            writeln!(f, "| {:<28} | {:<28} |", name, value)?;
        }
        write!(f, "+------------------------------+------------------------------+")
    }
}

/// Second header record: harmonics text only.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Code500Header2 {
    pub harmonics_with_titles: String,
}

impl Code500Header2 {
    pub fn parse(bytes: &[u8]) -> Result<Self, TimeCoreError> {
        if bytes.len() < RECORD_SIZE {
            return Err(TimeCoreError::TruncatedRecord {
                record: 2,
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Code500Header2 {
            harmonics_with_titles: ascii_field(bytes, 0, RECORD_SIZE)?,
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = vec![b' '; RECORD_SIZE];
        write_text(&mut buf, 0, RECORD_SIZE, self.harmonics_with_titles.as_bytes());
        buf
    }
}
