//! One META/DATA block of an ephemeris message.
//!
//! A segment collects its metadata keyword by keyword ([`EphemerisSegment::set_meta_data`]),
//! is validated, then receives its data lines in increasing epoch order. Once loaded it answers
//! coverage queries and returns the state at any covered epoch, either directly (exact epoch or
//! step interpolation of degree 0) or through Lagrange or SLERP interpolation.
use std::{collections::BTreeMap, fmt};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ccsds::{
        epoch::parse_ccsds_epoch,
        interpolation::{lagrange_interpolate, slerp_interpolate, Sample, EPOCH_MATCH_TOLERANCE},
    },
    constants::MJD,
    time_system::converter::TimeConverter,
    timecore_errors::TimeCoreError,
};

/// Highest Lagrange degree accepted in metadata.
pub const MAX_LAGRANGE_DEGREE: i32 = 9;

/// Kind of data carried by a segment; fixes the number of values per data line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// Position and velocity.
    Orbit,
    /// Attitude quaternion.
    Quaternion,
    /// Three Euler angles.
    EulerAngle,
}

impl SegmentKind {
    pub fn data_size(&self) -> usize {
        match self {
            SegmentKind::Orbit => 6,
            SegmentKind::Quaternion => 4,
            SegmentKind::EulerAngle => 3,
        }
    }

    /// Kind named by an `ATTITUDE_TYPE` value.
    pub fn from_attitude_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "QUATERNION" => Some(SegmentKind::Quaternion),
            "EULER_ANGLE" => Some(SegmentKind::EulerAngle),
            _ => None,
        }
    }

    fn uses_slerp(&self) -> bool {
        matches!(self, SegmentKind::Quaternion)
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentKind::Orbit => "ORBIT",
            SegmentKind::Quaternion => "QUATERNION",
            SegmentKind::EulerAngle => "EULER_ANGLE",
        };
        write!(f, "{name}")
    }
}

/// Attitude metadata keywords stored verbatim.
const ATTITUDE_KEYWORDS: [&str; 7] = [
    "REF_FRAME_A",
    "REF_FRAME_B",
    "ATTITUDE_DIR",
    "ATTITUDE_TYPE",
    "QUATERNION_TYPE",
    "EULER_ROT_SEQ",
    "RATE_FRAME",
];

#[derive(Debug, Clone, PartialEq)]
pub struct EphemerisSegment {
    number: usize,
    kind: SegmentKind,

    pub object_name: Option<String>,
    pub object_id: Option<String>,
    pub center_name: Option<String>,
    pub ref_frame: Option<String>,
    /// Upper-cased.
    pub time_system: Option<String>,
    start_time: Option<MJD>,
    stop_time: Option<MJD>,
    usable_start_time: Option<MJD>,
    usable_stop_time: Option<MJD>,
    /// Upper-cased `INTERPOLATION` / `INTERPOLATION_METHOD` value.
    pub interpolation_method: Option<String>,
    interpolation_degree: Option<i32>,
    attitude_fields: BTreeMap<String, String>,

    meta_comments: Vec<String>,
    data_comments: Vec<String>,
    data: Vec<Sample>,

    uses_usable_times: bool,
    usable_range: Option<(usize, usize)>,
}

impl EphemerisSegment {
    /// An empty segment.
    ///
    /// Arguments
    /// -----------------
    /// * `number`: One-based position of the segment in its message, used in error messages.
    /// * `kind`: Data carried by the segment.
    pub fn new(number: usize, kind: SegmentKind) -> Self {
        EphemerisSegment {
            number,
            kind,
            object_name: None,
            object_id: None,
            center_name: None,
            ref_frame: None,
            time_system: None,
            start_time: None,
            stop_time: None,
            usable_start_time: None,
            usable_stop_time: None,
            interpolation_method: None,
            interpolation_degree: None,
            attitude_fields: BTreeMap::new(),
            meta_comments: Vec::new(),
            data_comments: Vec::new(),
            data: Vec::new(),
            uses_usable_times: false,
            usable_range: None,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn data_size(&self) -> usize {
        self.kind.data_size()
    }

    pub fn interpolation_degree(&self) -> Option<i32> {
        self.interpolation_degree
    }

    pub fn usable_start_time(&self) -> Option<MJD> {
        self.usable_start_time
    }

    pub fn usable_stop_time(&self) -> Option<MJD> {
        self.usable_stop_time
    }

    /// Attitude keyword value (`REF_FRAME_A`, `QUATERNION_TYPE`, …).
    pub fn attitude_field(&self, keyword: &str) -> Option<&str> {
        self.attitude_fields.get(keyword).map(String::as_str)
    }

    fn format_error(&self, message: impl Into<String>) -> TimeCoreError {
        TimeCoreError::SegmentFormat {
            segment: self.number,
            message: message.into(),
        }
    }

    fn range_error(&self, message: impl Into<String>) -> TimeCoreError {
        TimeCoreError::SegmentRange {
            segment: self.number,
            message: message.into(),
        }
    }

    fn sequencing_error(&self, message: impl Into<String>) -> TimeCoreError {
        TimeCoreError::SegmentSequencing {
            segment: self.number,
            message: message.into(),
        }
    }

    fn configuration_error(&self, message: impl Into<String>) -> TimeCoreError {
        TimeCoreError::SegmentConfiguration {
            segment: self.number,
            message: message.into(),
        }
    }

    /// Store one metadata keyword.
    ///
    /// Epoch keywords (`START_TIME`, `STOP_TIME`, `USEABLE_START_TIME`, `USEABLE_STOP_TIME`)
    /// are parsed as UTC and stored as A1 modified julian dates.
    ///
    /// Arguments
    /// -----------------
    /// * `field`: Upper-case keyword.
    /// * `value`: Trimmed value.
    /// * `converter`: Used for epoch keywords.
    ///
    /// Return
    /// ----------
    /// * `Ok(true)` when the keyword was stored, `Ok(false)` for a keyword this segment kind
    ///   does not know, or the epoch / degree parsing error.
    pub fn set_meta_data(
        &mut self,
        field: &str,
        value: &str,
        converter: &TimeConverter,
    ) -> Result<bool, TimeCoreError> {
        match field {
            "COMMENT" => self.meta_comments.push(value.to_string()),
            "OBJECT_NAME" => self.object_name = Some(value.to_string()),
            "OBJECT_ID" => self.object_id = Some(value.to_string()),
            "CENTER_NAME" => self.center_name = Some(value.to_string()),
            "REF_FRAME" => self.ref_frame = Some(value.to_string()),
            "TIME_SYSTEM" => self.time_system = Some(value.to_ascii_uppercase()),
            "START_TIME" => self.start_time = Some(parse_ccsds_epoch(value, converter)?),
            "STOP_TIME" => self.stop_time = Some(parse_ccsds_epoch(value, converter)?),
            "USEABLE_START_TIME" => {
                self.usable_start_time = Some(parse_ccsds_epoch(value, converter)?)
            }
            "USEABLE_STOP_TIME" => {
                self.usable_stop_time = Some(parse_ccsds_epoch(value, converter)?)
            }
            "INTERPOLATION" | "INTERPOLATION_METHOD" => {
                self.interpolation_method = Some(value.to_ascii_uppercase())
            }
            "INTERPOLATION_DEGREE" => {
                let degree = value.trim().parse::<i32>().map_err(|_| {
                    self.format_error("value for INTERPOLATION_DEGREE is not a valid integer")
                })?;
                self.interpolation_degree = Some(degree);
            }
            other
                if self.kind != SegmentKind::Orbit && ATTITUDE_KEYWORDS.contains(&other) =>
            {
                self.attitude_fields
                    .insert(other.to_string(), value.to_string());
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub fn add_meta_comment(&mut self, comment: &str) {
        self.meta_comments.push(comment.to_string());
    }

    pub fn add_data_comment(&mut self, comment: &str) {
        self.data_comments.push(comment.to_string());
    }

    pub fn meta_comments(&self) -> &[String] {
        &self.meta_comments
    }

    pub fn data_comments(&self) -> &[String] {
        &self.data_comments
    }

    /// Reset every metadata field and comment; the data store is kept.
    pub fn clear_meta_data(&mut self) {
        self.object_name = None;
        self.object_id = None;
        self.center_name = None;
        self.ref_frame = None;
        self.time_system = None;
        self.start_time = None;
        self.stop_time = None;
        self.usable_start_time = None;
        self.usable_stop_time = None;
        self.interpolation_method = None;
        self.interpolation_degree = None;
        self.attitude_fields.clear();
        self.meta_comments.clear();
        self.uses_usable_times = false;
        self.usable_range = None;
    }

    /// Drop every data point and data comment.
    pub fn clear_data_store(&mut self) {
        self.data.clear();
        self.data_comments.clear();
        self.usable_range = None;
    }

    /// Check the metadata and compute the usable index range.
    ///
    /// Arguments
    /// -----------------
    /// * `check_data`: Also require a non-empty data store.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` or the first violated rule:
    ///   - missing `TIME_SYSTEM`, `START_TIME` or `STOP_TIME` (Format)
    ///   - a time system other than UTC (Configuration)
    ///   - start after stop, usable times outside `[start, stop]` or reversed (Range)
    ///   - only one of the usable times present (Format)
    ///   - a Lagrange degree outside `0..=9` (Configuration)
    ///   - a usable range reduced to one point (Sequencing)
    ///   - no data when `check_data` is set (Sequencing)
    pub fn validate(&mut self, check_data: bool) -> Result<(), TimeCoreError> {
        match self.time_system.as_deref() {
            None => return Err(self.format_error("required field TIME_SYSTEM is missing")),
            Some("UTC") => {}
            Some(other) => {
                return Err(self.configuration_error(format!(
                    "specified TIME_SYSTEM \"{other}\" is not supported"
                )))
            }
        }

        let (Some(start), Some(stop)) = (self.start_time, self.stop_time) else {
            return Err(self.format_error("required field START_TIME or STOP_TIME is missing"));
        };
        if start > stop {
            return Err(self.range_error("START_TIME must be less than STOP_TIME"));
        }

        self.uses_usable_times = match (self.usable_start_time, self.usable_stop_time) {
            (None, None) => false,
            (Some(usable_start), Some(usable_stop)) => {
                if usable_start < start || usable_start > stop {
                    return Err(
                        self.range_error("USEABLE_START_TIME must be between START_TIME and STOP_TIME")
                    );
                }
                if usable_stop < start || usable_stop > stop {
                    return Err(
                        self.range_error("USEABLE_STOP_TIME must be between START_TIME and STOP_TIME")
                    );
                }
                if usable_start > usable_stop {
                    return Err(
                        self.range_error("USEABLE_START_TIME must be less than USEABLE_STOP_TIME")
                    );
                }
                true
            }
            _ => {
                return Err(self.format_error(
                    "both USEABLE_START_TIME and USEABLE_STOP_TIME must be present to use usable times",
                ))
            }
        };

        self.usable_range = self.usable_index_range()?;

        let lagrange_declared = self.interpolation_method.as_deref() == Some("LAGRANGE");
        if let Some(degree) = self.interpolation_degree {
            if (lagrange_declared || !self.kind.uses_slerp())
                && !(0..=MAX_LAGRANGE_DEGREE).contains(&degree)
            {
                return Err(self.configuration_error(format!(
                    "INTERPOLATION_DEGREE {degree} is out of range; Lagrange degree must be between 0 and {MAX_LAGRANGE_DEGREE}"
                )));
            }
        }

        if check_data && self.data.is_empty() {
            return Err(self.sequencing_error(format!(
                "no data for segment of data type {}",
                self.kind
            )));
        }
        Ok(())
    }

    /// Inclusive index range of the points inside the usable span.
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` for an empty store, the range otherwise. A range reduced to one point is a
    ///   Sequencing error and a range with no point is a Range error.
    pub fn usable_index_range(&self) -> Result<Option<(usize, usize)>, TimeCoreError> {
        if self.data.is_empty() {
            return Ok(None);
        }

        let mut first = 0;
        let mut last = self.data.len() - 1;
        if self.uses_usable_times {
            let (Some(usable_start), Some(usable_stop)) =
                (self.usable_start_time, self.usable_stop_time)
            else {
                return Ok(None);
            };
            first = self
                .data
                .iter()
                .position(|(epoch, _)| *epoch > usable_start - EPOCH_MATCH_TOLERANCE)
                .unwrap_or(self.data.len());
            if let Some(after) = self
                .data
                .iter()
                .position(|(epoch, _)| *epoch > usable_stop + EPOCH_MATCH_TOLERANCE)
            {
                if after == 0 {
                    return Err(self.range_error("no data point in the usable epoch range"));
                }
                last = after - 1;
            }
        }

        if first > last {
            return Err(self.range_error("no data point in the usable epoch range"));
        }
        if first == last {
            return Err(self.sequencing_error("only one data point available in usable epoch range"));
        }
        Ok(Some((first, last)))
    }

    /// Append a data point.
    ///
    /// Arguments
    /// -----------------
    /// * `epoch`: A1 modified julian date.
    /// * `values`: Exactly [`data_size`](Self::data_size) values.
    /// * `just_check_size`: Only the size is checked, the epoch is not. Used for messages
    ///   written by backward propagation.
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, a Format error for a size mismatch, a Range error for an epoch outside
    ///   `[start, stop]`, or a Sequencing error for an epoch not after the previous one.
    pub fn add_data(
        &mut self,
        epoch: MJD,
        values: DVector<f64>,
        just_check_size: bool,
    ) -> Result<(), TimeCoreError> {
        if values.len() != self.data_size() {
            return Err(self.format_error(format!(
                "data of type {} must contain {} elements, got {}",
                self.kind,
                self.data_size(),
                values.len()
            )));
        }

        if !just_check_size {
            if let (Some(start), Some(stop)) = (self.start_time, self.stop_time) {
                if epoch < start || epoch > stop {
                    return Err(self.range_error(format!(
                        "data epoch {epoch:.16} must be between the start time {start:.16} and the stop time {stop:.16}"
                    )));
                }
            }
            if let Some((last_epoch, _)) = self.data.last() {
                if epoch <= *last_epoch {
                    return Err(
                        self.sequencing_error("epochs within DATA segment must be increasing")
                    );
                }
            }
        }

        self.data.push((epoch, values));
        self.usable_range = None;
        Ok(())
    }

    pub fn number_of_data_points(&self) -> usize {
        self.data.len()
    }

    /// Epoch and values of the point at `index`, if any.
    pub fn epoch_and_data(&self, index: usize) -> Option<(MJD, &DVector<f64>)> {
        self.data.get(index).map(|(epoch, values)| (*epoch, values))
    }

    pub fn start_time(&self) -> Option<MJD> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<MJD> {
        self.stop_time
    }

    /// Whether `epoch` lies in the usable span (or `[start, stop]` without usable times),
    /// widened by [`EPOCH_MATCH_TOLERANCE`] on both sides.
    pub fn covers_epoch(&self, epoch: MJD) -> bool {
        let (low, high) = if self.uses_usable_times {
            (self.usable_start_time, self.usable_stop_time)
        } else {
            (self.start_time, self.stop_time)
        };
        match (low, high) {
            (Some(low), Some(high)) => {
                epoch >= low - EPOCH_MATCH_TOLERANCE && epoch <= high + EPOCH_MATCH_TOLERANCE
            }
            _ => false,
        }
    }

    /// State of the segment at `at`.
    ///
    /// A stored epoch within [`EPOCH_MATCH_TOLERANCE`] of `at` returns its values. Otherwise a
    /// degree of 0 returns the last point before `at` and any other degree interpolates
    /// (SLERP for quaternions, Lagrange for the rest).
    ///
    /// Arguments
    /// -----------------
    /// * `at`: A1 modified julian date.
    ///
    /// Return
    /// ----------
    /// * The values, a Range error when `at` is outside the usable span or before the first
    ///   point, a Configuration error when interpolation is needed without a degree.
    pub fn determine_state(&mut self, at: MJD) -> Result<DVector<f64>, TimeCoreError> {
        if self.uses_usable_times {
            if let (Some(low), Some(high)) = (self.usable_start_time, self.usable_stop_time) {
                if at < low - EPOCH_MATCH_TOLERANCE || at > high + EPOCH_MATCH_TOLERANCE {
                    return Err(self.range_error(format!(
                        "specified epoch {at:.16} must be within the usable time range"
                    )));
                }
            }
        }

        let mut match_pos = None;
        let mut exact = false;
        for (i, (epoch, _)) in self.data.iter().enumerate() {
            if (epoch - at).abs() <= EPOCH_MATCH_TOLERANCE {
                match_pos = Some(i);
                exact = true;
                break;
            }
            if *epoch < at {
                match_pos = Some(i);
            } else {
                break;
            }
        }

        let Some(pos) = match_pos else {
            return Err(self.range_error(format!(
                "no data at or before epoch {at:.16} within the usable time range"
            )));
        };

        if exact || self.interpolation_degree == Some(0) {
            return Ok(self.data[pos].1.clone());
        }
        self.interpolate(at)
    }

    fn interpolate(&mut self, at: MJD) -> Result<DVector<f64>, TimeCoreError> {
        let (first, last) = match self.usable_range {
            Some(range) => range,
            None => self
                .usable_index_range()?
                .ok_or_else(|| self.sequencing_error("no data to interpolate"))?,
        };
        self.usable_range = Some((first, last));

        if self.kind.uses_slerp() {
            debug!(segment = self.number, at, "SLERP interpolation");
            return slerp_interpolate(&self.data, first, last, at, self.number);
        }

        let degree = self.interpolation_degree.ok_or_else(|| {
            self.configuration_error("INTERPOLATION_DEGREE is required to interpolate")
        })?;
        let degree = usize::try_from(degree).map_err(|_| {
            self.configuration_error(format!("invalid INTERPOLATION_DEGREE {degree}"))
        })?;
        debug!(segment = self.number, at, degree, "Lagrange interpolation");
        lagrange_interpolate(&self.data, first, last, degree, at, self.number)
    }
}

#[cfg(test)]
mod test_segment {
    use std::sync::Arc;

    use super::*;
    use crate::{
        constants::JD_NOV_17_1858,
        time_system::{leap_seconds::LeapSecondTable, TimeSystem},
        timecore_errors::ErrorKind,
    };
    use approx::assert_abs_diff_eq;

    fn converter() -> TimeConverter {
        let leap = LeapSecondTable::from_str_content(
            " 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S\n",
        )
        .unwrap();
        TimeConverter::with_leap_seconds_only(Arc::new(leap))
    }

    fn a1(conv: &TimeConverter, text: &str) -> MJD {
        parse_ccsds_epoch(text, conv).unwrap()
    }

    fn orbit_segment(conv: &TimeConverter, degree: &str) -> EphemerisSegment {
        let mut seg = EphemerisSegment::new(1, SegmentKind::Orbit);
        for (k, v) in [
            ("OBJECT_NAME", "SAT"),
            ("CENTER_NAME", "EARTH"),
            ("REF_FRAME", "EME2000"),
            ("TIME_SYSTEM", "utc"),
            ("START_TIME", "2020-01-01T00:00:00"),
            ("STOP_TIME", "2020-01-01T01:00:00"),
            ("INTERPOLATION", "Lagrange"),
            ("INTERPOLATION_DEGREE", degree),
        ] {
            assert!(seg.set_meta_data(k, v, conv).unwrap());
        }
        seg.validate(false).unwrap();
        seg
    }

    fn vector(x: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, 2.0 * x, 3.0 * x, 0.1, 0.2, 0.3])
    }

    #[test]
    fn test_step_interpolation() {
        let conv = converter();
        let mut seg = orbit_segment(&conv, "0");
        let t0 = seg.start_time().unwrap();
        let minute = 60.0 / 86400.0;
        for k in 1..=3 {
            seg.add_data(t0 + k as f64 * minute, vector(k as f64), false)
                .unwrap();
        }
        seg.validate(true).unwrap();

        assert_eq!(seg.determine_state(t0 + 2.0 * minute).unwrap(), vector(2.0));
        assert_eq!(seg.determine_state(t0 + 2.9 * minute).unwrap(), vector(2.0));
        assert_eq!(seg.determine_state(t0 + 3.0 * minute).unwrap(), vector(3.0));
        assert_eq!(
            seg.determine_state(t0 + 0.5 * minute).unwrap_err().kind(),
            ErrorKind::Range
        );
    }

    #[test]
    fn test_lagrange_state() {
        let conv = converter();
        let mut seg = orbit_segment(&conv, "3");
        let t0 = seg.start_time().unwrap();
        let step = 60.0 / 86400.0;
        for k in 0..10 {
            seg.add_data(t0 + k as f64 * step, vector(k as f64), false)
                .unwrap();
        }
        seg.validate(true).unwrap();
        let state = seg.determine_state(t0 + 4.5 * step).unwrap();
        assert_abs_diff_eq!(state[0], 4.5, epsilon = 1e-6);
        assert_abs_diff_eq!(state[2], 13.5, epsilon = 1e-6);
        assert_abs_diff_eq!(state[5], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_backward_epoch_is_sequencing_error() {
        let conv = converter();
        let mut seg = orbit_segment(&conv, "5");
        let t0 = seg.start_time().unwrap();
        seg.add_data(t0 + 5.0 / 1440.0, vector(5.0), false).unwrap();
        let err = seg.add_data(t0 + 4.0 / 1440.0, vector(4.0), false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequencing);

        // size only: accepted
        seg.add_data(t0 + 4.0 / 1440.0, vector(4.0), true).unwrap();
        let err = seg
            .add_data(t0 + 6.0 / 1440.0, DVector::from_vec(vec![1.0; 3]), true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(seg.number_of_data_points(), 2);
    }

    #[test]
    fn test_add_data_outside_span() {
        let conv = converter();
        let mut seg = orbit_segment(&conv, "5");
        let t0 = seg.start_time().unwrap();
        assert_eq!(
            seg.add_data(t0 - 1.0, vector(0.0), false).unwrap_err().kind(),
            ErrorKind::Range
        );
    }

    #[test]
    fn test_validate_rules() {
        let conv = converter();

        let mut seg = EphemerisSegment::new(2, SegmentKind::Orbit);
        assert!(matches!(
            seg.validate(false),
            Err(TimeCoreError::SegmentFormat { segment: 2, .. })
        ));

        seg.set_meta_data("TIME_SYSTEM", "TAI", &conv).unwrap();
        assert_eq!(seg.validate(false).unwrap_err().kind(), ErrorKind::Configuration);

        seg.set_meta_data("TIME_SYSTEM", "UTC", &conv).unwrap();
        seg.set_meta_data("START_TIME", "2020-01-02T00:00:00", &conv).unwrap();
        seg.set_meta_data("STOP_TIME", "2020-01-01T00:00:00", &conv).unwrap();
        assert_eq!(seg.validate(false).unwrap_err().kind(), ErrorKind::Range);

        seg.set_meta_data("STOP_TIME", "2020-01-03T00:00:00", &conv).unwrap();
        seg.set_meta_data("USEABLE_START_TIME", "2020-01-02T06:00:00", &conv)
            .unwrap();
        assert_eq!(seg.validate(false).unwrap_err().kind(), ErrorKind::Format);

        seg.set_meta_data("USEABLE_STOP_TIME", "2020-01-04T00:00:00", &conv)
            .unwrap();
        assert_eq!(seg.validate(false).unwrap_err().kind(), ErrorKind::Range);

        seg.set_meta_data("USEABLE_STOP_TIME", "2020-01-02T18:00:00", &conv)
            .unwrap();
        seg.validate(false).unwrap();
        assert_eq!(seg.validate(true).unwrap_err().kind(), ErrorKind::Sequencing);

        seg.set_meta_data("INTERPOLATION_DEGREE", "10", &conv).unwrap();
        assert_eq!(seg.validate(false).unwrap_err().kind(), ErrorKind::Configuration);
        assert_eq!(
            seg.set_meta_data("INTERPOLATION_DEGREE", "three", &conv)
                .unwrap_err()
                .kind(),
            ErrorKind::Format
        );
        assert!(!seg.set_meta_data("QUATERNION_TYPE", "LAST", &conv).unwrap());
    }

    #[test]
    fn test_usable_range_and_coverage() {
        let conv = converter();
        let mut seg = orbit_segment(&conv, "1");
        let t0 = seg.start_time().unwrap();
        let step = 600.0 / 86400.0;
        for k in 0..6 {
            seg.add_data(t0 + k as f64 * step, vector(k as f64), false)
                .unwrap();
        }
        seg.set_meta_data("USEABLE_START_TIME", "2020-01-01T00:10:00", &conv)
            .unwrap();
        seg.set_meta_data("USEABLE_STOP_TIME", "2020-01-01T00:40:00", &conv)
            .unwrap();
        seg.validate(true).unwrap();
        assert_eq!(seg.usable_index_range().unwrap(), Some((1, 4)));

        assert!(seg.covers_epoch(t0 + step));
        assert!(!seg.covers_epoch(t0 + 0.5 * step));
        assert!(seg.covers_epoch(t0 + 4.0 * step + 0.5e-3 / 86400.0));
        assert!(!seg.covers_epoch(t0 + 5.0 * step));

        let state = seg.determine_state(t0 + 2.5 * step).unwrap();
        assert_abs_diff_eq!(state[0], 2.5, epsilon = 1e-6);
        assert_eq!(
            seg.determine_state(t0 + 5.0 * step).unwrap_err().kind(),
            ErrorKind::Range
        );

        // collapse the usable span onto a single point
        seg.set_meta_data("USEABLE_STOP_TIME", "2020-01-01T00:15:00", &conv)
            .unwrap();
        assert_eq!(seg.validate(true).unwrap_err().kind(), ErrorKind::Sequencing);
    }

    #[test]
    fn test_quaternion_segment() {
        let conv = converter();
        let mut seg = EphemerisSegment::new(1, SegmentKind::Quaternion);
        seg.set_meta_data("TIME_SYSTEM", "UTC", &conv).unwrap();
        seg.set_meta_data("START_TIME", "2020-001T00:00:00", &conv).unwrap();
        seg.set_meta_data("STOP_TIME", "2020-001T00:02:00", &conv).unwrap();
        assert!(seg.set_meta_data("QUATERNION_TYPE", "LAST", &conv).unwrap());
        seg.validate(false).unwrap();

        let t0 = a1(&conv, "2020-001T00:00:00");
        let t1 = a1(&conv, "2020-001T00:02:00");
        seg.add_data(t0, DVector::from_vec(vec![0.0, 0.0, 0.0, 1.0]), false)
            .unwrap();
        let half = std::f64::consts::FRAC_1_SQRT_2;
        seg.add_data(t1, DVector::from_vec(vec![0.0, 0.0, half, half]), false)
            .unwrap();
        seg.validate(true).unwrap();

        let mid = seg.determine_state((t0 + t1) / 2.0).unwrap();
        let expected = (std::f64::consts::PI / 8.0).sin();
        assert_abs_diff_eq!(mid[2], expected, epsilon = 1e-9);
        assert_abs_diff_eq!(mid.norm(), 1.0, epsilon = 1e-12);
        assert_eq!(seg.attitude_field("QUATERNION_TYPE"), Some("LAST"));

        // the stored A1 epoch converts back to the UTC text
        let utc = conv
            .convert(t0, TimeSystem::A1, TimeSystem::UTC, JD_NOV_17_1858)
            .unwrap();
        assert_abs_diff_eq!(utc, 58849.0, epsilon = 1e-10);
    }

    #[test]
    fn test_clear() {
        let conv = converter();
        let mut seg = orbit_segment(&conv, "1");
        seg.add_data(seg.start_time().unwrap(), vector(1.0), false).unwrap();
        seg.add_data_comment("data");
        seg.clear_data_store();
        assert_eq!(seg.number_of_data_points(), 0);
        assert!(seg.data_comments().is_empty());
        seg.clear_meta_data();
        assert_eq!(seg.start_time(), None);
        assert_eq!(seg.epoch_and_data(0), None);
    }
}
