//! Reader of orbit (OEM) and attitude (AEM) ephemeris messages.
//!
//! ```text
//! CCSDS_OEM_VERS = 2.0            version line, first non-blank line
//! COMMENT ...                     header comments, before any other header keyword
//! CREATION_DATE = 2020-01-01T00:00:00
//! ORIGINATOR = ...
//!
//! META_START
//! COMMENT ...                     metadata comments, right after META_START
//! KEY = value
//! META_STOP
//! DATA_START
//! COMMENT ...                     data comments, right after DATA_START
//! <epoch> v1 v2 ... vN
//! DATA_STOP
//! ...                             further META / DATA pairs
//! ```
//!
//! Every META block opens a new [`EphemerisSegment`]. Segments must follow each other in time:
//! a segment may not start before the previous one stops.
use std::fs;

use camino::Utf8Path;
use nalgebra::DVector;
use tracing::{debug, info};

use crate::{
    ccsds::{
        epoch::parse_ccsds_epoch,
        segment::{EphemerisSegment, SegmentKind},
    },
    constants::MJD,
    time_system::converter::TimeConverter,
    timecore_errors::TimeCoreError,
};

const META_START: &str = "META_START";
const META_STOP: &str = "META_STOP";
const DATA_START: &str = "DATA_START";
const DATA_STOP: &str = "DATA_STOP";

/// Message family, named by the version keyword of the first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// `CCSDS_OEM_VERS`
    Orbit,
    /// `CCSDS_AEM_VERS`
    Attitude,
}

impl MessageKind {
    pub fn version_keyword(&self) -> &'static str {
        match self {
            MessageKind::Orbit => "CCSDS_OEM_VERS",
            MessageKind::Attitude => "CCSDS_AEM_VERS",
        }
    }

    fn from_version_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "CCSDS_OEM_VERS" => Some(MessageKind::Orbit),
            "CCSDS_AEM_VERS" => Some(MessageKind::Attitude),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Header,
    Meta,
    Data,
    /// Between a META and a DATA block, or after a DATA block.
    Between { last_was_data: bool },
}

/// Split `KEY = value` into the upper-cased key and the trimmed value.
fn key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_ascii_uppercase(), value.trim().to_string()))
}

/// Text following the `COMMENT` keyword.
fn comment_text(line: &str) -> String {
    line.trim_start()
        .get("COMMENT".len()..)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn first_word(line: &str) -> String {
    line.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// A parsed ephemeris message: header fields and validated segments.
#[derive(Debug, Clone)]
pub struct EphemerisMessageReader {
    kind: MessageKind,
    converter: TimeConverter,
    source: String,
    version: String,
    originator: Option<String>,
    creation_date: Option<String>,
    comments: Vec<String>,
    segments: Vec<EphemerisSegment>,
}

impl EphemerisMessageReader {
    /// Read and validate a message file.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: The message file.
    /// * `converter`: Converter with a leap-second table; message epochs are UTC.
    ///
    /// Return
    /// ----------
    /// * The reader, an I/O error, or the first format / segment error found.
    ///
    /// See also
    /// ------------
    /// * [`EphemerisMessageReader::from_str_content`] – Same, from text in memory.
    pub fn from_file(path: &Utf8Path, converter: TimeConverter) -> Result<Self, TimeCoreError> {
        let content = fs::read_to_string(path)?;
        let reader = Self::from_str_content(&content, path.as_str(), converter)?;
        info!(
            path = %path,
            kind = ?reader.kind,
            segments = reader.segments.len(),
            "loaded ephemeris message"
        );
        Ok(reader)
    }

    /// Parse and validate a message held in memory.
    ///
    /// Arguments
    /// -----------------
    /// * `content`: Message text.
    /// * `source`: Name used in error messages (usually the file path).
    /// * `converter`: Converter with a leap-second table.
    pub fn from_str_content(
        content: &str,
        source: &str,
        converter: TimeConverter,
    ) -> Result<Self, TimeCoreError> {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let format_error = |message: String| TimeCoreError::EphemerisMessageFormat {
            file: source.to_string(),
            message,
        };

        let (_, version_line) = lines
            .next()
            .ok_or_else(|| format_error("file appears to be empty".into()))?;
        let (keyword, version) = key_value(version_line).ok_or_else(|| {
            format_error("version keyword must appear in the first non-blank line".into())
        })?;
        let kind = MessageKind::from_version_keyword(&keyword).ok_or_else(|| {
            format_error(format!("unknown version keyword \"{keyword}\""))
        })?;
        match version.parse::<f64>() {
            Ok(v) if v == 1.0 || v == 2.0 => {}
            _ => return Err(format_error(format!("version number \"{version}\" is not valid"))),
        }

        let mut reader = EphemerisMessageReader {
            kind,
            converter,
            source: source.to_string(),
            version,
            originator: None,
            creation_date: None,
            comments: Vec::new(),
            segments: Vec::new(),
        };

        let mut block = Block::Header;
        let mut non_comment_found = false;
        let mut meta: Vec<(String, String)> = Vec::new();
        let mut meta_comments: Vec<String> = Vec::new();

        for (index, line) in lines {
            let line_number = index + 1;
            let word = first_word(line);

            match block {
                Block::Header => match word.as_str() {
                    META_START => {
                        block = Block::Meta;
                        non_comment_found = false;
                    }
                    "COMMENT" => {
                        if non_comment_found {
                            return Err(format_error(format!(
                                "line {line_number}: header comment lines must appear directly after the version number"
                            )));
                        }
                        reader.comments.push(comment_text(line));
                    }
                    _ => {
                        let (key, value) = key_value(line).ok_or_else(|| {
                            format_error(format!("line {line_number}: equal sign missing or incorrect"))
                        })?;
                        match key.as_str() {
                            "CREATION_DATE" => {
                                parse_ccsds_epoch(&value, &reader.converter).map_err(|err| {
                                    match err {
                                        TimeCoreError::InvalidCcsdsEpoch(_) => format_error(
                                            format!("line {line_number}: CREATION_DATE is invalid"),
                                        ),
                                        other => other,
                                    }
                                })?;
                                reader.creation_date = Some(value);
                            }
                            "ORIGINATOR" => reader.originator = Some(value),
                            other => {
                                return Err(format_error(format!(
                                    "line {line_number}: field {other} is not allowed in the header"
                                )))
                            }
                        }
                        non_comment_found = true;
                    }
                },

                Block::Meta => match word.as_str() {
                    META_STOP => {
                        let segment =
                            reader.open_segment(std::mem::take(&mut meta), std::mem::take(&mut meta_comments))?;
                        reader.segments.push(segment);
                        block = Block::Between {
                            last_was_data: false,
                        };
                        non_comment_found = false;
                    }
                    DATA_START | DATA_STOP | META_START => {
                        return Err(format_error(format!("line {line_number}: missing META_STOP")));
                    }
                    "COMMENT" => {
                        if non_comment_found {
                            return Err(format_error(format!(
                                "line {line_number}: metadata comment lines must appear directly after META_START"
                            )));
                        }
                        meta_comments.push(comment_text(line));
                    }
                    _ => {
                        let pair = key_value(line).ok_or_else(|| {
                            format_error(format!("line {line_number}: equal sign missing or incorrect"))
                        })?;
                        meta.push(pair);
                        non_comment_found = true;
                    }
                },

                Block::Data => match word.as_str() {
                    DATA_STOP => {
                        block = Block::Between {
                            last_was_data: true,
                        };
                        non_comment_found = false;
                    }
                    DATA_START | META_START | META_STOP => {
                        return Err(format_error(format!("line {line_number}: missing DATA_STOP")));
                    }
                    "COMMENT" => {
                        if non_comment_found {
                            return Err(format_error(format!(
                                "line {line_number}: data comment lines must appear directly after DATA_START"
                            )));
                        }
                        if let Some(segment) = reader.segments.last_mut() {
                            segment.add_data_comment(&comment_text(line));
                        }
                    }
                    _ => {
                        non_comment_found = true;
                        reader.add_data_line(line, line_number)?;
                    }
                },

                Block::Between { last_was_data } => match word.as_str() {
                    META_START => {
                        if !last_was_data {
                            return Err(format_error(format!(
                                "line {line_number}: expecting DATA_START"
                            )));
                        }
                        block = Block::Meta;
                    }
                    DATA_START => {
                        if last_was_data {
                            return Err(format_error(format!(
                                "line {line_number}: expecting META_START or end-of-file"
                            )));
                        }
                        block = Block::Data;
                    }
                    _ => {
                        return Err(format_error(format!(
                            "line {line_number}: unexpected line found outside of META or DATA block: \"{}\"",
                            line.trim()
                        )))
                    }
                },
            }
        }

        match block {
            Block::Header => return Err(format_error("\"META_START\" not found".into())),
            Block::Meta => return Err(format_error("META_STOP is missing from the file".into())),
            Block::Data => return Err(format_error("DATA_STOP is missing from the file".into())),
            Block::Between {
                last_was_data: false,
            } => {
                return Err(format_error(
                    "metadata read but the file is missing the corresponding data".into(),
                ))
            }
            Block::Between { last_was_data: true } => {}
        }

        reader.check_segments()?;
        Ok(reader)
    }

    /// Build a segment from the keywords of one META block.
    fn open_segment(
        &self,
        meta: Vec<(String, String)>,
        comments: Vec<String>,
    ) -> Result<EphemerisSegment, TimeCoreError> {
        let number = self.segments.len() + 1;
        let kind = match self.kind {
            MessageKind::Orbit => SegmentKind::Orbit,
            MessageKind::Attitude => {
                let value = meta
                    .iter()
                    .find(|(key, _)| key == "ATTITUDE_TYPE")
                    .map(|(_, value)| value.as_str())
                    .ok_or_else(|| TimeCoreError::EphemerisMessageFormat {
                        file: self.source.clone(),
                        message: format!(
                            "metadata of segment {number} must contain a value for field \"ATTITUDE_TYPE\""
                        ),
                    })?;
                SegmentKind::from_attitude_type(value).ok_or_else(|| {
                    TimeCoreError::SegmentConfiguration {
                        segment: number,
                        message: format!("ATTITUDE_TYPE \"{value}\" is not supported"),
                    }
                })?
            }
        };

        let mut segment = EphemerisSegment::new(number, kind);
        for comment in &comments {
            segment.add_meta_comment(comment);
        }
        for (key, value) in &meta {
            if !segment.set_meta_data(key, value, &self.converter)? {
                return Err(TimeCoreError::EphemerisMessageFormat {
                    file: self.source.clone(),
                    message: format!("invalid keyword = value pair ({key}, {value})"),
                });
            }
        }
        segment.validate(false)?;
        debug!(segment = number, kind = %kind, "opened ephemeris segment");
        Ok(segment)
    }

    fn add_data_line(&mut self, line: &str, line_number: usize) -> Result<(), TimeCoreError> {
        let mut fields = line.split_whitespace();
        let epoch_text = fields.next().unwrap_or_default();
        let epoch = parse_ccsds_epoch(epoch_text, &self.converter)?;

        let segment = self
            .segments
            .last_mut()
            .ok_or_else(|| TimeCoreError::EphemerisMessageFormat {
                file: self.source.clone(),
                message: format!("line {line_number}: data found before any metadata"),
            })?;

        let size = segment.data_size();
        let values = fields
            .take(size)
            .map(str::parse::<f64>)
            .collect::<Result<Vec<f64>, _>>()
            .ok()
            .filter(|values| values.len() == size)
            .ok_or_else(|| TimeCoreError::EphemerisMessageFormat {
                file: self.source.clone(),
                message: format!("line {line_number}: missing or invalid data, expected {size} values"),
            })?;

        segment.add_data(epoch, DVector::from_vec(values), false)
    }

    /// Validate every segment with its data and check their ordering.
    fn check_segments(&mut self) -> Result<(), TimeCoreError> {
        if self.segments.is_empty() {
            return Err(TimeCoreError::EphemerisMessageFormat {
                file: self.source.clone(),
                message: "no segments found".into(),
            });
        }
        for segment in self.segments.iter_mut() {
            segment.validate(true)?;
        }
        for pair in self.segments.windows(2) {
            if let (Some(stop), Some(start)) = (pair[0].stop_time(), pair[1].start_time()) {
                if start < stop {
                    return Err(TimeCoreError::EphemerisMessageFormat {
                        file: self.source.clone(),
                        message: format!(
                            "segment {} starts before segment {} stops",
                            pair[1].number(),
                            pair[0].number()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn originator(&self) -> Option<&str> {
        self.originator.as_deref()
    }

    pub fn creation_date(&self) -> Option<&str> {
        self.creation_date.as_deref()
    }

    /// Header comments.
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    pub fn segments(&self) -> &[EphemerisSegment] {
        &self.segments
    }

    pub fn number_of_segments(&self) -> usize {
        self.segments.len()
    }

    /// Zero-based index of the first segment covering `epoch`.
    pub fn segment_number_for_epoch(&self, epoch: MJD) -> Option<usize> {
        self.segments.iter().position(|s| s.covers_epoch(epoch))
    }

    /// First segment covering `epoch` (A1 modified julian date).
    pub fn segment_for_epoch(&self, epoch: MJD) -> Option<&EphemerisSegment> {
        self.segments.iter().find(|s| s.covers_epoch(epoch))
    }

    /// State at `epoch` from the covering segment.
    ///
    /// Return
    /// ----------
    /// * The values of the covering segment at `epoch`, or a
    ///   [`TimeCoreError::SegmentRange`] (segment 0) when no segment covers it.
    pub fn determine_state(&mut self, epoch: MJD) -> Result<DVector<f64>, TimeCoreError> {
        let index = self
            .segment_number_for_epoch(epoch)
            .ok_or_else(|| TimeCoreError::SegmentRange {
                segment: 0,
                message: format!("no segment of {} covers epoch {epoch:.16}", self.source),
            })?;
        self.segments[index].determine_state(epoch)
    }
}

#[cfg(test)]
mod test_reader {
    use std::sync::Arc;

    use super::*;
    use crate::{time_system::leap_seconds::LeapSecondTable, timecore_errors::ErrorKind};
    use approx::assert_abs_diff_eq;

    fn converter() -> TimeConverter {
        let leap = LeapSecondTable::from_str_content(
            " 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S\n",
        )
        .unwrap();
        TimeConverter::with_leap_seconds_only(Arc::new(leap))
    }

    const OEM: &str = "CCSDS_OEM_VERS = 2.0
COMMENT generated for tests
CREATION_DATE = 2020-01-01T00:00:00
ORIGINATOR = TEST

META_START
COMMENT first arc
OBJECT_NAME = SAT
OBJECT_ID = 2020-001A
CENTER_NAME = EARTH
REF_FRAME = EME2000
TIME_SYSTEM = UTC
START_TIME = 2020-01-01T00:00:00
STOP_TIME = 2020-01-01T00:03:00
INTERPOLATION = LAGRANGE
INTERPOLATION_DEGREE = 1
META_STOP
DATA_START
COMMENT states in km
2020-01-01T00:00:00 7000 0 0 0 7.5 0
2020-01-01T00:01:00 7000 450 0 0 7.5 0
2020-01-01T00:02:00 7000 900 0 0 7.5 0
2020-01-01T00:03:00 7000 1350 0 0 7.5 0
DATA_STOP

META_START
OBJECT_NAME = SAT
OBJECT_ID = 2020-001A
CENTER_NAME = EARTH
REF_FRAME = EME2000
TIME_SYSTEM = UTC
START_TIME = 2020-001T00:03:00
STOP_TIME = 2020-001T00:05:00
INTERPOLATION_DEGREE = 0
META_STOP
DATA_START
2020-001T00:03:00 1 2 3 4 5 6
2020-001T00:04:00 2 3 4 5 6 7
2020-001T00:05:00 3 4 5 6 7 8
DATA_STOP
";

    fn replace(text: &str, from: &str, to: &str) -> String {
        text.replacen(from, to, 1)
    }

    #[test]
    fn test_read_oem() {
        let mut reader = EphemerisMessageReader::from_str_content(OEM, "test.oem", converter()).unwrap();
        assert_eq!(reader.kind(), MessageKind::Orbit);
        assert_eq!(reader.version(), "2.0");
        assert_eq!(reader.originator(), Some("TEST"));
        assert_eq!(reader.comments(), ["generated for tests".to_string()]);
        assert_eq!(reader.number_of_segments(), 2);

        let first = &reader.segments()[0];
        assert_eq!(first.meta_comments(), ["first arc".to_string()]);
        assert_eq!(first.data_comments(), ["states in km".to_string()]);
        assert_eq!(first.number_of_data_points(), 4);
        assert_eq!(first.object_id.as_deref(), Some("2020-001A"));

        let t0 = parse_ccsds_epoch("2020-01-01T00:00:30", &converter()).unwrap();
        assert_eq!(reader.segment_number_for_epoch(t0), Some(0));
        let state = reader.determine_state(t0).unwrap();
        assert_abs_diff_eq!(state[1], 225.0, epsilon = 1e-5);

        let t1 = parse_ccsds_epoch("2020-01-01T00:04:30", &converter()).unwrap();
        assert_eq!(reader.segment_number_for_epoch(t1), Some(1));
        assert_eq!(reader.determine_state(t1).unwrap()[0], 2.0);

        let late = parse_ccsds_epoch("2020-01-01T01:00:00", &converter()).unwrap();
        assert!(reader.segment_for_epoch(late).is_none());
        assert_eq!(reader.determine_state(late).unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn test_read_aem() {
        let aem = "CCSDS_AEM_VERS = 1.0
CREATION_DATE = 2020-001T00:00:00
ORIGINATOR = TEST
META_START
OBJECT_NAME = SAT
OBJECT_ID = 2020-001A
CENTER_NAME = EARTH
REF_FRAME_A = EME2000
REF_FRAME_B = SC_BODY_1
ATTITUDE_DIR = A2B
TIME_SYSTEM = UTC
START_TIME = 2020-01-01T00:00:00
STOP_TIME = 2020-01-01T00:02:00
ATTITUDE_TYPE = QUATERNION
QUATERNION_TYPE = LAST
INTERPOLATION_METHOD = SLERP
META_STOP
DATA_START
2020-01-01T00:00:00 0 0 0 1
2020-01-01T00:02:00 0 0 0.7071067811865476 0.7071067811865476
DATA_STOP
";
        let mut reader = EphemerisMessageReader::from_str_content(aem, "test.aem", converter()).unwrap();
        assert_eq!(reader.kind(), MessageKind::Attitude);
        let segment = &reader.segments()[0];
        assert_eq!(segment.kind(), SegmentKind::Quaternion);
        assert_eq!(segment.attitude_field("REF_FRAME_B"), Some("SC_BODY_1"));

        let mid = parse_ccsds_epoch("2020-01-01T00:01:00", &converter()).unwrap();
        let q = reader.determine_state(mid).unwrap();
        assert_abs_diff_eq!(q[2], (std::f64::consts::PI / 8.0).sin(), epsilon = 1e-6);
    }

    #[test]
    fn test_structure_errors() {
        let conv = converter;
        let cases = [
            replace(OEM, "CCSDS_OEM_VERS = 2.0", "CCSDS_XEM_VERS = 2.0"),
            replace(OEM, "CCSDS_OEM_VERS = 2.0", "CCSDS_OEM_VERS = two"),
            replace(OEM, "ORIGINATOR = TEST", "ORIGINATOR = TEST\nCOMMENT late"),
            replace(OEM, "ORIGINATOR = TEST", "MESSAGE_ID = 12"),
            replace(OEM, "INTERPOLATION_DEGREE = 1\nMETA_STOP", "INTERPOLATION_DEGREE = 1"),
            replace(OEM, "2020-01-01T00:03:00 7000 1350 0 0 7.5 0\nDATA_STOP", "2020-01-01T00:03:00 7000 1350 0 0 7.5 0"),
            replace(OEM, "META_STOP\nDATA_START\nCOMMENT states", "META_STOP\nstray line\nDATA_START\nCOMMENT states"),
            replace(OEM, "2020-01-01T00:01:00 7000 450 0 0 7.5 0", "2020-01-01T00:01:00 7000 450 0"),
            replace(OEM, "OBJECT_NAME = SAT", "OBJECT_NAME SAT"),
            replace(OEM, "OBJECT_NAME = SAT", "MASS = 12"),
            "CCSDS_OEM_VERS = 2.0\n".to_string(),
            String::new(),
        ];
        for (i, text) in cases.iter().enumerate() {
            let err = EphemerisMessageReader::from_str_content(text, "bad.oem", conv()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "case {i}: {err}");
        }
    }

    #[test]
    fn test_segment_errors_propagate() {
        // backward epoch
        let text = replace(
            OEM,
            "2020-01-01T00:02:00 7000 900 0 0 7.5 0",
            "2020-01-01T00:00:30 7000 900 0 0 7.5 0",
        );
        let err = EphemerisMessageReader::from_str_content(&text, "bad.oem", converter()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequencing);

        // overlapping segments
        let text = replace(OEM, "START_TIME = 2020-001T00:03:00", "START_TIME = 2020-001T00:02:00");
        let text = replace(&text, "2020-001T00:03:00 1 2 3 4 5 6", "2020-001T00:02:30 1 2 3 4 5 6");
        let err = EphemerisMessageReader::from_str_content(&text, "bad.oem", converter()).unwrap_err();
        assert!(err.to_string().contains("starts before"), "{err}");

        // unsupported time system
        let text = replace(OEM, "TIME_SYSTEM = UTC", "TIME_SYSTEM = TDB");
        let err = EphemerisMessageReader::from_str_content(&text, "bad.oem", converter()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
