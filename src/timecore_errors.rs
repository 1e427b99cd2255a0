use thiserror::Error;

/// Coarse classification of every [`TimeCoreError`].
///
/// Batch callers (for example a driver reading many ephemeris files) use this to decide
/// whether a failure is local to one item or affects the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed file line, truncated binary record, unknown indicator value.
    Format,
    /// Epoch outside a table, segment, usable span or the supported calendar.
    Range,
    /// Non-increasing epochs, too few points, single-point usable range.
    Sequencing,
    /// Missing dependency or unsupported setting.
    Configuration,
    /// Raw file-system failure.
    Io,
}

#[derive(Error, Debug)]
pub enum TimeCoreError {
    #[error("Invalid leap second line {line}: {content}")]
    InvalidLeapSecondLine { line: usize, content: String },

    #[error("Invalid EOP line {line}: {content}")]
    InvalidEopLine { line: usize, content: String },

    #[error("EOP file contains no data rows: {0}")]
    EmptyEopFile(String),

    #[error("Unknown time system: {0}")]
    UnknownTimeSystem(String),

    #[error("Invalid time type: {0}")]
    InvalidTimeType(String),

    #[error("Invalid Gregorian date: {0}")]
    InvalidGregorian(String),

    #[error("Gregorian date {value} is outside the supported span [{min}, {max}]")]
    GregorianOutOfRange {
        value: String,
        min: String,
        max: String,
    },

    #[error("Modified Julian date {value} is outside the supported span [{min}, {max}]")]
    MjdOutOfRange { value: f64, min: f64, max: f64 },

    #[error("Invalid CCSDS epoch: {0}")]
    InvalidCcsdsEpoch(String),

    #[error("Leap second table not set; required for {0} conversion")]
    MissingLeapSecondTable(String),

    #[error("Earth orientation table not set; required for {0} conversion")]
    MissingEopTable(String),

    #[error("Table entries must be strictly increasing: {0}")]
    NonIncreasingTable(String),

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),

    #[error("Truncated Code500 record {record}: expected {expected} bytes, got {actual}")]
    TruncatedRecord {
        record: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown Code500 coordinate system indicator: {0}")]
    UnknownCoordSystemIndicator(i32),

    #[error("Unknown Code500 time system indicator: {0}")]
    UnknownTimeSystemIndicator(f64),

    #[error("Invalid Code500 DUT reference date (YYMMDD): {0}")]
    InvalidDutReference(f64),

    #[error("Unsupported Code500 time system: {0} (A1 or UTC only)")]
    UnsupportedCode500TimeSystem(String),

    #[error("Code500 file is not open for {0}")]
    Code500NotOpen(&'static str),

    #[error("Code500 file contains no data records")]
    Code500NoData,

    #[error("Code500 epochs must be increasing: {previous} then {current}")]
    Code500BackwardEpoch { previous: f64, current: f64 },

    #[error("Segment {segment}: {message}")]
    SegmentFormat { segment: usize, message: String },

    #[error("Segment {segment}: {message}")]
    SegmentRange { segment: usize, message: String },

    #[error("Segment {segment}: {message}")]
    SegmentSequencing { segment: usize, message: String },

    #[error("Segment {segment}: {message}")]
    SegmentConfiguration { segment: usize, message: String },

    #[error("Ephemeris message {file}: {message}")]
    EphemerisMessageFormat { file: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Unable to parse configuration file: {0}")]
    ConfigParseError(#[from] serde_json::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl TimeCoreError {
    /// Classify the error according to the taxonomy of [`ErrorKind`].
    ///
    /// Return
    /// ----------
    /// * The [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        use TimeCoreError::*;
        match self {
            InvalidLeapSecondLine { .. }
            | InvalidEopLine { .. }
            | EmptyEopFile(_)
            | UnknownTimeSystem(_)
            | InvalidTimeType(_)
            | InvalidGregorian(_)
            | InvalidCcsdsEpoch(_)
            | NomParsingError(_)
            | TruncatedRecord { .. }
            | UnknownCoordSystemIndicator(_)
            | UnknownTimeSystemIndicator(_)
            | InvalidDutReference(_)
            | SegmentFormat { .. }
            | EphemerisMessageFormat { .. }
            | ConfigParseError(_) => ErrorKind::Format,

            GregorianOutOfRange { .. } | MjdOutOfRange { .. } | SegmentRange { .. } => {
                ErrorKind::Range
            }

            NonIncreasingTable(_)
            | Code500BackwardEpoch { .. }
            | Code500NoData
            | SegmentSequencing { .. } => ErrorKind::Sequencing,

            MissingLeapSecondTable(_)
            | MissingEopTable(_)
            | UnsupportedCode500TimeSystem(_)
            | Code500NotOpen(_)
            | SegmentConfiguration { .. }
            | InvalidConfiguration(_) => ErrorKind::Configuration,

            IoError(_) => ErrorKind::Io,
        }
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for TimeCoreError {
    fn from(err: nom::Err<E>) -> Self {
        TimeCoreError::NomParsingError(format!("{err:?}"))
    }
}

impl PartialEq for TimeCoreError {
    fn eq(&self, other: &Self) -> bool {
        use TimeCoreError::*;
        match (self, other) {
            (
                InvalidLeapSecondLine { line: a, content: b },
                InvalidLeapSecondLine { line: c, content: d },
            ) => a == c && b == d,
            (InvalidEopLine { line: a, content: b }, InvalidEopLine { line: c, content: d }) => {
                a == c && b == d
            }
            (EmptyEopFile(a), EmptyEopFile(b)) => a == b,
            (UnknownTimeSystem(a), UnknownTimeSystem(b)) => a == b,
            (InvalidTimeType(a), InvalidTimeType(b)) => a == b,
            (InvalidGregorian(a), InvalidGregorian(b)) => a == b,
            (
                GregorianOutOfRange { value: a, .. },
                GregorianOutOfRange { value: b, .. },
            ) => a == b,
            (MjdOutOfRange { value: a, .. }, MjdOutOfRange { value: b, .. }) => a == b,
            (InvalidCcsdsEpoch(a), InvalidCcsdsEpoch(b)) => a == b,
            (MissingLeapSecondTable(a), MissingLeapSecondTable(b)) => a == b,
            (MissingEopTable(a), MissingEopTable(b)) => a == b,
            (NonIncreasingTable(a), NonIncreasingTable(b)) => a == b,
            (NomParsingError(a), NomParsingError(b)) => a == b,
            (
                TruncatedRecord { record: a, actual: b, .. },
                TruncatedRecord { record: c, actual: d, .. },
            ) => a == c && b == d,
            (UnknownCoordSystemIndicator(a), UnknownCoordSystemIndicator(b)) => a == b,
            (UnknownTimeSystemIndicator(a), UnknownTimeSystemIndicator(b)) => a == b,
            (InvalidDutReference(a), InvalidDutReference(b)) => a == b,
            (UnsupportedCode500TimeSystem(a), UnsupportedCode500TimeSystem(b)) => a == b,
            (Code500NotOpen(a), Code500NotOpen(b)) => a == b,
            (
                Code500BackwardEpoch { previous: a, current: b },
                Code500BackwardEpoch { previous: c, current: d },
            ) => a == c && b == d,
            (
                SegmentFormat { segment: a, message: b },
                SegmentFormat { segment: c, message: d },
            )
            | (
                SegmentRange { segment: a, message: b },
                SegmentRange { segment: c, message: d },
            )
            | (
                SegmentSequencing { segment: a, message: b },
                SegmentSequencing { segment: c, message: d },
            )
            | (
                SegmentConfiguration { segment: a, message: b },
                SegmentConfiguration { segment: c, message: d },
            ) => a == c && b == d,
            (
                EphemerisMessageFormat { file: a, message: b },
                EphemerisMessageFormat { file: c, message: d },
            ) => a == c && b == d,
            (InvalidConfiguration(a), InvalidConfiguration(b)) => a == b,

            // Wrapped foreign errors: same variant is enough
            (ConfigParseError(_), ConfigParseError(_)) => true,
            (IoError(_), IoError(_)) => true,

            (Code500NoData, Code500NoData) => true,

            _ => false,
        }
    }
}
