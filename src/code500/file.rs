//! Read and write sessions over a Code500 file.
//!
//! A [`Code500EphemerisFile`] owns at most one open file handle and moves through
//!
//! ```text
//! Closed ─► OpenForRead ─► HeaderRead ──────────► DataStreaming ─► Closed
//! Closed ─► OpenForWrite ─► HeaderWritten (1st record) ─► DataStreaming ─► Closed
//! ```
//!
//! Epochs exchanged with callers are A1 modified julian dates (standard origin) and states are
//! Cartesian, in km and km/s. A file written in UTC stores UTC epochs on disk; the conversion
//! uses the [`TimeConverter`] given at construction.
//!
//! Writing buffers incoming states and emits one data record per 50 states. The final record
//! is completed on `can_finalize` (or [`Code500EphemerisFile::finalize_headers`]): a partial
//! record is sentinel filled, and when the last record is full an extra end-of-data record
//! follows it. Header 1 is written with the first data record and rewritten when finalizing,
//! once the end time is known.
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write},
};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    code500::{
        byte_order::FileByteOrder,
        data_record::{Code500DataRecord, FREE_FLIGHT, NUM_STATES_PER_RECORD},
        header::{
            CentralBody, Code500Header1, Code500Header2, CoordSystemIndicator,
            A1_TIME_SYSTEM_INDICATOR, OFF_TIME_SYSTEM, REF_TIME_FOR_DUT_YYMMDD,
            UTC_TIME_SYSTEM_INDICATOR,
        },
        units::{a1_mjd_to_dut, state_to_internal, SEC_TO_DUT},
        RECORD_SIZE,
    },
    constants::{JD_NOV_17_1858, MJD, RADEG, SECS_PER_DAY},
    time_system::{
        converter::TimeConverter,
        gregorian::{
            day_of_year, mjd_from_day_and_seconds, mjd_to_calendar, seconds_of_day,
            to_packed_hhmmss, to_packed_yyymmdd, unpack_yyymmdd,
        },
        TimeSystem,
    },
    timecore_errors::{ErrorKind, TimeCoreError},
};

/// Position of a Code500 session in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    OpenForRead,
    HeaderRead,
    OpenForWrite,
    HeaderWritten,
    DataStreaming,
}

/// What a multi-record read does with a data record that cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadRecordPolicy {
    /// Fail the whole read and keep no record.
    #[default]
    Abort,
    /// Log the record with `warn!` and carry on with the next one.
    Skip,
}

fn default_dut_reference() -> f64 {
    REF_TIME_FOR_DUT_YYMMDD
}

/// Identification and layout choices of a file being written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code500WriteOptions {
    pub sat_id: f64,
    pub product_id: String,
    /// A1 or UTC.
    pub time_system: TimeSystem,
    pub tape_id: String,
    pub source_id: String,
    pub header_title: String,
    pub central_body: CentralBody,
    pub coord_system: CoordSystemIndicator,
    pub byte_order: FileByteOrder,
    /// Fixed step between points in seconds; `None` for a variable step.
    ///
    /// With a variable step each data record stores its first epoch and the spacing of its
    /// first two points only. Readers rebuild slot `k` as first epoch + `k` × spacing, so points
    /// unevenly spaced inside one record do not keep their exact epochs.
    pub step_size_secs: Option<f64>,
    /// Reference date of DUT times, packed `YYMMDD` (`570918` is 18 Sep 1957).
    #[serde(default = "default_dut_reference")]
    pub dut_reference_yymmdd: f64,
}

impl Default for Code500WriteOptions {
    fn default() -> Self {
        Code500WriteOptions {
            sat_id: 0.0,
            product_id: "STATE".into(),
            time_system: TimeSystem::A1,
            tape_id: "GMAT".into(),
            source_id: "GMAT".into(),
            header_title: String::new(),
            central_body: CentralBody::Earth,
            coord_system: CoordSystemIndicator::J2000,
            byte_order: FileByteOrder::native(),
            step_size_secs: None,
            dut_reference_yymmdd: REF_TIME_FOR_DUT_YYMMDD,
        }
    }
}

/// First and last points of a file, with the frame information needed to combine them with
/// other sources.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialAndFinalStates {
    /// A1 modified julian date of the first point.
    pub initial_epoch: MJD,
    /// km and km/s.
    pub initial_state: [f64; 6],
    pub final_epoch: MJD,
    pub final_state: [f64; 6],
    pub central_body: Option<CentralBody>,
    pub coord_system: CoordSystemIndicator,
}

#[derive(Debug)]
pub struct Code500EphemerisFile {
    state: SessionState,
    options: Code500WriteOptions,
    converter: TimeConverter,
    byte_order: FileByteOrder,
    ref_a1_mjd: MJD,
    header1: Code500Header1,
    header2: Code500Header2,
    data_records: Vec<Code500DataRecord>,
    input: Option<BufReader<File>>,
    output: Option<BufWriter<File>>,
    /// Number of the last record written (headers are records 1 and 2).
    write_counter: usize,
    pending: Vec<(MJD, [f64; 6])>,
    last_epoch: Option<MJD>,
    last_record_full: bool,
    finalized: bool,
}

/// Default reference epoch of DUT times, 18 Sep 1957 00:00, as a standard modified julian date.
fn default_dut_reference_mjd() -> MJD {
    let (year, month, day) = unpack_yyymmdd(REF_TIME_FOR_DUT_YYMMDD);
    mjd_from_day_and_seconds(year, month, day, 0.0)
}

/// Fill `buf` from the reader. Returns the number of bytes read, short only at end of file.
fn read_record<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, TimeCoreError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

impl Code500EphemerisFile {
    /// A session for reading existing files.
    ///
    /// Arguments
    /// -----------------
    /// * `converter`: Used to bring UTC files back to A1. A converter without tables is enough
    ///   for A1 files.
    pub fn new(converter: TimeConverter) -> Self {
        Code500EphemerisFile {
            state: SessionState::Closed,
            options: Code500WriteOptions::default(),
            converter,
            byte_order: FileByteOrder::native(),
            ref_a1_mjd: default_dut_reference_mjd(),
            header1: Code500Header1::default(),
            header2: Code500Header2::default(),
            data_records: Vec::new(),
            input: None,
            output: None,
            write_counter: 2,
            pending: Vec::new(),
            last_epoch: None,
            last_record_full: false,
            finalized: false,
        }
    }

    /// A session for writing a new file.
    ///
    /// Arguments
    /// -----------------
    /// * `options`: Identification fields, time system, byte order and step.
    /// * `converter`: Must hold a leap-second table when `options.time_system` is UTC.
    ///
    /// Return
    /// ----------
    /// * The session, [`TimeCoreError::UnsupportedCode500TimeSystem`] for a time system other
    ///   than A1 or UTC, or [`TimeCoreError::InvalidDutReference`] for a reference that is not a
    ///   calendar date.
    pub fn with_options(
        options: Code500WriteOptions,
        converter: TimeConverter,
    ) -> Result<Self, TimeCoreError> {
        let indicator = match options.time_system {
            TimeSystem::A1 => A1_TIME_SYSTEM_INDICATOR,
            TimeSystem::UTC => UTC_TIME_SYSTEM_INDICATOR,
            other => return Err(TimeCoreError::UnsupportedCode500TimeSystem(other.to_string())),
        };

        let (step, output_interval_indicator) = match options.step_size_secs {
            Some(step) => (step, 1),
            None => (0.0, 2),
        };

        let header1 = Code500Header1 {
            product_id: options.product_id.clone(),
            sat_id: options.sat_id,
            time_system_indicator: indicator,
            step_size_secs: step,
            tape_id: options.tape_id.clone(),
            source_id: options.source_id.clone(),
            header_title: options.header_title.clone(),
            central_body_indicator: options.central_body.indicator(),
            coord_system_label: match options.coord_system {
                CoordSystemIndicator::J2000 => "2000".into(),
                CoordSystemIndicator::MeanOf1950 => "1950".into(),
                _ => String::new(),
            },
            coord_system_indicator: options.coord_system.code(),
            interval_dut: step * SEC_TO_DUT,
            output_interval_indicator,
            ref_time_for_dut_yymmdd: options.dut_reference_yymmdd,
            ..Default::default()
        };

        let mut session = Self::new(converter);
        session.ref_a1_mjd = header1.dut_reference_mjd()?;
        session.byte_order = options.byte_order;
        session.options = options;
        session.header1 = header1;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn byte_order(&self) -> FileByteOrder {
        self.byte_order
    }

    pub fn header1(&self) -> &Code500Header1 {
        &self.header1
    }

    pub fn header2(&self) -> &Code500Header2 {
        &self.header2
    }

    pub fn data_records(&self) -> &[Code500DataRecord] {
        &self.data_records
    }

    /// A1 modified julian date of the DUT reference epoch.
    pub fn dut_reference_a1_mjd(&self) -> MJD {
        self.ref_a1_mjd
    }

    fn file_time_system(&self) -> TimeSystem {
        if self.header1.time_system_indicator == UTC_TIME_SYSTEM_INDICATOR {
            TimeSystem::UTC
        } else {
            TimeSystem::A1
        }
    }

    /// A1 epoch → epoch stored on disk.
    fn to_file_epoch(&self, a1_mjd: MJD) -> Result<MJD, TimeCoreError> {
        self.converter
            .convert(a1_mjd, TimeSystem::A1, self.file_time_system(), JD_NOV_17_1858)
    }

    /// Epoch stored on disk → A1 epoch.
    fn from_file_epoch(&self, file_mjd: MJD) -> Result<MJD, TimeCoreError> {
        self.converter
            .convert(file_mjd, self.file_time_system(), TimeSystem::A1, JD_NOV_17_1858)
    }

    // ---------------------------------------------------------------------------------------------
    // Reading
    // ---------------------------------------------------------------------------------------------

    /// Open a file and read both headers.
    ///
    /// The byte order is detected from the time system indicator of header 1.
    ///
    /// Arguments
    /// -----------------
    /// * `path`: The Code500 file.
    ///
    /// Return
    /// ----------
    /// * `Ok(())` with the session in [`SessionState::HeaderRead`], an I/O error, a
    ///   [`TimeCoreError::TruncatedRecord`] for a file shorter than two records,
    ///   [`TimeCoreError::UnknownTimeSystemIndicator`], or
    ///   [`TimeCoreError::InvalidDutReference`].
    pub fn open_for_read(&mut self, path: &Utf8Path) -> Result<(), TimeCoreError> {
        let mut reader = BufReader::new(File::open(path)?);
        self.state = SessionState::OpenForRead;
        self.data_records.clear();

        let mut buf = vec![0u8; RECORD_SIZE];
        let n = read_record(&mut reader, &mut buf)?;
        if n < RECORD_SIZE {
            return Err(TimeCoreError::TruncatedRecord {
                record: 1,
                expected: RECORD_SIZE,
                actual: n,
            });
        }
        self.byte_order = FileByteOrder::detect(&buf, OFF_TIME_SYSTEM)?;
        self.header1 = Code500Header1::parse(&buf, self.byte_order)?;
        self.ref_a1_mjd = self.header1.dut_reference_mjd()?;

        let n = read_record(&mut reader, &mut buf)?;
        if n < RECORD_SIZE {
            return Err(TimeCoreError::TruncatedRecord {
                record: 2,
                expected: RECORD_SIZE,
                actual: n,
            });
        }
        self.header2 = Code500Header2::parse(&buf)?;

        info!(
            path = %path,
            byte_order = ?self.byte_order,
            swapped = self.byte_order.needs_swap(),
            time_system = %self.file_time_system(),
            "opened Code500 file"
        );

        self.input = Some(reader);
        self.state = SessionState::HeaderRead;
        Ok(())
    }

    /// Read one data record.
    ///
    /// Arguments
    /// -----------------
    /// * `data_record_number`: One-based index among the data records (file record
    ///   `data_record_number + 2`).
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` at end of file or on an end-of-data record, the record otherwise.
    pub fn read_data_at(
        &mut self,
        data_record_number: usize,
    ) -> Result<Option<Code500DataRecord>, TimeCoreError> {
        let order = self.byte_order;
        let reader = self
            .input
            .as_mut()
            .ok_or(TimeCoreError::Code500NotOpen("read"))?;

        let position = ((data_record_number + 1) * RECORD_SIZE) as u64;
        reader.seek(SeekFrom::Start(position))?;

        let mut buf = vec![0u8; RECORD_SIZE];
        let n = read_record(reader, &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        if n < RECORD_SIZE {
            return Err(TimeCoreError::TruncatedRecord {
                record: data_record_number + 2,
                expected: RECORD_SIZE,
                actual: n,
            });
        }
        Code500DataRecord::parse(&buf, order, data_record_number + 2)
    }

    /// Read data records sequentially from the first one, failing on the first bad record.
    ///
    /// See [`Code500EphemerisFile::read_data_records_with`].
    pub fn read_data_records(&mut self, max_records: Option<usize>) -> Result<usize, TimeCoreError> {
        self.read_data_records_with(max_records, BadRecordPolicy::Abort)
    }

    /// Read data records sequentially from the first one.
    ///
    /// Reading stops at end of file, at an end-of-data record, or after `max_records` records.
    ///
    /// Arguments
    /// -----------------
    /// * `max_records`: Upper bound on the records kept, `None` for all of them.
    /// * `policy`: With [`BadRecordPolicy::Skip`], records failing to decode (truncated or
    ///   malformed) are logged and left out. I/O errors always fail the read.
    ///
    /// Return
    /// ----------
    /// * The number of records read and kept in the session. On error no record is kept and the
    ///   session goes back to [`SessionState::HeaderRead`].
    pub fn read_data_records_with(
        &mut self,
        max_records: Option<usize>,
        policy: BadRecordPolicy,
    ) -> Result<usize, TimeCoreError> {
        if self.input.is_none() {
            return Err(TimeCoreError::Code500NotOpen("read"));
        }
        self.data_records.clear();

        let mut skipped = 0;
        let mut number = 1;
        loop {
            if max_records.is_some_and(|max| self.data_records.len() >= max) {
                break;
            }
            match self.read_data_at(number) {
                Ok(Some(record)) => self.data_records.push(record),
                Ok(None) => {
                    debug!(record = number + 2, "end of Code500 data");
                    break;
                }
                Err(err) if policy == BadRecordPolicy::Skip && err.kind() == ErrorKind::Format => {
                    warn!(record = number + 2, error = %err, "skipping unreadable Code500 data record");
                    skipped += 1;
                }
                Err(err) => {
                    self.data_records.clear();
                    self.state = SessionState::HeaderRead;
                    return Err(err);
                }
            }
            number += 1;
        }

        info!(
            records = self.data_records.len(),
            skipped,
            states = self.data_records.iter().map(|r| r.states.len()).sum::<usize>(),
            "read Code500 data records"
        );
        self.state = SessionState::DataStreaming;
        Ok(self.data_records.len())
    }

    /// Every state read so far, as `(A1 epoch, [km, km/s])`.
    ///
    /// Slot epochs are the record's first epoch plus a whole number of its stored intervals.
    pub fn states(&self) -> Result<Vec<(MJD, [f64; 6])>, TimeCoreError> {
        let mut out = Vec::new();
        for record in &self.data_records {
            for (slot, state) in record.states_km().into_iter().enumerate() {
                let epoch = self.from_file_epoch(record.epoch_of(slot, self.ref_a1_mjd))?;
                out.push((epoch, state));
            }
        }
        Ok(out)
    }

    /// First and last points of the file plus its central body and frame.
    ///
    /// Data records are read first if none are loaded yet.
    ///
    /// Return
    /// ----------
    /// * The [`InitialAndFinalStates`], [`TimeCoreError::Code500NoData`] for a file without
    ///   states, or [`TimeCoreError::UnknownCoordSystemIndicator`].
    pub fn get_initial_and_final_states(
        &mut self,
    ) -> Result<InitialAndFinalStates, TimeCoreError> {
        if self.data_records.is_empty() {
            self.read_data_records(None)?;
        }
        let coord_system = self.header1.coord_system()?;

        let first = self
            .data_records
            .iter()
            .find(|r| !r.states.is_empty())
            .ok_or(TimeCoreError::Code500NoData)?;
        let last = self
            .data_records
            .iter()
            .rev()
            .find(|r| !r.states.is_empty())
            .ok_or(TimeCoreError::Code500NoData)?;
        let last_slot = last.states.len() - 1;

        Ok(InitialAndFinalStates {
            initial_epoch: self.from_file_epoch(first.epoch_of(0, self.ref_a1_mjd))?,
            initial_state: first.states_km()[0],
            final_epoch: self.from_file_epoch(last.epoch_of(last_slot, self.ref_a1_mjd))?,
            final_state: last.states_km()[last_slot],
            central_body: self.header1.central_body(),
            coord_system,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // Writing
    // ---------------------------------------------------------------------------------------------

    /// Create (or truncate) the output file.
    pub fn open_for_write(&mut self, path: &Utf8Path) -> Result<(), TimeCoreError> {
        self.output = Some(BufWriter::new(File::create(path)?));
        self.write_counter = 2;
        self.pending.clear();
        self.last_epoch = None;
        self.last_record_full = false;
        self.finalized = false;
        self.state = SessionState::OpenForWrite;
        info!(path = %path, byte_order = ?self.byte_order, "opened Code500 file for writing");
        Ok(())
    }

    /// Store the Keplerian elements at epoch written in header 1.
    ///
    /// Arguments
    /// -----------------
    /// * `elements`: `[sma km, ecc, inc, raan, aop, anomaly]` with angles in degrees.
    pub fn set_initial_keplerian_state(&mut self, elements: [f64; 6]) {
        let mut rad = elements;
        for angle in rad.iter_mut().skip(2) {
            *angle *= RADEG;
        }
        self.header1.keplerian_elements_rad = rad;
    }

    fn write_record_at(&mut self, record_number: usize, bytes: &[u8]) -> Result<(), TimeCoreError> {
        let output = self
            .output
            .as_mut()
            .ok_or(TimeCoreError::Code500NotOpen("write"))?;
        output.seek(SeekFrom::Start(((record_number - 1) * RECORD_SIZE) as u64))?;
        output.write_all(bytes)?;
        Ok(())
    }

    fn set_start_time(&mut self, a1_mjd: MJD, state: &[f64; 6]) -> Result<(), TimeCoreError> {
        let t = self.to_file_epoch(a1_mjd)?;
        let dut = a1_mjd_to_dut(t, self.ref_a1_mjd);
        let date = mjd_to_calendar(t, JD_NOV_17_1858)?;

        let h = &mut self.header1;
        h.start_date_yyymmdd = to_packed_yyymmdd(t)?;
        h.start_day_of_year = day_of_year(t)? as f64;
        h.start_seconds_of_day = seconds_of_day(t)?;
        h.start_time_dut = dut;
        h.date_of_initiation_yyymmdd = h.start_date_yyymmdd;
        h.time_of_initiation_hhmmss = to_packed_hhmmss(t)?;
        h.epoch_time_of_elements_dut = dut;
        h.epoch_fields = [
            (date.year - 1900) as f64,
            date.month as f64,
            date.day as f64,
            date.hour as f64,
            date.minute as f64,
            date.millis as f64,
        ];
        h.cartesian_elements_dult = state_to_internal(state);
        Ok(())
    }

    fn set_end_time(&mut self, a1_mjd: MJD) -> Result<(), TimeCoreError> {
        let t = self.to_file_epoch(a1_mjd)?;
        let h = &mut self.header1;
        h.end_date_yyymmdd = to_packed_yyymmdd(t)?;
        h.end_day_of_year = day_of_year(t)? as f64;
        h.end_seconds_of_day = seconds_of_day(t)?;
        h.end_time_dut = a1_mjd_to_dut(t, self.ref_a1_mjd);
        Ok(())
    }

    /// Write the first `count` pending states as one data record.
    fn flush_record(&mut self, count: usize) -> Result<(), TimeCoreError> {
        let block: Vec<(MJD, [f64; 6])> = self.pending.drain(..count).collect();
        let Some(&(start, first_state)) = block.first() else {
            return Ok(());
        };

        self.write_counter += 1;
        if self.write_counter == 3 {
            self.set_start_time(start, &first_state)?;
            let h1 = self.header1.pack(self.byte_order);
            let h2 = self.header2.pack();
            self.write_record_at(1, &h1)?;
            self.write_record_at(2, &h2)?;
            self.state = SessionState::HeaderWritten;
        }

        let interval_secs = match self.options.step_size_secs {
            Some(step) => step,
            None if block.len() > 1 => (block[1].0 - block[0].0) * SECS_PER_DAY,
            None => 0.0,
        };
        if block.len() > 2 && self.options.step_size_secs.is_none() {
            let uneven = block.windows(2).any(|w| {
                ((w[1].0 - w[0].0) * SECS_PER_DAY - interval_secs).abs() > 1.0e-3
            });
            if uneven {
                warn!(
                    record = self.write_counter,
                    "uneven spacing in a Code500 record; epochs are stored as first point plus a fixed interval"
                );
            }
        }

        let t = self.to_file_epoch(start)?;
        let record = Code500DataRecord {
            date_yyymmdd: to_packed_yyymmdd(t)?,
            day_of_year: day_of_year(t)? as f64,
            seconds_of_day: seconds_of_day(t)?,
            interval_secs,
            states: block.iter().map(|(_, s)| state_to_internal(s)).collect(),
            thrust_indicator: FREE_FLIGHT,
            time_of_first_point_dut: a1_mjd_to_dut(t, self.ref_a1_mjd),
            interval_dut: interval_secs * SEC_TO_DUT,
        };
        let bytes = record.pack(self.byte_order);
        self.write_record_at(self.write_counter, &bytes)?;

        if let Some(&(end, _)) = block.last() {
            self.set_end_time(end)?;
        }
        self.last_record_full = block.len() == NUM_STATES_PER_RECORD;
        self.state = SessionState::DataStreaming;
        debug!(
            record = self.write_counter,
            states = block.len(),
            "wrote Code500 data record"
        );
        Ok(())
    }

    /// Flush every pending state and terminate the data.
    fn finish_data(&mut self) -> Result<(), TimeCoreError> {
        while !self.pending.is_empty() {
            let count = self.pending.len().min(NUM_STATES_PER_RECORD);
            self.flush_record(count)?;
        }
        if self.last_record_full {
            let end = Code500DataRecord::end_of_data(self.byte_order);
            self.write_record_at(self.write_counter + 1, &end)?;
            debug!(record = self.write_counter + 1, "wrote Code500 end-of-data record");
        }
        self.finalized = true;
        Ok(())
    }

    /// Append states to the file.
    ///
    /// Arguments
    /// -----------------
    /// * `epochs`: A1 modified julian dates, strictly increasing across every call.
    /// * `states`: Cartesian states in km and km/s, one per epoch.
    /// * `can_finalize`: `true` for the last segment; the final record is then completed.
    ///
    /// Without a fixed step, points must be evenly spaced within each group of 50 to read back
    /// at their exact epochs; see [`Code500WriteOptions::step_size_secs`].
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, [`TimeCoreError::Code500NotOpen`] outside a write session,
    ///   [`TimeCoreError::InvalidConfiguration`] when the slices differ in length, or
    ///   [`TimeCoreError::Code500BackwardEpoch`] for a non-increasing epoch.
    pub fn write_data_segment(
        &mut self,
        epochs: &[MJD],
        states: &[[f64; 6]],
        can_finalize: bool,
    ) -> Result<(), TimeCoreError> {
        if self.output.is_none() {
            return Err(TimeCoreError::Code500NotOpen("write"));
        }
        if epochs.len() != states.len() {
            return Err(TimeCoreError::InvalidConfiguration(format!(
                "{} epochs for {} states",
                epochs.len(),
                states.len()
            )));
        }

        for (epoch, state) in epochs.iter().zip(states) {
            if let Some(previous) = self.last_epoch {
                if *epoch <= previous {
                    return Err(TimeCoreError::Code500BackwardEpoch {
                        previous,
                        current: *epoch,
                    });
                }
            }
            self.last_epoch = Some(*epoch);
            self.pending.push((*epoch, *state));
        }

        while self.pending.len() >= NUM_STATES_PER_RECORD {
            self.flush_record(NUM_STATES_PER_RECORD)?;
        }

        if can_finalize {
            self.finish_data()?;
        }
        Ok(())
    }

    /// Complete the data if needed and rewrite header 1 with the final time span.
    pub fn finalize_headers(&mut self) -> Result<(), TimeCoreError> {
        if self.output.is_none() {
            return Err(TimeCoreError::Code500NotOpen("write"));
        }
        if !self.finalized {
            self.finish_data()?;
        }
        if self.write_counter > 2 {
            let h1 = self.header1.pack(self.byte_order);
            self.write_record_at(1, &h1)?;
        }
        if let Some(output) = self.output.as_mut() {
            output.flush()?;
        }
        Ok(())
    }

    /// Close the session. A write session is finalized first.
    pub fn close(&mut self) -> Result<(), TimeCoreError> {
        if self.output.is_some() {
            self.finalize_headers()?;
            info!(records = self.write_counter.saturating_sub(2), "closed Code500 file");
        }
        self.output = None;
        self.input = None;
        self.state = SessionState::Closed;
        Ok(())
    }
}

#[cfg(test)]
mod test_code500_file {
    use std::sync::Arc;

    use super::*;
    use crate::time_system::leap_seconds::LeapSecondTable;
    use approx::assert_abs_diff_eq;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
    }

    fn state_at(i: usize) -> [f64; 6] {
        let a = i as f64 * 0.01;
        [7000.0 * a.cos(), 7000.0 * a.sin(), 10.0, -7.5 * a.sin(), 7.5 * a.cos(), 0.001]
    }

    fn write_file(
        path: &Utf8Path,
        options: Code500WriteOptions,
        converter: TimeConverter,
        n: usize,
    ) -> Vec<MJD> {
        let epochs: Vec<MJD> = (0..n).map(|i| 58000.0 + i as f64 * 60.0 / 86400.0).collect();
        let states: Vec<[f64; 6]> = (0..n).map(state_at).collect();

        let mut file = Code500EphemerisFile::with_options(options, converter).unwrap();
        file.open_for_write(path).unwrap();
        file.write_data_segment(&epochs, &states, true).unwrap();
        file.close().unwrap();
        epochs
    }

    #[test]
    fn test_single_state_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "single.eph");

        let epochs = write_file(
            &path,
            Code500WriteOptions::default(),
            TimeConverter::default(),
            1,
        );
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * RECORD_SIZE as u64);

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        reader.open_for_read(&path).unwrap();
        assert_eq!(reader.state(), SessionState::HeaderRead);
        assert_eq!(reader.header1().orbit_theory, "COWELL");
        assert_eq!(reader.header1().tape_id, "GMAT");

        let states = reader.get_initial_and_final_states().unwrap();
        let expected = state_at(0);
        for k in 0..6 {
            assert_abs_diff_eq!(states.initial_state[k], expected[k], epsilon = 1e-9);
            assert_abs_diff_eq!(states.final_state[k], expected[k], epsilon = 1e-9);
        }
        assert_abs_diff_eq!(states.initial_epoch, epochs[0], epsilon = 1e-9);
        assert_eq!(states.central_body, Some(CentralBody::Earth));
        assert_eq!(states.coord_system, CoordSystemIndicator::J2000);
        reader.close().unwrap();
    }

    #[test]
    fn test_multi_record_big_endian() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "multi.eph");
        let options = Code500WriteOptions {
            byte_order: FileByteOrder::Big,
            step_size_secs: Some(60.0),
            coord_system: CoordSystemIndicator::TrueOfDate,
            ..Default::default()
        };
        let epochs = write_file(&path, options, TimeConverter::default(), 120);

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        reader.open_for_read(&path).unwrap();
        assert_eq!(reader.byte_order(), FileByteOrder::Big);
        assert_eq!(reader.read_data_records(None).unwrap(), 3);

        let all = reader.states().unwrap();
        assert_eq!(all.len(), 120);
        for (i, (epoch, state)) in all.iter().enumerate() {
            assert_abs_diff_eq!(*epoch, epochs[i], epsilon = 1e-9);
            assert_abs_diff_eq!(state[0], state_at(i)[0], epsilon = 1e-9);
        }

        let summary = reader.get_initial_and_final_states().unwrap();
        assert_eq!(summary.coord_system, CoordSystemIndicator::TrueOfDate);
        assert_abs_diff_eq!(summary.final_epoch, epochs[119], epsilon = 1e-9);
        assert_eq!(reader.header1().output_interval_indicator, 1);
        assert_abs_diff_eq!(reader.header1().step_size_secs, 60.0);
    }

    #[test]
    fn test_full_last_record_gets_end_marker() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "full.eph");
        write_file(&path, Code500WriteOptions::default(), TimeConverter::default(), 50);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4 * RECORD_SIZE as u64);

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        reader.open_for_read(&path).unwrap();
        assert_eq!(reader.read_data_records(None).unwrap(), 1);
        assert_eq!(reader.data_records()[0].states.len(), 50);
        assert_eq!(reader.read_data_at(2).unwrap(), None);
    }

    #[test]
    fn test_utc_file() {
        let leap = LeapSecondTable::from_str_content(
            " 2017 JAN  1 =JD 2457754.5  TAI-UTC=  37.0       S + (MJD - 41317.) X 0.0      S\n",
        )
        .unwrap();
        let converter = TimeConverter::with_leap_seconds_only(Arc::new(leap));

        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "utc.eph");
        let options = Code500WriteOptions {
            time_system: TimeSystem::UTC,
            ..Default::default()
        };
        let epochs = write_file(&path, options, converter.clone(), 5);

        let mut reader = Code500EphemerisFile::new(converter);
        reader.open_for_read(&path).unwrap();
        assert_eq!(reader.header1().time_system_indicator, 2.0);
        let summary = reader.get_initial_and_final_states().unwrap();
        assert_abs_diff_eq!(summary.initial_epoch, epochs[0], epsilon = 1e-9);

        // on disk the start seconds of day are UTC: 37 s + A1-TAI behind A1 midnight
        let secs = reader.header1().start_seconds_of_day;
        assert_abs_diff_eq!(secs, 86400.0 - 37.034, epsilon = 1e-3);
    }

    #[test]
    fn test_write_errors() {
        assert_eq!(
            Code500EphemerisFile::with_options(
                Code500WriteOptions {
                    time_system: TimeSystem::TAI,
                    ..Default::default()
                },
                TimeConverter::default()
            )
            .unwrap_err(),
            TimeCoreError::UnsupportedCode500TimeSystem("TAI".into())
        );

        let mut file =
            Code500EphemerisFile::with_options(Code500WriteOptions::default(), TimeConverter::default())
                .unwrap();
        assert_eq!(
            file.write_data_segment(&[58000.0], &[state_at(0)], false),
            Err(TimeCoreError::Code500NotOpen("write"))
        );

        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "backward.eph");
        file.open_for_write(&path).unwrap();
        file.write_data_segment(&[58000.0, 58000.1], &[state_at(0), state_at(1)], false)
            .unwrap();
        let err = file
            .write_data_segment(&[58000.05], &[state_at(2)], false)
            .unwrap_err();
        assert_eq!(
            err,
            TimeCoreError::Code500BackwardEpoch {
                previous: 58000.1,
                current: 58000.05
            }
        );
        assert_eq!(err.kind(), crate::timecore_errors::ErrorKind::Sequencing);
    }

    #[test]
    fn test_read_errors() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "short.eph");
        std::fs::write(&path, vec![0u8; 100]).unwrap();

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        assert!(matches!(
            reader.open_for_read(&path),
            Err(TimeCoreError::TruncatedRecord { record: 1, .. })
        ));
        assert_eq!(
            Code500EphemerisFile::new(TimeConverter::default()).read_data_records(None),
            Err(TimeCoreError::Code500NotOpen("read"))
        );
    }

    #[test]
    fn test_truncated_trailing_record() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "trailing.eph");
        let epochs = write_file(&path, Code500WriteOptions::default(), TimeConverter::default(), 120);
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xA5; 100]).unwrap();
        }

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        reader.open_for_read(&path).unwrap();
        assert_eq!(
            reader.read_data_records(None),
            Err(TimeCoreError::TruncatedRecord {
                record: 6,
                expected: RECORD_SIZE,
                actual: 100
            })
        );
        assert!(reader.data_records().is_empty());
        assert_eq!(reader.state(), SessionState::HeaderRead);
        // nothing partial left behind: the summary reads again and fails the same way
        assert!(matches!(
            reader.get_initial_and_final_states(),
            Err(TimeCoreError::TruncatedRecord { record: 6, .. })
        ));

        assert_eq!(
            reader
                .read_data_records_with(None, BadRecordPolicy::Skip)
                .unwrap(),
            3
        );
        assert_eq!(reader.state(), SessionState::DataStreaming);
        let all = reader.states().unwrap();
        assert_eq!(all.len(), 120);
        assert_abs_diff_eq!(all[119].0, epochs[119], epsilon = 1e-9);
        let summary = reader.get_initial_and_final_states().unwrap();
        assert_abs_diff_eq!(summary.final_epoch, epochs[119], epsilon = 1e-9);
    }

    #[test]
    fn test_custom_dut_reference() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "ref2000.eph");
        let options = Code500WriteOptions {
            dut_reference_yymmdd: 1000101.0,
            byte_order: FileByteOrder::Big,
            ..Default::default()
        };
        let epochs = write_file(&path, options, TimeConverter::default(), 60);

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        reader.open_for_read(&path).unwrap();
        assert_eq!(reader.header1().ref_time_for_dut_yymmdd, 1000101.0);
        assert_eq!(reader.dut_reference_a1_mjd(), 51544.0);
        reader.read_data_records(None).unwrap();

        // DUT counted from 1 Jan 2000: 58000 - 51544 days
        assert_abs_diff_eq!(
            reader.data_records()[0].time_of_first_point_dut,
            (58000.0 - 51544.0) * 100.0,
            epsilon = 1e-9
        );
        let all = reader.states().unwrap();
        assert_eq!(all.len(), 60);
        for (i, (epoch, _)) in all.iter().enumerate() {
            assert_abs_diff_eq!(*epoch, epochs[i], epsilon = 1e-9);
        }

        let bad = Code500WriteOptions {
            dut_reference_yymmdd: 571301.0,
            ..Default::default()
        };
        assert_eq!(
            Code500EphemerisFile::with_options(bad, TimeConverter::default()).unwrap_err(),
            TimeCoreError::InvalidDutReference(571301.0)
        );
    }

    #[test]
    fn test_variable_step_rebuilds_even_epochs() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "uneven.eph");
        let minute = 60.0 / 86400.0;
        let epochs = [58000.0, 58000.0 + minute, 58000.0 + 3.0 * minute];
        let states: Vec<[f64; 6]> = (0..3).map(state_at).collect();

        let mut writer =
            Code500EphemerisFile::with_options(Code500WriteOptions::default(), TimeConverter::default())
                .unwrap();
        writer.open_for_write(&path).unwrap();
        writer.write_data_segment(&epochs, &states, true).unwrap();
        writer.close().unwrap();

        let mut reader = Code500EphemerisFile::new(TimeConverter::default());
        reader.open_for_read(&path).unwrap();
        assert_eq!(reader.header1().output_interval_indicator, 2);
        reader.read_data_records(None).unwrap();
        let all = reader.states().unwrap();
        assert_abs_diff_eq!(all[1].0, epochs[1], epsilon = 1e-9);
        // the third point comes back one interval after the second, not at its written epoch
        assert_abs_diff_eq!(all[2].0, 58000.0 + 2.0 * minute, epsilon = 1e-9);
        assert_abs_diff_eq!(all[2].1[0], state_at(2)[0], epsilon = 1e-9);
    }
}
