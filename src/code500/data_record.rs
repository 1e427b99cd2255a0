//! Code500 data records: up to 50 consecutive states per 2800-byte block.
//!
//! | offset | width | field                                           |
//! |--------|-------|-------------------------------------------------|
//! | 0      | 8     | date of first point `YYYMMDD`                   |
//! | 8      | 8     | day of year of first point                      |
//! | 16     | 8     | seconds of day of first point                   |
//! | 24     | 8     | interval between points, seconds                |
//! | 32     | 48    | first state (DUL, DUL/DUT)                      |
//! | 80     | 2352  | states 2 to 50                                  |
//! | 2432   | 8     | thrust indicator (1 thrust, 2 free flight)      |
//! | 2440   | 8     | time of first point, DUT                        |
//! | 2448   | 8     | interval between points, DUT                    |
//! | 2456   | 344   | spares                                          |
//!
//! Unused state slots are filled with [`SENTINEL`]. A record whose first ten doubles are all
//! sentinels marks the end of the data.
use crate::{
    code500::{
        byte_order::{read_f64, read_f64_array, write_f64, write_f64_array, FileByteOrder},
        units::{dut_to_a1_mjd, state_from_internal},
        RECORD_SIZE,
    },
    constants::MJD,
    timecore_errors::TimeCoreError,
};

/// Number of states in a full data record.
pub const NUM_STATES_PER_RECORD: usize = 50;

/// Filler value of unused slots.
pub const SENTINEL: f64 = 9.99999999999999e15;

const SENTINEL_TOLERANCE: f64 = 1.0e-10;
const ZERO_TOLERANCE: f64 = 1.0e-12;

const OFF_DATE: usize = 0;
const OFF_DAY_OF_YEAR: usize = 8;
const OFF_SECONDS_OF_DAY: usize = 16;
const OFF_INTERVAL_SEC: usize = 24;
const OFF_FIRST_STATE: usize = 32;
const OFF_OTHER_STATES: usize = 80;
const OFF_THRUST: usize = 2432;
const OFF_FIRST_POINT_DUT: usize = 2440;
const OFF_INTERVAL_DUT: usize = 2448;

/// Thrust indicator written for free-flight arcs.
pub const FREE_FLIGHT: f64 = 2.0;

fn slot_offset(slot: usize) -> usize {
    if slot == 0 {
        OFF_FIRST_STATE
    } else {
        OFF_OTHER_STATES + (slot - 1) * 48
    }
}

/// A slot ends the record when more than five of its components are sentinels, or more than
/// five are zero.
fn is_end_slot(state: &[f64]) -> bool {
    let sentinels = state
        .iter()
        .filter(|v| (**v - SENTINEL).abs() < SENTINEL_TOLERANCE)
        .count();
    let zeros = state.iter().filter(|v| v.abs() < ZERO_TOLERANCE).count();
    sentinels > 5 || zeros > 5
}

/// One decoded data record. States are kept in internal units.
#[derive(Debug, Clone, PartialEq)]
pub struct Code500DataRecord {
    pub date_yyymmdd: f64,
    pub day_of_year: f64,
    pub seconds_of_day: f64,
    pub interval_secs: f64,
    /// Valid states only, in DUL and DUL/DUT.
    pub states: Vec<[f64; 6]>,
    pub thrust_indicator: f64,
    pub time_of_first_point_dut: f64,
    pub interval_dut: f64,
}

impl Code500DataRecord {
    /// Decode a data record.
    ///
    /// Arguments
    /// -----------------
    /// * `bytes`: The raw record.
    /// * `order`: Byte order of the file.
    /// * `record_number`: One-based record number in the file, used in error messages.
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` for an end-of-data record (first ten doubles are sentinels),
    ///   `Ok(Some(record))` otherwise, or [`TimeCoreError::TruncatedRecord`].
    pub fn parse(
        bytes: &[u8],
        order: FileByteOrder,
        record_number: usize,
    ) -> Result<Option<Self>, TimeCoreError> {
        if bytes.len() < RECORD_SIZE {
            return Err(TimeCoreError::TruncatedRecord {
                record: record_number,
                expected: RECORD_SIZE,
                actual: bytes.len(),
            });
        }

        let leading = read_f64_array(bytes, OFF_DATE, 10, order)?;
        if leading
            .iter()
            .all(|v| (*v - SENTINEL).abs() < SENTINEL_TOLERANCE)
        {
            return Ok(None);
        }

        let mut states = Vec::with_capacity(NUM_STATES_PER_RECORD);
        for slot in 0..NUM_STATES_PER_RECORD {
            let values = read_f64_array(bytes, slot_offset(slot), 6, order)?;
            if is_end_slot(&values) {
                break;
            }
            let mut state = [0.0; 6];
            state.copy_from_slice(&values);
            states.push(state);
        }

        Ok(Some(Code500DataRecord {
            date_yyymmdd: leading[0],
            day_of_year: leading[1],
            seconds_of_day: leading[2],
            interval_secs: leading[3],
            states,
            thrust_indicator: read_f64(bytes, OFF_THRUST, order)?,
            time_of_first_point_dut: read_f64(bytes, OFF_FIRST_POINT_DUT, order)?,
            interval_dut: read_f64(bytes, OFF_INTERVAL_DUT, order)?,
        }))
    }

    /// Encode the record; slots past the stored states are filled with [`SENTINEL`].
    pub fn pack(&self, order: FileByteOrder) -> Vec<u8> {
        let mut buf = vec![b' '; RECORD_SIZE];
        write_f64_array(
            &mut buf,
            OFF_DATE,
            &[
                self.date_yyymmdd,
                self.day_of_year,
                self.seconds_of_day,
                self.interval_secs,
            ],
            order,
        );
        for slot in 0..NUM_STATES_PER_RECORD {
            let state = self.states.get(slot).copied().unwrap_or([SENTINEL; 6]);
            write_f64_array(&mut buf, slot_offset(slot), &state, order);
        }
        write_f64(&mut buf, OFF_THRUST, self.thrust_indicator, order);
        write_f64(&mut buf, OFF_FIRST_POINT_DUT, self.time_of_first_point_dut, order);
        write_f64(&mut buf, OFF_INTERVAL_DUT, self.interval_dut, order);
        buf
    }

    /// A record marking the end of the data: every state slot and the four leading date fields
    /// hold sentinels.
    pub fn end_of_data(order: FileByteOrder) -> Vec<u8> {
        Code500DataRecord {
            date_yyymmdd: SENTINEL,
            day_of_year: SENTINEL,
            seconds_of_day: SENTINEL,
            interval_secs: SENTINEL,
            states: Vec::new(),
            thrust_indicator: FREE_FLIGHT,
            time_of_first_point_dut: SENTINEL,
            interval_dut: SENTINEL,
        }
        .pack(order)
    }

    /// A1 modified julian date of the state in `slot`, from the DUT fields.
    pub fn epoch_of(&self, slot: usize, ref_a1_mjd: MJD) -> MJD {
        dut_to_a1_mjd(
            self.time_of_first_point_dut + slot as f64 * self.interval_dut,
            ref_a1_mjd,
        )
    }

    /// States converted to km and km/s.
    pub fn states_km(&self) -> Vec<[f64; 6]> {
        self.states.iter().map(|s| state_from_internal(s)).collect()
    }
}
