//! Internal units of the Code500 format.
//!
//! Distances are stored in DUL (10 000 km) and times in DUT (864 s, i.e. 0.01 day).
//! Epochs are stored as DUT elapsed since a reference A1 epoch written in the first header.
use crate::constants::{Days, Kilometer, MJD};

/// Kilometers per distance unit.
pub const DUL_TO_KM: f64 = 1.0e4;

/// Kilometers per second per (DUL / DUT).
pub const DUL_DUT_TO_KM_SEC: f64 = 1.0e4 / 864.0;

/// Time units per second.
pub const SEC_TO_DUT: f64 = 1.0 / 864.0;

/// Time units per day.
pub const DAY_TO_DUT: f64 = 100.0;

pub const DUT_TO_DAY: Days = 0.01;

pub fn km_to_dul(value: Kilometer) -> f64 {
    value / DUL_TO_KM
}

pub fn dul_to_km(value: f64) -> Kilometer {
    value * DUL_TO_KM
}

/// Convert a Cartesian state in km and km/s into DUL and DUL/DUT.
pub fn state_to_internal(state: &[f64; 6]) -> [f64; 6] {
    [
        state[0] / DUL_TO_KM,
        state[1] / DUL_TO_KM,
        state[2] / DUL_TO_KM,
        state[3] / DUL_DUT_TO_KM_SEC,
        state[4] / DUL_DUT_TO_KM_SEC,
        state[5] / DUL_DUT_TO_KM_SEC,
    ]
}

/// Convert a Cartesian state in DUL and DUL/DUT into km and km/s.
pub fn state_from_internal(state: &[f64]) -> [f64; 6] {
    let mut out = [0.0; 6];
    for (i, v) in state.iter().take(6).enumerate() {
        out[i] = if i < 3 {
            v * DUL_TO_KM
        } else {
            v * DUL_DUT_TO_KM_SEC
        };
    }
    out
}

/// Elapsed DUT between an A1 epoch and the reference A1 epoch.
pub fn a1_mjd_to_dut(a1_mjd: MJD, ref_a1_mjd: MJD) -> f64 {
    (a1_mjd - ref_a1_mjd) * DAY_TO_DUT
}

/// A1 epoch from elapsed DUT since the reference A1 epoch.
pub fn dut_to_a1_mjd(dut: f64, ref_a1_mjd: MJD) -> MJD {
    ref_a1_mjd + dut * DUT_TO_DAY
}
