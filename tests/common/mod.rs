#![allow(dead_code)]

use std::sync::Arc;

use camino::Utf8PathBuf;
use ephem_timecore::config::TimeDataConfig;
use ephem_timecore::time_environment::TimeEnvironment;
use ephem_timecore::time_system::converter::TimeConverter;
use ephem_timecore::time_system::earth_orientation::EopFileFormat;
use ephem_timecore::time_system::leap_seconds::LeapSecondTable;

pub fn data_path(name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

pub fn leap_table() -> Arc<LeapSecondTable> {
    Arc::new(LeapSecondTable::from_file(&data_path("tai-utc.dat")).unwrap())
}

pub fn utc_converter() -> TimeConverter {
    TimeConverter::with_leap_seconds_only(leap_table())
}

/// Environment with the full leap-second history and the C04 excerpt around 2017-01-01.
pub fn c04_environment() -> TimeEnvironment {
    TimeEnvironment::new(
        TimeDataConfig::new(data_path("tai-utc.dat"))
            .with_eop_file(data_path("eopc04_excerpt.62-now"), EopFileFormat::C04),
    )
    .unwrap()
}

/// Environment with the full leap-second history and the finals excerpt around 2020-01-01.
pub fn finals_environment() -> TimeEnvironment {
    TimeEnvironment::new(
        TimeDataConfig::new(data_path("tai-utc.dat"))
            .with_eop_file(data_path("finals_excerpt.data"), EopFileFormat::Finals),
    )
    .unwrap()
}

/// Seconds to days.
pub fn secs(seconds: f64) -> f64 {
    seconds / 86400.0
}
