mod common;

use approx::assert_abs_diff_eq;
use camino::Utf8PathBuf;
use ephem_timecore::ccsds::{parse_ccsds_epoch, EphemerisMessageReader};
use ephem_timecore::code500::byte_order::FileByteOrder;
use ephem_timecore::code500::file::{Code500EphemerisFile, Code500WriteOptions, SessionState};
use ephem_timecore::code500::header::{
    CentralBody, CoordSystemIndicator, UTC_TIME_SYSTEM_INDICATOR,
};
use ephem_timecore::code500::RECORD_SIZE;
use ephem_timecore::time_system::TimeSystem;
use ephem_timecore::timecore_errors::ErrorKind;
use tempfile::TempDir;

use crate::common::{data_path, utc_converter};

fn temp_path(dir: &TempDir, name: &str) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap()
}

/// States of the second OEM arc every 10 seconds, 10:00 to 20:00 UTC.
fn oem_samples() -> (Vec<f64>, Vec<[f64; 6]>) {
    let converter = utc_converter();
    let mut reader =
        EphemerisMessageReader::from_file(&data_path("leosat.oem"), converter.clone()).unwrap();
    let start = parse_ccsds_epoch("2020-01-01T00:10:00", &converter).unwrap();

    let mut epochs = Vec::new();
    let mut states = Vec::new();
    for i in 0..=60 {
        let epoch = start + (i as f64 * 10.0) / 86400.0;
        let values = reader.determine_state(epoch).unwrap();
        let mut state = [0.0; 6];
        state.copy_from_slice(values.as_slice());
        epochs.push(epoch);
        states.push(state);
    }
    (epochs, states)
}

#[test]
fn test_oem_to_code500_in_utc() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "leosat.eph");
    let (epochs, states) = oem_samples();

    let options = Code500WriteOptions {
        sat_id: 20001.0,
        time_system: TimeSystem::UTC,
        byte_order: FileByteOrder::Big,
        step_size_secs: Some(10.0),
        central_body: CentralBody::Earth,
        coord_system: CoordSystemIndicator::J2000,
        ..Default::default()
    };
    let mut writer = Code500EphemerisFile::with_options(options, utc_converter()).unwrap();
    writer.open_for_write(&path).unwrap();
    writer
        .write_data_segment(&epochs[..30], &states[..30], false)
        .unwrap();
    writer
        .write_data_segment(&epochs[30..], &states[30..], true)
        .unwrap();
    writer.close().unwrap();
    assert_eq!(writer.state(), SessionState::Closed);

    // two headers and two data records
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        4 * RECORD_SIZE as u64
    );

    let mut reader = Code500EphemerisFile::new(utc_converter());
    reader.open_for_read(&path).unwrap();
    assert_eq!(reader.byte_order(), FileByteOrder::Big);
    let header = reader.header1().clone();
    assert_eq!(header.time_system_indicator, UTC_TIME_SYSTEM_INDICATOR);
    assert_eq!(header.sat_id, 20001.0);
    assert_eq!(header.step_size_secs, 10.0);
    assert_abs_diff_eq!(header.start_seconds_of_day, 600.0, epsilon = 1e-3);
    assert_abs_diff_eq!(header.end_seconds_of_day, 1200.0, epsilon = 1e-3);

    assert_eq!(reader.read_data_records(None).unwrap(), 2);
    let read = reader.states().unwrap();
    assert_eq!(read.len(), 61);
    for ((epoch, state), (expected_epoch, expected_state)) in
        read.iter().zip(epochs.iter().zip(&states))
    {
        assert_abs_diff_eq!(*epoch, *expected_epoch, epsilon = 1e-8);
        for k in 0..6 {
            assert_abs_diff_eq!(state[k], expected_state[k], epsilon = 1e-9);
        }
    }

    let bounds = reader.get_initial_and_final_states().unwrap();
    assert_abs_diff_eq!(bounds.final_state[1], 450.0 * 20.0, epsilon = 1e-4);
    assert_eq!(bounds.coord_system, CoordSystemIndicator::J2000);
    reader.close().unwrap();
}

#[test]
fn test_read_one_record() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "native.eph");
    let (epochs, states) = oem_samples();

    let mut writer = Code500EphemerisFile::new(utc_converter());
    writer.open_for_write(&path).unwrap();
    writer.write_data_segment(&epochs, &states, true).unwrap();
    writer.close().unwrap();

    let mut reader = Code500EphemerisFile::new(utc_converter());
    reader.open_for_read(&path).unwrap();
    assert_eq!(reader.byte_order(), FileByteOrder::native());

    let second = reader.read_data_at(2).unwrap().unwrap();
    assert_eq!(second.states.len(), 11);
    assert!(reader.read_data_at(3).unwrap().is_none());
}

#[test]
fn test_utc_file_needs_leap_seconds() {
    let options = Code500WriteOptions {
        time_system: TimeSystem::UTC,
        ..Default::default()
    };
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir, "noleap.eph");

    let mut writer = Code500EphemerisFile::with_options(
        options,
        ephem_timecore::TimeConverter::default(),
    )
    .unwrap();
    writer.open_for_write(&path).unwrap();
    let err = writer
        .write_data_segment(&[58849.5], &[[7000.0, 0.0, 0.0, 0.0, 7.5, 0.0]], true)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
