mod common;

use approx::assert_abs_diff_eq;
use ephem_timecore::ccsds::{
    parse_ccsds_epoch, EphemerisMessageReader, MessageKind, SegmentKind,
};
use ephem_timecore::timecore_errors::{ErrorKind, TimeCoreError};

use crate::common::{data_path, utc_converter};

fn epoch(text: &str) -> f64 {
    parse_ccsds_epoch(text, &utc_converter()).unwrap()
}

fn read_oem() -> EphemerisMessageReader {
    EphemerisMessageReader::from_file(&data_path("leosat.oem"), utc_converter()).unwrap()
}

#[test]
fn test_oem_header_and_segments() {
    let reader = read_oem();
    assert_eq!(reader.kind(), MessageKind::Orbit);
    assert_eq!(reader.version(), "2.0");
    assert_eq!(reader.originator(), Some("FLIGHT DYNAMICS"));
    assert_eq!(reader.creation_date(), Some("2020-01-01T12:00:00"));
    assert_eq!(reader.comments().len(), 1);
    assert_eq!(reader.number_of_segments(), 2);

    let first = &reader.segments()[0];
    assert_eq!(first.number(), 1);
    assert_eq!(first.kind(), SegmentKind::Orbit);
    assert_eq!(first.object_name.as_deref(), Some("LEOSAT"));
    assert_eq!(first.ref_frame.as_deref(), Some("EME2000"));
    assert_eq!(first.interpolation_degree(), Some(5));
    assert_eq!(first.meta_comments(), ["first arc".to_string()]);
    assert_eq!(
        first.data_comments(),
        ["position km, velocity km/s".to_string()]
    );
    assert_eq!(first.number_of_data_points(), 11);
    assert_eq!(first.usable_index_range().unwrap(), Some((1, 9)));

    // UTC text is stored as A1
    let start = first.start_time().unwrap();
    assert_abs_diff_eq!(
        start,
        58849.0 + (37.0 + 0.0343817) / 86400.0,
        epsilon = 1e-10
    );

    let second = &reader.segments()[1];
    assert_eq!(second.number(), 2);
    assert_eq!(second.number_of_data_points(), 11);
    assert_eq!(second.interpolation_degree(), Some(3));
    assert!(second.data_comments().is_empty());
}

#[test]
fn test_oem_states() {
    let mut reader = read_oem();

    let state = reader.determine_state(epoch("2020-01-01T00:04:30")).unwrap();
    assert_eq!(state.len(), 6);
    assert_abs_diff_eq!(state[0], 6778.137 - 0.5 * 4.5, epsilon = 1e-4);
    assert_abs_diff_eq!(state[1], 450.0 * 4.5, epsilon = 1e-4);
    assert_abs_diff_eq!(state[2], 120.0 * 4.5, epsilon = 1e-4);
    assert_abs_diff_eq!(state[4], 7.5, epsilon = 1e-9);

    // day-of-year epochs of the second arc
    let state = reader.determine_state(epoch("2020-001T00:15:15")).unwrap();
    assert_abs_diff_eq!(state[1], 450.0 * 15.25, epsilon = 1e-4);

    // a stored epoch returns the stored values
    let state = reader.determine_state(epoch("2020-01-01T00:12:00")).unwrap();
    assert_eq!(state[1], 5400.0);
}

#[test]
fn test_oem_coverage() {
    let mut reader = read_oem();

    assert_eq!(
        reader.segment_number_for_epoch(epoch("2020-01-01T00:03:00")),
        Some(0)
    );
    assert_eq!(
        reader.segment_number_for_epoch(epoch("2020-01-01T00:19:59")),
        Some(1)
    );

    // outside the usable span of the first arc
    for text in ["2020-01-01T00:00:30", "2020-01-01T00:09:30", "2020-01-01T00:25:00"] {
        let at = epoch(text);
        assert!(reader.segment_for_epoch(at).is_none());
        assert!(matches!(
            reader.determine_state(at),
            Err(TimeCoreError::SegmentRange { segment: 0, .. })
        ));
    }
}

#[test]
fn test_aem_segments() {
    let mut reader =
        EphemerisMessageReader::from_file(&data_path("leosat.aem"), utc_converter()).unwrap();
    assert_eq!(reader.kind(), MessageKind::Attitude);
    assert_eq!(reader.version(), "1.0");
    assert_eq!(reader.number_of_segments(), 2);

    let quaternions = &reader.segments()[0];
    assert_eq!(quaternions.kind(), SegmentKind::Quaternion);
    assert_eq!(quaternions.data_size(), 4);
    assert_eq!(quaternions.attitude_field("QUATERNION_TYPE"), Some("LAST"));
    assert_eq!(quaternions.interpolation_method.as_deref(), Some("SLERP"));

    let angles = &reader.segments()[1];
    assert_eq!(angles.kind(), SegmentKind::EulerAngle);
    assert_eq!(angles.attitude_field("EULER_ROT_SEQ"), Some("321"));
    assert_eq!(angles.meta_comments(), ["yaw ramp".to_string()]);

    // 15 degrees about Z
    let q = reader.determine_state(epoch("2020-02-01T00:02:30")).unwrap();
    let half = 7.5_f64.to_radians();
    assert_abs_diff_eq!(q[0], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(q[2], half.sin(), epsilon = 1e-7);
    assert_abs_diff_eq!(q[3], half.cos(), epsilon = 1e-7);
    assert_abs_diff_eq!(q.norm(), 1.0, epsilon = 1e-9);

    let angles = reader.determine_state(epoch("2020-032T00:06:20")).unwrap();
    assert_abs_diff_eq!(angles[0], 38.0, epsilon = 1e-6);
    assert_eq!(angles[1], 0.0);
}

#[test]
fn test_read_errors() {
    let err =
        EphemerisMessageReader::from_file(&data_path("missing.oem"), utc_converter()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    // an OEM body cannot be read without a leap-second table
    let err = EphemerisMessageReader::from_file(
        &data_path("leosat.oem"),
        ephem_timecore::TimeConverter::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
