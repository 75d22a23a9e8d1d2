//! Integration tests for exporting workouts to files.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use std::fs;
use workout_gpx::export::inspect::inspect_gpx_file;
use workout_gpx::export::session::{generate_gpx_filename, ExportState};
use workout_gpx::{
    ActivityKind, ExportConfig, ExportError, GpxExporter, HeartRateSample, LocationFix, Workout,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2022, 3, 12, 17, 45, 9).unwrap() + chrono::Duration::seconds(secs)
}

fn create_workout() -> Workout {
    let locations = (0..30)
        .map(|i| LocationFix::new(40.7128 + i as f64 * 1e-4, -74.006, 10.0 + i as f64, at(i * 5)))
        .collect();
    let hr = (0..10)
        .map(|i| HeartRateSample::new(110.0 + i as f64, at(i * 15 + 2)))
        .collect();
    Workout::with_fallback_start(ActivityKind::Running, locations, hr, at(0))
}

fn dir_entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[test]
fn test_export_writes_named_file() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = GpxExporter::default();

    let path = exporter.export(&create_workout(), dir.path()).unwrap();

    assert_eq!(path, dir.path().join("2022-03-12 17.45.09 - Run.gpx"));
    let summary = inspect_gpx_file(&path).unwrap();
    assert_eq!(summary.point_count, 30);
    assert_eq!(summary.started_at, Some(at(0)));
    assert_eq!(summary.last_point_at, Some(at(145)));
}

#[test]
fn test_file_name_uses_configured_offset() {
    let config = ExportConfig::default().with_offset(FixedOffset::west_opt(5 * 3600).unwrap());

    assert_eq!(
        generate_gpx_filename(&create_workout(), &config).unwrap(),
        "2022-03-12 12.45.09 - Run.gpx"
    );
}

#[test]
fn test_reexport_is_byte_identical_and_replaces_file() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = GpxExporter::default();
    let workout = create_workout();

    let first_path = exporter.export(&workout, dir.path()).unwrap();
    let first = fs::read(&first_path).unwrap();
    let second_path = exporter.export(&workout, dir.path()).unwrap();
    let second = fs::read(&second_path).unwrap();

    assert_eq!(first_path, second_path);
    assert_eq!(first, second);
    assert_eq!(dir_entries(dir.path()), vec!["2022-03-12 17.45.09 - Run.gpx"]);
}

#[test]
fn test_existing_file_is_replaced_not_appended() {
    let dir = tempfile::tempdir().unwrap();
    let workout = create_workout();
    let stale = dir
        .path()
        .join(generate_gpx_filename(&workout, &ExportConfig::default()).unwrap());
    fs::write(&stale, "stale content that is longer than nothing").unwrap();

    let path = GpxExporter::default().export(&workout, dir.path()).unwrap();
    let content = fs::read_to_string(path).unwrap();

    assert!(content.starts_with("<?xml"));
    assert!(!content.contains("stale content"));
}

#[test]
fn test_atomic_and_direct_exports_match() {
    let direct_dir = tempfile::tempdir().unwrap();
    let atomic_dir = tempfile::tempdir().unwrap();
    let workout = create_workout();

    let direct = GpxExporter::default()
        .export(&workout, direct_dir.path())
        .unwrap();
    let atomic = GpxExporter::new(ExportConfig::default().with_atomic_write(true))
        .export(&workout, atomic_dir.path())
        .unwrap();

    assert_eq!(fs::read(direct).unwrap(), fs::read(atomic).unwrap());
    assert_eq!(dir_entries(atomic_dir.path()).len(), 1);
}

#[test]
fn test_output_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("a").join("b");

    let path = GpxExporter::default()
        .export(&create_workout(), &nested)
        .unwrap();
    assert!(path.starts_with(&nested));
}

#[test]
fn test_unpreparable_destination_reports_failure() {
    let dir = tempfile::tempdir().unwrap();
    let workout = create_workout();
    // A directory squatting on the file name cannot be removed as a file.
    fs::create_dir(
        dir.path()
            .join(generate_gpx_filename(&workout, &ExportConfig::default()).unwrap()),
    )
    .unwrap();

    let err = GpxExporter::default()
        .export(&workout, dir.path())
        .unwrap_err();
    assert!(matches!(err, ExportError::ResourcePreparationFailed(_)));
}

#[test]
fn test_stepped_session_can_stop_between_trackpoints() {
    let dir = tempfile::tempdir().unwrap();
    let workout = create_workout();
    let exporter = GpxExporter::new(ExportConfig::default().with_atomic_write(true));

    {
        let mut session = exporter.session(&workout, dir.path()).unwrap();
        session.prepare().unwrap();
        session.write_header().unwrap();
        for _ in 0..10 {
            assert!(session.write_next_trackpoint().unwrap());
        }
        assert_eq!(
            session.state(),
            ExportState::WritingTrackpoints { written: 10 }
        );
    }

    assert!(dir_entries(dir.path()).is_empty());
}

#[test]
fn test_session_completes_after_manual_steps() {
    let dir = tempfile::tempdir().unwrap();
    let workout = create_workout();
    let exporter = GpxExporter::default();

    let mut session = exporter.session(&workout, dir.path()).unwrap();
    session.prepare().unwrap();
    session.write_header().unwrap();
    while session.write_next_trackpoint().unwrap() {}
    assert_eq!(
        session.state(),
        ExportState::WritingTrackpoints { written: 30 }
    );

    let path = session.finish().unwrap();
    assert_eq!(session.state(), ExportState::Done);
    assert_eq!(
        fs::read(&path).unwrap(),
        workout_gpx::export::exporter_gpx::export_gpx(&workout, exporter.config())
            .unwrap()
            .into_bytes()
    );
}
