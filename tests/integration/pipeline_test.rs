//! Integration tests for exporting from a workout source.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;
use workout_gpx::export::inspect::inspect_gpx_file;
use workout_gpx::source::{load_workout, SourceError, TimeWindow, WorkoutRecord};
use workout_gpx::{
    ActivityKind, ExportPipeline, GpxExporter, HeartRateSample, JsonWorkoutSource, LocationFix,
    PipelineError, WorkoutSource, WorkoutSummary,
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 8, 1, 6, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

fn record(activity: ActivityKind, offset: i64) -> WorkoutRecord {
    WorkoutRecord {
        id: Uuid::new_v4(),
        activity,
        started_at: at(offset),
        ended_at: at(offset + 600),
        route_segments: vec![
            (0..5)
                .map(|i| LocationFix::new(59.33, 18.06, 20.0, at(offset + 300 + i * 10)))
                .collect(),
            (0..5)
                .map(|i| LocationFix::new(59.34, 18.07, 21.0, at(offset + i * 10)))
                .collect(),
        ],
        heart_rate: vec![
            HeartRateSample::new(150.0, at(offset + 305)),
            HeartRateSample::new(140.0, at(offset + 1)),
            // Outside the workout window
            HeartRateSample::new(60.0, at(offset - 100)),
        ],
    }
}

#[tokio::test]
async fn test_load_workout_merges_segments_and_filters_heart_rate() {
    let workout = record(ActivityKind::Cycling, 0);
    let source = JsonWorkoutSource::new(vec![workout.clone()]);
    let summary = source.list_workouts().await.unwrap().remove(0);

    let loaded = load_workout(&source, &summary).await.unwrap();

    assert_eq!(loaded.locations().len(), 10);
    assert_eq!(loaded.started_at(), at(0));
    assert!(loaded
        .locations()
        .windows(2)
        .all(|w| w[0].timestamp <= w[1].timestamp));
    let bpm: Vec<_> = loaded.heart_rate().iter().map(|s| s.bpm).collect();
    assert_eq!(bpm, vec![140.0, 150.0]);
}

#[tokio::test]
async fn test_export_all_writes_every_workout() {
    let dir = tempfile::tempdir().unwrap();
    let source = JsonWorkoutSource::new(vec![
        record(ActivityKind::Running, 0),
        record(ActivityKind::Walking, 3600),
        record(ActivityKind::Other, 7200),
    ]);
    let pipeline = ExportPipeline::new(source, GpxExporter::default(), dir.path());

    let outcomes = pipeline.export_all().await.unwrap();

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        let path = outcome.result.as_ref().unwrap();
        assert_eq!(inspect_gpx_file(path).unwrap().point_count, 10);
    }
    // Newest first
    let first = outcomes[0].result.as_ref().unwrap();
    assert!(first.ends_with("2021-08-01 07.00.00 - Walk.gpx"));
}

#[tokio::test]
async fn test_export_by_unknown_id_fails_with_backend_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = ExportPipeline::new(
        JsonWorkoutSource::new(vec![record(ActivityKind::Running, 0)]),
        GpxExporter::default(),
        dir.path(),
    );

    let err = pipeline.export_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Backend(SourceError::WorkoutNotFound(_))
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// Source whose heart-rate query fails for one particular workout.
struct FlakySource {
    inner: JsonWorkoutSource,
    failing: Uuid,
    heart_rate_queries: AtomicUsize,
}

impl WorkoutSource for FlakySource {
    async fn list_workouts(&self) -> Result<Vec<WorkoutSummary>, SourceError> {
        self.inner.list_workouts().await
    }

    async fn heart_rate_samples(
        &self,
        workout: &WorkoutSummary,
        window: TimeWindow,
    ) -> Result<Vec<HeartRateSample>, SourceError> {
        self.heart_rate_queries.fetch_add(1, Ordering::SeqCst);
        if workout.id == self.failing {
            return Err(SourceError::QueryFailed("authorization denied".to_string()));
        }
        self.inner.heart_rate_samples(workout, window).await
    }

    async fn route_locations(
        &self,
        workout: &WorkoutSummary,
    ) -> Result<Vec<LocationFix>, SourceError> {
        self.inner.route_locations(workout).await
    }
}

#[tokio::test]
async fn test_backend_failure_is_isolated_per_workout() {
    let dir = tempfile::tempdir().unwrap();
    let good = record(ActivityKind::Running, 0);
    let bad = record(ActivityKind::Cycling, 3600);
    let source = FlakySource {
        inner: JsonWorkoutSource::new(vec![good.clone(), bad.clone()]),
        failing: bad.id,
        heart_rate_queries: AtomicUsize::new(0),
    };
    let pipeline = ExportPipeline::new(source, GpxExporter::default(), dir.path());

    let outcomes = pipeline.export_all().await.unwrap();

    assert_eq!(outcomes.len(), 2);
    let bad_outcome = outcomes.iter().find(|o| o.workout_id == bad.id).unwrap();
    assert!(matches!(
        bad_outcome.result,
        Err(PipelineError::Backend(SourceError::QueryFailed(_)))
    ));
    let good_outcome = outcomes.iter().find(|o| o.workout_id == good.id).unwrap();
    assert!(good_outcome.result.is_ok());

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert_eq!(pipeline.source().heart_rate_queries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_json_file_source_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("workouts.json");
    let source = JsonWorkoutSource::new(vec![record(ActivityKind::Walking, 0)]);
    std::fs::write(&input, source.to_json().unwrap()).unwrap();

    let loaded = JsonWorkoutSource::load(&input).unwrap();
    let out = dir.path().join("out");
    let pipeline = ExportPipeline::new(loaded, GpxExporter::default(), &out);
    let id = pipeline.source().list_workouts().await.unwrap()[0].id;

    let path = pipeline.export_by_id(id).await.unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("<gpxtpx:hr>140</gpxtpx:hr>"));
    assert!(content.contains("<gpxtpx:hr>150</gpxtpx:hr>"));
}
