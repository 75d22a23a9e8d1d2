//! Workout data sources.
//!
//! A source lists recorded workouts and delivers their route and heart-rate
//! series. Both series must come back sorted ascending by timestamp and
//! complete; the export path relies on that and never re-sorts.

pub mod json;

use crate::export::types::{ActivityKind, HeartRateSample, LocationFix, Workout};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use json::{JsonWorkoutSource, WorkoutRecord};

/// Source-related errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Workout not found: {0}")]
    WorkoutNotFound(Uuid),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A recorded workout as listed by a source, without its series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub id: Uuid,
    pub activity: ActivityKind,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl WorkoutSummary {
    /// Window heart-rate samples are queried in.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.started_at, self.ended_at)
    }
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end
    }
}

/// Trait for workout data backends
pub trait WorkoutSource: Send + Sync {
    /// List exportable workouts
    fn list_workouts(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WorkoutSummary>, SourceError>> + Send;

    /// Heart-rate samples starting within `window`, sorted ascending
    fn heart_rate_samples(
        &self,
        workout: &WorkoutSummary,
        window: TimeWindow,
    ) -> impl std::future::Future<Output = Result<Vec<HeartRateSample>, SourceError>> + Send;

    /// All route fixes of the workout across segments, sorted ascending
    fn route_locations(
        &self,
        workout: &WorkoutSummary,
    ) -> impl std::future::Future<Output = Result<Vec<LocationFix>, SourceError>> + Send;
}

/// Fetch route and heart rate concurrently and build an exportable workout.
///
/// Either query failing fails the whole load.
pub async fn load_workout<S: WorkoutSource>(
    source: &S,
    summary: &WorkoutSummary,
) -> Result<Workout, SourceError> {
    let (locations, heart_rate) = futures::try_join!(
        source.route_locations(summary),
        source.heart_rate_samples(summary, summary.window()),
    )?;

    tracing::debug!(
        "Loaded workout {}: {} locations, {} heart rate samples",
        summary.id,
        locations.len(),
        heart_rate.len()
    );

    Ok(Workout::new(summary.activity, locations, heart_rate))
}
