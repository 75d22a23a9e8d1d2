//! Workout source backed by a JSON export file.
//!
//! The file holds a list of workouts, each with its route split into
//! segments the way a recording device delivers them, plus the raw
//! heart-rate samples of the recording.

use super::{SourceError, TimeWindow, WorkoutSource, WorkoutSummary};
use crate::export::types::{ActivityKind, HeartRateSample, LocationFix};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// A workout as stored in the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub activity: ActivityKind,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Route segments, each in recording order
    #[serde(default)]
    pub route_segments: Vec<Vec<LocationFix>>,
    #[serde(default)]
    pub heart_rate: Vec<HeartRateSample>,
}

impl WorkoutRecord {
    fn summary(&self) -> WorkoutSummary {
        WorkoutSummary {
            id: self.id,
            activity: self.activity,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkoutFile {
    #[serde(default)]
    workouts: Vec<WorkoutRecord>,
}

/// In-memory source loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonWorkoutSource {
    records: Vec<WorkoutRecord>,
}

impl JsonWorkoutSource {
    pub fn new(records: Vec<WorkoutRecord>) -> Self {
        Self { records }
    }

    /// Parse the JSON document format.
    pub fn from_json(content: &str) -> Result<Self, SourceError> {
        let file: WorkoutFile = serde_json::from_str(content)?;
        Ok(Self::new(file.workouts))
    }

    /// Load a JSON workout file from disk.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        let source = Self::from_json(&content)?;
        tracing::info!(
            "Loaded {} workouts from {}",
            source.records.len(),
            path.display()
        );
        Ok(source)
    }

    /// Serialize back to the JSON document format.
    pub fn to_json(&self) -> Result<String, SourceError> {
        let file = WorkoutFile {
            workouts: self.records.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    fn find(&self, id: Uuid) -> Result<&WorkoutRecord, SourceError> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .ok_or(SourceError::WorkoutNotFound(id))
    }
}

/// Check one route segment before it is merged into the full route.
async fn load_segment(
    index: usize,
    segment: &[LocationFix],
) -> Result<Vec<LocationFix>, SourceError> {
    for fix in segment {
        let valid = fix.latitude.is_finite()
            && fix.longitude.is_finite()
            && fix.elevation.is_finite()
            && (-90.0..=90.0).contains(&fix.latitude)
            && (-180.0..=180.0).contains(&fix.longitude);
        if !valid {
            return Err(SourceError::InvalidData(format!(
                "segment {} has invalid fix at {}: ({}, {}, {})",
                index, fix.timestamp, fix.latitude, fix.longitude, fix.elevation
            )));
        }
    }
    Ok(segment.to_vec())
}

impl WorkoutSource for JsonWorkoutSource {
    async fn list_workouts(&self) -> Result<Vec<WorkoutSummary>, SourceError> {
        let mut summaries: Vec<WorkoutSummary> = self
            .records
            .iter()
            .filter(|record| record.activity != ActivityKind::Other)
            .map(WorkoutRecord::summary)
            .collect();

        // Most recently finished first
        summaries.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        Ok(summaries)
    }

    async fn heart_rate_samples(
        &self,
        workout: &WorkoutSummary,
        window: TimeWindow,
    ) -> Result<Vec<HeartRateSample>, SourceError> {
        let record = self.find(workout.id)?;

        let mut samples: Vec<HeartRateSample> = record
            .heart_rate
            .iter()
            .filter(|sample| window.contains(sample.timestamp))
            .copied()
            .collect();
        samples.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(samples)
    }

    async fn route_locations(
        &self,
        workout: &WorkoutSummary,
    ) -> Result<Vec<LocationFix>, SourceError> {
        let record = self.find(workout.id)?;

        let segments = try_join_all(
            record
                .route_segments
                .iter()
                .enumerate()
                .map(|(index, segment)| load_segment(index, segment)),
        )
        .await?;

        // Segments may overlap or arrive out of order; stable sort keeps
        // equal timestamps in segment order.
        let mut locations: Vec<LocationFix> = segments.into_iter().flatten().collect();
        locations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(locations)
    }
}
