//! From workout source to GPX files.

use crate::export::session::GpxExporter;
use crate::export::types::ExportError;
use crate::source::{load_workout, SourceError, WorkoutSource, WorkoutSummary};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors exporting a workout from a source.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The data backend failed; nothing was written
    #[error("Backend query failed: {0}")]
    Backend(#[from] SourceError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Outcome of exporting one workout as part of a batch.
#[derive(Debug)]
pub struct ExportOutcome {
    pub workout_id: Uuid,
    pub result: Result<PathBuf, PipelineError>,
}

/// Loads workouts from a source and writes them as GPX files.
pub struct ExportPipeline<S: WorkoutSource> {
    source: S,
    exporter: GpxExporter,
    output_dir: PathBuf,
}

impl<S: WorkoutSource> ExportPipeline<S> {
    pub fn new(source: S, exporter: GpxExporter, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            exporter,
            output_dir: output_dir.into(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Export a single listed workout.
    pub async fn export(&self, summary: &WorkoutSummary) -> Result<PathBuf, PipelineError> {
        let workout = load_workout(&self.source, summary).await?;
        Ok(self.exporter.export(&workout, &self.output_dir)?)
    }

    /// Export the workout with the given id.
    pub async fn export_by_id(&self, id: Uuid) -> Result<PathBuf, PipelineError> {
        let workouts = self.source.list_workouts().await?;
        let summary = workouts
            .iter()
            .find(|summary| summary.id == id)
            .ok_or(SourceError::WorkoutNotFound(id))?;
        self.export(summary).await
    }

    /// Export every listed workout one after another.
    ///
    /// A failure only affects its own workout; the rest are still exported.
    pub async fn export_all(&self) -> Result<Vec<ExportOutcome>, PipelineError> {
        let workouts = self.source.list_workouts().await?;
        let mut outcomes = Vec::with_capacity(workouts.len());

        for summary in &workouts {
            let result = self.export(summary).await;
            if let Err(e) = &result {
                tracing::warn!("Export of workout {} failed: {}", summary.id, e);
            }
            outcomes.push(ExportOutcome {
                workout_id: summary.id,
                result,
            });
        }

        Ok(outcomes)
    }
}
