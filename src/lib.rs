//! Workout GPX - heart-rate annotated GPX export
//!
//! Converts a recorded workout, a time-ordered list of GPS fixes plus an
//! independently sampled heart-rate series, into a single GPX 1.1 track with
//! Garmin TrackPointExtension heart-rate values, ready for import into
//! third-party fitness tools.

pub mod export;
pub mod pipeline;
pub mod source;
pub mod storage;

// Re-export commonly used types
pub use export::session::GpxExporter;
pub use export::types::{
    ActivityKind, ExportConfig, ExportError, HeartRateSample, LocationFix, Workout,
};
pub use pipeline::{ExportPipeline, PipelineError};
pub use source::{JsonWorkoutSource, WorkoutSource, WorkoutSummary};
pub use storage::config::AppConfig;
