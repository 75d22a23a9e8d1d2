//! Export types for workout data and GPX output.
//!
//! Location fixes and heart-rate samples are the two independently sampled
//! time series a workout carries. Both are expected in ascending timestamp
//! order; nothing in the export path re-sorts them.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of activity a workout was recorded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Cycling,
    Running,
    Walking,
    Hiking,
    Swimming,
    /// Anything the exporter has no dedicated label for
    #[default]
    Other,
}

impl ActivityKind {
    /// Label used in the document title and the generated file name.
    pub fn label(&self) -> &'static str {
        match self {
            ActivityKind::Cycling => "Cycle",
            ActivityKind::Running => "Run",
            ActivityKind::Walking => "Walk",
            _ => "Workout",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::Cycling => write!(f, "Cycling"),
            ActivityKind::Running => write!(f, "Running"),
            ActivityKind::Walking => write!(f, "Walking"),
            ActivityKind::Hiking => write!(f, "Hiking"),
            ActivityKind::Swimming => write!(f, "Swimming"),
            ActivityKind::Other => write!(f, "Other"),
        }
    }
}

/// A single GPS fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Signed elevation in meters
    pub elevation: f64,
    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, elevation: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            timestamp,
        }
    }
}

/// A single heart-rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    /// Heart rate in beats per minute
    pub bpm: f64,
    /// Start of the sample
    pub timestamp: DateTime<Utc>,
}

impl HeartRateSample {
    pub fn new(bpm: f64, timestamp: DateTime<Utc>) -> Self {
        Self { bpm, timestamp }
    }
}

/// A workout ready for export.
///
/// Built once from the data backend's results and consumed by a single export.
#[derive(Debug, Clone)]
pub struct Workout {
    activity: ActivityKind,
    started_at: DateTime<Utc>,
    locations: Vec<LocationFix>,
    heart_rate: Vec<HeartRateSample>,
}

impl Workout {
    /// Create a workout, falling back to the current time as its start when
    /// the route is empty.
    pub fn new(
        activity: ActivityKind,
        locations: Vec<LocationFix>,
        heart_rate: Vec<HeartRateSample>,
    ) -> Self {
        Self::with_fallback_start(activity, locations, heart_rate, Utc::now())
    }

    /// Create a workout with an explicit start time for routes without fixes.
    pub fn with_fallback_start(
        activity: ActivityKind,
        locations: Vec<LocationFix>,
        heart_rate: Vec<HeartRateSample>,
        fallback_start: DateTime<Utc>,
    ) -> Self {
        let started_at = locations
            .first()
            .map(|fix| fix.timestamp)
            .unwrap_or(fallback_start);

        Self {
            activity,
            started_at,
            locations,
            heart_rate,
        }
    }

    pub fn activity(&self) -> ActivityKind {
        self.activity
    }

    /// Timestamp of the first fix, or the fallback start.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn locations(&self) -> &[LocationFix] {
        &self.locations
    }

    pub fn heart_rate(&self) -> &[HeartRateSample] {
        &self.heart_rate
    }

    /// Document title: `"<label> - <start time>"`.
    pub fn name(&self, config: &ExportConfig) -> Result<String, ExportError> {
        let started = config
            .render_local(self.started_at, &config.title_time_format)
            .map_err(|_| {
                ExportError::EncodingFailed(format!(
                    "invalid title time format: {}",
                    config.title_time_format
                ))
            })?;
        Ok(format!("{} - {}", self.activity.label(), started))
    }
}

/// Formatting and output options for GPX export.
///
/// All locale-dependent formatting is carried here so output does not depend
/// on process-wide state.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Value of the `creator` attribute on the root element
    pub creator: String,
    /// strftime pattern for the start time in the document title
    pub title_time_format: String,
    /// strftime pattern for the start time in the file name
    pub file_time_format: String,
    /// Offset applied to the title and file name times
    pub utc_offset: FixedOffset,
    /// Write to a staging file and rename it into place on success
    pub atomic_write: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            creator: "workout-gpx".to_string(),
            title_time_format: "%b %-d, %Y at %-I:%M %p".to_string(),
            file_time_format: "%Y-%m-%d %H.%M.%S".to_string(),
            utc_offset: Utc.fix(),
            atomic_write: false,
        }
    }
}

impl ExportConfig {
    /// Convert a UTC instant to the configured offset.
    pub fn local_time(&self, time: DateTime<Utc>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.utc_offset)
    }

    /// Render `time` at the configured offset with a strftime pattern.
    ///
    /// Fails instead of panicking when chrono cannot render the pattern.
    pub fn render_local(
        &self,
        time: DateTime<Utc>,
        pattern: &str,
    ) -> Result<String, std::fmt::Error> {
        use std::fmt::Write;

        let mut out = String::new();
        write!(out, "{}", self.local_time(time).format(pattern))?;
        Ok(out)
    }

    /// Builder-style setter for the offset.
    pub fn with_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// Builder-style setter for staged writes.
    pub fn with_atomic_write(mut self, atomic_write: bool) -> Self {
        self.atomic_write = atomic_write;
        self
    }
}

/// Errors during workout export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Destination could not be created or the previous file replaced
    #[error("Failed to prepare destination: {0}")]
    ResourcePreparationFailed(String),

    /// Writing a fragment failed
    #[error("Failed to write data: {0}")]
    WriteFailed(String),

    /// A fragment could not be encoded
    #[error("Failed to encode data: {0}")]
    EncodingFailed(String),

    /// A step was called out of order
    #[error("Invalid export state: expected {expected}, was {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// True for failures that happened while fragments were being written.
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            ExportError::WriteFailed(_) | ExportError::EncodingFailed(_) | ExportError::Io(_)
        )
    }
}

impl From<quick_xml::Error> for ExportError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(e) => ExportError::WriteFailed(e.to_string()),
            other => ExportError::EncodingFailed(other.to_string()),
        }
    }
}
