//! Read back an exported GPX document and summarise it.

use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Summary of a GPX document's track content.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxSummary {
    pub creator: Option<String>,
    /// Time recorded in the document metadata
    pub started_at: Option<DateTime<Utc>>,
    pub track_count: usize,
    pub segment_count: usize,
    /// Name of the first track
    pub track_name: Option<String>,
    /// Trackpoints across all tracks and segments
    pub point_count: usize,
    pub first_point_at: Option<DateTime<Utc>>,
    pub last_point_at: Option<DateTime<Utc>>,
}

/// Errors reading a GPX document back.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("GPX parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convert gpx Time to chrono DateTime
fn gpx_time_to_chrono(time: gpx::Time) -> Option<DateTime<Utc>> {
    // gpx::Time wraps time::OffsetDateTime, convert via string format
    let formatted = time.format().ok()?;
    DateTime::parse_from_rfc3339(&formatted)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse GPX content and summarise its tracks.
pub fn inspect_gpx(content: &[u8]) -> Result<GpxSummary, InspectError> {
    let content_str =
        std::str::from_utf8(content).map_err(|e| InspectError::InvalidUtf8(e.to_string()))?;

    let gpx_data: gpx::Gpx = gpx::read(content_str.as_bytes())
        .map_err(|e| InspectError::ParseError(e.to_string()))?;

    let points: Vec<&gpx::Waypoint> = gpx_data
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .collect();

    Ok(GpxSummary {
        creator: gpx_data.creator.clone(),
        started_at: gpx_data
            .metadata
            .as_ref()
            .and_then(|m| m.time.clone())
            .and_then(gpx_time_to_chrono),
        track_count: gpx_data.tracks.len(),
        segment_count: gpx_data.tracks.iter().map(|t| t.segments.len()).sum(),
        track_name: gpx_data.tracks.first().and_then(|t| t.name.clone()),
        point_count: points.len(),
        first_point_at: points
            .first()
            .and_then(|p| p.time.clone())
            .and_then(gpx_time_to_chrono),
        last_point_at: points
            .last()
            .and_then(|p| p.time.clone())
            .and_then(gpx_time_to_chrono),
    })
}

/// Read and summarise a GPX file.
pub fn inspect_gpx_file(path: &Path) -> Result<GpxSummary, InspectError> {
    let content = std::fs::read(path)?;
    inspect_gpx(&content)
}
