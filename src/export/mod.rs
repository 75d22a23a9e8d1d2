//! Workout export: heart-rate merge, GPX rendering and file output.

pub mod exporter_gpx;
pub mod inspect;
pub mod merge;
pub mod session;
pub mod types;

pub use exporter_gpx::{export_gpx, GpxWriter};
pub use inspect::{inspect_gpx, inspect_gpx_file, GpxSummary, InspectError};
pub use merge::{merge_heart_rate, HeartRateMerge, TrackPoint};
pub use session::{generate_gpx_filename, ExportSession, ExportState, GpxExporter};
pub use types::{ActivityKind, ExportConfig, ExportError, HeartRateSample, LocationFix, Workout};
