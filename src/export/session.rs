//! Export orchestration: one workout to one GPX file.
//!
//! An [`ExportSession`] owns the destination file for its whole lifetime and
//! is stepped through header, trackpoints and footer. Callers that need to
//! interrupt an export can check between [`ExportSession::write_next_trackpoint`]
//! calls and simply drop the session.

use crate::export::exporter_gpx::GpxWriter;
use crate::export::merge::HeartRateMerge;
use crate::export::types::{ExportConfig, ExportError, Workout};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Lifecycle of a single export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// Destination name derived, nothing touched on disk
    Idle,
    /// Prior file removed and destination opened
    Preparing,
    /// Header written
    WritingHeader,
    /// Some trackpoints written
    WritingTrackpoints { written: usize },
    /// Footer being written and file closed
    WritingFooter,
    /// File complete
    Done,
    /// Export aborted; the file handle has been released
    Failed,
}

impl ExportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportState::Idle => "idle",
            ExportState::Preparing => "preparing",
            ExportState::WritingHeader => "writing header",
            ExportState::WritingTrackpoints { .. } => "writing trackpoints",
            ExportState::WritingFooter => "writing footer",
            ExportState::Done => "done",
            ExportState::Failed => "failed",
        }
    }

    /// True for `Done` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Done | ExportState::Failed)
    }
}

impl std::fmt::Display for ExportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Wraps the opened destination file in the sink the document is written to.
type SinkFactory<'a, W> = Box<dyn Fn(File) -> W + 'a>;

/// A single, steppable export of a workout to disk.
pub struct ExportSession<'a, W: Write = BufWriter<File>> {
    workout: &'a Workout,
    config: &'a ExportConfig,
    output_dir: PathBuf,
    destination: PathBuf,
    staging: Option<PathBuf>,
    sink: SinkFactory<'a, W>,
    writer: Option<GpxWriter<W>>,
    merge: HeartRateMerge<'a>,
    state: ExportState,
}

impl<'a> ExportSession<'a> {
    /// Create a session writing into `output_dir`. Nothing touches the disk yet.
    pub fn new(
        workout: &'a Workout,
        config: &'a ExportConfig,
        output_dir: &Path,
    ) -> Result<Self, ExportError> {
        Self::with_sink(workout, config, output_dir, BufWriter::new)
    }
}

impl<'a, W: Write> ExportSession<'a, W> {
    /// Create a session whose destination file is written through `sink`.
    pub fn with_sink<F>(
        workout: &'a Workout,
        config: &'a ExportConfig,
        output_dir: &Path,
        sink: F,
    ) -> Result<Self, ExportError>
    where
        F: Fn(File) -> W + 'a,
    {
        let file_name = generate_gpx_filename(workout, config)?;
        let destination = output_dir.join(&file_name);
        let staging = config
            .atomic_write
            .then(|| output_dir.join(format!(".{}.partial", file_name)));

        Ok(Self {
            workout,
            config,
            output_dir: output_dir.to_path_buf(),
            destination,
            staging,
            sink: Box::new(sink),
            writer: None,
            merge: HeartRateMerge::new(workout.locations(), workout.heart_rate()),
            state: ExportState::Idle,
        })
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Final location of the exported file.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Remove any previous export with the same name and open the destination.
    pub fn prepare(&mut self) -> Result<(), ExportError> {
        self.expect(self.state == ExportState::Idle, "idle")?;
        self.transition(ExportState::Preparing);

        match self.open_destination() {
            Ok(file) => {
                self.writer = Some(GpxWriter::new((self.sink)(file)));
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Write the document header.
    pub fn write_header(&mut self) -> Result<(), ExportError> {
        self.expect(self.state == ExportState::Preparing, "preparing")?;

        let missing = self.missing_writer();
        let result = match (self.workout.name(self.config), self.writer.as_mut()) {
            (Ok(title), Some(writer)) => {
                writer.write_header(&title, self.workout.started_at(), &self.config.creator)
            }
            (Err(e), _) => Err(e),
            (_, None) => Err(missing),
        };
        result.map_err(|e| self.fail(e))?;

        self.transition(ExportState::WritingHeader);
        Ok(())
    }

    /// Write the next trackpoint. Returns `false` once every location has been written.
    pub fn write_next_trackpoint(&mut self) -> Result<bool, ExportError> {
        let written = match self.state {
            ExportState::WritingHeader => 0,
            ExportState::WritingTrackpoints { written } => written,
            _ => return Err(self.invalid("writing header or trackpoints")),
        };

        let Some(point) = self.merge.next() else {
            return Ok(false);
        };

        let missing = self.missing_writer();
        let result = match self.writer.as_mut() {
            Some(writer) => writer.write_trackpoint(&point),
            None => Err(missing),
        };
        result.map_err(|e| self.fail(e))?;

        self.state = ExportState::WritingTrackpoints {
            written: written + 1,
        };
        Ok(true)
    }

    /// Write any remaining trackpoints and the footer, close the file and
    /// return its path.
    pub fn finish(&mut self) -> Result<PathBuf, ExportError> {
        self.expect(
            matches!(
                self.state,
                ExportState::WritingHeader | ExportState::WritingTrackpoints { .. }
            ),
            "writing header or trackpoints",
        )?;

        while self.write_next_trackpoint()? {}

        let written = match self.state {
            ExportState::WritingTrackpoints { written } => written,
            _ => 0,
        };

        self.transition(ExportState::WritingFooter);
        if let Err(e) = self.close() {
            return Err(self.fail(e));
        }
        self.transition(ExportState::Done);

        tracing::info!(
            "Exported {} trackpoints to {}",
            written,
            self.destination.display()
        );
        Ok(self.destination.clone())
    }

    fn open_destination(&self) -> Result<File, ExportError> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| prepare_error(&self.output_dir, e))?;

        let target = match &self.staging {
            // The previous export stays in place until the rename.
            Some(staging) => staging,
            None => {
                if self.destination.exists() {
                    fs::remove_file(&self.destination)
                        .map_err(|e| prepare_error(&self.destination, e))?;
                    tracing::info!("Replaced previous export {}", self.destination.display());
                }
                &self.destination
            }
        };

        File::create(target).map_err(|e| prepare_error(target, e))
    }

    fn close(&mut self) -> Result<(), ExportError> {
        let mut writer = self.writer.take().ok_or_else(|| self.missing_writer())?;
        writer.write_footer()?;
        writer.flush()?;
        drop(writer);

        if let Some(staging) = &self.staging {
            fs::rename(staging, &self.destination)?;
        }
        Ok(())
    }

    /// Release the file, drop any staging file and enter `Failed`.
    fn fail(&mut self, err: ExportError) -> ExportError {
        self.writer = None;
        self.discard_staging();
        tracing::warn!(
            "Export to {} failed while {}: {}",
            self.destination.display(),
            self.state,
            err
        );
        self.state = ExportState::Failed;
        err
    }

    fn discard_staging(&self) {
        if let Some(staging) = &self.staging {
            if staging.exists() {
                if let Err(e) = fs::remove_file(staging) {
                    tracing::debug!("Could not remove {}: {}", staging.display(), e);
                }
            }
        }
    }

    fn transition(&mut self, next: ExportState) {
        tracing::debug!("Export state {} -> {}", self.state, next);
        self.state = next;
    }

    fn expect(&self, ok: bool, expected: &'static str) -> Result<(), ExportError> {
        if ok {
            Ok(())
        } else {
            Err(self.invalid(expected))
        }
    }

    fn invalid(&self, expected: &'static str) -> ExportError {
        ExportError::InvalidState {
            expected,
            actual: self.state.as_str(),
        }
    }

    fn missing_writer(&self) -> ExportError {
        ExportError::InvalidState {
            expected: "open destination",
            actual: self.state.as_str(),
        }
    }
}

impl<W: Write> Drop for ExportSession<'_, W> {
    fn drop(&mut self) {
        if !self.state.is_terminal() && self.state != ExportState::Idle {
            self.writer = None;
            self.discard_staging();
        }
    }
}

fn prepare_error(path: &Path, err: std::io::Error) -> ExportError {
    ExportError::ResourcePreparationFailed(format!("{}: {}", path.display(), err))
}

/// Exports workouts to GPX files with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct GpxExporter {
    config: ExportConfig,
}

impl GpxExporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Start a session for callers that want to step the export themselves.
    pub fn session<'a>(
        &'a self,
        workout: &'a Workout,
        output_dir: &Path,
    ) -> Result<ExportSession<'a>, ExportError> {
        ExportSession::new(workout, &self.config, output_dir)
    }

    /// Export a workout into `output_dir`, replacing any earlier export with
    /// the same name. Returns the path of the written file.
    pub fn export(&self, workout: &Workout, output_dir: &Path) -> Result<PathBuf, ExportError> {
        tracing::info!(
            "Exporting {} workout with {} locations and {} heart rate samples",
            workout.activity(),
            workout.locations().len(),
            workout.heart_rate().len()
        );

        let mut session = self.session(workout, output_dir)?;
        session.prepare()?;
        session.write_header()?;
        session.finish()
    }
}

/// File name for an export: `"<yyyy-MM-dd HH.mm.ss> - <label>.gpx"`.
pub fn generate_gpx_filename(
    workout: &Workout,
    config: &ExportConfig,
) -> Result<String, ExportError> {
    let timestamp = config
        .render_local(workout.started_at(), &config.file_time_format)
        .map_err(|_| {
            ExportError::ResourcePreparationFailed(format!(
                "invalid file name time format: {}",
                config.file_time_format
            ))
        })?;
    Ok(format!("{} - {}.gpx", timestamp, workout.activity().label()))
}
