//! GPX export functionality for workouts.
//!
//! Documents are written as a stream of fragments: a header carrying the
//! metadata and opening the single track segment, one `trkpt` per location,
//! and a footer closing everything. [`GpxWriter`] enforces that order.

use crate::export::merge::{merge_heart_rate, TrackPoint};
use crate::export::types::{ExportConfig, ExportError, Workout};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};

/// GPX XML namespaces
const NS_GPX: &str = "http://www.topografix.com/GPX/1/1";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const NS_GPXTPX: &str = "http://www.garmin.com/xmlschemas/TrackPointExtension/v1";
const NS_GPXX: &str = "http://www.garmin.com/xmlschemas/GpxExtensions/v3";
const SCHEMA_LOCATION: &str = "http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd http://www.garmin.com/xmlschemas/GpxExtensions/v3 http://www.garmin.com/xmlschemas/GpxExtensionsv3.xsd http://www.garmin.com/xmlschemas/TrackPointExtension/v1 http://www.garmin.com/xmlschemas/TrackPointExtensionv1.xsd";

/// Where a [`GpxWriter`] is within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    /// Nothing written yet
    Prologue,
    /// Header written, trackpoints may follow
    Track,
    /// Footer written
    Closed,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Prologue => "prologue",
            Stage::Track => "track",
            Stage::Closed => "closed",
        }
    }
}

/// Streaming GPX document writer.
pub struct GpxWriter<W: Write> {
    writer: Writer<W>,
    stage: Stage,
    trackpoints: usize,
}

impl<W: Write> GpxWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
            stage: Stage::Prologue,
            trackpoints: 0,
        }
    }

    /// Number of trackpoints written so far.
    pub fn trackpoints(&self) -> usize {
        self.trackpoints
    }

    /// Write the XML declaration, root element, metadata and open the track segment.
    pub fn write_header(
        &mut self,
        title: &str,
        started_at: DateTime<Utc>,
        creator: &str,
    ) -> Result<(), ExportError> {
        self.expect(Stage::Prologue)?;

        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut root = BytesStart::new("gpx");
        root.push_attribute(("creator", creator));
        root.push_attribute(("version", "1.1"));
        root.push_attribute(("xmlns", NS_GPX));
        root.push_attribute(("xmlns:xsi", NS_XSI));
        root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
        root.push_attribute(("xmlns:gpxtpx", NS_GPXTPX));
        root.push_attribute(("xmlns:gpxx", NS_GPXX));
        self.writer.write_event(Event::Start(root))?;

        self.writer
            .write_event(Event::Start(BytesStart::new("metadata")))?;
        write_element(&mut self.writer, "time", &format_time(started_at))?;
        self.writer
            .write_event(Event::End(BytesEnd::new("metadata")))?;

        self.writer.write_event(Event::Start(BytesStart::new("trk")))?;
        write_element(&mut self.writer, "name", title)?;
        self.writer
            .write_event(Event::Start(BytesStart::new("trkseg")))?;

        self.stage = Stage::Track;
        Ok(())
    }

    /// Write a single trackpoint.
    pub fn write_trackpoint(&mut self, point: &TrackPoint<'_>) -> Result<(), ExportError> {
        self.expect(Stage::Track)?;

        let location = point.location;
        check_finite("latitude", location.latitude)?;
        check_finite("longitude", location.longitude)?;
        check_finite("elevation", location.elevation)?;
        if let Some(bpm) = point.heart_rate {
            check_finite("heart rate", bpm)?;
        }

        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();

        let mut trkpt = BytesStart::new("trkpt");
        trkpt.push_attribute(("lat", lat.as_str()));
        trkpt.push_attribute(("lon", lon.as_str()));
        self.writer.write_event(Event::Start(trkpt))?;

        // Elevation is written as a magnitude; below-sea-level fixes lose their sign.
        write_element(
            &mut self.writer,
            "ele",
            &location.elevation.abs().to_string(),
        )?;
        write_element(&mut self.writer, "time", &format_time(location.timestamp))?;

        if let Some(bpm) = point.heart_rate {
            write_heart_rate_extension(&mut self.writer, bpm)?;
        }

        self.writer
            .write_event(Event::End(BytesEnd::new("trkpt")))?;

        self.trackpoints += 1;
        Ok(())
    }

    /// Close the track segment, track and root element.
    pub fn write_footer(&mut self) -> Result<(), ExportError> {
        self.expect(Stage::Track)?;

        self.writer
            .write_event(Event::End(BytesEnd::new("trkseg")))?;
        self.writer.write_event(Event::End(BytesEnd::new("trk")))?;
        self.writer.write_event(Event::End(BytesEnd::new("gpx")))?;
        self.writer.get_mut().write_all(b"\n")?;

        self.stage = Stage::Closed;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), ExportError> {
        self.writer.get_mut().flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn expect(&self, expected: Stage) -> Result<(), ExportError> {
        if self.stage != expected {
            return Err(ExportError::InvalidState {
                expected: expected.as_str(),
                actual: self.stage.as_str(),
            });
        }
        Ok(())
    }
}

/// `xsd:decimal` has no spelling for NaN or infinity.
fn check_finite(field: &str, value: f64) -> Result<(), ExportError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ExportError::EncodingFailed(format!(
            "{} is not a finite number: {}",
            field, value
        )))
    }
}

/// Write the Garmin TrackPointExtension block carrying heart rate.
fn write_heart_rate_extension<W: Write>(
    writer: &mut Writer<W>,
    bpm: f64,
) -> Result<(), ExportError> {
    writer.write_event(Event::Start(BytesStart::new("extensions")))?;
    writer.write_event(Event::Start(BytesStart::new("gpxtpx:TrackPointExtension")))?;

    write_element(writer, "gpxtpx:hr", &bpm.to_string())?;

    writer.write_event(Event::End(BytesEnd::new("gpxtpx:TrackPointExtension")))?;
    writer.write_event(Event::End(BytesEnd::new("extensions")))?;

    Ok(())
}

/// Write a simple element with text content.
fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), ExportError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;

    Ok(())
}

/// ISO-8601 UTC timestamp with second precision, e.g. `2017-11-30T14:05:00Z`.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render a whole workout to an in-memory GPX document.
pub fn export_gpx(workout: &Workout, config: &ExportConfig) -> Result<String, ExportError> {
    let mut gpx = GpxWriter::new(Cursor::new(Vec::new()));

    gpx.write_header(&workout.name(config)?, workout.started_at(), &config.creator)?;
    for point in merge_heart_rate(workout.locations(), workout.heart_rate()) {
        gpx.write_trackpoint(&point)?;
    }
    gpx.write_footer()?;

    let result = gpx.into_inner().into_inner();
    String::from_utf8(result).map_err(|e| ExportError::EncodingFailed(e.to_string()))
}
