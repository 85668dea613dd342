//! Fixed-layout plain-text report writer.
//!
//! # Responsibility
//! - Walk a built `Hierarchy` and write the space/note/comment report.
//! - Format epoch-millisecond timestamps in a caller-provided time zone.
//!
//! # Invariants
//! - Layout is fixed; there is no configurable output format.
//! - The modification line is written iff
//!   `modified_at - created_at >= MODIFICATION_LINE_THRESHOLD_MS`.
//! - The sink is only written to and is flushed before returning `Ok`.

use crate::hierarchy::Hierarchy;
use crate::model::entry::{Entry, EntryId, Space};
use chrono::TimeZone;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::time::Instant;

/// Qt-style `dd.MM.yyyy hh:mm` (24-hour clock).
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Minimum edit distance, in milliseconds, that earns a modification line.
///
/// The literal value is 10 hours.
pub const MODIFICATION_LINE_THRESHOLD_MS: i64 = 10 * 60 * 3600;

/// Errors from report rendering.
#[derive(Debug)]
pub enum RenderError {
    /// Sink write or flush failed.
    Io(std::io::Error),
    /// Timestamp cannot be represented as a calendar date.
    InvalidTimestamp { entry_id: EntryId, millis: i64 },
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::InvalidTimestamp { entry_id, millis } => write!(
                f,
                "entry {entry_id} has out-of-range timestamp {millis}"
            ),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidTimestamp { .. } => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Returns whether `entry` was edited long enough after creation to show
/// its modification time.
pub fn shows_modification_line(entry: &Entry) -> bool {
    entry.modified_at.saturating_sub(entry.created_at) >= MODIFICATION_LINE_THRESHOLD_MS
}

/// Report writer bound to one display time zone.
pub struct ReportRenderer<Tz: TimeZone> {
    tz: Tz,
}

impl<Tz> ReportRenderer<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Writes the whole report for `hierarchy` into `sink` and flushes it.
    ///
    /// # Errors
    /// - `Io` when the sink rejects a write or flush.
    /// - `InvalidTimestamp` when an entry time is outside the calendar range.
    pub fn render<W: Write>(&self, hierarchy: &Hierarchy, sink: &mut W) -> Result<(), RenderError> {
        let started_at = Instant::now();
        let result = self.write_spaces(hierarchy, sink).and_then(|()| {
            sink.flush()?;
            Ok(())
        });
        match &result {
            Ok(()) => info!(
                "event=report_render module=render status=ok spaces={} duration_ms={}",
                hierarchy.space_count(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=report_render module=render status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Verifies that every timestamp the report would print is representable,
    /// without writing anything.
    ///
    /// # Errors
    /// - `InvalidTimestamp` for the first entry time outside the calendar range.
    pub fn check_timestamps(&self, hierarchy: &Hierarchy) -> Result<(), RenderError> {
        for space in hierarchy.spaces() {
            for note in hierarchy.space_notes(space) {
                self.entry_time(note, note.created_at)?;
                if shows_modification_line(note) {
                    self.entry_time(note, note.modified_at)?;
                }
                for comment in hierarchy.comments(note) {
                    self.entry_time(comment, comment.created_at)?;
                }
            }
        }
        Ok(())
    }

    /// Formats one epoch-millisecond timestamp in this renderer's zone.
    pub fn format_timestamp(&self, millis: i64) -> Option<String> {
        self.tz
            .timestamp_millis_opt(millis)
            .single()
            .map(|value| value.format(TIMESTAMP_FORMAT).to_string())
    }

    fn write_spaces<W: Write>(&self, hierarchy: &Hierarchy, sink: &mut W) -> Result<(), RenderError> {
        for space in hierarchy.spaces() {
            self.write_space(hierarchy, space, sink)?;
        }
        Ok(())
    }

    fn write_space<W: Write>(
        &self,
        hierarchy: &Hierarchy,
        space: &Space,
        sink: &mut W,
    ) -> Result<(), RenderError> {
        writeln!(sink, "Space<{}>", space.name)?;
        writeln!(sink, "// Notes: {}", space.notes.len())?;
        writeln!(sink)?;
        for note in hierarchy.space_notes(space) {
            self.write_note(hierarchy, note, sink)?;
            writeln!(sink)?;
        }
        writeln!(sink)?;
        Ok(())
    }

    fn write_note<W: Write>(
        &self,
        hierarchy: &Hierarchy,
        note: &Entry,
        sink: &mut W,
    ) -> Result<(), RenderError> {
        writeln!(sink, "{}", self.entry_time(note, note.created_at)?)?;
        if shows_modification_line(note) {
            writeln!(sink, "{}", self.entry_time(note, note.modified_at)?)?;
        }
        writeln!(sink, "{}", note.text)?;

        for comment in hierarchy.comments(note) {
            writeln!(sink, "Upd ({})", self.entry_time(comment, comment.created_at)?)?;
            writeln!(sink, "{}", comment.text)?;
        }
        Ok(())
    }

    fn entry_time(&self, entry: &Entry, millis: i64) -> Result<String, RenderError> {
        self.format_timestamp(millis)
            .ok_or(RenderError::InvalidTimestamp {
                entry_id: entry.id,
                millis,
            })
    }
}
