//! Export use-case service.
//!
//! # Responsibility
//! - Sequence fetch → build → render for one export run.
//! - Map every stage failure into one `ExportError` taxonomy.
//! - Report summary counts independent of how many notes were rendered.
//!
//! # Invariants
//! - Stages run strictly in order; a failed stage stops the run.
//! - The output file is opened only after the hierarchy is fully built and
//!   every printed timestamp is known to be representable.
//! - A run that fails while writing removes its partial output file.

use crate::db::{open_source_db, DbError};
use crate::hierarchy::{build_hierarchy, BuildError, Hierarchy};
use crate::model::entry::EntryId;
use crate::render::{RenderError, ReportRenderer};
use crate::repo::source_repo::{RepoError, SourceRepository, SqliteSourceRepository};
use chrono::{Local, TimeZone};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Errors from one export run.
#[derive(Debug)]
pub enum ExportError {
    /// Source database cannot be opened.
    Connection { path: PathBuf, source: DbError },
    /// One of the fixed source queries failed.
    Query(RepoError),
    /// Source rows reference ids that do not resolve.
    DataIntegrity(BuildError),
    /// An entry time cannot be printed as a calendar date.
    InvalidTimestamp { entry_id: EntryId, millis: i64 },
    /// Output file cannot be created.
    OutputOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Report could not be written to the output file.
    OutputWrite { path: PathBuf, source: RenderError },
    /// Report could not be written to a caller-provided sink.
    Render(RenderError),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { path, .. } => {
                write!(f, "cannot open database file `{}`", path.display())
            }
            Self::Query(err) => write!(f, "{err}"),
            Self::DataIntegrity(err) => write!(f, "{err}"),
            Self::InvalidTimestamp { entry_id, millis } => {
                write!(f, "entry {entry_id} has out-of-range timestamp {millis}")
            }
            Self::OutputOpen { path, .. } => {
                write!(f, "cannot write output file `{}`", path.display())
            }
            Self::OutputWrite { path, source } => {
                write!(f, "cannot write output file `{}`: {source}", path.display())
            }
            Self::Render(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::Query(err) => Some(err),
            Self::DataIntegrity(err) => Some(err),
            Self::InvalidTimestamp { .. } => None,
            Self::OutputOpen { source, .. } => Some(source),
            Self::OutputWrite { source, .. } => Some(source),
            Self::Render(err) => Some(err),
        }
    }
}

impl From<RepoError> for ExportError {
    fn from(value: RepoError) -> Self {
        Self::Query(value)
    }
}

impl From<BuildError> for ExportError {
    fn from(value: BuildError) -> Self {
        Self::DataIntegrity(value)
    }
}

impl From<RenderError> for ExportError {
    fn from(value: RenderError) -> Self {
        match value {
            RenderError::InvalidTimestamp { entry_id, millis } => {
                Self::InvalidTimestamp { entry_id, millis }
            }
            err @ RenderError::Io(_) => Self::Render(err),
        }
    }
}

/// Counts reported after a successful export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// All loaded spaces.
    pub spaces: usize,
    /// All loaded top-level notes, including notes linked to no space.
    pub notes: usize,
    /// All loaded comments.
    pub comments: usize,
}

impl From<&Hierarchy> for ExportSummary {
    fn from(hierarchy: &Hierarchy) -> Self {
        Self {
            spaces: hierarchy.space_count(),
            notes: hierarchy.note_count(),
            comments: hierarchy.comment_count(),
        }
    }
}

impl Display for ExportSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Spaces: {}", self.spaces)?;
        writeln!(f, "Notes: {}", self.notes)?;
        write!(f, "Comments: {}", self.comments)
    }
}

/// Export service facade over a source repository.
pub struct ExportService<R: SourceRepository> {
    repo: R,
}

impl<R: SourceRepository> ExportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Fetches the three row sets and links them into a hierarchy.
    pub fn load(&self) -> Result<Hierarchy, ExportError> {
        let started_at = Instant::now();
        info!("event=export_load module=service status=start");

        let result = self.fetch_and_build();
        match &result {
            Ok(_) => info!(
                "event=export_load module=service status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=export_load module=service status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Runs a full export into `sink`, rendering times in `tz`.
    pub fn export<W, Tz>(&self, sink: &mut W, tz: Tz) -> Result<ExportSummary, ExportError>
    where
        W: Write,
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let hierarchy = self.load()?;
        ReportRenderer::new(tz).render(&hierarchy, sink)?;
        Ok(ExportSummary::from(&hierarchy))
    }

    fn fetch_and_build(&self) -> Result<Hierarchy, ExportError> {
        let notes = self.repo.fetch_notes()?;
        let spaces = self.repo.fetch_spaces()?;
        let links = self.repo.fetch_links()?;
        Ok(build_hierarchy(notes, spaces, &links)?)
    }
}

/// Exports the notes database at `db_path` into a text report at
/// `output_path`, rendering times in the local time zone.
///
/// # Side effects
/// - Opens `db_path` read-only; creates or truncates `output_path`.
/// - Removes `output_path` again when writing the report fails.
///
/// # Errors
/// - `Connection` when the database cannot be opened.
/// - `Query` when a source query fails.
/// - `DataIntegrity` when rows reference unknown notes or spaces.
/// - `InvalidTimestamp` when a printed time is out of range; checked before
///   the output file is created.
/// - `OutputOpen` / `OutputWrite` when the report file cannot be written.
pub fn export_database(
    db_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<ExportSummary, ExportError> {
    let db_path = db_path.as_ref();
    let output_path = output_path.as_ref();
    let started_at = Instant::now();
    info!("event=export_run module=service status=start");

    let hierarchy = {
        let conn = open_source_db(db_path).map_err(|source| ExportError::Connection {
            path: db_path.to_path_buf(),
            source,
        })?;
        let repo = SqliteSourceRepository::new(&conn);
        let service = ExportService::new(repo);
        service.load()?
    };

    let renderer = ReportRenderer::new(Local);
    renderer.check_timestamps(&hierarchy).map_err(|err| {
        error!(
            "event=export_run module=service status=error error_code=invalid_timestamp error={}",
            err
        );
        ExportError::from(err)
    })?;

    let file = File::create(output_path).map_err(|source| {
        error!(
            "event=export_run module=service status=error error_code=output_open_failed error={}",
            source
        );
        ExportError::OutputOpen {
            path: output_path.to_path_buf(),
            source,
        }
    })?;
    let mut writer = BufWriter::new(file);

    if let Err(source) = renderer.render(&hierarchy, &mut writer) {
        drop(writer);
        if let Err(err) = std::fs::remove_file(output_path) {
            warn!(
                "event=export_run module=service status=warn error_code=partial_output_kept error={}",
                err
            );
        }
        return Err(ExportError::OutputWrite {
            path: output_path.to_path_buf(),
            source,
        });
    }

    let summary = ExportSummary::from(&hierarchy);
    info!(
        "event=export_run module=service status=ok spaces={} notes={} comments={} duration_ms={}",
        summary.spaces,
        summary.notes,
        summary.comments,
        started_at.elapsed().as_millis()
    );
    Ok(summary)
}
