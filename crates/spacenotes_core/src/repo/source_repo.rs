//! Source row fetcher contracts and SQLite implementation.
//!
//! # Responsibility
//! - Run the three fixed source queries (`notes`, `streams`, `notes_streams`).
//! - Map raw SQLite rows into typed row records.
//!
//! # Invariants
//! - `fetch_notes` yields rows ordered by `created DESC`.
//! - `fetch_spaces` and `fetch_links` keep SQLite row order.
//! - Missing tables/columns surface as the driver's own error text.
//! - Columns convert across SQLite storage classes; only NULL is special.
//! - Row text is never logged; only counts and durations.

use crate::db::DbError;
use crate::model::entry::{LinkRow, NoteRow, SpaceRow, ROOT_PARENT_ID};
use log::{error, info};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const NOTES_SELECT_SQL: &str =
    "SELECT _id, parent_id, created, timestamp, text FROM notes ORDER BY created DESC";
const SPACES_SELECT_SQL: &str = "SELECT _id, stream_name FROM streams";
const LINKS_SELECT_SQL: &str = "SELECT note_id, stream_id FROM notes_streams";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from source fetch operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite error; carries the driver message.
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the three source row sets.
pub trait SourceRepository {
    /// Loads notes and comments, newest first.
    fn fetch_notes(&self) -> RepoResult<Vec<NoteRow>>;
    /// Loads space definitions.
    fn fetch_spaces(&self) -> RepoResult<Vec<SpaceRow>>;
    /// Loads note ↔ space links.
    fn fetch_links(&self) -> RepoResult<Vec<LinkRow>>;
}

/// SQLite-backed source repository.
pub struct SqliteSourceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSourceRepository<'conn> {
    /// Creates a repository over an open source connection.
    ///
    /// Missing tables or columns surface as driver errors from the fetches.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SourceRepository for SqliteSourceRepository<'_> {
    fn fetch_notes(&self) -> RepoResult<Vec<NoteRow>> {
        fetch_rows(self.conn, "notes", NOTES_SELECT_SQL, parse_note_row)
    }

    fn fetch_spaces(&self) -> RepoResult<Vec<SpaceRow>> {
        fetch_rows(self.conn, "streams", SPACES_SELECT_SQL, parse_space_row)
    }

    fn fetch_links(&self) -> RepoResult<Vec<LinkRow>> {
        fetch_rows(self.conn, "notes_streams", LINKS_SELECT_SQL, parse_link_row)
    }
}

fn fetch_rows<T>(
    conn: &Connection,
    table: &'static str,
    sql: &str,
    parse: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> RepoResult<Vec<T>> {
    let started_at = Instant::now();
    let result = query_all(conn, sql, parse);
    match &result {
        Ok(items) => info!(
            "event=source_fetch module=repo status=ok table={} rows={} duration_ms={}",
            table,
            items.len(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=source_fetch module=repo status=error table={} duration_ms={} error={}",
            table,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn query_all<T>(
    conn: &Connection,
    sql: &str,
    parse: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse(row)?);
    }
    Ok(items)
}

fn parse_note_row(row: &Row<'_>) -> rusqlite::Result<NoteRow> {
    Ok(NoteRow {
        id: column_i64(row, 0)?.unwrap_or_default(),
        parent_id: column_i64(row, 1)?.unwrap_or(ROOT_PARENT_ID),
        created_at: column_i64(row, 2)?.unwrap_or_default(),
        modified_at: column_i64(row, 3)?.unwrap_or_default(),
        text: column_string(row, 4)?.unwrap_or_default(),
    })
}

fn parse_space_row(row: &Row<'_>) -> rusqlite::Result<SpaceRow> {
    Ok(SpaceRow {
        id: column_i64(row, 0)?.unwrap_or_default(),
        name: column_string(row, 1)?.unwrap_or_default(),
    })
}

fn parse_link_row(row: &Row<'_>) -> rusqlite::Result<LinkRow> {
    Ok(LinkRow {
        note_id: column_i64(row, 0)?.unwrap_or_default(),
        space_id: column_i64(row, 1)?.unwrap_or_default(),
    })
}

/// Reads an integer column whatever its storage class.
///
/// REAL values are rounded. TEXT and BLOB values are parsed as numbers and
/// read as `0` when they are not numeric. `None` means SQL NULL.
fn column_i64(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<i64>> {
    let value = match row.get_ref(index)? {
        ValueRef::Null => return Ok(None),
        ValueRef::Integer(value) => value,
        ValueRef::Real(value) => real_to_i64(value),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            text_to_i64(&String::from_utf8_lossy(bytes))
        }
    };
    Ok(Some(value))
}

/// Reads a text column whatever its storage class. `None` means SQL NULL.
fn column_string(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<String>> {
    let value = match row.get_ref(index)? {
        ValueRef::Null => return Ok(None),
        ValueRef::Integer(value) => value.to_string(),
        ValueRef::Real(value) => value.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    Ok(Some(value))
}

// `as` saturates out-of-range values and maps NaN to 0.
fn real_to_i64(value: f64) -> i64 {
    value.round() as i64
}

fn text_to_i64(text: &str) -> i64 {
    let text = text.trim();
    text.parse::<i64>()
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(real_to_i64))
        .unwrap_or_default()
}
