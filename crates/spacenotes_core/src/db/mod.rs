//! SQLite source bootstrap.
//!
//! # Responsibility
//! - Open SQLite connections to an existing notes database.
//!
//! # Invariants
//! - Source connections are read-only; core never writes application data.
//! - No schema migration is attempted on the source database.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_source_db, open_source_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
