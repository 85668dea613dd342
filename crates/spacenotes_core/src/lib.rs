//! Core logic for the spacenotes exporter.
//! This crate owns every export invariant; the CLI only wires arguments.

pub mod db;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod service;

pub use hierarchy::{build_hierarchy, BuildError, Hierarchy};
pub use logging::{default_log_level, init_logging, logging_status, LogConfig, LoggingError};
pub use model::entry::{
    Entry, EntryId, EntryIndex, LinkRow, NoteRow, Space, SpaceId, SpaceRow, ROOT_PARENT_ID,
};
pub use render::{shows_modification_line, RenderError, ReportRenderer};
pub use repo::source_repo::{RepoError, RepoResult, SourceRepository, SqliteSourceRepository};
pub use service::export_service::{export_database, ExportError, ExportService, ExportSummary};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
