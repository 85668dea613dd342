//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the row-fetch contract consumed by the export service.
//! - Isolate SQLite query details from graph building and rendering.
//!
//! # Invariants
//! - Repository APIs are read-only.
//! - Schema mismatches are reported with the driver's own message.

pub mod source_repo;
