//! Domain model for the notes export.
//!
//! # Responsibility
//! - Define row records read from the source datastore.
//! - Define the space → note → comment graph nodes.
//!
//! # Invariants
//! - Entries are identified by their source `_id`.
//! - Graph links are arena handles into one owning collection.

pub mod entry;
