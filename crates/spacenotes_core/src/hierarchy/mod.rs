//! Graph builder for the space → note → comment hierarchy.
//!
//! # Responsibility
//! - Link flat source rows into an owned, immutable graph.
//! - Keep graph construction free of I/O so it can be tested with canned rows.

pub mod builder;

pub use builder::{build_hierarchy, BuildError, Hierarchy};
