//! Report rendering.
//!
//! # Responsibility
//! - Serialize the export graph into the fixed plain-text layout.

pub mod report;

pub use report::{
    shows_modification_line, RenderError, ReportRenderer, MODIFICATION_LINE_THRESHOLD_MS,
    TIMESTAMP_FORMAT,
};
