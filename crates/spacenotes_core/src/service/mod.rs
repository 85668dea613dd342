//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, builder and renderer into one export run.
//! - Keep CLI layers decoupled from storage details.

pub mod export_service;
