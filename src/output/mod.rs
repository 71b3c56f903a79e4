//! Report schema and writers.
//!
//! This module handles:
//! - The versioned JSON report schema
//! - Writing and reading reports on disk
//! - Plain-text summaries

pub mod json;
pub mod schema;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report};
pub use schema::{
    text_summary, to_report, AnnotationSummary, DiagnosticSummary, JitReport, ReportSource,
    ReportTotals,
};
