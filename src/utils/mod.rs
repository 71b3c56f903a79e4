//! Utility modules for configuration, error handling, and diagnostics.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod profiles;

// Re-export commonly used error types for convenience
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{AnnotationError, ConfigError, ModelError, OutputError, ParseError};
