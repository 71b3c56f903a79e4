//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod labels;
pub mod models;
pub mod profiles;
pub mod utils;

// Re-export main command functions
pub use analyze::{execute_analyze, validate_args};
pub use labels::execute_labels;
pub use models::{AnalyzeArgs, LabelsArgs, ProfileAction};
pub use profiles::execute_profiles;
pub use utils::{display_schema, display_version, validate_report_file};
