//! Configuration and constants for the CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Width of the address column in disassembly listings (`0x` + 16 hex digits)
pub const ADDRESS_COLUMN_WIDTH: usize = 18;

/// Digits in a generated jump label (`L0000`)
pub const LABEL_DIGITS: usize = 4;

/// Default number of slowest compilations listed in a report
pub const DEFAULT_TOP_COMPILATIONS: usize = 20;

/// Percentiles summarised for every timing histogram
pub const SUMMARY_PERCENTILES: &[f64] = &[50.0, 90.0, 99.0];

/// Lines inspected when guessing the log format
pub const FORMAT_DETECTION_LINES: usize = 64;

// Section containers in a HotSpot LogCompilation file. Their contents are
// streamed as top-level tags instead of being buffered until the file ends.
pub const HOTSPOT_CONTAINER_TAGS: &[&str] = &["hotspot_log", "tty", "compilation_log"];

// Built-in source path profiles, always present in the profile store
pub const PROFILE_DEFAULT: &str = "DEFAULT";
pub const PROFILE_SANDBOX: &str = "SANDBOX";
pub const BUILTIN_PROFILES: &[&str] = &[PROFILE_DEFAULT, PROFILE_SANDBOX];

/// Default location of the profile store
pub const DEFAULT_PROFILE_STORE: &str = "jit-trace-profiles.toml";

/// Top-level HotSpot tags that carry nothing the model records
pub const HOTSPOT_IGNORED_TAGS: &[&str] = &[
    "writer",
    "vm_version",
    "vm_arguments",
    "start_compile_thread",
    "thread_logfile",
    "destroy_vm",
    "tty_done",
    "hotspot_log_done",
    "sweeper",
    "make_not_entrant",
    "uncommon_trap",
    "deoptimized",
    "dependency_failed",
    "codecache_full",
    "code_cache",
    "blob",
    "statistics",
    "compilation_log_done",
];
