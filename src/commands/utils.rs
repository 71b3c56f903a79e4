use crate::output::read_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::Result;
use std::path::PathBuf;

/// Validate a report JSON file
pub fn validate_report_file(file_path: PathBuf) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(&file_path)?;

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at);
    println!("  Log: {} ({})", report.source.log_file, report.source.format);
    println!("  Members: {}", report.totals.members);
    println!("  Compilations: {}", report.totals.compilations);
    println!("  Hot Throws: {}", report.hot_throws.len());
    println!("  Diagnostics: {}", report.diagnostics.total);

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("JIT Trace Studio Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string            - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string       - RFC 3339 timestamp");
        println!("  source: object             - Analysed log");
        println!("    log_file: string         - Path of the log");
        println!("    format: string           - hotspot, j9 or zing");
        println!("    lines: number            - Lines read");
        println!("  totals: object             - Package/class/member/compilation counts");
        println!("  metrics: object            - Compilation statistics");
        println!("    by_state: object         - QUEUED / INSTALLED / FAILED counts");
        println!("    by_tier: object          - Counts per tier");
        println!("    compile_time_ms: object  - Histogram summary (count, min, max, mean, p50/p90/p99)");
        println!("    queue_delay_ms: object   - Histogram summary");
        println!("    native_size_bytes: object - Histogram summary");
        println!("  slowest: array             - Slowest installed compilations");
        println!("  hot_throws: array          - Hot exception sites");
        println!("    member: string           - Canonical member text");
        println!("    bci: number              - Bytecode offset");
        println!("    exception_type: string   - Exception class");
        println!("    preallocated: bool       - Preallocated exception used");
        println!("    catch_type: string?      - Covering handler (if bytecode supplied)");
        println!("  annotations: object?       - Annotation counts (if bytecode supplied)");
        println!("  diagnostics: object        - Skipped input");
        println!("    total: number            - Diagnostic entries");
        println!("    by_kind: object          - Entries per kind");
        println!("    unknown_tags: array      - Unrecognized tag names");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("JIT Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Structured analysis of HotSpot, OpenJ9 and Zing JIT compilation logs.");
}
