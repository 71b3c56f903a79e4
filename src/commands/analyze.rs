//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads the JIT log
//! 2. Detects the log format (unless given)
//! 3. Replays the log into the compilation model
//! 4. Loads bytecode dumps
//! 5. Runs hot-throw detection and annotation correlation
//! 6. Writes the JSON report

use super::models::AnalyzeArgs;
use crate::analysis::{build_all_annotations, find_hot_throws, AnnotationBatch};
use crate::bytecode::{BytecodeCache, BytecodeSource};
use crate::model::JitModel;
use crate::output::{text_summary, to_report, write_report, JitReport, ReportSource};
use crate::parser::{parse_lines, LogFormat};
use crate::utils::config::FORMAT_DETECTION_LINES;
use crate::utils::diagnostics::Diagnostics;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::time::Instant;

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Analyze command arguments
///
/// # Returns
/// The report that was written
///
/// # Errors
/// * Unreadable log or bytecode files
/// * Undetectable log format
/// * Malformed javap output
/// * File write errors
pub fn execute_analyze(args: AnalyzeArgs) -> Result<JitReport> {
    let start_time = Instant::now();

    info!("Analyzing JIT log: {}", args.log_file.display());

    // Step 1: Read log
    info!("Step 1/6: Reading log...");
    let text = fs::read_to_string(&args.log_file)
        .with_context(|| format!("Failed to read log {}", args.log_file.display()))?;
    let lines: Vec<&str> = text.lines().collect();

    // Step 2: Detect format
    let format = match args.format {
        Some(format) => format,
        None => {
            let head = &lines[..lines.len().min(FORMAT_DETECTION_LINES)];
            LogFormat::detect(head).with_context(|| {
                format!(
                    "Could not detect the format of {}; pass --format",
                    args.log_file.display()
                )
            })?
        }
    };
    info!("Step 2/6: Log format is {}", format);

    // Step 3: Replay log
    info!("Step 3/6: Replaying {} lines...", lines.len());
    let mut model = JitModel::new();
    let mut diagnostics = Diagnostics::new();
    let mut parser = format.parser();
    let line_count = parse_lines(parser.as_mut(), &lines, &mut model, &mut diagnostics);

    // Step 4: Load bytecode
    let bytecode = load_bytecode(&args);

    // Step 5: Analyses
    info!("Step 5/6: Running analyses...");
    let source: Option<&dyn BytecodeSource> = if bytecode.is_empty() {
        None
    } else {
        Some(&bytecode)
    };
    let hot_throws = find_hot_throws(&model, source);
    let annotations: Option<AnnotationBatch> = source.map(|source| {
        build_all_annotations(&model, source, args.verify, &mut diagnostics)
    });

    // Step 6: Write report
    info!("Step 6/6: Writing report...");
    let report = to_report(
        ReportSource {
            log_file: args.log_file.display().to_string(),
            format,
            lines: line_count,
        },
        &model,
        &diagnostics,
        hot_throws,
        annotations.as_ref(),
        args.top_compilations,
    );

    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if args.print_summary {
        println!("\n{}", "=".repeat(80));
        println!("JIT SUMMARY");
        println!("{}", "=".repeat(80));
        println!("{}", text_summary(&report));
        println!("{}", "=".repeat(80));
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(report)
}

/// Load every javap dump named on the command line
///
/// **Private** - internal helper for execute_analyze
///
/// A dump that cannot be read or parsed is skipped with a warning.
fn load_bytecode(args: &AnalyzeArgs) -> BytecodeCache {
    let mut cache = BytecodeCache::new();
    if args.bytecode.is_empty() {
        info!("Step 4/6: No bytecode supplied, skipping annotations");
        return cache;
    }

    info!("Step 4/6: Loading {} bytecode dumps...", args.bytecode.len());
    for path in &args.bytecode {
        let loaded = fs::read_to_string(path)
            .with_context(|| format!("Failed to read bytecode {}", path.display()))
            .and_then(|text| {
                cache
                    .load_javap(&text)
                    .with_context(|| format!("Failed to parse javap output {}", path.display()))
            });
        match loaded {
            Ok(added) => debug!("{}: {} members", path.display(), added),
            Err(e) => warn!("Skipping bytecode dump: {:#}", e),
        }
    }
    cache
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
///
/// # Arguments
/// * `args` - Arguments to validate
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.log_file.as_os_str().is_empty() {
        anyhow::bail!("Log file path cannot be empty");
    }

    if !args.log_file.exists() {
        anyhow::bail!("Log file not found: {}", args.log_file.display());
    }

    for path in &args.bytecode {
        if !path.exists() {
            anyhow::bail!("Bytecode file not found: {}", path.display());
        }
    }

    if args.top_compilations == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.top_compilations > 1000 {
        anyhow::bail!("top is too large (max 1000)");
    }

    if args.verify && args.bytecode.is_empty() {
        anyhow::bail!("--verify needs at least one --bytecode file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn log_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "<hotspot_log>\n</hotspot_log>\n").unwrap();
        file
    }

    #[test]
    fn test_validate_args_valid() {
        let log = log_file();
        let args = AnalyzeArgs {
            log_file: log.path().to_path_buf(),
            ..Default::default()
        };

        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_empty_log() {
        let args = AnalyzeArgs::default();
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_missing_log() {
        let args = AnalyzeArgs {
            log_file: PathBuf::from("/definitely/not/here.log"),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_zero() {
        let log = log_file();
        let args = AnalyzeArgs {
            log_file: log.path().to_path_buf(),
            top_compilations: 0,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_verify_without_bytecode() {
        let log = log_file();
        let args = AnalyzeArgs {
            log_file: log.path().to_path_buf(),
            verify: true,
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_execute_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("j9.log");
        fs::write(
            &log,
            "+ (cold) java/lang/Double.longBitsToDouble(J)D @ 00007F6BE4A00034-00007F6BE4A00064 OrdinaryMethod - Q_SZ=0 bcsz=3 JNI\n",
        )
        .unwrap();

        let args = AnalyzeArgs {
            log_file: log,
            output_json: dir.path().join("out/report.json"),
            ..Default::default()
        };
        let report = execute_analyze(args.clone()).unwrap();

        assert_eq!(report.source.format, LogFormat::J9);
        assert_eq!(report.totals.compilations, 1);
        assert!(args.output_json.exists());
    }

    #[test]
    fn test_unreadable_bytecode_dump_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("j9.log");
        fs::write(
            &log,
            "+ (cold) java/lang/Double.longBitsToDouble(J)D @ 00007F6BE4A00034-00007F6BE4A00064 OrdinaryMethod - Q_SZ=0 bcsz=3 JNI\n",
        )
        .unwrap();
        let dump = dir.path().join("Double.javap");
        fs::write(&dump, [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let args = AnalyzeArgs {
            log_file: log,
            output_json: dir.path().join("report.json"),
            bytecode: vec![dump],
            ..Default::default()
        };
        assert!(validate_args(&args).is_ok());
        let report = execute_analyze(args).unwrap();

        assert_eq!(report.totals.compilations, 1);
        assert!(report.annotations.is_none());
    }
}
