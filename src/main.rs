//! JIT Trace Studio CLI
//!
//! Structured analysis of JVM JIT compilation logs.
//! Produces compilation reports, hot-throw listings and labeled disassembly.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use jit_trace_studio::assembly::Architecture;
use jit_trace_studio::commands::{
    display_schema, display_version, execute_analyze, execute_labels, execute_profiles,
    validate_args, validate_report_file, AnalyzeArgs, LabelsArgs, ProfileAction,
};
use jit_trace_studio::parser::LogFormat;
use jit_trace_studio::utils::config::{DEFAULT_PROFILE_STORE, DEFAULT_TOP_COMPILATIONS};

/// JIT Trace Studio - JVM JIT log analysis
#[derive(Parser, Debug)]
#[command(name = "jit-trace")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a JIT log and write a report
    Analyze {
        /// JIT log file
        #[arg(short, long)]
        log: PathBuf,

        /// Log format: auto, hotspot, j9 or zing
        #[arg(long, default_value = "auto")]
        format: String,

        /// javap -c -l -v output (repeatable)
        #[arg(short, long)]
        bytecode: Vec<PathBuf>,

        /// Output path for JSON report
        #[arg(short, long, default_value = "jit-report.json")]
        output: PathBuf,

        /// Number of slowest compilations to include
        #[arg(long, default_value_t = DEFAULT_TOP_COMPILATIONS)]
        top: usize,

        /// Fail a member's annotations when an offset has no instruction
        #[arg(long)]
        verify: bool,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Print a disassembly listing with jump labels
    Labels {
        /// hsdis output file
        #[arg(short, long)]
        asm: PathBuf,

        /// Architecture: auto, x86_64 or aarch64
        #[arg(long, default_value = "auto")]
        arch: String,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Manage source-path profiles
    Profiles {
        /// Profile store file
        #[arg(long, env = "JIT_TRACE_PROFILES", default_value = DEFAULT_PROFILE_STORE)]
        store: PathBuf,

        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// List all profiles
    List,
    /// Show the paths of one profile
    Show { name: String },
    /// Create or replace a profile
    Add {
        name: String,
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Remove a user profile
    Remove { name: String },
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Analyze {
            log,
            format,
            bytecode,
            output,
            top,
            verify,
            summary,
        } => {
            let args = AnalyzeArgs {
                log_file: log,
                format: parse_auto::<LogFormat>(&format)?,
                bytecode,
                output_json: output,
                top_compilations: top,
                verify,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_analyze(args)?;
        }

        Commands::Labels { asm, arch } => {
            execute_labels(LabelsArgs {
                asm_file: asm,
                architecture: parse_auto::<Architecture>(&arch)?,
            })?;
        }

        Commands::Validate { file } => {
            validate_report_file(file)?;
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Profiles { store, action } => {
            let action = match action {
                ProfileCommand::List => ProfileAction::List,
                ProfileCommand::Show { name } => ProfileAction::Show { name },
                ProfileCommand::Add { name, paths } => ProfileAction::Add { name, paths },
                ProfileCommand::Remove { name } => ProfileAction::Remove { name },
            };
            execute_profiles(&store, action)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// `auto` means detect; anything else must parse
///
/// **Private** - shared by the format and arch flags
fn parse_auto<T>(value: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if value.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    Ok(Some(value.parse::<T>()?))
}
