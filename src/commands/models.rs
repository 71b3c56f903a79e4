use crate::assembly::Architecture;
use crate::parser::LogFormat;
use crate::utils::config::DEFAULT_TOP_COMPILATIONS;
use std::path::PathBuf;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// JIT log to parse
    pub log_file: PathBuf,

    /// Log dialect; detected from the first lines when `None`
    pub format: Option<LogFormat>,

    /// `javap -c -l -v` dumps used for annotations and exception tables
    pub bytecode: Vec<PathBuf>,

    /// Output path for the JSON report
    pub output_json: PathBuf,

    /// Number of slowest compilations to include
    pub top_compilations: usize,

    /// Reject annotations whose offset has no instruction
    pub verify: bool,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            log_file: PathBuf::new(),
            format: None,
            bytecode: Vec::new(),
            output_json: PathBuf::from("jit-report.json"),
            top_compilations: DEFAULT_TOP_COMPILATIONS,
            verify: false,
            print_summary: false,
        }
    }
}

/// Arguments for the labels command
#[derive(Debug, Clone)]
pub struct LabelsArgs {
    /// hsdis disassembly of one method
    pub asm_file: PathBuf,

    /// Detected from the mnemonics when `None`
    pub architecture: Option<Architecture>,
}

/// Operation on the profile store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileAction {
    List,
    Show { name: String },
    Add { name: String, paths: Vec<String> },
    Remove { name: String },
}
