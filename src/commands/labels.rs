//! Labels command: print a disassembly listing with local jump targets
//! replaced by labels.

use super::models::LabelsArgs;
use crate::assembly::{parse_hsdis, Architecture, AssemblyLabels};
use anyhow::{Context, Result};
use log::{info, warn};
use std::fs;

/// Execute the labels command
///
/// **Public** - main entry point called from main.rs
///
/// # Returns
/// The rendered listing (also printed to stdout)
pub fn execute_labels(args: LabelsArgs) -> Result<String> {
    let text = fs::read_to_string(&args.asm_file)
        .with_context(|| format!("Failed to read disassembly {}", args.asm_file.display()))?;

    let instructions = parse_hsdis(&text);
    if instructions.is_empty() {
        anyhow::bail!("No instructions found in {}", args.asm_file.display());
    }

    let architecture = match args
        .architecture
        .or_else(|| Architecture::detect(&instructions))
    {
        Some(architecture) => architecture,
        None => {
            warn!("Could not detect the architecture, assuming x86_64");
            Architecture::X86_64
        }
    };
    info!(
        "Read {} instructions ({})",
        instructions.len(),
        architecture
    );

    let mut labels = AssemblyLabels::new(architecture, instructions);
    labels.build_labels();
    info!("Assigned {} labels", labels.label_count());

    let listing = labels.render_listing();
    print!("{}", listing);
    Ok(listing)
}
