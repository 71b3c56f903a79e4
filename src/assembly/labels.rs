//! Jump label resolution for a method's disassembly.
//!
//! Raw branch targets are replaced by sequential labels `L0000`, `L0001`, ...
//! numbered in the order each target is first referenced by a jump. Only
//! targets inside the method's own code are labeled; anything else keeps its
//! hex form.

use super::architecture::Architecture;
use super::instruction::{AssemblyInstruction, AssemblyOperand};
use crate::utils::config::{ADDRESS_COLUMN_WIDTH, LABEL_DIGITS};
use log::debug;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::ops::Range;

/// `0x` + 16 lowercase hex digits, right-justified in the address column
pub fn format_hex_address(address: u64) -> String {
    format!(
        "{:>width$}",
        format!("{:#018x}", address),
        width = ADDRESS_COLUMN_WIDTH
    )
}

fn label_text(index: usize) -> String {
    format!("L{:0digits$}", index, digits = LABEL_DIGITS)
}

/// Label resolver over one method's ordered instructions
#[derive(Debug, Clone)]
pub struct AssemblyLabels {
    architecture: Architecture,
    instructions: Vec<AssemblyInstruction>,
    native_range: Option<Range<u64>>,
    labels: HashMap<u64, usize>,
    built: bool,
}

impl AssemblyLabels {
    pub fn new(architecture: Architecture, instructions: Vec<AssemblyInstruction>) -> Self {
        Self {
            architecture,
            instructions,
            native_range: None,
            labels: HashMap::new(),
            built: false,
        }
    }

    /// Use the compilation's installed `[start, end)` as the local range
    pub fn with_native_range(mut self, range: Range<u64>) -> Self {
        self.native_range = Some(range);
        self
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn instructions(&self) -> &[AssemblyInstruction] {
        &self.instructions
    }

    /// Whether an address lies inside this method's code
    ///
    /// Without an explicit range the span runs from the first to the last
    /// instruction address, inclusive.
    pub fn is_local(&self, address: u64) -> bool {
        if let Some(range) = &self.native_range {
            return range.contains(&address);
        }
        match (self.instructions.first(), self.instructions.last()) {
            (Some(first), Some(last)) => (first.address..=last.address).contains(&address),
            _ => false,
        }
    }

    /// Assign labels to every local jump target
    pub fn build_labels(&mut self) {
        // Phase 1: distinct local targets in first-reference order
        let mut targets: Vec<u64> = Vec::new();
        for instruction in &self.instructions {
            if !self.architecture.is_jump(&instruction.mnemonic) {
                continue;
            }
            for target in instruction.address_operands() {
                if self.is_local(target) && !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }

        // Phase 2: number them
        self.labels = targets
            .into_iter()
            .enumerate()
            .map(|(index, address)| (address, index))
            .collect();
        self.built = true;
        debug!(
            "Built {} labels over {} instructions",
            self.labels.len(),
            self.instructions.len()
        );
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Label text for a labeled target, e.g. `L0003`
    pub fn label_for(&self, address: u64) -> Option<String> {
        self.labels.get(&address).map(|index| label_text(*index))
    }

    /// Render an address for the address column
    ///
    /// Labeled targets render as their label, everything else as hex. Both
    /// forms are right-justified to the same width.
    pub fn format_address(&self, address: u64) -> String {
        match self.label_for(address) {
            Some(label) => format!("{:>width$}", label, width = ADDRESS_COLUMN_WIDTH),
            None => format_hex_address(address),
        }
    }

    /// Render one operand of an instruction
    ///
    /// Only jump operands are ever replaced by labels.
    pub fn format_operand(&self, instruction: &AssemblyInstruction, operand: &AssemblyOperand) -> String {
        match operand.address {
            Some(address) if self.architecture.is_jump(&instruction.mnemonic) => self
                .label_for(address)
                .unwrap_or_else(|| format!("{:#018x}", address)),
            Some(address) => format!("{:#018x}", address),
            None => operand.text.clone(),
        }
    }

    /// Full listing with annotations, address column, operands and comments
    pub fn render_listing(&self) -> String {
        let mut out = String::new();
        for instruction in &self.instructions {
            if let Some(annotation) = &instruction.annotation {
                for line in annotation.lines() {
                    let _ = writeln!(out, "{}", line);
                }
            }

            let mut text = String::new();
            for modifier in &instruction.modifiers {
                text.push_str(modifier);
                text.push(' ');
            }
            text.push_str(&instruction.mnemonic);
            let operands: Vec<String> = instruction
                .operands
                .iter()
                .map(|op| self.format_operand(instruction, op))
                .collect();
            if !operands.is_empty() {
                let _ = write!(text, " {}", operands.join(", "));
            }

            let _ = write!(out, "{}: {}", self.format_address(instruction.address), text);
            if let Some(comment) = &instruction.comment {
                let _ = write!(out, "  ; {}", comment.replace('\n', " "));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> AssemblyLabels {
        AssemblyLabels::new(
            Architecture::X86_64,
            vec![
                AssemblyInstruction::new(99, "mov", &["%rax", "%rbx"]),
                AssemblyInstruction::new(65534, "jne", &["0x100"]),
                AssemblyInstruction::new(65535, "jne", &["0x1000"]),
            ],
        )
    }

    #[test]
    fn test_hex_before_build() {
        let labels = resolver();
        assert_eq!(labels.format_address(256), "0x0000000000000100");
        assert_eq!(labels.format_address(256).len(), 18);
    }

    #[test]
    fn test_labels_in_first_reference_order() {
        let mut labels = resolver();
        labels.build_labels();
        assert_eq!(labels.format_address(256), "             L0000");
        assert_eq!(labels.format_address(4096).trim(), "L0001");
        assert_eq!(labels.label_count(), 2);
    }

    #[test]
    fn test_foreign_targets_stay_hex() {
        let mut labels = AssemblyLabels::new(
            Architecture::X86_64,
            vec![
                AssemblyInstruction::new(0x1000, "jmp", &["0x9000"]),
                AssemblyInstruction::new(0x1004, "je", &["0x1000"]),
                AssemblyInstruction::new(0x1008, "mov", &["0x1004", "%rax"]),
            ],
        );
        labels.build_labels();
        assert_eq!(labels.format_address(0x9000), "0x0000000000009000");
        assert_eq!(labels.label_for(0x1000).as_deref(), Some("L0000"));

        // Non-jump operands render as hex even when local
        let mov = &labels.instructions()[2];
        assert_eq!(labels.format_operand(mov, &mov.operands[0]), "0x0000000000001004");
        assert!(labels.label_for(0x1004).is_none());
    }

    #[test]
    fn test_explicit_native_range() {
        let mut labels = resolver().with_native_range(0..0x200);
        labels.build_labels();
        assert_eq!(labels.label_for(0x100).as_deref(), Some("L0000"));
        assert!(labels.label_for(0x1000).is_none());
    }

    #[test]
    fn test_listing_rewrites_definition_and_reference() {
        let mut labels = AssemblyLabels::new(
            Architecture::X86_64,
            vec![
                AssemblyInstruction::new(0x10, "test", &["%eax", "%eax"]),
                AssemblyInstruction::new(0x12, "je", &["0x0000000000000018"]),
                AssemblyInstruction::new(0x14, "nop", &[]),
                AssemblyInstruction::new(0x18, "retq", &[]),
            ],
        );
        labels.build_labels();
        let listing = labels.render_listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[1], "0x0000000000000012: je L0000");
        assert_eq!(lines[3], "             L0000: retq");
    }
}
