//! Native code model.
//!
//! This module handles:
//! - Per-architecture jump/call/nop tables
//! - Reading hsdis disassembly into instructions
//! - Replacing local jump targets with sequential labels

pub mod architecture;
pub mod instruction;
pub mod labels;

pub use architecture::{Architecture, InstructionClass};
pub use instruction::{parse_hsdis, parse_instruction_line, AssemblyInstruction, AssemblyOperand};
pub use labels::{format_hex_address, AssemblyLabels};
