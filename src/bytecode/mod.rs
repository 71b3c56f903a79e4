//! Bytecode model.
//!
//! This module handles:
//! - The JVM opcode table
//! - Per-instruction records and their operands
//! - Line number and exception tables
//! - Reading `javap -c -l -v` output into per-member bytecode

pub mod exception_table;
pub mod instruction;
pub mod javap;
pub mod line_table;
pub mod member;
pub mod opcode;

// Re-export main types
pub use exception_table::{ExceptionTable, ExceptionTableEntry};
pub use instruction::{BytecodeInstruction, BytecodeOperand};
pub use javap::parse_javap;
pub use line_table::{LineTable, LineTableEntry};
pub use member::{BytecodeCache, BytecodeSource, ClassBytecode, MemberBytecode};
pub use opcode::Opcode;
