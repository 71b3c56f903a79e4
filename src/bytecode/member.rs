//! Per-member bytecode and the lookup seam used by the analysers.

use super::exception_table::ExceptionTable;
use super::instruction::BytecodeInstruction;
use super::javap::parse_javap;
use super::line_table::LineTable;
use crate::parser::signature::{MemberSignature, Modifier};
use crate::utils::error::ParseError;
use log::debug;
use std::collections::HashMap;

/// Decoded bytecode of one method or constructor
#[derive(Debug, Clone, PartialEq)]
pub struct MemberBytecode {
    pub signature: MemberSignature,
    pub modifiers: Vec<Modifier>,
    pub varargs: bool,
    /// Ordered by offset
    pub instructions: Vec<BytecodeInstruction>,
    pub line_table: LineTable,
    pub exception_table: ExceptionTable,
}

impl MemberBytecode {
    pub fn new(signature: MemberSignature) -> Self {
        Self {
            signature,
            modifiers: Vec::new(),
            varargs: false,
            instructions: Vec::new(),
            line_table: LineTable::new(),
            exception_table: ExceptionTable::new(),
        }
    }

    pub fn instruction_at(&self, offset: u32) -> Option<&BytecodeInstruction> {
        self.instructions
            .binary_search_by_key(&offset, |i| i.offset)
            .ok()
            .map(|idx| &self.instructions[idx])
    }

    /// Whether an instruction starts exactly at `offset`
    pub fn has_offset(&self, offset: u32) -> bool {
        self.instruction_at(offset).is_some()
    }

    /// Offset of the final instruction
    pub fn last_offset(&self) -> Option<u32> {
        self.instructions.last().map(|i| i.offset)
    }

    pub fn source_line(&self, offset: u32) -> Option<u32> {
        self.line_table.find_source_line_for_offset(offset)
    }
}

/// All members decoded from one class
#[derive(Debug, Clone, PartialEq)]
pub struct ClassBytecode {
    /// Dotted name
    pub class_name: String,
    pub members: Vec<MemberBytecode>,
}

/// Supplies bytecode for a member, wherever it was loaded from
pub trait BytecodeSource {
    fn member_bytecode(&self, signature: &MemberSignature) -> Option<&MemberBytecode>;
}

/// In-memory [`BytecodeSource`] filled from javap output
#[derive(Debug, Default)]
pub struct BytecodeCache {
    members: HashMap<MemberSignature, MemberBytecode>,
}

impl BytecodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_member(&mut self, member: MemberBytecode) {
        self.members.insert(member.signature.clone(), member);
    }

    pub fn insert_class(&mut self, class: ClassBytecode) {
        for member in class.members {
            self.insert_member(member);
        }
    }

    /// Parse javap text and add every member found
    ///
    /// Returns the number of members added.
    pub fn load_javap(&mut self, text: &str) -> Result<usize, ParseError> {
        let classes = parse_javap(text)?;
        let mut added = 0;
        for class in classes {
            debug!(
                "Loaded bytecode for {} ({} members)",
                class.class_name,
                class.members.len()
            );
            added += class.members.len();
            self.insert_class(class);
        }
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl BytecodeSource for BytecodeCache {
    fn member_bytecode(&self, signature: &MemberSignature) -> Option<&MemberBytecode> {
        self.members.get(signature)
    }
}
