//! Single bytecode instructions as printed by `javap -c`.

use super::opcode::Opcode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One operand of an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BytecodeOperand {
    /// Immediate value or local slot (`bipush 10`, `iinc 1, -1`)
    Number(i64),
    /// Constant pool reference (`#12`)
    ConstantPool(u32),
    /// Absolute branch target offset
    Branch(u32),
    /// Primitive array type for `newarray`
    Type(String),
    /// `tableswitch` / `lookupswitch` body
    Switch {
        cases: Vec<(i32, u32)>,
        default: u32,
    },
}

impl fmt::Display for BytecodeOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytecodeOperand::Number(n) => write!(f, "{}", n),
            BytecodeOperand::ConstantPool(idx) => write!(f, "#{}", idx),
            BytecodeOperand::Branch(target) => write!(f, "{}", target),
            BytecodeOperand::Type(name) => write!(f, "{}", name),
            BytecodeOperand::Switch { cases, default } => {
                write!(f, "{{ ")?;
                for (key, target) in cases {
                    write!(f, "{}: {}, ", key, target)?;
                }
                write!(f, "default: {} }}", default)
            }
        }
    }
}

/// A decoded instruction
///
/// Two instructions are equal when opcode, offset and comment match;
/// operands take no part in equality or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BytecodeInstruction {
    pub offset: u32,
    pub opcode: Opcode,
    pub operands: Vec<BytecodeOperand>,
    /// javap's trailing `// Method java/lang/Object."<init>":()V` text
    pub comment: Option<String>,
    /// Carried a `wide` prefix (javap prints `iinc_w`, `iload_w`, ...)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wide: bool,
}

impl BytecodeInstruction {
    pub fn new(offset: u32, opcode: Opcode) -> Self {
        Self {
            offset,
            opcode,
            operands: Vec::new(),
            comment: None,
            wide: false,
        }
    }

    pub fn widened(mut self) -> Self {
        self.wide = true;
        self
    }

    pub fn with_operand(mut self, operand: BytecodeOperand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn is_allocation(&self) -> bool {
        self.opcode.is_allocation()
    }

    /// Every offset control can transfer to, excluding fall-through
    pub fn branch_targets(&self) -> Vec<u32> {
        let mut targets = Vec::new();
        for operand in &self.operands {
            match operand {
                BytecodeOperand::Branch(target) => targets.push(*target),
                BytecodeOperand::Switch { cases, default } => {
                    targets.extend(cases.iter().map(|(_, t)| *t));
                    targets.push(*default);
                }
                _ => {}
            }
        }
        targets
    }

    /// Constant pool index of an invoke, field or class reference
    pub fn constant_pool_index(&self) -> Option<u32> {
        self.operands.iter().find_map(|op| match op {
            BytecodeOperand::ConstantPool(idx) => Some(*idx),
            _ => None,
        })
    }
}

impl PartialEq for BytecodeInstruction {
    fn eq(&self, other: &Self) -> bool {
        self.opcode == other.opcode && self.offset == other.offset && self.comment == other.comment
    }
}

impl Eq for BytecodeInstruction {}

impl Hash for BytecodeInstruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.opcode.hash(state);
        self.offset.hash(state);
        self.comment.hash(state);
    }
}

impl fmt::Display for BytecodeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.offset, self.opcode)?;
        if self.wide {
            write!(f, "_w")?;
        }
        let operands: Vec<String> = self.operands.iter().map(|op| op.to_string()).collect();
        if !operands.is_empty() {
            write!(f, " {}", operands.join(", "))?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " // {}", comment)?;
        }
        Ok(())
    }
}
