//! Per-architecture mnemonic classification.
//!
//! Each architecture has a static table sorted by mnemonic; lookups are a
//! binary search. Mnemonics absent from a table are [`InstructionClass::Other`].

use super::instruction::AssemblyInstruction;
use crate::utils::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What an instruction does to control flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionClass {
    Jump,
    ConditionalJump,
    Call,
    Return,
    Nop,
    Other,
}

impl InstructionClass {
    /// Unconditional or conditional branch to a target operand
    pub fn is_jump(&self) -> bool {
        matches!(self, InstructionClass::Jump | InstructionClass::ConditionalJump)
    }
}

static X86_64_MNEMONICS: &[(&str, InstructionClass)] = &[
    ("call", InstructionClass::Call),
    ("callq", InstructionClass::Call),
    ("ja", InstructionClass::ConditionalJump),
    ("jae", InstructionClass::ConditionalJump),
    ("jb", InstructionClass::ConditionalJump),
    ("jbe", InstructionClass::ConditionalJump),
    ("jc", InstructionClass::ConditionalJump),
    ("jcxz", InstructionClass::ConditionalJump),
    ("je", InstructionClass::ConditionalJump),
    ("jecxz", InstructionClass::ConditionalJump),
    ("jg", InstructionClass::ConditionalJump),
    ("jge", InstructionClass::ConditionalJump),
    ("jl", InstructionClass::ConditionalJump),
    ("jle", InstructionClass::ConditionalJump),
    ("jmp", InstructionClass::Jump),
    ("jmpq", InstructionClass::Jump),
    ("jna", InstructionClass::ConditionalJump),
    ("jnae", InstructionClass::ConditionalJump),
    ("jnb", InstructionClass::ConditionalJump),
    ("jnbe", InstructionClass::ConditionalJump),
    ("jnc", InstructionClass::ConditionalJump),
    ("jne", InstructionClass::ConditionalJump),
    ("jng", InstructionClass::ConditionalJump),
    ("jnge", InstructionClass::ConditionalJump),
    ("jnl", InstructionClass::ConditionalJump),
    ("jnle", InstructionClass::ConditionalJump),
    ("jno", InstructionClass::ConditionalJump),
    ("jnp", InstructionClass::ConditionalJump),
    ("jns", InstructionClass::ConditionalJump),
    ("jnz", InstructionClass::ConditionalJump),
    ("jo", InstructionClass::ConditionalJump),
    ("jp", InstructionClass::ConditionalJump),
    ("jpe", InstructionClass::ConditionalJump),
    ("jpo", InstructionClass::ConditionalJump),
    ("jrcxz", InstructionClass::ConditionalJump),
    ("js", InstructionClass::ConditionalJump),
    ("jz", InstructionClass::ConditionalJump),
    ("loop", InstructionClass::ConditionalJump),
    ("loope", InstructionClass::ConditionalJump),
    ("loopne", InstructionClass::ConditionalJump),
    ("nop", InstructionClass::Nop),
    ("nopl", InstructionClass::Nop),
    ("nopw", InstructionClass::Nop),
    ("ret", InstructionClass::Return),
    ("retq", InstructionClass::Return),
];

static AARCH64_MNEMONICS: &[(&str, InstructionClass)] = &[
    ("b", InstructionClass::Jump),
    ("b.al", InstructionClass::ConditionalJump),
    ("b.cc", InstructionClass::ConditionalJump),
    ("b.cs", InstructionClass::ConditionalJump),
    ("b.eq", InstructionClass::ConditionalJump),
    ("b.ge", InstructionClass::ConditionalJump),
    ("b.gt", InstructionClass::ConditionalJump),
    ("b.hi", InstructionClass::ConditionalJump),
    ("b.hs", InstructionClass::ConditionalJump),
    ("b.le", InstructionClass::ConditionalJump),
    ("b.lo", InstructionClass::ConditionalJump),
    ("b.ls", InstructionClass::ConditionalJump),
    ("b.lt", InstructionClass::ConditionalJump),
    ("b.mi", InstructionClass::ConditionalJump),
    ("b.ne", InstructionClass::ConditionalJump),
    ("b.nv", InstructionClass::ConditionalJump),
    ("b.pl", InstructionClass::ConditionalJump),
    ("b.vc", InstructionClass::ConditionalJump),
    ("b.vs", InstructionClass::ConditionalJump),
    ("bl", InstructionClass::Call),
    ("blr", InstructionClass::Call),
    ("br", InstructionClass::Jump),
    ("cbnz", InstructionClass::ConditionalJump),
    ("cbz", InstructionClass::ConditionalJump),
    ("nop", InstructionClass::Nop),
    ("ret", InstructionClass::Return),
    ("tbnz", InstructionClass::ConditionalJump),
    ("tbz", InstructionClass::ConditionalJump),
];

/// Mnemonics only seen in AArch64 listings
const AARCH64_HINTS: &[&str] = &["adrp", "cbnz", "cbz", "ldp", "ldr", "stp", "str", "tbnz", "tbz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X86_64,
    AArch64,
}

impl Architecture {
    fn table(&self) -> &'static [(&'static str, InstructionClass)] {
        match self {
            Architecture::X86_64 => X86_64_MNEMONICS,
            Architecture::AArch64 => AARCH64_MNEMONICS,
        }
    }

    /// Classify a mnemonic, case-insensitively
    pub fn classify(&self, mnemonic: &str) -> InstructionClass {
        let lower = mnemonic.to_ascii_lowercase();
        let table = self.table();
        table
            .binary_search_by(|(m, _)| (*m).cmp(lower.as_str()))
            .map(|idx| table[idx].1)
            .unwrap_or(InstructionClass::Other)
    }

    pub fn is_jump(&self, mnemonic: &str) -> bool {
        self.classify(mnemonic).is_jump()
    }

    pub fn is_nop(&self, mnemonic: &str) -> bool {
        self.classify(mnemonic) == InstructionClass::Nop
    }

    /// Guess the architecture from decoded instructions
    ///
    /// AT&T `%reg` operands mark x86-64; AArch64-only mnemonics or `b.cond`
    /// branches mark AArch64.
    pub fn detect(instructions: &[AssemblyInstruction]) -> Option<Architecture> {
        for instruction in instructions {
            let mnemonic = instruction.mnemonic.to_ascii_lowercase();
            if mnemonic.starts_with("b.") || AARCH64_HINTS.contains(&mnemonic.as_str()) {
                return Some(Architecture::AArch64);
            }
            if instruction.operands.iter().any(|op| op.text.contains('%'))
                || matches!(mnemonic.as_str(), "push" | "pop" | "lea" | "movq" | "movl")
            {
                return Some(Architecture::X86_64);
            }
        }
        None
    }

    pub fn name(&self) -> &'static str {
        match self {
            Architecture::X86_64 => "x86_64",
            Architecture::AArch64 => "aarch64",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Architecture {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86_64" | "x86-64" | "amd64" | "x64" => Ok(Architecture::X86_64),
            "aarch64" | "arm64" => Ok(Architecture::AArch64),
            other => Err(ParseError::UnknownArchitecture(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_sorted() {
        for arch in [Architecture::X86_64, Architecture::AArch64] {
            assert!(arch.table().windows(2).all(|w| w[0].0 < w[1].0), "{}", arch);
        }
    }

    #[test]
    fn test_x86_classification() {
        let arch = Architecture::X86_64;
        assert_eq!(arch.classify("jne"), InstructionClass::ConditionalJump);
        assert_eq!(arch.classify("JMPQ"), InstructionClass::Jump);
        assert_eq!(arch.classify("callq"), InstructionClass::Call);
        assert_eq!(arch.classify("retq"), InstructionClass::Return);
        assert!(arch.is_nop("nopl"));
        assert_eq!(arch.classify("mov"), InstructionClass::Other);
    }

    #[test]
    fn test_aarch64_classification() {
        let arch = Architecture::AArch64;
        assert!(arch.is_jump("b.ne"));
        assert!(arch.is_jump("cbz"));
        assert!(arch.is_jump("b"));
        assert_eq!(arch.classify("bl"), InstructionClass::Call);
        assert!(!arch.is_jump("jne"));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("arm64".parse::<Architecture>().unwrap(), Architecture::AArch64);
        assert!("sparc".parse::<Architecture>().is_err());
    }
}
