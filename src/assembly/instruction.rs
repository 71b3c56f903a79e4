//! Architecture-neutral disassembly records and the hsdis text reader.
//!
//! hsdis output interleaves instruction lines with annotation lines:
//!
//! ```text
//! [Verified Entry Point]
//!   0x00007f3c1d0a3a60: mov    %eax,-0x14000(%rsp)
//!   0x00007f3c1d0a3a67: push   %rbp
//!                                                 ;*aload_0 {reexecute=0}
//!   0x00007f3c1d0a3a7c: jne    0x00007f3c1d0a3a9a
//! ```
//!
//! `[...]` and `;;` lines annotate the next instruction. A line holding only a
//! `;` comment continues the previous instruction's comment.

use serde::{Deserialize, Serialize};

/// Instruction prefixes kept apart from the mnemonic
const PREFIXES: &[&str] = &[
    "addr32", "bnd", "cs", "data16", "ds", "es", "fs", "gs", "lock", "notrack", "rep", "repe",
    "repne", "repnz", "repz", "rex", "rex.w", "ss",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyOperand {
    pub text: String,
    /// Set when the whole operand is a `0x...` literal
    pub address: Option<u64>,
}

impl AssemblyOperand {
    pub fn new(text: &str) -> Self {
        let text = text.trim();
        let address = text
            .strip_prefix("0x")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok());
        Self {
            text: text.to_string(),
            address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyInstruction {
    pub address: u64,
    pub annotation: Option<String>,
    /// Prefixes such as `lock` or `rep`
    pub modifiers: Vec<String>,
    pub mnemonic: String,
    pub operands: Vec<AssemblyOperand>,
    pub comment: Option<String>,
}

impl AssemblyInstruction {
    pub fn new(address: u64, mnemonic: &str, operands: &[&str]) -> Self {
        Self {
            address,
            annotation: None,
            modifiers: Vec::new(),
            mnemonic: mnemonic.to_string(),
            operands: operands.iter().map(|op| AssemblyOperand::new(op)).collect(),
            comment: None,
        }
    }

    /// Address literals among the operands, in operand order
    pub fn address_operands(&self) -> impl Iterator<Item = u64> + '_ {
        self.operands.iter().filter_map(|op| op.address)
    }

    fn append_comment(&mut self, text: &str) {
        match &mut self.comment {
            Some(comment) => {
                comment.push('\n');
                comment.push_str(text);
            }
            None => self.comment = Some(text.to_string()),
        }
    }
}

/// Parse one `0xADDR: [prefix...] mnemonic operands ;comment` line
pub fn parse_instruction_line(line: &str) -> Option<AssemblyInstruction> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("0x")?;
    let (address, body) = rest.split_once(':')?;
    let address = u64::from_str_radix(address.trim(), 16).ok()?;

    let (body, comment) = split_comment(body);
    let mut tokens = body.split_whitespace().peekable();

    let mut modifiers = Vec::new();
    while let Some(token) = tokens.peek() {
        if PREFIXES.contains(&token.to_ascii_lowercase().as_str()) {
            modifiers.push(token.to_string());
            tokens.next();
        } else {
            break;
        }
    }
    let mnemonic = tokens.next()?.to_string();
    let operand_text = tokens.collect::<Vec<_>>().join(" ");

    Some(AssemblyInstruction {
        address,
        annotation: None,
        modifiers,
        mnemonic,
        operands: split_operands(&operand_text)
            .into_iter()
            .map(AssemblyOperand::new)
            .collect(),
        comment,
    })
}

/// Split at the first `;` (x86) or `//` (AArch64)
fn split_comment(body: &str) -> (&str, Option<String>) {
    let semicolon = body.find(';');
    let slashes = body.find("//");
    let cut = match (semicolon, slashes) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    match cut {
        Some(idx) => {
            let comment = body[idx..]
                .trim_start_matches(';')
                .trim_start_matches("//")
                .trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            (body[..idx].trim(), comment)
        }
        None => (body.trim(), None),
    }
}

/// Split on commas outside `()` and `[]`
fn split_operands(text: &str) -> Vec<&str> {
    let mut operands = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                operands.push(text[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let last = text[start..].trim();
    if !last.is_empty() {
        operands.push(last);
    }
    operands.retain(|op| !op.is_empty());
    operands
}

/// Read every instruction from hsdis text
///
/// **Public** - main entry point for disassembly input
pub fn parse_hsdis(text: &str) -> Vec<AssemblyInstruction> {
    let mut instructions: Vec<AssemblyInstruction> = Vec::new();
    let mut pending_annotation: Vec<String> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(mut instruction) = parse_instruction_line(trimmed) {
            if !pending_annotation.is_empty() {
                instruction.annotation = Some(pending_annotation.join("\n"));
                pending_annotation.clear();
            }
            instructions.push(instruction);
        } else if trimmed.starts_with('[') || trimmed.starts_with(";;") || trimmed.starts_with('#') {
            pending_annotation.push(trimmed.to_string());
        } else if let Some(comment) = trimmed.strip_prefix(';') {
            if let Some(last) = instructions.last_mut() {
                last.append_comment(comment.trim());
            }
        }
    }
    instructions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_x86_line() {
        let ins = parse_instruction_line(
            "  0x00007f3c1d0a3a60: mov    %eax,-0x14000(%rsp)  ;   {no_reloc}",
        )
        .unwrap();
        assert_eq!(ins.address, 0x7f3c1d0a3a60);
        assert_eq!(ins.mnemonic, "mov");
        let texts: Vec<&str> = ins.operands.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["%eax", "-0x14000(%rsp)"]);
        assert_eq!(ins.comment.as_deref(), Some("{no_reloc}"));
    }

    #[test]
    fn test_prefix_and_jump_target() {
        let ins = parse_instruction_line("0x0000000000001000: lock cmpxchg %rcx,(%rdx)").unwrap();
        assert_eq!(ins.modifiers, vec!["lock"]);
        assert_eq!(ins.mnemonic, "cmpxchg");

        let jump = parse_instruction_line("0x0000000000001008: jne    0x0000000000001040").unwrap();
        assert_eq!(jump.address_operands().collect::<Vec<_>>(), vec![0x1040]);
    }

    #[test]
    fn test_aarch64_line() {
        let ins = parse_instruction_line(
            "0x0000ffff8c0ff6d4: b.ne\t0x0000ffff8c0ff6f0  // b.any",
        )
        .unwrap();
        assert_eq!(ins.mnemonic, "b.ne");
        assert_eq!(ins.operands[0].address, Some(0xffff8c0ff6f0));
        assert_eq!(ins.comment.as_deref(), Some("b.any"));

        let ldr = parse_instruction_line("0x0000ffff8c0ff6d8: ldr x0, [sp, #16]").unwrap();
        assert_eq!(ldr.operands.len(), 2);
        assert_eq!(ldr.operands[1].text, "[sp, #16]");
    }

    #[test]
    fn test_annotations_and_continuations() {
        let text = "\
[Entry Point]
  # {method} {0x00007f3c} 'hashCode' '()I' in 'java/lang/String'
  0x0000000000001000: push   %rbp
                                ;*aload_0 {reexecute=0}
                                ; - java.lang.String::hashCode@0 (line 1503)
  ;; B1: #  N1 <- BLOCK HEAD IS JUNK
  0x0000000000001001: retq
";
        let instructions = parse_hsdis(text);
        assert_eq!(instructions.len(), 2);
        assert_eq!(
            instructions[0].annotation.as_deref(),
            Some("[Entry Point]\n# {method} {0x00007f3c} 'hashCode' '()I' in 'java/lang/String'")
        );
        assert_eq!(
            instructions[0].comment.as_deref(),
            Some("*aload_0 {reexecute=0}\n- java.lang.String::hashCode@0 (line 1503)")
        );
        assert!(instructions[1].annotation.as_deref().unwrap().starts_with(";; B1"));
    }
}
