//! Reader for `javap -c -l -v` text.
//!
//! Only the parts the analysers use are decoded: member declarations,
//! `descriptor:` and `flags:` lines, the `Code:` listing (switch tables
//! included), `LineNumberTable:` and `Exception table:`. Constant pool and
//! other attribute sections are skipped.

use super::exception_table::ExceptionTableEntry;
use super::instruction::{BytecodeInstruction, BytecodeOperand};
use super::member::{ClassBytecode, MemberBytecode};
use super::opcode::Opcode;
use crate::parser::signature::{decode_access_flags, slash_to_dot, MemberSignature, Modifier};
use crate::utils::error::ParseError;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Code,
    LineNumbers,
    Exceptions,
    Skipped,
}

#[derive(Debug)]
struct PendingMember {
    name: String,
    declaration: String,
    modifiers: Vec<Modifier>,
    varargs: bool,
    descriptor: Option<String>,
    bytecode: Vec<BytecodeInstruction>,
    lines: Vec<(u32, u32)>,
    exceptions: Vec<ExceptionTableEntry>,
}

#[derive(Debug)]
struct PendingSwitch {
    offset: u32,
    opcode: Opcode,
    cases: Vec<(i32, u32)>,
    default: Option<u32>,
}

#[derive(Default)]
struct JavapReader {
    classes: Vec<ClassBytecode>,
    class_name: Option<String>,
    members: Vec<MemberBytecode>,
    member: Option<PendingMember>,
    switch: Option<PendingSwitch>,
    section: Option<Section>,
}

/// Parse javap output containing one or more classes
///
/// **Public** - main entry point for bytecode input
///
/// A member whose code listing fails to decode is logged and left out;
/// the rest of its class is kept.
///
/// # Errors
/// * `ParseError::UnknownOpcode` - an instruction mnemonic is not a JVM opcode
/// * `ParseError::InvalidNumber` - an offset or operand is not numeric
/// * `ParseError::InvalidFormat` - a switch table is unterminated
///
/// Errors are only returned for lines that belong to no member.
pub fn parse_javap(text: &str) -> Result<Vec<ClassBytecode>, ParseError> {
    let mut reader = JavapReader::default();
    for line in text.lines() {
        if let Err(error) = reader.line(line) {
            reader.discard_member(error)?;
        }
    }
    reader.finish_class();
    Ok(reader.classes)
}

impl JavapReader {
    fn line(&mut self, line: &str) -> Result<(), ParseError> {
        let trimmed = line.trim();

        if self.switch.is_some() {
            return self.switch_line(trimmed);
        }

        let indent = line.len() - line.trim_start().len();
        if indent == 0 {
            if let Some(name) = class_declaration(trimmed) {
                self.finish_class();
                self.class_name = Some(name);
            } else if trimmed == "}" {
                self.finish_class();
            }
            return Ok(());
        }

        if indent == 2 && trimmed.ends_with(';') {
            self.finish_member();
            self.start_member(trimmed);
            return Ok(());
        }

        let Some(member) = self.member.as_mut() else {
            return Ok(());
        };

        if let Some(descriptor) = trimmed.strip_prefix("descriptor:") {
            member.descriptor = Some(descriptor.trim().to_string());
            return Ok(());
        }
        if let Some(flags) = trimmed.strip_prefix("flags:") {
            let (modifiers, varargs) = parse_flags(flags);
            member.modifiers = modifiers;
            member.varargs = varargs;
            return Ok(());
        }
        match trimmed {
            "Code:" => {
                self.section = Some(Section::Code);
                return Ok(());
            }
            "LineNumberTable:" => {
                self.section = Some(Section::LineNumbers);
                return Ok(());
            }
            "Exception table:" => {
                self.section = Some(Section::Exceptions);
                return Ok(());
            }
            _ if trimmed.ends_with(':') && !trimmed.starts_with(|c: char| c.is_ascii_digit()) => {
                self.section = Some(Section::Skipped);
                return Ok(());
            }
            _ => {}
        }

        match self.section {
            Some(Section::Code) => self.instruction_line(trimmed),
            Some(Section::LineNumbers) => {
                if let Some(entry) = line_number_entry(trimmed) {
                    member.lines.push(entry);
                }
                Ok(())
            }
            Some(Section::Exceptions) => {
                if let Some(entry) = exception_entry(trimmed) {
                    member.exceptions.push(entry);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn start_member(&mut self, declaration: &str) {
        self.section = Some(Section::Header);
        let Some(class_name) = self.class_name.as_deref() else {
            return;
        };

        let name = if declaration == "static {};" {
            "<clinit>".to_string()
        } else if let Some(paren) = declaration.find('(') {
            let head = &declaration[..paren];
            let last = head.split_whitespace().last().unwrap_or("");
            if last == class_name {
                "<init>".to_string()
            } else {
                last.to_string()
            }
        } else {
            // Field declaration
            return;
        };

        let modifiers = declaration
            .split_whitespace()
            .map_while(Modifier::from_keyword)
            .collect();

        self.member = Some(PendingMember {
            name,
            declaration: declaration.to_string(),
            modifiers,
            varargs: declaration.contains("..."),
            descriptor: None,
            bytecode: Vec::new(),
            lines: Vec::new(),
            exceptions: Vec::new(),
        });
    }

    fn instruction_line(&mut self, trimmed: &str) -> Result<(), ParseError> {
        let Some((offset, rest)) = trimmed.split_once(": ") else {
            return Ok(());
        };
        let Ok(offset) = offset.trim().parse::<u32>() else {
            // `stack=2, locals=1, args_size=1` and similar
            return Ok(());
        };

        let (body, comment) = match rest.find("//") {
            Some(idx) => (rest[..idx].trim(), Some(rest[idx + 2..].trim().to_string())),
            None => (rest.trim(), None),
        };
        let mut parts = body.splitn(2, char::is_whitespace);
        let mnemonic = parts.next().unwrap_or("");
        let operand_text = parts.next().unwrap_or("").trim();
        let (opcode, wide) = match Opcode::from_mnemonic(mnemonic) {
            Some(opcode) => (opcode, false),
            None => Opcode::from_wide_mnemonic(mnemonic)
                .map(|opcode| (opcode, true))
                .ok_or_else(|| ParseError::UnknownOpcode(mnemonic.to_string()))?,
        };

        if opcode.is_switch() {
            self.switch = Some(PendingSwitch {
                offset,
                opcode,
                cases: Vec::new(),
                default: None,
            });
            return Ok(());
        }

        let mut instruction = BytecodeInstruction::new(offset, opcode);
        instruction.operands = parse_operands(opcode, operand_text)?;
        instruction.comment = comment.filter(|c| !c.is_empty());
        instruction.wide = wide;
        if let Some(member) = self.member.as_mut() {
            member.bytecode.push(instruction);
        }
        Ok(())
    }

    fn switch_line(&mut self, trimmed: &str) -> Result<(), ParseError> {
        let Some(switch) = self.switch.as_mut() else {
            return Ok(());
        };
        if trimmed == "}" {
            let default = switch.default.ok_or_else(|| {
                ParseError::InvalidFormat(format!(
                    "{} at {} has no default target",
                    switch.opcode, switch.offset
                ))
            })?;
            let instruction = BytecodeInstruction::new(switch.offset, switch.opcode).with_operand(
                BytecodeOperand::Switch {
                    cases: std::mem::take(&mut switch.cases),
                    default,
                },
            );
            self.switch = None;
            if let Some(member) = self.member.as_mut() {
                member.bytecode.push(instruction);
            }
            return Ok(());
        }

        let Some((key, target)) = trimmed.split_once(':') else {
            return Ok(());
        };
        let target = parse_number::<u32>(target.trim())?;
        match key.trim() {
            "default" => switch.default = Some(target),
            key => switch.cases.push((parse_number::<i32>(key)?, target)),
        }
        Ok(())
    }

    /// Drop the member being read after `error`, or hand the error back
    /// when no member is open
    fn discard_member(&mut self, error: ParseError) -> Result<(), ParseError> {
        let Some(pending) = self.member.take() else {
            return Err(error);
        };
        warn!(
            "Skipping bytecode of {}.{}: {}",
            self.class_name.as_deref().unwrap_or("?"),
            pending.name,
            error
        );
        self.switch = None;
        self.section = Some(Section::Skipped);
        Ok(())
    }

    fn finish_member(&mut self) {
        self.section = None;
        let Some(pending) = self.member.take() else {
            return;
        };
        let Some(class_name) = self.class_name.as_deref() else {
            return;
        };

        let descriptor = match pending.descriptor.clone() {
            Some(descriptor) => descriptor,
            None => match declaration_descriptor(&pending.declaration, &pending.name) {
                Some(descriptor) => descriptor,
                None => {
                    debug!("No descriptor for {}.{}, skipping", class_name, pending.name);
                    return;
                }
            },
        };

        let signature = match MemberSignature::new(class_name, &pending.name, &descriptor) {
            Ok(signature) => signature,
            Err(e) => {
                warn!("Skipping {}.{}: {}", class_name, pending.name, e);
                return;
            }
        };
        let mut member = MemberBytecode::new(signature);
        member.modifiers = pending.modifiers;
        member.varargs = pending.varargs;
        member.instructions = pending.bytecode;
        member.instructions.sort_by_key(|i| i.offset);
        for (offset, line) in pending.lines {
            member.line_table.add(offset, line);
        }
        for entry in pending.exceptions {
            member.exception_table.push(entry);
        }
        self.members.push(member);
    }

    fn finish_class(&mut self) {
        self.finish_member();
        if let Some(class_name) = self.class_name.take() {
            self.classes.push(ClassBytecode {
                class_name,
                members: std::mem::take(&mut self.members),
            });
        }
    }
}

/// `public class a.B extends c.D implements E {` → `a.B`
fn class_declaration(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace();
    tokens.find(|t| matches!(*t, "class" | "interface" | "enum" | "record"))?;
    let name = tokens.next()?;
    let name = name.split('<').next().unwrap_or(name).trim_end_matches('{');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// `(0x0089) ACC_PUBLIC, ACC_STATIC, ACC_VARARGS`
fn parse_flags(text: &str) -> (Vec<Modifier>, bool) {
    let text = text.trim();
    if let Some(hex) = text
        .strip_prefix("(0x")
        .and_then(|rest| rest.split(')').next())
    {
        if let Ok(bits) = u32::from_str_radix(hex, 16) {
            return decode_access_flags(bits);
        }
    }
    let modifiers = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(Modifier::from_keyword)
        .collect();
    (modifiers, text.contains("ACC_VARARGS"))
}

/// `line 12: 4` → `(4, 12)`
fn line_number_entry(text: &str) -> Option<(u32, u32)> {
    let rest = text.strip_prefix("line ")?;
    let (line, offset) = rest.split_once(':')?;
    Some((offset.trim().parse().ok()?, line.trim().parse().ok()?))
}

/// `0     5     8   Class java/lang/Exception` or `0 5 16 any`
fn exception_entry(text: &str) -> Option<ExceptionTableEntry> {
    let mut tokens = text.split_whitespace();
    let start = tokens.next()?.parse().ok()?;
    let end = tokens.next()?.parse().ok()?;
    let handler = tokens.next()?.parse().ok()?;
    let catch_type: Vec<&str> = tokens.collect();
    let catch_type = match catch_type.as_slice() {
        ["Class", name] => slash_to_dot(name),
        [name] => slash_to_dot(name),
        _ => return None,
    };
    Some(ExceptionTableEntry::new(start, end, handler, catch_type))
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T, ParseError>
where
    T::Err: std::fmt::Display,
{
    text.parse::<T>().map_err(|e| ParseError::InvalidNumber {
        value: text.to_string(),
        reason: e.to_string(),
    })
}

fn parse_operands(opcode: Opcode, text: &str) -> Result<Vec<BytecodeOperand>, ParseError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    if opcode.is_branch() {
        return Ok(vec![BytecodeOperand::Branch(parse_number(text)?)]);
    }
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|token| {
            if let Some(index) = token.strip_prefix('#') {
                parse_number(index).map(BytecodeOperand::ConstantPool)
            } else if let Ok(number) = token.parse::<i64>() {
                Ok(BytecodeOperand::Number(number))
            } else {
                Ok(BytecodeOperand::Type(token.to_string()))
            }
        })
        .collect()
}

/// Descriptor rebuilt from a plain (non-generic) Java declaration
fn declaration_descriptor(declaration: &str, name: &str) -> Option<String> {
    let open = declaration.find('(')?;
    let close = declaration[open..].find(')')? + open;
    let head: Vec<&str> = declaration[..open].split_whitespace().collect();

    let mut descriptor = String::from("(");
    for param in declaration[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        descriptor.push_str(&java_type_descriptor(param)?);
    }
    descriptor.push(')');

    if name == "<init>" || name == "<clinit>" {
        descriptor.push('V');
    } else {
        let return_type = head.get(head.len().checked_sub(2)?)?;
        descriptor.push_str(&java_type_descriptor(return_type)?);
    }
    Some(descriptor)
}

fn java_type_descriptor(java_type: &str) -> Option<String> {
    if java_type.contains('<') {
        return None;
    }
    let mut base = java_type;
    let mut dimensions = 0;
    if let Some(stripped) = base.strip_suffix("...") {
        base = stripped;
        dimensions += 1;
    }
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        dimensions += 1;
    }
    let element = match base {
        "void" => "V".to_string(),
        "boolean" => "Z".to_string(),
        "byte" => "B".to_string(),
        "char" => "C".to_string(),
        "short" => "S".to_string(),
        "int" => "I".to_string(),
        "long" => "J".to_string(),
        "float" => "F".to_string(),
        "double" => "D".to_string(),
        object => format!("L{};", object.replace('.', "/")),
    };
    Some(format!("{}{}", "[".repeat(dimensions), element))
}
