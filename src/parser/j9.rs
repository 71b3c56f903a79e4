//! OpenJ9 `-Xjit:verbose` parser.
//!
//! Successful compilations are single lines:
//!
//! ```text
//! + (cold) java/lang/Double.longBitsToDouble(J)D @ 00007F6BE4A00034-00007F6BE4A00064 OrdinaryMethod - Q_SZ=0 bcsz=3 JNI
//! ```
//!
//! Failures start with `!`. Anything else (`#INFO`, `#CR`, ...) is skipped.

use super::format::{JitLogParser, LogFormat};
use super::signature::MemberSignature;
use crate::model::{CompilationEvent, CompileKey, JitModel, Temperature, VendorDetail};
use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use crate::utils::error::ParseError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn compiled_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^\+ \((?P<temp>[^)]+)\) (?P<sig>\S+) @ (?:0x)?(?P<start>[0-9A-Fa-f]+)-(?:0x)?(?P<end>[0-9A-Fa-f]+)(?P<rest>.*)$",
            )
            .ok()
        })
        .as_ref()
}

fn failed_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^! (?:\((?P<temp>[^)]+)\) )?(?P<sig>[^\s(]+\([^\s)]*\)\S+)(?P<rest>.*)$").ok()
        })
        .as_ref()
}

/// Cheap shape check used by format detection
pub fn is_j9_compile_line(line: &str) -> bool {
    compiled_pattern().map(|re| re.is_match(line)).unwrap_or(false)
        || failed_pattern().map(|re| re.is_match(line)).unwrap_or(false)
}

/// Where a J9 compile line ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum J9Outcome {
    /// Code emitted at `[start, end)`
    Compiled { start: u64, end: u64 },
    Failed { reason: Option<String> },
}

/// One decoded verbose-JIT line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct J9CompileLine {
    pub temperature: Option<Temperature>,
    pub profiled: bool,
    pub signature: MemberSignature,
    pub outcome: J9Outcome,
    /// Bare tokens after the address range, in order (`OrdinaryMethod`, `JNI`, ...)
    pub flags: Vec<String>,
    /// `key=value` tokens (`bcsz`, `Q_SZ`, `compThread`, ...)
    pub properties: BTreeMap<String, String>,
}

impl J9CompileLine {
    /// Bytes of native code, `end - start` as unsigned
    pub fn native_size(&self) -> Option<u64> {
        match self.outcome {
            J9Outcome::Compiled { start, end } => Some(end.wrapping_sub(start)),
            J9Outcome::Failed { .. } => None,
        }
    }

    pub fn bytecode_size(&self) -> Option<u64> {
        self.properties.get("bcsz").and_then(|v| v.parse().ok())
    }
}

/// Split `(profiled very-hot)` into temperature and profiled bit
fn parse_temperature(text: &str) -> Result<(Temperature, bool), ParseError> {
    let text = text.trim();
    let (text, profiled) = match text.strip_prefix("profiled ") {
        Some(rest) => (rest.trim(), true),
        None => (text, false),
    };
    Temperature::from_name(text)
        .map(|t| (t, profiled))
        .ok_or_else(|| ParseError::InvalidFormat(format!("unknown J9 temperature '{}'", text)))
}

fn parse_address(text: &str) -> Result<u64, ParseError> {
    u64::from_str_radix(text, 16).map_err(|e| ParseError::InvalidNumber {
        value: text.to_string(),
        reason: e.to_string(),
    })
}

/// Split trailing tokens into bare flags and `key=value` properties
fn split_tokens(rest: &str) -> (Vec<String>, BTreeMap<String, String>) {
    let mut flags = Vec::new();
    let mut properties = BTreeMap::new();
    for token in rest.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                properties.insert(key.to_string(), value.to_string());
            }
            _ if token == "-" => {}
            _ => flags.push(token.to_string()),
        }
    }
    (flags, properties)
}

/// Decode one line
///
/// **Public** - used by [`J9LogParser`] and directly by tests
///
/// # Returns
/// * `Ok(None)` - the line is not a compile line
/// * `Ok(Some(line))` - a decoded success or failure
///
/// # Errors
/// * `ParseError` - the line has the compile-line shape but a field is bad
pub fn parse_j9_line(line: &str) -> Result<Option<J9CompileLine>, ParseError> {
    let line = line.trim_end();

    if let Some(caps) = compiled_pattern().and_then(|re| re.captures(line)) {
        let (temperature, profiled) = parse_temperature(&caps["temp"])?;
        let signature = MemberSignature::from_qualified(&caps["sig"])?;
        let start = parse_address(&caps["start"])?;
        let end = parse_address(&caps["end"])?;
        let (flags, properties) = split_tokens(&caps["rest"]);
        return Ok(Some(J9CompileLine {
            temperature: Some(temperature),
            profiled,
            signature,
            outcome: J9Outcome::Compiled { start, end },
            flags,
            properties,
        }));
    }

    if let Some(caps) = failed_pattern().and_then(|re| re.captures(line)) {
        let (temperature, profiled) = match caps.name("temp") {
            Some(temp) => {
                let (t, p) = parse_temperature(temp.as_str())?;
                (Some(t), p)
            }
            None => (None, false),
        };
        let signature = MemberSignature::from_qualified(&caps["sig"])?;
        let rest = &caps["rest"];
        let reason = failure_reason(rest);
        let (_, properties) = split_tokens(rest);
        return Ok(Some(J9CompileLine {
            temperature,
            profiled,
            signature,
            outcome: J9Outcome::Failed { reason },
            flags: Vec::new(),
            properties,
        }));
    }

    Ok(None)
}

/// Text inside `<...>` when present, else the bare tokens joined
fn failure_reason(rest: &str) -> Option<String> {
    if let (Some(open), Some(close)) = (rest.find('<'), rest.rfind('>')) {
        if open < close {
            return Some(rest[open + 1..close].trim().to_string());
        }
    }
    let (flags, _) = split_tokens(rest);
    if flags.is_empty() {
        None
    } else {
        Some(flags.join(" "))
    }
}

/// Streaming parser for J9 verbose logs
///
/// J9 prints no compile ids, so each compile line gets a sequential one.
#[derive(Debug, Default)]
pub struct J9LogParser {
    next_id: u64,
}

impl J9LogParser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JitLogParser for J9LogParser {
    fn format(&self) -> LogFormat {
        LogFormat::J9
    }

    fn process_line(&mut self, line: &str, model: &mut JitModel, diagnostics: &mut Diagnostics) {
        let decoded = match parse_j9_line(line) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => return,
            Err(e) => {
                diagnostics.report(DiagnosticKind::MalformedLine, e.to_string());
                return;
            }
        };

        self.next_id += 1;
        let key = CompileKey::standard(self.next_id.to_string());
        let bytecode_size = decoded.bytecode_size();
        let native_size = decoded.native_size();

        model.apply(
            CompilationEvent::Queued {
                key: key.clone(),
                signature: decoded.signature,
                tier: decoded.temperature.map(|t| t.tier()),
                stamp_ms: None,
                bytecode_size,
                vendor: VendorDetail::J9 {
                    temperature: decoded.temperature,
                    profiled: decoded.profiled,
                    flags: decoded.flags,
                },
            },
            diagnostics,
        );

        let completion = match decoded.outcome {
            J9Outcome::Compiled { start, .. } => CompilationEvent::Installed {
                key,
                address: start,
                size: native_size.unwrap_or(0),
                stamp_ms: None,
                compiler: decoded.temperature.map(|t| t.name().to_string()),
                tier: None,
            },
            J9Outcome::Failed { reason } => CompilationEvent::Failed {
                key,
                reason,
                stamp_ms: None,
            },
        };
        model.apply(completion, diagnostics);
    }
}
