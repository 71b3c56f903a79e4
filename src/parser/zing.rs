//! Zing / Prime compilation log parser.
//!
//! Each compilation prints two lines sharing a compile id:
//!
//! ```text
//!   1.200: 17 !s 2 java.lang.String::hashCode()I (60) (55 bytes)
//!   1.250: 17 !s 2 installed at 0x30001000 with size 0x1a0 ( java.lang.String::hashCode()I waited 12ms, compile time 3/5 ms ) c1
//! ```
//!
//! The optional token between id and tier holds flags in any order:
//! `!` throws, `%` has a BCI (OSR entry), `s` stashed.

use super::format::{JitLogParser, LogFormat};
use super::signature::MemberSignature;
use crate::model::{CompilationEvent, CompileKey, CompileKind, JitModel, VendorDetail};
use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use crate::utils::error::ParseError;
use log::debug;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn queued_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^\s*(?P<sec>\d+(?:\.\d+)?):\s+(?P<id>\d+)\s+(?:(?P<flags>[!%s]+)\s+)?(?P<tier>\d+)\s+(?P<sig>\S+)\s+\((?P<score>[^)]*)\)\s+\((?P<bytes>\d+)(?:\s*bytes)?\)",
            )
            .ok()
        })
        .as_ref()
}

fn installed_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^\s*(?P<sec>\d+(?:\.\d+)?):\s+(?P<id>\d+)\s+(?:(?P<flags>[!%s]+)\s+)?(?P<tier>\d+)\s+installed at 0x(?P<addr>[0-9A-Fa-f]+) with size 0x(?P<size>[0-9A-Fa-f]+)(?P<cache>\s+from object cache)?\s*\(\s*(?P<sig>\S+)\s+waited (?P<waited>\d+)\s*ms,\s*compile time (?P<cpu>\d+)/(?P<wall>\d+)\s*ms\s*\)(?P<trailer>.*)$",
            )
            .ok()
        })
        .as_ref()
}

/// Shape of a line, decided without a full parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZingLineKind {
    Queued,
    Installed,
    Other,
}

/// Classify a line by scanning its leading tokens
pub fn classify_line(line: &str) -> ZingLineKind {
    let mut tokens = line.split_whitespace().peekable();

    let timestamp_ok = tokens
        .next()
        .and_then(|t| t.strip_suffix(':'))
        .map(|t| t.parse::<f64>().is_ok())
        .unwrap_or(false);
    let id_ok = tokens
        .next()
        .map(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false);
    if !timestamp_ok || !id_ok {
        return ZingLineKind::Other;
    }

    if tokens
        .peek()
        .map(|t| is_flags_token(t))
        .unwrap_or(false)
    {
        tokens.next();
    }
    let tier_ok = tokens
        .next()
        .map(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false);
    if !tier_ok {
        return ZingLineKind::Other;
    }

    match (tokens.next(), tokens.next()) {
        (Some("installed"), Some("at")) => ZingLineKind::Installed,
        (Some(sig), Some(score)) if sig.contains('(') && score.starts_with('(') => {
            ZingLineKind::Queued
        }
        _ => ZingLineKind::Other,
    }
}

fn is_flags_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '!' | '%' | 's'))
}

/// Flags shared by both line shapes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZingFlags {
    pub throws: bool,
    pub has_bci: bool,
    pub stashed: bool,
}

impl ZingFlags {
    pub fn parse(token: Option<&str>) -> Self {
        let token = token.unwrap_or("");
        Self {
            throws: token.contains('!'),
            has_bci: token.contains('%'),
            stashed: token.contains('s'),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZingQueuedLine {
    pub timestamp_ms: u64,
    pub compile_id: String,
    pub flags: ZingFlags,
    pub tier: u8,
    pub signature: MemberSignature,
    pub score: String,
    pub bytecode_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZingInstalledLine {
    /// Compile start
    pub timestamp_ms: u64,
    pub compile_id: String,
    pub flags: ZingFlags,
    pub tier: u8,
    pub address: u64,
    pub size: u64,
    pub from_object_cache: bool,
    pub signature: MemberSignature,
    pub waited_ms: u64,
    pub cpu_time_ms: u64,
    pub wall_time_ms: u64,
    pub trailer: String,
}

/// One logical compilation after merging both lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZingCompilation {
    pub compile_id: String,
    pub tier: u8,
    pub signature: MemberSignature,
    pub queued_ms: u64,
    pub compile_start_ms: u64,
    pub installed_ms: u64,
    pub address: u64,
    pub native_size: u64,
    pub bytecode_size: Option<u64>,
    pub flags: ZingFlags,
    pub from_object_cache: bool,
}

fn seconds_to_ms(text: &str) -> Result<u64, ParseError> {
    let seconds: f64 = text.parse().map_err(|e: std::num::ParseFloatError| {
        ParseError::InvalidNumber {
            value: text.to_string(),
            reason: e.to_string(),
        }
    })?;
    Ok((seconds * 1000.0).round() as u64)
}

fn number<T: TryFrom<u64>>(caps: &Captures<'_>, group: &str, radix16: bool) -> Result<T, ParseError> {
    let text = &caps[group];
    let value = if radix16 {
        u64::from_str_radix(text, 16)
    } else {
        text.parse::<u64>()
    };
    value
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| ParseError::InvalidNumber {
            value: text.to_string(),
            reason: format!("bad {} field", group),
        })
}

pub fn parse_queued_line(line: &str) -> Result<Option<ZingQueuedLine>, ParseError> {
    let Some(caps) = queued_pattern().and_then(|re| re.captures(line)) else {
        return Ok(None);
    };
    Ok(Some(ZingQueuedLine {
        timestamp_ms: seconds_to_ms(&caps["sec"])?,
        compile_id: caps["id"].to_string(),
        flags: ZingFlags::parse(caps.name("flags").map(|m| m.as_str())),
        tier: number(&caps, "tier", false)?,
        signature: MemberSignature::from_qualified(&caps["sig"])?,
        score: caps["score"].trim().to_string(),
        bytecode_size: number(&caps, "bytes", false)?,
    }))
}

pub fn parse_installed_line(line: &str) -> Result<Option<ZingInstalledLine>, ParseError> {
    let Some(caps) = installed_pattern().and_then(|re| re.captures(line)) else {
        return Ok(None);
    };
    Ok(Some(ZingInstalledLine {
        timestamp_ms: seconds_to_ms(&caps["sec"])?,
        compile_id: caps["id"].to_string(),
        flags: ZingFlags::parse(caps.name("flags").map(|m| m.as_str())),
        tier: number(&caps, "tier", false)?,
        address: number(&caps, "addr", true)?,
        size: number(&caps, "size", true)?,
        from_object_cache: caps.name("cache").is_some(),
        signature: MemberSignature::from_qualified(&caps["sig"])?,
        waited_ms: number(&caps, "waited", false)?,
        cpu_time_ms: number(&caps, "cpu", false)?,
        wall_time_ms: number(&caps, "wall", false)?,
        trailer: caps["trailer"].trim().to_string(),
    }))
}

impl ZingInstalledLine {
    /// Combine with the queued line for the same id, if one was seen
    ///
    /// The installed line's signature wins. Flags from both lines are combined
    /// and the queued line contributes the bytecode size.
    pub fn merge(&self, queued: Option<&ZingQueuedLine>) -> ZingCompilation {
        let flags = ZingFlags {
            throws: self.flags.throws || queued.map(|q| q.flags.throws).unwrap_or(false),
            has_bci: self.flags.has_bci || queued.map(|q| q.flags.has_bci).unwrap_or(false),
            stashed: self.flags.stashed || queued.map(|q| q.flags.stashed).unwrap_or(false),
        };
        ZingCompilation {
            compile_id: self.compile_id.clone(),
            tier: self.tier,
            signature: self.signature.clone(),
            queued_ms: self.timestamp_ms.saturating_sub(self.waited_ms),
            compile_start_ms: self.timestamp_ms,
            installed_ms: self.timestamp_ms + self.wall_time_ms,
            address: self.address,
            native_size: self.size,
            bytecode_size: queued.map(|q| q.bytecode_size),
            flags,
            from_object_cache: self.from_object_cache,
        }
    }
}

fn compile_key(id: &str, flags: ZingFlags) -> CompileKey {
    let kind = if flags.has_bci {
        CompileKind::Osr
    } else {
        CompileKind::Standard
    };
    CompileKey::new(id, kind)
}

fn zing_vendor(flags: ZingFlags, from_object_cache: bool) -> VendorDetail {
    VendorDetail::Zing {
        stashed: flags.stashed,
        throws: flags.throws,
        has_bci: flags.has_bci,
        from_object_cache,
    }
}

/// Streaming Zing parser
///
/// A queued line creates its QUEUED record immediately. The installed line
/// for the same id then starts and installs that record, restating the queue
/// time from the `waited` figure. An install with no queued line creates the
/// record itself.
#[derive(Debug, Default)]
pub struct ZingLogParser {
    /// Queued lines not yet matched by an install, by compile id
    pending: HashMap<String, ZingQueuedLine>,
}

impl ZingLogParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn queued(
        &mut self,
        queued: ZingQueuedLine,
        model: &mut JitModel,
        diagnostics: &mut Diagnostics,
    ) {
        model.apply(
            CompilationEvent::Queued {
                key: compile_key(&queued.compile_id, queued.flags),
                signature: queued.signature.clone(),
                tier: Some(queued.tier),
                stamp_ms: Some(queued.timestamp_ms),
                bytecode_size: Some(queued.bytecode_size),
                vendor: zing_vendor(queued.flags, false),
            },
            diagnostics,
        );
        if let Some(previous) = self.pending.insert(queued.compile_id.clone(), queued) {
            debug!("Zing compile id {} queued again, keeping latest", previous.compile_id);
        }
    }

    fn installed(
        &mut self,
        installed: ZingInstalledLine,
        model: &mut JitModel,
        diagnostics: &mut Diagnostics,
    ) {
        let queued = self.pending.remove(&installed.compile_id);
        let merged = installed.merge(queued.as_ref());
        let key = match &queued {
            Some(queued) => compile_key(&queued.compile_id, queued.flags),
            None => {
                let key = compile_key(&merged.compile_id, merged.flags);
                model.apply(
                    CompilationEvent::Queued {
                        key: key.clone(),
                        signature: merged.signature.clone(),
                        tier: Some(merged.tier),
                        stamp_ms: Some(merged.queued_ms),
                        bytecode_size: merged.bytecode_size,
                        vendor: zing_vendor(merged.flags, merged.from_object_cache),
                    },
                    diagnostics,
                );
                key
            }
        };
        model.apply(
            CompilationEvent::Started {
                key: key.clone(),
                stamp_ms: Some(merged.compile_start_ms),
                queued_ms: Some(merged.queued_ms),
                vendor: Some(zing_vendor(merged.flags, merged.from_object_cache)),
                tag: None,
            },
            diagnostics,
        );
        model.apply(
            CompilationEvent::Installed {
                key,
                address: merged.address,
                size: merged.native_size,
                stamp_ms: Some(merged.installed_ms),
                compiler: None,
                tier: Some(merged.tier),
            },
            diagnostics,
        );
    }
}

impl JitLogParser for ZingLogParser {
    fn format(&self) -> LogFormat {
        LogFormat::Zing
    }

    fn process_line(&mut self, line: &str, model: &mut JitModel, diagnostics: &mut Diagnostics) {
        let (label, result) = match classify_line(line) {
            ZingLineKind::Other => return,
            ZingLineKind::Queued => (
                "queued",
                parse_queued_line(line)
                    .map(|parsed| parsed.map(|queued| self.queued(queued, model, diagnostics))),
            ),
            ZingLineKind::Installed => (
                "installed",
                parse_installed_line(line).map(|parsed| {
                    parsed.map(|installed| self.installed(installed, model, diagnostics))
                }),
            ),
        };

        match result {
            Ok(Some(())) => {}
            Ok(None) => diagnostics.report(
                DiagnosticKind::MalformedLine,
                format!("Unrecognised Zing {} line: {}", label, line.trim()),
            ),
            Err(e) => diagnostics.report(DiagnosticKind::MalformedLine, e.to_string()),
        }
    }

    fn finish(&mut self, _model: &mut JitModel, _diagnostics: &mut Diagnostics) {
        if !self.pending.is_empty() {
            debug!("{} Zing compilations never installed", self.pending.len());
        }
        self.pending.clear();
    }
}
