//! Compilation records and their lifecycle.
//!
//! A record is created when a compilation is queued and moves exactly once
//! into a terminal state:
//!
//! ```text
//! QUEUED --nmethod--> INSTALLED
//!    \----failure---> FAILED
//! ```

use super::tree::MemberId;
use crate::parser::tag::LogTag;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Lifecycle state of a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilationState {
    Queued,
    Installed,
    Failed,
}

impl CompilationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompilationState::Queued)
    }
}

impl fmt::Display for CompilationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompilationState::Queued => "QUEUED",
            CompilationState::Installed => "INSTALLED",
            CompilationState::Failed => "FAILED",
        };
        write!(f, "{}", text)
    }
}

/// Standard compilation or on-stack replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileKind {
    #[default]
    Standard,
    Osr,
}

impl CompileKind {
    /// HotSpot marks OSR compilations with `compile_kind='osr'`
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("osr") => CompileKind::Osr,
            _ => CompileKind::Standard,
        }
    }
}

/// Compile ids are only unique within a compile kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompileKey {
    pub id: String,
    pub kind: CompileKind,
}

impl CompileKey {
    pub fn new(id: impl Into<String>, kind: CompileKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn standard(id: impl Into<String>) -> Self {
        Self::new(id, CompileKind::Standard)
    }
}

impl fmt::Display for CompileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CompileKind::Standard => write!(f, "{}", self.id),
            CompileKind::Osr => write!(f, "{}%", self.id),
        }
    }
}

/// OpenJ9 compilation temperature (optimization level)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Temperature {
    NoOpt,
    Cold,
    Warm,
    Hot,
    VeryHot,
    Scorching,
    AotCold,
    AotWarm,
    AotHot,
    AotLoad,
}

impl Temperature {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "no-opt" | "noOpt" => Some(Temperature::NoOpt),
            "cold" => Some(Temperature::Cold),
            "warm" => Some(Temperature::Warm),
            "hot" => Some(Temperature::Hot),
            "very-hot" | "veryHot" => Some(Temperature::VeryHot),
            "scorching" => Some(Temperature::Scorching),
            "AOT cold" | "aot cold" => Some(Temperature::AotCold),
            "AOT warm" | "aot warm" => Some(Temperature::AotWarm),
            "AOT hot" | "aot hot" => Some(Temperature::AotHot),
            "AOT load" | "aot load" => Some(Temperature::AotLoad),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Temperature::NoOpt => "no-opt",
            Temperature::Cold => "cold",
            Temperature::Warm => "warm",
            Temperature::Hot => "hot",
            Temperature::VeryHot => "very-hot",
            Temperature::Scorching => "scorching",
            Temperature::AotCold => "AOT cold",
            Temperature::AotWarm => "AOT warm",
            Temperature::AotHot => "AOT hot",
            Temperature::AotLoad => "AOT load",
        }
    }

    /// Rough tier equivalent, used for per-tier statistics
    pub fn tier(&self) -> u8 {
        match self {
            Temperature::NoOpt | Temperature::AotLoad => 0,
            Temperature::Cold | Temperature::AotCold => 1,
            Temperature::Warm | Temperature::AotWarm => 2,
            Temperature::Hot | Temperature::AotHot => 3,
            Temperature::VeryHot => 4,
            Temperature::Scorching => 5,
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Vendor-specific facts that don't map onto the common record
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VendorDetail {
    #[default]
    HotSpot,
    J9 {
        /// Absent on some failure lines
        temperature: Option<Temperature>,
        profiled: bool,
        flags: Vec<String>,
    },
    Zing {
        stashed: bool,
        throws: bool,
        has_bci: bool,
        from_object_cache: bool,
    },
}

/// One compilation of one member
#[derive(Debug, Clone)]
pub struct CompilationRecord {
    /// Position in the owning member's compilation list
    pub index: usize,
    pub member: MemberId,
    pub compile_id: String,
    pub kind: CompileKind,
    pub compiler: Option<String>,
    pub tier: Option<u8>,
    pub queued_ms: Option<u64>,
    pub compile_start_ms: Option<u64>,
    /// When the nmethod was emitted
    pub installed_ms: Option<u64>,
    pub address_range: Option<Range<u64>>,
    pub native_size: Option<u64>,
    pub bytecode_size: Option<u64>,
    pub failure_reason: Option<String>,
    /// The `<task>` subtree for this compilation, once seen
    pub tag: Option<LogTag>,
    pub vendor: VendorDetail,
    state: CompilationState,
}

impl CompilationRecord {
    /// Create a record in the QUEUED state
    pub fn queued(member: MemberId, index: usize, key: &CompileKey) -> Self {
        Self {
            index,
            member,
            compile_id: key.id.clone(),
            kind: key.kind,
            compiler: None,
            tier: None,
            queued_ms: None,
            compile_start_ms: None,
            installed_ms: None,
            address_range: None,
            native_size: None,
            bytecode_size: None,
            failure_reason: None,
            tag: None,
            vendor: VendorDetail::HotSpot,
            state: CompilationState::Queued,
        }
    }

    pub fn state(&self) -> CompilationState {
        self.state
    }

    pub fn key(&self) -> CompileKey {
        CompileKey::new(self.compile_id.clone(), self.kind)
    }

    /// Move to INSTALLED with the native range `[start, start + size)`
    ///
    /// Returns the current state unchanged as an error if the record is
    /// already terminal.
    pub fn mark_installed(
        &mut self,
        start: u64,
        size: u64,
        stamp_ms: Option<u64>,
    ) -> Result<(), CompilationState> {
        if self.state.is_terminal() {
            return Err(self.state);
        }
        self.address_range = Some(start..start.saturating_add(size));
        self.native_size = Some(size);
        if stamp_ms.is_some() {
            self.installed_ms = stamp_ms;
        }
        self.state = CompilationState::Installed;
        Ok(())
    }

    /// Move to FAILED; no address range is ever set
    pub fn mark_failed(
        &mut self,
        reason: Option<String>,
        stamp_ms: Option<u64>,
    ) -> Result<(), CompilationState> {
        if self.state.is_terminal() {
            return Err(self.state);
        }
        self.failure_reason = reason;
        if self.compile_start_ms.is_none() {
            self.compile_start_ms = stamp_ms;
        }
        self.state = CompilationState::Failed;
        Ok(())
    }

    /// Milliseconds from compile start to nmethod emission
    pub fn compile_time_ms(&self) -> Option<u64> {
        match (self.compile_start_ms, self.installed_ms) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        }
    }

    /// Milliseconds spent waiting in the compile queue
    pub fn queue_delay_ms(&self) -> Option<u64> {
        match (self.queued_ms, self.compile_start_ms) {
            (Some(queued), Some(start)) if start >= queued => Some(start - queued),
            _ => None,
        }
    }

    /// Whether a native address falls within this compilation's code
    pub fn contains_address(&self, address: u64) -> bool {
        self.address_range
            .as_ref()
            .map(|range| range.contains(&address))
            .unwrap_or(false)
    }
}
