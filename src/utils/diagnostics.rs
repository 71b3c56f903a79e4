//! Non-fatal diagnostic channel.
//!
//! Malformed lines, unknown compile ids and unrecognized tags never abort a
//! parse. They are recorded here (and mirrored to the `log` facade) so the
//! caller can inspect what was skipped once the stream is done.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category of a diagnostic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A line that looked like it belonged to the grammar but could not be decoded
    MalformedLine,
    /// A completion event referenced a compile id never queued
    UnknownCompileId,
    /// A transition on a record already in a terminal state
    InvalidTransition,
    /// Closing tag did not match the innermost open tag
    UnbalancedTag,
    /// A tag whose name has no handler
    UnknownTag,
    /// A member's annotation build was aborted
    AnnotationFailed,
}

/// A single diagnostic entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// 1-based line number in the source, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    pub message: String,
}

/// Collected diagnostics for one log source
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    unknown_tags: BTreeSet<String>,
    current_line: Option<usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the line number attached to subsequent reports
    pub fn set_line(&mut self, line: usize) {
        self.current_line = Some(line);
    }

    /// Record a diagnostic against the current line
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        match self.current_line {
            Some(line) => warn!("line {}: {}", line, message),
            None => warn!("{}", message),
        }
        self.entries.push(Diagnostic {
            kind,
            line: self.current_line,
            message,
        });
    }

    /// Remember an unrecognized tag name
    ///
    /// Only the first sighting of a name is logged.
    pub fn unknown_tag(&mut self, name: &str) {
        if self.unknown_tags.insert(name.to_string()) {
            debug!("Unrecognized tag <{}>", name);
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn unknown_tags(&self) -> &BTreeSet<String> {
        &self.unknown_tags
    }

    /// Number of entries of a given kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.unknown_tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_attaches_line() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(DiagnosticKind::MalformedLine, "no line yet");
        diagnostics.set_line(42);
        diagnostics.report(DiagnosticKind::UnknownCompileId, "compile id 7");

        assert_eq!(diagnostics.entries()[0].line, None);
        assert_eq!(diagnostics.entries()[1].line, Some(42));
        assert_eq!(diagnostics.count(DiagnosticKind::UnknownCompileId), 1);
    }

    #[test]
    fn test_unknown_tags_are_a_set() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.unknown_tag("future_tag");
        diagnostics.unknown_tag("future_tag");
        diagnostics.unknown_tag("another");

        assert_eq!(diagnostics.unknown_tags().len(), 2);
        assert!(diagnostics.entries().is_empty());
        assert!(!diagnostics.is_empty());
    }
}
