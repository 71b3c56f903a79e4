//! Bytecode offset → source line mapping.
//!
//! A table keeps its own entries apart from entries composed in from other
//! tables (inlined callees). Offset queries see the union; range checks see
//! only the table's own lines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineTableEntry {
    pub offset: u32,
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTable {
    own: Vec<LineTableEntry>,
    /// Own entries plus everything composed in, ordered by (offset, line)
    all: BTreeSet<LineTableEntry>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut table = Self::new();
        for (offset, line) in entries {
            table.add(offset, line);
        }
        table
    }

    pub fn add(&mut self, offset: u32, line: u32) {
        let entry = LineTableEntry { offset, line };
        if self.all.insert(entry) || !self.own.contains(&entry) {
            self.own.push(entry);
        }
    }

    /// Union another table's entries (own and composed) into this one
    pub fn compose(&mut self, other: &LineTable) {
        self.all.extend(other.all.iter().copied());
    }

    /// The table's own entries in insertion order
    pub fn own_entries(&self) -> &[LineTableEntry] {
        &self.own
    }

    /// All entries, composed ones included, sorted by offset
    pub fn entries(&self) -> impl Iterator<Item = &LineTableEntry> {
        self.all.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Source line for a bytecode offset
    ///
    /// Uses the entry with the greatest offset not above `offset`. Offsets
    /// before the first entry clamp to the first entry's line.
    pub fn find_source_line_for_offset(&self, offset: u32) -> Option<u32> {
        let bound = LineTableEntry {
            offset,
            line: u32::MAX,
        };
        self.all
            .range(..=bound)
            .next_back()
            .or_else(|| self.all.iter().next())
            .map(|entry| entry.line)
    }

    /// `(min, max)` of the table's own source lines
    pub fn line_range(&self) -> Option<(u32, u32)> {
        let min = self.own.iter().map(|e| e.line).min()?;
        let max = self.own.iter().map(|e| e.line).max()?;
        Some((min, max))
    }

    /// Whether a source line falls within this table's own lines
    pub fn source_line_in_range(&self, line: u32) -> bool {
        self.line_range()
            .map(|(min, max)| (min..=max).contains(&line))
            .unwrap_or(false)
    }
}
