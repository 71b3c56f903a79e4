//! Exception handler ranges of a method.

use serde::{Deserialize, Serialize};

/// Catch type javap prints for `finally` and catch-all handlers
pub const CATCH_ANY: &str = "any";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionTableEntry {
    pub start_offset: u32,
    /// Exclusive
    pub end_offset: u32,
    pub handler_offset: u32,
    /// Dotted class name, or `any`
    pub catch_type: String,
}

impl ExceptionTableEntry {
    pub fn new(start: u32, end: u32, handler: u32, catch_type: impl Into<String>) -> Self {
        Self {
            start_offset: start,
            end_offset: end,
            handler_offset: handler,
            catch_type: catch_type.into(),
        }
    }

    pub fn covers(&self, offset: u32) -> bool {
        (self.start_offset..self.end_offset).contains(&offset)
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_type == CATCH_ANY
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionTable {
    entries: Vec<ExceptionTableEntry>,
}

impl ExceptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ExceptionTableEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ExceptionTableEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry, in table order, whose `[start, end)` contains `offset`
    pub fn entry_for(&self, offset: u32) -> Option<&ExceptionTableEntry> {
        self.entries.iter().find(|e| e.covers(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_for_uses_table_order() {
        let mut table = ExceptionTable::new();
        table.push(ExceptionTableEntry::new(0, 5, 8, "java.io.IOException"));
        table.push(ExceptionTableEntry::new(0, 10, 16, CATCH_ANY));

        assert_eq!(table.entry_for(4).unwrap().handler_offset, 8);
        assert_eq!(table.entry_for(5).unwrap().handler_offset, 16);
        assert!(table.entry_for(5).unwrap().is_catch_all());
        assert!(table.entry_for(10).is_none());
    }
}
