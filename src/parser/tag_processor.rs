//! Incremental reconstruction of nested tag trees.
//!
//! Lines are pushed one at a time. Open tags are kept on an explicit stack of
//! frames; when the outermost frame closes the finished tree is handed back
//! to the caller. Nothing is buffered beyond the currently open frames and at
//! most one wrapped tag line, so a log that is still being written can be
//! followed line by line.

use super::tag::{is_partial_tag, parse_tag_line, LogTag, TagLine};
use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use log::debug;

/// Longest wrapped tag kept while waiting for its `>`
const MAX_WRAPPED_TAG_LEN: usize = 64 * 1024;

/// Streaming tag tree builder, one per log source
#[derive(Debug, Default)]
pub struct TagProcessor {
    stack: Vec<LogTag>,
    transparent: Vec<String>,
    /// Start of a tag whose `>` has not arrived yet
    partial: Option<String>,
}

impl TagProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat the given tag names as section markers
    ///
    /// Opening and closing lines of these tags are skipped, so their
    /// contents are emitted as top-level tags.
    pub fn with_transparent_tags(mut self, names: &[&str]) -> Self {
        self.transparent = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Number of currently open frames
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Drop partially built trees
    pub fn reset(&mut self) {
        if !self.stack.is_empty() {
            debug!("Discarding {} open tag frames", self.stack.len());
        }
        self.stack.clear();
        self.partial = None;
    }

    /// Whether a wrapped tag is still waiting for its closing `>`
    pub fn has_partial_line(&self) -> bool {
        self.partial.is_some()
    }

    /// Push one line; returns a tag once a top-level tree is complete
    ///
    /// **Public** - main entry point for the tag stream
    ///
    /// Lines that are not tag syntax are ignored.
    pub fn process_line(&mut self, line: &str) -> Option<LogTag> {
        let mut ignored = Diagnostics::new();
        self.process_line_with(line, &mut ignored)
    }

    /// As [`process_line`](Self::process_line), reporting unbalanced closes
    pub fn process_line_with(
        &mut self,
        line: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<LogTag> {
        let mut held = self.partial.take();
        if line.trim_start().starts_with('<') {
            // A new tag ends any held head
            if let Some(head) = held.take() {
                diagnostics.report(
                    DiagnosticKind::MalformedLine,
                    format!("Dropping unterminated tag: {}", head),
                );
            }
        }
        let joined = held.map(|mut head| {
            head.push(' ');
            head.push_str(line.trim());
            head
        });
        let line = joined.as_deref().unwrap_or(line);
        if is_partial_tag(line) {
            if line.len() > MAX_WRAPPED_TAG_LEN {
                diagnostics.report(
                    DiagnosticKind::MalformedLine,
                    format!("Dropping unterminated tag after {} bytes", line.len()),
                );
                return None;
            }
            self.partial = Some(line.trim().to_string());
            return None;
        }

        let tag_line = parse_tag_line(line)?;

        match tag_line {
            TagLine::Open { name, attributes } => {
                if self.is_transparent(&name) {
                    return None;
                }
                let mut frame = LogTag::new(name);
                for (key, value) in &attributes {
                    frame.set_attribute(key, value);
                }
                self.stack.push(frame);
                None
            }
            TagLine::Close { name } => {
                if self.is_transparent(&name) {
                    return None;
                }
                match self.stack.last() {
                    Some(top) if top.name() == name => {}
                    Some(top) => {
                        diagnostics.report(
                            DiagnosticKind::UnbalancedTag,
                            format!("Closing </{}> while <{}> is open", name, top.name()),
                        );
                        return None;
                    }
                    None => {
                        diagnostics.report(
                            DiagnosticKind::UnbalancedTag,
                            format!("Closing </{}> with no open tag", name),
                        );
                        return None;
                    }
                }
                let finished = self.stack.pop()?;
                self.attach_or_emit(finished)
            }
            complete @ (TagLine::SelfClosing { .. } | TagLine::Inline { .. }) => {
                let tag = complete.into_complete_tag()?;
                if self.is_transparent(tag.name()) {
                    return None;
                }
                self.attach_or_emit(tag)
            }
        }
    }

    fn attach_or_emit(&mut self, tag: LogTag) -> Option<LogTag> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.push_child(tag);
                None
            }
            None => Some(tag),
        }
    }

    fn is_transparent(&self, name: &str) -> bool {
        self.transparent.iter().any(|t| t == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_closing_at_depth_zero_is_returned() {
        let mut processor = TagProcessor::new();
        let tag = processor
            .process_line("<task_queued compile_id='1'/>")
            .unwrap();
        assert_eq!(tag.name(), "task_queued");
        assert!(tag.is_self_closing());
        assert_eq!(processor.depth(), 0);
    }

    #[test]
    fn test_nested_tree_emitted_on_outer_close() {
        let mut processor = TagProcessor::new();
        let lines = [
            "<task compile_id='1'>",
            "<phase name='parse'>",
            "<parse method='820'>",
            "<bc code='182' bci='3'/>",
            "</parse>",
            "</phase>",
            "<task_done success='1'/>",
        ];
        for line in lines {
            assert!(processor.process_line(line).is_none());
        }
        assert_eq!(processor.depth(), 1);

        let task = processor.process_line("</task>").unwrap();
        assert_eq!(task.attribute("compile_id"), Some("1"));
        assert_eq!(task.children().len(), 2);
        assert_eq!(task.children()[0].name(), "phase");
        assert_eq!(task.children()[1].name(), "task_done");
        let bc = task.find_first("bc").unwrap();
        assert_eq!(bc.attribute("bci"), Some("3"));
    }

    #[test]
    fn test_text_lines_ignored() {
        let mut processor = TagProcessor::new();
        assert!(processor.process_line("<vm_version>").is_none());
        assert!(processor.process_line("Java HotSpot(TM) 64-Bit Server VM").is_none());
        let tag = processor.process_line("</vm_version>").unwrap();
        assert!(tag.children().is_empty());
    }

    #[test]
    fn test_transparent_sections_stream_children() {
        let mut processor = TagProcessor::new().with_transparent_tags(&["hotspot_log", "tty"]);
        assert!(processor.process_line("<hotspot_log version='160 1' process='1'>").is_none());
        assert!(processor.process_line("<tty>").is_none());
        let tag = processor
            .process_line("<task_queued compile_id='3'/>")
            .unwrap();
        assert_eq!(tag.attribute("compile_id"), Some("3"));
        assert!(processor.process_line("</tty>").is_none());
        assert_eq!(processor.depth(), 0);
    }

    #[test]
    fn test_unbalanced_close_reported() {
        let mut processor = TagProcessor::new();
        let mut diagnostics = Diagnostics::new();
        processor.process_line_with("<task>", &mut diagnostics);
        assert!(processor
            .process_line_with("</phase>", &mut diagnostics)
            .is_none());
        assert!(processor
            .process_line_with("</task>", &mut diagnostics)
            .is_some());
        assert!(processor
            .process_line_with("</task>", &mut diagnostics)
            .is_none());
        assert_eq!(diagnostics.count(DiagnosticKind::UnbalancedTag), 2);
    }

    #[test]
    fn test_tag_wrapped_over_lines() {
        let mut processor = TagProcessor::new();
        assert!(processor
            .process_line("<task_queued compile_id='8' method='a/B run ()V'")
            .is_none());
        assert!(processor.has_partial_line());
        let tag = processor
            .process_line("  bytes='12' level='3' stamp='0.5'/>")
            .unwrap();
        assert_eq!(tag.attribute("method"), Some("a/B run ()V"));
        assert_eq!(tag.attribute("level"), Some("3"));
        assert!(!processor.has_partial_line());
    }

    #[test]
    fn test_unterminated_head_dropped_when_next_tag_starts() {
        let mut processor = TagProcessor::new();
        let mut diagnostics = Diagnostics::new();
        assert!(processor
            .process_line_with("<task_queued compile_id='8' method='a/B run ()V'", &mut diagnostics)
            .is_none());
        let tag = processor
            .process_line_with("<nmethod compile_id='7'/>", &mut diagnostics)
            .unwrap();
        assert_eq!(tag.name(), "nmethod");
        assert!(!processor.has_partial_line());
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedLine), 1);
    }

    #[test]
    fn test_stray_text_with_angle_bracket_not_held() {
        let mut processor = TagProcessor::new();
        assert!(processor.process_line("<it's a text line from stdout").is_none());
        assert!(!processor.has_partial_line());
        let tag = processor.process_line("<task_queued compile_id='5'/>").unwrap();
        assert_eq!(tag.attribute("compile_id"), Some("5"));
    }

    #[test]
    fn test_reset_discards_partial_tree() {
        let mut processor = TagProcessor::new();
        processor.process_line("<task>");
        processor.process_line("<phase>");
        processor.reset();
        assert_eq!(processor.depth(), 0);
        assert!(processor.process_line("</phase>").is_none());
    }
}
