//! Log tag tree and single-line tag syntax.
//!
//! HotSpot's LogCompilation output is XML-like but written one tag per line,
//! so each line is classified on its own: opening tag, closing tag,
//! self-closing tag, or an open/close pair with inline text.

use std::fmt;

/// One node of a reconstructed tag tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTag {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<LogTag>,
    self_closing: bool,
    text: Option<String>,
}

impl LogTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            text: None,
        }
    }

    /// Build a self-closing tag from parsed attributes
    pub fn self_closing(name: impl Into<String>, attributes: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            attributes,
            children: Vec::new(),
            self_closing: true,
            text: None,
        }
    }

    /// Builder-style attribute setter, last value wins
    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: LogTag) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[LogTag] {
        &self.children
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Parse an attribute as an unsigned decimal number
    pub fn attribute_u64(&self, key: &str) -> Option<u64> {
        self.attribute(key).and_then(|v| v.trim().parse().ok())
    }

    /// Parse an attribute holding a `0x`-prefixed (or bare) hex number
    pub fn attribute_hex(&self, key: &str) -> Option<u64> {
        let value = self.attribute(key)?.trim();
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        u64::from_str_radix(digits, 16).ok()
    }

    /// Parse a `stamp='1.234'` style seconds attribute into milliseconds
    pub fn attribute_stamp_ms(&self, key: &str) -> Option<u64> {
        let seconds: f64 = self.attribute(key)?.trim().parse().ok()?;
        if seconds.is_finite() && seconds >= 0.0 {
            Some((seconds * 1000.0).round() as u64)
        } else {
            None
        }
    }

    /// Insert or overwrite an attribute, keeping first-seen position
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub(crate) fn push_child(&mut self, child: LogTag) {
        self.children.push(child);
    }

    /// First direct child with the given name
    pub fn first_child(&self, name: &str) -> Option<&LogTag> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Depth-first search (pre-order, self included) for the first tag with a name
    pub fn find_first(&self, name: &str) -> Option<&LogTag> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_first(name))
    }

    /// All descendants (self included) with the given name, in document order
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a LogTag> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a LogTag>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect_named(name, found);
        }
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name)?;
        for (key, value) in &self.attributes {
            write!(f, " {}='{}'", key, escape_entities(value))?;
        }
        if self.self_closing {
            write!(f, "/>")
        } else {
            write!(f, ">")
        }
    }
}

/// Classification of a single trimmed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagLine {
    Open {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Close {
        name: String,
    },
    SelfClosing {
        name: String,
        attributes: Vec<(String, String)>,
    },
    /// `<name attrs>text</name>` on one line
    Inline {
        name: String,
        attributes: Vec<(String, String)>,
        text: String,
    },
}

impl TagLine {
    pub fn into_complete_tag(self) -> Option<LogTag> {
        match self {
            TagLine::SelfClosing { name, attributes } => {
                Some(LogTag::self_closing(name, attributes))
            }
            TagLine::Inline {
                name,
                attributes,
                text,
            } => {
                let mut tag = LogTag::new(name);
                tag.attributes = attributes;
                tag.text = Some(unescape_entities(&text));
                Some(tag)
            }
            _ => None,
        }
    }
}

/// Classify a line as tag syntax
///
/// **Public** - used by the stream tag processor
///
/// Returns `None` for lines that are not a tag (text content, CDATA, blank
/// lines, processing instructions).
pub fn parse_tag_line(line: &str) -> Option<TagLine> {
    let line = line.trim();
    let body = line.strip_prefix('<')?;
    if body.starts_with('?') || body.starts_with('!') {
        return None;
    }

    if let Some(rest) = body.strip_prefix('/') {
        let name = rest.strip_suffix('>')?.trim();
        return is_tag_name(name).then(|| TagLine::Close {
            name: name.to_string(),
        });
    }

    let name_end = body
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if !is_tag_name(name) {
        return None;
    }
    let rest = &body[name_end..];
    let close_at = find_tag_end(rest)?;
    let head = &rest[..close_at];
    let tail = &rest[close_at + 1..];

    if let Some(attr_text) = head.strip_suffix('/') {
        if !tail.trim().is_empty() {
            return None;
        }
        return Some(TagLine::SelfClosing {
            name: name.to_string(),
            attributes: parse_attributes(attr_text),
        });
    }

    let attributes = parse_attributes(head);
    if tail.trim().is_empty() {
        return Some(TagLine::Open {
            name: name.to_string(),
            attributes,
        });
    }

    let closing = format!("</{}>", name);
    let text = tail.trim_end().strip_suffix(closing.as_str())?;
    Some(TagLine::Inline {
        name: name.to_string(),
        attributes,
        text: text.to_string(),
    })
}

/// Whether a line starts a tag whose closing `>` is on a later line
///
/// HotSpot wraps long attribute lists; the continuation lines carry no `<`.
/// The head must read as a tag name followed by attribute text, so stray
/// console output such as `<it's done` is not held.
pub fn is_partial_tag(line: &str) -> bool {
    let Some(body) = line.trim().strip_prefix('<') else {
        return false;
    };
    let name_end = body.find(char::is_whitespace).unwrap_or(body.len());
    if !is_tag_name(&body[..name_end]) {
        return false;
    }
    let attributes = body[name_end..].trim_start();
    if !attributes.is_empty() && !attributes.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return false;
    }
    find_tag_end(body).is_none()
}

/// Position of the `>` ending the opening tag, skipping quoted values
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in rest.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '>' => return Some(i),
            None => {}
        }
    }
    None
}

fn is_tag_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Split `key='value' key2="value2"` pairs in first-seen order
///
/// **Public** - attribute grammar shared by all tag parsing
///
/// Later duplicates overwrite the earlier value in place. Values are
/// entity-unescaped. Malformed trailing text is dropped.
pub fn parse_attributes(text: &str) -> Vec<(String, String)> {
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut rest = text.trim_start();

    while let Some(eq) = rest.find('=') {
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();
        let Some(quote) = after.chars().next().filter(|c| *c == '\'' || *c == '"') else {
            break;
        };
        let value_text = &after[1..];
        let Some(end) = value_text.find(quote) else {
            break;
        };
        let value = unescape_entities(&value_text[..end]);

        if !key.is_empty() {
            match attributes.iter_mut().find(|(k, _)| k == key) {
                Some(entry) => entry.1 = value,
                None => attributes.push((key.to_string(), value)),
            }
        }
        rest = value_text[end + 1..].trim_start();
    }

    attributes
}

/// Decode the five predefined XML entities and numeric character references
pub fn unescape_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate.find(';').and_then(|semi| {
            let entity = &candidate[1..semi];
            let c = match entity {
                "apos" => Some('\''),
                "quot" => Some('"'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                _ => decode_numeric_entity(entity),
            };
            c.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Inverse of [`unescape_entities`] for the characters that matter in attributes
pub fn escape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_tag_detection() {
        assert!(is_partial_tag("<task_queued compile_id='1'"));
        assert!(is_partial_tag("<failure reason='line one"));
        assert!(!is_partial_tag("<task_queued compile_id='1'/>"));
        assert!(!is_partial_tag("</task>"));
        assert!(!is_partial_tag("plain text"));
        assert!(!is_partial_tag("<it's a text line from stdout"));
        assert!(!is_partial_tag("<task_queued 'stray"));
        assert!(is_partial_tag("<task_queued"));
    }

    #[test]
    fn test_parse_self_closing() {
        let line = "<task_queued compile_id='1' method='java/lang/String hashCode ()I' bytes='55'/>";
        match parse_tag_line(line).unwrap() {
            TagLine::SelfClosing { name, attributes } => {
                assert_eq!(name, "task_queued");
                assert_eq!(attributes[0], ("compile_id".to_string(), "1".to_string()));
                assert_eq!(attributes[1].1, "java/lang/String hashCode ()I");
                assert_eq!(attributes.len(), 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_open_and_close() {
        assert!(matches!(
            parse_tag_line("  <task compile_id='2' stamp='0.5'>"),
            Some(TagLine::Open { ref name, .. }) if name == "task"
        ));
        assert_eq!(
            parse_tag_line("</task>"),
            Some(TagLine::Close {
                name: "task".to_string()
            })
        );
    }

    #[test]
    fn test_parse_inline_text() {
        let tag = parse_tag_line("<name>Java HotSpot(TM) 64-Bit Server VM</name>")
            .unwrap()
            .into_complete_tag()
            .unwrap();
        assert_eq!(tag.name(), "name");
        assert_eq!(tag.text(), Some("Java HotSpot(TM) 64-Bit Server VM"));
    }

    #[test]
    fn test_non_tag_lines_ignored() {
        assert_eq!(parse_tag_line("Java HotSpot(TM) 64-Bit Server VM"), None);
        assert_eq!(parse_tag_line(""), None);
        assert_eq!(parse_tag_line("<?xml version='1.0' encoding='UTF-8'?>"), None);
        assert_eq!(parse_tag_line("<![CDATA[foo]]>"), None);
        assert_eq!(parse_tag_line("< 3"), None);
    }

    #[test]
    fn test_duplicate_attribute_last_wins() {
        let attributes = parse_attributes("a='1' b='2' a='3'");
        assert_eq!(
            attributes,
            vec![
                ("a".to_string(), "3".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_attribute_entities_unescaped() {
        let attributes = parse_attributes("reason='callee is too large &amp; hot' sig='&lt;init&gt;'");
        assert_eq!(attributes[0].1, "callee is too large & hot");
        assert_eq!(attributes[1].1, "<init>");
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let tag = parse_tag_line("<klass name='a>b' flags='1'/>")
            .unwrap()
            .into_complete_tag()
            .unwrap();
        assert_eq!(tag.attribute("name"), Some("a>b"));
        assert_eq!(tag.attribute("flags"), Some("1"));
    }

    #[test]
    fn test_unescape_numeric_and_unknown() {
        assert_eq!(unescape_entities("&#65;&#x42;"), "AB");
        assert_eq!(unescape_entities("a & b &bogus;"), "a & b &bogus;");
    }

    #[test]
    fn test_typed_attributes() {
        let tag = LogTag::new("nmethod")
            .with_attribute("address", "0x00007f0000001000")
            .with_attribute("size", "256")
            .with_attribute("stamp", "1.2345");
        assert_eq!(tag.attribute_hex("address"), Some(0x7f0000001000));
        assert_eq!(tag.attribute_u64("size"), Some(256));
        assert_eq!(tag.attribute_stamp_ms("stamp"), Some(1235));
    }

    #[test]
    fn test_find_all_in_document_order() {
        let tree = LogTag::new("task")
            .with_child(LogTag::new("bc").with_attribute("bci", "1"))
            .with_child(LogTag::new("parse").with_child(LogTag::new("bc").with_attribute("bci", "2")));
        let bcs: Vec<&str> = tree
            .find_all("bc")
            .iter()
            .filter_map(|t| t.attribute("bci"))
            .collect();
        assert_eq!(bcs, vec!["1", "2"]);
        assert!(tree.find_first("parse").is_some());
    }
}
