//! HotSpot LogCompilation parser.
//!
//! Lines go through the [`TagProcessor`]; each completed top-level tag is
//! dispatched through a table built once at construction:
//!
//! - `<task_queued .../>` → a new QUEUED record
//! - `<nmethod .../>` → INSTALLED with the emitted address range
//! - `<task>...</task>` → compile start, subtree attached, FAILED on failure

use super::format::{JitLogParser, LogFormat};
use super::signature::{decode_access_flags, MemberSignature};
use super::tag::LogTag;
use super::tag_processor::TagProcessor;
use crate::model::{CompilationEvent, CompileKey, CompileKind, JitModel, VendorDetail};
use crate::utils::config::{HOTSPOT_CONTAINER_TAGS, HOTSPOT_IGNORED_TAGS};
use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use log::debug;
use std::collections::HashMap;

/// Tag names the HotSpot parser acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    TaskQueued,
    Nmethod,
    Task,
}

impl TagKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "task_queued" => Some(TagKind::TaskQueued),
            "nmethod" => Some(TagKind::Nmethod),
            "task" => Some(TagKind::Task),
            _ => None,
        }
    }

    pub fn all() -> &'static [TagKind] {
        &[TagKind::TaskQueued, TagKind::Nmethod, TagKind::Task]
    }
}

type TagHandler = fn(LogTag, &mut JitModel, &mut Diagnostics);

/// Streaming parser for `-XX:+LogCompilation` output
pub struct HotSpotLogParser {
    processor: TagProcessor,
    handlers: HashMap<TagKind, TagHandler>,
    tags_seen: usize,
}

impl Default for HotSpotLogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HotSpotLogParser {
    pub fn new() -> Self {
        let handlers = TagKind::all()
            .iter()
            .map(|kind| {
                let handler: TagHandler = match kind {
                    TagKind::TaskQueued => handle_task_queued,
                    TagKind::Nmethod => handle_nmethod,
                    TagKind::Task => handle_task,
                };
                (*kind, handler)
            })
            .collect();

        Self {
            processor: TagProcessor::new().with_transparent_tags(HOTSPOT_CONTAINER_TAGS),
            handlers,
            tags_seen: 0,
        }
    }

    /// Top-level tags completed so far
    pub fn tags_seen(&self) -> usize {
        self.tags_seen
    }

    /// Route one completed top-level tag
    pub fn dispatch(&mut self, tag: LogTag, model: &mut JitModel, diagnostics: &mut Diagnostics) {
        self.tags_seen += 1;
        match TagKind::from_name(tag.name()).and_then(|kind| self.handlers.get(&kind)) {
            Some(handler) => handler(tag, model, diagnostics),
            None if HOTSPOT_IGNORED_TAGS.contains(&tag.name()) => {}
            None => diagnostics.unknown_tag(tag.name()),
        }
    }
}

impl JitLogParser for HotSpotLogParser {
    fn format(&self) -> LogFormat {
        LogFormat::HotSpot
    }

    fn process_line(&mut self, line: &str, model: &mut JitModel, diagnostics: &mut Diagnostics) {
        if let Some(tag) = self.processor.process_line_with(line, diagnostics) {
            self.dispatch(tag, model, diagnostics);
        }
    }

    fn finish(&mut self, _model: &mut JitModel, diagnostics: &mut Diagnostics) {
        if self.processor.depth() > 0 || self.processor.has_partial_line() {
            diagnostics.report(
                DiagnosticKind::UnbalancedTag,
                format!(
                    "Log ended with {} unclosed tags",
                    self.processor.depth() + usize::from(self.processor.has_partial_line())
                ),
            );
            self.processor.reset();
        }
    }
}

fn compile_key(tag: &LogTag) -> Option<CompileKey> {
    let id = tag.attribute("compile_id")?;
    Some(CompileKey::new(
        id,
        CompileKind::from_attribute(tag.attribute("compile_kind")),
    ))
}

fn tier_of(tag: &LogTag) -> Option<u8> {
    tag.attribute("level").and_then(|l| l.parse().ok())
}

fn handle_task_queued(tag: LogTag, model: &mut JitModel, diagnostics: &mut Diagnostics) {
    let (Some(key), Some(method)) = (compile_key(&tag), tag.attribute("method")) else {
        diagnostics.report(
            DiagnosticKind::MalformedLine,
            format!("task_queued without compile_id or method: {}", tag),
        );
        return;
    };
    let signature = match MemberSignature::from_hotspot(method) {
        Ok(signature) => signature,
        Err(e) => {
            diagnostics.report(DiagnosticKind::MalformedLine, e.to_string());
            return;
        }
    };

    model.apply(
        CompilationEvent::Queued {
            key,
            signature,
            tier: tier_of(&tag),
            stamp_ms: tag.attribute_stamp_ms("stamp"),
            bytecode_size: tag.attribute_u64("bytes"),
            vendor: VendorDetail::HotSpot,
        },
        diagnostics,
    );
}

fn handle_nmethod(tag: LogTag, model: &mut JitModel, diagnostics: &mut Diagnostics) {
    // Native wrappers are installed without ever being queued
    if tag.attribute("compile_kind") == Some("c2n") {
        debug!("Skipping native wrapper nmethod {}", tag);
        return;
    }
    let (Some(key), Some(address)) = (compile_key(&tag), tag.attribute_hex("address")) else {
        diagnostics.report(
            DiagnosticKind::MalformedLine,
            format!("nmethod without compile_id or address: {}", tag),
        );
        return;
    };

    model.apply(
        CompilationEvent::Installed {
            key,
            address,
            size: tag.attribute_u64("size").unwrap_or(0),
            stamp_ms: tag.attribute_stamp_ms("stamp"),
            compiler: tag.attribute("compiler").map(str::to_string),
            tier: tier_of(&tag),
        },
        diagnostics,
    );
}

fn handle_task(tag: LogTag, model: &mut JitModel, diagnostics: &mut Diagnostics) {
    let Some(key) = compile_key(&tag) else {
        diagnostics.report(
            DiagnosticKind::MalformedLine,
            format!("task without compile_id: {}", tag),
        );
        return;
    };

    let failure = task_failure(&tag);
    let modifiers = TaskMethodIndex::new(&tag)
        .root_method()
        .and_then(|m| m.attribute_u64("flags"))
        .map(|flags| decode_access_flags(flags as u32));
    let done_stamp = tag
        .find_first("task_done")
        .and_then(|done| done.attribute_stamp_ms("stamp"));

    let touched = model.apply(
        CompilationEvent::Started {
            key: key.clone(),
            stamp_ms: tag.attribute_stamp_ms("stamp"),
            queued_ms: None,
            vendor: None,
            tag: Some(tag),
        },
        diagnostics,
    );
    let Some((member, _)) = touched else {
        return;
    };

    if let Some((modifiers, varargs)) = modifiers {
        model
            .member_mut(member)
            .set_modifiers_if_unknown(modifiers, varargs);
    }

    if let Some(reason) = failure {
        model.apply(
            CompilationEvent::Failed {
                key,
                reason,
                stamp_ms: done_stamp,
            },
            diagnostics,
        );
    }
}

/// `Some(reason)` when the task reports failure
///
/// Failure is signalled by `<task_done success='0'/>` and usually explained
/// by a preceding `<failure reason='...'/>`.
fn task_failure(task: &LogTag) -> Option<Option<String>> {
    let reason = task
        .find_first("failure")
        .and_then(|f| f.attribute("reason"))
        .map(str::to_string);
    let unsuccessful = task
        .find_first("task_done")
        .map(|done| done.attribute("success") == Some("0"))
        .unwrap_or(false);

    if unsuccessful || (reason.is_some() && task.find_first("task_done").is_none()) {
        Some(reason)
    } else {
        None
    }
}

/// Id tables declared inside one `<task>` subtree
///
/// **Public** - shared by the annotation builder and hot-throw detector
///
/// `<type>`, `<klass>` and `<method>` tags introduce ids that later tags
/// (`parse`, `call`, `jvms`) refer to.
pub struct TaskMethodIndex<'a> {
    types: HashMap<&'a str, &'a str>,
    klasses: HashMap<&'a str, &'a str>,
    methods: HashMap<&'a str, &'a LogTag>,
    root: Option<&'a LogTag>,
}

impl<'a> TaskMethodIndex<'a> {
    pub fn new(task: &'a LogTag) -> Self {
        let mut index = Self {
            types: HashMap::new(),
            klasses: HashMap::new(),
            methods: HashMap::new(),
            root: task.find_first("parse"),
        };
        index.collect(task);
        index
    }

    fn collect(&mut self, tag: &'a LogTag) {
        if let (Some(id), Some(name)) = (tag.attribute("id"), tag.attribute("name")) {
            match tag.name() {
                "type" => {
                    self.types.insert(id, name);
                }
                "klass" => {
                    self.klasses.insert(id, name);
                }
                "method" => {
                    self.methods.insert(id, tag);
                }
                _ => {}
            }
        }
        for child in tag.children() {
            self.collect(child);
        }
    }

    /// The outermost `<parse>`, i.e. the compiled method's own bytecode
    pub fn root_parse(&self) -> Option<&'a LogTag> {
        self.root
    }

    /// The `<method>` tag of the compiled method
    pub fn root_method(&self) -> Option<&'a LogTag> {
        self.root
            .and_then(|parse| parse.attribute("method"))
            .and_then(|id| self.method(id))
    }

    pub fn method(&self, id: &str) -> Option<&'a LogTag> {
        self.methods.get(id).copied()
    }

    /// Class name (slash form) for a klass id
    pub fn klass_name(&self, id: &str) -> Option<&'a str> {
        self.klasses.get(id).copied()
    }

    /// Rebuild the signature of a method id from its holder, return and argument ids
    pub fn signature_of(&self, method_id: &str) -> Option<MemberSignature> {
        let method = self.method(method_id)?;
        let holder = self.klass_name(method.attribute("holder")?)?;
        let name = method.attribute("name")?;

        let mut descriptor = String::from("(");
        if let Some(arguments) = method.attribute("arguments") {
            for arg in arguments.split_whitespace() {
                descriptor.push_str(&self.type_descriptor(arg)?);
            }
        }
        descriptor.push(')');
        descriptor.push_str(&self.type_descriptor(method.attribute("return")?)?);

        MemberSignature::new(holder, name, &descriptor).ok()
    }

    fn type_descriptor(&self, id: &str) -> Option<String> {
        if let Some(primitive) = self.types.get(id) {
            let code = match *primitive {
                "void" => "V",
                "boolean" => "Z",
                "byte" => "B",
                "char" => "C",
                "short" => "S",
                "int" => "I",
                "long" => "J",
                "float" => "F",
                "double" => "D",
                _ => return None,
            };
            return Some(code.to_string());
        }
        let klass = self.klass_name(id)?;
        if klass.starts_with('[') {
            Some(klass.to_string())
        } else {
            Some(format!("L{};", klass))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CompilationState;

    fn feed(parser: &mut HotSpotLogParser, text: &str, model: &mut JitModel, diagnostics: &mut Diagnostics) {
        for line in text.lines() {
            parser.process_line(line, model, diagnostics);
        }
        parser.finish(model, diagnostics);
    }

    const TASK: &str = "\
<task compile_id='1' method='java/lang/String hashCode ()I' bytes='55' count='5000' stamp='0.110'>
<phase name='parse' nodes='3' live='3' stamp='0.110'>
<type id='720' name='int'/>
<klass id='820' name='java/lang/String' flags='17'/>
<method id='821' holder='820' name='hashCode' return='720' flags='1' bytes='55' iicount='5000'/>
<parse method='821' uses='5000' stamp='0.110'>
<bc code='182' bci='10'/>
</parse>
<phase_done name='parse' nodes='80' live='70' stamp='0.111'/>
</phase>
<task_done success='1' nmsize='120' count='5000' stamp='0.112'/>
</task>";

    #[test]
    fn test_queued_then_installed() {
        let log = "\
<?xml version='1.0' encoding='UTF-8'?>
<hotspot_log version='160 1' process='123' time_ms='1'>
<tty>
<task_queued compile_id='1' method='java/lang/String hashCode ()I' bytes='55' count='5000' iicount='5000' level='3' stamp='0.100' comment='tiered' hot_count='5000'/>
<nmethod compile_id='1' compiler='c1' level='3' entry='0x00007f0000001060' size='800' address='0x00007f0000001010' relocation_offset='296' stamp='0.113'/>
</tty>
</hotspot_log>";
        let mut parser = HotSpotLogParser::new();
        let mut model = JitModel::new();
        let mut diagnostics = Diagnostics::new();
        feed(&mut parser, log, &mut model, &mut diagnostics);
        feed(&mut parser, TASK, &mut model, &mut diagnostics);

        let record = model.find_compilation(&CompileKey::standard("1")).unwrap();
        assert_eq!(record.state(), CompilationState::Installed);
        assert_eq!(record.tier, Some(3));
        assert_eq!(record.queued_ms, Some(100));
        assert_eq!(record.compile_start_ms, Some(110));
        assert_eq!(record.installed_ms, Some(113));
        assert_eq!(record.compiler.as_deref(), Some("c1"));
        assert_eq!(record.address_range, Some(0x7f0000001010..0x7f0000001330));
        assert!(record.tag.is_some());

        let member = model.member(record.member);
        assert_eq!(member.modifiers, vec![crate::parser::signature::Modifier::Public]);
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn test_failed_task() {
        let log = "\
<task_queued compile_id='4' method='a/B big ()V' bytes='9000' level='4' stamp='1.0'/>
<task compile_id='4' method='a/B big ()V' stamp='1.1'>
<failure reason='out of nodes during matching' phase='compile'/>
<task_done success='0' count='1' stamp='1.5'/>
</task>";
        let mut parser = HotSpotLogParser::new();
        let mut model = JitModel::new();
        let mut diagnostics = Diagnostics::new();
        feed(&mut parser, log, &mut model, &mut diagnostics);

        let record = model.find_compilation(&CompileKey::standard("4")).unwrap();
        assert_eq!(record.state(), CompilationState::Failed);
        assert_eq!(
            record.failure_reason.as_deref(),
            Some("out of nodes during matching")
        );
        assert!(record.address_range.is_none());
    }

    #[test]
    fn test_osr_ids_do_not_collide() {
        let log = "\
<task_queued compile_id='9' method='a/B loop ()V' bytes='20' level='3' stamp='1.0'/>
<task_queued compile_id='9' compile_kind='osr' method='a/B loop ()V' bytes='20' osr_bci='5' level='4' stamp='1.1'/>
<nmethod compile_id='9' compile_kind='osr' compiler='c2' level='4' size='100' address='0x100' stamp='1.2'/>";
        let mut parser = HotSpotLogParser::new();
        let mut model = JitModel::new();
        let mut diagnostics = Diagnostics::new();
        feed(&mut parser, log, &mut model, &mut diagnostics);

        let standard = model.find_compilation(&CompileKey::standard("9")).unwrap();
        let osr = model
            .find_compilation(&CompileKey::new("9", CompileKind::Osr))
            .unwrap();
        assert_eq!(standard.state(), CompilationState::Queued);
        assert_eq!(osr.state(), CompilationState::Installed);
        assert_eq!(osr.index, 1);
    }

    #[test]
    fn test_unknown_and_ignored_tags() {
        let log = "\
<writer thread='1'/>
<sweeper state='finished' traversals='1'/>
<brand_new_tag a='1'/>
<nmethod compile_id='77' address='0x10' size='4'/>
<nmethod compile_id='78' compile_kind='c2n' address='0x10' size='4'/>";
        let mut parser = HotSpotLogParser::new();
        let mut model = JitModel::new();
        let mut diagnostics = Diagnostics::new();
        feed(&mut parser, log, &mut model, &mut diagnostics);

        assert_eq!(parser.tags_seen(), 5);
        assert!(diagnostics.unknown_tags().contains("brand_new_tag"));
        assert_eq!(diagnostics.unknown_tags().len(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::UnknownCompileId), 1);
    }

    #[test]
    fn test_unclosed_task_reported_on_finish() {
        let mut parser = HotSpotLogParser::new();
        let mut model = JitModel::new();
        let mut diagnostics = Diagnostics::new();
        feed(&mut parser, "<task compile_id='1'>\n<phase name='parse'>", &mut model, &mut diagnostics);
        assert_eq!(diagnostics.count(DiagnosticKind::UnbalancedTag), 1);
    }

    #[test]
    fn test_task_method_index_signature() {
        let mut processor = TagProcessor::new();
        let task = TASK
            .lines()
            .filter_map(|line| processor.process_line(line))
            .next()
            .unwrap();
        let index = TaskMethodIndex::new(&task);
        let signature = index.signature_of("821").unwrap();
        assert_eq!(signature.canonical(), "java.lang.String hashCode ()I");
        assert_eq!(index.root_method().unwrap().attribute("name"), Some("hashCode"));
    }
}
