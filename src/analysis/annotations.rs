//! Correlates JIT decisions in a compilation's tag tree with bytecode offsets.
//!
//! Within the compiled method's own `<parse>`, every `<bc bci='N'/>` marker
//! sets the offset that following decision tags (inlining, branches, traps)
//! refer to. Elimination tags sit outside the parse and carry their offset in
//! a nested `<jvms>` marker instead.

use crate::bytecode::{BytecodeSource, MemberBytecode};
use crate::model::{CompilationRecord, JitModel, MemberDescriptor};
use crate::parser::hotspot::TaskMethodIndex;
use crate::parser::signature::{slash_to_dot, MemberSignature};
use crate::parser::tag::LogTag;
use crate::utils::diagnostics::{DiagnosticKind, Diagnostics};
use crate::utils::error::AnnotationError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Annotations keyed by bytecode offset, in offset order
pub type AnnotationMap = BTreeMap<u32, Vec<Annotation>>;

/// Tags inside a parse that carry structure rather than decisions
const STRUCTURAL_TAGS: &[&str] = &[
    "bc",
    "call",
    "method",
    "klass",
    "type",
    "parse",
    "parse_done",
    "direct_call",
    "virtual_call",
    "dependency",
    "observe",
    "late_inline",
    "predicted_call",
    "assert_null",
    "cast_up",
    "replace_string_concat",
    "hot_throw",
];

/// Category of a JIT decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    InlineSuccess,
    InlineFail,
    EscapeAnalysis,
    LockElision,
    EliminatedAllocation,
    BranchProbability,
    Other,
}

impl AnnotationKind {
    /// Decision kind for a tag name, `None` when the tag is not a decision
    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "inline_success" => Some(AnnotationKind::InlineSuccess),
            "inline_fail" => Some(AnnotationKind::InlineFail),
            "eliminate_boxing" => Some(AnnotationKind::EscapeAnalysis),
            "eliminate_lock" => Some(AnnotationKind::LockElision),
            "eliminate_allocation" => Some(AnnotationKind::EliminatedAllocation),
            "branch" => Some(AnnotationKind::BranchProbability),
            "uncommon_trap" | "intrinsic" => Some(AnnotationKind::Other),
            _ => None,
        }
    }

    /// Decisions whose offset comes from a nested `<jvms>` marker
    pub fn is_elimination(&self) -> bool {
        matches!(
            self,
            AnnotationKind::EscapeAnalysis
                | AnnotationKind::LockElision
                | AnnotationKind::EliminatedAllocation
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::InlineSuccess => "inline_success",
            AnnotationKind::InlineFail => "inline_fail",
            AnnotationKind::EscapeAnalysis => "escape_analysis",
            AnnotationKind::LockElision => "lock_elision",
            AnnotationKind::EliminatedAllocation => "eliminated_allocation",
            AnnotationKind::BranchProbability => "branch_probability",
            AnnotationKind::Other => "other",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One decision attached to a bytecode offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub bci: u32,
    pub text: String,
}

/// Build the offset → annotations map for one compilation of one member
///
/// **Public** - main entry point for annotation correlation
///
/// # Arguments
/// * `signature` - Member the compilation belongs to
/// * `record` - Compilation whose tag subtree is walked
/// * `bytecode` - Member bytecode, when available
/// * `verify` - Reject offsets that don't start an instruction
/// * `diagnostics` - Receives unrecognized tag names
///
/// # Errors
/// * `AnnotationError::MissingParse` - The subtree has no `<parse>`
/// * `AnnotationError::OffsetMismatch` - Verification on and an offset has no instruction
pub fn build_annotations(
    signature: &MemberSignature,
    record: &CompilationRecord,
    bytecode: Option<&MemberBytecode>,
    verify: bool,
    diagnostics: &mut Diagnostics,
) -> Result<AnnotationMap, AnnotationError> {
    let missing_parse = || AnnotationError::MissingParse {
        member: signature.canonical(),
        index: record.index,
    };
    let task = record.tag.as_ref().ok_or_else(missing_parse)?;
    let index = TaskMethodIndex::new(task);
    let parse = index.root_parse().ok_or_else(missing_parse)?;

    let mut builder = AnnotationBuilder {
        signature,
        index: &index,
        bytecode: if verify { bytecode } else { None },
        annotations: AnnotationMap::new(),
    };
    builder.walk_parse(parse, diagnostics)?;
    builder.walk_eliminations(task)?;

    debug!(
        "{} compilation {}: {} annotated offsets",
        signature,
        record.index,
        builder.annotations.len()
    );
    Ok(builder.annotations)
}

/// **Private** - walk state for one member
struct AnnotationBuilder<'a> {
    signature: &'a MemberSignature,
    index: &'a TaskMethodIndex<'a>,
    /// Present only when verification is on
    bytecode: Option<&'a MemberBytecode>,
    annotations: AnnotationMap,
}

impl<'a> AnnotationBuilder<'a> {
    fn walk_parse(&mut self, parse: &LogTag, diagnostics: &mut Diagnostics) -> Result<(), AnnotationError> {
        let mut current_bci: Option<u32> = None;
        let mut callee: Option<&str> = None;

        for child in parse.children() {
            match child.name() {
                "bc" => {
                    current_bci = bci_attribute(child);
                    callee = None;
                    continue;
                }
                "call" => {
                    callee = child.attribute("method");
                    continue;
                }
                // Inlined callees are annotated against their own bytecode
                "parse" => continue,
                _ => {}
            }

            let Some(kind) = AnnotationKind::from_tag_name(child.name()) else {
                if !STRUCTURAL_TAGS.contains(&child.name()) {
                    diagnostics.unknown_tag(child.name());
                }
                continue;
            };
            if kind.is_elimination() {
                continue;
            }

            let Some(bci) = bci_attribute(child).or(current_bci) else {
                debug!("No offset for <{}> in {}", child.name(), self.signature);
                continue;
            };
            let text = self.render(kind, child, callee);
            self.add(kind, bci, text, child)?;
        }
        Ok(())
    }

    fn walk_eliminations(&mut self, task: &LogTag) -> Result<(), AnnotationError> {
        let root_method = self.index.root_parse().and_then(|p| p.attribute("method"));

        for name in ["eliminate_allocation", "eliminate_lock", "eliminate_boxing"] {
            for tag in task.find_all(name) {
                let Some(kind) = AnnotationKind::from_tag_name(name) else {
                    continue;
                };
                let own_jvms = tag.children().iter().find(|jvms| {
                    jvms.name() == "jvms"
                        && jvms.attribute("method").is_some_and(|id| {
                            Some(id) == root_method
                                || self.index.signature_of(id).as_ref() == Some(self.signature)
                        })
                });
                let Some(bci) = own_jvms.and_then(bci_attribute) else {
                    continue;
                };
                let text = self.render(kind, tag, None);
                self.add(kind, bci, text, tag)?;
            }
        }
        Ok(())
    }

    fn add(&mut self, kind: AnnotationKind, bci: u32, text: String, tag: &LogTag) -> Result<(), AnnotationError> {
        if let Some(bytecode) = self.bytecode {
            if !bytecode.has_offset(bci) {
                return Err(AnnotationError::OffsetMismatch {
                    member: self.signature.canonical(),
                    bci,
                    tag: tag.to_string(),
                });
            }
        }
        self.annotations
            .entry(bci)
            .or_default()
            .push(Annotation { kind, bci, text });
        Ok(())
    }

    /// **Private** - kind-specific text over the tag's attributes
    fn render(&self, kind: AnnotationKind, tag: &LogTag, callee: Option<&str>) -> String {
        let reason = tag.attribute("reason").unwrap_or("unknown");
        let callee_name = callee
            .and_then(|id| self.index.signature_of(id))
            .map(|sig| format!("{}.{}", sig.simple_class_name(), sig.member_name));

        match kind {
            AnnotationKind::InlineSuccess => match callee_name {
                Some(name) => format!("Inlined {}: {}", name, reason),
                None => format!("Inlined: {}", reason),
            },
            AnnotationKind::InlineFail => match callee_name {
                Some(name) => format!("Not inlined {}: {}", name, reason),
                None => format!("Not inlined: {}", reason),
            },
            AnnotationKind::BranchProbability => format!(
                "Branch taken {} / not taken {}, probability {}",
                tag.attribute("taken").unwrap_or("?"),
                tag.attribute("not_taken").unwrap_or("?"),
                tag.attribute("prob").unwrap_or("?")
            ),
            AnnotationKind::EliminatedAllocation | AnnotationKind::EscapeAnalysis => {
                let class = tag
                    .attribute("type")
                    .and_then(|id| self.index.klass_name(id))
                    .map(slash_to_dot);
                let what = if kind == AnnotationKind::EscapeAnalysis {
                    "boxing"
                } else {
                    "allocation"
                };
                match class {
                    Some(class) => format!("Eliminated {} of {}", what, class),
                    None => format!("Eliminated {}", what),
                }
            }
            AnnotationKind::LockElision => "Eliminated lock".to_string(),
            AnnotationKind::Other => match tag.name() {
                "uncommon_trap" => format!(
                    "Uncommon trap: {} ({})",
                    reason,
                    tag.attribute("action").unwrap_or("none")
                ),
                "intrinsic" => format!("Intrinsic: {}", tag.attribute("id").unwrap_or("unknown")),
                other => other.to_string(),
            },
        }
    }
}

fn bci_attribute(tag: &LogTag) -> Option<u32> {
    tag.attribute_u64("bci").and_then(|bci| u32::try_from(bci).ok())
}

/// Annotation results for every compiled member
#[derive(Debug, Default)]
pub struct AnnotationBatch {
    /// Keyed by canonical member text
    pub members: BTreeMap<String, AnnotationMap>,
    pub errors: Vec<AnnotationError>,
}

impl AnnotationBatch {
    /// Total number of annotations across all members
    pub fn annotation_count(&self) -> usize {
        self.members
            .values()
            .flat_map(|map| map.values())
            .map(Vec::len)
            .sum()
    }

    /// Annotation count per kind
    pub fn counts_by_kind(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for annotation in self.members.values().flat_map(|map| map.values()).flatten() {
            *counts.entry(annotation.kind.name().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// The compilation annotated for a member: the selected one, else the latest
fn chosen_compilation(member: &MemberDescriptor) -> Option<&CompilationRecord> {
    member
        .selected_compilation()
        .or_else(|| member.last_compilation())
}

/// Annotate one member, optionally at an explicit compilation index
///
/// # Errors
/// * `AnnotationError::UnknownCompilation` - `index` out of range
/// * any error from [`build_annotations`]
pub fn annotate_member(
    member: &MemberDescriptor,
    index: Option<usize>,
    bytecode: &dyn BytecodeSource,
    verify: bool,
    diagnostics: &mut Diagnostics,
) -> Result<AnnotationMap, AnnotationError> {
    let record = match index {
        Some(i) => member.compilation(i),
        None => chosen_compilation(member),
    }
    .ok_or_else(|| AnnotationError::UnknownCompilation {
        member: member.signature.canonical(),
        index: index.unwrap_or(0),
    })?;

    build_annotations(
        &member.signature,
        record,
        bytecode.member_bytecode(&member.signature),
        verify,
        diagnostics,
    )
}

/// Annotate every member that has a compilation with a tag tree
///
/// **Public** - batch entry point
///
/// A failing member is logged, reported to `diagnostics` and skipped.
pub fn build_all_annotations(
    model: &JitModel,
    bytecode: &dyn BytecodeSource,
    verify: bool,
    diagnostics: &mut Diagnostics,
) -> AnnotationBatch {
    let mut batch = AnnotationBatch::default();

    for member in model.members() {
        let Some(record) = chosen_compilation(member) else {
            continue;
        };
        // J9 and Zing records carry no tag tree
        if record.tag.is_none() {
            continue;
        }

        match build_annotations(
            &member.signature,
            record,
            bytecode.member_bytecode(&member.signature),
            verify,
            diagnostics,
        ) {
            Ok(map) if map.is_empty() => {}
            Ok(map) => {
                batch.members.insert(member.signature.canonical(), map);
            }
            Err(err) => {
                warn!("Skipping annotations for {}: {}", member.signature, err);
                diagnostics.report(DiagnosticKind::AnnotationFailed, err.to_string());
                batch.errors.push(err);
            }
        }
    }

    info!(
        "Annotated {} members ({} annotations, {} failures)",
        batch.members.len(),
        batch.annotation_count(),
        batch.errors.len()
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{BytecodeCache, BytecodeInstruction, Opcode};
    use crate::model::{CompileKey, MemberId};

    fn tag(name: &str, attributes: &[(&str, &str)]) -> LogTag {
        LogTag::self_closing(
            name,
            attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn sample_task() -> LogTag {
        let parse = LogTag::new("parse")
            .with_attribute("method", "10")
            .with_child(tag("bc", &[("code", "182"), ("bci", "1")]))
            .with_child(tag("call", &[("method", "11"), ("count", "500")]))
            .with_child(tag("inline_success", &[("reason", "inline (hot)")]))
            .with_child(
                LogTag::new("parse")
                    .with_attribute("method", "11")
                    .with_child(tag("bc", &[("bci", "99")]))
                    .with_child(tag("inline_fail", &[("reason", "too big")])),
            )
            .with_child(tag("bc", &[("code", "153"), ("bci", "4")]))
            .with_child(tag(
                "branch",
                &[("target_bci", "12"), ("taken", "0"), ("not_taken", "200"), ("prob", "never")],
            ))
            .with_child(tag("uncommon_trap", &[("bci", "9"), ("reason", "null_check"), ("action", "maybe_recompile")]))
            .with_child(tag("future_decision", &[]));

        LogTag::new("task")
            .with_attribute("compile_id", "1")
            .with_child(tag("type", &[("id", "2"), ("name", "void")]))
            .with_child(tag("type", &[("id", "3"), ("name", "int")]))
            .with_child(tag("klass", &[("id", "4"), ("name", "a/B")]))
            .with_child(tag("klass", &[("id", "5"), ("name", "a/Point")]))
            .with_child(tag("method", &[("id", "10"), ("holder", "4"), ("name", "run"), ("return", "2")]))
            .with_child(tag("method", &[("id", "11"), ("holder", "4"), ("name", "size"), ("return", "3")]))
            .with_child(parse)
            .with_child(
                LogTag::new("eliminate_allocation")
                    .with_attribute("type", "5")
                    .with_child(tag("jvms", &[("bci", "99"), ("method", "11")]))
                    .with_child(tag("jvms", &[("bci", "6"), ("method", "10")])),
            )
    }

    fn sample_record() -> (MemberSignature, CompilationRecord) {
        let signature = MemberSignature::new("a/B", "run", "()V").unwrap();
        let mut record = CompilationRecord::queued(MemberId::from_index(0), 0, &CompileKey::standard("1"));
        record.tag = Some(sample_task());
        (signature, record)
    }

    fn bytecode(offsets: &[u32]) -> MemberBytecode {
        let mut member = MemberBytecode::new(MemberSignature::new("a/B", "run", "()V").unwrap());
        member.instructions = offsets
            .iter()
            .map(|offset| BytecodeInstruction::new(*offset, Opcode::Nop))
            .collect();
        member
    }

    #[test]
    fn test_offsets_inherited_from_bc_markers() {
        let (signature, record) = sample_record();
        let mut diagnostics = Diagnostics::new();
        let map = build_annotations(&signature, &record, None, false, &mut diagnostics).unwrap();

        let at_1 = &map[&1];
        assert_eq!(at_1.len(), 1);
        assert_eq!(at_1[0].kind, AnnotationKind::InlineSuccess);
        assert_eq!(at_1[0].text, "Inlined B.size: inline (hot)");

        assert_eq!(map[&4][0].kind, AnnotationKind::BranchProbability);
        // Explicit bci beats the inherited one
        assert_eq!(map[&9][0].text, "Uncommon trap: null_check (maybe_recompile)");
        // Nested parse belongs to the callee
        assert!(!map.contains_key(&99));
        assert!(diagnostics.unknown_tags().contains("future_decision"));
    }

    #[test]
    fn test_elimination_uses_own_jvms() {
        let (signature, record) = sample_record();
        let mut diagnostics = Diagnostics::new();
        let map = build_annotations(&signature, &record, None, false, &mut diagnostics).unwrap();

        let eliminated = &map[&6][0];
        assert_eq!(eliminated.kind, AnnotationKind::EliminatedAllocation);
        assert_eq!(eliminated.text, "Eliminated allocation of a.Point");
    }

    #[test]
    fn test_verification_failure_aborts_member() {
        let (signature, record) = sample_record();
        let mut diagnostics = Diagnostics::new();

        let full = bytecode(&[0, 1, 4, 6, 9]);
        assert!(build_annotations(&signature, &record, Some(&full), true, &mut diagnostics).is_ok());

        let short = bytecode(&[0, 1, 6, 9]);
        let err = build_annotations(&signature, &record, Some(&short), true, &mut diagnostics).unwrap_err();
        assert!(matches!(err, AnnotationError::OffsetMismatch { bci: 4, .. }));

        // Without verification the mismatch is tolerated
        assert!(build_annotations(&signature, &record, Some(&short), false, &mut diagnostics).is_ok());
    }

    #[test]
    fn test_missing_parse() {
        let signature = MemberSignature::new("a/B", "run", "()V").unwrap();
        let mut record = CompilationRecord::queued(MemberId::from_index(0), 0, &CompileKey::standard("1"));
        record.tag = Some(LogTag::new("task"));
        let err = build_annotations(&signature, &record, None, false, &mut Diagnostics::new()).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingParse { .. }));
    }

    #[test]
    fn test_batch_collects_errors() {
        use crate::model::CompilationEvent;
        use crate::model::VendorDetail;

        let mut model = JitModel::new();
        let mut diagnostics = Diagnostics::new();
        let signature = MemberSignature::new("a/B", "run", "()V").unwrap();
        model.apply(
            CompilationEvent::Queued {
                key: CompileKey::standard("1"),
                signature: signature.clone(),
                tier: Some(4),
                stamp_ms: None,
                bytecode_size: None,
                vendor: VendorDetail::default(),
            },
            &mut diagnostics,
        );
        model.apply(
            CompilationEvent::Started {
                key: CompileKey::standard("1"),
                stamp_ms: None,
                queued_ms: None,
                vendor: None,
                tag: Some(sample_task()),
            },
            &mut diagnostics,
        );

        let mut cache = BytecodeCache::new();
        cache.insert_member(bytecode(&[0, 1, 6, 9]));

        let batch = build_all_annotations(&model, &cache, true, &mut diagnostics);
        assert_eq!(batch.errors.len(), 1);
        assert!(batch.members.is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::AnnotationFailed), 1);

        let batch = build_all_annotations(&model, &cache, false, &mut diagnostics);
        assert_eq!(batch.annotation_count(), 4);
        assert_eq!(batch.counts_by_kind()["inline_success"], 1);
    }
}
