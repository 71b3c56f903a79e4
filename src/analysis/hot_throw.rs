//! Hot-throw detection.
//!
//! C2 logs `<hot_throw preallocated='1' reason='null_check'/>` inside the
//! `<parse>` of the method whose implicit exception became hot. The site's
//! offset is the nearest preceding `bc` marker (or `bci` attribute) of that
//! same parse.

use crate::bytecode::BytecodeSource;
use crate::model::JitModel;
use crate::parser::hotspot::TaskMethodIndex;
use crate::parser::signature::MemberSignature;
use crate::parser::tag::LogTag;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Implicit exception raised for a HotSpot deoptimization reason
pub fn exception_for_reason(reason: &str) -> Option<&'static str> {
    match reason {
        "null_check" | "null_assert" => Some("java.lang.NullPointerException"),
        "range_check" => Some("java.lang.ArrayIndexOutOfBoundsException"),
        "class_check" => Some("java.lang.ClassCastException"),
        "array_check" => Some("java.lang.ArrayStoreException"),
        "div0_check" => Some("java.lang.ArithmeticException"),
        _ => None,
    }
}

/// One hot exception site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotThrowResult {
    /// Canonical text of the throwing member
    pub member: String,
    pub bci: u32,
    pub exception_type: String,
    pub preallocated: bool,
    pub compile_id: String,
    /// Handler covering the site, when bytecode was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler_offset: Option<u32>,
}

/// Scan every compilation in the model for hot throws
///
/// **Public** - main entry point for hot-throw detection
///
/// # Arguments
/// * `model` - Parsed compilations
/// * `bytecode` - Optional source of exception tables
///
/// # Returns
/// Results in discovery order, one per (member, bci, exception type)
pub fn find_hot_throws(model: &JitModel, bytecode: Option<&dyn BytecodeSource>) -> Vec<HotThrowResult> {
    let mut results = Vec::new();
    let mut seen: HashSet<(String, u32, String)> = HashSet::new();

    for record in model.compilations() {
        let Some(task) = &record.tag else {
            continue;
        };
        let index = TaskMethodIndex::new(task);

        for parse in task.find_all("parse") {
            let Some(signature) = parse
                .attribute("method")
                .and_then(|id| index.signature_of(id))
            else {
                continue;
            };

            for (bci, tag) in hot_throws_in_parse(parse) {
                let Some(bci) = bci else {
                    debug!("hot_throw without offset in {}", signature);
                    continue;
                };
                let reason = tag.attribute("reason").unwrap_or("unknown");
                let exception_type = exception_for_reason(reason)
                    .map(str::to_string)
                    .unwrap_or_else(|| reason.to_string());

                let key = (signature.canonical(), bci, exception_type.clone());
                if !seen.insert(key) {
                    continue;
                }

                let mut result = HotThrowResult {
                    member: signature.canonical(),
                    bci,
                    exception_type,
                    preallocated: is_preallocated(tag),
                    compile_id: record.compile_id.clone(),
                    catch_type: None,
                    handler_offset: None,
                };
                attach_handler(&mut result, &signature, bytecode);
                results.push(result);
            }
        }
    }

    info!("Found {} hot throw sites", results.len());
    results
}

/// **Private** - `(offset, tag)` for each direct `hot_throw` child of a parse
fn hot_throws_in_parse(parse: &LogTag) -> Vec<(Option<u32>, &LogTag)> {
    let mut current: Option<u32> = None;
    let mut found = Vec::new();
    for child in parse.children() {
        // Nested parses are scanned on their own
        if child.name() == "parse" {
            continue;
        }
        if child.name() == "hot_throw" {
            found.push((current, child));
            continue;
        }
        if let Some(bci) = child.attribute_u64("bci").and_then(|b| u32::try_from(b).ok()) {
            current = Some(bci);
        }
    }
    found
}

/// `preallocated` is a number; anything non-zero means true
fn is_preallocated(tag: &LogTag) -> bool {
    tag.attribute_u64("preallocated")
        .map(|value| value != 0)
        .unwrap_or(false)
}

fn attach_handler(result: &mut HotThrowResult, signature: &MemberSignature, bytecode: Option<&dyn BytecodeSource>) {
    let Some(member) = bytecode.and_then(|source| source.member_bytecode(signature)) else {
        return;
    };
    if let Some(entry) = member.exception_table.entry_for(result.bci) {
        result.catch_type = Some(entry.catch_type.clone());
        result.handler_offset = Some(entry.handler_offset);
    }
}
