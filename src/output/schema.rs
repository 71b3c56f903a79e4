//! Output JSON schema for analysis reports.
//!
//! The schema is versioned (see `SCHEMA_VERSION`) so readers can reject
//! reports written by an incompatible release.

use crate::analysis::{
    slowest_compilations, AnnotationBatch, CompilationMetrics, HotThrowResult, MetricsSummary,
    SlowCompilation,
};
use crate::model::JitModel;
use crate::parser::LogFormat;
use crate::utils::config::{SCHEMA_VERSION, SUMMARY_PERCENTILES};
use crate::utils::diagnostics::Diagnostics;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level report written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// RFC 3339 timestamp
    pub generated_at: String,

    pub source: ReportSource,

    pub totals: ReportTotals,

    pub metrics: MetricsSummary,

    /// Slowest installed compilations, slowest first
    pub slowest: Vec<SlowCompilation>,

    pub hot_throws: Vec<HotThrowResult>,

    /// Present when bytecode was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<AnnotationSummary>,

    pub diagnostics: DiagnosticSummary,
}

/// What was analysed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSource {
    pub log_file: String,
    pub format: LogFormat,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub packages: usize,
    pub classes: usize,
    pub members: usize,
    pub compilations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub members: usize,
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub unknown_tags: Vec<String>,
}

impl DiagnosticSummary {
    pub fn from_diagnostics(diagnostics: &Diagnostics) -> Self {
        let mut by_kind = BTreeMap::new();
        for entry in diagnostics.entries() {
            let kind = serde_json::to_value(entry.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| format!("{:?}", entry.kind));
            *by_kind.entry(kind).or_insert(0) += 1;
        }
        Self {
            total: diagnostics.entries().len(),
            by_kind,
            unknown_tags: diagnostics.unknown_tags().iter().cloned().collect(),
        }
    }
}

impl AnnotationSummary {
    pub fn from_batch(batch: &AnnotationBatch) -> Self {
        Self {
            members: batch.members.len(),
            total: batch.annotation_count(),
            by_kind: batch.counts_by_kind(),
            failures: batch.errors.len(),
        }
    }
}

/// Assemble a report from a parsed model and its analyses
///
/// **Public** - main entry point for report construction
///
/// # Arguments
/// * `source` - Input file description
/// * `model` - Parsed compilations
/// * `diagnostics` - Everything skipped while parsing and annotating
/// * `hot_throws` - Hot-throw results
/// * `annotations` - Annotation batch, when bytecode was supplied
/// * `top_n` - Length of the slowest-compilations table
pub fn to_report(
    source: ReportSource,
    model: &JitModel,
    diagnostics: &Diagnostics,
    hot_throws: Vec<HotThrowResult>,
    annotations: Option<&AnnotationBatch>,
    top_n: usize,
) -> JitReport {
    let metrics = CompilationMetrics::from_model(model);

    JitReport {
        version: SCHEMA_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        source,
        totals: ReportTotals {
            packages: model.packages().count(),
            classes: model.classes().count(),
            members: model.member_count(),
            compilations: model.compilation_count(),
        },
        metrics: metrics.summarize(SUMMARY_PERCENTILES),
        slowest: slowest_compilations(model, top_n),
        hot_throws,
        annotations: annotations.map(AnnotationSummary::from_batch),
        diagnostics: DiagnosticSummary::from_diagnostics(diagnostics),
    }
}

/// Plain-text digest printed by `analyze --summary`
pub fn text_summary(report: &JitReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Log:          {} ({}, {} lines)",
        report.source.log_file, report.source.format, report.source.lines
    ));
    lines.push(format!(
        "Members:      {} in {} classes",
        report.totals.members, report.totals.classes
    ));
    lines.push(format!("Compilations: {}", report.totals.compilations));
    for (state, count) in &report.metrics.by_state {
        lines.push(format!("  {:<10} {}", state, count));
    }

    let compile_time = &report.metrics.compile_time_ms;
    if compile_time.count > 0 {
        let percentiles: Vec<String> = compile_time
            .percentiles
            .iter()
            .map(|(key, value)| format!("{}={}ms", key, value))
            .collect();
        lines.push(format!("Compile time: {}", percentiles.join(" ")));
    }

    if !report.slowest.is_empty() {
        lines.push(String::new());
        lines.push("Slowest compilations:".to_string());
        for (i, slow) in report.slowest.iter().enumerate() {
            lines.push(format!(
                "  {:>2}. {:>6}ms  #{}{}  {}",
                i + 1,
                slow.compile_time_ms,
                slow.compile_id,
                if slow.osr { "%" } else { "" },
                slow.member
            ));
        }
    }

    if !report.hot_throws.is_empty() {
        lines.push(String::new());
        lines.push(format!("Hot throws: {}", report.hot_throws.len()));
        for throw in &report.hot_throws {
            lines.push(format!(
                "  {}@{} {}{}",
                throw.member,
                throw.bci,
                throw.exception_type,
                if throw.preallocated { " (preallocated)" } else { "" }
            ));
        }
    }

    if let Some(annotations) = &report.annotations {
        lines.push(String::new());
        lines.push(format!(
            "Annotations:  {} over {} members ({} failed)",
            annotations.total, annotations.members, annotations.failures
        ));
    }

    if report.diagnostics.total > 0 || !report.diagnostics.unknown_tags.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "Diagnostics:  {} entries, {} unknown tags",
            report.diagnostics.total,
            report.diagnostics.unknown_tags.len()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::diagnostics::DiagnosticKind;

    #[test]
    fn test_empty_model_report() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(DiagnosticKind::UnknownCompileId, "compile id 9");
        diagnostics.unknown_tag("mystery");

        let report = to_report(
            ReportSource {
                log_file: "hotspot.log".to_string(),
                format: LogFormat::HotSpot,
                lines: 3,
            },
            &JitModel::new(),
            &diagnostics,
            Vec::new(),
            None,
            10,
        );

        assert_eq!(report.version, SCHEMA_VERSION);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.generated_at).is_ok());
        assert_eq!(report.totals.compilations, 0);
        assert_eq!(report.diagnostics.by_kind["unknown_compile_id"], 1);
        assert_eq!(report.diagnostics.unknown_tags, vec!["mystery".to_string()]);

        let text = text_summary(&report);
        assert!(text.contains("hotspot.log (hotspot, 3 lines)"));
        assert!(text.contains("1 entries, 1 unknown tags"));
    }
}
