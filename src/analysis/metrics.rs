//! Compilation metrics: state and tier counts, timing histograms and the
//! slowest compilations.

use super::histogram::{Histogram, HistogramSummary};
use crate::model::{CompilationRecord, CompilationState, CompileKind, JitModel};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Histograms over all compilations of a model
#[derive(Debug, Clone, Default)]
pub struct CompilationMetrics {
    pub by_state: BTreeMap<String, usize>,
    pub by_tier: BTreeMap<String, usize>,
    /// Compile start → installed, ms
    pub compile_time: Histogram,
    /// Queued → compile start, ms
    pub queue_delay: Histogram,
    /// Installed code size, bytes
    pub native_size: Histogram,
}

impl CompilationMetrics {
    /// Collect metrics over every compilation
    ///
    /// **Public** - main entry point for metrics calculation
    pub fn from_model(model: &JitModel) -> Self {
        let mut metrics = Self::default();
        for record in model.compilations() {
            metrics.add(record);
        }
        debug!(
            "Metrics over {} compilations ({} timed)",
            metrics.by_state.values().sum::<usize>(),
            metrics.compile_time.total()
        );
        metrics
    }

    fn add(&mut self, record: &CompilationRecord) {
        *self
            .by_state
            .entry(record.state().to_string())
            .or_insert(0) += 1;
        let tier = record
            .tier
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        *self.by_tier.entry(tier).or_insert(0) += 1;

        if let Some(ms) = record.compile_time_ms() {
            self.compile_time.add(ms);
        }
        if let Some(ms) = record.queue_delay_ms() {
            self.queue_delay.add(ms);
        }
        if let Some(size) = record.native_size {
            self.native_size.add(size);
        }
    }

    pub fn summarize(&self, percentiles: &[f64]) -> MetricsSummary {
        MetricsSummary {
            by_state: self.by_state.clone(),
            by_tier: self.by_tier.clone(),
            compile_time_ms: self.compile_time.summary(percentiles),
            queue_delay_ms: self.queue_delay.summary(percentiles),
            native_size_bytes: self.native_size.summary(percentiles),
        }
    }
}

/// Serializable form of [`CompilationMetrics`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub by_state: BTreeMap<String, usize>,
    pub by_tier: BTreeMap<String, usize>,
    pub compile_time_ms: HistogramSummary,
    pub queue_delay_ms: HistogramSummary,
    pub native_size_bytes: HistogramSummary,
}

/// One entry of the slowest-compilations table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowCompilation {
    pub member: String,
    pub compile_id: String,
    pub osr: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
    pub compile_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_size: Option<u64>,
}

/// The `top_n` slowest installed compilations, slowest first
///
/// Ties keep log order.
pub fn slowest_compilations(model: &JitModel, top_n: usize) -> Vec<SlowCompilation> {
    let mut timed: Vec<(&CompilationRecord, u64)> = model
        .compilations()
        .filter(|record| record.state() == CompilationState::Installed)
        .filter_map(|record| record.compile_time_ms().map(|ms| (record, ms)))
        .collect();
    timed.sort_by(|a, b| b.1.cmp(&a.1));

    timed
        .into_iter()
        .take(top_n)
        .map(|(record, ms)| SlowCompilation {
            member: model.member(record.member).signature.canonical(),
            compile_id: record.compile_id.clone(),
            osr: record.kind == CompileKind::Osr,
            compiler: record.compiler.clone(),
            tier: record.tier,
            compile_time_ms: ms,
            native_size: record.native_size,
        })
        .collect()
}
