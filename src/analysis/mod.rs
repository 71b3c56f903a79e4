//! Analyses over a parsed model.
//!
//! This module handles:
//! - Correlating JIT decisions with bytecode offsets
//! - Detecting hot exception sites
//! - Histograms and compilation metrics

pub mod annotations;
pub mod histogram;
pub mod hot_throw;
pub mod metrics;

// Re-export main types
pub use annotations::{
    annotate_member, build_all_annotations, build_annotations, Annotation, AnnotationBatch,
    AnnotationKind, AnnotationMap,
};
pub use histogram::{Histogram, HistogramSummary};
pub use hot_throw::{exception_for_reason, find_hot_throws, HotThrowResult};
pub use metrics::{slowest_compilations, CompilationMetrics, MetricsSummary, SlowCompilation};
