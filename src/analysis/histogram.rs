//! Counting histogram with nearest-rank percentiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value → count histogram
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: BTreeMap<u64, u64>,
    total: u64,
    last: Option<u64>,
    max: Option<u64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: u64) {
        *self.counts.entry(value).or_insert(0) += 1;
        self.total += 1;
        self.last = Some(value);
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    /// Number of samples
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Most recently added value
    pub fn last_value(&self) -> Option<u64> {
        self.last
    }

    pub fn max_value(&self) -> Option<u64> {
        self.max
    }

    pub fn min_value(&self) -> Option<u64> {
        self.counts.keys().next().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let sum: f64 = self
            .counts
            .iter()
            .map(|(value, count)| *value as f64 * *count as f64)
            .sum();
        Some(sum / self.total as f64)
    }

    /// Distinct values with their counts, ascending
    pub fn buckets(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.counts.iter().map(|(v, c)| (*v, *c))
    }

    /// Nearest-rank percentile
    ///
    /// The rank is `floor(p * N / 100) + 1`, clamped to `[1, N]`; the result
    /// is the first value whose cumulative count reaches it.
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.total == 0 || !p.is_finite() {
            return None;
        }
        let p = p.clamp(0.0, 100.0);
        let rank = ((p * self.total as f64 / 100.0).floor() as u64 + 1).clamp(1, self.total);

        let mut cumulative = 0;
        for (value, count) in &self.counts {
            cumulative += count;
            if cumulative >= rank {
                return Some(*value);
            }
        }
        self.max
    }

    /// Count, extremes, mean and the requested percentiles
    pub fn summary(&self, percentiles: &[f64]) -> HistogramSummary {
        HistogramSummary {
            count: self.total,
            min: self.min_value(),
            max: self.max_value(),
            mean: self.mean(),
            percentiles: percentiles
                .iter()
                .filter_map(|p| self.percentile(*p).map(|v| (format!("p{}", p), v)))
                .collect(),
        }
    }
}

/// Serializable digest of a histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub mean: Option<f64>,
    /// Keyed `p50`, `p90`, ...
    pub percentiles: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Histogram {
        let mut histogram = Histogram::new();
        for value in [15, 20, 35, 40, 50] {
            histogram.add(value);
        }
        histogram
    }

    #[test]
    fn test_nearest_rank() {
        let histogram = sample();
        assert_eq!(histogram.percentile(30.0), Some(20));
        assert_eq!(histogram.percentile(40.0), Some(35));
        assert_eq!(histogram.percentile(100.0), Some(50));
        assert_eq!(histogram.percentile(0.0), Some(15));
    }

    #[test]
    fn test_repeated_values() {
        let mut histogram = Histogram::new();
        for value in [7, 7, 7, 3] {
            histogram.add(value);
        }
        assert_eq!(histogram.total(), 4);
        assert_eq!(histogram.percentile(50.0), Some(7));
        assert_eq!(histogram.percentile(10.0), Some(3));
        assert_eq!(histogram.last_value(), Some(3));
        assert_eq!(histogram.max_value(), Some(7));
    }

    #[test]
    fn test_empty() {
        let histogram = Histogram::new();
        assert_eq!(histogram.percentile(50.0), None);
        assert_eq!(histogram.mean(), None);
        assert!(histogram.summary(&[50.0]).percentiles.is_empty());
    }

    #[test]
    fn test_summary_keys() {
        let summary = sample().summary(&[50.0, 90.0, 99.0]);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.percentiles["p50"], 35);
        assert_eq!(summary.percentiles["p90"], 50);
        assert_eq!(summary.mean, Some(32.0));
    }
}
