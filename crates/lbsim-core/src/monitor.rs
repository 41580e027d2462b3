//! Timestamped observation logs and their summary statistics.
//!
//! A [`Monitor`] is an append-only sequence of `(value, timestamp)` pairs.
//! During a run components only ever append; after the run the reporting
//! layer reads means and percentiles or iterates the raw series. A monitor's
//! lifetime is bound to a single simulation run.

use serde::{Deserialize, Serialize};

/// Append-only time series of `(value, timestamp)` observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    name: String,
    samples: Vec<(f64, f64)>,
}

impl Monitor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an observation at a virtual timestamp (seconds).
    pub fn record(&mut self, value: f64, timestamp: f64) {
        self.samples.push((value, timestamp));
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate the raw `(value, timestamp)` sequence in record order.
    pub fn iter(&self) -> impl Iterator<Item = &(f64, f64)> {
        self.samples.iter()
    }

    /// The observed values, in record order.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|&(v, _)| v).collect()
    }

    /// Arithmetic mean of the observed values; 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|&(v, _)| v).sum::<f64>() / self.samples.len() as f64
    }

    /// The `p`-th percentile (0–100) of the observed values; 0.0 when empty.
    pub fn percentile(&self, p: f64) -> f64 {
        let mut sorted = self.values();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        percentile_sorted(&sorted, p)
    }
}

pub(crate) fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_monitor() {
        let m = Monitor::new("Latency");
        assert!(m.is_empty());
        assert_eq!(m.mean(), 0.0);
        assert_eq!(m.percentile(99.0), 0.0);
    }

    #[test]
    fn test_record_preserves_order() {
        let mut m = Monitor::new("Latency");
        m.record(3.0, 1.0);
        m.record(1.0, 2.0);
        m.record(2.0, 3.0);
        let seq: Vec<_> = m.iter().cloned().collect();
        assert_eq!(seq, vec![(3.0, 1.0), (1.0, 2.0), (2.0, 3.0)]);
    }

    #[test]
    fn test_mean() {
        let mut m = Monitor::new("Wait");
        for v in [1.0, 2.0, 3.0, 4.0] {
            m.record(v, 0.0);
        }
        assert!((m.mean() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_percentiles() {
        let mut m = Monitor::new("Wait");
        for v in 1..=100 {
            m.record(v as f64, 0.0);
        }
        assert!((m.percentile(50.0) - 50.0).abs() < 2.0);
        assert!((m.percentile(99.0) - 99.0).abs() < 2.0);
        assert_eq!(m.percentile(0.0), 1.0);
        assert_eq!(m.percentile(100.0), 100.0);
    }

    #[test]
    fn test_percentile_single_sample() {
        let mut m = Monitor::new("Act");
        m.record(42.0, 7.0);
        assert_eq!(m.percentile(50.0), 42.0);
        assert_eq!(m.percentile(99.0), 42.0);
    }
}
