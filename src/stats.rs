//! Sample accumulation and aggregation
//!
//! One [`Statistics`] instance collects the per-iteration observations of a
//! single benchmark run: timing samples in one channel, energy/power samples
//! in another so the two never mix in an aggregate. Aggregation is a
//! read-only projection computed on demand by [`Statistics::summarize`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Measurement unit of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Microseconds
    Microseconds,
    /// Milliseconds
    Milliseconds,
    /// Joules
    Joules,
    /// Watts
    Watts,
}

impl Unit {
    /// Short label used in reports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Microseconds => "us",
            Self::Milliseconds => "ms",
            Self::Joules => "J",
            Self::Watts => "W",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the sample was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementType {
    /// Host wall-clock around the API call
    Cpu,
    /// Derived from device timestamp counters
    Gpu,
}

impl MeasurementType {
    /// Short label used in reports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Observed value, `None` for a no-op schema marker
    pub value: Option<f64>,
    /// Measurement unit
    pub unit: Unit,
    /// CPU- or GPU-observed
    pub mtype: MeasurementType,
    /// Optional named sub-metric
    pub tag: Option<String>,
}

/// Aggregated view of one (tag, unit, type) sample group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    /// Sub-metric tag, empty string for the default metric
    pub tag: String,
    /// Measurement unit
    pub unit: Unit,
    /// CPU- or GPU-observed
    pub mtype: MeasurementType,
    /// Number of valued samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Minimum
    pub min: f64,
    /// Maximum
    pub max: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    /// Median (nearest rank)
    pub p50: f64,
    /// 90th percentile (nearest rank)
    pub p90: f64,
    /// 99th percentile (nearest rank)
    pub p99: f64,
}

/// Append-only accumulator for one benchmark run
///
/// Single-threaded producer; never shared across concurrently running
/// benchmarks.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    samples: Vec<Sample>,
    energy: Vec<Sample>,
}

impl Statistics {
    /// Create an empty accumulator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one timing sample under the default metric
    pub fn push_value(&mut self, value: f64, unit: Unit, mtype: MeasurementType) {
        self.samples.push(Sample {
            value: Some(value),
            unit,
            mtype,
            tag: None,
        });
    }

    /// Append one timing sample under a named sub-metric
    pub fn push_value_tagged(&mut self, value: f64, unit: Unit, mtype: MeasurementType, tag: &str) {
        self.samples.push(Sample {
            value: Some(value),
            unit,
            mtype,
            tag: Some(tag.to_string()),
        });
    }

    /// Record a unit/type pair with no value
    ///
    /// Used by no-op runs so the reporting schema stays uniform even when
    /// the benchmark body is skipped.
    pub fn push_unit_and_type(&mut self, unit: Unit, mtype: MeasurementType) {
        self.samples.push(Sample {
            value: None,
            unit,
            mtype,
            tag: None,
        });
    }

    /// Append one energy/power sample under the default metric
    ///
    /// Kept in a separate channel so energy never mixes into timing
    /// aggregates.
    pub fn push_energy(&mut self, value: f64, unit: Unit, mtype: MeasurementType) {
        self.energy.push(Sample {
            value: Some(value),
            unit,
            mtype,
            tag: None,
        });
    }

    /// Append one energy/power sample under a named sub-metric
    pub fn push_energy_tagged(
        &mut self,
        value: f64,
        unit: Unit,
        mtype: MeasurementType,
        tag: &str,
    ) {
        self.energy.push(Sample {
            value: Some(value),
            unit,
            mtype,
            tag: Some(tag.to_string()),
        });
    }

    /// Number of recorded timing samples (markers included)
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been recorded in either channel
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() && self.energy.is_empty()
    }

    /// Number of recorded energy samples
    #[must_use]
    pub fn energy_len(&self) -> usize {
        self.energy.len()
    }

    /// The raw timing sample sequence, in push order
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Summaries of all sample groups: timing groups first, then energy,
    /// each keyed by (tag, unit, type) in first-seen order
    #[must_use]
    pub fn summarize(&self) -> Vec<MetricSummary> {
        let mut out = group_summaries(&self.samples);
        out.extend(group_summaries(&self.energy));
        out
    }
}

fn group_summaries(samples: &[Sample]) -> Vec<MetricSummary> {
    let mut keys: Vec<(String, Unit, MeasurementType)> = Vec::new();
    for s in samples {
        let key = (
            s.tag.clone().unwrap_or_default(),
            s.unit,
            s.mtype,
        );
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    keys.into_iter()
        .map(|(tag, unit, mtype)| {
            let values: Vec<f64> = samples
                .iter()
                .filter(|s| {
                    s.tag.clone().unwrap_or_default() == tag && s.unit == unit && s.mtype == mtype
                })
                .filter_map(|s| s.value)
                .collect();
            summarize_values(&tag, unit, mtype, &values)
        })
        .collect()
}

fn summarize_values(tag: &str, unit: Unit, mtype: MeasurementType, values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary {
            tag: tag.to_string(),
            unit,
            mtype,
            count: 0,
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            std_dev: 0.0,
            p50: 0.0,
            p90: 0.0,
            p99: 0.0,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance =
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);

    MetricSummary {
        tag: tag.to_string(),
        unit,
        mtype,
        count: values.len(),
        mean,
        min,
        max,
        std_dev: variance.sqrt(),
        p50: percentile(values, 50.0),
        p90: percentile(values, 90.0),
        p99: percentile(values, 99.0),
    }
}

/// Nearest-rank percentile over an unsorted slice
#[must_use]
pub fn percentile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let idx = ((sorted.len() as f64 * p / 100.0).ceil() as usize)
        .saturating_sub(1)
        .min(sorted.len() - 1);
    sorted[idx]
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_samples_10_20_30() {
        let mut stats = Statistics::new();
        for v in [10.0, 20.0, 30.0] {
            stats.push_value(v, Unit::Microseconds, MeasurementType::Cpu);
        }

        let summaries = stats.summarize();
        assert_eq!(summaries.len(), 1);
        let s = &summaries[0];
        assert_eq!(s.count, 3);
        assert!((s.mean - 20.0).abs() < f64::EPSILON);
        assert!((s.min - 10.0).abs() < f64::EPSILON);
        assert!((s.max - 30.0).abs() < f64::EPSILON);
        assert_eq!(s.unit, Unit::Microseconds);
        assert_eq!(s.mtype, MeasurementType::Cpu);
    }

    #[test]
    fn test_count_matches_pushes() {
        let mut stats = Statistics::new();
        for i in 0..57 {
            stats.push_value(f64::from(i), Unit::Microseconds, MeasurementType::Cpu);
        }
        assert_eq!(stats.len(), 57);
        assert_eq!(stats.summarize()[0].count, 57);
    }

    #[test]
    fn test_marker_keeps_schema_without_value() {
        let mut stats = Statistics::new();
        stats.push_unit_and_type(Unit::Microseconds, MeasurementType::Gpu);

        assert_eq!(stats.len(), 1);
        let summaries = stats.summarize();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].count, 0);
        assert_eq!(summaries[0].mtype, MeasurementType::Gpu);
    }

    #[test]
    fn test_energy_channel_never_mixes_with_timing() {
        let mut stats = Statistics::new();
        stats.push_value(5.0, Unit::Microseconds, MeasurementType::Cpu);
        stats.push_energy(2.5, Unit::Joules, MeasurementType::Gpu);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats.energy_len(), 1);

        let summaries = stats.summarize();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].unit, Unit::Microseconds);
        assert_eq!(summaries[1].unit, Unit::Joules);
        assert_eq!(summaries[1].count, 1);
    }

    #[test]
    fn test_tagged_sub_metrics_group_separately() {
        let mut stats = Statistics::new();
        stats.push_value_tagged(1.0, Unit::Microseconds, MeasurementType::Cpu, "submit");
        stats.push_value_tagged(9.0, Unit::Microseconds, MeasurementType::Cpu, "wait");
        stats.push_value_tagged(3.0, Unit::Microseconds, MeasurementType::Cpu, "submit");

        let summaries = stats.summarize();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].tag, "submit");
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].mean - 2.0).abs() < f64::EPSILON);
        assert_eq!(summaries[1].tag, "wait");
        assert_eq!(summaries[1].count, 1);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((percentile(&data, 50.0) - 3.0).abs() < f64::EPSILON);
        assert!((percentile(&data, 99.0) - 5.0).abs() < f64::EPSILON);
        assert!((percentile(&[], 50.0)).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn prop_min_le_mean_le_max(values in prop::collection::vec(0.0f64..1.0e9, 1..200)) {
            let mut stats = Statistics::new();
            for v in &values {
                stats.push_value(*v, Unit::Microseconds, MeasurementType::Cpu);
            }
            let s = &stats.summarize()[0];
            prop_assert_eq!(s.count, values.len());
            prop_assert!(s.min <= s.mean + 1e-9);
            prop_assert!(s.mean <= s.max + 1e-9);
            prop_assert!(s.min <= s.p50 && s.p50 <= s.max);
        }
    }
}
