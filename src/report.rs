//! Run reports
//!
//! One record per requested (benchmark, backend) pair: the typed run status
//! plus the aggregated metrics projected from the statistics accumulator.
//! Emitted as pretty JSON for downstream analysis or as CSV rows; the exact
//! schema is versioned, not load-bearing.

use serde::{Deserialize, Serialize};

use crate::registry::Backend;
use crate::stats::MetricSummary;

/// Report schema version
pub const SCHEMA_VERSION: &str = "1.0";

/// Result record of one benchmark run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    /// Benchmark name
    pub test: String,
    /// Backend the run was dispatched to
    pub backend: Backend,
    /// Status label: ok, nooped, device-not-capable, api-not-capable,
    /// not-implemented, failed
    pub status: String,
    /// Failure or skip detail, when any
    pub detail: Option<String>,
    /// Aggregated metrics, one per (tag, unit, type) group
    pub metrics: Vec<MetricSummary>,
}

impl CaseReport {
    /// Whether this record counts against the process exit code
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == "failed"
    }
}

/// A whole harness invocation's worth of records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version
    pub version: String,
    /// Records in execution order
    pub records: Vec<CaseReport>,
}

impl Report {
    /// Create an empty report
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            records: Vec::new(),
        }
    }

    /// Append one record
    pub fn push(&mut self, record: CaseReport) {
        self.records.push(record);
    }

    /// Whether any record failed
    #[must_use]
    pub fn any_failed(&self) -> bool {
        self.records.iter().any(CaseReport::is_failure)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render as CSV, one row per metric (status-only rows for runs that
    /// produced no metrics)
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "test,backend,status,tag,unit,type,count,mean,min,max,p50,p90,p99\n",
        );
        for record in &self.records {
            if record.metrics.is_empty() {
                out.push_str(&format!(
                    "{},{},{},,,,,,,,,,\n",
                    record.test,
                    record.backend.as_str(),
                    record.status
                ));
                continue;
            }
            for m in &record.metrics {
                out.push_str(&format!(
                    "{},{},{},{},{},{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3}\n",
                    record.test,
                    record.backend.as_str(),
                    record.status,
                    m.tag,
                    m.unit.as_str(),
                    m.mtype.as_str(),
                    m.count,
                    m.mean,
                    m.min,
                    m.max,
                    m.p50,
                    m.p90,
                    m.p99,
                ));
            }
        }
        out
    }

    /// Render as an aligned text table for terminals
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{:<26} {:<4} {:<20} {:>8} {:>12} {:>12} {:>12}\n",
            "Benchmark", "API", "Status", "Samples", "Mean", "Min", "Max"
        );
        for record in &self.records {
            if record.metrics.is_empty() {
                let detail = record.detail.as_deref().unwrap_or("");
                out.push_str(&format!(
                    "{:<26} {:<4} {:<20} {:>8} {}\n",
                    record.test,
                    record.backend.as_str(),
                    record.status,
                    "-",
                    detail
                ));
                continue;
            }
            for m in &record.metrics {
                let name = if m.tag.is_empty() {
                    record.test.clone()
                } else {
                    format!("{} [{}]", record.test, m.tag)
                };
                out.push_str(&format!(
                    "{:<26} {:<4} {:<20} {:>8} {:>9.3} {} {:>9.3} {} {:>9.3} {}\n",
                    name,
                    record.backend.as_str(),
                    record.status,
                    m.count,
                    m.mean,
                    m.unit.as_str(),
                    m.min,
                    m.unit.as_str(),
                    m.max,
                    m.unit.as_str(),
                ));
            }
        }
        out
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{MeasurementType, Statistics, Unit};

    fn record_with_samples() -> CaseReport {
        let mut stats = Statistics::new();
        for v in [10.0, 20.0, 30.0] {
            stats.push_value(v, Unit::Microseconds, MeasurementType::Cpu);
        }
        CaseReport {
            test: "MemoryAllocate".to_string(),
            backend: Backend::Level0,
            status: "ok".to_string(),
            detail: None,
            metrics: stats.summarize(),
        }
    }

    #[test]
    fn test_json_roundtrip() {
        let mut report = Report::new();
        report.push(record_with_samples());

        let json = report.to_json().unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, SCHEMA_VERSION);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].metrics[0].count, 3);
    }

    #[test]
    fn test_csv_has_header_and_metric_rows() {
        let mut report = Report::new();
        report.push(record_with_samples());

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("test,backend,status"));
        assert!(lines[1].starts_with("MemoryAllocate,l0,ok"));
        assert!(lines[1].contains("20.000"));
    }

    #[test]
    fn test_csv_status_only_row_for_empty_metrics() {
        let mut report = Report::new();
        report.push(CaseReport {
            test: "CreateModule".to_string(),
            backend: Backend::OpenCl,
            status: "failed".to_string(),
            detail: Some("Resource not found: kernels/ghost.spv".to_string()),
            metrics: Vec::new(),
        });

        let csv = report.to_csv();
        assert!(csv.contains("CreateModule,ocl,failed"));
        assert!(report.any_failed());
    }

    #[test]
    fn test_text_table_contains_values() {
        let mut report = Report::new();
        report.push(record_with_samples());
        let text = report.to_text();
        assert!(text.contains("Benchmark"));
        assert!(text.contains("MemoryAllocate"));
        assert!(text.contains("20.000"));
    }
}
