//! CLI command handlers
//!
//! Extracted from main.rs so that dispatch, suite iteration and report
//! emission are testable without spawning the binary. main.rs only parses
//! flags, calls a handler and maps the result to an exit code.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::args::ArgumentContainer;
use crate::driver::for_backend;
use crate::error::{MedirError, Result};
use crate::registry::{Backend, Registry};
use crate::report::{CaseReport, Report};
use crate::runner::{run_case, RunOutcome};
use crate::stats::Statistics;

// ============================================================================
// Options
// ============================================================================

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table for terminals
    Text,
    /// Pretty JSON
    Json,
    /// One row per metric
    Csv,
}

impl OutputFormat {
    /// Parse from string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Options shared by the `run` and `all` commands
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// API backend to dispatch to
    pub backend: Backend,
    /// Measured iterations per benchmark
    pub iterations: usize,
    /// Untimed warmup iterations per benchmark
    pub warmup: usize,
    /// Skip benchmark bodies, measure harness overhead only
    pub noop: bool,
    /// Kernel blob directory
    pub kernels_dir: PathBuf,
    /// Report format
    pub output: OutputFormat,
    /// Write the report here instead of stdout
    pub output_file: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            backend: Backend::Level0,
            iterations: 1000,
            warmup: 3,
            noop: false,
            kernels_dir: PathBuf::from("kernels"),
            output: OutputFormat::Text,
            output_file: None,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// One row of `medir list` output
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEntry {
    /// Benchmark name
    pub name: String,
    /// One-line help text
    pub help: String,
    /// Owning suite tag
    pub suite: String,
    /// Backends the benchmark is implemented for
    pub backends: Vec<Backend>,
}

/// Render the registered benchmarks as text or JSON
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn handle_list(registry: &Registry, json: bool) -> Result<String> {
    let entries: Vec<ListEntry> = registry
        .list_all()
        .iter()
        .map(|meta| ListEntry {
            name: meta.name.clone(),
            help: meta.help.clone(),
            suite: meta.suite.clone(),
            backends: registry.backends_for(&meta.name),
        })
        .collect();

    if json {
        return Ok(serde_json::to_string_pretty(&entries)?);
    }

    let mut out = String::new();
    for entry in &entries {
        let backends: Vec<&str> = entry.backends.iter().map(Backend::as_str).collect();
        out.push_str(&format!(
            "{:<26} [{}] {}\n",
            entry.name,
            backends.join(", "),
            entry.help
        ));
    }
    Ok(out)
}

/// Run one benchmark and record the outcome
///
/// Benchmark failures are captured in the returned record, not propagated;
/// only dispatch errors (unknown name, unimplemented backend, malformed
/// arguments) abort the invocation.
///
/// # Errors
///
/// Returns `MedirError::UnknownBenchmark`, `MedirError::NotImplemented`, or
/// `MedirError::Args`.
pub fn execute(
    registry: &Registry,
    name: &str,
    tokens: &[String],
    opts: &RunOptions,
) -> Result<CaseReport> {
    if registry.metadata(name).is_none() {
        return Err(MedirError::UnknownBenchmark(name.to_string()));
    }
    let case = registry
        .lookup(name, opts.backend)
        .ok_or_else(|| MedirError::NotImplemented {
            name: name.to_string(),
            backend: opts.backend,
        })?;

    let mut args = ArgumentContainer::new(opts.backend, opts.iterations, opts.warmup)
        .with_noop(opts.noop)
        .with_kernels_dir(opts.kernels_dir.clone());
    case.declare_arguments(&mut args);
    args.parse(tokens)?;

    let driver = for_backend(opts.backend);
    let mut stats = Statistics::new();

    let (status, detail) = match run_case(case, &args, driver.as_ref(), &mut stats) {
        Ok(outcome) => {
            let detail = match &outcome {
                RunOutcome::DeviceNotCapable(why) | RunOutcome::ApiNotCapable(why) => {
                    Some(why.clone())
                },
                RunOutcome::Measured | RunOutcome::Nooped => None,
            };
            (outcome.as_str().to_string(), detail)
        },
        Err(err) => ("failed".to_string(), Some(err.to_string())),
    };

    Ok(CaseReport {
        test: name.to_string(),
        backend: opts.backend,
        status,
        detail,
        metrics: stats.summarize(),
    })
}

/// Run every registered benchmark with default arguments
///
/// Benchmarks without an implementation for the selected backend are recorded
/// as `not-implemented` and do not count against the exit code.
///
/// # Errors
///
/// Returns an error only on dispatch bugs; per-benchmark failures are
/// captured in the report.
pub fn execute_suite(registry: &Registry, opts: &RunOptions) -> Result<Report> {
    let mut report = Report::new();
    let names: Vec<String> = registry.list_all().iter().map(|m| m.name.clone()).collect();

    for name in names {
        if registry.lookup(&name, opts.backend).is_none() {
            report.push(CaseReport {
                test: name,
                backend: opts.backend,
                status: "not-implemented".to_string(),
                detail: None,
                metrics: Vec::new(),
            });
            continue;
        }
        report.push(execute(registry, &name, &[], opts)?);
    }
    Ok(report)
}

/// Render a report in the requested format
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Json => Ok(report.to_json()?),
        OutputFormat::Csv => Ok(report.to_csv()),
    }
}

/// Write a rendered report to the configured sink
///
/// # Errors
///
/// Returns an error on serialization or file I/O failure.
pub fn emit(report: &Report, opts: &RunOptions) -> Result<()> {
    let rendered = render(report, opts.output)?;
    match &opts.output_file {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts_with_blob(dir: &tempfile::TempDir) -> RunOptions {
        std::fs::write(
            dir.path().join("empty_kernel.spv"),
            [0x07, 0x23, 0x02, 0x03],
        )
        .unwrap();
        RunOptions {
            iterations: 4,
            warmup: 1,
            kernels_dir: dir.path().to_path_buf(),
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_execute_unknown_benchmark() {
        let registry = Registry::builtin().unwrap();
        let err = execute(&registry, "Ghost", &[], &RunOptions::default()).unwrap_err();
        assert!(matches!(err, MedirError::UnknownBenchmark(_)));
    }

    #[test]
    fn test_execute_not_implemented_backend() {
        let registry = Registry::builtin().unwrap();
        let opts = RunOptions {
            backend: Backend::OpenCl,
            ..RunOptions::default()
        };
        // Registered, but only for Level0.
        let err = execute(&registry, "CommandListReset", &[], &opts).unwrap_err();
        assert!(matches!(err, MedirError::NotImplemented { .. }));
    }

    #[test]
    fn test_execute_measures() {
        let registry = Registry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let opts = opts_with_blob(&dir);

        let record = execute(&registry, "MemoryAllocate", &[], &opts).unwrap();
        assert_eq!(record.status, "ok");
        assert_eq!(record.metrics[0].count, 4);
    }

    #[test]
    fn test_execute_noop_records_marker_only() {
        let registry = Registry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            noop: true,
            ..opts_with_blob(&dir)
        };

        let record = execute(&registry, "CreateModule", &[], &opts).unwrap();
        assert_eq!(record.status, "nooped");
        assert_eq!(record.metrics[0].count, 0);
    }

    #[test]
    fn test_execute_case_failure_is_captured() {
        let registry = Registry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let opts = opts_with_blob(&dir);

        let tokens = vec!["--kernel".to_string(), "ghost.spv".to_string()];
        let record = execute(&registry, "CreateModule", &tokens, &opts).unwrap();
        assert_eq!(record.status, "failed");
        assert!(record.detail.as_deref().unwrap().contains("ghost.spv"));
        assert!(record.metrics.is_empty());
    }

    #[test]
    fn test_execute_rejects_unknown_case_argument() {
        let registry = Registry::builtin().unwrap();
        let tokens = vec!["--bogus".to_string(), "1".to_string()];
        let err =
            execute(&registry, "MemoryAllocate", &tokens, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, MedirError::Args(_)));
    }

    #[test]
    fn test_suite_covers_every_benchmark() {
        let registry = Registry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let opts = opts_with_blob(&dir);

        let report = execute_suite(&registry, &opts).unwrap();
        assert_eq!(report.records.len(), registry.list_all().len());
        assert!(!report.any_failed());
        assert!(report.records.iter().all(|r| r.status == "ok"));
    }

    #[test]
    fn test_suite_skips_unimplemented_pairs() {
        let registry = Registry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            backend: Backend::OpenCl,
            ..opts_with_blob(&dir)
        };

        let report = execute_suite(&registry, &opts).unwrap();
        let skipped: Vec<&str> = report
            .records
            .iter()
            .filter(|r| r.status == "not-implemented")
            .map(|r| r.test.as_str())
            .collect();
        assert!(skipped.contains(&"CommandListReset"));
        assert!(skipped.contains(&"VirtualMemoryReserve"));
        assert!(!report.any_failed());
    }

    #[test]
    fn test_list_text_and_json() {
        let registry = Registry::builtin().unwrap();

        let text = handle_list(&registry, false).unwrap();
        assert!(text.contains("MemoryAllocate"));
        assert!(text.contains("l0"));

        let json = handle_list(&registry, true).unwrap();
        let entries: Vec<ListEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(entries.len(), registry.list_all().len());
    }

    #[test]
    fn test_emit_to_file() {
        let registry = Registry::builtin().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.json");
        let opts = RunOptions {
            output: OutputFormat::Json,
            output_file: Some(out.clone()),
            ..opts_with_blob(&dir)
        };

        let mut report = Report::new();
        report.push(execute(&registry, "EventQueryStatus", &[], &opts).unwrap());
        emit(&report, &opts).unwrap();

        let written = std::fs::read_to_string(out).unwrap();
        let parsed: Report = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.records[0].test, "EventQueryStatus");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("csv"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::parse("xml"), None);
    }
}
