//! The run-loop contract every benchmark follows
//!
//! 1. No-op fast exit: push one unit/type marker, return [`RunOutcome::Nooped`],
//!    never touch the driver.
//! 2. Deterministic setup through scoped driver-handle guards.
//! 3. Untimed warmup iterations.
//! 4. N measured iterations: timer around exactly the operation under test,
//!    one sample per iteration, correctness checks outside the timed window.
//! 5. Teardown by guard drops, in reverse acquisition order, on every exit
//!    path.
//!
//! A failing benchmark reports a typed [`CaseError`]; the harness proceeds
//! to the next benchmark.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::args::{ArgError, ArgumentContainer};
use crate::blob::BlobStore;
use crate::driver::{ComputeDriver, DriverError};
use crate::stats::{MeasurementType, Statistics, Unit};

/// Successful run outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The benchmark body ran and produced samples
    Measured,
    /// No-op mode: the body was skipped intentionally
    Nooped,
    /// The device cannot run the requested configuration (known a priori)
    DeviceNotCapable(String),
    /// The backend cannot express the requested configuration
    ApiNotCapable(String),
}

impl RunOutcome {
    /// Short status label used in reports
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Measured => "ok",
            Self::Nooped => "nooped",
            Self::DeviceNotCapable(_) => "device-not-capable",
            Self::ApiNotCapable(_) => "api-not-capable",
        }
    }
}

/// Typed benchmark failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaseError {
    /// A required file (e.g. a kernel binary) is missing
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The parsed configuration is unsupported (e.g. argument size too large)
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// A wrapped driver call returned non-success
    #[error(transparent)]
    DriverCall(#[from] DriverError),
}

impl From<ArgError> for CaseError {
    fn from(err: ArgError) -> Self {
        Self::InvalidArgs(err.to_string())
    }
}

/// Result of one benchmark run
pub type CaseResult = Result<RunOutcome, CaseError>;

/// Everything a benchmark body may touch during one run
pub struct RunContext<'a> {
    /// Parsed, read-only benchmark configuration
    pub args: &'a ArgumentContainer,
    /// The driver under measurement
    pub driver: &'a dyn ComputeDriver,
    /// Sample sink for this run
    pub stats: &'a mut Statistics,
    /// Kernel binary store
    pub blobs: BlobStore,
}

/// One named, parameterized measurement of a single driver operation's cost
pub trait BenchmarkCase: Send + Sync {
    /// Unit of the samples this benchmark produces
    fn unit(&self) -> Unit {
        Unit::Microseconds
    }

    /// Measurement type of the samples this benchmark produces
    ///
    /// Takes the parsed arguments so benchmarks that support both channels
    /// (e.g. a `--measureGpu` switch) report the channel the run would use.
    fn mtype(&self, args: &ArgumentContainer) -> MeasurementType {
        let _ = args;
        MeasurementType::Cpu
    }

    /// Declare the benchmark's parameters into the container
    fn declare_arguments(&self, _args: &mut ArgumentContainer) {}

    /// Execute setup, warmup, measured iterations and teardown
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult;
}

/// Run one benchmark under the shared contract
///
/// Handles the no-op fast exit centrally so no benchmark body can get it
/// wrong: exactly one unit/type marker is pushed and the driver is never
/// touched.
///
/// # Errors
///
/// Propagates the benchmark's typed [`CaseError`].
pub fn run_case(
    case: &dyn BenchmarkCase,
    args: &ArgumentContainer,
    driver: &dyn ComputeDriver,
    stats: &mut Statistics,
) -> CaseResult {
    if args.noop {
        stats.push_unit_and_type(case.unit(), case.mtype(args));
        return Ok(RunOutcome::Nooped);
    }

    let mut ctx = RunContext {
        args,
        driver,
        stats,
        blobs: BlobStore::new(args.kernels_dir.clone()),
    };
    case.run(&mut ctx)
}

/// Microseconds elapsed since `start`
#[must_use]
pub fn elapsed_us(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1e6
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::driver::for_backend;
    use crate::registry::Backend;

    struct CountingCase {
        runs: AtomicUsize,
    }

    impl BenchmarkCase for CountingCase {
        fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
            self.runs.fetch_add(1, Ordering::SeqCst);
            for _ in 0..ctx.args.iterations {
                ctx.stats
                    .push_value(1.0, Unit::Microseconds, MeasurementType::Cpu);
            }
            Ok(RunOutcome::Measured)
        }
    }

    #[test]
    fn test_noop_skips_body_and_pushes_one_marker() {
        let case = CountingCase {
            runs: AtomicUsize::new(0),
        };
        let args = ArgumentContainer::new(Backend::Level0, 100, 5).with_noop(true);
        let driver = for_backend(Backend::Level0);
        let mut stats = Statistics::new();

        let outcome = run_case(&case, &args, driver.as_ref(), &mut stats).unwrap();

        assert_eq!(outcome, RunOutcome::Nooped);
        assert_eq!(case.runs.load(Ordering::SeqCst), 0);
        assert_eq!(stats.len(), 1);
        assert!(stats.samples()[0].value.is_none());
    }

    #[test]
    fn test_measured_run_invokes_body_once() {
        let case = CountingCase {
            runs: AtomicUsize::new(0),
        };
        let args = ArgumentContainer::new(Backend::Level0, 7, 0);
        let driver = for_backend(Backend::Level0);
        let mut stats = Statistics::new();

        let outcome = run_case(&case, &args, driver.as_ref(), &mut stats).unwrap();

        assert_eq!(outcome, RunOutcome::Measured);
        assert_eq!(case.runs.load(Ordering::SeqCst), 1);
        assert_eq!(stats.len(), 7);
    }

    #[test]
    fn test_arg_error_maps_to_invalid_args() {
        let err: CaseError = ArgError::UnknownArgument("x".to_string()).into();
        assert!(matches!(err, CaseError::InvalidArgs(_)));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RunOutcome::Measured.as_str(), "ok");
        assert_eq!(RunOutcome::Nooped.as_str(), "nooped");
        assert_eq!(
            RunOutcome::DeviceNotCapable("no timestamps".to_string()).as_str(),
            "device-not-capable"
        );
    }
}
