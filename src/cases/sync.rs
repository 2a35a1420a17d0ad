//! Event synchronization benchmarks: non-blocking query, host wait

use std::sync::Arc;
use std::time::Instant;

use crate::args::ArgumentContainer;
use crate::driver::{ScopedContext, ScopedEvent};
use crate::registry::{Backend, Registry, RegistryError};
use crate::runner::{elapsed_us, BenchmarkCase, CaseError, CaseResult, RunContext, RunOutcome};
use crate::stats::{MeasurementType, Unit};

use super::SUITE;

/// Register the synchronization benchmarks
pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_metadata(
        "EventQueryStatus",
        "Host cost of a non-blocking event status query",
        SUITE,
    )?;
    registry.register_case(
        "EventQueryStatus",
        Backend::Level0,
        Arc::new(EventQueryStatus),
    )?;
    registry.register_case(
        "EventQueryStatus",
        Backend::OpenCl,
        Arc::new(EventQueryStatus),
    )?;

    registry.register_metadata(
        "EventHostSynchronize",
        "Host cost of waiting on an already-signaled event",
        SUITE,
    )?;
    registry.register_case(
        "EventHostSynchronize",
        Backend::Level0,
        Arc::new(EventHostSynchronize),
    )?;
    registry.register_case(
        "EventHostSynchronize",
        Backend::OpenCl,
        Arc::new(EventHostSynchronize),
    )?;

    Ok(())
}

/// Non-blocking status query on a signaled or unsignaled event
pub struct EventQueryStatus;

impl BenchmarkCase for EventQueryStatus {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_bool("signaled", "Query a signaled event instead of a fresh one", true);
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let expect_signaled = ctx.args.bool_value("signaled");

        let context = ScopedContext::new(driver)?;
        let event = ScopedEvent::new(driver, context.handle())?;
        if expect_signaled {
            driver.signal_event(event.handle())?;
        }

        for _ in 0..ctx.args.warmup {
            driver.query_event(event.handle())?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            let observed = driver.query_event(event.handle())?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);

            // Correctness check, outside the timed window.
            if observed != expect_signaled {
                return Err(CaseError::InvalidArgs(format!(
                    "event status flipped mid-run: expected signaled={expect_signaled}"
                )));
            }
        }

        Ok(RunOutcome::Measured)
    }
}

/// Host wait on an event signaled during setup
pub struct EventHostSynchronize;

impl BenchmarkCase for EventHostSynchronize {
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;

        let context = ScopedContext::new(driver)?;
        let event = ScopedEvent::new(driver, context.handle())?;
        driver.signal_event(event.handle())?;

        for _ in 0..ctx.args.warmup {
            driver.host_synchronize(event.handle())?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            driver.host_synchronize(event.handle())?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);
        }

        Ok(RunOutcome::Measured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::runner::run_case;
    use crate::stats::Statistics;

    fn run(case: &dyn BenchmarkCase, extra: &[&str]) -> (CaseResult, Statistics) {
        let driver = MockDriver::new(Backend::Level0);
        let mut args = ArgumentContainer::new(Backend::Level0, 10, 1);
        case.declare_arguments(&mut args);
        args.parse(&extra.iter().map(ToString::to_string).collect::<Vec<_>>())
            .unwrap();

        let mut stats = Statistics::new();
        let result = run_case(case, &args, &driver, &mut stats);
        assert_eq!(driver.live_handles(), 0);
        (result, stats)
    }

    #[test]
    fn test_query_signaled_event() {
        let (result, stats) = run(&EventQueryStatus, &[]);
        assert_eq!(result.unwrap(), RunOutcome::Measured);
        assert_eq!(stats.len(), 10);
    }

    #[test]
    fn test_query_unsignaled_event() {
        let (result, stats) = run(&EventQueryStatus, &["--signaled", "false"]);
        assert_eq!(result.unwrap(), RunOutcome::Measured);
        assert_eq!(stats.len(), 10);
    }

    #[test]
    fn test_host_synchronize_signaled_event() {
        let (result, stats) = run(&EventHostSynchronize, &[]);
        assert_eq!(result.unwrap(), RunOutcome::Measured);
        let s = &stats.summarize()[0];
        assert_eq!(s.count, 10);
        assert!(s.min <= s.mean && s.mean <= s.max);
    }
}
