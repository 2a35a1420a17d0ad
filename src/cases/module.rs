//! Module and kernel benchmarks: module creation, kernel argument setting

use std::sync::Arc;
use std::time::Instant;

use crate::args::ArgumentContainer;
use crate::driver::{ScopedContext, ScopedKernel, ScopedModule};
use crate::registry::{Backend, Registry, RegistryError};
use crate::runner::{elapsed_us, BenchmarkCase, CaseError, CaseResult, RunContext, RunOutcome};
use crate::stats::{MeasurementType, Unit};

use super::SUITE;

/// Register the module/kernel benchmarks
pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_metadata(
        "CreateModule",
        "Host cost of creating a module from a precompiled kernel blob",
        SUITE,
    )?;
    registry.register_case("CreateModule", Backend::Level0, Arc::new(CreateModule))?;
    registry.register_case("CreateModule", Backend::OpenCl, Arc::new(CreateModule))?;

    registry.register_metadata(
        "SetKernelArg",
        "Host cost of setting one kernel argument of a given size",
        SUITE,
    )?;
    registry.register_case("SetKernelArg", Backend::Level0, Arc::new(SetKernelArg))?;
    registry.register_case("SetKernelArg", Backend::OpenCl, Arc::new(SetKernelArg))?;

    Ok(())
}

/// Module creation cost from a blob loaded by name
pub struct CreateModule;

impl BenchmarkCase for CreateModule {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_string("kernel", "Kernel blob file name", "empty_kernel.spv");
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let blob = ctx.blobs.load(ctx.args.string_value("kernel"))?;

        let context = ScopedContext::new(driver)?;

        for _ in 0..ctx.args.warmup {
            let _module = ScopedModule::new(driver, context.handle(), &blob)?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            let module = ScopedModule::new(driver, context.handle(), &blob)?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);

            // Destroy outside the timed window.
            drop(module);
        }

        Ok(RunOutcome::Measured)
    }
}

/// Kernel argument setting cost for a given argument size
pub struct SetKernelArg;

impl BenchmarkCase for SetKernelArg {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_positive_int("argSize", "Argument size in bytes", 64);
        args.declare_string("kernel", "Kernel blob file name", "empty_kernel.spv");
        args.declare_string("entry", "Kernel entry point", "empty");
    }

    #[allow(clippy::cast_sign_loss)]
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let arg_size = ctx.args.int_value("argSize") as usize;

        // Known a priori; checked before any timed body runs.
        let max = driver.capabilities().max_kernel_arg_size;
        if arg_size > max {
            return Err(CaseError::InvalidArgs(format!(
                "argSize {arg_size} exceeds backend maximum {max}"
            )));
        }

        let blob = ctx.blobs.load(ctx.args.string_value("kernel"))?;
        let context = ScopedContext::new(driver)?;
        let module = ScopedModule::new(driver, context.handle(), &blob)?;
        let kernel = ScopedKernel::new(driver, module.handle(), ctx.args.string_value("entry"))?;

        let data = vec![0u8; arg_size];

        for _ in 0..ctx.args.warmup {
            driver.set_kernel_arg(kernel.handle(), 0, &data)?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            driver.set_kernel_arg(kernel.handle(), 0, &data)?;
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

    fn run(
        case: &dyn BenchmarkCase,
        backend: Backend,
        extra: &[&str],
    ) -> (CaseResult, Statistics) {
        let driver = MockDriver::new(backend);
        let mut args = ArgumentContainer::new(backend, 5, 1);
        case.declare_arguments(&mut args);
        args.parse(&extra.iter().map(ToString::to_string).collect::<Vec<_>>())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("empty_kernel.spv"), [0x07, 0x23, 0x02, 0x03]).unwrap();
        args = args.with_kernels_dir(dir.path().to_path_buf());

        let mut stats = Statistics::new();
        let result = run_case(case, &args, &driver, &mut stats);
        assert_eq!(driver.live_handles(), 0);
        (result, stats)
    }

    #[test]
    fn test_create_module_measures() {
        let (result, stats) = run(&CreateModule, Backend::Level0, &[]);
        assert_eq!(result.unwrap(), RunOutcome::Measured);
        assert_eq!(stats.len(), 5);
    }

    #[test]
    fn test_create_module_missing_blob_is_resource_not_found() {
        let (result, stats) = run(&CreateModule, Backend::Level0, &["--kernel", "ghost.spv"]);
        assert!(matches!(
            result.unwrap_err(),
            CaseError::ResourceNotFound(_)
        ));
        assert_eq!(stats.len(), 0);
    }

    #[test]
    fn test_set_kernel_arg_measures() {
        let (result, stats) = run(&SetKernelArg, Backend::Level0, &["--argSize", "256"]);
        assert_eq!(result.unwrap(), RunOutcome::Measured);
        assert_eq!(stats.len(), 5);
    }

    #[test]
    fn test_set_kernel_arg_oversized_is_invalid_args() {
        // OpenCl profile caps argument size at 1024.
        let (result, stats) = run(&SetKernelArg, Backend::OpenCl, &["--argSize", "2048"]);
        assert!(matches!(result.unwrap_err(), CaseError::InvalidArgs(_)));
        assert_eq!(stats.len(), 0);
    }
}
