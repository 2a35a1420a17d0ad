//! Command list benchmarks: submission round trip, append cost, reset cost

use std::sync::Arc;
use std::time::Instant;

use crate::args::ArgumentContainer;
use crate::driver::{
    MemoryPlacement, ScopedCommandList, ScopedContext, ScopedEvent, ScopedKernel, ScopedMemory,
    ScopedModule,
};
use crate::registry::{Backend, Registry, RegistryError};
use crate::runner::{elapsed_us, BenchmarkCase, CaseError, CaseResult, RunContext, RunOutcome};
use crate::stats::{MeasurementType, Unit};

use super::SUITE;

const FILL_PATTERN: u8 = 0xA5;

/// Register the command list benchmarks
pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_metadata(
        "ExecuteCommandList",
        "Host cost of submitting a closed command list and waiting for completion",
        SUITE,
    )?;
    registry.register_case(
        "ExecuteCommandList",
        Backend::Level0,
        Arc::new(ExecuteCommandList),
    )?;
    registry.register_case(
        "ExecuteCommandList",
        Backend::OpenCl,
        Arc::new(ExecuteCommandList),
    )?;

    registry.register_metadata(
        "CommandListAppendKernel",
        "Host cost of appending a kernel launch (or device time of the launch with --measureGpu)",
        SUITE,
    )?;
    registry.register_case(
        "CommandListAppendKernel",
        Backend::Level0,
        Arc::new(CommandListAppendKernel),
    )?;
    registry.register_case(
        "CommandListAppendKernel",
        Backend::OpenCl,
        Arc::new(CommandListAppendKernel),
    )?;

    registry.register_metadata(
        "CommandListReset",
        "Host cost of resetting a populated command list",
        SUITE,
    )?;
    registry.register_case(
        "CommandListReset",
        Backend::Level0,
        Arc::new(CommandListReset),
    )?;

    Ok(())
}

/// Submit + host-wait round trip for a one-command list
pub struct ExecuteCommandList;

impl BenchmarkCase for ExecuteCommandList {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_bool("useEvent", "Wait on a completion event after submit", true);
        args.declare_positive_int("fillSize", "Bytes filled by the measured list", 65536);
    }

    #[allow(clippy::cast_sign_loss)]
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let use_event = ctx.args.bool_value("useEvent");
        let fill_size = ctx.args.int_value("fillSize") as usize;

        let context = ScopedContext::new(driver)?;
        let mem = ScopedMemory::new(driver, context.handle(), MemoryPlacement::Device, fill_size)?;
        let list = ScopedCommandList::new(driver, context.handle())?;
        let event = ScopedEvent::new(driver, context.handle())?;

        driver.append_memory_fill(list.handle(), mem.handle(), FILL_PATTERN)?;
        driver.close_command_list(list.handle())?;

        for _ in 0..ctx.args.warmup {
            driver.reset_event(event.handle())?;
            driver.submit(context.handle(), list.handle(), Some(event.handle()))?;
            driver.host_synchronize(event.handle())?;
        }

        for _ in 0..ctx.args.iterations {
            driver.reset_event(event.handle())?;

            let started = Instant::now();
            driver.submit(context.handle(), list.handle(), Some(event.handle()))?;
            if use_event {
                driver.host_synchronize(event.handle())?;
            }
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);
        }

        // Correctness check, outside the timed window. The probe must not
        // exceed the allocation.
        let mut probe = vec![0u8; fill_size.min(16)];
        driver.read_memory(context.handle(), mem.handle(), &mut probe)?;
        if probe.iter().any(|&b| b != FILL_PATTERN) {
            return Err(CaseError::InvalidArgs(
                "fill pattern not observed after execution".to_string(),
            ));
        }

        Ok(RunOutcome::Measured)
    }
}

/// Append cost of one kernel launch, or its device duration with
/// `--measureGpu`
pub struct CommandListAppendKernel;

impl BenchmarkCase for CommandListAppendKernel {
    fn mtype(&self, args: &ArgumentContainer) -> MeasurementType {
        if args.bool_value("measureGpu") {
            MeasurementType::Gpu
        } else {
            MeasurementType::Cpu
        }
    }

    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_u32("workgroupCount", "Workgroups per launch", 1);
        args.declare_bool(
            "measureGpu",
            "Measure device execution time from event timestamps instead of append cost",
            false,
        );
        args.declare_string("kernel", "Kernel blob file name", "empty_kernel.spv");
        args.declare_string("entry", "Kernel entry point", "empty");
    }

    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let workgroups = ctx.args.u32_value("workgroupCount");
        let measure_gpu = ctx.args.bool_value("measureGpu");

        if measure_gpu && !driver.capabilities().gpu_timestamps {
            return Ok(RunOutcome::DeviceNotCapable(
                "device exposes no kernel timestamp counters".to_string(),
            ));
        }

        let blob = ctx.blobs.load(ctx.args.string_value("kernel"))?;
        let context = ScopedContext::new(driver)?;
        let module = ScopedModule::new(driver, context.handle(), &blob)?;
        let kernel = ScopedKernel::new(driver, module.handle(), ctx.args.string_value("entry"))?;
        let list = ScopedCommandList::new(driver, context.handle())?;
        let event = ScopedEvent::new(driver, context.handle())?;

        if measure_gpu {
            self.run_gpu_timed(ctx, &context, &kernel, &list, &event, workgroups)
        } else {
            self.run_append_timed(ctx, &kernel, &list, workgroups)
        }
    }
}

impl CommandListAppendKernel {
    fn run_append_timed(
        &self,
        ctx: &mut RunContext<'_>,
        kernel: &ScopedKernel<'_>,
        list: &ScopedCommandList<'_>,
        workgroups: u32,
    ) -> CaseResult {
        let driver = ctx.driver;

        for _ in 0..ctx.args.warmup {
            driver.append_launch_kernel(list.handle(), kernel.handle(), workgroups, None)?;
            driver.reset_command_list(list.handle())?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            driver.append_launch_kernel(list.handle(), kernel.handle(), workgroups, None)?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);

            // Keep the list empty between iterations, outside the timed
            // window.
            driver.reset_command_list(list.handle())?;
        }

        Ok(RunOutcome::Measured)
    }

    fn run_gpu_timed(
        &self,
        ctx: &mut RunContext<'_>,
        context: &ScopedContext<'_>,
        kernel: &ScopedKernel<'_>,
        list: &ScopedCommandList<'_>,
        event: &ScopedEvent<'_>,
        workgroups: u32,
    ) -> CaseResult {
        let driver = ctx.driver;
        let tick_ns = driver.capabilities().timer_resolution_ns;
        let warmup = ctx.args.warmup;
        let iterations = ctx.args.iterations;
        let stats = &mut *ctx.stats;

        let mut launch = |timed: bool| -> Result<(), CaseError> {
            driver.reset_event(event.handle())?;
            driver.append_launch_kernel(
                list.handle(),
                kernel.handle(),
                workgroups,
                Some(event.handle()),
            )?;
            driver.close_command_list(list.handle())?;
            driver.submit(context.handle(), list.handle(), None)?;
            driver.host_synchronize(event.handle())?;

            if timed {
                let (start, end) = driver.event_timestamps(event.handle())?;
                let us = (end.saturating_sub(start)) as f64 * tick_ns / 1e3;
                stats.push_value(us, Unit::Microseconds, MeasurementType::Gpu);
            }

            driver.reset_command_list(list.handle())?;
            Ok(())
        };

        for _ in 0..warmup {
            launch(false)?;
        }
        for _ in 0..iterations {
            launch(true)?;
        }

        Ok(RunOutcome::Measured)
    }
}

/// Reset cost of a command list populated with `commandCount` fills
pub struct CommandListReset;

impl BenchmarkCase for CommandListReset {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_positive_int("commandCount", "Commands in the list before reset", 16);
    }

    #[allow(clippy::cast_sign_loss)]
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let command_count = ctx.args.int_value("commandCount") as usize;

        let context = ScopedContext::new(driver)?;
        let mem = ScopedMemory::new(driver, context.handle(), MemoryPlacement::Device, 4096)?;
        let list = ScopedCommandList::new(driver, context.handle())?;

        let populate = || -> Result<(), CaseError> {
            for _ in 0..command_count {
                driver.append_memory_fill(list.handle(), mem.handle(), FILL_PATTERN)?;
            }
            Ok(())
        };

        for _ in 0..ctx.args.warmup {
            populate()?;
            driver.reset_command_list(list.handle())?;
        }

        for _ in 0..ctx.args.iterations {
            populate()?;

            let started = Instant::now();
            driver.reset_command_list(list.handle())?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);
        }

        Ok(RunOutcome::Measured)
    }
}
