//! Memory management benchmarks: allocation, virtual reservation, mapping

use std::sync::Arc;
use std::time::Instant;

use crate::args::ArgumentContainer;
use crate::driver::{
    MemoryPlacement, ScopedContext, ScopedMemory, ScopedPhysical, ScopedVirtual,
};
use crate::registry::{Backend, Registry, RegistryError};
use crate::runner::{elapsed_us, BenchmarkCase, CaseError, CaseResult, RunContext, RunOutcome};
use crate::stats::{MeasurementType, Unit};

use super::SUITE;

/// Register the memory benchmarks
pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_metadata(
        "MemoryAllocate",
        "Host cost of one allocation (free happens outside the timed window)",
        SUITE,
    )?;
    registry.register_case("MemoryAllocate", Backend::Level0, Arc::new(MemoryAllocate))?;
    registry.register_case("MemoryAllocate", Backend::OpenCl, Arc::new(MemoryAllocate))?;

    registry.register_metadata(
        "VirtualMemoryReserve",
        "Host cost of reserving a virtual address range",
        SUITE,
    )?;
    registry.register_case(
        "VirtualMemoryReserve",
        Backend::Level0,
        Arc::new(VirtualMemoryReserve),
    )?;

    registry.register_metadata(
        "PhysicalMemoryMap",
        "Host cost of mapping physical backing into a reserved range",
        SUITE,
    )?;
    registry.register_case(
        "PhysicalMemoryMap",
        Backend::Level0,
        Arc::new(PhysicalMemoryMap),
    )?;

    Ok(())
}

/// Single allocation cost for a given size and placement
pub struct MemoryAllocate;

impl BenchmarkCase for MemoryAllocate {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_positive_int("size", "Allocation size in bytes", 4096);
        args.declare_enum(
            "placement",
            "Where the allocation lives",
            &["device", "host", "shared"],
            "device",
        );
    }

    #[allow(clippy::cast_sign_loss)]
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let size = ctx.args.int_value("size") as usize;
        let placement = MemoryPlacement::parse(ctx.args.string_value("placement"))
            .ok_or_else(|| CaseError::InvalidArgs("unknown placement".to_string()))?;

        let context = ScopedContext::new(driver)?;

        for _ in 0..ctx.args.warmup {
            let _mem = ScopedMemory::new(driver, context.handle(), placement, size)?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            let mem = ScopedMemory::new(driver, context.handle(), placement, size)?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);

            // Free outside the timed window.
            drop(mem);
        }

        Ok(RunOutcome::Measured)
    }
}

/// Virtual address range reservation cost
pub struct VirtualMemoryReserve;

impl BenchmarkCase for VirtualMemoryReserve {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_positive_int("size", "Reservation size in bytes", 1 << 21);
    }

    #[allow(clippy::cast_sign_loss)]
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let size = ctx.args.int_value("size") as usize;

        if !driver.capabilities().virtual_memory {
            return Ok(RunOutcome::ApiNotCapable(
                "backend exposes no virtual memory management".to_string(),
            ));
        }

        let context = ScopedContext::new(driver)?;

        for _ in 0..ctx.args.warmup {
            let _virt = ScopedVirtual::new(driver, context.handle(), size)?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            let virt = ScopedVirtual::new(driver, context.handle(), size)?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);
            drop(virt);
        }

        Ok(RunOutcome::Measured)
    }
}

/// Map/unmap cost of physical backing in a reserved range
pub struct PhysicalMemoryMap;

impl BenchmarkCase for PhysicalMemoryMap {
    fn declare_arguments(&self, args: &mut ArgumentContainer) {
        args.declare_positive_int("size", "Physical backing size in bytes", 1 << 16);
    }

    #[allow(clippy::cast_sign_loss)]
    fn run(&self, ctx: &mut RunContext<'_>) -> CaseResult {
        let driver = ctx.driver;
        let size = ctx.args.int_value("size") as usize;

        if !driver.capabilities().virtual_memory {
            return Ok(RunOutcome::ApiNotCapable(
                "backend exposes no virtual memory management".to_string(),
            ));
        }

        let context = ScopedContext::new(driver)?;
        let virt = ScopedVirtual::new(driver, context.handle(), size)?;
        let phys = ScopedPhysical::new(driver, context.handle(), size)?;

        for _ in 0..ctx.args.warmup {
            driver.map_virtual(context.handle(), virt.handle(), phys.handle())?;
            driver.unmap_virtual(context.handle(), virt.handle())?;
        }

        for _ in 0..ctx.args.iterations {
            let started = Instant::now();
            driver.map_virtual(context.handle(), virt.handle(), phys.handle())?;
            let us = elapsed_us(started);

            ctx.stats
                .push_value(us, Unit::Microseconds, MeasurementType::Cpu);

            // Unmap outside the timed window.
            driver.unmap_virtual(context.handle(), virt.handle())?;
        }

        Ok(RunOutcome::Measured)
    }
}
