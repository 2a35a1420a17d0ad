//! Built-in benchmark suite
//!
//! Each case measures the host-side (or device-side) cost of exactly one
//! driver operation. Registration is explicit: [`register_all`] is the
//! single list of every (name, backend) pair the harness ships.
//!
//! Backend coverage is intentional, not uniform — command-list reset and the
//! virtual/physical memory cases only exist on the low-level backend, so the
//! "not implemented for this backend" dispatch path is real.

use crate::registry::{Registry, RegistryError};

mod command_list;
mod memory;
mod module;
mod sync;

pub use command_list::{CommandListAppendKernel, CommandListReset, ExecuteCommandList};
pub use memory::{MemoryAllocate, PhysicalMemoryMap, VirtualMemoryReserve};
pub use module::{CreateModule, SetKernelArg};
pub use sync::{EventHostSynchronize, EventQueryStatus};

/// Suite tag shared by all built-in benchmarks
pub const SUITE: &str = "api_overhead";

/// Register every built-in benchmark
///
/// # Errors
///
/// Returns the first registration conflict; a conflict here is a logic error
/// in the suite definition.
pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    command_list::register(registry)?;
    sync::register(registry)?;
    memory::register(registry)?;
    module::register(registry)?;
    Ok(())
}
