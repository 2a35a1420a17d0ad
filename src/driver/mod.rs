//! Black-box native driver seam
//!
//! The harness consumes a small capability set — contexts, memory, command
//! lists, events, modules/kernels, submit, wait — and produces/consumes
//! opaque handles. Everything behind [`ComputeDriver`] is the vendor's
//! problem; everything in front of it is measurable without hardware, which
//! is also what the shipped [`MockDriver`] is for.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::Backend;

mod guard;
mod mock;

pub use guard::{
    ScopedCommandList, ScopedContext, ScopedEvent, ScopedKernel, ScopedMemory, ScopedModule,
    ScopedPhysical, ScopedVirtual,
};
pub use mock::MockDriver;

/// A driver call returning a non-success status code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Driver call {call} failed with code {code}")]
pub struct DriverError {
    /// Name of the failing driver entry point
    pub call: &'static str,
    /// Vendor status code
    pub code: i32,
}

impl DriverError {
    /// Construct from a call name and status code
    #[must_use]
    pub fn new(call: &'static str, code: i32) -> Self {
        Self { call, code }
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

macro_rules! opaque_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

opaque_handle!(
    /// Opaque driver context handle
    ContextHandle
);
opaque_handle!(
    /// Opaque device/host/shared memory handle
    MemoryHandle
);
opaque_handle!(
    /// Opaque command list handle
    CommandListHandle
);
opaque_handle!(
    /// Opaque synchronization event handle
    EventHandle
);
opaque_handle!(
    /// Opaque compiled-module handle
    ModuleHandle
);
opaque_handle!(
    /// Opaque kernel handle
    KernelHandle
);
opaque_handle!(
    /// Opaque reserved virtual address range handle
    VirtualHandle
);
opaque_handle!(
    /// Opaque physical memory allocation handle
    PhysicalHandle
);

/// Where an allocation lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryPlacement {
    /// Device-local memory
    Device,
    /// Host memory visible to the device
    Host,
    /// Migratable shared memory
    Shared,
}

impl MemoryPlacement {
    /// Parse from the `--placement` argument variants
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "device" => Some(Self::Device),
            "host" => Some(Self::Host),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

/// A priori known limits and capabilities of a device/backend pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Capabilities {
    /// Device exposes kernel timestamp counters
    pub gpu_timestamps: bool,
    /// Backend exposes virtual/physical memory management
    pub virtual_memory: bool,
    /// Largest accepted kernel argument, in bytes
    pub max_kernel_arg_size: usize,
    /// Device timestamp tick length in nanoseconds
    pub timer_resolution_ns: f64,
}

/// The native compute driver, reduced to the calls under measurement
///
/// All methods take `&self`; implementations synchronize internally. Handles
/// are opaque and owned by the scoped guards in this module.
pub trait ComputeDriver: Send + Sync {
    /// Human-readable driver name
    fn name(&self) -> &'static str;

    /// Backend this driver implements
    fn backend(&self) -> Backend;

    /// Device/backend limits, known before any timed body runs
    fn capabilities(&self) -> Capabilities;

    /// Create a driver context
    ///
    /// # Errors
    ///
    /// Returns `DriverError` on any non-success status code; the same applies
    /// to every other method of this trait.
    fn create_context(&self) -> DriverResult<ContextHandle>;
    /// Destroy a context
    fn destroy_context(&self, ctx: ContextHandle) -> DriverResult<()>;

    /// Allocate memory
    fn alloc(
        &self,
        ctx: ContextHandle,
        placement: MemoryPlacement,
        bytes: usize,
    ) -> DriverResult<MemoryHandle>;
    /// Free an allocation
    fn free(&self, ctx: ContextHandle, mem: MemoryHandle) -> DriverResult<()>;
    /// Read an allocation back to the host, for correctness checks outside
    /// the timed window
    fn read_memory(&self, ctx: ContextHandle, mem: MemoryHandle, out: &mut [u8])
        -> DriverResult<()>;

    /// Create a command list
    fn create_command_list(&self, ctx: ContextHandle) -> DriverResult<CommandListHandle>;
    /// Reset a command list to empty, reusable state
    fn reset_command_list(&self, list: CommandListHandle) -> DriverResult<()>;
    /// Close a command list for submission
    fn close_command_list(&self, list: CommandListHandle) -> DriverResult<()>;
    /// Destroy a command list
    fn destroy_command_list(&self, list: CommandListHandle) -> DriverResult<()>;
    /// Append a kernel launch, optionally signaling an event on completion
    fn append_launch_kernel(
        &self,
        list: CommandListHandle,
        kernel: KernelHandle,
        workgroup_count: u32,
        signal: Option<EventHandle>,
    ) -> DriverResult<()>;
    /// Append a byte-pattern fill of an allocation
    fn append_memory_fill(
        &self,
        list: CommandListHandle,
        mem: MemoryHandle,
        pattern: u8,
    ) -> DriverResult<()>;

    /// Create an unsignaled event
    fn create_event(&self, ctx: ContextHandle) -> DriverResult<EventHandle>;
    /// Signal an event from the host
    fn signal_event(&self, event: EventHandle) -> DriverResult<()>;
    /// Query an event without blocking
    fn query_event(&self, event: EventHandle) -> DriverResult<bool>;
    /// Return an event to the unsignaled state
    fn reset_event(&self, event: EventHandle) -> DriverResult<()>;
    /// Destroy an event
    fn destroy_event(&self, event: EventHandle) -> DriverResult<()>;
    /// Block until an event is signaled
    fn host_synchronize(&self, event: EventHandle) -> DriverResult<()>;
    /// Kernel start/end device timestamps recorded on an event, in ticks
    fn event_timestamps(&self, event: EventHandle) -> DriverResult<(u64, u64)>;

    /// Create a module from a precompiled binary blob
    fn create_module(&self, ctx: ContextHandle, blob: &[u8]) -> DriverResult<ModuleHandle>;
    /// Destroy a module
    fn destroy_module(&self, module: ModuleHandle) -> DriverResult<()>;
    /// Create a kernel from a module entry point
    fn create_kernel(&self, module: ModuleHandle, entry: &str) -> DriverResult<KernelHandle>;
    /// Destroy a kernel
    fn destroy_kernel(&self, kernel: KernelHandle) -> DriverResult<()>;
    /// Set one kernel argument by index
    fn set_kernel_arg(&self, kernel: KernelHandle, index: u32, data: &[u8]) -> DriverResult<()>;

    /// Submit a closed command list, optionally signaling an event when the
    /// device finishes
    fn submit(
        &self,
        ctx: ContextHandle,
        list: CommandListHandle,
        signal: Option<EventHandle>,
    ) -> DriverResult<()>;

    /// Reserve a virtual address range
    fn virtual_reserve(&self, ctx: ContextHandle, bytes: usize) -> DriverResult<VirtualHandle>;
    /// Free a reserved range
    fn virtual_free(&self, ctx: ContextHandle, virt: VirtualHandle) -> DriverResult<()>;
    /// Create physical memory backing
    fn physical_create(&self, ctx: ContextHandle, bytes: usize) -> DriverResult<PhysicalHandle>;
    /// Destroy physical memory backing
    fn physical_destroy(&self, ctx: ContextHandle, phys: PhysicalHandle) -> DriverResult<()>;
    /// Map physical backing into a reserved range
    fn map_virtual(
        &self,
        ctx: ContextHandle,
        virt: VirtualHandle,
        phys: PhysicalHandle,
    ) -> DriverResult<()>;
    /// Unmap a reserved range
    fn unmap_virtual(&self, ctx: ContextHandle, virt: VirtualHandle) -> DriverResult<()>;
}

/// Driver for the requested backend
///
/// Vendor FFI bindings are out of scope; the in-process mock stands in
/// behind the trait seam with the backend's capability profile. Real
/// bindings implement [`ComputeDriver`] without touching the harness.
#[must_use]
pub fn for_backend(backend: Backend) -> Box<dyn ComputeDriver> {
    Box::new(MockDriver::new(backend))
}
