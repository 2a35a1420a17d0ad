//! In-process driver stand-in
//!
//! Keeps full handle bookkeeping (stale handles fail with a typed error),
//! simulates kernel/fill side effects so correctness checks have something
//! to read back, and advances a monotonic device tick counter for GPU
//! timestamp measurement. Capability profiles differ per backend so the
//! not-capable paths are exercised without hardware.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{
    Capabilities, CommandListHandle, ComputeDriver, ContextHandle, DriverError, DriverResult,
    EventHandle, KernelHandle, MemoryHandle, MemoryPlacement, ModuleHandle, PhysicalHandle,
    VirtualHandle,
};
use crate::registry::Backend;

const STATUS_INVALID_HANDLE: i32 = -1;
const STATUS_INVALID_ARGUMENT: i32 = -2;
const STATUS_NOT_READY: i32 = -3;

/// Device ticks consumed per workgroup of the simulated kernel
const TICKS_PER_WORKGROUP: u64 = 10;

#[derive(Debug)]
struct MemoryState {
    #[allow(dead_code)]
    placement: MemoryPlacement,
    data: Vec<u8>,
}

#[derive(Debug, Clone)]
enum Command {
    LaunchKernel {
        kernel: u64,
        workgroup_count: u32,
        signal: Option<u64>,
    },
    MemoryFill {
        mem: u64,
        pattern: u8,
    },
}

#[derive(Debug, Default)]
struct ListState {
    closed: bool,
    commands: Vec<Command>,
}

#[derive(Debug, Default)]
struct EventState {
    signaled: bool,
    timestamps: Option<(u64, u64)>,
}

#[derive(Debug, Default)]
struct KernelState {
    args: HashMap<u32, Vec<u8>>,
}

#[derive(Debug)]
struct VirtualState {
    bytes: usize,
    mapped: Option<u64>,
}

#[derive(Debug, Default)]
struct MockState {
    next_handle: u64,
    clock: u64,
    contexts: HashMap<u64, ()>,
    memory: HashMap<u64, MemoryState>,
    lists: HashMap<u64, ListState>,
    events: HashMap<u64, EventState>,
    modules: HashMap<u64, usize>,
    kernels: HashMap<u64, KernelState>,
    virtuals: HashMap<u64, VirtualState>,
    physicals: HashMap<u64, usize>,
}

impl MockState {
    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn execute(&mut self, list: u64, call: &'static str) -> DriverResult<()> {
        let commands = {
            let state = self
                .lists
                .get(&list)
                .ok_or(DriverError::new(call, STATUS_INVALID_HANDLE))?;
            if !state.closed {
                return Err(DriverError::new(call, STATUS_NOT_READY));
            }
            state.commands.clone()
        };

        for command in commands {
            match command {
                Command::LaunchKernel {
                    kernel,
                    workgroup_count,
                    signal,
                } => {
                    if !self.kernels.contains_key(&kernel) {
                        return Err(DriverError::new(call, STATUS_INVALID_HANDLE));
                    }
                    let start = self.clock;
                    self.clock += u64::from(workgroup_count.max(1)) * TICKS_PER_WORKGROUP;
                    if let Some(event) = signal {
                        let state = self
                            .events
                            .get_mut(&event)
                            .ok_or(DriverError::new(call, STATUS_INVALID_HANDLE))?;
                        state.signaled = true;
                        state.timestamps = Some((start, self.clock));
                    }
                },
                Command::MemoryFill { mem, pattern } => {
                    let state = self
                        .memory
                        .get_mut(&mem)
                        .ok_or(DriverError::new(call, STATUS_INVALID_HANDLE))?;
                    state.data.fill(pattern);
                    self.clock += 1;
                },
            }
        }
        Ok(())
    }
}

/// In-process [`ComputeDriver`] implementation
pub struct MockDriver {
    backend: Backend,
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a mock driver with the capability profile of `backend`
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            state: Mutex::new(MockState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned lock means a panic mid-call in this same process; the
        // bookkeeping is still consistent enough for teardown.
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of currently live handles of any kind (test observability)
    #[must_use]
    pub fn live_handles(&self) -> usize {
        let s = self.lock();
        s.contexts.len()
            + s.memory.len()
            + s.lists.len()
            + s.events.len()
            + s.modules.len()
            + s.kernels.len()
            + s.virtuals.len()
            + s.physicals.len()
    }
}

impl ComputeDriver for MockDriver {
    fn name(&self) -> &'static str {
        match self.backend {
            Backend::Level0 => "mock-l0",
            Backend::OpenCl => "mock-ocl",
        }
    }

    fn backend(&self) -> Backend {
        self.backend
    }

    fn capabilities(&self) -> Capabilities {
        match self.backend {
            Backend::Level0 => Capabilities {
                gpu_timestamps: true,
                virtual_memory: true,
                max_kernel_arg_size: 2048,
                timer_resolution_ns: 10.0,
            },
            Backend::OpenCl => Capabilities {
                gpu_timestamps: false,
                virtual_memory: false,
                max_kernel_arg_size: 1024,
                timer_resolution_ns: 0.0,
            },
        }
    }

    fn create_context(&self) -> DriverResult<ContextHandle> {
        let mut s = self.lock();
        let h = s.issue();
        s.contexts.insert(h, ());
        Ok(ContextHandle(h))
    }

    fn destroy_context(&self, ctx: ContextHandle) -> DriverResult<()> {
        self.lock()
            .contexts
            .remove(&ctx.0)
            .map(|()| ())
            .ok_or(DriverError::new("destroy_context", STATUS_INVALID_HANDLE))
    }

    fn alloc(
        &self,
        ctx: ContextHandle,
        placement: MemoryPlacement,
        bytes: usize,
    ) -> DriverResult<MemoryHandle> {
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("alloc", STATUS_INVALID_HANDLE));
        }
        if bytes == 0 {
            return Err(DriverError::new("alloc", STATUS_INVALID_ARGUMENT));
        }
        let h = s.issue();
        s.memory.insert(
            h,
            MemoryState {
                placement,
                data: vec![0; bytes],
            },
        );
        Ok(MemoryHandle(h))
    }

    fn free(&self, _ctx: ContextHandle, mem: MemoryHandle) -> DriverResult<()> {
        self.lock()
            .memory
            .remove(&mem.0)
            .map(|_| ())
            .ok_or(DriverError::new("free", STATUS_INVALID_HANDLE))
    }

    fn read_memory(
        &self,
        _ctx: ContextHandle,
        mem: MemoryHandle,
        out: &mut [u8],
    ) -> DriverResult<()> {
        let s = self.lock();
        let state = s
            .memory
            .get(&mem.0)
            .ok_or(DriverError::new("read_memory", STATUS_INVALID_HANDLE))?;
        if out.len() > state.data.len() {
            return Err(DriverError::new("read_memory", STATUS_INVALID_ARGUMENT));
        }
        out.copy_from_slice(&state.data[..out.len()]);
        Ok(())
    }

    fn create_command_list(&self, ctx: ContextHandle) -> DriverResult<CommandListHandle> {
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("create_command_list", STATUS_INVALID_HANDLE));
        }
        let h = s.issue();
        s.lists.insert(h, ListState::default());
        Ok(CommandListHandle(h))
    }

    fn reset_command_list(&self, list: CommandListHandle) -> DriverResult<()> {
        let mut s = self.lock();
        let state = s
            .lists
            .get_mut(&list.0)
            .ok_or(DriverError::new("reset_command_list", STATUS_INVALID_HANDLE))?;
        state.closed = false;
        state.commands.clear();
        Ok(())
    }

    fn close_command_list(&self, list: CommandListHandle) -> DriverResult<()> {
        let mut s = self.lock();
        let state = s
            .lists
            .get_mut(&list.0)
            .ok_or(DriverError::new("close_command_list", STATUS_INVALID_HANDLE))?;
        state.closed = true;
        Ok(())
    }

    fn destroy_command_list(&self, list: CommandListHandle) -> DriverResult<()> {
        self.lock()
            .lists
            .remove(&list.0)
            .map(|_| ())
            .ok_or(DriverError::new(
                "destroy_command_list",
                STATUS_INVALID_HANDLE,
            ))
    }

    fn append_launch_kernel(
        &self,
        list: CommandListHandle,
        kernel: KernelHandle,
        workgroup_count: u32,
        signal: Option<EventHandle>,
    ) -> DriverResult<()> {
        let mut s = self.lock();
        if !s.kernels.contains_key(&kernel.0) {
            return Err(DriverError::new("append_launch_kernel", STATUS_INVALID_HANDLE));
        }
        let state = s
            .lists
            .get_mut(&list.0)
            .ok_or(DriverError::new("append_launch_kernel", STATUS_INVALID_HANDLE))?;
        if state.closed {
            return Err(DriverError::new("append_launch_kernel", STATUS_NOT_READY));
        }
        state.commands.push(Command::LaunchKernel {
            kernel: kernel.0,
            workgroup_count,
            signal: signal.map(|e| e.0),
        });
        Ok(())
    }

    fn append_memory_fill(
        &self,
        list: CommandListHandle,
        mem: MemoryHandle,
        pattern: u8,
    ) -> DriverResult<()> {
        let mut s = self.lock();
        if !s.memory.contains_key(&mem.0) {
            return Err(DriverError::new("append_memory_fill", STATUS_INVALID_HANDLE));
        }
        let state = s
            .lists
            .get_mut(&list.0)
            .ok_or(DriverError::new("append_memory_fill", STATUS_INVALID_HANDLE))?;
        if state.closed {
            return Err(DriverError::new("append_memory_fill", STATUS_NOT_READY));
        }
        state.commands.push(Command::MemoryFill {
            mem: mem.0,
            pattern,
        });
        Ok(())
    }

    fn create_event(&self, ctx: ContextHandle) -> DriverResult<EventHandle> {
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("create_event", STATUS_INVALID_HANDLE));
        }
        let h = s.issue();
        s.events.insert(h, EventState::default());
        Ok(EventHandle(h))
    }

    fn signal_event(&self, event: EventHandle) -> DriverResult<()> {
        let mut s = self.lock();
        let state = s
            .events
            .get_mut(&event.0)
            .ok_or(DriverError::new("signal_event", STATUS_INVALID_HANDLE))?;
        state.signaled = true;
        Ok(())
    }

    fn query_event(&self, event: EventHandle) -> DriverResult<bool> {
        let s = self.lock();
        s.events
            .get(&event.0)
            .map(|e| e.signaled)
            .ok_or(DriverError::new("query_event", STATUS_INVALID_HANDLE))
    }

    fn reset_event(&self, event: EventHandle) -> DriverResult<()> {
        let mut s = self.lock();
        let state = s
            .events
            .get_mut(&event.0)
            .ok_or(DriverError::new("reset_event", STATUS_INVALID_HANDLE))?;
        state.signaled = false;
        state.timestamps = None;
        Ok(())
    }

    fn destroy_event(&self, event: EventHandle) -> DriverResult<()> {
        self.lock()
            .events
            .remove(&event.0)
            .map(|_| ())
            .ok_or(DriverError::new("destroy_event", STATUS_INVALID_HANDLE))
    }

    fn host_synchronize(&self, event: EventHandle) -> DriverResult<()> {
        // Submission is synchronous in the mock, so a wait either observes a
        // signaled event or reports it unsignaled.
        let s = self.lock();
        let state = s
            .events
            .get(&event.0)
            .ok_or(DriverError::new("host_synchronize", STATUS_INVALID_HANDLE))?;
        if state.signaled {
            Ok(())
        } else {
            Err(DriverError::new("host_synchronize", STATUS_NOT_READY))
        }
    }

    fn event_timestamps(&self, event: EventHandle) -> DriverResult<(u64, u64)> {
        let s = self.lock();
        s.events
            .get(&event.0)
            .ok_or(DriverError::new("event_timestamps", STATUS_INVALID_HANDLE))?
            .timestamps
            .ok_or(DriverError::new("event_timestamps", STATUS_NOT_READY))
    }

    fn create_module(&self, ctx: ContextHandle, blob: &[u8]) -> DriverResult<ModuleHandle> {
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("create_module", STATUS_INVALID_HANDLE));
        }
        if blob.is_empty() {
            return Err(DriverError::new("create_module", STATUS_INVALID_ARGUMENT));
        }
        let h = s.issue();
        s.modules.insert(h, blob.len());
        Ok(ModuleHandle(h))
    }

    fn destroy_module(&self, module: ModuleHandle) -> DriverResult<()> {
        self.lock()
            .modules
            .remove(&module.0)
            .map(|_| ())
            .ok_or(DriverError::new("destroy_module", STATUS_INVALID_HANDLE))
    }

    fn create_kernel(&self, module: ModuleHandle, entry: &str) -> DriverResult<KernelHandle> {
        let mut s = self.lock();
        if !s.modules.contains_key(&module.0) {
            return Err(DriverError::new("create_kernel", STATUS_INVALID_HANDLE));
        }
        if entry.is_empty() {
            return Err(DriverError::new("create_kernel", STATUS_INVALID_ARGUMENT));
        }
        let h = s.issue();
        s.kernels.insert(h, KernelState::default());
        Ok(KernelHandle(h))
    }

    fn destroy_kernel(&self, kernel: KernelHandle) -> DriverResult<()> {
        self.lock()
            .kernels
            .remove(&kernel.0)
            .map(|_| ())
            .ok_or(DriverError::new("destroy_kernel", STATUS_INVALID_HANDLE))
    }

    fn set_kernel_arg(&self, kernel: KernelHandle, index: u32, data: &[u8]) -> DriverResult<()> {
        if data.len() > self.capabilities().max_kernel_arg_size {
            return Err(DriverError::new("set_kernel_arg", STATUS_INVALID_ARGUMENT));
        }
        let mut s = self.lock();
        let state = s
            .kernels
            .get_mut(&kernel.0)
            .ok_or(DriverError::new("set_kernel_arg", STATUS_INVALID_HANDLE))?;
        state.args.insert(index, data.to_vec());
        Ok(())
    }

    fn submit(
        &self,
        ctx: ContextHandle,
        list: CommandListHandle,
        signal: Option<EventHandle>,
    ) -> DriverResult<()> {
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("submit", STATUS_INVALID_HANDLE));
        }
        s.execute(list.0, "submit")?;
        if let Some(event) = signal {
            let state = s
                .events
                .get_mut(&event.0)
                .ok_or(DriverError::new("submit", STATUS_INVALID_HANDLE))?;
            state.signaled = true;
        }
        Ok(())
    }

    fn virtual_reserve(&self, ctx: ContextHandle, bytes: usize) -> DriverResult<VirtualHandle> {
        if !self.capabilities().virtual_memory {
            return Err(DriverError::new("virtual_reserve", STATUS_INVALID_ARGUMENT));
        }
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("virtual_reserve", STATUS_INVALID_HANDLE));
        }
        if bytes == 0 {
            return Err(DriverError::new("virtual_reserve", STATUS_INVALID_ARGUMENT));
        }
        let h = s.issue();
        s.virtuals.insert(
            h,
            VirtualState {
                bytes,
                mapped: None,
            },
        );
        Ok(VirtualHandle(h))
    }

    fn virtual_free(&self, _ctx: ContextHandle, virt: VirtualHandle) -> DriverResult<()> {
        self.lock()
            .virtuals
            .remove(&virt.0)
            .map(|_| ())
            .ok_or(DriverError::new("virtual_free", STATUS_INVALID_HANDLE))
    }

    fn physical_create(&self, ctx: ContextHandle, bytes: usize) -> DriverResult<PhysicalHandle> {
        if !self.capabilities().virtual_memory {
            return Err(DriverError::new("physical_create", STATUS_INVALID_ARGUMENT));
        }
        let mut s = self.lock();
        if !s.contexts.contains_key(&ctx.0) {
            return Err(DriverError::new("physical_create", STATUS_INVALID_HANDLE));
        }
        if bytes == 0 {
            return Err(DriverError::new("physical_create", STATUS_INVALID_ARGUMENT));
        }
        let h = s.issue();
        s.physicals.insert(h, bytes);
        Ok(PhysicalHandle(h))
    }

    fn physical_destroy(&self, _ctx: ContextHandle, phys: PhysicalHandle) -> DriverResult<()> {
        self.lock()
            .physicals
            .remove(&phys.0)
            .map(|_| ())
            .ok_or(DriverError::new("physical_destroy", STATUS_INVALID_HANDLE))
    }

    fn map_virtual(
        &self,
        _ctx: ContextHandle,
        virt: VirtualHandle,
        phys: PhysicalHandle,
    ) -> DriverResult<()> {
        let mut s = self.lock();
        let backing = *s
            .physicals
            .get(&phys.0)
            .ok_or(DriverError::new("map_virtual", STATUS_INVALID_HANDLE))?;
        let state = s
            .virtuals
            .get_mut(&virt.0)
            .ok_or(DriverError::new("map_virtual", STATUS_INVALID_HANDLE))?;
        if backing > state.bytes {
            return Err(DriverError::new("map_virtual", STATUS_INVALID_ARGUMENT));
        }
        state.mapped = Some(phys.0);
        Ok(())
    }

    fn unmap_virtual(&self, _ctx: ContextHandle, virt: VirtualHandle) -> DriverResult<()> {
        let mut s = self.lock();
        let state = s
            .virtuals
            .get_mut(&virt.0)
            .ok_or(DriverError::new("unmap_virtual", STATUS_INVALID_HANDLE))?;
        if state.mapped.take().is_none() {
            return Err(DriverError::new("unmap_virtual", STATUS_NOT_READY));
        }
        Ok(())
    }
}
