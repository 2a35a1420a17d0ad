//! Scoped ownership wrappers around driver handles
//!
//! Every handle a benchmark acquires is wrapped in a guard immediately after
//! the successful create call, so release happens on every exit path —
//! including early `?` returns — in reverse declaration order. Guard drops
//! ignore destroy errors; there is nothing actionable on that path.

use super::{
    CommandListHandle, ComputeDriver, ContextHandle, DriverResult, EventHandle, KernelHandle,
    MemoryHandle, MemoryPlacement, ModuleHandle, PhysicalHandle, VirtualHandle,
};

/// Owned driver context, destroyed on drop
pub struct ScopedContext<'d> {
    driver: &'d dyn ComputeDriver,
    handle: ContextHandle,
}

impl<'d> ScopedContext<'d> {
    /// Create a context and take ownership of it
    ///
    /// # Errors
    ///
    /// Propagates the driver's create failure.
    pub fn new(driver: &'d dyn ComputeDriver) -> DriverResult<Self> {
        let handle = driver.create_context()?;
        Ok(Self { driver, handle })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> ContextHandle {
        self.handle
    }
}

impl Drop for ScopedContext<'_> {
    fn drop(&mut self) {
        let _ = self.driver.destroy_context(self.handle);
    }
}

/// Owned allocation, freed on drop
pub struct ScopedMemory<'d> {
    driver: &'d dyn ComputeDriver,
    ctx: ContextHandle,
    handle: MemoryHandle,
}

impl<'d> ScopedMemory<'d> {
    /// Allocate and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's allocation failure.
    pub fn new(
        driver: &'d dyn ComputeDriver,
        ctx: ContextHandle,
        placement: MemoryPlacement,
        bytes: usize,
    ) -> DriverResult<Self> {
        let handle = driver.alloc(ctx, placement, bytes)?;
        Ok(Self {
            driver,
            ctx,
            handle,
        })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> MemoryHandle {
        self.handle
    }
}

impl Drop for ScopedMemory<'_> {
    fn drop(&mut self) {
        let _ = self.driver.free(self.ctx, self.handle);
    }
}

/// Owned command list, destroyed on drop
pub struct ScopedCommandList<'d> {
    driver: &'d dyn ComputeDriver,
    handle: CommandListHandle,
}

impl<'d> ScopedCommandList<'d> {
    /// Create a command list and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's create failure.
    pub fn new(driver: &'d dyn ComputeDriver, ctx: ContextHandle) -> DriverResult<Self> {
        let handle = driver.create_command_list(ctx)?;
        Ok(Self { driver, handle })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> CommandListHandle {
        self.handle
    }
}

impl Drop for ScopedCommandList<'_> {
    fn drop(&mut self) {
        let _ = self.driver.destroy_command_list(self.handle);
    }
}

/// Owned event, destroyed on drop
pub struct ScopedEvent<'d> {
    driver: &'d dyn ComputeDriver,
    handle: EventHandle,
}

impl<'d> ScopedEvent<'d> {
    /// Create an unsignaled event and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's create failure.
    pub fn new(driver: &'d dyn ComputeDriver, ctx: ContextHandle) -> DriverResult<Self> {
        let handle = driver.create_event(ctx)?;
        Ok(Self { driver, handle })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> EventHandle {
        self.handle
    }
}

impl Drop for ScopedEvent<'_> {
    fn drop(&mut self) {
        let _ = self.driver.destroy_event(self.handle);
    }
}

/// Owned module, destroyed on drop
pub struct ScopedModule<'d> {
    driver: &'d dyn ComputeDriver,
    handle: ModuleHandle,
}

impl<'d> ScopedModule<'d> {
    /// Create a module from a blob and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's create failure.
    pub fn new(
        driver: &'d dyn ComputeDriver,
        ctx: ContextHandle,
        blob: &[u8],
    ) -> DriverResult<Self> {
        let handle = driver.create_module(ctx, blob)?;
        Ok(Self { driver, handle })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> ModuleHandle {
        self.handle
    }
}

impl Drop for ScopedModule<'_> {
    fn drop(&mut self) {
        let _ = self.driver.destroy_module(self.handle);
    }
}

/// Owned kernel, destroyed on drop
pub struct ScopedKernel<'d> {
    driver: &'d dyn ComputeDriver,
    handle: KernelHandle,
}

impl<'d> ScopedKernel<'d> {
    /// Create a kernel from a module entry point and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's create failure.
    pub fn new(
        driver: &'d dyn ComputeDriver,
        module: ModuleHandle,
        entry: &str,
    ) -> DriverResult<Self> {
        let handle = driver.create_kernel(module, entry)?;
        Ok(Self { driver, handle })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> KernelHandle {
        self.handle
    }
}

impl Drop for ScopedKernel<'_> {
    fn drop(&mut self) {
        let _ = self.driver.destroy_kernel(self.handle);
    }
}

/// Owned reserved virtual range, freed on drop
pub struct ScopedVirtual<'d> {
    driver: &'d dyn ComputeDriver,
    ctx: ContextHandle,
    handle: VirtualHandle,
}

impl<'d> ScopedVirtual<'d> {
    /// Reserve a range and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's reserve failure.
    pub fn new(
        driver: &'d dyn ComputeDriver,
        ctx: ContextHandle,
        bytes: usize,
    ) -> DriverResult<Self> {
        let handle = driver.virtual_reserve(ctx, bytes)?;
        Ok(Self {
            driver,
            ctx,
            handle,
        })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> VirtualHandle {
        self.handle
    }
}

impl Drop for ScopedVirtual<'_> {
    fn drop(&mut self) {
        let _ = self.driver.virtual_free(self.ctx, self.handle);
    }
}

/// Owned physical backing, destroyed on drop
pub struct ScopedPhysical<'d> {
    driver: &'d dyn ComputeDriver,
    ctx: ContextHandle,
    handle: PhysicalHandle,
}

impl<'d> ScopedPhysical<'d> {
    /// Create physical backing and take ownership
    ///
    /// # Errors
    ///
    /// Propagates the driver's create failure.
    pub fn new(
        driver: &'d dyn ComputeDriver,
        ctx: ContextHandle,
        bytes: usize,
    ) -> DriverResult<Self> {
        let handle = driver.physical_create(ctx, bytes)?;
        Ok(Self {
            driver,
            ctx,
            handle,
        })
    }

    /// The wrapped handle
    #[must_use]
    pub fn handle(&self) -> PhysicalHandle {
        self.handle
    }
}

impl Drop for ScopedPhysical<'_> {
    fn drop(&mut self) {
        let _ = self.driver.physical_destroy(self.ctx, self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::super::{for_backend, MockDriver};
    use super::*;
    use crate::registry::Backend;

    #[test]
    fn test_context_released_on_drop() {
        let driver = MockDriver::new(Backend::Level0);
        {
            let ctx = ScopedContext::new(&driver).unwrap();
            assert_eq!(driver.live_handles(), 1);
            let _mem =
                ScopedMemory::new(&driver, ctx.handle(), MemoryPlacement::Device, 64).unwrap();
            assert_eq!(driver.live_handles(), 2);
        }
        assert_eq!(driver.live_handles(), 0);
    }

    #[test]
    fn test_release_on_early_error_path() {
        let driver = MockDriver::new(Backend::Level0);

        let attempt = || -> DriverResult<()> {
            let ctx = ScopedContext::new(&driver)?;
            let _list = ScopedCommandList::new(&driver, ctx.handle())?;
            // Empty blob is rejected by the driver; the guards above must
            // still release.
            let _module = ScopedModule::new(&driver, ctx.handle(), &[])?;
            Ok(())
        };
        assert!(attempt().is_err());
        assert_eq!(driver.live_handles(), 0);
    }

    #[test]
    fn test_boxed_driver_works_behind_guards() {
        let driver = for_backend(Backend::OpenCl);
        let ctx = ScopedContext::new(driver.as_ref()).unwrap();
        let event = ScopedEvent::new(driver.as_ref(), ctx.handle()).unwrap();
        driver.signal_event(event.handle()).unwrap();
        assert!(driver.query_event(event.handle()).unwrap());
    }
}
