//! Compute kernels.
//!
//! A kernel is a list of phases separated by barriers. Each phase is a
//! closure run once per work-item; a barrier guarantees that every
//! work-item of a group has finished the previous phase before any of them
//! starts the next one.
//!
//! ```no_run
//! use std::sync::Arc;
//! use workgrid::prelude::*;
//!
//! struct Args<'a> {
//!     data: GlobalPtr<'a, u32>,
//! }
//!
//! # fn main() -> workgrid::Result<()> {
//! let mut platform = Platform::new();
//! platform.initialize(&PlatformOptions::new(Arc::new(SystemMemoryResource::new())))?;
//! let device = platform.make_device(0, &DeviceOptions::new())?;
//!
//! let mut buffer = make_storage_buffer::<u32>(&device, BufferUsage::DeviceOnly)?;
//! buffer.set_size(256)?;
//!
//! let kernel = make_kernel::<1, Args>(&device)?
//!     .phase(|item, args, _, _| {
//!         let i = item.get_global_id(0);
//!         if i < args.data.len() {
//!             args.data.write(i, i as u32 * 2);
//!         }
//!     })
//!     .build()?;
//! kernel.run(&Args { data: buffer.global() }, [256], 0)?;
//! device.wait_for_completion();
//! # Ok(())
//! # }
//! ```

use crate::cl::address_space::LocalPtr;
use crate::cl::synchronization::FENCE_MASK;
use crate::cl::work_item::WorkItem;
use crate::device::{CpuDevice, Device};
use crate::error::{Error, Result};
use crate::memory::MemoryResource;
use crate::scheduler::dispatch::dispatch_scope;
use crate::scheduler::group::GroupRunner;
use crate::scheduler::{BatchPlan, WorkGroupGrid};
use crate::sub_platform::IdData;
use bytemuck::Pod;
use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::Instant;

/// Alignment of a work-group's local memory region.
pub const LOCAL_MEMORY_ALIGN: usize = 32;

/// One phase of a kernel: the code between two barriers.
pub(crate) type Phase<A, P> = Box<dyn Fn(&WorkItem, &A, &LocalMemory, &mut P) + Send + Sync>;

#[cfg(test)]
pub(crate) fn boxed_phase<A, P, F>(f: F) -> Phase<A, P>
where
    F: Fn(&WorkItem, &A, &LocalMemory, &mut P) + Send + Sync + 'static,
{
    Box::new(f)
}

/// Handle to a `__local` array declared with [`KernelBuilder::local`].
pub struct LocalVar<T> {
    offset: usize,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LocalVar<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LocalVar<T> {}

impl<T> fmt::Debug for LocalVar<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalVar")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

impl<T> LocalVar<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Zero-initialized memory shared by the work-items of one work-group.
pub struct LocalMemory {
    ptr: NonNull<u8>,
    size: usize,
    resource: Arc<dyn MemoryResource>,
}

impl LocalMemory {
    pub(crate) fn new(resource: Arc<dyn MemoryResource>, size: usize) -> Result<Self> {
        let ptr = if size == 0 {
            // SAFETY: non-zero constant.
            unsafe { NonNull::new_unchecked(LOCAL_MEMORY_ALIGN as *mut u8) }
        } else {
            let layout = Self::layout(size)?;
            NonNull::new(resource.allocate_zeroed(layout)).ok_or(Error::Allocation {
                size,
                align: LOCAL_MEMORY_ALIGN,
            })?
        };
        Ok(Self {
            ptr,
            size,
            resource,
        })
    }

    fn layout(size: usize) -> Result<Layout> {
        Layout::from_size_align(size, LOCAL_MEMORY_ALIGN).map_err(|_| Error::Allocation {
            size,
            align: LOCAL_MEMORY_ALIGN,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Kernel view of a local variable.
    ///
    /// # Panics
    ///
    /// If `var` does not fit this region, i.e. it was declared on another
    /// kernel.
    pub fn get<T: Pod>(&self, var: LocalVar<T>) -> LocalPtr<'_, T> {
        if var.len == 0 {
            return LocalPtr::dangling();
        }
        let end = var.offset + var.len * std::mem::size_of::<T>();
        assert!(
            end <= self.size,
            "local variable [{}, {}) outside the {}-byte local memory",
            var.offset,
            end,
            self.size
        );
        // SAFETY: in bounds, offset aligned for T by the builder, and the
        // region is only accessed through atomic views.
        unsafe {
            let ptr = NonNull::new_unchecked(self.ptr.as_ptr().add(var.offset)).cast::<T>();
            LocalPtr::from_raw_parts(ptr, var.len)
        }
    }

    pub(crate) fn clear(&mut self) {
        if self.size > 0 {
            // SAFETY: the region is `size` bytes and exclusively borrowed.
            unsafe { std::ptr::write_bytes(self.ptr.as_ptr(), 0, self.size) };
        }
    }
}

impl fmt::Debug for LocalMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMemory")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}

impl Drop for LocalMemory {
    fn drop(&mut self) {
        if self.size > 0 {
            if let Ok(layout) = Self::layout(self.size) {
                self.resource.deallocate(self.ptr.as_ptr(), layout);
            }
        }
    }
}

/// Start building a `D`-dimensional kernel taking arguments of type `A`.
pub fn make_kernel<const D: usize, A>(device: &Device) -> Result<KernelBuilder<D, A, ()>> {
    if !(1..=3).contains(&D) {
        return Err(Error::config(format!(
            "kernel dimension must be 1, 2 or 3, got {}",
            D
        )));
    }
    let device = device
        .as_cpu()
        .ok_or_else(|| Error::unsupported("kernels on the vulkan sub-platform"))?
        .clone();

    Ok(KernelBuilder {
        device,
        name: None,
        phases: Vec::new(),
        barriers: Vec::new(),
        pending_barrier: None,
        local_size: 0,
        error: None,
    })
}

pub struct KernelBuilder<const D: usize, A, P> {
    device: CpuDevice,
    name: Option<String>,
    phases: Vec<Phase<A, P>>,
    barriers: Vec<u32>,
    pending_barrier: Option<u32>,
    local_size: usize,
    error: Option<Error>,
}

impl<const D: usize, A> KernelBuilder<D, A, ()> {
    /// Give every work-item a private value of type `Q`, reset to
    /// `Q::default()` at the start of each work-group and kept across
    /// barriers. Must come before the first phase.
    pub fn with_private<Q>(mut self) -> KernelBuilder<D, A, Q> {
        if !self.phases.is_empty() {
            self.error
                .get_or_insert(Error::config("with_private after the first phase"));
        }
        KernelBuilder {
            device: self.device,
            name: self.name,
            phases: Vec::new(),
            barriers: self.barriers,
            pending_barrier: self.pending_barrier,
            local_size: self.local_size,
            error: self.error,
        }
    }
}

impl<const D: usize, A, P> KernelBuilder<D, A, P> {
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Reserve `len` elements of work-group local memory.
    pub fn local<T: Pod>(&mut self, len: usize) -> LocalVar<T> {
        let align = std::mem::align_of::<T>();
        if align > LOCAL_MEMORY_ALIGN {
            self.error.get_or_insert(Error::unsupported(format!(
                "local variable alignment {} exceeds {}",
                align, LOCAL_MEMORY_ALIGN
            )));
        }
        let offset = self.local_size.next_multiple_of(align);
        self.local_size = offset + len * std::mem::size_of::<T>();
        LocalVar {
            offset,
            len,
            _marker: PhantomData,
        }
    }

    pub fn phase<F>(mut self, f: F) -> Self
    where
        F: Fn(&WorkItem, &A, &LocalMemory, &mut P) + Send + Sync + 'static,
    {
        if let Some(flags) = self.pending_barrier.take() {
            self.barriers.push(flags);
        }
        self.phases.push(Box::new(f));
        self
    }

    /// Synchronize the work-group. Consecutive barriers merge their flags.
    pub fn barrier(mut self, flags: u32) -> Self {
        if flags & !FENCE_MASK != 0 {
            self.error
                .get_or_insert(Error::config(format!("unknown fence flags {:#x}", flags)));
        }
        if self.phases.is_empty() {
            self.error
                .get_or_insert(Error::config("barrier before the first phase"));
        }
        *self.pending_barrier.get_or_insert(0) |= flags;
        self
    }

    pub fn build(self) -> Result<Kernel<D, A, P>> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.phases.is_empty() {
            return Err(Error::config("kernel has no phase"));
        }
        if self.pending_barrier.is_some() {
            return Err(Error::config("kernel ends with a barrier"));
        }

        let id = self.device.issue_id(self.name);
        tracing::debug!(
            kernel = id.id,
            dim = D,
            phases = self.phases.len(),
            local_bytes = self.local_size,
            "kernel built"
        );

        Ok(Kernel {
            device: self.device,
            id,
            phases: self.phases,
            barriers: self.barriers,
            local_size: self.local_size,
        })
    }
}

impl<const D: usize, A, P> fmt::Debug for KernelBuilder<D, A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelBuilder")
            .field("dim", &D)
            .field("name", &self.name)
            .field("phases", &self.phases.len())
            .field("barriers", &self.barriers)
            .field("local_size", &self.local_size)
            .finish()
    }
}

/// A built kernel bound to one CPU device.
pub struct Kernel<const D: usize, A, P = ()> {
    device: CpuDevice,
    id: IdData,
    phases: Vec<Phase<A, P>>,
    barriers: Vec<u32>,
    local_size: usize,
}

impl<const D: usize, A, P> fmt::Debug for Kernel<D, A, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("id", &self.id)
            .field("dim", &D)
            .field("phases", &self.phases.len())
            .field("local_size", &self.local_size)
            .finish()
    }
}

impl<const D: usize, A, P> Kernel<D, A, P> {
    pub fn id(&self) -> &IdData {
        &self.id
    }

    pub fn work_dim(&self) -> u32 {
        D as u32
    }

    pub fn num_of_phases(&self) -> usize {
        self.phases.len()
    }

    /// Bytes of local memory each work-group gets.
    pub fn local_memory_size(&self) -> usize {
        self.local_size
    }

    pub fn device(&self) -> &CpuDevice {
        &self.device
    }
}

impl<const D: usize, A: Sync, P: Default> Kernel<D, A, P> {
    /// Execute the kernel over `works` work-items and wait for it.
    ///
    /// A panic inside a work-item aborts the remaining groups of its task
    /// and is reported as [`Error::WorkerPanic`].
    pub fn run(&self, args: &A, works: [u32; D], queue_index: u32) -> Result<()> {
        let device = &self.device;
        if queue_index >= device.num_of_queues() {
            return Err(Error::out_of_range(format!(
                "queue index {} (device has {} queue)",
                queue_index,
                device.num_of_queues()
            )));
        }

        let mut global = [1u32; 3];
        global[..D].copy_from_slice(&works);
        let grid = WorkGroupGrid::new(global, device.work_group_size(D as u32), D as u32)?;

        let threads = device.num_of_threads();
        let plan = BatchPlan::new(grid.total_groups(), threads, device.task_batch_size());
        if plan.num_batches() == 0 {
            return Ok(());
        }

        let _in_flight = device.begin_dispatch()?;
        let metrics = device.metrics();
        let start = Instant::now();

        tracing::debug!(
            kernel = self.id.id,
            works = ?global,
            groups = grid.total_groups(),
            batch_size = plan.batch_size(),
            "dispatch start"
        );

        let result = dispatch_scope(device.pool(), |scope| {
            for _ in 0..plan.num_tasks(threads) {
                let (grid, plan) = (&grid, &plan);
                scope.spawn(move || {
                    let local = LocalMemory::new(device.memory_resource().clone(), self.local_size)?;
                    let mut runner = GroupRunner::new(grid, &self.phases, &self.barriers, local);
                    while let Some(batch) = plan.claim() {
                        let groups = batch.len();
                        for group in batch {
                            runner.run_group(args, group);
                        }
                        metrics.record_batch(groups);
                    }
                    Ok(())
                })?;
            }
            Ok(())
        });

        let elapsed = start.elapsed();
        metrics.record_dispatch(elapsed, grid.total_work_items(), result.is_ok());

        match &result {
            Ok(()) => tracing::debug!(kernel = self.id.id, ?elapsed, "dispatch finished"),
            Err(e) => tracing::error!(kernel = self.id.id, error = %e, "dispatch failed"),
        }
        result
    }
}
