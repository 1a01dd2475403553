//! Typed device buffers.
//!
//! Buffer memory comes from the device's memory resource and is shared by
//! the host and every work-item of a dispatch. All element accesses, from
//! kernels and from the host, go through relaxed atomic loads and stores,
//! so host reads and writes only need `&self`.

use crate::cl::address_space::{load_relaxed, store_relaxed, ConstantPtr, GlobalPtr};
use crate::device::{CpuDevice, Device};
use crate::device_info::CPU_MAX_ALLOCATION_SIZE;
use crate::error::{Error, Result};
use crate::sub_platform::IdData;
use bytemuck::Pod;
use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

const BUFFER_ALIGN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Read-write storage, seen by kernels as global memory.
    Storage,
    /// Read-only parameters, seen by kernels as constant memory.
    Uniform,
}

/// Where a buffer is meant to live and which way data flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    DeviceOnly,
    HostOnly,
    HostToDevice,
    DeviceToHost,
}

impl BufferUsage {
    pub fn is_device_buffer(self) -> bool {
        self != BufferUsage::HostOnly
    }

    pub fn is_host_buffer(self) -> bool {
        self != BufferUsage::DeviceOnly
    }

    pub fn is_host_readable(self) -> bool {
        matches!(self, BufferUsage::HostOnly | BufferUsage::DeviceToHost)
    }

    pub fn is_host_writable(self) -> bool {
        matches!(self, BufferUsage::HostOnly | BufferUsage::HostToDevice)
    }
}

pub fn make_storage_buffer<T: Pod>(device: &Device, usage: BufferUsage) -> Result<Buffer<T>> {
    Buffer::new(device, BufferKind::Storage, usage)
}

pub fn make_uniform_buffer<T: Pod>(device: &Device, usage: BufferUsage) -> Result<Buffer<T>> {
    Buffer::new(device, BufferKind::Uniform, usage)
}

/// Array of `T` in device memory. Starts empty; see [`Buffer::set_size`].
pub struct Buffer<T> {
    device: CpuDevice,
    id: IdData,
    kind: BufferKind,
    usage: BufferUsage,
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer owns its allocation and every shared access is atomic.
unsafe impl<T: Pod + Send> Send for Buffer<T> {}
unsafe impl<T: Pod + Sync> Sync for Buffer<T> {}

impl<T: Pod> Buffer<T> {
    fn new(device: &Device, kind: BufferKind, usage: BufferUsage) -> Result<Self> {
        let device = device
            .as_cpu()
            .ok_or_else(|| Error::unsupported("buffers on the vulkan sub-platform"))?
            .clone();
        let id = device.issue_id(None);
        tracing::trace!(buffer = id.id, ?kind, ?usage, "buffer created");

        Ok(Self {
            device,
            id,
            kind,
            usage,
            ptr: NonNull::dangling(),
            len: 0,
            _marker: PhantomData,
        })
    }

    fn layout(len: usize) -> Result<Layout> {
        let align = BUFFER_ALIGN.max(std::mem::align_of::<T>());
        let size = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| Error::out_of_range(format!("buffer of {} elements", len)))?;
        Layout::from_size_align(size, align).map_err(|_| Error::Allocation { size, align })
    }

    pub fn id(&self) -> &IdData {
        &self.id
    }

    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn device(&self) -> &CpuDevice {
        &self.device
    }

    /// Number of elements.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Bytes held.
    pub fn memory_usage(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    /// Resize to `len` elements. The common prefix is kept and new elements
    /// are zero.
    pub fn set_size(&mut self, len: usize) -> Result<()> {
        if len == self.len {
            return Ok(());
        }

        let layout = Self::layout(len)?;
        if layout.size() > CPU_MAX_ALLOCATION_SIZE {
            return Err(Error::Allocation {
                size: layout.size(),
                align: layout.align(),
            });
        }

        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            let raw = self.device.memory_resource().allocate_zeroed(layout);
            NonNull::new(raw.cast::<T>()).ok_or(Error::Allocation {
                size: layout.size(),
                align: layout.align(),
            })?
        };

        let keep = self.len.min(len);
        if keep > 0 {
            // SAFETY: both regions hold at least `keep` elements and `&mut self`
            // excludes any live kernel view.
            unsafe { std::ptr::copy_nonoverlapping(self.ptr.as_ptr(), ptr.as_ptr(), keep) };
        }

        self.release();
        self.ptr = ptr;
        self.len = len;
        self.device.heap_usage().grow(layout.size());
        Ok(())
    }

    fn release(&mut self) {
        let bytes = self.memory_usage();
        if bytes > 0 {
            if let Ok(layout) = Self::layout(self.len) {
                self.device
                    .memory_resource()
                    .deallocate(self.ptr.as_ptr().cast(), layout);
            }
            self.device.heap_usage().shrink(bytes);
        }
        self.ptr = NonNull::dangling();
        self.len = 0;
    }

    fn check_range(&self, offset: usize, count: usize, what: &str) -> Result<()> {
        match offset.checked_add(count) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::out_of_range(format!(
                "{} of {} elements at {} exceeds buffer {} of {} elements",
                what, count, offset, self.id, self.len
            ))),
        }
    }

    /// Copy `data` into the buffer starting at element `dst_offset`.
    pub fn write(&self, data: &[T], dst_offset: usize) -> Result<()> {
        self.check_range(dst_offset, data.len(), "write")?;
        let base = self.ptr.as_ptr();
        for (i, &value) in data.iter().enumerate() {
            // SAFETY: range checked above.
            unsafe { store_relaxed(base.add(dst_offset + i), value) };
        }
        Ok(())
    }

    /// Fill `out` from the buffer starting at element `src_offset`.
    pub fn read(&self, out: &mut [T], src_offset: usize) -> Result<()> {
        self.check_range(src_offset, out.len(), "read")?;
        let base = self.ptr.as_ptr();
        for (i, slot) in out.iter_mut().enumerate() {
            // SAFETY: range checked above.
            *slot = unsafe { load_relaxed(base.add(src_offset + i)) };
        }
        Ok(())
    }

    pub fn to_vec(&self) -> Vec<T> {
        let mut out = vec![T::zeroed(); self.len];
        // the range is the whole buffer
        let _ = self.read(&mut out, 0);
        out
    }

    pub fn copy_to(
        &self,
        dst: &mut Buffer<T>,
        count: usize,
        src_offset: usize,
        dst_offset: usize,
    ) -> Result<()> {
        self.check_range(src_offset, count, "copy source")?;
        dst.check_range(dst_offset, count, "copy destination")?;
        let (src, out) = (self.ptr.as_ptr(), dst.ptr.as_ptr());
        for i in 0..count {
            // SAFETY: both ranges checked; `dst` is exclusively borrowed.
            unsafe { out.add(dst_offset + i).write(load_relaxed(src.add(src_offset + i))) };
        }
        Ok(())
    }

    /// Kernel view as global memory.
    pub fn global(&self) -> GlobalPtr<'_, T> {
        // SAFETY: the allocation holds `len` elements and lives as long as
        // the borrow of `self`.
        unsafe { GlobalPtr::from_raw_parts(self.ptr, self.len) }
    }

    /// Kernel view as constant memory.
    pub fn constant(&self) -> ConstantPtr<'_, T> {
        // SAFETY: see `global`.
        unsafe { ConstantPtr::from_raw_parts(self.ptr, self.len) }
    }
}

impl<T> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("usage", &self.usage)
            .field("len", &self.len)
            .finish()
    }
}

impl<T> Drop for Buffer<T> {
    fn drop(&mut self) {
        let bytes = self.len * std::mem::size_of::<T>();
        if bytes > 0 {
            let align = BUFFER_ALIGN.max(std::mem::align_of::<T>());
            if let Ok(layout) = Layout::from_size_align(bytes, align) {
                self.device
                    .memory_resource()
                    .deallocate(self.ptr.as_ptr().cast(), layout);
            }
            self.device.heap_usage().shrink(bytes);
        }
    }
}
