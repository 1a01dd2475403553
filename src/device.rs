//! Devices created by a sub-platform.

use crate::device_info::CpuDeviceInfo;
#[cfg(feature = "vulkan")]
use crate::device_info::VulkanDeviceInfo;
use crate::error::{Error, Result};
use crate::executor::CpuPool;
use crate::memory::{HeapUsage, MemoryResource};
use crate::scheduler::work_group_shape;
use crate::sub_platform::{Backend, CpuSubPlatform, IdData, IdIssuer, SubPlatformType};
use crate::telemetry::DispatchMetrics;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// A compute device of either backend.
#[derive(Debug, Clone)]
pub enum Device {
    Cpu(CpuDevice),
    #[cfg(feature = "vulkan")]
    Vulkan(VulkanDevice),
}

impl Device {
    pub fn id(&self) -> &IdData {
        match self {
            Device::Cpu(device) => device.id(),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.id(),
        }
    }

    pub fn sub_platform_type(&self) -> SubPlatformType {
        match self {
            Device::Cpu(_) => SubPlatformType::Cpu,
            #[cfg(feature = "vulkan")]
            Device::Vulkan(_) => SubPlatformType::Vulkan,
        }
    }

    pub fn subgroup_size(&self) -> u32 {
        match self {
            Device::Cpu(device) => device.subgroup_size(),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.subgroup_size(),
        }
    }

    /// Work-group shape used for `dim`-dimensional kernels.
    pub fn work_group_size(&self, dim: u32) -> [u32; 3] {
        match self {
            Device::Cpu(device) => device.work_group_size(dim),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.work_group_size(dim),
        }
    }

    pub fn num_of_queues(&self) -> u32 {
        match self {
            Device::Cpu(device) => device.num_of_queues(),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.num_of_queues(),
        }
    }

    /// Block until the device has no work in flight.
    pub fn wait_for_completion(&self) {
        match self {
            Device::Cpu(device) => device.wait_for_completion(),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.wait_for_completion(),
        }
    }

    pub fn total_memory_usage(&self) -> usize {
        match self {
            Device::Cpu(device) => device.heap_usage().total(),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.heap_usage().total(),
        }
    }

    pub fn peak_memory_usage(&self) -> usize {
        match self {
            Device::Cpu(device) => device.heap_usage().peak(),
            #[cfg(feature = "vulkan")]
            Device::Vulkan(device) => device.heap_usage().peak(),
        }
    }

    pub fn as_cpu(&self) -> Option<&CpuDevice> {
        match self {
            Device::Cpu(device) => Some(device),
            #[cfg(feature = "vulkan")]
            _ => None,
        }
    }

    #[cfg(feature = "vulkan")]
    pub fn as_vulkan(&self) -> Option<&VulkanDevice> {
        match self {
            Device::Vulkan(device) => Some(device),
            _ => None,
        }
    }
}

/// Handle to the CPU device. Clones share the same device.
#[derive(Debug, Clone)]
pub struct CpuDevice {
    inner: Arc<CpuDeviceInner>,
}

#[derive(Debug)]
struct CpuDeviceInner {
    id: IdData,
    info: CpuDeviceInfo,
    pool: Arc<CpuPool>,
    ids: Arc<IdIssuer>,
    memory_resource: Arc<dyn MemoryResource>,
    subgroup_size: u32,
    shapes: [[u32; 3]; 3],
    task_batch_size: usize,
    debug_mode: bool,
    heap: HeapUsage,
    metrics: DispatchMetrics,
    in_flight: Mutex<usize>,
    idle: Condvar,
}

impl CpuDevice {
    pub(crate) fn new(sub_platform: &CpuSubPlatform, subgroup_size: u32) -> Result<Self> {
        let shapes = work_group_shape(subgroup_size)?;
        let core = sub_platform.core();
        let pool = sub_platform.pool().cloned().ok_or(Error::NotInitialized)?;
        let memory_resource = core.memory_resource().cloned().ok_or(Error::NotInitialized)?;
        let info = sub_platform
            .device_info()
            .cloned()
            .ok_or(Error::NotInitialized)?;
        let ids = core.ids().clone();

        Ok(Self {
            inner: Arc::new(CpuDeviceInner {
                id: ids.issue(Some(info.name().to_string())),
                info,
                pool,
                ids,
                memory_resource,
                subgroup_size,
                shapes,
                task_batch_size: sub_platform.task_batch_size(),
                debug_mode: core.is_debug_mode(),
                heap: HeapUsage::new(),
                metrics: DispatchMetrics::new(),
                in_flight: Mutex::new(0),
                idle: Condvar::new(),
            }),
        })
    }

    pub fn id(&self) -> &IdData {
        &self.inner.id
    }

    pub fn info(&self) -> &CpuDeviceInfo {
        &self.inner.info
    }

    pub fn subgroup_size(&self) -> u32 {
        self.inner.subgroup_size
    }

    /// Shape for `dim` in 1..=3; other values are clamped into that range.
    pub fn work_group_size(&self, dim: u32) -> [u32; 3] {
        self.inner.shapes[dim.clamp(1, 3) as usize - 1]
    }

    pub fn num_of_queues(&self) -> u32 {
        1
    }

    pub fn num_of_threads(&self) -> usize {
        self.inner.pool.num_threads()
    }

    pub fn task_batch_size(&self) -> usize {
        self.inner.task_batch_size
    }

    pub fn is_debug_mode(&self) -> bool {
        self.inner.debug_mode
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.inner.metrics
    }

    pub fn heap_usage(&self) -> &HeapUsage {
        &self.inner.heap
    }

    pub fn total_memory_usage(&self) -> usize {
        self.inner.heap.total()
    }

    pub fn peak_memory_usage(&self) -> usize {
        self.inner.heap.peak()
    }

    pub fn wait_for_completion(&self) {
        let mut in_flight = self.inner.in_flight.lock();
        while *in_flight > 0 {
            self.inner.idle.wait(&mut in_flight);
        }
    }

    pub(crate) fn memory_resource(&self) -> &Arc<dyn MemoryResource> {
        &self.inner.memory_resource
    }

    pub(crate) fn pool(&self) -> &CpuPool {
        &self.inner.pool
    }

    pub(crate) fn issue_id(&self, name: Option<String>) -> IdData {
        self.inner.ids.issue(name)
    }

    /// Mark a dispatch in flight until the guard drops.
    pub(crate) fn begin_dispatch(&self) -> Result<InFlight<'_>> {
        if self.inner.pool.is_shutdown() {
            return Err(Error::NotInitialized);
        }
        *self.inner.in_flight.lock() += 1;
        Ok(InFlight { device: &self.inner })
    }
}

pub(crate) struct InFlight<'a> {
    device: &'a CpuDeviceInner,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.device.in_flight.lock();
        *in_flight -= 1;
        if *in_flight == 0 {
            self.device.idle.notify_all();
        }
    }
}

/// Logical Vulkan device and its queue.
#[cfg(feature = "vulkan")]
#[derive(Debug, Clone)]
pub struct VulkanDevice {
    inner: Arc<VulkanDeviceInner>,
}

#[cfg(feature = "vulkan")]
#[derive(Debug)]
struct VulkanDeviceInner {
    id: IdData,
    info: VulkanDeviceInfo,
    device: wgpu::Device,
    queue: wgpu::Queue,
    shapes: [[u32; 3]; 3],
    heap: HeapUsage,
}

#[cfg(feature = "vulkan")]
impl VulkanDevice {
    pub(crate) fn new(
        id: IdData,
        info: VulkanDeviceInfo,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Result<Self> {
        let shapes = work_group_shape(info.subgroup_size)?;
        Ok(Self {
            inner: Arc::new(VulkanDeviceInner {
                id,
                info,
                device,
                queue,
                shapes,
                heap: HeapUsage::new(),
            }),
        })
    }

    pub fn id(&self) -> &IdData {
        &self.inner.id
    }

    pub fn info(&self) -> &VulkanDeviceInfo {
        &self.inner.info
    }

    pub fn subgroup_size(&self) -> u32 {
        self.inner.info.subgroup_size
    }

    pub fn work_group_size(&self, dim: u32) -> [u32; 3] {
        self.inner.shapes[dim.clamp(1, 3) as usize - 1]
    }

    pub fn num_of_queues(&self) -> u32 {
        1
    }

    pub fn heap_usage(&self) -> &HeapUsage {
        &self.inner.heap
    }

    pub fn wgpu_device(&self) -> &wgpu::Device {
        &self.inner.device
    }

    pub fn wgpu_queue(&self) -> &wgpu::Queue {
        &self.inner.queue
    }

    pub fn wait_for_completion(&self) {
        let _ = self.inner.device.poll(wgpu::Maintain::Wait);
    }
}
