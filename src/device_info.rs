//! Capabilities of compute devices.

use crate::sub_platform::SubPlatformType;

/// Fixed allocation limit of the CPU device.
pub const CPU_MAX_ALLOCATION_SIZE: usize = 4 * 1024 * 1024 * 1024;

const NOT_AVAILABLE: &str = "N/A";

/// Description of one device, as listed by a sub-platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceInfo {
    Cpu(CpuDeviceInfo),
    Vulkan(VulkanDeviceInfo),
}

impl DeviceInfo {
    pub fn sub_platform_type(&self) -> SubPlatformType {
        match self {
            DeviceInfo::Cpu(_) => SubPlatformType::Cpu,
            DeviceInfo::Vulkan(_) => SubPlatformType::Vulkan,
        }
    }

    /// Position of the device within its sub-platform.
    pub fn index(&self) -> usize {
        match self {
            DeviceInfo::Cpu(_) => 0,
            DeviceInfo::Vulkan(info) => info.index,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeviceInfo::Cpu(info) => &info.name,
            DeviceInfo::Vulkan(info) => &info.name,
        }
    }

    pub fn vendor_name(&self) -> &str {
        match self {
            DeviceInfo::Cpu(info) => &info.vendor_name,
            DeviceInfo::Vulkan(info) => &info.vendor_name,
        }
    }

    pub fn max_allocation_size(&self) -> usize {
        match self {
            DeviceInfo::Cpu(_) => CPU_MAX_ALLOCATION_SIZE,
            DeviceInfo::Vulkan(info) => info.max_buffer_size.min(usize::MAX as u64) as usize,
        }
    }

    pub fn max_work_group_count(&self) -> [u32; 3] {
        match self {
            DeviceInfo::Cpu(_) => [u32::MAX; 3],
            DeviceInfo::Vulkan(info) => info.max_work_group_count,
        }
    }

    /// SIMT width: 1 on the CPU, the (estimated) subgroup size on a GPU.
    pub fn work_group_size(&self) -> u32 {
        match self {
            DeviceInfo::Cpu(_) => 1,
            DeviceInfo::Vulkan(info) => info.subgroup_size,
        }
    }

    pub fn num_of_heaps(&self) -> usize {
        match self {
            DeviceInfo::Cpu(_) => 1,
            DeviceInfo::Vulkan(_) => 0,
        }
    }

    /// Bytes of heap `heap_index`; 0 for a heap the device does not have.
    pub fn total_memory(&self, heap_index: usize) -> usize {
        match self {
            DeviceInfo::Cpu(info) if heap_index == 0 => info.total_memory,
            _ => 0,
        }
    }

    pub fn available_memory(&self, heap_index: usize) -> usize {
        match self {
            DeviceInfo::Cpu(info) if heap_index == 0 => info.available_memory,
            _ => 0,
        }
    }

    pub fn as_cpu(&self) -> Option<&CpuDeviceInfo> {
        match self {
            DeviceInfo::Cpu(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_vulkan(&self) -> Option<&VulkanDeviceInfo> {
        match self {
            DeviceInfo::Vulkan(info) => Some(info),
            _ => None,
        }
    }
}

/// The host processor and its physical memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDeviceInfo {
    name: String,
    vendor_name: String,
    total_memory: usize,
    available_memory: usize,
}

impl CpuDeviceInfo {
    /// Query the processor and memory statistics.
    pub fn fetch() -> Self {
        let (name, vendor_name) = cpu_identity();
        let (total_memory, available_memory) = memory_stats();

        tracing::debug!(
            name = %name,
            vendor = %vendor_name,
            total_memory,
            available_memory,
            "cpu device info fetched"
        );

        Self {
            name,
            vendor_name,
            total_memory,
            available_memory,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_name(&self) -> &str {
        &self.vendor_name
    }

    pub fn total_memory(&self) -> usize {
        self.total_memory
    }

    pub fn available_memory(&self) -> usize {
        self.available_memory
    }
}

fn or_not_available(s: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        s.to_string()
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn cpu_identity() -> (String, String) {
    let cpuid = raw_cpuid::CpuId::new();
    let name = cpuid
        .get_processor_brand_string()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |b| or_not_available(b.as_str()));
    let vendor = cpuid
        .get_vendor_info()
        .map_or_else(|| NOT_AVAILABLE.to_string(), |v| or_not_available(v.as_str()));
    (name, vendor)
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
fn cpu_identity() -> (String, String) {
    (or_not_available(""), or_not_available(""))
}

#[cfg(target_os = "linux")]
fn memory_stats() -> (usize, usize) {
    unsafe {
        let mut info: libc::sysinfo = std::mem::zeroed();
        if libc::sysinfo(&mut info) != 0 {
            tracing::warn!("sysinfo failed, reporting no memory");
            return (0, 0);
        }
        let unit = info.mem_unit.max(1) as u64;
        let total = (info.totalram as u64).saturating_mul(unit);
        let free = (info.freeram as u64).saturating_mul(unit);
        (
            total.min(usize::MAX as u64) as usize,
            free.min(usize::MAX as u64) as usize,
        )
    }
}

#[cfg(not(target_os = "linux"))]
fn memory_stats() -> (usize, usize) {
    (0, 0)
}

/// Kind of a Vulkan physical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VulkanDeviceType {
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

/// A Vulkan adapter as reported by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VulkanDeviceInfo {
    pub index: usize,
    pub name: String,
    pub vendor_id: u32,
    pub vendor_name: String,
    pub device_type: VulkanDeviceType,
    pub driver: String,
    pub driver_info: String,
    pub max_buffer_size: u64,
    pub max_work_group_count: [u32; 3],
    pub max_invocations_per_work_group: u32,
    pub subgroup_size: u32,
}

impl VulkanDeviceInfo {
    #[cfg(feature = "vulkan")]
    pub(crate) fn from_adapter(index: usize, adapter: &wgpu::Adapter) -> Self {
        let info = adapter.get_info();
        let limits = adapter.limits();

        let device_type = match info.device_type {
            wgpu::DeviceType::IntegratedGpu => VulkanDeviceType::IntegratedGpu,
            wgpu::DeviceType::DiscreteGpu => VulkanDeviceType::DiscreteGpu,
            wgpu::DeviceType::VirtualGpu => VulkanDeviceType::VirtualGpu,
            wgpu::DeviceType::Cpu => VulkanDeviceType::Cpu,
            wgpu::DeviceType::Other => VulkanDeviceType::Other,
        };
        let groups = limits.max_compute_workgroups_per_dimension;

        Self {
            index,
            name: or_not_available(&info.name),
            vendor_id: info.vendor,
            vendor_name: vendor_name(info.vendor).to_string(),
            device_type,
            driver: info.driver,
            driver_info: info.driver_info,
            max_buffer_size: limits.max_buffer_size,
            max_work_group_count: [groups; 3],
            max_invocations_per_work_group: limits.max_compute_invocations_per_workgroup,
            subgroup_size: subgroup_size_estimate(info.vendor),
        }
    }
}

#[cfg(any(feature = "vulkan", test))]
pub(crate) fn vendor_name(vendor_id: u32) -> &'static str {
    match vendor_id {
        0x1002 => "AMD",
        0x1010 => "ImgTec",
        0x10DE => "NVIDIA",
        0x13B5 => "ARM",
        0x5143 => "Qualcomm",
        0x8086 => "INTEL",
        _ => NOT_AVAILABLE,
    }
}

/// The backend does not expose the subgroup size, so it is taken from the
/// vendor's usual wave width.
#[cfg(any(feature = "vulkan", test))]
pub(crate) fn subgroup_size_estimate(vendor_id: u32) -> u32 {
    match vendor_id {
        0x1002 | 0x5143 => 64,
        0x8086 | 0x13B5 => 16,
        _ => 32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_info() {
        let info = DeviceInfo::Cpu(CpuDeviceInfo::fetch());
        assert_eq!(info.sub_platform_type(), SubPlatformType::Cpu);
        assert_eq!(info.work_group_size(), 1);
        assert_eq!(info.num_of_heaps(), 1);
        assert_eq!(info.max_allocation_size(), 4 << 30);
        assert_eq!(info.max_work_group_count(), [u32::MAX; 3]);
        assert!(!info.name().is_empty());
        assert!(!info.vendor_name().is_empty());
        assert!(info.available_memory(0) <= info.total_memory(0));
        assert_eq!(info.total_memory(1), 0);
    }

    #[test]
    fn test_vendor_table() {
        assert_eq!(vendor_name(0x10DE), "NVIDIA");
        assert_eq!(vendor_name(0xFFFF), "N/A");
        assert_eq!(subgroup_size_estimate(0x1002), 64);
        assert_eq!(subgroup_size_estimate(0x10DE), 32);
        assert!(subgroup_size_estimate(0x8086).is_power_of_two());
    }

    #[test]
    fn test_vulkan_info_accessors() {
        let info = DeviceInfo::Vulkan(VulkanDeviceInfo {
            index: 2,
            name: "Test GPU".to_string(),
            vendor_id: 0x10DE,
            vendor_name: vendor_name(0x10DE).to_string(),
            device_type: VulkanDeviceType::DiscreteGpu,
            driver: String::new(),
            driver_info: String::new(),
            max_buffer_size: 1 << 30,
            max_work_group_count: [65535; 3],
            max_invocations_per_work_group: 1024,
            subgroup_size: 32,
        });
        assert_eq!(info.index(), 2);
        assert_eq!(info.sub_platform_type(), SubPlatformType::Vulkan);
        assert_eq!(info.max_allocation_size(), 1 << 30);
        assert_eq!(info.work_group_size(), 32);
        assert_eq!(info.num_of_heaps(), 0);
        assert!(info.as_cpu().is_none());
    }
}
