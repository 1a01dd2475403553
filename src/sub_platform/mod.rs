//! Sub-platforms: one backend each behind the common device API.
//!
//! Every sub-platform goes through the same lifecycle. `initialize` first
//! tears down whatever it held, then resets the shared fields (id counter,
//! debug flag, memory resource) and finally builds the backend data.
//! `destroy` runs in the reverse order: backend data first, shared fields
//! last.

pub mod cpu;
#[cfg(feature = "vulkan")]
pub mod vulkan;

pub use cpu::{CpuSubPlatform, MAX_TASK_BATCH_SIZE};
#[cfg(feature = "vulkan")]
pub use vulkan::VulkanSubPlatform;

use crate::config::{DeviceOptions, PlatformOptions};
use crate::device::Device;
use crate::device_info::DeviceInfo;
use crate::error::Result;
use crate::memory::MemoryResource;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubPlatformType {
    Cpu = 0,
    Vulkan = 1,
}

impl SubPlatformType {
    pub const ALL: [SubPlatformType; 2] = [SubPlatformType::Cpu, SubPlatformType::Vulkan];

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SubPlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubPlatformType::Cpu => f.write_str("cpu"),
            SubPlatformType::Vulkan => f.write_str("vulkan"),
        }
    }
}

/// Identity of a resource created through a sub-platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdData {
    pub id: u32,
    pub name: Option<String>,
}

impl IdData {
    pub fn new(id: u32, name: Option<String>) -> Self {
        Self { id, name }
    }
}

impl fmt::Display for IdData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}#{}", name, self.id),
            None => write!(f, "#{}", self.id),
        }
    }
}

/// Atomic id counter shared by a sub-platform and the devices it made.
#[derive(Debug, Default)]
pub(crate) struct IdIssuer {
    count: AtomicU32,
}

impl IdIssuer {
    pub(crate) fn issue(&self, name: Option<String>) -> IdData {
        IdData::new(self.count.fetch_add(1, Ordering::Relaxed), name)
    }

    pub(crate) fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Fields every backend carries.
#[derive(Debug, Default)]
pub(crate) struct SubPlatformCore {
    ids: Arc<IdIssuer>,
    debug_mode: bool,
    memory_resource: Option<Arc<dyn MemoryResource>>,
}

impl SubPlatformCore {
    fn init(&mut self, options: &PlatformOptions) {
        self.ids.reset();
        self.debug_mode = options.debug_mode_enabled;
        self.memory_resource = Some(options.memory_resource.clone());
    }

    fn reset(&mut self) {
        self.ids.reset();
        self.debug_mode = false;
        self.memory_resource = None;
    }

    pub(crate) fn ids(&self) -> &Arc<IdIssuer> {
        &self.ids
    }

    pub(crate) fn is_debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub(crate) fn memory_resource(&self) -> Option<&Arc<dyn MemoryResource>> {
        self.memory_resource.as_ref()
    }
}

/// Backend hooks. The provided `initialize`/`destroy` fix the order in
/// which shared and backend state is set up and torn down.
pub(crate) trait Backend: fmt::Debug {
    fn core(&self) -> &SubPlatformCore;
    fn core_mut(&mut self) -> &mut SubPlatformCore;

    fn init_data(&mut self, options: &PlatformOptions) -> Result<()>;
    fn destroy_data(&mut self);
    fn has_data(&self) -> bool;

    fn is_available(&self) -> bool;
    fn num_of_devices(&self) -> usize;
    fn device_info_list(&self) -> Vec<DeviceInfo>;
    fn update_device_info_list(&mut self) -> Result<()>;
    fn make_device(&self, info: &DeviceInfo, options: &DeviceOptions) -> Result<Device>;

    fn initialize(&mut self, options: &PlatformOptions) -> Result<()> {
        self.destroy();
        self.core_mut().init(options);
        if let Err(e) = self.init_data(options) {
            self.destroy();
            return Err(e);
        }
        Ok(())
    }

    fn destroy(&mut self) {
        self.destroy_data();
        self.core_mut().reset();
    }
}

/// A backend owned by the [`Platform`](crate::Platform).
#[derive(Debug)]
pub enum SubPlatform {
    Cpu(CpuSubPlatform),
    #[cfg(feature = "vulkan")]
    Vulkan(VulkanSubPlatform),
}

impl SubPlatform {
    fn backend(&self) -> &dyn Backend {
        match self {
            SubPlatform::Cpu(cpu) => cpu,
            #[cfg(feature = "vulkan")]
            SubPlatform::Vulkan(vulkan) => vulkan,
        }
    }

    fn backend_mut(&mut self) -> &mut dyn Backend {
        match self {
            SubPlatform::Cpu(cpu) => cpu,
            #[cfg(feature = "vulkan")]
            SubPlatform::Vulkan(vulkan) => vulkan,
        }
    }

    pub fn sub_platform_type(&self) -> SubPlatformType {
        match self {
            SubPlatform::Cpu(_) => SubPlatformType::Cpu,
            #[cfg(feature = "vulkan")]
            SubPlatform::Vulkan(_) => SubPlatformType::Vulkan,
        }
    }

    pub fn initialize(&mut self, options: &PlatformOptions) -> Result<()> {
        let sub_platform_type = self.sub_platform_type();
        self.backend_mut().initialize(options)?;
        tracing::info!(
            sub_platform = %sub_platform_type,
            debug = options.debug_mode_enabled,
            available = self.is_available(),
            "sub-platform initialized"
        );
        Ok(())
    }

    pub fn destroy(&mut self) {
        if self.is_ready() {
            tracing::info!(sub_platform = %self.sub_platform_type(), "sub-platform destroyed");
        }
        self.backend_mut().destroy();
    }

    /// Initialized and not yet destroyed.
    pub fn is_ready(&self) -> bool {
        self.backend().has_data()
    }

    pub fn is_available(&self) -> bool {
        self.backend().is_available()
    }

    pub fn is_debug_mode(&self) -> bool {
        self.backend().core().is_debug_mode()
    }

    pub fn memory_resource(&self) -> Option<&Arc<dyn MemoryResource>> {
        self.backend().core().memory_resource()
    }

    pub fn issue_id(&self, name: Option<String>) -> IdData {
        self.backend().core().ids().issue(name)
    }

    pub fn num_of_devices(&self) -> usize {
        self.backend().num_of_devices()
    }

    pub fn device_info_list(&self) -> Vec<DeviceInfo> {
        self.backend().device_info_list()
    }

    pub fn update_device_info_list(&mut self) -> Result<()> {
        self.backend_mut().update_device_info_list()
    }

    pub fn make_device(&self, info: &DeviceInfo, options: &DeviceOptions) -> Result<Device> {
        let device = self.backend().make_device(info, options)?;
        tracing::debug!(
            sub_platform = %self.sub_platform_type(),
            device = %device.id(),
            name = info.name(),
            "device created"
        );
        Ok(device)
    }

    pub fn as_cpu(&self) -> Option<&CpuSubPlatform> {
        match self {
            SubPlatform::Cpu(cpu) => Some(cpu),
            #[cfg(feature = "vulkan")]
            _ => None,
        }
    }

    #[cfg(feature = "vulkan")]
    pub fn as_vulkan(&self) -> Option<&VulkanSubPlatform> {
        match self {
            SubPlatform::Vulkan(vulkan) => Some(vulkan),
            _ => None,
        }
    }
}

impl Drop for SubPlatform {
    fn drop(&mut self) {
        self.backend_mut().destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SystemMemoryResource;
    use std::collections::HashSet;
    use std::thread;

    fn options() -> PlatformOptions {
        PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
            .cpu_num_of_threads(2)
            .enable_debug_mode(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_type_indices() {
        assert_eq!(SubPlatformType::Cpu.index(), 0);
        assert_eq!(SubPlatformType::Vulkan.index(), 1);
        assert_eq!(SubPlatformType::ALL.len(), 2);
        assert_eq!(SubPlatformType::Vulkan.to_string(), "vulkan");
    }

    #[test]
    fn test_lifecycle() {
        let mut sub = SubPlatform::Cpu(CpuSubPlatform::new());
        assert!(!sub.is_ready());
        assert!(sub.memory_resource().is_none());

        sub.initialize(&options()).unwrap();
        assert!(sub.is_ready());
        assert!(sub.is_debug_mode());
        assert!(sub.memory_resource().is_some());
        assert_eq!(sub.issue_id(None).id, 0);
        assert_eq!(sub.issue_id(Some("buf".into())).id, 1);

        // re-initialize resets the id counter
        sub.initialize(&options()).unwrap();
        assert_eq!(sub.issue_id(None).id, 0);

        sub.destroy();
        assert!(!sub.is_ready());
        assert!(!sub.is_debug_mode());
        assert!(sub.memory_resource().is_none());
    }

    #[test]
    fn test_concurrent_ids_are_unique() {
        let issuer = Arc::new(IdIssuer::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let issuer = issuer.clone();
                thread::spawn(move || (0..1000).map(|_| issuer.issue(None).id).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 4000);
        assert_eq!(issuer.issue(None).id, 4000);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(IdData::new(3, Some("table".into())).to_string(), "table#3");
        assert_eq!(IdData::new(4, None).to_string(), "#4");
    }
}
