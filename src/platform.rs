//! Top-level registry owning at most one sub-platform of each type.

use crate::config::{DeviceOptions, PlatformOptions, Version};
use crate::device::Device;
use crate::device_info::DeviceInfo;
use crate::error::{Error, Result};
use crate::memory::MemoryResource;
use crate::sub_platform::{CpuSubPlatform, SubPlatform, SubPlatformType};
use std::sync::Arc;

/// Entry point of the library.
///
/// A platform starts empty. [`Platform::initialize`] always creates the CPU
/// sub-platform and, when enabled, tries the Vulkan one. A missing backend is
/// a valid state; check [`Platform::has_sub_platform`] before using it.
#[derive(Debug, Default)]
pub struct Platform {
    sub_platforms: [Option<SubPlatform>; 2],
    device_info_list: Option<Vec<DeviceInfo>>,
    memory_resource: Option<Arc<dyn MemoryResource>>,
    name: String,
    version: Version,
}

impl Platform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tear down whatever the platform held, then build the sub-platforms
    /// `options` ask for. Invalid options leave the platform uninitialized.
    pub fn initialize(&mut self, options: &PlatformOptions) -> Result<()> {
        self.destroy();
        options.validate()?;

        let mut cpu = SubPlatform::Cpu(CpuSubPlatform::new());
        cpu.initialize(options)?;
        self.sub_platforms[SubPlatformType::Cpu.index()] = Some(cpu);

        if options.vulkan_sub_platform_enabled {
            self.sub_platforms[SubPlatformType::Vulkan.index()] = Self::make_vulkan(options);
        }

        self.memory_resource = Some(options.memory_resource.clone());
        self.name = options.platform_name.clone();
        self.version = options.platform_version;

        if let Err(e) = self.update_device_info_list() {
            self.destroy();
            return Err(e);
        }

        tracing::info!(
            platform = %self.name,
            version = %self.version,
            vulkan = self.has_sub_platform(SubPlatformType::Vulkan),
            devices = self.device_info_list.as_ref().map_or(0, Vec::len),
            "platform initialized"
        );
        Ok(())
    }

    #[cfg(feature = "vulkan")]
    fn make_vulkan(options: &PlatformOptions) -> Option<SubPlatform> {
        use crate::sub_platform::VulkanSubPlatform;

        let mut vulkan = SubPlatform::Vulkan(VulkanSubPlatform::new());
        match vulkan.initialize(options) {
            Ok(()) => {
                if !vulkan.is_available() {
                    tracing::warn!("vulkan sub-platform has no adapters");
                }
                Some(vulkan)
            }
            Err(e) => {
                tracing::warn!(error = %e, "vulkan sub-platform unavailable");
                None
            }
        }
    }

    #[cfg(not(feature = "vulkan"))]
    fn make_vulkan(_options: &PlatformOptions) -> Option<SubPlatform> {
        tracing::warn!("vulkan sub-platform requested but the `vulkan` feature is disabled");
        None
    }

    /// Tear down every sub-platform. Devices made earlier stop accepting
    /// dispatches.
    pub fn destroy(&mut self) {
        let was_initialized = self.is_initialized();
        self.device_info_list = None;
        // reverse creation order
        for slot in self.sub_platforms.iter_mut().rev() {
            if let Some(mut sub_platform) = slot.take() {
                sub_platform.destroy();
            }
        }
        self.memory_resource = None;
        if was_initialized {
            tracing::info!(platform = %self.name, "platform destroyed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sub_platforms[SubPlatformType::Cpu.index()].is_some()
    }

    /// Slot present and backend usable.
    pub fn has_sub_platform(&self, sub_platform_type: SubPlatformType) -> bool {
        self.sub_platforms[sub_platform_type.index()]
            .as_ref()
            .map_or(false, |sub| sub.is_available())
    }

    pub fn sub_platform(&self, sub_platform_type: SubPlatformType) -> Result<&SubPlatform> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        self.sub_platforms[sub_platform_type.index()]
            .as_ref()
            .ok_or_else(|| Error::sub_platform(format!("no {} sub-platform", sub_platform_type)))
    }

    pub fn sub_platform_mut(
        &mut self,
        sub_platform_type: SubPlatformType,
    ) -> Result<&mut SubPlatform> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }
        self.sub_platforms[sub_platform_type.index()]
            .as_mut()
            .ok_or_else(|| Error::sub_platform(format!("no {} sub-platform", sub_platform_type)))
    }

    /// Snapshot of every device, CPU first.
    pub fn device_info_list(&self) -> Result<&[DeviceInfo]> {
        self.device_info_list
            .as_deref()
            .ok_or(Error::NotInitialized)
    }

    /// Re-enumerate devices on every sub-platform and replace the snapshot.
    pub fn update_device_info_list(&mut self) -> Result<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized);
        }

        let mut list = Vec::new();
        for sub_platform in self.sub_platforms.iter_mut().flatten() {
            sub_platform.update_device_info_list()?;
            list.extend(sub_platform.device_info_list());
        }
        tracing::debug!(devices = list.len(), "device info list updated");
        self.device_info_list = Some(list);
        Ok(())
    }

    /// Create a device for entry `index` of [`Platform::device_info_list`].
    pub fn make_device(&self, index: usize, options: &DeviceOptions) -> Result<Device> {
        let list = self.device_info_list()?;
        let info = list.get(index).ok_or_else(|| {
            Error::out_of_range(format!(
                "device index {} (platform has {} devices)",
                index,
                list.len()
            ))
        })?;
        self.sub_platform(info.sub_platform_type())?
            .make_device(info, options)
    }

    pub fn memory_resource(&self) -> Option<&Arc<dyn MemoryResource>> {
        self.memory_resource.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SystemMemoryResource;

    fn options(vulkan: bool) -> PlatformOptions {
        PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
            .platform_name("test")
            .platform_version(1, 2, 3)
            .enable_vulkan_sub_platform(vulkan)
            .cpu_num_of_threads(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_uninitialized_accessors() {
        let mut platform = Platform::new();
        assert!(!platform.is_initialized());
        assert!(!platform.has_sub_platform(SubPlatformType::Cpu));
        assert!(matches!(
            platform.sub_platform(SubPlatformType::Cpu),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(platform.device_info_list(), Err(Error::NotInitialized)));
        assert!(platform.update_device_info_list().is_err());
        assert!(platform.make_device(0, &DeviceOptions::new()).is_err());
    }

    #[test]
    fn test_initialize_cpu_only() {
        let mut platform = Platform::new();
        platform.initialize(&options(false)).unwrap();

        assert!(platform.is_initialized());
        assert!(platform.has_sub_platform(SubPlatformType::Cpu));
        assert!(!platform.has_sub_platform(SubPlatformType::Vulkan));
        assert!(platform.sub_platform(SubPlatformType::Vulkan).is_err());
        assert_eq!(platform.name(), "test");
        assert_eq!(platform.version(), Version::new(1, 2, 3));

        let list = platform.device_info_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].sub_platform_type(), SubPlatformType::Cpu);
    }

    #[test]
    fn test_destroy_and_reinitialize() {
        let mut platform = Platform::new();
        platform.initialize(&options(false)).unwrap();
        platform.destroy();
        assert!(!platform.has_sub_platform(SubPlatformType::Cpu));
        assert!(!platform.has_sub_platform(SubPlatformType::Vulkan));
        assert!(platform.memory_resource().is_none());

        platform.initialize(&options(false)).unwrap();
        assert!(platform.has_sub_platform(SubPlatformType::Cpu));
        let sub = platform.sub_platform(SubPlatformType::Cpu).unwrap();
        assert_eq!(sub.issue_id(None).id, 0);
    }

    #[test]
    fn test_make_device_index() {
        let mut platform = Platform::new();
        platform.initialize(&options(false)).unwrap();
        assert!(platform.make_device(0, &DeviceOptions::new()).is_ok());
        assert!(matches!(
            platform.make_device(5, &DeviceOptions::new()),
            Err(Error::OutOfRange(_))
        ));
    }

    #[test]
    fn test_invalid_options_keep_platform_empty() {
        let mut options = options(false);
        options.cpu_task_batch_size = 0;
        let mut platform = Platform::new();
        assert!(matches!(platform.initialize(&options), Err(Error::Config(_))));
        assert!(!platform.is_initialized());
    }

    #[test]
    fn test_invalid_reinitialize_destroys_first() {
        let mut platform = Platform::new();
        platform.initialize(&options(false)).unwrap();
        assert!(platform.is_initialized());

        let mut bad = options(false);
        bad.cpu_task_batch_size = 0;
        assert!(matches!(platform.initialize(&bad), Err(Error::Config(_))));
        assert!(!platform.is_initialized());
        assert!(matches!(platform.device_info_list(), Err(Error::NotInitialized)));
        assert!(platform.memory_resource().is_none());
    }

    #[cfg(not(feature = "vulkan"))]
    #[test]
    fn test_vulkan_request_without_feature() {
        let mut platform = Platform::new();
        platform.initialize(&options(true)).unwrap();
        assert!(platform.has_sub_platform(SubPlatformType::Cpu));
        assert!(!platform.has_sub_platform(SubPlatformType::Vulkan));
    }
}
