//! Vulkan sub-platform: adapter enumeration and logical device creation.
//!
//! Only the backend plumbing lives here; kernels and buffers are CPU-only,
//! so Vulkan devices can be listed, created and synchronized but not used
//! for dispatch.

use super::{Backend, SubPlatformCore};
use crate::config::{DeviceOptions, PlatformOptions};
use crate::device::{Device, VulkanDevice};
use crate::device_info::{DeviceInfo, VulkanDeviceInfo};
use crate::error::{Error, Result};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct VulkanSubPlatform {
    core: SubPlatformCore,
    instance: Option<Arc<wgpu::Instance>>,
    adapters: Vec<Arc<wgpu::Adapter>>,
    device_infos: Vec<VulkanDeviceInfo>,
}

impl VulkanSubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(&self) -> Option<&Arc<wgpu::Instance>> {
        self.instance.as_ref()
    }

    fn enumerate(&mut self) -> Result<()> {
        let instance = self.instance.as_ref().ok_or(Error::NotInitialized)?;
        self.adapters = instance
            .enumerate_adapters(wgpu::Backends::VULKAN)
            .into_iter()
            .map(Arc::new)
            .collect();
        self.device_infos = self
            .adapters
            .iter()
            .enumerate()
            .map(|(index, adapter)| VulkanDeviceInfo::from_adapter(index, adapter))
            .collect();
        tracing::debug!(adapters = self.adapters.len(), "vulkan adapters enumerated");
        Ok(())
    }
}

impl Backend for VulkanSubPlatform {
    fn core(&self) -> &SubPlatformCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubPlatformCore {
        &mut self.core
    }

    fn init_data(&mut self, options: &PlatformOptions) -> Result<()> {
        let instance = match &options.vulkan_instance {
            Some(instance) => instance.clone(),
            None => Arc::new(wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::VULKAN,
                ..Default::default()
            })),
        };
        self.instance = Some(instance);
        self.enumerate()
    }

    fn destroy_data(&mut self) {
        self.device_infos.clear();
        self.adapters.clear();
        self.instance = None;
    }

    fn has_data(&self) -> bool {
        self.instance.is_some()
    }

    fn is_available(&self) -> bool {
        !self.adapters.is_empty()
    }

    fn num_of_devices(&self) -> usize {
        self.adapters.len()
    }

    fn device_info_list(&self) -> Vec<DeviceInfo> {
        self.device_infos
            .iter()
            .cloned()
            .map(DeviceInfo::Vulkan)
            .collect()
    }

    fn update_device_info_list(&mut self) -> Result<()> {
        self.enumerate()
    }

    fn make_device(&self, info: &DeviceInfo, _options: &DeviceOptions) -> Result<Device> {
        let info = info.as_vulkan().ok_or_else(|| {
            Error::InvalidDeviceInfo(format!(
                "{} device info passed to the vulkan sub-platform",
                info.sub_platform_type()
            ))
        })?;
        let adapter = self.adapters.get(info.index).ok_or_else(|| {
            Error::InvalidDeviceInfo(format!("no vulkan adapter {}", info.index))
        })?;

        let id = self.core.ids().issue(Some(info.name.clone()));
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some(&info.name),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
            },
            None,
        ))
        .map_err(|e| Error::gpu(e.to_string()))?;

        tracing::debug!(adapter = info.index, "vulkan device created");
        Ok(Device::Vulkan(VulkanDevice::new(id, info.clone(), device, queue)?))
    }
}
