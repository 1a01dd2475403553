//! CPU sub-platform: runs kernels on a fixed pool of worker threads.

use super::{Backend, SubPlatformCore};
use crate::config::{DeviceOptions, PlatformOptions};
use crate::device::{CpuDevice, Device};
use crate::device_info::{CpuDeviceInfo, DeviceInfo};
use crate::error::{Error, Result};
use crate::executor::CpuPool;
use std::sync::Arc;

/// Upper bound on work-groups coalesced into one task.
pub const MAX_TASK_BATCH_SIZE: usize = 256;

#[derive(Debug, Default)]
pub struct CpuSubPlatform {
    core: SubPlatformCore,
    pool: Option<Arc<CpuPool>>,
    device_info: Option<CpuDeviceInfo>,
    task_batch_size: usize,
}

impl CpuSubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn max_task_batch_size() -> usize {
        MAX_TASK_BATCH_SIZE
    }

    /// Work-groups per task requested by the options; a dispatch may use
    /// fewer for small grids.
    pub fn task_batch_size(&self) -> usize {
        self.task_batch_size
    }

    /// Worker threads; 0 until initialized.
    pub fn num_of_threads(&self) -> usize {
        self.pool.as_ref().map_or(0, |pool| pool.num_threads())
    }

    pub fn device_info(&self) -> Option<&CpuDeviceInfo> {
        self.device_info.as_ref()
    }

    pub(crate) fn pool(&self) -> Option<&Arc<CpuPool>> {
        self.pool.as_ref()
    }
}

impl Backend for CpuSubPlatform {
    fn core(&self) -> &SubPlatformCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubPlatformCore {
        &mut self.core
    }

    fn init_data(&mut self, options: &PlatformOptions) -> Result<()> {
        let pool = CpuPool::new(options)?;
        self.task_batch_size = options.cpu_task_batch_size.clamp(1, MAX_TASK_BATCH_SIZE);
        tracing::debug!(
            threads = pool.num_threads(),
            task_batch_size = self.task_batch_size,
            "cpu sub-platform data ready"
        );
        self.pool = Some(Arc::new(pool));
        self.device_info = Some(CpuDeviceInfo::fetch());
        Ok(())
    }

    fn destroy_data(&mut self) {
        self.device_info = None;
        if let Some(pool) = self.pool.take() {
            // devices may still hold the pool; stop it regardless
            pool.shutdown();
        }
        self.task_batch_size = 0;
    }

    fn has_data(&self) -> bool {
        self.pool.is_some()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn num_of_devices(&self) -> usize {
        1
    }

    fn device_info_list(&self) -> Vec<DeviceInfo> {
        self.device_info.iter().cloned().map(DeviceInfo::Cpu).collect()
    }

    fn update_device_info_list(&mut self) -> Result<()> {
        if !self.has_data() {
            return Err(Error::NotInitialized);
        }
        self.device_info = Some(CpuDeviceInfo::fetch());
        Ok(())
    }

    fn make_device(&self, info: &DeviceInfo, options: &DeviceOptions) -> Result<Device> {
        if !self.has_data() {
            return Err(Error::NotInitialized);
        }
        if !matches!(info, DeviceInfo::Cpu(_)) {
            return Err(Error::InvalidDeviceInfo(format!(
                "{} device info passed to the cpu sub-platform",
                info.sub_platform_type()
            )));
        }

        let subgroup_size = options
            .cpu_subgroup_size
            .unwrap_or_else(|| info.work_group_size());
        Ok(Device::Cpu(CpuDevice::new(self, subgroup_size)?))
    }
}
