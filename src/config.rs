use crate::error::{Error, Result};
use crate::memory::MemoryResource;
use crate::sub_platform::cpu::MAX_TASK_BATCH_SIZE;
use std::fmt;
use std::sync::Arc;

/// Default number of work-groups coalesced into one CPU task.
pub const DEFAULT_TASK_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Options consumed by [`Platform::initialize`](crate::Platform::initialize).
///
/// The memory resource is mandatory and shared by every sub-platform the
/// platform creates.
#[derive(Debug, Clone)]
pub struct PlatformOptions {
    pub memory_resource: Arc<dyn MemoryResource>,
    pub platform_name: String,
    pub platform_version: Version,
    pub vulkan_sub_platform_enabled: bool,
    pub debug_mode_enabled: bool,

    /// Worker threads of the CPU sub-platform. `None` picks one per core.
    pub cpu_num_of_threads: Option<usize>,
    pub cpu_task_batch_size: usize,

    pub pin_workers: bool,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,

    /// Externally owned instance the Vulkan sub-platform adopts instead of
    /// creating its own.
    #[cfg(feature = "vulkan")]
    pub vulkan_instance: Option<Arc<wgpu::Instance>>,
}

impl PlatformOptions {
    pub fn new(memory_resource: Arc<dyn MemoryResource>) -> Self {
        Self {
            memory_resource,
            platform_name: "Platform".to_string(),
            platform_version: Version::default(),
            vulkan_sub_platform_enabled: false,
            debug_mode_enabled: cfg!(debug_assertions),
            cpu_num_of_threads: None,
            cpu_task_batch_size: DEFAULT_TASK_BATCH_SIZE,
            pin_workers: false,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "workgrid-worker".to_string(),
            #[cfg(feature = "vulkan")]
            vulkan_instance: None,
        }
    }

    pub fn builder(memory_resource: Arc<dyn MemoryResource>) -> PlatformOptionsBuilder {
        PlatformOptionsBuilder::new(memory_resource)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.cpu_num_of_threads {
            if n == 0 {
                return Err(Error::config("cpu_num_of_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("cpu_num_of_threads too large (max 1024)"));
            }
        }

        if self.cpu_task_batch_size == 0 || self.cpu_task_batch_size > MAX_TASK_BATCH_SIZE {
            return Err(Error::config(format!(
                "cpu_task_batch_size must be in 1..={}",
                MAX_TASK_BATCH_SIZE
            )));
        }

        if self.platform_name.is_empty() {
            return Err(Error::config("platform_name must not be empty"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.cpu_num_of_threads.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug)]
pub struct PlatformOptionsBuilder {
    options: PlatformOptions,
}

impl PlatformOptionsBuilder {
    pub fn new(memory_resource: Arc<dyn MemoryResource>) -> Self {
        Self {
            options: PlatformOptions::new(memory_resource),
        }
    }

    pub fn platform_name<S: Into<String>>(mut self, name: S) -> Self {
        self.options.platform_name = name.into();
        self
    }

    pub fn platform_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.options.platform_version = Version::new(major, minor, patch);
        self
    }

    pub fn enable_vulkan_sub_platform(mut self, enable: bool) -> Self {
        self.options.vulkan_sub_platform_enabled = enable;
        self
    }

    pub fn enable_debug_mode(mut self, enable: bool) -> Self {
        self.options.debug_mode_enabled = enable;
        self
    }

    pub fn cpu_num_of_threads(mut self, n: usize) -> Self {
        self.options.cpu_num_of_threads = Some(n);
        self
    }

    pub fn cpu_task_batch_size(mut self, size: usize) -> Self {
        self.options.cpu_task_batch_size = size;
        self
    }

    pub fn pin_workers(mut self, pin: bool) -> Self {
        self.options.pin_workers = pin;
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.options.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.options.thread_name_prefix = prefix.into();
        self
    }

    #[cfg(feature = "vulkan")]
    pub fn vulkan_instance(mut self, instance: Arc<wgpu::Instance>) -> Self {
        self.options.vulkan_instance = Some(instance);
        self
    }

    pub fn build(self) -> Result<PlatformOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Per-device options passed to `make_device`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Emulated SIMT width of a CPU device. `None` uses the device info's
    /// work-group size. Must be a power of two.
    pub cpu_subgroup_size: Option<u32>,
}

impl DeviceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cpu_subgroup_size(mut self, size: u32) -> Self {
        self.cpu_subgroup_size = Some(size);
        self
    }
}
