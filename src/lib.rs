//! workgrid - GPU-shaped compute kernels on CPU threads and Vulkan devices
//!
//! A kernel is written once against work-items, work-groups, local memory,
//! barriers and atomics. On the CPU sub-platform the work-group grid is
//! emulated on a fixed pool of worker threads; the Vulkan sub-platform
//! exposes the same device API over `wgpu`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use workgrid::prelude::*;
//!
//! # fn main() -> workgrid::Result<()> {
//! let options = PlatformOptions::builder(Arc::new(SystemMemoryResource::new()))
//!     .platform_name("demo")
//!     .build()?;
//! let mut platform = Platform::new();
//! platform.initialize(&options)?;
//!
//! for info in platform.device_info_list()? {
//!     println!("{} ({})", info.name(), info.sub_platform_type());
//! }
//! let device = platform.make_device(0, &DeviceOptions::new().cpu_subgroup_size(64))?;
//! assert_eq!(device.work_group_size(2), [8, 8, 1]);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **telemetry** (default): dispatch latency histograms
//! - **vulkan**: the Vulkan sub-platform

#![warn(missing_debug_implementations)]

pub mod buffer;
pub mod cl;
pub mod config;
pub mod device;
pub mod device_info;
pub mod error;
pub mod executor;
pub mod kernel;
pub mod memory;
pub mod platform;
pub mod prelude;
pub mod scheduler;
pub mod sub_platform;
pub mod telemetry;

pub use buffer::{make_storage_buffer, make_uniform_buffer, Buffer, BufferKind, BufferUsage};
pub use config::{DeviceOptions, PlatformOptions, PlatformOptionsBuilder, Version};
pub use device::{CpuDevice, Device};
pub use device_info::{CpuDeviceInfo, DeviceInfo, VulkanDeviceInfo};
pub use error::{Error, Result};
pub use kernel::{make_kernel, Kernel, KernelBuilder, LocalMemory, LocalVar};
pub use memory::{MemoryResource, SystemMemoryResource};
pub use platform::Platform;
pub use sub_platform::{IdData, SubPlatform, SubPlatformType};

#[cfg(feature = "vulkan")]
pub use device::VulkanDevice;
