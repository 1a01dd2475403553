//! Everything a host program and its kernels usually need.

pub use crate::buffer::{make_storage_buffer, make_uniform_buffer, Buffer, BufferKind, BufferUsage};
pub use crate::cl::*;
pub use crate::config::{DeviceOptions, PlatformOptions};
pub use crate::device::Device;
pub use crate::device_info::DeviceInfo;
pub use crate::error::{Error, Result};
pub use crate::kernel::{make_kernel, Kernel, LocalMemory, LocalVar};
pub use crate::memory::{MemoryResource, SystemMemoryResource};
pub use crate::platform::Platform;
pub use crate::sub_platform::SubPlatformType;

#[cfg(feature = "telemetry")]
pub use crate::telemetry::MetricsSnapshot;
