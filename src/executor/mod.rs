//! Task execution infrastructure.
//!
//! The fixed-size CPU worker pool, its work-stealing workers, and panic
//! capture for tasks.

pub mod cpu_pool;
pub mod panic_handler;
pub mod task;
pub mod worker;

pub use cpu_pool::CpuPool;
pub use panic_handler::PanicInfo;

pub(crate) use task::Task;
