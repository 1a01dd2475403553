pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("sub-platform error: {0}")]
    SubPlatform(String),

    #[error("invalid device info: {0}")]
    InvalidDeviceInfo(String),

    #[error("platform not initialized")]
    NotInitialized,

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("allocation of {size} bytes (align {align}) failed")]
    Allocation { size: usize, align: usize },

    #[error("work-item panic: {0}")]
    WorkerPanic(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[cfg(feature = "vulkan")]
    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn sub_platform<S: Into<String>>(msg: S) -> Self {
        Error::SubPlatform(msg.into())
    }

    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        Error::Unsupported(msg.into())
    }

    pub fn out_of_range<S: Into<String>>(msg: S) -> Self {
        Error::OutOfRange(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    #[cfg(feature = "vulkan")]
    pub fn gpu<S: Into<String>>(msg: S) -> Self {
        Error::Gpu(msg.into())
    }
}
