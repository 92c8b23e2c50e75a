use erupt::vk;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vulkan call failed: {0:?}")]
    Vulkan(vk::Result),

    #[error("failed to load vulkan: {0}")]
    Loader(String),

    #[error("no physical device supports hardware ray tracing")]
    NoSuitableDevice,

    #[error("descriptor binding {0} is not part of the layout")]
    UnknownBinding(u32),

    #[error("memory allocation failed: {0:?}")]
    Allocation(gpu_alloc::AllocationError),

    #[error("memory mapping failed: {0:?}")]
    Map(gpu_alloc::MapError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shader binding table: {0}")]
    ShaderTable(String),

    #[error("{field} {value} does not fit in 24 bits")]
    InstanceFieldOverflow { field: &'static str, value: u32 },

    #[error("frame {frame} has {len} bytes, expected {expected}")]
    FrameSize {
        frame: u32,
        len: usize,
        expected: usize,
    },

    #[error("failed to load shader {path}: {reason}")]
    Shader { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl From<vk::Result> for Error {
    fn from(result: vk::Result) -> Self {
        Error::Vulkan(result)
    }
}

impl From<gpu_alloc::AllocationError> for Error {
    fn from(err: gpu_alloc::AllocationError) -> Self {
        Error::Allocation(err)
    }
}

impl From<gpu_alloc::MapError> for Error {
    fn from(err: gpu_alloc::MapError) -> Self {
        Error::Map(err)
    }
}
