pub mod buffer;
pub mod command_buffer;
pub mod command_pool;
pub mod debug_utils;
pub mod descriptor_set_layout;
pub mod descriptor_set_manager;
pub mod device;
pub mod device_memory;
pub mod fence;
pub mod image;
pub mod instance;
pub mod pipeline_layout;
pub mod raytracing;
pub mod shader_module;
pub mod uniform_buffer;
