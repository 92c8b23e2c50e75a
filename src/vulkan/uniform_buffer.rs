use crate::error::Result;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::device::Device;
use crevice::std140::{AsStd140, Std140};
use erupt::vk;

/// Host visible uniform buffer holding a single std140 value.
pub struct UniformBuffer {
    buffer: Buffer,
}

impl UniformBuffer {
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn new<T: AsStd140>(device: &Device) -> Result<Self> {
        let buffer = Buffer::empty(
            device,
            T::std140_size_static() as u64,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            gpu_alloc::UsageFlags::HOST_ACCESS | gpu_alloc::UsageFlags::UPLOAD,
        )?;

        Ok(UniformBuffer { buffer })
    }

    pub fn update<T: AsStd140>(&mut self, device: &Device, value: &T) -> Result<()> {
        let std140 = value.as_std140();
        self.buffer.write_bytes(device, std140.as_bytes(), 0)
    }

    pub fn destroy(&mut self, device: &Device) {
        self.buffer.destroy(device);
    }
}
