use crate::error::Result;
use crate::vulkan::device::Device;
use erupt::vk;
use gpu_alloc::{MemoryBlock, UsageFlags};
use gpu_alloc_erupt::EruptMemoryDevice;

pub struct DeviceMemory {
    block: Option<MemoryBlock<vk::DeviceMemory>>,
}

impl DeviceMemory {
    pub fn new(
        device: &Device,
        mem_reqs: vk::MemoryRequirements,
        usage: UsageFlags,
        min_alignment: u64,
    ) -> Result<Self> {
        let block = device.alloc_memory(mem_reqs, usage, min_alignment)?;
        Ok(DeviceMemory { block: Some(block) })
    }

    pub fn bind_to_image(&self, device: &Device, image: vk::Image) -> Result<()> {
        if let Some(block) = &self.block {
            unsafe { device.bind_image_memory(image, *block.memory(), block.offset()) }
                .result()?;
        }
        Ok(())
    }

    pub fn bind_to_buffer(&self, device: &Device, buffer: vk::Buffer) -> Result<()> {
        if let Some(block) = &self.block {
            unsafe { device.bind_buffer_memory(buffer, *block.memory(), block.offset()) }
                .result()?;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, device: &Device, offset: u64, data: &[u8]) -> Result<()> {
        if let Some(block) = &mut self.block {
            unsafe { block.write_bytes(EruptMemoryDevice::wrap(device.handle()), offset, data) }?;
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, device: &Device, offset: u64, data: &mut [u8]) -> Result<()> {
        if let Some(block) = &mut self.block {
            unsafe { block.read_bytes(EruptMemoryDevice::wrap(device.handle()), offset, data) }?;
        }
        Ok(())
    }

    pub fn free(&mut self, device: &Device) {
        if let Some(block) = self.block.take() {
            device.dealloc_memory(block);
        }
    }
}
