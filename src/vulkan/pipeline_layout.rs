use crate::error::Result;
use crate::vulkan::device::Device;
use erupt::vk;

pub struct PipelineLayout {
    handle: vk::PipelineLayout,
}

impl PipelineLayout {
    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }

    pub fn new(device: &Device, descriptor_set_layouts: &[vk::DescriptorSetLayout]) -> Result<Self> {
        let create_info =
            vk::PipelineLayoutCreateInfoBuilder::new().set_layouts(descriptor_set_layouts);
        let handle = unsafe { device.create_pipeline_layout(&create_info, None) }.result()?;

        Ok(PipelineLayout { handle })
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.destroy_pipeline_layout(self.handle, None);
        }
    }
}
