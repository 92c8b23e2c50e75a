use crate::error::Result;
use crate::vulkan::device::Device;
use erupt::vk;

#[derive(Copy, Clone, Debug)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_count: u32,
    pub descriptor_type: vk::DescriptorType,
    pub stages: vk::ShaderStageFlags,
}

impl DescriptorBinding {
    pub const fn new(
        binding: u32,
        descriptor_type: vk::DescriptorType,
        stages: vk::ShaderStageFlags,
    ) -> Self {
        DescriptorBinding {
            binding,
            descriptor_count: 1,
            descriptor_type,
            stages,
        }
    }
}

pub struct DescriptorSetLayout {
    handle: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }

    pub fn new(device: &Device, descriptor_bindings: &[DescriptorBinding]) -> Result<Self> {
        let layout_bindings = descriptor_bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBindingBuilder::new()
                    .binding(binding.binding)
                    .descriptor_count(binding.descriptor_count)
                    .descriptor_type(binding.descriptor_type)
                    .stage_flags(binding.stages)
            })
            .collect::<Vec<_>>();

        let create_info =
            vk::DescriptorSetLayoutCreateInfoBuilder::new().bindings(&layout_bindings);

        let handle = unsafe { device.create_descriptor_set_layout(&create_info, None) }.result()?;

        Ok(DescriptorSetLayout { handle })
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.destroy_descriptor_set_layout(self.handle, None);
        }
    }
}
