use crate::error::{Error, Result};
use crate::vulkan::descriptor_set_layout::{DescriptorBinding, DescriptorSetLayout};
use crate::vulkan::device::Device;
use erupt::{vk, ExtendableFrom};
use std::collections::HashMap;

/// One descriptor set per frame slot, all sharing a single layout.
pub struct DescriptorSetManager {
    descriptor_pool: vk::DescriptorPool,
    descriptor_sets: Vec<vk::DescriptorSet>,
    descriptor_set_layout: DescriptorSetLayout,
    binding_types: HashMap<u32, vk::DescriptorType>,
}

impl DescriptorSetManager {
    pub fn new(
        device: &Device,
        descriptor_bindings: &[DescriptorBinding],
        max_sets: usize,
    ) -> Result<Self> {
        let descriptor_set_layout = DescriptorSetLayout::new(device, descriptor_bindings)?;

        let pool_sizes = descriptor_bindings
            .iter()
            .map(|binding| {
                vk::DescriptorPoolSizeBuilder::new()
                    ._type(binding.descriptor_type)
                    .descriptor_count(binding.descriptor_count * max_sets as u32)
            })
            .collect::<Vec<_>>();

        let create_info = vk::DescriptorPoolCreateInfoBuilder::new()
            .pool_sizes(&pool_sizes)
            .max_sets(max_sets as _);

        let descriptor_pool =
            unsafe { device.create_descriptor_pool(&create_info, None) }.result()?;

        let layouts = vec![descriptor_set_layout.handle(); max_sets];
        let alloc_info = vk::DescriptorSetAllocateInfoBuilder::new()
            .descriptor_pool(descriptor_pool)
            .set_layouts(&layouts);

        let descriptor_sets = unsafe { device.allocate_descriptor_sets(&alloc_info) }
            .result()?
            .to_vec();

        let binding_types = descriptor_bindings
            .iter()
            .map(|binding| (binding.binding, binding.descriptor_type))
            .collect();

        Ok(DescriptorSetManager {
            descriptor_pool,
            descriptor_sets,
            descriptor_set_layout,
            binding_types,
        })
    }

    pub fn descriptor_set_layout(&self) -> vk::DescriptorSetLayout {
        self.descriptor_set_layout.handle()
    }

    pub fn descriptor_set(&self, index: usize) -> vk::DescriptorSet {
        self.descriptor_sets[index]
    }

    fn descriptor_type(&self, binding: u32) -> Result<vk::DescriptorType> {
        self.binding_types
            .get(&binding)
            .copied()
            .ok_or(Error::UnknownBinding(binding))
    }

    pub fn bind_buffer<'a>(
        &self,
        index: usize,
        binding: u32,
        buffer_info: &'a [vk::DescriptorBufferInfoBuilder<'a>],
    ) -> Result<vk::WriteDescriptorSetBuilder<'a>> {
        Ok(vk::WriteDescriptorSetBuilder::new()
            .dst_set(self.descriptor_sets[index])
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(self.descriptor_type(binding)?)
            .buffer_info(buffer_info))
    }

    pub fn bind_image<'a>(
        &self,
        index: usize,
        binding: u32,
        image_info: &'a [vk::DescriptorImageInfoBuilder<'a>],
    ) -> Result<vk::WriteDescriptorSetBuilder<'a>> {
        Ok(vk::WriteDescriptorSetBuilder::new()
            .dst_set(self.descriptor_sets[index])
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(self.descriptor_type(binding)?)
            .image_info(image_info))
    }

    pub fn bind_acceleration_structure<'a>(
        &self,
        index: usize,
        binding: u32,
        acceleration_structures: &'a mut vk::WriteDescriptorSetAccelerationStructureKHRBuilder<'a>,
    ) -> Result<vk::WriteDescriptorSetBuilder<'a>> {
        let count = acceleration_structures.acceleration_structure_count;
        let mut write = vk::WriteDescriptorSetBuilder::new()
            .dst_set(self.descriptor_sets[index])
            .dst_binding(binding)
            .dst_array_element(0)
            .descriptor_type(self.descriptor_type(binding)?)
            .extend_from(acceleration_structures);
        // Acceleration structure writes carry their count outside the info arrays.
        write.descriptor_count = count;
        Ok(write)
    }

    pub fn update_descriptors(
        &self,
        device: &Device,
        descriptor_writes: &[vk::WriteDescriptorSetBuilder<'_>],
    ) {
        unsafe { device.update_descriptor_sets(descriptor_writes, &[]) }
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
        self.descriptor_set_layout.destroy(device);
    }
}
