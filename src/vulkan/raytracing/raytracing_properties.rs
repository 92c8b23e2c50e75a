use crate::vulkan::device::Device;
use crate::vulkan::instance::Instance;
use crate::vulkan::raytracing::shader_binding_table::ShaderGroupLimits;
use erupt::{vk, ExtendableFrom};

#[derive(Copy, Clone)]
pub struct RaytracingProperties {
    acceleration_properties: vk::PhysicalDeviceAccelerationStructurePropertiesKHR,
    pipeline_properties: vk::PhysicalDeviceRayTracingPipelinePropertiesKHR,
}

impl RaytracingProperties {
    pub fn new(device: &Device, instance: &Instance) -> Self {
        let mut acceleration_properties =
            vk::PhysicalDeviceAccelerationStructurePropertiesKHR::default();
        let mut pipeline_properties = vk::PhysicalDeviceRayTracingPipelinePropertiesKHR::default();
        let mut properties = vk::PhysicalDeviceProperties2Builder::default()
            .extend_from(&mut acceleration_properties)
            .extend_from(&mut pipeline_properties);

        *properties = unsafe {
            instance
                .handle()
                .get_physical_device_properties2(device.physical_device(), Some(*properties))
        };

        let properties = RaytracingProperties {
            acceleration_properties,
            pipeline_properties,
        };
        log::debug!(
            "Shader group handle size {}, base alignment {}, max recursion {}",
            properties.shader_group_handle_size(),
            properties.shader_group_base_alignment(),
            properties.max_ray_recursion_depth()
        );
        properties
    }

    pub fn min_acceleration_structure_scratch_offset_alignment(&self) -> u32 {
        self.acceleration_properties
            .min_acceleration_structure_scratch_offset_alignment
    }

    pub fn shader_group_handle_size(&self) -> u32 {
        self.pipeline_properties.shader_group_handle_size
    }

    pub fn shader_group_handle_alignment(&self) -> u32 {
        self.pipeline_properties.shader_group_handle_alignment
    }

    pub fn shader_group_base_alignment(&self) -> u32 {
        self.pipeline_properties.shader_group_base_alignment
    }

    pub fn max_shader_group_stride(&self) -> u32 {
        self.pipeline_properties.max_shader_group_stride
    }

    pub fn max_ray_recursion_depth(&self) -> u32 {
        self.pipeline_properties.max_ray_recursion_depth
    }

    pub fn shader_group_limits(&self) -> ShaderGroupLimits {
        ShaderGroupLimits {
            handle_size: self.shader_group_handle_size(),
            handle_alignment: self.shader_group_handle_alignment(),
            base_alignment: self.shader_group_base_alignment(),
            max_stride: self.max_shader_group_stride(),
        }
    }
}
