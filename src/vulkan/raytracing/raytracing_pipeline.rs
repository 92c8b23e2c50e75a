use crate::error::{Error, Result};
use crate::vulkan::device::Device;
use erupt::vk;

/// Shader group description, with stages referenced by their index in the
/// pipeline's stage list.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ShaderGroup {
    General(u32),
    Triangles {
        closest_hit: Option<u32>,
    },
    Procedural {
        closest_hit: Option<u32>,
        intersection: u32,
    },
}

impl ShaderGroup {
    pub fn create_info(&self) -> vk::RayTracingShaderGroupCreateInfoKHRBuilder<'static> {
        let (group_type, general, closest_hit, intersection) = match *self {
            ShaderGroup::General(stage) => (
                vk::RayTracingShaderGroupTypeKHR::GENERAL_KHR,
                stage,
                vk::SHADER_UNUSED_KHR,
                vk::SHADER_UNUSED_KHR,
            ),
            ShaderGroup::Triangles { closest_hit } => (
                vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP_KHR,
                vk::SHADER_UNUSED_KHR,
                closest_hit.unwrap_or(vk::SHADER_UNUSED_KHR),
                vk::SHADER_UNUSED_KHR,
            ),
            ShaderGroup::Procedural {
                closest_hit,
                intersection,
            } => (
                vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP_KHR,
                vk::SHADER_UNUSED_KHR,
                closest_hit.unwrap_or(vk::SHADER_UNUSED_KHR),
                intersection,
            ),
        };

        vk::RayTracingShaderGroupCreateInfoKHRBuilder::new()
            ._type(group_type)
            .general_shader(general)
            .closest_hit_shader(closest_hit)
            .any_hit_shader(vk::SHADER_UNUSED_KHR)
            .intersection_shader(intersection)
    }
}

/// Recursion depth the pipeline is created with.
pub fn clamp_recursion_depth(requested: u32, device_max: u32) -> u32 {
    requested.min(device_max).max(1)
}

pub struct RaytracingPipeline {
    handle: vk::Pipeline,
    group_count: u32,
    max_recursion_depth: u32,
}

impl RaytracingPipeline {
    pub fn handle(&self) -> vk::Pipeline {
        self.handle
    }

    pub fn group_count(&self) -> u32 {
        self.group_count
    }

    pub fn max_recursion_depth(&self) -> u32 {
        self.max_recursion_depth
    }

    pub fn new(
        device: &Device,
        pipeline_layout: vk::PipelineLayout,
        shader_stages: &[vk::PipelineShaderStageCreateInfoBuilder<'_>],
        shader_groups: &[ShaderGroup],
        max_recursion_depth: u32,
    ) -> Result<Self> {
        let group_infos = shader_groups
            .iter()
            .map(ShaderGroup::create_info)
            .collect::<Vec<_>>();

        let pipeline_info = [vk::RayTracingPipelineCreateInfoKHRBuilder::new()
            .stages(shader_stages)
            .groups(&group_infos)
            .max_pipeline_ray_recursion_depth(max_recursion_depth)
            .layout(pipeline_layout)
            .base_pipeline_handle(vk::Pipeline::null())
            .base_pipeline_index(-1)];

        let pipelines = unsafe {
            device.create_ray_tracing_pipelines_khr(
                vk::DeferredOperationKHR::null(),
                vk::PipelineCache::null(),
                &pipeline_info,
                None,
            )
        }
        .result()?;

        let handle = pipelines
            .first()
            .copied()
            .ok_or(Error::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED))?;

        log::info!(
            "Created ray tracing pipeline: {} stages, {} groups, recursion depth {}",
            shader_stages.len(),
            shader_groups.len(),
            max_recursion_depth
        );

        Ok(RaytracingPipeline {
            handle,
            group_count: shader_groups.len() as u32,
            max_recursion_depth,
        })
    }

    pub fn destroy(&self, device: &Device) {
        unsafe {
            device.destroy_pipeline(self.handle, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_groups_reference_one_stage() {
        let info = ShaderGroup::General(2).create_info();
        assert_eq!(info._type, vk::RayTracingShaderGroupTypeKHR::GENERAL_KHR);
        assert_eq!(info.general_shader, 2);
        assert_eq!(info.closest_hit_shader, vk::SHADER_UNUSED_KHR);
        assert_eq!(info.intersection_shader, vk::SHADER_UNUSED_KHR);
    }

    #[test]
    fn shadow_hit_groups_have_no_closest_hit() {
        let triangles = ShaderGroup::Triangles { closest_hit: None }.create_info();
        assert_eq!(
            triangles._type,
            vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP_KHR
        );
        assert_eq!(triangles.closest_hit_shader, vk::SHADER_UNUSED_KHR);

        let procedural = ShaderGroup::Procedural {
            closest_hit: None,
            intersection: 5,
        }
        .create_info();
        assert_eq!(
            procedural._type,
            vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP_KHR
        );
        assert_eq!(procedural.closest_hit_shader, vk::SHADER_UNUSED_KHR);
        assert_eq!(procedural.intersection_shader, 5);
        assert_eq!(procedural.general_shader, vk::SHADER_UNUSED_KHR);
    }

    #[test]
    fn recursion_depth_respects_device_limit() {
        assert_eq!(clamp_recursion_depth(6, 31), 6);
        assert_eq!(clamp_recursion_depth(6, 1), 1);
        assert_eq!(clamp_recursion_depth(0, 31), 1);
    }
}
