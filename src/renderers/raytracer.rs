use crate::config::RenderConfig;
use crate::error::Result;
use crate::renderers::shader_groups::{self, ShaderStage, PROCEDURAL_INSTANCE_RECORD_OFFSET};
use crate::renderers::{FrameState, Renderer, SceneConstants};
use crate::scene::animation::PrimitiveTransform;
use crate::scene::{plane_vertices, PlaneVertex, SceneDescription, PLANE_INDICES};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_buffer::{Access, CommandBuffer};
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::descriptor_set_layout::DescriptorBinding;
use crate::vulkan::descriptor_set_manager::DescriptorSetManager;
use crate::vulkan::device::Device;
use crate::vulkan::image::Image;
use crate::vulkan::pipeline_layout::PipelineLayout;
use crate::vulkan::raytracing::acceleration_structure::{
    get_total_memory_requirements, AccelerationStructure, ACCELERATION_STRUCTURE_ALIGNMENT,
};
use crate::vulkan::raytracing::bottom_level_acceleration_structure::BottomLevelAccelerationStructure;
use crate::vulkan::raytracing::bottom_level_geometry::{
    AabbPositions, BottomLevelGeometry, TriangleGeometry,
};
use crate::vulkan::raytracing::raytracing_pipeline::{clamp_recursion_depth, RaytracingPipeline};
use crate::vulkan::raytracing::raytracing_properties::RaytracingProperties;
use crate::vulkan::raytracing::shader_binding_table::ShaderBindingTable;
use crate::vulkan::raytracing::top_level_acceleration_structure::{
    InstanceDescriptor, TopLevelAccelerationStructure,
};
use crate::vulkan::shader_module::ShaderModule;
use crate::vulkan::uniform_buffer::UniformBuffer;
use crevice::std430::{AsStd430, Std430};
use erupt::vk;
use std::mem::size_of;
use strum::IntoEnumIterator;

pub const FRAMES_IN_FLIGHT: usize = 2;

pub const OUTPUT_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

const TLAS_BINDING: u32 = 0;
const OUTPUT_IMAGE_BINDING: u32 = 1;
const SCENE_CONSTANTS_BINDING: u32 = 2;
const PRIMITIVE_TRANSFORMS_BINDING: u32 = 3;
const PLANE_VERTICES_BINDING: u32 = 4;
const PLANE_INDICES_BINDING: u32 = 5;

const INSTANCE_MASK: u8 = 0xFF;
const PLANE_INSTANCE_RECORD_OFFSET: u32 = 0;

fn descriptor_bindings() -> [DescriptorBinding; 6] {
    let all_stages = vk::ShaderStageFlags::RAYGEN_KHR
        | vk::ShaderStageFlags::MISS_KHR
        | vk::ShaderStageFlags::CLOSEST_HIT_KHR
        | vk::ShaderStageFlags::INTERSECTION_KHR;
    [
        DescriptorBinding::new(
            TLAS_BINDING,
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR,
            vk::ShaderStageFlags::RAYGEN_KHR | vk::ShaderStageFlags::CLOSEST_HIT_KHR,
        ),
        DescriptorBinding::new(
            OUTPUT_IMAGE_BINDING,
            vk::DescriptorType::STORAGE_IMAGE,
            vk::ShaderStageFlags::RAYGEN_KHR,
        ),
        DescriptorBinding::new(
            SCENE_CONSTANTS_BINDING,
            vk::DescriptorType::UNIFORM_BUFFER,
            all_stages,
        ),
        DescriptorBinding::new(
            PRIMITIVE_TRANSFORMS_BINDING,
            vk::DescriptorType::STORAGE_BUFFER,
            vk::ShaderStageFlags::INTERSECTION_KHR | vk::ShaderStageFlags::CLOSEST_HIT_KHR,
        ),
        // Plane vertices and indices
        DescriptorBinding::new(
            PLANE_VERTICES_BINDING,
            vk::DescriptorType::STORAGE_BUFFER,
            vk::ShaderStageFlags::CLOSEST_HIT_KHR,
        ),
        DescriptorBinding::new(
            PLANE_INDICES_BINDING,
            vk::DescriptorType::STORAGE_BUFFER,
            vk::ShaderStageFlags::CLOSEST_HIT_KHR,
        ),
    ]
}

/// TLAS instances: the plane, then the procedural BLAS lifted by the scene
/// elevation. Each instance's record offset selects its block of hit records.
fn instance_descriptors(
    scene: &SceneDescription,
    plane_address: vk::DeviceAddress,
    procedural_address: vk::DeviceAddress,
) -> Result<[InstanceDescriptor; 2]> {
    let flags = vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE_KHR;
    Ok([
        InstanceDescriptor::new(
            scene.plane_transform(),
            0,
            INSTANCE_MASK,
            PLANE_INSTANCE_RECORD_OFFSET,
            flags,
            plane_address,
        )?,
        InstanceDescriptor::new(
            scene.procedural_transform(),
            1,
            INSTANCE_MASK,
            PROCEDURAL_INSTANCE_RECORD_OFFSET,
            flags,
            procedural_address,
        )?,
    ])
}

/// Offsets of consecutive structures packed into one buffer. Sizes coming
/// from `align_build_sizes` keep every offset aligned.
fn packed_offsets<T: AccelerationStructure>(structures: &[T]) -> Vec<(u64, u64)> {
    let mut result_offset = 0;
    let mut scratch_offset = 0;
    structures
        .iter()
        .map(|structure| {
            let offsets = (result_offset, scratch_offset);
            result_offset += structure.build_sizes().acceleration_structure_size;
            scratch_offset += structure.build_sizes().build_scratch_size;
            offsets
        })
        .collect()
}

fn transforms_bytes(transforms: &[PrimitiveTransform]) -> Vec<u8> {
    transforms
        .iter()
        .flat_map(|transform| transform.as_std430().as_bytes().to_vec())
        .collect()
}

/// Records every bottom level build, then the top level build once the
/// instances point at the finished bottom level structures.
#[allow(clippy::too_many_arguments)]
fn record_builds(
    device: &Device,
    command_buffer: &CommandBuffer,
    scene: &SceneDescription,
    bottom_structures: &mut [BottomLevelAccelerationStructure],
    (blas_buffer, blas_scratch_buffer): (&Buffer, &Buffer),
    top_structure: &mut TopLevelAccelerationStructure,
    (tlas_buffer, tlas_scratch_buffer): (&Buffer, &Buffer),
    instances_buffer: &mut Buffer,
) -> Result<()> {
    let offsets = packed_offsets(bottom_structures);
    for (blas, (result_offset, scratch_offset)) in bottom_structures.iter_mut().zip(offsets) {
        blas.generate(
            device,
            command_buffer,
            blas_scratch_buffer,
            scratch_offset,
            blas_buffer,
            result_offset,
        )?;
    }

    let instances = instance_descriptors(
        scene,
        bottom_structures[0].get_address(device),
        bottom_structures[1].get_address(device),
    )?;
    instances_buffer.write_data(device, &instances, 0)?;

    command_buffer.memory_barrier(
        device,
        Access::ACCELERATION_STRUCTURE_WRITE,
        Access::ACCELERATION_STRUCTURE_READ,
    );

    top_structure.generate(
        device,
        command_buffer,
        tlas_scratch_buffer,
        0,
        tlas_buffer,
        0,
    )
}

pub struct Raytracer {
    pipeline: RaytracingPipeline,
    pipeline_layout: PipelineLayout,
    descriptor_set_manager: DescriptorSetManager,
    shader_binding_table: ShaderBindingTable,
    bottom_structures: Vec<BottomLevelAccelerationStructure>,
    top_structure: TopLevelAccelerationStructure,
    blas_buffer: Buffer,
    blas_scratch_buffer: Buffer,
    tlas_buffer: Buffer,
    tlas_scratch_buffer: Buffer,
    instances_buffer: Buffer,
    plane_vertex_buffer: Buffer,
    plane_index_buffer: Buffer,
    aabb_buffer: Buffer,
    uniform_buffers: Vec<UniformBuffer>,
    transform_buffers: Vec<Buffer>,
    output_image: Image,
    primitive_count: usize,
}

impl Raytracer {
    pub fn new(
        device: &Device,
        raytracing_properties: &RaytracingProperties,
        config: &RenderConfig,
        scene: &SceneDescription,
    ) -> Result<Self> {
        let descriptor_set_manager =
            DescriptorSetManager::new(device, &descriptor_bindings(), FRAMES_IN_FLIGHT)?;

        let pipeline_layout =
            PipelineLayout::new(device, &[descriptor_set_manager.descriptor_set_layout()])?;

        // pipeline
        let raytracing_shader = ShaderModule::raytracing(device, &config.shader_path)?;
        let shader_stages = ShaderStage::iter()
            .map(|stage| raytracing_shader.shader_stage(stage.flag(), stage.entry_point()))
            .collect::<Vec<_>>();
        let recursion_depth = clamp_recursion_depth(
            config.max_recursion_depth,
            raytracing_properties.max_ray_recursion_depth(),
        );
        if recursion_depth < config.max_recursion_depth {
            log::warn!(
                "Device limits ray recursion to {}, requested {}",
                recursion_depth,
                config.max_recursion_depth
            );
        }
        let pipeline = RaytracingPipeline::new(
            device,
            pipeline_layout.handle(),
            &shader_stages,
            &shader_groups::shader_groups(),
            recursion_depth,
        );
        raytracing_shader.destroy(device);
        let pipeline = pipeline?;

        // geometry
        let geometry_usage = vk::BufferUsageFlags::STORAGE_BUFFER
            | vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        let vertices = plane_vertices();
        let plane_vertex_buffer = Buffer::with_data(device, &vertices, geometry_usage)?;
        let plane_index_buffer = Buffer::with_data(device, &PLANE_INDICES, geometry_usage)?;

        let primitives = scene.primitives();
        let aabbs = primitives
            .iter()
            .map(|primitive| primitive.aabb())
            .collect::<Vec<AabbPositions>>();
        let aabb_buffer = Buffer::with_data(device, &aabbs, geometry_usage)?;

        let mut plane_geometry = BottomLevelGeometry::default();
        plane_geometry.add_geometry_triangles(
            &TriangleGeometry {
                vertex_address: plane_vertex_buffer.get_device_address(device),
                vertex_stride: size_of::<PlaneVertex>() as u64,
                vertex_count: vertices.len() as u32,
                index_address: plane_index_buffer.get_device_address(device),
                index_type: vk::IndexType::UINT16,
                index_count: PLANE_INDICES.len() as u32,
            },
            true,
        );

        let aabb_address = aabb_buffer.get_device_address(device);
        let mut procedural_geometry = BottomLevelGeometry::default();
        for index in 0..primitives.len() as u32 {
            procedural_geometry.add_geometry_aabb(aabb_address, index, true);
        }

        // acceleration structures
        let mut bottom_structures = vec![
            BottomLevelAccelerationStructure::new(device, raytracing_properties, plane_geometry),
            BottomLevelAccelerationStructure::new(
                device,
                raytracing_properties,
                procedural_geometry,
            ),
        ];

        let scratch_alignment =
            raytracing_properties.min_acceleration_structure_scratch_offset_alignment() as u64;
        let storage_usage = vk::BufferUsageFlags::ACCELERATION_STRUCTURE_STORAGE_KHR
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        let scratch_usage =
            vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        let device_local =
            gpu_alloc::UsageFlags::FAST_DEVICE_ACCESS | gpu_alloc::UsageFlags::DEVICE_ADDRESS;

        let blas_memory_requirements = get_total_memory_requirements(&bottom_structures);
        let blas_buffer = Buffer::empty_aligned(
            device,
            blas_memory_requirements.acceleration_structure_size,
            storage_usage,
            device_local,
            ACCELERATION_STRUCTURE_ALIGNMENT,
        )?;
        let blas_scratch_buffer = Buffer::empty_aligned(
            device,
            blas_memory_requirements.build_scratch_size,
            scratch_usage,
            device_local,
            scratch_alignment,
        )?;

        let mut instances_buffer = Buffer::empty(
            device,
            (2 * size_of::<InstanceDescriptor>()) as u64,
            vk::BufferUsageFlags::ACCELERATION_STRUCTURE_BUILD_INPUT_READ_ONLY_KHR
                | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS,
            gpu_alloc::UsageFlags::HOST_ACCESS | gpu_alloc::UsageFlags::DEVICE_ADDRESS,
        )?;

        let mut top_structure = TopLevelAccelerationStructure::new(
            device,
            raytracing_properties,
            instances_buffer.get_device_address(device),
            2,
        );
        let tlas_memory_requirements = top_structure.build_sizes();
        let tlas_buffer = Buffer::empty_aligned(
            device,
            tlas_memory_requirements.acceleration_structure_size,
            storage_usage,
            device_local,
            ACCELERATION_STRUCTURE_ALIGNMENT,
        )?;
        let tlas_scratch_buffer = Buffer::empty_aligned(
            device,
            tlas_memory_requirements.build_scratch_size,
            scratch_usage,
            device_local,
            scratch_alignment,
        )?;

        log::info!(
            "Acceleration structures: bottom level {} bytes (scratch {}), top level {} bytes (scratch {})",
            blas_memory_requirements.acceleration_structure_size,
            blas_memory_requirements.build_scratch_size,
            tlas_memory_requirements.acceleration_structure_size,
            tlas_memory_requirements.build_scratch_size
        );

        let mut recorded = Ok(());
        CommandPool::single_time_submit(device, |command_buffer| {
            recorded = record_builds(
                device,
                &command_buffer,
                scene,
                &mut bottom_structures,
                (&blas_buffer, &blas_scratch_buffer),
                &mut top_structure,
                (&tlas_buffer, &tlas_scratch_buffer),
                &mut instances_buffer,
            );
        })?;
        recorded?;

        // per frame resources
        let uniform_buffers = (0..FRAMES_IN_FLIGHT)
            .map(|_| UniformBuffer::new::<SceneConstants>(device))
            .collect::<Result<Vec<_>>>()?;
        let transforms_size =
            (PrimitiveTransform::std430_size_static() * primitives.len()) as u64;
        let transform_buffers = (0..FRAMES_IN_FLIGHT)
            .map(|_| {
                Buffer::empty(
                    device,
                    transforms_size,
                    vk::BufferUsageFlags::STORAGE_BUFFER,
                    gpu_alloc::UsageFlags::HOST_ACCESS | gpu_alloc::UsageFlags::UPLOAD,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let shader_binding_table = ShaderBindingTable::new(
            device,
            pipeline.handle(),
            pipeline.group_count(),
            &raytracing_properties.shader_group_limits(),
            &shader_groups::raygen_records(),
            &shader_groups::miss_records(),
            &shader_groups::hit_records(scene),
        )?;

        let output_image = Image::new(
            device,
            vk::Extent2D {
                width: config.width,
                height: config.height,
            },
            OUTPUT_FORMAT,
            vk::ImageTiling::OPTIMAL,
            vk::ImageUsageFlags::STORAGE | vk::ImageUsageFlags::TRANSFER_SRC,
            vk::ImageAspectFlags::COLOR,
        )?;

        let raytracer = Raytracer {
            pipeline,
            pipeline_layout,
            descriptor_set_manager,
            shader_binding_table,
            bottom_structures,
            top_structure,
            blas_buffer,
            blas_scratch_buffer,
            tlas_buffer,
            tlas_scratch_buffer,
            instances_buffer,
            plane_vertex_buffer,
            plane_index_buffer,
            aabb_buffer,
            uniform_buffers,
            transform_buffers,
            output_image,
            primitive_count: primitives.len(),
        };
        raytracer.update_descriptors(device)?;
        Ok(raytracer)
    }

    fn update_descriptors(&self, device: &Device) -> Result<()> {
        for i in 0..FRAMES_IN_FLIGHT {
            let top_structures_handle = [self.top_structure.handle()];
            let mut top_structures_info =
                vk::WriteDescriptorSetAccelerationStructureKHRBuilder::new()
                    .acceleration_structures(&top_structures_handle);

            let output_image_info = [vk::DescriptorImageInfoBuilder::new()
                .image_view(self.output_image.view())
                .image_layout(vk::ImageLayout::GENERAL)];

            let uniform_buffer_info = [vk::DescriptorBufferInfoBuilder::new()
                .buffer(self.uniform_buffers[i].buffer().handle())
                .range(vk::WHOLE_SIZE)];

            let transform_buffer_info = [vk::DescriptorBufferInfoBuilder::new()
                .buffer(self.transform_buffers[i].handle())
                .range(vk::WHOLE_SIZE)];

            let vertex_buffer_info = [vk::DescriptorBufferInfoBuilder::new()
                .buffer(self.plane_vertex_buffer.handle())
                .range(vk::WHOLE_SIZE)];

            let index_buffer_info = [vk::DescriptorBufferInfoBuilder::new()
                .buffer(self.plane_index_buffer.handle())
                .range(vk::WHOLE_SIZE)];

            let descriptor_writes = [
                self.descriptor_set_manager.bind_acceleration_structure(
                    i,
                    TLAS_BINDING,
                    &mut top_structures_info,
                )?,
                self.descriptor_set_manager
                    .bind_image(i, OUTPUT_IMAGE_BINDING, &output_image_info)?,
                self.descriptor_set_manager
                    .bind_buffer(i, SCENE_CONSTANTS_BINDING, &uniform_buffer_info)?,
                self.descriptor_set_manager.bind_buffer(
                    i,
                    PRIMITIVE_TRANSFORMS_BINDING,
                    &transform_buffer_info,
                )?,
                self.descriptor_set_manager
                    .bind_buffer(i, PLANE_VERTICES_BINDING, &vertex_buffer_info)?,
                self.descriptor_set_manager
                    .bind_buffer(i, PLANE_INDICES_BINDING, &index_buffer_info)?,
            ];

            self.descriptor_set_manager
                .update_descriptors(device, &descriptor_writes);
        }
        Ok(())
    }
}

impl Renderer for Raytracer {
    fn update(&mut self, device: &Device, current_frame: usize, frame: &FrameState) -> Result<()> {
        debug_assert_eq!(frame.transforms.len(), self.primitive_count);
        let constants = SceneConstants {
            max_recursion_depth: frame
                .constants
                .max_recursion_depth
                .min(self.pipeline.max_recursion_depth()),
            ..frame.constants
        };
        self.uniform_buffers[current_frame].update(device, &constants)?;
        self.transform_buffers[current_frame].write_bytes(
            device,
            &transforms_bytes(&frame.transforms),
            0,
        )
    }

    fn fill_command_buffer(
        &self,
        device: &Device,
        command_buffer: &CommandBuffer,
        current_frame: usize,
    ) {
        // The previous frame's copy may still be reading the image.
        command_buffer.image_memory_barrier(
            device,
            self.output_image.handle(),
            Access::TRANSFER_READ,
            Access::RAY_TRACING_WRITE,
            vk::ImageLayout::UNDEFINED,
            vk::ImageLayout::GENERAL,
        );

        command_buffer.bind_pipeline(
            device,
            vk::PipelineBindPoint::RAY_TRACING_KHR,
            self.pipeline.handle(),
        );

        command_buffer.bind_descriptor_sets(
            device,
            vk::PipelineBindPoint::RAY_TRACING_KHR,
            self.pipeline_layout.handle(),
            &[self.descriptor_set_manager.descriptor_set(current_frame)],
        );

        command_buffer.trace_rays(
            device,
            &self.shader_binding_table.raygen_device_region(),
            &self.shader_binding_table.miss_device_region(),
            &self.shader_binding_table.hit_device_region(),
            &self.shader_binding_table.callable_device_region(),
            self.output_image.extent(),
        );

        command_buffer.image_memory_barrier(
            device,
            self.output_image.handle(),
            Access::RAY_TRACING_WRITE,
            Access::TRANSFER_READ,
            vk::ImageLayout::GENERAL,
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        );
    }

    fn output_image(&self) -> &Image {
        &self.output_image
    }

    fn destroy(&mut self, device: &Device) {
        self.pipeline.destroy(device);
        self.pipeline_layout.destroy(device);
        self.descriptor_set_manager.destroy(device);
        self.shader_binding_table.destroy(device);

        self.top_structure.destroy(device);
        for blas in &mut self.bottom_structures {
            blas.destroy(device);
        }

        for buffer in [
            &mut self.tlas_buffer,
            &mut self.tlas_scratch_buffer,
            &mut self.blas_buffer,
            &mut self.blas_scratch_buffer,
            &mut self.instances_buffer,
            &mut self.aabb_buffer,
            &mut self.plane_vertex_buffer,
            &mut self.plane_index_buffer,
        ] {
            buffer.destroy(device);
        }
        for uniform_buffer in &mut self.uniform_buffers {
            uniform_buffer.destroy(device);
        }
        for buffer in &mut self.transform_buffers {
            buffer.destroy(device);
        }
        self.output_image.destroy(device);
        log::debug!("Destroyed ray tracer");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ScenePreset;
    use glam::{vec3, Mat4};
    use std::collections::HashSet;

    struct FixedSizes(vk::AccelerationStructureBuildSizesInfoKHR);

    impl AccelerationStructure for FixedSizes {
        fn build_sizes(&self) -> vk::AccelerationStructureBuildSizesInfoKHR {
            self.0
        }
    }

    fn sized(size: u64, scratch: u64) -> FixedSizes {
        FixedSizes(vk::AccelerationStructureBuildSizesInfoKHR {
            acceleration_structure_size: size,
            build_scratch_size: scratch,
            ..Default::default()
        })
    }

    #[test]
    fn bindings_are_unique_and_in_order() {
        let bindings = descriptor_bindings();
        let numbers = bindings.iter().map(|b| b.binding).collect::<Vec<_>>();
        assert_eq!(numbers, (0..bindings.len() as u32).collect::<Vec<_>>());
        assert_eq!(
            numbers.iter().collect::<HashSet<_>>().len(),
            bindings.len()
        );
        assert_eq!(
            bindings[TLAS_BINDING as usize].descriptor_type,
            vk::DescriptorType::ACCELERATION_STRUCTURE_KHR
        );
        assert!(bindings[SCENE_CONSTANTS_BINDING as usize]
            .stages
            .contains(vk::ShaderStageFlags::INTERSECTION_KHR));
    }

    #[test]
    fn instances_select_their_hit_records() {
        let scene = SceneDescription::preset(ScenePreset::Spheres);
        let [plane, procedural] = instance_descriptors(&scene, 0x1000, 0x2000).unwrap();

        assert_eq!(plane.sbt_record_offset(), 0);
        assert_eq!(plane.acceleration_structure_reference, 0x1000);
        assert_eq!(procedural.sbt_record_offset(), PROCEDURAL_INSTANCE_RECORD_OFFSET);
        assert_eq!(procedural.acceleration_structure_reference, 0x2000);
        assert_eq!(plane.mask(), 0xFF);
        assert_eq!(procedural.mask(), 0xFF);
    }

    #[test]
    fn procedural_instance_is_lifted_by_elevation() {
        let scene = SceneDescription {
            elevation: 2.5,
            ..SceneDescription::preset(ScenePreset::Metaballs)
        };
        let [_, procedural] = instance_descriptors(&scene, 0, 0).unwrap();
        let translation = vec3(
            procedural.transform[0][3],
            procedural.transform[1][3],
            procedural.transform[2][3],
        );
        assert_eq!(translation, vec3(0.0, 2.5, 0.0));
        assert_eq!(procedural.transform[0][0], 1.0);
    }

    #[test]
    fn structures_pack_back_to_back() {
        let structures = [sized(512, 128), sized(256, 64), sized(1024, 0)];
        let offsets = packed_offsets(&structures);
        assert_eq!(offsets, vec![(0, 0), (512, 128), (768, 192)]);
        let total = get_total_memory_requirements(&structures);
        assert_eq!(total.acceleration_structure_size, 1792);
        assert_eq!(total.build_scratch_size, 192);
    }

    #[test]
    fn transforms_are_written_in_std430_layout() {
        let transforms = [
            PrimitiveTransform::new(Mat4::from_translation(vec3(1.0, 2.0, 3.0))),
            PrimitiveTransform::new(Mat4::IDENTITY),
        ];
        let bytes = transforms_bytes(&transforms);
        assert_eq!(bytes.len(), 2 * PrimitiveTransform::std430_size_static());
        assert_eq!(PrimitiveTransform::std430_size_static(), 128);

        // column 3 row 0 of the first matrix holds the x translation
        let x = f32::from_ne_bytes(bytes[48..52].try_into().unwrap());
        assert_eq!(x, 1.0);
        let inverse_x = f32::from_ne_bytes(bytes[112..116].try_into().unwrap());
        assert_eq!(inverse_x, -1.0);
    }
}
