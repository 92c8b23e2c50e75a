use crate::error::Result;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::device::Device;
use crate::vulkan::image::subresource_range;
use erupt::vk;

#[derive(Copy, Clone)]
pub struct CommandBuffer {
    handle: vk::CommandBuffer,
}

/// One side of a sync2 dependency.
#[derive(Copy, Clone, Debug)]
pub struct Access {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
}

impl Access {
    pub const RAY_TRACING_WRITE: Access = Access {
        stage: vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        access: vk::AccessFlags2::SHADER_STORAGE_WRITE,
    };
    pub const TRANSFER_READ: Access = Access {
        stage: vk::PipelineStageFlags2::COPY,
        access: vk::AccessFlags2::TRANSFER_READ,
    };
    pub const TRANSFER_WRITE: Access = Access {
        stage: vk::PipelineStageFlags2::COPY,
        access: vk::AccessFlags2::TRANSFER_WRITE,
    };
    pub const HOST_READ: Access = Access {
        stage: vk::PipelineStageFlags2::HOST,
        access: vk::AccessFlags2::HOST_READ,
    };
    pub const ACCELERATION_STRUCTURE_WRITE: Access = Access {
        stage: vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        access: vk::AccessFlags2::ACCELERATION_STRUCTURE_WRITE_KHR,
    };
    pub const ACCELERATION_STRUCTURE_READ: Access = Access {
        stage: vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        access: vk::AccessFlags2::ACCELERATION_STRUCTURE_READ_KHR,
    };
}

impl CommandBuffer {
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    pub fn new(handle: vk::CommandBuffer) -> Self {
        CommandBuffer { handle }
    }

    pub fn begin(&self, device: &Device) -> Result<()> {
        let begin_info = vk::CommandBufferBeginInfoBuilder::new()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe { device.begin_command_buffer(self.handle, &begin_info) }.result()?;
        Ok(())
    }

    pub fn end(&self, device: &Device) -> Result<()> {
        unsafe { device.end_command_buffer(self.handle) }.result()?;
        Ok(())
    }

    pub fn reset(&self, device: &Device) -> Result<()> {
        unsafe { device.reset_command_buffer(self.handle, vk::CommandBufferResetFlags::empty()) }
            .result()?;
        Ok(())
    }

    pub fn bind_pipeline(
        &self,
        device: &Device,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
    ) {
        unsafe {
            device.cmd_bind_pipeline(self.handle, bind_point, pipeline);
        }
    }

    pub fn bind_descriptor_sets(
        &self,
        device: &Device,
        bind_point: vk::PipelineBindPoint,
        pipeline_layout: vk::PipelineLayout,
        descriptor_sets: &[vk::DescriptorSet],
    ) {
        unsafe {
            device.cmd_bind_descriptor_sets(
                self.handle,
                bind_point,
                pipeline_layout,
                0,
                descriptor_sets,
                &[],
            );
        }
    }

    pub fn image_memory_barrier(
        &self,
        device: &Device,
        image: vk::Image,
        src: Access,
        dst: Access,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
    ) {
        let image_barriers = [vk::ImageMemoryBarrier2Builder::new()
            .src_stage_mask(src.stage)
            .src_access_mask(src.access)
            .dst_stage_mask(dst.stage)
            .dst_access_mask(dst.access)
            .old_layout(old_layout)
            .new_layout(new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(image)
            .subresource_range(subresource_range(vk::ImageAspectFlags::COLOR))];

        let dependency_info = vk::DependencyInfoBuilder::new().image_memory_barriers(&image_barriers);
        unsafe {
            device.cmd_pipeline_barrier2(self.handle, &dependency_info);
        }
    }

    pub fn memory_barrier(&self, device: &Device, src: Access, dst: Access) {
        let memory_barriers = [vk::MemoryBarrier2Builder::new()
            .src_stage_mask(src.stage)
            .src_access_mask(src.access)
            .dst_stage_mask(dst.stage)
            .dst_access_mask(dst.access)];

        let dependency_info = vk::DependencyInfoBuilder::new().memory_barriers(&memory_barriers);
        unsafe {
            device.cmd_pipeline_barrier2(self.handle, &dependency_info);
        }
    }

    pub fn build_acceleration_structure(
        &self,
        device: &Device,
        build_geometry_infos: &[vk::AccelerationStructureBuildGeometryInfoKHRBuilder],
        build_range_infos: &[*const vk::AccelerationStructureBuildRangeInfoKHR],
    ) {
        unsafe {
            device.cmd_build_acceleration_structures_khr(
                self.handle,
                build_geometry_infos,
                build_range_infos,
            );
        }
    }

    pub fn trace_rays(
        &self,
        device: &Device,
        raygen: &vk::StridedDeviceAddressRegionKHR,
        miss: &vk::StridedDeviceAddressRegionKHR,
        hit: &vk::StridedDeviceAddressRegionKHR,
        callable: &vk::StridedDeviceAddressRegionKHR,
        extent: vk::Extent2D,
    ) {
        unsafe {
            device.cmd_trace_rays_khr(
                self.handle,
                raygen,
                miss,
                hit,
                callable,
                extent.width,
                extent.height,
                1,
            );
        }
    }

    /// Copies a whole color image into `buffer` with tightly packed rows.
    pub fn copy_image_to_buffer(
        &self,
        device: &Device,
        image: vk::Image,
        extent: vk::Extent2D,
        buffer: &Buffer,
    ) {
        let region = [vk::BufferImageCopyBuilder::new()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })];

        unsafe {
            device.cmd_copy_image_to_buffer(
                self.handle,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                buffer.handle(),
                &region,
            );
        }
    }
}
