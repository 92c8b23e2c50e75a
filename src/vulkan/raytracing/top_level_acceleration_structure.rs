use crate::error::{Error, Result};
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_buffer::CommandBuffer;
use crate::vulkan::device::Device;
use crate::vulkan::raytracing::acceleration_structure;
use crate::vulkan::raytracing::acceleration_structure::AccelerationStructure;
use crate::vulkan::raytracing::raytracing_properties::RaytracingProperties;
use bytemuck::{Pod, Zeroable};
use erupt::vk;
use glam::Mat4;

const MAX_24_BIT: u32 = (1 << 24) - 1;

/// `VkAccelerationStructureInstanceKHR` with its bitfields packed by hand.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InstanceDescriptor {
    /// Row-major 3x4 object to world transform.
    pub transform: [[f32; 4]; 3],
    pub instance_custom_index_and_mask: u32,
    pub sbt_record_offset_and_flags: u32,
    pub acceleration_structure_reference: u64,
}

unsafe impl Zeroable for InstanceDescriptor {}
unsafe impl Pod for InstanceDescriptor {}

impl InstanceDescriptor {
    pub fn new(
        transform: Mat4,
        instance_custom_index: u32,
        mask: u8,
        sbt_record_offset: u32,
        flags: vk::GeometryInstanceFlagsKHR,
        blas_address: vk::DeviceAddress,
    ) -> Result<Self> {
        check_24_bits("instance custom index", instance_custom_index)?;
        check_24_bits("shader binding table record offset", sbt_record_offset)?;

        Ok(InstanceDescriptor {
            transform: row_major_3x4(transform),
            instance_custom_index_and_mask: instance_custom_index | (mask as u32) << 24,
            sbt_record_offset_and_flags: sbt_record_offset | (flags.bits() & 0xFF) << 24,
            acceleration_structure_reference: blas_address,
        })
    }

    pub fn instance_custom_index(&self) -> u32 {
        self.instance_custom_index_and_mask & MAX_24_BIT
    }

    pub fn mask(&self) -> u8 {
        (self.instance_custom_index_and_mask >> 24) as u8
    }

    pub fn sbt_record_offset(&self) -> u32 {
        self.sbt_record_offset_and_flags & MAX_24_BIT
    }

    pub fn flags(&self) -> vk::GeometryInstanceFlagsKHR {
        vk::GeometryInstanceFlagsKHR::from_bits_truncate(self.sbt_record_offset_and_flags >> 24)
    }
}

fn check_24_bits(field: &'static str, value: u32) -> Result<()> {
    if value > MAX_24_BIT {
        return Err(Error::InstanceFieldOverflow { field, value });
    }
    Ok(())
}

fn row_major_3x4(transform: Mat4) -> [[f32; 4]; 3] {
    let rows = transform.transpose().to_cols_array_2d();
    [rows[0], rows[1], rows[2]]
}

pub struct TopLevelAccelerationStructure {
    handle: vk::AccelerationStructureKHR,
    instances: vk::AccelerationStructureGeometryInstancesDataKHR,
    instances_count: u32,
    build_sizes_info: vk::AccelerationStructureBuildSizesInfoKHR,
}

impl AccelerationStructure for TopLevelAccelerationStructure {
    fn build_sizes(&self) -> vk::AccelerationStructureBuildSizesInfoKHR {
        self.build_sizes_info
    }
}

impl TopLevelAccelerationStructure {
    pub fn handle(&self) -> vk::AccelerationStructureKHR {
        self.handle
    }

    pub fn new(
        device: &Device,
        raytracing_properties: &RaytracingProperties,
        instance_address: vk::DeviceAddress,
        instances_count: u32,
    ) -> Self {
        let instances = *vk::AccelerationStructureGeometryInstancesDataKHRBuilder::new()
            .array_of_pointers(false)
            .data(vk::DeviceOrHostAddressConstKHR {
                device_address: instance_address,
            });

        let geometries = [instances_geometry(instances)];
        let build_geometry_info = build_geometry_info(&geometries);

        let build_sizes_info = acceleration_structure::get_acceleration_structure_build_sizes(
            device,
            &build_geometry_info,
            &[instances_count],
            raytracing_properties,
        );

        TopLevelAccelerationStructure {
            handle: vk::AccelerationStructureKHR::null(),
            instances,
            instances_count,
            build_sizes_info,
        }
    }

    pub fn generate(
        &mut self,
        device: &Device,
        command_buffer: &CommandBuffer,
        scratch_buffer: &Buffer,
        scratch_offset: u64,
        result_buffer: &Buffer,
        result_offset: u64,
    ) -> Result<()> {
        let create_info = vk::AccelerationStructureCreateInfoKHRBuilder::new()
            ._type(vk::AccelerationStructureTypeKHR::TOP_LEVEL_KHR)
            .size(self.build_sizes_info.acceleration_structure_size)
            .buffer(result_buffer.handle())
            .offset(result_offset);

        self.handle =
            unsafe { device.create_acceleration_structure_khr(&create_info, None) }.result()?;

        let geometries = [instances_geometry(self.instances)];
        let build_geometry_info = build_geometry_info(&geometries)
            .dst_acceleration_structure(self.handle)
            .scratch_data(vk::DeviceOrHostAddressKHR {
                device_address: scratch_buffer.get_device_address(device) + scratch_offset,
            });

        let build_offset_info = *vk::AccelerationStructureBuildRangeInfoKHRBuilder::new()
            .primitive_count(self.instances_count);

        command_buffer.build_acceleration_structure(
            device,
            &[build_geometry_info],
            &[&build_offset_info as *const _],
        );
        Ok(())
    }

    pub fn destroy(&mut self, device: &Device) {
        if !self.handle.is_null() {
            unsafe {
                device
                    .handle()
                    .destroy_acceleration_structure_khr(self.handle, None);
            }
            self.handle = vk::AccelerationStructureKHR::null();
        }
    }
}

fn instances_geometry(
    instances: vk::AccelerationStructureGeometryInstancesDataKHR,
) -> vk::AccelerationStructureGeometryKHRBuilder<'static> {
    vk::AccelerationStructureGeometryKHRBuilder::new()
        .geometry_type(vk::GeometryTypeKHR::INSTANCES_KHR)
        .geometry(vk::AccelerationStructureGeometryDataKHR { instances })
}

fn build_geometry_info<'a>(
    geometries: &'a [vk::AccelerationStructureGeometryKHRBuilder<'static>],
) -> vk::AccelerationStructureBuildGeometryInfoKHRBuilder<'a> {
    vk::AccelerationStructureBuildGeometryInfoKHRBuilder::new()
        .flags(vk::BuildAccelerationStructureFlagsKHR::PREFER_FAST_TRACE_KHR)
        .geometries(geometries)
        .mode(vk::BuildAccelerationStructureModeKHR::BUILD_KHR)
        ._type(vk::AccelerationStructureTypeKHR::TOP_LEVEL_KHR)
        .src_acceleration_structure(vk::AccelerationStructureKHR::null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;
    use std::mem::size_of;

    #[test]
    fn descriptor_matches_vulkan_layout() {
        assert_eq!(size_of::<InstanceDescriptor>(), 64);
        assert_eq!(
            size_of::<InstanceDescriptor>(),
            size_of::<vk::AccelerationStructureInstanceKHR>()
        );
    }

    #[test]
    fn packs_index_mask_offset_and_flags() {
        let descriptor = InstanceDescriptor::new(
            Mat4::IDENTITY,
            0x00AB_CDEF,
            0xFF,
            2,
            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE_KHR,
            0xDEAD_BEEF,
        )
        .unwrap();

        assert_eq!(descriptor.instance_custom_index_and_mask, 0xFFAB_CDEF);
        assert_eq!(descriptor.instance_custom_index(), 0x00AB_CDEF);
        assert_eq!(descriptor.mask(), 0xFF);
        assert_eq!(descriptor.sbt_record_offset(), 2);
        assert_eq!(
            descriptor.flags(),
            vk::GeometryInstanceFlagsKHR::TRIANGLE_FACING_CULL_DISABLE_KHR
        );
        assert_eq!(descriptor.acceleration_structure_reference, 0xDEAD_BEEF);
    }

    #[test]
    fn rejects_fields_wider_than_24_bits() {
        let too_wide = 1 << 24;
        let index = InstanceDescriptor::new(
            Mat4::IDENTITY,
            too_wide,
            0xFF,
            0,
            vk::GeometryInstanceFlagsKHR::empty(),
            0,
        );
        assert!(matches!(
            index,
            Err(Error::InstanceFieldOverflow { value, .. }) if value == too_wide
        ));

        let offset = InstanceDescriptor::new(
            Mat4::IDENTITY,
            0,
            0xFF,
            too_wide,
            vk::GeometryInstanceFlagsKHR::empty(),
            0,
        );
        assert!(matches!(offset, Err(Error::InstanceFieldOverflow { .. })));

        assert!(InstanceDescriptor::new(
            Mat4::IDENTITY,
            MAX_24_BIT,
            0,
            MAX_24_BIT,
            vk::GeometryInstanceFlagsKHR::empty(),
            0,
        )
        .is_ok());
    }

    #[test]
    fn transform_is_row_major() {
        let transform =
            Mat4::from_translation(vec3(1.0, 2.0, 3.0)) * Mat4::from_scale(vec3(4.0, 5.0, 6.0));
        let descriptor = InstanceDescriptor::new(
            transform,
            0,
            0xFF,
            0,
            vk::GeometryInstanceFlagsKHR::empty(),
            0,
        )
        .unwrap();

        assert_eq!(descriptor.transform[0], [4.0, 0.0, 0.0, 1.0]);
        assert_eq!(descriptor.transform[1], [0.0, 5.0, 0.0, 2.0]);
        assert_eq!(descriptor.transform[2], [0.0, 0.0, 6.0, 3.0]);
    }

    #[test]
    fn transform_sits_at_the_start_of_the_record() {
        let descriptor = InstanceDescriptor::new(
            Mat4::from_translation(vec3(7.0, 0.0, 0.0)),
            5,
            0x0F,
            4,
            vk::GeometryInstanceFlagsKHR::empty(),
            0x1122_3344_5566_7788,
        )
        .unwrap();
        let bytes = bytemuck::bytes_of(&descriptor);
        assert_eq!(f32::from_ne_bytes(bytes[12..16].try_into().unwrap()), 7.0);
        assert_eq!(u32::from_ne_bytes(bytes[48..52].try_into().unwrap()), 0x0F00_0005);
        assert_eq!(u32::from_ne_bytes(bytes[52..56].try_into().unwrap()), 4);
        assert_eq!(
            u64::from_ne_bytes(bytes[56..64].try_into().unwrap()),
            0x1122_3344_5566_7788
        );
    }
}
