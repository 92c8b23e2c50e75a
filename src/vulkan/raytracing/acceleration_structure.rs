use crate::vulkan::device::Device;
use crate::vulkan::raytracing::raytracing_properties::RaytracingProperties;
use erupt::vk;

/// Acceleration structure storage must start on a 256 byte boundary.
pub const ACCELERATION_STRUCTURE_ALIGNMENT: u64 = 256;

pub trait AccelerationStructure {
    fn build_sizes(&self) -> vk::AccelerationStructureBuildSizesInfoKHR;
}

pub fn get_acceleration_structure_build_sizes(
    device: &Device,
    build_geometry_info: &vk::AccelerationStructureBuildGeometryInfoKHR,
    max_primitive_counts: &[u32],
    raytracing_properties: &RaytracingProperties,
) -> vk::AccelerationStructureBuildSizesInfoKHR {
    let size_info = unsafe {
        device.handle().get_acceleration_structure_build_sizes_khr(
            vk::AccelerationStructureBuildTypeKHR::DEVICE_KHR,
            build_geometry_info,
            max_primitive_counts,
        )
    };

    align_build_sizes(
        size_info,
        raytracing_properties.min_acceleration_structure_scratch_offset_alignment() as u64,
    )
}

/// Pads the storage size to the structure alignment and scratch sizes to the
/// device's scratch offset alignment so several builds can share one buffer.
pub fn align_build_sizes(
    mut size_info: vk::AccelerationStructureBuildSizesInfoKHR,
    scratch_alignment: u64,
) -> vk::AccelerationStructureBuildSizesInfoKHR {
    let scratch_alignment = scratch_alignment.max(1);
    size_info.acceleration_structure_size = round_up(
        size_info.acceleration_structure_size,
        ACCELERATION_STRUCTURE_ALIGNMENT,
    );
    size_info.build_scratch_size = round_up(size_info.build_scratch_size, scratch_alignment);
    size_info.update_scratch_size = round_up(size_info.update_scratch_size, scratch_alignment);
    size_info
}

pub fn round_up(size: u64, granularity: u64) -> u64 {
    ((size + granularity - 1) / granularity) * granularity
}

pub fn get_total_memory_requirements<T: AccelerationStructure>(
    acceleration_structures: &[T],
) -> vk::AccelerationStructureBuildSizesInfoKHR {
    acceleration_structures.iter().fold(
        vk::AccelerationStructureBuildSizesInfoKHR::default(),
        |mut total, acceleration_structure| {
            let sizes = acceleration_structure.build_sizes();
            total.acceleration_structure_size += sizes.acceleration_structure_size;
            total.build_scratch_size += sizes.build_scratch_size;
            total.update_scratch_size += sizes.update_scratch_size;
            total
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sized(vk::AccelerationStructureBuildSizesInfoKHR);

    impl AccelerationStructure for Sized {
        fn build_sizes(&self) -> vk::AccelerationStructureBuildSizesInfoKHR {
            self.0
        }
    }

    fn sizes(storage: u64, build: u64, update: u64) -> vk::AccelerationStructureBuildSizesInfoKHR {
        vk::AccelerationStructureBuildSizesInfoKHR {
            acceleration_structure_size: storage,
            build_scratch_size: build,
            update_scratch_size: update,
            ..Default::default()
        }
    }

    #[test]
    fn round_up_to_granularity() {
        assert_eq!(round_up(0, 256), 0);
        assert_eq!(round_up(1, 256), 256);
        assert_eq!(round_up(256, 256), 256);
        assert_eq!(round_up(257, 128), 384);
    }

    #[test]
    fn storage_and_scratch_are_aligned() {
        let aligned = align_build_sizes(sizes(1000, 100, 3), 128);
        assert_eq!(aligned.acceleration_structure_size, 1024);
        assert_eq!(aligned.build_scratch_size, 128);
        assert_eq!(aligned.update_scratch_size, 128);
    }

    #[test]
    fn zero_scratch_alignment_is_treated_as_one() {
        let aligned = align_build_sizes(sizes(256, 13, 0), 0);
        assert_eq!(aligned.build_scratch_size, 13);
    }

    #[test]
    fn totals_sum_every_structure() {
        let structures = [Sized(sizes(256, 128, 0)), Sized(sizes(512, 256, 64))];
        let total = get_total_memory_requirements(&structures);
        assert_eq!(total.acceleration_structure_size, 768);
        assert_eq!(total.build_scratch_size, 384);
        assert_eq!(total.update_scratch_size, 64);
    }
}
