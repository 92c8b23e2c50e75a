use bytemuck::{Pod, Zeroable};
use erupt::vk;
use std::mem::size_of;

/// Axis aligned box as laid out in an AABB geometry buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AabbPositions {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

unsafe impl Zeroable for AabbPositions {}
unsafe impl Pod for AabbPositions {}

pub struct TriangleGeometry {
    pub vertex_address: vk::DeviceAddress,
    pub vertex_stride: u64,
    pub vertex_count: u32,
    pub index_address: vk::DeviceAddress,
    pub index_type: vk::IndexType,
    pub index_count: u32,
}

/// Geometry descriptions and build ranges for one bottom level structure.
#[derive(Default)]
pub struct BottomLevelGeometry {
    geometry: Vec<vk::AccelerationStructureGeometryKHRBuilder<'static>>,
    build_offset_info: Vec<vk::AccelerationStructureBuildRangeInfoKHR>,
}

impl BottomLevelGeometry {
    pub fn geometry(&self) -> &[vk::AccelerationStructureGeometryKHRBuilder<'static>] {
        &self.geometry
    }

    pub fn build_offset_info(&self) -> &[vk::AccelerationStructureBuildRangeInfoKHR] {
        &self.build_offset_info
    }

    pub fn count(&self) -> usize {
        self.geometry.len()
    }

    pub fn primitive_counts(&self) -> Vec<u32> {
        self.build_offset_info
            .iter()
            .map(|info| info.primitive_count)
            .collect()
    }

    pub fn add_geometry_triangles(&mut self, triangles: &TriangleGeometry, is_opaque: bool) {
        let data = vk::AccelerationStructureGeometryDataKHR {
            triangles: *vk::AccelerationStructureGeometryTrianglesDataKHRBuilder::new()
                .vertex_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: triangles.vertex_address,
                })
                .vertex_stride(triangles.vertex_stride)
                .max_vertex(triangles.vertex_count.saturating_sub(1))
                .vertex_format(vk::Format::R32G32B32_SFLOAT)
                .index_data(vk::DeviceOrHostAddressConstKHR {
                    device_address: triangles.index_address,
                })
                .index_type(triangles.index_type),
        };

        let geometry = vk::AccelerationStructureGeometryKHRBuilder::new()
            .geometry_type(vk::GeometryTypeKHR::TRIANGLES_KHR)
            .geometry(data)
            .flags(geometry_flags(is_opaque));

        let build_offset_info = vk::AccelerationStructureBuildRangeInfoKHRBuilder::new()
            .first_vertex(0)
            .primitive_offset(0)
            .primitive_count(triangles.index_count / 3)
            .transform_offset(0);

        self.geometry.push(geometry);
        self.build_offset_info.push(*build_offset_info)
    }

    /// Adds one procedural geometry holding the single box at `aabb_index` in
    /// the buffer at `aabb_address`.
    pub fn add_geometry_aabb(
        &mut self,
        aabb_address: vk::DeviceAddress,
        aabb_index: u32,
        is_opaque: bool,
    ) {
        let stride = size_of::<AabbPositions>() as u64;
        let data = vk::AccelerationStructureGeometryDataKHR {
            aabbs: *vk::AccelerationStructureGeometryAabbsDataKHRBuilder::new()
                .data(vk::DeviceOrHostAddressConstKHR {
                    device_address: aabb_address,
                })
                .stride(stride),
        };

        let geometry = vk::AccelerationStructureGeometryKHRBuilder::new()
            .geometry_type(vk::GeometryTypeKHR::AABBS_KHR)
            .geometry(data)
            .flags(geometry_flags(is_opaque));

        let build_offset_info = vk::AccelerationStructureBuildRangeInfoKHRBuilder::new()
            .first_vertex(0)
            .primitive_offset(aabb_index * stride as u32)
            .primitive_count(1)
            .transform_offset(0);

        self.geometry.push(geometry);
        self.build_offset_info.push(*build_offset_info)
    }
}

fn geometry_flags(is_opaque: bool) -> vk::GeometryFlagsKHR {
    if is_opaque {
        vk::GeometryFlagsKHR::OPAQUE_KHR
    } else {
        vk::GeometryFlagsKHR::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_positions_are_six_floats() {
        assert_eq!(size_of::<AabbPositions>(), 24);
        let aabb = AabbPositions {
            min: [-1.0, -2.0, -3.0],
            max: [1.0, 2.0, 3.0],
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&aabb));
        assert_eq!(floats, &[-1.0, -2.0, -3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn each_aabb_gets_its_own_geometry() {
        let mut geometry = BottomLevelGeometry::default();
        for index in 0..3 {
            geometry.add_geometry_aabb(0x1000, index, true);
        }
        assert_eq!(geometry.count(), 3);
        assert_eq!(geometry.primitive_counts(), vec![1, 1, 1]);
        let offsets: Vec<_> = geometry
            .build_offset_info()
            .iter()
            .map(|info| info.primitive_offset)
            .collect();
        assert_eq!(offsets, vec![0, 24, 48]);
        assert!(geometry
            .geometry()
            .iter()
            .all(|g| g.geometry_type == vk::GeometryTypeKHR::AABBS_KHR
                && g.flags == vk::GeometryFlagsKHR::OPAQUE_KHR));
    }

    #[test]
    fn triangle_ranges_count_triangles() {
        let mut geometry = BottomLevelGeometry::default();
        geometry.add_geometry_triangles(
            &TriangleGeometry {
                vertex_address: 0x2000,
                vertex_stride: 24,
                vertex_count: 4,
                index_address: 0x3000,
                index_type: vk::IndexType::UINT16,
                index_count: 6,
            },
            true,
        );
        assert_eq!(geometry.primitive_counts(), vec![2]);
        let triangles = unsafe { geometry.geometry()[0].geometry.triangles };
        assert_eq!(triangles.max_vertex, 3);
        assert_eq!(triangles.vertex_stride, 24);
        assert_eq!(triangles.index_type, vk::IndexType::UINT16);
    }
}
