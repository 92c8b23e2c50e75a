use crate::scene::material::MATERIAL_RECORD_SIZE;
use crate::scene::{Primitive, PrimitiveKind, SceneDescription};
use crate::vulkan::raytracing::raytracing_pipeline::ShaderGroup;
use crate::vulkan::raytracing::shader_binding_table::ShaderRecord;
use bytemuck::{Pod, Zeroable};
use erupt::{cstr, vk};
use std::ffi::CStr;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};

/// Selects the hit group and miss shader used by a trace call. The
/// discriminant is both the hit group offset and the miss index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumCount, EnumIter)]
pub enum RayType {
    Radiance = 0,
    Shadow = 1,
}

pub const RAY_TYPE_COUNT: u32 = RayType::COUNT as u32;

/// Every entry point in the ray tracing module, in pipeline stage order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumCount, EnumIter)]
pub enum ShaderStage {
    Raygen,
    MissRadiance,
    MissShadow,
    ClosestHitTriangle,
    ClosestHitAabb,
    IntersectionSphere,
    IntersectionMetaballs,
}

impl ShaderStage {
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn entry_point(self) -> &'static CStr {
        let name = match self {
            ShaderStage::Raygen => cstr!("raygen"),
            ShaderStage::MissRadiance => cstr!("miss_radiance"),
            ShaderStage::MissShadow => cstr!("miss_shadow"),
            ShaderStage::ClosestHitTriangle => cstr!("closest_hit_triangle"),
            ShaderStage::ClosestHitAabb => cstr!("closest_hit_aabb"),
            ShaderStage::IntersectionSphere => cstr!("intersection_sphere"),
            ShaderStage::IntersectionMetaballs => cstr!("intersection_metaballs"),
        };
        unsafe { CStr::from_ptr(name) }
    }

    pub fn flag(self) -> vk::ShaderStageFlagBits {
        match self {
            ShaderStage::Raygen => vk::ShaderStageFlagBits::RAYGEN_KHR,
            ShaderStage::MissRadiance | ShaderStage::MissShadow => {
                vk::ShaderStageFlagBits::MISS_KHR
            }
            ShaderStage::ClosestHitTriangle | ShaderStage::ClosestHitAabb => {
                vk::ShaderStageFlagBits::CLOSEST_HIT_KHR
            }
            ShaderStage::IntersectionSphere | ShaderStage::IntersectionMetaballs => {
                vk::ShaderStageFlagBits::INTERSECTION_KHR
            }
        }
    }

    fn intersection_for(kind: PrimitiveKind) -> ShaderStage {
        match kind {
            PrimitiveKind::Sphere => ShaderStage::IntersectionSphere,
            PrimitiveKind::Metaballs => ShaderStage::IntersectionMetaballs,
        }
    }
}

/// Inline data that follows the material in a procedural hit record.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PrimitiveInstance {
    pub instance_index: u32,
    pub primitive_type: u32,
}

unsafe impl Zeroable for PrimitiveInstance {}
unsafe impl Pod for PrimitiveInstance {}

pub const RAYGEN_GROUP: u32 = 0;
const MISS_GROUP_BASE: u32 = 1;
const TRIANGLE_HIT_GROUP_BASE: u32 = MISS_GROUP_BASE + RAY_TYPE_COUNT;
const PROCEDURAL_HIT_GROUP_BASE: u32 = TRIANGLE_HIT_GROUP_BASE + RAY_TYPE_COUNT;

/// Record offset of the procedural instance in the hit region. The plane
/// instance owns the records before it.
pub const PROCEDURAL_INSTANCE_RECORD_OFFSET: u32 = RAY_TYPE_COUNT;

pub fn miss_group(ray: RayType) -> u32 {
    MISS_GROUP_BASE + ray as u32
}

pub fn triangle_hit_group(ray: RayType) -> u32 {
    TRIANGLE_HIT_GROUP_BASE + ray as u32
}

pub fn procedural_hit_group(kind: PrimitiveKind, ray: RayType) -> u32 {
    PROCEDURAL_HIT_GROUP_BASE + kind as u32 * RAY_TYPE_COUNT + ray as u32
}

/// Pipeline shader groups. Group indices match `miss_group`,
/// `triangle_hit_group` and `procedural_hit_group`.
pub fn shader_groups() -> Vec<ShaderGroup> {
    let mut groups = vec![ShaderGroup::General(ShaderStage::Raygen.index())];
    groups.extend([
        ShaderGroup::General(ShaderStage::MissRadiance.index()),
        ShaderGroup::General(ShaderStage::MissShadow.index()),
    ]);
    groups.extend([
        ShaderGroup::Triangles {
            closest_hit: Some(ShaderStage::ClosestHitTriangle.index()),
        },
        ShaderGroup::Triangles { closest_hit: None },
    ]);
    for kind in PrimitiveKind::iter() {
        let intersection = ShaderStage::intersection_for(kind).index();
        groups.extend([
            ShaderGroup::Procedural {
                closest_hit: Some(ShaderStage::ClosestHitAabb.index()),
                intersection,
            },
            ShaderGroup::Procedural {
                closest_hit: None,
                intersection,
            },
        ]);
    }
    groups
}

pub fn raygen_records() -> Vec<ShaderRecord> {
    vec![ShaderRecord::new(RAYGEN_GROUP)]
}

pub fn miss_records() -> Vec<ShaderRecord> {
    RayType::iter()
        .map(|ray| ShaderRecord::new(miss_group(ray)))
        .collect()
}

/// Plane records first, then one record per ray type for every procedural
/// primitive so that `record offset + geometry index * RAY_TYPE_COUNT + ray`
/// lands on the right primitive.
pub fn hit_records(scene: &SceneDescription) -> Vec<ShaderRecord> {
    let plane_args = scene.plane.material.constants(1.0).to_bytes();
    let mut records = RayType::iter()
        .map(|ray| ShaderRecord::with_args(triangle_hit_group(ray), plane_args.clone()))
        .collect::<Vec<_>>();

    for (index, primitive) in scene.primitives().iter().enumerate() {
        let args = procedural_args(index as u32, primitive);
        records.extend(RayType::iter().map(|ray| {
            ShaderRecord::with_args(procedural_hit_group(primitive.kind, ray), args.clone())
        }));
    }
    records
}

fn procedural_args(instance_index: u32, primitive: &Primitive) -> Vec<u8> {
    let mut args = primitive.material.constants(primitive.radius).to_bytes();
    debug_assert_eq!(args.len(), MATERIAL_RECORD_SIZE);
    let instance = PrimitiveInstance {
        instance_index,
        primitive_type: primitive.kind as u32,
    };
    args.extend_from_slice(bytemuck::bytes_of(&instance));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ScenePreset;

    fn record_for(
        records: &[ShaderRecord],
        record_offset: u32,
        geometry: u32,
        ray: RayType,
    ) -> &ShaderRecord {
        &records[(record_offset + geometry * RAY_TYPE_COUNT + ray as u32) as usize]
    }

    fn instance_of(record: &ShaderRecord) -> PrimitiveInstance {
        let bytes = &record.args[MATERIAL_RECORD_SIZE..MATERIAL_RECORD_SIZE + 8];
        PrimitiveInstance {
            instance_index: u32::from_ne_bytes(bytes[0..4].try_into().unwrap()),
            primitive_type: u32::from_ne_bytes(bytes[4..8].try_into().unwrap()),
        }
    }

    #[test]
    fn stages_are_listed_in_index_order() {
        let stages: Vec<_> = ShaderStage::iter().map(ShaderStage::index).collect();
        assert_eq!(stages, (0..ShaderStage::COUNT as u32).collect::<Vec<_>>());
        assert_eq!(ShaderStage::Raygen.entry_point().to_str().unwrap(), "raygen");
        assert_eq!(
            ShaderStage::IntersectionMetaballs.entry_point().to_str().unwrap(),
            "intersection_metaballs"
        );
    }

    #[test]
    fn group_indices_match_the_group_list() {
        let groups = shader_groups();
        assert_eq!(groups.len(), 1 + 2 + 2 + 2 * PrimitiveKind::COUNT);
        assert_eq!(groups[RAYGEN_GROUP as usize], ShaderGroup::General(0));
        assert_eq!(
            groups[miss_group(RayType::Shadow) as usize],
            ShaderGroup::General(ShaderStage::MissShadow.index())
        );
        assert_eq!(
            groups[triangle_hit_group(RayType::Shadow) as usize],
            ShaderGroup::Triangles { closest_hit: None }
        );
        assert_eq!(
            groups[procedural_hit_group(PrimitiveKind::Metaballs, RayType::Radiance) as usize],
            ShaderGroup::Procedural {
                closest_hit: Some(ShaderStage::ClosestHitAabb.index()),
                intersection: ShaderStage::IntersectionMetaballs.index(),
            }
        );
        assert_eq!(
            groups[procedural_hit_group(PrimitiveKind::Sphere, RayType::Shadow) as usize],
            ShaderGroup::Procedural {
                closest_hit: None,
                intersection: ShaderStage::IntersectionSphere.index(),
            }
        );
    }

    #[test]
    fn miss_records_follow_ray_types() {
        let records = miss_records();
        assert_eq!(records.len(), 2);
        for ray in RayType::iter() {
            assert_eq!(records[ray as usize].group_index, miss_group(ray));
        }
    }

    #[test]
    fn hit_records_index_by_instance_geometry_and_ray() {
        let scene = SceneDescription::preset(ScenePreset::Spheres);
        let primitives = scene.primitives();
        let records = hit_records(&scene);
        assert_eq!(records.len() as u32, RAY_TYPE_COUNT * (1 + primitives.len() as u32));

        let plane = record_for(&records, 0, 0, RayType::Radiance);
        assert_eq!(plane.group_index, triangle_hit_group(RayType::Radiance));
        assert_eq!(plane.args.len(), MATERIAL_RECORD_SIZE);

        for (geometry, primitive) in primitives.iter().enumerate() {
            for ray in RayType::iter() {
                let record = record_for(
                    &records,
                    PROCEDURAL_INSTANCE_RECORD_OFFSET,
                    geometry as u32,
                    ray,
                );
                assert_eq!(record.group_index, procedural_hit_group(primitive.kind, ray));
                let instance = instance_of(record);
                assert_eq!(instance.instance_index, geometry as u32);
                assert_eq!(instance.primitive_type, primitive.kind as u32);
            }
        }
    }

    #[test]
    fn procedural_records_carry_material_then_instance() {
        let scene = SceneDescription::preset(ScenePreset::Metaballs);
        let records = hit_records(&scene);
        let volume = &records[PROCEDURAL_INSTANCE_RECORD_OFFSET as usize];
        assert_eq!(volume.args.len(), MATERIAL_RECORD_SIZE + 8);
        let expected = scene.primitives()[0].material.constants(1.0).to_bytes();
        assert_eq!(&volume.args[..MATERIAL_RECORD_SIZE], expected.as_slice());
        assert_eq!(instance_of(volume).primitive_type, PrimitiveKind::Metaballs as u32);
    }
}
