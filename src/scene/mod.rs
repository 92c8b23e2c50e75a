use crate::scene::animation::MOVING_SPHERE_TRAVEL;
use crate::scene::material::*;
use crate::vulkan::raytracing::bottom_level_geometry::AabbPositions;
use bytemuck::{Pod, Zeroable};
use glam::{vec3, Mat4, Vec3};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

pub mod animation;
pub mod material;

/// Intersection shader family of a procedural primitive. The discriminant is
/// the `primitive_type` written into the primitive's hit records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumCount, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Sphere = 0,
    Metaballs = 1,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScenePreset {
    #[default]
    Spheres,
    Metaballs,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneDescription {
    pub material: Material,
    /// Size of the plane in scene units.
    pub extent: [f32; 3],
    /// Position of the plane's corner, as a fraction of `extent`.
    pub placement: [f32; 3],
}

impl Default for PlaneDescription {
    fn default() -> Self {
        // Wide enough for a 70 x 70 grid of 2-unit cells spaced 2 units apart.
        let cells = 70.0;
        let width = cells * 2.0 + (cells - 1.0) * 2.0;
        PlaneDescription {
            material: Material::plane(),
            extent: [width, 2.0, width],
            placement: [-0.35, 0.25, -0.35],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereDescription {
    pub name: String,
    pub center: [f32; 3],
    pub radius: f32,
    #[serde(default)]
    pub material: Material,
    #[serde(default)]
    pub moving: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaballDescription {
    pub center: [f32; 3],
    pub half_extent: f32,
    #[serde(default)]
    pub material: Material,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub plane: PlaneDescription,
    pub spheres: Vec<SphereDescription>,
    pub metaballs: Vec<MetaballDescription>,
    /// Height the procedural instance is lifted above the bottom-level origin.
    pub elevation: f32,
}

impl Default for SceneDescription {
    fn default() -> Self {
        SceneDescription {
            plane: PlaneDescription::default(),
            spheres: vec![],
            metaballs: vec![],
            elevation: 1.0,
        }
    }
}

// Spheres are authored on a grid of 3-unit boxes with a 4-unit pitch whose
// first box starts at -5.
fn cell_center(cell: [f32; 3]) -> [f32; 3] {
    cell.map(|c| -5.0 + c * 4.0 + 1.5)
}

fn sphere(name: &str, cell: [f32; 3], radius: f32, material: Material) -> SphereDescription {
    SphereDescription {
        name: name.to_owned(),
        center: cell_center(cell),
        radius,
        material,
        moving: false,
    }
}

fn metaball_volume() -> MetaballDescription {
    MetaballDescription {
        center: [-5.5, 0.5, -5.5],
        half_extent: 1.5,
        material: Material::chromium(),
    }
}

impl SceneDescription {
    pub fn preset(preset: ScenePreset) -> Self {
        let large_radius = 0.5;
        let (spheres, metaballs) = match preset {
            ScenePreset::Spheres => {
                let mut moving = sphere(
                    "moving",
                    [0.1, 1.4, -0.1],
                    large_radius,
                    Material::diffuse().with_albedo(BROWN),
                );
                moving.moving = true;

                let spheres = vec![
                    sphere(
                        "glass",
                        [4.0, 0.875, -0.7],
                        large_radius - 0.1,
                        Material::glass().with_albedo(GLASS),
                    ),
                    sphere(
                        "blue_glossy",
                        [3.3, 0.875, -0.9],
                        large_radius,
                        Material::glossy().with_albedo(BLUE),
                    ),
                    sphere(
                        "metal",
                        [3.5, 0.875, -0.1],
                        large_radius,
                        Material::metal().with_albedo(GREY),
                    ),
                    sphere(
                        "fuzzy",
                        [2.5, 0.875, 0.5],
                        large_radius,
                        Material::fuzzy_metal(0.02).with_albedo(GREY),
                    ),
                    moving,
                    sphere(
                        "textured",
                        [2.4, 0.95, -1.2],
                        large_radius + 0.2,
                        Material::diffuse_textured().with_albedo(GREEN),
                    ),
                    sphere(
                        "textured_metal",
                        [1.5, 0.95, -0.9],
                        large_radius + 0.2,
                        Material::textured_metal().with_albedo(GREY),
                    ),
                    sphere(
                        "perlin",
                        [1.5, 0.95, -0.1],
                        large_radius + 0.3,
                        Material::perlin_metal().with_albedo(GREY),
                    ),
                ];
                (spheres, vec![metaball_volume()])
            }
            ScenePreset::Metaballs => (vec![], vec![metaball_volume()]),
        };

        SceneDescription {
            spheres,
            metaballs,
            ..Default::default()
        }
    }

    pub fn primitive_count(&self) -> usize {
        self.spheres.len() + self.metaballs.len()
    }

    /// Procedural primitives in bottom-level order: spheres, then metaball
    /// volumes. A primitive's index is its geometry index in the AABB BLAS.
    pub fn primitives(&self) -> Vec<Primitive> {
        let spheres = self.spheres.iter().map(|sphere| {
            let center = Vec3::from(sphere.center);
            let mut half_extent = Vec3::splat(sphere.radius);
            if sphere.moving {
                half_extent.z += MOVING_SPHERE_TRAVEL;
            }
            Primitive {
                kind: PrimitiveKind::Sphere,
                center,
                radius: sphere.radius,
                scale: 1.0,
                half_extent,
                material: sphere.material,
                moving: sphere.moving,
            }
        });

        let metaballs = self.metaballs.iter().map(|volume| Primitive {
            kind: PrimitiveKind::Metaballs,
            center: Vec3::from(volume.center),
            radius: 1.0,
            scale: volume.half_extent,
            half_extent: Vec3::splat(volume.half_extent),
            material: volume.material,
            moving: false,
        });

        spheres.chain(metaballs).collect()
    }

    pub fn plane_transform(&self) -> Mat4 {
        let extent = Vec3::from(self.plane.extent);
        let corner = extent * Vec3::from(self.plane.placement);
        Mat4::from_translation(corner) * Mat4::from_scale(extent)
    }

    pub fn procedural_transform(&self) -> Mat4 {
        Mat4::from_translation(vec3(0.0, self.elevation, 0.0))
    }
}

/// A procedural primitive resolved into bottom-level space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub center: Vec3,
    /// Local-space radius seen by the intersection shader.
    pub radius: f32,
    /// Uniform scale from local space into bottom-level space.
    pub scale: f32,
    pub half_extent: Vec3,
    pub material: Material,
    pub moving: bool,
}

impl Primitive {
    pub fn aabb(&self) -> AabbPositions {
        let min = self.center - self.half_extent;
        let max = self.center + self.half_extent;
        AabbPositions {
            min: min.to_array(),
            max: max.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

unsafe impl Zeroable for PlaneVertex {}
unsafe impl Pod for PlaneVertex {}

pub fn plane_vertices() -> [PlaneVertex; 4] {
    let up = [0.0, 1.0, 0.0];
    [
        PlaneVertex {
            position: [0.0, 0.0, 0.0],
            normal: up,
        },
        PlaneVertex {
            position: [1.0, 0.0, 0.0],
            normal: up,
        },
        PlaneVertex {
            position: [1.0, 0.0, 1.0],
            normal: up,
        },
        PlaneVertex {
            position: [0.0, 0.0, 1.0],
            normal: up,
        },
    ]
}

pub const PLANE_INDICES: [u16; 6] = [3, 1, 0, 2, 1, 3];

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn spheres_preset_is_deterministic() {
        let scene = SceneDescription::preset(ScenePreset::Spheres);
        assert_eq!(scene, SceneDescription::preset(ScenePreset::Spheres));

        let names = scene
            .spheres
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "glass",
                "blue_glossy",
                "metal",
                "fuzzy",
                "moving",
                "textured",
                "textured_metal",
                "perlin"
            ]
        );
        assert_eq!(scene.metaballs.len(), 1);
        assert_eq!(scene.primitive_count(), 9);
    }

    #[test]
    fn grid_cells_map_to_box_centers() {
        assert_eq!(cell_center([0.0, 0.0, 0.0]), [-3.5, -3.5, -3.5]);
        assert_eq!(cell_center([1.0, 2.0, -1.0]), [0.5, 4.5, -7.5]);
    }

    #[test]
    fn primitives_put_spheres_before_volumes() {
        let primitives = SceneDescription::preset(ScenePreset::Spheres).primitives();
        let first_volume = primitives
            .iter()
            .position(|p| p.kind == PrimitiveKind::Metaballs)
            .unwrap();
        assert_eq!(first_volume, 8);
        assert!(primitives[..first_volume]
            .iter()
            .all(|p| p.kind == PrimitiveKind::Sphere));
    }

    #[test]
    fn sphere_bounds_enclose_the_sphere() {
        let scene = SceneDescription::preset(ScenePreset::Spheres);
        let glass = scene.primitives()[0];
        let aabb = glass.aabb();
        let center = cell_center([4.0, 0.875, -0.7]);
        for axis in 0..3 {
            assert!((aabb.max[axis] - aabb.min[axis] - 0.8).abs() < 1e-5);
            assert!(((aabb.max[axis] + aabb.min[axis]) * 0.5 - center[axis]).abs() < 1e-5);
        }
    }

    #[test]
    fn moving_sphere_bounds_cover_its_travel() {
        let primitives = SceneDescription::preset(ScenePreset::Spheres).primitives();
        let moving = primitives.iter().find(|p| p.moving).unwrap();
        let aabb = moving.aabb();
        let depth = aabb.max[2] - aabb.min[2];
        let width = aabb.max[0] - aabb.min[0];
        assert!((width - 2.0 * moving.radius).abs() < 1e-5);
        assert!((depth - 2.0 * (moving.radius + MOVING_SPHERE_TRAVEL)).abs() < 1e-5);
    }

    #[test]
    fn metaball_volume_scales_unit_cube() {
        let primitives = SceneDescription::preset(ScenePreset::Metaballs).primitives();
        assert_eq!(primitives.len(), 1);
        let volume = primitives[0];
        assert_eq!(volume.kind, PrimitiveKind::Metaballs);
        assert_eq!(volume.scale, 1.5);
        assert_eq!(volume.aabb().min, [-7.0, -1.0, -7.0]);
        assert_eq!(volume.aabb().max, [-4.0, 2.0, -4.0]);
    }

    #[test]
    fn plane_transform_scales_unit_quad() {
        let scene = SceneDescription::preset(ScenePreset::Spheres);
        let transform = scene.plane_transform();
        let width = 70.0 * 2.0 + 69.0 * 2.0;
        let far = transform.transform_point3(vec3(1.0, 0.0, 1.0));
        let near = transform.transform_point3(Vec3::ZERO);
        assert!((far.x - near.x - width).abs() < 1e-3);
        assert!((near.x + 0.35 * width).abs() < 1e-3);
        assert!((near.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn plane_indices_cover_quad_twice() {
        assert_eq!(PLANE_INDICES.len(), 6);
        assert!(PLANE_INDICES.iter().all(|&i| (i as usize) < plane_vertices().len()));
        assert_eq!(std::mem::size_of::<PlaneVertex>(), 24);
    }

    #[test]
    fn preset_parses_from_cli_names() {
        assert_eq!(ScenePreset::from_str("metaballs").unwrap(), ScenePreset::Metaballs);
        assert_eq!(ScenePreset::Spheres.to_string(), "spheres");
        assert_eq!(PrimitiveKind::COUNT, PrimitiveKind::iter().count());
    }
}
