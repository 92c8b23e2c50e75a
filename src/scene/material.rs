use crevice::std430::{AsStd430, Std430};
use glam::{vec4, Vec4};
use serde::{Deserialize, Serialize};

pub const GREEN: [f32; 4] = [0.1, 1.0, 0.5, 1.0];
pub const BLUE: [f32; 4] = [0.0, 0.0, 0.3, 1.0];
pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const GREY: [f32; 4] = [0.549, 0.556, 0.554, 1.0];
pub const GLASS: [f32; 4] = [0.7, 0.7, 0.7, 1.0];
pub const BROWN: [f32; 4] = [0.5, 0.4, 0.3, 1.0];

// Fresnel reflectance at normal incidence for chromium.
pub const CHROMIUM_REFLECTANCE: [f32; 4] = [0.549, 0.556, 0.554, 1.0];

/// Surface description of a scene primitive, as written in scene files.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub albedo: [f32; 4],
    pub reflectance_coef: f32,
    pub diffuse_coef: f32,
    pub specular_coef: f32,
    pub specular_power: f32,
    pub refraction_index: f32,
    pub fuzz: f32,
    pub has_texture: bool,
    pub has_perlin: bool,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            albedo: WHITE,
            reflectance_coef: 0.0,
            diffuse_coef: 0.9,
            specular_coef: 0.7,
            specular_power: 50.0,
            refraction_index: 0.0,
            fuzz: 1.0,
            has_texture: false,
            has_perlin: false,
        }
    }
}

impl Material {
    pub fn with_albedo(mut self, albedo: [f32; 4]) -> Self {
        self.albedo = albedo;
        self
    }

    pub fn plane() -> Self {
        Material {
            albedo: [0.5, 0.5, 0.6, 1.0],
            reflectance_coef: 0.1,
            diffuse_coef: 2.0,
            specular_coef: 0.1,
            specular_power: 50.0,
            refraction_index: 1.0,
            ..Default::default()
        }
    }

    pub fn glass() -> Self {
        Material {
            reflectance_coef: 1.0,
            diffuse_coef: 0.0,
            specular_coef: 0.7,
            specular_power: 100.0,
            refraction_index: 1.7,
            ..Default::default()
        }
    }

    pub fn diffuse() -> Self {
        Material {
            reflectance_coef: 0.0,
            diffuse_coef: 1.0,
            specular_coef: 0.0,
            ..Default::default()
        }
    }

    pub fn diffuse_textured() -> Self {
        Material {
            has_texture: true,
            ..Material::diffuse()
        }
    }

    pub fn glossy() -> Self {
        Material {
            reflectance_coef: 1.0,
            diffuse_coef: 0.5,
            specular_coef: 0.7,
            specular_power: 100.0,
            ..Default::default()
        }
    }

    pub fn metal() -> Self {
        Material {
            reflectance_coef: 0.7,
            specular_coef: 0.7,
            specular_power: 25.0,
            ..Default::default()
        }
    }

    pub fn fuzzy_metal(fuzz: f32) -> Self {
        Material {
            fuzz,
            ..Material::metal()
        }
    }

    pub fn textured_metal() -> Self {
        Material {
            has_texture: true,
            ..Material::metal()
        }
    }

    pub fn perlin_metal() -> Self {
        Material {
            reflectance_coef: 0.1,
            has_perlin: true,
            ..Default::default()
        }
    }

    pub fn chromium() -> Self {
        Material {
            albedo: CHROMIUM_REFLECTANCE,
            reflectance_coef: 0.7,
            fuzz: 0.1,
            has_texture: true,
            ..Default::default()
        }
    }

    /// Constants as they are laid out in a shader record. `radius` is the
    /// local-space extent of the primitive the material is attached to.
    pub fn constants(&self, radius: f32) -> MaterialConstants {
        let [r, g, b, a] = self.albedo;
        MaterialConstants {
            albedo: vec4(r, g, b, a),
            reflectance_coef: self.reflectance_coef,
            diffuse_coef: self.diffuse_coef,
            specular_coef: self.specular_coef,
            specular_power: self.specular_power,
            refraction_index: self.refraction_index,
            radius,
            fuzz: self.fuzz,
            has_texture: self.has_texture as u32,
            has_perlin: self.has_perlin as u32,
        }
    }
}

#[derive(Copy, Clone, Debug, AsStd430)]
pub struct MaterialConstants {
    pub albedo: Vec4,
    pub reflectance_coef: f32,
    pub diffuse_coef: f32,
    pub specular_coef: f32,
    pub specular_power: f32,
    pub refraction_index: f32,
    pub radius: f32,
    pub fuzz: f32,
    pub has_texture: u32,
    pub has_perlin: u32,
}

// Size of the material block at the start of every hit record. Per-instance
// data of procedural records follows at this offset.
pub const MATERIAL_RECORD_SIZE: usize = 64;

impl MaterialConstants {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.as_std430().as_bytes().to_vec();
        bytes.resize(MATERIAL_RECORD_SIZE, 0);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_engine_defaults() {
        let material = Material::default();
        assert_eq!(material.diffuse_coef, 0.9);
        assert_eq!(material.specular_coef, 0.7);
        assert_eq!(material.specular_power, 50.0);
        assert_eq!(material.fuzz, 1.0);
        assert_eq!(material.refraction_index, 0.0);
        assert!(!material.has_texture && !material.has_perlin);
    }

    #[test]
    fn presets_inherit_from_their_base() {
        let fuzzy = Material::fuzzy_metal(0.02);
        assert_eq!(fuzzy.reflectance_coef, Material::metal().reflectance_coef);
        assert_eq!(fuzzy.fuzz, 0.02);

        let textured = Material::diffuse_textured();
        assert!(textured.has_texture);
        assert_eq!(textured.diffuse_coef, 1.0);
    }

    #[test]
    fn constants_are_padded_to_record_block() {
        let bytes = Material::glass().with_albedo(GLASS).constants(0.4).to_bytes();
        assert_eq!(bytes.len(), MATERIAL_RECORD_SIZE);

        let albedo = bytes[0..16]
            .chunks(4)
            .map(|c| f32::from_ne_bytes(c.try_into().unwrap()))
            .collect::<Vec<_>>();
        assert_eq!(albedo, GLASS);

        // refraction index follows albedo and four coefficients
        let refraction = f32::from_ne_bytes(bytes[32..36].try_into().unwrap());
        assert_eq!(refraction, 1.7);
        let radius = f32::from_ne_bytes(bytes[36..40].try_into().unwrap());
        assert_eq!(radius, 0.4);
    }

    #[test]
    fn material_deserializes_with_defaults() {
        let material: Material = serde_json::from_str(r#"{ "fuzz": 0.5 }"#).unwrap();
        assert_eq!(material.fuzz, 0.5);
        assert_eq!(material.specular_power, 50.0);
    }
}
