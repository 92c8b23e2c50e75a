use crate::error::{Error, Result};
use crate::scene::{SceneDescription, ScenePreset};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAX_RAY_RECURSION_DEPTH: u32 = 6;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    /// Seconds of animation between two frames.
    pub frame_time: f32,
    pub output_dir: PathBuf,
    /// SPIR-V module loaded at startup when shaders are not built in. Not
    /// needed with the `compile-shaders` feature, which embeds the module
    /// built from `shaders/raytracing`.
    pub shader_path: PathBuf,
    pub max_recursion_depth: u32,
    pub animate_camera: bool,
    pub animate_geometry: bool,
    pub animate_light: bool,
    /// Frames kept in memory before they are encoded together.
    pub encode_batch: usize,
    pub preset: ScenePreset,
    /// Replaces the preset when present.
    pub scene: Option<SceneDescription>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 1280,
            height: 720,
            frames: 60,
            frame_time: 1.0 / 30.0,
            output_dir: PathBuf::from("frames"),
            shader_path: PathBuf::from("shaders/raytracing.spv"),
            max_recursion_depth: MAX_RAY_RECURSION_DEPTH,
            animate_camera: false,
            animate_geometry: true,
            animate_light: false,
            encode_batch: 8,
            preset: ScenePreset::default(),
            scene: None,
        }
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: RenderConfig = serde_json::from_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn scene(&self) -> SceneDescription {
        self.scene
            .clone()
            .unwrap_or_else(|| SceneDescription::preset(self.preset))
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Config(format!(
                "output size {}x{} is empty",
                self.width, self.height
            )));
        }
        if self.frames == 0 {
            return Err(Error::Config("at least one frame is required".into()));
        }
        if self.frame_time.is_nan() || self.frame_time <= 0.0 {
            return Err(Error::Config(format!(
                "frame_time must be positive, got {}",
                self.frame_time
            )));
        }
        if self.max_recursion_depth == 0 {
            return Err(Error::Config(
                "max_recursion_depth must allow primary rays".into(),
            ));
        }
        if self.encode_batch == 0 {
            return Err(Error::Config("encode_batch must be at least 1".into()));
        }
        let scene = self.scene();
        if scene.primitive_count() == 0 {
            return Err(Error::Config("scene has no procedural primitives".into()));
        }
        // Non-positive sizes give inverted boxes and singular transforms.
        for sphere in &scene.spheres {
            if !is_positive(sphere.radius) {
                return Err(Error::Config(format!(
                    "sphere {} has radius {}",
                    sphere.name, sphere.radius
                )));
            }
        }
        for (index, volume) in scene.metaballs.iter().enumerate() {
            if !is_positive(volume.half_extent) {
                return Err(Error::Config(format!(
                    "metaball volume {} has half extent {}",
                    index, volume.half_extent
                )));
            }
        }
        Ok(())
    }
}

fn is_positive(size: f32) -> bool {
    size.is_finite() && size > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_recursion_depth, 6);
        assert!(!config.animate_camera && config.animate_geometry && !config.animate_light);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "width": 320, "frames": 4, "preset": "metaballs" }"#)
                .unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 720);
        assert_eq!(config.frames, 4);
        assert_eq!(config.scene().spheres.len(), 0);
        assert_eq!(config.scene().metaballs.len(), 1);
    }

    #[test]
    fn explicit_scene_replaces_preset() {
        let config: RenderConfig = serde_json::from_str(
            r#"{
                "scene": {
                    "spheres": [
                        { "name": "solo", "center": [0.0, 1.0, 0.0], "radius": 0.5 }
                    ]
                }
            }"#,
        )
        .unwrap();
        let scene = config.scene();
        assert_eq!(scene.spheres.len(), 1);
        assert!(scene.metaballs.is_empty());
        assert_eq!(scene.spheres[0].material.diffuse_coef, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_settings() {
        let invalid = [
            RenderConfig {
                width: 0,
                ..Default::default()
            },
            RenderConfig {
                frames: 0,
                ..Default::default()
            },
            RenderConfig {
                frame_time: 0.0,
                ..Default::default()
            },
            RenderConfig {
                frame_time: f32::NAN,
                ..Default::default()
            },
            RenderConfig {
                max_recursion_depth: 0,
                ..Default::default()
            },
            RenderConfig {
                scene: Some(SceneDescription {
                    spheres: vec![],
                    metaballs: vec![],
                    ..Default::default()
                }),
                ..Default::default()
            },
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }
    }

    #[test]
    fn rejects_degenerate_primitive_sizes() {
        let parse = |json: &str| -> RenderConfig {
            serde_json::from_str(&format!(r#"{{ "scene": {} }}"#, json)).unwrap()
        };
        let invalid = [
            parse(r#"{ "spheres": [{ "name": "flat", "center": [0.0, 1.0, 0.0], "radius": 0.0 }] }"#),
            parse(r#"{ "spheres": [{ "name": "inside out", "center": [0.0, 1.0, 0.0], "radius": -0.5 }] }"#),
            parse(r#"{ "metaballs": [{ "center": [0.0, 0.0, 0.0], "half_extent": 0.0 }] }"#),
            parse(r#"{ "metaballs": [{ "center": [0.0, 0.0, 0.0], "half_extent": -1.5 }] }"#),
        ];
        for config in invalid {
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }

        let mut config = RenderConfig::default();
        let mut scene = config.scene();
        scene.spheres[0].radius = f32::NAN;
        config.scene = Some(scene);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn load_reports_missing_files() {
        let missing = std::env::temp_dir().join("rtengine-missing-config.json");
        assert!(matches!(RenderConfig::load(&missing), Err(Error::Io(_))));
    }

    #[test]
    fn load_reads_json_from_disk() {
        let path = std::env::temp_dir().join(format!("rtengine-config-{}.json", std::process::id()));
        fs::write(&path, r#"{ "height": 240, "animate_light": true }"#).unwrap();
        let config = RenderConfig::load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.height, 240);
        assert!(config.animate_light);
    }
}
