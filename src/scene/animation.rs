use crate::scene::{Primitive, PrimitiveKind};
use crevice::std430::AsStd430;
use glam::{vec3, Mat4};

/// Distance the moving sphere slides away from its center along z.
pub const MOVING_SPHERE_TRAVEL: f32 = 1.0;

#[derive(Copy, Clone, Debug, AsStd430)]
pub struct PrimitiveTransform {
    pub local_to_bottom_level: Mat4,
    pub bottom_level_to_local: Mat4,
}

impl PrimitiveTransform {
    pub fn new(local_to_bottom_level: Mat4) -> Self {
        PrimitiveTransform {
            local_to_bottom_level,
            bottom_level_to_local: local_to_bottom_level.inverse(),
        }
    }
}

#[derive(Debug)]
pub struct GeometryAnimation {
    rotation_time: f32,
    slide: f32,
    direction: f32,
}

impl Default for GeometryAnimation {
    fn default() -> Self {
        GeometryAnimation {
            rotation_time: 0.0,
            slide: 0.0,
            direction: 1.0,
        }
    }
}

impl GeometryAnimation {
    pub fn rotation_time(&self) -> f32 {
        self.rotation_time
    }

    pub fn slide(&self) -> f32 {
        self.slide
    }

    pub fn advance(&mut self, delta_time: f32) {
        self.rotation_time += delta_time;
        self.slide += self.direction * delta_time;

        // Reflect overshoot back so the sphere never leaves its bounds.
        if self.slide > MOVING_SPHERE_TRAVEL {
            self.slide = 2.0 * MOVING_SPHERE_TRAVEL - self.slide;
            self.direction = -1.0;
        } else if self.slide < -MOVING_SPHERE_TRAVEL {
            self.slide = -2.0 * MOVING_SPHERE_TRAVEL - self.slide;
            self.direction = 1.0;
        }
        self.slide = self.slide.clamp(-MOVING_SPHERE_TRAVEL, MOVING_SPHERE_TRAVEL);
    }

    pub fn transform(&self, primitive: &Primitive) -> PrimitiveTransform {
        let translation = Mat4::from_translation(primitive.center);
        let local_to_bottom_level = if primitive.moving {
            translation * Mat4::from_translation(vec3(0.0, 0.0, self.slide))
        } else {
            let rotation = Mat4::from_rotation_y(-2.0 * self.rotation_time);
            let scale = match primitive.kind {
                PrimitiveKind::Sphere => Mat4::IDENTITY,
                PrimitiveKind::Metaballs => Mat4::from_scale(glam::Vec3::splat(primitive.scale)),
            };
            translation * rotation * scale
        };

        PrimitiveTransform::new(local_to_bottom_level)
    }

    pub fn transforms(&self, primitives: &[Primitive]) -> Vec<PrimitiveTransform> {
        primitives
            .iter()
            .map(|primitive| self.transform(primitive))
            .collect()
    }
}
