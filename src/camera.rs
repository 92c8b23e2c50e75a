use glam::*;

const FOV_Y_DEGREES: f32 = 20.0;
const Z_NEAR: f32 = 0.01;
const Z_FAR: f32 = 125.0;

// Seconds for a full turn.
const CAMERA_PERIOD: f32 = 48.0;
const LIGHT_PERIOD: f32 = 8.0;

pub struct Camera {
    eye: Vec3,
    at: Vec3,
    up: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Camera::new(vec3(22.0, 2.0, 3.0), vec3(0.0, 0.0, -4.0), Vec3::Y);
        let rotation = Mat3::from_rotation_y(24.0f32.to_radians());
        camera.eye = rotation * camera.eye;
        camera.up = rotation * camera.up;
        camera
    }
}

impl Camera {
    pub fn new(eye: Vec3, at: Vec3, up: Vec3) -> Self {
        Camera { eye, at, up }
    }

    pub fn position(&self) -> Vec3 {
        self.eye
    }

    /// Rotates the whole camera frame about the world Y axis.
    pub fn rotate_y(&mut self, degrees: f32) {
        let rotation = Mat3::from_rotation_y(degrees.to_radians());
        self.eye = rotation * self.eye;
        self.at = rotation * self.at;
        self.up = rotation * self.up;
    }

    pub fn animate(&mut self, delta_time: f32) {
        self.rotate_y(360.0 * delta_time / CAMERA_PERIOD);
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_lh(self.eye, self.at, self.up)
    }

    pub fn projection(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_lh(FOV_Y_DEGREES.to_radians(), aspect_ratio, Z_NEAR, Z_FAR)
    }

    /// Maps clip-space positions back to world space.
    pub fn projection_to_world(&self, aspect_ratio: f32) -> Mat4 {
        (self.projection(aspect_ratio) * self.view()).inverse()
    }
}

pub struct Light {
    position: Vec3,
    ambient: Vec4,
    diffuse: Vec4,
}

impl Default for Light {
    fn default() -> Self {
        Light {
            position: vec3(0.0, 18.0, -20.0),
            ambient: vec4(0.25, 0.25, 0.25, 1.0),
            diffuse: vec4(0.6, 0.6, 0.6, 1.0),
        }
    }
}

impl Light {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn ambient(&self) -> Vec4 {
        self.ambient
    }

    pub fn diffuse(&self) -> Vec4 {
        self.diffuse
    }

    pub fn animate(&mut self, delta_time: f32) {
        let degrees = -360.0 * delta_time / LIGHT_PERIOD;
        self.position = Mat3::from_rotation_y(degrees.to_radians()) * self.position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_is_rotated_about_y() {
        let camera = Camera::default();
        assert!((camera.position().length() - vec3(22.0, 2.0, 3.0).length()).abs() < 1e-4);
        assert!((camera.position().y - 2.0).abs() < 1e-5);
        assert_eq!(camera.at, vec3(0.0, 0.0, -4.0));
    }

    #[test]
    fn camera_completes_a_turn_per_period() {
        let mut camera = Camera::default();
        let start = camera.position();
        for _ in 0..480 {
            camera.animate(0.1);
        }
        assert!(camera.position().abs_diff_eq(start, 1e-2));
        assert!(camera.at.abs_diff_eq(vec3(0.0, 0.0, -4.0), 1e-2));
    }

    #[test]
    fn light_turns_clockwise() {
        let mut light = Light::default();
        light.animate(LIGHT_PERIOD / 4.0);
        // -90 degrees about Y takes -Z to +X.
        assert!(light.position().abs_diff_eq(vec3(20.0, 18.0, 0.0), 1e-3));
    }

    #[test]
    fn projection_to_world_unprojects_the_view_center() {
        let camera = Camera::default();
        let inverse = camera.projection_to_world(16.0 / 9.0);
        let near = inverse.project_point3(vec3(0.0, 0.0, 0.0));
        let far = inverse.project_point3(vec3(0.0, 0.0, 1.0));
        let direction = (far - near).normalize();
        let expected = (camera.at - camera.position()).normalize();
        assert!(direction.abs_diff_eq(expected, 1e-3));
        assert!(near.abs_diff_eq(camera.position(), 0.05));
    }
}
