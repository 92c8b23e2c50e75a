use crate::error::Result;
use crate::scene::animation::PrimitiveTransform;
use crate::vulkan::command_buffer::CommandBuffer;
use crate::vulkan::device::Device;
use crate::vulkan::image::Image;
use crevice::std140::AsStd140;
use glam::{Mat4, Vec4};

pub mod raytracer;
pub mod shader_groups;

/// Scene wide values read by every ray tracing stage.
#[derive(Copy, Clone, Debug, AsStd140)]
pub struct SceneConstants {
    pub projection_to_world: Mat4,
    pub camera_position: Vec4,
    pub light_position: Vec4,
    pub light_ambient_color: Vec4,
    pub light_diffuse_color: Vec4,
    pub reflectance: f32,
    pub elapsed_time: f32,
    /// Levels of rays the shaders may trace, primary rays included.
    pub max_recursion_depth: u32,
}

/// CPU side results of one animation step.
pub struct FrameState {
    pub constants: SceneConstants,
    pub transforms: Vec<PrimitiveTransform>,
}

pub trait Renderer {
    /// Copies `frame` into the resources owned by `current_frame`.
    fn update(&mut self, device: &Device, current_frame: usize, frame: &FrameState) -> Result<()>;

    fn fill_command_buffer(
        &self,
        device: &Device,
        command_buffer: &CommandBuffer,
        current_frame: usize,
    );

    /// Image left in `TRANSFER_SRC_OPTIMAL` by `fill_command_buffer`.
    fn output_image(&self) -> &Image;

    fn destroy(&mut self, device: &Device);
}
