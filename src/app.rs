use crate::camera::{Camera, Light};
use crate::config::RenderConfig;
use crate::error::Result;
use crate::output::FrameWriter;
use crate::renderers::raytracer::{Raytracer, FRAMES_IN_FLIGHT};
use crate::renderers::{FrameState, Renderer, SceneConstants};
use crate::scene::animation::GeometryAnimation;
use crate::scene::{Primitive, SceneDescription};
use crate::time::Time;
use crate::vulkan::buffer::Buffer;
use crate::vulkan::command_buffer::{Access, CommandBuffer};
use crate::vulkan::command_pool::CommandPool;
use crate::vulkan::debug_utils::DebugMessenger;
use crate::vulkan::device::Device;
use crate::vulkan::fence::Fence;
use crate::vulkan::instance::Instance;
use crate::vulkan::raytracing::raytracing_properties::RaytracingProperties;
use erupt::vk;

/// Resources owned by one frame in flight.
struct FrameSlot {
    command_buffer: CommandBuffer,
    fence: Fence,
    readback: Buffer,
    /// Frame whose pixels land in `readback` once `fence` signals.
    pending: Option<u32>,
}

impl FrameSlot {
    fn new(device: &Device, command_buffer: CommandBuffer, readback_size: u64) -> Result<Self> {
        let fence = Fence::new(device, true)?;
        let readback = Buffer::empty(
            device,
            readback_size,
            vk::BufferUsageFlags::TRANSFER_DST,
            gpu_alloc::UsageFlags::HOST_ACCESS | gpu_alloc::UsageFlags::DOWNLOAD,
        );
        match readback {
            Ok(readback) => Ok(FrameSlot {
                command_buffer,
                fence,
                readback,
                pending: None,
            }),
            Err(err) => {
                fence.destroy(device);
                Err(err)
            }
        }
    }

    fn destroy(&mut self, device: &Device) {
        self.readback.destroy(device);
        self.fence.destroy(device);
    }
}

fn frame_slots(
    device: &Device,
    command_pool: &CommandPool,
    readback_size: u64,
) -> Result<Vec<FrameSlot>> {
    let command_buffers = command_pool.allocate(device, FRAMES_IN_FLIGHT as u32)?;
    let mut slots = Vec::with_capacity(FRAMES_IN_FLIGHT);
    for command_buffer in command_buffers {
        match FrameSlot::new(device, command_buffer, readback_size) {
            Ok(slot) => slots.push(slot),
            Err(err) => {
                for slot in &mut slots {
                    slot.destroy(device);
                }
                return Err(err);
            }
        }
    }
    Ok(slots)
}

/// Instance, debug messenger and device. Torn down on drop, after everything
/// created from the device is gone.
struct Context {
    instance: Instance,
    debug_messenger: Option<DebugMessenger>,
    device: Device,
}

impl Context {
    fn new() -> Result<Self> {
        let mut instance = Instance::new()?;
        let mut debug_messenger = None;
        if instance.validation_enabled() {
            match DebugMessenger::new(&instance) {
                Ok(messenger) => debug_messenger = Some(messenger),
                Err(err) => {
                    instance.destroy();
                    return Err(err);
                }
            }
        }
        match Device::new(&instance) {
            Ok(device) => Ok(Context {
                instance,
                debug_messenger,
                device,
            }),
            Err(err) => {
                if let Some(messenger) = &mut debug_messenger {
                    messenger.destroy(&instance);
                }
                instance.destroy();
                Err(err)
            }
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.device.destroy();
        if let Some(debug_messenger) = &mut self.debug_messenger {
            debug_messenger.destroy(&self.instance);
        }
        self.instance.destroy();
    }
}

pub struct App {
    config: RenderConfig,
    scene: SceneDescription,
    primitives: Vec<Primitive>,
    renderer: Box<dyn Renderer>,
    command_pool: CommandPool,
    slots: Vec<FrameSlot>,
    writer: FrameWriter,
    camera: Camera,
    light: Light,
    animation: GeometryAnimation,
    time: Time,
    // Declared last so it drops after `App::drop` has released the rest.
    context: Context,
}

impl App {
    pub fn new(config: RenderConfig) -> Result<Self> {
        log::info!(
            "Starting rtengine: {}x{}, {} frames",
            config.width,
            config.height,
            config.frames
        );

        let writer = FrameWriter::new(
            &config.output_dir,
            config.width,
            config.height,
            config.encode_batch,
        )?;

        let context = Context::new()?;
        let device = &context.device;
        let raytracing_properties = RaytracingProperties::new(device, &context.instance);

        let scene = config.scene();
        let primitives = scene.primitives();
        log::info!(
            "Scene: {} spheres, {} metaball volumes",
            scene.spheres.len(),
            scene.metaballs.len()
        );

        let mut raytracer = Raytracer::new(device, &raytracing_properties, &config, &scene)?;
        let readback_size = raytracer.output_image().byte_size();

        let command_pool = match CommandPool::new(device, device.queue_family_index(), true) {
            Ok(command_pool) => command_pool,
            Err(err) => {
                raytracer.destroy(device);
                return Err(err);
            }
        };
        let slots = match frame_slots(device, &command_pool, readback_size) {
            Ok(slots) => slots,
            Err(err) => {
                command_pool.destroy(device);
                raytracer.destroy(device);
                return Err(err);
            }
        };

        Ok(App {
            time: Time::fixed(config.frame_time),
            config,
            scene,
            primitives,
            renderer: Box::new(raytracer),
            command_pool,
            slots,
            writer,
            camera: Camera::default(),
            light: Light::default(),
            animation: GeometryAnimation::default(),
            context,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        for frame in 0..self.config.frames {
            let slot = frame as usize % FRAMES_IN_FLIGHT;
            self.collect(slot)?;

            let state = frame_state(
                &self.config,
                &self.scene,
                &self.primitives,
                &self.camera,
                &self.light,
                &self.animation,
            );
            self.renderer.update(&self.context.device, slot, &state)?;
            self.record(slot)?;

            let FrameSlot {
                command_buffer,
                fence,
                pending,
                ..
            } = &mut self.slots[slot];
            self.context.device.submit(&[command_buffer.handle()], fence.handle())?;
            *pending = Some(frame);

            log::debug!(
                "Frame {} submitted after {:?}",
                frame,
                self.time.frame_duration()
            );
            self.advance();
        }

        // Drain the slots oldest first so frames reach the writer in order.
        let first = self.config.frames as usize % FRAMES_IN_FLIGHT;
        for offset in 0..FRAMES_IN_FLIGHT {
            self.collect((first + offset) % FRAMES_IN_FLIGHT)?;
        }
        self.writer.flush()?;

        log::info!(
            "Wrote {} frames ({:.2}s of animation) to {}",
            self.writer.written(),
            self.time.elapsed(),
            self.config.output_dir.display()
        );
        Ok(())
    }

    /// Waits for the slot's last submission and hands its pixels to the
    /// writer. Leaves the fence unsignaled for the next submission.
    fn collect(&mut self, slot: usize) -> Result<()> {
        let FrameSlot {
            fence,
            readback,
            pending,
            ..
        } = &mut self.slots[slot];
        let device = &self.context.device;
        fence.wait(device)?;
        fence.reset(device)?;

        if let Some(frame) = pending.take() {
            let mut pixels = vec![0u8; self.renderer.output_image().byte_size() as usize];
            readback.read_bytes(device, &mut pixels)?;
            self.writer.push(frame, pixels)?;
        }
        Ok(())
    }

    fn record(&self, slot: usize) -> Result<()> {
        let device = &self.context.device;
        let FrameSlot {
            command_buffer,
            readback,
            ..
        } = &self.slots[slot];
        let output_image = self.renderer.output_image();

        command_buffer.reset(device)?;
        command_buffer.begin(device)?;
        self.renderer
            .fill_command_buffer(device, command_buffer, slot);
        command_buffer.copy_image_to_buffer(
            device,
            output_image.handle(),
            output_image.extent(),
            readback,
        );
        command_buffer.memory_barrier(device, Access::TRANSFER_WRITE, Access::HOST_READ);
        command_buffer.end(device)
    }

    fn advance(&mut self) {
        self.time.tick();
        let delta_time = self.time.delta_time();
        if self.config.animate_camera {
            self.camera.animate(delta_time);
        }
        if self.config.animate_light {
            self.light.animate(delta_time);
        }
        if self.config.animate_geometry {
            self.animation.advance(delta_time);
        }
    }
}

fn frame_state(
    config: &RenderConfig,
    scene: &SceneDescription,
    primitives: &[Primitive],
    camera: &Camera,
    light: &Light,
    animation: &GeometryAnimation,
) -> FrameState {
    FrameState {
        constants: SceneConstants {
            projection_to_world: camera.projection_to_world(config.aspect_ratio()),
            camera_position: camera.position().extend(1.0),
            light_position: light.position().extend(1.0),
            light_ambient_color: light.ambient(),
            light_diffuse_color: light.diffuse(),
            reflectance: scene.plane.material.reflectance_coef,
            // Metaballs move with the geometry animation, not the clock.
            elapsed_time: animation.rotation_time(),
            max_recursion_depth: config.max_recursion_depth,
        },
        transforms: animation.transforms(primitives),
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let device = &self.context.device;
        if let Err(err) = device.wait_idle() {
            log::error!("Failed to wait for device idle: {}", err);
        }
        self.renderer.destroy(device);
        for slot in &mut self.slots {
            slot.destroy(device);
        }
        self.command_pool.destroy(device);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ScenePreset;

    #[test]
    fn frame_state_follows_scene_and_clock() {
        let config = RenderConfig {
            preset: ScenePreset::Spheres,
            ..Default::default()
        };
        let scene = config.scene();
        let primitives = scene.primitives();
        let mut animation = GeometryAnimation::default();
        animation.advance(0.25);

        let state = frame_state(
            &config,
            &scene,
            &primitives,
            &Camera::default(),
            &Light::default(),
            &animation,
        );

        assert_eq!(state.transforms.len(), primitives.len());
        assert_eq!(state.constants.elapsed_time, 0.25);
        assert_eq!(state.constants.reflectance, 0.1);
        assert_eq!(state.constants.max_recursion_depth, config.max_recursion_depth);
        assert_eq!(state.constants.camera_position.w, 1.0);
        assert_eq!(
            state.constants.light_position.truncate(),
            Light::default().position()
        );
    }

    #[test]
    fn metaball_clock_stops_with_geometry_animation() {
        let config = RenderConfig {
            preset: ScenePreset::Metaballs,
            animate_geometry: false,
            ..Default::default()
        };
        let scene = config.scene();
        let primitives = scene.primitives();
        let mut time = Time::fixed(config.frame_time);
        let mut animation = GeometryAnimation::default();
        for _ in 0..30 {
            time.tick();
            if config.animate_geometry {
                animation.advance(time.delta_time());
            }
        }

        let state = frame_state(
            &config,
            &scene,
            &primitives,
            &Camera::default(),
            &Light::default(),
            &animation,
        );
        assert!(time.elapsed() > 0.9);
        assert_eq!(state.constants.elapsed_time, 0.0);
    }
}
