#![cfg_attr(target_arch = "spirv", no_std)]

use spirv_std::glam::{uvec2, vec2, vec3, vec4, Mat4, UVec3, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;
use spirv_std::ray_tracing::{AccelerationStructure, RayFlags};
use spirv_std::{spirv, Image};

const RADIANCE_RAY: i32 = 0;
const SHADOW_RAY: i32 = 1;
const RAY_TYPE_COUNT: i32 = 2;
const CULL_MASK: i32 = 0xFF;

const T_MIN: f32 = 0.001;
const T_MAX: f32 = 10000.0;

const BACKGROUND_COLOR: Vec4 = Vec4::new(0.5, 0.7, 1.0, 1.0);
const IN_SHADOW_RADIANCE: f32 = 0.35;

const METABALL_THRESHOLD: f32 = 0.25;
const METABALL_STEPS: u32 = 64;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct SceneConstants {
    pub projection_to_world: Mat4,
    pub camera_position: Vec4,
    pub light_position: Vec4,
    pub light_ambient_color: Vec4,
    pub light_diffuse_color: Vec4,
    pub reflectance: f32,
    pub elapsed_time: f32,
    pub max_recursion_depth: u32,
}

/// First 64 bytes of every hit record.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct Material {
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
    _padding: [u32; 3],
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct ProceduralRecord {
    pub material: Material,
    pub instance_index: u32,
    pub primitive_type: u32,
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct PrimitiveTransform {
    pub local_to_bottom_level: Mat4,
    pub bottom_level_to_local: Mat4,
}

#[derive(Copy, Clone)]
pub struct RayPayload {
    pub color: Vec4,
    pub recursion_depth: u32,
}

#[derive(Copy, Clone)]
pub struct ShadowPayload {
    pub hit: u32,
}

/// Bottom level space normal reported by the intersection shaders.
#[derive(Copy, Clone)]
pub struct ProceduralAttributes {
    pub normal: Vec3,
}

fn trace_radiance(
    tlas: &AccelerationStructure,
    scene: &SceneConstants,
    origin: Vec3,
    direction: Vec3,
    depth: u32,
    payload: &mut RayPayload,
) -> Vec4 {
    if depth >= scene.max_recursion_depth {
        return Vec4::ZERO;
    }
    payload.color = Vec4::ZERO;
    payload.recursion_depth = depth + 1;
    unsafe {
        tlas.trace_ray(
            RayFlags::NONE,
            CULL_MASK,
            RADIANCE_RAY,
            RAY_TYPE_COUNT,
            RADIANCE_RAY,
            origin,
            T_MIN,
            direction,
            T_MAX,
            payload,
        );
    }
    payload.color
}

fn trace_shadow(
    tlas: &AccelerationStructure,
    scene: &SceneConstants,
    position: Vec3,
    depth: u32,
    payload: &mut ShadowPayload,
) -> bool {
    if depth >= scene.max_recursion_depth {
        return false;
    }
    let to_light = scene.light_position.xyz() - position;
    // Assume occluded until the shadow miss shader says otherwise.
    payload.hit = 1;
    unsafe {
        tlas.trace_ray(
            RayFlags::ACCEPT_FIRST_HIT_AND_END_SEARCH
                | RayFlags::SKIP_CLOSEST_HIT_SHADER
                | RayFlags::OPAQUE,
            CULL_MASK,
            SHADOW_RAY,
            RAY_TYPE_COUNT,
            SHADOW_RAY,
            position,
            T_MIN,
            to_light.normalize(),
            to_light.length(),
            payload,
        );
    }
    payload.hit != 0
}

fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Zero when the ray is totally internally reflected.
fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Vec3 {
    let cos_i = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos_i * cos_i);
    if k < 0.0 {
        Vec3::ZERO
    } else {
        eta * incident - (eta * cos_i + k.sqrt()) * normal
    }
}

fn fresnel_schlick(cos_theta: f32, f0: Vec3) -> Vec3 {
    f0 + (Vec3::ONE - f0) * (1.0 - cos_theta.max(0.0)).powf(5.0)
}

fn phong(
    scene: &SceneConstants,
    material: &Material,
    albedo: Vec4,
    position: Vec3,
    normal: Vec3,
    incident: Vec3,
    shadowed: bool,
) -> Vec4 {
    let to_light = (scene.light_position.xyz() - position).normalize();
    let n_dot_l = normal.dot(to_light).max(0.0);
    let shadow_factor = if shadowed { IN_SHADOW_RADIANCE } else { 1.0 };

    let ambient = scene.light_ambient_color * albedo;
    let diffuse =
        shadow_factor * material.diffuse_coef * n_dot_l * albedo * scene.light_diffuse_color;

    let mut specular = Vec4::ZERO;
    if !shadowed && material.specular_coef > 0.0 {
        let highlight = reflect(-to_light, normal).dot(-incident).max(0.0);
        specular = material.specular_coef
            * highlight.powf(material.specular_power)
            * scene.light_diffuse_color;
    }

    ambient + diffuse + specular
}

/// Fades distant hits into the background.
fn distance_falloff(color: Vec4, t: f32) -> Vec4 {
    let fog = 1.0 - (-0.000002 * t * t * t).exp();
    color.lerp(BACKGROUND_COLOR, fog)
}

fn hash(p: Vec3) -> f32 {
    (p.dot(vec3(127.1, 311.7, 74.7)).sin() * 43758.547).fract()
}

fn value_noise(p: Vec3) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let u = f * f * (Vec3::splat(3.0) - 2.0 * f);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let corner = |x: f32, y: f32, z: f32| hash(cell + vec3(x, y, z));

    let x00 = lerp(corner(0.0, 0.0, 0.0), corner(1.0, 0.0, 0.0), u.x);
    let x10 = lerp(corner(0.0, 1.0, 0.0), corner(1.0, 1.0, 0.0), u.x);
    let x01 = lerp(corner(0.0, 0.0, 1.0), corner(1.0, 0.0, 1.0), u.x);
    let x11 = lerp(corner(0.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), u.x);
    lerp(lerp(x00, x10, u.y), lerp(x01, x11, u.y), u.z)
}

fn to_local(transform: &PrimitiveTransform, point: Vec3) -> Vec3 {
    (transform.bottom_level_to_local * point.extend(1.0)).xyz()
}

fn local_normal_to_bottom_level(transform: &PrimitiveTransform, normal: Vec3) -> Vec3 {
    (transform.bottom_level_to_local.transpose() * normal.extend(0.0))
        .xyz()
        .normalize()
}

#[spirv(ray_generation)]
pub fn raygen(
    #[spirv(launch_id)] launch_id: UVec3,
    #[spirv(launch_size)] launch_size: UVec3,
    #[spirv(descriptor_set = 0, binding = 0)] tlas: &AccelerationStructure,
    #[spirv(descriptor_set = 0, binding = 1)] output: &Image!(2D, format=rgba8, sampled=false),
    #[spirv(uniform, descriptor_set = 0, binding = 2)] scene: &SceneConstants,
    #[spirv(ray_payload)] payload: &mut RayPayload,
) {
    let pixel_center = vec2(launch_id.x as f32, launch_id.y as f32) + vec2(0.5, 0.5);
    let screen = pixel_center / vec2(launch_size.x as f32, launch_size.y as f32) * 2.0 - Vec2::ONE;

    // Image rows grow downwards, clip space y grows upwards.
    let world = scene.projection_to_world * vec4(screen.x, -screen.y, 0.0, 1.0);
    let world = world.xyz() / world.w;
    let origin = scene.camera_position.xyz();
    let direction = (world - origin).normalize();

    let color = trace_radiance(tlas, scene, origin, direction, 0, payload);

    unsafe {
        output.write(
            uvec2(launch_id.x, launch_id.y),
            color.clamp(Vec4::ZERO, Vec4::ONE),
        );
    }
}

#[spirv(miss)]
pub fn miss_radiance(#[spirv(incoming_ray_payload)] payload: &mut RayPayload) {
    payload.color = BACKGROUND_COLOR;
}

#[spirv(miss)]
pub fn miss_shadow(#[spirv(incoming_ray_payload)] payload: &mut ShadowPayload) {
    payload.hit = 0;
}

fn plane_index(indices: &[u32], i: u32) -> u32 {
    let word = indices[(i / 2) as usize];
    (word >> ((i % 2) * 16)) & 0xFFFF
}

fn plane_normal(vertices: &[f32], vertex: u32) -> Vec3 {
    // position then normal, three floats each
    let base = (vertex * 6 + 3) as usize;
    vec3(vertices[base], vertices[base + 1], vertices[base + 2])
}

#[spirv(closest_hit)]
#[allow(clippy::too_many_arguments)]
pub fn closest_hit_triangle(
    #[spirv(world_ray_origin)] ray_origin: Vec3,
    #[spirv(world_ray_direction)] ray_direction: Vec3,
    #[spirv(ray_tmax)] t: f32,
    #[spirv(primitive_id)] primitive_id: u32,
    #[spirv(incoming_ray_payload)] payload: &mut RayPayload,
    #[spirv(ray_payload)] reflection_payload: &mut RayPayload,
    #[spirv(ray_payload)] shadow_payload: &mut ShadowPayload,
    #[spirv(shader_record_buffer)] material: &Material,
    #[spirv(descriptor_set = 0, binding = 0)] tlas: &AccelerationStructure,
    #[spirv(uniform, descriptor_set = 0, binding = 2)] scene: &SceneConstants,
    #[spirv(storage_buffer, descriptor_set = 0, binding = 4)] vertices: &[f32],
    #[spirv(storage_buffer, descriptor_set = 0, binding = 5)] indices: &[u32],
) {
    let first = primitive_id * 3;
    let normal = (plane_normal(vertices, plane_index(indices, first))
        + plane_normal(vertices, plane_index(indices, first + 1))
        + plane_normal(vertices, plane_index(indices, first + 2)))
    .normalize();

    let position = ray_origin + t * ray_direction;
    let depth = payload.recursion_depth;

    // checkerboard
    let cell = position.x.floor() as i32 + position.z.floor() as i32;
    let albedo = if cell & 1 == 0 {
        material.albedo
    } else {
        material.albedo * 0.6
    };

    let shadowed = trace_shadow(tlas, scene, position, depth, shadow_payload);
    let mut color = phong(
        scene,
        material,
        albedo,
        position,
        normal,
        ray_direction,
        shadowed,
    );

    let reflectance = material.reflectance_coef;
    if reflectance > 0.0 {
        let reflected = trace_radiance(
            tlas,
            scene,
            position,
            reflect(ray_direction, normal),
            depth,
            reflection_payload,
        );
        let fresnel = fresnel_schlick(normal.dot(-ray_direction), albedo.xyz());
        color += reflectance * fresnel.extend(1.0) * reflected;
    }

    payload.color = distance_falloff(color, t);
}

/// Distance along the ray to a sphere of `radius` at the local origin, or a
/// negative value on a miss. `direction` does not need to be normalized.
fn ray_sphere(origin: Vec3, direction: Vec3, radius: f32, t_min: f32, t_max: f32) -> f32 {
    let a = direction.dot(direction);
    let b = 2.0 * origin.dot(direction);
    let c = origin.dot(origin) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return -1.0;
    }
    let root = discriminant.sqrt();
    let near = (-b - root) / (2.0 * a);
    let far = (-b + root) / (2.0 * a);
    if near >= t_min && near <= t_max {
        near
    } else if far >= t_min && far <= t_max {
        far
    } else {
        -1.0
    }
}

#[spirv(intersection)]
pub fn intersection_sphere(
    #[spirv(object_ray_origin)] ray_origin: Vec3,
    #[spirv(object_ray_direction)] ray_direction: Vec3,
    #[spirv(ray_tmin)] t_min: f32,
    #[spirv(ray_tmax)] t_max: f32,
    #[spirv(shader_record_buffer)] record: &ProceduralRecord,
    #[spirv(storage_buffer, descriptor_set = 0, binding = 3)] transforms: &[PrimitiveTransform],
    #[spirv(hit_attribute)] attributes: &mut ProceduralAttributes,
) {
    let transform = &transforms[record.instance_index as usize];
    let origin = to_local(transform, ray_origin);
    let direction = (transform.bottom_level_to_local * ray_direction.extend(0.0)).xyz();

    let t = ray_sphere(origin, direction, record.material.radius, t_min, t_max);
    if t >= 0.0 {
        let normal = (origin + t * direction).normalize();
        attributes.normal = local_normal_to_bottom_level(transform, normal);
        unsafe {
            spirv_std::arch::report_intersection(t, 0);
        }
    }
}

/// Center in xyz and radius in w of one of the three animated balls.
fn metaball(index: u32, time: f32) -> Vec4 {
    let phase = time * 0.5;
    if index == 0 {
        vec4(-0.3 + 0.3 * phase.sin(), -0.3, -0.4, 0.5)
    } else if index == 1 {
        vec4(0.35, 0.2 + 0.35 * (phase * 1.3).cos(), 0.0, 0.45)
    } else {
        vec4(-0.1, 0.3, 0.4 * (phase * 0.7).sin(), 0.4)
    }
}

/// Field strength and its gradient at `p`.
fn metaball_field(p: Vec3, time: f32) -> Vec4 {
    let mut field = 0.0;
    let mut gradient = Vec3::ZERO;
    let mut i = 0;
    while i < 3 {
        let ball = metaball(i, time);
        let offset = p - ball.xyz();
        let falloff = 1.0 - offset.dot(offset) / (ball.w * ball.w);
        if falloff > 0.0 {
            field += falloff * falloff;
            gradient += -4.0 * falloff * offset / (ball.w * ball.w);
        }
        i += 1;
    }
    gradient.extend(field)
}

/// Entry and exit distances of the ray through the unit cube, entry > exit on
/// a miss.
fn unit_box_span(origin: Vec3, direction: Vec3) -> Vec2 {
    let inverse = Vec3::ONE / direction;
    let t0 = (Vec3::splat(-1.0) - origin) * inverse;
    let t1 = (Vec3::ONE - origin) * inverse;
    let near = t0.min(t1);
    let far = t0.max(t1);
    vec2(near.max_element(), far.min_element())
}

#[spirv(intersection)]
#[allow(clippy::too_many_arguments)]
pub fn intersection_metaballs(
    #[spirv(object_ray_origin)] ray_origin: Vec3,
    #[spirv(object_ray_direction)] ray_direction: Vec3,
    #[spirv(ray_tmin)] t_min: f32,
    #[spirv(ray_tmax)] t_max: f32,
    #[spirv(shader_record_buffer)] record: &ProceduralRecord,
    #[spirv(uniform, descriptor_set = 0, binding = 2)] scene: &SceneConstants,
    #[spirv(storage_buffer, descriptor_set = 0, binding = 3)] transforms: &[PrimitiveTransform],
    #[spirv(hit_attribute)] attributes: &mut ProceduralAttributes,
) {
    let transform = &transforms[record.instance_index as usize];
    let origin = to_local(transform, ray_origin);
    let direction = (transform.bottom_level_to_local * ray_direction.extend(0.0)).xyz();

    let span = unit_box_span(origin, direction);
    let start = span.x.max(t_min);
    let end = span.y.min(t_max);
    if start > end {
        return;
    }

    let step = (end - start) / METABALL_STEPS as f32;
    let mut t = start;
    let mut i = 0;
    while i <= METABALL_STEPS {
        let sample = metaball_field(origin + t * direction, scene.elapsed_time);
        if sample.w >= METABALL_THRESHOLD {
            attributes.normal = local_normal_to_bottom_level(transform, -sample.xyz());
            unsafe {
                spirv_std::arch::report_intersection(t, 0);
            }
            return;
        }
        t += step;
        i += 1;
    }
}

#[spirv(closest_hit)]
#[allow(clippy::too_many_arguments)]
pub fn closest_hit_aabb(
    #[spirv(world_ray_origin)] ray_origin: Vec3,
    #[spirv(world_ray_direction)] ray_direction: Vec3,
    #[spirv(object_ray_origin)] object_origin: Vec3,
    #[spirv(object_ray_direction)] object_direction: Vec3,
    #[spirv(ray_tmax)] t: f32,
    #[spirv(hit_attribute)] attributes: &ProceduralAttributes,
    #[spirv(incoming_ray_payload)] payload: &mut RayPayload,
    #[spirv(ray_payload)] secondary_payload: &mut RayPayload,
    #[spirv(ray_payload)] shadow_payload: &mut ShadowPayload,
    #[spirv(shader_record_buffer)] record: &ProceduralRecord,
    #[spirv(descriptor_set = 0, binding = 0)] tlas: &AccelerationStructure,
    #[spirv(uniform, descriptor_set = 0, binding = 2)] scene: &SceneConstants,
    #[spirv(storage_buffer, descriptor_set = 0, binding = 3)] transforms: &[PrimitiveTransform],
) {
    let material = &record.material;
    let transform = &transforms[record.instance_index as usize];
    let position = ray_origin + t * ray_direction;
    let local = to_local(transform, object_origin + t * object_direction);
    let normal = attributes.normal;
    let depth = payload.recursion_depth;

    let mut albedo = material.albedo;
    if material.has_texture != 0 {
        let ring = local.normalize();
        let u = ring.z.atan2(ring.x) / (2.0 * core::f32::consts::PI) + 0.5;
        let v = ring.y.acos() / core::f32::consts::PI;
        let tile = (u * 16.0).floor() as i32 + (v * 8.0).floor() as i32;
        if tile & 1 == 1 {
            albedo *= 0.3;
        }
    }
    if material.has_perlin != 0 {
        albedo *= 0.5 + 0.5 * value_noise(local * 4.0);
    }

    let shadowed = trace_shadow(tlas, scene, position, depth, shadow_payload);
    let mut color = phong(
        scene,
        material,
        albedo,
        position,
        normal,
        ray_direction,
        shadowed,
    );

    let cos_theta = normal.dot(-ray_direction);
    if material.refraction_index > 0.0 {
        let entering = cos_theta > 0.0;
        let facing = if entering { normal } else { -normal };
        let eta = if entering {
            1.0 / material.refraction_index
        } else {
            material.refraction_index
        };
        let f0 = (1.0 - material.refraction_index) / (1.0 + material.refraction_index);
        let fresnel = fresnel_schlick(cos_theta.abs(), Vec3::splat(f0 * f0)).x;

        let reflected = trace_radiance(
            tlas,
            scene,
            position,
            reflect(ray_direction, facing),
            depth,
            secondary_payload,
        );
        let refracted_direction = refract(ray_direction, facing, eta);
        let refracted = if refracted_direction == Vec3::ZERO {
            reflected
        } else {
            trace_radiance(
                tlas,
                scene,
                position,
                refracted_direction,
                depth,
                secondary_payload,
            )
        };
        color += albedo * (fresnel * reflected + (1.0 - fresnel) * refracted);
    } else if material.reflectance_coef > 0.0 {
        let mut direction = reflect(ray_direction, normal);
        if material.fuzz < 1.0 {
            let jitter = vec3(
                hash(position) * 2.0 - 1.0,
                hash(position + Vec3::X) * 2.0 - 1.0,
                hash(position + Vec3::Y) * 2.0 - 1.0,
            );
            direction = (direction + material.fuzz * jitter).normalize();
        }
        let reflected = trace_radiance(tlas, scene, position, direction, depth, secondary_payload);
        let fresnel = fresnel_schlick(cos_theta, albedo.xyz());
        color += material.reflectance_coef * fresnel.extend(1.0) * reflected;
    }

    payload.color = distance_falloff(color, t);
}
