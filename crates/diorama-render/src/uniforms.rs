//! GPU uniform layouts shared by the scene shaders.

use bytemuck::{Pod, Zeroable};
use diorama_config::{LightingConfig, rgb_from_hex};
use diorama_globe::FrameSnapshot;
use glam::Mat4;

/// Bind group 0 of every scene shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SceneUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view_matrix: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    /// Toward the sun, world space.
    pub sun_direction: [f32; 4],
    /// rgb, a = intensity.
    pub sun_color: [f32; 4],
    /// Ambient rgb premultiplied by intensity.
    pub ambient: [f32; 4],
    /// Hemisphere sky rgb, a = hemisphere intensity.
    pub sky_color: [f32; 4],
    pub ground_color: [f32; 4],
    /// Exponential-squared fog rgb, a = density.
    pub fog: [f32; 4],
}

impl SceneUniform {
    pub fn new(frame: &FrameSnapshot, lighting: &LightingConfig) -> Self {
        let rgba = |rgb: [f32; 3], a: f32| [rgb[0], rgb[1], rgb[2], a];
        let ambient = lighting.ambient_intensity;
        Self {
            view_proj: frame.view_proj.to_cols_array_2d(),
            view_matrix: frame.view.to_cols_array_2d(),
            camera_position: frame.camera_position.extend(1.0).to_array(),
            sun_direction: frame.sun_world_direction.extend(0.0).to_array(),
            sun_color: rgba(lighting.sun_rgb(), lighting.sun_intensity),
            ambient: [ambient, ambient, ambient, 1.0],
            sky_color: rgba(lighting.sky_rgb(), lighting.hemisphere_intensity),
            ground_color: rgba(lighting.ground_rgb(), 1.0),
            fog: rgba(lighting.fog_rgb(), lighting.fog_density),
        }
    }
}

/// Bind group 1 uniform of the standard material.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniform {
    /// rgb, a = opacity.
    pub base_color: [f32; 4],
    pub emissive: [f32; 4],
    /// x = roughness, y = metalness, z = 1 when fogged.
    pub params: [f32; 4],
}

impl MaterialUniform {
    pub fn textured(roughness: f32, metalness: f32, opacity: f32) -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, opacity],
            emissive: [0.0; 4],
            params: [roughness, metalness, 1.0, 0.0],
        }
    }

    /// A flat-colored glossy material from `0xRRGGBB` colors.
    pub fn solid(color: u32, emissive: u32) -> Self {
        let [r, g, b] = rgb_from_hex(color);
        let [er, eg, eb] = rgb_from_hex(emissive);
        Self {
            base_color: [r, g, b, 1.0],
            emissive: [er, eg, eb, 0.0],
            params: [0.25, 0.0, 1.0, 0.0],
        }
    }
}

/// Bind group 2: per-draw transforms.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// Rotation of the mesh inside the globe group, for group-frame normals.
    pub local_rotation: [[f32; 4]; 4],
}

impl ObjectUniform {
    pub fn new(model: Mat4, local_rotation: Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            local_rotation: local_rotation.to_cols_array_2d(),
        }
    }
}

/// Bind group 3 uniform read by the globe material patches.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GlobeUniform {
    pub sun_direction: [f32; 3],
    pub displacement_scale: f32,
    pub debug_mode: u32,
    pub cloud_altitude: f32,
    pub _padding: [f32; 2],
}

impl GlobeUniform {
    pub fn new(frame: &FrameSnapshot) -> Self {
        Self {
            sun_direction: frame.sun_local_direction.to_array(),
            displacement_scale: frame.displacement_scale,
            debug_mode: frame.color_mode.index(),
            cloud_altitude: frame.cloud_altitude,
            _padding: [0.0; 2],
        }
    }
}
