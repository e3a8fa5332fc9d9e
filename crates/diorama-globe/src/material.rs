//! Globe material customization as declarative shader patches.
//!
//! The terrain and cloud materials are the renderer's standard lit material
//! with WGSL fragments injected at named anchors. This module supplies the
//! fragment text and the uniform values; the render crate owns the template
//! and does the injection.
//!
//! Fragments may rely on the template providing, in the vertex stage,
//! `var transformed: vec3<f32>`, `normal`, `uv` and `out.custom`; in the
//! fragment stage, `var final_color: vec3<f32>`, `in.uv`, `in.custom`,
//! `in.group_normal`, `roughness_map` and `material_sampler`. Custom
//! bindings live in bind group 3: the `globe` uniform at 0, `height_map` at 1,
//! `night_map` at 2 and `globe_sampler` at 3.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec3;
use serde::Serialize;

/// Named injection points in the standard material template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderAnchor {
    /// Module scope, before the entry points.
    CommonDeclarations,
    /// Vertex stage, after the object-space position is loaded and before the
    /// model transform.
    BeginVertexTransform,
    /// Fragment stage, after lighting and before fog.
    FinalColorAssignment,
}

impl ShaderAnchor {
    pub const ALL: [Self; 3] = [
        Self::CommonDeclarations,
        Self::BeginVertexTransform,
        Self::FinalColorAssignment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::CommonDeclarations => "common",
            Self::BeginVertexTransform => "begin_vertex",
            Self::FinalColorAssignment => "final_color",
        }
    }
}

/// A fragment of WGSL to inject at an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderPatch {
    pub anchor: ShaderAnchor,
    pub fragment: &'static str,
}

const GLOBE_UNIFORM_DECL: &str = r#"
struct GlobeUniform {
    sun_direction: vec3<f32>,
    displacement_scale: f32,
    debug_mode: u32,
    cloud_altitude: f32,
    _padding: vec2<f32>,
};

@group(3) @binding(0) var<uniform> globe: GlobeUniform;
@group(3) @binding(1) var height_map: texture_2d<f32>;
@group(3) @binding(3) var globe_sampler: sampler;
"#;

const TERRAIN_EXTRA_DECL: &str = r#"
@group(3) @binding(2) var night_map: texture_2d<f32>;
"#;

const TERRAIN_VERTEX: &str = r#"
    let elevation = textureSampleLevel(height_map, globe_sampler, uv, 0.0).r;
    if (elevation > 0.01) {
        transformed = transformed + normal * elevation * globe.displacement_scale;
    }
    out.custom = vec4<f32>(elevation, 0.0, 0.0, 0.0);
"#;

const TERRAIN_FINAL_COLOR: &str = r#"
    let elevation = in.custom.x;
    if (elevation > 0.01) {
        let forest = vec3<f32>(0.31, 0.78, 0.47);
        let snow = vec3<f32>(0.97, 0.97, 0.99);
        final_color = mix(final_color, forest, smoothstep(0.05, 0.35, elevation) * 0.25);
        final_color = mix(final_color, snow, smoothstep(0.5, 0.7, elevation) * 0.9);
    }
    let sun_amount = smoothstep(-0.1, 0.1, dot(normalize(in.group_normal), globe.sun_direction));
    let night_light = textureSample(night_map, globe_sampler, in.uv).rgb;
    final_color = final_color * sun_amount + night_light * (1.0 - sun_amount);
    if (globe.debug_mode == 1u) {
        final_color = vec3<f32>(elevation);
    } else if (globe.debug_mode == 2u) {
        final_color = textureSample(roughness_map, material_sampler, in.uv).rrr;
    }
"#;

const CLOUD_VERTEX: &str = r#"
    let elevation = textureSampleLevel(height_map, globe_sampler, uv, 0.0).r;
    if (elevation > 0.01) {
        transformed = transformed + normal * elevation * globe.displacement_scale;
    }
    transformed = transformed + normal * globe.cloud_altitude;
"#;

/// Patches turning the standard material into the displaced, day/night terrain.
pub fn terrain_patches() -> Vec<ShaderPatch> {
    vec![
        ShaderPatch {
            anchor: ShaderAnchor::CommonDeclarations,
            fragment: GLOBE_UNIFORM_DECL,
        },
        ShaderPatch {
            anchor: ShaderAnchor::CommonDeclarations,
            fragment: TERRAIN_EXTRA_DECL,
        },
        ShaderPatch {
            anchor: ShaderAnchor::BeginVertexTransform,
            fragment: TERRAIN_VERTEX,
        },
        ShaderPatch {
            anchor: ShaderAnchor::FinalColorAssignment,
            fragment: TERRAIN_FINAL_COLOR,
        },
    ]
}

/// Patches lifting the cloud shell over the displaced terrain.
pub fn cloud_patches() -> Vec<ShaderPatch> {
    vec![
        ShaderPatch {
            anchor: ShaderAnchor::CommonDeclarations,
            fragment: GLOBE_UNIFORM_DECL,
        },
        ShaderPatch {
            anchor: ShaderAnchor::BeginVertexTransform,
            fragment: CLOUD_VERTEX,
        },
    ]
}

/// A displacement scale shared between uniform sets.
///
/// Clones refer to the same cell, so the terrain and the clouds always see the
/// same value.
#[derive(Debug, Clone)]
pub struct DisplacementScale(Rc<Cell<f32>>);

impl DisplacementScale {
    pub fn new(value: f32) -> Self {
        Self(Rc::new(Cell::new(value)))
    }

    pub fn get(&self) -> f32 {
        self.0.get()
    }

    pub fn set(&self, value: f32) {
        self.0.set(value);
    }

    pub fn shares_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Terrain color visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorDebugMode {
    #[default]
    Normal,
    HeightMap,
    SpecularMap,
}

impl ColorDebugMode {
    pub fn next(self) -> Self {
        match self {
            Self::Normal => Self::HeightMap,
            Self::HeightMap => Self::SpecularMap,
            Self::SpecularMap => Self::Normal,
        }
    }

    /// Value of the `debug_mode` shader uniform.
    pub fn index(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::HeightMap => 1,
            Self::SpecularMap => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::HeightMap => "Height Map",
            Self::SpecularMap => "Specular Map",
        }
    }
}

/// Uniform values for the terrain material.
#[derive(Debug, Clone)]
pub struct TerrainUniforms {
    /// Direction toward the sun in the globe group's rotated frame.
    pub sun_direction: Vec3,
    pub displacement: DisplacementScale,
    pub debug_mode: ColorDebugMode,
}

/// Uniform values for the cloud material.
#[derive(Debug, Clone)]
pub struct CloudUniforms {
    pub displacement: DisplacementScale,
    /// Offset of the cloud shell above the displaced surface.
    pub altitude: f32,
    pub opacity: f32,
}
