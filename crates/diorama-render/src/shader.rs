//! The standard lit material template and anchor-based patching.
//!
//! The template marks its injection points with `//#anchor <name>` comment
//! lines. [`compose_material`] inserts each patch fragment after its marker,
//! in the order the patches are given. Marker lines stay in the output, so a
//! composed shader can be composed again.

use diorama_globe::{ShaderAnchor, ShaderPatch};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("material template has no '{anchor}' anchor")]
    MissingAnchor { anchor: &'static str },
}

/// Marker line for `anchor`.
pub fn anchor_marker(anchor: ShaderAnchor) -> String {
    format!("//#anchor {}", anchor.name())
}

/// Inject `patches` into `template` at their anchors.
pub fn compose_material(template: &str, patches: &[ShaderPatch]) -> Result<String, ShaderError> {
    for patch in patches {
        let marker = anchor_marker(patch.anchor);
        if !template.lines().any(|line| line.trim() == marker) {
            return Err(ShaderError::MissingAnchor {
                anchor: patch.anchor.name(),
            });
        }
    }

    let extra: usize = patches.iter().map(|p| p.fragment.len() + 1).sum();
    let mut out = String::with_capacity(template.len() + extra);
    for line in template.lines() {
        out.push_str(line);
        out.push('\n');
        let Some(anchor) = ShaderAnchor::ALL
            .into_iter()
            .find(|a| line.trim() == anchor_marker(*a))
        else {
            continue;
        };
        for patch in patches.iter().filter(|p| p.anchor == anchor) {
            out.push_str(patch.fragment);
            if !patch.fragment.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Scene-wide uniform block, shared by every scene shader at group 0.
pub const SCENE_UNIFORM_DECL: &str = r#"
struct SceneUniform {
    view_proj: mat4x4<f32>,
    view_matrix: mat4x4<f32>,
    camera_position: vec4<f32>,
    sun_direction: vec4<f32>,
    sun_color: vec4<f32>,
    ambient: vec4<f32>,
    sky_color: vec4<f32>,
    ground_color: vec4<f32>,
    fog: vec4<f32>,
};

@group(0) @binding(0) var<uniform> scene: SceneUniform;
"#;

/// Lambert diffuse with ambient and hemisphere fill, a Blinn-Phong highlight
/// scaled down by roughness, emissive, then exponential-squared fog.
pub const STANDARD_MATERIAL_TEMPLATE: &str = r#"
struct MaterialUniform {
    base_color: vec4<f32>,
    emissive: vec4<f32>,
    params: vec4<f32>,
};

struct ObjectUniform {
    model: mat4x4<f32>,
    local_rotation: mat4x4<f32>,
};

@group(1) @binding(0) var<uniform> material: MaterialUniform;
@group(1) @binding(1) var base_map: texture_2d<f32>;
@group(1) @binding(2) var roughness_map: texture_2d<f32>;
@group(1) @binding(3) var material_sampler: sampler;

@group(2) @binding(0) var<uniform> model_data: ObjectUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) group_normal: vec3<f32>,
    @location(4) custom: vec4<f32>,
};

//#anchor common

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.custom = vec4<f32>(0.0);
    let normal = vertex.normal;
    let uv = vertex.uv;
    var transformed = vertex.position;
    //#anchor begin_vertex
    let world = model_data.model * vec4<f32>(transformed, 1.0);
    out.clip_position = scene.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = normalize((model_data.model * vec4<f32>(normal, 0.0)).xyz);
    out.group_normal = (model_data.local_rotation * vec4<f32>(normal, 0.0)).xyz;
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(base_map, material_sampler, in.uv) * material.base_color;
    let roughness_sample = textureSample(roughness_map, material_sampler, in.uv).g;
    let roughness = clamp(material.params.x * roughness_sample, 0.04, 1.0);
    let metalness = material.params.y;

    let n = normalize(in.world_normal);
    let v = normalize(scene.camera_position.xyz - in.world_position);
    let l = normalize(scene.sun_direction.xyz);
    let ndl = max(dot(n, l), 0.0);
    let sun = scene.sun_color.rgb * scene.sun_color.a;
    let hemi = mix(scene.ground_color.rgb, scene.sky_color.rgb, 0.5 * n.y + 0.5)
        * scene.sky_color.a;

    let albedo = base.rgb * (1.0 - metalness);
    var final_color = albedo * (scene.ambient.rgb + hemi + sun * ndl);

    let h = normalize(l + v);
    let shininess = exp2(10.0 * (1.0 - roughness) + 1.0);
    let highlight = pow(max(dot(n, h), 0.0), shininess) * (1.0 - roughness) * ndl;
    let f0 = mix(vec3<f32>(0.04), base.rgb, metalness);
    final_color = final_color + sun * f0 * highlight + material.emissive.rgb;

    //#anchor final_color

    if (material.params.z > 0.5) {
        let dist = length(scene.camera_position.xyz - in.world_position);
        let density = scene.fog.a;
        let fog_amount = clamp(1.0 - exp(-density * density * dist * dist), 0.0, 1.0);
        final_color = mix(final_color, scene.fog.rgb, fog_amount);
    }
    return vec4<f32>(final_color, base.a);
}
"#;

/// Back-face rim glow around the globe, added on top of the scene.
pub const ATMOSPHERE_SHADER_SOURCE: &str = r#"
struct ObjectUniform {
    model: mat4x4<f32>,
    local_rotation: mat4x4<f32>,
};

@group(1) @binding(0) var<uniform> model_data: ObjectUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_normal: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = model_data.model * vec4<f32>(vertex.position, 1.0);
    out.clip_position = scene.view_proj * world;
    let world_normal = (model_data.model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.view_normal = normalize((scene.view_matrix * vec4<f32>(world_normal, 0.0)).xyz);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let rim = max(0.5 - dot(normalize(in.view_normal), vec3<f32>(0.0, 0.0, 1.0)), 0.0);
    let intensity = pow(rim, 4.0);
    return vec4<f32>(0.3, 0.6, 1.0, 1.0) * intensity * 1.2;
}
"#;

/// Unlit point stars.
pub const STARS_SHADER_SOURCE: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return scene.view_proj * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 0.8);
}
"#;

/// Prefix `body` with the scene uniform block.
pub fn with_scene_uniform(body: &str) -> String {
    format!("{SCENE_UNIFORM_DECL}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_globe::{cloud_patches, terrain_patches};

    const TEMPLATE: &str = "a\n//#anchor common\nb\n    //#anchor begin_vertex\nc\n";

    fn patch(anchor: ShaderAnchor, fragment: &'static str) -> ShaderPatch {
        ShaderPatch { anchor, fragment }
    }

    #[test]
    fn test_fragments_follow_their_marker_in_order() {
        let out = compose_material(
            TEMPLATE,
            &[
                patch(ShaderAnchor::BeginVertexTransform, "v1"),
                patch(ShaderAnchor::CommonDeclarations, "c1"),
                patch(ShaderAnchor::CommonDeclarations, "c2\n"),
            ],
        )
        .unwrap();
        assert_eq!(
            out,
            "a\n//#anchor common\nc1\nc2\nb\n    //#anchor begin_vertex\nv1\nc\n"
        );
    }

    #[test]
    fn test_missing_anchor_is_an_error() {
        let err = compose_material(
            TEMPLATE,
            &[patch(ShaderAnchor::FinalColorAssignment, "x")],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ShaderError::MissingAnchor {
                anchor: "final_color"
            }
        );
    }

    #[test]
    fn test_no_patches_leaves_template_unchanged() {
        let out = compose_material(STANDARD_MATERIAL_TEMPLATE, &[]).unwrap();
        assert_eq!(out.trim_end(), STANDARD_MATERIAL_TEMPLATE.trim_end());
    }

    #[test]
    fn test_template_has_every_anchor() {
        for anchor in ShaderAnchor::ALL {
            let marker = anchor_marker(anchor);
            assert!(
                STANDARD_MATERIAL_TEMPLATE
                    .lines()
                    .any(|line| line.trim() == marker),
                "{marker}"
            );
        }
    }

    #[test]
    fn test_terrain_patch_lands_before_fog() {
        let out = compose_material(STANDARD_MATERIAL_TEMPLATE, &terrain_patches()).unwrap();
        let night = out.find("night_light").unwrap();
        let fog = out.find("fog_amount").unwrap();
        let lighting = out.find("var final_color").unwrap();
        assert!(lighting < night && night < fog);

        let displace = out.find("globe.displacement_scale").unwrap();
        let model = out.find("model_data.model * vec4<f32>(transformed").unwrap();
        assert!(displace < model);
    }

    #[test]
    fn test_cloud_patches_compose() {
        let out = compose_material(STANDARD_MATERIAL_TEMPLATE, &cloud_patches()).unwrap();
        assert!(out.contains("globe.cloud_altitude"));
        assert!(!out.contains("night_map"));
    }
}
