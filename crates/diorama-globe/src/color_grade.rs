//! CPU reference of the color-grade pass.
//!
//! [`grade_pixel`] mirrors the WGSL fragment shader step for step so the
//! grading math can be tested without a GPU.

use glam::{Vec2, Vec3, Vec4};

use crate::post::ColorGradeUniforms;

/// Rec. 601 luma weights.
pub const LUMA_WEIGHTS: Vec3 = Vec3::new(0.299, 0.587, 0.114);
/// Tint applied to dark pixels.
pub const COOL_TINT: Vec3 = Vec3::new(0.95, 1.0, 1.05);
/// Tint applied to bright pixels.
pub const WARM_TINT: Vec3 = Vec3::new(1.05, 1.0, 0.95);

/// Hermite interpolation between `edge0` and `edge1`, as in GLSL/WGSL.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn adjust_saturation(color: Vec3, saturation: f32) -> Vec3 {
    let luma = color.dot(LUMA_WEIGHTS);
    Vec3::splat(luma).lerp(color, saturation)
}

/// Grade one pixel. `uv` is in [0, 1] with (0.5, 0.5) at the image center.
pub fn grade_pixel(rgba: Vec4, uv: Vec2, uniforms: &ColorGradeUniforms) -> Vec4 {
    let mut color = rgba.truncate();

    color = (color - Vec3::splat(0.5)) * uniforms.contrast + Vec3::splat(0.5);
    color *= uniforms.brightness;
    color = adjust_saturation(color, uniforms.saturation);

    let luma = color.dot(LUMA_WEIGHTS);
    color *= COOL_TINT.lerp(WARM_TINT, luma);

    let dist = ((uv - Vec2::splat(0.5)) * 1.2).length();
    let vig = 1.0 - smoothstep(0.2, 0.8, dist);
    color = (color * (1.0 - uniforms.vignette)).lerp(color, vig);

    color.clamp(Vec3::ZERO, Vec3::ONE).extend(rgba.w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral(vignette: f32) -> ColorGradeUniforms {
        ColorGradeUniforms {
            saturation: 1.0,
            vignette,
            brightness: 1.0,
            contrast: 1.0,
        }
    }

    fn approx(a: Vec4, b: Vec4) -> bool {
        (a - b).abs().max_element() < 1e-5
    }

    #[test]
    fn test_midgray_at_center_is_tint_midpoint() {
        let uniforms = neutral(0.35);
        let out = grade_pixel(Vec4::new(0.5, 0.5, 0.5, 1.0), Vec2::splat(0.5), &uniforms);
        // luma 0.5 mixes cool and warm halfway: (1.0, 1.0, 1.0).
        let tint = COOL_TINT.lerp(WARM_TINT, 0.5);
        let expected = (Vec3::splat(0.5) * tint).extend(1.0);
        assert!(approx(out, expected), "{out:?}");
        assert!(approx(out, Vec4::new(0.5, 0.5, 0.5, 1.0)));
    }

    #[test]
    fn test_alpha_passes_through() {
        let out = grade_pixel(
            Vec4::new(0.2, 0.4, 0.6, 0.25),
            Vec2::new(0.1, 0.9),
            &ColorGradeUniforms::default(),
        );
        assert_eq!(out.w, 0.25);
    }

    #[test]
    fn test_output_is_clamped() {
        let uniforms = ColorGradeUniforms {
            saturation: 3.0,
            vignette: 0.0,
            brightness: 4.0,
            contrast: 3.0,
        };
        let out = grade_pixel(Vec4::new(0.9, 0.05, 0.5, 1.0), Vec2::splat(0.5), &uniforms);
        assert!(out.truncate().cmpge(Vec3::ZERO).all());
        assert!(out.truncate().cmple(Vec3::ONE).all());
    }

    #[test]
    fn test_corner_is_darkened_by_vignette() {
        let uniforms = neutral(0.35);
        let color = Vec4::new(0.5, 0.5, 0.5, 1.0);
        let center = grade_pixel(color, Vec2::splat(0.5), &uniforms);
        let corner = grade_pixel(color, Vec2::ZERO, &uniforms);
        // Corner distance is 0.85 > 0.8: fully inside the darkened region.
        assert!(approx(corner, (center.truncate() * 0.65).extend(1.0)));
    }

    #[test]
    fn test_vignette_falloff_starts_at_point_two() {
        let uniforms = neutral(0.35);
        let color = Vec4::new(0.5, 0.5, 0.5, 1.0);
        let center = grade_pixel(color, Vec2::splat(0.5), &uniforms);
        // dist = 0.15 * 1.2 = 0.18, still inside the bright region.
        let near_center = grade_pixel(color, Vec2::new(0.65, 0.5), &uniforms);
        assert!(approx(center, near_center));
    }

    #[test]
    fn test_contrast_pivots_on_midpoint() {
        let uniforms = ColorGradeUniforms {
            contrast: 2.0,
            ..neutral(0.0)
        };
        let out = grade_pixel(Vec4::new(0.5, 0.5, 0.5, 1.0), Vec2::splat(0.5), &uniforms);
        assert!(approx(out, Vec4::new(0.5, 0.5, 0.5, 1.0)));
    }

    #[test]
    fn test_zero_saturation_is_gray_before_tint() {
        let uniforms = ColorGradeUniforms {
            saturation: 0.0,
            ..neutral(0.0)
        };
        let out = grade_pixel(Vec4::new(0.8, 0.2, 0.1, 1.0), Vec2::splat(0.5), &uniforms);
        let luma = Vec3::new(0.8, 0.2, 0.1).dot(LUMA_WEIGHTS);
        let expected = Vec3::splat(luma) * COOL_TINT.lerp(WARM_TINT, luma);
        assert!(approx(out, expected.extend(1.0)));
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.2, 0.8, 0.0), 0.0);
        assert_eq!(smoothstep(0.2, 0.8, 1.0), 1.0);
        assert!((smoothstep(0.2, 0.8, 0.5) - 0.5).abs() < 1e-6);
    }
}
