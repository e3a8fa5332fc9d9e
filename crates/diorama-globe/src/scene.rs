//! Scene state for the globe, its lights and the depth test objects.

use std::f32::consts::PI;

use diorama_config::{Config, LightingConfig};
use glam::{Mat4, Quat, Vec3};
use serde::Serialize;

use crate::camera::Camera;
use crate::material::{CloudUniforms, ColorDebugMode, DisplacementScale, TerrainUniforms};

/// A sphere placed around the globe to check the depth-of-field falloff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestObject {
    pub position: Vec3,
    pub radius: f32,
    pub color: u32,
    pub emissive: u32,
}

impl TestObject {
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.radius),
            Quat::IDENTITY,
            self.position,
        )
    }
}

/// Red, yellow, green and blue spheres at increasing depth.
pub const TEST_OBJECTS: [TestObject; 4] = [
    TestObject {
        position: Vec3::new(-3.0, 1.0, 4.0),
        radius: 0.5,
        color: 0xff0000,
        emissive: 0x440000,
    },
    TestObject {
        position: Vec3::new(3.5, 0.0, 0.0),
        radius: 0.4,
        color: 0xffff00,
        emissive: 0x444400,
    },
    TestObject {
        position: Vec3::new(0.0, -2.0, -5.0),
        radius: 0.6,
        color: 0x00ff00,
        emissive: 0x004400,
    },
    TestObject {
        position: Vec3::new(-2.0, 3.0, -10.0),
        radius: 0.8,
        color: 0x0000ff,
        emissive: 0x000044,
    },
];

/// The directional sun light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunLight {
    pub position: Vec3,
    pub color: [f32; 3],
    pub intensity: f32,
}

impl SunLight {
    pub fn from_config(config: &LightingConfig) -> Self {
        Self {
            position: Vec3::from_array(config.sun_position),
            color: config.sun_rgb(),
            intensity: config.sun_intensity,
        }
    }

    /// Unit vector from the globe center toward the sun.
    pub fn world_direction(&self) -> Vec3 {
        self.position.normalize_or_zero()
    }
}

/// Everything the renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub view: Mat4,
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    /// World transform of the terrain mesh.
    pub earth_model: Mat4,
    /// Rotation of the terrain mesh inside the globe group.
    pub earth_local: Mat4,
    pub cloud_model: Mat4,
    /// Rotation of the cloud mesh inside the globe group.
    pub cloud_local: Mat4,
    pub atmosphere_model: Mat4,
    pub sun_world_direction: Vec3,
    /// Sun direction in the globe group's frame.
    pub sun_local_direction: Vec3,
    pub displacement_scale: f32,
    pub cloud_altitude: f32,
    pub cloud_opacity: f32,
    pub color_mode: ColorDebugMode,
    pub show_test_objects: bool,
}

/// Serializable summary for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneSummary {
    pub cloud_spin: f32,
    pub displacement_scale: f32,
    pub color_mode: ColorDebugMode,
    pub show_test_objects: bool,
    pub materials_ready: bool,
}

/// The globe group and its attached materials.
#[derive(Debug)]
pub struct GlobeScene {
    pub radius: f32,
    /// Yaw of the terrain mesh inside the group, so the day texture faces the camera.
    pub earth_yaw: f32,
    pub group_rotation: Quat,
    pub cloud_spin: f32,
    pub cloud_rotation_speed: f32,
    pub atmosphere_scale: f32,
    pub sun: SunLight,
    pub terrain: TerrainUniforms,
    pub clouds: CloudUniforms,
    /// Set once the globe textures are loaded and the materials exist.
    pub materials_ready: bool,
    pub show_test_objects: bool,
}

impl GlobeScene {
    pub fn from_config(config: &Config) -> Self {
        let displacement = DisplacementScale::new(config.earth.displacement_scale);
        let sun = SunLight::from_config(&config.lighting);
        Self {
            radius: config.earth.radius,
            earth_yaw: PI,
            group_rotation: Quat::IDENTITY,
            cloud_spin: 0.0,
            cloud_rotation_speed: config.animation.cloud_rotation_speed,
            atmosphere_scale: config.earth.atmosphere_scale,
            sun,
            terrain: TerrainUniforms {
                sun_direction: sun.world_direction(),
                displacement: displacement.clone(),
                debug_mode: ColorDebugMode::Normal,
            },
            clouds: CloudUniforms {
                displacement,
                altitude: config.earth.cloud_altitude,
                opacity: config.earth.cloud_opacity,
            },
            materials_ready: false,
            show_test_objects: false,
        }
    }

    /// Recompute the terrain's sun direction in the group's rotated frame.
    ///
    /// Returns `None` until the materials are ready.
    pub fn update_sun_direction(&mut self) -> Option<Vec3> {
        if !self.materials_ready {
            return None;
        }
        let local = self.group_rotation.inverse() * self.sun.world_direction();
        self.terrain.sun_direction = local;
        Some(local)
    }

    pub fn spin_clouds(&mut self) {
        self.cloud_spin += self.cloud_rotation_speed;
    }

    pub fn earth_local(&self) -> Mat4 {
        Mat4::from_rotation_y(self.earth_yaw)
    }

    pub fn cloud_local(&self) -> Mat4 {
        Mat4::from_rotation_y(self.cloud_spin)
    }

    pub fn group_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.group_rotation)
    }

    pub fn displacement_scale(&self) -> f32 {
        self.terrain.displacement.get()
    }

    pub fn set_displacement_scale(&self, value: f32) {
        self.terrain.displacement.set(value);
    }

    pub fn snapshot(&self, camera: &Camera) -> FrameSnapshot {
        let group = self.group_matrix();
        FrameSnapshot {
            view: camera.view_matrix(),
            view_proj: camera.view_projection(),
            camera_position: camera.position,
            earth_model: group * self.earth_local(),
            earth_local: self.earth_local(),
            cloud_model: group * self.cloud_local(),
            cloud_local: self.cloud_local(),
            atmosphere_model: group,
            sun_world_direction: self.sun.world_direction(),
            sun_local_direction: self.terrain.sun_direction,
            displacement_scale: self.displacement_scale(),
            cloud_altitude: self.clouds.altitude,
            cloud_opacity: self.clouds.opacity,
            color_mode: self.terrain.debug_mode,
            show_test_objects: self.show_test_objects,
        }
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            cloud_spin: self.cloud_spin,
            displacement_scale: self.displacement_scale(),
            color_mode: self.terrain.debug_mode,
            show_test_objects: self.show_test_objects,
            materials_ready: self.materials_ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> GlobeScene {
        GlobeScene::from_config(&Config::default())
    }

    #[test]
    fn test_sun_update_waits_for_materials() {
        let mut scene = scene();
        scene.group_rotation = Quat::from_rotation_y(1.0);
        let before = scene.terrain.sun_direction;
        assert_eq!(scene.update_sun_direction(), None);
        assert_eq!(scene.terrain.sun_direction, before);
    }

    #[test]
    fn test_sun_direction_is_in_group_frame() {
        let mut scene = scene();
        scene.materials_ready = true;
        scene.group_rotation = Quat::from_rotation_y(0.7) * Quat::from_rotation_z(0.01);

        let local = scene.update_sun_direction().unwrap();
        let world = scene.group_rotation * local;
        assert!((world - scene.sun.world_direction()).length() < 1e-5);
        assert_eq!(scene.terrain.sun_direction, local);
    }

    #[test]
    fn test_sun_world_direction_points_at_sun() {
        let scene = scene();
        let expected = Vec3::new(10.0, 5.0, 5.0).normalize();
        assert!((scene.sun.world_direction() - expected).length() < 1e-6);
    }

    #[test]
    fn test_clouds_spin_each_frame() {
        let mut scene = scene();
        scene.spin_clouds();
        scene.spin_clouds();
        assert!((scene.cloud_spin - 0.0004).abs() < 1e-9);
    }

    #[test]
    fn test_displacement_shared_between_materials() {
        let scene = scene();
        scene.set_displacement_scale(0.4);
        assert_eq!(scene.clouds.displacement.get(), 0.4);
        assert_eq!(scene.summary().displacement_scale, 0.4);
    }

    #[test]
    fn test_snapshot_composes_group_rotation() {
        let mut scene = scene();
        scene.group_rotation = Quat::from_rotation_y(0.25);
        let snapshot = scene.snapshot(&Camera::default());

        let expected = Mat4::from_rotation_y(0.25 + PI);
        assert!(snapshot.earth_model.abs_diff_eq(expected, 1e-5));
        assert!(snapshot.atmosphere_model.abs_diff_eq(Mat4::from_rotation_y(0.25), 1e-6));
        assert!(!snapshot.show_test_objects);
        assert_eq!(snapshot.displacement_scale, 0.15);
    }

    #[test]
    fn test_object_model_scales_unit_sphere() {
        let object = TEST_OBJECTS[3];
        let m = object.model_matrix();
        let top = m.transform_point3(Vec3::Y);
        assert!((top - Vec3::new(-2.0, 3.8, -10.0)).length() < 1e-6);
    }
}
