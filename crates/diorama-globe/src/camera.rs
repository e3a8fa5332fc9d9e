//! Perspective camera with reverse-Z projection and pointer ray casting.

use diorama_config::CameraConfig;
use glam::{Mat4, Vec3};

use crate::pointer::PointerSample;

/// A half-line used for hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// A look-at perspective camera.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect: f32,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

impl Camera {
    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        Self {
            position: Vec3::from_array(config.position),
            target: Vec3::ZERO,
            fov_y: config.fov_deg.to_radians(),
            aspect: width.max(1) as f32 / height.max(1) as f32,
            near: config.near,
            far: config.far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection matrix with reverse-Z: the near plane maps to depth 1.0 and
    /// the far plane to 0.0.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.far, self.near)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// The world-space ray from the eye through a normalized pointer sample.
    pub fn ray_through(&self, sample: PointerSample) -> Ray {
        let forward = (self.target - self.position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let half_height = (self.fov_y * 0.5).tan();
        let half_width = half_height * self.aspect;

        let direction =
            (forward + right * sample.x * half_width + up * sample.y * half_height).normalize();
        Ray {
            origin: self.position,
            direction,
        }
    }

    /// Convert a reverse-Z depth buffer value back to eye distance along the
    /// view axis.
    pub fn linear_depth(&self, depth: f32) -> f32 {
        self.near * self.far / (depth * (self.far - self.near) + self.near)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 1280, 720)
    }
}
