//! The background star shell.

use diorama_config::StarsConfig;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Star positions scattered through a spherical shell around the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct StarField {
    positions: Vec<[f32; 3]>,
}

impl StarField {
    /// Deterministic for a given seed. Directions are uniform on the sphere
    /// and radii uniform in `[min_radius, max_radius]`.
    pub fn generate(config: &StarsConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let span = (config.max_radius - config.min_radius).max(0.0);
        let positions = (0..config.count)
            .map(|_| {
                let radius = config.min_radius + rng.random::<f32>() * span;
                let theta = rng.random::<f32>() * std::f32::consts::TAU;
                let phi = (2.0 * rng.random::<f32>() - 1.0).acos();
                let direction =
                    Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
                (direction * radius).to_array()
            })
            .collect();
        Self { positions }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}
