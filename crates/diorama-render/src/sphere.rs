//! Latitude/longitude sphere meshes.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SphereVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl SphereVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SphereVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// CPU-side sphere geometry.
#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub vertices: Vec<SphereVertex>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    /// A UV sphere of `width_segments` columns and `height_segments` rows.
    ///
    /// Rows run from the north pole (v = 0, the top of the texture) to the
    /// south pole. The seam column is duplicated so u spans [0, 1]. Pole rows
    /// get half a column of u offset and only one triangle per quad, so no
    /// degenerate triangles are emitted. Front faces wind counter-clockwise
    /// seen from outside.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let w = width_segments.max(3);
        let h = height_segments.max(2);
        let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);

        for iy in 0..=h {
            let v = iy as f32 / h as f32;
            let u_offset = if iy == 0 {
                0.5 / w as f32
            } else if iy == h {
                -0.5 / w as f32
            } else {
                0.0
            };
            let theta = v * std::f32::consts::PI;

            for ix in 0..=w {
                let u = ix as f32 / w as f32;
                let phi = u * std::f32::consts::TAU;
                let position = Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                vertices.push(SphereVertex {
                    position: position.to_array(),
                    normal: position.normalize_or_zero().to_array(),
                    uv: [u + u_offset, v],
                });
            }
        }

        let row = w + 1;
        let mut indices = Vec::with_capacity((w * (h - 1) * 6) as usize);
        for iy in 0..h {
            for ix in 0..w {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != h - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> u64 {
        self.indices.len() as u64 / 3
    }
}

/// A sphere uploaded to the GPU.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &SphereMesh) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn triangle_count(&self) -> u64 {
        u64::from(self.index_count / 3)
    }

    /// Bind and draw the whole mesh once.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_match_segments() {
        let mesh = SphereMesh::uv_sphere(2.5, 256, 256);
        assert_eq!(mesh.vertices.len(), 257 * 257);
        // Two triangles per quad, one per quad in the pole rows.
        assert_eq!(mesh.triangle_count(), 2 * 256 * 256 - 2 * 256);
    }

    #[test]
    fn test_vertices_lie_on_sphere() {
        let mesh = SphereMesh::uv_sphere(2.5, 32, 16);
        for vertex in &mesh.vertices {
            let p = Vec3::from_array(vertex.position);
            let n = Vec3::from_array(vertex.normal);
            assert!((p.length() - 2.5).abs() < 1e-4);
            assert!((n.length() - 1.0).abs() < 1e-4);
            assert!(p.normalize().dot(n) > 0.9999);
        }
    }

    #[test]
    fn test_north_pole_is_top_of_texture() {
        let mesh = SphereMesh::uv_sphere(1.0, 8, 4);
        let first = mesh.vertices[0];
        assert!((first.position[1] - 1.0).abs() < 1e-6);
        assert_eq!(first.uv[1], 0.0);
        let last = mesh.vertices[mesh.vertices.len() - 1];
        assert!((last.position[1] + 1.0).abs() < 1e-6);
        assert_eq!(last.uv[1], 1.0);
    }

    #[test]
    fn test_triangles_face_outward() {
        let mesh = SphereMesh::uv_sphere(1.0, 24, 12);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            let normal = (b - a).cross(c - a);
            assert!(normal.length() > 1e-6, "degenerate triangle {tri:?}");
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0, "inward triangle {tri:?}");
        }
    }

    #[test]
    fn test_indices_in_range() {
        let mesh = SphereMesh::uv_sphere(1.0, 32, 32);
        let max = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < max));
    }

    #[test]
    fn test_vertex_layout_stride() {
        assert_eq!(std::mem::size_of::<SphereVertex>(), 32);
        assert_eq!(SphereVertex::layout().array_stride, 32);
    }
}
