//! CPU-side mesh data and procedural primitives.
//!
//! All primitives wind counter-clockwise when viewed from outside.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use static_assertions::assert_eq_size;
use std::f32::consts::{PI, TAU};

/// Position, normal and texture coordinate. Matches the lit pipeline's vertex layout.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

assert_eq_size!(Vertex, [f32; 8]);

impl Vertex {
    fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv,
        }
    }
}

/// Indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned cube of edge length `size` centred on the origin, 4 vertices per face.
    #[must_use]
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        // (normal, u axis, v axis) with u × v = normal.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];

        let mut mesh = Self::default();
        for (n, u, v) in faces {
            let base = mesh.vertices.len() as u32;
            let c = n * h;
            mesh.vertices.extend([
                Vertex::new(c - u * h - v * h, n, [0.0, 1.0]),
                Vertex::new(c + u * h - v * h, n, [1.0, 1.0]),
                Vertex::new(c + u * h + v * h, n, [1.0, 0.0]),
                Vertex::new(c - u * h + v * h, n, [0.0, 0.0]),
            ]);
            mesh.indices
                .extend([base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Latitude/longitude sphere. `segments` around, `rings` from pole to pole.
    #[must_use]
    pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);

        let mut mesh = Self::default();
        for r in 0..=rings {
            let theta = PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let phi = TAU * s as f32 / segments as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                mesh.vertices.push(Vertex::new(
                    n * radius,
                    n,
                    [s as f32 / segments as f32, r as f32 / rings as f32],
                ));
            }
        }

        let stride = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * stride + s;
                let b = a + stride;
                let c = a + 1;
                let d = b + 1;
                mesh.indices.extend([a, c, b, c, d, b]);
            }
        }
        mesh
    }

    /// Square in the XZ plane facing +Y. UVs tile `uv_repeat` times across it.
    #[must_use]
    pub fn plane(size: f32, uv_repeat: f32) -> Self {
        let h = size * 0.5;
        let n = Vec3::Y;
        Self {
            vertices: vec![
                Vertex::new(Vec3::new(-h, 0.0, -h), n, [0.0, 0.0]),
                Vertex::new(Vec3::new(h, 0.0, -h), n, [uv_repeat, 0.0]),
                Vertex::new(Vec3::new(h, 0.0, h), n, [uv_repeat, uv_repeat]),
                Vertex::new(Vec3::new(-h, 0.0, h), n, [0.0, uv_repeat]),
            ],
            indices: vec![0, 3, 2, 0, 2, 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every triangle's geometric normal agrees with its vertex normals.
    fn assert_outward_winding(mesh: &MeshData) {
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| mesh.vertices[i as usize]);
            let pa = Vec3::from(a.position);
            let face = (Vec3::from(b.position) - pa).cross(Vec3::from(c.position) - pa);
            if face.length_squared() < 1e-12 {
                // Degenerate pole triangles.
                continue;
            }
            let avg = Vec3::from(a.normal) + Vec3::from(b.normal) + Vec3::from(c.normal);
            assert!(face.dot(avg) > 0.0, "inward-facing triangle {tri:?}");
        }
    }

    #[test]
    fn test_cube_counts_and_winding() {
        let cube = MeshData::cube(2.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        assert_outward_winding(&cube);
        for v in &cube.vertices {
            assert!(v.position.iter().all(|c| c.abs() == 1.0));
        }
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let sphere = MeshData::uv_sphere(3.0, 16, 8);
        assert_eq!(sphere.vertices.len(), 17 * 9);
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.position).length() - 3.0).abs() < 1e-4);
        }
        assert_outward_winding(&sphere);
    }

    #[test]
    fn test_sphere_minimum_tessellation() {
        let sphere = MeshData::uv_sphere(1.0, 0, 0);
        assert_eq!(sphere.triangle_count(), 3 * 2 * 2);
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = MeshData::plane(10.0, 4.0);
        assert_eq!(plane.triangle_count(), 2);
        assert_outward_winding(&plane);
        assert_eq!(plane.vertices[2].uv, [4.0, 4.0]);
    }

    #[test]
    fn test_indices_in_bounds() {
        for mesh in [
            MeshData::cube(1.0),
            MeshData::uv_sphere(1.0, 12, 6),
            MeshData::plane(1.0, 1.0),
        ] {
            let n = mesh.vertices.len() as u32;
            assert!(mesh.indices.iter().all(|&i| i < n));
        }
    }
}
