//! Triangle meshes for the road network and agent stand-ins.
//!
//! The scene is Y-up: a map coordinate `(x, y)` lifts to `(x, height, y)`.

use crate::map::{Point2, Triangle2};
use nalgebra::{Point3, Vector2, Vector3};
use std::f32::consts::TAU;

/// An indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3<f32>>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn push_vertex(&mut self, v: Point3<f32>) -> u32 {
        self.vertices.push(v);
        (self.vertices.len() - 1) as u32
    }

    /// Vertex positions as plain arrays, the form most backends want.
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.vertices.iter().map(|v| [v.x, v.y, v.z]).collect()
    }

    /// Area-weighted vertex normals, for lit materials.
    pub fn vertex_normals(&self) -> Vec<[f32; 3]> {
        let mut normals = vec![Vector3::<f32>::zeros(); self.vertices.len()];
        for &[a, b, c] in &self.triangles {
            let (pa, pb, pc) = (
                self.vertices[a as usize],
                self.vertices[b as usize],
                self.vertices[c as usize],
            );
            let face = (pb - pa).cross(&(pc - pa));
            for i in [a, b, c] {
                normals[i as usize] += face;
            }
        }
        normals
            .into_iter()
            .map(|n| {
                let n = n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::y);
                [n.x, n.y, n.z]
            })
            .collect()
    }

    /// Copy with every triangle also present in reverse winding, for
    /// backends that cull back faces.
    pub fn with_back_faces(&self) -> TriangleMesh {
        let mut mesh = self.clone();
        mesh.triangles
            .extend(self.triangles.iter().map(|&[a, b, c]| [c, b, a]));
        mesh
    }
}

/// Lifts a map point onto the horizontal plane at `height`.
pub fn lift(p: Vector2<f64>, height: f32) -> Point3<f32> {
    Point3::new(p.x as f32, height, p.y as f32)
}

fn vec2(p: &Point2) -> Vector2<f64> {
    Vector2::new(p[0], p[1])
}

/// Triangulates a polyline into a flat ribbon of constant width.
///
/// Each segment becomes its own quad (two triangles); joints are not
/// mitered. Zero-length segments contribute nothing.
pub fn ribbon(points: &[Point2], thickness: f64, height: f32) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    let half = thickness / 2.0;

    for pair in points.windows(2) {
        let (a, b) = (vec2(&pair[0]), vec2(&pair[1]));
        let d = a - b;
        let len = d.norm();
        if len <= f64::EPSILON || !len.is_finite() {
            continue;
        }

        let perp_cw = Vector2::new(-d.y, d.x) / len * half;
        let perp_ccw = Vector2::new(d.y, -d.x) / len * half;

        let a_ccw = mesh.push_vertex(lift(a + perp_ccw, height));
        let a_cw = mesh.push_vertex(lift(a + perp_cw, height));
        let b_ccw = mesh.push_vertex(lift(b + perp_ccw, height));
        let b_cw = mesh.push_vertex(lift(b + perp_cw, height));

        mesh.triangles.push([b_ccw, a_cw, a_ccw]);
        mesh.triangles.push([a_cw, b_ccw, b_cw]);
    }

    mesh
}

/// Lifts pre-triangulated 2D surface triangles to a flat mesh.
///
/// Vertex order is reversed so the faces point up in the Y-up scene.
pub fn flat_triangles(triangles: &[Triangle2], height: f32) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    for [p0, p1, p2] in triangles {
        let i0 = mesh.push_vertex(lift(vec2(p2), height));
        let i1 = mesh.push_vertex(lift(vec2(p1), height));
        let i2 = mesh.push_vertex(lift(vec2(p0), height));
        mesh.triangles.push([i0, i1, i2]);
    }
    mesh
}

/// Horizontal rectangle centered on the origin at `y = 0`.
pub fn plane(width: f32, depth: f32) -> TriangleMesh {
    let (hw, hd) = (width / 2.0, depth / 2.0);
    TriangleMesh {
        vertices: vec![
            Point3::new(-hw, 0.0, -hd),
            Point3::new(hw, 0.0, -hd),
            Point3::new(hw, 0.0, hd),
            Point3::new(-hw, 0.0, hd),
        ],
        triangles: vec![[0, 2, 1], [0, 3, 2]],
    }
}

/// Closed cylinder around the Y axis, centered on the origin.
pub fn cylinder(radius: f32, height: f32, segments: u32) -> TriangleMesh {
    let segments = segments.max(3);
    let half = height / 2.0;
    let mut mesh = TriangleMesh::new();

    let bottom_center = mesh.push_vertex(Point3::new(0.0, -half, 0.0));
    let top_center = mesh.push_vertex(Point3::new(0.0, half, 0.0));

    // Ring vertices are interleaved: bottom at 2 + 2i, top at 3 + 2i
    for i in 0..segments {
        let angle = i as f32 / segments as f32 * TAU;
        let (x, z) = (radius * angle.cos(), radius * angle.sin());
        mesh.push_vertex(Point3::new(x, -half, z));
        mesh.push_vertex(Point3::new(x, half, z));
    }

    for i in 0..segments {
        let j = (i + 1) % segments;
        let (b0, t0) = (2 + 2 * i, 3 + 2 * i);
        let (b1, t1) = (2 + 2 * j, 3 + 2 * j);

        mesh.triangles.push([b0, t0, b1]);
        mesh.triangles.push([b1, t0, t1]);
        mesh.triangles.push([bottom_center, b0, b1]);
        mesh.triangles.push([top_center, t1, t0]);
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_point_ribbon_is_one_quad() {
        let mesh = ribbon(&[[0.0, 0.0], [10.0, 0.0]], 0.05, 0.1);

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        for v in &mesh.vertices {
            assert_relative_eq!(v.y, 0.1);
        }
    }

    #[test]
    fn test_ribbon_is_centered_with_requested_width() {
        let mesh = ribbon(&[[0.0, 0.0], [10.0, 0.0]], 0.05, 0.1);

        let zs: Vec<f32> = mesh.vertices.iter().map(|v| v.z).collect();
        assert_relative_eq!(zs[0], 0.025, epsilon = 1e-6);
        assert_relative_eq!(zs[1], -0.025, epsilon = 1e-6);
        assert_relative_eq!(zs[0] - zs[1], 0.05, epsilon = 1e-6);

        let xs: Vec<f32> = mesh.vertices.iter().map(|v| v.x).collect();
        assert_eq!(xs, vec![0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_ribbon_on_diagonal_keeps_width() {
        let mesh = ribbon(&[[0.0, 0.0], [3.0, 4.0]], 1.0, 0.0);
        let (a, b) = (mesh.vertices[0], mesh.vertices[1]);
        assert_relative_eq!((a - b).norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ribbon_segments_and_degenerates() {
        let mesh = ribbon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [1.0, 1.0]], 0.1, 0.1);
        assert_eq!(mesh.triangle_count(), 4);

        assert!(ribbon(&[[0.0, 0.0]], 0.1, 0.1).is_empty());
        assert!(ribbon(&[], 0.1, 0.1).is_empty());
    }

    #[test]
    fn test_ribbon_indices_are_in_range() {
        let mesh = ribbon(&[[0.0, 0.0], [1.0, 0.0], [2.0, 1.0], [2.0, 3.0]], 0.1, 0.1);
        let n = mesh.vertex_count() as u32;
        assert!(mesh.triangles.iter().flatten().all(|&i| i < n));
    }

    #[test]
    fn test_flat_triangles_reverse_winding() {
        let mesh = flat_triangles(&[[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]], 0.0);
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.vertices[0], Point3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.vertices[2], Point3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn test_cylinder_shape() {
        let mesh = cylinder(0.5, 1.0, 12);
        assert_eq!(mesh.vertex_count(), 2 + 2 * 12);
        assert_eq!(mesh.triangle_count(), 4 * 12);
        for v in &mesh.vertices[2..] {
            assert_relative_eq!((v.x * v.x + v.z * v.z).sqrt(), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_vertex_normals_of_flat_meshes_point_up() {
        let surface = flat_triangles(&[[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]], 0.0);
        for n in surface.vertex_normals() {
            assert_relative_eq!(n[1], 1.0, epsilon = 1e-6);
        }
        for n in plane(4.0, 4.0).vertex_normals() {
            assert_relative_eq!(n[1], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_back_faces_double_triangles() {
        let mesh = ribbon(&[[0.0, 0.0], [10.0, 0.0]], 0.05, 0.1);
        let both = mesh.with_back_faces();
        assert_eq!(both.triangle_count(), 4);
        assert_eq!(both.vertex_count(), 4);
        assert_eq!(both.triangles[2], [0, 1, 2]);
    }

    #[test]
    fn test_plane_is_flat() {
        let mesh = plane(10.0, 4.0);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.vertices.iter().all(|v| v.y == 0.0));
    }
}
