//! Geometry primitives: vertices, triangles, meshes and the standard solids
//! the scene is assembled from.
use nalgebra::{Point3, Vector3};
use std::f32::consts::TAU;

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Build a flat-shaded triangle; all three normals are the face normal.
    pub fn flat(p0: Point3<f32>, p1: Point3<f32>, p2: Point3<f32>) -> Self {
        let normal = (p1 - p0).cross(&(p2 - p0)).normalize();
        Self::new(
            Vertex::new(p0, normal),
            Vertex::new(p1, normal),
            Vertex::new(p2, normal),
        )
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1.cross(&edge2).normalize()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Add a flat quad `a b c d` (counter-clockwise seen from its front).
    pub fn add_quad(&mut self, a: Point3<f32>, b: Point3<f32>, c: Point3<f32>, d: Point3<f32>) {
        self.add_triangle(Triangle::flat(a, b, d));
        self.add_triangle(Triangle::flat(b, c, d));
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounding box over all vertices, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self
            .triangles
            .iter()
            .flat_map(|t| t.vertices.iter().map(|v| v.position));
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        });
        Some(Bounds { min, max })
    }

    /// Cylinder along the y axis, centered at the origin, with both caps.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: usize) -> Self {
        let half = height / 2.0;
        let mut mesh = Self::with_capacity(radial_segments * 4);
        let top_center = Point3::new(0.0, half, 0.0);
        let bottom_center = Point3::new(0.0, -half, 0.0);

        let rim = |radius: f32, y: f32, i: usize| {
            let theta = i as f32 / radial_segments as f32 * TAU;
            Point3::new(radius * theta.sin(), y, radius * theta.cos())
        };

        for i in 0..radial_segments {
            let b0 = rim(radius_bottom, -half, i);
            let b1 = rim(radius_bottom, -half, i + 1);
            let t0 = rim(radius_top, half, i);
            let t1 = rim(radius_top, half, i + 1);

            mesh.add_quad(b0, b1, t1, t0);
            mesh.add_triangle(Triangle::flat(top_center, t0, t1));
            mesh.add_triangle(Triangle::flat(bottom_center, b1, b0));
        }

        mesh
    }

    /// Plane in the xy plane facing +z, split into a grid of quads.
    pub fn plane(width: f32, height: f32, width_segments: usize, height_segments: usize) -> Self {
        let mut mesh = Self::with_capacity(width_segments * height_segments * 2);
        let point = |ix: usize, iy: usize| {
            Point3::new(
                ix as f32 / width_segments as f32 * width - width / 2.0,
                iy as f32 / height_segments as f32 * height - height / 2.0,
                0.0,
            )
        };

        for iy in 0..height_segments {
            for ix in 0..width_segments {
                mesh.add_quad(
                    point(ix, iy),
                    point(ix + 1, iy),
                    point(ix + 1, iy + 1),
                    point(ix, iy + 1),
                );
            }
        }

        mesh
    }

    /// Axis-aligned box centered at the origin
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        let p = |x: f32, y: f32, z: f32| Point3::new(x * hx, y * hy, z * hz);
        let mut mesh = Self::with_capacity(12);

        // Front, back
        mesh.add_quad(p(-1.0, -1.0, 1.0), p(1.0, -1.0, 1.0), p(1.0, 1.0, 1.0), p(-1.0, 1.0, 1.0));
        mesh.add_quad(p(1.0, -1.0, -1.0), p(-1.0, -1.0, -1.0), p(-1.0, 1.0, -1.0), p(1.0, 1.0, -1.0));
        // Top, bottom
        mesh.add_quad(p(-1.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, -1.0), p(-1.0, 1.0, -1.0));
        mesh.add_quad(p(-1.0, -1.0, -1.0), p(1.0, -1.0, -1.0), p(1.0, -1.0, 1.0), p(-1.0, -1.0, 1.0));
        // Right, left
        mesh.add_quad(p(1.0, -1.0, 1.0), p(1.0, -1.0, -1.0), p(1.0, 1.0, -1.0), p(1.0, 1.0, 1.0));
        mesh.add_quad(p(-1.0, -1.0, -1.0), p(-1.0, -1.0, 1.0), p(-1.0, 1.0, 1.0), p(-1.0, 1.0, -1.0));

        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_cylinder_counts_and_bounds() {
        let mesh = Mesh::cylinder(0.8, 0.8, 2.0, 32);
        assert_eq!(mesh.len(), 32 * 4);

        let bounds = mesh.bounds().unwrap();
        assert_close(bounds.min.y, -1.0);
        assert_close(bounds.max.y, 1.0);
        assert_close(bounds.max.z, 0.8);
        assert_close(bounds.max.x, 0.8);
    }

    #[test]
    fn test_cylinder_side_faces_outward() {
        let mesh = Mesh::cylinder(1.0, 1.0, 2.0, 16);
        for triangle in &mesh.triangles {
            let normal = triangle.calculate_normal();
            if normal.y.abs() > 0.5 {
                continue; // cap
            }
            let center = triangle
                .vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                / 3.0;
            let radial = Vector3::new(center.x, 0.0, center.z);
            assert!(normal.dot(&radial) > 0.0);
        }
    }

    #[test]
    fn test_cylinder_caps_face_away() {
        let mesh = Mesh::cylinder(1.0, 1.0, 2.0, 8);
        for triangle in &mesh.triangles {
            let normal = triangle.calculate_normal();
            let y = triangle.vertices[0].position.y;
            if normal.y.abs() > 0.5 {
                assert_eq!(normal.y.signum(), y.signum());
            }
        }
    }

    #[test]
    fn test_plane_faces_forward() {
        let mesh = Mesh::plane(20.0, 20.0, 4, 4);
        assert_eq!(mesh.len(), 32);
        for triangle in &mesh.triangles {
            assert_close(triangle.calculate_normal().z, 1.0);
        }
        let bounds = mesh.bounds().unwrap();
        assert_close(bounds.size().x, 20.0);
        assert_close(bounds.size().y, 20.0);
    }

    #[test]
    fn test_cuboid_normals_point_out() {
        let mesh = Mesh::cuboid(1.2, 0.05, 0.01);
        assert_eq!(mesh.len(), 12);
        for triangle in &mesh.triangles {
            let normal = triangle.calculate_normal();
            let center = triangle
                .vertices
                .iter()
                .fold(Vector3::zeros(), |acc, v| acc + v.position.coords)
                / 3.0;
            assert!(normal.dot(&center) > 0.0);
        }
        let size = mesh.bounds().unwrap().size();
        assert_close(size.x, 1.2);
        assert_close(size.y, 0.05);
        assert_close(size.z, 0.01);
    }

    #[test]
    fn test_empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
    }
}
