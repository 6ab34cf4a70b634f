/// Geometry containers for loaded meshes
use nalgebra::{Point3, Vector3};

/// A vertex position as uploaded to vertex buffers
pub type Position = [f32; 3];

/// A linear RGB color with components in `[0, 1]`
pub type Rgb = [f32; 3];

/// A triangle assembled from three vertex positions
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub vertices: [Point3<f32>; 3],
}

impl Triangle {
    pub fn new(v0: Position, v1: Position, v2: Position) -> Self {
        Self {
            vertices: [Point3::from(v0), Point3::from(v1), Point3::from(v2)],
        }
    }

    /// Calculate the face normal from the winding of the vertices.
    ///
    /// Returns `None` for zero-area triangles.
    pub fn calculate_normal(&self) -> Option<Vector3<f32>> {
        let [v0, v1, v2] = self.vertices;
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        edge1.cross(&edge2).try_normalize(1e-12)
    }
}

/// Axis-aligned bounds of a set of positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }
}

/// De-indexed triangle mesh: every three consecutive positions form a triangle.
///
/// `texcoords` and `normals` are either empty or hold exactly one entry per
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Position>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
}

impl Mesh {
    pub fn with_capacity(vertices: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            texcoords: Vec::new(),
            normals: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count() == 0
    }

    pub fn has_texcoords(&self) -> bool {
        !self.texcoords.is_empty() && self.texcoords.len() == self.positions.len()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = Point3::from(*self.positions.first()?);
        let bounds = self.positions.iter().fold(
            Bounds {
                min: first,
                max: first,
            },
            |acc, p| Bounds {
                min: Point3::new(acc.min.x.min(p[0]), acc.min.y.min(p[1]), acc.min.z.min(p[2])),
                max: Point3::new(acc.max.x.max(p[0]), acc.max.y.max(p[1]), acc.max.z.max(p[2])),
            },
        );
        Some(bounds)
    }

    /// Recenter the mesh on its bounding-box center and rescale it so the
    /// largest extent equals `size`.
    ///
    /// Flat or empty meshes are only recentered.
    pub fn normalize(&mut self, size: f32) {
        let Some(bounds) = self.bounds() else {
            return;
        };
        let center = bounds.center();
        let largest = bounds.extent().max();
        let factor = if largest > f32::EPSILON { size / largest } else { 1.0 };

        for p in &mut self.positions {
            p[0] = (p[0] - center.x) * factor;
            p[1] = (p[1] - center.y) * factor;
            p[2] = (p[2] - center.z) * factor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_triangles() -> Mesh {
        Mesh {
            positions: vec![
                [0.0, 0.0, 0.0],
                [4.0, 0.0, 0.0],
                [4.0, 2.0, 0.0],
                [0.0, 0.0, 0.0],
                [4.0, 2.0, 0.0],
                [0.0, 2.0, 1.0],
            ],
            ..Mesh::default()
        }
    }

    #[test]
    fn test_triangle_normal() {
        let tri = Triangle::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        let normal = tri.calculate_normal().unwrap();
        assert_relative_eq!(normal, Vector3::new(0.0, 0.0, 1.0));

        let flat = Triangle::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]);
        assert!(flat.calculate_normal().is_none());
    }

    #[test]
    fn test_bounds_and_counts() {
        let mesh = two_triangles();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(!mesh.has_texcoords());

        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_normalize_fits_largest_extent() {
        let mut mesh = two_triangles();
        mesh.normalize(2.0);

        let bounds = mesh.bounds().unwrap();
        assert_relative_eq!(bounds.extent().x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.extent().y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(bounds.center(), Point3::origin(), epsilon = 1e-6);
    }

    #[test]
    fn test_normalize_empty_mesh_is_noop() {
        let mut mesh = Mesh::default();
        mesh.normalize(2.0);
        assert!(mesh.is_empty());
        assert!(mesh.bounds().is_none());
    }
}
