use std::collections::HashMap;

use crate::math::Point3;
use crate::turtle::Pose;

/// Surface appearance attached to a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGBA.
    pub color: [f32; 4],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            color: [0.8, 0.8, 0.8, 1.0],
        }
    }
}

/// A line drawn by the turtle in line mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Point3,
    pub end: Point3,
}

/// An indexed triangle mesh produced by a sweep, loft or revolve.
///
/// Once finalized a mesh is never edited in place; consumers clone it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Counter-clockwise (outward) triangles indexing `vertices`.
    pub faces: Vec<[u32; 3]>,
    /// Turtle pose at the start of the operation that built this mesh.
    pub creation_pose: Option<Pose>,
    pub material: Option<Material>,
}

impl Mesh {
    /// Creates a mesh from raw buffers.
    #[must_use]
    pub fn new(vertices: Vec<Point3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            creation_pose: None,
            material: None,
        }
    }

    /// Sets the creation pose.
    #[must_use]
    pub fn with_creation_pose(mut self, pose: Option<Pose>) -> Self {
        self.creation_pose = pose;
        self
    }

    /// Sets the material.
    #[must_use]
    pub fn with_material(mut self, material: Option<Material>) -> Self {
        self.material = material;
        self
    }

    /// `true` when there is nothing to render.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Signed enclosed volume (signed tetrahedron method).
    ///
    /// Positive when the faces wind outward; only meaningful for closed meshes.
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        let mut sum = 0.0;
        for [a, b, c] in self.triangles() {
            sum += a.coords.dot(&b.coords.cross(&c.coords));
        }
        sum / 6.0
    }

    /// Iterates over the triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.faces.iter().map(|f| {
            [
                self.vertices[f[0] as usize],
                self.vertices[f[1] as usize],
                self.vertices[f[2] as usize],
            ]
        })
    }

    /// Number of faces using each undirected edge.
    #[must_use]
    pub fn edge_use_counts(&self) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::new();
        for f in &self.faces {
            for i in 0..3 {
                let (a, b) = (f[i], f[(i + 1) % 3]);
                *counts.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Every undirected edge is shared by exactly two faces.
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        !self.faces.is_empty() && self.edge_use_counts().values().all(|&n| n == 2)
    }

    /// Number of edges used by exactly one face.
    #[must_use]
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_use_counts().values().filter(|&&n| n == 1).count()
    }

    /// Appends another mesh's geometry, offsetting its indices.
    #[allow(clippy::cast_possible_truncation)]
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
    }

    /// Reverses the winding of every face.
    pub fn flip_winding(&mut self) {
        for f in &mut self.faces {
            f.swap(1, 2);
        }
    }

    /// Axis-aligned bounds, `None` for a mesh without vertices.
    #[must_use]
    pub fn bounding_box(&self) -> Option<(Point3, Point3)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn tetrahedron() -> Mesh {
        Mesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
    }

    #[test]
    fn tetrahedron_is_watertight_with_positive_volume() {
        let mesh = tetrahedron();
        assert!(mesh.is_watertight());
        assert_eq!(mesh.boundary_edge_count(), 0);
        assert_relative_eq!(mesh.signed_volume(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn flipping_negates_volume() {
        let mut mesh = tetrahedron();
        mesh.flip_winding();
        assert_relative_eq!(mesh.signed_volume(), -1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn open_mesh_has_boundary() {
        let mut mesh = tetrahedron();
        mesh.faces.pop();
        assert!(!mesh.is_watertight());
        assert_eq!(mesh.boundary_edge_count(), 3);
    }

    #[test]
    fn merge_offsets_indices() {
        let mut a = tetrahedron();
        let b = tetrahedron();
        a.merge(&b);
        assert_eq!(a.vertices.len(), 8);
        assert_eq!(a.faces[4], [4, 6, 5]);
        assert_relative_eq!(a.signed_volume(), 2.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let (lo, hi) = tetrahedron().bounding_box().unwrap();
        assert_relative_eq!(lo, Point3::origin());
        assert_relative_eq!(hi, Point3::new(1.0, 1.0, 1.0));
        assert!(Mesh::default().bounding_box().is_none());
    }
}
