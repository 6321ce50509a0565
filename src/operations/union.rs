use std::collections::HashMap;

use crate::error::{OperationError, Result};
use crate::geometry::Mesh;
use crate::math::Point3;

/// Combines several meshes into one.
pub trait MeshUnion {
    /// Returns a single mesh covering every input.
    ///
    /// # Errors
    ///
    /// Returns an error if an input mesh is malformed.
    fn union(&self, meshes: &[Mesh]) -> Result<Mesh>;
}

/// Concatenating union for pieces that touch but do not overlap.
///
/// Coincident vertices are welded, triangles that collapse after welding are
/// dropped, and pairs of coincident opposite-facing triangles (the shared
/// wall between two touching pieces) are removed. Overlapping volumes are
/// kept as they are.
#[derive(Debug, Clone, Copy)]
pub struct MergeUnion {
    tolerance: f64,
}

impl Default for MergeUnion {
    fn default() -> Self {
        Self { tolerance: 1e-9 }
    }
}

impl MergeUnion {
    /// Creates a union with the default weld tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the distance below which vertices are welded.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.abs().max(f64::EPSILON);
        self
    }

    #[allow(clippy::cast_possible_truncation)]
    fn weld_key(&self, p: &Point3) -> [i64; 3] {
        [p.x, p.y, p.z].map(|v| (v / self.tolerance).round() as i64)
    }
}

impl MeshUnion for MergeUnion {
    #[allow(clippy::cast_possible_truncation)]
    fn union(&self, meshes: &[Mesh]) -> Result<Mesh> {
        let mut welded: HashMap<[i64; 3], u32> = HashMap::new();
        let mut vertices: Vec<Point3> = Vec::new();
        let mut faces: Vec<[u32; 3]> = Vec::new();

        for (m, mesh) in meshes.iter().enumerate() {
            let mut remap = Vec::with_capacity(mesh.vertices.len());
            for p in &mesh.vertices {
                if p.iter().any(|v| !v.is_finite()) {
                    return Err(OperationError::InvalidInput(format!("mesh {m} has a non-finite vertex")).into());
                }
                let index = *welded.entry(self.weld_key(p)).or_insert_with(|| {
                    vertices.push(*p);
                    (vertices.len() - 1) as u32
                });
                remap.push(index);
            }
            for face in &mesh.faces {
                let mapped = face
                    .iter()
                    .map(|&i| remap.get(i as usize).copied())
                    .collect::<Option<Vec<u32>>>()
                    .ok_or_else(|| OperationError::InvalidInput(format!("mesh {m} has an out-of-range face index")))?;
                let [a, b, c] = [mapped[0], mapped[1], mapped[2]];
                if a != b && b != c && a != c {
                    faces.push([a, b, c]);
                }
            }
        }

        let before = faces.len();
        let faces = drop_opposite_pairs(faces);
        tracing::debug!(
            inputs = meshes.len(),
            vertices = vertices.len(),
            faces = faces.len(),
            internal = before - faces.len(),
            "merged meshes"
        );

        let first = meshes.first();
        Ok(Mesh::new(vertices, faces)
            .with_creation_pose(first.and_then(|m| m.creation_pose))
            .with_material(first.and_then(|m| m.material.clone())))
    }
}

/// Removes triangles that coincide with an oppositely wound triangle.
fn drop_opposite_pairs(faces: Vec<[u32; 3]>) -> Vec<[u32; 3]> {
    // Keyed by the rotation starting at the smallest index; the opposite
    // winding of [a, b, c] is then [a, c, b].
    let canonical = |[a, b, c]: [u32; 3]| {
        if a < b && a < c {
            [a, b, c]
        } else if b < c {
            [b, c, a]
        } else {
            [c, a, b]
        }
    };
    let mut open: HashMap<[u32; 3], Vec<usize>> = HashMap::new();
    let mut removed = vec![false; faces.len()];
    for (i, face) in faces.iter().enumerate() {
        let key = canonical(*face);
        let opposite = [key[0], key[2], key[1]];
        if let Some(j) = open.get_mut(&opposite).and_then(Vec::pop) {
            removed[i] = true;
            removed[j] = true;
        } else {
            open.entry(key).or_default().push(i);
        }
    }
    faces
        .into_iter()
        .zip(removed)
        .filter(|(_, gone)| !gone)
        .map(|(face, _)| face)
        .collect()
}
