use std::collections::HashSet;

use slotmap::SlotMap;

use crate::error::{OperationError, Result};
use crate::geometry::Mesh;
use crate::math::{try_normalize, Point3, Vector3};

slotmap::new_key_type! {
    /// Identifier of a face in a hull under construction.
    struct HullFaceId;
}

/// Convex hull construction used to bridge self-intersecting loft steps.
pub trait HullService {
    /// Builds the convex hull of `points` as a closed, outward-wound mesh.
    ///
    /// Returns `Ok(None)` when the points span no volume (fewer than four
    /// distinct points, or all of them coplanar).
    ///
    /// # Errors
    ///
    /// Returns an error if any coordinate is not finite.
    fn convex_hull(&self, points: &[Point3]) -> Result<Option<Mesh>>;
}

/// Incremental quickhull.
#[derive(Debug, Clone, Copy)]
pub struct QuickHull {
    relative_tolerance: f64,
}

impl Default for QuickHull {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-9,
        }
    }
}

impl QuickHull {
    /// Creates a hull builder with the default tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the coplanarity tolerance, relative to the point cloud's extent.
    #[must_use]
    pub fn with_relative_tolerance(mut self, tolerance: f64) -> Self {
        self.relative_tolerance = tolerance.abs();
        self
    }
}

/// A hull face: counter-clockwise vertex indices seen from outside, its plane,
/// and the unassigned points lying above it.
#[derive(Debug, Clone)]
struct HullFace {
    vertices: [usize; 3],
    normal: Vector3,
    offset: f64,
    outside: Vec<usize>,
}

impl HullFace {
    fn new(points: &[Point3], vertices: [usize; 3]) -> Option<Self> {
        let [a, b, c] = vertices.map(|i| points[i]);
        let normal = try_normalize(&(b - a).cross(&(c - a)))?;
        Some(Self {
            vertices,
            normal,
            offset: normal.dot(&a.coords),
            outside: Vec::new(),
        })
    }

    fn distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.offset
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.vertices;
        [(a, b), (b, c), (c, a)]
    }
}

impl HullService for QuickHull {
    fn convex_hull(&self, points: &[Point3]) -> Result<Option<Mesh>> {
        if points.iter().any(|p| p.iter().any(|v| !v.is_finite())) {
            return Err(OperationError::InvalidInput("hull point is not finite".into()).into());
        }
        let points = distinct_points(points);
        if points.len() < 4 {
            return Ok(None);
        }
        let eps = self.relative_tolerance * extent(&points).max(1.0);
        let Some(simplex) = initial_simplex(&points, eps) else {
            return Ok(None);
        };

        let mut faces: SlotMap<HullFaceId, HullFace> = SlotMap::with_key();
        let inside = crate::math::centroid(&simplex.map(|i| points[i]));
        let [a, b, c, d] = simplex;
        for tri in [[a, b, c], [a, b, d], [a, c, d], [b, c, d]] {
            let Some(mut face) = HullFace::new(&points, tri) else {
                return Ok(None);
            };
            if face.distance(&inside) > 0.0 {
                face = HullFace::new(&points, [tri[0], tri[2], tri[1]])
                    .ok_or_else(|| OperationError::Failed("degenerate hull simplex".into()))?;
            }
            faces.insert(face);
        }

        let rest: Vec<usize> = (0..points.len()).filter(|i| !simplex.contains(i)).collect();
        assign_outside(&mut faces, &points, rest, eps);

        while let Some(id) = faces.iter().find(|(_, f)| !f.outside.is_empty()).map(|(id, _)| id) {
            let face = &faces[id];
            let Some(eye) = face
                .outside
                .iter()
                .copied()
                .max_by(|&i, &j| face.distance(&points[i]).total_cmp(&face.distance(&points[j])))
            else {
                break;
            };
            let eye_point = points[eye];

            let visible: Vec<HullFaceId> = faces
                .iter()
                .filter(|(_, f)| f.distance(&eye_point) > eps)
                .map(|(id, _)| id)
                .collect();
            let visible_edges: HashSet<(usize, usize)> =
                visible.iter().flat_map(|id| faces[*id].edges()).collect();
            let horizon: Vec<(usize, usize)> = visible_edges
                .iter()
                .copied()
                .filter(|&(a, b)| !visible_edges.contains(&(b, a)))
                .collect();

            let mut orphans = Vec::new();
            for id in visible {
                if let Some(removed) = faces.remove(id) {
                    orphans.extend(removed.outside.into_iter().filter(|&i| i != eye));
                }
            }
            for (a, b) in horizon {
                match HullFace::new(&points, [a, b, eye]) {
                    Some(face) => {
                        faces.insert(face);
                    }
                    None => tracing::warn!(a, b, eye, "skipping degenerate hull face"),
                }
            }
            assign_outside(&mut faces, &points, orphans, eps);
        }

        Ok(Some(compact_mesh(&points, &faces)))
    }
}

/// Hands each point to the first face it lies above; points above no face are
/// inside the hull and dropped.
fn assign_outside(
    faces: &mut SlotMap<HullFaceId, HullFace>,
    points: &[Point3],
    candidates: Vec<usize>,
    eps: f64,
) {
    for i in candidates {
        if let Some(face) = faces.values_mut().find(|f| f.distance(&points[i]) > eps) {
            face.outside.push(i);
        }
    }
}

/// Two extreme points along the widest axis, the point farthest from their
/// line, and the point farthest from that plane.
fn initial_simplex(points: &[Point3], eps: f64) -> Option<[usize; 4]> {
    let (min, max) = bounds(points);
    let axis = (max - min).imax();
    let i0 = argmax(points, |p| -p[axis])?;
    let i1 = argmax(points, |p| p[axis])?;
    let p0 = points[i0];
    let dir = try_normalize(&(points[i1] - p0))?;
    if (points[i1] - p0).norm() < eps {
        return None;
    }

    let i2 = argmax(points, |p| (p - p0).cross(&dir).norm())?;
    if (points[i2] - p0).cross(&dir).norm() < eps {
        return None;
    }

    let normal = try_normalize(&(points[i1] - p0).cross(&(points[i2] - p0)))?;
    let i3 = argmax(points, |p| normal.dot(&(p - p0)).abs())?;
    if normal.dot(&(points[i3] - p0)).abs() < eps {
        return None;
    }
    Some([i0, i1, i2, i3])
}

fn argmax(points: &[Point3], key: impl Fn(&Point3) -> f64) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| key(a).total_cmp(&key(b)))
        .map(|(i, _)| i)
}

fn bounds(points: &[Point3]) -> (Point3, Point3) {
    points.iter().fold((points[0], points[0]), |(lo, hi), p| (lo.inf(p), hi.sup(p)))
}

fn extent(points: &[Point3]) -> f64 {
    let (lo, hi) = bounds(points);
    (hi - lo).amax()
}

/// Drops exact duplicates, keeping first occurrences.
fn distinct_points(points: &[Point3]) -> Vec<Point3> {
    let mut seen = HashSet::new();
    points
        .iter()
        .copied()
        .filter(|p| seen.insert([p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]))
        .collect()
}

/// Mesh of the surviving faces, keeping only the vertices they use.
#[allow(clippy::cast_possible_truncation)]
fn compact_mesh(points: &[Point3], faces: &SlotMap<HullFaceId, HullFace>) -> Mesh {
    let mut remap = vec![u32::MAX; points.len()];
    let mut vertices = Vec::new();
    let mut triangles = Vec::with_capacity(faces.len());
    for face in faces.values() {
        let tri = face.vertices.map(|i| {
            if remap[i] == u32::MAX {
                remap[i] = vertices.len() as u32;
                vertices.push(points[i]);
            }
            remap[i]
        });
        triangles.push(tri);
    }
    tracing::trace!(vertices = vertices.len(), faces = triangles.len(), "built convex hull");
    Mesh::new(vertices, triangles)
}
