use crate::error::Result;
use crate::geometry::{ContourLayout, Mesh, Ring};
use crate::math::{orthonormal_basis, try_normalize, Point2, Point3, Vector3, TOLERANCE};
use crate::tessellation::{CdtTriangulator, ContourTriangulator};
use crate::turtle::Pose;

use super::ring::{ring_centroid, ring_radius, rings_coincide};

/// Stitches a ring sequence into a triangle mesh.
///
/// Side quads are split along their shorter diagonal. Open meshes get a cap
/// at each end; closed meshes connect the last ring back to the first and
/// carry no caps.
pub struct AssembleMesh<'a> {
    rings: &'a [Ring],
    layout: &'a ContourLayout,
    closed: bool,
    creation_pose: Option<Pose>,
}

impl<'a> AssembleMesh<'a> {
    /// Creates a new `AssembleMesh` operation.
    #[must_use]
    pub fn new(rings: &'a [Ring], layout: &'a ContourLayout) -> Self {
        Self {
            rings,
            layout,
            closed: false,
            creation_pose: None,
        }
    }

    /// Builds torus topology instead of a capped tube.
    #[must_use]
    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Records the turtle pose the sweep started from.
    #[must_use]
    pub fn creation_pose(mut self, pose: Option<Pose>) -> Self {
        self.creation_pose = pose;
        self
    }

    /// Executes the assembly.
    ///
    /// Returns `Ok(None)` for degenerate input: fewer than two rings (three
    /// for closed meshes), fewer than three outer profile points, or rings
    /// whose vertex count differs from the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if a cap cannot be triangulated.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self, triangulator: &dyn ContourTriangulator) -> Result<Option<Mesh>> {
        let n = self.layout.total();
        if self.layout.outer < 3 {
            return Ok(None);
        }
        if let Some(bad) = self.rings.iter().position(|r| r.len() != n) {
            tracing::warn!(ring = bad, expected = n, "ring vertex count mismatch, skipping mesh");
            return Ok(None);
        }

        let mut rings = self.rings;
        if self.closed && rings.len() > 2 && rings_coincide(&rings[0], &rings[rings.len() - 1]) {
            rings = &rings[..rings.len() - 1];
        }
        let min_rings = if self.closed { 3 } else { 2 };
        if rings.len() < min_rings {
            return Ok(None);
        }

        let flip = self.travel_opposes_heading(rings);
        let mut mesh = Mesh::new(rings.iter().flatten().copied().collect(), Vec::new());

        let pair_count = if self.closed { rings.len() } else { rings.len() - 1 };
        for i in 0..pair_count {
            let j = (i + 1) % rings.len();
            let base_a = (i * n) as u32;
            let base_b = (j * n) as u32;
            for range in self.layout.ranges() {
                let len = range.len();
                for k in 0..len {
                    let k0 = (range.start + k) as u32;
                    let k1 = (range.start + (k + 1) % len) as u32;
                    let quad = [base_a + k0, base_a + k1, base_b + k1, base_b + k0];
                    for tri in split_quad(&mesh.vertices, quad) {
                        mesh.faces.push(if flip { [tri[0], tri[2], tri[1]] } else { tri });
                    }
                }
            }
        }

        if !self.closed {
            let last = rings.len() - 1;
            let start = cap_normal(&rings[0], &rings[1], self.creation_pose.as_ref().map(|p| -p.heading));
            let end = cap_normal(
                &rings[last],
                &rings[last - 1],
                self.creation_pose.as_ref().map(|p| p.heading),
            );
            if let Some(normal) = start {
                self.add_cap(&mut mesh, [&rings[0], &rings[1]], 0, &normal, triangulator)?;
            }
            if let Some(normal) = end {
                let base = (last * n) as u32;
                self.add_cap(&mut mesh, [&rings[last], &rings[last - 1]], base, &normal, triangulator)?;
            }
        }

        tracing::debug!(
            rings = rings.len(),
            faces = mesh.faces.len(),
            closed = self.closed,
            flipped = flip,
            "assembled sweep mesh"
        );
        Ok(Some(mesh.with_creation_pose(self.creation_pose)))
    }

    /// The sweep runs backwards relative to the turtle's initial heading
    /// (negative-distance extrusions), so the side winding must be reversed.
    fn travel_opposes_heading(&self, rings: &[Ring]) -> bool {
        let Some(pose) = &self.creation_pose else {
            return false;
        };
        rings
            .windows(2)
            .map(|w| ring_centroid(&w[1]) - ring_centroid(&w[0]))
            .find(|d| d.norm() > TOLERANCE)
            .is_some_and(|travel| travel.dot(&pose.heading) < 0.0)
    }

    /// Triangulates the cap ring projected onto the plane facing `normal` and
    /// adds the triangles (counter-clockwise around `normal`).
    ///
    /// A ring collapsed to a point borrows its neighbour's triangulation so the
    /// zero-area cap still closes every boundary edge.
    fn add_cap(
        &self,
        mesh: &mut Mesh,
        [cap, neighbour]: [&Ring; 2],
        base: u32,
        normal: &Vector3,
        triangulator: &dyn ContourTriangulator,
    ) -> Result<()> {
        let ring = if ring_radius(cap) < TOLERANCE { neighbour } else { cap };
        let (u, v) = orthonormal_basis(normal)?;
        let origin = ring_centroid(ring);
        let project = |p: &Point3| {
            let d = p - origin;
            Point2::new(d.dot(&u), d.dot(&v))
        };
        let ranges = self.layout.ranges();
        let outer: Vec<Point2> = ring[ranges[0].clone()].iter().map(project).collect();
        let holes: Vec<Vec<Point2>> = ranges[1..]
            .iter()
            .map(|r| ring[r.clone()].iter().map(project).collect())
            .collect();

        let triangles = triangulator.triangulate(&outer, &holes)?;
        if triangles.is_empty() {
            tracing::warn!("cap could not be triangulated, leaving the end open");
        }
        mesh.faces
            .extend(triangles.into_iter().map(|t| [base + t[0], base + t[1], base + t[2]]));
        Ok(())
    }
}

/// Assembles `rings` with the default cap triangulator.
///
/// # Errors
///
/// Returns an error if a cap cannot be triangulated.
pub fn build_mesh(
    rings: &[Ring],
    layout: &ContourLayout,
    closed: bool,
    creation_pose: Option<Pose>,
) -> Result<Option<Mesh>> {
    AssembleMesh::new(rings, layout)
        .closed(closed)
        .creation_pose(creation_pose)
        .execute(&CdtTriangulator)
}

/// Splits the quad `a b c d` (a, b on the first ring; c above b, d above a)
/// along its shorter diagonal, wound outward for a counter-clockwise profile
/// swept along its back face normal.
fn split_quad(vertices: &[Point3], [a, b, c, d]: [u32; 4]) -> [[u32; 3]; 2] {
    let p = |i: u32| vertices[i as usize];
    let ac = (p(c) - p(a)).norm_squared();
    let bd = (p(d) - p(b)).norm_squared();
    if ac <= bd {
        [[a, c, b], [a, d, c]]
    } else {
        [[a, d, b], [b, d, c]]
    }
}

/// Outward cap normal, taken from the displacement between the cap ring's
/// centroid and its neighbour's; falls back to the ring's own Newell normal
/// oriented by `hint` when the two centroids coincide.
fn cap_normal(cap: &[Point3], neighbour: &[Point3], hint: Option<Vector3>) -> Option<Vector3> {
    if let Some(n) = try_normalize(&(ring_centroid(cap) - ring_centroid(neighbour))) {
        return Some(n);
    }
    let newell = try_normalize(&newell_normal(cap))?;
    match hint {
        Some(h) if newell.dot(&h) < 0.0 => Some(-newell),
        _ => Some(newell),
    }
}

/// Computes the (unnormalized) normal of a polygon using Newell's method.
fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}
