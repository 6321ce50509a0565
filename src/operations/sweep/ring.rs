use crate::geometry::{Ring, Shape};
use crate::math::{centroid, Point3, Vector3, TOLERANCE};
use crate::turtle::Pose;

/// Projects a profile into the plane through `pose.position` spanned by the
/// turtle's right and up vectors. The profile origin lands on the turtle, so
/// callers pass [`Shape::prepared`] profiles to honour the anchor.
///
/// Points are emitted in the profile's flattened order.
#[must_use]
pub fn stamp(pose: &Pose, shape: &Shape) -> Ring {
    shape.contours().flatten().map(|p| pose.to_world(p)).collect()
}

/// Centroid of a ring's vertices.
#[must_use]
pub fn ring_centroid(ring: &[Point3]) -> Point3 {
    centroid(ring)
}

/// Largest vertex distance from the ring centroid.
#[must_use]
pub fn ring_radius(ring: &[Point3]) -> f64 {
    let c = ring_centroid(ring);
    ring.iter().map(|p| (p - c).norm()).fold(0.0, f64::max)
}

/// Translates every ring vertex.
#[must_use]
pub fn translate_ring(ring: &[Point3], offset: &Vector3) -> Ring {
    ring.iter().map(|p| p + offset).collect()
}

/// Two rings with the same vertex count whose vertices all coincide.
#[must_use]
pub fn rings_coincide(a: &[Point3], b: &[Point3]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(p, q)| (p - q).norm() < TOLERANCE * (1.0 + p.coords.norm()))
}

/// Appends `ring` unless it duplicates the last ring.
pub fn push_ring(rings: &mut Vec<Ring>, ring: Ring) {
    if rings.last().is_some_and(|last| rings_coincide(last, &ring)) {
        return;
    }
    rings.push(ring);
}
