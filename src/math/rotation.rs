use nalgebra::Matrix3;

use super::{Point3, Vector3, TOLERANCE};
use crate::error::{GeometryError, Result};

/// Normalizes `v`, or returns `None` when it is (numerically) zero-length.
#[must_use]
pub fn try_normalize(v: &Vector3) -> Option<Vector3> {
    let len = v.norm();
    if len < TOLERANCE || !len.is_finite() {
        None
    } else {
        Some(v / len)
    }
}

/// Rotates `v` about the unit `axis` by `degrees` (right-hand rule).
#[must_use]
pub fn rotate_about_axis(v: &Vector3, axis: &Vector3, degrees: f64) -> Vector3 {
    rotation_matrix(axis, degrees.to_radians()) * v
}

/// Rotates `point` about the line through `pivot` along the unit `axis` by
/// `radians`.
#[must_use]
pub fn rotate_point_about(point: &Point3, pivot: &Point3, axis: &Vector3, radians: f64) -> Point3 {
    pivot + rotation_matrix(axis, radians) * (point - pivot)
}

/// Builds two unit vectors `(u, v)` perpendicular to `normal` with
/// `u × v = normal`.
///
/// # Errors
///
/// Returns [`GeometryError::ZeroVector`] if `normal` is zero-length.
pub fn orthonormal_basis(normal: &Vector3) -> Result<(Vector3, Vector3)> {
    let n = try_normalize(normal).ok_or(GeometryError::ZeroVector)?;
    // Seed with the world axis least aligned with the normal.
    let seed = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        Vector3::x()
    } else if n.y.abs() <= n.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = try_normalize(&seed.cross(&n)).ok_or(GeometryError::ZeroVector)?;
    let v = n.cross(&u);
    Ok((u, v))
}

/// Rotation matrix around a unit axis by an angle (Rodrigues).
#[allow(clippy::many_single_char_names, clippy::suspicious_operation_groupings)]
#[rustfmt::skip]
fn rotation_matrix(axis: &Vector3, angle: f64) -> Matrix3<f64> {
    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);

    Matrix3::new(
        t * x * x + c,     t * x * y - s * z, t * x * z + s * y,
        t * x * y + s * z, t * y * y + c,     t * y * z - s * x,
        t * x * z - s * y, t * y * z + s * x, t * z * z + c,
    )
}
