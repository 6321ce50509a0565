pub mod intersect_2d;
pub mod polygon_2d;
pub mod rotation;

pub use rotation::{orthonormal_basis, rotate_about_axis, rotate_point_about, try_normalize};

/// 2D point type.
pub type Point2 = nalgebra::Point2<f64>;

/// 3D point type.
pub type Point3 = nalgebra::Point3<f64>;

/// 2D vector type.
pub type Vector2 = nalgebra::Vector2<f64>;

/// 3D vector type.
pub type Vector3 = nalgebra::Vector3<f64>;

/// Global geometric tolerance for floating-point comparisons.
pub const TOLERANCE: f64 = 1e-10;

/// Tolerance for treating two directions as parallel (cross-product magnitude).
pub const PARALLEL_TOLERANCE: f64 = 1e-6;

/// Arithmetic mean of a set of points; the origin for an empty set.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(points: &[Point3]) -> Point3 {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}
