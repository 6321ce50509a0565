mod triangulate_contours;

pub use triangulate_contours::CdtTriangulator;

use crate::error::Result;
use crate::math::Point2;

/// Polygon triangulation used for sweep caps.
pub trait ContourTriangulator {
    /// Triangulates the region inside `outer` and outside every hole.
    ///
    /// Returned index triples point into the concatenation of `outer` followed
    /// by each hole, and wind counter-clockwise in the input plane.
    ///
    /// # Errors
    ///
    /// Returns an error if the contours cannot be triangulated (for example,
    /// non-finite coordinates).
    fn triangulate(&self, outer: &[Point2], holes: &[Vec<Point2>]) -> Result<Vec<[u32; 3]>>;
}
