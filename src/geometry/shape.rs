use std::ops::Range;

use crate::math::polygon_2d::{max_radius, polygon_centroid, signed_area};
use crate::math::{Point2, Point3};

/// One stamped cross-section: every profile point placed in world space.
///
/// Points follow the profile's flattened order (outer contour, then each hole).
pub type Ring = Vec<Point3>;

/// A 2D profile: an outer boundary plus optional hole contours.
///
/// Profiles are produced by the caller and treated as read-only simple polygons.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    /// Outer boundary.
    pub points: Vec<Point2>,
    /// Hole contours, each a closed loop inside the outer boundary.
    pub holes: Vec<Vec<Point2>>,
    /// Place the outer contour's centroid on the turtle instead of the
    /// profile origin.
    pub centered: bool,
}

impl Shape {
    /// Creates a profile with no holes.
    #[must_use]
    pub fn new(points: Vec<Point2>) -> Self {
        Self {
            points,
            holes: Vec::new(),
            centered: false,
        }
    }

    /// Creates a profile with hole contours.
    #[must_use]
    pub fn with_holes(points: Vec<Point2>, holes: Vec<Vec<Point2>>) -> Self {
        Self {
            points,
            holes,
            centered: false,
        }
    }

    /// Marks the profile as centered.
    #[must_use]
    pub fn centered(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }

    /// Total number of points over all contours.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len() + self.holes.iter().map(Vec::len).sum::<usize>()
    }

    /// A profile needs a 3-point outer boundary to enclose anything.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Outer contour followed by every hole.
    pub fn contours(&self) -> impl Iterator<Item = &[Point2]> {
        std::iter::once(self.points.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }

    /// All points in ring order.
    #[must_use]
    pub fn flattened(&self) -> Vec<Point2> {
        self.contours().flat_map(|c| c.iter().copied()).collect()
    }

    /// Contour sizes shared by every ring stamped from this profile.
    #[must_use]
    pub fn layout(&self) -> ContourLayout {
        ContourLayout {
            outer: self.points.len(),
            holes: self.holes.iter().map(Vec::len).collect(),
        }
    }

    /// Largest distance from the profile origin to any outer point.
    #[must_use]
    pub fn radius(&self) -> f64 {
        max_radius(&self.points)
    }

    /// Uniformly scales every contour about the profile origin.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |pts: &Vec<Point2>| -> Vec<Point2> {
            pts.iter().map(|p| Point2::from(p.coords * factor)).collect()
        };
        Self {
            points: scale(&self.points),
            holes: self.holes.iter().map(scale).collect(),
            centered: self.centered,
        }
    }

    /// Returns the profile with the outer contour counter-clockwise and holes
    /// clockwise, which the mesh assembler relies on for outward winding.
    #[must_use]
    pub fn oriented(&self) -> Self {
        let mut out = self.clone();
        if signed_area(&out.points) < 0.0 {
            out.points.reverse();
        }
        for hole in &mut out.holes {
            if signed_area(hole) > 0.0 {
                hole.reverse();
            }
        }
        out
    }

    /// The point that ends up on the turtle position: the outer centroid for
    /// centered profiles, the profile origin otherwise.
    #[must_use]
    pub fn anchor(&self) -> Point2 {
        if self.centered && !self.points.is_empty() {
            polygon_centroid(&self.points)
        } else {
            Point2::origin()
        }
    }

    /// Translates every contour so that [`Shape::anchor`] sits at the origin.
    #[must_use]
    pub fn anchored(&self) -> Self {
        let offset = self.anchor().coords;
        let shift = |pts: &Vec<Point2>| -> Vec<Point2> { pts.iter().map(|p| p - offset).collect() };
        Self {
            points: shift(&self.points),
            holes: self.holes.iter().map(shift).collect(),
            centered: self.centered,
        }
    }

    /// The profile every operation stamps: [`Shape::oriented`], then
    /// [`Shape::anchored`].
    #[must_use]
    pub fn prepared(&self) -> Self {
        self.oriented().anchored()
    }
}

/// Contour sizes of a flattened ring: outer count, then each hole count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContourLayout {
    pub outer: usize,
    pub holes: Vec<usize>,
}

impl ContourLayout {
    /// Total number of ring vertices.
    #[must_use]
    pub fn total(&self) -> usize {
        self.outer + self.holes.iter().sum::<usize>()
    }

    /// Index ranges of each contour inside a ring.
    #[must_use]
    pub fn ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(1 + self.holes.len());
        ranges.push(0..self.outer);
        let mut start = self.outer;
        for &len in &self.holes {
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn square(half: f64) -> Vec<Point2> {
        vec![
            Point2::new(-half, -half),
            Point2::new(half, -half),
            Point2::new(half, half),
            Point2::new(-half, half),
        ]
    }

    #[test]
    fn flattened_order_is_outer_then_holes() {
        let mut hole = square(0.25);
        hole.reverse();
        let shape = Shape::with_holes(square(1.0), vec![hole.clone()]);
        let flat = shape.flattened();
        assert_eq!(flat.len(), 8);
        assert_eq!(flat[4], hole[0]);
        assert_eq!(shape.point_count(), 8);
    }

    #[test]
    fn layout_ranges_partition_the_ring() {
        let layout = ContourLayout { outer: 5, holes: vec![3, 4] };
        assert_eq!(layout.total(), 12);
        assert_eq!(layout.ranges(), vec![0..5, 5..8, 8..12]);
    }

    #[test]
    fn oriented_fixes_both_windings() {
        let mut outer = square(1.0);
        outer.reverse();
        let shape = Shape::with_holes(outer, vec![square(0.5)]).oriented();
        assert!(signed_area(&shape.points) > 0.0);
        assert!(signed_area(&shape.holes[0]) < 0.0);
    }

    #[test]
    fn radius_of_unit_square() {
        assert_relative_eq!(Shape::new(square(0.5)).radius(), 0.5_f64.sqrt());
    }

    #[test]
    fn scaling_keeps_layout() {
        let shape = Shape::with_holes(square(1.0), vec![square(0.5)]).scaled(2.0);
        assert_relative_eq!(shape.points[2], Point2::new(2.0, 2.0));
        assert_relative_eq!(shape.holes[0][0], Point2::new(-1.0, -1.0));
    }

    #[test]
    fn anchor_is_the_centroid_only_when_centered() {
        let pts = vec![Point2::new(1.0, 1.0), Point2::new(3.0, 1.0), Point2::new(3.0, 3.0), Point2::new(1.0, 3.0)];
        let plain = Shape::new(pts.clone());
        assert_eq!(plain.anchor(), Point2::origin());
        assert_eq!(plain.anchored(), plain);
        let centered = Shape::new(pts).centered(true);
        assert_relative_eq!(centered.anchor(), Point2::new(2.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(centered.anchored().points[0], Point2::new(-1.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn prepared_profile_is_oriented_and_anchored() {
        let mut pts = vec![Point2::new(1.0, 1.0), Point2::new(3.0, 1.0), Point2::new(3.0, 3.0), Point2::new(1.0, 3.0)];
        pts.reverse();
        let hole = square(0.5).iter().map(|p| Point2::new(p.x + 2.0, p.y + 2.0)).collect();
        let shape = Shape::with_holes(pts, vec![hole]).centered(true).prepared();
        assert!(signed_area(&shape.points) > 0.0);
        assert!(signed_area(&shape.holes[0]) < 0.0);
        assert_relative_eq!(polygon_centroid(&shape.points), Point2::origin(), epsilon = 1e-12);
        // The hole is reversed and moves with the outer contour.
        assert_relative_eq!(shape.holes[0][3], Point2::new(-0.5, -0.5), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_profile_detection() {
        assert!(Shape::new(vec![Point2::origin(), Point2::new(1.0, 0.0)]).is_degenerate());
        assert!(!Shape::new(square(1.0)).is_degenerate());
    }
}
