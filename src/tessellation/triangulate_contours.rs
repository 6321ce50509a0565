use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{Result, TessellationError};
use crate::math::Point2;

use super::ContourTriangulator;

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Cap triangulation backed by a constrained Delaunay triangulation.
///
/// Interior triangles are selected by an even-odd flood fill starting at the
/// convex hull, so holes and concave outlines need no special casing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdtTriangulator;

impl ContourTriangulator for CdtTriangulator {
    #[allow(clippy::cast_possible_truncation)]
    fn triangulate(&self, outer: &[Point2], holes: &[Vec<Point2>]) -> Result<Vec<[u32; 3]>> {
        if outer.len() < 3 {
            return Ok(Vec::new());
        }

        let mut cdt = Cdt::new();
        // Maps spade vertex index -> first input index that produced it.
        let mut input_index: Vec<u32> = Vec::new();
        let mut next_input = 0u32;

        insert_constraint_loop(&mut cdt, outer, &mut input_index, &mut next_input)?;
        for hole in holes {
            if hole.len() < 3 {
                next_input += hole.len() as u32;
                continue;
            }
            insert_constraint_loop(&mut cdt, hole, &mut input_index, &mut next_input)?;
        }

        let interior = classify_interior_faces(&cdt);
        let mut triangles = Vec::with_capacity(interior.len());
        for face in cdt.inner_faces() {
            if !interior.contains(&face.fix().index()) {
                continue;
            }
            let [a, b, c] = face.vertices().map(|v| input_index.get(v.fix().index()).copied());
            if let (Some(a), Some(b), Some(c)) = (a, b, c) {
                if a != b && b != c && a != c {
                    triangles.push([a, b, c]);
                }
            }
        }
        Ok(triangles)
    }
}

/// Inserts a closed loop and constrains its edges.
fn insert_constraint_loop(
    cdt: &mut Cdt,
    points: &[Point2],
    input_index: &mut Vec<u32>,
    next_input: &mut u32,
) -> Result<()> {
    let mut handles: Vec<FixedVertexHandle> = Vec::with_capacity(points.len());
    for p in points {
        let h = cdt
            .insert(SpadePoint2::new(p.x, p.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        if h.index() == input_index.len() {
            input_index.push(*next_input);
        }
        *next_input += 1;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from == to {
            continue;
        }
        if cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        } else {
            tracing::warn!(from = from.index(), to = to.index(), "skipping self-intersecting cap edge");
        }
    }
    Ok(())
}

/// Even-odd flood fill over constraint crossings, seeded at the hull.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let n_idx = neighbor.fix().index();
            if depth_map.contains_key(&n_idx) {
                continue;
            }
            let new_depth = depth + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(n_idx, new_depth);
            if new_depth % 2 == 1 {
                interior.insert(n_idx);
            }
            queue.push_back((neighbor.fix(), new_depth));
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::polygon_2d::signed_area;

    fn square(half: f64) -> Vec<Point2> {
        vec![
            Point2::new(-half, -half),
            Point2::new(half, -half),
            Point2::new(half, half),
            Point2::new(-half, half),
        ]
    }

    fn total_area(points: &[Point2], tris: &[[u32; 3]]) -> f64 {
        tris.iter()
            .map(|t| signed_area(&[points[t[0] as usize], points[t[1] as usize], points[t[2] as usize]]))
            .sum()
    }

    #[test]
    fn square_gives_two_ccw_triangles() {
        let outer = square(1.0);
        let tris = CdtTriangulator.triangulate(&outer, &[]).unwrap();
        assert_eq!(tris.len(), 2);
        assert!((total_area(&outer, &tris) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn concave_outline_area_is_preserved() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 2.0),
            Point2::new(2.0, 2.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let tris = CdtTriangulator.triangulate(&outer, &[]).unwrap();
        assert_eq!(tris.len(), 4);
        assert!((total_area(&outer, &tris) - 12.0).abs() < 1e-12);
    }

    #[test]
    fn hole_is_excluded_and_indices_are_flattened() {
        let outer = square(2.0);
        let mut hole = square(1.0);
        hole.reverse();
        let tris = CdtTriangulator.triangulate(&outer, std::slice::from_ref(&hole)).unwrap();
        let mut all = outer.clone();
        all.extend_from_slice(&hole);
        assert!((total_area(&all, &tris) - 12.0).abs() < 1e-9);
        assert!(tris.iter().flatten().any(|&i| i >= 4));
    }

    #[test]
    fn duplicate_points_map_to_first_occurrence() {
        let outer = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let tris = CdtTriangulator.triangulate(&outer, &[]).unwrap();
        assert!(tris.iter().flatten().all(|&i| i != 2));
        assert_eq!(tris.len(), 2);
    }

    #[test]
    fn collinear_outline_has_no_triangles() {
        let outer = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert!(CdtTriangulator.triangulate(&outer, &[]).unwrap().is_empty());
    }

    #[test]
    fn non_finite_points_fail() {
        let outer = vec![Point2::new(0.0, 0.0), Point2::new(f64::NAN, 0.0), Point2::new(0.0, 1.0)];
        assert!(CdtTriangulator.triangulate(&outer, &[]).is_err());
    }
}
