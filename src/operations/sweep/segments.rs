use crate::geometry::{Command, Path, Rotation};

/// Turn angles are clamped here before shortening so near-reversals stay finite.
const MAX_SHORTEN_ANGLE_DEG: f64 = 175.0;

/// One forward move of a path, with the pull-back needed at each end so the
/// cross-sections on either side of a corner meet without overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Signed forward distance.
    pub distance: f64,
    pub shorten_start: f64,
    pub shorten_end: f64,
    /// Summed corner angle (degrees) of the rotations following this move,
    /// including the implicit closing turn on the seam of a closed path.
    pub turn_after: f64,
    /// Rotations (and smooth heading samples) between this move and the next.
    pub rotations_after: Vec<Rotation>,
}

impl Segment {
    /// Start and end pull-back limited to the segment length. The start is
    /// pulled in first and the end gets whatever length is left, which is
    /// the order an interactive sweep resolves them in.
    #[must_use]
    pub fn clamped_shortening(&self) -> (f64, f64) {
        let length = self.distance.abs();
        let start = self.shorten_start.min(length);
        (start, self.shorten_end.min(length - start))
    }
}

/// Pull-back distance for a turn of `degrees` with a cross-section of
/// `radius`: `radius * tan(angle / 2)`, the tangent length of a fillet of
/// that radius.
#[must_use]
pub fn shorten_for_angle(degrees: f64, radius: f64) -> f64 {
    let angle = degrees.abs().min(MAX_SHORTEN_ANGLE_DEG).to_radians();
    radius * (angle * 0.5).tan()
}

/// Partitions a path into segments, one per forward move.
#[derive(Debug, Clone, Copy)]
pub struct SegmentAnalyzer {
    radius: f64,
    threshold_deg: f64,
}

impl SegmentAnalyzer {
    /// Creates an analyzer for a cross-section of `radius` with the default
    /// 10 degree significance threshold.
    #[must_use]
    pub fn new(radius: f64) -> Self {
        Self {
            radius,
            threshold_deg: 10.0,
        }
    }

    /// Sets the summed turn (degrees) above which a corner shortens its
    /// neighbouring segments.
    #[must_use]
    pub fn threshold(mut self, degrees: f64) -> Self {
        self.threshold_deg = degrees;
        self
    }

    /// Segments of an open path. The first segment never shortens its start
    /// and the last never shortens its end.
    #[must_use]
    pub fn analyze(&self, path: &Path) -> Vec<Segment> {
        let forwards = forward_indices(path);
        let count = forwards.len();
        let mut segments = Vec::with_capacity(count);
        for (i, &index) in forwards.iter().enumerate() {
            let before = if i == 0 {
                0.0
            } else {
                turn_sum(&rotations_between(path, forwards[i - 1], index))
            };
            let rotations_after = if i + 1 == count {
                trailing_rotations(path)
            } else {
                rotations_between(path, index, forwards[i + 1])
            };
            let turn_after = turn_sum(&rotations_after);
            let after = if i + 1 == count { 0.0 } else { turn_after };
            segments.push(Segment {
                distance: forward_arg(path, index),
                shorten_start: self.shorten(before),
                shorten_end: self.shorten(after),
                turn_after,
                rotations_after,
            });
        }
        tracing::debug!(segments = segments.len(), radius = self.radius, "analyzed open path");
        segments
    }

    /// Segments of a closed path. Indices wrap, and the seam between the last
    /// and first segment also carries the closing turn from
    /// [`closing_angle`]. That sum only decides whether the seam is a corner.
    /// The pull-back there follows the actual bend, which is the explicit
    /// seam turns plus the closing turn folded into `[0, 180]`; a seam that
    /// counts as a corner without bending is pulled back by the radius.
    #[must_use]
    pub fn analyze_closed(&self, path: &Path) -> Vec<Segment> {
        let forwards = forward_indices(path);
        let count = forwards.len();
        if count == 0 {
            return Vec::new();
        }

        let mut seam = trailing_rotations(path);
        seam.extend(leading_rotations(path));
        let seam_turn = turn_sum(&seam) + closing_angle(path);
        let seam_bend = turn_sum(&seam) + closing_bend(path);
        let seam_shorten = if !self.is_significant(seam_turn) {
            0.0
        } else if self.is_significant(seam_bend) {
            shorten_for_angle(seam_bend, self.radius)
        } else {
            self.radius
        };

        let mut segments = Vec::with_capacity(count);
        for (i, &index) in forwards.iter().enumerate() {
            let shorten_start = if i == 0 {
                seam_shorten
            } else {
                self.shorten(turn_sum(&rotations_between(path, forwards[i - 1], index)))
            };
            let (rotations_after, turn_after, shorten_end) = if i + 1 == count {
                (seam.clone(), seam_turn, seam_shorten)
            } else {
                let rotations = rotations_between(path, index, forwards[i + 1]);
                let turn = turn_sum(&rotations);
                (rotations, turn, self.shorten(turn))
            };
            segments.push(Segment {
                distance: forward_arg(path, index),
                shorten_start,
                shorten_end,
                turn_after,
                rotations_after,
            });
        }
        tracing::debug!(
            segments = segments.len(),
            seam_turn,
            seam_bend,
            radius = self.radius,
            "analyzed closed path"
        );
        segments
    }

    /// Whether a summed turn is large enough to count as a corner.
    #[must_use]
    pub fn is_significant(&self, degrees: f64) -> bool {
        degrees > self.threshold_deg
    }

    fn shorten(&self, degrees: f64) -> f64 {
        if self.is_significant(degrees) {
            shorten_for_angle(degrees, self.radius)
        } else {
            0.0
        }
    }
}

/// Segments of an open path with the default threshold.
#[must_use]
pub fn path_segments(path: &Path, radius: f64) -> Vec<Segment> {
    SegmentAnalyzer::new(radius).analyze(path)
}

/// Segments of a closed path with the default threshold.
#[must_use]
pub fn closed_path_segments(path: &Path, radius: f64) -> Vec<Segment> {
    SegmentAnalyzer::new(radius).analyze_closed(path)
}

/// Rotations before the first forward move.
#[must_use]
pub fn leading_rotations(path: &Path) -> Vec<Rotation> {
    let end = forward_indices(path).first().copied().unwrap_or(path.commands.len());
    collect_rotations(&path.commands[..end])
}

/// Rotations after the last forward move (all of them if there is none).
#[must_use]
pub fn trailing_rotations(path: &Path) -> Vec<Rotation> {
    match forward_indices(path).last() {
        Some(&last) => collect_rotations(&path.commands[last + 1..]),
        None => collect_rotations(&path.commands),
    }
}

/// Implicit closing turn of a loop, `360 - (signed sum of corner turns mod
/// 360)`. A loop whose turns add up to whole revolutions gives 360.
#[must_use]
pub fn closing_angle(path: &Path) -> f64 {
    360.0 - corner_total(path).rem_euclid(360.0)
}

/// Bend left at the seam by turns that miss a whole revolution, in `[0, 180]`.
fn closing_bend(path: &Path) -> f64 {
    let rem = corner_total(path).rem_euclid(360.0);
    rem.min(360.0 - rem)
}

fn corner_total(path: &Path) -> f64 {
    path.commands
        .iter()
        .filter_map(Command::as_rotation)
        .map(|r| r.corner_angle())
        .sum()
}

/// Summed absolute corner angle; smooth heading samples contribute nothing.
#[must_use]
pub fn turn_sum(rotations: &[Rotation]) -> f64 {
    rotations.iter().map(|r| r.corner_angle().abs()).sum()
}

fn forward_indices(path: &Path) -> Vec<usize> {
    path.commands
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, Command::Forward(_)))
        .map(|(i, _)| i)
        .collect()
}

fn forward_arg(path: &Path, index: usize) -> f64 {
    path.commands[index].forward_distance().unwrap_or(0.0)
}

fn rotations_between(path: &Path, from: usize, to: usize) -> Vec<Rotation> {
    collect_rotations(&path.commands[from + 1..to])
}

fn collect_rotations(commands: &[Command]) -> Vec<Rotation> {
    commands.iter().filter_map(Command::as_rotation).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::math::Vector3;

    const R: f64 = 0.5;

    fn square_loop() -> Path {
        Path::new().forward(10.0).yaw(90.0).repeated(4)
    }

    #[test]
    fn shortening_boundary_values() {
        assert_relative_eq!(shorten_for_angle(0.0, R), 0.0);
        assert_relative_eq!(shorten_for_angle(90.0, R), R, epsilon = 1e-12);
        assert_relative_eq!(shorten_for_angle(-90.0, R), R, epsilon = 1e-12);
        assert_relative_eq!(shorten_for_angle(179.0, R), shorten_for_angle(175.0, R));
    }

    #[test]
    fn shortening_grows_with_angle() {
        let mut previous = 0.0;
        for deg in (5..=175).step_by(5) {
            let s = shorten_for_angle(f64::from(deg), R);
            assert!(s > previous);
            previous = s;
        }
    }

    #[test]
    fn one_segment_per_forward_and_distances_add_up() {
        let path = Path::new()
            .yaw(30.0)
            .forward(3.0)
            .pitch(45.0)
            .roll(10.0)
            .forward(4.5)
            .mark("a")
            .forward(-2.0)
            .yaw(90.0);
        let segments = path_segments(&path, R);
        assert_eq!(segments.len(), 3);
        let sum: f64 = segments.iter().map(|s| s.distance).sum();
        assert_relative_eq!(sum, path.total_distance());
        assert!(segments[1].rotations_after.is_empty());
        assert_eq!(segments[2].rotations_after, vec![Rotation::Yaw(90.0)]);
    }

    #[test]
    fn open_path_corner_shortening() {
        let path = Path::new().forward(10.0).yaw(90.0).forward(10.0);
        let segments = path_segments(&path, R);
        assert_eq!(segments.len(), 2);
        assert_relative_eq!(segments[0].shorten_start, 0.0);
        assert_relative_eq!(segments[0].shorten_end, R, epsilon = 1e-12);
        assert_relative_eq!(segments[1].shorten_start, R, epsilon = 1e-12);
        assert_relative_eq!(segments[1].shorten_end, 0.0);
        assert_eq!(segments[0].rotations_after, vec![Rotation::Yaw(90.0)]);
    }

    #[test]
    fn open_path_ends_never_shorten() {
        let path = Path::new().yaw(90.0).forward(5.0).yaw(90.0);
        let segments = path_segments(&path, R);
        assert_eq!(segments.len(), 1);
        assert_relative_eq!(segments[0].shorten_start, 0.0);
        assert_relative_eq!(segments[0].shorten_end, 0.0);
        assert_eq!(leading_rotations(&path), vec![Rotation::Yaw(90.0)]);
    }

    #[test]
    fn small_and_smooth_turns_do_not_shorten() {
        let path = Path::new()
            .forward(1.0)
            .yaw(4.0)
            .yaw(4.0)
            .forward(1.0)
            .set_heading(Vector3::y(), Vector3::z())
            .unwrap()
            .forward(1.0);
        let segments = path_segments(&path, R);
        assert!(segments.iter().all(|s| s.shorten_start + s.shorten_end < 1e-12));
        assert_relative_eq!(segments[0].turn_after, 8.0);
        assert_relative_eq!(segments[1].turn_after, 0.0);
    }

    #[test]
    fn consecutive_turns_are_summed() {
        let path = Path::new().forward(5.0).yaw(6.0).pitch(-6.0).forward(5.0);
        let segments = path_segments(&path, R);
        assert_relative_eq!(segments[0].turn_after, 12.0);
        assert_relative_eq!(segments[0].shorten_end, shorten_for_angle(12.0, R));
    }

    #[test]
    fn closed_square_shortens_every_end() {
        let segments = closed_path_segments(&square_loop(), R);
        assert_eq!(segments.len(), 4);
        for s in &segments {
            assert_relative_eq!(s.shorten_start, R, epsilon = 1e-12);
            assert_relative_eq!(s.shorten_end, R, epsilon = 1e-12);
        }
        assert_eq!(segments[3].rotations_after, vec![Rotation::Yaw(90.0)]);
    }

    #[test]
    fn closing_angle_of_complete_and_implicit_loops() {
        assert_relative_eq!(closing_angle(&square_loop()), 360.0);
        let implicit = Path::new()
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0);
        assert_relative_eq!(closing_angle(&implicit), 90.0);
        let right_handed = Path::new().forward(1.0).yaw(-90.0).repeated(4);
        assert_relative_eq!(closing_angle(&right_handed), 360.0);
        let drifted = Path::new().forward(1.0).yaw(90.05).repeated(4);
        assert_relative_eq!(closing_angle(&drifted), 359.8, epsilon = 1e-9);
    }

    #[test]
    fn drifted_loop_is_pulled_back_by_its_real_bend() {
        let drifted = Path::new().forward(10.0).yaw(90.05).repeated(4);
        let segments = closed_path_segments(&drifted, R);
        assert_relative_eq!(segments[3].turn_after, 90.05 + 359.8, epsilon = 1e-9);
        assert_relative_eq!(segments[3].shorten_end, shorten_for_angle(90.25, R), epsilon = 1e-9);
        assert_relative_eq!(segments[0].shorten_start, segments[3].shorten_end);
    }

    #[test]
    fn straight_seam_still_counts_as_a_corner() {
        // The explicit turns make a full revolution between the two halves
        // of the first side, so the seam itself does not bend.
        let path = Path::new()
            .forward(5.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(5.0);
        let segments = closed_path_segments(&path, R);
        assert_eq!(segments.len(), 5);
        assert!(segments[4].rotations_after.is_empty());
        assert_relative_eq!(segments[4].turn_after, 360.0);
        assert_relative_eq!(segments[4].shorten_end, R);
        assert_relative_eq!(segments[0].shorten_start, R);
        for s in &segments[1..4] {
            assert_relative_eq!(s.shorten_start, R, epsilon = 1e-12);
        }
    }

    #[test]
    fn implicit_closing_turn_shortens_the_seam() {
        let path = Path::new()
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0)
            .yaw(90.0)
            .forward(10.0);
        let segments = closed_path_segments(&path, R);
        assert_relative_eq!(segments[0].shorten_start, R, epsilon = 1e-12);
        assert_relative_eq!(segments[3].shorten_end, R, epsilon = 1e-12);
        assert!(segments[3].rotations_after.is_empty());
    }

    #[test]
    fn shortening_is_clamped_to_segment_length() {
        let segment = Segment {
            distance: -1.0,
            shorten_start: 1.0,
            shorten_end: 3.0,
            turn_after: 90.0,
            rotations_after: Vec::new(),
        };
        // The start takes what it needs first; the end gets the rest.
        let (s0, s1) = segment.clamped_shortening();
        assert_relative_eq!(s0, 1.0);
        assert_relative_eq!(s1, 0.0);
        let short = Segment { shorten_start: 0.25, ..segment };
        assert_eq!(short.clamped_shortening(), (0.25, 0.75));
    }

    #[test]
    fn path_without_forward_moves_has_no_segments() {
        let path = Path::new().yaw(90.0);
        assert!(path_segments(&path, R).is_empty());
        assert!(closed_path_segments(&path, R).is_empty());
        assert_eq!(trailing_rotations(&path), vec![Rotation::Yaw(90.0)]);
    }
}
