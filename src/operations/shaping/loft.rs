use crate::config::SweepConfig;
use crate::error::Result;
use crate::geometry::{Mesh, Path, Ring, Shape, Taper};
use crate::math::TOLERANCE;
use crate::operations::sweep::{build_mesh, push_ring, stamp};
use crate::turtle::{Pose, TurtleState};

use super::taper_corner::{solve_corner, CornerSolution, TaperedCorner};
use super::{heading_angle, path_legs, Leg};

/// Sweeps a profile that changes along the path.
///
/// The profile at fraction `t` of the path is `taper(shape, t)`. Around every
/// explicit turn the segments are pulled back by the amounts the tapered
/// corner solver finds, and the path is split into one capped mesh per
/// straight run. Smooth heading samples do not split the mesh.
#[derive(Debug, Clone)]
pub struct Loft {
    shape: Shape,
    taper: Taper,
    path: Path,
}

/// Meshes and corner solutions produced by a [`Loft`].
#[derive(Debug, Clone, Default)]
pub struct LoftOutput {
    /// One mesh per run between explicit turns.
    pub meshes: Vec<Mesh>,
    /// Solution for every junction, in path order; smooth junctions and
    /// negligible turns carry [`CornerSolution::none`].
    pub corners: Vec<CornerSolution>,
}

impl Loft {
    /// Creates a new `Loft` operation.
    #[must_use]
    pub fn new(shape: Shape, taper: Taper, path: Path) -> Self {
        Self { shape, taper, path }
    }

    /// Builds the loft without touching any turtle state.
    ///
    /// # Errors
    ///
    /// Returns an error if the path carries a non-finite number or a cap
    /// cannot be triangulated.
    pub fn build(&self, pose: &Pose, config: &SweepConfig) -> Result<LoftOutput> {
        self.path.validate()?;
        let profile = self.shape.prepared();
        let legs = path_legs(&self.path, pose);
        let total: f64 = legs.iter().map(Leg::length).sum();
        if profile.is_degenerate() || total < TOLERANCE {
            return Ok(LoftOutput::default());
        }

        let corners = self.solve_corners(&profile, &legs, total);
        let layout = profile.layout();

        let mut meshes = Vec::new();
        let mut run: Vec<Ring> = Vec::new();
        let mut run_pose = legs[0].start;
        // Length of path actually covered by rings, and the length the
        // corners cut out of it. Their sum is the nominal arc length.
        let mut walked = 0.0;
        let mut hidden = 0.0;
        let mut skip_start = false;

        for (i, leg) in legs.iter().enumerate() {
            let length = leg.length();
            let sign = if leg.distance < 0.0 { -1.0 } else { 1.0 };
            let pull_start = if i == 0 { 0.0 } else { corners[i - 1].r_n };
            let pull_end = corners.get(i).map_or(0.0, |c| c.r_p);
            let span = (length - pull_start - pull_end).max(0.0);
            let next = legs.get(i + 1);
            let smooth_after = next.is_some() && !leg.turns_after();
            let steps = step_count(config.loft_steps, length, total);

            for k in 0..=steps {
                if k == 0 && skip_start {
                    continue;
                }
                #[allow(clippy::cast_precision_loss)]
                let offset = span * k as f64 / steps as f64;
                let t = (walked + offset + hidden) / total;
                let mut at = leg.start.moved(sign * (pull_start + offset));
                if k == steps {
                    if let (true, Some(next)) = (smooth_after, next) {
                        at = at.bisected(&next.start);
                    }
                }
                push_ring(&mut run, stamp(&at, &self.taper.apply(&profile, t)));
            }
            skip_start = smooth_after;

            if !smooth_after {
                if let Some(mesh) = build_mesh(&run, &layout, false, Some(run_pose))? {
                    meshes.push(mesh.with_creation_pose(Some(*pose)));
                }
                run.clear();
                if let Some(next) = next {
                    run_pose = next.start;
                }
            }

            walked += span;
            if let Some(corner) = corners.get(i) {
                hidden += corner.hidden_dist;
            }
        }

        tracing::debug!(
            legs = legs.len(),
            meshes = meshes.len(),
            walked,
            hidden,
            "lofted profile along path"
        );
        Ok(LoftOutput { meshes, corners })
    }

    /// Executes the loft from the turtle pose, appends every mesh and leaves
    /// the turtle at the end of the path.
    ///
    /// # Errors
    ///
    /// See [`Loft::build`].
    pub fn execute(&self, mut state: TurtleState) -> Result<TurtleState> {
        let output = self.build(&state.pose, &state.config)?;
        for mesh in output.meshes {
            state.add_mesh(mesh);
        }
        state.pose = state.pose.walked(&self.path);
        Ok(state)
    }

    /// Solves every junction in path order. Each corner sees the pull-back
    /// left by the one before it, and its taper fraction counts the distance
    /// earlier corners cut out of the covered path.
    fn solve_corners(&self, profile: &Shape, legs: &[Leg], total: f64) -> Vec<CornerSolution> {
        let end_radius = self.taper.radius_at(profile, 1.0);
        let mut solutions = Vec::with_capacity(legs.len().saturating_sub(1));
        let mut walked = 0.0;
        let mut hidden = 0.0;
        let mut pulled_in = 0.0;

        for pair in legs.windows(2) {
            let (leg, next) = (&pair[0], &pair[1]);
            // Covered up to the nominal corner, before this corner's own pull-back.
            walked += leg.length() - pulled_in;
            let traveled = walked + hidden;
            let solution = if leg.turns_after() {
                let t = traveled / total;
                solve_corner(&TaperedCorner {
                    corner_radius: self.taper.radius_at(profile, t),
                    end_radius,
                    remaining: total - traveled,
                    available: (leg.length() - pulled_in).max(0.0),
                    angle: heading_angle(&leg.start, &next.start),
                })
            } else {
                CornerSolution::none()
            };
            tracing::debug!(
                r_p = solution.r_p,
                r_n = solution.r_n,
                hidden = solution.hidden_dist,
                "solved loft corner"
            );
            walked -= solution.r_p;
            hidden += solution.hidden_dist;
            pulled_in = solution.r_n;
            solutions.push(solution);
        }
        solutions
    }
}

/// Share of `total_steps` for a leg, never less than one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn step_count(total_steps: usize, length: f64, total: f64) -> usize {
    let share = (total_steps as f64 * length / total).round();
    if share.is_finite() && share >= 1.0 {
        share as usize
    } else {
        1
    }
}
