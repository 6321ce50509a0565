mod assemble;
mod joint;
mod ring;
mod segments;

pub use assemble::{build_mesh, AssembleMesh};
pub use joint::{corner_rings, Corner};
pub use ring::{push_ring, ring_centroid, ring_radius, rings_coincide, stamp, translate_ring};
pub use segments::{
    closed_path_segments, closing_angle, leading_rotations, path_segments, shorten_for_angle,
    trailing_rotations, turn_sum, Segment, SegmentAnalyzer,
};
