pub mod hull;
pub mod shaping;
pub mod sweep;
pub mod union;

pub use hull::{HullService, QuickHull};
pub use union::{MergeUnion, MeshUnion};
