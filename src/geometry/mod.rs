pub mod mesh;
pub mod path;
pub mod shape;
pub mod taper;

pub use mesh::{LineSegment, Material, Mesh};
pub use path::{Command, Path, Rotation};
pub use shape::{ContourLayout, Ring, Shape};
pub use taper::Taper;
