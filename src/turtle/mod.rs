mod pose;
mod state;

pub use pose::Pose;
pub use state::{PenMode, TurtleState};
