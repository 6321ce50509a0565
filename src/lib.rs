pub mod config;
pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod tessellation;
pub mod turtle;

pub use config::{JointMode, Resolution, SweepConfig};
pub use error::{Result, SweepError};
