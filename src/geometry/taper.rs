use std::fmt;
use std::sync::Arc;

use super::Shape;

type TaperFn = dyn Fn(&Shape, f64) -> Shape + Send + Sync;

/// Profile transform applied along a loft: `(shape, t) -> shape` with `t` the
/// fraction of the path travelled, in `[0, 1]`.
///
/// The transform must keep the profile's point count.
#[derive(Clone)]
pub struct Taper(Arc<TaperFn>);

impl Taper {
    /// Wraps an arbitrary transform.
    pub fn new(f: impl Fn(&Shape, f64) -> Shape + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Uniform scale going linearly from 1 at the start to `end_scale`.
    #[must_use]
    pub fn linear(end_scale: f64) -> Self {
        Self::new(move |shape, t| shape.scaled(1.0 + (end_scale - 1.0) * t))
    }

    /// Leaves the profile unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(|shape, _| shape.clone())
    }

    /// Transforms `shape` at fraction `t`, clamped to `[0, 1]`.
    #[must_use]
    pub fn apply(&self, shape: &Shape, t: f64) -> Shape {
        (self.0)(shape, t.clamp(0.0, 1.0))
    }

    /// Profile radius at fraction `t`.
    #[must_use]
    pub fn radius_at(&self, shape: &Shape, t: f64) -> f64 {
        self.apply(shape, t).radius()
    }
}

impl Default for Taper {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Taper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Taper(..)")
    }
}
