use thiserror::Error;

/// Top-level error type for the sweep kernel.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Tessellation(#[from] TessellationError),
}

/// Errors raised at turtle command entry points, before any state changes.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{command}: expected a finite number, got {value}")]
    InvalidNumber { command: &'static str, value: f64 },

    #[error("pose stack is empty")]
    PoseStackEmpty,

    #[error("no mark named {0:?}")]
    UnknownMark(String),

    #[error("pen is in {found} mode, expected {expected}")]
    ModeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,
}

/// Errors reported by the hull and union services.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Errors related to cap triangulation.
#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("invalid tessellation parameters: {0}")]
    InvalidParameters(String),

    #[error("tessellation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`SweepError`].
pub type Result<T> = std::result::Result<T, SweepError>;

/// Rejects non-finite command arguments.
///
/// # Errors
///
/// Returns [`CommandError::InvalidNumber`] naming `command` when `value` is NaN
/// or infinite.
pub fn ensure_finite(command: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CommandError::InvalidNumber { command, value }.into())
    }
}
