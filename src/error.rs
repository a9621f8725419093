//! Error types for shaded-life.

use thiserror::Error;

/// Result type for shaded-life operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the simulation core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// A cell coordinate fell outside the grid.
    #[error("cell ({row}, {col}) is outside a {dimension}x{dimension} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        dimension: usize,
    },

    /// Grids must be at least 1x1.
    #[error("invalid grid dimension {0}, must be at least 1")]
    InvalidDimension(usize),

    /// A replacement matrix was rejected.
    #[error("malformed grid state: {0}")]
    MalformedState(String),

    /// The operation requires the simulation to be stopped.
    #[error("simulation is running, stop it first")]
    Running,

    /// The tick scheduler could not be created.
    #[error("scheduler unavailable: {0}")]
    Scheduler(#[source] std::io::Error),

    /// A running simulation produced no generation within the given wait.
    #[error("no generation computed within {0:?}")]
    Stalled(std::time::Duration),

    /// Reading or writing a history/snapshot file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot file could not be encoded or decoded.
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
