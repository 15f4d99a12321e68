//! Error types of the plane fill engine

use thiserror::Error;
use uuid::Uuid;

use crate::board::Layer;

/// Failure of a clipping or offset operation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipError {
    #[error("coordinate ({x}, {y}) nm is outside the supported range")]
    CoordinateOutOfRange { x: i64, y: i64 },

    #[error("{operation} failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
}

/// Unrecoverable outcome of a plane fill build
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FillError {
    #[error("failed to fill plane {plane} on layer {layer}: {source}")]
    Geometry {
        plane: Uuid,
        layer: Layer,
        #[source]
        source: ClipError,
    },

    /// The board outlines themselves could not be combined
    #[error("failed to build the board area for layer {layer}: {source}")]
    BoardOutline {
        layer: Layer,
        #[source]
        source: ClipError,
    },

    #[error("plane fill worker stopped unexpectedly: {0}")]
    Worker(String),

    /// Not a failure; only used to unwind an aborted build
    #[error("plane fill was cancelled")]
    Cancelled,
}

impl FillError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FillError::Cancelled)
    }
}
