//! Error types for scene construction

use thiserror::Error;

use crate::scene::NodeId;

/// Errors raised while building or editing a tree scene
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid color {input:?}: {reason}")]
    InvalidColor { input: String, reason: String },

    #[error("a tree scene needs at least one level")]
    EmptyScene,

    #[error("a curve needs at least two control points, got {points}")]
    DegenerateCurve { points: usize },

    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),
}

pub type Result<T> = std::result::Result<T, Error>;
