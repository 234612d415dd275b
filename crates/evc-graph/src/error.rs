//! Graph-subsystem error type.

use thiserror::Error;

use evc_core::{EdgeId, EvcError, VertexId};

/// Errors produced by `evc-graph`.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("junction {0} not found in network")]
    UnknownJunction(VertexId),

    #[error("edge {0} not found in network")]
    UnknownEdge(EdgeId),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] EvcError),
}

pub type GraphResult<T> = Result<T, GraphError>;
