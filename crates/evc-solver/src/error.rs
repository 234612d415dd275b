use evc_core::{EvacueeId, EvcError};
use evc_graph::GraphError;
use evc_heap::HeapError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solve cancelled")]
    Cancelled,

    #[error("solver configuration error: {0}")]
    Config(String),

    #[error("evacuee {0} appears more than once")]
    DuplicateEvacuee(EvacueeId),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("priority queue error: {0}")]
    Heap(#[from] HeapError),
}

impl From<EvcError> for SolveError {
    fn from(e: EvcError) -> Self {
        match e {
            EvcError::Config(msg) => SolveError::Config(msg),
            EvcError::Parse(msg)  => SolveError::Parse(msg),
            EvcError::Io(io)      => SolveError::Io(io),
        }
    }
}

pub type SolveResult<T> = Result<T, SolveError>;
