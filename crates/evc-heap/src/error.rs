//! Heap error type.

use thiserror::Error;

use crate::HeapHandle;

/// Errors produced by `evc-heap`.
#[derive(Debug, Error, PartialEq)]
pub enum HeapError {
    #[error("handle {0:?} does not refer to a live heap entry")]
    StaleHandle(HeapHandle),

    #[error("decrease_key would raise key from {old} to {new}")]
    KeyIncrease { old: f64, new: f64 },
}

pub type HeapResult<T> = Result<T, HeapError>;
