//! Workspace base error type.
//!
//! Sub-crates define their own error enums and wrap `EvcError` as one
//! variant via `From`, so configuration problems surface unchanged.

use thiserror::Error;

/// The error type for `evc-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum EvcError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `evc-core`.
pub type EvcResult<T> = Result<T, EvcError>;
