//! src/error.rs
//!
//! Typed failures raised by the augmentation crate.
//!
//! Public operations return `anyhow::Result`; the variants below are raised
//! through `ensure!`/`bail!` so callers can recover the kind with
//! `err.downcast_ref::<AugmentError>()`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AugmentError {
    /// Invalid construction parameters. Raised at construction, never at call time.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Malformed input image or tensor.
    #[error("invalid input: {0}")]
    Input(String),

    /// Stage name outside of `train`, `val`, `ft`, `test`.
    #[error("unsupported stage '{0}' (expected one of: train, val, ft, test)")]
    UnsupportedStage(String),
}

impl AugmentError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }
}
