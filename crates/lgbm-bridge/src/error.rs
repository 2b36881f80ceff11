//! Crate-wide error type.

use std::path::PathBuf;

use crate::params::ParamError;

/// Errors surfaced by datasets, boosters, and the training loop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parameter assignment, decoding, or flat-string format failure.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// A native call returned a nonzero status.
    #[error("{operation} failed: {message}")]
    Native {
        operation: &'static str,
        message: String,
    },

    /// The engine broke the buffer protocol (count mismatch, oversized
    /// name, or a size that grew after the retry).
    #[error("buffer protocol violated by {operation}: {detail}")]
    Protocol {
        operation: &'static str,
        detail: String,
    },

    /// Datasets and booster disagree on configuration, or the
    /// configuration implies more than one metric.
    #[error("inconsistent configuration: {0}")]
    Consistency(String),

    /// A caller-supplied argument has the wrong shape or value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
