//! Error type shared by the fit, query and cache layers.
//!
//! The numeric kernels (`qr`, `eigen`, `svd`) never return errors: degenerate
//! columns and non-convergence are absorbed by fixed epsilons and the
//! iteration cap. Everything that sits at a boundary (model fitting, query
//! projection, cache loading) reports through [`LowRankError`].

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LowRankError {
    /// A persisted array is missing; the caller is expected to rebuild.
    #[error("cache unavailable: {} not found", .path.display())]
    CacheUnavailable { path: PathBuf },

    /// The cache was written for a different configured rank; the caller is
    /// expected to rebuild.
    #[error("cache in {} was built for rank {cached}, configured rank is {configured}", .dir.display())]
    CacheStale {
        dir: PathBuf,
        cached: usize,
        configured: usize,
    },

    /// Query issued against a model that has been neither fitted nor loaded.
    #[error("{model} model is not ready: fit or load it first")]
    ModelNotReady { model: &'static str },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LowRankError>;
