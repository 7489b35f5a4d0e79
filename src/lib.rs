//! # lowrank
//!
//! Dense low-rank embeddings and nearest-neighbour lookup, built on a
//! from-scratch linear-algebra core:
//!
//! - [`qr`]: classical Gram-Schmidt QR
//! - [`eigen`]: unshifted QR-algorithm eigensolver for symmetric matrices
//! - [`svd`]: SVD from the Gram-matrix eigenpairs, plus rank truncation
//! - [`embedding`]: unit-normalised store with top-k cosine search
//! - [`lsa`]: text model (latent semantic analysis) with query folding
//! - [`pca`]: image model (principal components) ranked by Euclidean distance
//!
//! Around the core, [`builder`] carries configuration, [`storage`] persists
//! fitted arrays and [`service`] owns both models for a build-then-serve
//! lifecycle.
//!
//! Tokenisation, TF-IDF weighting, image decoding and request routing are
//! external: the models consume plain numeric matrices.

pub mod builder;
pub mod eigen;
pub mod embedding;
pub mod error;
pub mod lsa;
pub mod matrix;
pub mod operators;
pub mod pca;
pub mod qr;
pub mod service;
pub mod storage;
pub mod svd;

pub use error::{LowRankError, Result};

#[cfg(test)]
mod tests;
