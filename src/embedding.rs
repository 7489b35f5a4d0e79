//! EmbeddingSpace: an index-addressable store of unit-length rows with top-k
//! cosine search.
//!
//! Rows are normalised once at construction. A row whose norm is at or below
//! [`NORM_EPSILON`] (a degenerate all-zero embedding) is kept as-is, so it
//! scores ~0 against everything.
//!
//! Row index is the identity of the underlying document: the store never
//! reorders rows, and translating an index into an external identifier is the
//! caller's job.
//!
//! # Examples
//!
//! ```
//! use lowrank::embedding::EmbeddingSpace;
//! use lowrank::matrix::Matrix;
//!
//! let rows = Matrix::from_rows(vec![
//!     vec![1.0, 0.0],
//!     vec![0.9, 0.1],
//!     vec![0.0, 1.0],
//! ]).unwrap();
//! let space = EmbeddingSpace::from_embeddings(&rows);
//!
//! let hits = space.top_k_by_index(0, 2).unwrap();
//! assert_eq!(hits[0].index, 1);
//! assert_eq!(hits[1].index, 2);
//! ```
//!
//! # Concurrency
//!
//! All queries take `&self`; scoring runs on rayon over read-only rows and the
//! results are collected in index order, so rankings are deterministic.

use std::cmp::Ordering;

use log::{debug, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LowRankError, Result};
use crate::matrix::Matrix;
use crate::operators::{dot, norm, normalise, NORM_EPSILON};

/// Score assigned to the querying row itself when searching by index.
pub const SELF_SENTINEL: f64 = -1.0;

/// A ranked hit: row index and its cosine similarity to the query.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbour {
    pub index: usize,
    pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmbeddingSpace {
    vectors: Matrix,
}

impl EmbeddingSpace {
    /// Normalises every row of `embeddings` and stores the result.
    pub fn from_embeddings(embeddings: &Matrix) -> Self {
        let (n, dim) = embeddings.shape();
        let mut degenerate = 0usize;
        let rows: Vec<f64> = embeddings
            .rows()
            .flat_map(|row| {
                if norm(row) <= NORM_EPSILON {
                    degenerate += 1;
                }
                normalise(row)
            })
            .collect();
        if degenerate > 0 {
            warn!(
                "{} of {} embeddings are near-zero and were left unnormalised",
                degenerate, n
            );
        }
        debug!("EmbeddingSpace built: {} vectors of dimension {}", n, dim);
        Self {
            vectors: Matrix::from_vec(n, dim, rows),
        }
    }

    /// Wraps rows that are already normalised (e.g. loaded from a cache).
    pub fn from_normalised(vectors: Matrix) -> Self {
        Self { vectors }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    /// Embedding dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.vectors.ncols()
    }

    #[inline]
    pub fn vector(&self, index: usize) -> &[f64] {
        self.vectors.row(index)
    }

    pub fn as_matrix(&self) -> &Matrix {
        &self.vectors
    }

    /// Dot product of `query` against every stored row, in index order.
    ///
    /// `query` is used as given; normalise it first for cosine scores.
    pub fn similarities(&self, query: &[f64]) -> Result<Vec<f64>> {
        if query.len() != self.dim() {
            return Err(LowRankError::DimensionMismatch {
                expected: self.dim(),
                actual: query.len(),
            });
        }
        Ok((0..self.len())
            .into_par_iter()
            .map(|i| dot(self.vectors.row(i), query))
            .collect())
    }

    /// Top-`k` neighbours of stored row `index`, never including `index` itself.
    pub fn top_k_by_index(&self, index: usize, k: usize) -> Result<Vec<Neighbour>> {
        if index >= self.len() {
            return Err(LowRankError::InvalidInput(format!(
                "index {} out of range for {} embeddings",
                index,
                self.len()
            )));
        }
        let mut scores = self.similarities(self.vector(index))?;
        scores[index] = SELF_SENTINEL;
        Ok(rank_descending(&scores, k, Some(index)))
    }

    /// Top-`k` stored rows by cosine similarity to an external `query`.
    ///
    /// The query is normalised like stored rows (left as-is when near-zero).
    pub fn top_k_by_vector(&self, query: &[f64], k: usize) -> Result<Vec<Neighbour>> {
        let query = normalise(query);
        let scores = self.similarities(&query)?;
        Ok(rank_descending(&scores, k, None))
    }
}

/// Sorts by descending score; equal scores keep ascending index order.
fn rank_descending(scores: &[f64], k: usize, exclude: Option<usize>) -> Vec<Neighbour> {
    let mut ranked: Vec<Neighbour> = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude)
        .map(|(index, &score)| Neighbour { index, score })
        .collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}
