//! # AppearanceModel: PCA over flattened luminance images
//!
//! Fitting on `N` samples of dimension `d` (`d = width × height`):
//!
//! 1. compute the mean sample and centre every sample on it
//! 2. stack the centred samples as columns of a `d × N` matrix and run a
//!    rank-`k` truncated SVD on it; `U_k` (`d × k`) is the principal basis
//! 3. project each centred sample, `c_j = U_kᵀ · (x_j − μ)`, into an `N × k`
//!    coefficient matrix kept **unnormalised**
//!
//! Queries are centred on the stored mean, projected the same way and ranked by
//! Euclidean distance between coefficient rows, smallest first. Unlike the
//! semantic model this space is magnitude-sensitive: two images that differ
//! only in brightness are far apart here.
//!
//! The Gram matrix decomposed is `N × N`, so fitting cost scales with the number
//! of images rather than the pixel count.

use std::cmp::Ordering;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::eigen::EigenParams;
use crate::error::{LowRankError, Result};
use crate::matrix::Matrix;
use crate::operators::{euclidean_distance, sub};
use crate::svd::SvdEngine;

const MODEL_NAME: &str = "appearance";

/// Rec.709 luma weights, applied to interleaved RGB input.
pub const LUMA_RED: f64 = 0.2126;
pub const LUMA_GREEN: f64 = 0.7152;
pub const LUMA_BLUE: f64 = 0.0722;

/// Converts interleaved 8-bit RGB pixels into one luminance value per pixel.
///
/// Channel order is fixed to R, G, B. Callers holding BGR buffers must swap
/// channels first.
pub fn luminance(rgb: &[u8]) -> Result<Vec<f64>> {
    if rgb.len() % 3 != 0 {
        return Err(LowRankError::InvalidInput(format!(
            "RGB buffer length {} is not a multiple of 3",
            rgb.len()
        )));
    }
    Ok(rgb
        .chunks_exact(3)
        .map(|px| {
            LUMA_RED * px[0] as f64 + LUMA_GREEN * px[1] as f64 + LUMA_BLUE * px[2] as f64
        })
        .collect())
}

/// Linear distance-to-similarity heuristic used when presenting image matches.
///
/// `distance < 1e-5` maps to exactly `1.0`; otherwise
/// `max(0, 1 − distance / scale)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreDecay {
    pub scale: f64,
}

pub const DEFAULT_DECAY_SCALE: f64 = 100_000.0;
const EXACT_MATCH_DISTANCE: f64 = 1e-5;

impl Default for ScoreDecay {
    fn default() -> Self {
        Self {
            scale: DEFAULT_DECAY_SCALE,
        }
    }
}

impl ScoreDecay {
    pub fn score(&self, distance: f64) -> f64 {
        if distance < EXACT_MATCH_DISTANCE {
            1.0
        } else {
            (1.0 - distance / self.scale).max(0.0)
        }
    }
}

/// A ranked image hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageMatch {
    pub index: usize,
    pub distance: f64,
    pub similarity: f64,
}

/// Arrays produced by a fit; exactly what gets persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct AppearanceArrays {
    /// length `d`
    pub mean: Vec<f64>,
    /// `d × rank`
    pub basis: Matrix,
    /// `N × rank`, unnormalised
    pub coefficients: Matrix,
}

impl AppearanceArrays {
    pub fn validate(&self) -> Result<()> {
        let (d, rank) = self.basis.shape();
        if self.mean.len() != d || self.coefficients.ncols() != rank {
            return Err(LowRankError::InvalidInput(format!(
                "inconsistent appearance arrays: mean {}, basis {:?}, coefficients {:?}",
                self.mean.len(),
                self.basis.shape(),
                self.coefficients.shape()
            )));
        }
        Ok(())
    }

    fn project(&self, sample: &[f64]) -> Vec<f64> {
        self.basis.transpose_matvec(&sub(sample, &self.mean))
    }
}

#[derive(Clone, Debug)]
pub struct AppearanceModel {
    rank: usize,
    engine: SvdEngine,
    decay: ScoreDecay,
    arrays: Option<AppearanceArrays>,
}

impl AppearanceModel {
    pub fn new(rank: usize, params: EigenParams, decay: ScoreDecay) -> Self {
        Self {
            rank,
            engine: SvdEngine::new(params),
            decay,
            arrays: None,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn decay(&self) -> ScoreDecay {
        self.decay
    }

    pub fn is_ready(&self) -> bool {
        self.arrays.is_some()
    }

    pub fn arrays(&self) -> Option<&AppearanceArrays> {
        self.arrays.as_ref()
    }

    pub fn restore(&mut self, arrays: AppearanceArrays) -> Result<()> {
        arrays.validate()?;
        debug!(
            "Appearance model restored: {} images, dimension {}, rank {}",
            arrays.coefficients.nrows(),
            arrays.mean.len(),
            arrays.basis.ncols()
        );
        self.arrays = Some(arrays);
        Ok(())
    }

    fn ready(&self) -> Result<&AppearanceArrays> {
        self.arrays
            .as_ref()
            .ok_or(LowRankError::ModelNotReady { model: MODEL_NAME })
    }

    /// Fits on `samples`, one flattened luminance vector per image.
    pub fn fit(&mut self, samples: &[Vec<f64>]) -> Result<()> {
        let n = samples.len();
        let d = samples.first().map(|s| s.len()).unwrap_or(0);
        if n == 0 || d == 0 {
            return Err(LowRankError::InvalidInput(
                "appearance model needs at least one non-empty sample".to_string(),
            ));
        }
        if self.rank == 0 {
            return Err(LowRankError::InvalidInput("rank k must be > 0".to_string()));
        }
        if let Some(bad) = samples.iter().find(|s| s.len() != d) {
            return Err(LowRankError::DimensionMismatch {
                expected: d,
                actual: bad.len(),
            });
        }
        if samples.iter().flatten().any(|x| !x.is_finite()) {
            return Err(LowRankError::InvalidInput(
                "samples contain non-finite values".to_string(),
            ));
        }

        info!(
            "Fitting appearance model: {} images of dimension {}, k={}",
            n, d, self.rank
        );

        let mut mean = vec![0.0; d];
        for sample in samples {
            mean.iter_mut().zip(sample.iter()).for_each(|(m, &x)| *m += x);
        }
        mean.iter_mut().for_each(|m| *m /= n as f64);

        let centred: Vec<Vec<f64>> = samples.iter().map(|s| sub(s, &mean)).collect();
        let data = Matrix::from_columns(d, &centred);

        let svd = self.engine.truncated(&data, self.rank);
        let basis = svd.u;
        let rank = basis.ncols();

        let coefficients: Vec<f64> = centred
            .par_iter()
            .map(|c| basis.transpose_matvec(c))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect();

        info!(
            "Appearance model fitted: {} images projected onto {} components",
            n, rank
        );
        self.arrays = Some(AppearanceArrays {
            mean,
            basis,
            coefficients: Matrix::from_vec(n, rank, coefficients),
        });
        Ok(())
    }

    /// Fits on a smartcore matrix holding one flattened image per row.
    pub fn fit_dense(&mut self, samples: &DenseMatrix<f64>) -> Result<()> {
        let samples = Matrix::from_dense_matrix(samples);
        self.fit(&samples.rows().map(|r| r.to_vec()).collect::<Vec<_>>())
    }

    pub fn n_images(&self) -> Result<usize> {
        Ok(self.ready()?.coefficients.nrows())
    }

    /// Coefficients of a new image in the fitted basis.
    pub fn project(&self, sample: &[f64]) -> Result<Vec<f64>> {
        let arrays = self.ready()?;
        if sample.len() != arrays.mean.len() {
            return Err(LowRankError::DimensionMismatch {
                expected: arrays.mean.len(),
                actual: sample.len(),
            });
        }
        Ok(arrays.project(sample))
    }

    /// The `top_n` stored images closest to `sample`.
    pub fn similar_to_sample(&self, sample: &[f64], top_n: usize) -> Result<Vec<ImageMatch>> {
        let coefficients = self.project(sample)?;
        let arrays = self.ready()?;
        Ok(self.rank_by_distance(arrays, &coefficients, top_n, None))
    }

    /// The `top_n` stored images closest to stored image `index`, excluding it.
    pub fn similar_to_index(&self, index: usize, top_n: usize) -> Result<Vec<ImageMatch>> {
        let arrays = self.ready()?;
        if index >= arrays.coefficients.nrows() {
            return Err(LowRankError::InvalidInput(format!(
                "index {} out of range for {} images",
                index,
                arrays.coefficients.nrows()
            )));
        }
        let query = arrays.coefficients.row(index).to_vec();
        Ok(self.rank_by_distance(arrays, &query, top_n, Some(index)))
    }

    /// Ascending distance; ties keep ascending index order.
    fn rank_by_distance(
        &self,
        arrays: &AppearanceArrays,
        query: &[f64],
        top_n: usize,
        exclude: Option<usize>,
    ) -> Vec<ImageMatch> {
        let distances: Vec<f64> = (0..arrays.coefficients.nrows())
            .into_par_iter()
            .map(|i| euclidean_distance(query, arrays.coefficients.row(i)))
            .collect();

        let mut ranked: Vec<(usize, f64)> = distances
            .into_iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
        ranked.truncate(top_n);

        ranked
            .into_iter()
            .map(|(index, distance)| ImageMatch {
                index,
                distance,
                similarity: self.decay.score(distance),
            })
            .collect()
    }
}
