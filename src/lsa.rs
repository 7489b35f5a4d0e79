//! # SemanticModel: latent semantic analysis over a term-document matrix
//!
//! Fitting takes a `terms × documents` weight matrix (already TF-IDF weighted
//! upstream), runs a rank-`k` truncated SVD and stores:
//!
//! - document embeddings `V_k · Σ_k` (one row per document), normalised into an
//!   [`EmbeddingSpace`]
//! - `U_k` and `Σ_k`, needed to fold unseen queries into the same coordinates
//!
//! Query folding maps a term-weight vector `q` over the training vocabulary to
//! `Σ_k⁻¹ · U_kᵀ · q`, inverting only diagonal entries above [`RANK_EPSILON`].
//! The folded vector is expressed in the unscaled `V_k` basis, while stored
//! documents carry the `Σ_k` scaling; the two agree in direction exactly for
//! documents aligned with a single singular direction and approximately when
//! the retained spectrum is flat.
//!
//! A model that has not been fitted or loaded rejects every query with
//! `ModelNotReady`.

use log::{debug, info};
use smartcore::linalg::basic::matrix::DenseMatrix;
use sprs::CsMat;

use crate::eigen::EigenParams;
use crate::embedding::{EmbeddingSpace, Neighbour};
use crate::error::{LowRankError, Result};
use crate::matrix::Matrix;
use crate::svd::{SvdEngine, RANK_EPSILON};

const MODEL_NAME: &str = "semantic";

/// Arrays produced by a fit; exactly what gets persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct SemanticArrays {
    /// `documents × rank`, rows unit length
    pub embeddings: EmbeddingSpace,
    /// `terms × rank`
    pub u_k: Matrix,
    /// `rank × rank` diagonal
    pub sigma_k: Matrix,
}

impl SemanticArrays {
    /// Checks that the three arrays describe the same rank.
    pub fn validate(&self) -> Result<()> {
        let rank = self.sigma_k.nrows();
        if self.sigma_k.ncols() != rank
            || self.u_k.ncols() != rank
            || self.embeddings.dim() != rank
        {
            return Err(LowRankError::InvalidInput(format!(
                "inconsistent semantic arrays: U_k {:?}, Sigma_k {:?}, embeddings dim {}",
                self.u_k.shape(),
                self.sigma_k.shape(),
                self.embeddings.dim()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct SemanticModel {
    rank: usize,
    engine: SvdEngine,
    arrays: Option<SemanticArrays>,
}

impl SemanticModel {
    pub fn new(rank: usize, params: EigenParams) -> Self {
        Self {
            rank,
            engine: SvdEngine::new(params),
            arrays: None,
        }
    }

    /// Configured target rank `k`.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn is_ready(&self) -> bool {
        self.arrays.is_some()
    }

    pub fn arrays(&self) -> Option<&SemanticArrays> {
        self.arrays.as_ref()
    }

    /// Installs previously persisted arrays.
    pub fn restore(&mut self, arrays: SemanticArrays) -> Result<()> {
        arrays.validate()?;
        debug!(
            "Semantic model restored: {} documents, rank {}",
            arrays.embeddings.len(),
            arrays.sigma_k.nrows()
        );
        self.arrays = Some(arrays);
        Ok(())
    }

    fn ready(&self) -> Result<&SemanticArrays> {
        self.arrays
            .as_ref()
            .ok_or(LowRankError::ModelNotReady { model: MODEL_NAME })
    }

    /// Fits on a dense `terms × documents` weight matrix.
    pub fn fit(&mut self, term_doc: &Matrix) -> Result<()> {
        let (terms, docs) = term_doc.shape();
        if terms == 0 || docs == 0 {
            return Err(LowRankError::InvalidInput(
                "term-document matrix is empty".to_string(),
            ));
        }
        if self.rank == 0 {
            return Err(LowRankError::InvalidInput("rank k must be > 0".to_string()));
        }
        if !term_doc.is_finite() {
            return Err(LowRankError::InvalidInput(
                "term-document matrix contains non-finite values".to_string(),
            ));
        }

        info!(
            "Fitting semantic model: {} terms x {} documents, k={}",
            terms, docs, self.rank
        );
        let svd = self.engine.truncated(term_doc, self.rank);

        // V_k · Σ_k: one scaled row per document
        let doc_embeddings = svd.vt.transpose().matmul(&svd.sigma);
        let embeddings = EmbeddingSpace::from_embeddings(&doc_embeddings);

        info!(
            "Semantic model fitted: {} documents embedded at rank {}",
            embeddings.len(),
            svd.rank
        );
        self.arrays = Some(SemanticArrays {
            embeddings,
            u_k: svd.u,
            sigma_k: svd.sigma,
        });
        Ok(())
    }

    /// Densifies a sparse term-document matrix and fits on it.
    pub fn fit_sparse(&mut self, term_doc: &CsMat<f64>) -> Result<()> {
        debug!(
            "Densifying sparse term-document matrix {:?} ({} non-zeros)",
            term_doc.shape(),
            term_doc.nnz()
        );
        self.fit(&Matrix::from_sparse(term_doc))
    }

    /// Number of fitted documents.
    pub fn n_documents(&self) -> Result<usize> {
        Ok(self.ready()?.embeddings.len())
    }

    /// Normalised document embeddings as a smartcore matrix, one row per document.
    pub fn embeddings_dense(&self) -> Result<DenseMatrix<f64>> {
        Ok(self.ready()?.embeddings.as_matrix().to_dense_matrix())
    }

    /// Documents most similar to fitted document `doc_idx`, excluding itself.
    pub fn similar_to_index(&self, doc_idx: usize, top_k: usize) -> Result<Vec<Neighbour>> {
        self.ready()?.embeddings.top_k_by_index(doc_idx, top_k)
    }

    /// Folds a term-weight vector into the fitted coordinates: `Σ_k⁻¹ · U_kᵀ · q`.
    pub fn fold_query(&self, query: &[f64]) -> Result<Vec<f64>> {
        let arrays = self.ready()?;
        let terms = arrays.u_k.nrows();
        if query.len() != terms {
            return Err(LowRankError::DimensionMismatch {
                expected: terms,
                actual: query.len(),
            });
        }
        let projected = arrays.u_k.transpose_matvec(query);
        let inverse: Vec<f64> = arrays
            .sigma_k
            .diagonal()
            .iter()
            .map(|&s| if s > RANK_EPSILON { 1.0 / s } else { 0.0 })
            .collect();
        Ok(projected
            .iter()
            .zip(inverse.iter())
            .map(|(p, inv)| p * inv)
            .collect())
    }

    /// Folds `query` and ranks fitted documents by cosine similarity to it.
    pub fn similar_to_query(&self, query: &[f64], top_k: usize) -> Result<Vec<Neighbour>> {
        let folded = self.fold_query(query)?;
        self.ready()?.embeddings.top_k_by_vector(&folded, top_k)
    }
}
