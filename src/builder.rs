use std::path::PathBuf;

use crate::eigen::EigenParams;
use crate::lsa::SemanticModel;
use crate::pca::{AppearanceModel, ScoreDecay};
use crate::service::RecommendationService;
use crate::storage::ModelCache;

use log::{debug, info};

pub const DEFAULT_SEMANTIC_RANK: usize = 100;
pub const DEFAULT_APPEARANCE_RANK: usize = 65;
pub const DEFAULT_SEMANTIC_CACHE: &str = "./cache";
pub const DEFAULT_APPEARANCE_CACHE: &str = "./cache_pca";

/// Configuration for both embedding models and their caches.
///
/// Unfitted models and the service object are produced from one builder so
/// that fitting, loading and serving agree on rank and solver settings.
#[derive(Clone, Debug)]
pub struct ModelBuilder {
    // Target ranks k
    semantic_rank: usize,
    appearance_rank: usize,

    // QR-algorithm settings shared by both models
    eigen: EigenParams,

    // distance -> similarity heuristic for image matches
    decay: ScoreDecay,

    semantic_cache: PathBuf,
    appearance_cache: PathBuf,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        debug!("Creating ModelBuilder with default parameters");
        Self {
            semantic_rank: DEFAULT_SEMANTIC_RANK,
            appearance_rank: DEFAULT_APPEARANCE_RANK,
            eigen: EigenParams::default(),
            decay: ScoreDecay::default(),
            semantic_cache: PathBuf::from(DEFAULT_SEMANTIC_CACHE),
            appearance_cache: PathBuf::from(DEFAULT_APPEARANCE_CACHE),
        }
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        info!("Initializing new ModelBuilder");
        Self::default()
    }

    // -------------------- Ranks --------------------

    pub fn with_semantic_rank(mut self, k: usize) -> Self {
        info!("Setting semantic rank k={}", k);
        self.semantic_rank = k;
        self
    }

    pub fn with_appearance_rank(mut self, k: usize) -> Self {
        info!("Setting appearance rank k={}", k);
        self.appearance_rank = k;
        self
    }

    // -------------------- Solver --------------------

    /// Iteration cap and off-diagonal tolerance of the QR algorithm.
    /// Lowering `max_iter` is the only way to bound fit time.
    pub fn with_eigen_params(mut self, max_iter: usize, tol: f64) -> Self {
        info!("Configuring eigensolver: max_iter={}, tol={:e}", max_iter, tol);
        self.eigen = EigenParams { max_iter, tol };
        self
    }

    pub fn with_score_decay(mut self, scale: f64) -> Self {
        info!("Setting image score decay scale: {}", scale);
        self.decay = ScoreDecay { scale };
        self
    }

    // -------------------- Caches --------------------

    pub fn with_cache_dirs(
        mut self,
        semantic: impl Into<PathBuf>,
        appearance: impl Into<PathBuf>,
    ) -> Self {
        self.semantic_cache = semantic.into();
        self.appearance_cache = appearance.into();
        info!(
            "Cache directories: semantic={}, appearance={}",
            self.semantic_cache.display(),
            self.appearance_cache.display()
        );
        self
    }

    pub fn semantic_rank(&self) -> usize {
        self.semantic_rank
    }

    pub fn appearance_rank(&self) -> usize {
        self.appearance_rank
    }

    pub fn eigen_params(&self) -> EigenParams {
        self.eigen
    }

    // -------------------- Build --------------------

    pub fn build_semantic(&self) -> SemanticModel {
        SemanticModel::new(self.semantic_rank, self.eigen)
    }

    pub fn build_appearance(&self) -> AppearanceModel {
        AppearanceModel::new(self.appearance_rank, self.eigen, self.decay)
    }

    pub fn semantic_cache(&self) -> ModelCache {
        ModelCache::new(self.semantic_cache.clone())
    }

    pub fn appearance_cache(&self) -> ModelCache {
        ModelCache::new(self.appearance_cache.clone())
    }

    /// Service object holding both (still unfitted) models and their caches.
    pub fn build_service(&self) -> RecommendationService {
        debug!(
            "Building service: semantic k={}, appearance k={}, eigen={:?}",
            self.semantic_rank, self.appearance_rank, self.eigen
        );
        RecommendationService::new(
            self.build_semantic(),
            self.build_appearance(),
            self.semantic_cache(),
            self.appearance_cache(),
        )
    }
}
