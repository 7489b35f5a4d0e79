//! Serving-side owner of both models.
//!
//! `RecommendationService` is constructed once at process start (usually via
//! [`ModelBuilder::build_service`](crate::builder::ModelBuilder::build_service))
//! and handed by reference to whatever routes requests. Initialisation follows
//! a load-or-rebuild policy per model: a complete cache built for the
//! configured rank is loaded, otherwise (files missing, or a cache left by a
//! different rank) the caller-supplied closure produces the fit input (the
//! external preprocessing stage), the model is fitted and the cache rewritten.
//!
//! After initialisation every query method takes `&self`; the service is
//! `Send + Sync` and can be shared across reader threads behind an `Arc`, as
//! long as nobody refits it concurrently.

use log::info;

use crate::embedding::Neighbour;
use crate::error::{LowRankError, Result};
use crate::lsa::SemanticModel;
use crate::matrix::Matrix;
use crate::pca::{AppearanceModel, ImageMatch};
use crate::storage::ModelCache;

/// Cache conditions that mean "fit again" rather than "fail".
fn is_rebuildable(err: &LowRankError) -> bool {
    matches!(
        err,
        LowRankError::CacheUnavailable { .. } | LowRankError::CacheStale { .. }
    )
}

/// Where an initialised model came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitSource {
    Cache,
    Rebuilt,
}

#[derive(Debug)]
pub struct RecommendationService {
    semantic: SemanticModel,
    appearance: AppearanceModel,
    semantic_cache: ModelCache,
    appearance_cache: ModelCache,
}

impl RecommendationService {
    pub fn new(
        semantic: SemanticModel,
        appearance: AppearanceModel,
        semantic_cache: ModelCache,
        appearance_cache: ModelCache,
    ) -> Self {
        Self {
            semantic,
            appearance,
            semantic_cache,
            appearance_cache,
        }
    }

    pub fn semantic(&self) -> &SemanticModel {
        &self.semantic
    }

    pub fn appearance(&self) -> &AppearanceModel {
        &self.appearance
    }

    /// Loads the semantic model from cache, or fits it on the
    /// `terms × documents` matrix returned by `fit_input` and caches it.
    pub fn initialise_semantic<F>(&mut self, fit_input: F) -> Result<InitSource>
    where
        F: FnOnce() -> Result<Matrix>,
    {
        match self.semantic_cache.load_semantic(&mut self.semantic) {
            Ok(()) => return Ok(InitSource::Cache),
            Err(e) if is_rebuildable(&e) => info!("Semantic cache not usable ({}); rebuilding", e),
            Err(e) => return Err(e),
        }
        let term_doc = fit_input()?;
        self.semantic.fit(&term_doc)?;
        self.semantic_cache.save_semantic(&self.semantic)?;
        Ok(InitSource::Rebuilt)
    }

    /// Loads the appearance model from cache, or fits it on the luminance
    /// samples returned by `fit_input` and caches it.
    pub fn initialise_appearance<F>(&mut self, fit_input: F) -> Result<InitSource>
    where
        F: FnOnce() -> Result<Vec<Vec<f64>>>,
    {
        match self.appearance_cache.load_appearance(&mut self.appearance) {
            Ok(()) => return Ok(InitSource::Cache),
            Err(e) if is_rebuildable(&e) => {
                info!("Appearance cache not usable ({}); rebuilding", e)
            }
            Err(e) => return Err(e),
        }
        let samples = fit_input()?;
        self.appearance.fit(&samples)?;
        self.appearance_cache.save_appearance(&self.appearance)?;
        Ok(InitSource::Rebuilt)
    }

    /// Books whose text is closest to book `book_idx`.
    pub fn book_recommendations(&self, book_idx: usize, top_k: usize) -> Result<Vec<Neighbour>> {
        self.semantic.similar_to_index(book_idx, top_k)
    }

    /// Books closest to a term-weight query over the training vocabulary.
    pub fn text_query(&self, term_weights: &[f64], top_k: usize) -> Result<Vec<Neighbour>> {
        self.semantic.similar_to_query(term_weights, top_k)
    }

    /// Books whose cover is closest to an uploaded luminance image.
    pub fn image_query(&self, luminance: &[f64], top_k: usize) -> Result<Vec<ImageMatch>> {
        self.appearance.similar_to_sample(luminance, top_k)
    }

    /// Books whose cover is closest to stored cover `book_idx`.
    pub fn similar_covers(&self, book_idx: usize, top_k: usize) -> Result<Vec<ImageMatch>> {
        self.appearance.similar_to_index(book_idx, top_k)
    }
}
