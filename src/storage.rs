//! On-disk cache for fitted models.
//!
//! Each array is written as its own JSON document inside the model's cache
//! directory, next to a `params.json` manifest recording the rank `k` the
//! model was configured with:
//!
//! | model      | files |
//! |------------|-------|
//! | semantic   | `document_embeddings.json`, `u_k.json`, `sigma_k.json`, `params.json` |
//! | appearance | `mean.json`, `basis.json`, `coefficients.json`, `params.json` |
//!
//! Saving removes the manifest first, stages every array under a `.tmp` name
//! and renames it into place, and writes the manifest last. A save that fails
//! partway therefore leaves a directory without a manifest, which reads as an
//! absent cache rather than a mix of old and new arrays.
//!
//! Loading reports `CacheUnavailable` for a missing file and `CacheStale` when
//! the manifest rank differs from the model's configured rank; both are the
//! caller's signal to rebuild. Loaded arrays are checked for internal
//! consistency before being installed into a model.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingSpace;
use crate::error::{LowRankError, Result};
use crate::lsa::{SemanticArrays, SemanticModel};
use crate::matrix::Matrix;
use crate::pca::{AppearanceArrays, AppearanceModel};

pub const MANIFEST_FILE: &str = "params.json";
pub const SEMANTIC_FILES: [&str; 4] = [
    "document_embeddings.json",
    "u_k.json",
    "sigma_k.json",
    MANIFEST_FILE,
];
pub const APPEARANCE_FILES: [&str; 4] = [
    "mean.json",
    "basis.json",
    "coefficients.json",
    MANIFEST_FILE,
];

/// Settings a cache was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Configured target rank `k`, not the achieved rank.
    pub rank: usize,
}

#[derive(Clone, Debug)]
pub struct ModelCache {
    dir: PathBuf,
}

impl ModelCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn all_present(&self, files: &[&str]) -> bool {
        files.iter().all(|f| self.dir.join(f).is_file())
    }

    pub fn semantic_exists(&self) -> bool {
        self.all_present(&SEMANTIC_FILES)
    }

    pub fn appearance_exists(&self) -> bool {
        self.all_present(&APPEARANCE_FILES)
    }

    /// Stages `value` under `<name>.tmp` and renames it over `name`.
    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let staging = self.dir.join(format!("{}.tmp", name));
        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer(&mut writer, value)?;
            writer.flush()?;
        }
        fs::rename(&staging, &path)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(LowRankError::CacheUnavailable { path });
        }
        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn read_matrix(&self, name: &str) -> Result<Matrix> {
        let m: Matrix = self.read(name)?;
        m.validate_layout()?;
        Ok(m)
    }

    fn invalidate(&self) -> Result<()> {
        match fs::remove_file(self.dir.join(MANIFEST_FILE)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the manifest and checks it against the configured rank.
    fn check_manifest(&self, configured: usize) -> Result<CacheManifest> {
        let manifest: CacheManifest = self.read(MANIFEST_FILE)?;
        if manifest.rank != configured {
            return Err(LowRankError::CacheStale {
                dir: self.dir.clone(),
                cached: manifest.rank,
                configured,
            });
        }
        Ok(manifest)
    }

    fn check_achieved_rank(achieved: usize, manifest: CacheManifest) -> Result<()> {
        if achieved > manifest.rank {
            return Err(LowRankError::InvalidInput(format!(
                "cached arrays have rank {} but the manifest allows at most {}",
                achieved, manifest.rank
            )));
        }
        Ok(())
    }

    pub fn save_semantic(&self, model: &SemanticModel) -> Result<()> {
        let arrays = model
            .arrays()
            .ok_or(LowRankError::ModelNotReady { model: "semantic" })?;
        fs::create_dir_all(&self.dir)?;
        self.invalidate()?;
        self.write(SEMANTIC_FILES[0], arrays.embeddings.as_matrix())?;
        self.write(SEMANTIC_FILES[1], &arrays.u_k)?;
        self.write(SEMANTIC_FILES[2], &arrays.sigma_k)?;
        self.write(MANIFEST_FILE, &CacheManifest { rank: model.rank() })?;
        info!("Semantic model cached in {}", self.dir.display());
        Ok(())
    }

    /// Loads persisted semantic arrays into `model`.
    pub fn load_semantic(&self, model: &mut SemanticModel) -> Result<()> {
        let manifest = self.check_manifest(model.rank())?;
        let embeddings = self.read_matrix(SEMANTIC_FILES[0])?;
        let u_k = self.read_matrix(SEMANTIC_FILES[1])?;
        let sigma_k = self.read_matrix(SEMANTIC_FILES[2])?;
        Self::check_achieved_rank(sigma_k.nrows(), manifest)?;
        model.restore(SemanticArrays {
            embeddings: EmbeddingSpace::from_normalised(embeddings),
            u_k,
            sigma_k,
        })?;
        info!("Semantic model loaded from {}", self.dir.display());
        Ok(())
    }

    pub fn save_appearance(&self, model: &AppearanceModel) -> Result<()> {
        let arrays = model
            .arrays()
            .ok_or(LowRankError::ModelNotReady { model: "appearance" })?;
        fs::create_dir_all(&self.dir)?;
        self.invalidate()?;
        self.write(APPEARANCE_FILES[0], &arrays.mean)?;
        self.write(APPEARANCE_FILES[1], &arrays.basis)?;
        self.write(APPEARANCE_FILES[2], &arrays.coefficients)?;
        self.write(MANIFEST_FILE, &CacheManifest { rank: model.rank() })?;
        info!("Appearance model cached in {}", self.dir.display());
        Ok(())
    }

    pub fn load_appearance(&self, model: &mut AppearanceModel) -> Result<()> {
        let manifest = self.check_manifest(model.rank())?;
        let mean: Vec<f64> = self.read(APPEARANCE_FILES[0])?;
        let basis = self.read_matrix(APPEARANCE_FILES[1])?;
        let coefficients = self.read_matrix(APPEARANCE_FILES[2])?;
        Self::check_achieved_rank(basis.ncols(), manifest)?;
        model.restore(AppearanceArrays {
            mean,
            basis,
            coefficients,
        })?;
        info!("Appearance model loaded from {}", self.dir.display());
        Ok(())
    }
}
