use std::fs;

use tempfile::tempdir;

use crate::eigen::EigenParams;
use crate::error::LowRankError;
use crate::lsa::SemanticModel;
use crate::matrix::Matrix;
use crate::pca::{AppearanceModel, ScoreDecay};
use crate::storage::{CacheManifest, ModelCache, APPEARANCE_FILES, MANIFEST_FILE, SEMANTIC_FILES};
use crate::tests::{init, toy_term_doc};

fn fitted_semantic() -> SemanticModel {
    let mut model = SemanticModel::new(2, EigenParams::default());
    model.fit(&toy_term_doc()).unwrap();
    model
}

fn fitted_appearance() -> AppearanceModel {
    let samples = vec![
        vec![10.0, 20.0, 30.0, 40.0],
        vec![12.0, 18.0, 33.0, 41.0],
        vec![90.0, 5.0, 60.0, 2.0],
        vec![85.0, 9.0, 58.0, 7.0],
    ];
    let mut model = AppearanceModel::new(2, EigenParams::default(), ScoreDecay::default());
    model.fit(&samples).unwrap();
    model
}

#[test]
fn test_semantic_round_trip() {
    init();
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path().join("semantic"));
    assert!(!cache.semantic_exists());

    let model = fitted_semantic();
    cache.save_semantic(&model).unwrap();
    assert!(cache.semantic_exists());
    for f in SEMANTIC_FILES {
        assert!(cache.dir().join(f).is_file(), "{} missing", f);
    }

    let mut loaded = SemanticModel::new(2, EigenParams::default());
    cache.load_semantic(&mut loaded).unwrap();
    assert!(loaded.is_ready());

    let a = model.arrays().unwrap();
    let b = loaded.arrays().unwrap();
    assert!(a.embeddings.as_matrix().sub(b.embeddings.as_matrix()).frobenius_norm() < 1e-12);
    assert!(a.u_k.sub(&b.u_k).frobenius_norm() < 1e-12);
    assert!(a.sigma_k.sub(&b.sigma_k).frobenius_norm() < 1e-12);

    let before: Vec<usize> = model.similar_to_index(0, 2).unwrap().iter().map(|h| h.index).collect();
    let after: Vec<usize> = loaded.similar_to_index(0, 2).unwrap().iter().map(|h| h.index).collect();
    assert_eq!(before, after);
}

#[test]
fn test_appearance_round_trip() {
    init();
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path());
    let model = fitted_appearance();
    cache.save_appearance(&model).unwrap();
    assert!(cache.appearance_exists());
    for f in APPEARANCE_FILES {
        assert!(cache.dir().join(f).is_file(), "{} missing", f);
    }

    let mut loaded = AppearanceModel::new(2, EigenParams::default(), ScoreDecay::default());
    cache.load_appearance(&mut loaded).unwrap();

    let query = vec![11.0, 19.0, 31.0, 40.0];
    let before = model.similar_to_sample(&query, 4).unwrap();
    let after = loaded.similar_to_sample(&query, 4).unwrap();
    assert_eq!(
        before.iter().map(|h| h.index).collect::<Vec<_>>(),
        after.iter().map(|h| h.index).collect::<Vec<_>>()
    );
    for (x, y) in before.iter().zip(after.iter()) {
        assert!((x.distance - y.distance).abs() < 1e-9);
    }
}

#[test]
fn test_missing_file_is_cache_unavailable() {
    init();
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path());
    cache.save_semantic(&fitted_semantic()).unwrap();
    fs::remove_file(dir.path().join(SEMANTIC_FILES[1])).unwrap();

    assert!(!cache.semantic_exists());
    let mut model = SemanticModel::new(2, EigenParams::default());
    match cache.load_semantic(&mut model) {
        Err(LowRankError::CacheUnavailable { path }) => {
            assert!(path.ends_with(SEMANTIC_FILES[1]))
        }
        other => panic!("expected CacheUnavailable, got {:?}", other),
    }
    assert!(!model.is_ready());

    let empty = ModelCache::new(dir.path().join("nowhere"));
    let mut appearance = AppearanceModel::new(2, EigenParams::default(), ScoreDecay::default());
    assert!(matches!(
        empty.load_appearance(&mut appearance),
        Err(LowRankError::CacheUnavailable { .. })
    ));
}

#[test]
fn test_saving_unfitted_model_is_not_ready() {
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path());
    assert!(matches!(
        cache.save_semantic(&SemanticModel::new(2, EigenParams::default())),
        Err(LowRankError::ModelNotReady { model: "semantic" })
    ));
    assert!(matches!(
        cache.save_appearance(&AppearanceModel::new(
            2,
            EigenParams::default(),
            ScoreDecay::default()
        )),
        Err(LowRankError::ModelNotReady { model: "appearance" })
    ));
}

#[test]
fn test_rank_change_marks_cache_stale() {
    init();
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path());
    cache.save_semantic(&fitted_semantic()).unwrap();
    let manifest: CacheManifest =
        serde_json::from_str(&fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap())
            .unwrap();
    assert_eq!(manifest, CacheManifest { rank: 2 });

    for configured in [1, 3] {
        let mut model = SemanticModel::new(configured, EigenParams::default());
        match cache.load_semantic(&mut model) {
            Err(LowRankError::CacheStale {
                cached, configured: c, ..
            }) => {
                assert_eq!(cached, 2);
                assert_eq!(c, configured);
            }
            other => panic!("expected CacheStale for k={}, got {:?}", configured, other),
        }
        assert!(!model.is_ready());
    }

    let appearance_dir = dir.path().join("pca");
    let appearance_cache = ModelCache::new(&appearance_dir);
    appearance_cache.save_appearance(&fitted_appearance()).unwrap();
    let mut wider = AppearanceModel::new(5, EigenParams::default(), ScoreDecay::default());
    assert!(matches!(
        appearance_cache.load_appearance(&mut wider),
        Err(LowRankError::CacheStale { cached: 2, configured: 5, .. })
    ));
}

#[test]
fn test_failed_resave_leaves_no_loadable_cache() {
    init();
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path());
    cache.save_semantic(&fitted_semantic()).unwrap();
    assert!(cache.semantic_exists());

    // block the staging file of the second array so the re-save fails midway
    fs::create_dir(dir.path().join(format!("{}.tmp", SEMANTIC_FILES[1]))).unwrap();
    let mut refit = SemanticModel::new(2, EigenParams::default());
    refit
        .fit(&Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 2.0], vec![1.0, 1.0]]).unwrap())
        .unwrap();
    assert!(matches!(
        cache.save_semantic(&refit),
        Err(LowRankError::Io(_))
    ));

    assert!(!cache.semantic_exists());
    let mut model = SemanticModel::new(2, EigenParams::default());
    match cache.load_semantic(&mut model) {
        Err(LowRankError::CacheUnavailable { path }) => assert!(path.ends_with(MANIFEST_FILE)),
        other => panic!("expected CacheUnavailable, got {:?}", other),
    }
}

#[test]
fn test_save_leaves_no_staging_files() {
    let dir = tempdir().unwrap();
    let semantic = ModelCache::new(dir.path().join("cache"));
    let appearance = ModelCache::new(dir.path().join("cache_pca"));
    semantic.save_semantic(&fitted_semantic()).unwrap();
    appearance.save_appearance(&fitted_appearance()).unwrap();
    for cache in [&semantic, &appearance] {
        let leftovers: Vec<_> = fs::read_dir(cache.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staging files left: {:?}", leftovers);
    }
}

#[test]
fn test_corrupt_payload_is_serde_error() {
    let dir = tempdir().unwrap();
    let cache = ModelCache::new(dir.path());
    for f in SEMANTIC_FILES {
        fs::write(dir.path().join(f), b"not json").unwrap();
    }
    let mut model = SemanticModel::new(2, EigenParams::default());
    assert!(matches!(
        cache.load_semantic(&mut model),
        Err(LowRankError::Serde(_))
    ));
}
