use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use lowrank::eigen::EigenParams;
use lowrank::lsa::SemanticModel;
use lowrank::matrix::Matrix;
use lowrank::pca::{AppearanceModel, ScoreDecay};
use rand::prelude::*;
use std::hint::black_box;
use std::time::Duration;

const N_TERMS: usize = 300;
const N_DOCS: usize = 40;
const N_IMAGES: usize = 30;
const IMAGE_DIM: usize = 32 * 32;

fn params() -> EigenParams {
    EigenParams {
        max_iter: 200,
        tol: 1e-10,
    }
}

/// Sparse-ish non-negative term counts.
fn term_doc(seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<f64> = (0..N_TERMS * N_DOCS)
        .map(|_| {
            if rng.random_bool(0.1) {
                rng.random_range(1.0..5.0)
            } else {
                0.0
            }
        })
        .collect();
    Matrix::from_vec(N_TERMS, N_DOCS, data)
}

fn covers(seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..N_IMAGES)
        .map(|_| (0..IMAGE_DIM).map(|_| rng.random_range(0.0..255.0)).collect())
        .collect()
}

fn setup_semantic() -> SemanticModel {
    let mut model = SemanticModel::new(16, params());
    model.fit(&term_doc(42)).expect("fit semantic");
    model
}

fn setup_appearance() -> (AppearanceModel, Vec<Vec<f64>>) {
    let samples = covers(42);
    let mut model = AppearanceModel::new(16, params(), ScoreDecay::default());
    model.fit(&samples).expect("fit appearance");
    (model, samples)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_topk_k=10");
    group.warm_up_time(Duration::from_millis(300));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(40);

    let semantic = setup_semantic();
    let (appearance, samples) = setup_appearance();

    // --- by stored index ---
    group.bench_function(BenchmarkId::new("semantic_by_index", "single"), |b| {
        b.iter(|| black_box(semantic.similar_to_index(black_box(3), 10).unwrap()))
    });
    group.bench_function(BenchmarkId::new("appearance_by_index", "single"), |b| {
        b.iter(|| black_box(appearance.similar_to_index(black_box(3), 10).unwrap()))
    });

    // --- by new query ---
    for &batch in &[16usize, 64] {
        group.bench_function(
            BenchmarkId::new("semantic_fold_in", format!("batch{batch}")),
            |b| {
                b.iter_batched(
                    || {
                        let mut rng = StdRng::seed_from_u64(batch as u64);
                        (0..batch)
                            .map(|_| {
                                (0..N_TERMS)
                                    .map(|_| if rng.random_bool(0.05) { 1.0 } else { 0.0 })
                                    .collect::<Vec<f64>>()
                            })
                            .collect::<Vec<_>>()
                    },
                    |queries| {
                        let mut acc = 0.0;
                        for q in queries {
                            let hits = semantic.similar_to_query(&q, 10).unwrap();
                            acc += hits.iter().map(|h| h.score).sum::<f64>();
                        }
                        black_box(acc);
                    },
                    BatchSize::SmallInput,
                )
            },
        );

        group.bench_function(
            BenchmarkId::new("appearance_projection", format!("batch{batch}")),
            |b| {
                b.iter_batched(
                    || {
                        let mut rng = StdRng::seed_from_u64(batch as u64);
                        (0..batch)
                            .map(|_| {
                                let base = &samples[rng.random_range(0..samples.len())];
                                base.iter().map(|v| v * 1.02).collect::<Vec<f64>>()
                            })
                            .collect::<Vec<_>>()
                    },
                    |queries| {
                        let mut acc = 0.0;
                        for q in queries {
                            let hits = appearance.similar_to_sample(&q, 10).unwrap();
                            acc += hits.iter().map(|h| h.distance).sum::<f64>();
                        }
                        black_box(acc);
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
