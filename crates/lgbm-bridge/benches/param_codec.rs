//! Parameter Codec Benchmarks
//!
//! Measures the flat-string codec and the prediction buffer path:
//! 1. Encoding a fully populated configuration
//! 2. Decoding it back through the record pipeline
//! 3. Dense prediction through the growable buffer against the fake engine
//!
//! Run with: `cargo bench --bench param_codec`

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use lgbm_bridge::native::{Booster, Dataset, Engine, PredictKind};
use lgbm_bridge::params::{BoostingType, MetricType, ObjectiveType, Parameters};
use lgbm_bridge::testing::FakeEngine;
use lgbm_bridge::testing::data::{random_features, synthetic_binary_labels};

fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .warm_up_time(Duration::from_secs(1))
        .measurement_time(Duration::from_secs(5))
        .sample_size(50)
}

fn populated() -> Parameters {
    let mut p = Parameters::default();
    p.common.set_num_threads(8).unwrap();
    p.common.set_seed(7).unwrap();
    p.dataset.set_max_bin(127).unwrap();
    p.dataset.set_categorical_feature(vec![0, 3, 5]).unwrap();
    p.objective.set_objective(ObjectiveType::Binary).unwrap();
    p.objective.set_metric(MetricType::Auc).unwrap();
    p.learning.set_boosting(BoostingType::Dart).unwrap();
    p.learning.set_num_leaves(63).unwrap();
    p.learning.set_learning_rate(0.05).unwrap();
    p.learning.set_bagging_fraction(0.8).unwrap();
    p.learning.set_bagging_freq(1).unwrap();
    p.learning.set_monotone_constraints(vec![1, 0, -1, 0, 1, 0]).unwrap();
    p
}

// =============================================================================
// Codec
// =============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("component/params");
    let params = populated();
    let wire = params.to_param_string();

    group.bench_function("encode", |b| b.iter(|| black_box(black_box(&params).to_param_string())));
    group.bench_function("decode", |b| {
        b.iter(|| black_box(Parameters::from_param_string(black_box(&wire)).unwrap()))
    });
    group.bench_function("encode_defaults", |b| {
        let defaults = Parameters::default();
        b.iter(|| black_box(black_box(&defaults).to_param_string()))
    });
    group.finish();
}

// =============================================================================
// Prediction buffer
// =============================================================================

fn bench_predict_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("component/predict_into");
    let engine: Engine = Arc::new(FakeEngine::new());
    let mut params = Parameters::default();
    params.objective.set_objective(ObjectiveType::Binary).unwrap();

    for n_rows in [100usize, 1_000, 10_000] {
        let x = random_features(n_rows, 8, 42, -1.0, 1.0);
        let mut data = Dataset::from_mat(&engine, x.view(), &params, None).unwrap();
        data.set_label(&synthetic_binary_labels(&x, 43, 0.1)).unwrap();
        let mut booster = Booster::new(&params, &data, None).unwrap();
        booster.update().unwrap();

        group.throughput(Throughput::Elements(n_rows as u64));
        let mut out = Vec::new();
        group.bench_with_input(BenchmarkId::new("reused", n_rows), &x, |b, x| {
            b.iter(|| {
                booster
                    .predict_into(black_box(x.view()), PredictKind::Normal, None, &mut out)
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("fresh", n_rows), &x, |b, x| {
            b.iter(|| black_box(booster.predict(black_box(x.view()), PredictKind::Normal, None).unwrap()))
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = default_criterion();
    targets = bench_codec, bench_predict_buffer
}
criterion_main!(benches);
