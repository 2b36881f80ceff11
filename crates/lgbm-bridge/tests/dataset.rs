//! Dataset construction, field validation, and handle lifecycle against the
//! in-memory engine.

use std::sync::Arc;

use ndarray::{Array2, ArrayView1, s};

use lgbm_bridge::native::{ColumnSample, CsrMatrix, Dataset, Engine, MAX_NAME_LENGTH};
use lgbm_bridge::params::Parameters;
use lgbm_bridge::testing::FakeEngine;
use lgbm_bridge::testing::data::{random_features, random_query_sizes, random_sparse_features};
use lgbm_bridge::{Error, assert_approx_eq};

fn engine() -> (Arc<FakeEngine>, Engine) {
    let fake = Arc::new(FakeEngine::new());
    let engine: Engine = fake.clone();
    (fake, engine)
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn dense_layouts_report_shape() {
    let (_, engine) = engine();
    let params = Parameters::default();
    let x = random_features(20, 4, 1, -1.0, 1.0);

    let row_major = Dataset::from_mat(&engine, x.view(), &params, None).unwrap();
    assert_eq!(row_major.num_rows().unwrap(), 20);
    assert_eq!(row_major.num_features().unwrap(), 4);

    let column_major = x.t().as_standard_layout().t().to_owned();
    let col = Dataset::from_mat(&engine, column_major.view(), &params, None).unwrap();
    assert_eq!((col.num_rows().unwrap(), col.num_features().unwrap()), (20, 4));

    let strided = x.slice(s![..;2, ..]);
    let sub = Dataset::from_mat(&engine, strided, &params, None).unwrap();
    assert_eq!((sub.num_rows().unwrap(), sub.num_features().unwrap()), (10, 4));

    let single = x.mapv(|v| v as f32);
    let f32_data = Dataset::from_mat(&engine, single.view(), &params, None).unwrap();
    assert_eq!(f32_data.num_features().unwrap(), 4);
}

#[test]
fn rows_must_share_length() {
    let (fake, engine) = engine();
    let a = [1.0f64, 2.0, 3.0];
    let b = [4.0f64, 5.0];
    let rows = [ArrayView1::from(&a[..]), ArrayView1::from(&b[..])];
    let err = Dataset::from_rows(&engine, &rows, &Parameters::default(), None).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(fake.call_count("LGBM_DatasetCreateFromMats"), 0);

    let rows = [ArrayView1::from(&a[..]), ArrayView1::from(&a[..])];
    let data = Dataset::from_rows(&engine, &rows, &Parameters::default(), None).unwrap();
    assert_eq!(data.num_rows().unwrap(), 2);
}

#[test]
fn csr_input_builds_sparse_dataset() {
    let (_, engine) = engine();
    let dense = random_sparse_features(6, 5, 3, 0.3);
    let mut indptr = vec![0i64];
    let mut indices = Vec::new();
    let mut values = Vec::new();
    for row in dense.rows() {
        for (c, &v) in row.iter().enumerate() {
            if v != 0.0 {
                indices.push(c as i32);
                values.push(v);
            }
        }
        indptr.push(values.len() as i64);
    }
    let csr = CsrMatrix::new(&indptr, &indices, values.as_slice().into(), 5).unwrap();
    let data = Dataset::from_csr(&engine, csr, &Parameters::default(), None).unwrap();
    assert_eq!((data.num_rows().unwrap(), data.num_features().unwrap()), (6, 5));
}

#[test]
fn sampled_columns_then_streamed_rows() {
    let (fake, engine) = engine();
    let x = random_features(40, 3, 5, 0.5, 1.5);
    let sample = ColumnSample::from_rows(x.view(), 16, 9).unwrap();
    assert_eq!(sample.num_sample_rows(), 16);

    let params = Parameters::default();
    let mut data = Dataset::from_sampled_columns(&engine, &sample, 40, &params).unwrap();
    data.push_rows(x.slice(s![..25, ..]), 0).unwrap();
    data.push_rows(x.slice(s![25.., ..]), 25).unwrap();
    assert_eq!(fake.call_count("LGBM_DatasetPushRows"), 2);

    let err = data.push_rows(x.slice(s![..5, ..]), 38).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let wide = Array2::<f64>::zeros((2, 4));
    assert!(data.push_rows(wide.view(), 0).is_err());
    assert_eq!(fake.call_count("LGBM_DatasetPushRows"), 2);
}

#[test]
fn empty_like_copies_layout_and_records() {
    let (_, engine) = engine();
    let mut params = Parameters::default();
    params.dataset.set_max_bin(63).unwrap();
    let x = random_features(10, 3, 2, -1.0, 1.0);
    let reference = Dataset::from_mat(&engine, x.view(), &params, None).unwrap();

    let mut valid = Dataset::empty_like(&reference, 4).unwrap();
    assert_eq!((valid.num_rows().unwrap(), valid.num_features().unwrap()), (4, 3));
    assert_eq!(valid.dataset_params(), &params.dataset);
    assert_eq!(valid.param_string(), "max_bin=63");
    valid.push_rows(x.slice(s![..4, ..]), 0).unwrap();
}

#[test]
fn reference_from_another_engine_is_rejected() {
    let (_, a) = engine();
    let (fake_b, b) = engine();
    let x = random_features(5, 2, 0, 0.0, 1.0);
    let reference = Dataset::from_mat(&a, x.view(), &Parameters::default(), None).unwrap();
    let err = Dataset::from_mat(&b, x.view(), &Parameters::default(), Some(&reference)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(fake_b.live_datasets(), 0);
}

// =============================================================================
// Fields
// =============================================================================

#[test]
fn label_length_is_checked_and_dataset_stays_usable() {
    let (_, engine) = engine();
    let x = random_features(8, 2, 4, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();

    let err = data.set_label(&[1.0; 7]).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(data.label().unwrap().is_empty());

    let label: Vec<f32> = (0..8).map(|i| i as f32).collect();
    data.set_label(&label).unwrap();
    assert_eq!(data.label().unwrap(), label);
}

#[test]
fn weights_and_init_scores_round_trip() {
    let (_, engine) = engine();
    let x = random_features(4, 2, 4, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();

    assert_eq!(data.weights().unwrap(), None);
    data.set_weights(Some(&[0.5, 1.0, 1.5, 2.0][..])).unwrap();
    assert_eq!(data.weights().unwrap(), Some(vec![0.5, 1.0, 1.5, 2.0]));
    data.set_weights(None).unwrap();
    assert_eq!(data.weights().unwrap(), None);

    // Three classes: one score per row and class.
    let scores: Vec<f64> = (0..12).map(|i| f64::from(i) * 0.1).collect();
    data.set_init_score(Some(scores.as_slice())).unwrap();
    let stored = data.init_score().unwrap().unwrap();
    assert_eq!(stored.len(), 12);
    assert_approx_eq!(stored[11], 1.1, 1e-12);

    assert!(matches!(
        data.set_init_score(Some(&[0.0; 5][..])),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn group_sizes_are_validated_and_restored() {
    let (_, engine) = engine();
    let x = random_features(23, 2, 8, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();

    let sizes = random_query_sizes(23, 6, 1);
    data.set_groups(Some(sizes.as_slice())).unwrap();
    assert_eq!(data.groups().unwrap(), Some(sizes));

    assert!(data.set_groups(Some(&[10, 10][..])).is_err());
    assert!(data.set_groups(Some(&[23, 0][..])).is_err());
    data.set_groups(None).unwrap();
    assert_eq!(data.groups().unwrap(), None);
}

// =============================================================================
// Feature names
// =============================================================================

#[test]
fn feature_names_round_trip() {
    let (fake, engine) = engine();
    let x = random_features(3, 3, 0, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
    assert_eq!(data.feature_names().unwrap(), ["Column_0", "Column_1", "Column_2"]);

    data.set_feature_names(&["age", "height", "weight"]).unwrap();
    fake.clear_calls();
    assert_eq!(data.feature_names().unwrap(), ["age", "height", "weight"]);
    assert_eq!(fake.call_count("LGBM_DatasetGetFeatureNames"), 1);

    assert!(data.set_feature_names(&["a", "b c", "d"]).is_err());
    assert!(data.set_feature_names(&["a", "b"]).is_err());
}

#[test]
fn long_feature_names_need_one_retry() {
    let (fake, engine) = engine();
    let x = random_features(3, 2, 0, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
    let long = "f".repeat(300);
    data.set_feature_names(&[long.as_str(), "short"]).unwrap();

    fake.clear_calls();
    let names = data.feature_names().unwrap();
    assert_eq!(names[0], long);
    assert_eq!(fake.call_count("LGBM_DatasetGetFeatureNames"), 2);
}

#[test]
fn oversized_feature_names_are_a_protocol_error() {
    let (_, engine) = engine();
    let x = random_features(3, 1, 0, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
    let huge = "x".repeat(MAX_NAME_LENGTH + 10);
    data.set_feature_names(&[huge]).unwrap();
    assert!(matches!(data.feature_names(), Err(Error::Protocol { .. })));
}

// =============================================================================
// Binary cache
// =============================================================================

#[test]
fn binary_cache_round_trip() {
    let (_, engine) = engine();
    let dir = tempfile::tempdir().unwrap();
    let x = random_features(6, 2, 3, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
    data.set_label(&[0.0, 1.0, 0.0, 1.0, 1.0, 0.0]).unwrap();

    let path = dir.path().join("train.bin");
    data.save_binary(&path).unwrap();
    let loaded = Dataset::from_binary_file(&engine, &path, &Parameters::default(), None).unwrap();
    assert_eq!(loaded.num_rows().unwrap(), 6);
    assert_eq!(loaded.label().unwrap(), data.label().unwrap());

    let err = data.save_binary(dir.path().join("train.txt")).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn close_is_idempotent_and_later_calls_fail() {
    let (fake, engine) = engine();
    let x = random_features(4, 2, 0, 0.0, 1.0);
    let mut data = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
    assert!(data.is_open());

    data.close().unwrap();
    data.close().unwrap();
    assert!(!data.is_open());
    assert_eq!(fake.call_count("LGBM_DatasetFree"), 1);
    assert!(matches!(data.num_rows(), Err(Error::InvalidArgument(_))));
    assert!(data.set_label(&[0.0; 4]).is_err());

    drop(data);
    assert_eq!(fake.call_count("LGBM_DatasetFree"), 1);
}

#[test]
fn drop_frees_exactly_once() {
    let (fake, engine) = engine();
    let x = random_features(4, 2, 0, 0.0, 1.0);
    {
        let _a = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
        let _b = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap();
        assert_eq!(fake.live_datasets(), 2);
    }
    assert_eq!(fake.live_datasets(), 0);
    assert_eq!(fake.call_count("LGBM_DatasetFree"), 2);
}

#[test]
fn failed_creation_frees_nothing() {
    let fake = Arc::new(FakeEngine::new().failing_on("LGBM_DatasetCreateFromMat"));
    let engine: Engine = fake.clone();
    let x = random_features(4, 2, 0, 0.0, 1.0);
    let err = Dataset::from_mat(&engine, x.view(), &Parameters::default(), None).unwrap_err();
    match err {
        Error::Native { operation, message } => {
            assert_eq!(operation, "LGBM_DatasetCreateFromMat");
            assert!(message.contains("injected failure"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.call_count("LGBM_DatasetFree"), 0);
}
