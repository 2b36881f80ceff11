//! End-to-end training loop behavior against the in-memory engine.

use std::sync::Arc;

use ndarray::s;

use lgbm_bridge::native::{Booster, Dataset, Engine, PredictKind};
use lgbm_bridge::params::{MetricType, ObjectiveType, Parameters};
use lgbm_bridge::testing::FakeEngine;
use lgbm_bridge::testing::data::{random_features, synthetic_regression_targets};
use lgbm_bridge::training::{
    CustomObjective, TrainOptions, TrainState, TrainingRun, Verbosity, train,
};
use lgbm_bridge::{Error, Result, assert_approx_eq};

const ROWS: usize = 40;

struct Setup {
    fake: Arc<FakeEngine>,
    train: Dataset,
    valid: Dataset,
}

fn setup(fake: FakeEngine, params: &Parameters) -> Setup {
    let fake = Arc::new(fake);
    let engine: Engine = fake.clone();
    let x = random_features(ROWS, 3, 21, -1.0, 1.0);
    let y = synthetic_regression_targets(&x, 22, 0.05);

    let mut train = Dataset::from_mat(&engine, x.slice(s![..30, ..]), params, None).unwrap();
    train.set_label(&y[..30]).unwrap();
    let mut valid = Dataset::from_mat(&engine, x.slice(s![30.., ..]), params, Some(&train)).unwrap();
    valid.set_label(&y[30..]).unwrap();
    Setup { fake, train, valid }
}

fn params(num_iterations: i32, early_stopping_round: i32) -> Parameters {
    let mut p = Parameters::default();
    p.learning.set_num_iterations(num_iterations).unwrap();
    p.learning.set_early_stopping_round(early_stopping_round).unwrap();
    p
}

// =============================================================================
// Early stopping
// =============================================================================

#[test]
fn early_stopping_halts_after_patience() {
    let params = params(100, 5);
    let scores = vec![1.0, 1.0, 1.0, 0.5, 0.6];
    let env = setup(FakeEngine::new().with_valid_scores(scores), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();

    let summary = train(&mut booster, TrainOptions::default()).unwrap();
    assert_eq!(summary.state, TrainState::EarlyStopped);
    assert_eq!(summary.iterations, 9);
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIter"), 9);
    assert_eq!(summary.best_iteration, Some(4));
    assert_eq!(summary.best_score, Some(0.5));
    assert_eq!(booster.best_iteration(), Some(4));
    assert_eq!(summary.evaluations.len(), 9);
    assert_eq!(summary.evaluations[3].metric, "l2");
    assert_eq!(summary.evaluations[3].valid, Some(0.5));
}

#[test]
fn best_iteration_drives_default_predictions() {
    let params = params(100, 2);
    let env = setup(FakeEngine::new().with_valid_scores(vec![0.9, 0.4, 0.8]), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();
    train(&mut booster, TrainOptions::default()).unwrap();
    assert_eq!(booster.best_iteration(), Some(2));
    assert_eq!(booster.current_iteration().unwrap(), 4);

    let x = random_features(3, 3, 0, 0.0, 1.0);
    let best = booster.predict(x.view(), PredictKind::LeafIndex, None).unwrap();
    assert_eq!(best.ncols(), 2);
    let all = booster.predict(x.view(), PredictKind::LeafIndex, Some(-1)).unwrap();
    assert_eq!(all.ncols(), 4);
}

#[test]
fn higher_is_better_metrics_stop_on_decline() {
    let mut params = params(50, 3);
    params.objective.set_objective(ObjectiveType::Binary).unwrap();
    params.objective.set_metric(MetricType::Auc).unwrap();
    let scores = vec![0.6, 0.7, 0.65, 0.65, 0.65];
    let env = setup(FakeEngine::new().with_valid_scores(scores), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();

    let summary = train(&mut booster, TrainOptions::default()).unwrap();
    assert_eq!(summary.state, TrainState::EarlyStopped);
    assert_eq!(summary.iterations, 5);
    assert_eq!(summary.best_iteration, Some(2));
    assert_eq!(summary.best_score, Some(0.7));
}

#[test]
fn early_stopping_without_validation_is_disabled_with_warning() {
    let params = params(12, 3);
    let env = setup(FakeEngine::new().with_valid_scores(vec![1.0]), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();

    let run = TrainingRun::new(&booster, &params.learning, TrainOptions::default()).unwrap();
    assert!(!run.early_stopping_enabled());
    assert_eq!(run.warnings().len(), 1);
    assert!(run.warnings()[0].contains("validation"));

    let summary = run.run(&mut booster).unwrap();
    assert_eq!(summary.state, TrainState::Completed);
    assert_eq!(summary.iterations, 12);
    assert_eq!(summary.best_iteration, None);
    assert_eq!(booster.best_iteration(), None);
    assert_eq!(summary.warnings.len(), 1);
}

#[test]
fn early_stopping_needs_a_metric() {
    let mut params = params(10, 3);
    params.objective.set_metric(MetricType::None).unwrap();
    let env = setup(FakeEngine::new(), &params);
    let booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();
    let err = TrainingRun::new(&booster, &params.learning, TrainOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Consistency(_)));
}

// =============================================================================
// Termination
// =============================================================================

#[test]
fn budget_completes_without_early_stopping() {
    let params = params(7, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();

    let options = TrainOptions::builder().eval_period(3).build().unwrap();
    let summary = train(&mut booster, options).unwrap();
    assert_eq!(summary.state, TrainState::Completed);
    assert_eq!(summary.iterations, 7);
    assert_eq!(booster.best_iteration(), None);
    let rounds: Vec<usize> = summary.evaluations.iter().map(|e| e.iteration).collect();
    assert_eq!(rounds, vec![2, 5]);
}

#[test]
fn engine_exhaustion_ends_the_loop() {
    let params = params(50, 10);
    let env = setup(FakeEngine::new().converging_after(6), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();

    let summary = train(&mut booster, TrainOptions::default()).unwrap();
    assert_eq!(summary.state, TrainState::Exhausted);
    assert_eq!(summary.iterations, 6);
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIter"), 7);
    // Default scores keep falling, so the last tree is the best.
    assert_eq!(summary.best_iteration, Some(6));
}

#[test]
fn zero_iterations_complete_immediately() {
    let params = params(0, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();
    let summary = train(&mut booster, TrainOptions::default()).unwrap();
    assert_eq!(summary.state, TrainState::Completed);
    assert_eq!(summary.iterations, 0);
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIter"), 0);
}

#[test]
fn stepping_stops_at_a_terminal_state() {
    let params = params(2, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();
    let options = TrainOptions::builder().verbosity(Verbosity::Silent).build().unwrap();
    let mut run = TrainingRun::new(&booster, &params.learning, options).unwrap();

    assert_eq!(run.step(&mut booster).unwrap(), TrainState::Running);
    assert_eq!(run.step(&mut booster).unwrap(), TrainState::Completed);
    assert_eq!(run.step(&mut booster).unwrap(), TrainState::Completed);
    assert_eq!(run.iteration(), 2);
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIter"), 2);
}

#[test]
fn zero_eval_period_is_an_error() {
    let params = params(10, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();

    let options = TrainOptions {
        eval_period: 0,
        ..TrainOptions::default()
    };
    let err = train(&mut booster, options).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIter"), 0);
}

#[test]
fn engine_failure_surfaces_from_step() {
    let params = params(5, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();
    env.fake.fail_on("LGBM_BoosterUpdateOneIter");
    let err = train(&mut booster, TrainOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Native { operation: "LGBM_BoosterUpdateOneIter", .. }));
}

#[test]
fn loaded_models_cannot_be_trained() {
    let params = params(2, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();
    booster.update().unwrap();
    let text = booster
        .save_model_to_string(None, lgbm_bridge::native::ImportanceType::Split)
        .unwrap();
    let engine: Engine = env.fake.clone();
    let mut loaded = Booster::from_model_string(&engine, &text).unwrap();
    assert!(matches!(
        train(&mut loaded, TrainOptions::default()),
        Err(Error::InvalidArgument(_))
    ));
}

// =============================================================================
// Metrics
// =============================================================================

#[test]
fn training_metric_is_reported_when_requested() {
    let mut params = params(3, 0);
    params.objective.set_is_provide_training_metric(true).unwrap();
    let env = setup(FakeEngine::new().with_train_scores(vec![0.3, 0.2, 0.1]), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();

    let summary = train(&mut booster, TrainOptions::default()).unwrap();
    let train_scores: Vec<Option<f64>> = summary.evaluations.iter().map(|e| e.train).collect();
    assert_eq!(train_scores, vec![Some(0.3), Some(0.2), Some(0.1)]);
}

#[test]
fn history_can_be_skipped() {
    let params = params(4, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, Some(&env.valid)).unwrap();
    let options = TrainOptions::builder().record_history(false).build().unwrap();
    let summary = train(&mut booster, options).unwrap();
    assert!(summary.evaluations.is_empty());
}

// =============================================================================
// Custom objective
// =============================================================================

/// Squared error against fixed targets.
struct SquaredError {
    targets: Vec<f32>,
}

impl CustomObjective for SquaredError {
    fn gradients(&self, scores: &[f64], grad: &mut [f32], hess: &mut [f32]) -> Result<()> {
        for (i, score) in scores.iter().enumerate() {
            grad[i] = *score as f32 - self.targets[i];
            hess[i] = 1.0;
        }
        Ok(())
    }
}

#[test]
fn custom_objective_drives_updates() {
    let params = params(4, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();
    let objective = SquaredError {
        targets: env.train.label().unwrap(),
    };

    let run = TrainingRun::new(&booster, &params.learning, TrainOptions::default()).unwrap();
    let summary = run.run_custom(&mut booster, &objective).unwrap();
    assert_eq!(summary.state, TrainState::Completed);
    assert_eq!(summary.iterations, 4);
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIterCustom"), 4);
    assert_eq!(env.fake.call_count("LGBM_BoosterGetPredict"), 4);

    let scores = booster.inner_predictions(0).unwrap();
    let mean_label = objective.targets.iter().map(|&v| f64::from(v)).sum::<f64>() / 30.0;
    assert_approx_eq!(scores[0], mean_label + 0.04, 1e-9);
}

#[test]
fn objective_errors_abort_the_run() {
    struct Failing;
    impl CustomObjective for Failing {
        fn gradients(&self, _: &[f64], _: &mut [f32], _: &mut [f32]) -> Result<()> {
            Err(Error::InvalidArgument("targets missing".into()))
        }
    }

    let params = params(4, 0);
    let env = setup(FakeEngine::new(), &params);
    let mut booster = Booster::new(&params, &env.train, None).unwrap();
    let run = TrainingRun::new(&booster, &params.learning, TrainOptions::default()).unwrap();
    assert!(run.run_custom(&mut booster, &Failing).is_err());
    assert_eq!(env.fake.call_count("LGBM_BoosterUpdateOneIterCustom"), 0);
}
