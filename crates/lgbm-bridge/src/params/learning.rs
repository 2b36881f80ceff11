//! Boosting and tree-learning parameters.

use super::codec::param_record;
use super::value::is_wire_safe;
use super::{BoostingType, MonotoneConstraintsMethod, SampleStrategy, TreeLearnerType};

fn in_unit_interval(v: &f64) -> bool {
    (0.0..=1.0).contains(v)
}

fn fraction(v: &f64) -> bool {
    *v > 0.0 && *v <= 1.0
}

fn non_negative(v: &f64) -> bool {
    *v >= 0.0
}

param_record! {
    /// Parameters controlling the boosting loop and tree growth.
    ///
    /// `num_iterations` and `early_stopping_round` also drive the training
    /// loop in [`crate::training`].
    pub struct LearningParams as "learning" {
        boosting / set_boosting: BoostingType = BoostingType::Gbdt;
        data_sample_strategy / set_data_sample_strategy: SampleStrategy = SampleStrategy::Bagging;
        /// Number of boosting iterations.
        num_iterations / set_num_iterations: i32 = 100, check |v| *v >= 0 => "must be >= 0";
        learning_rate / set_learning_rate: f64 = 0.1, check |v| *v > 0.0 => "must be > 0";
        num_leaves / set_num_leaves: i32 = 31,
            check |v| *v > 1 && *v <= 131_072 => "must be in (1, 131072]";
        tree_learner / set_tree_learner: TreeLearnerType = TreeLearnerType::Serial;
        /// Depth limit; `<= 0` means unlimited.
        max_depth / set_max_depth: i32 = -1;
        min_data_in_leaf / set_min_data_in_leaf: i32 = 20, check |v| *v >= 0 => "must be >= 0";
        min_sum_hessian_in_leaf / set_min_sum_hessian_in_leaf: f64 = 1e-3,
            check non_negative => "must be >= 0";
        bagging_fraction / set_bagging_fraction: f64 = 1.0, check fraction => "must be in (0, 1]";
        pos_bagging_fraction / set_pos_bagging_fraction: f64 = 1.0,
            check fraction => "must be in (0, 1]";
        neg_bagging_fraction / set_neg_bagging_fraction: f64 = 1.0,
            check fraction => "must be in (0, 1]";
        /// Bag every `k` iterations; `0` disables bagging.
        bagging_freq / set_bagging_freq: i32 = 0, check |v| *v >= 0 => "must be >= 0";
        bagging_seed / set_bagging_seed: i32 = 3;
        feature_fraction / set_feature_fraction: f64 = 1.0, check fraction => "must be in (0, 1]";
        feature_fraction_bynode / set_feature_fraction_bynode: f64 = 1.0,
            check fraction => "must be in (0, 1]";
        feature_fraction_seed / set_feature_fraction_seed: i32 = 2;
        extra_trees / set_extra_trees: bool = false;
        extra_seed / set_extra_seed: i32 = 6;
        /// Stop after this many iterations without validation improvement.
        /// `0` disables early stopping.
        early_stopping_round / set_early_stopping_round: i32 = 0,
            check |v| *v >= 0 => "must be >= 0";
        first_metric_only / set_first_metric_only: bool = false;
        max_delta_step / set_max_delta_step: f64 = 0.0;
        lambda_l1 / set_lambda_l1: f64 = 0.0, check non_negative => "must be >= 0";
        lambda_l2 / set_lambda_l2: f64 = 0.0, check non_negative => "must be >= 0";
        linear_lambda / set_linear_lambda: f64 = 0.0, check non_negative => "must be >= 0";
        min_gain_to_split / set_min_gain_to_split: f64 = 0.0, check non_negative => "must be >= 0";
        // DART
        drop_rate / set_drop_rate: f64 = 0.1, check in_unit_interval => "must be in [0, 1]";
        max_drop / set_max_drop: i32 = 50;
        skip_drop / set_skip_drop: f64 = 0.5, check in_unit_interval => "must be in [0, 1]";
        xgboost_dart_mode / set_xgboost_dart_mode: bool = false;
        uniform_drop / set_uniform_drop: bool = false;
        drop_seed / set_drop_seed: i32 = 4;
        // GOSS
        top_rate / set_top_rate: f64 = 0.2, check in_unit_interval => "must be in [0, 1]";
        other_rate / set_other_rate: f64 = 0.1, check in_unit_interval => "must be in [0, 1]";
        // categorical splits
        min_data_per_group / set_min_data_per_group: i32 = 100, check |v| *v > 0 => "must be > 0";
        max_cat_threshold / set_max_cat_threshold: i32 = 32, check |v| *v > 0 => "must be > 0";
        cat_l2 / set_cat_l2: f64 = 10.0, check non_negative => "must be >= 0";
        cat_smooth / set_cat_smooth: f64 = 10.0, check non_negative => "must be >= 0";
        max_cat_to_onehot / set_max_cat_to_onehot: i32 = 4, check |v| *v > 0 => "must be > 0";
        /// Voting-parallel candidate count.
        top_k / set_top_k: i32 = 20, check |v| *v > 0 => "must be > 0";
        /// Per-feature monotonicity: `-1`, `0`, or `1`.
        monotone_constraints / set_monotone_constraints: Vec<i32> = Vec::new(),
            check |v| v.iter().all(|c| (-1..=1).contains(c)) => "entries must be -1, 0 or 1";
        monotone_constraints_method / set_monotone_constraints_method: MonotoneConstraintsMethod =
            MonotoneConstraintsMethod::Basic;
        monotone_penalty / set_monotone_penalty: f64 = 0.0, check non_negative => "must be >= 0";
        /// Per-feature split gain multipliers.
        feature_contri / set_feature_contri: Vec<f64> = Vec::new(),
            check |v| v.iter().all(|c| *c >= 0.0) => "entries must be >= 0";
        forcedsplits_filename / set_forcedsplits_filename: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        refit_decay_rate / set_refit_decay_rate: f64 = 0.9,
            check in_unit_interval => "must be in [0, 1]";
        cegb_tradeoff / set_cegb_tradeoff: f64 = 1.0, check non_negative => "must be >= 0";
        cegb_penalty_split / set_cegb_penalty_split: f64 = 0.0, check non_negative => "must be >= 0";
        path_smooth / set_path_smooth: f64 = 0.0, check non_negative => "must be >= 0";
        linear_tree / set_linear_tree: bool = false;
    }
}

impl LearningParams {
    /// Early stopping patience, if enabled.
    pub fn early_stopping_patience(&self) -> Option<u32> {
        u32::try_from(self.early_stopping_round).ok().filter(|p| *p > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamError, ParamRecord};

    #[test]
    fn fractions_exclude_zero() {
        let mut p = LearningParams::default();
        assert!(matches!(
            p.set_bagging_fraction(0.0),
            Err(ParamError::Validation { field: "bagging_fraction", .. })
        ));
        p.set_bagging_fraction(0.8).unwrap();
        p.set_bagging_freq(5).unwrap();
        let map = p.encode();
        assert_eq!(map["bagging_fraction"], "0.8");
        assert_eq!(map["bagging_freq"], "5");
    }

    #[test]
    fn monotone_entries_are_ternary() {
        let mut p = LearningParams::default();
        assert!(p.set_monotone_constraints(vec![1, 2]).is_err());
        p.set_monotone_constraints(vec![1, 0, -1]).unwrap();
        assert_eq!(p.encode()["monotone_constraints"], "1,0,-1");
    }

    #[test]
    fn random_forest_writes_short_token() {
        let mut p = LearningParams::default();
        p.set_boosting(BoostingType::RandomForest).unwrap();
        assert_eq!(p.encode()["boosting"], "rf");
    }

    #[test]
    fn early_stopping_patience() {
        let mut p = LearningParams::default();
        assert_eq!(p.early_stopping_patience(), None);
        p.set_early_stopping_round(5).unwrap();
        assert_eq!(p.early_stopping_patience(), Some(5));
    }
}
