//! Objective and evaluation-metric parameters.

use super::codec::param_record;
use super::{MetricType, ObjectiveType};

/// Ranking metrics report positions 1..=5 when `eval_at` is empty.
pub const DEFAULT_EVAL_AT_LEN: usize = 5;

param_record! {
    /// What the booster optimizes and how progress is measured.
    pub struct ObjectiveParams as "objective" {
        objective / set_objective: ObjectiveType = ObjectiveType::Regression;
        /// Evaluation metric. `Default` defers to the objective.
        metric / set_metric: MetricType = MetricType::Default;
        /// Number of classes for multiclass objectives.
        num_class / set_num_class: i32 = 1, check |v| *v >= 1 => "must be >= 1";
        is_unbalance / set_is_unbalance: bool = false;
        scale_pos_weight / set_scale_pos_weight: f64 = 1.0, check |v| *v > 0.0 => "must be > 0";
        sigmoid / set_sigmoid: f64 = 1.0, check |v| *v > 0.0 => "must be > 0";
        boost_from_average / set_boost_from_average: bool = true;
        reg_sqrt / set_reg_sqrt: bool = false;
        /// Huber and quantile parameter.
        alpha / set_alpha: f64 = 0.9, check |v| *v > 0.0 => "must be > 0";
        fair_c / set_fair_c: f64 = 1.0, check |v| *v > 0.0 => "must be > 0";
        poisson_max_delta_step / set_poisson_max_delta_step: f64 = 0.7,
            check |v| *v > 0.0 => "must be > 0";
        tweedie_variance_power / set_tweedie_variance_power: f64 = 1.5,
            check |v| (1.0..2.0).contains(v) => "must be in [1, 2)";
        lambdarank_truncation_level / set_lambdarank_truncation_level: i32 = 30,
            check |v| *v > 0 => "must be > 0";
        lambdarank_norm / set_lambdarank_norm: bool = true;
        /// Relevance gain per label. Empty uses the engine's `2^i - 1` table.
        label_gain / set_label_gain: Vec<f64> = Vec::new(),
            check |v| v.iter().all(|g| g.is_finite()) => "gains must be finite";
        /// Ranking cut-off positions for NDCG/MAP.
        eval_at / set_eval_at: Vec<i32> = Vec::new(),
            check |v| v.iter().all(|k| *k > 0) => "positions must be > 0";
        multi_error_top_k / set_multi_error_top_k: i32 = 1, check |v| *v > 0 => "must be > 0";
        metric_freq / set_metric_freq: i32 = 1, check |v| *v > 0 => "must be > 0";
        is_provide_training_metric / set_is_provide_training_metric: bool = false;
    }
}

impl ObjectiveParams {
    /// Number of metric values the engine will report per dataset.
    ///
    /// Positional ranking metrics expand to one value per `eval_at` entry.
    pub fn implied_metric_count(&self) -> usize {
        let positions = if self.eval_at.is_empty() {
            DEFAULT_EVAL_AT_LEN
        } else {
            self.eval_at.len()
        };
        match self.metric {
            MetricType::None => 0,
            MetricType::Default if self.objective.is_ranking() => positions,
            m if m.is_positional() => positions,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamRecord;

    #[test]
    fn metric_default_is_elided() {
        let mut p = ObjectiveParams::default();
        p.set_metric(MetricType::Default).unwrap();
        assert!(p.encode().is_empty());

        p.set_metric(MetricType::Auc).unwrap();
        assert_eq!(p.encode()["metric"], "auc");
    }

    #[test]
    fn implied_metric_count() {
        let mut p = ObjectiveParams::default();
        assert_eq!(p.implied_metric_count(), 1);

        p.set_metric(MetricType::None).unwrap();
        assert_eq!(p.implied_metric_count(), 0);

        p.set_objective(ObjectiveType::LambdaRank).unwrap();
        p.set_metric(MetricType::Default).unwrap();
        assert_eq!(p.implied_metric_count(), DEFAULT_EVAL_AT_LEN);

        p.set_eval_at(vec![10]).unwrap();
        assert_eq!(p.implied_metric_count(), 1);

        p.set_metric(MetricType::Map).unwrap();
        p.set_eval_at(vec![1, 3]).unwrap();
        assert_eq!(p.implied_metric_count(), 2);
    }

    #[test]
    fn tweedie_power_range() {
        let mut p = ObjectiveParams::default();
        assert!(p.set_tweedie_variance_power(2.0).is_err());
        p.set_tweedie_variance_power(1.2).unwrap();
    }
}
