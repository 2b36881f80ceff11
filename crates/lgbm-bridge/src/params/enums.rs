//! Enumerated parameter values and their fixed wire tables.
//!
//! The wire tables reproduce the native engine's tokens exactly, quirks
//! included: `rf` and `random_forest` both select the random forest booster,
//! the default metric is the empty string, and the Poisson metric travels as
//! `possion`.

use std::fmt;
use std::hash::Hasher;

use super::value::{FieldKind, ParamValue};

/// Declare a parameter enum with its wire table.
///
/// Each variant lists its canonical wire token, optionally followed by
/// `|`-separated aliases accepted when parsing. Matching is ASCII
/// case-insensitive.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical wire token.
            pub fn as_wire(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            /// Parse a wire token (canonical or alias).
            pub fn parse_wire(raw: &str) -> Option<Self> {
                let raw = raw.trim();
                $(
                    if raw.eq_ignore_ascii_case($wire) $(|| raw.eq_ignore_ascii_case($alias))* {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_wire())
            }
        }

        impl ParamValue for $name {
            const KIND: FieldKind = FieldKind::Enumeration;
            type View<'a> = $name;

            fn view(&self) -> $name {
                *self
            }

            fn to_wire(&self) -> String {
                self.as_wire().to_string()
            }

            fn from_wire(raw: &str) -> Option<Self> {
                Self::parse_wire(raw)
            }

            fn same(&self, other: &Self) -> bool {
                self == other
            }

            fn hash_value(&self, state: &mut dyn Hasher) {
                state.write(self.as_wire().as_bytes());
                state.write_u8(0xff);
            }
        }
    };
}

wire_enum! {
    /// Training objective (`objective`).
    pub enum ObjectiveType {
        #[default]
        Regression => "regression" | "regression_l2" | "l2" | "mean_squared_error" | "mse",
        RegressionL1 => "regression_l1" | "l1" | "mean_absolute_error" | "mae",
        Huber => "huber",
        Fair => "fair",
        Poisson => "poisson",
        Quantile => "quantile",
        Mape => "mape" | "mean_absolute_percentage_error",
        Gamma => "gamma",
        Tweedie => "tweedie",
        Binary => "binary",
        Multiclass => "multiclass" | "softmax",
        MulticlassOva => "multiclassova" | "multiclass_ova" | "ova" | "ovr",
        CrossEntropy => "cross_entropy" | "xentropy",
        CrossEntropyLambda => "cross_entropy_lambda" | "xentlambda",
        LambdaRank => "lambdarank",
        RankXendcg => "rank_xendcg" | "xendcg" | "xe_ndcg",
    }
}

impl ObjectiveType {
    /// Whether this objective ranks groups of rows.
    pub fn is_ranking(&self) -> bool {
        matches!(self, ObjectiveType::LambdaRank | ObjectiveType::RankXendcg)
    }

    /// Whether this objective fits one model per class.
    pub fn is_multiclass(&self) -> bool {
        matches!(self, ObjectiveType::Multiclass | ObjectiveType::MulticlassOva)
    }
}

wire_enum! {
    /// Boosting algorithm (`boosting`).
    pub enum BoostingType {
        #[default]
        Gbdt => "gbdt" | "gbrt",
        RandomForest => "rf" | "random_forest",
        Dart => "dart",
        Goss => "goss",
    }
}

wire_enum! {
    /// Compute device (`device_type`).
    pub enum DeviceType {
        #[default]
        Cpu => "cpu",
        Gpu => "gpu",
        Cuda => "cuda",
    }
}

wire_enum! {
    /// Parallel tree learner (`tree_learner`).
    pub enum TreeLearnerType {
        #[default]
        Serial => "serial",
        Feature => "feature" | "feature_parallel",
        Data => "data" | "data_parallel",
        Voting => "voting" | "voting_parallel",
    }
}

wire_enum! {
    /// Evaluation metric (`metric`).
    ///
    /// `Default` lets the engine pick the objective's own metric and travels
    /// as the empty string.
    pub enum MetricType {
        #[default]
        Default => "",
        None => "None" | "na" | "null",
        Mae => "l1" | "mae" | "mean_absolute_error" | "regression_l1",
        Mse => "l2" | "mse" | "mean_squared_error" | "regression",
        Rmse => "rmse" | "root_mean_squared_error" | "l2_root",
        Quantile => "quantile",
        Mape => "mape" | "mean_absolute_percentage_error",
        Huber => "huber",
        Fair => "fair",
        Poisson => "possion" | "poisson",
        Gamma => "gamma",
        GammaDeviance => "gamma_deviance",
        Tweedie => "tweedie",
        Ndcg => "ndcg" | "lambdarank",
        Map => "map" | "mean_average_precision",
        Auc => "auc",
        AveragePrecision => "average_precision",
        BinaryLogloss => "binary_logloss" | "binary",
        BinaryError => "binary_error",
        AucMu => "auc_mu",
        MultiLogloss => "multi_logloss" | "multiclass" | "softmax",
        MultiError => "multi_error",
        CrossEntropy => "cross_entropy" | "xentropy",
        CrossEntropyLambda => "cross_entropy_lambda" | "xentlambda",
        KullbackLeibler => "kullback_leibler" | "kldiv",
    }
}

impl MetricType {
    /// Whether this metric reports one value per `eval_at` position.
    pub fn is_positional(&self) -> bool {
        matches!(self, MetricType::Ndcg | MetricType::Map)
    }
}

wire_enum! {
    /// Monotone constraint enforcement (`monotone_constraints_method`).
    pub enum MonotoneConstraintsMethod {
        #[default]
        Basic => "basic",
        Intermediate => "intermediate",
        Advanced => "advanced",
    }
}

wire_enum! {
    /// Row sampling strategy (`data_sample_strategy`).
    pub enum SampleStrategy {
        #[default]
        Bagging => "bagging",
        Goss => "goss",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trip<T: ParamValue + PartialEq + fmt::Debug + Copy>(all: &[T]) {
        for v in all {
            assert_eq!(T::from_wire(&v.to_wire()), Some(*v), "wire {:?}", v.to_wire());
        }
    }

    #[test]
    fn every_variant_round_trips() {
        assert_round_trip(ObjectiveType::ALL);
        assert_round_trip(BoostingType::ALL);
        assert_round_trip(DeviceType::ALL);
        assert_round_trip(TreeLearnerType::ALL);
        assert_round_trip(MetricType::ALL);
        assert_round_trip(MonotoneConstraintsMethod::ALL);
        assert_round_trip(SampleStrategy::ALL);
    }

    #[test]
    fn random_forest_aliases() {
        assert_eq!(BoostingType::parse_wire("rf"), Some(BoostingType::RandomForest));
        assert_eq!(BoostingType::parse_wire("random_forest"), Some(BoostingType::RandomForest));
        assert_eq!(BoostingType::RandomForest.as_wire(), "rf");
    }

    #[test]
    fn default_metric_is_empty() {
        assert_eq!(MetricType::Default.as_wire(), "");
        assert_eq!(MetricType::parse_wire(""), Some(MetricType::Default));
    }

    #[test]
    fn poisson_metric_keeps_engine_spelling() {
        assert_eq!(MetricType::Poisson.as_wire(), "possion");
        assert_eq!(MetricType::parse_wire("poisson"), Some(MetricType::Poisson));
        // The objective is spelled correctly by the engine.
        assert_eq!(ObjectiveType::Poisson.as_wire(), "poisson");
    }

    #[test]
    fn case_insensitive_parsing() {
        assert_eq!(MetricType::parse_wire("none"), Some(MetricType::None));
        assert_eq!(DeviceType::parse_wire("GPU"), Some(DeviceType::Gpu));
        assert_eq!(DeviceType::parse_wire("tpu"), None);
    }
}
