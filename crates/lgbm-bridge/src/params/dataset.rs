//! Dataset construction parameters (binning, bundling, missing values).

use super::codec::param_record;
use super::value::is_wire_safe;

param_record! {
    /// Parameters consumed when the engine bins a dataset.
    ///
    /// A dataset keeps the `DatasetParams` it was built with; boosters and
    /// validation sets must agree on them.
    pub struct DatasetParams as "dataset" {
        /// Maximum number of bins per feature.
        max_bin / set_max_bin: i32 = 255, check |v| *v > 1 => "must be > 1";
        /// Per-feature override of `max_bin`.
        max_bin_by_feature / set_max_bin_by_feature: Vec<i32> = Vec::new(),
            check |v| v.iter().all(|b| *b > 1) => "every entry must be > 1";
        min_data_in_bin / set_min_data_in_bin: i32 = 3, check |v| *v > 0 => "must be > 0";
        /// Rows sampled to construct bin boundaries.
        bin_construct_sample_cnt / set_bin_construct_sample_cnt: i32 = 200_000,
            check |v| *v > 0 => "must be > 0";
        data_random_seed / set_data_random_seed: i32 = 1;
        is_enable_sparse / set_is_enable_sparse: bool = true;
        /// Exclusive feature bundling.
        enable_bundle / set_enable_bundle: bool = true;
        max_conflict_rate / set_max_conflict_rate: f64 = 0.0,
            check |v| (0.0..1.0).contains(v) => "must be in [0, 1)";
        use_missing / set_use_missing: bool = true;
        zero_as_missing / set_zero_as_missing: bool = false;
        feature_pre_filter / set_feature_pre_filter: bool = true;
        pre_partition / set_pre_partition: bool = false;
        two_round / set_two_round: bool = false;
        header / set_header: bool = false;
        label_column / set_label_column: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        weight_column / set_weight_column: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        group_column / set_group_column: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        ignore_column / set_ignore_column: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        /// Zero-based indices of categorical columns.
        categorical_feature / set_categorical_feature: Vec<i32> = Vec::new(),
            check |v| v.iter().all(|i| *i >= 0) => "indices must be >= 0";
        forcedbins_filename / set_forcedbins_filename: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        precise_float_parser / set_precise_float_parser: bool = false;
    }
}
