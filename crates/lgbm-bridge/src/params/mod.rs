//! Typed engine parameters and the flat-string codec.
//!
//! The native engine takes configuration as one whitespace-separated
//! `key=value` string. This module models that configuration as four typed
//! records, grouped by concern:
//!
//! - [`CommonParams`]: threads, device, seeds, network
//! - [`DatasetParams`]: binning and dataset construction
//! - [`ObjectiveParams`]: objective and metric
//! - [`LearningParams`]: boosting and tree growth
//!
//! Every field is range-checked when assigned. Each record type has a
//! [`ParamCodec`] built once from its field table: encoding omits fields
//! equal to their default, decoding claims its own keys from a shared map.
//! [`Parameters`] composes all four into the engine string.
//!
//! # Example
//!
//! ```
//! use lgbm_bridge::params::{MetricType, ObjectiveType, Parameters};
//!
//! let mut params = Parameters::default();
//! params.objective.set_objective(ObjectiveType::Binary)?;
//! params.objective.set_metric(MetricType::Auc)?;
//! params.learning.set_num_leaves(63)?;
//!
//! let wire = params.to_param_string();
//! assert_eq!(wire, "metric=auc num_leaves=63 objective=binary");
//! assert_eq!(Parameters::from_param_string(&wire)?, params);
//! # Ok::<(), lgbm_bridge::params::ParamError>(())
//! ```

mod codec;
mod common;
mod dataset;
mod enums;
mod learning;
mod objective;
mod value;
pub mod wire;

use std::collections::BTreeMap;
use std::path::Path;

pub use codec::{FieldReader, FieldSpec, FieldWriter, ParamCodec, ParamRecord, wire_name};
pub use common::CommonParams;
pub use dataset::DatasetParams;
pub use enums::{
    BoostingType, DeviceType, MetricType, MonotoneConstraintsMethod, ObjectiveType,
    SampleStrategy, TreeLearnerType,
};
pub use learning::LearningParams;
pub use objective::{DEFAULT_EVAL_AT_LEN, ObjectiveParams};
pub use value::{FieldKind, ParamValue, is_wire_safe};

/// Flat parameter map: wire name to canonical value text.
pub type ParamMap = BTreeMap<String, String>;

// =============================================================================
// ParamError
// =============================================================================

/// Errors raised while assigning, encoding, or decoding parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// A value violates its field's constraint.
    #[error("{field} {reason}, got {value}")]
    Validation {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Wire text could not be parsed as the field's type.
    #[error("cannot parse {raw:?} as a value for '{key}'")]
    Decode { key: String, raw: String },

    /// The flat parameter string is malformed.
    #[error("malformed parameter string: {0}")]
    Format(String),

    /// Keys left over after every record claimed its own.
    #[error("unknown parameters: {}", .0.join(", "))]
    UnknownKeys(Vec<String>),
}

// =============================================================================
// Parameters
// =============================================================================

/// The full engine configuration: all four records.
///
/// Fields are public because each record guards its own invariants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Parameters {
    pub common: CommonParams,
    pub dataset: DatasetParams,
    pub objective: ObjectiveParams,
    pub learning: LearningParams,
}

impl Parameters {
    /// Union of every record's non-default fields.
    pub fn to_map(&self) -> ParamMap {
        let mut map = ParamMap::new();
        CommonParams::codec().encode_into(&self.common, &mut map);
        DatasetParams::codec().encode_into(&self.dataset, &mut map);
        ObjectiveParams::codec().encode_into(&self.objective, &mut map);
        LearningParams::codec().encode_into(&self.learning, &mut map);
        map
    }

    /// The combined engine string for booster creation.
    pub fn to_param_string(&self) -> String {
        wire::join(&self.to_map())
    }

    /// The engine string for dataset construction (common + dataset records).
    pub fn dataset_param_string(&self) -> String {
        dataset_param_string(&self.common, &self.dataset)
    }

    /// Run the decoder pipeline over `map`.
    ///
    /// Each record claims its keys in turn; anything left is rejected.
    pub fn from_map(mut map: ParamMap) -> Result<Self, ParamError> {
        let params = Self {
            common: CommonParams::decode(&mut map)?,
            dataset: DatasetParams::decode(&mut map)?,
            objective: ObjectiveParams::decode(&mut map)?,
            learning: LearningParams::decode(&mut map)?,
        };
        if !map.is_empty() {
            return Err(ParamError::UnknownKeys(map.into_keys().collect()));
        }
        Ok(params)
    }

    /// Parse the combined engine string.
    pub fn from_param_string(raw: &str) -> Result<Self, ParamError> {
        Self::from_map(wire::split(raw)?)
    }

    /// Load an engine-style config file (`key = value` lines, `#` comments).
    pub fn from_config_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_map(wire::parse_config_text(&text)?)?)
    }
}

/// The engine string for dataset construction.
pub fn dataset_param_string(common: &CommonParams, dataset: &DatasetParams) -> String {
    let mut map = common.encode();
    DatasetParams::codec().encode_into(dataset, &mut map);
    wire::join(&map)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_encode_empty() {
        assert_eq!(Parameters::default().to_param_string(), "");
    }

    #[test]
    fn negative_zero_is_elided_like_the_default() {
        let mut params = Parameters::default();
        params.learning.set_min_gain_to_split(-0.0).unwrap();
        assert_eq!(params, Parameters::default());
        assert_eq!(params.to_param_string(), "");
    }

    #[test]
    fn wire_names_are_unique_across_records() {
        let mut names: Vec<&str> = CommonParams::codec()
            .wire_names()
            .chain(DatasetParams::codec().wire_names())
            .chain(ObjectiveParams::codec().wire_names())
            .chain(LearningParams::codec().wire_names())
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn unknown_keys_are_reported() {
        let err = Parameters::from_param_string("num_leaves=7 bogus=1 also_bogus=2").unwrap_err();
        assert_eq!(
            err,
            ParamError::UnknownKeys(vec!["also_bogus".into(), "bogus".into()])
        );
    }

    #[test]
    fn dataset_string_excludes_booster_keys() {
        let mut params = Parameters::default();
        params.common.set_num_threads(2).unwrap();
        params.dataset.set_max_bin(63).unwrap();
        params.learning.set_num_leaves(15).unwrap();
        assert_eq!(params.dataset_param_string(), "max_bin=63 num_threads=2");
        assert_eq!(
            params.to_param_string(),
            "max_bin=63 num_leaves=15 num_threads=2"
        );
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.conf");
        std::fs::write(
            &path,
            "# binary task\nobjective = binary\nmetric = auc\nlearning_rate = 0.05\n",
        )
        .unwrap();

        let params = Parameters::from_config_file(&path).unwrap();
        assert_eq!(params.objective.objective(), ObjectiveType::Binary);
        assert_eq!(params.objective.metric(), MetricType::Auc);
        assert_eq!(params.learning.learning_rate(), 0.05);
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = Parameters::from_config_file("/nonexistent/train.conf").unwrap_err();
        assert!(matches!(err, crate::Error::Io { .. }));
    }
}
