//! Training-loop options.
//!
//! Iteration count and early-stopping patience come from
//! [`LearningParams`](crate::params::LearningParams); these options only
//! control how the loop reports.
//!
//! ```
//! use lgbm_bridge::training::{TrainOptions, Verbosity};
//!
//! let options = TrainOptions::builder()
//!     .eval_period(10)
//!     .verbosity(Verbosity::Info)
//!     .build()
//!     .unwrap();
//! assert_eq!(options.eval_period, 10);
//! ```

use bon::Builder;

use crate::{Error, Result};

use super::Verbosity;

/// Reporting options for [`TrainingRun`](super::TrainingRun).
#[derive(Debug, Clone, Builder)]
#[builder(derive(Clone, Debug), finish_fn(vis = "", name = __build_internal))]
pub struct TrainOptions {
    /// Evaluate and log every this many iterations when early stopping is
    /// off. Default: 1.
    #[builder(default = 1)]
    pub eval_period: u32,

    /// Keep every evaluation in [`TrainSummary::evaluations`](super::TrainSummary).
    /// Default: true.
    #[builder(default = true)]
    pub record_history: bool,

    /// Default: `Warning`.
    #[builder(default)]
    pub verbosity: Verbosity,
}

impl<S: train_options_builder::IsComplete> TrainOptionsBuilder<S> {
    /// Build and validate.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `eval_period` is zero.
    pub fn build(self) -> Result<TrainOptions> {
        let options = self.__build_internal();
        options.validate()?;
        Ok(options)
    }
}

impl TrainOptions {
    /// Check options assembled without the builder.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `eval_period` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.eval_period == 0 {
            return Err(Error::InvalidArgument("eval_period must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            eval_period: 1,
            record_history: true,
            verbosity: Verbosity::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = TrainOptions::builder().build().unwrap();
        assert_eq!(options.eval_period, 1);
        assert!(options.record_history);
        assert_eq!(options.verbosity, Verbosity::Warning);
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(TrainOptions::builder().eval_period(0).build().is_err());
    }

    #[test]
    fn struct_literal_is_validated() {
        let options = TrainOptions {
            eval_period: 0,
            ..TrainOptions::default()
        };
        assert!(matches!(options.validate(), Err(Error::InvalidArgument(_))));
        assert!(TrainOptions::default().validate().is_ok());
    }
}
