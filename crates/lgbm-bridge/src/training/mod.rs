//! Training loop over a [`Booster`](crate::native::Booster).
//!
//! - [`TrainingRun`]: the iteration state machine
//! - [`EarlyStopping`]: patience tracking on the validation metric
//! - [`TrainOptions`]: reporting options (bon builder)
//! - [`TrainingLogger`], [`Verbosity`]: `tracing` output
//! - [`CustomObjective`]: caller-supplied gradients
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use lgbm_bridge::native::{Booster, Dataset, Engine};
//! use lgbm_bridge::params::Parameters;
//! use lgbm_bridge::testing::FakeEngine;
//! use lgbm_bridge::training::{TrainOptions, TrainState, train};
//!
//! let engine: Engine = Arc::new(FakeEngine::new());
//! let mut params = Parameters::default();
//! params.learning.set_num_iterations(10)?;
//!
//! let features = ndarray::Array2::<f64>::zeros((8, 2));
//! let mut data = Dataset::from_mat(&engine, features.view(), &params, None)?;
//! data.set_label(&[0.0; 8])?;
//!
//! let mut booster = Booster::new(&params, &data, None)?;
//! let summary = train(&mut booster, TrainOptions::default())?;
//! assert_eq!(summary.state, TrainState::Completed);
//! assert_eq!(summary.iterations, 10);
//! # Ok::<(), lgbm_bridge::Error>(())
//! ```

mod early_stop;
mod logger;
mod options;
mod run;

pub use early_stop::{EarlyStopAction, EarlyStopping, metric_higher_is_better};
pub use logger::{TrainingLogger, Verbosity};
pub use options::TrainOptions;
pub use run::{CustomObjective, EvalRecord, TrainState, TrainSummary, TrainingRun, train};
