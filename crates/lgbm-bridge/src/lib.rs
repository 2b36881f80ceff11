//! lgbm-bridge: typed configuration and safe handles for the LightGBM C API.
//!
//! The native engine is configured through a flat `key=value` string and
//! driven through opaque handles. This crate puts a typed, validated layer
//! over both.
//!
//! # Key Types
//!
//! - [`Parameters`] - the four typed parameter records and their codec
//! - [`Dataset`] / [`Booster`] - owned engine handles, freed exactly once
//! - [`TrainingRun`] - the boosting loop with early stopping
//! - [`NativeApi`] - the engine boundary; [`LightGbm`](native::LightGbm)
//!   binds the real library (feature `lightgbm`) and
//!   [`testing::FakeEngine`] runs in memory
//!
//! # Training
//!
//! Build [`Parameters`], create datasets on an [`Engine`], then call
//! [`train`]. See the [`training`] module for an end-to-end example.

pub mod native;
pub mod params;
pub mod testing;
pub mod training;

mod error;

pub use error::{Error, Result};

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use native::{Booster, Dataset, Engine, NativeApi, PredictKind};
pub use params::{ParamError, Parameters};
pub use training::{TrainOptions, TrainState, TrainSummary, TrainingRun, train};
