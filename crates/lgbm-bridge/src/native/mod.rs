//! Native engine resources.
//!
//! [`Dataset`] and [`Booster`] own opaque engine handles through a
//! [`NativeHandle`] guard and translate every call through the
//! [`NativeApi`] boundary. Calls are synchronous; caller buffers are only
//! borrowed for the duration of the call that uses them.
//!
//! With the `lightgbm` feature, [`LightGbm`] binds the real shared library.
//! [`crate::testing::FakeEngine`] implements the same trait in memory.

mod api;
mod booster;
pub mod buffer;
mod dataset;
mod handle;
#[cfg(feature = "lightgbm")]
mod lightgbm;
mod network;
mod sample;

pub use api::{
    CsrMatrix, DenseMatrix, Engine, FieldData, FieldValues, ImportanceType, MatrixData, NativeApi,
    NativeFloat, PredictKind, RawHandle, dtype,
};
pub use booster::{Booster, ModelSummary};
pub use buffer::MAX_NAME_LENGTH;
pub use dataset::Dataset;
pub use handle::{HandleKind, NativeHandle};
#[cfg(feature = "lightgbm")]
pub use lightgbm::LightGbm;
pub use network::Network;
pub use sample::ColumnSample;
