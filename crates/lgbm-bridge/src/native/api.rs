//! The foreign boundary: one method per native engine entry point.
//!
//! [`NativeApi`] mirrors the engine's C API. Every method returns the raw
//! status code (`0` = success) and writes results through out-parameters, so
//! the safe wrappers in [`Dataset`](super::Dataset) and
//! [`Booster`](super::Booster) own all status checking and buffer sizing.
//!
//! Input buffers are borrowed slices: they are pinned for exactly the
//! duration of one call. Methods whose output size is decided by the engine
//! rather than by an explicit length argument are `unsafe`; their callers
//! must size the buffer from the engine's own count queries.

use std::ffi::{CStr, c_int, c_void};
use std::sync::Arc;

use crate::{Error, Result};

/// Opaque engine handle.
pub type RawHandle = *mut c_void;

/// Shared reference to an engine implementation.
pub type Engine = Arc<dyn NativeApi>;

/// Engine dtype codes.
pub mod dtype {
    use std::ffi::c_int;

    pub const FLOAT32: c_int = 0;
    pub const FLOAT64: c_int = 1;
    pub const INT32: c_int = 2;
    pub const INT64: c_int = 3;
}

// =============================================================================
// Input views
// =============================================================================

/// Borrowed numeric buffer tagged with its engine dtype.
#[derive(Debug, Clone, Copy)]
pub enum MatrixData<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl MatrixData<'_> {
    pub fn len(&self) -> usize {
        match self {
            MatrixData::F32(d) => d.len(),
            MatrixData::F64(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> c_int {
        match self {
            MatrixData::F32(_) => dtype::FLOAT32,
            MatrixData::F64(_) => dtype::FLOAT64,
        }
    }

    pub fn as_ptr(&self) -> *const c_void {
        match self {
            MatrixData::F32(d) => d.as_ptr().cast(),
            MatrixData::F64(d) => d.as_ptr().cast(),
        }
    }

    /// Value at `idx` widened to `f64`.
    pub fn get(&self, idx: usize) -> Option<f64> {
        match self {
            MatrixData::F32(d) => d.get(idx).map(|v| f64::from(*v)),
            MatrixData::F64(d) => d.get(idx).copied(),
        }
    }
}

impl<'a> From<&'a [f32]> for MatrixData<'a> {
    fn from(data: &'a [f32]) -> Self {
        MatrixData::F32(data)
    }
}

impl<'a> From<&'a [f64]> for MatrixData<'a> {
    fn from(data: &'a [f64]) -> Self {
        MatrixData::F64(data)
    }
}

/// Floating point element types the engine accepts for feature matrices.
pub trait NativeFloat: Copy + Default + Send + Sync + 'static {
    fn matrix_data(data: &[Self]) -> MatrixData<'_>;
}

impl NativeFloat for f32 {
    fn matrix_data(data: &[f32]) -> MatrixData<'_> {
        MatrixData::F32(data)
    }
}

impl NativeFloat for f64 {
    fn matrix_data(data: &[f64]) -> MatrixData<'_> {
        MatrixData::F64(data)
    }
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{what} {value} exceeds the engine's i32 range")))
}

/// Dense matrix view with a validated shape.
#[derive(Debug, Clone, Copy)]
pub struct DenseMatrix<'a> {
    data: MatrixData<'a>,
    nrow: i32,
    ncol: i32,
    row_major: bool,
}

impl<'a> DenseMatrix<'a> {
    /// Wrap `data` as an `nrow x ncol` matrix.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `data.len() != nrow * ncol` or a dimension does
    /// not fit the engine's `i32`.
    pub fn new(data: MatrixData<'a>, nrow: usize, ncol: usize, row_major: bool) -> Result<Self> {
        let expected = nrow.checked_mul(ncol);
        if expected != Some(data.len()) {
            return Err(Error::InvalidArgument(format!(
                "matrix data has {} values, expected {nrow} x {ncol}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            nrow: to_i32(nrow, "row count")?,
            ncol: to_i32(ncol, "column count")?,
            row_major,
        })
    }

    pub fn data(&self) -> MatrixData<'a> {
        self.data
    }

    pub fn nrow(&self) -> i32 {
        self.nrow
    }

    pub fn ncol(&self) -> i32 {
        self.ncol
    }

    pub fn is_row_major(&self) -> bool {
        self.row_major
    }

    /// Element at (`row`, `col`) widened to `f64`.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        let (nrow, ncol) = (self.nrow as usize, self.ncol as usize);
        if row >= nrow || col >= ncol {
            return None;
        }
        let idx = if self.row_major { row * ncol + col } else { col * nrow + row };
        self.data.get(idx)
    }
}

/// Compressed sparse row matrix view with validated structure.
#[derive(Debug, Clone, Copy)]
pub struct CsrMatrix<'a> {
    indptr: &'a [i64],
    indices: &'a [i32],
    data: MatrixData<'a>,
    num_col: i64,
}

impl<'a> CsrMatrix<'a> {
    /// Wrap CSR arrays.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `indptr` starts at 0, never decreases, and
    /// ends at `indices.len() == data.len()`, and every column index is in
    /// `0..num_col`.
    pub fn new(
        indptr: &'a [i64],
        indices: &'a [i32],
        data: MatrixData<'a>,
        num_col: usize,
    ) -> Result<Self> {
        let invalid = |msg: String| Err(Error::InvalidArgument(msg));
        if indptr.first() != Some(&0) {
            return invalid("indptr must start with 0".into());
        }
        if indptr.windows(2).any(|w| w[1] < w[0]) {
            return invalid("indptr must be non-decreasing".into());
        }
        let nnz = indptr.last().copied().unwrap_or(0);
        if usize::try_from(nnz).ok() != Some(indices.len()) || indices.len() != data.len() {
            return invalid(format!(
                "indptr ends at {nnz} but there are {} indices and {} values",
                indices.len(),
                data.len()
            ));
        }
        let num_col_i32 = to_i32(num_col, "column count")?;
        if let Some(bad) = indices.iter().find(|&&c| c < 0 || c >= num_col_i32) {
            return invalid(format!("column index {bad} outside 0..{num_col}"));
        }
        to_i32(indptr.len() - 1, "row count")?;
        Ok(Self {
            indptr,
            indices,
            data,
            num_col: i64::from(num_col_i32),
        })
    }

    pub fn indptr(&self) -> &'a [i64] {
        self.indptr
    }

    pub fn indices(&self) -> &'a [i32] {
        self.indices
    }

    pub fn data(&self) -> MatrixData<'a> {
        self.data
    }

    pub fn num_col(&self) -> i64 {
        self.num_col
    }

    pub fn nrow(&self) -> usize {
        self.indptr.len() - 1
    }
}

/// Borrowed per-row field data passed to `LGBM_DatasetSetField`.
#[derive(Debug, Clone, Copy)]
pub enum FieldData<'a> {
    F32(&'a [f32]),
    F64(&'a [f64]),
    I32(&'a [i32]),
}

impl FieldData<'_> {
    pub fn len(&self) -> usize {
        match self {
            FieldData::F32(d) => d.len(),
            FieldData::F64(d) => d.len(),
            FieldData::I32(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owned per-row field data copied out of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
}

// =============================================================================
// Output selectors
// =============================================================================

/// What a prediction call returns per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PredictKind {
    /// Transformed scores (probabilities for classification).
    #[default]
    Normal,
    /// Untransformed margins.
    RawScore,
    /// Leaf index per tree.
    LeafIndex,
    /// Per-feature contributions plus bias.
    Contrib,
}

impl PredictKind {
    pub fn code(&self) -> c_int {
        match self {
            PredictKind::Normal => 0,
            PredictKind::RawScore => 1,
            PredictKind::LeafIndex => 2,
            PredictKind::Contrib => 3,
        }
    }
}

/// Feature importance measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportanceType {
    /// Number of splits using the feature.
    #[default]
    Split,
    /// Total gain of splits using the feature.
    Gain,
}

impl ImportanceType {
    pub fn code(&self) -> c_int {
        match self {
            ImportanceType::Split => 0,
            ImportanceType::Gain => 1,
        }
    }
}

// =============================================================================
// NativeApi
// =============================================================================

/// The native engine's C API, one method per entry point.
///
/// Handles passed in must have been produced by the same implementation and
/// not yet freed. Name-fetching methods fill `buffers` (one per expected
/// name, each of equal length) and report the count and the longest
/// required length including the terminating NUL.
pub trait NativeApi: Send + Sync {
    /// Text of the most recent failure.
    fn last_error(&self) -> String;

    // --- Dataset ---

    fn dataset_create_from_sampled_column(
        &self,
        sample_values: &[&[f64]],
        sample_indices: &[&[i32]],
        num_sample_row: i32,
        num_total_row: i32,
        parameters: &CStr,
        out: &mut RawHandle,
    ) -> c_int;

    fn dataset_create_by_reference(
        &self,
        reference: RawHandle,
        num_total_row: i64,
        out: &mut RawHandle,
    ) -> c_int;

    fn dataset_push_rows(&self, handle: RawHandle, data: DenseMatrix<'_>, start_row: i32) -> c_int;

    fn dataset_create_from_mat(
        &self,
        data: DenseMatrix<'_>,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int;

    /// All matrices share dtype, column count, and layout.
    fn dataset_create_from_mats(
        &self,
        mats: &[DenseMatrix<'_>],
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int;

    fn dataset_create_from_csr(
        &self,
        csr: CsrMatrix<'_>,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int;

    fn dataset_create_from_file(
        &self,
        filename: &CStr,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int;

    fn dataset_save_binary(&self, handle: RawHandle, filename: &CStr) -> c_int;

    fn dataset_free(&self, handle: RawHandle) -> c_int;

    fn dataset_get_num_data(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn dataset_get_num_feature(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    /// An empty slice resets the field to the engine default.
    fn dataset_set_field(&self, handle: RawHandle, field_name: &CStr, data: FieldData<'_>) -> c_int;

    /// Copies the field out; `None` when the field is unset.
    fn dataset_get_field(
        &self,
        handle: RawHandle,
        field_name: &CStr,
        out: &mut Option<FieldValues>,
    ) -> c_int;

    fn dataset_set_feature_names(&self, handle: RawHandle, names: &[&CStr]) -> c_int;

    fn dataset_get_feature_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int;

    // --- Booster ---

    fn booster_create(&self, train: RawHandle, parameters: &CStr, out: &mut RawHandle) -> c_int;

    fn booster_create_from_modelfile(
        &self,
        filename: &CStr,
        out_num_iterations: &mut c_int,
        out: &mut RawHandle,
    ) -> c_int;

    fn booster_load_model_from_string(
        &self,
        model: &CStr,
        out_num_iterations: &mut c_int,
        out: &mut RawHandle,
    ) -> c_int;

    fn booster_free(&self, handle: RawHandle) -> c_int;

    fn booster_add_valid_data(&self, handle: RawHandle, valid: RawHandle) -> c_int;

    fn booster_get_num_classes(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn booster_get_num_feature(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn booster_get_current_iteration(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn booster_num_model_per_iteration(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn booster_number_of_total_model(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn booster_get_eval_counts(&self, handle: RawHandle, out: &mut c_int) -> c_int;

    fn booster_get_eval_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int;

    fn booster_get_feature_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int;

    fn booster_update_one_iter(&self, handle: RawHandle, is_finished: &mut c_int) -> c_int;

    /// # Safety
    ///
    /// `grad` and `hess` must each hold at least as many values as
    /// `booster_get_num_predict(handle, 0)` reports.
    unsafe fn booster_update_one_iter_custom(
        &self,
        handle: RawHandle,
        grad: &[f32],
        hess: &[f32],
        is_finished: &mut c_int,
    ) -> c_int;

    fn booster_rollback_one_iter(&self, handle: RawHandle) -> c_int;

    /// # Safety
    ///
    /// `out` must hold at least `booster_get_eval_counts` values.
    unsafe fn booster_get_eval(
        &self,
        handle: RawHandle,
        data_idx: c_int,
        out_len: &mut c_int,
        out: &mut [f64],
    ) -> c_int;

    fn booster_get_num_predict(&self, handle: RawHandle, data_idx: c_int, out: &mut i64) -> c_int;

    /// # Safety
    ///
    /// `out` must hold at least `booster_get_num_predict(handle, data_idx)` values.
    unsafe fn booster_get_predict(
        &self,
        handle: RawHandle,
        data_idx: c_int,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int;

    fn booster_calc_num_predict(
        &self,
        handle: RawHandle,
        num_row: c_int,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        out: &mut i64,
    ) -> c_int;

    /// # Safety
    ///
    /// `out` must hold at least as many values as `booster_calc_num_predict`
    /// reports for the same row count and options.
    #[allow(clippy::too_many_arguments)]
    unsafe fn booster_predict_for_mat(
        &self,
        handle: RawHandle,
        data: DenseMatrix<'_>,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        parameter: &CStr,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int;

    /// # Safety
    ///
    /// Same contract as [`booster_predict_for_mat`](Self::booster_predict_for_mat).
    #[allow(clippy::too_many_arguments)]
    unsafe fn booster_predict_for_csr(
        &self,
        handle: RawHandle,
        csr: CsrMatrix<'_>,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        parameter: &CStr,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int;

    fn booster_save_model(
        &self,
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        importance_type: c_int,
        filename: &CStr,
    ) -> c_int;

    /// Writes at most `buffer.len()` bytes (NUL-terminated) and reports the
    /// full length required, NUL included.
    fn booster_save_model_to_string(
        &self,
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        importance_type: c_int,
        buffer: &mut [u8],
        out_len: &mut i64,
    ) -> c_int;

    /// Same contract as [`booster_save_model_to_string`](Self::booster_save_model_to_string),
    /// producing JSON.
    fn booster_dump_model(
        &self,
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        importance_type: c_int,
        buffer: &mut [u8],
        out_len: &mut i64,
    ) -> c_int;

    fn booster_get_leaf_value(
        &self,
        handle: RawHandle,
        tree_idx: c_int,
        leaf_idx: c_int,
        out: &mut f64,
    ) -> c_int;

    fn booster_set_leaf_value(
        &self,
        handle: RawHandle,
        tree_idx: c_int,
        leaf_idx: c_int,
        value: f64,
    ) -> c_int;

    /// # Safety
    ///
    /// `out` must hold at least `booster_get_num_feature` values.
    unsafe fn booster_feature_importance(
        &self,
        handle: RawHandle,
        num_iteration: c_int,
        importance_type: c_int,
        out: &mut [f64],
    ) -> c_int;

    // --- Network ---

    fn network_init(
        &self,
        machines: &CStr,
        local_listen_port: c_int,
        listen_time_out: c_int,
        num_machines: c_int,
    ) -> c_int;

    fn network_free(&self) -> c_int;
}

impl std::fmt::Debug for dyn NativeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NativeApi")
    }
}

// =============================================================================
// Status checking
// =============================================================================

/// Turn a status code into a `Result`, fetching the engine's error text.
pub(crate) fn check(engine: &dyn NativeApi, operation: &'static str, status: c_int) -> Result<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(Error::Native {
            operation,
            message: engine.last_error(),
        })
    }
}

/// Build a C string for an engine call.
pub(crate) fn c_string(value: &str, what: &str) -> Result<std::ffi::CString> {
    std::ffi::CString::new(value)
        .map_err(|_| Error::InvalidArgument(format!("{what} contains an interior NUL byte")))
}
