//! Engine-side training data.

use std::borrow::Cow;
use std::ffi::{CStr, CString, c_int};
use std::path::Path;
use std::ptr;

use ndarray::{ArrayView1, ArrayView2};

use super::api::{
    CsrMatrix, DenseMatrix, Engine, FieldData, FieldValues, NativeFloat, RawHandle, c_string, check,
};
use super::buffer::{NameFetch, fetch_names};
use super::handle::{HandleKind, NativeHandle};
use super::sample::ColumnSample;
use crate::params::{CommonParams, DatasetParams, Parameters, dataset_param_string};
use crate::{Error, Result};

const LABEL: &CStr = c"label";
const WEIGHT: &CStr = c"weight";
const GROUP: &CStr = c"group";
const INIT_SCORE: &CStr = c"init_score";

/// Binned training data owned by the engine.
///
/// Holds the common and dataset records it was built with; a
/// [`Booster`](super::Booster) refuses datasets built with different ones.
/// Row and feature counts are fixed at creation and re-queried from the
/// engine on every access.
#[derive(Debug)]
pub struct Dataset {
    handle: NativeHandle,
    common: CommonParams,
    params: DatasetParams,
}

/// Dense matrix data laid out for a single engine call.
struct DenseInput<'a, T: Clone> {
    data: Cow<'a, [T]>,
    nrow: usize,
    ncol: usize,
    row_major: bool,
}

impl<'a, T: NativeFloat> DenseInput<'a, T> {
    /// Borrow the view's memory when it is contiguous in either order.
    fn from_view(view: ArrayView2<'a, T>) -> Self {
        let (nrow, ncol) = view.dim();
        if let Some(slice) = view.to_slice() {
            return Self { data: Cow::Borrowed(slice), nrow, ncol, row_major: true };
        }
        if let Some(slice) = view.reversed_axes().to_slice() {
            return Self { data: Cow::Borrowed(slice), nrow, ncol, row_major: false };
        }
        Self {
            data: Cow::Owned(view.iter().copied().collect()),
            nrow,
            ncol,
            row_major: true,
        }
    }

    fn matrix(&self) -> Result<DenseMatrix<'_>> {
        DenseMatrix::new(T::matrix_data(&self.data), self.nrow, self.ncol, self.row_major)
    }
}

fn bin_path(path: &Path) -> Result<CString> {
    if path.extension().and_then(|e| e.to_str()) != Some("bin") {
        return Err(Error::InvalidArgument(format!(
            "binary dataset files must use the .bin extension: {}",
            path.display()
        )));
    }
    let text = path
        .to_str()
        .ok_or_else(|| Error::InvalidArgument(format!("path is not UTF-8: {}", path.display())))?;
    c_string(text, "path")
}

fn reference_handle(engine: &Engine, reference: Option<&Dataset>) -> Result<RawHandle> {
    match reference {
        None => Ok(ptr::null_mut()),
        Some(r) if !std::sync::Arc::ptr_eq(r.handle.engine(), engine) => Err(
            Error::InvalidArgument("reference dataset belongs to a different engine".into()),
        ),
        Some(r) => r.open_handle(),
    }
}

impl Dataset {
    // =========================================================================
    // Construction
    // =========================================================================

    fn adopt(engine: &Engine, raw: RawHandle, params: &Parameters) -> Self {
        Self {
            handle: NativeHandle::adopt(engine.clone(), HandleKind::Dataset, raw),
            common: params.common.clone(),
            params: params.dataset.clone(),
        }
    }

    fn param_cstring(params: &Parameters) -> Result<CString> {
        c_string(&params.dataset_param_string(), "dataset parameters")
    }

    /// Fail unless the engine reports the expected shape.
    fn expect_shape(self, rows: usize, features: usize) -> Result<Self> {
        let (got_rows, got_features) = (self.num_rows()?, self.num_features()?);
        if (got_rows, got_features) != (rows, features) {
            return Err(Error::Protocol {
                operation: "LGBM_DatasetGetNumData",
                detail: format!(
                    "engine built a {got_rows} x {got_features} dataset from {rows} x {features} input"
                ),
            });
        }
        Ok(self)
    }

    /// Build from a dense matrix.
    ///
    /// Contiguous views in row- or column-major order are passed without
    /// copying. `reference` aligns bin boundaries with an existing dataset,
    /// which validation data needs.
    pub fn from_mat<T: NativeFloat>(
        engine: &Engine,
        data: ArrayView2<'_, T>,
        params: &Parameters,
        reference: Option<&Dataset>,
    ) -> Result<Self> {
        let input = DenseInput::from_view(data);
        let matrix = input.matrix()?;
        let reference = reference_handle(engine, reference)?;
        let param_text = Self::param_cstring(params)?;

        let mut out: RawHandle = ptr::null_mut();
        let status = engine.dataset_create_from_mat(matrix, &param_text, reference, &mut out);
        check(engine.as_ref(), "LGBM_DatasetCreateFromMat", status)?;
        Self::adopt(engine, out, params).expect_shape(input.nrow, input.ncol)
    }

    /// Build from a list of equal-length rows, one single-row matrix each.
    pub fn from_rows<T: NativeFloat>(
        engine: &Engine,
        rows: &[ArrayView1<'_, T>],
        params: &Parameters,
        reference: Option<&Dataset>,
    ) -> Result<Self> {
        let ncol = rows.first().map_or(0, |r| r.len());
        if rows.is_empty() || ncol == 0 {
            return Err(Error::InvalidArgument("at least one non-empty row is required".into()));
        }
        if let Some(idx) = rows.iter().position(|r| r.len() != ncol) {
            return Err(Error::InvalidArgument(format!(
                "row {idx} has {} values, expected {ncol}",
                rows[idx].len()
            )));
        }
        let staged: Vec<Cow<'_, [T]>> = rows
            .iter()
            .map(|r| r.to_slice().map_or_else(|| Cow::Owned(r.to_vec()), Cow::Borrowed))
            .collect();
        let mats = staged
            .iter()
            .map(|r| DenseMatrix::new(T::matrix_data(r), 1, ncol, true))
            .collect::<Result<Vec<_>>>()?;
        let reference = reference_handle(engine, reference)?;
        let param_text = Self::param_cstring(params)?;

        let mut out: RawHandle = ptr::null_mut();
        let status = engine.dataset_create_from_mats(&mats, &param_text, reference, &mut out);
        check(engine.as_ref(), "LGBM_DatasetCreateFromMats", status)?;
        Self::adopt(engine, out, params).expect_shape(rows.len(), ncol)
    }

    /// Build from a CSR matrix.
    pub fn from_csr(
        engine: &Engine,
        csr: CsrMatrix<'_>,
        params: &Parameters,
        reference: Option<&Dataset>,
    ) -> Result<Self> {
        let reference = reference_handle(engine, reference)?;
        let param_text = Self::param_cstring(params)?;

        let mut out: RawHandle = ptr::null_mut();
        let status = engine.dataset_create_from_csr(csr, &param_text, reference, &mut out);
        check(engine.as_ref(), "LGBM_DatasetCreateFromCSR", status)?;
        Self::adopt(engine, out, params).expect_shape(csr.nrow(), csr.num_col() as usize)
    }

    /// Build bin boundaries from a column sample, sized for `num_total_rows`.
    ///
    /// The returned dataset has no row data yet; fill it with
    /// [`push_rows`](Self::push_rows).
    pub fn from_sampled_columns(
        engine: &Engine,
        sample: &ColumnSample,
        num_total_rows: usize,
        params: &Parameters,
    ) -> Result<Self> {
        let total = i32::try_from(num_total_rows).map_err(|_| {
            Error::InvalidArgument(format!("row count {num_total_rows} exceeds the engine's i32 range"))
        })?;
        let values: Vec<&[f64]> = sample.values().iter().map(Vec::as_slice).collect();
        let indices: Vec<&[i32]> = sample.indices().iter().map(Vec::as_slice).collect();
        let param_text = Self::param_cstring(params)?;

        let mut out: RawHandle = ptr::null_mut();
        let status = engine.dataset_create_from_sampled_column(
            &values,
            &indices,
            sample.num_sample_rows() as i32,
            total,
            &param_text,
            &mut out,
        );
        check(engine.as_ref(), "LGBM_DatasetCreateFromSampledColumn", status)?;
        Self::adopt(engine, out, params).expect_shape(num_total_rows, sample.num_columns())
    }

    /// An empty dataset with `reference`'s bin layout and records.
    pub fn empty_like(reference: &Dataset, num_total_rows: usize) -> Result<Self> {
        let engine = reference.handle.engine().clone();
        let total = i64::try_from(num_total_rows)
            .map_err(|_| Error::InvalidArgument(format!("row count {num_total_rows} too large")))?;

        let mut out: RawHandle = ptr::null_mut();
        let status = engine.dataset_create_by_reference(reference.open_handle()?, total, &mut out);
        check(engine.as_ref(), "LGBM_DatasetCreateByReference", status)?;
        Ok(Self {
            handle: NativeHandle::adopt(engine, HandleKind::Dataset, out),
            common: reference.common.clone(),
            params: reference.params.clone(),
        })
    }

    /// Load an engine binary cache file (`.bin`).
    pub fn from_binary_file(
        engine: &Engine,
        path: impl AsRef<Path>,
        params: &Parameters,
        reference: Option<&Dataset>,
    ) -> Result<Self> {
        let filename = bin_path(path.as_ref())?;
        let reference = reference_handle(engine, reference)?;
        let param_text = Self::param_cstring(params)?;

        let mut out: RawHandle = ptr::null_mut();
        let status = engine.dataset_create_from_file(&filename, &param_text, reference, &mut out);
        check(engine.as_ref(), "LGBM_DatasetCreateFromFile", status)?;
        Ok(Self::adopt(engine, out, params))
    }

    /// Stream rows into a dataset created by
    /// [`from_sampled_columns`](Self::from_sampled_columns) or
    /// [`empty_like`](Self::empty_like).
    pub fn push_rows<T: NativeFloat>(&mut self, data: ArrayView2<'_, T>, start_row: usize) -> Result<()> {
        let (nrow, ncol) = data.dim();
        let (rows, features) = (self.num_rows()?, self.num_features()?);
        if ncol != features {
            return Err(Error::InvalidArgument(format!(
                "pushed rows have {ncol} features, dataset has {features}"
            )));
        }
        if start_row.checked_add(nrow).is_none_or(|end| end > rows) {
            return Err(Error::InvalidArgument(format!(
                "rows {start_row}..{} exceed the dataset's {rows} rows",
                start_row.saturating_add(nrow)
            )));
        }
        // The engine only accepts row-major pushes.
        let staged: Cow<'_, [T]> = match data.to_slice() {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(data.iter().copied().collect()),
        };
        let matrix = DenseMatrix::new(T::matrix_data(&staged), nrow, ncol, true)?;
        let raw = self.open_handle()?;
        let status = self.handle.api().dataset_push_rows(raw, matrix, start_row as i32);
        check(self.handle.api(), "LGBM_DatasetPushRows", status)
    }

    /// Write the engine's binary cache file (`.bin`).
    pub fn save_binary(&self, path: impl AsRef<Path>) -> Result<()> {
        let filename = bin_path(path.as_ref())?;
        let status = self.handle.api().dataset_save_binary(self.open_handle()?, &filename);
        check(self.handle.api(), "LGBM_DatasetSaveBinary", status)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub(crate) fn open_handle(&self) -> Result<RawHandle> {
        if self.handle.is_open() {
            Ok(self.handle.raw())
        } else {
            Err(Error::InvalidArgument("dataset has been closed".into()))
        }
    }

    pub(crate) fn engine(&self) -> &Engine {
        self.handle.engine()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    pub fn common_params(&self) -> &CommonParams {
        &self.common
    }

    pub fn dataset_params(&self) -> &DatasetParams {
        &self.params
    }

    /// The engine string this dataset was built with.
    pub fn param_string(&self) -> String {
        dataset_param_string(&self.common, &self.params)
    }

    fn query_count(&self, operation: &'static str, call: impl Fn(RawHandle, &mut c_int) -> c_int) -> Result<usize> {
        let mut out: c_int = 0;
        check(self.handle.api(), operation, call(self.open_handle()?, &mut out))?;
        usize::try_from(out).map_err(|_| Error::Protocol {
            operation,
            detail: format!("negative count {out}"),
        })
    }

    pub fn num_rows(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_count("LGBM_DatasetGetNumData", |h, out| api.dataset_get_num_data(h, out))
    }

    pub fn num_features(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_count("LGBM_DatasetGetNumFeature", |h, out| api.dataset_get_num_feature(h, out))
    }

    // =========================================================================
    // Per-row fields
    // =========================================================================

    fn set_field(&mut self, name: &CStr, data: FieldData<'_>) -> Result<()> {
        let raw = self.open_handle()?;
        let status = self.handle.api().dataset_set_field(raw, name, data);
        check(self.handle.api(), "LGBM_DatasetSetField", status)
    }

    fn get_field(&self, name: &CStr) -> Result<Option<FieldValues>> {
        let mut out = None;
        let status = self.handle.api().dataset_get_field(self.open_handle()?, name, &mut out);
        check(self.handle.api(), "LGBM_DatasetGetField", status)?;
        Ok(out.filter(|values| match values {
            FieldValues::F32(v) => !v.is_empty(),
            FieldValues::F64(v) => !v.is_empty(),
            FieldValues::I32(v) => !v.is_empty(),
        }))
    }

    fn expect_rows(&self, field: &str, len: usize) -> Result<()> {
        let rows = self.num_rows()?;
        if len != rows {
            return Err(Error::InvalidArgument(format!(
                "{field} has {len} entries, dataset has {rows} rows"
            )));
        }
        Ok(())
    }

    /// Replace the labels. Length must equal the row count.
    pub fn set_label(&mut self, label: &[f32]) -> Result<()> {
        self.expect_rows("label", label.len())?;
        self.set_field(LABEL, FieldData::F32(label))
    }

    /// Replace the sample weights; `None` or empty restores unit weights.
    pub fn set_weights(&mut self, weights: Option<&[f32]>) -> Result<()> {
        let weights = weights.unwrap_or_default();
        if !weights.is_empty() {
            self.expect_rows("weights", weights.len())?;
        }
        self.set_field(WEIGHT, FieldData::F32(weights))
    }

    /// Replace the query group sizes; `None` or empty clears grouping.
    ///
    /// Sizes must be positive and sum to the row count.
    pub fn set_groups(&mut self, groups: Option<&[i32]>) -> Result<()> {
        let groups = groups.unwrap_or_default();
        if !groups.is_empty() {
            if groups.iter().any(|&g| g <= 0) {
                return Err(Error::InvalidArgument("group sizes must be positive".into()));
            }
            let total: i64 = groups.iter().map(|&g| i64::from(g)).sum();
            self.expect_rows("groups (summed)", total as usize)?;
        }
        self.set_field(GROUP, FieldData::I32(groups))
    }

    /// Replace the initial scores; `None` or empty clears them.
    ///
    /// Multiclass data carries one score per row and class, so the length
    /// must be a multiple of the row count.
    pub fn set_init_score(&mut self, scores: Option<&[f64]>) -> Result<()> {
        let scores = scores.unwrap_or_default();
        if !scores.is_empty() {
            let rows = self.num_rows()?;
            if rows == 0 || scores.len() % rows != 0 {
                return Err(Error::InvalidArgument(format!(
                    "init_score has {} entries, not a multiple of {rows} rows",
                    scores.len()
                )));
            }
        }
        self.set_field(INIT_SCORE, FieldData::F64(scores))
    }

    fn unexpected_dtype(field: &str) -> Error {
        Error::Protocol {
            operation: "LGBM_DatasetGetField",
            detail: format!("unexpected dtype for {field}"),
        }
    }

    pub fn label(&self) -> Result<Vec<f32>> {
        match self.get_field(LABEL)? {
            Some(FieldValues::F32(v)) => Ok(v),
            None => Ok(Vec::new()),
            Some(_) => Err(Self::unexpected_dtype("label")),
        }
    }

    pub fn weights(&self) -> Result<Option<Vec<f32>>> {
        match self.get_field(WEIGHT)? {
            Some(FieldValues::F32(v)) => Ok(Some(v)),
            None => Ok(None),
            Some(_) => Err(Self::unexpected_dtype("weight")),
        }
    }

    /// Query group sizes.
    ///
    /// The engine stores cumulative boundaries; they are converted back.
    pub fn groups(&self) -> Result<Option<Vec<i32>>> {
        match self.get_field(GROUP)? {
            Some(FieldValues::I32(bounds)) => {
                Ok(Some(bounds.windows(2).map(|w| w[1] - w[0]).collect()))
            }
            None => Ok(None),
            Some(_) => Err(Self::unexpected_dtype("group")),
        }
    }

    pub fn init_score(&self) -> Result<Option<Vec<f64>>> {
        match self.get_field(INIT_SCORE)? {
            Some(FieldValues::F64(v)) => Ok(Some(v)),
            None => Ok(None),
            Some(_) => Err(Self::unexpected_dtype("init_score")),
        }
    }

    // =========================================================================
    // Feature names
    // =========================================================================

    /// Name every feature. Names must be non-empty and free of whitespace.
    pub fn set_feature_names<S: AsRef<str>>(&mut self, names: &[S]) -> Result<()> {
        let features = self.num_features()?;
        if names.len() != features {
            return Err(Error::InvalidArgument(format!(
                "{} names for {features} features",
                names.len()
            )));
        }
        let owned = names
            .iter()
            .map(|n| {
                let n = n.as_ref();
                if n.is_empty() || n.chars().any(char::is_whitespace) {
                    return Err(Error::InvalidArgument(format!("invalid feature name {n:?}")));
                }
                c_string(n, "feature name")
            })
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&CStr> = owned.iter().map(CString::as_c_str).collect();

        let raw = self.open_handle()?;
        let status = self.handle.api().dataset_set_feature_names(raw, &refs);
        check(self.handle.api(), "LGBM_DatasetSetFeatureNames", status)
    }

    pub fn feature_names(&self) -> Result<Vec<String>> {
        let expected = self.num_features()?;
        let raw = self.open_handle()?;
        let api = self.handle.api();
        fetch_names("LGBM_DatasetGetFeatureNames", expected, |buffers| {
            let mut count: c_int = 0;
            let mut required = 0usize;
            let status = api.dataset_get_feature_names(raw, buffers, &mut count, &mut required);
            check(api, "LGBM_DatasetGetFeatureNames", status)?;
            Ok(NameFetch {
                count,
                required_len: required,
            })
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Release the engine resource. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        self.handle.release()
    }
}
