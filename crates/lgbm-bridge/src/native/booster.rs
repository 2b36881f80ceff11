//! Engine-side model: training updates, evaluation, prediction and export.

use std::ffi::c_int;
use std::path::Path;
use std::ptr;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::api::{
    CsrMatrix, DenseMatrix, Engine, ImportanceType, NativeFloat, PredictKind, RawHandle, c_string,
    check,
};
use super::buffer::{NameFetch, fetch_growable, fetch_names, fill_growable, text_until_nul, written_len};
use super::dataset::Dataset;
use super::handle::{HandleKind, NativeHandle};
use crate::params::Parameters;
use crate::{Error, Result};

/// Initial guess for serialized model text.
const MODEL_TEXT_CAPACITY: usize = 1 << 20;

/// Iteration limit meaning "use every iteration".
const ALL_ITERATIONS: c_int = -1;

/// Header of the engine's JSON model dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    pub num_class: usize,
    pub num_tree_per_iteration: usize,
    #[serde(default)]
    pub label_index: usize,
    pub max_feature_idx: usize,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Per-tree records left untyped.
    #[serde(default)]
    pub tree_info: Vec<serde_json::Value>,
}

impl ModelSummary {
    pub fn num_trees(&self) -> usize {
        self.tree_info.len()
    }

    pub fn num_features(&self) -> usize {
        self.max_feature_idx + 1
    }
}

/// A gradient-boosted model held by the engine.
///
/// Built from a training [`Dataset`] (plus an optional validation set), or
/// loaded from serialized model text. At most one metric may be active.
#[derive(Debug)]
pub struct Booster {
    handle: NativeHandle,
    params: Option<Parameters>,
    /// `-1` until training records one.
    best_iteration: i32,
    has_validation: bool,
    has_single_metric: bool,
}

impl Booster {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Create a booster over `train`, optionally evaluating on `valid`.
    ///
    /// The engine keeps reading both datasets while training; keep them
    /// open until the last [`update`](Self::update).
    ///
    /// # Errors
    ///
    /// - `Consistency` if either dataset was built with different common or
    ///   dataset records, or the configuration implies two or more metrics
    /// - `Native` if the engine rejects creation
    pub fn new(params: &Parameters, train: &Dataset, valid: Option<&Dataset>) -> Result<Self> {
        Self::check_dataset(params, train, "training")?;
        if let Some(valid) = valid {
            Self::check_dataset(params, valid, "validation")?;
            if !std::sync::Arc::ptr_eq(valid.engine(), train.engine()) {
                return Err(Error::InvalidArgument(
                    "validation dataset belongs to a different engine".into(),
                ));
            }
        }
        let implied = params.objective.implied_metric_count();
        if implied >= 2 {
            return Err(Error::Consistency(format!(
                "configuration implies {implied} metrics, at most one is supported"
            )));
        }

        let engine = train.engine().clone();
        let param_text = c_string(&params.to_param_string(), "booster parameters")?;
        let mut out: RawHandle = ptr::null_mut();
        let status = engine.booster_create(train.open_handle()?, &param_text, &mut out);
        check(engine.as_ref(), "LGBM_BoosterCreate", status)?;
        let handle = NativeHandle::adopt(engine, HandleKind::Booster, out);

        let mut booster = Self {
            handle,
            params: Some(params.clone()),
            best_iteration: -1,
            has_validation: false,
            has_single_metric: false,
        };
        if let Some(valid) = valid {
            let status = booster
                .handle
                .api()
                .booster_add_valid_data(booster.handle.raw(), valid.open_handle()?);
            check(booster.handle.api(), "LGBM_BoosterAddValidData", status)?;
            booster.has_validation = true;
        }

        let metrics = booster.eval_count()?;
        if metrics >= 2 {
            // Dropping `booster` frees the fresh handle.
            return Err(Error::Consistency(format!(
                "engine reports {metrics} metrics, at most one is supported"
            )));
        }
        booster.has_single_metric = metrics == 1;
        tracing::debug!(metrics, has_validation = booster.has_validation, "booster created");
        Ok(booster)
    }

    fn check_dataset(params: &Parameters, data: &Dataset, role: &str) -> Result<()> {
        if data.common_params() != &params.common {
            return Err(Error::Consistency(format!(
                "{role} dataset was built with different common parameters"
            )));
        }
        if data.dataset_params() != &params.dataset {
            return Err(Error::Consistency(format!(
                "{role} dataset was built with different dataset parameters"
            )));
        }
        Ok(())
    }

    fn loaded(engine: &Engine, raw: RawHandle) -> Result<Self> {
        let mut booster = Self {
            handle: NativeHandle::adopt(engine.clone(), HandleKind::Booster, raw),
            params: None,
            best_iteration: -1,
            has_validation: false,
            has_single_metric: false,
        };
        booster.has_single_metric = booster.eval_count()? == 1;
        Ok(booster)
    }

    /// Load a model from its text serialization.
    pub fn from_model_string(engine: &Engine, model: &str) -> Result<Self> {
        let text = c_string(model, "model text")?;
        let mut iterations: c_int = 0;
        let mut out: RawHandle = ptr::null_mut();
        let status = engine.booster_load_model_from_string(&text, &mut iterations, &mut out);
        check(engine.as_ref(), "LGBM_BoosterLoadModelFromString", status)?;
        tracing::debug!(iterations, "booster loaded from string");
        Self::loaded(engine, out)
    }

    /// Load a model file written by [`save_model`](Self::save_model).
    pub fn from_model_file(engine: &Engine, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = path
            .to_str()
            .ok_or_else(|| Error::InvalidArgument(format!("path is not UTF-8: {}", path.display())))?;
        let filename = c_string(text, "path")?;
        let mut iterations: c_int = 0;
        let mut out: RawHandle = ptr::null_mut();
        let status = engine.booster_create_from_modelfile(&filename, &mut iterations, &mut out);
        check(engine.as_ref(), "LGBM_BoosterCreateFromModelfile", status)?;
        tracing::debug!(iterations, path = %path.display(), "booster loaded from file");
        Self::loaded(engine, out)
    }

    // =========================================================================
    // Flags and counts
    // =========================================================================

    fn open_handle(&self) -> Result<RawHandle> {
        if self.handle.is_open() {
            Ok(self.handle.raw())
        } else {
            Err(Error::InvalidArgument("booster has been closed".into()))
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    /// Parameters the booster was created with; `None` for loaded models.
    pub fn params(&self) -> Option<&Parameters> {
        self.params.as_ref()
    }

    pub fn has_validation(&self) -> bool {
        self.has_validation
    }

    pub fn has_single_metric(&self) -> bool {
        self.has_single_metric
    }

    /// Best iteration recorded by early stopping, if any.
    pub fn best_iteration(&self) -> Option<i32> {
        (self.best_iteration >= 0).then_some(self.best_iteration)
    }

    pub(crate) fn set_best_iteration(&mut self, iteration: i32) {
        self.best_iteration = iteration;
    }

    fn resolve_iteration(&self, num_iteration: Option<i32>) -> c_int {
        match num_iteration {
            Some(n) => n,
            None if self.best_iteration > 0 => self.best_iteration,
            None => ALL_ITERATIONS,
        }
    }

    fn query_int(
        &self,
        operation: &'static str,
        call: impl Fn(RawHandle, &mut c_int) -> c_int,
    ) -> Result<usize> {
        let mut out: c_int = 0;
        check(self.handle.api(), operation, call(self.open_handle()?, &mut out))?;
        usize::try_from(out).map_err(|_| Error::Protocol {
            operation,
            detail: format!("negative count {out}"),
        })
    }

    pub fn num_classes(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_int("LGBM_BoosterGetNumClasses", |h, o| api.booster_get_num_classes(h, o))
    }

    pub fn num_features(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_int("LGBM_BoosterGetNumFeature", |h, o| api.booster_get_num_feature(h, o))
    }

    pub fn current_iteration(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_int("LGBM_BoosterGetCurrentIteration", |h, o| {
            api.booster_get_current_iteration(h, o)
        })
    }

    pub fn num_models_per_iteration(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_int("LGBM_BoosterNumModelPerIteration", |h, o| {
            api.booster_num_model_per_iteration(h, o)
        })
    }

    pub fn num_total_models(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_int("LGBM_BoosterNumberOfTotalModel", |h, o| {
            api.booster_number_of_total_model(h, o)
        })
    }

    /// Number of metric values reported per dataset.
    pub fn eval_count(&self) -> Result<usize> {
        let api = self.handle.api();
        self.query_int("LGBM_BoosterGetEvalCounts", |h, o| api.booster_get_eval_counts(h, o))
    }

    pub fn eval_names(&self) -> Result<Vec<String>> {
        let expected = self.eval_count()?;
        let raw = self.open_handle()?;
        let api = self.handle.api();
        fetch_names("LGBM_BoosterGetEvalNames", expected, |buffers| {
            let (mut count, mut required) = (0, 0);
            check(
                api,
                "LGBM_BoosterGetEvalNames",
                api.booster_get_eval_names(raw, buffers, &mut count, &mut required),
            )?;
            Ok(NameFetch { count, required_len: required })
        })
    }

    pub fn feature_names(&self) -> Result<Vec<String>> {
        let expected = self.num_features()?;
        let raw = self.open_handle()?;
        let api = self.handle.api();
        fetch_names("LGBM_BoosterGetFeatureNames", expected, |buffers| {
            let (mut count, mut required) = (0, 0);
            check(
                api,
                "LGBM_BoosterGetFeatureNames",
                api.booster_get_feature_names(raw, buffers, &mut count, &mut required),
            )?;
            Ok(NameFetch { count, required_len: required })
        })
    }

    // =========================================================================
    // Training
    // =========================================================================

    /// Run one boosting iteration. Returns `true` when the engine can make
    /// no further progress.
    pub fn update(&mut self) -> Result<bool> {
        let mut finished: c_int = 0;
        let status = self.handle.api().booster_update_one_iter(self.open_handle()?, &mut finished);
        check(self.handle.api(), "LGBM_BoosterUpdateOneIter", status)?;
        Ok(finished != 0)
    }

    /// Run one iteration with caller-supplied gradients and hessians.
    ///
    /// Both slices must match the training score length (rows times models
    /// per iteration).
    pub fn update_custom(&mut self, grad: &[f32], hess: &[f32]) -> Result<bool> {
        let expected = self.num_predict(0)?;
        if grad.len() != expected || hess.len() != expected {
            return Err(Error::InvalidArgument(format!(
                "gradients have {} / {} entries, expected {expected}",
                grad.len(),
                hess.len()
            )));
        }
        let mut finished: c_int = 0;
        // SAFETY: both slices hold exactly `num_predict(0)` values.
        let status = unsafe {
            self.handle
                .api()
                .booster_update_one_iter_custom(self.open_handle()?, grad, hess, &mut finished)
        };
        check(self.handle.api(), "LGBM_BoosterUpdateOneIterCustom", status)?;
        Ok(finished != 0)
    }

    /// Drop the most recent iteration.
    pub fn rollback_one_iter(&mut self) -> Result<()> {
        let status = self.handle.api().booster_rollback_one_iter(self.open_handle()?);
        check(self.handle.api(), "LGBM_BoosterRollbackOneIter", status)
    }

    /// All metric values for dataset `data_idx` (0 = training, 1 = validation).
    pub fn eval(&self, data_idx: usize) -> Result<Vec<f64>> {
        let count = self.eval_count()?;
        let mut out = vec![0.0; count];
        let mut out_len: c_int = 0;
        // SAFETY: `out` holds `eval_count` values.
        let status = unsafe {
            self.handle
                .api()
                .booster_get_eval(self.open_handle()?, data_idx as c_int, &mut out_len, &mut out)
        };
        check(self.handle.api(), "LGBM_BoosterGetEval", status)?;
        if usize::try_from(out_len).ok() != Some(count) {
            return Err(Error::Protocol {
                operation: "LGBM_BoosterGetEval",
                detail: format!("expected {count} values, engine wrote {out_len}"),
            });
        }
        Ok(out)
    }

    fn single_metric(&self, data_idx: usize) -> Result<f64> {
        if !self.has_single_metric {
            return Err(Error::Consistency("no metric is configured".into()));
        }
        self.eval(data_idx)?
            .first()
            .copied()
            .ok_or_else(|| Error::Consistency("no metric is configured".into()))
    }

    /// The single metric on the training data.
    pub fn eval_train(&self) -> Result<f64> {
        self.single_metric(0)
    }

    /// The single metric on the validation data.
    pub fn eval_valid(&self) -> Result<f64> {
        if !self.has_validation {
            return Err(Error::Consistency("booster has no validation dataset".into()));
        }
        self.single_metric(1)
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    fn num_predict(&self, data_idx: usize) -> Result<usize> {
        let mut len: i64 = 0;
        let status =
            self.handle
                .api()
                .booster_get_num_predict(self.open_handle()?, data_idx as c_int, &mut len);
        check(self.handle.api(), "LGBM_BoosterGetNumPredict", status)?;
        usize::try_from(len).map_err(|_| Error::Protocol {
            operation: "LGBM_BoosterGetNumPredict",
            detail: format!("negative length {len}"),
        })
    }

    /// Current raw scores the engine holds for dataset `data_idx`.
    pub fn inner_predictions(&self, data_idx: usize) -> Result<Vec<f64>> {
        let expected = self.num_predict(data_idx)?;
        let mut out = vec![0.0; expected];
        let mut out_len: i64 = 0;
        // SAFETY: `out` holds `num_predict(data_idx)` values.
        let status = unsafe {
            self.handle
                .api()
                .booster_get_predict(self.open_handle()?, data_idx as c_int, &mut out_len, &mut out)
        };
        check(self.handle.api(), "LGBM_BoosterGetPredict", status)?;
        if usize::try_from(out_len).ok() != Some(expected) {
            return Err(Error::Protocol {
                operation: "LGBM_BoosterGetPredict",
                detail: format!("expected {expected} values, engine wrote {out_len}"),
            });
        }
        Ok(out)
    }

    fn calc_num_predict(&self, rows: usize, kind: PredictKind, num_iteration: c_int) -> Result<usize> {
        let rows = c_int::try_from(rows)
            .map_err(|_| Error::InvalidArgument(format!("row count {rows} too large")))?;
        let mut len: i64 = 0;
        let status = self.handle.api().booster_calc_num_predict(
            self.open_handle()?,
            rows,
            kind.code(),
            0,
            num_iteration,
            &mut len,
        );
        check(self.handle.api(), "LGBM_BoosterCalcNumPredict", status)?;
        usize::try_from(len).map_err(|_| Error::Protocol {
            operation: "LGBM_BoosterCalcNumPredict",
            detail: format!("negative length {len}"),
        })
    }

    /// Predict into `out`, reusing its allocation when large enough.
    ///
    /// Returns the number of output columns per row. `num_iteration` of
    /// `None` uses the recorded best iteration, or every iteration.
    pub fn predict_into<T: NativeFloat>(
        &self,
        data: ArrayView2<'_, T>,
        kind: PredictKind,
        num_iteration: Option<i32>,
        out: &mut Vec<f64>,
    ) -> Result<usize> {
        let (nrow, ncol) = data.dim();
        let staged: std::borrow::Cow<'_, [T]> = match data.to_slice() {
            Some(s) => s.into(),
            None => data.iter().copied().collect::<Vec<_>>().into(),
        };
        let matrix = DenseMatrix::new(T::matrix_data(&staged), nrow, ncol, true)?;
        let iteration = self.resolve_iteration(num_iteration);
        let required = self.calc_num_predict(nrow, kind, iteration)?;
        let raw = self.open_handle()?;
        let api = self.handle.api();

        fill_growable("LGBM_BoosterPredictForMat", out, required, |buf| {
            let mut out_len: i64 = 0;
            // SAFETY: `buf` holds at least `calc_num_predict` values for this
            // row count, kind and iteration limit.
            let status = unsafe {
                api.booster_predict_for_mat(
                    raw,
                    matrix,
                    kind.code(),
                    0,
                    iteration,
                    c"",
                    &mut out_len,
                    buf,
                )
            };
            check(api, "LGBM_BoosterPredictForMat", status)?;
            written_len("LGBM_BoosterPredictForMat", out_len)
        })?;
        Ok(if nrow == 0 { 0 } else { out.len() / nrow })
    }

    /// Predict a dense matrix, one output row per input row.
    pub fn predict<T: NativeFloat>(
        &self,
        data: ArrayView2<'_, T>,
        kind: PredictKind,
        num_iteration: Option<i32>,
    ) -> Result<Array2<f64>> {
        let nrow = data.nrows();
        let mut out = Vec::new();
        let cols = self.predict_into(data, kind, num_iteration, &mut out)?;
        Array2::from_shape_vec((nrow, cols), out).map_err(|e| Error::Protocol {
            operation: "LGBM_BoosterPredictForMat",
            detail: e.to_string(),
        })
    }

    /// Predict a CSR matrix.
    pub fn predict_csr(
        &self,
        csr: CsrMatrix<'_>,
        kind: PredictKind,
        num_iteration: Option<i32>,
    ) -> Result<Array2<f64>> {
        let nrow = csr.nrow();
        let iteration = self.resolve_iteration(num_iteration);
        let required = self.calc_num_predict(nrow, kind, iteration)?;
        let raw = self.open_handle()?;
        let api = self.handle.api();

        let out = fetch_growable("LGBM_BoosterPredictForCSR", required, |buf| {
            let mut out_len: i64 = 0;
            // SAFETY: `buf` holds at least `calc_num_predict` values.
            let status = unsafe {
                api.booster_predict_for_csr(raw, csr, kind.code(), 0, iteration, c"", &mut out_len, buf)
            };
            check(api, "LGBM_BoosterPredictForCSR", status)?;
            written_len("LGBM_BoosterPredictForCSR", out_len)
        })?;
        let cols = if nrow == 0 { 0 } else { out.len() / nrow };
        Array2::from_shape_vec((nrow, cols), out).map_err(|e| Error::Protocol {
            operation: "LGBM_BoosterPredictForCSR",
            detail: e.to_string(),
        })
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    fn fetch_text(
        &self,
        operation: &'static str,
        num_iteration: Option<i32>,
        importance: ImportanceType,
        dump: bool,
    ) -> Result<String> {
        let raw = self.open_handle()?;
        let api = self.handle.api();
        let iteration = self.resolve_iteration(num_iteration);
        let bytes = fetch_growable(operation, MODEL_TEXT_CAPACITY, |buf: &mut [u8]| {
            let mut out_len: i64 = 0;
            let status = if dump {
                api.booster_dump_model(raw, 0, iteration, importance.code(), buf, &mut out_len)
            } else {
                api.booster_save_model_to_string(raw, 0, iteration, importance.code(), buf, &mut out_len)
            };
            check(api, operation, status)?;
            written_len(operation, out_len)
        })?;
        text_until_nul(operation, &bytes)
    }

    /// Serialize the model to the engine's text format.
    pub fn save_model_to_string(
        &self,
        num_iteration: Option<i32>,
        importance: ImportanceType,
    ) -> Result<String> {
        self.fetch_text("LGBM_BoosterSaveModelToString", num_iteration, importance, false)
    }

    /// Write the model text to `path`.
    pub fn save_model(
        &self,
        path: impl AsRef<Path>,
        num_iteration: Option<i32>,
        importance: ImportanceType,
    ) -> Result<()> {
        let path = path.as_ref();
        let text = path
            .to_str()
            .ok_or_else(|| Error::InvalidArgument(format!("path is not UTF-8: {}", path.display())))?;
        let filename = c_string(text, "path")?;
        let status = self.handle.api().booster_save_model(
            self.open_handle()?,
            0,
            self.resolve_iteration(num_iteration),
            importance.code(),
            &filename,
        );
        check(self.handle.api(), "LGBM_BoosterSaveModel", status)
    }

    /// The engine's JSON model dump.
    pub fn dump_model(&self, num_iteration: Option<i32>) -> Result<serde_json::Value> {
        let text = self.fetch_text(
            "LGBM_BoosterDumpModel",
            num_iteration,
            ImportanceType::Split,
            true,
        )?;
        serde_json::from_str(&text).map_err(|e| Error::Protocol {
            operation: "LGBM_BoosterDumpModel",
            detail: format!("model dump is not valid JSON: {e}"),
        })
    }

    /// Typed header of the JSON dump.
    pub fn model_summary(&self) -> Result<ModelSummary> {
        serde_json::from_value(self.dump_model(None)?).map_err(|e| Error::Protocol {
            operation: "LGBM_BoosterDumpModel",
            detail: format!("unexpected model dump layout: {e}"),
        })
    }

    // =========================================================================
    // Leaves and importance
    // =========================================================================

    fn leaf_indices(tree: usize, leaf: usize) -> Result<(c_int, c_int)> {
        let tree = c_int::try_from(tree)
            .map_err(|_| Error::InvalidArgument(format!("tree index {tree} too large")))?;
        let leaf = c_int::try_from(leaf)
            .map_err(|_| Error::InvalidArgument(format!("leaf index {leaf} too large")))?;
        Ok((tree, leaf))
    }

    pub fn leaf_value(&self, tree: usize, leaf: usize) -> Result<f64> {
        let (tree, leaf) = Self::leaf_indices(tree, leaf)?;
        let mut value = 0.0;
        let status = self
            .handle
            .api()
            .booster_get_leaf_value(self.open_handle()?, tree, leaf, &mut value);
        check(self.handle.api(), "LGBM_BoosterGetLeafValue", status)?;
        Ok(value)
    }

    pub fn set_leaf_value(&mut self, tree: usize, leaf: usize, value: f64) -> Result<()> {
        let (tree, leaf) = Self::leaf_indices(tree, leaf)?;
        let status = self
            .handle
            .api()
            .booster_set_leaf_value(self.open_handle()?, tree, leaf, value);
        check(self.handle.api(), "LGBM_BoosterSetLeafValue", status)
    }

    /// Per-feature importance. With `normalize`, values sum to 1 unless all
    /// are zero.
    pub fn feature_importance(
        &self,
        kind: ImportanceType,
        normalize: bool,
        num_iteration: Option<i32>,
    ) -> Result<Vec<f64>> {
        let mut out = vec![0.0; self.num_features()?];
        // SAFETY: `out` holds `num_features` values.
        let status = unsafe {
            self.handle.api().booster_feature_importance(
                self.open_handle()?,
                self.resolve_iteration(num_iteration),
                kind.code(),
                &mut out,
            )
        };
        check(self.handle.api(), "LGBM_BoosterFeatureImportance", status)?;
        if normalize {
            let total: f64 = out.iter().sum();
            if total > 0.0 {
                out.iter_mut().for_each(|v| *v /= total);
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Release the engine resource. Safe to call repeatedly.
    pub fn close(&mut self) -> Result<()> {
        self.handle.release()
    }
}
