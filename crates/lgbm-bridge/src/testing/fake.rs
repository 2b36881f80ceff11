//! In-memory engine for tests.

use std::collections::{HashMap, HashSet};
use std::ffi::{CStr, c_int, c_void};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::native::{CsrMatrix, DenseMatrix, FieldData, FieldValues, NativeApi, PredictKind, RawHandle};
use crate::params::{ParamMap, wire};

const OK: c_int = 0;
const FAIL: c_int = -1;

/// Leaves per fake tree.
const LEAVES_PER_TREE: i32 = 2;

/// Score each fake iteration adds to every prediction.
const STEP: f64 = 0.01;

fn handle_of(id: usize) -> RawHandle {
    std::ptr::without_provenance_mut::<c_void>(id)
}

fn id_of(handle: RawHandle) -> usize {
    handle.addr()
}

fn text(value: &CStr) -> String {
    value.to_string_lossy().into_owned()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FakeDataset {
    rows: usize,
    features: usize,
    /// Row-major values.
    values: Vec<f64>,
    label: Vec<f32>,
    weight: Vec<f32>,
    /// Cumulative query boundaries, engine style.
    group: Vec<i32>,
    init_score: Vec<f64>,
    feature_names: Vec<String>,
    params: String,
}

impl FakeDataset {
    fn new(rows: usize, features: usize, params: String) -> Self {
        Self {
            rows,
            features,
            values: vec![0.0; rows * features],
            label: Vec::new(),
            weight: Vec::new(),
            group: Vec::new(),
            init_score: Vec::new(),
            feature_names: (0..features).map(|i| format!("Column_{i}")).collect(),
            params,
        }
    }

    fn from_dense(data: &DenseMatrix<'_>, params: String) -> Self {
        let (rows, features) = (data.nrow() as usize, data.ncol() as usize);
        let mut ds = Self::new(rows, features, params);
        for r in 0..rows {
            for c in 0..features {
                ds.values[r * features + c] = data.get(r, c).unwrap_or(f64::NAN);
            }
        }
        ds
    }

    fn mean_label(&self) -> f64 {
        if self.label.is_empty() {
            0.0
        } else {
            self.label.iter().map(|&v| f64::from(v)).sum::<f64>() / self.label.len() as f64
        }
    }
}

#[derive(Debug, Clone)]
struct FakeBooster {
    train: Option<usize>,
    valid: Option<usize>,
    metric_names: Vec<String>,
    objective: String,
    num_class: usize,
    num_features: usize,
    feature_names: Vec<String>,
    train_rows: usize,
    iterations: usize,
    bias: f64,
    leaf_values: HashMap<(i32, i32), f64>,
}

impl FakeBooster {
    fn total_models(&self) -> usize {
        self.iterations * self.num_class
    }

    fn used_iterations(&self, num_iteration: c_int) -> usize {
        if num_iteration > 0 {
            self.iterations.min(num_iteration as usize)
        } else {
            self.iterations
        }
    }

    fn score(&self, iterations: usize) -> f64 {
        self.bias + STEP * iterations as f64
    }

    fn per_row(&self, kind: c_int, num_iteration: c_int) -> usize {
        let k = self.num_class;
        match kind {
            2 => k * self.used_iterations(num_iteration),
            3 => k * (self.num_features + 1),
            _ => k,
        }
    }

    fn model_text(&self) -> String {
        format!(
            "tree\nversion=v4\nnum_class={}\nnum_tree_per_iteration={}\nmax_feature_idx={}\nobjective={}\nfeature_names={}\niterations={}\n",
            self.num_class,
            self.num_class,
            self.num_features.saturating_sub(1),
            self.objective,
            self.feature_names.join(" "),
            self.iterations,
        )
    }

    fn from_model_text(model: &str) -> Option<Self> {
        let mut fields: HashMap<&str, &str> = HashMap::new();
        let mut lines = model.lines();
        if lines.next()? != "tree" {
            return None;
        }
        for line in lines {
            let (k, v) = line.split_once('=')?;
            fields.insert(k, v);
        }
        let num_class: usize = fields.get("num_class")?.parse().ok()?;
        let num_features = fields.get("max_feature_idx")?.parse::<usize>().ok()? + 1;
        Some(Self {
            train: None,
            valid: None,
            metric_names: Vec::new(),
            objective: fields.get("objective").copied().unwrap_or_default().to_string(),
            num_class,
            num_features,
            feature_names: fields
                .get("feature_names")
                .map(|s| s.split(' ').map(str::to_string).collect())
                .unwrap_or_default(),
            train_rows: 0,
            iterations: fields.get("iterations")?.parse().ok()?,
            bias: 0.0,
            leaf_values: HashMap::new(),
        })
    }

    fn dump_json(&self, num_iteration: c_int) -> String {
        let trees: Vec<_> = (0..self.used_iterations(num_iteration) * self.num_class)
            .map(|i| serde_json::json!({ "tree_index": i, "num_leaves": LEAVES_PER_TREE }))
            .collect();
        serde_json::json!({
            "name": "tree",
            "version": "v4",
            "num_class": self.num_class,
            "num_tree_per_iteration": self.num_class,
            "label_index": 0,
            "max_feature_idx": self.num_features.saturating_sub(1),
            "objective": self.objective,
            "feature_names": self.feature_names,
            "tree_info": trees,
        })
        .to_string()
    }
}

/// Metric names the real engine would report for a parameter string.
fn metric_names(params: &ParamMap) -> Vec<String> {
    let objective = params.get("objective").map_or("regression", String::as_str);
    let positions: Vec<String> = match params.get("eval_at") {
        Some(list) if !list.is_empty() => list.split(',').map(str::to_string).collect(),
        _ => (1..=5).map(|k| k.to_string()).collect(),
    };
    let positional = |base: &str| -> Vec<String> { positions.iter().map(|k| format!("{base}@{k}")).collect() };
    match params.get("metric").map(String::as_str) {
        Some("None" | "na" | "null" | "none") => Vec::new(),
        Some(m @ ("ndcg" | "map")) => positional(m),
        Some(m) if !m.is_empty() => vec![m.to_string()],
        _ => match objective {
            "binary" => vec!["binary_logloss".into()],
            "multiclass" | "multiclassova" => vec!["multi_logloss".into()],
            "lambdarank" | "rank_xendcg" => positional("ndcg"),
            "regression" => vec!["l2".into()],
            other => vec![other.to_string()],
        },
    }
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: usize,
    datasets: HashMap<usize, FakeDataset>,
    boosters: HashMap<usize, FakeBooster>,
    calls: Vec<&'static str>,
    last_error: String,
    fail_on: HashSet<&'static str>,
    train_scores: Vec<f64>,
    valid_scores: Vec<f64>,
    converge_after: Option<usize>,
    network_active: bool,
}

impl FakeState {
    fn enter(&mut self, op: &'static str) -> Result<(), c_int> {
        self.calls.push(op);
        if self.fail_on.contains(op) {
            self.last_error = format!("injected failure in {op}");
            return Err(FAIL);
        }
        Ok(())
    }

    fn fail(&mut self, message: impl Into<String>) -> c_int {
        self.last_error = message.into();
        FAIL
    }

    fn insert_dataset(&mut self, ds: FakeDataset, out: &mut RawHandle) -> c_int {
        self.next_id += 1;
        self.datasets.insert(self.next_id, ds);
        *out = handle_of(self.next_id);
        OK
    }

    fn insert_booster(&mut self, booster: FakeBooster, out: &mut RawHandle) -> c_int {
        self.next_id += 1;
        self.boosters.insert(self.next_id, booster);
        *out = handle_of(self.next_id);
        OK
    }

    fn dataset(&mut self, handle: RawHandle) -> Result<&mut FakeDataset, c_int> {
        let id = id_of(handle);
        if !self.datasets.contains_key(&id) {
            return Err(self.fail(format!("unknown dataset handle {id}")));
        }
        self.datasets.get_mut(&id).ok_or(FAIL)
    }

    fn booster(&mut self, handle: RawHandle) -> Result<&mut FakeBooster, c_int> {
        let id = id_of(handle);
        if !self.boosters.contains_key(&id) {
            return Err(self.fail(format!("unknown booster handle {id}")));
        }
        self.boosters.get_mut(&id).ok_or(FAIL)
    }

    /// Scripted metric after `iterations` trees, or a steadily falling default.
    fn scripted(scores: &[f64], iterations: usize) -> f64 {
        let idx = iterations.saturating_sub(1);
        scores
            .get(idx)
            .or(scores.last())
            .copied()
            .unwrap_or(1.0 / (iterations as f64 + 1.0))
    }

    fn fill_names(names: &[String], buffers: &mut [Vec<u8>], out_count: &mut c_int, out_required_len: &mut usize) {
        *out_count = names.len() as c_int;
        *out_required_len = names.iter().map(|n| n.len() + 1).max().unwrap_or(0);
        for (buf, name) in buffers.iter_mut().zip(names) {
            let mut bytes = name.as_bytes().to_vec();
            bytes.push(0);
            let n = bytes.len().min(buf.len());
            buf[..n].copy_from_slice(&bytes[..n]);
        }
    }

    fn write_text(text: &str, buffer: &mut [u8], out_len: &mut i64) {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        *out_len = bytes.len() as i64;
        if bytes.len() <= buffer.len() {
            buffer[..bytes.len()].copy_from_slice(&bytes);
        }
    }
}

macro_rules! enter {
    ($state:expr, $op:literal) => {
        if let Err(status) = $state.enter($op) {
            return status;
        }
    };
}

macro_rules! found {
    ($lookup:expr) => {
        match $lookup {
            Ok(v) => v,
            Err(status) => return status,
        }
    };
}

/// A [`NativeApi`] that keeps datasets and boosters in memory.
///
/// Mimics the engine closely enough to exercise the wrappers: handle
/// bookkeeping (freeing an unknown handle fails), field storage, the
/// buffer-size protocol, metric names derived from parameters, and
/// predictions that grow by a fixed step per iteration.
///
/// Metric values can be scripted per iteration, convergence can be forced,
/// and any entry point can be made to fail. Every call is logged by its C
/// name.
///
/// ```
/// use std::sync::Arc;
/// use lgbm_bridge::native::{Dataset, Engine};
/// use lgbm_bridge::params::Parameters;
/// use lgbm_bridge::testing::FakeEngine;
///
/// let fake = Arc::new(FakeEngine::new());
/// let engine: Engine = fake.clone();
/// let features = ndarray::Array2::<f32>::zeros((4, 3));
/// let mut data = Dataset::from_mat(&engine, features.view(), &Parameters::default(), None)?;
/// data.close()?;
/// data.close()?;
/// assert_eq!(fake.call_count("LGBM_DatasetFree"), 1);
/// # Ok::<(), lgbm_bridge::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validation metric after iteration `i` (zero-based) is `scores[i]`;
    /// the last entry repeats.
    pub fn with_valid_scores(self, scores: Vec<f64>) -> Self {
        self.lock().valid_scores = scores;
        self
    }

    pub fn with_train_scores(self, scores: Vec<f64>) -> Self {
        self.lock().train_scores = scores;
        self
    }

    /// Report convergence once a booster has `iterations` trees.
    pub fn converging_after(self, iterations: usize) -> Self {
        self.lock().converge_after = Some(iterations);
        self
    }

    /// Make the named entry point (e.g. `"LGBM_BoosterCreate"`) fail.
    pub fn failing_on(self, operation: &'static str) -> Self {
        self.fail_on(operation);
        self
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.lock().fail_on.insert(operation);
    }

    pub fn clear_failures(&self) {
        self.lock().fail_on.clear();
    }

    /// Every call so far, by C name.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.iter().filter(|c| **c == operation).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn live_datasets(&self) -> usize {
        self.lock().datasets.len()
    }

    pub fn live_boosters(&self) -> usize {
        self.lock().boosters.len()
    }

    pub fn network_active(&self) -> bool {
        self.lock().network_active
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NativeApi for FakeEngine {
    fn last_error(&self) -> String {
        self.lock().last_error.clone()
    }

    // --- Dataset ---

    fn dataset_create_from_sampled_column(
        &self,
        sample_values: &[&[f64]],
        _sample_indices: &[&[i32]],
        _num_sample_row: i32,
        num_total_row: i32,
        parameters: &CStr,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetCreateFromSampledColumn");
        let ds = FakeDataset::new(num_total_row as usize, sample_values.len(), text(parameters));
        s.insert_dataset(ds, out)
    }

    fn dataset_create_by_reference(&self, reference: RawHandle, num_total_row: i64, out: &mut RawHandle) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetCreateByReference");
        let reference = found!(s.dataset(reference));
        let mut ds = FakeDataset::new(num_total_row as usize, reference.features, reference.params.clone());
        ds.feature_names = reference.feature_names.clone();
        s.insert_dataset(ds, out)
    }

    fn dataset_push_rows(&self, handle: RawHandle, data: DenseMatrix<'_>, start_row: i32) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetPushRows");
        let ds = found!(s.dataset(handle));
        let (rows, cols) = (data.nrow() as usize, data.ncol() as usize);
        let start = start_row as usize;
        if cols != ds.features || start + rows > ds.rows {
            return s.fail("pushed rows do not fit the dataset");
        }
        for r in 0..rows {
            for c in 0..cols {
                ds.values[(start + r) * cols + c] = data.get(r, c).unwrap_or(f64::NAN);
            }
        }
        OK
    }

    fn dataset_create_from_mat(
        &self,
        data: DenseMatrix<'_>,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetCreateFromMat");
        if !reference.is_null() {
            found!(s.dataset(reference));
        }
        let ds = FakeDataset::from_dense(&data, text(parameters));
        s.insert_dataset(ds, out)
    }

    fn dataset_create_from_mats(
        &self,
        mats: &[DenseMatrix<'_>],
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetCreateFromMats");
        if !reference.is_null() {
            found!(s.dataset(reference));
        }
        let Some(first) = mats.first() else {
            return s.fail("no matrices");
        };
        let features = first.ncol() as usize;
        let rows = mats.iter().map(|m| m.nrow() as usize).sum();
        let mut ds = FakeDataset::new(rows, features, text(parameters));
        let mut row = 0;
        for m in mats {
            for r in 0..m.nrow() as usize {
                for c in 0..features {
                    ds.values[row * features + c] = m.get(r, c).unwrap_or(f64::NAN);
                }
                row += 1;
            }
        }
        s.insert_dataset(ds, out)
    }

    fn dataset_create_from_csr(
        &self,
        csr: CsrMatrix<'_>,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetCreateFromCSR");
        if !reference.is_null() {
            found!(s.dataset(reference));
        }
        let (rows, features) = (csr.nrow(), csr.num_col() as usize);
        let mut ds = FakeDataset::new(rows, features, text(parameters));
        for r in 0..rows {
            let (lo, hi) = (csr.indptr()[r] as usize, csr.indptr()[r + 1] as usize);
            for k in lo..hi {
                let c = csr.indices()[k] as usize;
                ds.values[r * features + c] = csr.data().get(k).unwrap_or(f64::NAN);
            }
        }
        s.insert_dataset(ds, out)
    }

    fn dataset_create_from_file(
        &self,
        filename: &CStr,
        _parameters: &CStr,
        _reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetCreateFromFile");
        let path = text(filename);
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str::<FakeDataset>(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(ds) => s.insert_dataset(ds, out),
            Err(e) => s.fail(format!("cannot load {path}: {e}")),
        }
    }

    fn dataset_save_binary(&self, handle: RawHandle, filename: &CStr) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetSaveBinary");
        let ds = found!(s.dataset(handle)).clone();
        let path = text(filename);
        let written = serde_json::to_string(&ds)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => OK,
            Err(e) => s.fail(format!("cannot write {path}: {e}")),
        }
    }

    fn dataset_free(&self, handle: RawHandle) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetFree");
        match s.datasets.remove(&id_of(handle)) {
            Some(_) => OK,
            None => s.fail("double free of dataset handle"),
        }
    }

    fn dataset_get_num_data(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetGetNumData");
        *out = found!(s.dataset(handle)).rows as c_int;
        OK
    }

    fn dataset_get_num_feature(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetGetNumFeature");
        *out = found!(s.dataset(handle)).features as c_int;
        OK
    }

    fn dataset_set_field(&self, handle: RawHandle, field_name: &CStr, data: FieldData<'_>) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetSetField");
        let ds = found!(s.dataset(handle));
        match (field_name.to_bytes(), data) {
            (b"label", FieldData::F32(v)) => ds.label = v.to_vec(),
            (b"weight", FieldData::F32(v)) => ds.weight = v.to_vec(),
            (b"init_score", FieldData::F64(v)) => ds.init_score = v.to_vec(),
            (b"group", FieldData::I32(sizes)) => {
                ds.group = if sizes.is_empty() {
                    Vec::new()
                } else {
                    std::iter::once(0)
                        .chain(sizes.iter().scan(0, |acc, &g| {
                            *acc += g;
                            Some(*acc)
                        }))
                        .collect()
                };
            }
            (name, _) => {
                let name = String::from_utf8_lossy(name).into_owned();
                return s.fail(format!("unsupported field {name}"));
            }
        }
        OK
    }

    fn dataset_get_field(
        &self,
        handle: RawHandle,
        field_name: &CStr,
        out: &mut Option<FieldValues>,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetGetField");
        let ds = found!(s.dataset(handle));
        let values = match field_name.to_bytes() {
            b"label" => FieldValues::F32(ds.label.clone()),
            b"weight" => FieldValues::F32(ds.weight.clone()),
            b"init_score" => FieldValues::F64(ds.init_score.clone()),
            b"group" => FieldValues::I32(ds.group.clone()),
            _ => return s.fail("unsupported field"),
        };
        *out = Some(values);
        OK
    }

    fn dataset_set_feature_names(&self, handle: RawHandle, names: &[&CStr]) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetSetFeatureNames");
        let ds = found!(s.dataset(handle));
        if names.len() != ds.features {
            return s.fail("feature name count mismatch");
        }
        ds.feature_names = names.iter().map(|n| text(n)).collect();
        OK
    }

    fn dataset_get_feature_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_DatasetGetFeatureNames");
        let ds = found!(s.dataset(handle));
        FakeState::fill_names(&ds.feature_names, buffers, out_count, out_required_len);
        OK
    }

    // --- Booster ---

    fn booster_create(&self, train: RawHandle, parameters: &CStr, out: &mut RawHandle) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterCreate");
        let params = match wire::split(&text(parameters)) {
            Ok(map) => map,
            Err(e) => return s.fail(e.to_string()),
        };
        let train_id = id_of(train);
        let ds = found!(s.dataset(train)).clone();
        let num_class = params.get("num_class").and_then(|v| v.parse().ok()).unwrap_or(1);
        let booster = FakeBooster {
            train: Some(train_id),
            valid: None,
            metric_names: metric_names(&params),
            objective: params.get("objective").cloned().unwrap_or_else(|| "regression".into()),
            num_class,
            num_features: ds.features,
            feature_names: ds.feature_names.clone(),
            train_rows: ds.rows,
            iterations: 0,
            bias: ds.mean_label(),
            leaf_values: HashMap::new(),
        };
        s.insert_booster(booster, out)
    }

    fn booster_create_from_modelfile(
        &self,
        filename: &CStr,
        out_num_iterations: &mut c_int,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterCreateFromModelfile");
        let path = text(filename);
        let Ok(model) = std::fs::read_to_string(&path) else {
            return s.fail(format!("cannot read {path}"));
        };
        let Some(booster) = FakeBooster::from_model_text(&model) else {
            return s.fail("malformed model file");
        };
        *out_num_iterations = booster.iterations as c_int;
        s.insert_booster(booster, out)
    }

    fn booster_load_model_from_string(
        &self,
        model: &CStr,
        out_num_iterations: &mut c_int,
        out: &mut RawHandle,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterLoadModelFromString");
        let Some(booster) = FakeBooster::from_model_text(&text(model)) else {
            return s.fail("malformed model string");
        };
        *out_num_iterations = booster.iterations as c_int;
        s.insert_booster(booster, out)
    }

    fn booster_free(&self, handle: RawHandle) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterFree");
        match s.boosters.remove(&id_of(handle)) {
            Some(_) => OK,
            None => s.fail("double free of booster handle"),
        }
    }

    fn booster_add_valid_data(&self, handle: RawHandle, valid: RawHandle) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterAddValidData");
        found!(s.dataset(valid));
        found!(s.booster(handle)).valid = Some(id_of(valid));
        OK
    }

    fn booster_get_num_classes(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetNumClasses");
        *out = found!(s.booster(handle)).num_class as c_int;
        OK
    }

    fn booster_get_num_feature(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetNumFeature");
        *out = found!(s.booster(handle)).num_features as c_int;
        OK
    }

    fn booster_get_current_iteration(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetCurrentIteration");
        *out = found!(s.booster(handle)).iterations as c_int;
        OK
    }

    fn booster_num_model_per_iteration(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterNumModelPerIteration");
        *out = found!(s.booster(handle)).num_class as c_int;
        OK
    }

    fn booster_number_of_total_model(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterNumberOfTotalModel");
        *out = found!(s.booster(handle)).total_models() as c_int;
        OK
    }

    fn booster_get_eval_counts(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetEvalCounts");
        *out = found!(s.booster(handle)).metric_names.len() as c_int;
        OK
    }

    fn booster_get_eval_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetEvalNames");
        let booster = found!(s.booster(handle));
        FakeState::fill_names(&booster.metric_names, buffers, out_count, out_required_len);
        OK
    }

    fn booster_get_feature_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetFeatureNames");
        let booster = found!(s.booster(handle));
        FakeState::fill_names(&booster.feature_names, buffers, out_count, out_required_len);
        OK
    }

    fn booster_update_one_iter(&self, handle: RawHandle, is_finished: &mut c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterUpdateOneIter");
        let converge_after = s.converge_after;
        let booster = found!(s.booster(handle));
        if converge_after.is_some_and(|n| booster.iterations >= n) {
            *is_finished = 1;
        } else {
            booster.iterations += 1;
            *is_finished = 0;
        }
        OK
    }

    unsafe fn booster_update_one_iter_custom(
        &self,
        handle: RawHandle,
        grad: &[f32],
        hess: &[f32],
        is_finished: &mut c_int,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterUpdateOneIterCustom");
        let converge_after = s.converge_after;
        let booster = found!(s.booster(handle));
        let expected = booster.train_rows * booster.num_class;
        if grad.len() < expected || hess.len() < expected {
            return s.fail("gradient buffers are too short");
        }
        if converge_after.is_some_and(|n| booster.iterations >= n) {
            *is_finished = 1;
        } else {
            booster.iterations += 1;
            *is_finished = 0;
        }
        OK
    }

    fn booster_rollback_one_iter(&self, handle: RawHandle) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterRollbackOneIter");
        let booster = found!(s.booster(handle));
        booster.iterations = booster.iterations.saturating_sub(1);
        OK
    }

    unsafe fn booster_get_eval(
        &self,
        handle: RawHandle,
        data_idx: c_int,
        out_len: &mut c_int,
        out: &mut [f64],
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetEval");
        let booster = found!(s.booster(handle)).clone();
        let value = match data_idx {
            0 => FakeState::scripted(&s.train_scores, booster.iterations),
            1 if booster.valid.is_some() => FakeState::scripted(&s.valid_scores, booster.iterations),
            _ => return s.fail(format!("no dataset at index {data_idx}")),
        };
        let n = booster.metric_names.len();
        if out.len() < n {
            return s.fail("eval buffer too short");
        }
        out[..n].fill(value);
        *out_len = n as c_int;
        OK
    }

    fn booster_get_num_predict(&self, handle: RawHandle, data_idx: c_int, out: &mut i64) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetNumPredict");
        let booster = found!(s.booster(handle)).clone();
        let dataset = match data_idx {
            0 => booster.train,
            1 => booster.valid,
            _ => None,
        };
        let Some(rows) = dataset.and_then(|id| s.datasets.get(&id)).map(|d| d.rows) else {
            return s.fail(format!("no dataset at index {data_idx}"));
        };
        *out = (rows * booster.num_class) as i64;
        OK
    }

    unsafe fn booster_get_predict(
        &self,
        handle: RawHandle,
        data_idx: c_int,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetPredict");
        let booster = found!(s.booster(handle)).clone();
        let dataset = match data_idx {
            0 => booster.train,
            1 => booster.valid,
            _ => None,
        };
        let Some(rows) = dataset.and_then(|id| s.datasets.get(&id)).map(|d| d.rows) else {
            return s.fail(format!("no dataset at index {data_idx}"));
        };
        let n = rows * booster.num_class;
        if out.len() < n {
            return s.fail("prediction buffer too short");
        }
        out[..n].fill(booster.score(booster.iterations));
        *out_len = n as i64;
        OK
    }

    fn booster_calc_num_predict(
        &self,
        handle: RawHandle,
        num_row: c_int,
        predict_type: c_int,
        _start_iteration: c_int,
        num_iteration: c_int,
        out: &mut i64,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterCalcNumPredict");
        let booster = found!(s.booster(handle));
        *out = (num_row as usize * booster.per_row(predict_type, num_iteration)) as i64;
        OK
    }

    unsafe fn booster_predict_for_mat(
        &self,
        handle: RawHandle,
        data: DenseMatrix<'_>,
        predict_type: c_int,
        _start_iteration: c_int,
        num_iteration: c_int,
        _parameter: &CStr,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterPredictForMat");
        let booster = found!(s.booster(handle)).clone();
        if data.ncol() as usize != booster.num_features {
            return s.fail("feature count mismatch");
        }
        let rows = data.nrow() as usize;
        let rows_data: Vec<Vec<f64>> = (0..rows)
            .map(|r| (0..booster.num_features).map(|c| data.get(r, c).unwrap_or(f64::NAN)).collect())
            .collect();
        fake_predict(&mut s, &booster, &rows_data, predict_type, num_iteration, out_len, out)
    }

    unsafe fn booster_predict_for_csr(
        &self,
        handle: RawHandle,
        csr: CsrMatrix<'_>,
        predict_type: c_int,
        _start_iteration: c_int,
        num_iteration: c_int,
        _parameter: &CStr,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterPredictForCSR");
        let booster = found!(s.booster(handle)).clone();
        let features = booster.num_features;
        let rows_data: Vec<Vec<f64>> = (0..csr.nrow())
            .map(|r| {
                let mut row = vec![0.0; features];
                let (lo, hi) = (csr.indptr()[r] as usize, csr.indptr()[r + 1] as usize);
                for k in lo..hi {
                    let c = csr.indices()[k] as usize;
                    if c < features {
                        row[c] = csr.data().get(k).unwrap_or(f64::NAN);
                    }
                }
                row
            })
            .collect();
        fake_predict(&mut s, &booster, &rows_data, predict_type, num_iteration, out_len, out)
    }

    fn booster_save_model(
        &self,
        handle: RawHandle,
        _start_iteration: c_int,
        _num_iteration: c_int,
        _importance_type: c_int,
        filename: &CStr,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterSaveModel");
        let model = found!(s.booster(handle)).model_text();
        let path = text(filename);
        match std::fs::write(&path, model) {
            Ok(()) => OK,
            Err(e) => s.fail(format!("cannot write {path}: {e}")),
        }
    }

    fn booster_save_model_to_string(
        &self,
        handle: RawHandle,
        _start_iteration: c_int,
        _num_iteration: c_int,
        _importance_type: c_int,
        buffer: &mut [u8],
        out_len: &mut i64,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterSaveModelToString");
        let model = found!(s.booster(handle)).model_text();
        FakeState::write_text(&model, buffer, out_len);
        OK
    }

    fn booster_dump_model(
        &self,
        handle: RawHandle,
        _start_iteration: c_int,
        num_iteration: c_int,
        _importance_type: c_int,
        buffer: &mut [u8],
        out_len: &mut i64,
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterDumpModel");
        let dump = found!(s.booster(handle)).dump_json(num_iteration);
        FakeState::write_text(&dump, buffer, out_len);
        OK
    }

    fn booster_get_leaf_value(&self, handle: RawHandle, tree_idx: c_int, leaf_idx: c_int, out: &mut f64) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterGetLeafValue");
        let booster = found!(s.booster(handle));
        if tree_idx < 0 || tree_idx as usize >= booster.total_models() || !(0..LEAVES_PER_TREE).contains(&leaf_idx) {
            return s.fail(format!("no leaf {leaf_idx} in tree {tree_idx}"));
        }
        *out = booster.leaf_values.get(&(tree_idx, leaf_idx)).copied().unwrap_or(STEP);
        OK
    }

    fn booster_set_leaf_value(&self, handle: RawHandle, tree_idx: c_int, leaf_idx: c_int, value: f64) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterSetLeafValue");
        let booster = found!(s.booster(handle));
        if tree_idx < 0 || tree_idx as usize >= booster.total_models() || !(0..LEAVES_PER_TREE).contains(&leaf_idx) {
            return s.fail(format!("no leaf {leaf_idx} in tree {tree_idx}"));
        }
        booster.leaf_values.insert((tree_idx, leaf_idx), value);
        OK
    }

    unsafe fn booster_feature_importance(
        &self,
        handle: RawHandle,
        num_iteration: c_int,
        importance_type: c_int,
        out: &mut [f64],
    ) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_BoosterFeatureImportance");
        let booster = found!(s.booster(handle)).clone();
        if out.len() < booster.num_features {
            return s.fail("importance buffer too short");
        }
        let iterations = booster.used_iterations(num_iteration) as f64;
        let scale = if importance_type == 1 { 0.5 } else { 1.0 };
        for (f, v) in out[..booster.num_features].iter_mut().enumerate() {
            *v = (f + 1) as f64 * iterations * scale;
        }
        OK
    }

    // --- Network ---

    fn network_init(&self, _machines: &CStr, _port: c_int, _time_out: c_int, _num_machines: c_int) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_NetworkInit");
        s.network_active = true;
        OK
    }

    fn network_free(&self) -> c_int {
        let mut s = self.lock();
        enter!(s, "LGBM_NetworkFree");
        s.network_active = false;
        OK
    }
}

/// Fake scoring: every output is the booster's score plus the row mean
/// scaled by `STEP`, except leaf-index output, which alternates leaves.
fn fake_predict(
    s: &mut FakeState,
    booster: &FakeBooster,
    rows: &[Vec<f64>],
    predict_type: c_int,
    num_iteration: c_int,
    out_len: &mut i64,
    out: &mut [f64],
) -> c_int {
    let per_row = booster.per_row(predict_type, num_iteration);
    let needed = rows.len() * per_row;
    if out.len() < needed {
        return s.fail("prediction buffer too short");
    }
    let base = booster.score(booster.used_iterations(num_iteration));
    for (r, row) in rows.iter().enumerate() {
        let mean = if row.is_empty() { 0.0 } else { row.iter().sum::<f64>() / row.len() as f64 };
        let slot = &mut out[r * per_row..(r + 1) * per_row];
        if predict_type == PredictKind::LeafIndex.code() {
            for (t, v) in slot.iter_mut().enumerate() {
                *v = ((r + t) % LEAVES_PER_TREE as usize) as f64;
            }
        } else {
            slot.fill(base + STEP * mean);
        }
    }
    *out_len = needed as i64;
    OK
}
