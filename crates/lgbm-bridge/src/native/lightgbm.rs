//! Binding to the LightGBM shared library.
//!
//! Compiled with the `lightgbm` feature. Set `LIGHTGBM_LIB_DIR` to the
//! directory holding `lib_lightgbm` when it is not on the default search path.

use std::cell::RefCell;
use std::ffi::{CStr, c_char, c_int, c_void};
use std::ptr;

use super::api::{
    CsrMatrix, DenseMatrix, FieldData, FieldValues, NativeApi, RawHandle, dtype,
};

#[link(name = "_lightgbm")]
unsafe extern "C" {
    fn LGBM_GetLastError() -> *const c_char;

    fn LGBM_DatasetCreateFromSampledColumn(
        sample_data: *mut *mut f64,
        sample_indices: *mut *mut c_int,
        ncol: i32,
        num_per_col: *const c_int,
        num_sample_row: i32,
        num_local_row: i32,
        num_dist_row: i64,
        parameters: *const c_char,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_DatasetCreateByReference(reference: RawHandle, num_total_row: i64, out: *mut RawHandle) -> c_int;
    fn LGBM_DatasetPushRows(
        dataset: RawHandle,
        data: *const c_void,
        data_type: c_int,
        nrow: i32,
        ncol: i32,
        start_row: i32,
    ) -> c_int;
    fn LGBM_DatasetCreateFromMat(
        data: *const c_void,
        data_type: c_int,
        nrow: i32,
        ncol: i32,
        is_row_major: c_int,
        parameters: *const c_char,
        reference: RawHandle,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_DatasetCreateFromMats(
        nmat: i32,
        data: *mut *const c_void,
        data_type: c_int,
        nrow: *mut i32,
        ncol: i32,
        is_row_major: c_int,
        parameters: *const c_char,
        reference: RawHandle,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_DatasetCreateFromCSR(
        indptr: *const c_void,
        indptr_type: c_int,
        indices: *const i32,
        data: *const c_void,
        data_type: c_int,
        nindptr: i64,
        nelem: i64,
        num_col: i64,
        parameters: *const c_char,
        reference: RawHandle,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_DatasetCreateFromFile(
        filename: *const c_char,
        parameters: *const c_char,
        reference: RawHandle,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_DatasetSaveBinary(handle: RawHandle, filename: *const c_char) -> c_int;
    fn LGBM_DatasetFree(handle: RawHandle) -> c_int;
    fn LGBM_DatasetGetNumData(handle: RawHandle, out: *mut c_int) -> c_int;
    fn LGBM_DatasetGetNumFeature(handle: RawHandle, out: *mut c_int) -> c_int;
    fn LGBM_DatasetSetField(
        handle: RawHandle,
        field_name: *const c_char,
        field_data: *const c_void,
        num_element: c_int,
        data_type: c_int,
    ) -> c_int;
    fn LGBM_DatasetGetField(
        handle: RawHandle,
        field_name: *const c_char,
        out_len: *mut c_int,
        out_ptr: *mut *const c_void,
        out_type: *mut c_int,
    ) -> c_int;
    fn LGBM_DatasetSetFeatureNames(
        handle: RawHandle,
        feature_names: *mut *const c_char,
        num_feature_names: c_int,
    ) -> c_int;
    fn LGBM_DatasetGetFeatureNames(
        handle: RawHandle,
        len: c_int,
        num_feature_names: *mut c_int,
        buffer_len: usize,
        out_buffer_len: *mut usize,
        feature_names: *mut *mut c_char,
    ) -> c_int;

    fn LGBM_BoosterCreate(train_data: RawHandle, parameters: *const c_char, out: *mut RawHandle) -> c_int;
    fn LGBM_BoosterCreateFromModelfile(
        filename: *const c_char,
        out_num_iterations: *mut c_int,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_BoosterLoadModelFromString(
        model_str: *const c_char,
        out_num_iterations: *mut c_int,
        out: *mut RawHandle,
    ) -> c_int;
    fn LGBM_BoosterFree(handle: RawHandle) -> c_int;
    fn LGBM_BoosterAddValidData(handle: RawHandle, valid_data: RawHandle) -> c_int;
    fn LGBM_BoosterGetNumClasses(handle: RawHandle, out_len: *mut c_int) -> c_int;
    fn LGBM_BoosterGetNumFeature(handle: RawHandle, out_len: *mut c_int) -> c_int;
    fn LGBM_BoosterGetCurrentIteration(handle: RawHandle, out_iteration: *mut c_int) -> c_int;
    fn LGBM_BoosterNumModelPerIteration(handle: RawHandle, out_tree_per_iteration: *mut c_int) -> c_int;
    fn LGBM_BoosterNumberOfTotalModel(handle: RawHandle, out_models: *mut c_int) -> c_int;
    fn LGBM_BoosterGetEvalCounts(handle: RawHandle, out_len: *mut c_int) -> c_int;
    fn LGBM_BoosterGetEvalNames(
        handle: RawHandle,
        len: c_int,
        out_len: *mut c_int,
        buffer_len: usize,
        out_buffer_len: *mut usize,
        out_strs: *mut *mut c_char,
    ) -> c_int;
    fn LGBM_BoosterGetFeatureNames(
        handle: RawHandle,
        len: c_int,
        out_len: *mut c_int,
        buffer_len: usize,
        out_buffer_len: *mut usize,
        out_strs: *mut *mut c_char,
    ) -> c_int;
    fn LGBM_BoosterUpdateOneIter(handle: RawHandle, is_finished: *mut c_int) -> c_int;
    fn LGBM_BoosterUpdateOneIterCustom(
        handle: RawHandle,
        grad: *const f32,
        hess: *const f32,
        is_finished: *mut c_int,
    ) -> c_int;
    fn LGBM_BoosterRollbackOneIter(handle: RawHandle) -> c_int;
    fn LGBM_BoosterGetEval(
        handle: RawHandle,
        data_idx: c_int,
        out_len: *mut c_int,
        out_results: *mut f64,
    ) -> c_int;
    fn LGBM_BoosterGetNumPredict(handle: RawHandle, data_idx: c_int, out_len: *mut i64) -> c_int;
    fn LGBM_BoosterGetPredict(
        handle: RawHandle,
        data_idx: c_int,
        out_len: *mut i64,
        out_result: *mut f64,
    ) -> c_int;
    fn LGBM_BoosterCalcNumPredict(
        handle: RawHandle,
        num_row: c_int,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        out_len: *mut i64,
    ) -> c_int;
    fn LGBM_BoosterPredictForMat(
        handle: RawHandle,
        data: *const c_void,
        data_type: c_int,
        nrow: i32,
        ncol: i32,
        is_row_major: c_int,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        parameter: *const c_char,
        out_len: *mut i64,
        out_result: *mut f64,
    ) -> c_int;
    fn LGBM_BoosterPredictForCSR(
        handle: RawHandle,
        indptr: *const c_void,
        indptr_type: c_int,
        indices: *const i32,
        data: *const c_void,
        data_type: c_int,
        nindptr: i64,
        nelem: i64,
        num_col: i64,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        parameter: *const c_char,
        out_len: *mut i64,
        out_result: *mut f64,
    ) -> c_int;
    fn LGBM_BoosterSaveModel(
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        feature_importance_type: c_int,
        filename: *const c_char,
    ) -> c_int;
    fn LGBM_BoosterSaveModelToString(
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        feature_importance_type: c_int,
        buffer_len: i64,
        out_len: *mut i64,
        out_str: *mut c_char,
    ) -> c_int;
    fn LGBM_BoosterDumpModel(
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        feature_importance_type: c_int,
        buffer_len: i64,
        out_len: *mut i64,
        out_str: *mut c_char,
    ) -> c_int;
    fn LGBM_BoosterGetLeafValue(handle: RawHandle, tree_idx: c_int, leaf_idx: c_int, out_val: *mut f64) -> c_int;
    fn LGBM_BoosterSetLeafValue(handle: RawHandle, tree_idx: c_int, leaf_idx: c_int, val: f64) -> c_int;
    fn LGBM_BoosterFeatureImportance(
        handle: RawHandle,
        num_iteration: c_int,
        importance_type: c_int,
        out_results: *mut f64,
    ) -> c_int;

    fn LGBM_NetworkInit(
        machines: *const c_char,
        local_listen_port: c_int,
        listen_time_out: c_int,
        num_machines: c_int,
    ) -> c_int;
    fn LGBM_NetworkFree() -> c_int;
}

/// Status returned when arguments are rejected before reaching the library.
const REJECTED: c_int = -1;

thread_local! {
    /// Why the last call on this thread was rejected locally; read back by
    /// `last_error` in place of the library's own message.
    static REJECTION: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn reject(reason: &str) -> c_int {
    REJECTION.with(|r| *r.borrow_mut() = Some(reason.to_string()));
    REJECTED
}

/// The LightGBM C API.
///
/// The library keeps its last error per thread, so [`NativeApi::last_error`]
/// must be read on the thread that made the failing call, which the safe
/// wrappers always do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightGbm;

impl LightGbm {
    pub fn new() -> Self {
        Self
    }

    /// Pointer table over equal-length name buffers, or `None` if the
    /// buffers are ragged.
    fn name_pointers(buffers: &mut [Vec<u8>]) -> Option<(Vec<*mut c_char>, usize)> {
        let buffer_len = buffers.first().map_or(0, Vec::len);
        if buffers.iter().any(|b| b.len() != buffer_len) {
            return None;
        }
        let ptrs = buffers.iter_mut().map(|b| b.as_mut_ptr().cast::<c_char>()).collect();
        Some((ptrs, buffer_len))
    }
}

impl NativeApi for LightGbm {
    fn last_error(&self) -> String {
        if let Some(reason) = REJECTION.with(|r| r.borrow_mut().take()) {
            return reason;
        }
        // SAFETY: the library returns a pointer to a static, NUL-terminated,
        // thread-local message.
        unsafe {
            let msg = LGBM_GetLastError();
            if msg.is_null() {
                return String::new();
            }
            CStr::from_ptr(msg).to_string_lossy().into_owned()
        }
    }

    fn dataset_create_from_sampled_column(
        &self,
        sample_values: &[&[f64]],
        sample_indices: &[&[i32]],
        num_sample_row: i32,
        num_total_row: i32,
        parameters: &CStr,
        out: &mut RawHandle,
    ) -> c_int {
        if sample_values.len() != sample_indices.len()
            || sample_values.iter().zip(sample_indices).any(|(v, i)| v.len() != i.len())
        {
            return reject("sample value and index columns differ in length");
        }
        let Ok(ncol) = i32::try_from(sample_values.len()) else {
            return reject("too many sample columns");
        };
        let num_per_col: Vec<c_int> = sample_values.iter().map(|v| v.len() as c_int).collect();
        // The library reads through these pointers only.
        let mut values: Vec<*mut f64> = sample_values.iter().map(|v| v.as_ptr().cast_mut()).collect();
        let mut indices: Vec<*mut c_int> =
            sample_indices.iter().map(|i| i.as_ptr().cast_mut()).collect();
        // SAFETY: every pointer table entry refers to a live slice whose
        // length is given in `num_per_col`.
        unsafe {
            LGBM_DatasetCreateFromSampledColumn(
                values.as_mut_ptr(),
                indices.as_mut_ptr(),
                ncol,
                num_per_col.as_ptr(),
                num_sample_row,
                num_total_row,
                i64::from(num_total_row),
                parameters.as_ptr(),
                out,
            )
        }
    }

    fn dataset_create_by_reference(&self, reference: RawHandle, num_total_row: i64, out: &mut RawHandle) -> c_int {
        // SAFETY: `reference` is a live dataset handle.
        unsafe { LGBM_DatasetCreateByReference(reference, num_total_row, out) }
    }

    fn dataset_push_rows(&self, handle: RawHandle, data: DenseMatrix<'_>, start_row: i32) -> c_int {
        if !data.is_row_major() {
            return reject("pushed rows must be row-major");
        }
        let values = data.data();
        // SAFETY: `DenseMatrix` guarantees `nrow * ncol` values.
        unsafe {
            LGBM_DatasetPushRows(handle, values.as_ptr(), values.dtype(), data.nrow(), data.ncol(), start_row)
        }
    }

    fn dataset_create_from_mat(
        &self,
        data: DenseMatrix<'_>,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let values = data.data();
        // SAFETY: `DenseMatrix` guarantees `nrow * ncol` values.
        unsafe {
            LGBM_DatasetCreateFromMat(
                values.as_ptr(),
                values.dtype(),
                data.nrow(),
                data.ncol(),
                c_int::from(data.is_row_major()),
                parameters.as_ptr(),
                reference,
                out,
            )
        }
    }

    fn dataset_create_from_mats(
        &self,
        mats: &[DenseMatrix<'_>],
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let Some(first) = mats.first() else {
            return reject("no matrices given");
        };
        let (data_type, ncol, row_major) = (first.data().dtype(), first.ncol(), first.is_row_major());
        if mats
            .iter()
            .any(|m| m.data().dtype() != data_type || m.ncol() != ncol || m.is_row_major() != row_major)
        {
            return reject("matrices must share type, width and layout");
        }
        let Ok(nmat) = i32::try_from(mats.len()) else {
            return reject("too many matrices");
        };
        let mut ptrs: Vec<*const c_void> = mats.iter().map(|m| m.data().as_ptr()).collect();
        let mut nrows: Vec<i32> = mats.iter().map(DenseMatrix::nrow).collect();
        // SAFETY: each pointer refers to a live `nrow * ncol` buffer.
        unsafe {
            LGBM_DatasetCreateFromMats(
                nmat,
                ptrs.as_mut_ptr(),
                data_type,
                nrows.as_mut_ptr(),
                ncol,
                c_int::from(row_major),
                parameters.as_ptr(),
                reference,
                out,
            )
        }
    }

    fn dataset_create_from_csr(
        &self,
        csr: CsrMatrix<'_>,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        let values = csr.data();
        // SAFETY: `CsrMatrix` guarantees consistent array lengths.
        unsafe {
            LGBM_DatasetCreateFromCSR(
                csr.indptr().as_ptr().cast(),
                dtype::INT64,
                csr.indices().as_ptr(),
                values.as_ptr(),
                values.dtype(),
                csr.indptr().len() as i64,
                values.len() as i64,
                csr.num_col(),
                parameters.as_ptr(),
                reference,
                out,
            )
        }
    }

    fn dataset_create_from_file(
        &self,
        filename: &CStr,
        parameters: &CStr,
        reference: RawHandle,
        out: &mut RawHandle,
    ) -> c_int {
        // SAFETY: both strings are NUL-terminated.
        unsafe { LGBM_DatasetCreateFromFile(filename.as_ptr(), parameters.as_ptr(), reference, out) }
    }

    fn dataset_save_binary(&self, handle: RawHandle, filename: &CStr) -> c_int {
        // SAFETY: live handle, NUL-terminated path.
        unsafe { LGBM_DatasetSaveBinary(handle, filename.as_ptr()) }
    }

    fn dataset_free(&self, handle: RawHandle) -> c_int {
        // SAFETY: the caller owns `handle` and never uses it again.
        unsafe { LGBM_DatasetFree(handle) }
    }

    fn dataset_get_num_data(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_DatasetGetNumData(handle, out) }
    }

    fn dataset_get_num_feature(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_DatasetGetNumFeature(handle, out) }
    }

    fn dataset_set_field(&self, handle: RawHandle, field_name: &CStr, data: FieldData<'_>) -> c_int {
        let (ptr, len, data_type): (*const c_void, usize, c_int) = match data {
            FieldData::F32(d) => (d.as_ptr().cast(), d.len(), dtype::FLOAT32),
            FieldData::F64(d) => (d.as_ptr().cast(), d.len(), dtype::FLOAT64),
            FieldData::I32(d) => (d.as_ptr().cast(), d.len(), dtype::INT32),
        };
        let Ok(len) = c_int::try_from(len) else {
            return reject("field too long");
        };
        // An empty field resets to the default; the library expects null.
        let ptr = if len == 0 { ptr::null() } else { ptr };
        // SAFETY: `ptr` refers to `len` values of `data_type`.
        unsafe { LGBM_DatasetSetField(handle, field_name.as_ptr(), ptr, len, data_type) }
    }

    fn dataset_get_field(
        &self,
        handle: RawHandle,
        field_name: &CStr,
        out: &mut Option<FieldValues>,
    ) -> c_int {
        let mut len: c_int = 0;
        let mut data: *const c_void = ptr::null();
        let mut data_type: c_int = 0;
        // SAFETY: live handle; the library writes the three out-parameters.
        let status =
            unsafe { LGBM_DatasetGetField(handle, field_name.as_ptr(), &mut len, &mut data, &mut data_type) };
        if status != 0 {
            return status;
        }
        if data.is_null() || len <= 0 {
            *out = None;
            return 0;
        }
        let len = len as usize;
        // SAFETY: the library reports `len` values of `data_type` at `data`,
        // owned by the dataset and valid until it is modified.
        *out = unsafe {
            match data_type {
                dtype::FLOAT32 => Some(FieldValues::F32(std::slice::from_raw_parts(data.cast(), len).to_vec())),
                dtype::FLOAT64 => Some(FieldValues::F64(std::slice::from_raw_parts(data.cast(), len).to_vec())),
                dtype::INT32 => Some(FieldValues::I32(std::slice::from_raw_parts(data.cast(), len).to_vec())),
                _ => return reject("field has an unsupported data type"),
            }
        };
        0
    }

    fn dataset_set_feature_names(&self, handle: RawHandle, names: &[&CStr]) -> c_int {
        let Ok(count) = c_int::try_from(names.len()) else {
            return reject("too many feature names");
        };
        let mut ptrs: Vec<*const c_char> = names.iter().map(|n| n.as_ptr()).collect();
        // SAFETY: every pointer is a live NUL-terminated string.
        unsafe { LGBM_DatasetSetFeatureNames(handle, ptrs.as_mut_ptr(), count) }
    }

    fn dataset_get_feature_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int {
        let Some((mut ptrs, buffer_len)) = Self::name_pointers(buffers) else {
            return reject("name buffers differ in length");
        };
        let Ok(len) = c_int::try_from(ptrs.len()) else {
            return reject("too many name buffers");
        };
        // SAFETY: `len` buffers of `buffer_len` bytes each; the library
        // writes at most that much into each.
        unsafe {
            LGBM_DatasetGetFeatureNames(handle, len, out_count, buffer_len, out_required_len, ptrs.as_mut_ptr())
        }
    }

    fn booster_create(&self, train: RawHandle, parameters: &CStr, out: &mut RawHandle) -> c_int {
        // SAFETY: live dataset handle, NUL-terminated parameters.
        unsafe { LGBM_BoosterCreate(train, parameters.as_ptr(), out) }
    }

    fn booster_create_from_modelfile(
        &self,
        filename: &CStr,
        out_num_iterations: &mut c_int,
        out: &mut RawHandle,
    ) -> c_int {
        // SAFETY: NUL-terminated path.
        unsafe { LGBM_BoosterCreateFromModelfile(filename.as_ptr(), out_num_iterations, out) }
    }

    fn booster_load_model_from_string(
        &self,
        model: &CStr,
        out_num_iterations: &mut c_int,
        out: &mut RawHandle,
    ) -> c_int {
        // SAFETY: NUL-terminated model text.
        unsafe { LGBM_BoosterLoadModelFromString(model.as_ptr(), out_num_iterations, out) }
    }

    fn booster_free(&self, handle: RawHandle) -> c_int {
        // SAFETY: the caller owns `handle` and never uses it again.
        unsafe { LGBM_BoosterFree(handle) }
    }

    fn booster_add_valid_data(&self, handle: RawHandle, valid: RawHandle) -> c_int {
        // SAFETY: live handles.
        unsafe { LGBM_BoosterAddValidData(handle, valid) }
    }

    fn booster_get_num_classes(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterGetNumClasses(handle, out) }
    }

    fn booster_get_num_feature(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterGetNumFeature(handle, out) }
    }

    fn booster_get_current_iteration(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterGetCurrentIteration(handle, out) }
    }

    fn booster_num_model_per_iteration(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterNumModelPerIteration(handle, out) }
    }

    fn booster_number_of_total_model(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterNumberOfTotalModel(handle, out) }
    }

    fn booster_get_eval_counts(&self, handle: RawHandle, out: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterGetEvalCounts(handle, out) }
    }

    fn booster_get_eval_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int {
        let Some((mut ptrs, buffer_len)) = Self::name_pointers(buffers) else {
            return reject("name buffers differ in length");
        };
        let Ok(len) = c_int::try_from(ptrs.len()) else {
            return reject("too many name buffers");
        };
        // SAFETY: `len` buffers of `buffer_len` bytes each.
        unsafe {
            LGBM_BoosterGetEvalNames(handle, len, out_count, buffer_len, out_required_len, ptrs.as_mut_ptr())
        }
    }

    fn booster_get_feature_names(
        &self,
        handle: RawHandle,
        buffers: &mut [Vec<u8>],
        out_count: &mut c_int,
        out_required_len: &mut usize,
    ) -> c_int {
        let Some((mut ptrs, buffer_len)) = Self::name_pointers(buffers) else {
            return reject("name buffers differ in length");
        };
        let Ok(len) = c_int::try_from(ptrs.len()) else {
            return reject("too many name buffers");
        };
        // SAFETY: `len` buffers of `buffer_len` bytes each.
        unsafe {
            LGBM_BoosterGetFeatureNames(handle, len, out_count, buffer_len, out_required_len, ptrs.as_mut_ptr())
        }
    }

    fn booster_update_one_iter(&self, handle: RawHandle, is_finished: &mut c_int) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterUpdateOneIter(handle, is_finished) }
    }

    unsafe fn booster_update_one_iter_custom(
        &self,
        handle: RawHandle,
        grad: &[f32],
        hess: &[f32],
        is_finished: &mut c_int,
    ) -> c_int {
        // SAFETY: the caller sized both slices to the training score length.
        unsafe { LGBM_BoosterUpdateOneIterCustom(handle, grad.as_ptr(), hess.as_ptr(), is_finished) }
    }

    fn booster_rollback_one_iter(&self, handle: RawHandle) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterRollbackOneIter(handle) }
    }

    unsafe fn booster_get_eval(
        &self,
        handle: RawHandle,
        data_idx: c_int,
        out_len: &mut c_int,
        out: &mut [f64],
    ) -> c_int {
        // SAFETY: the caller sized `out` to the eval count.
        unsafe { LGBM_BoosterGetEval(handle, data_idx, out_len, out.as_mut_ptr()) }
    }

    fn booster_get_num_predict(&self, handle: RawHandle, data_idx: c_int, out: &mut i64) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterGetNumPredict(handle, data_idx, out) }
    }

    unsafe fn booster_get_predict(
        &self,
        handle: RawHandle,
        data_idx: c_int,
        out_len: &mut i64,
        out: &mut [f64],
    ) -> c_int {
        // SAFETY: the caller sized `out` from `LGBM_BoosterGetNumPredict`.
        unsafe { LGBM_BoosterGetPredict(handle, data_idx, out_len, out.as_mut_ptr()) }
    }

    fn booster_calc_num_predict(
        &self,
        handle: RawHandle,
        num_row: c_int,
        predict_type: c_int,
        start_iteration: c_int,
        num_iteration: c_int,
        out: &mut i64,
    ) -> c_int {
        // SAFETY: live handle.
        unsafe { LGBM_BoosterCalcNumPredict(handle, num_row, predict_type, start_iteration, num_iteration, out) }
    }

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
    ) -> c_int {
        let values = data.data();
        // SAFETY: input shape is guaranteed by `DenseMatrix`; the caller
        // sized `out` from `LGBM_BoosterCalcNumPredict`.
        unsafe {
            LGBM_BoosterPredictForMat(
                handle,
                values.as_ptr(),
                values.dtype(),
                data.nrow(),
                data.ncol(),
                c_int::from(data.is_row_major()),
                predict_type,
                start_iteration,
                num_iteration,
                parameter.as_ptr(),
                out_len,
                out.as_mut_ptr(),
            )
        }
    }

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
    ) -> c_int {
        let values = csr.data();
        // SAFETY: structure is guaranteed by `CsrMatrix`; the caller sized
        // `out` from `LGBM_BoosterCalcNumPredict`.
        unsafe {
            LGBM_BoosterPredictForCSR(
                handle,
                csr.indptr().as_ptr().cast(),
                dtype::INT64,
                csr.indices().as_ptr(),
                values.as_ptr(),
                values.dtype(),
                csr.indptr().len() as i64,
                values.len() as i64,
                csr.num_col(),
                predict_type,
                start_iteration,
                num_iteration,
                parameter.as_ptr(),
                out_len,
                out.as_mut_ptr(),
            )
        }
    }

    fn booster_save_model(
        &self,
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        importance_type: c_int,
        filename: &CStr,
    ) -> c_int {
        // SAFETY: live handle, NUL-terminated path.
        unsafe { LGBM_BoosterSaveModel(handle, start_iteration, num_iteration, importance_type, filename.as_ptr()) }
    }

    fn booster_save_model_to_string(
        &self,
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        importance_type: c_int,
        buffer: &mut [u8],
        out_len: &mut i64,
    ) -> c_int {
        // SAFETY: the library writes at most `buffer.len()` bytes.
        unsafe {
            LGBM_BoosterSaveModelToString(
                handle,
                start_iteration,
                num_iteration,
                importance_type,
                buffer.len() as i64,
                out_len,
                buffer.as_mut_ptr().cast(),
            )
        }
    }

    fn booster_dump_model(
        &self,
        handle: RawHandle,
        start_iteration: c_int,
        num_iteration: c_int,
        importance_type: c_int,
        buffer: &mut [u8],
        out_len: &mut i64,
    ) -> c_int {
        // SAFETY: the library writes at most `buffer.len()` bytes.
        unsafe {
            LGBM_BoosterDumpModel(
                handle,
                start_iteration,
                num_iteration,
                importance_type,
                buffer.len() as i64,
                out_len,
                buffer.as_mut_ptr().cast(),
            )
        }
    }

    fn booster_get_leaf_value(&self, handle: RawHandle, tree_idx: c_int, leaf_idx: c_int, out: &mut f64) -> c_int {
        // SAFETY: live handle; indices are range-checked by the library.
        unsafe { LGBM_BoosterGetLeafValue(handle, tree_idx, leaf_idx, out) }
    }

    fn booster_set_leaf_value(&self, handle: RawHandle, tree_idx: c_int, leaf_idx: c_int, value: f64) -> c_int {
        // SAFETY: live handle; indices are range-checked by the library.
        unsafe { LGBM_BoosterSetLeafValue(handle, tree_idx, leaf_idx, value) }
    }

    unsafe fn booster_feature_importance(
        &self,
        handle: RawHandle,
        num_iteration: c_int,
        importance_type: c_int,
        out: &mut [f64],
    ) -> c_int {
        // SAFETY: the caller sized `out` to the feature count.
        unsafe { LGBM_BoosterFeatureImportance(handle, num_iteration, importance_type, out.as_mut_ptr()) }
    }

    fn network_init(
        &self,
        machines: &CStr,
        local_listen_port: c_int,
        listen_time_out: c_int,
        num_machines: c_int,
    ) -> c_int {
        // SAFETY: NUL-terminated machine list.
        unsafe { LGBM_NetworkInit(machines.as_ptr(), local_listen_port, listen_time_out, num_machines) }
    }

    fn network_free(&self) -> c_int {
        // SAFETY: no arguments; safe to call when no network is active.
        unsafe { LGBM_NetworkFree() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::native::api::{MatrixData, check};

    #[test]
    fn local_rejections_report_their_own_reason() {
        let api = LightGbm::new();
        let data = [1.0f64, 2.0, 3.0, 4.0];
        let matrix = DenseMatrix::new(MatrixData::F64(&data), 2, 2, false).unwrap();
        let status = api.dataset_push_rows(ptr::null_mut(), matrix, 0);
        assert_eq!(status, REJECTED);

        let err = check(&api, "LGBM_DatasetPushRows", status).unwrap_err();
        assert!(matches!(
            err,
            Error::Native { operation: "LGBM_DatasetPushRows", ref message }
                if message == "pushed rows must be row-major"
        ));
    }
}
