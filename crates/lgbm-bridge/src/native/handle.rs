//! Ownership guard for engine handles.

use std::ptr;

use super::api::{Engine, NativeApi, RawHandle, check};
use crate::Result;

/// Which engine free-function releases a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Dataset,
    Booster,
}

impl HandleKind {
    fn free_operation(self) -> &'static str {
        match self {
            HandleKind::Dataset => "LGBM_DatasetFree",
            HandleKind::Booster => "LGBM_BoosterFree",
        }
    }
}

/// Sole owner of one engine handle.
///
/// The raw pointer is null before adoption and after release. Release is
/// idempotent: a null handle makes no foreign call. Dropping releases.
pub struct NativeHandle {
    engine: Engine,
    raw: RawHandle,
    kind: HandleKind,
}

// SAFETY: engine handles carry no thread affinity; the engine itself is
// `Send + Sync`, and `NativeHandle` is not `Sync`, so at most one thread
// issues calls on a given handle at a time.
unsafe impl Send for NativeHandle {}

impl NativeHandle {
    /// Take ownership of a handle the engine just produced.
    pub(crate) fn adopt(engine: Engine, kind: HandleKind, raw: RawHandle) -> Self {
        tracing::debug!(?kind, "native handle acquired");
        Self { engine, raw, kind }
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Whether the handle still refers to a live engine resource.
    pub fn is_open(&self) -> bool {
        !self.raw.is_null()
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn api(&self) -> &dyn NativeApi {
        self.engine.as_ref()
    }

    pub(crate) fn raw(&self) -> RawHandle {
        self.raw
    }

    /// Free the engine resource. No-op once released.
    ///
    /// The handle is nulled before the free call, so a failing free is never
    /// retried.
    pub fn release(&mut self) -> Result<()> {
        if self.raw.is_null() {
            return Ok(());
        }
        let raw = std::mem::replace(&mut self.raw, ptr::null_mut());
        let status = match self.kind {
            HandleKind::Dataset => self.engine.dataset_free(raw),
            HandleKind::Booster => self.engine.booster_free(raw),
        };
        check(self.api(), self.kind.free_operation(), status)?;
        tracing::debug!(kind = ?self.kind, "native handle released");
        Ok(())
    }
}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(%err, "failed to release native handle");
        }
    }
}

impl std::fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle")
            .field("kind", &self.kind)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Error;
    use crate::native::api::{DenseMatrix, MatrixData};
    use crate::testing::FakeEngine;

    fn dataset_handle(fake: &Arc<FakeEngine>) -> NativeHandle {
        let engine: Engine = fake.clone();
        let data = [1.0f64, 2.0, 3.0, 4.0];
        let matrix = DenseMatrix::new(MatrixData::F64(&data), 2, 2, true).unwrap();
        let mut raw = ptr::null_mut();
        let status = engine.dataset_create_from_mat(matrix, c"", ptr::null_mut(), &mut raw);
        assert_eq!(status, 0);
        NativeHandle::adopt(engine, HandleKind::Dataset, raw)
    }

    #[test]
    fn failed_free_is_reported_once() {
        let fake = Arc::new(FakeEngine::new());
        let mut handle = dataset_handle(&fake);
        fake.fail_on("LGBM_DatasetFree");

        let err = handle.release().unwrap_err();
        assert!(matches!(err, Error::Native { operation: "LGBM_DatasetFree", .. }));
        assert!(!handle.is_open());

        handle.release().unwrap();
        drop(handle);
        assert_eq!(fake.call_count("LGBM_DatasetFree"), 1);
    }

    #[test]
    fn successful_free_closes_the_handle() {
        let fake = Arc::new(FakeEngine::new());
        let mut handle = dataset_handle(&fake);
        assert!(handle.is_open());
        handle.release().unwrap();
        assert!(!handle.is_open());
        assert_eq!(fake.live_datasets(), 0);
    }
}
