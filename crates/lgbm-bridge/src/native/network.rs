//! Distributed-training network setup.

use std::collections::BTreeSet;
use std::ffi::c_int;
use std::sync::{Arc, Mutex, PoisonError};

use super::api::{Engine, c_string, check};
use crate::params::CommonParams;
use crate::{Error, Result};

/// Engines with a live [`Network`], by address.
static ACTIVE: Mutex<BTreeSet<usize>> = Mutex::new(BTreeSet::new());

fn engine_key(engine: &Engine) -> usize {
    Arc::as_ptr(engine).cast::<()>().addr()
}

/// Guard for the engine's process-wide network state.
///
/// Created by [`Network::init`]; dropping it tears the network down. An
/// engine has at most one live guard: a second `init` fails until the first
/// guard is freed.
#[derive(Debug)]
pub struct Network {
    engine: Engine,
    active: bool,
}

impl Network {
    /// Join a cluster of `num_machines` listed as comma-separated `ip:port`.
    ///
    /// # Errors
    ///
    /// `Consistency` if `engine` already has a live network.
    pub fn init(
        engine: &Engine,
        machines: &str,
        local_listen_port: u16,
        listen_time_out: u32,
        num_machines: u32,
    ) -> Result<Self> {
        if num_machines == 0 {
            return Err(Error::InvalidArgument("num_machines must be >= 1".into()));
        }
        let listed = machines.split(',').filter(|m| !m.trim().is_empty()).count();
        if listed < num_machines as usize {
            return Err(Error::InvalidArgument(format!(
                "{listed} machines listed for a cluster of {num_machines}"
            )));
        }
        let to_int = |v: u32, what: &str| {
            c_int::try_from(v).map_err(|_| Error::InvalidArgument(format!("{what} {v} too large")))
        };
        let machines_text = c_string(machines, "machine list")?;
        let mut active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
        if active.contains(&engine_key(engine)) {
            return Err(Error::Consistency("network already initialized for this engine".into()));
        }
        let status = engine.network_init(
            &machines_text,
            c_int::from(local_listen_port),
            to_int(listen_time_out, "listen_time_out")?,
            to_int(num_machines, "num_machines")?,
        );
        check(engine.as_ref(), "LGBM_NetworkInit", status)?;
        active.insert(engine_key(engine));
        tracing::debug!(num_machines, local_listen_port, "network initialized");
        Ok(Self {
            engine: engine.clone(),
            active: true,
        })
    }

    /// [`init`](Self::init) using the network fields of `common`.
    pub fn from_params(engine: &Engine, common: &CommonParams) -> Result<Self> {
        let port = u16::try_from(common.local_listen_port()).map_err(|_| {
            Error::InvalidArgument(format!("invalid port {}", common.local_listen_port()))
        })?;
        let timeout = u32::try_from(common.time_out())
            .map_err(|_| Error::InvalidArgument(format!("invalid time_out {}", common.time_out())))?;
        let machines = u32::try_from(common.num_machines()).map_err(|_| {
            Error::InvalidArgument(format!("invalid num_machines {}", common.num_machines()))
        })?;
        Self::init(engine, common.machines(), port, timeout, machines)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Tear the network down. Safe to call repeatedly.
    pub fn free(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        ACTIVE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&engine_key(&self.engine));
        check(self.engine.as_ref(), "LGBM_NetworkFree", self.engine.network_free())
    }
}

impl Drop for Network {
    fn drop(&mut self) {
        if let Err(err) = self.free() {
            tracing::warn!(%err, "failed to free network");
        }
    }
}
