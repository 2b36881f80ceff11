//! Runtime parameters shared by every native call.

use super::codec::param_record;
use super::value::is_wire_safe;
use super::DeviceType;

param_record! {
    /// Threading, device, reproducibility, and network parameters.
    ///
    /// These apply to both dataset construction and booster creation, so a
    /// booster rejects datasets built with a different `CommonParams`.
    ///
    /// # Example
    ///
    /// ```
    /// use lgbm_bridge::params::{CommonParams, DeviceType, ParamRecord};
    ///
    /// let mut common = CommonParams::default();
    /// common.set_num_threads(4)?.set_device_type(DeviceType::Cpu)?;
    /// assert_eq!(common.encode().len(), 1);
    /// # Ok::<(), lgbm_bridge::params::ParamError>(())
    /// ```
    pub struct CommonParams as "common" {
        /// Number of threads. `0` uses the engine's OpenMP default.
        num_threads / set_num_threads: i32 = 0, check |v| *v >= 0 => "must be >= 0";
        device_type / set_device_type: DeviceType = DeviceType::Cpu;
        /// Master seed. `0` leaves the engine's per-component seeds alone.
        seed / set_seed: i32 = 0;
        deterministic / set_deterministic: bool = false;
        /// Force column-wise histogram building.
        force_col_wise / set_force_col_wise: bool = false;
        /// Force row-wise histogram building.
        force_row_wise / set_force_row_wise: bool = false;
        /// Histogram cache size in MB; negative means unlimited.
        histogram_pool_size / set_histogram_pool_size: f64 = -1.0,
            check |v| !v.is_nan() => "must be a number";
        num_machines / set_num_machines: i32 = 1, check |v| *v >= 1 => "must be >= 1";
        local_listen_port / set_local_listen_port: i32 = 12400,
            check |v| (1..=65535).contains(v) => "must be a TCP port";
        /// Socket time-out in minutes.
        time_out / set_time_out: i32 = 120, check |v| *v > 0 => "must be > 0";
        machine_list_filename / set_machine_list_filename: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        machines / set_machines: String = String::new(),
            check |v| is_wire_safe(v) => "must not contain whitespace or '='";
        gpu_platform_id / set_gpu_platform_id: i32 = -1;
        gpu_device_id / set_gpu_device_id: i32 = -1;
        gpu_use_dp / set_gpu_use_dp: bool = false;
        num_gpu / set_num_gpu: i32 = 1, check |v| *v >= 1 => "must be >= 1";
        /// Engine log level: `< 0` fatal only, `0` warnings, `1` info, `> 1` debug.
        verbosity / set_verbosity: i32 = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamError, ParamRecord};

    #[test]
    fn default_encodes_empty() {
        assert!(CommonParams::default().encode().is_empty());
    }

    #[test]
    fn port_range_is_enforced() {
        let mut common = CommonParams::default();
        assert!(common.set_local_listen_port(0).is_err());
        assert!(common.set_local_listen_port(65536).is_err());
        common.set_local_listen_port(8080).unwrap();
        assert_eq!(common.encode()["local_listen_port"], "8080");
    }

    #[test]
    fn machine_list_must_be_wire_safe() {
        let mut common = CommonParams::default();
        let err = common
            .set_machines("10.0.0.1:12400, 10.0.0.2:12400".into())
            .unwrap_err();
        assert!(matches!(err, ParamError::Validation { field: "machines", .. }));
        common
            .set_machines("10.0.0.1:12400,10.0.0.2:12400".into())
            .unwrap();
    }

    #[test]
    fn nan_histogram_pool_rejected() {
        let mut common = CommonParams::default();
        assert!(common.set_histogram_pool_size(f64::NAN).is_err());
        common.set_histogram_pool_size(512.0).unwrap();
        assert_eq!(common.histogram_pool_size(), 512.0);
    }
}
