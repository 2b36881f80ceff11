//! Testing utilities for lgbm-bridge.
//!
//! [`FakeEngine`] stands in for the native library so datasets, boosters,
//! and the training loop can be exercised without linking LightGBM. The
//! assertion macros and [`data`] generators are shared by unit tests,
//! integration tests, and benches.
//!
//! ```
//! use lgbm_bridge::assert_approx_eq;
//! assert_approx_eq!(0.1 + 0.2, 0.3, 1e-12);
//! ```

pub mod data;
mod fake;

pub use fake::FakeEngine;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for comparing engine outputs.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two f64 values are within `tolerance` of each other.
///
/// # Panics
///
/// Panics if the absolute difference exceeds tolerance.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}`\n   tol: `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}`\n   tol: `{:?}`\n{}",
                left_val, right_val, diff, tol, format_args!($($arg)+)
            );
        }
    }};
}

/// Assert element-wise closeness of two slices.
///
/// # Panics
///
/// Panics on a length mismatch or on the first element outside tolerance,
/// naming `context` and the index.
pub fn assert_slice_approx_eq(actual: &[f64], expected: &[f64], tolerance: f64, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch: actual {} vs expected {}",
        actual.len(),
        expected.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        let diff = (a - e).abs();
        if diff > tolerance && !(a.is_nan() && e.is_nan()) {
            panic!("{context}[{i}]: actual {a} vs expected {e} (diff {diff}, tol {tolerance})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approx_macro_accepts_close_values() {
        assert_approx_eq!(1.0, 1.0 + 1e-12, DEFAULT_TOLERANCE);
    }

    #[test]
    #[should_panic(expected = "left ≈ right")]
    fn approx_macro_rejects_distant_values() {
        assert_approx_eq!(1.0, 1.1, DEFAULT_TOLERANCE, "iteration {}", 3);
    }

    #[test]
    fn slices_treat_nan_as_equal() {
        assert_slice_approx_eq(&[1.0, f64::NAN], &[1.0, f64::NAN], DEFAULT_TOLERANCE, "scores");
    }

    #[test]
    #[should_panic(expected = "scores[1]")]
    fn slices_report_first_mismatch() {
        assert_slice_approx_eq(&[1.0, 2.0], &[1.0, 2.5], DEFAULT_TOLERANCE, "scores");
    }
}
