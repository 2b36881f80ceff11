//! Link search path for the native LightGBM library.
//!
//! Only relevant with the `lightgbm` feature. Point `LIGHTGBM_LIB_DIR` at the
//! directory holding `lib_lightgbm.{so,dylib}` / `lib_lightgbm.lib`.

fn main() {
    println!("cargo:rerun-if-env-changed=LIGHTGBM_LIB_DIR");
    if std::env::var_os("CARGO_FEATURE_LIGHTGBM").is_none() {
        return;
    }
    if let Some(dir) = std::env::var_os("LIGHTGBM_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir.to_string_lossy());
    }
}
