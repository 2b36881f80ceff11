//! Seeded synthetic data.

use ndarray::Array2;
use rand::prelude::*;

/// Uniform features in `[min, max]`, shaped `(rows, cols)`.
pub fn random_features(rows: usize, cols: usize, seed: u64, min: f64, max: f64) -> Array2<f64> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    Array2::from_shape_fn((rows, cols), |_| min + rng.r#gen::<f64>() * width)
}

/// Features with roughly `density` of entries non-zero, for sparse inputs.
pub fn random_sparse_features(rows: usize, cols: usize, seed: u64, density: f64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((rows, cols), |_| {
        if rng.r#gen::<f64>() < density {
            rng.r#gen::<f64>() * 2.0 - 1.0
        } else {
            0.0
        }
    })
}

/// Regression targets from a random linear model plus uniform noise.
pub fn synthetic_regression_targets(features: &Array2<f64>, seed: u64, noise_amplitude: f64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let weights: Vec<f64> = (0..features.ncols()).map(|_| rng.r#gen::<f64>() * 2.0 - 1.0).collect();
    let bias = rng.r#gen::<f64>() * 0.5 - 0.25;

    features
        .rows()
        .into_iter()
        .map(|row| {
            let mut y = bias + row.iter().zip(&weights).map(|(x, w)| x * w).sum::<f64>();
            if noise_amplitude > 0.0 {
                y += (rng.r#gen::<f64>() * 2.0 - 1.0) * noise_amplitude;
            }
            y as f32
        })
        .collect()
}

/// 0/1 labels by thresholding [`synthetic_regression_targets`] at zero.
pub fn synthetic_binary_labels(features: &Array2<f64>, seed: u64, noise_amplitude: f64) -> Vec<f32> {
    synthetic_regression_targets(features, seed, noise_amplitude)
        .into_iter()
        .map(|s| if s > 0.0 { 1.0 } else { 0.0 })
        .collect()
}

/// Query sizes covering `rows`, each between 1 and `max_size`.
pub fn random_query_sizes(rows: usize, max_size: usize, seed: u64) -> Vec<i32> {
    assert!(max_size > 0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sizes = Vec::new();
    let mut left = rows;
    while left > 0 {
        let size = rng.gen_range(1..=max_size).min(left);
        sizes.push(size as i32);
        left -= size;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_are_deterministic() {
        assert_eq!(random_features(4, 3, 7, -1.0, 1.0), random_features(4, 3, 7, -1.0, 1.0));
        assert!(random_features(4, 3, 7, -1.0, 1.0).iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn labels_are_binary() {
        let x = random_features(50, 4, 1, -1.0, 1.0);
        let y = synthetic_binary_labels(&x, 2, 0.1);
        assert_eq!(y.len(), 50);
        assert!(y.iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn query_sizes_cover_rows() {
        let sizes = random_query_sizes(37, 5, 3);
        assert_eq!(sizes.iter().sum::<i32>(), 37);
        assert!(sizes.iter().all(|s| (1..=5).contains(s)));
    }
}
