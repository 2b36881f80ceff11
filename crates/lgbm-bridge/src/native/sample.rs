//! Column-major row samples for two-phase dataset construction.
//!
//! The engine can build bin boundaries from a sample of rows given as
//! per-column non-zero values plus their sample-row indices. The full data
//! is then streamed in with [`Dataset::push_rows`](super::Dataset::push_rows).

use ndarray::ArrayView2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::{Error, Result};

/// Sparse per-column sample of a feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSample {
    values: Vec<Vec<f64>>,
    indices: Vec<Vec<i32>>,
    num_sample_rows: usize,
}

impl ColumnSample {
    /// Wrap pre-sampled columns.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the value and index lists disagree in shape,
    /// or an index falls outside `0..num_sample_rows`.
    pub fn new(values: Vec<Vec<f64>>, indices: Vec<Vec<i32>>, num_sample_rows: usize) -> Result<Self> {
        if values.len() != indices.len() {
            return Err(Error::InvalidArgument(format!(
                "{} value columns but {} index columns",
                values.len(),
                indices.len()
            )));
        }
        if i32::try_from(num_sample_rows).is_err() {
            return Err(Error::InvalidArgument(format!(
                "sample row count {num_sample_rows} exceeds the engine's i32 range"
            )));
        }
        for (col, (v, idx)) in values.iter().zip(&indices).enumerate() {
            if v.len() != idx.len() {
                return Err(Error::InvalidArgument(format!(
                    "column {col} has {} values but {} indices",
                    v.len(),
                    idx.len()
                )));
            }
            if idx.iter().any(|&i| i < 0 || i as usize >= num_sample_rows) {
                return Err(Error::InvalidArgument(format!(
                    "column {col} has a row index outside 0..{num_sample_rows}"
                )));
            }
        }
        Ok(Self {
            values,
            indices,
            num_sample_rows,
        })
    }

    /// Draw up to `sample_count` distinct rows from `data` with a seeded RNG.
    ///
    /// Zeros are dropped; NaN is kept since the engine bins missing values.
    pub fn from_rows(data: ArrayView2<'_, f64>, sample_count: usize, seed: u64) -> Result<Self> {
        let (nrow, ncol) = data.dim();
        let amount = sample_count.min(nrow);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut rows = rand::seq::index::sample(&mut rng, nrow, amount).into_vec();
        rows.sort_unstable();

        let mut values = vec![Vec::new(); ncol];
        let mut indices = vec![Vec::new(); ncol];
        for (sample_idx, &row) in rows.iter().enumerate() {
            for (col, &v) in data.row(row).iter().enumerate() {
                if v != 0.0 {
                    values[col].push(v);
                    indices[col].push(sample_idx as i32);
                }
            }
        }
        Self::new(values, indices, amount)
    }

    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    pub fn num_sample_rows(&self) -> usize {
        self.num_sample_rows
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn indices(&self) -> &[Vec<i32>] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn sampling_keeps_non_zero_entries() {
        let data = array![[1.0, 0.0], [0.0, 2.0], [3.0, f64::NAN]];
        let sample = ColumnSample::from_rows(data.view(), 10, 7).unwrap();
        assert_eq!(sample.num_sample_rows(), 3);
        assert_eq!(sample.values()[0], vec![1.0, 3.0]);
        assert_eq!(sample.indices()[0], vec![0, 2]);
        assert_eq!(sample.indices()[1], vec![1, 2]);
        assert!(sample.values()[1][1].is_nan());
    }

    #[test]
    fn sampling_is_seeded() {
        let data = ndarray::Array2::from_shape_fn((100, 3), |(r, c)| (r * 3 + c) as f64 + 1.0);
        let a = ColumnSample::from_rows(data.view(), 20, 42).unwrap();
        let b = ColumnSample::from_rows(data.view(), 20, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_sample_rows(), 20);
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let err = ColumnSample::new(vec![vec![1.0]], vec![vec![0, 1]], 2).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        let err = ColumnSample::new(vec![vec![1.0]], vec![vec![5]], 2).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
