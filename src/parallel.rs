//! # Parallel host multiplication
//!
//! This module provides a parallel version of the host boolean product
//! using Rayon for parallel processing of matrix rows.

use rayon::prelude::*;

use crate::accumulator;
use crate::error::{Error, Result};
use crate::matrix::config::EngineConfig;
use crate::matrix::reference::check_multiply_dims;
use crate::matrix::{Index, SparseBoolCSR, SparseBoolMatrix};

/// Boolean matrix product with parallel row processing
///
/// Produces exactly the same matrix as [`crate::matrix::multiply`]; rows
/// are distributed over a rayon pool sized by
/// `config.system_params.n_threads`.
///
/// # Examples
///
/// ```
/// use spbool::{EngineConfig, SparseBoolMatrix, multiply_parallel};
///
/// let a = SparseBoolMatrix::identity(2);
/// let b = SparseBoolMatrix::build(2, 2, &[0, 1], &[1, 0]).unwrap();
///
/// let c = multiply_parallel(&a, &b, &EngineConfig::default()).unwrap();
/// assert_eq!(c, b);
/// ```
pub fn multiply_parallel(
    a: &SparseBoolMatrix,
    b: &SparseBoolMatrix,
    config: &EngineConfig,
) -> Result<SparseBoolMatrix> {
    check_multiply_dims(a, b)?;

    let a_csr = a.to_csr();
    let b_csr = b.to_csr();
    let n_rows = a_csr.n_rows;
    let n_cols = b.ncols() as usize;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.system_params.n_threads)
        .build()
        .map_err(|e| Error::Internal(format!("failed to build thread pool: {}", e)))?;

    // One accumulator per rayon job, reused across the rows it handles
    let rows: Vec<Vec<Index>> = pool.install(|| {
        (0..n_rows)
            .into_par_iter()
            .map_init(
                || accumulator::create_accumulator(n_cols, config),
                |acc, i| accumulator::multiply_row(i, &a_csr, &b_csr, acc.as_mut()),
            )
            .collect()
    });

    Ok(SparseBoolCSR::from_rows(n_rows, n_cols, rows).to_coo())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::reference;

    #[test]
    fn test_parallel_matches_sequential() {
        let a = SparseBoolMatrix::build(
            5,
            4,
            &[0, 0, 1, 2, 3, 4, 4],
            &[0, 3, 1, 2, 0, 1, 3],
        )
        .unwrap();
        let b = SparseBoolMatrix::build(4, 6, &[0, 1, 1, 2, 3], &[5, 0, 4, 2, 5]).unwrap();

        for threshold in [0, usize::MAX] {
            let config = EngineConfig::default()
                .with_threads(3)
                .with_dense_threshold(threshold);
            let parallel = multiply_parallel(&a, &b, &config).unwrap();
            let sequential = reference::multiply_with_config(&a, &b, &config).unwrap();
            assert_eq!(parallel, sequential);
        }
    }

    #[test]
    fn test_parallel_dimension_mismatch() {
        let a = SparseBoolMatrix::empty(3, 2);
        let b = SparseBoolMatrix::empty(3, 2);
        assert!(multiply_parallel(&a, &b, &EngineConfig::default()).is_err());
    }
}
