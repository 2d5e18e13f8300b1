//! Utility functions and helpers

pub mod formats;

pub use formats::{from_dense, from_sprs, to_dense, to_sprs};

use rand::Rng;

use crate::error::{Error, Result};
use crate::matrix::{Index, SparseBoolMatrix};

/// Computes an exclusive prefix sum (scan) for a vector
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0); // First element is always 0

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}

/// Random matrix with about `density · nrows · ncols` entries
///
/// Draws `round(density · nrows · ncols)` coordinates uniformly with
/// replacement and lets canonicalization collapse the repeats, so the
/// result holds fewer entries as `density` approaches 1. Fails with
/// `InvalidArgument` when the draw count does not fit the index type or
/// cannot be allocated.
pub fn generate<R: Rng + ?Sized>(
    nrows: Index,
    ncols: Index,
    density: f64,
    rng: &mut R,
) -> Result<SparseBoolMatrix> {
    if !(0.0..=1.0).contains(&density) {
        return Err(Error::InvalidArgument(format!(
            "density {} is outside [0, 1]",
            density
        )));
    }
    if nrows == 0 || ncols == 0 {
        return Ok(SparseBoolMatrix::empty(nrows, ncols));
    }

    let cells = nrows as f64 * ncols as f64;
    let expected = (cells * density).round();
    if expected > Index::MAX as f64 {
        return Err(Error::InvalidArgument(format!(
            "{} random entries for a {}x{} matrix exceed the index type",
            expected, nrows, ncols
        )));
    }
    let draws = expected as usize;

    let mut rows: Vec<Index> = Vec::new();
    let mut cols: Vec<Index> = Vec::new();
    rows.try_reserve_exact(draws)
        .and_then(|_| cols.try_reserve_exact(draws))
        .map_err(|e| Error::InvalidArgument(format!("cannot allocate {} draws: {}", draws, e)))?;
    for _ in 0..draws {
        rows.push(rng.gen_range(0..nrows));
        cols.push(rng.gen_range(0..ncols));
    }

    SparseBoolMatrix::build(nrows, ncols, &rows, &cols)
}
