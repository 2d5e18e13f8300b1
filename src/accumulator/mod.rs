//! Accumulator implementations for boolean sparse matrix multiplication
//!
//! This module contains different accumulator implementations for
//! combining the rows of B that contribute to one output row. Neither
//! accumulator ever stores a column twice, so no deduplication pass is
//! needed after the row is complete.

pub mod dense;
pub mod merge;

use crate::matrix::config::{AccumulatorKind, EngineConfig};
use crate::matrix::{Index, SparseBoolCSR};

/// Trait for accumulators that OR sorted column lists into one output row
pub trait Accumulator {
    /// Reset the accumulator to prepare for a new row
    fn reset(&mut self);

    /// OR a sorted, duplicate-free column list into the current row
    fn accumulate_row(&mut self, cols: &[Index]);

    /// Extract the current row as sorted, unique column indices
    ///
    /// The accumulator is left empty and ready for the next row.
    fn extract_result(&mut self) -> Vec<Index>;
}

/// Create an appropriate accumulator based on the output matrix columns
///
/// # Arguments
///
/// * `n_cols` - The number of columns in the output matrix
/// * `config` - Engine configuration holding the dense threshold
pub fn create_accumulator(n_cols: usize, config: &EngineConfig) -> Box<dyn Accumulator + Send> {
    match config.accumulator_for(n_cols) {
        AccumulatorKind::Dense => Box::new(dense::DenseAccumulator::new(n_cols)),
        AccumulatorKind::Merge => Box::new(merge::MergeAccumulator::new(n_cols / 16)),
    }
}

/// Multiply a single row of A with B into the given accumulator
///
/// # Arguments
///
/// * `a_row` - Row index in matrix A to multiply
/// * `a` - Matrix A in CSR format
/// * `b` - Matrix B in CSR format
/// * `accumulator` - Scratch accumulator, reset by this call
///
/// # Returns
///
/// Sorted column indices of the result row.
pub fn multiply_row(
    a_row: usize,
    a: &SparseBoolCSR,
    b: &SparseBoolCSR,
    accumulator: &mut dyn Accumulator,
) -> Vec<Index> {
    accumulator.reset();

    // Each stored A(a_row, l) selects row l of B
    for &l in a.row(a_row) {
        accumulator.accumulate_row(b.row(l as usize));
    }

    accumulator.extract_result()
}

pub use dense::DenseAccumulator;
pub use merge::MergeAccumulator;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::SparseBoolMatrix;

    fn sample() -> (SparseBoolCSR, SparseBoolCSR) {
        // A = [1 1 0; 0 0 1; 0 0 0]
        // B = [0 1 1; 0 1 0; 1 0 0]
        let a = SparseBoolMatrix::build(3, 3, &[0, 0, 1], &[0, 1, 2]).unwrap();
        let b = SparseBoolMatrix::build(3, 3, &[0, 0, 1, 2], &[1, 2, 1, 0]).unwrap();
        (a.to_csr(), b.to_csr())
    }

    #[test]
    fn test_both_accumulators_agree() {
        let (a, b) = sample();

        let dense_config = EngineConfig::default().with_dense_threshold(usize::MAX);
        let merge_config = EngineConfig::default().with_dense_threshold(0);

        let mut dense = create_accumulator(3, &dense_config);
        let mut merge = create_accumulator(3, &merge_config);

        for i in 0..3 {
            let d = multiply_row(i, &a, &b, dense.as_mut());
            let m = multiply_row(i, &a, &b, merge.as_mut());
            assert_eq!(d, m, "row {}", i);
        }

        // Row 0 = B[0] | B[1] = {1, 2}
        assert_eq!(multiply_row(0, &a, &b, dense.as_mut()), vec![1, 2]);
        // Row 1 = B[2] = {0}
        assert_eq!(multiply_row(1, &a, &b, merge.as_mut()), vec![0]);
        // Row 2 is empty
        assert!(multiply_row(2, &a, &b, dense.as_mut()).is_empty());
    }
}
