//! Dense accumulator implementation for boolean SpGEMM
//!
//! Uses an occupancy flag per output column, so each column is recorded
//! at most once no matter how many rows of B contribute it.

use crate::accumulator::Accumulator;
use crate::matrix::Index;

/// Dense accumulator for a single row of boolean sparse matrix multiplication
///
/// Best when the output is narrow enough that the flag array stays in
/// cache.
pub struct DenseAccumulator {
    /// Flags to track which output columns are already set
    occupied: Vec<bool>,

    /// Columns set in the current row, in discovery order
    col_indices: Vec<Index>,
}

impl DenseAccumulator {
    /// Create a new dense accumulator with specified column capacity
    ///
    /// # Arguments
    ///
    /// * `n_cols` - The number of columns in the output matrix (C)
    pub fn new(n_cols: usize) -> Self {
        Self {
            occupied: vec![false; n_cols],
            col_indices: Vec::new(),
        }
    }
}

impl Accumulator for DenseAccumulator {
    fn reset(&mut self) {
        // Only clear the flags we actually touched
        for &col in &self.col_indices {
            self.occupied[col as usize] = false;
        }
        self.col_indices.clear();
    }

    fn accumulate_row(&mut self, cols: &[Index]) {
        for &col in cols {
            let slot = &mut self.occupied[col as usize];
            if !*slot {
                *slot = true;
                self.col_indices.push(col);
            }
        }
    }

    fn extract_result(&mut self) -> Vec<Index> {
        let mut result = std::mem::take(&mut self.col_indices);
        for &col in &result {
            self.occupied[col as usize] = false;
        }
        result.sort_unstable();
        result
    }
}
