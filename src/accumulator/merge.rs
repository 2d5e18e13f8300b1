//! Merge-based accumulator implementation for boolean SpGEMM
//!
//! Keeps the current output row as a sorted list and merges each
//! contributing row of B into it. Memory is proportional to the row, not
//! to the output width, which suits very wide outputs.

use std::cmp::Ordering;

use crate::accumulator::Accumulator;
use crate::constants::MAX_MERGE_ACCUMULATOR_CAPACITY;
use crate::matrix::Index;

/// Sorted-merge accumulator for a single row of boolean SpGEMM
pub struct MergeAccumulator {
    /// Sorted, unique columns collected so far
    current: Vec<Index>,

    /// Scratch space for the next merge result
    scratch: Vec<Index>,
}

impl MergeAccumulator {
    /// Create a new merge accumulator
    ///
    /// # Arguments
    ///
    /// * `initial_capacity` - Initial capacity for the temporary storage
    pub fn new(initial_capacity: usize) -> Self {
        let capacity = initial_capacity.min(MAX_MERGE_ACCUMULATOR_CAPACITY);
        Self {
            current: Vec::with_capacity(capacity),
            scratch: Vec::with_capacity(capacity),
        }
    }
}

/// Union of two sorted, duplicate-free slices written into `out`
pub(crate) fn merge_union(lhs: &[Index], rhs: &[Index], out: &mut Vec<Index>) {
    out.clear();
    out.reserve(lhs.len() + rhs.len());

    let (mut i, mut j) = (0, 0);
    while i < lhs.len() && j < rhs.len() {
        match lhs[i].cmp(&rhs[j]) {
            Ordering::Less => {
                out.push(lhs[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(rhs[j]);
                j += 1;
            }
            Ordering::Equal => {
                out.push(lhs[i]);
                i += 1;
                j += 1;
            }
        }
    }

    out.extend_from_slice(&lhs[i..]);
    out.extend_from_slice(&rhs[j..]);
}

impl Accumulator for MergeAccumulator {
    fn reset(&mut self) {
        self.current.clear();
    }

    fn accumulate_row(&mut self, cols: &[Index]) {
        if cols.is_empty() {
            return;
        }
        if self.current.is_empty() {
            self.current.extend_from_slice(cols);
            return;
        }

        merge_union(&self.current, cols, &mut self.scratch);
        std::mem::swap(&mut self.current, &mut self.scratch);
    }

    fn extract_result(&mut self) -> Vec<Index> {
        std::mem::take(&mut self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_union() {
        let mut out = Vec::new();
        merge_union(&[0, 2, 4], &[1, 2, 5, 9], &mut out);
        assert_eq!(out, vec![0, 1, 2, 4, 5, 9]);

        merge_union(&[], &[3], &mut out);
        assert_eq!(out, vec![3]);
    }

    #[test]
    fn test_merge_accumulator() {
        let mut acc = MergeAccumulator::new(4);
        acc.accumulate_row(&[5, 8]);
        acc.accumulate_row(&[]);
        acc.accumulate_row(&[1, 5]);
        acc.accumulate_row(&[8, 100_000]);

        assert_eq!(acc.extract_result(), vec![1, 5, 8, 100_000]);
        assert!(acc.extract_result().is_empty());
    }
}
