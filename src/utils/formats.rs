//! Utilities for converting between our matrix format and external libraries

use ndarray::Array2;
use num_traits::Num;
use sprs::CsMat;

use crate::error::{Error, Result};
use crate::matrix::{Index, SparseBoolMatrix};

fn to_index(value: usize, what: &str) -> Result<Index> {
    Index::try_from(value)
        .map_err(|_| Error::InvalidDimension(format!("{} {} exceeds the index type", what, value)))
}

/// Converts to an sprs CSR matrix with every stored entry set to one
pub fn to_sprs<T>(matrix: &SparseBoolMatrix) -> CsMat<T>
where
    T: Num + Copy,
{
    let csr = matrix.to_csr();
    let indices: Vec<usize> = csr.col_idx.iter().map(|&c| c as usize).collect();
    let data = vec![T::one(); indices.len()];

    CsMat::new((csr.n_rows, csr.n_cols), csr.row_ptr, indices, data)
}

/// Converts an sprs matrix (CSR or CSC), keeping every non-zero entry
pub fn from_sprs<T>(matrix: &CsMat<T>) -> Result<SparseBoolMatrix>
where
    T: Num + Copy,
{
    let (n_rows, n_cols) = matrix.shape();
    let nrows = to_index(n_rows, "row count")?;
    let ncols = to_index(n_cols, "column count")?;

    let mut rows = Vec::with_capacity(matrix.nnz());
    let mut cols = Vec::with_capacity(matrix.nnz());
    for (&value, (r, c)) in matrix.iter() {
        if value != T::zero() {
            rows.push(r as Index);
            cols.push(c as Index);
        }
    }

    // CSC storage yields pairs in column order
    SparseBoolMatrix::build(nrows, ncols, &rows, &cols)
}

/// Dense boolean view
pub fn to_dense(matrix: &SparseBoolMatrix) -> Array2<bool> {
    let mut dense = Array2::from_elem((matrix.nrows() as usize, matrix.ncols() as usize), false);
    for (r, c) in matrix.iter() {
        dense[[r as usize, c as usize]] = true;
    }
    dense
}

/// Sparse matrix holding the `true` cells of a dense array
pub fn from_dense(dense: &Array2<bool>) -> Result<SparseBoolMatrix> {
    let (n_rows, n_cols) = dense.dim();
    let nrows = to_index(n_rows, "row count")?;
    let ncols = to_index(n_cols, "column count")?;

    // indexed_iter walks in logical row-major order
    let (rows, cols): (Vec<Index>, Vec<Index>) = dense
        .indexed_iter()
        .filter(|&(_, &set)| set)
        .map(|((r, c), _)| (r as Index, c as Index))
        .unzip();

    SparseBoolMatrix::build(nrows, ncols, &rows, &cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseBoolMatrix {
        SparseBoolMatrix::build(3, 4, &[0, 0, 2, 2, 1], &[1, 3, 0, 2, 2]).unwrap()
    }

    #[test]
    fn test_sprs_roundtrip() {
        let original = sample();
        let sprs_mat: CsMat<f64> = to_sprs(&original);

        assert_eq!(sprs_mat.shape(), (3, 4));
        assert_eq!(sprs_mat.nnz(), 5);
        assert_eq!(sprs_mat.get(2, 0), Some(&1.0));
        assert_eq!(from_sprs(&sprs_mat).unwrap(), original);
    }

    #[test]
    fn test_from_sprs_csc_and_explicit_zeros() {
        let csc = CsMat::new_csc((2, 2), vec![0, 2, 3], vec![0, 1, 1], vec![1i32, 0, 7]);
        let m = from_sprs(&csc).unwrap();

        assert_eq!(m.rows(), &[0, 1]);
        assert_eq!(m.cols(), &[0, 1]);
    }

    #[test]
    fn test_dense_roundtrip() {
        let original = sample();
        let dense = to_dense(&original);

        assert_eq!(dense.dim(), (3, 4));
        assert!(dense[[1, 2]]);
        assert!(!dense[[1, 1]]);
        assert_eq!(dense.iter().filter(|&&v| v).count(), 5);
        assert_eq!(from_dense(&dense).unwrap(), original);
    }
}
