//! Row-compressed (CSR) view of a sparse boolean matrix

use std::fmt;

use crate::matrix::{Index, SparseBoolMatrix};

/// A sparse boolean matrix in Compressed Sparse Row (CSR) format
///
/// The CSR pattern stores a boolean matrix using two arrays:
/// - row_ptr: Array of size n_rows + 1 containing offsets into col_idx
/// - col_idx: Array of size nnz containing sorted column indices per row
///
/// There is no value array; every stored position is `true`.
#[derive(Clone, PartialEq, Eq)]
pub struct SparseBoolCSR {
    /// Number of rows in the matrix
    pub n_rows: usize,

    /// Number of columns in the matrix
    pub n_cols: usize,

    /// Row pointers (size: n_rows + 1)
    /// row_ptr[i] is the index in col_idx where row i starts
    pub row_ptr: Vec<usize>,

    /// Column indices (size: nnz), ascending within each row
    pub col_idx: Vec<Index>,
}

impl SparseBoolCSR {
    /// Builds the row-compressed view of a canonical matrix in O(nvals)
    pub fn from_coo(matrix: &SparseBoolMatrix) -> Self {
        let n_rows = matrix.nrows() as usize;
        let mut row_ptr = vec![0; n_rows + 1];

        for &r in matrix.rows() {
            row_ptr[r as usize + 1] += 1;
        }
        for i in 0..n_rows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Self {
            n_rows,
            n_cols: matrix.ncols() as usize,
            row_ptr,
            col_idx: matrix.cols().to_vec(),
        }
    }

    /// Assembles a CSR matrix from per-row sorted column lists
    pub fn from_rows(n_rows: usize, n_cols: usize, rows: Vec<Vec<Index>>) -> Self {
        debug_assert_eq!(rows.len(), n_rows);

        let mut row_ptr = Vec::with_capacity(n_rows + 1);
        row_ptr.push(0);

        let mut running_nnz = 0;
        for cols in &rows {
            running_nnz += cols.len();
            row_ptr.push(running_nnz);
        }

        let mut col_idx = Vec::with_capacity(running_nnz);
        for cols in rows {
            col_idx.extend(cols);
        }

        Self {
            n_rows,
            n_cols,
            row_ptr,
            col_idx,
        }
    }

    /// Returns the number of stored entries
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    /// Sorted column indices of row `i`
    pub fn row(&self, i: usize) -> &[Index] {
        &self.col_idx[self.row_ptr[i]..self.row_ptr[i + 1]]
    }

    /// Converts back to the canonical coordinate form
    pub fn to_coo(&self) -> SparseBoolMatrix {
        let mut rows = Vec::with_capacity(self.nnz());
        for i in 0..self.n_rows {
            let len = self.row_ptr[i + 1] - self.row_ptr[i];
            rows.extend(std::iter::repeat(i as Index).take(len));
        }

        SparseBoolMatrix::from_canonical(
            self.n_rows as Index,
            self.n_cols as Index,
            rows,
            self.col_idx.clone(),
        )
    }
}

impl fmt::Debug for SparseBoolCSR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SparseBoolCSR {{")?;
        writeln!(f, "  dimensions: {} × {}", self.n_rows, self.n_cols)?;
        writeln!(f, "  nnz: {}", self.nnz())?;

        let max_rows_to_print = 5.min(self.n_rows);
        for i in 0..max_rows_to_print {
            let row = self.row(i);
            if row.is_empty() {
                writeln!(f, "    row {}: (empty)", i)?;
            } else {
                writeln!(f, "    row {}: {:?}", i, row)?;
            }
        }
        if self.n_rows > max_rows_to_print {
            writeln!(f, "    ... ({} more rows)", self.n_rows - max_rows_to_print)?;
        }

        write!(f, "}}")
    }
}
