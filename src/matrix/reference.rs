//! Host reference implementations of the boolean matrix operators
//!
//! These are the correctness oracle for every device path. They are pure
//! functions of their operands, hold no shared state, and are safe to call
//! from several threads at once.

use crate::accumulator::{create_accumulator, merge::merge_union, multiply_row};
use crate::error::{Error, Result};
use crate::matrix::config::EngineConfig;
use crate::matrix::{Index, SparseBoolCSR, SparseBoolMatrix};

/// Checked product of two dimensions
pub(crate) fn checked_dim(lhs: Index, rhs: Index, what: &str) -> Result<Index> {
    lhs.checked_mul(rhs).ok_or_else(|| {
        Error::InvalidDimension(format!(
            "{} {} x {} overflows the index type",
            what, lhs, rhs
        ))
    })
}

/// Kronecker product of A (`m×n`) and B (`k×t`)
///
/// The result is `(m·k)×(n·t)` with exactly `nnz(A)·nnz(B)` entries: each
/// pair of stored entries `(ra, ca)` in A and `(rb, cb)` in B produces
/// `(k·ra + rb, t·ca + cb)`. All pairs are generated and then sorted by
/// row, then column.
pub fn kronecker(a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
    let (m, n) = a.shape();
    let (k, t) = b.shape();

    let nrows = checked_dim(m, k, "kronecker rows")?;
    let ncols = checked_dim(n, t, "kronecker cols")?;

    let nvals = a.nvals().checked_mul(b.nvals()).ok_or_else(|| {
        Error::InvalidDimension(format!(
            "kronecker of {} and {} entries overflows",
            a.nvals(),
            b.nvals()
        ))
    })?;

    let mut vals: Vec<(Index, Index)> = Vec::with_capacity(nvals);
    for (block_i, block_j) in a.iter() {
        for (value_i, value_j) in b.iter() {
            vals.push((k * block_i + value_i, t * block_j + value_j));
        }
    }

    // Every generated pair is distinct, so sorting alone canonicalizes
    vals.sort_unstable();

    Ok(SparseBoolMatrix::from_pairs_sorted(nrows, ncols, vals))
}

/// Boolean matrix product C = A·B (AND for products, OR for sums)
///
/// Uses the default engine configuration to choose accumulators.
pub fn multiply(a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
    multiply_with_config(a, b, &EngineConfig::default())
}

/// Boolean matrix product with an explicit configuration
///
/// Each output row is accumulated from the rows of B selected by A without
/// ever storing a column twice.
pub fn multiply_with_config(
    a: &SparseBoolMatrix,
    b: &SparseBoolMatrix,
    config: &EngineConfig,
) -> Result<SparseBoolMatrix> {
    check_multiply_dims(a, b)?;

    let a_csr = a.to_csr();
    let b_csr = b.to_csr();
    let n_cols = b.ncols() as usize;

    let mut accumulator = create_accumulator(n_cols, config);
    let rows: Vec<Vec<Index>> = (0..a_csr.n_rows)
        .map(|i| multiply_row(i, &a_csr, &b_csr, accumulator.as_mut()))
        .collect();

    Ok(SparseBoolCSR::from_rows(a_csr.n_rows, n_cols, rows).to_coo())
}

pub(crate) fn check_multiply_dims(a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<()> {
    if a.ncols() != b.nrows() {
        return Err(Error::DimensionMismatch {
            op: "multiply",
            lhs: a.shape(),
            rhs: b.shape(),
        });
    }
    Ok(())
}

pub(crate) fn check_same_shape(
    op: &'static str,
    a: &SparseBoolMatrix,
    b: &SparseBoolMatrix,
) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::DimensionMismatch {
            op,
            lhs: a.shape(),
            rhs: b.shape(),
        });
    }
    Ok(())
}

/// C ∨ (A·B) as a new matrix
pub fn multiply_accumulate(
    c: &SparseBoolMatrix,
    a: &SparseBoolMatrix,
    b: &SparseBoolMatrix,
) -> Result<SparseBoolMatrix> {
    let product = multiply(a, b)?;
    add(c, &product)
}

/// Element-wise OR of two matrices of the same shape
///
/// Both operands are canonical, so a single merge of the two sorted pair
/// streams yields the sorted, duplicate-free union.
pub fn add(a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
    check_same_shape("add", a, b)?;

    let mut lhs = a.iter().peekable();
    let mut rhs = b.iter().peekable();
    let mut vals = Vec::with_capacity(a.nvals() + b.nvals());

    loop {
        let next = match (lhs.peek(), rhs.peek()) {
            (Some(&l), Some(&r)) if l < r => lhs.next(),
            (Some(&l), Some(&r)) if l > r => rhs.next(),
            (Some(_), Some(_)) => {
                rhs.next();
                lhs.next()
            }
            (Some(_), None) => lhs.next(),
            (None, Some(_)) => rhs.next(),
            (None, None) => break,
        };
        vals.extend(next);
    }

    Ok(SparseBoolMatrix::from_pairs_sorted(a.nrows(), a.ncols(), vals))
}

/// Element-wise OR computed row by row on the CSR view
///
/// Produces the same result as `add`; kept as the row-wise formulation
/// that the device kernels mirror.
pub fn add_rowwise(a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
    check_same_shape("add", a, b)?;

    let a_csr = a.to_csr();
    let b_csr = b.to_csr();

    let rows = (0..a_csr.n_rows)
        .map(|i| {
            let mut out = Vec::new();
            merge_union(a_csr.row(i), b_csr.row(i), &mut out);
            out
        })
        .collect();

    Ok(SparseBoolCSR::from_rows(a_csr.n_rows, a_csr.n_cols, rows).to_coo())
}

/// Transpose: `(r, c)` becomes `(c, r)`
///
/// A counting sort by column keeps the original rows ascending inside each
/// new row, so the result is canonical without a comparison sort.
pub fn transpose(a: &SparseBoolMatrix) -> SparseBoolMatrix {
    let n_cols = a.ncols() as usize;

    // Count entries per column, then prefix sum into start offsets
    let mut col_ptr = vec![0usize; n_cols + 1];
    for &c in a.cols() {
        col_ptr[c as usize + 1] += 1;
    }
    for i in 0..n_cols {
        col_ptr[i + 1] += col_ptr[i];
    }

    let mut new_cols = vec![0 as Index; a.nvals()];
    let mut cursor = col_ptr.clone();
    for (r, c) in a.iter() {
        let pos = &mut cursor[c as usize];
        new_cols[*pos] = r;
        *pos += 1;
    }

    let csr = SparseBoolCSR {
        n_rows: n_cols,
        n_cols: a.nrows() as usize,
        row_ptr: col_ptr,
        col_idx: new_cols,
    };
    csr.to_coo()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(nrows: Index, ncols: Index, pairs: &[(Index, Index)]) -> SparseBoolMatrix {
        let (rows, cols): (Vec<_>, Vec<_>) = pairs.iter().copied().unzip();
        SparseBoolMatrix::build(nrows, ncols, &rows, &cols).unwrap()
    }

    #[test]
    fn test_kronecker_scenario() {
        let a = m(2, 2, &[(0, 0), (1, 1)]);
        let b = m(2, 2, &[(0, 1)]);

        let c = kronecker(&a, &b).unwrap();
        assert_eq!(c.shape(), (4, 4));
        assert_eq!(c, m(4, 4, &[(0, 1), (2, 3)]));
    }

    #[test]
    fn test_kronecker_output_is_sorted() {
        // Cross-product order differs from canonical order here
        let a = m(1, 2, &[(0, 0), (0, 1)]);
        let b = m(2, 1, &[(0, 0), (1, 0)]);

        let c = kronecker(&a, &b).unwrap();
        assert_eq!(c.shape(), (2, 2));
        assert_eq!(c.rows(), &[0, 0, 1, 1]);
        assert_eq!(c.cols(), &[0, 1, 0, 1]);
    }

    #[test]
    fn test_kronecker_overflow() {
        let a = SparseBoolMatrix::empty(1 << 20, 1);
        let b = SparseBoolMatrix::empty(1 << 20, 1);
        assert!(matches!(kronecker(&a, &b), Err(Error::InvalidDimension(_))));
    }

    #[test]
    fn test_multiply_scenario() {
        let a = m(2, 2, &[(0, 0), (0, 1)]);
        let b = m(2, 2, &[(0, 0), (1, 1)]);

        let c = multiply(&a, &b).unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (0, 1)]));
    }

    #[test]
    fn test_multiply_dimension_mismatch() {
        let a = SparseBoolMatrix::empty(2, 3);
        let b = SparseBoolMatrix::empty(2, 3);
        assert!(matches!(
            multiply(&a, &b),
            Err(Error::DimensionMismatch { op: "multiply", .. })
        ));
    }

    #[test]
    fn test_multiply_rectangular() {
        // (2x3) * (3x4)
        let a = m(2, 3, &[(0, 1), (1, 0), (1, 2)]);
        let b = m(3, 4, &[(0, 3), (1, 0), (2, 3)]);

        let c = multiply(&a, &b).unwrap();
        assert_eq!(c.shape(), (2, 4));
        assert_eq!(c, m(2, 4, &[(0, 0), (1, 3)]));
    }

    #[test]
    fn test_multiply_accumulate() {
        let c = m(2, 2, &[(1, 0)]);
        let a = m(2, 2, &[(0, 0)]);
        let b = m(2, 2, &[(0, 1)]);

        let r = multiply_accumulate(&c, &a, &b).unwrap();
        assert_eq!(r, m(2, 2, &[(0, 1), (1, 0)]));
    }

    #[test]
    fn test_add_scenario() {
        let a = m(2, 2, &[(0, 0)]);
        let b = m(2, 2, &[(0, 0), (1, 1)]);

        let c = add(&a, &b).unwrap();
        assert_eq!(c, m(2, 2, &[(0, 0), (1, 1)]));
        assert_eq!(add_rowwise(&a, &b).unwrap(), c);
    }

    #[test]
    fn test_add_dimension_mismatch() {
        let a = SparseBoolMatrix::empty(2, 2);
        let b = SparseBoolMatrix::empty(3, 3);
        assert!(matches!(add(&a, &b), Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_transpose() {
        let a = m(4, 4, &[(0, 0), (1, 1), (2, 2), (3, 0), (3, 1), (3, 2), (3, 3)]);
        let t = transpose(&a);

        assert_eq!(
            t.iter().collect::<Vec<_>>(),
            vec![(0, 0), (0, 3), (1, 1), (1, 3), (2, 2), (2, 3), (3, 3)]
        );
        assert_eq!(transpose(&t), a);
    }

    #[test]
    fn test_transpose_rectangular() {
        let a = m(2, 5, &[(0, 4), (1, 0)]);
        let t = transpose(&a);

        assert_eq!(t.shape(), (5, 2));
        assert_eq!(t, m(5, 2, &[(0, 1), (4, 0)]));
    }
}
