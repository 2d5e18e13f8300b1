//! Canonical coordinate (COO) representation of a sparse boolean matrix

use std::fmt;

use crate::constants::DEBUG_PRINT_LIMIT;
use crate::error::{Error, Result};
use crate::matrix::{Index, SparseBoolCSR};

/// Caller promises that let `build_with_hints` skip canonicalization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildHints {
    /// Input pairs are already sorted by (row, col)
    pub sorted: bool,
    /// Input pairs contain no duplicates
    pub no_duplicates: bool,
}

/// What `resize` does with entries that fall outside the new bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizePolicy {
    /// Silently drop out-of-range entries
    #[default]
    Truncate,
    /// Fail with `InvalidDimension` if any entry would be dropped
    Strict,
}

/// A sparse boolean matrix stored as sorted, duplicate-free coordinate pairs
///
/// The matrix always satisfies:
/// - every `(row, col)` lies within `nrows × ncols`
/// - no pair is stored twice
/// - pairs are strictly increasing by row, then by column
///
/// Two matrices with the same logical content therefore have identical
/// `rows()` and `cols()` sequences. The debug marker is not part of the
/// content and is ignored by equality.
#[derive(Clone, Default)]
pub struct SparseBoolMatrix {
    nrows: Index,
    ncols: Index,
    rows: Vec<Index>,
    cols: Vec<Index>,
    marker: String,
}

impl SparseBoolMatrix {
    /// Creates an empty matrix with the given dimensions
    pub fn empty(nrows: Index, ncols: Index) -> Self {
        Self {
            nrows,
            ncols,
            rows: Vec::new(),
            cols: Vec::new(),
            marker: String::new(),
        }
    }

    /// Creates an identity matrix of the given size
    pub fn identity(n: Index) -> Self {
        let idx: Vec<Index> = (0..n).collect();
        Self::from_canonical(n, n, idx.clone(), idx)
    }

    /// Builds a matrix from caller-supplied coordinates
    ///
    /// The input may be unsorted and contain duplicates; it is canonicalized
    /// on ingestion.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `rows` and `cols` differ in length
    /// - `InvalidDimension` if any pair lies outside `nrows × ncols`
    pub fn build(nrows: Index, ncols: Index, rows: &[Index], cols: &[Index]) -> Result<Self> {
        Self::build_with_hints(nrows, ncols, rows, cols, BuildHints::default())
    }

    /// Builds a matrix, trusting `hints` only after an O(n) check
    ///
    /// If the hints claim sorted, duplicate-free input and the check agrees,
    /// the sort is skipped. Otherwise the pairs are canonicalized as in
    /// `build`.
    pub fn build_with_hints(
        nrows: Index,
        ncols: Index,
        rows: &[Index],
        cols: &[Index],
        hints: BuildHints,
    ) -> Result<Self> {
        if rows.len() != cols.len() {
            return Err(Error::InvalidArgument(format!(
                "row and column index arrays differ in length ({} vs {})",
                rows.len(),
                cols.len()
            )));
        }

        if let Some((r, c)) = rows
            .iter()
            .zip(cols)
            .find(|&(&r, &c)| r >= nrows || c >= ncols)
        {
            return Err(Error::InvalidDimension(format!(
                "entry ({}, {}) is out of bounds for a {}x{} matrix",
                r, c, nrows, ncols
            )));
        }

        if hints.sorted && hints.no_duplicates && is_strictly_increasing(rows, cols) {
            return Ok(Self::from_canonical(nrows, ncols, rows.to_vec(), cols.to_vec()));
        }

        let mut pairs: Vec<(Index, Index)> = rows.iter().copied().zip(cols.iter().copied()).collect();
        pairs.sort_unstable();
        pairs.dedup();

        Ok(Self::from_pairs_sorted(nrows, ncols, pairs))
    }

    /// Wraps coordinate vectors that are already canonical
    ///
    /// Used by operators whose construction guarantees the invariants.
    pub(crate) fn from_canonical(
        nrows: Index,
        ncols: Index,
        rows: Vec<Index>,
        cols: Vec<Index>,
    ) -> Self {
        debug_assert_eq!(rows.len(), cols.len());
        debug_assert!(is_strictly_increasing(&rows, &cols));
        debug_assert!(rows.iter().all(|&r| r < nrows));
        debug_assert!(cols.iter().all(|&c| c < ncols));

        Self {
            nrows,
            ncols,
            rows,
            cols,
            marker: String::new(),
        }
    }

    /// Splits sorted, deduplicated pairs into the coordinate sequences
    pub(crate) fn from_pairs_sorted(nrows: Index, ncols: Index, pairs: Vec<(Index, Index)>) -> Self {
        let (rows, cols) = pairs.into_iter().unzip();
        Self::from_canonical(nrows, ncols, rows, cols)
    }

    /// Number of rows
    pub fn nrows(&self) -> Index {
        self.nrows
    }

    /// Number of columns
    pub fn ncols(&self) -> Index {
        self.ncols
    }

    /// Matrix shape as `(nrows, ncols)`
    pub fn shape(&self) -> (Index, Index) {
        (self.nrows, self.ncols)
    }

    /// Number of stored true entries
    pub fn nvals(&self) -> usize {
        self.rows.len()
    }

    /// True if no entry is stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted row indices
    pub fn rows(&self) -> &[Index] {
        &self.rows
    }

    /// Column indices, parallel to `rows()`
    pub fn cols(&self) -> &[Index] {
        &self.cols
    }

    /// Returns copies of the sorted coordinate sequences
    pub fn extract(&self) -> (Vec<Index>, Vec<Index>) {
        (self.rows.clone(), self.cols.clone())
    }

    /// Iterates over stored `(row, col)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (Index, Index)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    /// True if `(row, col)` is stored
    pub fn contains(&self, row: Index, col: Index) -> bool {
        let start = self.rows.partition_point(|&r| r < row);
        let end = self.rows.partition_point(|&r| r <= row);
        self.cols[start..end].binary_search(&col).is_ok()
    }

    /// Returns a copy of this matrix with `(row, col)` set
    pub fn with_element(&self, row: Index, col: Index) -> Result<Self> {
        if row >= self.nrows || col >= self.ncols {
            return Err(Error::InvalidDimension(format!(
                "entry ({}, {}) is out of bounds for a {}x{} matrix",
                row, col, self.nrows, self.ncols
            )));
        }

        let pos = self
            .iter()
            .position(|pair| pair >= (row, col))
            .unwrap_or(self.nvals());

        let mut result = self.clone();
        if pos < self.nvals() && (self.rows[pos], self.cols[pos]) == (row, col) {
            return Ok(result);
        }
        result.rows.insert(pos, row);
        result.cols.insert(pos, col);
        Ok(result)
    }

    /// Resizes with the default policy (silent truncation)
    pub fn resize(&self, nrows: Index, ncols: Index) -> Result<Self> {
        self.resize_with(nrows, ncols, ResizePolicy::Truncate)
    }

    /// Resizes the matrix, handling out-of-range entries per `policy`
    ///
    /// Shrinking drops entries beyond the new bounds under
    /// `ResizePolicy::Truncate`; `ResizePolicy::Strict` reports them as
    /// `InvalidDimension` instead. The marker is preserved.
    pub fn resize_with(&self, nrows: Index, ncols: Index, policy: ResizePolicy) -> Result<Self> {
        let fits = |&(r, c): &(Index, Index)| r < nrows && c < ncols;

        if policy == ResizePolicy::Strict {
            if let Some((r, c)) = self.iter().find(|p| !fits(p)) {
                return Err(Error::InvalidDimension(format!(
                    "entry ({}, {}) does not fit the new {}x{} shape",
                    r, c, nrows, ncols
                )));
            }
        }

        let (rows, cols) = self.iter().filter(fits).unzip();
        let mut result = Self::from_canonical(nrows, ncols, rows, cols);
        result.marker = self.marker.clone();
        Ok(result)
    }

    /// Attaches a diagnostic label
    pub fn set_marker(&mut self, marker: impl Into<String>) {
        self.marker = marker.into();
    }

    /// The diagnostic label, empty if none was set
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Length of the marker including its NUL terminator
    pub fn marker_size_with_nul(&self) -> usize {
        self.marker.len() + 1
    }

    /// Copies the marker into a C-style buffer
    ///
    /// Copies `min(buffer.len(), true size)` bytes, terminates the last
    /// copied byte with NUL and returns the true size including the
    /// terminator, so callers can query with `None` first and detect
    /// truncation afterwards.
    pub fn marker_into(&self, buffer: Option<&mut [u8]>) -> usize {
        let actual = self.marker_size_with_nul();

        if let Some(buffer) = buffer {
            let to_copy = buffer.len().min(actual);
            if to_copy > 0 {
                let text = self.marker.as_bytes();
                let from_text = to_copy.min(text.len());
                buffer[..from_text].copy_from_slice(&text[..from_text]);
                buffer[to_copy - 1] = 0;
            }
        }

        actual
    }

    /// Row-compressed view of this matrix
    pub fn to_csr(&self) -> SparseBoolCSR {
        SparseBoolCSR::from_coo(self)
    }

    /// Extracts the `nrows × ncols` block starting at `(row, col)`
    pub fn submatrix(&self, row: Index, col: Index, nrows: Index, ncols: Index) -> Result<Self> {
        let row_end = row.checked_add(nrows);
        let col_end = col.checked_add(ncols);

        match (row_end, col_end) {
            (Some(re), Some(ce)) if re <= self.nrows && ce <= self.ncols => {
                let start = self.rows.partition_point(|&r| r < row);
                let end = self.rows.partition_point(|&r| r < re);

                let (rows, cols) = self.rows[start..end]
                    .iter()
                    .zip(&self.cols[start..end])
                    .filter(|&(_, &c)| c >= col && c < ce)
                    .map(|(&r, &c)| (r - row, c - col))
                    .unzip();

                Ok(Self::from_canonical(nrows, ncols, rows, cols))
            }
            _ => Err(Error::InvalidDimension(format!(
                "block {}x{} at ({}, {}) exceeds a {}x{} matrix",
                nrows, ncols, row, col, self.nrows, self.ncols
            ))),
        }
    }

    /// Collapses every row to a single column: `(i, 0)` is set iff row `i`
    /// has at least one entry
    pub fn reduce_rows(&self) -> Self {
        let mut rows = self.rows.clone();
        rows.dedup();
        let cols = vec![0; rows.len()];
        Self::from_canonical(self.nrows, 1, rows, cols)
    }
}

fn is_strictly_increasing(rows: &[Index], cols: &[Index]) -> bool {
    rows.windows(2)
        .zip(cols.windows(2))
        .all(|(r, c)| (r[0], c[0]) < (r[1], c[1]))
}

impl PartialEq for SparseBoolMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self.rows == other.rows
            && self.cols == other.cols
    }
}

impl Eq for SparseBoolMatrix {}

impl fmt::Debug for SparseBoolMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SparseBoolMatrix {{")?;
        if !self.marker.is_empty() {
            writeln!(f, "  marker: {:?}", self.marker)?;
        }
        writeln!(f, "  dimensions: {} × {}", self.nrows, self.ncols)?;
        writeln!(f, "  nvals: {}", self.nvals())?;

        let max_to_print = DEBUG_PRINT_LIMIT.min(self.nvals());
        if max_to_print > 0 {
            write!(f, "  entries:")?;
            for (r, c) in self.iter().take(max_to_print) {
                write!(f, " ({}, {})", r, c)?;
            }
            if self.nvals() > max_to_print {
                write!(f, " ... ({} more)", self.nvals() - max_to_print)?;
            }
            writeln!(f)?;
        }

        write!(f, "}}")
    }
}
