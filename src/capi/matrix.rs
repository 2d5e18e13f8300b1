//! Matrix lifecycle, content and query entry points

use std::ffi::{c_char, CStr};
use std::slice;

use super::{
    arg_not_null, guarded, lookup, publish, release, resolve, update, Hints,
    MatrixHandle, Status, SPBOOL_HINT_NO_DUPLICATES, SPBOOL_HINT_SORTED,
};
use crate::error::{Error, Result};
use crate::matrix::{BuildHints, Index, SparseBoolMatrix};

fn count(n: usize) -> Result<Index> {
    Index::try_from(n)
        .map_err(|_| Error::InvalidDimension(format!("{} entries exceed the index type", n)))
}

/// Creates an empty `nrows × ncols` matrix
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_New(
    matrix: *mut MatrixHandle,
    nrows: Index,
    ncols: Index,
) -> Status {
    guarded("spbool_Matrix_New", || {
        arg_not_null(matrix, "matrix")?;
        let handle = publish(SparseBoolMatrix::empty(nrows, ncols))?;
        *matrix = handle;
        Ok(())
    })
}

/// Replaces the content of `matrix` with `nvals` coordinate pairs
///
/// Unsorted input and duplicates are accepted. `SPBOOL_HINT_SORTED` together
/// with `SPBOOL_HINT_NO_DUPLICATES` skips canonicalization when the input
/// really is canonical. The debug marker is kept.
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Build(
    matrix: MatrixHandle,
    rows: *const Index,
    cols: *const Index,
    nvals: Index,
    hints: Hints,
) -> Status {
    guarded("spbool_Matrix_Build", || {
        let (rows, cols) = if nvals == 0 {
            (&[][..], &[][..])
        } else {
            arg_not_null(rows, "rows")?;
            arg_not_null(cols, "cols")?;
            (
                slice::from_raw_parts(rows, nvals as usize),
                slice::from_raw_parts(cols, nvals as usize),
            )
        };

        let build_hints = BuildHints {
            sorted: hints & SPBOOL_HINT_SORTED != 0,
            no_duplicates: hints & SPBOOL_HINT_NO_DUPLICATES != 0,
        };
        update(matrix, |current| {
            let mut built = SparseBoolMatrix::build_with_hints(
                current.nrows(),
                current.ncols(),
                rows,
                cols,
                build_hints,
            )?;
            built.set_marker(current.marker());
            Ok(built)
        })
    })
}

/// Sets entry `(i, j)`
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_SetElement(matrix: MatrixHandle, i: Index, j: Index) -> Status {
    guarded("spbool_Matrix_SetElement", || {
        update(matrix, |current| {
            let mut updated = current.with_element(i, j)?;
            updated.set_marker(current.marker());
            Ok(updated)
        })
    })
}

/// `Success` if `(i, j)` is set, `NoValue` otherwise
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_HasElement(matrix: MatrixHandle, i: Index, j: Index) -> Status {
    guarded("spbool_Matrix_HasElement", || {
        let m = lookup(matrix)?;
        if i >= m.nrows() || j >= m.ncols() {
            return Err(Error::InvalidDimension(format!(
                "entry ({}, {}) is out of bounds for a {}x{} matrix",
                i,
                j,
                m.nrows(),
                m.ncols()
            )));
        }
        Ok(if m.contains(i, j) {
            Status::Success
        } else {
            Status::NoValue
        })
    })
}

/// Attaches a NUL-terminated debug label
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_SetMarker(matrix: MatrixHandle, marker: *const c_char) -> Status {
    guarded("spbool_Matrix_SetMarker", || {
        arg_not_null(marker, "marker")?;
        let text = CStr::from_ptr(marker).to_string_lossy().into_owned();

        update(matrix, |current| {
            let mut updated = current.clone();
            updated.set_marker(text);
            Ok(updated)
        })
    })
}

/// Copies the debug label into `marker`
///
/// On entry `*size` is the capacity of `marker`; on return it holds the
/// label length including the terminator. Pass a null `marker` to query the
/// size. If the capacity is too small the copy is truncated and still
/// NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Marker(
    matrix: MatrixHandle,
    marker: *mut c_char,
    size: *mut Index,
) -> Status {
    guarded("spbool_Matrix_Marker", || {
        arg_not_null(size, "size")?;
        let m = lookup(matrix)?;

        let buffer = if marker.is_null() {
            None
        } else {
            Some(slice::from_raw_parts_mut(marker as *mut u8, *size as usize))
        };
        *size = count(m.marker_into(buffer))?;
        Ok(())
    })
}

/// Copies the stored pairs in canonical order
///
/// With null `rows` and `cols`, only writes the number of pairs to
/// `*nvals`. Otherwise `*nvals` is the capacity of both arrays and must be
/// at least the number of pairs.
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_ExtractPairs(
    matrix: MatrixHandle,
    rows: *mut Index,
    cols: *mut Index,
    nvals: *mut Index,
) -> Status {
    guarded("spbool_Matrix_ExtractPairs", || {
        arg_not_null(nvals, "nvals")?;
        let m = lookup(matrix)?;
        let actual = count(m.nvals())?;

        match (rows.is_null(), cols.is_null()) {
            (true, true) => {}
            (false, false) => {
                if *nvals < actual {
                    return Err(Error::InvalidArgument(format!(
                        "capacity {} is smaller than {} stored pairs",
                        *nvals, actual
                    )));
                }
                slice::from_raw_parts_mut(rows, m.nvals()).copy_from_slice(m.rows());
                slice::from_raw_parts_mut(cols, m.nvals()).copy_from_slice(m.cols());
            }
            _ => {
                return Err(Error::InvalidArgument(
                    "rows and cols must both be null or both be set".to_string(),
                ))
            }
        }

        *nvals = actual;
        Ok(())
    })
}

/// New matrix holding the `nrows × ncols` block of `matrix` at `(i, j)`
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_ExtractSubMatrix(
    result: *mut MatrixHandle,
    matrix: MatrixHandle,
    i: Index,
    j: Index,
    nrows: Index,
    ncols: Index,
) -> Status {
    guarded("spbool_Matrix_ExtractSubMatrix", || {
        arg_not_null(result, "result")?;
        let block = lookup(matrix)?.submatrix(i, j, nrows, ncols)?;
        *result = publish(block)?;
        Ok(())
    })
}

/// New matrix with the same content and no marker
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Duplicate(
    matrix: MatrixHandle,
    duplicate: *mut MatrixHandle,
) -> Status {
    guarded("spbool_Matrix_Duplicate", || {
        arg_not_null(duplicate, "duplicate")?;
        let mut copy = (*lookup(matrix)?).clone();
        copy.set_marker(String::new());
        *duplicate = publish(copy)?;
        Ok(())
    })
}

/// New matrix holding the transpose of `matrix`
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Transpose(result: *mut MatrixHandle, matrix: MatrixHandle) -> Status {
    guarded("spbool_Matrix_Transpose", || {
        arg_not_null(result, "result")?;
        let (ops, m) = resolve(matrix)?;
        let transposed = ops.transpose(&m)?;
        *result = publish(transposed)?;
        Ok(())
    })
}

/// New `nrows × ncols` matrix; entries outside the new bounds are dropped
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Resize(
    result: *mut MatrixHandle,
    matrix: MatrixHandle,
    nrows: Index,
    ncols: Index,
) -> Status {
    guarded("spbool_Matrix_Resize", || {
        arg_not_null(result, "result")?;
        let resized = lookup(matrix)?.resize(nrows, ncols)?;
        *result = publish(resized)?;
        Ok(())
    })
}

/// New `nrows × 1` matrix with `(i, 0)` set iff row `i` is non-empty
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Reduce(result: *mut MatrixHandle, matrix: MatrixHandle) -> Status {
    guarded("spbool_Matrix_Reduce", || {
        arg_not_null(result, "result")?;
        let reduced = lookup(matrix)?.reduce_rows();
        *result = publish(reduced)?;
        Ok(())
    })
}

#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Nrows(matrix: MatrixHandle, nrows: *mut Index) -> Status {
    guarded("spbool_Matrix_Nrows", || {
        arg_not_null(nrows, "nrows")?;
        *nrows = lookup(matrix)?.nrows();
        Ok(())
    })
}

#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Ncols(matrix: MatrixHandle, ncols: *mut Index) -> Status {
    guarded("spbool_Matrix_Ncols", || {
        arg_not_null(ncols, "ncols")?;
        *ncols = lookup(matrix)?.ncols();
        Ok(())
    })
}

#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Nvals(matrix: MatrixHandle, nvals: *mut Index) -> Status {
    guarded("spbool_Matrix_Nvals", || {
        arg_not_null(nvals, "nvals")?;
        *nvals = count(lookup(matrix)?.nvals())?;
        Ok(())
    })
}

/// Releases a matrix handle
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_Free(matrix: MatrixHandle) -> Status {
    guarded("spbool_Matrix_Free", || {
        release(matrix)
    })
}
