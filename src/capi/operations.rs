//! Algebraic entry points
//!
//! Each operation resolves its operands, runs on the library's operator set
//! and publishes the result under a new handle.

use super::{arg_not_null, guarded, publish, resolve, MatrixHandle, Status};
use crate::error::Result;
use crate::matrix::SparseBoolMatrix;
use crate::operators::Operators;

/// Resolves two operands, runs `op` and writes the new handle to `result`
unsafe fn binary(
    result: *mut MatrixHandle,
    left: MatrixHandle,
    right: MatrixHandle,
    op: impl FnOnce(&dyn Operators, &SparseBoolMatrix, &SparseBoolMatrix) -> Result<SparseBoolMatrix>,
) -> Result<()> {
    arg_not_null(result, "result")?;
    let (ops, a) = resolve(left)?;
    let (_, b) = resolve(right)?;

    let c = op(ops.as_ref(), &a, &b)?;
    *result = publish(c)?;
    Ok(())
}

/// `result = left ∨ right`
#[no_mangle]
pub unsafe extern "C" fn spbool_Matrix_EWiseAdd(
    result: *mut MatrixHandle,
    left: MatrixHandle,
    right: MatrixHandle,
) -> Status {
    guarded("spbool_Matrix_EWiseAdd", || {
        binary(result, left, right, |ops, a, b| ops.add(a, b))
    })
}

/// `result = left · right`
#[no_mangle]
pub unsafe extern "C" fn spbool_MxM(
    result: *mut MatrixHandle,
    left: MatrixHandle,
    right: MatrixHandle,
) -> Status {
    guarded("spbool_MxM", || {
        binary(result, left, right, |ops, a, b| ops.multiply(a, b))
    })
}

/// `result = accum ∨ (left · right)`
#[no_mangle]
pub unsafe extern "C" fn spbool_MxMAccumulate(
    result: *mut MatrixHandle,
    accum: MatrixHandle,
    left: MatrixHandle,
    right: MatrixHandle,
) -> Status {
    guarded("spbool_MxMAccumulate", || {
        let (_, c) = resolve(accum)?;
        binary(result, left, right, |ops, a, b| ops.multiply_accumulate(&c, a, b))
    })
}

/// `result = left ⊗ right`
#[no_mangle]
pub unsafe extern "C" fn spbool_Kronecker(
    result: *mut MatrixHandle,
    left: MatrixHandle,
    right: MatrixHandle,
) -> Status {
    guarded("spbool_Kronecker", || {
        binary(result, left, right, |ops, a, b| ops.kronecker(a, b))
    })
}
