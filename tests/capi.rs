//! C ABI behaviour: lifecycle, status codes, handles and markers
//!
//! The library state is process-wide, so every test holds `SERIAL` and
//! finalizes before returning.

use std::ffi::{c_char, CStr, CString};
use std::ptr;
use std::sync::{Mutex, MutexGuard};

use spbool::capi::*;
use spbool::Index;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serializes the test and starts from an initialized library
fn init(hints: Hints) -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    // A previous failing test may have left the library initialized
    spbool_Finalize();
    assert_eq!(spbool_Initialize(hints), Status::Success);
    guard
}

fn new_matrix(nrows: Index, ncols: Index, rows: &[Index], cols: &[Index]) -> MatrixHandle {
    let mut m: MatrixHandle = ptr::null_mut();
    unsafe {
        assert_eq!(spbool_Matrix_New(&mut m, nrows, ncols), Status::Success);
        assert_eq!(
            spbool_Matrix_Build(m, rows.as_ptr(), cols.as_ptr(), rows.len() as Index, SPBOOL_HINT_NO),
            Status::Success
        );
    }
    m
}

fn pairs(m: MatrixHandle) -> Vec<(Index, Index)> {
    unsafe {
        let mut nvals: Index = 0;
        assert_eq!(
            spbool_Matrix_ExtractPairs(m, ptr::null_mut(), ptr::null_mut(), &mut nvals),
            Status::Success
        );

        let mut rows = vec![0; nvals as usize];
        let mut cols = vec![0; nvals as usize];
        assert_eq!(
            spbool_Matrix_ExtractPairs(m, rows.as_mut_ptr(), cols.as_mut_ptr(), &mut nvals),
            Status::Success
        );
        rows.into_iter().zip(cols).collect()
    }
}

#[test]
fn test_version_string() {
    let version = unsafe { CStr::from_ptr(spbool_GetVersion()) };
    assert_eq!(version.to_str().unwrap(), spbool::VERSION);
}

#[test]
fn test_lifecycle_states() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);

    assert_eq!(spbool_Initialize(SPBOOL_HINT_CPU_BACKEND), Status::InvalidState);
    assert_eq!(spbool_Finalize(), Status::Success);
    assert_eq!(spbool_Finalize(), Status::InvalidState);

    let mut m: MatrixHandle = ptr::null_mut();
    assert_eq!(unsafe { spbool_Matrix_New(&mut m, 2, 2) }, Status::InvalidState);
    assert!(m.is_null());
}

#[cfg(not(feature = "opencl"))]
#[test]
fn test_no_device_without_backend_hint() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    spbool_Finalize();

    assert_eq!(spbool_Initialize(SPBOOL_HINT_NO), Status::DeviceNotPresent);
    // Still uninitialized, so a retry with a backend hint works
    assert_eq!(spbool_Initialize(SPBOOL_HINT_EMULATED_DEVICE), Status::Success);
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_operations_on_both_backends() {
    for hints in [SPBOOL_HINT_CPU_BACKEND, SPBOOL_HINT_EMULATED_DEVICE] {
        let _guard = init(hints);

        let a = new_matrix(2, 2, &[1, 0], &[0, 1]);
        let b = new_matrix(2, 2, &[0, 1], &[0, 1]);

        unsafe {
            let mut k: MatrixHandle = ptr::null_mut();
            assert_eq!(spbool_Kronecker(&mut k, a, b), Status::Success);
            assert_eq!(pairs(k), vec![(0, 2), (1, 3), (2, 0), (3, 1)]);

            let mut c: MatrixHandle = ptr::null_mut();
            assert_eq!(spbool_MxM(&mut c, a, a), Status::Success);
            assert_eq!(pairs(c), vec![(0, 0), (1, 1)]);

            let mut s: MatrixHandle = ptr::null_mut();
            assert_eq!(spbool_Matrix_EWiseAdd(&mut s, a, b), Status::Success);
            assert_eq!(pairs(s), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

            let mut acc: MatrixHandle = ptr::null_mut();
            assert_eq!(spbool_MxMAccumulate(&mut acc, a, b, b), Status::Success);
            assert_eq!(pairs(acc), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);

            let mut t: MatrixHandle = ptr::null_mut();
            assert_eq!(spbool_Matrix_Transpose(&mut t, k), Status::Success);
            assert_eq!(pairs(t), vec![(0, 2), (1, 3), (2, 0), (3, 1)]);

            for m in [a, b, k, c, s, acc, t] {
                assert_eq!(spbool_Matrix_Free(m), Status::Success);
            }
        }
        assert_eq!(spbool_Finalize(), Status::Success);
    }
}

#[test]
fn test_shape_mismatch_keeps_handles_valid() {
    let _guard = init(SPBOOL_HINT_EMULATED_DEVICE);

    let a = new_matrix(2, 2, &[0], &[0]);
    let b = new_matrix(3, 3, &[2], &[2]);

    unsafe {
        let mut c: MatrixHandle = ptr::null_mut();
        assert_eq!(spbool_Matrix_EWiseAdd(&mut c, a, b), Status::InvalidArgument);
        assert!(c.is_null());
        assert_eq!(spbool_MxM(&mut c, a, b), Status::InvalidArgument);
        assert!(c.is_null());

        assert_eq!(pairs(a), vec![(0, 0)]);
        assert_eq!(pairs(b), vec![(2, 2)]);
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_element_access() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(3, 3, &[0], &[2]);

    unsafe {
        assert_eq!(spbool_Matrix_HasElement(m, 0, 2), Status::Success);
        assert_eq!(spbool_Matrix_HasElement(m, 1, 1), Status::NoValue);
        assert_eq!(spbool_Matrix_HasElement(m, 3, 0), Status::InvalidArgument);

        assert_eq!(spbool_Matrix_SetElement(m, 1, 1), Status::Success);
        assert_eq!(spbool_Matrix_HasElement(m, 1, 1), Status::Success);
        assert_eq!(spbool_Matrix_SetElement(m, 0, 3), Status::InvalidArgument);

        let mut nvals: Index = 0;
        assert_eq!(spbool_Matrix_Nvals(m, &mut nvals), Status::Success);
        assert_eq!(nvals, 2);
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_build_rejects_out_of_bounds() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(2, 2, &[0], &[0]);

    unsafe {
        let rows = [0, 2];
        let cols = [0, 0];
        assert_eq!(
            spbool_Matrix_Build(m, rows.as_ptr(), cols.as_ptr(), 2, SPBOOL_HINT_NO),
            Status::InvalidArgument
        );
        assert_eq!(pairs(m), vec![(0, 0)]);

        // Canonical input with hints
        let rows = [0, 1];
        let cols = [1, 0];
        let hints = SPBOOL_HINT_SORTED | SPBOOL_HINT_NO_DUPLICATES;
        assert_eq!(
            spbool_Matrix_Build(m, rows.as_ptr(), cols.as_ptr(), 2, hints),
            Status::Success
        );
        assert_eq!(pairs(m), vec![(0, 1), (1, 0)]);
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_extract_pairs_capacity() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(3, 3, &[0, 1, 2], &[0, 1, 2]);

    unsafe {
        let mut rows = [0; 2];
        let mut cols = [0; 2];
        let mut nvals: Index = 2;
        assert_eq!(
            spbool_Matrix_ExtractPairs(m, rows.as_mut_ptr(), cols.as_mut_ptr(), &mut nvals),
            Status::InvalidArgument
        );

        nvals = 3;
        assert_eq!(
            spbool_Matrix_ExtractPairs(m, rows.as_mut_ptr(), ptr::null_mut(), &mut nvals),
            Status::InvalidArgument
        );
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_marker_roundtrip_and_truncation() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(1, 1, &[], &[]);
    let label = CString::new("frontier").unwrap();

    unsafe {
        assert_eq!(spbool_Matrix_SetMarker(m, label.as_ptr()), Status::Success);

        // Size query
        let mut size: Index = 0;
        assert_eq!(spbool_Matrix_Marker(m, ptr::null_mut(), &mut size), Status::Success);
        assert_eq!(size, 9);

        let mut full = [0 as c_char; 16];
        size = full.len() as Index;
        assert_eq!(spbool_Matrix_Marker(m, full.as_mut_ptr(), &mut size), Status::Success);
        assert_eq!(size, 9);
        assert_eq!(CStr::from_ptr(full.as_ptr()).to_str().unwrap(), "frontier");

        let mut short = [0 as c_char; 5];
        size = short.len() as Index;
        assert_eq!(spbool_Matrix_Marker(m, short.as_mut_ptr(), &mut size), Status::Success);
        assert_eq!(size, 9);
        assert_eq!(CStr::from_ptr(short.as_ptr()).to_str().unwrap(), "fron");

        // Rebuilding keeps the marker, duplicating drops it
        let rows = [0];
        let cols = [0];
        assert_eq!(
            spbool_Matrix_Build(m, rows.as_ptr(), cols.as_ptr(), 1, SPBOOL_HINT_NO),
            Status::Success
        );
        assert_eq!(spbool_Matrix_Marker(m, ptr::null_mut(), &mut size), Status::Success);
        assert_eq!(size, 9);

        let mut dup: MatrixHandle = ptr::null_mut();
        assert_eq!(spbool_Matrix_Duplicate(m, &mut dup), Status::Success);
        assert_eq!(spbool_Matrix_Marker(dup, ptr::null_mut(), &mut size), Status::Success);
        assert_eq!(size, 1);
        assert_eq!(pairs(dup), vec![(0, 0)]);
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_structural_operations() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(4, 4, &[0, 0, 2, 3], &[0, 3, 1, 2]);

    unsafe {
        let mut block: MatrixHandle = ptr::null_mut();
        assert_eq!(
            spbool_Matrix_ExtractSubMatrix(&mut block, m, 2, 1, 2, 2),
            Status::Success
        );
        assert_eq!(pairs(block), vec![(0, 0), (1, 1)]);
        assert_eq!(
            spbool_Matrix_ExtractSubMatrix(&mut block, m, 3, 3, 2, 2),
            Status::InvalidArgument
        );

        let mut resized: MatrixHandle = ptr::null_mut();
        assert_eq!(spbool_Matrix_Resize(&mut resized, m, 3, 2), Status::Success);
        let (mut nrows, mut ncols): (Index, Index) = (0, 0);
        assert_eq!(spbool_Matrix_Nrows(resized, &mut nrows), Status::Success);
        assert_eq!(spbool_Matrix_Ncols(resized, &mut ncols), Status::Success);
        assert_eq!((nrows, ncols), (3, 2));
        assert_eq!(pairs(resized), vec![(0, 0), (2, 1)]);

        let mut reduced: MatrixHandle = ptr::null_mut();
        assert_eq!(spbool_Matrix_Reduce(&mut reduced, m), Status::Success);
        assert_eq!(pairs(reduced), vec![(0, 0), (2, 0), (3, 0)]);
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_invalid_handles() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(2, 2, &[], &[]);

    unsafe {
        let mut nvals: Index = 0;
        assert_eq!(spbool_Matrix_Nvals(ptr::null_mut(), &mut nvals), Status::InvalidArgument);
        assert_eq!(spbool_Matrix_Nvals(m, ptr::null_mut()), Status::InvalidArgument);

        assert_eq!(spbool_Matrix_Free(m), Status::Success);
        assert_eq!(spbool_Matrix_Nvals(m, &mut nvals), Status::InvalidState);
        assert_eq!(spbool_Matrix_Free(m), Status::InvalidState);
    }
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_handles_not_reused_across_sessions() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let old = new_matrix(2, 2, &[0], &[1]);
    assert_eq!(spbool_Finalize(), Status::Success);

    assert_eq!(spbool_Initialize(SPBOOL_HINT_CPU_BACKEND), Status::Success);
    let fresh = new_matrix(7, 7, &[3], &[3]);
    assert_ne!(old, fresh);

    unsafe {
        let mut nrows: Index = 0;
        assert_eq!(spbool_Matrix_Nrows(old, &mut nrows), Status::InvalidState);
        assert_eq!(nrows, 0);
        assert_eq!(spbool_Matrix_Free(old), Status::InvalidState);

        assert_eq!(spbool_Matrix_Nrows(fresh, &mut nrows), Status::Success);
        assert_eq!(nrows, 7);
    }
    assert_eq!(pairs(fresh), vec![(3, 3)]);
    assert_eq!(spbool_Finalize(), Status::Success);
}

#[test]
fn test_concurrent_updates_of_one_handle() {
    let _guard = init(SPBOOL_HINT_CPU_BACKEND);
    let m = new_matrix(8, 8, &[], &[]);
    // Raw handles are not Send; the id crosses threads as an integer
    let id = m as usize;

    std::thread::scope(|scope| {
        for row in 0..8 {
            scope.spawn(move || {
                let handle = id as MatrixHandle;
                for col in 0..8 {
                    let status = unsafe { spbool_Matrix_SetElement(handle, row, col) };
                    assert_eq!(status, Status::Success);
                }
            });
        }
    });

    let mut nvals: Index = 0;
    assert_eq!(unsafe { spbool_Matrix_Nvals(m, &mut nvals) }, Status::Success);
    assert_eq!(nvals, 64);
    assert_eq!(spbool_Finalize(), Status::Success);
}
