//! C ABI over opaque matrix handles
//!
//! Every entry point returns a [`Status`]. Matrices live in a process-wide
//! handle table; a handle is an opaque non-null pointer that encodes a table
//! id and is never dereferenced. Operations run on `Arc`-shared immutable
//! matrices outside the table lock and publish their result as a new handle.
//! A failed call writes no output handle and leaves its inputs as they were.
//!
//! Pointer arguments must be null or valid for the access the function
//! documents; output pointers are written only on success.

#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

mod matrix;
mod operations;

pub use matrix::*;
pub use operations::*;

use std::collections::HashMap;
use std::ffi::c_char;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::backend::CpuDevice;
use crate::constants::NULL_HANDLE;
use crate::error::{Error, Result};
use crate::matrix::config::EngineConfig;
use crate::matrix::SparseBoolMatrix;
use crate::operators::{DeviceOperators, HostOperators, Operators};

/// Status code returned by every C entry point
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    Error = 1,
    DeviceNotPresent = 2,
    DeviceError = 3,
    InvalidArgument = 4,
    InvalidState = 5,
    NotImplemented = 6,
    NoValue = 7,
}

impl From<()> for Status {
    fn from(_: ()) -> Self {
        Status::Success
    }
}

impl Error {
    /// Status code reported for this error at the C boundary
    pub fn status(&self) -> Status {
        match self {
            Error::InvalidDimension(_)
            | Error::DimensionMismatch { .. }
            | Error::InvalidArgument(_) => Status::InvalidArgument,
            Error::NotInitialized | Error::AlreadyInitialized | Error::InvalidHandle(_) => {
                Status::InvalidState
            }
            Error::DeviceNotPresent(_) => Status::DeviceNotPresent,
            Error::DeviceError(_) | Error::OutOfDeviceMemory { .. } => Status::DeviceError,
            Error::NotImplemented(_) => Status::NotImplemented,
            Error::Internal(_) => Status::Error,
        }
    }
}

/// Bit set of `SPBOOL_HINT_*` flags
pub type Hints = u32;

pub const SPBOOL_HINT_NO: Hints = 0;
/// Run operations on the host reference path
pub const SPBOOL_HINT_CPU_BACKEND: Hints = 1 << 0;
/// Run operations on the in-process device
pub const SPBOOL_HINT_EMULATED_DEVICE: Hints = 1 << 1;
/// Input pairs are sorted by (row, col)
pub const SPBOOL_HINT_SORTED: Hints = 1 << 2;
/// Input pairs contain no duplicates
pub const SPBOOL_HINT_NO_DUPLICATES: Hints = 1 << 3;

/// Target of a matrix handle; never instantiated
#[repr(C)]
pub struct SpboolMatrix {
    _private: [u8; 0],
}

/// Opaque matrix handle
pub type MatrixHandle = *mut SpboolMatrix;

struct Library {
    ops: Arc<dyn Operators>,
    matrices: HashMap<u64, Arc<SparseBoolMatrix>>,
}

static LIBRARY: Mutex<Option<Library>> = Mutex::new(None);

/// Ids are never reused, not even across Finalize and Initialize
static NEXT_ID: AtomicU64 = AtomicU64::new(NULL_HANDLE + 1);

fn lock() -> MutexGuard<'static, Option<Library>> {
    // The table stays consistent across a panic in an unrelated call
    LIBRARY.lock().unwrap_or_else(|e| e.into_inner())
}

fn with_library<T>(f: impl FnOnce(&mut Library) -> Result<T>) -> Result<T> {
    let mut guard = lock();
    let library = guard.as_mut().ok_or(Error::NotInitialized)?;
    f(library)
}

fn handle_id(handle: MatrixHandle) -> Result<u64> {
    if handle.is_null() {
        return Err(Error::InvalidArgument("null matrix handle".to_string()));
    }
    Ok(handle as usize as u64)
}

/// Operator set and the matrix behind `handle`
fn resolve(handle: MatrixHandle) -> Result<(Arc<dyn Operators>, Arc<SparseBoolMatrix>)> {
    let id = handle_id(handle)?;
    with_library(|lib| {
        let m = lib.matrices.get(&id).ok_or(Error::InvalidHandle(id))?;
        Ok((Arc::clone(&lib.ops), Arc::clone(m)))
    })
}

fn lookup(handle: MatrixHandle) -> Result<Arc<SparseBoolMatrix>> {
    resolve(handle).map(|(_, m)| m)
}

/// Adds a matrix to the table and returns its new handle
fn publish(matrix: SparseBoolMatrix) -> Result<MatrixHandle> {
    with_library(|lib| {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        lib.matrices.insert(id, Arc::new(matrix));
        Ok(id as usize as MatrixHandle)
    })
}

/// Replaces the matrix behind `handle` with `f` applied to it
///
/// The table lock is held from read to write so concurrent updates of one
/// handle are applied one after the other.
fn update(
    handle: MatrixHandle,
    f: impl FnOnce(&SparseBoolMatrix) -> Result<SparseBoolMatrix>,
) -> Result<()> {
    let id = handle_id(handle)?;
    with_library(|lib| {
        let slot = lib.matrices.get_mut(&id).ok_or(Error::InvalidHandle(id))?;
        *slot = Arc::new(f(slot)?);
        Ok(())
    })
}

fn release(handle: MatrixHandle) -> Result<()> {
    let id = handle_id(handle)?;
    with_library(|lib| {
        lib.matrices
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::InvalidHandle(id))
    })
}

fn arg_not_null<T>(ptr: *const T, name: &str) -> Result<()> {
    if ptr.is_null() {
        return Err(Error::InvalidArgument(format!("'{}' must not be null", name)));
    }
    Ok(())
}

fn ensure_initialized() -> Result<()> {
    lock().as_ref().map(|_| ()).ok_or(Error::NotInitialized)
}

/// Runs an entry point body once the library is known to be initialized
fn guarded<R: Into<Status>>(name: &str, body: impl FnOnce() -> Result<R>) -> Status {
    catching(name, || {
        ensure_initialized()?;
        body()
    })
}

/// Runs an entry point body, translating errors and panics into a status
fn catching<R: Into<Status>>(name: &str, body: impl FnOnce() -> Result<R>) -> Status {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(status)) => status.into(),
        Ok(Err(e)) => {
            log::warn!("{} failed: {}", name, e);
            e.status()
        }
        Err(_) => {
            log::error!("{} panicked", name);
            Status::Error
        }
    }
}

fn select_operators(hints: Hints, config: EngineConfig) -> Result<Arc<dyn Operators>> {
    if hints & SPBOOL_HINT_CPU_BACKEND != 0 {
        return Ok(Arc::new(HostOperators::new(config)));
    }
    if hints & SPBOOL_HINT_EMULATED_DEVICE != 0 {
        let device = CpuDevice::new(&config)?;
        return Ok(Arc::new(DeviceOperators::new(device)));
    }
    open_default_device()
}

#[cfg(feature = "opencl")]
fn open_default_device() -> Result<Arc<dyn Operators>> {
    let device = crate::backend::OpenClDevice::new()?;
    Ok(Arc::new(DeviceOperators::new(device)))
}

#[cfg(not(feature = "opencl"))]
fn open_default_device() -> Result<Arc<dyn Operators>> {
    Err(Error::DeviceNotPresent(
        "built without OpenCL support; pass SPBOOL_HINT_CPU_BACKEND or SPBOOL_HINT_EMULATED_DEVICE"
            .to_string(),
    ))
}

/// NUL-terminated library version
#[no_mangle]
pub extern "C" fn spbool_GetVersion() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Initializes the library with the backend chosen by `hints`
///
/// Fails with `InvalidState` if the library is already initialized and with
/// `DeviceNotPresent` if no backend hint is given and no device is found.
#[no_mangle]
pub extern "C" fn spbool_Initialize(hints: Hints) -> Status {
    catching("spbool_Initialize", || {
        let mut guard = lock();
        if guard.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let ops = select_operators(hints, EngineConfig::default())?;
        log::debug!("spbool initialized with {} operators", ops.name());

        *guard = Some(Library {
            ops,
            matrices: HashMap::new(),
        });
        Ok(())
    })
}

/// Releases every matrix and the backend
#[no_mangle]
pub extern "C" fn spbool_Finalize() -> Status {
    catching("spbool_Finalize", || {
        let library = lock().take().ok_or(Error::NotInitialized)?;
        if !library.matrices.is_empty() {
            log::debug!("finalize releases {} live matrices", library.matrices.len());
        }
        Ok(())
    })
}
