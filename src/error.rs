//! Error types for spbool

use thiserror::Error;

use crate::matrix::Index;

/// Result type alias using spbool's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in spbool operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A coordinate or dimension does not fit the matrix bounds
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    /// Operand shapes are incompatible for an operation
    #[error("Dimension mismatch in '{op}': {lhs:?} vs {rhs:?}")]
    DimensionMismatch {
        /// The operation name
        op: &'static str,
        /// Left-hand side shape (rows, cols)
        lhs: (Index, Index),
        /// Right-hand side shape (rows, cols)
        rhs: (Index, Index),
    },

    /// Malformed caller input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The library has not been initialized
    #[error("Library is not initialized")]
    NotInitialized,

    /// The library was initialized twice
    #[error("Library is already initialized")]
    AlreadyInitialized,

    /// The handle was never issued or has already been released
    #[error("Invalid or released matrix handle {0}")]
    InvalidHandle(u64),

    /// No compute device is available
    #[error("Compute device not present: {0}")]
    DeviceNotPresent(String),

    /// The compute device reported a failure
    #[error("Device error: {0}")]
    DeviceError(String),

    /// A device allocation exceeded the available device memory
    #[error("Out of device memory: requested {requested} bytes, {available} available")]
    OutOfDeviceMemory {
        /// Bytes requested by the allocation
        requested: usize,
        /// Bytes still available on the device
        available: usize,
    },

    /// Operation is not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures originating on the compute device
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            Error::DeviceNotPresent(_) | Error::DeviceError(_) | Error::OutOfDeviceMemory { .. }
        )
    }
}
