//! Device backend abstraction
//!
//! A [`ComputeDevice`] owns buffers of `u32` words and runs kernels from the
//! [`kernels`] catalog over them. [`DeviceBackend`] layers transfers,
//! zero-initialized outputs, two-phase sizing and timing on top of any
//! device.
//!
//! Two devices are provided:
//!
//! - [`CpuDevice`]: an in-process device that runs every work-item on a
//!   dedicated rayon pool
//! - `OpenClDevice` (feature `opencl`): a real OpenCL device via `opencl3`

pub mod cpu;
pub mod dispatch;
pub mod kernels;
#[cfg(feature = "opencl")]
pub mod opencl;

pub use cpu::{CpuBuffer, CpuDevice};
pub use dispatch::DeviceBackend;
pub use kernels::KernelId;
#[cfg(feature = "opencl")]
pub use opencl::OpenClDevice;

use crate::error::{Error, Result};

/// Description of a compute device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    /// Bytes of device memory, if known
    pub memory_bytes: Option<u64>,
    /// Number of hardware threads or compute units
    pub compute_units: usize,
}

/// A device-resident array of `u32` words
pub trait DeviceBuffer {
    /// Number of words
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One kernel dispatch
///
/// Arguments are bound in order: every entry of `buffers`, then every entry
/// of `scalars`. `global_size` is the number of work-items.
pub struct Launch<'a, B> {
    pub kernel: KernelId,
    pub buffers: &'a [&'a B],
    pub scalars: &'a [u32],
    pub global_size: usize,
}

impl<B> Launch<'_, B> {
    /// Checks the argument counts against the kernel signature
    pub fn check_arity(&self) -> Result<()> {
        if self.buffers.len() != self.kernel.buffer_arity()
            || self.scalars.len() != self.kernel.scalar_arity()
        {
            return Err(Error::DeviceError(format!(
                "kernel {} takes {} buffers and {} scalars, got {} and {}",
                self.kernel.name(),
                self.kernel.buffer_arity(),
                self.kernel.scalar_arity(),
                self.buffers.len(),
                self.scalars.len()
            )));
        }
        Ok(())
    }
}

/// Vendor compute API seam
///
/// Implementations translate every vendor failure into `Error::DeviceError`,
/// `Error::OutOfDeviceMemory` or `Error::DeviceNotPresent`. Buffers release
/// their device memory when dropped.
pub trait ComputeDevice: Send + Sync {
    type Buffer: DeviceBuffer + Send + Sync;

    fn info(&self) -> DeviceInfo;

    /// Allocates `len` words, all zero
    fn alloc_zeroed(&self, len: usize) -> Result<Self::Buffer>;

    /// Copies `data` into the start of `buffer`
    fn write(&self, buffer: &mut Self::Buffer, data: &[u32]) -> Result<()>;

    /// Copies the start of `buffer` into `out`
    fn read(&self, buffer: &Self::Buffer, out: &mut [u32]) -> Result<()>;

    /// Runs a kernel and blocks until the device reports completion
    fn launch(&self, launch: &Launch<'_, Self::Buffer>) -> Result<()>;
}

pub(crate) fn check_transfer(what: &str, buffer_len: usize, data_len: usize) -> Result<()> {
    if data_len > buffer_len {
        return Err(Error::DeviceError(format!(
            "{} of {} words exceeds a buffer of {}",
            what, data_len, buffer_len
        )));
    }
    Ok(())
}
