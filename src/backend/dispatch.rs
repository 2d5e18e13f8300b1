//! Transfer, dispatch and sizing on top of a [`ComputeDevice`]

use super::kernels::KernelId;
use super::{ComputeDevice, DeviceBuffer, Launch};
use crate::error::{Error, Result};
use crate::instrument::{DefaultInstrument, Instrument, Phase};
use crate::utils::exclusive_scan;

/// A compute device together with the instrument that times its work
///
/// Every transfer is recorded as [`Phase::Transfer`] and every kernel
/// dispatch as [`Phase::Kernel`], labelled with the kernel's entry point.
pub struct DeviceBackend<D: ComputeDevice, I: Instrument = DefaultInstrument> {
    device: D,
    instrument: I,
}

impl<D: ComputeDevice> DeviceBackend<D> {
    /// Wraps a device with the default instrument
    pub fn new(device: D) -> Self {
        Self::with_instrument(device, DefaultInstrument::default())
    }
}

impl<D: ComputeDevice, I: Instrument> DeviceBackend<D, I> {
    pub fn with_instrument(device: D, instrument: I) -> Self {
        log::debug!("device backend on {:?}", device.info().name);
        Self { device, instrument }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    /// Allocates a zeroed buffer of `len` words
    pub fn alloc_zeroed(&self, len: usize) -> Result<D::Buffer> {
        self.device.alloc_zeroed(len)
    }

    /// Copies host words into a new device buffer
    pub fn upload(&self, data: &[u32]) -> Result<D::Buffer> {
        self.instrument.time("upload", Phase::Transfer, || {
            let mut buffer = self.device.alloc_zeroed(data.len())?;
            if !data.is_empty() {
                log::trace!("upload {} words", data.len());
                self.device.write(&mut buffer, data)?;
            }
            Ok(buffer)
        })
    }

    /// Copies the first `len` words of a device buffer back to the host
    pub fn download(&self, buffer: &D::Buffer, len: usize) -> Result<Vec<u32>> {
        self.instrument.time("download", Phase::Transfer, || {
            let mut out = vec![0; len];
            if len > 0 {
                log::trace!("download {} of {} words", len, buffer.len());
                self.device.read(buffer, &mut out)?;
            }
            Ok(out)
        })
    }

    /// Runs a kernel over existing buffers
    ///
    /// A launch with no work-items is skipped.
    pub fn run_in_place(
        &self,
        kernel: KernelId,
        buffers: &[&D::Buffer],
        scalars: &[u32],
        global_size: usize,
    ) -> Result<()> {
        if global_size == 0 {
            return Ok(());
        }

        let launch = Launch {
            kernel,
            buffers,
            scalars,
            global_size,
        };
        self.instrument
            .time(kernel.name(), Phase::Kernel, || self.device.launch(&launch))
    }

    /// Runs a kernel whose last buffer argument is a fresh zeroed output
    /// of `output_len` words, and returns that output
    pub fn run_kernel(
        &self,
        kernel: KernelId,
        inputs: &[&D::Buffer],
        scalars: &[u32],
        global_size: usize,
        output_len: usize,
    ) -> Result<D::Buffer> {
        let output = self.device.alloc_zeroed(output_len)?;

        let mut buffers: Vec<&D::Buffer> = inputs.to_vec();
        buffers.push(&output);
        self.run_in_place(kernel, &buffers, scalars, global_size)?;
        drop(buffers);

        Ok(output)
    }

    /// Sizing pass for a variable-size output
    ///
    /// Runs `count_kernel` to get one count per segment, reads the counts
    /// back, scans them on the host and uploads the `n_segments + 1`
    /// offsets. Returns the offsets buffer and the total output length.
    pub fn size_rows(
        &self,
        count_kernel: KernelId,
        inputs: &[&D::Buffer],
        scalars: &[u32],
        global_size: usize,
        n_segments: usize,
    ) -> Result<(D::Buffer, usize)> {
        let counts = self.run_kernel(count_kernel, inputs, scalars, global_size, n_segments)?;
        let counts = self.download(&counts, n_segments)?;

        let offsets = self.instrument.time("exclusive_scan", Phase::Host, || {
            let counts: Vec<usize> = counts.iter().map(|&c| c as usize).collect();
            exclusive_scan(&counts)
        });

        let total = offsets.last().copied().unwrap_or(0);
        if total > u32::MAX as usize {
            return Err(Error::InvalidDimension(format!(
                "{} produces {} entries, more than the index type can address",
                count_kernel.name(),
                total
            )));
        }

        let offsets: Vec<u32> = offsets.into_iter().map(|o| o as u32).collect();
        Ok((self.upload(&offsets)?, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuDevice;
    use crate::instrument::Recorder;
    use crate::matrix::config::EngineConfig;

    fn backend() -> DeviceBackend<CpuDevice, Recorder> {
        let device = CpuDevice::new(&EngineConfig::default().with_threads(2)).unwrap();
        DeviceBackend::with_instrument(device, Recorder::new())
    }

    #[test]
    fn test_upload_download() {
        let backend = backend();
        let buf = backend.upload(&[7, 8, 9]).unwrap();

        assert_eq!(backend.download(&buf, 2).unwrap(), vec![7, 8]);
        assert!(backend.download(&buf, 0).unwrap().is_empty());
        assert_eq!(backend.instrument().count(Phase::Transfer), 3);
    }

    #[test]
    fn test_size_rows_with_add_counts() {
        let backend = backend();

        // A = [0 1; 1 0], B = [0 1; 0 1] as CSR
        let a_ptr = backend.upload(&[0, 1, 2]).unwrap();
        let a_cols = backend.upload(&[1, 0]).unwrap();
        let b_ptr = backend.upload(&[0, 1, 2]).unwrap();
        let b_cols = backend.upload(&[1, 1]).unwrap();

        let (offsets, total) = backend
            .size_rows(
                KernelId::AddRowCounts,
                &[&a_ptr, &a_cols, &b_ptr, &b_cols],
                &[],
                2,
                2,
            )
            .unwrap();

        assert_eq!(total, 3);
        assert_eq!(backend.download(&offsets, 3).unwrap(), vec![0, 1, 3]);
        assert_eq!(backend.instrument().count(Phase::Kernel), 1);
        assert_eq!(backend.instrument().count(Phase::Host), 1);
    }

    #[test]
    fn test_empty_launch_is_skipped() {
        let backend = backend();
        let out = backend
            .run_kernel(KernelId::ExpandRows, &[], &[], 0, 0)
            .unwrap();

        assert!(out.is_empty());
        assert_eq!(backend.instrument().count(Phase::Kernel), 0);
    }
}
