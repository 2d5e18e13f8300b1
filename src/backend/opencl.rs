//! OpenCL compute device
//!
//! Selects the first GPU (or any device if there is no GPU), builds the
//! kernel program once and keeps one compiled kernel per [`KernelId`].
//! Transfers are blocking; every dispatch waits on its completion event.

use std::collections::HashMap;
use std::ptr;
use std::sync::Mutex;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{get_all_devices, Device, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_GPU};
use opencl3::kernel::{ExecuteKernel, Kernel};
use opencl3::memory::{Buffer, CL_MEM_READ_WRITE};
use opencl3::program::Program;
use opencl3::types::{cl_uint, CL_BLOCKING};

use super::kernels::{KernelId, KERNEL_SOURCE};
use super::{check_transfer, ComputeDevice, DeviceBuffer, DeviceInfo, Launch};
use crate::constants::{DEVICE_WORD_SIZE, OPENCL_BUILD_OPTIONS};
use crate::error::{Error, Result};

/// Device memory owned by an [`OpenClDevice`]
pub struct OpenClBuffer {
    buffer: Buffer<cl_uint>,
    len: usize,
}

// SAFETY: cl_mem handles are reference counted by the OpenCL runtime and
// may be used from any thread.
unsafe impl Send for OpenClBuffer {}
unsafe impl Sync for OpenClBuffer {}

impl DeviceBuffer for OpenClBuffer {
    fn len(&self) -> usize {
        self.len
    }
}

/// A single OpenCL device with the kernel catalog compiled for it
pub struct OpenClDevice {
    _device: Device,
    context: Context,
    queue: CommandQueue,
    // Argument binding mutates the kernel object
    kernels: HashMap<KernelId, Mutex<Kernel>>,
    info: DeviceInfo,
    max_alloc_bytes: u64,
}

// SAFETY: OpenCL 1.2+ guarantees thread safety for context, command queue
// and memory objects; kernel objects are only touched under their mutex.
unsafe impl Send for OpenClDevice {}
unsafe impl Sync for OpenClDevice {}

fn device_error(what: &str) -> impl Fn(opencl3::error_codes::ClError) -> Error + '_ {
    move |e| Error::DeviceError(format!("{}: {}", what, e))
}

impl OpenClDevice {
    /// Opens the first GPU, or the first device of any type
    pub fn new() -> Result<Self> {
        let gpu_ids = get_all_devices(CL_DEVICE_TYPE_GPU).unwrap_or_default();
        let all_ids = get_all_devices(CL_DEVICE_TYPE_ALL).unwrap_or_default();

        let selected = gpu_ids
            .first()
            .or_else(|| all_ids.first())
            .copied()
            .ok_or_else(|| Error::DeviceNotPresent("no OpenCL device found".to_string()))?;

        let device = Device::new(selected);
        let info = DeviceInfo {
            name: device.name().unwrap_or_default().trim().to_string(),
            vendor: device.vendor().unwrap_or_default().trim().to_string(),
            memory_bytes: device.global_mem_size().ok(),
            compute_units: device.max_compute_units().unwrap_or(1) as usize,
        };
        let max_alloc_bytes = device.max_mem_alloc_size().unwrap_or(u64::MAX);

        let context = Context::from_device(&device)
            .map_err(|e| Error::DeviceNotPresent(format!("cannot create context: {}", e)))?;

        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .map_err(device_error("cannot create command queue"))?;

        let program =
            Program::create_and_build_from_source(&context, KERNEL_SOURCE, OPENCL_BUILD_OPTIONS)
                .map_err(|log| Error::DeviceError(format!("kernel build failed: {}", log)))?;

        let mut kernels = HashMap::new();
        for id in KernelId::ALL {
            let kernel = Kernel::create(&program, id.name()).map_err(device_error(id.name()))?;
            kernels.insert(id, Mutex::new(kernel));
        }

        log::debug!("opencl device: {} ({})", info.name, info.vendor);

        Ok(Self {
            _device: device,
            context,
            queue,
            kernels,
            info,
            max_alloc_bytes,
        })
    }
}

impl ComputeDevice for OpenClDevice {
    type Buffer = OpenClBuffer;

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn alloc_zeroed(&self, len: usize) -> Result<OpenClBuffer> {
        // Zero-length buffers are invalid in OpenCL
        let words = len.max(1);
        let bytes = (words * DEVICE_WORD_SIZE) as u64;
        if bytes > self.max_alloc_bytes {
            return Err(Error::OutOfDeviceMemory {
                requested: bytes as usize,
                available: self.max_alloc_bytes as usize,
            });
        }

        let mut buffer = unsafe {
            Buffer::<cl_uint>::create(&self.context, CL_MEM_READ_WRITE, words, ptr::null_mut())
                .map_err(device_error("buffer allocation"))?
        };

        let zeros = vec![0 as cl_uint; words];
        let event = unsafe {
            self.queue
                .enqueue_write_buffer(&mut buffer, CL_BLOCKING, 0, &zeros, &[])
                .map_err(device_error("buffer fill"))?
        };
        event.wait().map_err(device_error("buffer fill"))?;

        Ok(OpenClBuffer { buffer, len })
    }

    fn write(&self, buffer: &mut OpenClBuffer, data: &[u32]) -> Result<()> {
        check_transfer("write", buffer.len, data.len())?;
        let event = unsafe {
            self.queue
                .enqueue_write_buffer(&mut buffer.buffer, CL_BLOCKING, 0, data, &[])
                .map_err(device_error("write"))?
        };
        event.wait().map_err(device_error("write"))
    }

    fn read(&self, buffer: &OpenClBuffer, out: &mut [u32]) -> Result<()> {
        check_transfer("read", buffer.len, out.len())?;
        let event = unsafe {
            self.queue
                .enqueue_read_buffer(&buffer.buffer, CL_BLOCKING, 0, out, &[])
                .map_err(device_error("read"))?
        };
        event.wait().map_err(device_error("read"))
    }

    fn launch(&self, launch: &Launch<'_, OpenClBuffer>) -> Result<()> {
        launch.check_arity()?;
        if launch.global_size == 0 {
            return Ok(());
        }

        let kernel = self
            .kernels
            .get(&launch.kernel)
            .ok_or_else(|| Error::Internal(format!("kernel {} not built", launch.kernel.name())))?
            .lock()
            .map_err(|_| Error::DeviceError(format!("kernel {} poisoned", launch.kernel.name())))?;

        let scalars: Vec<cl_uint> = launch.scalars.to_vec();
        let event = unsafe {
            let mut exec = ExecuteKernel::new(&kernel);
            for buffer in launch.buffers {
                exec.set_arg(&buffer.buffer);
            }
            for scalar in &scalars {
                exec.set_arg(scalar);
            }
            exec.set_global_work_size(launch.global_size)
                .enqueue_nd_range(&self.queue)
                .map_err(device_error(launch.kernel.name()))?
        };
        event.wait().map_err(device_error(launch.kernel.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_if_device_present() {
        let device = match OpenClDevice::new() {
            Ok(d) => d,
            Err(_) => return, // skip: no OpenCL device
        };

        let mut buf = device.alloc_zeroed(4).unwrap();
        device.write(&mut buf, &[1, 2, 3, 4]).unwrap();

        let mut out = [0u32; 4];
        device.read(&buf, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }
}
