//! # spbool: sparse boolean matrix algebra
//!
//! spbool multiplies, adds, transposes and takes Kronecker products of large,
//! extremely sparse 0/1 matrices over the boolean semiring (AND for products,
//! OR for sums). It targets graph workloads such as frontier propagation,
//! relation composition and transitive closure.
//!
//! ## Overview
//!
//! - [`SparseBoolMatrix`] is the canonical representation: sorted,
//!   duplicate-free coordinate pairs. Every constructor and operator keeps
//!   it canonical, so equal content means equal sequences.
//! - [`matrix::reference`] holds the host operators, which double as the
//!   correctness oracle.
//! - [`backend`] abstracts a compute device behind [`ComputeDevice`] and
//!   provides an in-process device ([`CpuDevice`]) plus an OpenCL device
//!   behind the `opencl` feature.
//! - [`operators`] runs the same algebra on the host or on a device through
//!   one [`Operators`] trait.
//! - [`capi`] exposes everything through a C ABI with opaque handles and
//!   status codes (see `include/spbool.h`).
//!
//! ## Usage
//!
//! ```
//! use spbool::{SparseBoolMatrix, kronecker, multiply};
//!
//! let a = SparseBoolMatrix::build(2, 2, &[0, 0], &[0, 1]).unwrap();
//! let b = SparseBoolMatrix::identity(2);
//!
//! let c = multiply(&a, &b).unwrap();
//! assert_eq!(c, a);
//!
//! let k = kronecker(&a, &b).unwrap();
//! assert_eq!(k.shape(), (4, 4));
//! assert_eq!(k.nvals(), 4);
//! ```
//!
//! Running the same product on the in-process device:
//!
//! ```
//! use spbool::{CpuDevice, DeviceOperators, EngineConfig, Operators, SparseBoolMatrix};
//!
//! let device = CpuDevice::new(&EngineConfig::default()).unwrap();
//! let ops = DeviceOperators::new(device);
//!
//! let a = SparseBoolMatrix::build(2, 2, &[0, 1], &[1, 0]).unwrap();
//! let c = ops.multiply(&a, &a).unwrap();
//! assert_eq!(c, SparseBoolMatrix::identity(2));
//! ```

pub mod accumulator;
pub mod backend;
pub mod capi;
pub mod constants;
pub mod error;
pub mod instrument;
pub mod matrix;
pub mod operators;
pub mod parallel;
pub mod utils;

// Re-export primary components
pub use backend::{ComputeDevice, CpuDevice, DeviceBackend, DeviceInfo, KernelId};
pub use error::{Error, Result};
pub use instrument::{DefaultInstrument, Instrument, NoopInstrument, Phase, Recorder};
pub use matrix::config::{AccumulatorKind, EngineConfig, SystemParameters};
pub use matrix::{
    add, kronecker, multiply, multiply_accumulate, transpose, BuildHints, Index, ResizePolicy,
    SparseBoolCSR, SparseBoolMatrix,
};
pub use operators::{transitive_closure, DeviceOperators, HostOperators, Operators};
pub use parallel::multiply_parallel;
pub use utils::{from_dense, from_sprs, generate, to_dense, to_sprs};

#[cfg(feature = "opencl")]
pub use backend::OpenClDevice;

/// Version information for the spbool library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
