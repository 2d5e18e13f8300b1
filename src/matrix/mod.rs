// Matrix data structures and host operations

pub mod config;
pub mod coo;
pub mod csr;
pub mod reference;

/// Row and column index type shared by every representation
pub type Index = u32;

pub use config::{AccumulatorKind, EngineConfig, SystemParameters};
pub use coo::{BuildHints, ResizePolicy, SparseBoolMatrix};
pub use csr::SparseBoolCSR;
pub use reference::{add, kronecker, multiply, multiply_accumulate, transpose};
