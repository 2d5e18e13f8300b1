//! Centralized constants for the spbool sparse boolean matrix library
//!
//! All new constants should be added here rather than scattered throughout the code.
//! Constants are organized by category for easy reference and maintenance.

// ============================================================================
// ACCUMULATOR THRESHOLDS
// ============================================================================

/// Output widths up to this many columns use the dense accumulator
pub const DEFAULT_DENSE_ACCUM_THRESHOLD: usize = 4096;

/// Maximum initial capacity reserved by the merge accumulator
pub const MAX_MERGE_ACCUMULATOR_CAPACITY: usize = 1024;

// ============================================================================
// DEVICE CONSTANTS
// ============================================================================

/// Alignment of in-process device buffers in bytes (one cache line)
pub const DEVICE_BUFFER_ALIGNMENT: usize = 64;

/// Size of one device word (`u32` index) in bytes
pub const DEVICE_WORD_SIZE: usize = std::mem::size_of::<u32>();

/// Build options passed to the OpenCL compiler
pub const OPENCL_BUILD_OPTIONS: &str = "-cl-std=CL1.2";

// ============================================================================
// INSTRUMENTATION
// ============================================================================

/// Most recent timing samples a recorder keeps; per-phase totals count all
pub const MAX_RECORDED_SAMPLES: usize = 4096;

// ============================================================================
// C API
// ============================================================================

/// Handle value never issued by the handle table
pub const NULL_HANDLE: u64 = 0;

/// Maximum entries shown in a matrix debug print
pub const DEBUG_PRINT_LIMIT: usize = 8;
