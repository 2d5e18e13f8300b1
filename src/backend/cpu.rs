//! In-process compute device
//!
//! Runs each kernel as `global_size` independent work-items on a dedicated
//! rayon pool, with the same per-work-item logic as the OpenCL source in
//! [`super::kernels`]. Buffers are cache-line aligned arrays of atomics so
//! that work-items may write through shared references, and `atomic_inc`
//! in the device code maps to `fetch_add`.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use aligned_vec::AVec;
use rayon::prelude::*;

use super::kernels::KernelId;
use super::{check_transfer, ComputeDevice, DeviceBuffer, DeviceInfo, Launch};
use crate::constants::{DEVICE_BUFFER_ALIGNMENT, DEVICE_WORD_SIZE};
use crate::error::{Error, Result};
use crate::matrix::config::EngineConfig;

/// Buffer owned by a [`CpuDevice`]
pub struct CpuBuffer {
    words: AVec<AtomicU32>,
    allocated: Arc<AtomicUsize>,
}

impl std::fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBuffer")
            .field("len", &self.words.len())
            .finish_non_exhaustive()
    }
}

impl CpuBuffer {
    fn bytes(&self) -> usize {
        self.words.len() * DEVICE_WORD_SIZE
    }
}

impl DeviceBuffer for CpuBuffer {
    fn len(&self) -> usize {
        self.words.len()
    }
}

impl Drop for CpuBuffer {
    fn drop(&mut self) {
        self.allocated.fetch_sub(self.bytes(), Ordering::SeqCst);
    }
}

/// Data-parallel device backed by a rayon thread pool
pub struct CpuDevice {
    pool: rayon::ThreadPool,
    n_threads: usize,
    memory_limit: Option<usize>,
    allocated: Arc<AtomicUsize>,
}

impl std::fmt::Debug for CpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuDevice")
            .field("n_threads", &self.n_threads)
            .field("memory_limit", &self.memory_limit)
            .field("allocated", &self.allocated_bytes())
            .finish_non_exhaustive()
    }
}

impl CpuDevice {
    /// Creates a device sized by `config.system_params`
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let n_threads = config.system_params.n_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("spbool-device-{}", i))
            .build()
            .map_err(|e| Error::DeviceNotPresent(format!("cannot start device threads: {}", e)))?;

        log::debug!(
            "cpu device: {} threads, memory limit {:?}",
            n_threads,
            config.system_params.device_memory_limit
        );

        Ok(Self {
            pool,
            n_threads,
            memory_limit: config.system_params.device_memory_limit,
            allocated: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Bytes currently held by live buffers
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    fn reserve(&self, bytes: usize) -> Result<()> {
        let limit = self.memory_limit;
        self.allocated
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let next = current.checked_add(bytes)?;
                match limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|current| Error::OutOfDeviceMemory {
                requested: bytes,
                available: limit.map_or(usize::MAX - current, |l| l.saturating_sub(current)),
            })
    }
}

impl ComputeDevice for CpuDevice {
    type Buffer = CpuBuffer;

    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "cpu".to_string(),
            vendor: "spbool".to_string(),
            memory_bytes: self.memory_limit.map(|l| l as u64),
            compute_units: self.n_threads,
        }
    }

    fn alloc_zeroed(&self, len: usize) -> Result<CpuBuffer> {
        let bytes = len.checked_mul(DEVICE_WORD_SIZE).ok_or(Error::OutOfDeviceMemory {
            requested: usize::MAX,
            available: self.memory_limit.unwrap_or(usize::MAX),
        })?;
        self.reserve(bytes)?;

        log::trace!("cpu device: alloc {} words", len);
        Ok(CpuBuffer {
            words: AVec::from_iter(DEVICE_BUFFER_ALIGNMENT, (0..len).map(|_| AtomicU32::new(0))),
            allocated: Arc::clone(&self.allocated),
        })
    }

    fn write(&self, buffer: &mut CpuBuffer, data: &[u32]) -> Result<()> {
        check_transfer("write", buffer.len(), data.len())?;
        for (word, &value) in buffer.words.iter().zip(data) {
            word.store(value, Ordering::Relaxed);
        }
        Ok(())
    }

    fn read(&self, buffer: &CpuBuffer, out: &mut [u32]) -> Result<()> {
        check_transfer("read", buffer.len(), out.len())?;
        for (value, word) in out.iter_mut().zip(buffer.words.iter()) {
            *value = word.load(Ordering::Relaxed);
        }
        Ok(())
    }

    fn launch(&self, launch: &Launch<'_, CpuBuffer>) -> Result<()> {
        launch.check_arity()?;
        if launch.global_size == 0 {
            return Ok(());
        }

        let buffers: Vec<&[AtomicU32]> = launch.buffers.iter().map(|b| &b.words[..]).collect();
        let scalars = launch.scalars;
        let work = work_item(launch.kernel);

        // Out-of-range accesses inside a kernel surface as device faults
        panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                (0..launch.global_size)
                    .into_par_iter()
                    .for_each(|gid| work(gid, &buffers, scalars))
            })
        }))
        .map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown fault".to_string());
            Error::DeviceError(format!("kernel {} faulted: {}", launch.kernel.name(), reason))
        })
    }
}

type WorkItem = fn(usize, &[&[AtomicU32]], &[u32]);

fn work_item(kernel: KernelId) -> WorkItem {
    match kernel {
        KernelId::RowOffsets => row_offsets,
        KernelId::ExpandRows => expand_rows,
        KernelId::KronRowCounts => kron_row_counts,
        KernelId::KronFill => kron_fill,
        KernelId::MxmRowCounts => mxm_row_counts,
        KernelId::MxmFill => mxm_fill,
        KernelId::AddRowCounts => add_row_counts,
        KernelId::AddFill => add_fill,
        KernelId::ColumnHistogram => column_histogram,
        KernelId::TransposeScatter => transpose_scatter,
        KernelId::SortSegments => sort_segments,
    }
}

#[inline]
fn ld(buf: &[AtomicU32], i: usize) -> u32 {
    buf[i].load(Ordering::Relaxed)
}

#[inline]
fn st(buf: &[AtomicU32], i: usize, value: u32) {
    buf[i].store(value, Ordering::Relaxed)
}

fn row_range(ptr: &[AtomicU32], row: usize) -> Range<usize> {
    ld(ptr, row) as usize..ld(ptr, row + 1) as usize
}

fn lower_bound(data: &[AtomicU32], mut lo: usize, mut hi: usize, value: u32) -> usize {
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if ld(data, mid) < value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn row_contains(ptr: &[AtomicU32], cols: &[AtomicU32], row: usize, col: u32) -> bool {
    let range = row_range(ptr, row);
    let pos = lower_bound(cols, range.start, range.end, col);
    pos < range.end && ld(cols, pos) == col
}

/// True if an earlier selected row of B already produced column `j`
///
/// Scans every earlier row with a binary search each, so one output row
/// costs O(deg_A² · deg_B · log deg_B). Work items keep no scratch memory.
fn seen_before(
    a_cols: &[AtomicU32],
    mut earlier: Range<usize>,
    b_ptr: &[AtomicU32],
    b_cols: &[AtomicU32],
    j: u32,
) -> bool {
    earlier.any(|q| row_contains(b_ptr, b_cols, ld(a_cols, q) as usize, j))
}

fn row_offsets(gid: usize, b: &[&[AtomicU32]], s: &[u32]) {
    st(b[1], gid, lower_bound(b[0], 0, s[0] as usize, gid as u32) as u32);
}

fn expand_rows(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    for k in row_range(b[0], gid) {
        st(b[1], k, gid as u32);
    }
}

fn kron_row_counts(gid: usize, b: &[&[AtomicU32]], s: &[u32]) {
    let k = s[0] as usize;
    let (ia, ib) = (gid / k, gid % k);
    let count = row_range(b[0], ia).len() * row_range(b[1], ib).len();
    st(b[2], gid, count as u32);
}

fn kron_fill(gid: usize, b: &[&[AtomicU32]], s: &[u32]) {
    let (a_ptr, a_cols, b_ptr, b_cols, offsets, out) = (b[0], b[1], b[2], b[3], b[4], b[5]);
    let (k, t) = (s[0] as usize, s[1]);
    let (ia, ib) = (gid / k, gid % k);

    let mut pos = ld(offsets, gid) as usize;
    for p in row_range(a_ptr, ia) {
        let base = ld(a_cols, p) * t;
        for q in row_range(b_ptr, ib) {
            st(out, pos, base + ld(b_cols, q));
            pos += 1;
        }
    }
}

fn mxm_row_counts(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    let (a_ptr, a_cols, b_ptr, b_cols, counts) = (b[0], b[1], b[2], b[3], b[4]);
    let a_row = row_range(a_ptr, gid);

    let mut count = 0;
    for p in a_row.clone() {
        for q in row_range(b_ptr, ld(a_cols, p) as usize) {
            if !seen_before(a_cols, a_row.start..p, b_ptr, b_cols, ld(b_cols, q)) {
                count += 1;
            }
        }
    }
    st(counts, gid, count);
}

fn mxm_fill(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    let (a_ptr, a_cols, b_ptr, b_cols, offsets, out) = (b[0], b[1], b[2], b[3], b[4], b[5]);
    let a_row = row_range(a_ptr, gid);

    let mut pos = ld(offsets, gid) as usize;
    for p in a_row.clone() {
        for q in row_range(b_ptr, ld(a_cols, p) as usize) {
            let j = ld(b_cols, q);
            if !seen_before(a_cols, a_row.start..p, b_ptr, b_cols, j) {
                st(out, pos, j);
                pos += 1;
            }
        }
    }
}

/// Merges row `gid` of two CSR operands, calling `emit` for each union column
fn merge_rows(gid: usize, b: &[&[AtomicU32]], mut emit: impl FnMut(u32)) {
    let (a_ptr, a_cols, b_ptr, b_cols) = (b[0], b[1], b[2], b[3]);
    let Range { start: mut p, end: p_end } = row_range(a_ptr, gid);
    let Range { start: mut q, end: q_end } = row_range(b_ptr, gid);

    while p < p_end && q < q_end {
        let (x, y) = (ld(a_cols, p), ld(b_cols, q));
        emit(x.min(y));
        p += (x <= y) as usize;
        q += (y <= x) as usize;
    }
    (p..p_end).for_each(|p| emit(ld(a_cols, p)));
    (q..q_end).for_each(|q| emit(ld(b_cols, q)));
}

fn add_row_counts(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    let mut count = 0;
    merge_rows(gid, b, |_| count += 1);
    st(b[4], gid, count);
}

fn add_fill(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    let (offsets, out) = (b[4], b[5]);
    let mut pos = ld(offsets, gid) as usize;
    merge_rows(gid, b, |col| {
        st(out, pos, col);
        pos += 1;
    });
}

fn column_histogram(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    b[1][ld(b[0], gid) as usize].fetch_add(1, Ordering::Relaxed);
}

fn transpose_scatter(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    let (rows, cols, offsets, cursor, out) = (b[0], b[1], b[2], b[3], b[4]);
    let c = ld(cols, gid) as usize;
    let pos = ld(offsets, c) + cursor[c].fetch_add(1, Ordering::Relaxed);
    st(out, pos as usize, ld(rows, gid));
}

fn sort_segments(gid: usize, b: &[&[AtomicU32]], _s: &[u32]) {
    let (offsets, data) = (b[0], b[1]);
    let range = row_range(offsets, gid);

    let mut segment: Vec<u32> = range.clone().map(|i| ld(data, i)).collect();
    segment.sort_unstable();
    for (i, value) in range.zip(segment) {
        st(data, i, value);
    }
}
