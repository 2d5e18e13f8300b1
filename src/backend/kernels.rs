//! Kernel catalog shared by every device
//!
//! Each kernel works on `u32` words. Arguments are bound in a fixed order:
//! all buffers first, then all scalars. A matrix lives on the device as a
//! `rows`/`cols` pair of equal length plus a row pointer array of
//! `nrows + 1` words produced by `row_offsets`.
//!
//! Variable-size outputs are produced in two passes. A `*_row_counts`
//! kernel writes one count per output row, the host scans the counts into
//! offsets, and the matching `*_fill` kernel writes each row at its offset.

/// Identifies one kernel entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelId {
    /// `row_ptr[r] = lower_bound(rows, r)`, one work-item per `r` in `0..=nrows`
    RowOffsets,
    /// Writes `r` into every slot of row `r`, one work-item per row
    ExpandRows,
    /// Kronecker entries per output row
    KronRowCounts,
    /// Kronecker columns per output row, already ascending
    KronFill,
    /// Distinct product columns per output row
    MxmRowCounts,
    /// Distinct product columns per output row, unsorted
    MxmFill,
    /// Size of the union of two rows
    AddRowCounts,
    /// Sorted union of two rows
    AddFill,
    /// Atomic count of entries per column, one work-item per entry
    ColumnHistogram,
    /// Atomic scatter of rows into column buckets, one work-item per entry
    TransposeScatter,
    /// Insertion sort of each segment, one work-item per segment
    SortSegments,
}

impl KernelId {
    pub const ALL: [KernelId; 11] = [
        KernelId::RowOffsets,
        KernelId::ExpandRows,
        KernelId::KronRowCounts,
        KernelId::KronFill,
        KernelId::MxmRowCounts,
        KernelId::MxmFill,
        KernelId::AddRowCounts,
        KernelId::AddFill,
        KernelId::ColumnHistogram,
        KernelId::TransposeScatter,
        KernelId::SortSegments,
    ];

    /// Entry point name in [`KERNEL_SOURCE`]
    pub fn name(self) -> &'static str {
        match self {
            KernelId::RowOffsets => "row_offsets",
            KernelId::ExpandRows => "expand_rows",
            KernelId::KronRowCounts => "kron_row_counts",
            KernelId::KronFill => "kron_fill",
            KernelId::MxmRowCounts => "mxm_row_counts",
            KernelId::MxmFill => "mxm_fill",
            KernelId::AddRowCounts => "add_row_counts",
            KernelId::AddFill => "add_fill",
            KernelId::ColumnHistogram => "column_histogram",
            KernelId::TransposeScatter => "transpose_scatter",
            KernelId::SortSegments => "sort_segments",
        }
    }

    /// Number of buffer arguments
    pub fn buffer_arity(self) -> usize {
        match self {
            KernelId::RowOffsets => 2,
            KernelId::ExpandRows => 2,
            KernelId::KronRowCounts => 3,
            KernelId::KronFill => 6,
            KernelId::MxmRowCounts | KernelId::AddRowCounts => 5,
            KernelId::MxmFill | KernelId::AddFill => 6,
            KernelId::ColumnHistogram => 2,
            KernelId::TransposeScatter => 5,
            KernelId::SortSegments => 2,
        }
    }

    /// Number of `uint` scalar arguments following the buffers
    pub fn scalar_arity(self) -> usize {
        match self {
            KernelId::RowOffsets => 1,
            KernelId::KronRowCounts => 1,
            KernelId::KronFill => 2,
            _ => 0,
        }
    }
}

/// OpenCL C source of every kernel in [`KernelId::ALL`]
pub const KERNEL_SOURCE: &str = r#"
uint lower_bound(__global const uint* data, uint lo, uint hi, uint value) {
    while (lo < hi) {
        uint mid = lo + (hi - lo) / 2;
        if (data[mid] < value) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    return lo;
}

int row_contains(__global const uint* ptr, __global const uint* cols, uint row, uint col) {
    uint hi = ptr[row + 1];
    uint pos = lower_bound(cols, ptr[row], hi, col);
    return pos < hi && cols[pos] == col;
}

/* True if an earlier selected row of B already produced column j.
   O(deg_A^2 * deg_B * log deg_B) per output row, no per-item scratch. */
int seen_before(__global const uint* a_cols, uint a_begin, uint p,
                __global const uint* b_ptr, __global const uint* b_cols, uint j) {
    for (uint q = a_begin; q < p; ++q) {
        if (row_contains(b_ptr, b_cols, a_cols[q], j)) {
            return 1;
        }
    }
    return 0;
}

__kernel void row_offsets(__global const uint* rows, __global uint* row_ptr, const uint nvals) {
    uint r = get_global_id(0);
    row_ptr[r] = lower_bound(rows, 0, nvals, r);
}

__kernel void expand_rows(__global const uint* row_ptr, __global uint* out_rows) {
    uint r = get_global_id(0);
    for (uint k = row_ptr[r]; k < row_ptr[r + 1]; ++k) {
        out_rows[k] = r;
    }
}

__kernel void kron_row_counts(__global const uint* a_ptr, __global const uint* b_ptr,
                              __global uint* counts, const uint b_nrows) {
    uint r = get_global_id(0);
    uint ia = r / b_nrows;
    uint ib = r % b_nrows;
    counts[r] = (a_ptr[ia + 1] - a_ptr[ia]) * (b_ptr[ib + 1] - b_ptr[ib]);
}

__kernel void kron_fill(__global const uint* a_ptr, __global const uint* a_cols,
                        __global const uint* b_ptr, __global const uint* b_cols,
                        __global const uint* offsets, __global uint* out_cols,
                        const uint b_nrows, const uint b_ncols) {
    uint r = get_global_id(0);
    uint ia = r / b_nrows;
    uint ib = r % b_nrows;
    uint pos = offsets[r];
    for (uint p = a_ptr[ia]; p < a_ptr[ia + 1]; ++p) {
        uint base = a_cols[p] * b_ncols;
        for (uint q = b_ptr[ib]; q < b_ptr[ib + 1]; ++q) {
            out_cols[pos++] = base + b_cols[q];
        }
    }
}

__kernel void mxm_row_counts(__global const uint* a_ptr, __global const uint* a_cols,
                             __global const uint* b_ptr, __global const uint* b_cols,
                             __global uint* counts) {
    uint i = get_global_id(0);
    uint count = 0;
    for (uint p = a_ptr[i]; p < a_ptr[i + 1]; ++p) {
        uint l = a_cols[p];
        for (uint q = b_ptr[l]; q < b_ptr[l + 1]; ++q) {
            if (!seen_before(a_cols, a_ptr[i], p, b_ptr, b_cols, b_cols[q])) {
                ++count;
            }
        }
    }
    counts[i] = count;
}

__kernel void mxm_fill(__global const uint* a_ptr, __global const uint* a_cols,
                       __global const uint* b_ptr, __global const uint* b_cols,
                       __global const uint* offsets, __global uint* out_cols) {
    uint i = get_global_id(0);
    uint pos = offsets[i];
    for (uint p = a_ptr[i]; p < a_ptr[i + 1]; ++p) {
        uint l = a_cols[p];
        for (uint q = b_ptr[l]; q < b_ptr[l + 1]; ++q) {
            uint j = b_cols[q];
            if (!seen_before(a_cols, a_ptr[i], p, b_ptr, b_cols, j)) {
                out_cols[pos++] = j;
            }
        }
    }
}

__kernel void add_row_counts(__global const uint* a_ptr, __global const uint* a_cols,
                             __global const uint* b_ptr, __global const uint* b_cols,
                             __global uint* counts) {
    uint i = get_global_id(0);
    uint p = a_ptr[i], p_end = a_ptr[i + 1];
    uint q = b_ptr[i], q_end = b_ptr[i + 1];
    uint count = 0;
    while (p < p_end && q < q_end) {
        uint x = a_cols[p], y = b_cols[q];
        p += (x <= y);
        q += (y <= x);
        ++count;
    }
    counts[i] = count + (p_end - p) + (q_end - q);
}

__kernel void add_fill(__global const uint* a_ptr, __global const uint* a_cols,
                       __global const uint* b_ptr, __global const uint* b_cols,
                       __global const uint* offsets, __global uint* out_cols) {
    uint i = get_global_id(0);
    uint p = a_ptr[i], p_end = a_ptr[i + 1];
    uint q = b_ptr[i], q_end = b_ptr[i + 1];
    uint pos = offsets[i];
    while (p < p_end && q < q_end) {
        uint x = a_cols[p], y = b_cols[q];
        out_cols[pos++] = min(x, y);
        p += (x <= y);
        q += (y <= x);
    }
    while (p < p_end) out_cols[pos++] = a_cols[p++];
    while (q < q_end) out_cols[pos++] = b_cols[q++];
}

__kernel void column_histogram(__global const uint* cols, __global uint* counts) {
    uint k = get_global_id(0);
    atomic_inc(&counts[cols[k]]);
}

__kernel void transpose_scatter(__global const uint* rows, __global const uint* cols,
                                __global const uint* offsets, __global uint* cursor,
                                __global uint* out_cols) {
    uint k = get_global_id(0);
    uint c = cols[k];
    uint pos = offsets[c] + atomic_inc(&cursor[c]);
    out_cols[pos] = rows[k];
}

__kernel void sort_segments(__global const uint* offsets, __global uint* data) {
    uint s = get_global_id(0);
    uint begin = offsets[s];
    uint end = offsets[s + 1];
    for (uint i = begin + 1; i < end; ++i) {
        uint value = data[i];
        uint j = i;
        while (j > begin && data[j - 1] > value) {
            data[j] = data[j - 1];
            --j;
        }
        data[j] = value;
    }
}
"#;
