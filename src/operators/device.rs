//! Device implementations of the boolean operators
//!
//! Each operation uploads its operands, sizes the output with a count
//! kernel, materializes it with the matching fill kernel and reads the
//! canonical result back. Buffers live only for the duration of one call.
//! Failures are returned as they are; there is no retry on the host.

use crate::backend::{ComputeDevice, DeviceBackend, KernelId};
use crate::error::{Error, Result};
use crate::instrument::{DefaultInstrument, Instrument};
use crate::matrix::reference::{check_multiply_dims, check_same_shape, checked_dim};
use crate::matrix::{Index, SparseBoolMatrix};
use crate::operators::Operators;

/// A canonical matrix resident on the device
struct DeviceMatrix<B> {
    nrows: usize,
    nvals: usize,
    rows: B,
    cols: B,
    /// `nrows + 1` offsets into `cols`
    row_ptr: B,
}

/// Operators that run on a compute device
pub struct DeviceOperators<D: ComputeDevice, I: Instrument = DefaultInstrument> {
    backend: DeviceBackend<D, I>,
    name: String,
}

impl<D: ComputeDevice> DeviceOperators<D> {
    pub fn new(device: D) -> Self {
        Self::from_backend(DeviceBackend::new(device))
    }
}

impl<D: ComputeDevice, I: Instrument> DeviceOperators<D, I> {
    pub fn from_backend(backend: DeviceBackend<D, I>) -> Self {
        let name = format!("device:{}", backend.device().info().name);
        Self { backend, name }
    }

    pub fn backend(&self) -> &DeviceBackend<D, I> {
        &self.backend
    }

    fn upload(&self, m: &SparseBoolMatrix) -> Result<DeviceMatrix<D::Buffer>> {
        let nrows = m.nrows() as usize;
        let nvals = word(m.nvals(), "nvals")?;

        let rows = self.backend.upload(m.rows())?;
        let cols = self.backend.upload(m.cols())?;
        let row_ptr =
            self.backend
                .run_kernel(KernelId::RowOffsets, &[&rows], &[nvals], nrows + 1, nrows + 1)?;

        Ok(DeviceMatrix {
            nrows,
            nvals: m.nvals(),
            rows,
            cols,
            row_ptr,
        })
    }

    /// Expands row offsets into row indices and reads the result back
    fn download(
        &self,
        nrows: Index,
        ncols: Index,
        offsets: &D::Buffer,
        cols: &D::Buffer,
        nvals: usize,
    ) -> Result<SparseBoolMatrix> {
        let rows = self
            .backend
            .run_kernel(KernelId::ExpandRows, &[offsets], &[], nrows as usize, nvals)?;

        let rows = self.backend.download(&rows, nvals)?;
        let cols = self.backend.download(cols, nvals)?;
        Ok(SparseBoolMatrix::from_canonical(nrows, ncols, rows, cols))
    }
}

fn word(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::InvalidDimension(format!("{} {} exceeds the device word size", what, value)))
}

impl<D: ComputeDevice, I: Instrument> Operators for DeviceOperators<D, I> {
    fn name(&self) -> &str {
        &self.name
    }

    fn multiply(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        check_multiply_dims(a, b)?;
        log::debug!("{}: multiply {:?} x {:?}", self.name, a.shape(), b.shape());

        let da = self.upload(a)?;
        let db = self.upload(b)?;
        let operands = [&da.row_ptr, &da.cols, &db.row_ptr, &db.cols];

        let (offsets, nvals) =
            self.backend
                .size_rows(KernelId::MxmRowCounts, &operands, &[], da.nrows, da.nrows)?;

        let cols = self.backend.run_kernel(
            KernelId::MxmFill,
            &[&da.row_ptr, &da.cols, &db.row_ptr, &db.cols, &offsets],
            &[],
            da.nrows,
            nvals,
        )?;
        self.backend
            .run_in_place(KernelId::SortSegments, &[&offsets, &cols], &[], da.nrows)?;

        self.download(a.nrows(), b.ncols(), &offsets, &cols, nvals)
    }

    fn add(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        check_same_shape("add", a, b)?;
        log::debug!("{}: add {:?}", self.name, a.shape());

        let da = self.upload(a)?;
        let db = self.upload(b)?;
        let operands = [&da.row_ptr, &da.cols, &db.row_ptr, &db.cols];

        let (offsets, nvals) =
            self.backend
                .size_rows(KernelId::AddRowCounts, &operands, &[], da.nrows, da.nrows)?;

        let cols = self.backend.run_kernel(
            KernelId::AddFill,
            &[&da.row_ptr, &da.cols, &db.row_ptr, &db.cols, &offsets],
            &[],
            da.nrows,
            nvals,
        )?;

        self.download(a.nrows(), a.ncols(), &offsets, &cols, nvals)
    }

    fn kronecker(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        let nrows = checked_dim(a.nrows(), b.nrows(), "kronecker rows")?;
        let ncols = checked_dim(a.ncols(), b.ncols(), "kronecker cols")?;
        log::debug!("{}: kronecker {:?} x {:?}", self.name, a.shape(), b.shape());

        let da = self.upload(a)?;
        let db = self.upload(b)?;
        let out_rows = nrows as usize;

        let (offsets, nvals) = self.backend.size_rows(
            KernelId::KronRowCounts,
            &[&da.row_ptr, &db.row_ptr],
            &[b.nrows()],
            out_rows,
            out_rows,
        )?;

        // Rows come out already sorted: A's columns outer, B's inner
        let cols = self.backend.run_kernel(
            KernelId::KronFill,
            &[&da.row_ptr, &da.cols, &db.row_ptr, &db.cols, &offsets],
            &[b.nrows(), b.ncols()],
            out_rows,
            nvals,
        )?;

        self.download(nrows, ncols, &offsets, &cols, nvals)
    }

    fn transpose(&self, a: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        log::debug!("{}: transpose {:?}", self.name, a.shape());

        let da = self.upload(a)?;
        let n_buckets = a.ncols() as usize;

        let (offsets, nvals) = self.backend.size_rows(
            KernelId::ColumnHistogram,
            &[&da.cols],
            &[],
            da.nvals,
            n_buckets,
        )?;

        let cursor = self.backend.alloc_zeroed(n_buckets)?;
        let cols = self.backend.alloc_zeroed(nvals)?;
        self.backend.run_in_place(
            KernelId::TransposeScatter,
            &[&da.rows, &da.cols, &offsets, &cursor, &cols],
            &[],
            da.nvals,
        )?;
        self.backend
            .run_in_place(KernelId::SortSegments, &[&offsets, &cols], &[], n_buckets)?;

        self.download(a.ncols(), a.nrows(), &offsets, &cols, nvals)
    }
}
