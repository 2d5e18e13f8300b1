//! Algebraic operator sets
//!
//! [`Operators`] is the seam between the C API and an execution path.
//! [`HostOperators`] runs the reference implementations on the calling
//! thread (or on rayon for multiplication); [`DeviceOperators`] runs the
//! same operations as kernels on a [`ComputeDevice`](crate::backend::ComputeDevice).
//! Both produce sequence-equal results.

pub mod device;

pub use device::DeviceOperators;

use crate::error::Result;
use crate::matrix::config::EngineConfig;
use crate::matrix::{reference, SparseBoolMatrix};
use crate::parallel::multiply_parallel;

/// Boolean matrix operators over canonical matrices
///
/// Every operation returns a new matrix and leaves its operands untouched.
pub trait Operators: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// `A · B` over the boolean semiring
    fn multiply(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix>;

    /// Element-wise `A ∨ B`
    fn add(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix>;

    /// `A ⊗ B`
    fn kronecker(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix>;

    /// `Aᵀ`
    fn transpose(&self, a: &SparseBoolMatrix) -> Result<SparseBoolMatrix>;

    /// `C ∨ (A · B)`
    fn multiply_accumulate(
        &self,
        c: &SparseBoolMatrix,
        a: &SparseBoolMatrix,
        b: &SparseBoolMatrix,
    ) -> Result<SparseBoolMatrix> {
        let product = self.multiply(a, b)?;
        self.add(c, &product)
    }
}

/// Transitive closure of a square relation matrix
///
/// Repeats `T = T ∨ T·T` until the number of entries stops growing.
pub fn transitive_closure(ops: &dyn Operators, a: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
    let mut closure = a.clone();
    loop {
        let before = closure.nvals();
        closure = ops.multiply_accumulate(&closure, &closure, &closure)?;
        if closure.nvals() == before {
            return Ok(closure);
        }
    }
}

/// Host reference operators
#[derive(Debug, Clone, Default)]
pub struct HostOperators {
    config: EngineConfig,
}

impl HostOperators {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Operators for HostOperators {
    fn name(&self) -> &str {
        if self.config.parallel_host {
            "host-parallel"
        } else {
            "host"
        }
    }

    fn multiply(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        if self.config.parallel_host {
            multiply_parallel(a, b, &self.config)
        } else {
            reference::multiply_with_config(a, b, &self.config)
        }
    }

    fn add(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        reference::add(a, b)
    }

    fn kronecker(&self, a: &SparseBoolMatrix, b: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        reference::kronecker(a, b)
    }

    fn transpose(&self, a: &SparseBoolMatrix) -> Result<SparseBoolMatrix> {
        Ok(reference::transpose(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_multiply_accumulate() {
        let ops = HostOperators::default();
        let c = SparseBoolMatrix::build(2, 2, &[1], &[1]).unwrap();
        let a = SparseBoolMatrix::identity(2);
        let b = SparseBoolMatrix::build(2, 2, &[0], &[1]).unwrap();

        let r = ops.multiply_accumulate(&c, &a, &b).unwrap();
        assert_eq!(r.rows(), &[0, 1]);
        assert_eq!(r.cols(), &[1, 1]);
    }

    #[test]
    fn test_transitive_closure_of_chain() {
        // 0 -> 1 -> 2 -> 3
        let a = SparseBoolMatrix::build(4, 4, &[0, 1, 2], &[1, 2, 3]).unwrap();
        let t = transitive_closure(&HostOperators::default(), &a).unwrap();

        assert_eq!(t.nvals(), 6);
        assert!(t.contains(0, 3));
        assert!(!t.contains(3, 0));
        assert!(!t.contains(0, 0));
    }

    #[test]
    fn test_parallel_host_matches() {
        let serial = HostOperators::default();
        let parallel = HostOperators::new(EngineConfig::default().with_parallel_host(true));
        assert_eq!(parallel.name(), "host-parallel");

        let a = SparseBoolMatrix::build(3, 3, &[0, 1, 2, 2], &[1, 2, 0, 1]).unwrap();
        assert_eq!(
            serial.multiply(&a, &a).unwrap(),
            parallel.multiply(&a, &a).unwrap()
        );
    }
}
