//! Mixed sparse/dense operand plumbing
//!
//! Dense-first operators live on `Tensor` through [`SparseDenseOps`], so a
//! dense accumulator reads the same way as a sparse one:
//!
//! ```
//! use cootensor::sparse::{SparseDenseOps, SparseTensor};
//! use cootensor::tensor::Tensor;
//!
//! let mut acc = Tensor::from_slice(&[1.0f64, 1.0, 1.0], &[3])?;
//! let s = SparseTensor::from_slices(&[2], &[4.0f64], &[3], 1)?;
//! acc.add_sparse_(&s, 0.5)?;
//! assert_eq!(acc.to_vec::<f64>()?, vec![1.0, 1.0, 3.0]);
//! # Ok::<(), cootensor::error::Error>(())
//! ```

use crate::error::Result;
use crate::tensor::Tensor;

use super::coo::{add_dense_sparse_out, addmm_out};
use super::SparseTensor;

/// Borrowed operand that may be either dense or sparse
///
/// Used where an operator is only defined for one kind but callers may hold
/// either, so the wrong kind is a typed error rather than a conversion.
#[derive(Debug, Clone, Copy)]
pub enum TensorRef<'a> {
    /// Strided dense tensor
    Dense(&'a Tensor),
    /// COO sparse tensor
    Sparse(&'a SparseTensor),
}

impl TensorRef<'_> {
    /// Whether the operand is sparse
    pub fn is_sparse(&self) -> bool {
        matches!(self, TensorRef::Sparse(_))
    }

    /// Logical shape of the operand
    pub fn shape(&self) -> &[usize] {
        match self {
            TensorRef::Dense(t) => t.shape(),
            TensorRef::Sparse(s) => s.shape(),
        }
    }
}

impl<'a> From<&'a Tensor> for TensorRef<'a> {
    fn from(t: &'a Tensor) -> Self {
        TensorRef::Dense(t)
    }
}

impl<'a> From<&'a SparseTensor> for TensorRef<'a> {
    fn from(s: &'a SparseTensor) -> Self {
        TensorRef::Sparse(s)
    }
}

/// In-place sparse accumulation into a dense tensor
pub trait SparseDenseOps {
    /// `self += alpha * sparse`
    fn add_sparse_(&mut self, sparse: &SparseTensor, alpha: f64) -> Result<&mut Self>;

    /// `self = beta * self + alpha * (sparse @ dense)`
    fn addmm_(
        &mut self,
        sparse: &SparseTensor,
        dense: &Tensor,
        beta: f64,
        alpha: f64,
    ) -> Result<&mut Self>;
}

impl SparseDenseOps for Tensor {
    fn add_sparse_(&mut self, sparse: &SparseTensor, alpha: f64) -> Result<&mut Self> {
        let dense = self.clone();
        add_dense_sparse_out(self, &dense, sparse, alpha)
    }

    fn addmm_(
        &mut self,
        sparse: &SparseTensor,
        dense: &Tensor,
        beta: f64,
        alpha: f64,
    ) -> Result<&mut Self> {
        let t = self.clone();
        addmm_out(self, &t, sparse, dense, beta, alpha)
    }
}
