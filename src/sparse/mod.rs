//! Coordinate-format sparse tensors and their arithmetic
//!
//! A [`SparseTensor`] stores a list of coordinates and one value block per
//! coordinate. Entries may repeat until the tensor is coalesced; operators
//! coalesce their operands themselves before any index-dependent work.
//!
//! # Operators
//!
//! - **Sparse with sparse**: `add`, `sub` (sorted union merge) and `mul`
//!   (sorted intersection merge)
//! - **Sparse with scalar**: `mul_scalar`, `div_scalar`, `pow`, `norm`
//! - **Dense with sparse**: [`add_dense_sparse`]
//! - **Products**: [`addmm`] (dense result), `hspmm` (row-compacted sparse
//!   result), [`sspaddmm`] and `smm` (sparse result)
//!
//! Each operator comes in an out-of-place form, an `_out` form writing into
//! a caller-owned result, and where it makes sense an in-place `_` form.
//!
//! # Usage
//!
//! ```
//! use cootensor::sparse::SparseTensor;
//!
//! // 1-D, length 4: {1: 3.0} and {1: 2.0, 2: 5.0}
//! let a = SparseTensor::from_slices(&[1], &[3.0f64], &[4], 1)?;
//! let b = SparseTensor::from_slices(&[1, 2], &[2.0f64, 5.0], &[4], 1)?;
//!
//! let sum = a.add(&b, 1.0)?;
//! assert_eq!(sum.to_dense()?.to_vec::<f64>()?, vec![0.0, 5.0, 5.0, 0.0]);
//!
//! let product = a.mul(&b)?;
//! assert_eq!(product.nnz(), 1);
//! # Ok::<(), cootensor::error::Error>(())
//! ```
//!
//! # Parallelism
//!
//! CSR construction, dense scatter offsets and product rows fan out over the
//! rayon pool once the work exceeds
//! [`ParallelConfig::min_parallel_work`](crate::config::ParallelConfig).
//! Results are identical either way.

mod coo;
mod ops;

pub use coo::{
    add_dense_sparse, add_dense_sparse_out, addmm, addmm_out, sspaddmm, to_csr, SparseTensor,
};
pub use ops::{SparseDenseOps, TensorRef};
