//! COO (Coordinate) sparse format

mod coalesce;
mod conversion;
mod core;
mod dense;
mod elementwise;
mod matmul;

pub use conversion::to_csr;
pub use core::SparseTensor;
pub use dense::{add_dense_sparse, add_dense_sparse_out};
pub use matmul::{addmm, addmm_out, sspaddmm};
