//! # cootensor
//!
//! **Arithmetic over coordinate-format (COO) sparse tensors, with dense interop.**
//!
//! cootensor stores a sparse tensor as a list of coordinates plus one value
//! block per coordinate, and implements the merge-style algorithms that keep
//! that list canonical while computing with it.
//!
//! ## Features
//!
//! - **Sparse tensors**: hybrid sparse/dense dimension split, lazy coalescing
//! - **Element-wise ops**: sparse add, sub, mul; scalar mul, div, pow; p-norms
//! - **Mixed ops**: dense += sparse, sparse @ dense with dense or sparse results
//! - **Multiple dtypes**: f64, f32, f16, bf16, and signed/unsigned integers
//! - **Parallel**: row scans and scatter loops fan out over rayon above a
//!   configurable work threshold
//!
//! ## Quick Start
//!
//! ```rust
//! use cootensor::prelude::*;
//!
//! // [[1, 0], [0, 2]]
//! let s = SparseTensor::from_slices(&[0, 1, 0, 1], &[1.0f64, 2.0], &[2, 2], 2)?;
//! let d = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2])?;
//!
//! let r = addmm(&Tensor::zeros(&[2, 2], DType::F64), &s, &d, 0.0, 1.0)?;
//! assert_eq!(r.to_vec::<f64>()?, vec![1.0, 2.0, 6.0, 8.0]);
//! # Ok::<(), cootensor::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded row scans and scatters
//! - `f16`: Half-precision floats (F16, BF16)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod dtype;
pub mod error;
pub mod kernels;
pub mod sparse;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{parallel_config, set_parallel_config, ParallelConfig};
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::sparse::{
        add_dense_sparse, addmm, sspaddmm, SparseDenseOps, SparseTensor, TensorRef,
    };
    pub use crate::tensor::{Layout, Tensor};
}
