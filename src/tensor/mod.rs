//! Tensor types and operations
//!
//! This module provides the dense `Tensor` type, an n-dimensional strided
//! view over reference-counted host memory. It is the collaborator the
//! sparse engines read value blocks from and accumulate products into.

mod core;
mod layout;
mod ops;
mod storage;

pub use core::Tensor;
pub use layout::{Layout, Shape, Strides};
pub use storage::Storage;
