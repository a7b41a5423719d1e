//! Typed inner loops
//!
//! Element-generic primitives the dense collaborator and the sparse engines
//! are built on. Each kernel is instantiated per element kind through
//! `dispatch_dtype!` at the boundary where the runtime tag becomes known.

mod axpy;
mod scalar;

pub use axpy::{axpy, axpy_contiguous, mul_accumulate};
pub use scalar::{abs_pnorm, divide, powf, scale};
