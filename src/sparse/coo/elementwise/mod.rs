//! COO element-wise operations
//!
//! Sparse-sparse operators walk two coalesced coordinate lists in lockstep:
//! `add`/`sub` keep the union of coordinates, `mul` the intersection. Scalar
//! operators touch only the value buffer.

mod add;
mod mul;
mod scalar;
mod sub;
