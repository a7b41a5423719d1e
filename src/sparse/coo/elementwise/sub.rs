//! Element-wise subtraction for COO tensors

use super::super::core::SparseTensor;
use crate::error::Result;

impl SparseTensor {
    /// Element-wise subtraction: `self - alpha * src`
    ///
    /// Same contract as [`add`](Self::add) with the scalar negated. For
    /// unsigned element kinds the negated scalar saturates to zero.
    pub fn sub(&self, src: &SparseTensor, alpha: f64) -> Result<SparseTensor> {
        self.add(src, -alpha)
    }

    /// In-place subtraction: `self -= alpha * src`
    pub fn sub_(&mut self, src: &SparseTensor, alpha: f64) -> Result<&mut Self> {
        self.add_(src, -alpha)
    }

    /// Element-wise subtraction into `r`: `r = t - alpha * src`
    pub fn sub_out<'r>(
        r: &'r mut SparseTensor,
        t: &SparseTensor,
        src: &SparseTensor,
        alpha: f64,
    ) -> Result<&'r mut SparseTensor> {
        Self::add_out(r, t, src, -alpha)
    }
}
