//! Element-wise multiplication for COO tensors

use std::cmp::Ordering;

use super::super::core::{IndexView, SparseTensor};
use crate::dtype::{dispatch_dtype, Element};
use crate::error::{Error, Result};
use crate::kernels;

impl SparseTensor {
    /// Element-wise (Hadamard) product: `self ⊙ src`
    ///
    /// Only coordinates stored in both operands survive.
    ///
    /// # Example
    ///
    /// ```
    /// use cootensor::sparse::SparseTensor;
    ///
    /// let a = SparseTensor::from_slices(&[0, 2], &[2.0f64, 3.0], &[4], 1)?;
    /// let b = SparseTensor::from_slices(&[0, 1], &[4.0f64, 9.0], &[4], 1)?;
    /// let c = a.mul(&b)?;
    /// assert_eq!(c.nnz(), 1);
    /// assert_eq!(c.values().to_vec::<f64>()?, vec![8.0]);
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn mul(&self, src: &SparseTensor) -> Result<SparseTensor> {
        let mut r = SparseTensor::empty(&self.shape, self.sparse_dims, self.dtype())?;
        Self::mul_out(&mut r, self, src)?;
        Ok(r)
    }

    /// In-place product: `self = self ⊙ src`
    pub fn mul_(&mut self, src: &SparseTensor) -> Result<&mut Self> {
        let t = self.clone();
        Self::mul_out(self, &t, src)
    }

    /// Element-wise product into `r`: `r = t ⊙ src`
    ///
    /// If either operand is empty, `r` becomes an empty tensor of `src`'s
    /// shape. The result is always coalesced and holds at most
    /// `min(t.nnz(), src.nnz())` entries.
    pub fn mul_out<'r>(
        r: &'r mut SparseTensor,
        t: &SparseTensor,
        src: &SparseTensor,
    ) -> Result<&'r mut SparseTensor> {
        if t.shape != src.shape {
            return Err(Error::shape_mismatch(&t.shape, &src.shape));
        }
        Error::check_dtype(t.dtype(), src.dtype())?;

        tracing::debug!(
            t_nnz = t.nnz,
            src_nnz = src.nnz,
            sparse_dims = t.sparse_dims,
            dtype = %t.dtype(),
            "sparse mul"
        );

        if t.nnz == 0 || src.nnz == 0 {
            tracing::trace!("sparse mul: empty operand");
            *r = SparseTensor::empty(&src.shape, src.sparse_dims, src.dtype())?;
            return Ok(r);
        }

        if t.sparse_dims != src.sparse_dims {
            return Err(Error::shape_mismatch(
                &[t.sparse_dims, t.dense_dims()],
                &[src.sparse_dims, src.dense_dims()],
            ));
        }

        let t = t.coalesce()?;
        let src = src.coalesce()?;

        *r = dispatch_dtype!(t.dtype(), T => {
            merge_intersection::<T>(&t, &src)?
        }, "sparse_mul");
        Ok(r)
    }
}

/// Sorted intersection merge of two coalesced operands
fn merge_intersection<T: Element>(t: &SparseTensor, src: &SparseTensor) -> Result<SparseTensor> {
    let sparse_dims = t.sparse_dims;
    let block = t.block_size();
    let (t_nnz, s_nnz) = (t.nnz, src.nnz);

    let t_idx_data = t.index_data()?;
    let s_idx_data = src.index_data()?;
    let t_idx = IndexView::new(&t_idx_data, t_nnz);
    let s_idx = IndexView::new(&s_idx_data, s_nnz);
    let t_vals = t.values.to_vec::<T>()?;
    let s_vals = src.values.to_vec::<T>()?;

    let capacity = t_nnz.min(s_nnz);
    let mut r_idx = vec![0i64; sparse_dims * capacity];
    let mut r_vals = vec![T::zero(); capacity * block];

    let (mut t_i, mut s_i, mut r_i) = (0usize, 0usize, 0usize);
    while t_i < t_nnz && s_i < s_nnz {
        match t_idx.cmp_entries(t_i, &s_idx, s_i, sparse_dims) {
            Ordering::Less => t_i += 1,
            Ordering::Greater => s_i += 1,
            Ordering::Equal => {
                for d in 0..sparse_dims {
                    r_idx[d * capacity + r_i] = t_idx.get(d, t_i);
                }
                kernels::mul_accumulate(
                    T::one(),
                    &t_vals[t_i * block..(t_i + 1) * block],
                    &s_vals[s_i * block..(s_i + 1) * block],
                    &mut r_vals[r_i * block..(r_i + 1) * block],
                );
                t_i += 1;
                s_i += 1;
                r_i += 1;
            }
        }
    }

    SparseTensor::from_buffers(&t.shape, sparse_dims, r_idx, r_vals, capacity, r_i, true)
}
