//! Element-wise addition for COO tensors

use std::cmp::Ordering;

use super::super::core::{IndexView, SparseTensor};
use crate::dtype::{dispatch_dtype, Element};
use crate::error::{Error, Result};
use crate::kernels;

impl SparseTensor {
    /// Element-wise addition: `self + alpha * src`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Shapes don't match, or the sparse/dense split differs
    /// - Dtypes don't match
    ///
    /// # Example
    ///
    /// ```
    /// use cootensor::sparse::SparseTensor;
    ///
    /// let a = SparseTensor::from_slices(&[1], &[3.0f64], &[4], 1)?;
    /// let b = SparseTensor::from_slices(&[1, 2], &[2.0f64, 5.0], &[4], 1)?;
    /// let c = a.add(&b, 1.0)?;
    /// assert_eq!(c.indices().to_vec::<i64>()?, vec![1, 2]);
    /// assert_eq!(c.values().to_vec::<f64>()?, vec![5.0, 5.0]);
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn add(&self, src: &SparseTensor, alpha: f64) -> Result<SparseTensor> {
        let mut r = SparseTensor::empty(&self.shape, self.sparse_dims, self.dtype())?;
        Self::add_out(&mut r, self, src, alpha)?;
        Ok(r)
    }

    /// In-place addition: `self += alpha * src`
    pub fn add_(&mut self, src: &SparseTensor, alpha: f64) -> Result<&mut Self> {
        let t = self.clone();
        Self::add_out(self, &t, src, alpha)
    }

    /// Element-wise addition into `r`: `r = t + alpha * src`
    ///
    /// An empty `src` makes `r` a structural copy of `t`; an empty `t` makes
    /// `r` the scaled `src`. Otherwise both operands are coalesced and merged,
    /// so the result is always coalesced and holds at most
    /// `t.nnz() + src.nnz()` entries.
    pub fn add_out<'r>(
        r: &'r mut SparseTensor,
        t: &SparseTensor,
        src: &SparseTensor,
        alpha: f64,
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
            alpha,
            "sparse add"
        );

        if src.nnz == 0 {
            tracing::trace!("sparse add: empty src, copying t");
            return r.copy_sparse_(t);
        }
        if t.nnz == 0 {
            tracing::trace!("sparse add: empty t, scaling src");
            return Self::mul_scalar_out(r, src, alpha);
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
            merge_union::<T>(&t, &src, alpha)?
        }, "sparse_add");
        Ok(r)
    }
}

/// Sorted union merge of two coalesced operands with equal keys collapsed
fn merge_union<T: Element>(
    t: &SparseTensor,
    src: &SparseTensor,
    alpha: f64,
) -> Result<SparseTensor> {
    let sparse_dims = t.sparse_dims;
    let block = t.block_size();
    let (t_nnz, s_nnz) = (t.nnz, src.nnz);

    let t_idx_data = t.index_data()?;
    let s_idx_data = src.index_data()?;
    let t_idx = IndexView::new(&t_idx_data, t_nnz);
    let s_idx = IndexView::new(&s_idx_data, s_nnz);
    let t_vals = t.values.to_vec::<T>()?;
    let s_vals = src.values.to_vec::<T>()?;

    let capacity = t_nnz + s_nnz;
    let mut r_idx = vec![0i64; sparse_dims * capacity];
    let mut r_vals = vec![T::zero(); capacity * block];
    let alpha = T::from_f64(alpha);

    let (mut t_i, mut s_i, mut r_i) = (0usize, 0usize, 0usize);
    while t_i < t_nnz || s_i < s_nnz {
        let cmp = if t_i >= t_nnz {
            Ordering::Greater
        } else if s_i >= s_nnz {
            Ordering::Less
        } else {
            t_idx.cmp_entries(t_i, &s_idx, s_i, sparse_dims)
        };

        // Both branches run on a tie and land in the same output slot
        let dst = r_i * block..(r_i + 1) * block;
        if cmp != Ordering::Greater {
            for d in 0..sparse_dims {
                r_idx[d * capacity + r_i] = t_idx.get(d, t_i);
            }
            kernels::axpy_contiguous(
                T::one(),
                &t_vals[t_i * block..(t_i + 1) * block],
                &mut r_vals[dst.clone()],
            );
            t_i += 1;
        }
        if cmp != Ordering::Less {
            for d in 0..sparse_dims {
                r_idx[d * capacity + r_i] = s_idx.get(d, s_i);
            }
            kernels::axpy_contiguous(
                alpha,
                &s_vals[s_i * block..(s_i + 1) * block],
                &mut r_vals[dst],
            );
            s_i += 1;
        }
        r_i += 1;
    }

    SparseTensor::from_buffers(&t.shape, sparse_dims, r_idx, r_vals, capacity, r_i, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    fn vector(indices: &[i64], values: &[f64]) -> SparseTensor {
        SparseTensor::from_slices(indices, values, &[4], 1).unwrap()
    }

    #[test]
    fn test_add_overlapping() {
        let a = vector(&[1], &[3.0]);
        let b = vector(&[1, 2], &[2.0, 5.0]);
        let c = a.add(&b, 1.0).unwrap();
        assert_eq!(c.nnz(), 2);
        assert!(c.is_coalesced());
        assert_eq!(c.indices().to_vec::<i64>().unwrap(), vec![1, 2]);
        assert_eq!(c.values().to_vec::<f64>().unwrap(), vec![5.0, 5.0]);
        assert_eq!(c.capacity(), 3);
    }

    #[test]
    fn test_add_matrix_disjoint() {
        // A:         B:
        // [1, 0]     [0, 2]
        // [0, 3]     [4, 0]
        let a = SparseTensor::from_slices(&[0, 1, 0, 1], &[1.0f32, 3.0], &[2, 2], 2).unwrap();
        let b = SparseTensor::from_slices(&[0, 1, 1, 0], &[2.0f32, 4.0], &[2, 2], 2).unwrap();

        let c = a.add(&b, 1.0).unwrap();

        // C = A + B:
        // [1, 2]
        // [4, 3]
        assert_eq!(c.nnz(), 4);
        assert_eq!(
            c.to_dense().unwrap().to_vec::<f32>().unwrap(),
            vec![1.0, 2.0, 4.0, 3.0]
        );
        assert_eq!(
            c.indices().to_vec::<i64>().unwrap(),
            vec![0, 0, 1, 1, 0, 1, 0, 1]
        );
    }

    #[test]
    fn test_add_scaled_src() {
        let a = vector(&[0, 3], &[1.0, 1.0]);
        let b = vector(&[3], &[2.0]);
        let c = a.add(&b, -0.5).unwrap();
        assert_eq!(c.values().to_vec::<f64>().unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_add_uncoalesced_inputs() {
        let a = vector(&[2, 0, 2], &[1.0, 1.0, 1.0]);
        let b = vector(&[0], &[5.0]);
        let c = a.add(&b, 1.0).unwrap();
        assert_eq!(c.indices().to_vec::<i64>().unwrap(), vec![0, 2]);
        assert_eq!(c.values().to_vec::<f64>().unwrap(), vec![6.0, 2.0]);
    }

    #[test]
    fn test_add_empty_operands() {
        let x = vector(&[1, 3], &[2.0, 4.0]);
        let zero = SparseTensor::empty(&[4], 1, DType::F64).unwrap();

        let same = x.add(&zero, 7.0).unwrap();
        assert_eq!(same.values().to_vec::<f64>().unwrap(), vec![2.0, 4.0]);
        assert!(!same.is_alias_of(&x));

        let scaled = zero.add(&x, 3.0).unwrap();
        assert_eq!(scaled.values().to_vec::<f64>().unwrap(), vec![6.0, 12.0]);
        assert_eq!(scaled.indices().to_vec::<i64>().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_add_in_place() {
        let mut a = vector(&[0], &[1.0]);
        let b = vector(&[0, 1], &[1.0, 1.0]);
        a.add_(&b, 2.0).unwrap();
        assert_eq!(a.values().to_vec::<f64>().unwrap(), vec![3.0, 2.0]);
    }

    #[test]
    fn test_add_shape_mismatch() {
        let a = vector(&[0], &[1.0]);
        let b = SparseTensor::from_slices(&[0], &[1.0f64], &[5], 1).unwrap();
        assert!(matches!(a.add(&b, 1.0), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_add_split_mismatch() {
        let a = SparseTensor::from_slices(&[0, 0], &[1.0f64], &[2, 2], 2).unwrap();
        let b = SparseTensor::from_slices(&[1], &[1.0f64, 2.0], &[2, 2], 1).unwrap();
        assert!(matches!(a.add(&b, 1.0), Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_add_dtype_mismatch() {
        let a = vector(&[0], &[1.0]);
        let b = SparseTensor::from_slices(&[0], &[1.0f32], &[4], 1).unwrap();
        assert!(matches!(a.add(&b, 1.0), Err(Error::DTypeMismatch { .. })));
    }
}
