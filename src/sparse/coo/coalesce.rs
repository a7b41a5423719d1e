//! Coalescing: sort entries and merge duplicate coordinates

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::core::{IndexView, SparseTensor};
#[cfg(feature = "rayon")]
use crate::config;
use crate::dtype::{dispatch_dtype, Element};
use crate::error::Result;
use crate::kernels;

impl SparseTensor {
    /// Canonical form: entries sorted lexicographically, duplicates summed
    ///
    /// An already-coalesced tensor is returned as a shallow clone, so the
    /// operation is idempotent.
    ///
    /// # Example
    ///
    /// ```
    /// use cootensor::sparse::SparseTensor;
    ///
    /// let s = SparseTensor::from_slices(&[2, 0, 2], &[1.0f64, 2.0, 3.0], &[4], 1)?;
    /// let c = s.coalesce()?;
    /// assert!(c.is_coalesced());
    /// assert_eq!(c.indices().to_vec::<i64>()?, vec![0, 2]);
    /// assert_eq!(c.values().to_vec::<f64>()?, vec![2.0, 4.0]);
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn coalesce(&self) -> Result<SparseTensor> {
        if self.coalesced {
            tracing::trace!(nnz = self.nnz, "coalesce: already canonical");
            return Ok(self.clone());
        }
        if self.nnz <= 1 {
            let mut out = self.clone();
            out.coalesced = true;
            return Ok(out);
        }

        let nnz = self.nnz;
        let sparse_dims = self.sparse_dims;
        let block = self.block_size();
        tracing::debug!(nnz, sparse_dims, dtype = %self.dtype(), "coalesce");

        let idx_data = self.index_data()?;
        let idx = IndexView::new(&idx_data, nnz);

        // Stable sort keeps duplicates in their original relative order
        let mut perm: Vec<usize> = (0..nnz).collect();
        let by_coord = |a: &usize, b: &usize| idx.cmp_entries(*a, &idx, *b, sparse_dims);
        #[cfg(feature = "rayon")]
        {
            if config::should_parallelize(nnz) {
                config::install_parallelism(|| perm.par_sort_by(by_coord));
            } else {
                perm.sort_by(by_coord);
            }
        }
        #[cfg(not(feature = "rayon"))]
        perm.sort_by(by_coord);

        // Run boundaries: positions in `perm` where a new coordinate starts
        let mut starts: Vec<usize> = Vec::with_capacity(nnz);
        for (p, window) in perm.windows(2).enumerate() {
            if p == 0 {
                starts.push(0);
            }
            if idx.cmp_entries(window[0], &idx, window[1], sparse_dims).is_ne() {
                starts.push(p + 1);
            }
        }
        let out_nnz = starts.len();

        let mut out_idx = vec![0i64; sparse_dims * out_nnz];
        for (r, &p) in starts.iter().enumerate() {
            for d in 0..sparse_dims {
                out_idx[d * out_nnz + r] = idx.get(d, perm[p]);
            }
        }

        dispatch_dtype!(self.dtype(), T => {
            let values = self.values.to_vec::<T>()?;
            let mut out_values = vec![T::zero(); out_nnz * block];
            for (r, &start) in starts.iter().enumerate() {
                let end = starts.get(r + 1).copied().unwrap_or(nnz);
                let dst = &mut out_values[r * block..(r + 1) * block];
                for &k in &perm[start..end] {
                    kernels::axpy_contiguous(T::one(), &values[k * block..(k + 1) * block], dst);
                }
            }

            SparseTensor::from_buffers(
                &self.shape,
                sparse_dims,
                out_idx,
                out_values,
                out_nnz,
                out_nnz,
                true,
            )
        }, "coalesce")
    }
}
