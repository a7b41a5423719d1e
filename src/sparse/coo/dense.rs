//! Dense plus sparse: `r = dense + alpha * sparse`

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::core::{IndexView, SparseTensor};
use crate::config;
use crate::dtype::{dispatch_dtype, Element};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// `dense + alpha * sparse` as a new dense tensor
///
/// # Example
///
/// ```
/// use cootensor::sparse::{add_dense_sparse, SparseTensor};
/// use cootensor::tensor::Tensor;
///
/// let dense = Tensor::from_slice(&[1.0f64, 1.0, 1.0, 1.0], &[2, 2])?;
/// let sparse = SparseTensor::from_slices(&[0, 1, 1, 0], &[2.0f64, 3.0], &[2, 2], 2)?;
/// let r = add_dense_sparse(&dense, &sparse, 10.0)?;
/// assert_eq!(r.to_vec::<f64>()?, vec![1.0, 21.0, 31.0, 1.0]);
/// # Ok::<(), cootensor::error::Error>(())
/// ```
pub fn add_dense_sparse(dense: &Tensor, sparse: &SparseTensor, alpha: f64) -> Result<Tensor> {
    let mut r = Tensor::undefined();
    add_dense_sparse_out(&mut r, dense, sparse, alpha)?;
    Ok(r)
}

/// `r = dense + alpha * sparse`
///
/// `r` is seeded with a copy of `dense` unless it is the very same view, in
/// which case the sparse contribution is accumulated in place. An undefined
/// `r` is replaced by a fresh buffer.
///
/// # Errors
///
/// - `ShapeMismatch` if `dense` and `sparse` shapes differ
/// - `DTypeMismatch` if the element kinds differ
/// - `IndexOutOfBounds` if a stored coordinate lies outside the shape
pub fn add_dense_sparse_out<'r>(
    r: &'r mut Tensor,
    dense: &Tensor,
    sparse: &SparseTensor,
    alpha: f64,
) -> Result<&'r mut Tensor> {
    if dense.shape() != sparse.shape() {
        return Err(Error::shape_mismatch(dense.shape(), sparse.shape()));
    }
    Error::check_dtype(dense.dtype(), sparse.dtype())?;

    tracing::debug!(
        nnz = sparse.nnz(),
        sparse_dims = sparse.sparse_dims(),
        dtype = %dense.dtype(),
        alpha,
        "dense add sparse"
    );

    if r.is_same(dense) {
        tracing::trace!("dense add sparse: accumulating in place");
    } else if r.is_defined() {
        Error::check_dtype(r.dtype(), dense.dtype())?;
        r.resize_(dense.shape()).copy_(dense)?;
    } else {
        *r = dense.deep_clone()?;
    }

    let sparse = sparse.coalesce()?;
    if sparse.nnz == 0 {
        return Ok(r);
    }

    let idx_data = sparse.index_data()?;
    let idx = IndexView::new(&idx_data, sparse.nnz);

    if sparse.dense_dims() > 0 {
        accumulate_blocks(r, &sparse, &idx, alpha)?;
        return Ok(r);
    }

    let offsets = flat_offsets(r, &sparse, &idx)?;
    dispatch_dtype!(r.dtype(), T => {
        let values = sparse.values.to_vec::<T>()?;
        scatter_add(r, &offsets, &values, T::from_f64(alpha))?;
    }, "add_dense_sparse");
    Ok(r)
}

/// `buf[offsets[k]] += alpha * values[k]` over `r`'s storage
///
/// Offsets come from a coalesced operand and are pairwise distinct, so the
/// parallel path splits the buffer into chunks that own disjoint targets.
fn scatter_add<T: Element>(r: &Tensor, offsets: &[usize], values: &[T], alpha: T) -> Result<()> {
    let nnz = offsets.len();
    if config::should_parallelize(nnz) {
        tracing::trace!(nnz, "dense add sparse: parallel scatter");
        #[cfg(feature = "rayon")]
        {
            let chunk = config::rayon_min_len().max(1);
            return config::install_parallelism(|| {
                let mut updates: Vec<(usize, T)> = offsets
                    .par_iter()
                    .zip(values.par_iter())
                    .map(|(&o, &v)| (o, alpha * v))
                    .collect();
                updates.par_sort_unstable_by_key(|&(o, _)| o);

                r.storage().write::<T, _>(|buf| {
                    buf.par_chunks_mut(chunk)
                        .enumerate()
                        .for_each(|(c, part)| {
                            let lo = c * chunk;
                            let hi = lo + part.len();
                            let start = updates.partition_point(|&(o, _)| o < lo);
                            let owned = updates[start..].iter().take_while(|&&(o, _)| o < hi);
                            for &(o, v) in owned {
                                part[o - lo] = part[o - lo] + v;
                            }
                        });
                })
            });
        }
    }

    r.storage().write::<T, _>(|buf| {
        for (&o, &v) in offsets.iter().zip(values) {
            buf[o] = buf[o] + alpha * v;
        }
    })
}

/// Walk down to each entry's sub-tensor and accumulate its value block
fn accumulate_blocks(
    r: &Tensor,
    sparse: &SparseTensor,
    idx: &IndexView<'_>,
    alpha: f64,
) -> Result<()> {
    for k in 0..sparse.nnz {
        let mut dst = r.clone();
        for d in 0..sparse.sparse_dims {
            dst = dst.select(0, coordinate(idx.get(d, k), sparse.shape[d])?)?;
        }
        let block = sparse.values.select(0, k)?;
        dst.add_scaled_(&block, alpha)?;
    }
    Ok(())
}

/// Storage position of every entry: `offset + sum(stride[d] * index[d][k])`
fn flat_offsets(r: &Tensor, sparse: &SparseTensor, idx: &IndexView<'_>) -> Result<Vec<usize>> {
    let nnz = sparse.nnz;
    let strides = r.strides();
    let base = r.offset();
    let shape = &sparse.shape;

    let offset_of = |k: usize| -> Result<usize> {
        let mut flat = base;
        for (d, &stride) in strides.iter().enumerate() {
            flat += coordinate(idx.get(d, k), shape[d])? * stride as usize;
        }
        Ok(flat)
    };

    if config::should_parallelize(nnz) {
        tracing::trace!(nnz, "dense add sparse: parallel offsets");
        #[cfg(feature = "rayon")]
        {
            let min_len = config::rayon_min_len();
            return config::install_parallelism(|| {
                (0..nnz)
                    .into_par_iter()
                    .with_min_len(min_len)
                    .map(&offset_of)
                    .collect()
            });
        }
    }
    (0..nnz).map(offset_of).collect()
}

fn coordinate(c: i64, size: usize) -> Result<usize> {
    if c < 0 || c as usize >= size {
        return Err(Error::IndexOutOfBounds { index: c, size });
    }
    Ok(c as usize)
}
