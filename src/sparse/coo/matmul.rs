//! Sparse-dense matrix products: addmm, hspmm, sspaddmm, smm

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::conversion::to_csr;
use super::core::{IndexView, SparseTensor};
use crate::config;
use crate::dtype::{dispatch_dtype, Element};
use crate::error::{Error, Result};
use crate::kernels;
use crate::sparse::TensorRef;
use crate::tensor::Tensor;

/// Validate a `[i, j] x [j, k]` product and return `(i, j, k)`
///
/// The sparse operand must be a matrix with scalar values and the dense
/// operand a 2-D tensor of the same element kind.
fn check_matmul_operands(sparse: &SparseTensor, dense: &Tensor) -> Result<(usize, usize, usize)> {
    if sparse.sparse_dims != 2 || sparse.dense_dims() != 0 {
        return Err(Error::shape_mismatch(
            &[2, 0],
            &[sparse.sparse_dims, sparse.dense_dims()],
        ));
    }
    if dense.ndim() != 2 {
        return Err(Error::shape_mismatch(&[2], &[dense.ndim()]));
    }
    Error::check_dtype(sparse.dtype(), dense.dtype())?;

    let (dim_i, dim_j) = (sparse.shape[0], sparse.shape[1]);
    let dim_k = dense.shape()[1];
    if dense.shape()[0] != dim_j {
        return Err(Error::shape_mismatch(&[dim_j, dim_k], dense.shape()));
    }
    Ok((dim_i, dim_j, dim_k))
}

/// Fail on the first column coordinate outside `[0, dim_j)`
fn check_columns(cols: &[i64], dim_j: usize) -> Result<()> {
    match cols.iter().find(|&&c| c < 0 || c as usize >= dim_j) {
        Some(&c) => Err(Error::IndexOutOfBounds {
            index: c,
            size: dim_j,
        }),
        None => Ok(()),
    }
}

/// `out[h, :] += alpha * value[i] * dense[col[i], :]` for every stored `i` in row `h`
///
/// `out` is a row-major `[dim_i, dim_k]` buffer. The dense operand is read
/// through its own strides. Rows are independent and run in parallel when
/// `nnz` is above the configured threshold.
fn accumulate_rows<T: Element>(
    out: &mut [T],
    dim_k: usize,
    csr: &[i64],
    cols: &[i64],
    values: &[T],
    alpha: T,
    dense: &Tensor,
) -> Result<()> {
    if dim_k == 0 {
        return Ok(());
    }
    let nnz = cols.len();
    let base = dense.offset();
    let stride0 = dense.strides()[0] as usize;
    let stride1 = dense.strides()[1] as usize;

    dense.storage().read::<T, _>(|d| {
        let row = |h: usize, out_row: &mut [T]| {
            for i in csr[h] as usize..csr[h + 1] as usize {
                let col = cols[i] as usize;
                kernels::axpy(
                    dim_k,
                    alpha * values[i],
                    &d[base + col * stride0..],
                    stride1,
                    out_row,
                    1,
                );
            }
        };

        if config::should_parallelize(nnz) {
            tracing::trace!(nnz, rows = out.len() / dim_k, "spmm rows: parallel");
            #[cfg(feature = "rayon")]
            {
                config::install_parallelism(|| {
                    out.par_chunks_mut(dim_k)
                        .enumerate()
                        .for_each(|(h, out_row)| row(h, out_row));
                });
                return;
            }
        }
        for (h, out_row) in out.chunks_mut(dim_k).enumerate() {
            row(h, out_row);
        }
    })
}

/// Store a row-major result into a caller-supplied dense destination
fn store_dense<T: Element>(r: &mut Tensor, data: &[T], shape: &[usize]) -> Result<()> {
    if !r.is_defined() {
        *r = Tensor::from_slice(data, shape)?;
        return Ok(());
    }
    Error::check_dtype(r.dtype(), T::DTYPE)?;
    r.resize_(shape).write_from_slice(data)
}

/// `beta * t + alpha * (sparse @ dense)` as a new dense tensor
///
/// # Example
///
/// ```
/// use cootensor::dtype::DType;
/// use cootensor::sparse::{addmm, SparseTensor};
/// use cootensor::tensor::Tensor;
///
/// let s = SparseTensor::from_slices(&[0, 1, 0, 1], &[1.0f64, 2.0], &[2, 2], 2)?;
/// let d = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2])?;
/// let t = Tensor::zeros(&[2, 2], DType::F64);
/// let r = addmm(&t, &s, &d, 0.0, 1.0)?;
/// assert_eq!(r.to_vec::<f64>()?, vec![1.0, 2.0, 6.0, 8.0]);
/// # Ok::<(), cootensor::error::Error>(())
/// ```
pub fn addmm(
    t: &Tensor,
    sparse: &SparseTensor,
    dense: &Tensor,
    beta: f64,
    alpha: f64,
) -> Result<Tensor> {
    let mut r = Tensor::undefined();
    addmm_out(&mut r, t, sparse, dense, beta, alpha)?;
    Ok(r)
}

/// `r = beta * t + alpha * (sparse @ dense)`
///
/// `beta == 0` ignores the contents of `t` entirely (NaN included) and
/// `beta == 1` copies it without multiplying. `r` may be `t` itself.
///
/// # Errors
///
/// - `ShapeMismatch` unless `sparse` is `[i, j]` with two sparse and no
///   dense dimensions, `dense` is `[j, k]` and `t` is `[i, k]`
/// - `DTypeMismatch` if the operands disagree on element kind
/// - `IndexOutOfBounds` if a stored column lies outside `[0, j)`
pub fn addmm_out<'r>(
    r: &'r mut Tensor,
    t: &Tensor,
    sparse: &SparseTensor,
    dense: &Tensor,
    beta: f64,
    alpha: f64,
) -> Result<&'r mut Tensor> {
    let (dim_i, dim_j, dim_k) = check_matmul_operands(sparse, dense)?;
    if t.shape() != [dim_i, dim_k] {
        return Err(Error::shape_mismatch(&[dim_i, dim_k], t.shape()));
    }
    Error::check_dtype(t.dtype(), dense.dtype())?;
    if r.is_defined() {
        Error::check_dtype(r.dtype(), dense.dtype())?;
    }

    let sparse = sparse.coalesce()?;
    let nnz = sparse.nnz;
    tracing::debug!(nnz, dim_i, dim_j, dim_k, dtype = %dense.dtype(), beta, alpha, "addmm");

    let idx_data = sparse.index_data()?;
    let idx = IndexView::new(&idx_data, nnz);
    let cols = idx.dim(1);
    check_columns(cols, dim_j)?;
    let csr = to_csr(idx.dim(0), dim_i, nnz)?;

    dispatch_dtype!(dense.dtype(), T => {
        let beta_t = T::from_f64(beta);
        let mut out = if beta_t == T::zero() {
            vec![T::zero(); dim_i * dim_k]
        } else if beta_t == T::one() {
            t.to_vec::<T>()?
        } else {
            let seed = t.to_vec::<T>()?;
            let mut scaled = vec![T::zero(); seed.len()];
            kernels::scale(&seed, beta_t, &mut scaled);
            scaled
        };

        let values = sparse.values.to_vec::<T>()?;
        accumulate_rows(&mut out, dim_k, &csr, cols, &values, T::from_f64(alpha), dense)?;
        store_dense(r, &out, &[dim_i, dim_k])?;
    }, "addmm");
    Ok(r)
}

/// `beta * t + alpha * (sparse @ dense)` as a sparse tensor
///
/// `t` is accepted as either kind so callers holding a dense accumulator get
/// a typed error instead of a silent conversion.
///
/// # Errors
///
/// `UnsupportedOperation` if `t` is dense, plus the conditions of
/// [`addmm_out`].
pub fn sspaddmm<'a>(
    t: impl Into<TensorRef<'a>>,
    sparse: &SparseTensor,
    dense: &Tensor,
    beta: f64,
    alpha: f64,
) -> Result<SparseTensor> {
    let mut r = SparseTensor::empty(&[0, 0], 2, dense.dtype())?;
    SparseTensor::sspaddmm_out(&mut r, t.into(), sparse, dense, beta, alpha)?;
    Ok(r)
}

impl SparseTensor {
    /// `sparse @ dense`, keeping only the rows of `self` that hold entries
    ///
    /// The result has shape `[m, n]` with one sparse dimension: its
    /// coordinates are the distinct stored rows of `self` and each value
    /// block is the full dense output row.
    ///
    /// # Example
    ///
    /// ```
    /// use cootensor::sparse::SparseTensor;
    /// use cootensor::tensor::Tensor;
    ///
    /// // Rows 0 and 2 hold entries, row 1 is empty
    /// let s = SparseTensor::from_slices(&[0, 2, 2, 1, 0, 1], &[1.0f32, 2.0, 3.0], &[3, 2], 2)?;
    /// let d = Tensor::from_slice(&[1.0f32, 1.0, 10.0, 10.0], &[2, 2])?;
    /// let h = s.hspmm(&d)?;
    /// assert_eq!(h.indices().to_vec::<i64>()?, vec![0, 2]);
    /// assert_eq!(h.values().to_vec::<f32>()?, vec![10.0, 10.0, 32.0, 32.0]);
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn hspmm(&self, dense: &Tensor) -> Result<SparseTensor> {
        let mut r = SparseTensor::empty(&[0, 0], 1, self.dtype())?;
        Self::hspmm_out(&mut r, self, dense)?;
        Ok(r)
    }

    /// Row-compacted product into `r`
    pub fn hspmm_out<'r>(
        r: &'r mut SparseTensor,
        sparse: &SparseTensor,
        dense: &Tensor,
    ) -> Result<&'r mut SparseTensor> {
        let (m, k, n) = check_matmul_operands(sparse, dense)?;

        let sparse = sparse.coalesce()?;
        let nnz = sparse.nnz;
        tracing::debug!(nnz, m, k, n, dtype = %dense.dtype(), "hspmm");

        if nnz == 0 {
            *r = SparseTensor::empty(&[m, n], 1, dense.dtype())?;
            return Ok(r);
        }

        // Distinct rows become the output coordinates; each entry's row is
        // redirected to the position of its row in that list
        let idx_data = sparse.index_data()?;
        let idx = IndexView::new(&idx_data, nnz);
        let mut rows: Vec<i64> = Vec::with_capacity(nnz);
        let mut compact = vec![0i64; 2 * nnz];
        for j in 0..nnz {
            let row = idx.get(0, j);
            if rows.last() != Some(&row) {
                rows.push(row);
            }
            compact[j] = (rows.len() - 1) as i64;
            compact[nnz + j] = idx.get(1, j);
        }
        let out_nnz = rows.len();

        let values = dispatch_dtype!(dense.dtype(), T => {
            let compact = SparseTensor::from_buffers(
                &[out_nnz, k],
                2,
                compact,
                sparse.values.to_vec::<T>()?,
                nnz,
                nnz,
                true,
            )?;
            let seed = Tensor::zeros(&[out_nnz, n], dense.dtype());
            addmm(&seed, &compact, dense, 0.0, 1.0)?
        }, "hspmm");

        let indices = Tensor::from_vec(rows, &[1, out_nnz])?;
        let mut out = SparseTensor::empty(&[m, n], 1, dense.dtype())?;
        out.set_indices_and_values(indices, values)?;
        out.set_coalesced(true);
        *r = out;
        Ok(r)
    }

    /// `beta * self + alpha * (sparse @ dense)`, kept sparse
    pub fn sspaddmm(
        &self,
        sparse: &SparseTensor,
        dense: &Tensor,
        beta: f64,
        alpha: f64,
    ) -> Result<SparseTensor> {
        sspaddmm(self, sparse, dense, beta, alpha)
    }

    /// In-place `self = beta * self + alpha * (sparse @ dense)`
    pub fn sspaddmm_(
        &mut self,
        sparse: &SparseTensor,
        dense: &Tensor,
        beta: f64,
        alpha: f64,
    ) -> Result<&mut Self> {
        let t = self.clone();
        Self::sspaddmm_out(self, TensorRef::Sparse(&t), sparse, dense, beta, alpha)
    }

    /// `r = beta * t + alpha * (sparse @ dense)` with a sparse result
    ///
    /// The entries of `t`, scaled by `beta`, are stored first. Every row of
    /// `sparse` holding at least one entry then appends one entry per output
    /// column. The result is coalesced only when `t` is empty, since the
    /// appended entries may repeat coordinates already stored from `t`.
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation` if `t` is dense
    /// - `ShapeMismatch` if `t` is not an `[i, k]` matrix with scalar values,
    ///   or the product operands do not line up
    /// - `IndexOutOfBounds` if a stored column lies outside `[0, j)`
    pub fn sspaddmm_out<'r>(
        r: &'r mut SparseTensor,
        t: TensorRef<'_>,
        sparse: &SparseTensor,
        dense: &Tensor,
        beta: f64,
        alpha: f64,
    ) -> Result<&'r mut SparseTensor> {
        let t = match t {
            TensorRef::Sparse(t) => t,
            TensorRef::Dense(_) => {
                return Err(Error::unsupported_operation(
                    "sspaddmm",
                    "sspaddmm can only be called on sparse tensors",
                ))
            }
        };

        let (dim_i, dim_j, dim_k) = check_matmul_operands(sparse, dense)?;
        if t.shape() != [dim_i, dim_k] {
            return Err(Error::shape_mismatch(&[dim_i, dim_k], t.shape()));
        }
        if t.sparse_dims != 2 {
            return Err(Error::shape_mismatch(
                &[2, 0],
                &[t.sparse_dims, t.dense_dims()],
            ));
        }
        Error::check_dtype(t.dtype(), dense.dtype())?;

        let sparse = sparse.coalesce()?;
        let nnz = sparse.nnz;
        let t_nnz = t.nnz;
        tracing::debug!(nnz, t_nnz, dim_i, dim_j, dim_k, dtype = %dense.dtype(), beta, alpha, "sspaddmm");

        let idx_data = sparse.index_data()?;
        let idx = IndexView::new(&idx_data, nnz);
        let cols = idx.dim(1);
        check_columns(cols, dim_j)?;
        let csr = to_csr(idx.dim(0), dim_i, nnz)?;

        let capacity = t_nnz + nnz.min(dim_i) * dim_k;
        let mut new_idx = vec![0i64; 2 * capacity];
        let t_idx_data = t.index_data()?;
        let t_idx = IndexView::new(&t_idx_data, t_nnz);
        for d in 0..2 {
            new_idx[d * capacity..d * capacity + t_nnz].copy_from_slice(t_idx.dim(d));
        }

        *r = dispatch_dtype!(dense.dtype(), T => {
            let mut new_vals = vec![T::zero(); capacity];
            let beta_t = T::from_f64(beta);
            let t_vals = t.values.to_vec::<T>()?;
            kernels::scale(&t_vals, beta_t, &mut new_vals[..t_nnz]);

            let values = sparse.values.to_vec::<T>()?;
            let alpha = T::from_f64(alpha);
            let base = dense.offset();
            let stride0 = dense.strides()[0] as usize;
            let stride1 = dense.strides()[1] as usize;

            let mut p = t_nnz;
            dense.storage().read::<T, _>(|d| {
                for h in 0..dim_i {
                    let (start, end) = (csr[h] as usize, csr[h + 1] as usize);
                    if start == end {
                        continue;
                    }
                    for i in start..end {
                        kernels::axpy(
                            dim_k,
                            alpha * values[i],
                            &d[base + cols[i] as usize * stride0..],
                            stride1,
                            &mut new_vals[p..p + dim_k],
                            1,
                        );
                    }
                    for c in 0..dim_k {
                        new_idx[p + c] = h as i64;
                        new_idx[capacity + p + c] = c as i64;
                    }
                    p += dim_k;
                }
            })?;

            SparseTensor::from_buffers(
                &[dim_i, dim_k],
                2,
                new_idx,
                new_vals,
                capacity,
                p,
                t_nnz == 0,
            )?
        }, "sspaddmm");
        Ok(r)
    }

    /// `self @ dense` with a sparse result; `sspaddmm` from an empty accumulator
    pub fn smm(&self, dense: &Tensor) -> Result<SparseTensor> {
        let dim_k = dense.shape().get(1).copied().unwrap_or(0);
        let rows = self.shape.first().copied().unwrap_or(0);
        let t = SparseTensor::empty(&[rows, dim_k], 2, self.dtype())?;
        let mut r = SparseTensor::empty(&[rows, dim_k], 2, self.dtype())?;
        Self::sspaddmm_out(&mut r, TensorRef::Sparse(&t), self, dense, 0.0, 1.0)?;
        Ok(r)
    }
}
