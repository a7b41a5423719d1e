//! COO format conversion: CSR row index, dense materialization

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::core::{IndexView, SparseTensor};
use crate::config;
use crate::dtype::{dispatch_dtype, Element};
use crate::error::{Error, Result};
use crate::kernels;
use crate::tensor::Tensor;

/// Build a compressed-row offset array from sorted row coordinates
///
/// Entry `h` of the result is the position of the first entry in row `h`
/// and entry `h + 1` is one past its last; empty rows have equal bounds.
/// Only the first `nnz` elements of `rows` are read.
///
/// # Errors
///
/// - `IndexOutOfBounds` if a row lies outside `[0, num_rows)`
/// - `InvalidArgument` if the rows are not sorted ascending
///
/// # Example
///
/// ```
/// use cootensor::sparse::to_csr;
///
/// // Row 1 is empty
/// let csr = to_csr(&[0, 0, 2], 3, 3)?;
/// assert_eq!(csr, vec![0, 2, 2, 3]);
/// # Ok::<(), cootensor::error::Error>(())
/// ```
pub fn to_csr(rows: &[i64], num_rows: usize, nnz: usize) -> Result<Vec<i64>> {
    if rows.len() < nnz {
        return Err(Error::shape_mismatch(&[nnz], &[rows.len()]));
    }
    let rows = &rows[..nnz];

    for &r in rows {
        if r < 0 || r as usize >= num_rows {
            return Err(Error::IndexOutOfBounds {
                index: r,
                size: num_rows,
            });
        }
    }
    if rows.windows(2).any(|w| w[0] > w[1]) {
        return Err(Error::invalid_argument(
            "rows",
            "row coordinates must be sorted ascending (coalesce first)",
        ));
    }

    let mut csr = vec![0i64; num_rows + 1];
    if nnz == 0 {
        return Ok(csr);
    }

    if config::should_parallelize(nnz) {
        tracing::trace!(nnz, num_rows, "to_csr: parallel");
        #[cfg(feature = "rayon")]
        {
            // Slot h counts the entries whose row is below h
            let min_len = config::rayon_min_len();
            config::install_parallelism(|| {
                csr.par_iter_mut()
                    .enumerate()
                    .with_min_len(min_len)
                    .for_each(|(h, slot)| {
                        *slot = rows.partition_point(|&r| r < h as i64) as i64;
                    });
            });
            return Ok(csr);
        }
    }

    for i in 0..nnz {
        let hp0 = rows[i] as usize;
        let hp1 = if i + 1 == nnz {
            num_rows
        } else {
            rows[i + 1] as usize
        };
        for h in hp0..hp1 {
            csr[h + 1] = (i + 1) as i64;
        }
    }
    Ok(csr)
}

impl SparseTensor {
    /// Materialize as a dense tensor; duplicate coordinates are summed
    pub fn to_dense(&self) -> Result<Tensor> {
        let dtype = self.dtype();
        let block = self.block_size();
        let sparse_shape = &self.shape[..self.sparse_dims];

        let idx_data = self.index_data()?;
        let idx = IndexView::new(&idx_data, self.nnz);

        dispatch_dtype!(dtype, T => {
            let values = self.values.to_vec::<T>()?;
            let mut out = vec![T::zero(); self.shape.iter().product()];
            for k in 0..self.nnz {
                let mut flat = 0usize;
                for (d, &size) in sparse_shape.iter().enumerate() {
                    let c = idx.get(d, k);
                    if c < 0 || c as usize >= size {
                        return Err(Error::IndexOutOfBounds { index: c, size });
                    }
                    flat = flat * size + c as usize;
                }
                kernels::axpy_contiguous(
                    T::one(),
                    &values[k * block..(k + 1) * block],
                    &mut out[flat * block..(flat + 1) * block],
                );
            }
            Tensor::from_vec(out, &self.shape)
        }, "to_dense")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_csr_basic() {
        assert_eq!(to_csr(&[0, 1, 1, 3], 4, 4).unwrap(), vec![0, 1, 3, 3, 4]);
    }

    #[test]
    fn test_to_csr_leading_and_trailing_empty_rows() {
        assert_eq!(to_csr(&[2, 2], 5, 2).unwrap(), vec![0, 0, 0, 2, 2, 2]);
    }

    #[test]
    fn test_to_csr_empty() {
        assert_eq!(to_csr(&[], 3, 0).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_to_csr_reads_prefix_only() {
        assert_eq!(to_csr(&[0, 1, 99], 2, 2).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_to_csr_errors() {
        assert_eq!(
            to_csr(&[0, 4], 4, 2).unwrap_err(),
            Error::IndexOutOfBounds { index: 4, size: 4 }
        );
        assert!(matches!(
            to_csr(&[1, 0], 4, 2),
            Err(Error::InvalidArgument { arg: "rows", .. })
        ));
    }

    #[test]
    fn test_to_dense_sums_duplicates() {
        let s = SparseTensor::from_slices(&[0, 1, 0, 1, 0, 1], &[1.0f64, 2.0, 3.0], &[2, 2], 2)
            .unwrap();
        let d = s.to_dense().unwrap();
        assert_eq!(d.shape(), &[2, 2]);
        assert_eq!(d.to_vec::<f64>().unwrap(), vec![0.0, 4.0, 2.0, 0.0]);
    }

    #[test]
    fn test_to_dense_with_blocks() {
        let s = SparseTensor::from_slices(&[2], &[7i16, 8], &[3, 2], 1).unwrap();
        let d = s.to_dense().unwrap();
        assert_eq!(d.to_vec::<i16>().unwrap(), vec![0, 0, 0, 0, 7, 8]);
    }
}
