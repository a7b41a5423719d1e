//! Core COO implementation: struct, creation, getters, structural mutation

use std::cmp::Ordering;

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::tensor::{Shape, Tensor};

/// Coordinate-format sparse tensor
///
/// The leading `sparse_dims` dimensions are indexed explicitly: column `k` of
/// `indices` holds the coordinate of the `k`-th stored entry. The trailing
/// dense dimensions are stored as one value block per entry, so `values`
/// has shape `[nnz, ...dense_shape]`.
///
/// When `coalesced` is true the index columns are sorted lexicographically
/// and no coordinate repeats. Otherwise entries sharing a coordinate
/// implicitly sum.
///
/// `clone` is shallow: the clone shares both buffers with the original and
/// [`is_alias_of`](Self::is_alias_of) reports true for the pair.
#[derive(Debug, Clone)]
pub struct SparseTensor {
    /// I64 `[sparse_dims, nnz]` view over a `[sparse_dims, capacity]` buffer
    pub(crate) indices: Tensor,
    /// `[nnz, ...dense_shape]` view over a `[capacity, ...dense_shape]` buffer
    pub(crate) values: Tensor,
    pub(crate) shape: Shape,
    pub(crate) sparse_dims: usize,
    pub(crate) nnz: usize,
    pub(crate) capacity: usize,
    pub(crate) coalesced: bool,
}

impl SparseTensor {
    /// Create a sparse tensor from index and value tensors
    ///
    /// # Arguments
    ///
    /// * `indices` - I64 tensor of shape `[sparse_dims, nnz]`
    /// * `values` - Tensor of shape `[nnz, ...shape[sparse_dims..]]`
    /// * `shape` - Full logical shape
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `indices` is not a 2-D I64 tensor
    /// - `values` does not match `[nnz, ...dense_shape]`
    /// - Any coordinate lies outside `[0, shape[d])`
    pub fn new(indices: Tensor, values: Tensor, shape: &[usize]) -> Result<Self> {
        if indices.dtype() != DType::I64 {
            return Err(Error::DTypeMismatch {
                lhs: DType::I64,
                rhs: indices.dtype(),
            });
        }
        if indices.ndim() != 2 {
            return Err(Error::invalid_argument(
                "indices",
                format!(
                    "expected a 2-D [sparse_dims, nnz] tensor, got {}-D",
                    indices.ndim()
                ),
            ));
        }

        let sparse_dims = indices.shape()[0];
        let nnz = indices.shape()[1];
        if sparse_dims > shape.len() {
            return Err(Error::shape_mismatch(shape, indices.shape()));
        }

        let expected = block_shape(nnz, &shape[sparse_dims..]);
        if values.shape() != expected.as_slice() {
            return Err(Error::shape_mismatch(&expected, values.shape()));
        }

        let idx = indices.to_vec::<i64>()?;
        check_bounds(&IndexView::new(&idx, nnz), &shape[..sparse_dims])?;

        Ok(Self {
            indices,
            values,
            shape: shape.iter().copied().collect(),
            sparse_dims,
            nnz,
            capacity: nnz,
            coalesced: nnz <= 1,
        })
    }

    /// Create a sparse tensor from host slices
    ///
    /// # Arguments
    ///
    /// * `indices` - Row-major `[sparse_dims, nnz]` coordinates
    /// * `values` - Row-major `[nnz, ...dense_shape]` value blocks
    /// * `shape` - Full logical shape
    /// * `sparse_dims` - Number of leading dimensions indexed explicitly
    ///
    /// # Example
    ///
    /// ```
    /// use cootensor::sparse::SparseTensor;
    ///
    /// // 2x3 matrix with entries (0, 2) = 1.0 and (1, 0) = 2.0
    /// let s = SparseTensor::from_slices(&[0, 1, 2, 0], &[1.0f64, 2.0], &[2, 3], 2)?;
    /// assert_eq!(s.nnz(), 2);
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn from_slices<T: Element>(
        indices: &[i64],
        values: &[T],
        shape: &[usize],
        sparse_dims: usize,
    ) -> Result<Self> {
        if sparse_dims > shape.len() {
            return Err(Error::invalid_argument(
                "sparse_dims",
                format!(
                    "{sparse_dims} sparse dimensions exceed rank {}",
                    shape.len()
                ),
            ));
        }

        let dense_shape = &shape[sparse_dims..];
        let block: usize = dense_shape.iter().product();
        let nnz = if sparse_dims > 0 {
            if indices.len() % sparse_dims != 0 {
                return Err(Error::shape_mismatch(&[sparse_dims], &[indices.len()]));
            }
            indices.len() / sparse_dims
        } else if block > 0 {
            values.len() / block
        } else {
            0
        };

        let indices = Tensor::from_slice(indices, &[sparse_dims, nnz])?;
        let values = Tensor::from_slice(values, &block_shape(nnz, dense_shape))?;
        Self::new(indices, values, shape)
    }

    /// Create an empty (zero nnz, coalesced) sparse tensor
    pub fn empty(shape: &[usize], sparse_dims: usize, dtype: DType) -> Result<Self> {
        if sparse_dims > shape.len() {
            return Err(Error::invalid_argument(
                "sparse_dims",
                format!(
                    "{sparse_dims} sparse dimensions exceed rank {}",
                    shape.len()
                ),
            ));
        }

        Ok(Self {
            indices: Tensor::zeros(&[sparse_dims, 0], DType::I64),
            values: Tensor::zeros(&block_shape(0, &shape[sparse_dims..]), dtype),
            shape: shape.iter().copied().collect(),
            sparse_dims,
            nnz: 0,
            capacity: 0,
            coalesced: true,
        })
    }

    /// Assemble a tensor from preallocated host buffers
    ///
    /// `indices` is row-major `[sparse_dims, capacity]` and `values` is
    /// `[capacity, ...dense_shape]`; only the first `nnz` entries are live.
    pub(crate) fn from_buffers<T: Element>(
        shape: &[usize],
        sparse_dims: usize,
        indices: Vec<i64>,
        values: Vec<T>,
        capacity: usize,
        nnz: usize,
        coalesced: bool,
    ) -> Result<Self> {
        let indices = Tensor::from_vec(indices, &[sparse_dims, capacity])?;
        let values = Tensor::from_vec(values, &block_shape(capacity, &shape[sparse_dims..]))?;

        let mut out = Self {
            indices,
            values,
            shape: shape.iter().copied().collect(),
            sparse_dims,
            nnz: capacity,
            capacity,
            coalesced,
        };
        out.set_nnz(nnz)?;
        Ok(out)
    }

    // ===== Getters =====

    /// Full logical shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Rank
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of leading dimensions indexed explicitly
    #[inline]
    pub fn sparse_dims(&self) -> usize {
        self.sparse_dims
    }

    /// Number of trailing dimensions stored per entry
    #[inline]
    pub fn dense_dims(&self) -> usize {
        self.shape.len() - self.sparse_dims
    }

    /// Shape of one value block
    #[inline]
    pub fn dense_shape(&self) -> &[usize] {
        &self.shape[self.sparse_dims..]
    }

    /// Elements per value block
    #[inline]
    pub(crate) fn block_size(&self) -> usize {
        self.dense_shape().iter().product()
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    /// Number of entries the current buffers can hold
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether entries are sorted and duplicate-free
    #[inline]
    pub fn is_coalesced(&self) -> bool {
        self.coalesced
    }

    /// Element type of the values
    #[inline]
    pub fn dtype(&self) -> DType {
        self.values.dtype()
    }

    /// I64 `[sparse_dims, nnz]` coordinates of the live entries
    #[inline]
    pub fn indices(&self) -> &Tensor {
        &self.indices
    }

    /// `[nnz, ...dense_shape]` value blocks of the live entries
    #[inline]
    pub fn values(&self) -> &Tensor {
        &self.values
    }

    /// Both handles share index and value storage
    pub fn is_alias_of(&self, other: &SparseTensor) -> bool {
        self.indices.same_storage(&other.indices) && self.values.same_storage(&other.values)
    }

    /// Host copy of the live coordinates, laid out `[sparse_dims][nnz]`
    pub(crate) fn index_data(&self) -> Result<Vec<i64>> {
        self.indices.to_vec::<i64>()
    }

    // ===== Structural mutation =====

    /// Change the number of live entries
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `nnz` exceeds the allocated capacity.
    pub fn set_nnz(&mut self, nnz: usize) -> Result<()> {
        if nnz > self.capacity {
            return Err(Error::invalid_argument(
                "nnz",
                format!("{nnz} exceeds allocated capacity {}", self.capacity),
            ));
        }
        self.indices = self.indices.with_extent(1, nnz);
        self.values = self.values.with_extent(0, nnz);
        self.nnz = nnz;
        Ok(())
    }

    /// Mark the tensor as (un)coalesced
    ///
    /// The caller is responsible for the flag matching the entries.
    pub fn set_coalesced(&mut self, coalesced: bool) {
        self.coalesced = coalesced;
    }

    /// Replace both buffers at once
    ///
    /// `nnz` becomes the column count of `indices`. The coalesced flag is left
    /// for the caller to set. Coordinates are not bounds-checked.
    pub fn set_indices_and_values(&mut self, indices: Tensor, values: Tensor) -> Result<()> {
        if indices.dtype() != DType::I64 {
            return Err(Error::DTypeMismatch {
                lhs: DType::I64,
                rhs: indices.dtype(),
            });
        }
        if indices.ndim() != 2 || indices.shape()[0] != self.sparse_dims {
            return Err(Error::shape_mismatch(&[self.sparse_dims], indices.shape()));
        }

        let nnz = indices.shape()[1];
        let expected = block_shape(nnz, self.dense_shape());
        if values.shape() != expected.as_slice() {
            return Err(Error::shape_mismatch(&expected, values.shape()));
        }

        self.indices = indices;
        self.values = values;
        self.nnz = nnz;
        self.capacity = nnz;
        Ok(())
    }

    /// Drop every entry, leaving the canonical empty state
    pub fn zero_(&mut self) -> &mut Self {
        self.indices = Tensor::zeros(&[self.sparse_dims, 0], DType::I64);
        self.values = Tensor::zeros(&block_shape(0, self.dense_shape()), self.dtype());
        self.nnz = 0;
        self.capacity = 0;
        self.coalesced = true;
        self
    }

    /// Change the logical shape and the sparse/dense split
    ///
    /// An empty tensor may take any shape and split. A non-empty tensor must
    /// keep its split and dense shape and may only grow its sparse extents.
    pub fn resize(&mut self, shape: &[usize], sparse_dims: usize, dense_dims: usize) -> Result<()> {
        if sparse_dims + dense_dims != shape.len() {
            return Err(Error::shape_mismatch(
                &[sparse_dims + dense_dims],
                &[shape.len()],
            ));
        }

        if self.nnz == 0 {
            if sparse_dims != self.sparse_dims || shape[sparse_dims..] != *self.dense_shape() {
                *self = Self::empty(shape, sparse_dims, self.dtype())?;
            } else {
                self.shape = shape.iter().copied().collect();
            }
            return Ok(());
        }

        if sparse_dims != self.sparse_dims || dense_dims != self.dense_dims() {
            return Err(Error::shape_mismatch(
                &[self.sparse_dims, self.dense_dims()],
                &[sparse_dims, dense_dims],
            ));
        }
        let shrinks = shape[..sparse_dims]
            .iter()
            .zip(&self.shape[..sparse_dims])
            .any(|(new, old)| new < old);
        if shrinks || shape[sparse_dims..] != *self.dense_shape() {
            return Err(Error::shape_mismatch(&self.shape, shape));
        }

        self.shape = shape.iter().copied().collect();
        Ok(())
    }

    /// Resize to the shape and split of `other`
    pub fn resize_as(&mut self, other: &SparseTensor) -> Result<()> {
        self.resize(other.shape(), other.sparse_dims, other.dense_dims())
    }

    /// Become a structural deep copy of `src`
    pub fn copy_sparse_(&mut self, src: &SparseTensor) -> Result<&mut Self> {
        if self.is_alias_of(src) {
            return Ok(self);
        }
        *self = src.deep_clone()?;
        Ok(self)
    }

    /// Copy with its own index and value storage
    pub fn deep_clone(&self) -> Result<SparseTensor> {
        Ok(Self {
            indices: self.indices.deep_clone()?,
            values: self.values.deep_clone()?,
            shape: self.shape.clone(),
            sparse_dims: self.sparse_dims,
            nnz: self.nnz,
            capacity: self.nnz,
            coalesced: self.coalesced,
        })
    }
}

/// `[n, ...dense_shape]`
pub(crate) fn block_shape(n: usize, dense_shape: &[usize]) -> Vec<usize> {
    let mut shape = Vec::with_capacity(dense_shape.len() + 1);
    shape.push(n);
    shape.extend_from_slice(dense_shape);
    shape
}

/// Borrowed `[sparse_dims][nnz]` coordinate matrix
#[derive(Clone, Copy)]
pub(crate) struct IndexView<'a> {
    data: &'a [i64],
    nnz: usize,
}

impl<'a> IndexView<'a> {
    #[inline]
    pub(crate) fn new(data: &'a [i64], nnz: usize) -> Self {
        Self { data, nnz }
    }

    /// Coordinate of entry `k` along sparse dimension `d`
    #[inline]
    pub(crate) fn get(&self, d: usize, k: usize) -> i64 {
        self.data[d * self.nnz + k]
    }

    /// Row `d` of the matrix: every entry's coordinate along dimension `d`
    #[inline]
    pub(crate) fn dim(&self, d: usize) -> &'a [i64] {
        &self.data[d * self.nnz..(d + 1) * self.nnz]
    }

    /// Lexicographic comparison of entry `i` here against entry `j` of `other`
    #[inline]
    pub(crate) fn cmp_entries(
        &self,
        i: usize,
        other: &IndexView<'_>,
        j: usize,
        sparse_dims: usize,
    ) -> Ordering {
        for d in 0..sparse_dims {
            match self.get(d, i).cmp(&other.get(d, j)) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

fn check_bounds(idx: &IndexView<'_>, sizes: &[usize]) -> Result<()> {
    for (d, &size) in sizes.iter().enumerate() {
        for &c in idx.dim(d) {
            if c < 0 || c as usize >= size {
                return Err(Error::IndexOutOfBounds { index: c, size });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(indices: &[i64], values: &[f64], len: usize) -> SparseTensor {
        SparseTensor::from_slices(indices, values, &[len], 1).unwrap()
    }

    #[test]
    fn test_creation() {
        let s = SparseTensor::from_slices(&[0, 1, 2, 1, 0, 2], &[1.0f32, 2.0, 3.0], &[3, 3], 2)
            .unwrap();
        assert_eq!(s.nnz(), 3);
        assert_eq!(s.shape(), &[3, 3]);
        assert_eq!(s.sparse_dims(), 2);
        assert_eq!(s.dense_dims(), 0);
        assert_eq!(s.dtype(), DType::F32);
        assert!(!s.is_coalesced());
        assert_eq!(s.indices().shape(), &[2, 3]);
        assert_eq!(s.values().shape(), &[3]);
    }

    #[test]
    fn test_creation_with_dense_block() {
        // 3 rows sparse, rows of length 2 dense
        let s = SparseTensor::from_slices(&[0, 2], &[1.0f64, 2.0, 3.0, 4.0], &[3, 2], 1).unwrap();
        assert_eq!(s.nnz(), 2);
        assert_eq!(s.dense_shape(), &[2]);
        assert_eq!(s.values().shape(), &[2, 2]);
    }

    #[test]
    fn test_invalid_indices() {
        let err = SparseTensor::from_slices(&[0, 5], &[1.0f32, 2.0], &[3], 1).unwrap_err();
        assert_eq!(err, Error::IndexOutOfBounds { index: 5, size: 3 });

        let err = SparseTensor::from_slices(&[-1], &[1.0f32], &[3], 1).unwrap_err();
        assert_eq!(err, Error::IndexOutOfBounds { index: -1, size: 3 });
    }

    #[test]
    fn test_values_shape_checked() {
        let err = SparseTensor::from_slices(&[0, 1], &[1.0f32], &[3], 1).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty() {
        let s = SparseTensor::empty(&[100, 100], 2, DType::F32).unwrap();
        assert_eq!(s.nnz(), 0);
        assert!(s.is_coalesced());
        assert_eq!(s.indices().shape(), &[2, 0]);
        assert!(SparseTensor::empty(&[4], 2, DType::F32).is_err());
    }

    #[test]
    fn test_set_nnz_bounds() {
        let mut s = vector(&[0, 1, 3], &[1.0, 2.0, 3.0], 4);
        s.set_nnz(2).unwrap();
        assert_eq!(s.nnz(), 2);
        assert_eq!(s.values().to_vec::<f64>().unwrap(), vec![1.0, 2.0]);
        assert_eq!(s.indices().to_vec::<i64>().unwrap(), vec![0, 1]);

        // Growing back within capacity restores the stored entries
        s.set_nnz(3).unwrap();
        assert_eq!(s.values().to_vec::<f64>().unwrap(), vec![1.0, 2.0, 3.0]);

        let err = s.set_nnz(4).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { arg: "nnz", .. }));
    }

    #[test]
    fn test_zero() {
        let mut s = vector(&[1, 0], &[1.0, 2.0], 4);
        s.zero_();
        assert_eq!(s.nnz(), 0);
        assert!(s.is_coalesced());
        assert_eq!(s.shape(), &[4]);
        assert_eq!(s.dtype(), DType::F64);
    }

    #[test]
    fn test_set_indices_and_values_keeps_flag() {
        let mut s = vector(&[1], &[1.0], 4);
        assert!(s.is_coalesced());
        let idx = Tensor::from_slice(&[3i64, 0], &[1, 2]).unwrap();
        let val = Tensor::from_slice(&[5.0f64, 6.0], &[2]).unwrap();
        s.set_indices_and_values(idx, val).unwrap();
        assert_eq!(s.nnz(), 2);
        assert!(s.is_coalesced());

        let bad = Tensor::from_slice(&[1.0f64], &[1]).unwrap();
        let idx = Tensor::from_slice(&[3i64, 0], &[1, 2]).unwrap();
        assert!(s.set_indices_and_values(idx, bad).is_err());
    }

    #[test]
    fn test_resize_rules() {
        let mut s = SparseTensor::from_slices(&[0, 1, 1, 0], &[1.0f32, 2.0], &[2, 2], 2).unwrap();

        // Growing a sparse extent is fine
        s.resize(&[3, 2], 2, 0).unwrap();
        assert_eq!(s.shape(), &[3, 2]);

        // Shrinking or changing the split is not
        assert!(matches!(
            s.resize(&[1, 2], 2, 0),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            s.resize(&[3, 2], 1, 1),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            s.resize(&[3, 2], 1, 0),
            Err(Error::ShapeMismatch { .. })
        ));

        // Once empty, anything goes
        s.zero_();
        s.resize(&[5, 7], 1, 1).unwrap();
        assert_eq!(s.sparse_dims(), 1);
        assert_eq!(s.values().shape(), &[0, 7]);
    }

    #[test]
    fn test_clone_aliases_deep_clone_does_not() {
        let s = vector(&[0], &[1.0], 2);
        let shallow = s.clone();
        let deep = s.deep_clone().unwrap();
        assert!(shallow.is_alias_of(&s));
        assert!(!deep.is_alias_of(&s));
        assert_eq!(deep.values().to_vec::<f64>().unwrap(), vec![1.0]);
    }

    #[test]
    fn test_copy_sparse() {
        let src = vector(&[2, 0], &[1.0, 2.0], 3);
        let mut dst = SparseTensor::empty(&[9], 1, DType::F64).unwrap();
        dst.copy_sparse_(&src).unwrap();
        assert_eq!(dst.shape(), &[3]);
        assert_eq!(dst.nnz(), 2);
        assert!(!dst.is_alias_of(&src));
        assert_eq!(dst.indices().to_vec::<i64>().unwrap(), vec![2, 0]);
    }

    #[test]
    fn test_index_view_ordering() {
        let a = [0i64, 1, 5, 2];
        let b = [0i64, 1];
        let va = IndexView::new(&a, 2);
        let vb = IndexView::new(&b, 1);
        assert_eq!(va.cmp_entries(0, &vb, 0, 2), Ordering::Greater);
        assert_eq!(va.cmp_entries(1, &vb, 0, 2), Ordering::Greater);
        assert_eq!(vb.cmp_entries(0, &va, 0, 2), Ordering::Less);
        assert_eq!(va.dim(1), &[5, 2]);
    }
}
