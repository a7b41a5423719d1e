//! Core Tensor type

use super::{Layout, Shape, Storage, Strides};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use std::fmt;

/// N-dimensional array over reference-counted host storage
///
/// `Tensor` is the dense collaborator of the sparse core. It consists of:
/// - **Storage**: Reference-counted, lock-protected memory
/// - **Layout**: Shape, strides, and offset defining the view into storage
/// - **DType**: Element type (determined at runtime)
///
/// # Zero-Copy Views
///
/// `select` and `narrow` create new tensors that share the same underlying
/// storage. `clone` is shallow as well: the clone is another handle onto the
/// same buffer, so in-place mutation through either is visible through both.
///
/// # Example
///
/// ```
/// use cootensor::tensor::Tensor;
///
/// let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let row = a.select(0, 1).unwrap();
/// assert_eq!(row.to_vec::<f32>().unwrap(), vec![3.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    /// Shared memory
    pub(super) storage: Storage,
    /// Shape, strides, offset
    pub(super) layout: Layout,
}

impl Tensor {
    /// Create a tensor from storage and layout
    pub fn from_parts(storage: Storage, layout: Layout) -> Self {
        debug_assert!(layout.elem_count() == 0 || layout.storage_extent() <= storage.len());
        Self { storage, layout }
    }

    /// Create a tensor from a slice of data
    ///
    /// Returns an error if `data.len()` does not equal the product of the `shape` dimensions.
    ///
    /// # Example
    ///
    /// ```
    /// # use cootensor::tensor::Tensor;
    /// let tensor = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2])?;
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }

        Ok(Self {
            storage: Storage::from_slice(data),
            layout: Layout::contiguous(shape),
        })
    }

    /// Create a tensor taking ownership of `data`
    pub fn from_vec<T: Element>(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        Self::from_slice(&data, shape)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let len: usize = shape.iter().product();
        Self {
            storage: Storage::zeroed(len, dtype),
            layout: Layout::contiguous(shape),
        }
    }

    /// The undefined tensor: a handle onto the shared empty sentinel
    pub fn undefined() -> Self {
        Self {
            storage: Storage::undefined(),
            layout: Layout::contiguous(&[0]),
        }
    }

    /// Whether this handle refers to real storage
    #[inline]
    pub fn is_defined(&self) -> bool {
        self.storage.is_defined()
    }

    // ===== Accessors =====

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Starting element offset into the storage
    #[inline]
    pub fn offset(&self) -> usize {
        self.layout.offset()
    }

    /// Get the number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Get the total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Check if the tensor is contiguous in memory
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Get size along a dimension
    #[inline]
    pub fn size(&self, dim: usize) -> Option<usize> {
        self.layout.dim(dim)
    }

    /// Both handles share one storage buffer
    #[inline]
    pub fn same_storage(&self, other: &Tensor) -> bool {
        self.storage.same_as(&other.storage)
    }

    /// Both handles are the same view of the same storage
    #[inline]
    pub fn is_same(&self, other: &Tensor) -> bool {
        self.same_storage(other) && self.layout == other.layout
    }

    // ===== Views =====

    /// Select index `index` along `dim`, dropping that dimension (zero-copy)
    pub fn select(&self, dim: usize, index: usize) -> Result<Self> {
        let size = self.size(dim).ok_or_else(|| {
            Error::invalid_argument(
                "dim",
                format!("dimension {dim} out of range for rank {}", self.ndim()),
            )
        })?;
        let layout = self
            .layout
            .select(dim, index)
            .ok_or(Error::IndexOutOfBounds {
                index: index as i64,
                size,
            })?;

        Ok(Self {
            storage: self.storage.clone(),
            layout,
        })
    }

    /// Narrow a dimension (zero-copy slice)
    ///
    /// Returns a view of the tensor narrowed to `[start, start + length)`
    /// along `dim`. No data is copied.
    pub fn narrow(&self, dim: usize, start: usize, length: usize) -> Result<Self> {
        let size = self.size(dim).ok_or_else(|| {
            Error::invalid_argument(
                "dim",
                format!("dimension {dim} out of range for rank {}", self.ndim()),
            )
        })?;
        let layout = self
            .layout
            .narrow(dim, start, length)
            .ok_or_else(|| Error::ShapeMismatch {
                expected: vec![size],
                got: vec![start, length],
            })?;

        Ok(Self {
            storage: self.storage.clone(),
            layout,
        })
    }

    /// Same view with dimension `dim` resized to `len`, strides untouched
    ///
    /// Used to move the live prefix of a preallocated buffer; the caller
    /// keeps `len` within the extent the storage was allocated for.
    pub(crate) fn with_extent(&self, dim: usize, len: usize) -> Tensor {
        let mut shape: Shape = self.shape().iter().copied().collect();
        shape[dim] = len;
        let strides: Strides = self.strides().iter().copied().collect();
        Self {
            storage: self.storage.clone(),
            layout: Layout::new(shape, strides, self.offset()),
        }
    }

    // ===== Data Access =====

    /// Copy the viewed elements to a Vec, in row-major order
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        if self.is_contiguous() {
            let start = self.layout.offset();
            let end = start + self.numel();
            return self.storage.read::<T, _>(|data| data[start..end].to_vec());
        }

        let offsets = self.layout.offsets();
        self.storage
            .read::<T, _>(|data| offsets.iter().map(|&o| data[o]).collect())
    }

    /// Extract the scalar value from a single-element tensor
    pub fn item<T: Element>(&self) -> Result<T> {
        if self.numel() != 1 {
            return Err(Error::ShapeMismatch {
                expected: vec![1],
                got: self.shape().to_vec(),
            });
        }

        let offset = self.layout.offset();
        self.storage.read::<T, _>(|data| data[offset])
    }

    /// Overwrite the viewed elements, in row-major order, from `data`
    pub fn write_from_slice<T: Element>(&mut self, data: &[T]) -> Result<()> {
        if data.len() != self.numel() {
            return Err(Error::ShapeMismatch {
                expected: self.shape().to_vec(),
                got: vec![data.len()],
            });
        }

        if self.is_contiguous() {
            let start = self.layout.offset();
            return self
                .storage
                .write::<T, _>(|buf| buf[start..start + data.len()].copy_from_slice(data));
        }

        let offsets = self.layout.offsets();
        self.storage.write::<T, _>(|buf| {
            for (&o, &v) in offsets.iter().zip(data) {
                buf[o] = v;
            }
        })
    }

    /// Run `f` over the viewed elements in row-major order, writing back the result
    ///
    /// Contiguous views are updated under the storage lock without copying.
    pub(crate) fn modify<T: Element, R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        if self.is_contiguous() {
            let start = self.layout.offset();
            let end = start + self.numel();
            return self.storage.write::<T, _>(|buf| f(&mut buf[start..end]));
        }

        let mut data = self.to_vec::<T>()?;
        let out = f(&mut data);
        let offsets = self.layout.offsets();
        self.storage.write::<T, _>(|buf| {
            for (&o, &v) in offsets.iter().zip(&data) {
                buf[o] = v;
            }
        })?;
        Ok(out)
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Self::undefined()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("dtype", &self.dtype())
            .field("layout", &self.layout)
            .field("defined", &self.is_defined())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_shape_check() {
        let err = Tensor::from_slice(&[1.0f64, 2.0, 3.0], &[2, 2]).unwrap_err();
        assert_eq!(err, Error::shape_mismatch(&[2, 2], &[3]));
    }

    #[test]
    fn test_clone_is_shallow() {
        let a = Tensor::from_slice(&[1i32, 2, 3], &[3]).unwrap();
        let mut b = a.clone();
        assert!(a.is_same(&b));
        b.write_from_slice(&[7i32, 8, 9]).unwrap();
        assert_eq!(a.to_vec::<i32>().unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn test_select_and_narrow_views() {
        let t = Tensor::from_slice(&[0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0], &[2, 3]).unwrap();

        let col = t.select(1, 2).unwrap();
        assert_eq!(col.to_vec::<f32>().unwrap(), vec![2.0, 5.0]);
        assert!(col.same_storage(&t));
        assert!(!col.is_same(&t));

        let prefix = t.narrow(1, 0, 2).unwrap();
        assert_eq!(prefix.to_vec::<f32>().unwrap(), vec![0.0, 1.0, 3.0, 4.0]);

        assert!(matches!(
            t.select(0, 2),
            Err(Error::IndexOutOfBounds { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_write_through_strided_view() {
        let t = Tensor::zeros(&[2, 2], DType::F64);
        let mut col = t.select(1, 0).unwrap();
        col.write_from_slice(&[1.0f64, 2.0]).unwrap();
        assert_eq!(t.to_vec::<f64>().unwrap(), vec![1.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_item() {
        let t = Tensor::from_slice(&[4u8, 5], &[2]).unwrap();
        assert_eq!(t.select(0, 1).unwrap().item::<u8>().unwrap(), 5);
        assert!(t.item::<u8>().is_err());
    }

    #[test]
    fn test_undefined() {
        let t = Tensor::default();
        assert!(!t.is_defined());
        assert_eq!(t.numel(), 0);
        assert!(Tensor::zeros(&[0], DType::F32).is_defined());
    }

    #[test]
    fn test_dtype_mismatch_on_read() {
        let t = Tensor::zeros(&[2], DType::I64);
        assert!(matches!(
            t.to_vec::<f64>(),
            Err(Error::DTypeMismatch { .. })
        ));
    }
}
