//! Storage: host memory management with Arc-based sharing

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

/// Storage for tensor data
///
/// Storage wraps a host buffer with reference counting, enabling zero-copy
/// views (select, narrow, etc.) that share the underlying buffer. Cloning a
/// `Storage` shares the buffer; writes through one handle are visible through
/// every other.
///
/// Memory is automatically deallocated when the last reference is dropped.
pub struct Storage {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    /// Backing words; u64 keeps every element kind correctly aligned
    words: RwLock<Vec<u64>>,
    /// Number of elements (not bytes)
    len: usize,
    /// Element type
    dtype: DType,
}

static UNDEFINED: OnceLock<Storage> = OnceLock::new();

#[inline]
fn words_for(len: usize, dtype: DType) -> usize {
    (len * dtype.size_in_bytes()).div_ceil(8)
}

impl Storage {
    /// Create zero-filled storage for `len` elements of `dtype`
    pub fn zeroed(len: usize, dtype: DType) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                words: RwLock::new(vec![0u64; words_for(len, dtype)]),
                len,
                dtype,
            }),
        }
    }

    /// Create storage from existing data with inferred dtype
    pub fn from_slice<T: Element>(data: &[T]) -> Self {
        let storage = Self::zeroed(data.len(), T::DTYPE);
        {
            let mut words = storage.inner.words.write();
            let typed: &mut [T] = bytemuck::cast_slice_mut(&mut words[..]);
            typed[..data.len()].copy_from_slice(data);
        }
        storage
    }

    /// The process-wide empty sentinel backing undefined tensors
    pub fn undefined() -> Self {
        UNDEFINED.get_or_init(|| Self::zeroed(0, DType::F32)).clone()
    }

    /// Whether this is the undefined sentinel
    #[inline]
    pub fn is_defined(&self) -> bool {
        match UNDEFINED.get() {
            Some(sentinel) => !self.same_as(sentinel),
            None => true,
        }
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * self.inner.dtype.size_in_bytes()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Check if this is the only reference
    #[inline]
    pub fn is_unique(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Handle identity: both handles share one buffer
    #[inline]
    pub fn same_as(&self, other: &Storage) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run `f` over the typed elements under a shared lock
    ///
    /// `f` must not acquire a write lock on the same storage.
    pub(crate) fn read<T: Element, R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        Error::check_dtype(self.inner.dtype, T::DTYPE)?;
        let words = self.inner.words.read();
        let typed: &[T] = bytemuck::cast_slice(&words[..]);
        Ok(f(&typed[..self.inner.len]))
    }

    /// Run `f` over the typed elements under an exclusive lock
    ///
    /// `f` must not touch the same storage through another handle.
    pub(crate) fn write<T: Element, R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        Error::check_dtype(self.inner.dtype, T::DTYPE)?;
        let mut words = self.inner.words.write();
        let typed: &mut [T] = bytemuck::cast_slice_mut(&mut words[..]);
        Ok(f(&mut typed[..self.inner.len]))
    }
}

impl Clone for Storage {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.inner.len)
            .field("dtype", &self.inner.dtype)
            .field("refs", &Arc::strong_count(&self.inner))
            .finish()
    }
}
