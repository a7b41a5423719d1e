//! Fused scaled-accumulate kernels
//!
//! AXPY: y += alpha * x, the accumulation step shared by sparse addition,
//! dense-plus-sparse and the sparse-dense products.

use crate::dtype::Element;

/// Strided AXPY: `y[i * incy] += alpha * x[i * incx]` for `i in 0..n`
///
/// # Panics
///
/// Panics if either slice is too short for `n` strided elements.
#[inline]
pub fn axpy<T: Element>(n: usize, alpha: T, x: &[T], incx: usize, y: &mut [T], incy: usize) {
    if incx == 1 && incy == 1 {
        axpy_contiguous(alpha, &x[..n], &mut y[..n]);
        return;
    }
    for i in 0..n {
        y[i * incy] = y[i * incy] + alpha * x[i * incx];
    }
}

/// Contiguous AXPY over equally sized slices
#[inline]
pub fn axpy_contiguous<T: Element>(alpha: T, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len());
    if alpha == T::one() {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi = *yi + xi;
        }
    } else {
        for (yi, &xi) in y.iter_mut().zip(x) {
            *yi = *yi + alpha * xi;
        }
    }
}

/// Fused multiply-accumulate: `out[i] += alpha * a[i] * b[i]`
#[inline]
pub fn mul_accumulate<T: Element>(alpha: T, a: &[T], b: &[T], out: &mut [T]) {
    debug_assert_eq!(a.len(), out.len());
    debug_assert_eq!(b.len(), out.len());
    for ((o, &ai), &bi) in out.iter_mut().zip(a).zip(b) {
        *o = *o + alpha * ai * bi;
    }
}
