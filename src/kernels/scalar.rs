//! Scalar broadcast kernels

use crate::dtype::Element;

/// `out[i] = a[i] * s`
#[inline]
pub fn scale<T: Element>(a: &[T], s: T, out: &mut [T]) {
    debug_assert_eq!(a.len(), out.len());
    for (o, &x) in out.iter_mut().zip(a) {
        *o = x * s;
    }
}

/// `out[i] = a[i] / s`
///
/// Callers reject an integer zero divisor before reaching this loop.
/// Integer `MIN / -1` wraps to `MIN`.
#[inline]
pub fn divide<T: Element>(a: &[T], s: T, out: &mut [T]) {
    debug_assert_eq!(a.len(), out.len());
    for (o, &x) in out.iter_mut().zip(a) {
        *o = x.wrapping_div(s);
    }
}

/// `out[i] = a[i] ^ exponent`, evaluated in f64
#[inline]
pub fn powf<T: Element>(a: &[T], exponent: f64, out: &mut [T]) {
    debug_assert_eq!(a.len(), out.len());
    for (o, &x) in out.iter_mut().zip(a) {
        *o = T::from_f64(x.to_f64().powf(exponent));
    }
}

/// p-norm of `a`, accumulated in f64
///
/// `p = inf` is the largest magnitude; `p = 0` counts nonzero entries.
pub fn abs_pnorm<T: Element>(a: &[T], p: f64) -> f64 {
    if p == f64::INFINITY {
        return a.iter().map(|x| x.to_f64().abs()).fold(0.0, f64::max);
    }
    if p == 0.0 {
        return a.iter().filter(|x| x.to_f64() != 0.0).count() as f64;
    }
    if p == 1.0 {
        return a.iter().map(|x| x.to_f64().abs()).sum();
    }
    if p == 2.0 {
        return a
            .iter()
            .map(|x| {
                let v = x.to_f64();
                v * v
            })
            .sum::<f64>()
            .sqrt();
    }
    a.iter()
        .map(|x| x.to_f64().abs().powf(p))
        .sum::<f64>()
        .powf(1.0 / p)
}
