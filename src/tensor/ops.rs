//! Dense primitives consumed by the sparse engines
//!
//! Out-of-place variants write into a caller-supplied destination, which is
//! resized to the source shape first. An undefined destination is replaced by
//! a fresh buffer of the source dtype.

use super::{Layout, Storage, Tensor};
use crate::dtype::{dispatch_dtype, Element};
use crate::error::{Error, Result};
use crate::kernels;

impl Tensor {
    /// Resize to `shape`, keeping the storage when it is large enough
    ///
    /// A same-shape resize is a no-op. A contiguous view whose storage can
    /// hold the new element count is relaid in place; otherwise fresh
    /// zero-filled storage is allocated and existing contents are dropped.
    pub fn resize_(&mut self, shape: &[usize]) -> &mut Self {
        if self.shape() == shape {
            return self;
        }

        let numel: usize = shape.iter().product();
        let offset = self.offset();
        if self.is_defined() && self.is_contiguous() && offset + numel <= self.storage.len() {
            self.layout = Layout::contiguous_at(shape, offset);
        } else {
            self.storage = Storage::zeroed(numel, self.dtype());
            self.layout = Layout::contiguous(shape);
        }
        self
    }

    /// Copy the elements of `src` into this view
    pub fn copy_(&mut self, src: &Tensor) -> Result<&mut Self> {
        if self.shape() != src.shape() {
            return Err(Error::shape_mismatch(self.shape(), src.shape()));
        }
        Error::check_dtype(self.dtype(), src.dtype())?;

        dispatch_dtype!(src.dtype(), T => {
            let data = src.to_vec::<T>()?;
            self.write_from_slice(&data)?;
        }, "copy_");
        Ok(self)
    }

    /// Fill the view with zeros
    pub fn zero_(&mut self) -> Result<&mut Self> {
        dispatch_dtype!(self.dtype(), T => {
            self.modify::<T, _>(|buf| buf.fill(T::zero()))?;
        }, "zero_");
        Ok(self)
    }

    /// Contiguous copy with its own storage
    pub fn deep_clone(&self) -> Result<Tensor> {
        dispatch_dtype!(self.dtype(), T => {
            Tensor::from_vec(self.to_vec::<T>()?, self.shape())
        }, "deep_clone")
    }

    fn prepare_out(&self, dst: &mut Tensor) -> Result<()> {
        if !dst.is_defined() {
            *dst = Tensor::zeros(self.shape(), self.dtype());
            return Ok(());
        }
        Error::check_dtype(self.dtype(), dst.dtype())?;
        dst.resize_(self.shape());
        Ok(())
    }

    /// `dst = self * scalar`
    pub fn mul_scalar_out(&self, dst: &mut Tensor, scalar: f64) -> Result<()> {
        self.prepare_out(dst)?;
        dispatch_dtype!(self.dtype(), T => {
            let src = self.to_vec::<T>()?;
            let mut out = vec![T::zero(); src.len()];
            kernels::scale(&src, T::from_f64(scalar), &mut out);
            dst.write_from_slice(&out)?;
        }, "mul_scalar_out");
        Ok(())
    }

    /// `dst = self / scalar`
    ///
    /// Integer kinds reject a divisor that converts to zero.
    pub fn div_scalar_out(&self, dst: &mut Tensor, scalar: f64) -> Result<()> {
        dispatch_dtype!(self.dtype(), T => {
            let s = checked_divisor::<T>(scalar)?;
            self.prepare_out(dst)?;
            let src = self.to_vec::<T>()?;
            let mut out = vec![T::zero(); src.len()];
            kernels::divide(&src, s, &mut out);
            dst.write_from_slice(&out)?;
        }, "div_scalar_out");
        Ok(())
    }

    /// `dst = self ^ exponent`
    pub fn pow_scalar_out(&self, dst: &mut Tensor, exponent: f64) -> Result<()> {
        self.prepare_out(dst)?;
        dispatch_dtype!(self.dtype(), T => {
            let src = self.to_vec::<T>()?;
            let mut out = vec![T::zero(); src.len()];
            kernels::powf(&src, exponent, &mut out);
            dst.write_from_slice(&out)?;
        }, "pow_scalar_out");
        Ok(())
    }

    /// `self *= scalar`
    pub fn mul_scalar_(&mut self, scalar: f64) -> Result<&mut Self> {
        dispatch_dtype!(self.dtype(), T => {
            let s = T::from_f64(scalar);
            self.modify::<T, _>(|buf| {
                for x in buf.iter_mut() {
                    *x = *x * s;
                }
            })?;
        }, "mul_scalar_");
        Ok(self)
    }

    /// `self /= scalar`
    pub fn div_scalar_(&mut self, scalar: f64) -> Result<&mut Self> {
        dispatch_dtype!(self.dtype(), T => {
            let s = checked_divisor::<T>(scalar)?;
            self.modify::<T, _>(|buf| {
                for x in buf.iter_mut() {
                    *x = x.wrapping_div(s);
                }
            })?;
        }, "div_scalar_");
        Ok(self)
    }

    /// `self += alpha * src`
    pub fn add_scaled_(&mut self, src: &Tensor, alpha: f64) -> Result<&mut Self> {
        if self.shape() != src.shape() {
            return Err(Error::shape_mismatch(self.shape(), src.shape()));
        }
        Error::check_dtype(self.dtype(), src.dtype())?;

        dispatch_dtype!(self.dtype(), T => {
            let x = src.to_vec::<T>()?;
            let alpha = T::from_f64(alpha);
            self.modify::<T, _>(|buf| kernels::axpy_contiguous(alpha, &x, buf))?;
        }, "add_scaled_");
        Ok(self)
    }

    /// `self += value * a * b`, elementwise
    pub fn addcmul_(&mut self, a: &Tensor, b: &Tensor, value: f64) -> Result<&mut Self> {
        if a.shape() != b.shape() {
            return Err(Error::shape_mismatch(a.shape(), b.shape()));
        }
        if self.shape() != a.shape() {
            return Err(Error::shape_mismatch(self.shape(), a.shape()));
        }
        Error::check_dtype(self.dtype(), a.dtype())?;
        Error::check_dtype(self.dtype(), b.dtype())?;

        dispatch_dtype!(self.dtype(), T => {
            let av = a.to_vec::<T>()?;
            let bv = b.to_vec::<T>()?;
            let value = T::from_f64(value);
            self.modify::<T, _>(|buf| kernels::mul_accumulate(value, &av, &bv, buf))?;
        }, "addcmul_");
        Ok(self)
    }

    /// p-norm over every element of the view
    ///
    /// `p = f64::INFINITY` gives the largest magnitude and `p = 0` the count
    /// of nonzero entries. Defined for floating point element kinds only.
    pub fn norm(&self, p: f64) -> Result<f64> {
        if !self.dtype().is_float() {
            return Err(Error::unsupported_dtype(self.dtype(), "norm"));
        }
        if p.is_nan() || p < 0.0 {
            return Err(Error::invalid_argument(
                "p",
                format!("norm order must be non-negative, got {p}"),
            ));
        }

        dispatch_dtype!(self.dtype(), T => {
            let data = self.to_vec::<T>()?;
            Ok(kernels::abs_pnorm(&data, p))
        }, "norm")
    }
}

fn checked_divisor<T: Element>(scalar: f64) -> Result<T> {
    let s = T::from_f64(scalar);
    if !T::DTYPE.is_float() && s == T::zero() {
        return Err(Error::invalid_argument(
            "scalar",
            format!("integer division by zero ({scalar} converts to 0 as {})", T::DTYPE),
        ));
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    #[test]
    fn test_resize_same_numel_keeps_storage() {
        let mut t = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[4]).unwrap();
        let alias = t.clone();
        t.resize_(&[2, 2]);
        assert_eq!(t.shape(), &[2, 2]);
        assert!(t.same_storage(&alias));
    }

    #[test]
    fn test_resize_grow_reallocates() {
        let mut t = Tensor::from_slice(&[1i32, 2], &[2]).unwrap();
        let alias = t.clone();
        t.resize_(&[3, 2]);
        assert_eq!(t.numel(), 6);
        assert!(!t.same_storage(&alias));
        assert_eq!(t.dtype(), DType::I32);
    }

    #[test]
    fn test_copy_and_zero() {
        let src = Tensor::from_slice(&[1.0f32, 2.0], &[2]).unwrap();
        let mut dst = Tensor::zeros(&[2], DType::F32);
        dst.copy_(&src).unwrap();
        assert_eq!(dst.to_vec::<f32>().unwrap(), vec![1.0, 2.0]);
        dst.zero_().unwrap();
        assert_eq!(dst.to_vec::<f32>().unwrap(), vec![0.0, 0.0]);

        let mut wrong = Tensor::zeros(&[3], DType::F32);
        assert!(matches!(
            wrong.copy_(&src),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_scalar_out_into_undefined() {
        let src = Tensor::from_slice(&[1.0f64, -2.0], &[2]).unwrap();
        let mut dst = Tensor::undefined();
        src.mul_scalar_out(&mut dst, 3.0).unwrap();
        assert_eq!(dst.to_vec::<f64>().unwrap(), vec![3.0, -6.0]);

        src.div_scalar_out(&mut dst, 2.0).unwrap();
        assert_eq!(dst.to_vec::<f64>().unwrap(), vec![0.5, -1.0]);

        src.pow_scalar_out(&mut dst, 2.0).unwrap();
        assert_eq!(dst.to_vec::<f64>().unwrap(), vec![1.0, 4.0]);
    }

    #[test]
    fn test_integer_division_by_zero() {
        let mut t = Tensor::from_slice(&[4i64, 8], &[2]).unwrap();
        assert!(matches!(
            t.div_scalar_(0.5),
            Err(Error::InvalidArgument { arg: "scalar", .. })
        ));
        t.div_scalar_(2.0).unwrap();
        assert_eq!(t.to_vec::<i64>().unwrap(), vec![2, 4]);
    }

    #[test]
    fn test_integer_division_overflow_wraps() {
        let mut t = Tensor::from_slice(&[i16::MIN, 10], &[2]).unwrap();
        t.div_scalar_(-1.0).unwrap();
        assert_eq!(t.to_vec::<i16>().unwrap(), vec![i16::MIN, -10]);
    }

    #[test]
    fn test_add_scaled_into_row_view() {
        let m = Tensor::zeros(&[2, 3], DType::F64);
        let src = Tensor::from_slice(&[1.0f64, 2.0, 3.0], &[3]).unwrap();
        let mut row = m.select(0, 1).unwrap();
        row.add_scaled_(&src, 2.0).unwrap();
        assert_eq!(
            m.to_vec::<f64>().unwrap(),
            vec![0.0, 0.0, 0.0, 2.0, 4.0, 6.0]
        );
    }

    #[test]
    fn test_addcmul() {
        let mut acc = Tensor::from_slice(&[1.0f32, 1.0], &[2]).unwrap();
        let a = Tensor::from_slice(&[2.0f32, 3.0], &[2]).unwrap();
        let b = Tensor::from_slice(&[4.0f32, 5.0], &[2]).unwrap();
        acc.addcmul_(&a, &b, 1.0).unwrap();
        assert_eq!(acc.to_vec::<f32>().unwrap(), vec![9.0, 16.0]);
    }

    #[test]
    fn test_norm() {
        let t = Tensor::from_slice(&[3.0f32, 4.0], &[2]).unwrap();
        assert_eq!(t.norm(2.0).unwrap(), 5.0);
        assert_eq!(t.norm(f64::INFINITY).unwrap(), 4.0);

        let ints = Tensor::from_slice(&[3i32, 4], &[2]).unwrap();
        assert!(matches!(
            ints.norm(2.0),
            Err(Error::UnsupportedDType { .. })
        ));
    }
}
