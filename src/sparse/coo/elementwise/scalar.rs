//! Scalar broadcast: multiply, divide, power, norm

use super::super::core::SparseTensor;
use crate::error::{Error, Result};
use crate::tensor::Tensor;

impl SparseTensor {
    /// Multiply every stored value by `scalar`
    pub fn mul_scalar(&self, scalar: f64) -> Result<SparseTensor> {
        let mut r = SparseTensor::empty(&self.shape, self.sparse_dims, self.dtype())?;
        Self::mul_scalar_out(&mut r, self, scalar)?;
        Ok(r)
    }

    /// In-place `self *= scalar`; only the value buffer is touched
    pub fn mul_scalar_(&mut self, scalar: f64) -> Result<&mut Self> {
        let t = self.clone();
        Self::mul_scalar_out(self, &t, scalar)
    }

    /// `r = t * scalar`
    ///
    /// When `r` aliases `t` the values are scaled where they are. Otherwise
    /// `r` receives a copy of `t`'s coordinates and a freshly computed value
    /// buffer; `nnz` and the coalesced flag carry over unchanged.
    pub fn mul_scalar_out<'r>(
        r: &'r mut SparseTensor,
        t: &SparseTensor,
        scalar: f64,
    ) -> Result<&'r mut SparseTensor> {
        tracing::debug!(nnz = t.nnz, dtype = %t.dtype(), scalar, "sparse mul_scalar");
        if r.is_alias_of(t) {
            tracing::trace!("sparse mul_scalar: in place");
            r.values.mul_scalar_(scalar)?;
            return Ok(r);
        }

        let mut values = Tensor::undefined();
        t.values.mul_scalar_out(&mut values, scalar)?;
        *r = with_values(t, values)?;
        Ok(r)
    }

    /// Divide every stored value by `scalar`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an integer element kind when `scalar` converts
    /// to zero.
    pub fn div_scalar(&self, scalar: f64) -> Result<SparseTensor> {
        let mut r = SparseTensor::empty(&self.shape, self.sparse_dims, self.dtype())?;
        Self::div_scalar_out(&mut r, self, scalar)?;
        Ok(r)
    }

    /// In-place `self /= scalar`
    pub fn div_scalar_(&mut self, scalar: f64) -> Result<&mut Self> {
        let t = self.clone();
        Self::div_scalar_out(self, &t, scalar)
    }

    /// `r = t / scalar`, with the same aliasing rules as [`mul_scalar_out`](Self::mul_scalar_out)
    pub fn div_scalar_out<'r>(
        r: &'r mut SparseTensor,
        t: &SparseTensor,
        scalar: f64,
    ) -> Result<&'r mut SparseTensor> {
        tracing::debug!(nnz = t.nnz, dtype = %t.dtype(), scalar, "sparse div_scalar");
        if r.is_alias_of(t) {
            tracing::trace!("sparse div_scalar: in place");
            r.values.div_scalar_(scalar)?;
            return Ok(r);
        }

        let mut values = Tensor::undefined();
        t.values.div_scalar_out(&mut values, scalar)?;
        *r = with_values(t, values)?;
        Ok(r)
    }

    /// Raise every stored value to `exponent`
    ///
    /// Duplicates are summed before exponentiation, so the result is always
    /// coalesced.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `exponent` is zero: `x^0 = 1` would fill every
    /// coordinate, including unstored ones. The exponent is applied in f64,
    /// so a fractional exponent on an integer tensor is accepted.
    ///
    /// # Example
    ///
    /// ```
    /// use cootensor::sparse::SparseTensor;
    ///
    /// let s = SparseTensor::from_slices(&[1, 3, 1], &[1.0f64, 3.0, 1.0], &[4], 1)?;
    /// let p = s.pow(2.0)?;
    /// assert_eq!(p.values().to_vec::<f64>()?, vec![4.0, 9.0]);
    /// assert!(s.pow(0.0).is_err());
    /// # Ok::<(), cootensor::error::Error>(())
    /// ```
    pub fn pow(&self, exponent: f64) -> Result<SparseTensor> {
        let mut r = SparseTensor::empty(&self.shape, self.sparse_dims, self.dtype())?;
        Self::pow_out(&mut r, self, exponent)?;
        Ok(r)
    }

    /// In-place power; computed out of place, then assigned
    pub fn pow_(&mut self, exponent: f64) -> Result<&mut Self> {
        let t = self.clone();
        Self::pow_out(self, &t, exponent)
    }

    /// `r = t ^ exponent`
    pub fn pow_out<'r>(
        r: &'r mut SparseTensor,
        t: &SparseTensor,
        exponent: f64,
    ) -> Result<&'r mut SparseTensor> {
        if exponent == 0.0 {
            return Err(Error::invalid_argument(
                "exponent",
                format!("pow({exponent}) on a sparse tensor would produce a dense result"),
            ));
        }
        tracing::debug!(nnz = t.nnz, dtype = %t.dtype(), exponent, "sparse pow");

        let t = t.coalesce()?;
        let mut values = Tensor::undefined();
        t.values.pow_scalar_out(&mut values, exponent)?;
        let mut out = with_values(&t, values)?;
        out.coalesced = true;
        *r = out;
        Ok(r)
    }

    /// p-norm of the stored values after coalescing
    ///
    /// Unstored coordinates contribute zero, so this equals the norm of the
    /// dense materialization. Float element kinds only.
    pub fn norm(&self, p: f64) -> Result<f64> {
        tracing::debug!(nnz = self.nnz, dtype = %self.dtype(), p, "sparse norm");
        self.coalesce()?.values.norm(p)
    }
}

/// Deep copy of `t`'s coordinates around a new value buffer
fn with_values(t: &SparseTensor, values: Tensor) -> Result<SparseTensor> {
    Ok(SparseTensor {
        indices: t.indices.deep_clone()?,
        values,
        shape: t.shape.clone(),
        sparse_dims: t.sparse_dims,
        nnz: t.nnz,
        capacity: t.nnz,
        coalesced: t.coalesced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;

    fn sample() -> SparseTensor {
        SparseTensor::from_slices(&[2, 0, 2], &[1.0f64, -2.0, 4.0], &[3], 1).unwrap()
    }

    #[test]
    fn test_mul_scalar_out_of_place() {
        let s = sample();
        let r = s.mul_scalar(3.0).unwrap();
        assert!(!r.is_alias_of(&s));
        assert!(!r.indices().same_storage(s.indices()));
        assert_eq!(r.nnz(), 3);
        assert!(!r.is_coalesced());
        assert_eq!(r.values().to_vec::<f64>().unwrap(), vec![3.0, -6.0, 12.0]);
        assert_eq!(s.values().to_vec::<f64>().unwrap(), vec![1.0, -2.0, 4.0]);
    }

    #[test]
    fn test_mul_scalar_in_place_matches_out_of_place() {
        for s in [0.0, 1.0, -2.5, 7.0] {
            let expected = sample().mul_scalar(s).unwrap();
            let mut x = sample();
            let alias = x.clone();
            x.mul_scalar_(s).unwrap();
            assert!(x.is_alias_of(&alias));
            assert_eq!(
                x.to_dense().unwrap().to_vec::<f64>().unwrap(),
                expected.to_dense().unwrap().to_vec::<f64>().unwrap()
            );
        }
    }

    #[test]
    fn test_div_scalar() {
        let s = SparseTensor::from_slices(&[0, 1], &[8i32, -6], &[2], 1).unwrap();
        let r = s.div_scalar(2.0).unwrap();
        assert_eq!(r.values().to_vec::<i32>().unwrap(), vec![4, -3]);

        let mut x = s.clone();
        x.div_scalar_(2.0).unwrap();
        assert_eq!(s.values().to_vec::<i32>().unwrap(), vec![4, -3]);

        assert!(matches!(
            x.div_scalar(0.0),
            Err(Error::InvalidArgument { arg: "scalar", .. })
        ));
    }

    #[test]
    fn test_div_scalar_integer_min_by_minus_one() {
        let s = SparseTensor::from_slices(&[0], &[i8::MIN], &[2], 1).unwrap();
        let r = s.div_scalar(-1.0).unwrap();
        assert_eq!(r.values().to_vec::<i8>().unwrap(), vec![i8::MIN]);

        let mut x = s.deep_clone().unwrap();
        x.div_scalar_(-1.0).unwrap();
        assert_eq!(x.values().to_vec::<i8>().unwrap(), vec![i8::MIN]);
    }

    #[test]
    fn test_pow_coalesces_first() {
        let r = sample().pow(2.0).unwrap();
        assert!(r.is_coalesced());
        assert_eq!(r.indices().to_vec::<i64>().unwrap(), vec![0, 2]);
        assert_eq!(r.values().to_vec::<f64>().unwrap(), vec![4.0, 25.0]);
    }

    #[test]
    fn test_pow_rejects_zero_exponent() {
        assert!(matches!(
            sample().pow(0.0),
            Err(Error::InvalidArgument { arg: "exponent", .. })
        ));
        assert!(matches!(
            sample().pow(-0.0),
            Err(Error::InvalidArgument { arg: "exponent", .. })
        ));
        let ints = SparseTensor::from_slices(&[0], &[3i64], &[2], 1).unwrap();
        assert_eq!(
            ints.pow(3.0).unwrap().values().to_vec::<i64>().unwrap(),
            vec![27]
        );
    }

    #[test]
    fn test_pow_fractional_exponent_on_integers() {
        // The exponent is applied in f64, so 0.5 is a square root, not zero
        let ints = SparseTensor::from_slices(&[0], &[4i64], &[2], 1).unwrap();
        assert_eq!(
            ints.pow(0.5).unwrap().values().to_vec::<i64>().unwrap(),
            vec![2]
        );
        let bytes = SparseTensor::from_slices(&[1], &[2u8], &[2], 1).unwrap();
        assert_eq!(
            bytes.pow(-1.0).unwrap().values().to_vec::<u8>().unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_pow_in_place() {
        let mut s = sample();
        s.pow_(0.5).unwrap();
        assert_eq!(s.nnz(), 2);
        let vals = s.values().to_vec::<f64>().unwrap();
        assert!(vals[0].is_nan());
        assert!((vals[1] - 5.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_norm() {
        // Coalesced values are [-2, 5]
        let s = sample();
        assert!((s.norm(2.0).unwrap() - 29.0f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.norm(1.0).unwrap(), 7.0);
        assert_eq!(s.norm(f64::INFINITY).unwrap(), 5.0);

        let empty = SparseTensor::empty(&[3], 1, DType::F32).unwrap();
        assert_eq!(empty.norm(2.0).unwrap(), 0.0);
    }
}
