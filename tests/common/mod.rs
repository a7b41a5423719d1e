//! Common test utilities
#![allow(dead_code)]

use cootensor::sparse::SparseTensor;

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// 1-D f64 sparse vector of length `len`
pub fn sparse_vector(indices: &[i64], values: &[f64], len: usize) -> SparseTensor {
    SparseTensor::from_slices(indices, values, &[len], 1).unwrap()
}

/// 2-D f64 sparse matrix from (row, col, value) triplets, in the given order
pub fn sparse_matrix(triplets: &[(i64, i64, f64)], nrows: usize, ncols: usize) -> SparseTensor {
    let mut indices: Vec<i64> = triplets.iter().map(|t| t.0).collect();
    indices.extend(triplets.iter().map(|t| t.1));
    let values: Vec<f64> = triplets.iter().map(|t| t.2).collect();
    SparseTensor::from_slices(&indices, &values, &[nrows, ncols], 2).unwrap()
}

/// Dense row-major materialization of an f64 sparse tensor
pub fn dense_of(s: &SparseTensor) -> Vec<f64> {
    s.to_dense().unwrap().to_vec::<f64>().unwrap()
}

/// Reference `[m, k] @ [k, n]` product over row-major buffers
pub fn dense_matmul(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            for j in 0..n {
                out[i * n + j] += a_ip * b[p * n + j];
            }
        }
    }
    out
}

/// Deterministic pseudo-random values in `[-1, 1)` (xorshift)
pub fn pseudo_random(len: usize, seed: u64) -> Vec<f64> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
        })
        .collect()
}
