//! Benchmarks for COO sparse operations
//!
//! Covers coalescing, the merge-based elementwise ops and the sparse-dense
//! products across sizes that straddle the parallel threshold.

use cootensor::dtype::DType;
use cootensor::sparse::{add_dense_sparse, addmm, SparseTensor};
use cootensor::tensor::Tensor;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

/// Random uncoalesced sparse matrix with `nnz` stored entries (LCG, reproducible)
fn random_sparse_matrix(nrows: usize, ncols: usize, nnz: usize, mut seed: u64) -> SparseTensor {
    let mut rows = Vec::with_capacity(nnz);
    let mut cols = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        rows.push((seed % nrows as u64) as i64);
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        cols.push((seed % ncols as u64) as i64);
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        values.push((seed % 10000) as f64 / 10000.0);
    }
    rows.extend(cols);
    SparseTensor::from_slices(&rows, &values, &[nrows, ncols], 2).unwrap()
}

fn random_dense_matrix(nrows: usize, ncols: usize) -> Tensor {
    let mut seed = 54321u64;
    let data: Vec<f64> = (0..nrows * ncols)
        .map(|_| {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            (seed % 10000) as f64 / 10000.0
        })
        .collect();
    Tensor::from_slice(&data, &[nrows, ncols]).unwrap()
}

fn bench_coalesce(c: &mut Criterion) {
    let mut group = c.benchmark_group("coalesce");

    for nnz in [1_000, 10_000, 100_000] {
        let s = random_sparse_matrix(1000, 1000, nnz, 7);
        group.throughput(Throughput::Elements(nnz as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nnz), &s, |b, s| {
            b.iter(|| black_box(s.coalesce().unwrap()));
        });
    }

    group.finish();
}

fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise");

    for nnz in [1_000, 50_000] {
        let a = random_sparse_matrix(1000, 1000, nnz, 1).coalesce().unwrap();
        let b = random_sparse_matrix(1000, 1000, nnz, 2).coalesce().unwrap();
        group.throughput(Throughput::Elements(2 * nnz as u64));

        group.bench_with_input(BenchmarkId::new("add", nnz), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| black_box(a.add(b, 1.0).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("mul", nnz), &(&a, &b), |bench, (a, b)| {
            bench.iter(|| black_box(a.mul(b).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("mul_scalar", nnz), &a, |bench, a| {
            bench.iter(|| black_box(a.mul_scalar(2.0).unwrap()));
        });
    }

    group.finish();
}

fn bench_products(c: &mut Criterion) {
    let mut group = c.benchmark_group("products");
    let dim_k = 32;

    for nnz in [5_000, 50_000] {
        let s = random_sparse_matrix(2000, 500, nnz, 3);
        let dense = random_dense_matrix(500, dim_k);
        let t = Tensor::zeros(&[2000, dim_k], DType::F64);
        group.throughput(Throughput::Elements((nnz * dim_k) as u64));

        group.bench_with_input(BenchmarkId::new("addmm", nnz), &s, |b, s| {
            b.iter(|| black_box(addmm(&t, s, &dense, 1.0, 1.0).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("hspmm", nnz), &s, |b, s| {
            b.iter(|| black_box(s.hspmm(&dense).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("smm", nnz), &s, |b, s| {
            b.iter(|| black_box(s.smm(&dense).unwrap()));
        });
    }

    let s = random_sparse_matrix(2000, 500, 50_000, 4);
    let base = Tensor::zeros(&[2000, 500], DType::F64);
    group.bench_function("add_dense_sparse/50000", |b| {
        b.iter(|| black_box(add_dense_sparse(&base, &s, 1.0).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_coalesce, bench_elementwise, bench_products);
criterion_main!(benches);
