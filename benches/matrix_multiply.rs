//! Benchmarks for boolean multiplication and Kronecker products

use std::hint::black_box;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sprs::CsMat;

use spbool::{
    generate, to_sprs, CpuDevice, DeviceOperators, EngineConfig, HostOperators, Operators,
    SparseBoolMatrix,
};

fn random_pair(n: u32, density: f64) -> (SparseBoolMatrix, SparseBoolMatrix) {
    let mut rng = StdRng::seed_from_u64(n as u64);
    let a = generate(n, n, density, &mut rng).unwrap();
    let b = generate(n, n, density, &mut rng).unwrap();
    (a, b)
}

/// Host, parallel host, in-process device and sprs on the same operands
fn bench_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiply");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));

    let config = EngineConfig::default();
    let host = HostOperators::new(config.clone());
    let parallel = HostOperators::new(config.clone().with_parallel_host(true));
    let device = DeviceOperators::new(CpuDevice::new(&config).unwrap());

    for &n in &[256u32, 1024, 4096] {
        let (a, b) = random_pair(n, 4.0 / n as f64);
        group.throughput(Throughput::Elements(a.nvals() as u64));

        group.bench_with_input(BenchmarkId::new("host", n), &(&a, &b), |bencher, (a, b)| {
            bencher.iter(|| black_box(host.multiply(a, b).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("host-parallel", n), &(&a, &b), |bencher, (a, b)| {
            bencher.iter(|| black_box(parallel.multiply(a, b).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("cpu-device", n), &(&a, &b), |bencher, (a, b)| {
            bencher.iter(|| black_box(device.multiply(a, b).unwrap()))
        });

        let sa: CsMat<f64> = to_sprs(&a);
        let sb: CsMat<f64> = to_sprs(&b);
        group.bench_with_input(BenchmarkId::new("sprs", n), &(&sa, &sb), |bencher, (sa, sb)| {
            bencher.iter(|| black_box(*sa * *sb))
        });
    }

    group.finish();
}

fn bench_kronecker(c: &mut Criterion) {
    let mut group = c.benchmark_group("kronecker");
    group.sample_size(20);

    let config = EngineConfig::default();
    let host = HostOperators::new(config.clone());
    let device = DeviceOperators::new(CpuDevice::new(&config).unwrap());

    for &n in &[16u32, 64, 128] {
        let (a, b) = random_pair(n, 0.1);
        group.throughput(Throughput::Elements((a.nvals() * b.nvals()) as u64));

        group.bench_with_input(BenchmarkId::new("host", n), &(&a, &b), |bencher, (a, b)| {
            bencher.iter(|| black_box(host.kronecker(a, b).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("cpu-device", n), &(&a, &b), |bencher, (a, b)| {
            bencher.iter(|| black_box(device.kronecker(a, b).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_multiply, bench_kronecker);
criterion_main!(benches);
