use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use faer::{Col, Mat};
use kornia_cpd::{
    self as kcpd, matrix::points_to_mat, Nonrigid, Performance, Precision, Probabilities,
    Transform,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

// moving points are the fixed points with a smooth warp and some jitter
fn generate_warped_dataset_with_seed(num_points: usize, seed: u64) -> (Mat<f64>, Mat<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut fixed = Vec::with_capacity(num_points);
    let mut moving = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let p = [
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        ];
        fixed.push(p);
        moving.push([
            p[0] + 0.1 * (2.0 * p[1]).sin() + rng.random_range(-0.01..0.01),
            p[1] + 0.1 * (2.0 * p[2]).cos() + rng.random_range(-0.01..0.01),
            p[2] + rng.random_range(-0.01..0.01),
        ]);
    }

    (points_to_mat(&fixed), points_to_mat(&moving))
}

fn bench_affinity(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpd_affinity");
    for &n in &[64usize, 256, 1024] {
        let (_, moving) = generate_warped_dataset_with_seed(n, 42);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let g = kcpd::affinity(moving.as_ref(), moving.as_ref(), 3.0).unwrap();
                std::hint::black_box(g);
            });
        });
    }
    group.finish();
}

fn bench_compute_one(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpd_compute_one");
    for &n in &[64usize, 128, 256] {
        let (fixed, moving) = generate_warped_dataset_with_seed(n, 42);
        let probabilities = Probabilities::new(
            Col::from_fn(n, |_| 1.0),
            Col::from_fn(n, |_| 1.0),
            fixed.clone(),
            0.0,
        );
        group.throughput(Throughput::Elements(n as u64));

        let mut precision = Nonrigid::<Precision>::new();
        precision.init(fixed.as_ref(), moving.as_ref()).unwrap();
        group.bench_with_input(BenchmarkId::new("precision", n), &n, |b, _| {
            b.iter(|| {
                let step = precision
                    .compute_one(fixed.as_ref(), moving.as_ref(), &probabilities, 0.1)
                    .unwrap();
                std::hint::black_box(step);
            });
        });

        let mut performance = Nonrigid::<Performance>::new();
        performance.init(fixed.as_ref(), moving.as_ref()).unwrap();
        group.bench_with_input(BenchmarkId::new("performance", n), &n, |b, _| {
            b.iter(|| {
                let step = performance
                    .compute_one(fixed.as_ref(), moving.as_ref(), &probabilities, 0.1)
                    .unwrap();
                std::hint::black_box(step);
            });
        });
    }
    group.finish();
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpd_nonrigid");
    group.sample_size(10);
    for &n in &[64usize, 128] {
        let (fixed, moving) = generate_warped_dataset_with_seed(n, 7);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("precision", n), &n, |b, _| {
            b.iter(|| {
                let res = kcpd::nonrigid(fixed.as_ref(), moving.as_ref()).unwrap();
                std::hint::black_box(res);
            });
        });
        group.bench_with_input(BenchmarkId::new("performance", n), &n, |b, _| {
            b.iter(|| {
                let res = kcpd::nonrigid_quick(fixed.as_ref(), moving.as_ref()).unwrap();
                std::hint::black_box(res);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_affinity,
    bench_compute_one,
    bench_registration
);
criterion_main!(benches);
