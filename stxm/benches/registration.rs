//! Benchmarks for registration and stack alignment.
//! Run with: cargo bench -p stxm --bench registration

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stxm::{
    CancelFlag, FrameAligner, Image, InterpolationMethod, ProgressCallback, Registrator, Shift,
    StackAligner, WarpConfig,
};

/// Flat background with two absorbing Gaussian spots displaced by `drift`.
fn generate_frame(size: usize, drift: Shift) -> Image {
    let spots = [
        (size as f64 * 0.4, size as f64 * 0.45, size as f64 / 16.0),
        (size as f64 * 0.65, size as f64 * 0.6, size as f64 / 24.0),
    ];
    Image::from_fn(size, size, |x, y| {
        let transmission: f64 = spots
            .iter()
            .map(|&(cx, cy, sigma)| {
                let dx = x as f64 - (cx + drift.dx);
                let dy = y as f64 - (cy + drift.dy);
                1.0 - 0.6 * (-(dx * dx + dy * dy) / (2.0 * sigma * sigma)).exp()
            })
            .product();
        (1000.0 * transmission) as f32
    })
}

fn benchmark_registration_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration_sizes");
    let registrator = Registrator::default();

    for size in [64, 128, 256] {
        let reference = generate_frame(size, Shift::ZERO);
        let target = generate_frame(size, Shift::new(2.3, -1.4));

        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_function(BenchmarkId::new("estimate_shift", format!("{size}x{size}")), |b| {
            b.iter(|| {
                black_box(registrator.estimate_shift(
                    black_box(&reference),
                    black_box(&target),
                    0.05,
                ))
            })
        });
    }

    group.finish();
}

fn benchmark_warp_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("warp_methods");
    let image = generate_frame(256, Shift::ZERO);
    let shift = Shift::new(2.37, -1.61);

    for method in [
        InterpolationMethod::Nearest,
        InterpolationMethod::Bilinear,
        InterpolationMethod::Bicubic,
    ] {
        let aligner = FrameAligner::new(WarpConfig {
            method,
            ..Default::default()
        });
        group.bench_function(BenchmarkId::new("apply", format!("{method:?}")), |b| {
            b.iter(|| black_box(aligner.apply(black_box(&image), shift)))
        });
    }

    group.finish();
}

fn benchmark_stack_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_alignment");
    group.sample_size(10);

    let frames: Vec<Image> = (0..20)
        .map(|i| generate_frame(128, Shift::new(0.15 * i as f64, -0.1 * i as f64)))
        .collect();
    let aligner = StackAligner::default();

    group.bench_function("align_20x128x128", |b| {
        b.iter(|| {
            black_box(aligner.align(
                black_box(&frames),
                0.5,
                &ProgressCallback::none(),
                &CancelFlag::new(),
            ))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_registration_sizes,
    benchmark_warp_methods,
    benchmark_stack_alignment
);
criterion_main!(benches);
