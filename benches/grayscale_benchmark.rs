use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use graybatch::processing::{grayscale_parallel, grayscale_sequential};
use image::{Rgb, RgbImage};

fn gradient(side: u32) -> RgbImage {
    RgbImage::from_fn(side, side, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn benchmark_grayscale(c: &mut Criterion) {
    let mut group = c.benchmark_group("grayscale");
    group.sample_size(20);

    for side in [256u32, 1024, 2048] {
        let image = gradient(side);

        group.bench_with_input(BenchmarkId::new("sequential", side), &image, |b, img| {
            b.iter(|| grayscale_sequential(black_box(img)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", side), &image, |b, img| {
            b.iter(|| grayscale_parallel(black_box(img)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_grayscale);
criterion_main!(benches);
