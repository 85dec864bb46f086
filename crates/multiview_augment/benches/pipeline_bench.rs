use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{DynamicImage, Rgb, RgbImage};
use multiview_augment::{
    build_pipeline, init_worker_rng, transforms::vision::GaussianBlur, MultiViewInjector,
    Pipeline, Stage, Transform,
};

/// Benchmarks for stage pipelines and multi-view injection.
///
/// This measures:
/// 1. Per-stage cost of producing one 224x224 view from a 500x375 image
/// 2. The 23-tap Gaussian blur on its own (the most expensive train step)
/// 3. Multi-view injection as the number of views grows
///
/// To run these, use:
/// ```bash
/// cargo bench
/// ```

const RESIZE: u32 = 224;

fn make_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

/// One view per stage
fn bench_stages(c: &mut Criterion) {
    init_worker_rng(0, 0, 42);
    let mut group = c.benchmark_group("Stage Pipelines");
    let image = make_image(500, 375);

    for stage in Stage::ALL {
        let pipeline = build_pipeline(stage.as_str(), RESIZE, 1.0, 0.2).unwrap();
        group.bench_with_input(BenchmarkId::new("view", stage), &image, |b, img| {
            b.iter(|| black_box(pipeline.apply(img.clone()).unwrap()))
        });
    }
    group.finish();
}

/// Blur alone across image sizes
fn bench_blur(c: &mut Criterion) {
    init_worker_rng(0, 0, 42);
    let mut group = c.benchmark_group("Gaussian Blur");
    let blur = GaussianBlur::with_kernel_size(23).unwrap();

    for side in [64u32, 128, 224] {
        let image = make_image(side, side);
        group.throughput(Throughput::Elements((side * side) as u64));
        group.bench_with_input(BenchmarkId::new("k23", side), &image, |b, img| {
            b.iter(|| black_box(blur.apply(img.clone()).unwrap()))
        });
    }
    group.finish();
}

/// Train views stacked by the injector
fn bench_multiview(c: &mut Criterion) {
    init_worker_rng(0, 0, 42);
    let mut group = c.benchmark_group("Multi-View");
    let image = make_image(500, 375);

    for views in [1usize, 2, 4] {
        let pipelines = (0..views)
            .map(|_| build_pipeline("train", RESIZE, 1.0, 0.2))
            .collect::<anyhow::Result<Vec<Pipeline>>>()
            .unwrap();
        let injector = MultiViewInjector::new(pipelines).unwrap();

        group.throughput(Throughput::Elements(views as u64));
        group.bench_with_input(BenchmarkId::new("train", views), &image, |b, img| {
            b.iter(|| black_box(injector.apply(img.clone()).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_stages, bench_blur, bench_multiview);
criterion_main!(benches);
