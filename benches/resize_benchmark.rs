use std::hint::black_box;
use std::path::Path;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, ImageBuffer, Rgb};
use imgcompress::parallel::WorkDistributor;
use imgcompress::processing::{resolve, FilterType, ImageCodec, ImageCrateCodec, PixelLayout};
use imgcompress::ResizeRequest;

fn benchmark_resolve(c: &mut Criterion) {
    let requests = [
        ("percentage", ResizeRequest::new().percentage(37)),
        ("width", ResizeRequest::new().width(1280)),
        ("height", ResizeRequest::new().height(720)),
    ];

    let mut group = c.benchmark_group("resolve");
    for (name, request) in requests {
        group.bench_function(name, |b| {
            b.iter(|| resolve(black_box(4032), black_box(3024), &request))
        });
    }
    group.finish();
}

fn benchmark_distributor(c: &mut Criterion) {
    c.bench_function("claim_10k", |b| {
        b.iter(|| {
            let distributor = WorkDistributor::new(10_000);
            let mut claimed = 0;
            while distributor.claim_next().is_some() {
                claimed += 1;
            }
            black_box(claimed)
        })
    });
}

fn benchmark_resample(c: &mut Criterion) {
    let source = DynamicImage::ImageRgb8(ImageBuffer::from_fn(1024, 768, |x, y| {
        Rgb([(x % 255) as u8, (y % 255) as u8, 128])
    }));
    let target = resolve(1024, 768, &ResizeRequest::new().percentage(50)).unwrap();

    let mut group = c.benchmark_group("resample_1024x768_half");
    group.sample_size(20);
    for (name, filter) in [
        ("nearest", FilterType::Nearest),
        ("triangle", FilterType::Triangle),
        ("lanczos3", FilterType::Lanczos3),
    ] {
        let codec = ImageCrateCodec::with_filter(filter);
        group.bench_with_input(BenchmarkId::from_parameter(name), &source, |b, image| {
            b.iter(|| {
                codec
                    .resize(Path::new("bench.png"), image, target, PixelLayout::Rgb)
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_resolve, benchmark_distributor, benchmark_resample);
criterion_main!(benches);
