use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::{DynamicImage, Rgb, RgbImage};
use pixpress::{search_quality, CancelToken, Codec, EncodeOptions, JpegCodec, PngCodec, WebpCodec};

fn create_test_image(width: u32, height: u32) -> DynamicImage {
    let mut state = 0x9e37_79b9u32;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let noise = (state >> 26) as u8;
        Rgb([
            (x % 256) as u8 ^ noise,
            (y % 256) as u8,
            ((x + y) % 256) as u8,
        ])
    }))
}

fn bench_search_quality(c: &mut Criterion) {
    let cancel = CancelToken::new();
    c.bench_function("search_quality_mocked", |b| {
        b.iter(|| {
            search_quality(10, 95, black_box(1.0), &cancel, |q| {
                Ok((u64::from(q) * 15_000, ()))
            })
        })
    });
}

fn bench_codecs(c: &mut Criterion) {
    let img = create_test_image(640, 480);
    let options = EncodeOptions::default();
    let codecs: [(&str, &dyn Codec); 3] = [
        ("jpeg", &JpegCodec),
        ("png", &PngCodec),
        ("webp", &WebpCodec),
    ];

    let mut group = c.benchmark_group("encode_640x480");
    group.sample_size(10);
    for (name, codec) in codecs {
        for quality in [50u8, 85] {
            group.bench_with_input(
                BenchmarkId::new(name, quality),
                &quality,
                |b, &quality| b.iter(|| codec.encode(black_box(&img), quality, &options)),
            );
        }
    }
    group.finish();
}

fn bench_optimize_jpeg(c: &mut Criterion) {
    let img = create_test_image(640, 480);
    let options = EncodeOptions::default();
    let cancel = CancelToken::new();

    let mut group = c.benchmark_group("optimize");
    group.sample_size(10);
    group.bench_function("jpeg_to_100k", |b| {
        b.iter(|| {
            search_quality(10, 95, 0.1, &cancel, |q| {
                let bytes = JpegCodec.encode(&img, q, &options)?;
                Ok((bytes.len() as u64, ()))
            })
        })
    });
    group.finish();
}

criterion_group!(benches, bench_search_quality, bench_codecs, bench_optimize_jpeg);
criterion_main!(benches);
