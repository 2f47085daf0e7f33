mod common;

use common::*;
use pixpress::{
    BatchOptions, CompressionError, CompressionRequest, Compressor, EncodeOptions,
    OptimizeRequest, OutputFormat,
};
use std::fs;
use std::path::PathBuf;

#[test]
fn test_compress_jpeg_at_quality_80() {
    let temp_dir = create_temp_directory();
    let input = create_test_jpeg(temp_dir.path(), "photo.jpg", 800, 600);

    let request =
        CompressionRequest::new(&input, None, Some(80), None, EncodeOptions::default()).unwrap();
    let result = Compressor::new().compress(&request).unwrap();

    let output = temp_dir.path().join("photo_compressed.jpg");
    assert!(output.exists());
    assert_eq!(result.output_path, Some(output));
    assert!(result.compressed_size_mb() < result.original_size_mb());
    assert_eq!(result.format.map(|f| f.to_string()).as_deref(), Some("JPEG"));
    assert_eq!(
        result.compression_ratio(),
        result.compressed_size as f64 / result.original_size as f64
    );
}

#[test]
fn test_convert_to_every_format() {
    let temp_dir = create_temp_directory();
    let input = create_test_png(temp_dir.path(), "art.png", 120, 80);

    for format in OutputFormat::all_formats() {
        let request = CompressionRequest::new(
            &input,
            None,
            Some(70),
            Some(format.name()),
            EncodeOptions::default(),
        )
        .unwrap();
        let result = Compressor::new().compress(&request).unwrap();

        let output = result.output_path.clone().unwrap();
        assert_eq!(
            output.file_name().unwrap().to_string_lossy(),
            format!("art_compressed.{}", format.extension())
        );
        assert_eq!(fs::metadata(&output).unwrap().len(), result.compressed_size);
        assert_eq!(result.format, Some(format));
    }
}

#[test]
fn test_bmp_output_rejected_before_encoding() {
    let temp_dir = create_temp_directory();
    let input = create_test_jpeg(temp_dir.path(), "photo.jpg", 64, 64);

    let result =
        CompressionRequest::new(&input, None, Some(80), Some("bmp"), EncodeOptions::default());
    assert!(matches!(result, Err(CompressionError::UnsupportedFormat(_))));
    assert!(!temp_dir.path().join("photo_compressed.bmp").exists());
}

#[test]
fn test_batch_with_one_fake_jpeg() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("photos");
    for name in ["a.jpg", "b.jpg", "c.jpg"] {
        create_test_jpeg(&input_dir, name, 160, 120);
    }
    create_fake_image(&input_dir, "broken.jpg");
    fs::write(input_dir.join("readme.txt"), b"ignored").unwrap();

    let output_dir = temp_dir.path().join("out");
    let report = Compressor::new()
        .compress_batch(&input_dir, &output_dir, &BatchOptions::default())
        .unwrap();

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.succeeded, 3);
    assert_eq!(report.summary.failed, 1);
    assert!(!report.all_failed());

    let failed: Vec<_> = report.items.iter().filter(|item| !item.success()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].relative_path, PathBuf::from("broken.jpg"));
    assert!(failed[0].result.error.is_some());
    assert_eq!(failed[0].result.compressed_size, 0);

    let succeeded_sizes: u64 = report
        .items
        .iter()
        .filter(|item| item.success())
        .map(|item| item.result.original_size)
        .sum();
    assert_eq!(report.summary.total_original_size, succeeded_sizes);
}

#[test]
fn test_batch_all_failed() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("in");
    fs::create_dir(&input_dir).unwrap();
    create_fake_image(&input_dir, "x.png");
    create_fake_image(&input_dir, "y.webp");

    let report = Compressor::new()
        .compress_batch(&input_dir, &temp_dir.path().join("out"), &BatchOptions::default())
        .unwrap();
    assert!(report.all_failed());
    assert_eq!(report.summary.failed, 2);
}

#[test]
fn test_batch_empty_directory() {
    let temp_dir = create_temp_directory();
    let report = Compressor::new()
        .compress_batch(
            temp_dir.path(),
            &temp_dir.path().join("out"),
            &BatchOptions::default(),
        )
        .unwrap();
    assert!(report.items.is_empty());
    assert_eq!(report.summary.total, 0);
    assert!(!report.all_failed());
}

#[test]
fn test_recursive_batch_structure_is_stable() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("in");
    create_test_jpeg(&input_dir, "top.jpg", 64, 48);
    create_test_png(&input_dir.join("2024/summer"), "beach.png", 40, 30);
    create_test_jpeg(&input_dir.join("2024"), "city.jpeg", 64, 48);
    create_test_png(&input_dir.join(".cache"), "thumb.png", 8, 8);

    let options = BatchOptions::new(Some(75), Some("webp"), true).unwrap();
    let compressor = Compressor::new();

    let first_out = temp_dir.path().join("first");
    let second_out = temp_dir.path().join("second");
    compressor
        .compress_batch(&input_dir, &first_out, &options)
        .unwrap();
    compressor
        .compress_batch(&input_dir, &second_out, &options)
        .unwrap();

    let expected = vec![
        PathBuf::from("2024/city_compressed.webp"),
        PathBuf::from("2024/summer/beach_compressed.webp"),
        PathBuf::from("top_compressed.webp"),
    ];
    assert_eq!(relative_files(&first_out), expected);
    assert_eq!(relative_files(&second_out), expected);
}

#[test]
fn test_batch_output_inside_input_is_not_rescanned() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path();
    create_test_jpeg(input_dir, "one.jpg", 64, 48);
    let output_dir = input_dir.join("compressed");

    let options = BatchOptions::new(None, None, true).unwrap();
    let compressor = Compressor::new();
    let first = compressor
        .compress_batch(input_dir, &output_dir, &options)
        .unwrap();
    let second = compressor
        .compress_batch(input_dir, &output_dir, &options)
        .unwrap();

    assert_eq!(first.summary.total, 1);
    assert_eq!(second.summary.total, 1);
    assert_eq!(
        relative_files(&output_dir),
        vec![PathBuf::from("one_compressed.jpg")]
    );
}

#[test]
fn test_optimize_real_image_fits_target() {
    let temp_dir = create_temp_directory();
    let input = create_test_jpeg(temp_dir.path(), "photo.jpg", 800, 600);
    let original = fs::metadata(&input).unwrap().len();
    let target_mb = original as f64 / 2.0 / (1024.0 * 1024.0);

    let output = temp_dir.path().join("fitted.jpg");
    let request = OptimizeRequest::new(&input, target_mb).output(&output);
    let outcome = Compressor::new().optimize_quality(&request).unwrap();

    assert!((10..=95).contains(&outcome.quality));
    assert!(outcome.result.compressed_size_mb() <= target_mb);
    assert_eq!(
        fs::metadata(&output).unwrap().len(),
        outcome.result.compressed_size
    );
    assert!(outcome
        .probes
        .iter()
        .any(|&(quality, _)| quality == outcome.quality));
}

#[test]
fn test_optimize_measure_only_writes_nothing() {
    let temp_dir = create_temp_directory();
    let input = create_test_jpeg(temp_dir.path(), "photo.jpg", 200, 150);

    let request = OptimizeRequest::new(&input, 10.0).format("webp");
    let outcome = Compressor::new().optimize_quality(&request).unwrap();

    assert_eq!(outcome.quality, 95);
    assert!(outcome.result.output_path.is_none());
    assert_eq!(outcome.result.format, Some(OutputFormat::WebP));
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn test_optimize_unreachable_target() {
    let temp_dir = create_temp_directory();
    let input = create_test_jpeg(temp_dir.path(), "photo.jpg", 400, 300);

    let request = OptimizeRequest::new(&input, 0.000_01);
    let result = Compressor::new().optimize_quality(&request);
    assert!(matches!(
        result,
        Err(CompressionError::TargetUnreachable { .. })
    ));
}

#[test]
fn test_batch_target_size_mode() {
    let temp_dir = create_temp_directory();
    let input_dir = temp_dir.path().join("in");
    create_test_jpeg(&input_dir, "a.jpg", 320, 240);
    create_test_jpeg(&input_dir, "b.jpg", 320, 240);

    let options = BatchOptions {
        target_size_mb: Some(1.0),
        ..BatchOptions::default()
    };
    let report = Compressor::new()
        .compress_batch(&input_dir, &temp_dir.path().join("out"), &options)
        .unwrap();

    assert_eq!(report.summary.succeeded, 2);
    for item in &report.items {
        assert_eq!(item.result.quality, Some(95));
        assert!(item.result.output_path.as_ref().unwrap().exists());
    }
}
