//! Format-specific encoders.
//!
//! Every codec turns a decoded image into encoded bytes in memory. Writing
//! the bytes anywhere is left to the caller, which lets the optimizer
//! measure candidate sizes without touching the disk.

use crate::constants::{
    LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_HIGH_QUALITY_THRESHOLD, LIBDEFLATER_LOW_LEVEL,
    OXIPNG_PRESET, PNG_MAX_PALETTE_COLORS, PNG_MIN_PALETTE_COLORS, PNG_QUANTIZE_BELOW_QUALITY,
    ZOPFLI_ITERATIONS, ZOPFLI_QUALITY_THRESHOLD,
};
use crate::error::{CompressionError, Result};
use crate::formats::OutputFormat;
use crate::model::EncodeOptions;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, RgbImage, RgbaImage};
use mozjpeg::{ColorSpace, Compress};
use oxipng::Deflaters;
use std::any::Any;
use std::num::NonZeroU8;
use std::panic::{self, AssertUnwindSafe};

pub trait Codec: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn default_options(&self) -> EncodeOptions {
        EncodeOptions::default()
    }

    /// Encodes `image` at `quality` (1-100) and returns the encoded bytes.
    fn encode(&self, image: &DynamicImage, quality: u8, options: &EncodeOptions)
        -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JpegCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebpCodec;

impl Codec for JpegCodec {
    fn format(&self) -> OutputFormat {
        OutputFormat::Jpeg
    }

    fn encode(
        &self,
        image: &DynamicImage,
        quality: u8,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>> {
        let rgb = flatten_onto_white(image);
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let progressive = options.progressive;
        let optimize = options.optimize;

        // libjpeg reports fatal errors by unwinding
        let encoded = panic::catch_unwind(AssertUnwindSafe(|| -> std::io::Result<Vec<u8>> {
            let mut comp = Compress::new(ColorSpace::JCS_RGB);
            if !progressive {
                // the default profile turns on progressive scans
                comp.set_fastest_defaults();
            }
            comp.set_size(width, height);
            comp.set_quality(f32::from(quality));
            if progressive {
                comp.set_progressive_mode();
            }
            comp.set_optimize_coding(optimize);

            let mut dest = Vec::new();
            let mut writer = comp.start_compress(&mut dest)?;
            writer.write_scanlines(rgb.as_raw())?;
            writer.finish()?;
            Ok(dest)
        }));

        match encoded {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(CompressionError::encode_failure(OutputFormat::Jpeg, e)),
            Err(payload) => Err(CompressionError::encode_failure(
                OutputFormat::Jpeg,
                panic_message(payload.as_ref()),
            )),
        }
    }
}

impl Codec for PngCodec {
    fn format(&self) -> OutputFormat {
        OutputFormat::Png
    }

    fn encode(
        &self,
        image: &DynamicImage,
        quality: u8,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>> {
        let reduced;
        let source = if quality < PNG_QUANTIZE_BELOW_QUALITY && image.color().has_color() {
            reduced = DynamicImage::ImageRgba8(quantize(image, palette_size(quality))?);
            &reduced
        } else {
            image
        };

        let compression = match options.compress_level {
            0..=3 => CompressionType::Fast,
            4..=6 => CompressionType::Default,
            _ => CompressionType::Best,
        };
        let mut buffer = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut buffer, compression, FilterType::Adaptive);
        source
            .write_with_encoder(encoder)
            .map_err(|e| CompressionError::encode_failure(OutputFormat::Png, e))?;

        if !options.optimize {
            return Ok(buffer);
        }

        let mut oxipng_options = oxipng::Options::from_preset(OXIPNG_PRESET);
        oxipng_options.deflate = deflater_for(quality);
        oxipng::optimize_from_memory(&buffer, &oxipng_options)
            .map_err(|e| CompressionError::encode_failure(OutputFormat::Png, e))
    }
}

impl Codec for WebpCodec {
    fn format(&self) -> OutputFormat {
        OutputFormat::WebP
    }

    fn encode(
        &self,
        image: &DynamicImage,
        quality: u8,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>> {
        let mut config = webp::WebPConfig::new().map_err(|_| {
            CompressionError::encode_failure(OutputFormat::WebP, "cannot initialise encoder")
        })?;
        config.lossless = i32::from(options.lossless);
        config.quality = f32::from(quality);
        config.method = i32::from(options.method);

        let encoded = if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode_advanced(&config)
        } else {
            let rgb = image.to_rgb8();
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height())
                .encode_advanced(&config)
        };
        let memory = encoded
            .map_err(|e| CompressionError::encode_failure(OutputFormat::WebP, format!("{:?}", e)))?;

        Ok(memory.to_vec())
    }
}

/// Text of a panic payload, for error messages.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Composites any alpha channel over a white background.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }

    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
        let alpha = u32::from(src.0[3]);
        for channel in 0..3 {
            let value = u32::from(src.0[channel]) * alpha + 255 * (255 - alpha);
            dst.0[channel] = ((value + 127) / 255) as u8;
        }
    }
    rgb
}

fn palette_size(quality: u8) -> u32 {
    (PNG_MAX_PALETTE_COLORS * u32::from(quality) / 100).max(PNG_MIN_PALETTE_COLORS)
}

fn quantize(image: &DynamicImage, colors: u32) -> Result<RgbaImage> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let quant_error = |e: imagequant::Error| CompressionError::encode_failure(OutputFormat::Png, e);

    let pixels: Vec<imagequant::RGBA> = rgba
        .pixels()
        .map(|p| imagequant::RGBA::new(p.0[0], p.0[1], p.0[2], p.0[3]))
        .collect();

    let mut attributes = imagequant::Attributes::new();
    attributes.set_max_colors(colors).map_err(quant_error)?;
    let mut liq_image = imagequant::Image::new(
        &attributes,
        pixels,
        width as usize,
        height as usize,
        0.0,
    )
    .map_err(quant_error)?;
    let mut quantized = attributes.quantize(&mut liq_image).map_err(quant_error)?;
    quantized.set_dithering_level(1.0).map_err(quant_error)?;
    let (palette, indices) = quantized.remapped(&mut liq_image).map_err(quant_error)?;

    let mut expanded = Vec::with_capacity(indices.len() * 4);
    for index in indices {
        let color = palette[usize::from(index)];
        expanded.extend_from_slice(&[color.r, color.g, color.b, color.a]);
    }

    RgbaImage::from_raw(width, height, expanded).ok_or_else(|| {
        CompressionError::encode_failure(OutputFormat::Png, "palette expansion size mismatch")
    })
}

fn deflater_for(quality: u8) -> Deflaters {
    if quality >= ZOPFLI_QUALITY_THRESHOLD {
        if let Some(iterations) = NonZeroU8::new(ZOPFLI_ITERATIONS) {
            return Deflaters::Zopfli { iterations };
        }
    }
    let compression = if quality >= LIBDEFLATER_HIGH_QUALITY_THRESHOLD {
        LIBDEFLATER_HIGH_LEVEL
    } else {
        LIBDEFLATER_LOW_LEVEL
    };
    Deflaters::Libdeflater { compression }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn noisy_image(width: u32, height: u32) -> DynamicImage {
        let mut seed: u32 = 0x1234_5678;
        let img = RgbImage::from_fn(width, height, |x, y| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (seed >> 24) as u8;
            image::Rgb([(x * 3) as u8 ^ noise, (y * 5) as u8, noise])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_jpeg_encode_produces_decodable_jpeg() {
        let img = noisy_image(64, 48);
        let bytes = JpegCodec.encode(&img, 80, &EncodeOptions::default()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn test_jpeg_lower_quality_is_smaller() {
        let img = noisy_image(128, 128);
        let options = EncodeOptions::default();
        let high = JpegCodec.encode(&img, 95, &options).unwrap();
        let low = JpegCodec.encode(&img, 20, &options).unwrap();
        assert!(low.len() < high.len());
    }

    fn has_marker(bytes: &[u8], marker: u8) -> bool {
        bytes.windows(2).any(|pair| pair == [0xFF, marker])
    }

    #[test]
    fn test_jpeg_progressive_writes_sof2() {
        let img = noisy_image(64, 64);
        let baseline = EncodeOptions {
            optimize: false,
            progressive: false,
            ..EncodeOptions::default()
        };
        let progressive = EncodeOptions {
            optimize: true,
            progressive: true,
            ..EncodeOptions::default()
        };

        let plain = JpegCodec.encode(&img, 80, &baseline).unwrap();
        let prog = JpegCodec.encode(&img, 80, &progressive).unwrap();

        assert_ne!(plain, prog);
        assert!(has_marker(&plain, 0xC0));
        assert!(!has_marker(&plain, 0xC2));
        assert!(has_marker(&prog, 0xC2));
        assert_eq!(image::load_from_memory(&prog).unwrap().dimensions(), (64, 64));
    }

    #[test]
    fn test_jpeg_optimize_changes_huffman_tables() {
        let img = noisy_image(64, 64);
        let standard = EncodeOptions {
            optimize: false,
            ..EncodeOptions::default()
        };
        let optimized = EncodeOptions {
            optimize: true,
            ..EncodeOptions::default()
        };

        let standard = JpegCodec.encode(&img, 80, &standard).unwrap();
        let optimized = JpegCodec.encode(&img, 80, &optimized).unwrap();

        assert_ne!(standard, optimized);
        assert!(optimized.len() <= standard.len());
        assert!(!has_marker(&optimized, 0xC2));
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("bad scanline")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "bad scanline");

        let payload = panic::catch_unwind(|| panic!("row {}", 7)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "row 7");
    }

    #[test]
    fn test_flatten_onto_white() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let rgb = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_png_encode_without_optimize() {
        let img = noisy_image(32, 32);
        let options = EncodeOptions {
            optimize: false,
            ..EncodeOptions::default()
        };
        let bytes = PngCodec.encode(&img, 95, &options).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (32, 32));
    }

    #[test]
    fn test_png_quantized_and_optimized() {
        let img = noisy_image(32, 32);
        let bytes = PngCodec.encode(&img, 50, &EncodeOptions::default()).unwrap();
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (32, 32));
    }

    #[test]
    fn test_palette_size() {
        assert_eq!(palette_size(100), 256);
        assert_eq!(palette_size(50), 128);
        assert_eq!(palette_size(1), 16);
    }

    #[test]
    fn test_deflater_for_quality() {
        assert!(matches!(deflater_for(95), Deflaters::Zopfli { .. }));
        assert!(matches!(
            deflater_for(75),
            Deflaters::Libdeflater { compression: 12 }
        ));
        assert!(matches!(
            deflater_for(30),
            Deflaters::Libdeflater { compression: 8 }
        ));
    }

    #[test]
    fn test_webp_encode_lossy_and_lossless() {
        let img = noisy_image(40, 30);
        let lossy = WebpCodec.encode(&img, 75, &EncodeOptions::default()).unwrap();
        assert_eq!(&lossy[..4], b"RIFF");
        assert_eq!(&lossy[8..12], b"WEBP");

        let options = EncodeOptions {
            lossless: true,
            ..EncodeOptions::default()
        };
        let lossless = WebpCodec.encode(&img, 75, &options).unwrap();
        assert_eq!(&lossless[8..12], b"WEBP");
    }
}
