use crate::error::{CompressionError, Result};
use crate::utils::{bytes_to_mb, format_file_size};
use crate::validation::validate_input_path;
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use std::path::{Path, PathBuf};

/// Header-level facts about an image file. Pixel data is never decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
    pub color: ColorType,
}

impl ImageInfo {
    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes)
    }

    pub fn megapixels(&self) -> f64 {
        (self.width as u64 * self.height as u64) as f64 / 1_000_000.0
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// Bits per channel.
    pub fn bit_depth(&self) -> u16 {
        self.color.bits_per_pixel() / u16::from(self.color.channel_count().max(1))
    }

    pub fn mode_description(&self) -> &'static str {
        match self.color {
            ColorType::L8 | ColorType::L16 => "Grayscale",
            ColorType::La8 | ColorType::La16 => "Grayscale with alpha",
            ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
            ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGB with alpha",
            _ => "Unknown",
        }
    }

    pub fn format_name(&self) -> String {
        self.format
            .map(|f| format!("{:?}", f).to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

/// Reads dimensions, colour type and detected format from the image header.
pub fn inspect_image(input_path: &Path) -> Result<ImageInfo> {
    let size_bytes = validate_input_path(input_path)?;

    let reader = ImageReader::open(input_path)?.with_guessed_format()?;
    let format = reader.format();
    let decoder = reader
        .into_decoder()
        .map_err(|e| CompressionError::invalid_image(input_path, e))?;
    let (width, height) = decoder.dimensions();

    Ok(ImageInfo {
        path: input_path.to_path_buf(),
        file_name: input_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_bytes,
        width,
        height,
        format,
        color: decoder.color_type(),
    })
}

pub fn print_image_info(info: &ImageInfo) {
    println!("📊 Image Information: {}", info.file_name);
    println!("  📁 Path: {}", info.path.display());
    println!(
        "  📦 File size: {} ({:.2} MB)",
        format_file_size(info.size_bytes),
        info.size_mb()
    );
    println!("  📏 Dimensions: {}x{} pixels", info.width, info.height);
    println!("  🔢 Megapixels: {:.2} MP", info.megapixels());
    println!("  🎭 Format: {}", info.format_name());
    println!("  🎨 Mode: {} ({:?})", info.mode_description(), info.color);
    println!("  🧮 Bit depth: {} bits per channel", info.bit_depth());
    println!("  📐 Aspect ratio: {:.2}:1", info.aspect_ratio());
}
