//! Records flowing through the compression pipeline.

use crate::constants::{
    COMPRESSED_SUFFIX, DEFAULT_PNG_COMPRESSION_LEVEL, DEFAULT_QUALITY, DEFAULT_WEBP_METHOD,
    MAX_PNG_COMPRESSION_LEVEL, MAX_QUALITY, MAX_WEBP_METHOD, MIN_QUALITY,
};
use crate::error::{CompressionError, Result};
use crate::formats::{FormatRouter, OutputFormat, Route};
use crate::utils::bytes_to_mb;
use std::path::{Path, PathBuf};

/// Format-specific encoder switches. Each codec reads the fields it
/// understands and ignores the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub optimize: bool,
    pub progressive: bool,
    pub lossless: bool,
    /// WebP effort, 0 (fast) to 6 (slow, smaller)
    pub method: u8,
    /// PNG deflate level, 0 to 9
    pub compress_level: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            progressive: false,
            lossless: false,
            method: DEFAULT_WEBP_METHOD,
            compress_level: DEFAULT_PNG_COMPRESSION_LEVEL,
        }
    }
}

impl EncodeOptions {
    pub fn validate(&self) -> Result<()> {
        if self.method > MAX_WEBP_METHOD {
            return Err(CompressionError::InvalidOption {
                name: "method",
                value: self.method,
                max: MAX_WEBP_METHOD,
            });
        }
        if self.compress_level > MAX_PNG_COMPRESSION_LEVEL {
            return Err(CompressionError::InvalidOption {
                name: "compress_level",
                value: self.compress_level,
                max: MAX_PNG_COMPRESSION_LEVEL,
            });
        }
        Ok(())
    }
}

/// Bounding box an image is shrunk into before encoding. Images that
/// already fit are never enlarged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeLimits {
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
}

impl ResizeLimits {
    pub fn new(max_width: Option<u32>, max_height: Option<u32>) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_width.is_none() && self.max_height.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        for limit in [self.max_width, self.max_height].into_iter().flatten() {
            if limit == 0 {
                return Err(CompressionError::InvalidDimension(limit));
            }
        }
        Ok(())
    }

    /// Target size for a `width` x `height` image, or `None` when it
    /// already fits. Both axes shrink by the tighter of the two ratios.
    pub fn fit(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let (w, h) = (u64::from(width), u64::from(height));
        let max_w = self.max_width.map_or(w, u64::from);
        let max_h = self.max_height.map_or(h, u64::from);
        if max_w >= w && max_h >= h {
            return None;
        }

        // max_w / w <= max_h / h, compared without rounding
        let (new_w, new_h) = if max_w * h <= max_h * w {
            (max_w, h * max_w / w)
        } else {
            (w * max_h / h, max_h)
        };
        Some((new_w.max(1) as u32, new_h.max(1) as u32))
    }
}

pub fn validate_quality(quality: u8) -> Result<u8> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(CompressionError::InvalidQuality(quality));
    }
    Ok(quality)
}

/// A fully resolved single-file compression job.
#[derive(Debug, Clone)]
pub struct CompressionRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub route: Route,
    pub quality: u8,
    pub options: EncodeOptions,
    pub resize: ResizeLimits,
}

impl CompressionRequest {
    /// Builds a request, resolving the format before touching the file
    /// system. A missing output path becomes `<stem>_compressed.<ext>` next
    /// to the input.
    pub fn new(
        input: impl Into<PathBuf>,
        output: Option<PathBuf>,
        quality: Option<u8>,
        format: Option<&str>,
        options: EncodeOptions,
    ) -> Result<Self> {
        let input = input.into();
        let route = FormatRouter.resolve(format, &input)?;
        let quality = validate_quality(quality.unwrap_or(DEFAULT_QUALITY))?;
        options.validate()?;

        let output = match output {
            Some(path) => path,
            None => {
                let parent = input.parent().unwrap_or_else(|| Path::new(""));
                let ext = output_extension(&input, format.map(|_| route.format));
                parent.join(compressed_file_name(&input, &ext)?)
            }
        };

        Ok(Self {
            input,
            output,
            route,
            quality,
            options,
            resize: ResizeLimits::default(),
        })
    }

    pub fn with_resize(mut self, resize: ResizeLimits) -> Result<Self> {
        resize.validate()?;
        self.resize = resize;
        Ok(self)
    }

    pub fn format(&self) -> OutputFormat {
        self.route.format
    }
}

/// Extension for an output file: the fixed format's extension, or the
/// input's own extension when the format follows the input.
pub(crate) fn output_extension(input: &Path, fixed: Option<OutputFormat>) -> String {
    match fixed {
        Some(format) => format.extension().to_string(),
        None => input
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_else(|| OutputFormat::Jpeg.extension().to_string()),
    }
}

pub(crate) fn compressed_file_name(input: &Path, extension: &str) -> Result<String> {
    let stem = input
        .file_stem()
        .ok_or_else(|| CompressionError::invalid_image(input, "invalid file name"))?;
    Ok(format!(
        "{}{}.{}",
        stem.to_string_lossy(),
        COMPRESSED_SUFFIX,
        extension
    ))
}

/// `compressed / original`, or 0 for an empty original.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    compressed_size as f64 / original_size as f64
}

/// Outcome of one compression attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub success: bool,
    pub format: Option<OutputFormat>,
    pub quality: Option<u8>,
    pub options: Option<EncodeOptions>,
    pub original_size: u64,
    pub compressed_size: u64,
    pub error: Option<String>,
}

impl CompressionResult {
    pub fn succeeded(
        request: &CompressionRequest,
        output_path: Option<PathBuf>,
        original_size: u64,
        compressed_size: u64,
    ) -> Self {
        Self {
            input_path: request.input.clone(),
            output_path,
            success: true,
            format: Some(request.format()),
            quality: Some(request.quality),
            options: Some(request.options),
            original_size,
            compressed_size,
            error: None,
        }
    }

    pub fn failed(
        input_path: impl Into<PathBuf>,
        output_path: Option<PathBuf>,
        error: &CompressionError,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path,
            success: false,
            format: None,
            quality: None,
            options: None,
            original_size: 0,
            compressed_size: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn compression_ratio(&self) -> f64 {
        compression_ratio(self.original_size, self.compressed_size)
    }

    pub fn space_saved(&self) -> i64 {
        self.original_size as i64 - self.compressed_size as i64
    }

    pub fn space_saved_percent(&self) -> f64 {
        if !self.success {
            return 0.0;
        }
        (1.0 - self.compression_ratio()) * 100.0
    }

    pub fn original_size_mb(&self) -> f64 {
        bytes_to_mb(self.original_size)
    }

    pub fn compressed_size_mb(&self) -> f64 {
        bytes_to_mb(self.compressed_size)
    }

    pub fn space_saved_mb(&self) -> f64 {
        self.original_size_mb() - self.compressed_size_mb()
    }
}

/// One discovered file and what became of it. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub input_path: PathBuf,
    pub relative_path: PathBuf,
    pub result: CompressionResult,
}

impl BatchItem {
    pub fn success(&self) -> bool {
        self.result.success
    }
}

/// Aggregate view over a finished list of batch items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
}

impl BatchSummary {
    /// Folds over the final item list. Sizes count successful items only.
    pub fn from_items(items: &[BatchItem]) -> Self {
        items.iter().fold(Self::default(), |mut summary, item| {
            summary.total += 1;
            if item.success() {
                summary.succeeded += 1;
                summary.total_original_size += item.result.original_size;
                summary.total_compressed_size += item.result.compressed_size;
            } else {
                summary.failed += 1;
            }
            summary
        })
    }

    pub fn space_saved(&self) -> i64 {
        self.total_original_size as i64 - self.total_compressed_size as i64
    }

    pub fn savings_percent(&self) -> f64 {
        if self.total_original_size == 0 {
            return 0.0;
        }
        self.space_saved() as f64 / self.total_original_size as f64 * 100.0
    }

    pub fn total_original_mb(&self) -> f64 {
        bytes_to_mb(self.total_original_size)
    }

    pub fn total_compressed_mb(&self) -> f64 {
        bytes_to_mb(self.total_compressed_size)
    }
}
