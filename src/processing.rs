use crate::cancel::CancelToken;
use crate::constants::MAX_IMAGE_DIMENSION;
use crate::error::{CompressionError, Result};
use crate::formats::FormatRouter;
use crate::model::{CompressionRequest, CompressionResult, ResizeLimits};
use crate::validation::validate_input_path;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Caller-constructed context threaded through every compression call.
///
/// Holds the format router and the cancellation token observed by the
/// optimizer and the batch orchestrator. Cloning is cheap and clones share
/// the same token.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    router: FormatRouter,
    cancel: CancelToken,
}

impl Compressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(cancel: CancelToken) -> Self {
        Self {
            router: FormatRouter,
            cancel,
        }
    }

    pub fn router(&self) -> &FormatRouter {
        &self.router
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Compresses one file and writes the result to `request.output`.
    ///
    /// # Returns
    /// * `Ok(CompressionResult)` - sizes measured from the input file and
    ///   the encoded bytes
    /// * `Err(CompressionError)` - any failure; nothing is recovered here
    pub fn compress(&self, request: &CompressionRequest) -> Result<CompressionResult> {
        let (img, original_size) = load_image(&request.input)?;
        let img = resize_to_fit(img, &request.resize);
        debug!(
            input = %request.input.display(),
            format = %request.format(),
            quality = request.quality,
            "encoding"
        );

        let encoded = request
            .route
            .codec
            .encode(&img, request.quality, &request.options)?;
        write_output(&request.output, &encoded)?;

        Ok(CompressionResult::succeeded(
            request,
            Some(request.output.clone()),
            original_size,
            encoded.len() as u64,
        ))
    }
}

/// Loads an image file and returns it along with its size in bytes.
///
/// # Security Features
/// - Validates existence, file type, extension and size before decoding
/// - Guesses the format from content, so a mislabelled file still decodes
///   and a non-image file fails cleanly
/// - Rejects images beyond the maximum dimension
pub fn load_image(input_path: &Path) -> Result<(DynamicImage, u64)> {
    let file_size = validate_input_path(input_path)?;

    let img = ImageReader::open(input_path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| CompressionError::invalid_image(input_path, e))?;

    let (width, height) = img.dimensions();
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(CompressionError::invalid_image(
            input_path,
            format!(
                "dimensions {}x{} exceed maximum {}x{}",
                width, height, MAX_IMAGE_DIMENSION, MAX_IMAGE_DIMENSION
            ),
        ));
    }

    Ok((img, file_size))
}

/// Shrinks `img` into `limits` with Lanczos3, keeping its aspect ratio.
/// Images that already fit are returned untouched.
pub fn resize_to_fit(img: DynamicImage, limits: &ResizeLimits) -> DynamicImage {
    if limits.is_unbounded() {
        return img;
    }
    match limits.fit(img.width(), img.height()) {
        Some((width, height)) => {
            debug!(
                width = img.width(),
                height = img.height(),
                new_width = width,
                new_height = height,
                "resizing"
            );
            img.resize_exact(width, height, FilterType::Lanczos3)
        }
        None => img,
    }
}

/// Writes encoded bytes through a temporary file in the destination
/// directory, so a failed write never leaves a truncated output behind.
pub fn write_output(output: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .map_err(|_| CompressionError::DirectoryCreationFailed(parent.to_path_buf()))?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.persist(output).map_err(|e| CompressionError::Io(e.error))?;
    Ok(())
}
