use crate::constants::MAX_FILE_SIZE;
use crate::error::{CompressionError, Result};
use crate::formats::is_supported_input;
use std::fs;
use std::path::Path;

/// Validate an input image path before any decoding happens.
///
/// Checks existence, that the path is a regular file, that the extension
/// is one of the supported input extensions and that the file is within the
/// size limit. Returns the file size in bytes.
pub fn validate_input_path(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Err(CompressionError::invalid_image(path, "file not found"));
    }

    if !path.is_file() {
        return Err(CompressionError::invalid_image(path, "not a regular file"));
    }

    if !is_supported_input(path) {
        return Err(CompressionError::invalid_image(
            path,
            "unsupported file extension",
        ));
    }

    let metadata = fs::metadata(path)?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(CompressionError::invalid_image(
            path,
            format!(
                "file size ({} bytes) exceeds maximum allowed size ({} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            ),
        ));
    }

    Ok(metadata.len())
}

/// Validate that a batch input root exists and is a directory
pub fn validate_input_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(CompressionError::InputDirectoryNotFound(path.to_path_buf()));
    }
    Ok(())
}
