use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image file {path:?}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    #[error("Unsupported format: {0}. Supported output formats: jpeg, png, webp")]
    UnsupportedFormat(String),

    #[error("{format} encoding failed: {reason}")]
    EncodeFailure { format: String, reason: String },

    #[error(
        "Cannot reach target size {target_mb} MB with quality range {min_quality}-{max_quality}"
    )]
    TargetUnreachable {
        target_mb: f64,
        min_quality: u8,
        max_quality: u8,
    },

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("Invalid quality range: {0}-{1}. Bounds must satisfy 1 <= min <= max <= 100")]
    InvalidQualityRange(u8, u8),

    #[error("Invalid target size: {0} MB. Must be a positive number")]
    InvalidTargetSize(f64),

    #[error("Invalid option {name}: {value}. Must be between 0 and {max}")]
    InvalidOption {
        name: &'static str,
        value: u8,
        max: u8,
    },

    #[error("Invalid maximum dimension: {0}. Must be at least 1 pixel")]
    InvalidDimension(u32),

    #[error("Input directory does not exist: {0}")]
    InputDirectoryNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("Output path {0:?} is already claimed by another input")]
    OutputConflict(PathBuf),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Processing panicked: {0}")]
    Panicked(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Failed to write JSON report: {0}")]
    Report(#[from] serde_json::Error),
}

impl CompressionError {
    pub(crate) fn invalid_image(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CompressionError::InvalidImage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode_failure(format: impl ToString, reason: impl ToString) -> Self {
        CompressionError::EncodeFailure {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
