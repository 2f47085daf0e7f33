pub const DEFAULT_QUALITY: u8 = 85;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

pub const DEFAULT_OPTIMIZER_MIN_QUALITY: u8 = 10;
pub const DEFAULT_OPTIMIZER_MAX_QUALITY: u8 = 95;

pub const DEFAULT_WEBP_METHOD: u8 = 4;
pub const MAX_WEBP_METHOD: u8 = 6;

pub const DEFAULT_PNG_COMPRESSION_LEVEL: u8 = 6;
pub const MAX_PNG_COMPRESSION_LEVEL: u8 = 9;

/// Below this quality PNG output goes through palette reduction.
pub const PNG_QUANTIZE_BELOW_QUALITY: u8 = 90;
pub const PNG_MIN_PALETTE_COLORS: u32 = 16;
pub const PNG_MAX_PALETTE_COLORS: u32 = 256;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const ZOPFLI_QUALITY_THRESHOLD: u8 = 90;
pub const LIBDEFLATER_HIGH_QUALITY_THRESHOLD: u8 = 70;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const OXIPNG_PRESET: u8 = 4;

pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 20_000;

pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub const COMPRESSED_SUFFIX: &str = "_compressed";
/// Batch output directory, relative to the input directory, when none is given.
pub const DEFAULT_BATCH_OUTPUT_DIR: &str = "compressed";

/// Extensions accepted as batch and single-file input (lowercase).
pub const SUPPORTED_INPUT_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
