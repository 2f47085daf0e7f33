pub mod batch;
pub mod cancel;
pub mod cli;
pub mod codec;
pub mod constants;
pub mod error;
pub mod formats;
pub mod info;
pub mod logger;
pub mod model;
pub mod optimizer;
pub mod processing;
pub mod report;
pub mod utils;
pub mod validation;

pub use batch::{collect_image_files, generate_output_path, BatchOptions, BatchReport};
pub use cancel::CancelToken;
pub use codec::{Codec, JpegCodec, PngCodec, WebpCodec};
pub use error::{CompressionError, Result};
pub use formats::{is_supported_input, FormatRouter, OutputFormat, Route};
pub use info::{inspect_image, print_image_info, ImageInfo};
pub use logger::init_logging;
pub use model::{
    compression_ratio, BatchItem, BatchSummary, CompressionRequest, CompressionResult,
    EncodeOptions, ResizeLimits,
};
pub use optimizer::{
    search_quality, Candidate, OptimizationOutcome, OptimizeRequest, SearchOutcome,
};
pub use processing::{load_image, resize_to_fit, write_output, Compressor};
pub use report::{build_report, write_json_report, ReportRecord};
pub use utils::{bytes_to_mb, format_file_size, mb_to_bytes};
pub use validation::{validate_input_dir, validate_input_path};
