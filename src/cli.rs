use crate::constants::{
    DEFAULT_OPTIMIZER_MAX_QUALITY, DEFAULT_OPTIMIZER_MIN_QUALITY, DEFAULT_PNG_COMPRESSION_LEVEL,
    DEFAULT_QUALITY, DEFAULT_WEBP_METHOD,
};
use crate::model::{EncodeOptions, ResizeLimits};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pixpress",
    about = "Compress images to a quality or to a target file size",
    long_about = "pixpress compresses JPEG, PNG and WebP images one at a time or across whole \
                  directory trees. It can also search for the highest quality that keeps an \
                  image under a target file size.",
    version,
    after_help = "EXAMPLES:\n  \
    pixpress compress photo.jpg -q 80\n  \
    pixpress compress scan.png -f webp -o scan.webp\n  \
    pixpress batch ./images -r -q 75 --json-output report.json\n  \
    pixpress optimize photo.jpg -s 1.0 -o photo_small.jpg\n  \
    pixpress info photo.png"
)]
pub struct Args {
    #[arg(short, long, global = true, help = "Show debug output and per-item failures")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only print errors and final results"
    )]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Encoder switches shared by `compress` and `batch`.
#[derive(ClapArgs, Debug, Clone)]
pub struct EncodeArgs {
    #[arg(
        long,
        overrides_with = "no_optimize",
        help = "Enable encoder optimization (default)"
    )]
    pub optimize: bool,

    #[arg(
        long = "no-optimize",
        overrides_with = "optimize",
        help = "Disable encoder optimization",
        long_help = "Disable encoder optimization. For PNG this skips the oxipng pass and \
                     uses the plain encoder with --compress-level."
    )]
    pub no_optimize: bool,

    #[arg(long, help = "Request progressive JPEG encoding")]
    pub progressive: bool,

    #[arg(long, help = "Use lossless WebP encoding")]
    pub lossless: bool,

    #[arg(
        long,
        default_value_t = DEFAULT_WEBP_METHOD,
        help = "WebP compression method (0-6)",
        long_help = "WebP effort from 0 (fastest) to 6 (slowest, smallest output)."
    )]
    pub method: u8,

    #[arg(
        long,
        default_value_t = DEFAULT_PNG_COMPRESSION_LEVEL,
        help = "PNG compression level (0-9)"
    )]
    pub compress_level: u8,
}

impl EncodeArgs {
    pub fn to_options(&self) -> EncodeOptions {
        EncodeOptions {
            optimize: !self.no_optimize,
            progressive: self.progressive,
            lossless: self.lossless,
            method: self.method,
            compress_level: self.compress_level,
        }
    }
}

/// Bounding box shared by `compress`, `batch` and `optimize`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ResizeArgs {
    #[arg(
        long,
        help = "Shrink images wider than this many pixels",
        long_help = "Maximum output width in pixels. Larger images are scaled down with \
                     Lanczos3, keeping their aspect ratio; smaller ones are never enlarged."
    )]
    pub max_width: Option<u32>,

    #[arg(long, help = "Shrink images taller than this many pixels")]
    pub max_height: Option<u32>,
}

impl ResizeArgs {
    pub fn to_limits(&self) -> ResizeLimits {
        ResizeLimits::new(self.max_width, self.max_height)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Compress a single image file",
        long_about = "Compress a single image file at a fixed quality. Without -o the output is \
                      written next to the input as <name>_compressed.<ext>."
    )]
    Compress {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(short, long, help = "Output image file path")]
        output: Option<PathBuf>,

        #[arg(
            short = 'q',
            long,
            default_value_t = DEFAULT_QUALITY,
            help = "Compression quality (1-100)",
            long_help = "Compression quality from 1 (lowest) to 100 (highest). \
                         For PNG: below 90 reduces the palette, >=90 uses Zopfli, >=70 uses \
                         high compression, <70 uses standard compression."
        )]
        quality: u8,

        #[arg(
            short = 'f',
            long,
            help = "Output format (jpeg, png, webp)",
            long_help = "Force output format regardless of file extension. \
                         Supported formats: jpeg/jpg, png, webp"
        )]
        format: Option<String>,

        #[command(flatten)]
        encode: EncodeArgs,

        #[command(flatten)]
        resize: ResizeArgs,
    },

    #[command(
        about = "Compress every image in a directory",
        long_about = "Compress every supported image in a directory in parallel. One failing \
                      file never stops the run; failures are counted in the summary."
    )]
    Batch {
        #[arg(help = "Input directory")]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            help = "Output directory (default: <input_dir>/compressed)"
        )]
        output: Option<PathBuf>,

        #[arg(
            short = 'q',
            long,
            default_value_t = DEFAULT_QUALITY,
            help = "Compression quality (1-100)"
        )]
        quality: u8,

        #[arg(
            short = 'f',
            long,
            help = "Output format (jpeg, png, webp)",
            long_help = "Convert all images to the given format. \
                         If not specified, each image keeps its own format."
        )]
        format: Option<String>,

        #[arg(
            short = 'r',
            long,
            help = "Process subdirectories recursively",
            long_help = "Walk subdirectories and mirror their structure under the output directory."
        )]
        recursive: bool,

        #[command(flatten)]
        encode: EncodeArgs,

        #[command(flatten)]
        resize: ResizeArgs,

        #[arg(long, help = "Write a JSON report of every item to this path")]
        json_output: Option<PathBuf>,

        #[arg(
            short = 'j',
            long,
            help = "Number of parallel workers (default: auto)",
            long_help = "Number of worker threads. If not specified, uses the number of CPU cores."
        )]
        jobs: Option<usize>,

        #[arg(
            short = 's',
            long,
            help = "Optimize each image to this size in MB instead of a fixed quality"
        )]
        target_size: Option<f64>,

        #[arg(
            long,
            default_value_t = DEFAULT_OPTIMIZER_MIN_QUALITY,
            help = "Lowest quality tried with --target-size"
        )]
        min_quality: u8,

        #[arg(
            long,
            default_value_t = DEFAULT_OPTIMIZER_MAX_QUALITY,
            help = "Highest quality tried with --target-size"
        )]
        max_quality: u8,

        #[arg(long, help = "Stop starting new items after this many seconds")]
        timeout: Option<u64>,
    },

    #[command(
        about = "Find the highest quality that fits a target size",
        long_about = "Binary search the quality range for the highest quality whose output fits \
                      within the target size. Without -o nothing is written and the chosen \
                      quality is printed."
    )]
    Optimize {
        #[arg(help = "Input image file path")]
        input: PathBuf,

        #[arg(short = 's', long, help = "Target file size in MB")]
        target_size: f64,

        #[arg(short = 'f', long, help = "Output format (jpeg, png, webp)")]
        format: Option<String>,

        #[arg(short, long, help = "Write the best encoding to this path")]
        output: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_OPTIMIZER_MIN_QUALITY, help = "Lowest quality to try")]
        min_quality: u8,

        #[arg(long, default_value_t = DEFAULT_OPTIMIZER_MAX_QUALITY, help = "Highest quality to try")]
        max_quality: u8,

        #[command(flatten)]
        resize: ResizeArgs,

        #[arg(long, help = "Give up after this many seconds")]
        timeout: Option<u64>,
    },

    #[command(
        about = "Display image information",
        long_about = "Show file size, dimensions, megapixels, format, colour mode, bit depth and \
                      aspect ratio without decoding pixel data."
    )]
    Info {
        #[arg(help = "Image file path to analyze")]
        input: PathBuf,
    },

    #[command(about = "List supported output formats")]
    Formats,
}
