/// Output format handling and the format router
///
/// The router maps an explicit or inferred format name onto one of the three
/// output formats and the codec that encodes it. It is a pure lookup over
/// static codec instances, so batch workers may call it concurrently.
use crate::codec::{Codec, JpegCodec, PngCodec, WebpCodec};
use crate::constants::SUPPORTED_INPUT_EXTENSIONS;
use crate::error::{CompressionError, Result};
use crate::model::EncodeOptions;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Supported output image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// JPEG format with lossy compression
    Jpeg,
    /// PNG format with lossless compression
    Png,
    /// WebP format, lossy or lossless
    WebP,
}

impl OutputFormat {
    /// Canonical lowercase name, as accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "Lossy compression, good for photos",
            OutputFormat::Png => "Lossless compression, supports transparency",
            OutputFormat::WebP => "Modern format with excellent compression",
        }
    }

    pub fn all_formats() -> [OutputFormat; 3] {
        [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::WebP]
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Png => "PNG",
            OutputFormat::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for OutputFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(CompressionError::UnsupportedFormat(s.to_string())),
        }
    }
}

static JPEG_CODEC: JpegCodec = JpegCodec;
static PNG_CODEC: PngCodec = PngCodec;
static WEBP_CODEC: WebpCodec = WebpCodec;

/// A resolved format bound to the codec that produces it.
#[derive(Clone, Copy)]
pub struct Route {
    pub format: OutputFormat,
    pub codec: &'static dyn Codec,
}

impl Route {
    pub fn default_options(&self) -> EncodeOptions {
        self.codec.default_options()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("format", &self.format).finish()
    }
}

/// Stateless format router
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRouter;

impl FormatRouter {
    pub fn route(&self, format: OutputFormat) -> Route {
        let codec: &'static dyn Codec = match format {
            OutputFormat::Jpeg => &JPEG_CODEC,
            OutputFormat::Png => &PNG_CODEC,
            OutputFormat::WebP => &WEBP_CODEC,
        };
        Route { format, codec }
    }

    /// Resolves an explicit format name, or infers one from the input
    /// file's extension when none is given.
    pub fn resolve(&self, requested: Option<&str>, input: &Path) -> Result<Route> {
        let format = match requested {
            Some(name) => name.parse()?,
            None => {
                let ext = input
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .ok_or_else(|| {
                        CompressionError::UnsupportedFormat(format!(
                            "cannot infer a format from {:?}",
                            input
                        ))
                    })?;
                ext.parse()?
            }
        };
        Ok(self.route(format))
    }
}

/// Check if a file path carries one of the supported input extensions
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| SUPPORTED_INPUT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
