//! Quality search against a target output size.
//!
//! The search assumes encoded size never grows when quality drops. Codecs
//! do not guarantee this (palette reduction in PNG is one counter-example),
//! so every probe is recorded and a non-monotonic curve is reported on the
//! outcome rather than hidden. When it happens, the returned quality still
//! fits the target but may not be the highest one that would.

use crate::cancel::CancelToken;
use crate::constants::{DEFAULT_OPTIMIZER_MAX_QUALITY, DEFAULT_OPTIMIZER_MIN_QUALITY};
use crate::error::{CompressionError, Result};
use crate::model::{
    validate_quality, CompressionRequest, CompressionResult, EncodeOptions, ResizeLimits,
};
use crate::processing::{load_image, resize_to_fit, write_output, Compressor};
use crate::utils::mb_to_bytes;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Parameters for one target-size search.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub input: PathBuf,
    /// When set, the winning encoding is written here.
    pub output: Option<PathBuf>,
    pub target_size_mb: f64,
    pub format: Option<String>,
    pub min_quality: u8,
    pub max_quality: u8,
    pub options: Option<EncodeOptions>,
    pub resize: ResizeLimits,
}

impl OptimizeRequest {
    pub fn new(input: impl Into<PathBuf>, target_size_mb: f64) -> Self {
        Self {
            input: input.into(),
            output: None,
            target_size_mb,
            format: None,
            min_quality: DEFAULT_OPTIMIZER_MIN_QUALITY,
            max_quality: DEFAULT_OPTIMIZER_MAX_QUALITY,
            options: None,
            resize: ResizeLimits::default(),
        }
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn quality_range(mut self, min_quality: u8, max_quality: u8) -> Self {
        self.min_quality = min_quality;
        self.max_quality = max_quality;
        self
    }

    pub fn options(mut self, options: EncodeOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn resize(mut self, resize: ResizeLimits) -> Self {
        self.resize = resize;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.resize.validate()?;
        if !self.target_size_mb.is_finite() || self.target_size_mb <= 0.0 {
            return Err(CompressionError::InvalidTargetSize(self.target_size_mb));
        }
        validate_quality_range(self.min_quality, self.max_quality)
    }
}

pub fn validate_quality_range(min_quality: u8, max_quality: u8) -> Result<()> {
    let in_range = validate_quality(min_quality).is_ok() && validate_quality(max_quality).is_ok();
    if !in_range || min_quality > max_quality {
        return Err(CompressionError::InvalidQualityRange(min_quality, max_quality));
    }
    Ok(())
}

/// A probe that met the size constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<T> {
    pub quality: u8,
    pub size: u64,
    pub payload: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome<T> {
    pub best: Candidate<T>,
    /// Every probe as `(quality, size)`, in probe order.
    pub probes: Vec<(u8, u64)>,
    pub non_monotonic: bool,
}

/// Transient state of one search; never shared between searches.
struct OptimizationState<T> {
    low: u8,
    high: u8,
    best: Option<Candidate<T>>,
    probes: Vec<(u8, u64)>,
}

impl<T> OptimizationState<T> {
    fn next_probe(&self) -> Option<u8> {
        (self.low <= self.high).then(|| midpoint(self.low, self.high))
    }

    fn record(&mut self, quality: u8, size: u64, payload: T, target_bytes: u64) {
        self.probes.push((quality, size));
        if size <= target_bytes {
            self.best = Some(Candidate {
                quality,
                size,
                payload,
            });
            self.low = quality + 1;
        } else {
            self.high = quality - 1;
        }
    }
}

fn midpoint(low: u8, high: u8) -> u8 {
    ((u16::from(low) + u16::from(high)) / 2) as u8
}

/// True when some lower quality produced a strictly larger output than a
/// higher one.
fn is_non_monotonic(probes: &[(u8, u64)]) -> bool {
    let mut sorted = probes.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|pair| pair[0].1 > pair[1].1)
}

/// Binary search for the highest quality in `min_quality..=max_quality`
/// whose probed size fits within `target_size_mb`.
///
/// `probe` encodes at the given quality and returns the encoded size plus
/// whatever payload the caller wants to keep for the winner. Probes run
/// strictly one after another; the token is checked before each of them.
pub fn search_quality<T, F>(
    min_quality: u8,
    max_quality: u8,
    target_size_mb: f64,
    cancel: &CancelToken,
    mut probe: F,
) -> Result<SearchOutcome<T>>
where
    F: FnMut(u8) -> Result<(u64, T)>,
{
    validate_quality_range(min_quality, max_quality)?;
    if !target_size_mb.is_finite() || target_size_mb <= 0.0 {
        return Err(CompressionError::InvalidTargetSize(target_size_mb));
    }
    let target_bytes = mb_to_bytes(target_size_mb);

    let mut state = OptimizationState {
        low: min_quality,
        high: max_quality,
        best: None,
        probes: Vec::new(),
    };

    while let Some(quality) = state.next_probe() {
        if cancel.is_cancelled() {
            return Err(CompressionError::Cancelled);
        }
        let (size, payload) = probe(quality)?;
        debug!(quality, size, target_bytes, "probe");
        state.record(quality, size, payload, target_bytes);
    }

    let non_monotonic = is_non_monotonic(&state.probes);
    if non_monotonic {
        warn!(
            probes = ?state.probes,
            "output size is not monotonic in quality; the chosen quality may not be maximal"
        );
    }

    match state.best {
        Some(best) => Ok(SearchOutcome {
            best,
            probes: state.probes,
            non_monotonic,
        }),
        None => Err(CompressionError::TargetUnreachable {
            target_mb: target_size_mb,
            min_quality,
            max_quality,
        }),
    }
}

/// Result of [`Compressor::optimize_quality`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    pub quality: u8,
    pub result: CompressionResult,
    pub probes: Vec<(u8, u64)>,
    pub non_monotonic: bool,
}

impl Compressor {
    /// Finds the highest quality whose output fits the target size.
    ///
    /// The image is decoded once and every probe encodes in memory, so no
    /// scratch files exist on any exit path. The winning bytes are written
    /// only when the request names an output path.
    pub fn optimize_quality(&self, request: &OptimizeRequest) -> Result<OptimizationOutcome> {
        request.validate()?;
        let route = self
            .router()
            .resolve(request.format.as_deref(), &request.input)?;
        let options = request.options.unwrap_or_else(|| route.default_options());
        options.validate()?;

        let (img, original_size) = load_image(&request.input)?;
        let img = resize_to_fit(img, &request.resize);
        info!(
            input = %request.input.display(),
            target_mb = request.target_size_mb,
            "searching quality {}-{}",
            request.min_quality,
            request.max_quality
        );

        let outcome = search_quality(
            request.min_quality,
            request.max_quality,
            request.target_size_mb,
            self.cancel_token(),
            |quality| {
                let bytes = route.codec.encode(&img, quality, &options)?;
                Ok((bytes.len() as u64, bytes))
            },
        )?;

        if let Some(output) = &request.output {
            write_output(output, &outcome.best.payload)?;
        }

        let chosen = CompressionRequest {
            input: request.input.clone(),
            output: request.output.clone().unwrap_or_default(),
            route,
            quality: outcome.best.quality,
            options,
            resize: request.resize,
        };
        let result = CompressionResult::succeeded(
            &chosen,
            request.output.clone(),
            original_size,
            outcome.best.size,
        );

        Ok(OptimizationOutcome {
            quality: outcome.best.quality,
            result,
            probes: outcome.probes,
            non_monotonic: outcome.non_monotonic,
        })
    }
}
