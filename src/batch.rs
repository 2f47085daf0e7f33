use crate::cancel::CancelToken;
use crate::codec::panic_message;
use crate::constants::{
    DEFAULT_OPTIMIZER_MAX_QUALITY, DEFAULT_OPTIMIZER_MIN_QUALITY, DEFAULT_QUALITY,
    PROGRESS_BAR_TEMPLATE,
};
use crate::error::{CompressionError, Result};
use crate::formats::{is_supported_input, OutputFormat};
use crate::model::{
    compressed_file_name, output_extension, validate_quality, BatchItem, BatchSummary,
    CompressionRequest, CompressionResult, EncodeOptions, ResizeLimits,
};
use crate::optimizer::{validate_quality_range, OptimizeRequest};
use crate::processing::Compressor;
use crate::validation::validate_input_dir;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Settings shared by every item of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub quality: u8,
    /// Fixed output format; `None` keeps each file's own format.
    pub format: Option<OutputFormat>,
    pub recursive: bool,
    pub encode: EncodeOptions,
    /// Bounding box every output is shrunk to fit.
    pub resize: ResizeLimits,
    /// Run the quality optimizer per item instead of a fixed quality.
    pub target_size_mb: Option<f64>,
    pub min_quality: u8,
    pub max_quality: u8,
    /// Worker threads; 0 means one per CPU.
    pub jobs: usize,
    pub show_progress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            format: None,
            recursive: false,
            encode: EncodeOptions::default(),
            resize: ResizeLimits::default(),
            target_size_mb: None,
            min_quality: DEFAULT_OPTIMIZER_MIN_QUALITY,
            max_quality: DEFAULT_OPTIMIZER_MAX_QUALITY,
            jobs: 0,
            show_progress: false,
        }
    }
}

impl BatchOptions {
    pub fn new(quality: Option<u8>, format: Option<&str>, recursive: bool) -> Result<Self> {
        let quality = validate_quality(quality.unwrap_or(DEFAULT_QUALITY))?;
        let format = format.map(str::parse).transpose()?;
        Ok(Self {
            quality,
            format,
            recursive,
            ..Self::default()
        })
    }

    fn validate(&self) -> Result<()> {
        validate_quality(self.quality)?;
        self.encode.validate()?;
        self.resize.validate()?;
        if let Some(target) = self.target_size_mb {
            if !target.is_finite() || target <= 0.0 {
                return Err(CompressionError::InvalidTargetSize(target));
            }
            validate_quality_range(self.min_quality, self.max_quality)?;
        }
        Ok(())
    }

    fn worker_count(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Completed items in discovery order.
    pub items: Vec<BatchItem>,
    pub summary: BatchSummary,
    /// Set when the cancel token fired before every item ran.
    pub cancelled: bool,
    /// Discovered files that never ran because of cancellation.
    pub skipped: usize,
    /// False when cancellation stopped the directory walk, in which case
    /// `skipped` does not count the files that were never found.
    pub discovery_complete: bool,
}

impl BatchReport {
    fn from_items(items: Vec<BatchItem>, discovered: usize, cancelled: bool) -> Self {
        let summary = BatchSummary::from_items(&items);
        let skipped = discovered - items.len();
        Self {
            items,
            summary,
            cancelled,
            skipped,
            discovery_complete: true,
        }
    }

    fn cancelled_during_discovery() -> Self {
        Self {
            discovery_complete: false,
            ..Self::from_items(Vec::new(), 0, true)
        }
    }

    pub fn all_failed(&self) -> bool {
        self.summary.total > 0 && self.summary.succeeded == 0
    }
}

struct PlannedItem {
    input: PathBuf,
    relative: PathBuf,
    output: Result<PathBuf>,
}

impl Compressor {
    /// Compresses every supported image under `input_dir` into `output_dir`.
    ///
    /// Per-item failures are recorded on their item and never stop the run;
    /// only a missing input root, an uncreatable output root or a failed
    /// directory walk fail the call itself.
    pub fn compress_batch(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: &BatchOptions,
    ) -> Result<BatchReport> {
        self.compress_batch_with(input_dir, output_dir, options, |_| {})
    }

    /// Like [`Compressor::compress_batch`], calling `on_item` from the
    /// worker thread as each item finishes.
    pub fn compress_batch_with<F>(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        options: &BatchOptions,
        on_item: F,
    ) -> Result<BatchReport>
    where
        F: Fn(&BatchItem) + Sync,
    {
        options.validate()?;
        validate_input_dir(input_dir)?;
        fs::create_dir_all(output_dir)
            .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;

        let start_time = Instant::now();
        let root = input_dir.canonicalize()?;
        let output_root = output_dir.canonicalize()?;

        let files = match collect_image_files(
            &root,
            options.recursive,
            Some(&output_root),
            self.cancel_token(),
        ) {
            Ok(files) => files,
            Err(CompressionError::Cancelled) => {
                warn!("batch cancelled during discovery");
                return Ok(BatchReport::cancelled_during_discovery());
            }
            Err(e) => return Err(e),
        };
        let total_files = files.len();
        info!(
            input = %root.display(),
            output = %output_root.display(),
            "found {} image files to process",
            total_files
        );

        let plans = plan_outputs(&root, &output_root, files, options);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.worker_count())
            .build()
            .map_err(|e| CompressionError::ThreadPool(e.to_string()))?;

        let progress = if options.show_progress {
            let bar = ProgressBar::new(total_files as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(PROGRESS_BAR_TEMPLATE)
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let completed: Vec<Option<BatchItem>> = pool.install(|| {
            plans
                .into_par_iter()
                .map(|plan| {
                    let item = self.process_single_image(plan, options);
                    if let Some(item) = &item {
                        on_item(item);
                    }
                    progress.inc(1);
                    item
                })
                .collect()
        });
        progress.finish_and_clear();

        let cancelled = completed.iter().any(Option::is_none);
        let items: Vec<BatchItem> = completed.into_iter().flatten().collect();
        let report = BatchReport::from_items(items, total_files, cancelled);

        info!(
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            skipped = report.skipped,
            elapsed = ?start_time.elapsed(),
            "batch complete"
        );
        if cancelled {
            warn!(skipped = report.skipped, "batch cancelled before all items ran");
        }

        Ok(report)
    }

    /// Runs one planned item. `None` means the item was cancelled and
    /// produced nothing.
    fn process_single_image(&self, plan: PlannedItem, options: &BatchOptions) -> Option<BatchItem> {
        if self.cancel_token().is_cancelled() {
            return None;
        }

        let result = match &plan.output {
            Ok(output) => {
                match catch_item_panic(|| self.compress_to(&plan.input, output, options)) {
                    Ok(result) => result,
                    Err(CompressionError::Cancelled) => return None,
                    Err(e) => {
                        warn!(input = %plan.input.display(), error = %e, "failed to process");
                        CompressionResult::failed(&plan.input, Some(output.clone()), &e)
                    }
                }
            }
            Err(e) => {
                warn!(input = %plan.input.display(), error = %e, "failed to plan output");
                CompressionResult::failed(&plan.input, None, e)
            }
        };
        debug!(input = %plan.input.display(), success = result.success, "item done");

        Some(BatchItem {
            input_path: plan.input,
            relative_path: plan.relative,
            result,
        })
    }

    fn compress_to(
        &self,
        input: &Path,
        output: &Path,
        options: &BatchOptions,
    ) -> Result<CompressionResult> {
        let format = options.format.map(|f| f.name());
        match options.target_size_mb {
            Some(target) => {
                let mut request = OptimizeRequest::new(input, target)
                    .output(output)
                    .quality_range(options.min_quality, options.max_quality)
                    .options(options.encode)
                    .resize(options.resize);
                request.format = format.map(str::to_string);
                self.optimize_quality(&request).map(|outcome| outcome.result)
            }
            None => {
                let request = CompressionRequest::new(
                    input,
                    Some(output.to_path_buf()),
                    Some(options.quality),
                    format,
                    options.encode,
                )?
                .with_resize(options.resize)?;
                self.compress(&request)
            }
        }
    }
}

/// Turns a panic inside one item into that item's error.
fn catch_item_panic<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(CompressionError::Panicked(panic_message(payload.as_ref())))
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Lists supported images under `root` in lexicographic path order.
///
/// Non-recursive runs look at immediate children only. Hidden entries and
/// the `exclude` directory (typically an output root nested inside the
/// input) are skipped. The token is checked between entries.
pub fn collect_image_files(
    root: &Path,
    recursive: bool,
    exclude: Option<&Path>,
    cancel: &CancelToken,
) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root).max_depth(max_depth).into_iter();

    let mut image_files = Vec::new();
    for entry in walker.filter_entry(|e| {
        e.depth() == 0 || (!is_hidden(e) && exclude.map_or(true, |dir| e.path() != dir))
    }) {
        if cancel.is_cancelled() {
            return Err(CompressionError::Cancelled);
        }
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_supported_input(path) {
            image_files.push(path.to_path_buf());
        }
    }

    image_files.sort();
    Ok(image_files)
}

/// Output path for one input: `<stem>_compressed.<ext>` placed under
/// `output_dir`, mirroring the relative subdirectory when `recursive`.
pub fn generate_output_path(
    input_path: &Path,
    relative_path: &Path,
    output_dir: &Path,
    format: Option<OutputFormat>,
    recursive: bool,
) -> Result<PathBuf> {
    let extension = output_extension(input_path, format);
    let file_name = compressed_file_name(input_path, &extension)?;

    let dir = match relative_path.parent() {
        Some(parent) if recursive => output_dir.join(parent),
        _ => output_dir.to_path_buf(),
    };
    Ok(dir.join(file_name))
}

/// Assigns every file its output path before anything runs. A path already
/// claimed by an earlier file becomes an error for the later one.
fn plan_outputs(
    root: &Path,
    output_root: &Path,
    files: Vec<PathBuf>,
    options: &BatchOptions,
) -> Vec<PlannedItem> {
    let mut claimed = HashSet::new();
    files
        .into_iter()
        .map(|input| {
            let relative = input
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| PathBuf::from(input.file_name().unwrap_or_default()));
            let output = generate_output_path(
                &input,
                &relative,
                output_root,
                options.format,
                options.recursive,
            )
            .and_then(|path| {
                if claimed.insert(path.clone()) {
                    Ok(path)
                } else {
                    Err(CompressionError::OutputConflict(path))
                }
            });
            PlannedItem {
                input,
                relative,
                output,
            }
        })
        .collect()
}
