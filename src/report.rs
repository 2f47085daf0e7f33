//! JSON report for batch runs.

use crate::error::Result;
use crate::model::BatchItem;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// One row of the report. Sizes are in MB; failed rows keep zeros and a
/// non-null `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub input_path: PathBuf,
    pub relative_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub success: bool,
    pub format: Option<String>,
    pub quality: Option<u8>,
    pub original_size_mb: f64,
    pub compressed_size_mb: f64,
    pub compression_ratio: f64,
    pub space_saved_mb: f64,
    pub space_saved_percent: f64,
    pub error: Option<String>,
}

impl From<&BatchItem> for ReportRecord {
    fn from(item: &BatchItem) -> Self {
        let result = &item.result;
        Self {
            input_path: item.input_path.clone(),
            relative_path: item.relative_path.clone(),
            output_path: result.output_path.clone(),
            success: result.success,
            format: result.format.map(|f| f.to_string()),
            quality: result.quality,
            original_size_mb: result.original_size_mb(),
            compressed_size_mb: result.compressed_size_mb(),
            compression_ratio: result.compression_ratio(),
            space_saved_mb: result.space_saved_mb(),
            space_saved_percent: result.space_saved_percent(),
            error: result.error.clone(),
        }
    }
}

pub fn build_report(items: &[BatchItem]) -> Vec<ReportRecord> {
    items.iter().map(ReportRecord::from).collect()
}

/// Writes the items as a pretty-printed JSON array.
pub fn write_json_report(path: &Path, items: &[BatchItem]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &build_report(items))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
