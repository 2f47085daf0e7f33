use anyhow::Context;
use clap::Parser;
use pixpress::cli::{Args, Commands, EncodeArgs, ResizeArgs};
use pixpress::constants::DEFAULT_BATCH_OUTPUT_DIR;
use pixpress::{
    format_file_size, init_logging, inspect_image, print_image_info, write_json_report,
    BatchOptions, BatchReport, CancelToken, CompressionRequest, CompressionResult, Compressor,
    OptimizeRequest, OutputFormat,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let verbose = args.verbose;
    let quiet = args.quiet;

    match args.command {
        Commands::Compress {
            input,
            output,
            quality,
            format,
            encode,
            resize,
        } => compress_command(input, output, quality, format, &encode, &resize, quiet),
        Commands::Batch {
            input_dir,
            output,
            quality,
            format,
            recursive,
            encode,
            resize,
            json_output,
            jobs,
            target_size,
            min_quality,
            max_quality,
            timeout,
        } => {
            let options = BatchOptions {
                encode: encode.to_options(),
                resize: resize.to_limits(),
                target_size_mb: target_size,
                min_quality,
                max_quality,
                jobs: jobs.unwrap_or(0),
                show_progress: !quiet,
                ..BatchOptions::new(Some(quality), format.as_deref(), recursive)?
            };
            let output_dir = output.unwrap_or_else(|| input_dir.join(DEFAULT_BATCH_OUTPUT_DIR));
            batch_command(
                &input_dir,
                &output_dir,
                &options,
                json_output.as_deref(),
                timeout,
                verbose,
                quiet,
            )
        }
        Commands::Optimize {
            input,
            target_size,
            format,
            output,
            min_quality,
            max_quality,
            resize,
            timeout,
        } => {
            let mut request = OptimizeRequest::new(input, target_size)
                .quality_range(min_quality, max_quality)
                .resize(resize.to_limits());
            request.format = format;
            request.output = output;
            optimize_command(&request, timeout, quiet)
        }
        Commands::Info { input } => {
            let info = inspect_image(&input)
                .with_context(|| format!("cannot read image info for {}", input.display()))?;
            print_image_info(&info);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Formats => {
            println!("📋 Supported output formats:");
            for format in OutputFormat::all_formats() {
                println!(
                    "  • {:<5} (.{}) - {}",
                    format.name(),
                    format.extension(),
                    format.description()
                );
            }
            println!("  (jpg is accepted as an alias for jpeg)");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cancel_token(timeout: Option<u64>) -> CancelToken {
    match timeout {
        Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
        None => CancelToken::new(),
    }
}

fn compress_command(
    input: PathBuf,
    output: Option<PathBuf>,
    quality: u8,
    format: Option<String>,
    encode: &EncodeArgs,
    resize: &ResizeArgs,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let request = CompressionRequest::new(
        input,
        output,
        Some(quality),
        format.as_deref(),
        encode.to_options(),
    )?
    .with_resize(resize.to_limits())?;
    if !quiet {
        println!(
            "🚀 Compressing {} -> {} ({}, quality {})",
            request.input.display(),
            request.output.display(),
            request.format(),
            request.quality
        );
    }

    let result = Compressor::new().compress(&request)?;
    print_result(&result);
    Ok(ExitCode::SUCCESS)
}

fn optimize_command(
    request: &OptimizeRequest,
    timeout: Option<u64>,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    if !quiet {
        println!(
            "🎯 Searching quality {}-{} for {} to fit {:.2} MB",
            request.min_quality,
            request.max_quality,
            request.input.display(),
            request.target_size_mb
        );
    }

    let compressor = Compressor::with_cancel_token(cancel_token(timeout));
    let outcome = compressor.optimize_quality(request)?;

    if outcome.non_monotonic {
        println!("⚠️  Output size did not shrink steadily with quality; a higher fitting quality may exist");
    }
    match &outcome.result.output_path {
        Some(_) => print_result(&outcome.result),
        None => {
            println!("✅ Optimal quality found: {}", outcome.quality);
            println!(
                "  📦 Estimated size: {} ({:.2} MB, {:.1}% of original)",
                format_file_size(outcome.result.compressed_size),
                outcome.result.compressed_size_mb(),
                outcome.result.compression_ratio() * 100.0
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn batch_command(
    input_dir: &Path,
    output_dir: &Path,
    options: &BatchOptions,
    json_output: Option<&Path>,
    timeout: Option<u64>,
    verbose: bool,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    if !quiet {
        println!(
            "🚀 Batch compressing {} -> {}",
            input_dir.display(),
            output_dir.display()
        );
    }

    let compressor = Compressor::with_cancel_token(cancel_token(timeout));
    let report = compressor.compress_batch(input_dir, output_dir, options)?;

    if report.items.is_empty() && !report.cancelled {
        println!("⚠️  No supported images found in {}", input_dir.display());
        return Ok(ExitCode::SUCCESS);
    }

    print_batch_summary(&report, verbose);

    if let Some(path) = json_output {
        write_json_report(path, &report.items)
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        if !quiet {
            println!("📝 Report written to {}", path.display());
        }
    }

    let nothing_done = report.cancelled && report.summary.succeeded == 0;
    if report.all_failed() || nothing_done {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_result(result: &CompressionResult) {
    if let Some(output) = &result.output_path {
        println!("✅ Saved {}", output.display());
    }
    if let Some(format) = result.format {
        print!("  🎭 {}", format);
        if let Some(quality) = result.quality {
            print!(" at quality {}", quality);
        }
        println!();
    }
    println!(
        "  📦 {} -> {} ({:.1}% saved, ratio {:.3})",
        format_file_size(result.original_size),
        format_file_size(result.compressed_size),
        result.space_saved_percent(),
        result.compression_ratio()
    );
}

fn print_batch_summary(report: &BatchReport, verbose: bool) {
    let summary = &report.summary;
    println!("\n📊 Batch Summary:");
    println!("  📁 Processed: {}", summary.total);
    println!("  ✅ Succeeded: {}", summary.succeeded);
    println!("  ❌ Failed: {}", summary.failed);
    if !report.discovery_complete {
        println!("  ⏹️  Cancelled while scanning the input directory");
    } else if report.cancelled {
        println!("  ⏹️  Cancelled, {} files not started", report.skipped);
    }
    println!(
        "  📦 Total size: {:.2} MB -> {:.2} MB",
        summary.total_original_mb(),
        summary.total_compressed_mb()
    );
    println!(
        "  💾 Space saved: {} ({:.1}%)",
        format_file_size(summary.space_saved().max(0) as u64),
        summary.savings_percent()
    );

    if verbose && summary.failed > 0 {
        println!("\n❌ Failed files:");
        for item in report.items.iter().filter(|item| !item.success()) {
            println!(
                "  • {}: {}",
                item.relative_path.display(),
                item.result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
