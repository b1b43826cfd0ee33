//! Batch processing command for multiple documents.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use fapiao_core::template::fields::{
    BUYER_NAME, INVOICE_DATE, INVOICE_NUMBER, SELLER_NAME, TOTAL_AMOUNT,
};
use fapiao_core::{ExtractionEngine, ExtractionResult};

use super::process::{OutputFormat, format_result, is_supported, read_document};
use super::{build_engine, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory, one file per document (default: JSON Lines on stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also write a summary CSV to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    outcome: Result<ExtractionResult, String>,
    processing_time_ms: u64,
}

/// Line written to stdout when no output directory is given.
#[derive(Serialize)]
struct BatchRecord<'a> {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a ExtractionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| is_supported(p))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let engine = Arc::new(build_engine(&config)?);
    let results = process_files(files, engine, args.jobs, &pb).await?;

    let mut failed = 0;
    let mut recognized = 0;
    for result in &results {
        match &result.outcome {
            Ok(extraction) => {
                if extraction.is_recognized() {
                    recognized += 1;
                }
            }
            Err(message) => {
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", result.path.display(), message);
                    pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", result.path.display(), message);
                }
                warn!("Failed to process {}: {}", result.path.display(), message);
                failed += 1;
            }
        }
    }

    pb.finish_and_clear();

    match &args.output_dir {
        Some(output_dir) => write_outputs(output_dir, &results, args.format)?,
        None => {
            for result in &results {
                let record = BatchRecord {
                    file: result.path.display().to_string(),
                    result: result.outcome.as_ref().ok(),
                    error: result.outcome.as_ref().err().map(String::as_str),
                };
                println!("{}", serde_json::to_string(&record)?);
            }
        }
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &results)
            .with_context(|| format!("Failed to write summary to {}", summary_path.display()))?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    eprintln!(
        "{} Processed {} files ({} recognized, {} failed) in {:.1}s",
        style("✓").green(),
        results.len(),
        recognized,
        failed,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Run extraction on blocking workers, at most `jobs` at a time. Results
/// keep the input order.
async fn process_files(
    files: Vec<PathBuf>,
    engine: Arc<ExtractionEngine>,
    jobs: usize,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<FileResult>> {
    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let engine = Arc::clone(&engine);
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let file_start = Instant::now();
            let outcome = read_document(&path)
                .map(|text| engine.extract(&text))
                .map_err(|e| format!("{:#}", e));
            FileResult {
                path,
                outcome,
                processing_time_ms: file_start.elapsed().as_millis() as u64,
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await?);
        pb.inc(1);
    }
    Ok(results)
}

fn write_outputs(output_dir: &Path, results: &[FileResult], format: OutputFormat) -> anyhow::Result<()> {
    let mut used = HashSet::new();
    for result in results {
        let Ok(extraction) = &result.outcome else { continue };

        let output_path = output_dir.join(output_name(&result.path, format, &mut used));

        fs::write(&output_path, format_result(extraction, format)?)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    }
    Ok(())
}

/// Output file name for `path`, unique among the names in `used`.
///
/// `a.txt` becomes `a.json`. When that is taken the input extension is
/// kept (`a.pdf.json`), then a counter is added (`a-2.json`).
fn output_name(path: &Path, format: OutputFormat, used: &mut HashSet<String>) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or(stem);
    let extension = format.extension();

    let preferred = format!("{}.{}", stem, extension);
    let name = [preferred.clone(), format!("{}.{}", file_name, extension)]
        .into_iter()
        .chain((2..).map(|n| format!("{}-{}.{}", stem, n, extension)))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| preferred.clone());

    if name != preferred {
        warn!("Output for {} written as {} to avoid overwriting", path.display(), name);
    }
    used.insert(name.clone());
    name
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "template",
        INVOICE_NUMBER,
        INVOICE_DATE,
        BUYER_NAME,
        SELLER_NAME,
        TOTAL_AMOUNT,
        "confidence",
        "warnings",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        match &result.outcome {
            Ok(extraction) => {
                let field = |name: &str| extraction.get(name).map(|v| v.to_string()).unwrap_or_default();
                let status = if extraction.is_recognized() { "success" } else { "unrecognized" };
                wtr.write_record([
                    filename,
                    status,
                    extraction.matched_template.as_deref().unwrap_or(""),
                    &field(INVOICE_NUMBER),
                    &field(INVOICE_DATE),
                    &field(BUYER_NAME),
                    &field(SELLER_NAME),
                    &field(TOTAL_AMOUNT),
                    &format!("{:.2}", extraction.confidence()),
                    &extraction.warnings.len().to_string(),
                    &result.processing_time_ms.to_string(),
                    "",
                ])?;
            }
            Err(message) => {
                wtr.write_record([
                    filename,
                    "error",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    "",
                    &result.processing_time_ms.to_string(),
                    message,
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
