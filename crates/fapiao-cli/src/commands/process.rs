//! Process command - extract fields from a single document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use tracing::{debug, info};

use fapiao_core::ExtractionResult;

use super::{build_engine, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show overall extraction confidence
    #[arg(long)]
    show_confidence: bool,

    /// Fail when no template matches or a required field is missing
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per field
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let text = read_document(&args.input)?;
    let engine = build_engine(&config)?;
    let result = engine.extract(&text);

    let output = format_result(&result, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if !result.warnings.is_empty() && !matches!(args.format, OutputFormat::Text) {
        eprintln!("{}", style("Warnings:").yellow());
        for warning in &result.warnings {
            eprintln!("  - {}", warning);
        }
    }

    if args.show_confidence {
        eprintln!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            result.confidence() * 100.0
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    if args.strict {
        if !result.is_recognized() {
            anyhow::bail!("No template matched {}", args.input.display());
        }
        if !result.missing_fields.is_empty() {
            anyhow::bail!("Missing required fields: {}", result.missing_fields.join(", "));
        }
    }

    Ok(())
}

/// Read document text from a `.txt` or `.pdf` file.
pub fn read_document(path: &Path) -> anyhow::Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "txt" => fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display())),
        "pdf" => {
            let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let text = pdf_extract::extract_text_from_mem(&data)
                .map_err(|e| anyhow::anyhow!("Failed to extract text from {}: {}", path.display(), e))?;
            debug!("Extracted {} characters from PDF", text.chars().count());
            if text.trim().is_empty() {
                anyhow::bail!("No text could be extracted from the PDF");
            }
            Ok(text)
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    }
}

pub fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext.to_lowercase().as_str(), "txt" | "pdf")
}

pub fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(format_text(result)),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["field", "value", "confidence", "reliable"])?;

    for (name, field) in &result.fields {
        wtr.write_record([
            name.as_str(),
            &field.value.to_string(),
            &format!("{:.2}", field.confidence),
            if field.reliable { "true" } else { "false" },
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(result: &ExtractionResult) -> String {
    let mut output = String::new();

    let Some(template) = &result.matched_template else {
        output.push_str("Template: none (document not recognized)\n");
        return output;
    };

    output.push_str(&format!("Template: {}\n", template));
    output.push('\n');

    output.push_str("Fields:\n");
    let width = result.fields.keys().map(|k| k.len()).max().unwrap_or(0);
    for (name, field) in &result.fields {
        let marker = if field.reliable { "" } else { " (unreliable)" };
        output.push_str(&format!(
            "  {:width$}  {}  [{:.2}]{}\n",
            name,
            field.value,
            field.confidence,
            marker,
            width = width
        ));
    }

    if !result.missing_fields.is_empty() {
        output.push('\n');
        output.push_str(&format!("Missing: {}\n", result.missing_fields.join(", ")));
    }

    if !result.warnings.is_empty() {
        output.push('\n');
        output.push_str("Warnings:\n");
        for warning in &result.warnings {
            output.push_str(&format!("  {}\n", warning));
        }
    }

    output
}
