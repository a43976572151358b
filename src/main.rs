use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use labsense::config;
use labsense::pipeline::extraction::OcrEngine;
use labsense::pipeline::normalize::normalize;
use labsense::pipeline::processor::DocumentProcessor;
use labsense::pipeline_config::PipelineConfig;
use labsense::trends::generate_trend_data;

#[derive(Parser)]
#[command(name = "labsense")]
#[command(version)]
#[command(about = "Extract health parameters from lab-report PDFs and images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a lab report and print the outcome as JSON
    Extract {
        /// PDF, PNG, JPEG or TIFF file
        file: PathBuf,

        /// Declared MIME type (guessed from the extension when absent)
        #[arg(long)]
        mime: Option<String>,

        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory holding eng.traineddata
        #[arg(long)]
        tessdata: Option<PathBuf>,

        /// Also print a synthetic six-month trend per parameter
        #[arg(long)]
        trends: bool,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Print the normalized form of a plain-text report
    Normalize {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    labsense::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            file,
            mime,
            config,
            tessdata,
            trends,
            pretty,
        } => extract_command(&file, mime, config.as_deref(), tessdata.as_deref(), trends, pretty).await,
        Commands::Normalize { file } => normalize_command(&file),
    }
}

async fn extract_command(
    file: &Path,
    mime: Option<String>,
    config_path: Option<&Path>,
    tessdata: Option<&Path>,
    trends: bool,
    pretty: bool,
) -> Result<()> {
    let pipeline_config = match config_path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?
            .with_env_overrides()?,
        None => PipelineConfig::from_env()?,
    };

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let mime = mime.unwrap_or_else(|| {
        mime_guess::from_path(file)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });

    tracing::info!(
        version = config::APP_VERSION,
        file = %file.display(),
        mime = %mime,
        "Starting extraction"
    );

    let processor = DocumentProcessor::new(ocr_engine(tessdata), pipeline_config);
    let outcome = processor.process(&bytes, &mime).await?;

    if trends {
        let today = chrono::Local::now().date_naive();
        let trend_map =
            generate_trend_data(&outcome.health_parameters, today, &mut rand::thread_rng());
        print_json(
            &serde_json::json!({ "outcome": outcome, "trends": trend_map }),
            pretty,
        )
    } else {
        print_json(&outcome, pretty)
    }
}

fn normalize_command(file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    println!("{}", normalize(&raw));
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{rendered}");
    Ok(())
}

#[cfg(feature = "ocr")]
fn ocr_engine(tessdata: Option<&Path>) -> Arc<dyn OcrEngine> {
    use labsense::pipeline::extraction::{BundledTesseract, UnavailableOcr};

    match BundledTesseract::new(tessdata) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::warn!(error = %e, "Tesseract unavailable, images will yield no text");
            Arc::new(UnavailableOcr)
        }
    }
}

#[cfg(not(feature = "ocr"))]
fn ocr_engine(tessdata: Option<&Path>) -> Arc<dyn OcrEngine> {
    use labsense::pipeline::extraction::UnavailableOcr;

    if tessdata.is_some() {
        tracing::warn!("--tessdata ignored: built without the `ocr` feature");
    }
    Arc::new(UnavailableOcr)
}
