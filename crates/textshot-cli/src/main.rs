//! textshot command line interface.

mod engine;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use textshot::{start_batch, BatchEvent, ImageItem, ImageStatus, RecognitionOptions, TableFormat};
use tracing_subscriber::EnvFilter;

use crate::engine::TesseractEngine;

#[derive(Parser)]
#[command(name = "textshot", version, about = "Batch OCR refinement for photographed pages")]
struct Cli {
    /// Verbose logging (equivalent to RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize text in one or more images, in order
    Run {
        /// Image files (PNG, JPEG, WEBP, GIF, BMP)
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Recognition profile (see `textshot profiles`)
        #[arg(long, short, default_value = "balanced")]
        profile: String,

        /// Engine language pack, e.g. "eng" or "eng+equ"
        #[arg(long, short, default_value = "eng")]
        language: String,

        /// Skip the text enhancement pipeline
        #[arg(long)]
        no_enhance: bool,

        /// Reconstruct tabular layout from the engine's positional output
        #[arg(long)]
        tables: bool,

        /// Table output format: plain, markdown, csv, or formatted
        #[arg(long, default_value = "formatted")]
        table_format: String,

        /// Print the full batch summary as JSON instead of the combined text
        #[arg(long)]
        json: bool,
    },
    /// List available recognition profiles
    Profiles {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            images,
            profile,
            language,
            no_enhance,
            tables,
            table_format,
            json,
        } => {
            let options = RecognitionOptions {
                language,
                use_enhancement: !no_enhance,
                detect_tables: tables,
                table_format: parse_table_format(&table_format)?,
            };
            run(images, profile, options, json).await
        }
        Commands::Profiles { json } => {
            let profiles = textshot::list_profiles();
            if json {
                println!("{}", serde_json::to_string_pretty(&profiles)?);
            } else {
                for info in profiles {
                    println!("{:<16} {:<16} {}", info.name, info.display_name, info.description);
                }
            }
            Ok(())
        }
    }
}

async fn run(
    paths: Vec<PathBuf>,
    profile: String,
    options: RecognitionOptions,
    json: bool,
) -> anyhow::Result<()> {
    let mut items = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        items.push(ImageItem::new(name, bytes));
    }

    let (mut events, handle) = start_batch(Box::new(TesseractEngine::new()), items, profile, options);

    let mut names: std::collections::HashMap<uuid::Uuid, String> = Default::default();
    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::ItemStarted { id, name, index, total } => {
                eprintln!("[{}/{}] {}", index + 1, total, name);
                names.insert(id, name);
            }
            BatchEvent::ItemFinished { id, status, confidence, .. } => {
                let name = names.get(&id).map(String::as_str).unwrap_or("?");
                match status {
                    ImageStatus::Done => eprintln!("    done, confidence {:.1}", confidence),
                    ImageStatus::Failed => eprintln!("    failed: {}", name),
                    _ => {}
                }
            }
            BatchEvent::BatchFinished { metrics } => {
                eprintln!(
                    "finished in {:.1}s, average confidence {:.1}",
                    metrics.total_time_seconds, metrics.average_confidence
                );
            }
        }
    }

    let summary = handle.await.context("batch task panicked")??;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.combined_text);
    }
    Ok(())
}

fn parse_table_format(value: &str) -> anyhow::Result<TableFormat> {
    match value {
        "plain" => Ok(TableFormat::Plain),
        "markdown" => Ok(TableFormat::Markdown),
        "csv" => Ok(TableFormat::Csv),
        "formatted" => Ok(TableFormat::Formatted),
        other => anyhow::bail!("unknown table format '{}'", other),
    }
}
