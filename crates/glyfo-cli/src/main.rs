// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Glyfo — PDF to coordinate-annotated text.
//
// Entry point. Initialises logging, builds the configuration from defaults,
// an optional JSON file and command-line overrides, then runs the pipeline
// and writes its outputs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use glyfo_core::human_errors::humanize_error;
use glyfo_core::{Document, OutputConfig, PipelineConfig, Result};
use glyfo_document::ocr::TextRecognizer;
use glyfo_document::{OutputFiles, OutputWriter, Pipeline, StageProfiler};
use tracing::info;

#[derive(Parser)]
#[command(name = "glyfo")]
#[command(version)]
#[command(about = "Extract text with page coordinates from native, mixed and scanned PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify, extract and OCR a PDF, then write all outputs
    Process {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// JSON configuration file; missing keys keep their defaults
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Directory containing text-detection.rten and text-recognition.rten
        #[arg(long, value_name = "DIR")]
        models: Option<PathBuf>,

        /// Keep line-level regions instead of splitting into words
        #[arg(long)]
        no_split: bool,

        /// Time budget for the whole document, in seconds
        #[arg(long, value_name = "SECS")]
        max_time: Option<u64>,

        /// Skip the annotated, searchable, editable and reconstructed PDFs
        #[arg(long)]
        no_pdfs: bool,
    },

    /// Regenerate the overlay PDFs from an existing results JSON
    Overlay {
        /// The PDF the results were produced from
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Results JSON written by `glyfo process`
        #[arg(value_name = "JSON")]
        results: PathBuf,

        /// Output directory
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Process {
            input,
            config,
            out_dir,
            models,
            no_split,
            max_time,
            no_pdfs,
        } => build_config(config.as_deref(), out_dir, no_split, max_time, no_pdfs)
            .and_then(|config| process(&input, config, models)),
        Commands::Overlay { input, results, out_dir } => overlay(&input, &results, out_dir),
    };

    match outcome {
        Ok(files) => {
            for path in files.all() {
                println!("  {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("error: {}", human.message);
            eprintln!("  hint: {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn build_config(
    path: Option<&Path>,
    out_dir: Option<PathBuf>,
    no_split: bool,
    max_time: Option<u64>,
    no_pdfs: bool,
) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = out_dir {
        config.output.directory = dir;
    }
    if no_split {
        config.split_by_words = false;
    }
    if let Some(secs) = max_time {
        config.max_processing_time_sec = secs;
    }
    if no_pdfs {
        config.output.annotated_pdf = false;
        config.output.searchable_pdf = false;
        config.output.editable_pdf = false;
        config.output.reconstructed_pdf = false;
    }
    config.validate()?;
    Ok(config)
}

fn process(input: &Path, config: PipelineConfig, models: Option<PathBuf>) -> Result<OutputFiles> {
    let output = OutputWriter::new(config.output.clone());
    let pipeline = Pipeline::new(config, recognizer(models))?;
    let profiler = StageProfiler::new();

    let document = pipeline.process_observed(input, &profiler)?;
    let files = output.write(&document, input, Some(&profiler.report()))?;

    let metadata = document.metadata();
    println!(
        "{}: {} ({} pages, {} regions)",
        metadata.source.file_name,
        metadata.pdf_type,
        document.pages().len(),
        document.region_count()
    );
    for warning in &metadata.warnings {
        println!("  warning: {}", warning);
    }
    println!("Outputs in {}:", output.directory().display());
    Ok(files)
}

fn overlay(input: &Path, results: &Path, out_dir: Option<PathBuf>) -> Result<OutputFiles> {
    let json = std::fs::read_to_string(results)?;
    let document = Document::from_json(&json)?;
    let mut config = OutputConfig {
        reconstructed_pdf: true,
        ..OutputConfig::default()
    };
    if let Some(dir) = out_dir {
        config.directory = dir;
    }
    info!(pages = document.pages().len(), "regenerating overlays");
    let writer = OutputWriter::new(config);
    let files = writer.write_overlays(&document, input)?;
    println!("Overlays in {}:", writer.directory().display());
    Ok(files)
}

#[cfg(feature = "ocr")]
fn recognizer(models: Option<PathBuf>) -> Box<dyn TextRecognizer> {
    use glyfo_document::ocr::{LazyRecognizer, OcrConfig, OcrEngine};

    let config = models.map(OcrConfig::from_dir).unwrap_or_default();
    Box::new(LazyRecognizer::new(move || {
        let engine = OcrEngine::new(&config)?;
        Ok(Box::new(engine) as Box<dyn TextRecognizer>)
    }))
}

#[cfg(not(feature = "ocr"))]
fn recognizer(_models: Option<PathBuf>) -> Box<dyn TextRecognizer> {
    Box::new(glyfo_document::ocr::UnavailableRecognizer::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyfo_core::GlyfoError;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let config = build_config(None, Some(PathBuf::from("out")), true, Some(5), true).unwrap();
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert!(!config.split_by_words);
        assert_eq!(config.max_processing_time_sec, 5);
        assert!(!config.output.searchable_pdf);
        assert!(config.output.json);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = build_config(Some(Path::new("/nonexistent/glyfo.json")), None, false, None, false).err();
        assert!(matches!(err, Some(GlyfoError::Io(_))));
    }

    #[test]
    fn cli_parses_process_flags() {
        let cli = Cli::try_parse_from(["glyfo", "process", "in.pdf", "--no-split", "--max-time", "30"]).unwrap();
        match cli.command {
            Commands::Process { input, no_split, max_time, .. } => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert!(no_split);
                assert_eq!(max_time, Some(30));
            }
            Commands::Overlay { .. } => panic!("parsed the wrong subcommand"),
        }
    }
}
