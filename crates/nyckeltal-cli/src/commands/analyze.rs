use nyckeltal_core::analysis::{Analyzer, DocumentOutcome};
use nyckeltal_core::error::NyckeltalError;
use nyckeltal_core::extraction::ocr::OcrEnhancedExtractor;
use nyckeltal_core::extraction::pdftotext::PdftotextExtractor;
use nyckeltal_core::oracle::openai::OpenAiClient;
use nyckeltal_core::oracle::ThreadSleeper;
use nyckeltal_core::segment::tokenizer::PieceTokenizer;
use std::path::PathBuf;

use super::{config_or_default, metrics_or_builtin};
use crate::output;

pub struct AnalyzeArgs {
    pub inputs: Vec<PathBuf>,
    pub out: Option<PathBuf>,
    pub model: Option<String>,
    pub config: Option<PathBuf>,
    pub metrics: Option<PathBuf>,
    pub instructions: Option<PathBuf>,
    pub output_format: String,
    pub ocr: bool,
    pub reading_order: bool,
}

pub fn run(args: AnalyzeArgs) -> Result<(), NyckeltalError> {
    let mut config = config_or_default(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if args.ocr {
        config.ocr.enabled = true;
    }
    let metrics = metrics_or_builtin(args.metrics.as_deref())?;
    tracing::debug!(model = %config.model, metrics = metrics.len(), "configuration loaded");

    let paths = nyckeltal_core::discover_inputs(&args.inputs)?;
    if paths.is_empty() {
        return Err(NyckeltalError::Config("no PDF files found in the given inputs".into()));
    }

    if !PdftotextExtractor::is_available() {
        return Err(NyckeltalError::PdftotextNotFound);
    }
    let pdftotext = if args.reading_order {
        PdftotextExtractor::reading_order()
    } else {
        PdftotextExtractor::new()
    };

    let oracle = OpenAiClient::from_env(&config.oracle)?;
    let extractor = OcrEnhancedExtractor::new(pdftotext, config.ocr.clone());
    let mut analyzer = Analyzer::new(&oracle, &PieceTokenizer, &ThreadSleeper, config, metrics)?;
    if let Some(path) = &args.instructions {
        analyzer = analyzer.with_instructions(std::fs::read_to_string(path)?);
    }

    let outcome = nyckeltal_core::analyze_pdfs(&paths, &extractor, &analyzer)?;

    for doc in &outcome.documents {
        match doc {
            DocumentOutcome::Analyzed(_) => {}
            DocumentOutcome::SkippedEmpty { name } => {
                eprintln!("  skipped {name}: no text could be extracted (scanned?)")
            }
            DocumentOutcome::SkippedUnreadable { name, reason } => {
                eprintln!("  skipped {name}: {reason}")
            }
        }
    }

    let Some(dataset) = outcome.dataset.as_ref() else {
        eprintln!("No key figures were extracted from {} file(s).", paths.len());
        return Ok(());
    };

    if let Some(path) = &args.out {
        output::json::write(dataset, path)?;
        eprintln!(
            "Analyzed {} file(s), {} entit(ies), written to {}",
            outcome.analyzed().count(),
            dataset.entities.len(),
            path.display()
        );
    }

    match args.output_format.as_str() {
        "json" => output::json::print(dataset)?,
        _ => {
            output::table::print_documents(&outcome);
            output::table::print_dataset(dataset, analyzer.metrics());
        }
    }

    Ok(())
}
