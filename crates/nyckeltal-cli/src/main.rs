mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nyckeltal",
    version,
    about = "Key-figure extraction from Swedish annual reports"
)]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract key figures from PDF reports (files or directories)
    Analyze {
        /// PDF files or directories searched recursively for PDFs
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Write the dataset to a JSON file
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// Oracle model (overrides the config file)
        #[arg(short, long)]
        model: Option<String>,

        /// JSON config file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Custom metric dictionary (default: built-in)
        #[arg(long, value_name = "FILE")]
        metrics: Option<PathBuf>,

        /// Custom extraction instructions (default: built-in)
        #[arg(long, value_name = "FILE")]
        instructions: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Try OCR and keep it when it recovers substantially more text
        #[arg(long)]
        ocr: bool,

        /// Extract text in reading order instead of keeping the page layout
        #[arg(long)]
        reading_order: bool,
    },
    /// Show how a document would be segmented (no oracle calls)
    Segment {
        /// PDF or plain text file
        input_file: PathBuf,

        /// Token budget per segment
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Overlap: token count ("200"), fraction ("0.1") or percent ("10%");
        /// "none" packs whole words without overlap
        #[arg(long)]
        overlap: Option<String>,

        /// Print full segment text instead of a summary
        #[arg(long)]
        full: bool,
    },
    /// Inspect metric dictionaries
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },
    /// Print the effective configuration as JSON
    Config {
        /// JSON config file to merge over the defaults
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MetricsAction {
    /// List metrics by group
    List {
        /// Metric dictionary (default: built-in)
        #[arg(long, value_name = "FILE")]
        metrics: Option<PathBuf>,
    },
    /// Validate a metric dictionary file
    Validate {
        /// Path to JSON metric dictionary
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            inputs,
            out,
            model,
            config,
            metrics,
            instructions,
            output,
            ocr,
            reading_order,
        } => commands::analyze::run(commands::analyze::AnalyzeArgs {
            inputs,
            out,
            model,
            config,
            metrics,
            instructions,
            output_format: output,
            ocr,
            reading_order,
        }),
        Commands::Segment {
            input_file,
            max_tokens,
            overlap,
            full,
        } => commands::segment::run(input_file, max_tokens, overlap, full),
        Commands::Metrics { action } => match action {
            MetricsAction::List { metrics } => commands::metrics::list(metrics.as_deref()),
            MetricsAction::Validate { file } => commands::metrics::validate(&file),
        },
        Commands::Config { config } => commands::config::show(config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
