//! ctxkg CLI - Command-line interface
//!
//! Usage:
//!   ctxkg triples <INPUT_DIR> <OUTPUT_DIR> [--overwrite] [--jobs N]
//!   ctxkg graphs <TRIPLE_DIR> <GRAPH_DIR> [--clean] [--overwrite]
//!   ctxkg process <FILE>

mod batch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use ctxkg_core::{AnnotationSource, AppConfig, JsonAnnotationSource, LoggingConfig};
use ctxkg_extractor::TripleAssembler;
use tracing_subscriber::EnvFilter;

use crate::batch::{run_graphs, run_triples, GraphOptions, TripleOptions};

#[derive(Parser)]
#[command(name = "ctxkg")]
#[command(about = "Build knowledge-graph edge lists from OpenIE extractions")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write one triple file per annotated document
    Triples {
        /// Directory of annotated documents (*.json)
        input_dir: PathBuf,
        /// Directory the triple files are written to
        output_dir: PathBuf,
        /// Rewrite triple files that already exist
        #[arg(long)]
        overwrite: bool,
        /// Documents processed concurrently
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Build edge-list graphs from triple files
    Graphs {
        /// Directory of triple files (*.csv)
        triple_dir: PathBuf,
        /// Directory the graphs are written to
        graph_dir: PathBuf,
        /// Drop duplicate edges, self-loops and orphan entities
        #[arg(long)]
        clean: bool,
        /// Rewrite graphs that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the triple file of a single annotated document
    Process {
        /// Annotated document (*.json)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let assembler = Arc::new(TripleAssembler::from_config(&config));

    match cli.command {
        Commands::Triples {
            input_dir,
            output_dir,
            overwrite,
            jobs,
        } => {
            let options = TripleOptions {
                jobs: jobs.unwrap_or(config.processing.jobs).max(1),
                overwrite: overwrite || config.processing.overwrite,
            };
            let summary = run_triples(&input_dir, &output_dir, assembler, options).await?;
            tracing::info!(
                found = summary.found,
                skipped = summary.skipped,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Triple extraction finished"
            );
        }
        Commands::Graphs {
            triple_dir,
            graph_dir,
            clean,
            overwrite,
        } => {
            let options = GraphOptions {
                clean,
                overwrite: overwrite || config.processing.overwrite,
            };
            let summary = run_graphs(&triple_dir, &graph_dir, options)?;
            tracing::info!(
                found = summary.found,
                skipped = summary.skipped,
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Graph building finished"
            );
        }
        Commands::Process { file } => {
            let document = JsonAnnotationSource.load(&file)?;
            let output = assembler.process_document(&document)?;
            print!("{}", output.render());
        }
    }

    Ok(())
}

/// Config file (if any) with environment overrides applied
fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    Ok(config.with_env_override()?)
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}
