//! Directory batch processing
//!
//! Walks an input tree, mirrors it under the output directory and records
//! every failed file in `errors/failed_files.txt` beneath the output root.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use ctxkg_core::{AnnotationSource, JsonAnnotationSource};
use ctxkg_extractor::{EdgeListGraph, TripleAssembler, TripleFile};
use futures::stream::{self, StreamExt};
use walkdir::WalkDir;

const FAILED_FILES: &str = "failed_files.txt";

#[derive(Debug, Clone, Copy)]
pub struct TripleOptions {
    pub jobs: usize,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct GraphOptions {
    pub clean: bool,
    pub overwrite: bool,
}

/// Outcome counts of one batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub found: usize,
    pub skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// One input file and where its output goes
#[derive(Debug, Clone)]
struct Job {
    input: PathBuf,
    output: PathBuf,
}

#[derive(Debug)]
struct Failure {
    path: PathBuf,
    error: String,
}

// ============================================================================
// Triples
// ============================================================================

/// Process every annotated document under `input_dir`
pub async fn run_triples(
    input_dir: &Path,
    output_dir: &Path,
    assembler: Arc<TripleAssembler>,
    options: TripleOptions,
) -> anyhow::Result<BatchSummary> {
    let inputs = collect_files(input_dir, "json")?;
    let mut summary = BatchSummary {
        found: inputs.len(),
        ..BatchSummary::default()
    };

    let (jobs, skipped) = plan_jobs(input_dir, output_dir, inputs, "csv", options.overwrite);
    summary.skipped = skipped;
    let total = jobs.len();
    tracing::info!(
        found = summary.found,
        skipped = summary.skipped,
        pending = total,
        "Starting triple extraction"
    );

    let mut results = stream::iter(jobs)
        .map(|job| {
            let assembler = Arc::clone(&assembler);
            async move {
                let input = job.input.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    extract_triples(&assembler, &job.input, &job.output)
                })
                .await;
                (input, outcome)
            }
        })
        .buffer_unordered(options.jobs.max(1));

    let mut failures = Vec::new();
    let mut processed = 0usize;
    while let Some((input, outcome)) = results.next().await {
        processed += 1;
        let result = outcome
            .map_err(anyhow::Error::from)
            .and_then(|inner| inner);
        match result {
            Ok(rows) => {
                summary.succeeded += 1;
                tracing::info!(
                    file = %input.display(),
                    rows,
                    "[{}/{}] {:.1}%",
                    processed,
                    total,
                    percent(processed, total)
                );
            }
            Err(e) => {
                tracing::warn!(file = %input.display(), error = %e, "Failed to extract triples");
                failures.push(Failure {
                    path: input,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    summary.failed = failures.len();
    write_failures(output_dir, &failures)?;
    Ok(summary)
}

/// All-or-nothing: the file is written only once the whole document succeeded
fn extract_triples(
    assembler: &TripleAssembler,
    input: &Path,
    output: &Path,
) -> anyhow::Result<usize> {
    let document = JsonAnnotationSource.load(input)?;
    let triples = assembler.process_document(&document)?;
    write_output(output, &triples.render())?;
    Ok(triples.len())
}

// ============================================================================
// Graphs
// ============================================================================

/// Build an edge-list graph for every triple file under `triple_dir`
///
/// Smaller files are handled first.
pub fn run_graphs(
    triple_dir: &Path,
    graph_dir: &Path,
    options: GraphOptions,
) -> anyhow::Result<BatchSummary> {
    let mut inputs = collect_files(triple_dir, "csv")?;
    inputs.sort_by_key(|path| fs::metadata(path).map(|m| m.len()).unwrap_or(u64::MAX));

    let mut summary = BatchSummary {
        found: inputs.len(),
        ..BatchSummary::default()
    };
    let (jobs, skipped) = plan_jobs(triple_dir, graph_dir, inputs, "json", options.overwrite);
    summary.skipped = skipped;
    let total = jobs.len();

    let mut failures = Vec::new();
    for (position, job) in jobs.into_iter().enumerate() {
        match build_graph(&job.input, &job.output, options.clean) {
            Ok(edges) => {
                summary.succeeded += 1;
                tracing::info!(
                    file = %job.input.display(),
                    edges,
                    "[{}/{}] {:.1}%",
                    position + 1,
                    total,
                    percent(position + 1, total)
                );
            }
            Err(e) => {
                tracing::warn!(file = %job.input.display(), error = %e, "Failed to build graph");
                failures.push(Failure {
                    path: job.input,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    summary.failed = failures.len();
    write_failures(graph_dir, &failures)?;
    Ok(summary)
}

fn build_graph(input: &Path, output: &Path, clean: bool) -> anyhow::Result<usize> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let file = TripleFile::parse(&text)?;
    let document = file
        .source
        .unwrap_or_else(|| input.display().to_string());

    let mut graph = EdgeListGraph::from_rows(document, &file.rows);
    if clean {
        graph.clean();
    }
    write_output(output, &graph.to_json()?)?;
    Ok(graph.edges().len())
}

// ============================================================================
// Helpers
// ============================================================================

/// Files under `dir` with the given extension, in path order
fn collect_files(dir: &Path, extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    Ok(WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| path.extension().map(|ext| ext == extension).unwrap_or(false))
        .collect())
}

/// Mirror inputs under `output_root`, setting aside those already done
fn plan_jobs(
    input_root: &Path,
    output_root: &Path,
    inputs: Vec<PathBuf>,
    extension: &str,
    overwrite: bool,
) -> (Vec<Job>, usize) {
    let mut jobs = Vec::new();
    let mut skipped = 0;

    for input in inputs {
        let relative = input.strip_prefix(input_root).unwrap_or(&input);
        let output = output_root.join(relative).with_extension(extension);
        if output.exists() && !overwrite {
            tracing::debug!(file = %input.display(), "Output exists, skipping");
            skipped += 1;
            continue;
        }
        jobs.push(Job { input, output });
    }

    (jobs, skipped)
}

/// Write through a sibling `.tmp` file so a partial write never lands at `path`
fn write_output(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = temp_path(path);
    fs::write(&tmp, contents).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {}", tmp.display()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Append `<timestamp>: <path> - <error>` lines to the failure report
fn write_failures(output_root: &Path, failures: &[Failure]) -> anyhow::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    let dir = output_root.join("errors");
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(FAILED_FILES);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let timestamp = Utc::now().to_rfc3339();
    for failure in failures {
        writeln!(
            file,
            "{}: {} - {}",
            timestamp,
            failure.path.display(),
            failure.error
        )?;
    }

    tracing::warn!(
        count = failures.len(),
        report = %path.display(),
        "Some files failed"
    );
    Ok(())
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

// ============================================================================
// Tests
// ============================================================================
