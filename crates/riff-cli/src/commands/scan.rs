//! Scan command - batch scan of a manifest.

use crate::OutputFormat;
use anyhow::Context;
use riff_core::{
    CancellationToken, CollectingSink, Config, LoggingReporter, Manifest, ScanOptions,
    ScanSummary, Scanner, WriterSink,
};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Run the scan command.
pub fn run(
    config: Config,
    manifest_path: &Path,
    workers: Option<usize>,
    sort: bool,
    lines: bool,
    timeout: Option<u64>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let mut options = ScanOptions::from_config(&config);
    if let Some(workers) = workers {
        options = options.with_workers(workers);
    }
    if sort {
        options = options.with_sorted_matches(true);
    }

    let manifest = Manifest::read(manifest_path)
        .with_context(|| format!("cannot scan {}", manifest_path.display()))?;
    let scanner = Scanner::new(options, Arc::new(LoggingReporter::new()));

    let cancel = match timeout {
        Some(secs) => CancellationToken::with_timeout(Duration::from_secs(secs)),
        None => CancellationToken::new(),
    };

    match output {
        OutputFormat::Text => {
            let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());

            println!("riff {}", env!("CARGO_PKG_VERSION"));
            println!("CPU count: {} ({} workers)", cpus, scanner.workers());
            println!("Processing the following path(s):");
            for pattern in &manifest {
                println!("  {}", pattern);
            }
            println!();

            let sink = WriterSink::new(io::stdout()).show_lines(lines);
            let summary = scanner.run_batch(&manifest, &sink, &cancel)?;

            print_summary(&summary);
            println!("Finished.");
        }
        OutputFormat::Json => {
            let sink = CollectingSink::new();
            let summary = scanner.run_batch(&manifest, &sink, &cancel)?;

            let report = serde_json::json!({
                "summary": summary,
                "results": sink.into_ordered(),
            });

            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &report)?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}

fn print_summary(summary: &ScanSummary) {
    eprintln!();
    eprintln!(
        "Scanned {} patterns ({} invalid) in {:.3}s",
        summary.patterns,
        summary.invalid_patterns,
        summary.elapsed().num_milliseconds() as f64 / 1000.0
    );
    eprintln!(
        "  {} files, {} unreadable, {} lines",
        summary.files_matched, summary.files_failed, summary.lines
    );
}
