//! # Riff CLI
//!
//! Command-line interface for Riff.
//!
//! ## Commands
//!
//! - `riff scan <manifest>` - Print the lines of every file the manifest selects
//! - `riff serve` - Answer file data requests over TCP
//! - `riff fetch <file-name>` - Ask a running server for one file name
//!
//! ## Example Usage
//!
//! ```bash
//! # Batch scan with 4 workers, printing every line
//! riff scan paths.txt --workers 4 --lines
//!
//! # Serve the manifest in ./paths.txt on port 10000
//! riff serve
//!
//! # Fetch prices.csv from every manifest directory
//! riff fetch prices.csv --addr 127.0.0.1:10000
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Riff - Deliver flat-file lines selected by a manifest
#[derive(Parser)]
#[command(name = "riff")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every pattern of a manifest
    Scan {
        /// Manifest file, one directory/glob pattern per line
        manifest: PathBuf,

        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Sort matched files within each pattern
        #[arg(short, long)]
        sort: bool,

        /// Print every extracted line, not just per-file counts
        #[arg(short, long)]
        lines: bool,

        /// Give up after this many seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Serve file data requests
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(short, long)]
        bind: Option<String>,

        /// Manifest re-read on every request
        #[arg(long)]
        paths_file: Option<PathBuf>,
    },

    /// Request one file name from a running server
    Fetch {
        /// File name looked up in every manifest directory
        file_name: String,

        /// Server address (defaults to 127.0.0.1 and the configured port)
        #[arg(short, long)]
        addr: Option<String>,

        /// Server-side deadline in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => riff_core::Config::load_from(path)?,
        None => riff_core::Config::load()?,
    };

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.general.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Scan {
            manifest,
            workers,
            sort,
            lines,
            timeout,
            output,
        } => commands::scan::run(config, &manifest, workers, sort, lines, timeout, output),
        Commands::Serve {
            port,
            bind,
            paths_file,
        } => commands::serve::run(config, port, bind, paths_file),
        Commands::Fetch {
            file_name,
            addr,
            timeout_ms,
        } => commands::fetch::run(config, &file_name, addr, timeout_ms),
    }
}
