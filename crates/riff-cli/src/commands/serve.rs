//! Serve command - answer file data requests over TCP.

use anyhow::Context;
use riff_core::{CancellationToken, Config, LoggingReporter, QueryHandler, ScanOptions, Scanner};
use riff_server::Server;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Run the serve command.
pub fn run(
    mut config: Config,
    port: Option<u16>,
    bind: Option<String>,
    paths_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(bind) = bind {
        config.server.bind_address = bind;
    }
    if let Some(paths_file) = paths_file {
        config.server.paths_file = paths_file;
    }

    let scanner = Scanner::new(
        ScanOptions::from_config(&config),
        Arc::new(LoggingReporter::new()),
    );
    let handler = Arc::new(QueryHandler::new(&config.server.paths_file, scanner));
    let server = Server::bind(&config.server, handler)?;

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        token.cancel();
    })
    .context("failed to install Ctrl+C handler")?;

    println!("riff {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Serving {} on {}",
        config.server.paths_file.display(),
        server.local_addr()?
    );
    println!("Press Ctrl+C to stop.");

    server.serve(&shutdown)?;

    println!("Server stopped.");
    Ok(())
}
