//! Fetch command - request one file name from a running server.

use anyhow::{bail, Context};
use riff_core::{Config, ResponseBody};
use riff_server::Client;
use std::io::{self, Write};
use std::time::Duration;
use tracing::debug;

/// Run the fetch command.
pub fn run(
    config: Config,
    file_name: &str,
    addr: Option<String>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let addr = addr.unwrap_or_else(|| format!("127.0.0.1:{}", config.server.port));

    let mut client = Client::connect(addr.as_str())
        .with_context(|| format!("failed to connect to {}", addr))?;
    let response = client.get_file_data(file_name, timeout_ms.map(Duration::from_millis))?;

    match response.body {
        ResponseBody::Ok { data } => {
            debug!(request_id = %response.request_id, bytes = data.len(), "Response received");
            let mut stdout = io::stdout().lock();
            stdout.write_all(data.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        ResponseBody::Error { kind, message } => {
            bail!("request {} failed ({}): {}", response.request_id, kind, message)
        }
    }
}
