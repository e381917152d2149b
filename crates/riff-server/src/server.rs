//! Blocking query server.
//!
//! One listener thread polls a non-blocking accept loop and hands every
//! connection to its own thread. Connections carry any number of request
//! frames; each request runs under a child of the shutdown token with its own
//! deadline, so shutting the server down also cancels in-flight scans.

use crate::codec::{write_frame, FrameReader, MAX_FRAME_BYTES};
use crate::error::{Result, ServerError};
use parking_lot::Mutex;
use riff_core::config::ServerConfig;
use riff_core::{CancellationToken, FileDataRequest, FileDataResponse, QueryHandler, RiffError};
use std::io::{BufReader, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Tuning for a [`Server`].
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Deadline for requests that do not carry their own
    pub request_timeout: Duration,

    /// Largest accepted request frame
    pub max_frame_bytes: usize,

    /// How often idle loops check for shutdown
    pub poll_interval: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            request_timeout: Duration::from_secs(30),
            max_frame_bytes: MAX_FRAME_BYTES,
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        ServerOptions {
            request_timeout: config.request_timeout(),
            max_frame_bytes: config.max_frame_bytes,
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_frame_bytes(mut self, limit: usize) -> Self {
        self.max_frame_bytes = limit;
        self
    }
}

/// A bound query server.
pub struct Server {
    listener: TcpListener,
    handler: Arc<QueryHandler>,
    options: ServerOptions,
    connections: Mutex<Vec<JoinHandle<()>>>,
}

impl Server {
    /// Bind the address named by the `[server]` configuration section
    pub fn bind(config: &ServerConfig, handler: Arc<QueryHandler>) -> Result<Self> {
        Self::bind_with(
            &config.listen_address(),
            handler,
            ServerOptions::from_config(config),
        )
    }

    /// Bind an explicit address with explicit options
    pub fn bind_with(
        address: &str,
        handler: Arc<QueryHandler>,
        options: ServerOptions,
    ) -> Result<Self> {
        let listener = TcpListener::bind(address).map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })?;

        Ok(Server {
            listener,
            handler,
            options,
            connections: Mutex::new(Vec::new()),
        })
    }

    /// The address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled, then wait for every
    /// connection thread to finish.
    #[instrument(skip_all)]
    pub fn serve(&self, shutdown: &CancellationToken) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        info!(
            address = %self.local_addr()?,
            manifest = %self.handler.manifest_path().display(),
            "Server listening"
        );

        while !shutdown.is_cancelled() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.spawn_connection(stream, peer, shutdown)?,
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(self.options.poll_interval);
                }
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    thread::sleep(self.options.poll_interval);
                }
            }
            self.connections.lock().retain(|handle| !handle.is_finished());
        }

        let handles = std::mem::take(&mut *self.connections.lock());
        info!(connections = handles.len(), "Server shutting down");
        for handle in handles {
            if handle.join().is_err() {
                warn!("Connection thread panicked");
            }
        }

        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        debug!(peer = %peer, "Connection accepted");

        let connection = Connection {
            handler: Arc::clone(&self.handler),
            options: self.options.clone(),
            shutdown: shutdown.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("riff-conn-{}", peer))
            .spawn(move || match connection.run(stream) {
                Ok(()) => debug!(peer = %peer, "Connection closed"),
                Err(e) => warn!(peer = %peer, error = %e, "Connection failed"),
            })?;

        self.connections.lock().push(handle);
        Ok(())
    }
}

struct Connection {
    handler: Arc<QueryHandler>,
    options: ServerOptions,
    shutdown: CancellationToken,
}

impl Connection {
    fn run(&self, stream: TcpStream) -> Result<()> {
        // Some platforms hand out accepted sockets in the listener's mode
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.options.poll_interval))?;

        let mut writer = stream.try_clone()?;
        let mut frames = FrameReader::new(BufReader::new(stream), self.options.max_frame_bytes);

        while !self.shutdown.is_cancelled() {
            let frame = match frames.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if e.is_timeout() => continue,
                Err(ServerError::FrameTooLarge { limit }) => {
                    let err =
                        RiffError::invalid_request(format!("request exceeds {} bytes", limit));
                    write_frame(&mut writer, &self.handler.reject(&err))?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if frame.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let response = self.respond(&frame);
            write_frame(&mut writer, &response)?;
        }

        Ok(())
    }

    fn respond(&self, frame: &[u8]) -> FileDataResponse {
        match serde_json::from_slice::<FileDataRequest>(frame) {
            Ok(request) => {
                let timeout = request.timeout().unwrap_or(self.options.request_timeout);
                let cancel = self.shutdown.child_with_timeout(timeout);
                self.handler.handle(&request, &cancel)
            }
            Err(e) => {
                let err = RiffError::invalid_request(format!("undecodable request: {}", e));
                self.handler.reject(&err)
            }
        }
    }
}
