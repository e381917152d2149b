//! Blocking client for the query server.

use crate::codec::{write_frame, FrameReader};
use crate::error::{Result, ServerError};
use riff_core::{FileDataRequest, FileDataResponse};
use std::io::BufReader;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Responses carry whole file contents, so the inbound limit is far larger
/// than the server's request limit.
const MAX_RESPONSE_BYTES: usize = 256 * 1024 * 1024;

/// A connection to a query server.
///
/// Requests on one client are sequential; open several clients for
/// concurrent requests.
pub struct Client {
    writer: TcpStream,
    frames: FrameReader<BufReader<TcpStream>>,
}

impl Client {
    /// Connect to a running server
    pub fn connect(address: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(address)?;
        debug!(peer = %stream.peer_addr()?, "Connected");

        let reader = BufReader::new(stream.try_clone()?);
        Ok(Client {
            writer: stream,
            frames: FrameReader::new(reader, MAX_RESPONSE_BYTES),
        })
    }

    /// Bound how long a single read or write may block
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.writer.set_read_timeout(timeout)?;
        self.writer.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Send one request and wait for its response
    pub fn send(&mut self, request: &FileDataRequest) -> Result<FileDataResponse> {
        write_frame(&mut self.writer, request)?;

        let frame = self.frames.read_frame()?.ok_or(ServerError::ConnectionClosed)?;
        Ok(serde_json::from_slice(&frame)?)
    }

    /// Ask for the content of `file_name`, optionally with a server-side
    /// deadline
    pub fn get_file_data(
        &mut self,
        file_name: &str,
        timeout: Option<Duration>,
    ) -> Result<FileDataResponse> {
        let mut request = FileDataRequest::new(file_name);
        if let Some(timeout) = timeout {
            request = request.with_timeout(timeout);
        }
        self.send(&request)
    }
}
