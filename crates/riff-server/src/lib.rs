//! # Riff Server
//!
//! Query-mode transport for Riff: newline-delimited JSON over TCP.
//!
//! A client sends one [`FileDataRequest`](riff_core::FileDataRequest) per
//! line and receives one [`FileDataResponse`](riff_core::FileDataResponse)
//! per line, in order. The same connection may carry any number of requests.
//!
//! ```no_run
//! use riff_server::Client;
//!
//! let mut client = Client::connect("127.0.0.1:10000")?;
//! let response = client.get_file_data("prices.csv", None)?;
//! print!("{}", response.data().unwrap_or_default());
//! # Ok::<(), riff_server::ServerError>(())
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod server;

pub use client::Client;
pub use codec::{FrameReader, MAX_FRAME_BYTES};
pub use error::{Result, ServerError};
pub use server::{Server, ServerOptions};
