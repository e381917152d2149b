//! Newline-delimited JSON framing.
//!
//! Every message is one JSON document followed by `\n`. JSON string escaping
//! guarantees the payload itself never contains a raw newline, so the line
//! terminator is an unambiguous frame boundary.

use crate::error::{Result, ServerError};
use serde::Serialize;
use std::io::{BufRead, Write};

/// Default limit on a single inbound frame
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Serialize `value` as one frame and flush it.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(b'\n');
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Incremental frame reader.
///
/// Bytes of a partially received frame survive read timeouts, so the reader
/// can sit on a socket with a short read timeout and be polled repeatedly.
pub struct FrameReader<R> {
    reader: R,
    pending: Vec<u8>,
    max_frame_bytes: usize,
    discarding: bool,
}

impl<R: BufRead> FrameReader<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        FrameReader {
            reader,
            pending: Vec::new(),
            max_frame_bytes,
            discarding: false,
        }
    }

    /// Read the next frame without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream. Unterminated trailing bytes are
    /// returned as a final frame. Timeouts surface as `ServerError::Io` and
    /// leave any partial frame buffered for the next call. After
    /// `FrameTooLarge` the remainder of the offending line is skipped, so the
    /// stream stays usable.
    pub fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let available = self.reader.fill_buf()?;

            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            let newline = available.iter().position(|&b| b == b'\n');

            if self.discarding {
                let skip = newline.map_or(available.len(), |end| end + 1);
                self.discarding = newline.is_none();
                self.reader.consume(skip);
                continue;
            }

            match newline {
                Some(end) => {
                    self.pending.extend_from_slice(&available[..end]);
                    self.reader.consume(end + 1);
                    self.check_size(true)?;
                    let mut frame = std::mem::take(&mut self.pending);
                    if frame.last() == Some(&b'\r') {
                        frame.pop();
                    }
                    return Ok(Some(frame));
                }
                None => {
                    let len = available.len();
                    self.pending.extend_from_slice(available);
                    self.reader.consume(len);
                    self.check_size(false)?;
                }
            }
        }
    }

    fn check_size(&mut self, terminated: bool) -> Result<()> {
        if self.pending.len() > self.max_frame_bytes {
            self.discarding = !terminated;
            self.pending.clear();
            return Err(ServerError::FrameTooLarge {
                limit: self.max_frame_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riff_core::FileDataRequest;
    use std::io::{BufReader, Cursor, Read};

    #[test]
    fn test_frames_split_on_newline() {
        let mut frames = FrameReader::new(Cursor::new(b"one\ntwo\r\n\nthree".to_vec()), 64);

        assert_eq!(frames.read_frame().unwrap(), Some(b"one".to_vec()));
        assert_eq!(frames.read_frame().unwrap(), Some(b"two".to_vec()));
        assert_eq!(frames.read_frame().unwrap(), Some(Vec::new()));
        assert_eq!(frames.read_frame().unwrap(), Some(b"three".to_vec()));
        assert_eq!(frames.read_frame().unwrap(), None);
    }

    #[test]
    fn test_frame_across_buffer_refills() {
        // A 2-byte buffer forces every frame to span several fill_buf calls
        let reader = BufReader::with_capacity(2, Cursor::new(b"abcdef\ngh\n".to_vec()));
        let mut frames = FrameReader::new(reader, 64);

        assert_eq!(frames.read_frame().unwrap(), Some(b"abcdef".to_vec()));
        assert_eq!(frames.read_frame().unwrap(), Some(b"gh".to_vec()));
        assert_eq!(frames.read_frame().unwrap(), None);
    }

    #[test]
    fn test_frame_too_large() {
        let mut frames = FrameReader::new(Cursor::new(vec![b'x'; 100]), 10);
        let err = frames.read_frame().unwrap_err();
        assert!(matches!(err, ServerError::FrameTooLarge { limit: 10 }));
    }

    #[test]
    fn test_oversized_line_skipped() {
        let mut input = vec![b'x'; 40];
        input.extend_from_slice(b"\nok\n");
        let reader = BufReader::with_capacity(8, Cursor::new(input));
        let mut frames = FrameReader::new(reader, 10);

        assert!(frames.read_frame().is_err());
        assert_eq!(frames.read_frame().unwrap(), Some(b"ok".to_vec()));
        assert_eq!(frames.read_frame().unwrap(), None);
    }

    /// Returns a timeout once before yielding the rest of its data.
    struct Stutter {
        parts: Vec<Option<Vec<u8>>>,
    }

    impl Read for Stutter {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.parts.is_empty() {
                return Ok(0);
            }
            match self.parts.remove(0) {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                None => Err(std::io::Error::from(std::io::ErrorKind::WouldBlock)),
            }
        }
    }

    #[test]
    fn test_partial_frame_survives_timeout() {
        let stutter = Stutter {
            parts: vec![Some(b"hel".to_vec()), None, Some(b"lo\n".to_vec())],
        };
        let mut frames = FrameReader::new(BufReader::new(stutter), 64);

        let err = frames.read_frame().unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(frames.read_frame().unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn test_write_frame() {
        let mut out = Vec::new();
        write_frame(&mut out, &FileDataRequest::new("x.csv")).unwrap();
        assert_eq!(out, b"{\"file_name\":\"x.csv\"}\n");
    }
}
