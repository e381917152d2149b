//! Line extraction from flat files.
//!
//! Files are read sequentially and every non-empty line is kept in on-disk
//! order. Lines are decoded lossily, so stray non-UTF-8 bytes never cut a
//! file short. An I/O error partway through keeps the lines collected so far
//! and marks the result incomplete.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::report::{ScanEvent, ScanReporter};
use crate::types::FileLines;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Buffer size for file reads
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Reads the non-blank lines of one file.
#[derive(Clone)]
pub struct LineExtractor {
    reporter: Arc<dyn ScanReporter>,
}

impl std::fmt::Debug for LineExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineExtractor").finish()
    }
}

impl LineExtractor {
    /// Create an extractor that reports to `reporter`
    pub fn new(reporter: Arc<dyn ScanReporter>) -> Self {
        LineExtractor { reporter }
    }

    /// Extract the non-blank lines of the file at `path`.
    ///
    /// An unopenable file yields an empty, incomplete result. The only error
    /// returned is cancellation.
    pub fn extract(&self, path: &Path, cancel: &CancellationToken) -> Result<FileLines> {
        cancel.check()?;

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                self.reporter.report(ScanEvent::FileRead {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                    lines_read: 0,
                });
                return Ok(FileLines::unreadable(path));
            }
        };

        self.extract_from(
            BufReader::with_capacity(READ_BUFFER_SIZE, file),
            path,
            cancel,
        )
    }

    /// Extract lines from an already-open reader; `path` labels the result.
    pub fn extract_from<R: BufRead>(
        &self,
        mut reader: R,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<FileLines> {
        let mut lines = Vec::new();
        let mut buf = Vec::with_capacity(256);
        let mut complete = true;

        loop {
            cancel.check()?;

            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = strip_terminator(&buf);
                    if !line.is_empty() {
                        // Non-UTF-8 bytes (Latin-1 exports) are replaced, not fatal
                        lines.push(String::from_utf8_lossy(line).into_owned());
                    }
                }
                Err(e) => {
                    self.reporter.report(ScanEvent::FileRead {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                        lines_read: lines.len(),
                    });
                    complete = false;
                    break;
                }
            }
        }

        Ok(FileLines {
            path: path.to_path_buf(),
            lines,
            complete,
        })
    }
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ChannelReporter, NullReporter};
    use std::fs;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;

    fn extractor() -> LineExtractor {
        LineExtractor::new(Arc::new(NullReporter))
    }

    #[test]
    fn test_blank_lines_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("x.csv");
        // 6 lines, 2 of them empty
        fs::write(&path, "a,1\n\nb,2\r\n\r\nc,3\nd,4").unwrap();

        let lines = extractor()
            .extract(&path, &CancellationToken::new())
            .unwrap();

        assert!(lines.complete);
        assert_eq!(lines.lines, vec!["a,1", "b,2", "c,3", "d,4"]);
    }

    #[test]
    fn test_whitespace_lines_are_kept() {
        let reader = Cursor::new("  \nvalue\n");
        let lines = extractor()
            .extract_from(reader, Path::new("mem"), &CancellationToken::new())
            .unwrap();

        assert_eq!(lines.lines, vec!["  ", "value"]);
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let lines = extractor()
            .extract(&path, &CancellationToken::new())
            .unwrap();

        assert!(lines.is_empty());
        assert!(lines.complete);
    }

    #[test]
    fn test_unreadable_file() {
        let temp_dir = TempDir::new().unwrap();
        let (reporter, events) = ChannelReporter::new();
        let extractor = LineExtractor::new(Arc::new(reporter));

        let lines = extractor
            .extract(&temp_dir.path().join("gone.csv"), &CancellationToken::new())
            .unwrap();

        assert!(lines.is_empty());
        assert!(!lines.complete);
        assert!(matches!(
            events.try_recv().unwrap(),
            ScanEvent::FileRead { lines_read: 0, .. }
        ));
    }

    /// Yields `data`, then fails every later read.
    struct FailingReader {
        data: Cursor<Vec<u8>>,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.data.read(buf)? {
                0 => Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "device went away",
                )),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn test_partial_read_keeps_lines() {
        let reader = FailingReader {
            data: Cursor::new(b"first\nsecond\nthi".to_vec()),
        };

        let (reporter, events) = ChannelReporter::new();
        let extractor = LineExtractor::new(Arc::new(reporter));
        let lines = extractor
            .extract_from(
                BufReader::new(reader),
                Path::new("/data/mixed.csv"),
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(lines.lines, vec!["first", "second"]);
        assert!(!lines.complete);
        assert!(matches!(
            events.try_recv().unwrap(),
            ScanEvent::FileRead { lines_read: 2, .. }
        ));
    }

    #[test]
    fn test_non_utf8_lines_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("latin1.csv");
        fs::write(&path, b"a\ncaf\xe9\nb\nc\n").unwrap();

        let (reporter, events) = ChannelReporter::new();
        let extractor = LineExtractor::new(Arc::new(reporter));
        let lines = extractor
            .extract(&path, &CancellationToken::new())
            .unwrap();

        assert_eq!(lines.lines, vec!["a", "caf\u{fffd}", "b", "c"]);
        assert!(lines.complete);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_cancelled_extraction() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extractor()
            .extract_from(Cursor::new("a\nb\n"), Path::new("mem"), &cancel)
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
