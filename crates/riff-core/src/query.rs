//! Query-mode request handling.
//!
//! A [`QueryHandler`] turns one [`FileDataRequest`] into one
//! [`FileDataResponse`]. The manifest is re-read for every request, every
//! pattern is narrowed to the requested file name, and the extracted lines
//! are concatenated in manifest order. Failures come back as structured
//! error responses so a serving process never goes down because of a single
//! request.
//!
//! ## Wire shape
//!
//! ```text
//! {"file_name": "x.csv", "timeout_ms": 5000}
//! {"request_id": 7, "status": "ok", "data": "a,1\nb,2\n"}
//! {"request_id": 8, "status": "error", "kind": "manifest_unreadable", "message": "..."}
//! ```

use crate::cancel::CancellationToken;
use crate::error::{FailureKind, Result, RiffError};
use crate::manifest::Manifest;
use crate::scan::Scanner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Identifier assigned to every handled request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic request id source, safe to share between threads.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    last: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id; the first is 1 and no two calls return the same value.
    pub fn next(&self) -> RequestId {
        RequestId(self.last.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// A request for the content of one file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDataRequest {
    /// File name (or file-name glob) looked up in every manifest directory
    pub file_name: String,

    /// Optional deadline for this request in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl FileDataRequest {
    /// Create a request without its own deadline
    pub fn new(file_name: impl Into<String>) -> Self {
        FileDataRequest {
            file_name: file_name.into(),
            timeout_ms: None,
        }
    }

    /// Attach a deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    /// The requested deadline, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Check that `file_name` names a file (or compiles as a single-level
    /// file-name glob) and cannot climb out of a manifest directory.
    pub fn validate(&self) -> Result<()> {
        let name = self.file_name.as_str();
        if name.is_empty() {
            return Err(RiffError::invalid_request("file name is empty"));
        }
        if name.contains(std::path::is_separator) {
            return Err(RiffError::invalid_request(format!(
                "file name '{}' contains a path separator",
                name
            )));
        }
        if name == "." || name == ".." {
            return Err(RiffError::invalid_request(format!(
                "file name '{}' is not a file",
                name
            )));
        }
        // `**` would descend below the manifest directory
        if name.contains("**") {
            return Err(RiffError::invalid_request(format!(
                "file name '{}' contains a recursive wildcard",
                name
            )));
        }
        if let Err(e) = glob::Pattern::new(name) {
            return Err(RiffError::invalid_request(format!(
                "file name '{}' is not a valid glob: {}",
                name, e
            )));
        }
        Ok(())
    }
}

/// Outcome carried by a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseBody {
    /// Aggregated lines, each terminated by `\n`; empty when nothing matched
    Ok { data: String },

    /// The request could not be answered
    Error { kind: FailureKind, message: String },
}

/// Response to a [`FileDataRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDataResponse {
    /// Unique per handled request
    pub request_id: RequestId,

    #[serde(flatten)]
    pub body: ResponseBody,
}

impl FileDataResponse {
    /// Successful response
    pub fn ok(request_id: RequestId, data: String) -> Self {
        FileDataResponse {
            request_id,
            body: ResponseBody::Ok { data },
        }
    }

    /// Failure response describing `err`
    pub fn failure(request_id: RequestId, err: &RiffError) -> Self {
        FileDataResponse {
            request_id,
            body: ResponseBody::Error {
                kind: err.failure_kind(),
                message: err.to_string(),
            },
        }
    }

    /// True for a successful response (including an empty one)
    pub fn is_ok(&self) -> bool {
        matches!(self.body, ResponseBody::Ok { .. })
    }

    /// Content of a successful response
    pub fn data(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Ok { data } => Some(data),
            ResponseBody::Error { .. } => None,
        }
    }

    /// Failure kind of an error response
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.body {
            ResponseBody::Ok { .. } => None,
            ResponseBody::Error { kind, .. } => Some(*kind),
        }
    }
}

/// Answers file data requests against a manifest on disk.
#[derive(Debug)]
pub struct QueryHandler {
    manifest_path: PathBuf,
    scanner: Scanner,
    ids: RequestIdGenerator,
}

impl QueryHandler {
    /// Create a handler that re-reads `manifest_path` on every request
    pub fn new(manifest_path: impl Into<PathBuf>, scanner: Scanner) -> Self {
        QueryHandler {
            manifest_path: manifest_path.into(),
            scanner,
            ids: RequestIdGenerator::new(),
        }
    }

    /// The manifest this handler reads
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Handle one request.
    ///
    /// Never fails: errors are folded into the response body.
    pub fn handle(
        &self,
        request: &FileDataRequest,
        cancel: &CancellationToken,
    ) -> FileDataResponse {
        let request_id = self.ids.next();
        let start = Instant::now();

        match self.collect(request, cancel) {
            Ok(data) => {
                info!(
                    request_id = %request_id,
                    file_name = %request.file_name,
                    bytes = data.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Request served"
                );
                FileDataResponse::ok(request_id, data)
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    file_name = %request.file_name,
                    error = %e,
                    "Request failed"
                );
                FileDataResponse::failure(request_id, &e)
            }
        }
    }

    /// Build a failure response for a request that never reached `handle`
    /// (for example an undecodable frame). Still consumes a request id.
    pub fn reject(&self, err: &RiffError) -> FileDataResponse {
        let request_id = self.ids.next();
        warn!(request_id = %request_id, error = %err, "Request rejected");
        FileDataResponse::failure(request_id, err)
    }

    fn collect(&self, request: &FileDataRequest, cancel: &CancellationToken) -> Result<String> {
        request.validate()?;

        let manifest = Manifest::read(&self.manifest_path)?;
        let mut data = String::new();

        for pattern in &manifest {
            let result = self.scanner.run_query(pattern, &request.file_name, cancel)?;
            result.write_content(&mut data);
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NullReporter;
    use crate::scan::ScanOptions;
    use std::collections::HashSet;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        temp_dir: TempDir,
        handler: QueryHandler,
    }

    /// Manifest: dataA/, dataB/ (missing), dataC/*.csv
    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let data_a = root.join("dataA");
        let data_c = root.join("dataC");
        fs::create_dir(&data_a).unwrap();
        fs::create_dir(&data_c).unwrap();
        fs::write(data_a.join("x.csv"), "a1\n\na2\na3\n").unwrap();
        fs::write(data_a.join("y.csv"), "ya\n").unwrap();
        fs::write(data_c.join("x.csv"), "c1\n").unwrap();
        fs::write(data_c.join("x.txt"), "never\n").unwrap();

        let manifest = root.join("paths.txt");
        fs::write(
            &manifest,
            format!(
                "{}/\n\n{}/\n{}/*.csv\n",
                data_a.display(),
                root.join("dataB").display(),
                data_c.display()
            ),
        )
        .unwrap();

        let options = ScanOptions::default().with_sorted_matches(true);
        let scanner = Scanner::new(options, Arc::new(NullReporter));
        Fixture {
            handler: QueryHandler::new(manifest, scanner),
            temp_dir,
        }
    }

    #[test]
    fn test_concatenates_in_manifest_order() {
        let fx = fixture();
        let response = fx
            .handler
            .handle(&FileDataRequest::new("x.csv"), &CancellationToken::new());

        assert!(response.is_ok());
        assert_eq!(response.data(), Some("a1\na2\na3\nc1\n"));
    }

    #[test]
    fn test_narrowed_by_pattern_glob() {
        let fx = fixture();
        let response = fx
            .handler
            .handle(&FileDataRequest::new("x.txt"), &CancellationToken::new());

        assert_eq!(response.data(), Some(""));
    }

    #[test]
    fn test_idempotent_content_distinct_ids() {
        let fx = fixture();
        let cancel = CancellationToken::new();
        let first = fx.handler.handle(&FileDataRequest::new("x.csv"), &cancel);
        let second = fx.handler.handle(&FileDataRequest::new("x.csv"), &cancel);

        assert_eq!(first.body, second.body);
        assert_ne!(first.request_id, second.request_id);
        assert!(second.request_id > first.request_id);
    }

    #[test]
    fn test_concurrent_requests_get_unique_ids() {
        let fx = fixture();
        let handler = &fx.handler;

        let responses: Vec<(String, FileDataResponse)> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let name = if i % 2 == 0 { "x.csv" } else { "y.csv" };
                    s.spawn(move || {
                        let response =
                            handler.handle(&FileDataRequest::new(name), &CancellationToken::new());
                        (name.to_string(), response)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ids: HashSet<RequestId> = responses.iter().map(|(_, r)| r.request_id).collect();
        assert_eq!(ids.len(), responses.len());

        for (name, response) in &responses {
            let expected = if name == "x.csv" { "a1\na2\na3\nc1\n" } else { "ya\n" };
            assert_eq!(response.data(), Some(expected));
        }
    }

    #[test]
    fn test_manifest_failure_is_structured() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = Scanner::new(ScanOptions::default(), Arc::new(NullReporter));
        let handler = QueryHandler::new(temp_dir.path().join("missing.txt"), scanner);

        let response = handler.handle(&FileDataRequest::new("x.csv"), &CancellationToken::new());

        assert!(!response.is_ok());
        assert_eq!(response.failure_kind(), Some(FailureKind::ManifestUnreadable));
        assert_eq!(response.request_id, RequestId(1));
    }

    #[test]
    fn test_invalid_file_names() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        for name in ["", "..", "../etc/passwd", "sub/x.csv", "**", "x**", "[x"] {
            let response = fx.handler.handle(&FileDataRequest::new(name), &cancel);
            assert_eq!(
                response.failure_kind(),
                Some(FailureKind::InvalidRequest),
                "name {:?}",
                name
            );
        }
    }

    #[test]
    fn test_malformed_glob_is_not_empty_success() {
        let fx = fixture();
        let cancel = CancellationToken::new();

        let malformed = fx.handler.handle(&FileDataRequest::new("[x"), &cancel);
        assert!(!malformed.is_ok());
        assert_eq!(malformed.data(), None);
        assert_eq!(malformed.failure_kind(), Some(FailureKind::InvalidRequest));

        let glob = fx.handler.handle(&FileDataRequest::new("x.cs?"), &cancel);
        assert_eq!(glob.data(), Some("a1\na2\na3\nc1\n"));
    }

    #[test]
    fn test_recursive_wildcard_rejected() {
        let fx = fixture();
        let nested = fx.temp_dir.path().join("dataA").join("deep");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("x.csv"), "hidden\n").unwrap();

        let response = fx
            .handler
            .handle(&FileDataRequest::new("**"), &CancellationToken::new());
        assert_eq!(response.failure_kind(), Some(FailureKind::InvalidRequest));
        assert!(FileDataRequest::new("x.csv").validate().is_ok());
    }

    #[test]
    fn test_expired_deadline() {
        let fx = fixture();
        let cancel = CancellationToken::with_timeout(Duration::ZERO);

        let response = fx.handler.handle(&FileDataRequest::new("x.csv"), &cancel);
        assert_eq!(response.failure_kind(), Some(FailureKind::DeadlineExceeded));
    }

    #[test]
    fn test_reject_consumes_id() {
        let fx = fixture();
        let rejected = fx.handler.reject(&RiffError::invalid_request("bad frame"));
        let served = fx
            .handler
            .handle(&FileDataRequest::new("x.csv"), &CancellationToken::new());

        assert_eq!(rejected.failure_kind(), Some(FailureKind::InvalidRequest));
        assert_ne!(rejected.request_id, served.request_id);
    }

    #[test]
    fn test_response_json_shape() {
        let ok = FileDataResponse::ok(RequestId(7), "a\n".to_string());
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"request_id": 7, "status": "ok", "data": "a\n"})
        );

        let err = FileDataResponse::failure(RequestId(8), &RiffError::invalid_request("empty"));
        let text = serde_json::to_string(&err).unwrap();
        let back: FileDataResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(back, err);
        assert!(text.contains("\"status\":\"error\""));
        assert!(text.contains("\"kind\":\"invalid_request\""));
    }

    #[test]
    fn test_request_json() {
        let request: FileDataRequest = serde_json::from_str(r#"{"file_name":"x.csv"}"#).unwrap();
        assert_eq!(request, FileDataRequest::new("x.csv"));
        assert_eq!(request.timeout(), None);

        let request = FileDataRequest::new("x.csv").with_timeout(Duration::from_secs(2));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"file_name":"x.csv","timeout_ms":2000}"#);
    }
}
